//! Store-side inputs and outcomes. Entities themselves are the
//! `rishta_types::models` structs; these are the shapes only the store needs.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rishta_types::error::PromoRejection;
use rishta_types::models::{
    Admin, BoostStatus, ContactRequest, Conversation, DiscountType, Message, MessageType, PromoCode,
    Report, RequestType, Role, Transaction, User,
};

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

/// A member together with the password hash, only for login.
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

pub struct AdminCredentials {
    pub admin: Admin,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub verified: Option<bool>,
    pub blocked: Option<bool>,
    /// Matched against the derived boost state, not the stored column.
    pub boost: Option<BoostStatus>,
    pub search: Option<String>,
}

pub struct NewContactRequest<'a> {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub request_type: RequestType,
    pub message: Option<&'a str>,
}

pub enum CreateRequestOutcome {
    Created(ContactRequest),
    /// A pending request for the same ordered pair already exists.
    DuplicatePending,
}

pub enum RespondOutcome {
    Updated(ContactRequest),
    NotFound,
    NotRecipient,
    /// The request already left `pending`.
    NotPending(ContactRequest),
}

pub struct NewMessage<'a> {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message_type: MessageType,
    pub content: &'a str,
}

pub struct SentMessage {
    pub conversation: Conversation,
    pub message: Message,
}

pub struct NewPromoCode<'a> {
    pub code: &'a str,
    pub description: &'a str,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub usage_limit: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PromoCodeChanges {
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<i64>,
    pub usage_limit: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// Result of claiming one use of a promo code.
pub type Redemption = Result<PromoCode, PromoRejection>;

pub struct BoostPurchase<'a> {
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub duration_days: i64,
    pub promo_code: Option<&'a str>,
    pub payment_reference: &'a str,
}

pub enum PurchaseOutcome {
    Completed {
        transaction: Transaction,
        boost_expires_at: DateTime<Utc>,
    },
    PromoRejected(PromoRejection),
    UserNotFound,
}

pub enum ResolveOutcome {
    Closed { report: Report, user_blocked: bool },
    NotFound,
    AlreadyClosed(Report),
}
