use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ParseEnumError, PromoRejection};

/// Declares a field-less enum stored as a lowercase string, both in JSON and
/// in the database.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(Role {
    Bride => "bride",
    Groom => "groom",
});

string_enum!(
    /// Stored boost state. Only a cache: see `policy::effective_boost_status`.
    BoostStatus {
        None => "none",
        Active => "active",
        Expired => "expired",
    }
);

string_enum!(RequestType {
    Mobile => "mobile",
    Photos => "photos",
    Both => "both",
});

string_enum!(RequestStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

string_enum!(MessageType {
    Text => "text",
    Image => "image",
    File => "file",
});

string_enum!(TransactionKind {
    Boost => "boost",
    BoostGrant => "boost_grant",
});

string_enum!(TransactionStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

string_enum!(DiscountType {
    Percentage => "percentage",
    Fixed => "fixed",
});

string_enum!(ReportStatus {
    Pending => "pending",
    Resolved => "resolved",
    Dismissed => "dismissed",
});

string_enum!(NotificationKind {
    ContactRequest => "contact_request",
    RequestAccepted => "request_accepted",
    RequestRejected => "request_rejected",
    NewMessage => "new_message",
    BoostActivated => "boost_activated",
    AccountVerified => "account_verified",
    AccountBlocked => "account_blocked",
    Announcement => "announcement",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub is_verified: bool,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub boost_status: BoostStatus,
    pub boost_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// A conversation between exactly two members. Participants are kept in
/// sorted order so a pair maps to a single row regardless of who wrote first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: [Uuid; 2],
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread: HashMap<Uuid, i64>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Canonical key for an unordered pair.
    pub fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b { (a, b) } else { (b, a) }
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        match self.participants {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }

    pub fn unread_for(&self, user_id: Uuid) -> i64 {
        self.unread.get(&user_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message_type: MessageType,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Money amounts are integer minor units (paise, cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub discount_cents: i64,
    pub final_amount_cents: i64,
    pub currency: String,
    pub promo_code: Option<String>,
    pub payment_reference: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub usage_limit: i64,
    pub usage_count: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// Discount in minor units for a given amount, never more than the amount.
    pub fn discount_for(&self, amount_cents: i64) -> i64 {
        let amount = amount_cents.max(0);
        let raw = match self.discount_type {
            // Widened so large amounts cannot overflow before the division.
            DiscountType::Percentage => {
                let pct = i128::from(self.discount_value.clamp(0, 100));
                (i128::from(amount) * pct / 100) as i64
            }
            DiscountType::Fixed => self.discount_value.max(0),
        };
        raw.min(amount)
    }

    /// Checks everything except the usage counter, which must be claimed
    /// atomically by the store.
    pub fn check_window(&self, now: DateTime<Utc>) -> Result<(), PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Inactive);
        }
        if now < self.valid_from {
            return Err(PromoRejection::NotYetValid);
        }
        if now >= self.valid_until {
            return Err(PromoRejection::Expired);
        }
        Ok(())
    }

    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), PromoRejection> {
        self.check_window(now)?;
        if self.usage_count >= self.usage_limit {
            return Err(PromoRejection::LimitReached);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub action_taken: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Platform-wide business settings (single row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub boost_price_cents: i64,
    pub boost_duration_days: i64,
    pub currency: String,
    pub max_message_length: i64,
    pub maintenance_mode: bool,
    pub support_email: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            boost_price_cents: 49_900,
            boost_duration_days: 30,
            currency: "INR".to_string(),
            max_message_length: 2000,
            maintenance_mode: false,
            support_email: "support@rishta.app".to_string(),
        }
    }
}
