use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AppSettings, BoostStatus, ContactRequest, Conversation, DiscountType, Message, MessageType,
    Notification, PromoCode, Report, RequestStatus, RequestType, Role, Transaction, User,
};

// -- JWT Claims --

/// Member token claims. Signed with the member secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

/// Admin token claims. Signed with a separate admin secret, so a member token
/// never validates on the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

// -- Envelope --

/// Every response body: `{ success, message?, ...payload }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

/// Payload for responses that only carry a message.
#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Profile,
}

#[derive(Debug, Serialize)]
pub struct AdminAuthResponse {
    pub token: String,
    pub admin: AdminProfile,
}

#[derive(Debug, Serialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

// -- Profiles --

/// A member as seen by readers: boost status is the derived one.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
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
}

impl Profile {
    pub fn from_user(user: User, now: DateTime<Utc>) -> Self {
        let boost_status = crate::policy::effective_boost_status(&user, now);
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            is_verified: user.is_verified,
            is_blocked: user.is_blocked,
            block_reason: user.block_reason,
            boost_status,
            boost_expires_at: user.boost_expires_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Profile,
}

#[derive(Debug, Serialize)]
pub struct BlockedUsersResponse {
    pub blocked_users: Vec<Uuid>,
}

// -- Contact requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendContactRequest {
    pub to_user_id: Uuid,
    pub request_type: RequestType,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondContactRequest {
    pub status: RequestStatus,
}

#[derive(Debug, Serialize)]
pub struct ContactRequestResponse {
    pub request: ContactRequest,
}

#[derive(Debug, Serialize)]
pub struct ContactRequestList {
    pub requests: Vec<ContactRequest>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    #[serde(default = "default_message_type")]
    pub message_type: MessageType,
    pub content: String,
}

fn default_message_type() -> MessageType {
    MessageType::Text
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub conversation_id: Uuid,
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user_id: Uuid,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

impl ConversationSummary {
    pub fn for_user(conv: &Conversation, user_id: Uuid) -> Option<Self> {
        Some(Self {
            id: conv.id,
            other_user_id: conv.other_participant(user_id)?,
            last_message: conv.last_message.clone(),
            last_message_at: conv.last_message_at,
            unread_count: conv.unread_for(user_id),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

// -- Boost & promo codes --

#[derive(Debug, Serialize)]
pub struct BoostInfo {
    pub boost_status: BoostStatus,
    pub boost_expires_at: Option<DateTime<Utc>>,
    pub price_cents: i64,
    pub currency: String,
    pub duration_days: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PurchaseBoostRequest {
    pub payment_reference: String,
    #[serde(default)]
    pub promo_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseBoostResponse {
    pub transaction: Transaction,
    pub boost_expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatePromoRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct PromoPreview {
    pub code: String,
    pub amount_cents: i64,
    pub discount_cents: i64,
    pub final_amount_cents: i64,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReportRequest {
    pub reported_user_id: Uuid,
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: Report,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

// -- Admin --

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub verified: Option<bool>,
    pub blocked: Option<bool>,
    pub boost: Option<BoostStatus>,
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<Profile>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub user: Profile,
    pub blocked_users: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyUserRequest {
    pub verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockUserRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantBoostRequest {
    pub days: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct ReportList {
    pub reports: Vec<Report>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct AdminContactRequestList {
    pub requests: Vec<ContactRequest>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct AdminConversationList {
    pub conversations: Vec<Conversation>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveReportRequest {
    pub action: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DismissReportRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveReportResponse {
    pub report: Report,
    pub user_blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePromoCodeRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub usage_limit: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePromoCodeRequest {
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<i64>,
    pub usage_limit: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PromoCodeResponse {
    pub promo_code: PromoCode,
}

#[derive(Debug, Serialize)]
pub struct PromoCodeList {
    pub promo_codes: Vec<PromoCode>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    pub recipients: usize,
}

#[derive(Debug, Serialize)]
pub struct AdminNotificationList {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: AppSettings,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSettingsRequest {
    pub boost_price_cents: Option<i64>,
    pub boost_duration_days: Option<i64>,
    pub currency: Option<String>,
    pub max_message_length: Option<i64>,
    pub maintenance_mode: Option<bool>,
    pub support_email: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub brides: i64,
    pub grooms: i64,
    pub verified_users: i64,
    pub blocked_users: i64,
    pub active_boosts: i64,
    pub pending_reports: i64,
    pub pending_requests: i64,
    pub total_conversations: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub stats: DashboardStats,
}
