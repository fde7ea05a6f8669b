use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::middleware::{require_admin, require_user};
use crate::state::AppState;
use crate::{admin, auth, boost, messages, notifications, reports, requests, users};

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}

fn member_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected = Router::new()
        .route("/me", get(users::me))
        .route("/blocks", get(users::list_blocked))
        .route("/users/{id}/block", post(users::block_user).delete(users::unblock_user))
        .route("/contact-requests", post(requests::send_request))
        .route("/contact-requests/received", get(requests::received_requests))
        .route("/contact-requests/sent", get(requests::sent_requests))
        .route("/contact-requests/{id}/respond", put(requests::respond_to_request))
        .route("/messages", post(messages::send_message))
        .route("/conversations", get(messages::list_conversations))
        .route("/conversations/{id}/messages", get(messages::get_messages))
        .route("/conversations/{id}/read", post(messages::mark_read))
        .route("/boost", get(boost::boost_info))
        .route("/boost/purchase", post(boost::purchase_boost))
        .route("/promo-codes/validate", post(boost::validate_promo))
        .route("/reports", post(reports::create_report))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/{id}/read", put(notifications::mark_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_user));

    public.merge(protected)
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/auth/login", post(auth::admin_login));

    let protected = Router::new()
        .route("/me", get(admin::me))
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::users::list_users))
        .route("/users/{id}", get(admin::users::get_user).delete(admin::users::delete_user))
        .route("/users/{id}/verify", put(admin::users::verify_user))
        .route("/users/{id}/block", put(admin::users::block_user))
        .route("/users/{id}/unblock", put(admin::users::unblock_user))
        .route("/users/{id}/boost", post(admin::users::grant_boost))
        .route("/contact-requests", get(admin::moderation::list_contact_requests))
        .route("/conversations", get(admin::moderation::list_conversations))
        .route("/reports", get(admin::moderation::list_reports))
        .route("/reports/{id}/resolve", put(admin::moderation::resolve_report))
        .route("/reports/{id}/dismiss", put(admin::moderation::dismiss_report))
        .route("/transactions", get(admin::billing::list_transactions))
        .route(
            "/promo-codes",
            get(admin::billing::list_promo_codes).post(admin::billing::create_promo_code),
        )
        .route(
            "/promo-codes/{id}",
            put(admin::billing::update_promo_code).delete(admin::billing::delete_promo_code),
        )
        .route("/promo-codes/{id}/toggle", put(admin::billing::toggle_promo_code))
        .route("/notifications", get(admin::platform::list_notifications))
        .route("/notifications/broadcast", post(admin::platform::broadcast))
        .route(
            "/settings",
            get(admin::platform::get_settings).put(admin::platform::update_settings),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    public.merge(protected)
}

/// The full HTTP surface. Transport layers (CORS, tracing) are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", member_routes(&state))
        .nest("/admin", admin_routes(&state))
        .with_state(state)
}
