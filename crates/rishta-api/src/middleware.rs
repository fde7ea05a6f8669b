use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::de::DeserializeOwned;

use rishta_types::api::{AdminClaims, UserClaims};

use crate::auth::ADMIN_ROLE;
use crate::error::ApiError;
use crate::state::AppState;

fn bearer_claims<C: DeserializeOwned>(req: &Request, secret: &str) -> Result<C, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<C>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    Ok(token_data.claims)
}

/// Validate a member token and expose its claims to handlers.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims: UserClaims = bearer_claims(&req, &state.user_jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Validate an admin token. Member tokens are signed with a different secret
/// and never pass.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims: AdminClaims = bearer_claims(&req, &state.admin_jwt_secret)?;
    if claims.role != ADMIN_ROLE {
        return Err(ApiError::Forbidden("Admin access required".into()));
    }
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
