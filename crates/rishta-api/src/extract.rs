use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;

use rishta_types::models::AppSettings;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `Json` whose rejection is the standard error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// Snapshot of the platform settings, read once for the request that asks
/// for it.
pub struct Settings(pub AppSettings);

impl Settings {
    /// Mutating member operations are refused while in maintenance.
    pub fn ensure_open(&self) -> ApiResult<()> {
        if self.0.maintenance_mode {
            return Err(ApiError::Maintenance);
        }
        Ok(())
    }
}

impl FromRequestParts<AppState> for Settings {
    type Rejection = ApiError;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let settings = state.run(|db| db.get_settings()).await?;
        Ok(Settings(settings))
    }
}
