use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use rishta_types::api::{Empty, Envelope};
use rishta_types::error::{ParseEnumError, PolicyError, PromoRejection};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    /// Verification, boost, or block checks failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The entity exists but is not in a state that allows the transition.
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("The platform is under maintenance, please try again later")]
    Maintenance,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Policy(_) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_) | Self::Conflict(_) | Self::LimitExceeded(_) => StatusCode::CONFLICT,
            Self::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Envelope {
            success: false,
            message: Some(message),
            data: Empty {},
        };
        (status, Json(body)).into_response()
    }
}

impl From<PromoRejection> for ApiError {
    fn from(rejection: PromoRejection) -> Self {
        match rejection {
            PromoRejection::NotFound => Self::NotFound("Promo code"),
            PromoRejection::LimitReached => Self::LimitExceeded(rejection.to_string()),
            _ => Self::Validation(rejection.to_string()),
        }
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(e: ParseEnumError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}
