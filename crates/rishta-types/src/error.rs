use thiserror::Error;

/// A stored string did not match any variant of a string-backed enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Policy rejections. All of these are terminal and user-actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Your profile must be verified before you can send contact requests")]
    VerificationRequired,

    #[error("An active boost is required for this action")]
    BoostRequired,

    #[error("This member has not been verified yet")]
    RecipientNotVerified,

    #[error("This member is not available")]
    RecipientUnavailable,

    #[error("You have blocked this member")]
    BlockedByYou,

    #[error("This member has blocked you")]
    BlockedByRecipient,

    #[error("Your account has been blocked")]
    AccountBlocked,
}

/// Reasons a promo code cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PromoRejection {
    #[error("Promo code not found")]
    NotFound,

    #[error("Promo code is not active")]
    Inactive,

    #[error("Promo code is not valid yet")]
    NotYetValid,

    #[error("Promo code has expired")]
    Expired,

    #[error("Promo code usage limit exceeded")]
    LimitReached,
}
