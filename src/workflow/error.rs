use thiserror::Error;

/// Typed failures raised inside workflow transactions. Raising one aborts
/// the whole transaction with no partial effects; handlers map these to
/// user-visible responses. Recoverable conditions (already started, already
/// decided) are outcome values, not errors.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("user profile not found")]
    UserNotFound,

    #[error("vacation request not found")]
    RequestNotFound,

    #[error("end date cannot be before start date")]
    InvalidDateRange,

    #[error("a reason is required")]
    MissingReason,

    #[error("not enough vacation balance")]
    InsufficientBalance,

    #[error("invalid payload: {0}")]
    InvalidPayload(&'static str),

    #[error("payload too large: {size} bytes")]
    PayloadTooLarge { size: usize },

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error("stored document failed to decode: {0}")]
    Codec(#[from] serde_json::Error),
}
