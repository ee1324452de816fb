use thiserror::Error;

/// Client-input errors raised while decoding tracking events and lead
/// submissions. The `Display` text is what the HTTP layer returns to callers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid event type")]
    UnknownEventType(String),

    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Please select at least one service")]
    NoServices,

    #[error("Invalid status value")]
    InvalidStatus(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
