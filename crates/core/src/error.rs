#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid transition: cannot {action} a request in status '{from}'")]
    InvalidTransition { from: String, action: String },

    #[error("Request not found: {id}")]
    NotFound { id: String },

    #[error("Duplicate request id: {id}")]
    DuplicateId { id: String },

    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// True when the error indicates the backing transport is unreachable
    /// and a fallback store should take over the operation.
    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::TransportUnavailable(_))
    }
}
