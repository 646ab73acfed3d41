/// Convenience result type used across the crate.
pub type MoshResult<T> = Result<T, MoshError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum MoshError {
    /// Invalid host-provided data or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Buffer acquisition failed (allocation failure or live-byte budget exhausted).
    #[error("resource error: {0}")]
    Resource(String),

    /// Errors raised while executing a pass.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing parameter sets.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MoshError {
    /// Build a [`MoshError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MoshError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`MoshError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`MoshError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors that leave the pipeline unable to produce the frame.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
