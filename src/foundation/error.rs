/// Convenience result type used across Limbo.
pub type LimboResult<T> = Result<T, LimboError>;

/// Top-level error taxonomy used by the derivation pipeline and dataset tools.
#[derive(thiserror::Error, Debug)]
pub enum LimboError {
    /// A graph node was read while one of its inputs had no producer link or value.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Malformed cryptomatte manifest, channel layout, or pixel data.
    #[error("decode error: {0}")]
    Decode(String),

    /// Caller-supplied request arguments that cannot be interpreted.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A referenced file is absent or unreadable.
    #[error("io failure: {0}")]
    Io(String),

    /// Structural misuse of the API (unknown nodes, cycles, mistyped artifacts).
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LimboError {
    /// Build a [`LimboError::MissingInput`] value.
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    /// Build a [`LimboError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`LimboError::MalformedRequest`] value.
    pub fn malformed_request(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }

    /// Build a [`LimboError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`LimboError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a [`std::io::Error`] together with the path it concerns.
    pub(crate) fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io(format!("'{}': {err}", path.display()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
