/// Convenience result type used across GpuPort.
pub type GpuPortResult<T> = Result<T, GpuPortError>;

/// Top-level error taxonomy used by canvas, encoder and backend APIs.
#[derive(thiserror::Error, Debug)]
pub enum GpuPortError {
    /// Bad caller-provided geometry, index or option values. No frame is produced.
    #[error("configuration error: {0}")]
    Config(String),

    /// A channel could not be encoded (unknown protocol or flag combination).
    #[error("encoding error: {0}")]
    Encode(String),

    /// The display backend failed to upload or present a frame.
    #[error("backend error: {0}")]
    Backend(String),

    /// Backend, surface or worker creation failed. Fatal to the canvas.
    #[error("initialization error: {0}")]
    Init(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GpuPortError {
    /// Build a [`GpuPortError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`GpuPortError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`GpuPortError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`GpuPortError::Init`] value.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Whether this error is fatal to the canvas that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
