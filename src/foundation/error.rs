use std::path::PathBuf;

/// Convenience result type used across imagereel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy for GIF assembly and batch generation.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid or missing user-provided parameters.
    #[error("config error: {0}")]
    Config(String),

    /// No frames or images were found where some were required.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// An input image could not be read or decoded.
    #[error("decode error: '{}': {source}", path.display())]
    Decode {
        /// The offending file.
        path: PathBuf,
        /// Underlying codec or IO failure.
        #[source]
        source: anyhow::Error,
    },

    /// The output name plan does not cover the images the driver produces.
    #[error("naming mismatch: expected {expected} output names, got {actual}")]
    NamingMismatch {
        /// Names the driver needs.
        expected: usize,
        /// Names the plan provides.
        actual: usize,
    },

    /// The external generation or upscaling collaborator failed.
    #[error("model invocation error: {0}")]
    ModelInvocation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ReelError::EmptyInput`] value.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Build a [`ReelError::Decode`] value.
    pub fn decode(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self::Decode {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Build a [`ReelError::NamingMismatch`] value.
    pub fn naming_mismatch(expected: usize, actual: usize) -> Self {
        Self::NamingMismatch { expected, actual }
    }

    /// Build a [`ReelError::ModelInvocation`] value.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelInvocation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
