//! Error types for the fallible setup paths
//!
//! The frame loop itself never returns errors: hooks run to completion or panic.

pub type RadiusResult<T> = Result<T, RadiusError>;

#[derive(thiserror::Error, Debug)]
pub enum RadiusError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RadiusError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }
}
