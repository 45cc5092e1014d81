//! Error types for quota retrieval

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuotaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unrecognized ANTHROPIC_BASE_URL: {0}. Supported: https://api.z.ai/api/anthropic or https://open.bigmodel.cn/api/anthropic")]
    UnrecognizedBaseUrl(String),

    #[error("Z.ai API error: status {status}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid quota limit response format: {0}")]
    MalformedResponse(String),

    #[error("Failed to query Z.ai API: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,
}

impl QuotaError {
    /// Upstream status code, if this error came from a non-2xx response
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            QuotaError::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QuotaError::Cancelled)
    }
}

pub type QuotaResult<T> = Result<T, QuotaError>;
