use thiserror::Error;

/// Error taxonomy for the harvest pipeline.
///
/// Variants map to distinct recovery policies: configuration and persistence
/// errors are fatal, transport errors are fatal for listing calls but only
/// skip the affected item during detail fetches.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Missing or invalid configuration (e.g. no access token). Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network or HTTP failure that survived the transport retry budget.
    #[error("transport error after {attempts} attempt(s): {message}")]
    Transport {
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    /// Unexpected or unparseable API response body.
    #[error("api error: {0}")]
    Api(String),

    /// Failed checkpoint write. Fatal: continuing without durable state risks
    /// duplicate work on restart.
    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),
}

impl HarvestError {
    /// Transport error carrying the HTTP status of the final attempt.
    pub fn transport(status: Option<u16>, attempts: u32, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            attempts,
            message: message.into(),
        }
    }
}
