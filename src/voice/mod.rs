//! Voice agent configuration and the outbound speech/email providers.

pub mod email;
pub mod modes;
pub mod tts;

pub use email::{HttpMailer, Mailer, MockMailer, OutgoingEmail};
pub use modes::{agent_mode, agent_modes, AgentMode};
pub use tts::{ElevenLabsClient, MockSpeechSynthesizer, SpeechSynthesizer};

/// Timeout for every provider request.
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

impl VoiceError {
    pub(crate) fn from_reqwest(provider: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Http(format!(
                "{provider} request timed out after {PROVIDER_TIMEOUT_SECS}s"
            ))
        } else if e.is_connect() {
            Self::Http(format!("Cannot connect to {provider}"))
        } else {
            Self::Http(e.to_string())
        }
    }
}

pub(crate) fn build_http_client() -> Result<reqwest::blocking::Client, VoiceError> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        .build()
        .map_err(|e| VoiceError::Http(e.to_string()))
}
