use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TtsError {
    #[error("TTS endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("TTS request timed out: {0}")]
    Timeout(String),

    #[error("TTS connection error: {0}")]
    Connection(String),

    #[error("TTS response decode error: {0}")]
    Decode(String),

    #[error("All TTS endpoints exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: Box<TtsError> },

    #[error("No TTS endpoints configured")]
    NoEndpoints,

    #[error("Invalid TTS configuration: {0}")]
    Config(String),
}

impl TtsError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TtsError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TtsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TtsError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            TtsError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else if e.is_decode() || e.is_body() {
            TtsError::Decode(e.to_string())
        } else {
            TtsError::Connection(e.to_string())
        }
    }
}
