use derive_more::Display;
use reqwest::StatusCode;

/// Failures surfaced by the admin client pipeline.
#[derive(Debug, Clone, Display, PartialEq, Eq)]
pub enum ClientError {
    /// The assembler was called without an entity.
    #[display("Invalid input: {_0}")]
    InvalidInput(String),

    /// The submission cannot be sent as built (file refused, unreadable, bad setting).
    #[display("{_0}")]
    Rejected(String),

    #[display("Network error: {_0}")]
    Network(String),

    #[display("Request timed out: {_0}")]
    Timeout(String),

    #[display("{message}")]
    ServerValidation { status: u16, message: String },

    #[display("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[display("Session expired")]
    AuthExpired,

    #[display("Rate limited")]
    RateLimited,

    #[display("Unexpected response: {_0}")]
    Decode(String),
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Transport failures a GET may be retried on.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Timeout(_))
    }

    /// Text shown to the operator, `None` when the failure stays silent.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ClientError::InvalidInput(_) => Some("Cannot submit: missing data.".into()),
            ClientError::Rejected(message) => Some(message.clone()),
            ClientError::Network(_) | ClientError::Timeout(_) => {
                Some("Network error. Please check your connection and try again.".into())
            }
            ClientError::ServerValidation { message, .. } => Some(message.clone()),
            ClientError::Server { message, .. } => Some(message.clone()),
            ClientError::Decode(_) => Some("Unexpected response from the server.".into()),
            ClientError::AuthExpired | ClientError::RateLimited => None,
        }
    }

    /// Maps a non-success response onto the error taxonomy, preferring the
    /// server's own `message` (or `error`) field.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .or_else(|| json.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .filter(|m| !m.trim().is_empty())
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("Request failed").to_string()
            });

        match status {
            StatusCode::UNAUTHORIZED => ClientError::AuthExpired,
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
            s if s.is_client_error() => ClientError::ServerValidation { status: s.as_u16(), message },
            s => ClientError::Server { status: s.as_u16(), message },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::from_status(status, "")
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
