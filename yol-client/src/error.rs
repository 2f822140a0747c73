use yol_core::{CoreError, StartWarning};

/// Everything a client call can fail with.
///
/// `Validation` and `ConfirmationRequired` are raised locally before any
/// request is sent; the rest come from the network or the backend.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("Confirmation required: {0}")]
    ConfirmationRequired(StartWarning),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("notification delivery failed: {0}")]
    Delivery(String),

    #[error("invalid data from {endpoint}: {source}")]
    InvalidResponse {
        endpoint: String,
        source: CoreError,
    },
}

impl ClientError {
    /// Text to show the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(err) => err.to_string(),
            ClientError::ConfirmationRequired(warning) => {
                format!("Please confirm: {warning}")
            }
            ClientError::Unauthenticated => "Please sign in again".to_string(),
            ClientError::Timeout { .. } => "The server did not respond in time".to_string(),
            ClientError::Http { .. } => "Could not reach the server".to_string(),
            ClientError::Api { body, status, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| format!("Server error ({status})")),
            ClientError::Delivery(_) => "Could not show notifications".to_string(),
            ClientError::Deserialization { .. } | ClientError::InvalidResponse { .. } => {
                "The server sent an unexpected response".to_string()
            }
        }
    }

    /// Machine-readable rejection code from the backend, when present.
    pub fn api_code(&self) -> Option<String> {
        match self {
            ClientError::Api { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()?
                .get("code")?
                .as_str()
                .map(str::to_string),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
