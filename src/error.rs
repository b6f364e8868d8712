use reqwest::Response;
use serde::Deserialize;

pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Failures surfaced by the API client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not authenticated")]
    Unauthenticated,
}

impl ApiError {
    /// Human-readable message suitable for inline display.
    pub fn message(&self) -> String {
        match self {
            ApiError::Transport(msg) | ApiError::Decode(msg) | ApiError::Validation(msg) => {
                normalize_message(Some(msg), None, None)
            }
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Unauthenticated => "Not authenticated".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a `Status` error from a non-success response, reading the body
    /// for a `message` (or `error`) field.
    pub(crate) async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let data_message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.error));

        ApiError::Status {
            status: status.as_u16(),
            message: normalize_message(None, data_message.as_deref(), status.canonical_reason()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Pick the first non-blank candidate: direct message, then the message
/// nested in the response body, then the HTTP status text.
pub fn normalize_message(
    direct: Option<&str>,
    response_data_message: Option<&str>,
    status_text: Option<&str>,
) -> String {
    [direct, response_data_message, status_text]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Failures inside a storage backend. The persistence bridge logs these
/// and never lets them reach callers.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

pub type ApiResult<T> = Result<T, ApiError>;
