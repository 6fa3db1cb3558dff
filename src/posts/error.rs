use thiserror::Error;

/// Failures surfaced by the posts API.
///
/// Variants carry strings rather than the underlying transport error so a
/// failure can be cloned into every view observing the failed query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
  #[error("Network Error: {0}")]
  Network(String),

  #[error("Request failed with status code {status}")]
  HttpStatus { status: u16, url: String },

  #[error("Request failed with status code 404 ({url} not found)")]
  NotFound { url: String },

  #[error("Malformed response from {url}: {reason}")]
  MalformedResponse { url: String, reason: String },
}

impl ApiError {
  pub fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
    match status.as_u16() {
      404 => ApiError::NotFound {
        url: url.to_string(),
      },
      code => ApiError::HttpStatus {
        status: code,
        url: url.to_string(),
      },
    }
  }

  pub fn malformed(url: &str, err: serde_json::Error) -> Self {
    ApiError::MalformedResponse {
      url: url.to_string(),
      reason: err.to_string(),
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    ApiError::Network(err.to_string())
  }
}
