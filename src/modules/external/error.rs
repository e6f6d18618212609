use std::time::Duration;

use reqwest::StatusCode;
use shelf_http::error::AppError;
use thiserror::Error;

/// Failures talking to a third-party API.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Weather API key is not configured")]
    MissingApiKey,

    #[error("upstream did not answer within {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("upstream responded with {0}")]
    Status(StatusCode),

    #[error("unexpected upstream response: {0}")]
    UnexpectedShape(String),

    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// Classify a transport error, keeping timeouts apart. The URL is
    /// dropped because it may carry an API key.
    pub(crate) fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(timeout)
        } else {
            GatewayError::Request(err.without_url())
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout(_))
    }

    /// Map to an HTTP error: `message` for ordinary failures, `timed_out` when
    /// the upstream was too slow.
    pub fn respond(self, message: &'static str, timed_out: &'static str) -> AppError {
        let detail = self.to_string();
        if self.is_timeout() {
            AppError::timeout(timed_out, detail)
        } else {
            AppError::server(message, detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_get_their_own_message() {
        let (status, body) = GatewayError::Timeout(Duration::from_millis(5000))
            .respond("Error fetching weather data", "Weather service timed out")
            .into_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Weather service timed out");
        assert_eq!(body.error.as_deref(), Some("upstream did not answer within 5000 ms"));
    }

    #[test]
    fn missing_key_is_a_server_error() {
        let (status, body) = GatewayError::MissingApiKey
            .respond("Error fetching weather data", "Weather service timed out")
            .into_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Error fetching weather data");
        assert_eq!(body.error.as_deref(), Some("Weather API key is not configured"));
    }
}
