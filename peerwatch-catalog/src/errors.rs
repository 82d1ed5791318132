//! Error types for catalog access.

use thiserror::Error;

/// Fallback when a failing server gives no usable explanation.
pub const NO_DETAILS_MESSAGE: &str =
    "No details returned by the server. Check the log for more information.";

/// Errors that can occur while talking to a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog answered with a non-success status.
    #[error("Request to {url} failed with status {status}: {message}")]
    CatalogUnavailable {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Server-provided explanation, or [`NO_DETAILS_MESSAGE`]
        message: String,
    },

    /// Request could not be sent or the response could not be read.
    #[error("Network error: {reason}")]
    NetworkError {
        /// The reason for the network error
        reason: String,
    },

    /// Response body did not have the expected shape.
    #[error("Parse error: {reason}")]
    ParseError {
        /// The reason for the parse error
        reason: String,
    },

    /// Search finished without matches.
    #[error("No videos found matching '{query}'")]
    NoResults {
        /// Keywords that were searched for
        query: String,
    },
}

impl CatalogError {
    /// Checks if the error should be shown as a warning rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, CatalogError::NoResults { .. })
    }

    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::CatalogUnavailable { message, .. } => message.clone(),
            CatalogError::NetworkError { .. } => {
                "Could not reach the catalog. Check your connection.".to_string()
            }
            CatalogError::ParseError { .. } => "Unexpected answer from the catalog".to_string(),
            CatalogError::NoResults { .. } => "No videos found matching the keywords.".to_string(),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            CatalogError::ParseError {
                reason: error.to_string(),
            }
        } else {
            CatalogError::NetworkError {
                reason: error.to_string(),
            }
        }
    }
}

/// Pulls the explanation out of an instance API error body (`error` field).
pub(crate) fn instance_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| NO_DETAILS_MESSAGE.to_string())
}

/// Pulls the first `errors.*.msg` out of an instance directory error body.
pub(crate) fn directory_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("errors")?
                .as_object()?
                .values()
                .next()?
                .get("msg")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| NO_DETAILS_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_error_field_is_used() {
        let body = r#"{"error": "Video not found", "status": 404}"#;
        assert_eq!(instance_error_message(body), "Video not found");
    }

    #[test]
    fn test_instance_error_without_field_falls_back() {
        assert_eq!(instance_error_message("<html>502</html>"), NO_DETAILS_MESSAGE);
        assert_eq!(instance_error_message(r#"{"detail": "x"}"#), NO_DETAILS_MESSAGE);
    }

    #[test]
    fn test_directory_error_takes_first_message() {
        let body = r#"{"errors": {"count": {"msg": "Should have a valid count", "param": "count"}}}"#;
        assert_eq!(directory_error_message(body), "Should have a valid count");
    }

    #[test]
    fn test_directory_error_without_errors_falls_back() {
        assert_eq!(directory_error_message(r#"{"errors": {}}"#), NO_DETAILS_MESSAGE);
    }

    #[test]
    fn test_no_results_is_warning() {
        let error = CatalogError::NoResults {
            query: "cats".to_string(),
        };
        assert!(error.is_warning());
        assert!(
            !CatalogError::NetworkError {
                reason: "timeout".to_string()
            }
            .is_warning()
        );
    }
}
