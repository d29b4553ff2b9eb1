//! Error types for model invocation

use thiserror::Error;

/// Failures while resolving an answer for a prompt.
///
/// Only `Throttled` and `Api` are classified provider errors; everything
/// else is the unclassified bucket. The distinction drives the status code
/// and the public message, which never carries provider error codes.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The provider rejected the call due to throttling
    #[error("rate limited by model provider")]
    Throttled,

    /// The provider returned a classified error code
    #[error("model provider error: {code}")]
    Api { code: String },

    /// Transport-level failure talking to the provider
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response arrived but did not contain generated text
    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    /// Worker queue failure or other unexpected condition
    #[error("internal error: {0}")]
    Internal(String),
}

impl InvokeError {
    pub fn status(&self) -> u16 {
        match self {
            InvokeError::Throttled => 429,
            _ => 500,
        }
    }

    // What the caller is allowed to see
    pub fn public_message(&self) -> &'static str {
        match self {
            InvokeError::Throttled => "Rate limit exceeded",
            InvokeError::Api { .. } => "Model invocation failed",
            InvokeError::Http(_) | InvokeError::InvalidResponse(_) | InvokeError::Internal(_) => {
                "Internal server error"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_maps_to_429() {
        let err = InvokeError::Throttled;
        assert_eq!(err.status(), 429);
        assert_eq!(err.public_message(), "Rate limit exceeded");
    }

    #[test]
    fn classified_errors_do_not_leak_codes() {
        let err = InvokeError::Api {
            code: "ValidationException".to_string(),
        };
        assert_eq!(err.status(), 500);
        assert_eq!(err.public_message(), "Model invocation failed");
        assert!(!err.public_message().contains("ValidationException"));
    }

    #[test]
    fn unclassified_errors_stay_generic() {
        let err = InvokeError::Internal("worker queue closed".to_string());
        assert_eq!(err.status(), 500);
        assert_eq!(err.public_message(), "Internal server error");

        let err = InvokeError::InvalidResponse("no content blocks".to_string());
        assert_eq!(err.status(), 500);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
