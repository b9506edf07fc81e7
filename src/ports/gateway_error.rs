//! Errors shared by the external gateway ports.

use std::time::Duration;

use thiserror::Error;

/// Failure of a call to the commerce or chat platform.
///
/// "Not found" is never an error here; ports model it as `Option`/empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The call did not complete within its deadline.
    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),

    /// Network failure or 5xx response.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    /// Upstream refused the request (4xx other than not-found).
    #[error("Upstream rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be interpreted.
    #[error("Unexpected upstream response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Returns true if the failure is transient and the call may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Timeout(_) | GatewayError::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_and_outages_are_transient() {
        assert!(GatewayError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(GatewayError::Unavailable("reset".into()).is_transient());
        assert!(!GatewayError::Rejected {
            status: 403,
            message: "Missing Permissions".into()
        }
        .is_transient());
    }

    #[test]
    fn rejected_displays_status() {
        let err = GatewayError::Rejected {
            status: 403,
            message: "Missing Permissions".into(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream rejected request with status 403: Missing Permissions"
        );
    }
}
