use thiserror::Error;

use crate::catalog::{EndpointInterface, ServiceType};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Authentication failed: status {status}: {body}")]
    AuthenticationFailed {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Authentication response contained no service catalog")]
    MissingCatalog,

    #[error("No {0} service found in catalog")]
    ServiceNotFound(ServiceType),

    #[error("No {interface} endpoint found for {service} service")]
    EndpointNotFound {
        service: ServiceType,
        interface: EndpointInterface,
    },

    #[error("Malformed {service} endpoint URL {url:?} in catalog")]
    MalformedEndpoint { service: ServiceType, url: String },

    #[error("No catalog resolved yet - authenticate first")]
    NoCatalog,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: status {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl SessionError {
    /// Truncate a response body to avoid logging excessive data.
    /// The cut must land on a char boundary; error pages are not ASCII-only.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let cut = (0..=MAX_ERROR_BODY_LENGTH)
            .rev()
            .find(|&i| body.is_char_boundary(i))
            .unwrap_or(0);
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..cut],
            body.len()
        )
    }

    /// Build an error from a non-success status on a service-group operation.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        SessionError::Http {
            status,
            body: Self::truncate_body(body),
        }
    }

    /// Build an error from a non-success status on the authentication request.
    pub(crate) fn auth_failure(status: reqwest::StatusCode, body: &str) -> Self {
        SessionError::AuthenticationFailed {
            status,
            body: Self::truncate_body(body),
        }
    }

    /// Whether a background retry can help.
    ///
    /// Network failures, identity-endpoint errors, and malformed auth
    /// responses are transient. Catalog-shape errors (missing service or
    /// interface, unparseable endpoint URL) indicate an environment
    /// mismatch and are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::AuthenticationFailed { .. }
                | SessionError::MissingCatalog
                | SessionError::Network(_)
                | SessionError::InvalidResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        let short = "server error";
        assert_eq!(SessionError::truncate_body(short), short);

        let long = "x".repeat(600);
        let truncated = SessionError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.contains("600 total bytes"));
    }

    #[test]
    fn test_truncate_body_multibyte_boundary() {
        // Byte 500 lands inside the euro sign; the cut must back off to
        // the previous char boundary instead of panicking.
        let body = format!("{}€{}", "x".repeat(499), "y".repeat(200));
        let truncated = SessionError::truncate_body(&body);
        assert!(truncated.starts_with(&"x".repeat(499)));
        assert!(!truncated.contains('€'));
        assert!(truncated.contains("702 total bytes"));

        // A boundary-aligned multibyte char is kept whole.
        let body = format!("{}€{}", "x".repeat(497), "y".repeat(200));
        let truncated = SessionError::truncate_body(&body);
        assert!(truncated.contains('€'));
    }

    #[test]
    fn test_from_status_multibyte_body() {
        let body = format!("{}€{}", "x".repeat(499), "y".repeat(200));
        let err = SessionError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(matches!(err, SessionError::Http { .. }));

        let err = SessionError::auth_failure(reqwest::StatusCode::BAD_GATEWAY, &body);
        assert!(matches!(err, SessionError::AuthenticationFailed { .. }));
    }

    #[test]
    fn test_retryable_classification() {
        let auth = SessionError::auth_failure(reqwest::StatusCode::UNAUTHORIZED, "denied");
        assert!(auth.is_retryable());
        assert!(SessionError::MissingCatalog.is_retryable());

        let structural = SessionError::ServiceNotFound(ServiceType::Network);
        assert!(!structural.is_retryable());
        let missing_interface = SessionError::EndpointNotFound {
            service: ServiceType::Compute,
            interface: EndpointInterface::Admin,
        };
        assert!(!missing_interface.is_retryable());
        let malformed = SessionError::MalformedEndpoint {
            service: ServiceType::Identity,
            url: "::not-a-url::".to_string(),
        };
        assert!(!malformed.is_retryable());
        assert!(!SessionError::NoCatalog.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::EndpointNotFound {
            service: ServiceType::Network,
            interface: EndpointInterface::Internal,
        };
        assert_eq!(
            err.to_string(),
            "No internal endpoint found for network service"
        );
    }
}
