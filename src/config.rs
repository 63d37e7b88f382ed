//! Session configuration.
//!
//! Carries the identity endpoint, the opaque credentials payload, and the
//! timer intervals driving renewal, retry, and the periodic expiry check.

use std::time::Duration;

use crate::catalog::EndpointInterface;

/// How long after a failed authentication the background retry fires.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 60;

/// Timeout for the authentication request itself.
/// Intentionally short: fail fast and retry rather than hang on a dead
/// identity endpoint.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1000;

/// How often the safety-net expiry check runs. Catches tokens that expired
/// while a scheduled renewal was lost (e.g. process suspension).
const DEFAULT_EXPIRY_CHECK_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identity endpoint used for authentication, including its version
    /// path, e.g. `https://keystone.example:5000/v3`.
    pub auth_url: String,

    /// Credentials payload posted verbatim to the identity service. The
    /// engine does not interpret it; password and application-credential
    /// payloads differ in shape. See [`password_credentials`].
    pub credentials: serde_json::Value,

    /// Which endpoint interface to resolve from the catalog.
    pub interface: EndpointInterface,

    /// Whether a failed authentication schedules a background retry.
    pub retry_on_failure: bool,

    /// Delay before a background retry after a failed authentication.
    pub retry_interval: Duration,

    /// Timeout on the authentication request.
    pub request_timeout: Duration,

    /// Interval of the periodic expiry safety-net check.
    pub expiry_check_interval: Duration,
}

impl SessionConfig {
    pub fn new(auth_url: impl Into<String>, credentials: serde_json::Value) -> Self {
        Self {
            auth_url: auth_url.into(),
            credentials,
            interface: EndpointInterface::default(),
            retry_on_failure: true,
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            expiry_check_interval: Duration::from_secs(DEFAULT_EXPIRY_CHECK_INTERVAL_SECS),
        }
    }
}

/// Build the standard password-method credentials payload, scoped to a
/// project in the same domain.
pub fn password_credentials(
    username: &str,
    password: &str,
    domain: &str,
    project: Option<&str>,
) -> serde_json::Value {
    let mut auth = serde_json::json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": username,
                        "domain": { "name": domain },
                        "password": password,
                    }
                }
            }
        }
    });

    if let Some(project) = project {
        auth["auth"]["scope"] = serde_json::json!({
            "project": {
                "name": project,
                "domain": { "name": domain },
            }
        });
    }

    auth
}
