//! Service catalog model and endpoint resolution.
//!
//! The identity service returns a catalog listing every deployed service and
//! its per-interface endpoint URLs. Resolution is a pure lookup: find the
//! entry for a service type, find the endpoint for the requested interface,
//! and normalize away any trailing API-version path segment so bindings
//! target a stable unversioned root.

use std::fmt;

use reqwest::Url;
use serde::Deserialize;

use crate::api::SessionError;

/// The three service groups this session layer manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Compute,
    Network,
    Identity,
}

impl ServiceType {
    /// Rebuild order. Groups resolved earlier keep their new bindings even
    /// if a later group's resolution fails.
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Compute,
        ServiceType::Network,
        ServiceType::Identity,
    ];

    /// Catalog `type` string for this service group.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Compute => "compute",
            ServiceType::Network => "network",
            ServiceType::Identity => "identity",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility scope of an endpoint - selects which network path is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointInterface {
    #[default]
    Public,
    Internal,
    Admin,
}

impl EndpointInterface {
    /// Catalog `interface` string for this scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointInterface::Public => "public",
            EndpointInterface::Internal => "internal",
            EndpointInterface::Admin => "admin",
        }
    }
}

impl fmt::Display for EndpointInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One endpoint of a catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub interface: String,
    pub url: String,
}

/// One service in the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// The catalog document as returned by the last successful authentication.
/// Replaced wholesale on every authentication, never merged.
pub type Catalog = Vec<CatalogEntry>;

/// Resolve the base URL for a service group at the given interface.
///
/// Lookup is order-preserving: if the catalog carries duplicate entries for
/// a type or interface, the first match wins. The returned URL has any
/// trailing `v<digits>[.<digits>]` path segment stripped.
pub fn resolve_endpoint(
    catalog: &[CatalogEntry],
    service: ServiceType,
    interface: EndpointInterface,
) -> Result<Url, SessionError> {
    let entry = catalog
        .iter()
        .find(|e| e.service_type == service.as_str())
        .ok_or(SessionError::ServiceNotFound(service))?;

    let endpoint = entry
        .endpoints
        .iter()
        .find(|e| e.interface == interface.as_str())
        .ok_or(SessionError::EndpointNotFound { service, interface })?;

    let mut url = Url::parse(&endpoint.url).map_err(|_| SessionError::MalformedEndpoint {
        service,
        url: endpoint.url.clone(),
    })?;

    strip_version_segment(&mut url);
    Ok(url)
}

/// True for path segments like `v3` or `v2.1`.
fn is_version_segment(segment: &str) -> bool {
    let Some(rest) = segment.strip_prefix('v') else {
        return false;
    };
    let mut parts = rest.splitn(2, '.');
    let major = parts.next().unwrap_or("");
    if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match parts.next() {
        None => true,
        Some(minor) => !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()),
    }
}

/// Drop a trailing API-version path segment so the binding targets the
/// unversioned root (each binding re-adds the version its wire format needs).
pub(crate) fn strip_version_segment(url: &mut Url) {
    let path = url.path().trim_end_matches('/');
    let Some((head, last)) = path.rsplit_once('/') else {
        return;
    };
    if is_version_segment(last) {
        let new_path = if head.is_empty() { "/" } else { head };
        let new_path = new_path.to_string();
        url.set_path(&new_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        vec![
            CatalogEntry {
                service_type: "compute".to_string(),
                endpoints: vec![
                    Endpoint {
                        interface: "public".to_string(),
                        url: "https://nova.example:8774/v2.1".to_string(),
                    },
                    Endpoint {
                        interface: "internal".to_string(),
                        url: "http://10.0.0.5:8774/v2.1".to_string(),
                    },
                ],
            },
            CatalogEntry {
                service_type: "identity".to_string(),
                endpoints: vec![Endpoint {
                    interface: "public".to_string(),
                    url: "https://keystone.example/identity/v3".to_string(),
                }],
            },
        ]
    }

    #[test]
    fn test_resolve_strips_version() {
        let url = resolve_endpoint(
            &catalog(),
            ServiceType::Compute,
            EndpointInterface::Public,
        )
        .expect("resolution failed");
        assert_eq!(url.as_str(), "https://nova.example:8774/");
    }

    #[test]
    fn test_resolve_keeps_remaining_path() {
        let url = resolve_endpoint(
            &catalog(),
            ServiceType::Identity,
            EndpointInterface::Public,
        )
        .expect("resolution failed");
        assert_eq!(url.as_str(), "https://keystone.example/identity");
    }

    #[test]
    fn test_resolve_selects_interface() {
        let url = resolve_endpoint(
            &catalog(),
            ServiceType::Compute,
            EndpointInterface::Internal,
        )
        .expect("resolution failed");
        assert_eq!(url.host_str(), Some("10.0.0.5"));
    }

    #[test]
    fn test_service_not_found() {
        let err = resolve_endpoint(&catalog(), ServiceType::Network, EndpointInterface::Public)
            .unwrap_err();
        assert!(matches!(err, SessionError::ServiceNotFound(ServiceType::Network)));
    }

    #[test]
    fn test_endpoint_not_found() {
        let err = resolve_endpoint(&catalog(), ServiceType::Identity, EndpointInterface::Admin)
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::EndpointNotFound {
                service: ServiceType::Identity,
                interface: EndpointInterface::Admin,
            }
        ));
    }

    #[test]
    fn test_malformed_endpoint_url() {
        let broken = vec![CatalogEntry {
            service_type: "compute".to_string(),
            endpoints: vec![Endpoint {
                interface: "public".to_string(),
                url: "nova.example/v2.1".to_string(),
            }],
        }];
        let err = resolve_endpoint(&broken, ServiceType::Compute, EndpointInterface::Public)
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::MalformedEndpoint {
                service: ServiceType::Compute,
                ..
            }
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_first_match_wins_on_duplicates() {
        let mut dup = catalog();
        dup.push(CatalogEntry {
            service_type: "compute".to_string(),
            endpoints: vec![Endpoint {
                interface: "public".to_string(),
                url: "https://shadow.example/v2.1".to_string(),
            }],
        });
        let url = resolve_endpoint(&dup, ServiceType::Compute, EndpointInterface::Public)
            .expect("resolution failed");
        assert_eq!(url.host_str(), Some("nova.example"));
    }

    #[test]
    fn test_version_segment_patterns() {
        assert!(is_version_segment("v3"));
        assert!(is_version_segment("v2.1"));
        assert!(is_version_segment("v10.42"));
        assert!(!is_version_segment("v"));
        assert!(!is_version_segment("v2.1.3"));
        assert!(!is_version_segment("v2a"));
        assert!(!is_version_segment("compute"));
        assert!(!is_version_segment("version2"));
    }

    #[test]
    fn test_strip_leaves_unversioned_paths() {
        let mut url = Url::parse("https://host/compute").unwrap();
        strip_version_segment(&mut url);
        assert_eq!(url.as_str(), "https://host/compute");

        let mut url = Url::parse("https://host/v3").unwrap();
        strip_version_segment(&mut url);
        assert_eq!(url.as_str(), "https://host/");

        // Trailing slash after the version segment is also handled.
        let mut url = Url::parse("https://host/v2.1/").unwrap();
        strip_version_segment(&mut url);
        assert_eq!(url.as_str(), "https://host/");
    }

    #[test]
    fn test_catalog_deserializes_wire_shape() {
        let json = r#"[
            {"type": "compute", "endpoints": [
                {"interface": "public", "url": "https://nova.example/v2.1",
                 "region": "RegionOne", "id": "abc123"}
            ]},
            {"type": "placement", "endpoints": []}
        ]"#;
        let parsed: Catalog = serde_json::from_str(json).expect("catalog parse failed");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].service_type, "compute");
        assert_eq!(parsed[0].endpoints[0].interface, "public");
    }
}
