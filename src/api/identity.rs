//! Identity service operations: token issuance, users, roles, projects,
//! domains, and the catalog-bearing authentication call itself.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::catalog::Catalog;

use super::{ServiceBinding, SessionError};

/// Identity wire format version, re-added under the unversioned root.
const API_VERSION: &str = "v3";

/// Response header carrying the issued bearer token.
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

#[derive(Debug, Deserialize)]
struct AuthTokenResponse {
    token: AuthTokenBody,
}

#[derive(Debug, Deserialize)]
struct AuthTokenBody {
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    catalog: Option<Catalog>,
}

/// Everything a successful authentication yields: the bearer token from the
/// response header, its expiry (absent means never expires), and the service
/// catalog from the body.
#[derive(Debug)]
pub(crate) struct AuthOutcome {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub catalog: Catalog,
}

/// Issue an authentication request against the identity endpoint.
///
/// The timeout is intentionally short: a hung identity endpoint must fail
/// fast and fall through to the retry path rather than block renewal.
pub(crate) async fn authenticate_raw(
    client: &Client,
    auth_url: &str,
    credentials: &serde_json::Value,
    timeout: Duration,
) -> Result<AuthOutcome, SessionError> {
    let url = format!("{}/auth/tokens", auth_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .timeout(timeout)
        .json(credentials)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SessionError::auth_failure(status, &body));
    }

    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            SessionError::InvalidResponse(format!(
                "Authentication response missing {} header",
                SUBJECT_TOKEN_HEADER
            ))
        })?;

    let body: AuthTokenResponse = response
        .json()
        .await
        .map_err(|e| SessionError::InvalidResponse(format!("POST {}: {}", url, e)))?;

    let catalog = body.token.catalog.ok_or(SessionError::MissingCatalog)?;

    Ok(AuthOutcome {
        token,
        expires_at: body.token.expires_at,
        catalog,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub domain_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointRecord {
    pub id: String,
    pub interface: String,
    pub url: String,
    #[serde(default)]
    pub service_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct RolesResponse {
    roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct DomainsResponse {
    domains: Vec<Domain>,
}

#[derive(Debug, Deserialize)]
struct ServicesResponse {
    services: Vec<ServiceRecord>,
}

#[derive(Debug, Deserialize)]
struct EndpointsResponse {
    endpoints: Vec<EndpointRecord>,
}

/// Identity service group handle. Bound to one endpoint and one token;
/// replaced whole by the session manager on rebind.
#[derive(Debug, Clone)]
pub struct IdentityApi {
    binding: ServiceBinding,
}

impl IdentityApi {
    pub(crate) fn new(binding: ServiceBinding) -> Self {
        Self { binding }
    }

    /// The unversioned root this group currently targets.
    pub fn base_url(&self) -> &Url {
        self.binding.base_url()
    }

    pub async fn list_users(&self) -> Result<Vec<User>, SessionError> {
        let response: UsersResponse =
            self.binding.get(&format!("{}/users", API_VERSION)).await?;
        Ok(response.users)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, SessionError> {
        let response: RolesResponse =
            self.binding.get(&format!("{}/roles", API_VERSION)).await?;
        Ok(response.roles)
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, SessionError> {
        let response: ProjectsResponse = self
            .binding
            .get(&format!("{}/projects", API_VERSION))
            .await?;
        Ok(response.projects)
    }

    pub async fn list_domains(&self) -> Result<Vec<Domain>, SessionError> {
        let response: DomainsResponse = self
            .binding
            .get(&format!("{}/domains", API_VERSION))
            .await?;
        Ok(response.domains)
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceRecord>, SessionError> {
        let response: ServicesResponse = self
            .binding
            .get(&format!("{}/services", API_VERSION))
            .await?;
        Ok(response.services)
    }

    pub async fn list_endpoints(&self) -> Result<Vec<EndpointRecord>, SessionError> {
        let response: EndpointsResponse = self
            .binding
            .get(&format!("{}/endpoints", API_VERSION))
            .await?;
        Ok(response.endpoints)
    }
}
