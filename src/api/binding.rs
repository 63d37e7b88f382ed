use reqwest::{header, Client, Url};
use serde::{de::DeserializeOwned, Serialize};

use super::SessionError;

/// Header carrying the bearer token on every control-plane request.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// One service group's resolved endpoint plus the token baked into it at
/// construction time.
///
/// Construction is side-effect-free: no request is issued until an operation
/// is invoked. Clone is cheap - reqwest::Client uses Arc internally for
/// connection pooling, so every binding shares one pool.
#[derive(Debug, Clone)]
pub struct ServiceBinding {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ServiceBinding {
    pub(crate) fn new(client: Client, base_url: Url, token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }

    /// The unversioned root this binding targets.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, SessionError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                AUTH_TOKEN_HEADER,
                header::HeaderValue::from_str(token)
                    .map_err(|e| SessionError::Config(format!("Invalid token header: {}", e)))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SessionError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(SessionError::from_status(status, &body))
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| SessionError::InvalidResponse(format!("GET {}: {}", url, e)))
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SessionError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| SessionError::InvalidResponse(format!("POST {}: {}", url, e)))
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), SessionError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .delete(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let binding = ServiceBinding::new(
            Client::new(),
            Url::parse("https://nova.example:8774/").unwrap(),
            None,
        );
        assert_eq!(
            binding.endpoint("v2.1/servers"),
            "https://nova.example:8774/v2.1/servers"
        );

        let binding = ServiceBinding::new(
            Client::new(),
            Url::parse("https://keystone.example/identity").unwrap(),
            None,
        );
        assert_eq!(
            binding.endpoint("/v3/users"),
            "https://keystone.example/identity/v3/users"
        );
    }

    #[test]
    fn test_auth_headers_carry_token() {
        let binding = ServiceBinding::new(
            Client::new(),
            Url::parse("https://nova.example/").unwrap(),
            Some("tok-123".to_string()),
        );
        let headers = binding.auth_headers().expect("header build failed");
        assert_eq!(
            headers.get(AUTH_TOKEN_HEADER).and_then(|v| v.to_str().ok()),
            Some("tok-123")
        );

        let unbound = ServiceBinding::new(
            Client::new(),
            Url::parse("https://nova.example/").unwrap(),
            None,
        );
        let headers = unbound.auth_headers().expect("header build failed");
        assert!(headers.get(AUTH_TOKEN_HEADER).is_none());
    }
}
