//! Compute service operations: servers, flavors, images, keypairs.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{ServiceBinding, SessionError};

/// Compute wire format version, re-added under the unversioned root.
const API_VERSION: &str = "v2.1";

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCreate {
    pub name: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vcpus: Option<u32>,
    #[serde(default)]
    pub ram: Option<u64>,
    #[serde(default)]
    pub disk: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Keypair {
    pub name: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServersResponse {
    servers: Vec<Server>,
}

#[derive(Debug, Deserialize)]
struct ServerResponse {
    server: Server,
}

#[derive(Debug, Deserialize)]
struct FlavorsResponse {
    flavors: Vec<Flavor>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct KeypairsResponse {
    keypairs: Vec<KeypairWrapper>,
}

#[derive(Debug, Deserialize)]
struct KeypairWrapper {
    keypair: Keypair,
}

/// Compute service group handle. Bound to one endpoint and one token;
/// replaced whole by the session manager on rebind.
#[derive(Debug, Clone)]
pub struct ComputeApi {
    binding: ServiceBinding,
}

impl ComputeApi {
    pub(crate) fn new(binding: ServiceBinding) -> Self {
        Self { binding }
    }

    /// The unversioned root this group currently targets.
    pub fn base_url(&self) -> &Url {
        self.binding.base_url()
    }

    pub async fn list_servers(&self) -> Result<Vec<Server>, SessionError> {
        let response: ServersResponse =
            self.binding.get(&format!("{}/servers", API_VERSION)).await?;
        Ok(response.servers)
    }

    pub async fn get_server(&self, id: &str) -> Result<Server, SessionError> {
        let response: ServerResponse = self
            .binding
            .get(&format!("{}/servers/{}", API_VERSION, id))
            .await?;
        Ok(response.server)
    }

    pub async fn create_server(&self, server: &ServerCreate) -> Result<Server, SessionError> {
        let body = serde_json::json!({ "server": server });
        let response: ServerResponse = self
            .binding
            .post(&format!("{}/servers", API_VERSION), &body)
            .await?;
        Ok(response.server)
    }

    pub async fn delete_server(&self, id: &str) -> Result<(), SessionError> {
        self.binding
            .delete(&format!("{}/servers/{}", API_VERSION, id))
            .await
    }

    pub async fn list_flavors(&self) -> Result<Vec<Flavor>, SessionError> {
        let response: FlavorsResponse = self
            .binding
            .get(&format!("{}/flavors/detail", API_VERSION))
            .await?;
        Ok(response.flavors)
    }

    pub async fn list_images(&self) -> Result<Vec<Image>, SessionError> {
        let response: ImagesResponse =
            self.binding.get(&format!("{}/images", API_VERSION)).await?;
        Ok(response.images)
    }

    pub async fn list_keypairs(&self) -> Result<Vec<Keypair>, SessionError> {
        let response: KeypairsResponse = self
            .binding
            .get(&format!("{}/os-keypairs", API_VERSION))
            .await?;
        Ok(response.keypairs.into_iter().map(|w| w.keypair).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_servers_response() {
        let json = r#"{"servers": [
            {"id": "a1", "name": "web-1", "status": "ACTIVE", "tenant_id": "t1"},
            {"id": "b2", "name": "web-2"}
        ]}"#;
        let parsed: ServersResponse = serde_json::from_str(json).expect("parse failed");
        assert_eq!(parsed.servers.len(), 2);
        assert_eq!(parsed.servers[0].status.as_deref(), Some("ACTIVE"));
        assert!(parsed.servers[1].status.is_none());
    }

    #[test]
    fn test_parse_keypairs_wrapper() {
        let json = r#"{"keypairs": [
            {"keypair": {"name": "ops", "fingerprint": "aa:bb", "public_key": "ssh-ed25519 AAA"}}
        ]}"#;
        let parsed: KeypairsResponse = serde_json::from_str(json).expect("parse failed");
        assert_eq!(parsed.keypairs[0].keypair.name, "ops");
    }

    #[test]
    fn test_server_create_wire_names() {
        let create = ServerCreate {
            name: "web-1".to_string(),
            flavor_ref: "m1.small".to_string(),
            image_ref: "img-1".to_string(),
        };
        let value = serde_json::to_value(&create).expect("serialize failed");
        assert_eq!(value["flavorRef"], "m1.small");
        assert_eq!(value["imageRef"], "img-1");
    }
}
