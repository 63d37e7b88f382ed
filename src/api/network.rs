//! Network service operations: networks, subnets, ports, security groups.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{ServiceBinding, SessionError};

/// Network wire format version, re-added under the unversioned root.
const API_VERSION: &str = "v2.0";

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub admin_state_up: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subnet {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub network_id: String,
    #[serde(default)]
    pub cidr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub network_id: String,
    #[serde(default)]
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NetworksResponse {
    networks: Vec<Network>,
}

#[derive(Debug, Deserialize)]
struct NetworkResponse {
    network: Network,
}

#[derive(Debug, Deserialize)]
struct SubnetsResponse {
    subnets: Vec<Subnet>,
}

#[derive(Debug, Deserialize)]
struct PortsResponse {
    ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
struct SecurityGroupsResponse {
    security_groups: Vec<SecurityGroup>,
}

/// Network service group handle. Bound to one endpoint and one token;
/// replaced whole by the session manager on rebind.
#[derive(Debug, Clone)]
pub struct NetworkApi {
    binding: ServiceBinding,
}

impl NetworkApi {
    pub(crate) fn new(binding: ServiceBinding) -> Self {
        Self { binding }
    }

    /// The unversioned root this group currently targets.
    pub fn base_url(&self) -> &Url {
        self.binding.base_url()
    }

    pub async fn list_networks(&self) -> Result<Vec<Network>, SessionError> {
        let response: NetworksResponse = self
            .binding
            .get(&format!("{}/networks", API_VERSION))
            .await?;
        Ok(response.networks)
    }

    pub async fn create_network(&self, network: &NetworkCreate) -> Result<Network, SessionError> {
        let body = serde_json::json!({ "network": network });
        let response: NetworkResponse = self
            .binding
            .post(&format!("{}/networks", API_VERSION), &body)
            .await?;
        Ok(response.network)
    }

    pub async fn delete_network(&self, id: &str) -> Result<(), SessionError> {
        self.binding
            .delete(&format!("{}/networks/{}", API_VERSION, id))
            .await
    }

    pub async fn list_subnets(&self) -> Result<Vec<Subnet>, SessionError> {
        let response: SubnetsResponse = self
            .binding
            .get(&format!("{}/subnets", API_VERSION))
            .await?;
        Ok(response.subnets)
    }

    pub async fn list_ports(&self) -> Result<Vec<Port>, SessionError> {
        let response: PortsResponse =
            self.binding.get(&format!("{}/ports", API_VERSION)).await?;
        Ok(response.ports)
    }

    pub async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>, SessionError> {
        let response: SecurityGroupsResponse = self
            .binding
            .get(&format!("{}/security-groups", API_VERSION))
            .await?;
        Ok(response.security_groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_networks_response() {
        let json = r#"{"networks": [
            {"id": "n1", "name": "private", "status": "ACTIVE",
             "admin_state_up": true, "shared": false}
        ]}"#;
        let parsed: NetworksResponse = serde_json::from_str(json).expect("parse failed");
        assert_eq!(parsed.networks[0].name, "private");
        assert_eq!(parsed.networks[0].admin_state_up, Some(true));
    }

    #[test]
    fn test_network_create_omits_unset_fields() {
        let create = NetworkCreate {
            name: "private".to_string(),
            admin_state_up: None,
        };
        let value = serde_json::to_value(&create).expect("serialize failed");
        assert!(value.get("admin_state_up").is_none());
    }
}
