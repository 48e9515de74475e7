//! CLI Commands

pub mod common;
pub mod config;
pub mod profile;
pub mod provision;

use peerbox_core::DEFAULT_PEER_GROUP;
use peerbox_netbox::NetBoxClient;
use peerbox_peeringdb::PeeringDbClient;

/// Connection settings merged from flags, environment and config file
pub struct Settings {
    pub netbox_url: Option<String>,
    pub netbox_token: Option<String>,
    pub peeringdb_api_key: Option<String>,
    pub operator_asn: Option<u32>,
    pub peer_group: String,
}

impl Settings {
    pub fn new(
        netbox_url: Option<String>,
        netbox_token: Option<String>,
        peeringdb_api_key: Option<String>,
        operator_asn: Option<u32>,
        peer_group: Option<String>,
    ) -> Self {
        Self {
            netbox_url,
            netbox_token,
            peeringdb_api_key,
            operator_asn,
            peer_group: peer_group.unwrap_or_else(|| DEFAULT_PEER_GROUP.to_string()),
        }
    }

    pub fn registry(&self) -> PeeringDbClient {
        PeeringDbClient::new(self.peeringdb_api_key.clone())
    }

    pub fn inventory(&self) -> Result<NetBoxClient, String> {
        let url = self.netbox_url.as_deref().ok_or_else(|| {
            "NetBox URL not set (flag --netbox-url, env NETBOX_URL, or config key netbox_url)"
                .to_string()
        })?;
        let token = self.netbox_token.as_deref().ok_or_else(|| {
            "NetBox token not set (flag --netbox-token, env NETBOX_TOKEN, or config key netbox_token)"
                .to_string()
        })?;
        Ok(NetBoxClient::new(url, token))
    }

    pub fn require_operator_asn(&self) -> Result<u32, String> {
        self.operator_asn.ok_or_else(|| {
            "Operator ASN not set (flag --operator-asn, env PEERBOX_OPERATOR_ASN, or config key operator_asn)"
                .to_string()
        })
    }
}
