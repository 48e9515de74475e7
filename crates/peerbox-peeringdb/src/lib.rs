//! PeeringDB Registry Gateway
//!
//! Fetches network profiles and exchange presence from the public
//! PeeringDB API and maps them onto the core registry types.

use async_trait::async_trait;
use peerbox_core::{AsnProfile, ExchangePresence, GatewayError, GatewayResult, RegistryGateway};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// PeeringDB API base URL
pub const PEERINGDB_API: &str = "https://www.peeringdb.com/api";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// PeeringDB API response wrapper
#[derive(Debug, Deserialize)]
struct PdbResponse<T> {
    data: Vec<T>,
}

/// Network record from PeeringDB (`/net`)
#[derive(Debug, Clone, Deserialize)]
pub struct PdbNetwork {
    pub asn: u32,
    pub name: String,
    pub website: Option<String>,
    pub irr_as_set: Option<String>,
    pub info_prefixes4: Option<u32>,
    pub info_prefixes6: Option<u32>,
    pub info_prefix_limit_v4: Option<u32>,
    pub info_prefix_limit_v6: Option<u32>,
}

/// Network-exchange connection record from PeeringDB (`/netixlan`)
#[derive(Debug, Clone, Deserialize)]
pub struct PdbNetIxlan {
    pub id: u32,
    pub asn: u32,
    pub name: String,
    pub ix_id: u32,
    pub ipaddr4: Option<String>,
    pub ipaddr6: Option<String>,
}

/// PeeringDB client
pub struct PeeringDbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PeeringDbClient {
    /// Create a new PeeringDB client.
    ///
    /// Anonymous access works; an API key raises the rate limits.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: PEERINGDB_API.to_string(),
            api_key,
        }
    }

    /// Point the client at a different API root (test servers, mirrors)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch the unwrapped `data` list of one endpoint
    async fn fetch<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> GatewayResult<Vec<T>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {}", url);

        let mut request = self.client.get(&url).timeout(REQUEST_TIMEOUT);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Api-Key {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Auth(
                "PeeringDB rejected the API key".to_string(),
            ));
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(format!("{}: {}", status, text)));
        }

        let wrapper: PdbResponse<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(wrapper.data)
    }
}

#[async_trait]
impl RegistryGateway for PeeringDbClient {
    async fn asn_profile(&self, asn: u32) -> GatewayResult<Option<AsnProfile>> {
        let networks = self
            .fetch::<PdbNetwork>(&format!("net?asn={}", asn))
            .await?;
        Ok(networks.first().map(profile_from))
    }

    async fn exchange_presence(&self, asn: u32) -> GatewayResult<Vec<ExchangePresence>> {
        let entries = self
            .fetch::<PdbNetIxlan>(&format!("netixlan?asn={}", asn))
            .await?;
        let mut presence: Vec<ExchangePresence> = entries.iter().map(presence_from).collect();
        presence.sort_by(|a, b| a.exchange_name.cmp(&b.exchange_name));
        Ok(presence)
    }
}

/// Map a PeeringDB network onto the core profile.
///
/// The explicit per-family limit and the announced-prefix estimate are both
/// kept; the policy layer owns the fallback between them.
fn profile_from(network: &PdbNetwork) -> AsnProfile {
    AsnProfile {
        asn: network.asn,
        name: network.name.clone(),
        website: network.website.clone().filter(|w| !w.is_empty()),
        irr_as_set: network.irr_as_set.clone().unwrap_or_default(),
        prefix_limit_v4: network.info_prefix_limit_v4,
        prefix_limit_v6: network.info_prefix_limit_v6,
        announced_prefixes_v4: network.info_prefixes4,
        announced_prefixes_v6: network.info_prefixes6,
    }
}

fn presence_from(entry: &PdbNetIxlan) -> ExchangePresence {
    ExchangePresence {
        exchange_id: entry.ix_id,
        exchange_name: entry.name.clone(),
        ipv4: parse_addr(entry.ipaddr4.as_deref(), &entry.name),
        ipv6: parse_addr(entry.ipaddr6.as_deref(), &entry.name),
    }
}

/// Parse one optional registry address; a value the registry let through
/// unparsed degrades to "no address on this family".
fn parse_addr<T: std::str::FromStr>(raw: Option<&str>, exchange: &str) -> Option<T> {
    let text = raw?;
    match text.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            warn!("Unparsable address '{}' on {}", text, exchange);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn net_body() -> serde_json::Value {
        json!({
            "data": [{
                "id": 1,
                "asn": 64511,
                "name": "Peer Networks",
                "website": "https://peer.example",
                "irr_as_set": "AS-PEER AS-PEER-V6",
                "info_prefixes4": 80,
                "info_prefixes6": 15,
                "info_prefix_limit_v4": 100,
                "info_prefix_limit_v6": 20
            }]
        })
    }

    #[tokio::test]
    async fn test_profile_keeps_both_limit_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/net"))
            .and(query_param("asn", "64511"))
            .respond_with(ResponseTemplate::new(200).set_body_json(net_body()))
            .mount(&server)
            .await;

        let client = PeeringDbClient::new(None).with_base_url(&server.uri());
        let profile = client.asn_profile(64511).await.unwrap().unwrap();

        assert_eq!(profile.asn, 64511);
        assert_eq!(profile.name, "Peer Networks");
        assert_eq!(profile.prefix_limit_v4, Some(100));
        assert_eq!(profile.prefix_limit_v6, Some(20));
        assert_eq!(profile.announced_prefixes_v4, Some(80));
        assert_eq!(profile.announced_prefixes_v6, Some(15));
        assert_eq!(profile.irr_as_set, "AS-PEER AS-PEER-V6");
    }

    #[tokio::test]
    async fn test_unknown_asn_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/net"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let client = PeeringDbClient::new(None).with_base_url(&server.uri());
        assert!(client.asn_profile(64999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_presence_is_sorted_and_parsed() {
        let server = MockServer::start().await;
        let body = json!({
            "data": [
                {
                    "id": 10, "asn": 64511, "name": "LONAP", "ix_id": 90,
                    "ipaddr4": "5.57.80.1", "ipaddr6": null
                },
                {
                    "id": 11, "asn": 64511, "name": "AMS-IX", "ix_id": 26,
                    "ipaddr4": "80.249.208.1", "ipaddr6": "2001:7f8:1::1"
                },
                {
                    "id": 12, "asn": 64511, "name": "DE-CIX Frankfurt", "ix_id": 31,
                    "ipaddr4": "not-an-address", "ipaddr6": "2001:7f8::10"
                }
            ]
        });
        Mock::given(method("GET"))
            .and(path("/netixlan"))
            .and(query_param("asn", "64511"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = PeeringDbClient::new(None).with_base_url(&server.uri());
        let presence = client.exchange_presence(64511).await.unwrap();

        let names: Vec<&str> = presence.iter().map(|p| p.exchange_name.as_str()).collect();
        assert_eq!(names, vec!["AMS-IX", "DE-CIX Frankfurt", "LONAP"]);

        let decix = &presence[1];
        assert_eq!(decix.exchange_id, 31);
        // the garbage v4 address degrades to None, the v6 one still parses
        assert!(decix.ipv4.is_none());
        assert_eq!(decix.ipv6, Some("2001:7f8::10".parse().unwrap()));

        let lonap = &presence[2];
        assert_eq!(lonap.ipv4, Some("5.57.80.1".parse().unwrap()));
        assert!(lonap.ipv6.is_none());
    }

    #[tokio::test]
    async fn test_api_key_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/net"))
            .and(header("Authorization", "Api-Key seekrit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(net_body()))
            .mount(&server)
            .await;

        let client =
            PeeringDbClient::new(Some("seekrit".to_string())).with_base_url(&server.uri());
        assert!(client.asn_profile(64511).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/net"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client =
            PeeringDbClient::new(Some("expired".to_string())).with_base_url(&server.uri());
        let err = client.asn_profile(64511).await.unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/netixlan"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = PeeringDbClient::new(None).with_base_url(&server.uri());
        let err = client.exchange_presence(64511).await.unwrap_err();
        match err {
            GatewayError::Transport(text) => assert!(text.contains("500")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/net"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .mount(&server)
            .await;

        let client = PeeringDbClient::new(None).with_base_url(&server.uri());
        let err = client.asn_profile(64511).await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[test]
    fn test_network_record_tolerates_missing_optionals() {
        let network: PdbNetwork = serde_json::from_value(json!({
            "asn": 64511,
            "name": "Sparse Networks"
        }))
        .unwrap();

        let profile = profile_from(&network);
        assert_eq!(profile.irr_as_set, "");
        assert!(profile.prefix_limit_v4.is_none());
        assert!(profile.announced_prefixes_v6.is_none());
        assert!(profile.website.is_none());
    }
}
