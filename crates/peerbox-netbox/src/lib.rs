//! NetBox Inventory Gateway
//!
//! Implements the inventory gateway against the NetBox REST API, with BGP
//! sessions and peer groups served by the netbox-bgp plugin endpoints.

use async_trait::async_trait;
use ipnet::IpNet;
use peerbox_core::{
    AddressRecord, AsnRecord, DeviceSite, GatewayError, GatewayResult, InventoryGateway,
    SessionPayload, SessionRecord, SubnetRecord, Tenant, PEER_TYPE_IXP,
};
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// NetBox REST client
pub struct NetBoxClient {
    client: Client,
    base_url: String,
    token: String,
}

impl NetBoxClient {
    /// Create a new NetBox client for the given instance URL and API token
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Make an authenticated GET request
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::Auth(format!(
                "NetBox rejected the token ({})",
                status
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(format!("{}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Make an authenticated POST request
    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        what: &str,
        body: &serde_json::Value,
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Token {}", self.token))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::Auth(format!(
                "NetBox rejected the token ({})",
                status
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Create {
                what: what.to_string(),
                reason: format!("{}: {}", status, text),
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl InventoryGateway for NetBoxClient {
    async fn find_address(&self, ip: IpAddr) -> GatewayResult<Option<AddressRecord>> {
        let list: NbList<NbIpAddress> = self
            .get_json("/api/ipam/ip-addresses/", &[("address", ip.to_string())])
            .await?;
        list.results.first().map(address_record).transpose()
    }

    async fn find_covering_subnet(&self, ip: IpAddr) -> GatewayResult<Option<SubnetRecord>> {
        let list: NbList<NbPrefix> = self
            .get_json("/api/ipam/prefixes/", &[("contains", ip.to_string())])
            .await?;

        // longest mask wins, first listed among equals
        let mut best: Option<SubnetRecord> = None;
        for item in &list.results {
            let prefix: IpNet = item.prefix.parse().map_err(|_| {
                GatewayError::Decode(format!("bad inventory prefix '{}'", item.prefix))
            })?;
            if best
                .as_ref()
                .map_or(true, |b| prefix.prefix_len() > b.prefix.prefix_len())
            {
                best = Some(SubnetRecord {
                    id: item.id,
                    prefix,
                });
            }
        }
        Ok(best)
    }

    async fn find_device_site(&self, ip: IpAddr) -> GatewayResult<Option<DeviceSite>> {
        let list: NbList<NbIpAddress> = self
            .get_json("/api/ipam/ip-addresses/", &[("address", ip.to_string())])
            .await?;

        // addresses on virtual machine interfaces carry no device
        let device_ref = match list
            .results
            .first()
            .and_then(|a| a.assigned_object.as_ref())
            .and_then(|o| o.device.as_ref())
        {
            Some(device) => device,
            None => return Ok(None),
        };

        let device: NbDevice = self
            .get_json(&format!("/api/dcim/devices/{}/", device_ref.id), &[])
            .await?;
        Ok(Some(DeviceSite {
            device_id: device.id,
            device_name: device.name.unwrap_or_default(),
            site_id: device.site.id,
            site_name: device.site.name.unwrap_or_default(),
        }))
    }

    async fn find_session_by_remote_address(
        &self,
        ip: IpAddr,
    ) -> GatewayResult<Option<SessionRecord>> {
        let address = match self.find_address(ip).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        let list: NbList<NbSession> = self
            .get_json(
                "/api/plugins/bgp/session/",
                &[("remote_address_id", address.id.to_string())],
            )
            .await?;
        Ok(list.results.first().map(|s| SessionRecord {
            id: s.id,
            name: s.name.clone().unwrap_or_default(),
        }))
    }

    async fn find_tenants(&self, text: &str) -> GatewayResult<Vec<Tenant>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let list: NbList<NbTenant> = self
            .get_json("/api/tenancy/tenants/", &[("q", text.to_string())])
            .await?;

        // the q search also matches descriptions; keep only name/slug hits
        let needle = text.to_lowercase();
        Ok(list
            .results
            .into_iter()
            .filter(|t| {
                t.name.to_lowercase().contains(&needle) || t.slug.to_lowercase().contains(&needle)
            })
            .map(|t| Tenant {
                id: t.id,
                name: t.name,
                slug: t.slug,
            })
            .collect())
    }

    async fn find_tenant_asn(&self, asn: u32, tenant_id: i64) -> GatewayResult<Option<AsnRecord>> {
        let list: NbList<NbAsn> = self
            .get_json(
                "/api/ipam/asns/",
                &[("asn", asn.to_string()), ("tenant_id", tenant_id.to_string())],
            )
            .await?;
        Ok(list.results.first().map(|a| AsnRecord {
            id: a.id,
            asn: a.asn,
        }))
    }

    async fn find_asn(&self, asn: u32) -> GatewayResult<Option<AsnRecord>> {
        let list: NbList<NbAsn> = self
            .get_json("/api/ipam/asns/", &[("asn", asn.to_string())])
            .await?;
        Ok(list.results.first().map(|a| AsnRecord {
            id: a.id,
            asn: a.asn,
        }))
    }

    async fn find_peer_group(&self, name: &str) -> GatewayResult<Option<i64>> {
        let list: NbList<NbPeerGroup> = self
            .get_json("/api/plugins/bgp/peer-group/", &[("name", name.to_string())])
            .await?;
        Ok(list.results.first().map(|g| g.id))
    }

    async fn create_address(
        &self,
        cidr: IpNet,
        tenant_id: i64,
        description: &str,
    ) -> GatewayResult<AddressRecord> {
        let body = serde_json::json!({
            "address": cidr.to_string(),
            "status": "active",
            "tenant": tenant_id,
            "description": description,
        });
        let created: NbIpAddress = self
            .post_json("/api/ipam/ip-addresses/", "ip address", &body)
            .await?;
        address_record(&created)
    }

    async fn create_session(&self, payload: &SessionPayload) -> GatewayResult<SessionRecord> {
        let body = session_body(payload);
        let created: NbSession = self
            .post_json("/api/plugins/bgp/session/", "bgp session", &body)
            .await?;
        Ok(SessionRecord {
            id: created.id,
            name: created.name.clone().unwrap_or_default(),
        })
    }
}

/// Builds the netbox-bgp session payload.
///
/// Optional custom fields follow the plugin's conventions: an empty AS-SET,
/// a zero prefix limit and an unset MD5 key are omitted entirely instead of
/// written as empty values.
fn session_body(payload: &SessionPayload) -> serde_json::Value {
    let mut custom_fields = serde_json::json!({
        "address_family": payload.address_family.tag(),
        "peer_type": PEER_TYPE_IXP,
        "sync_from_pdb": payload.sync_from_registry,
        "bfd": false,
        "drained": false,
        "gtsm": false,
        "hide_peer_ip": false,
        "localpref": 100,
        "origin_as_filter_mode": "disable",
        "rtbh_filter": true,
    });

    if !payload.as_set.is_empty() {
        custom_fields["as_set"] = serde_json::Value::String(payload.as_set.clone());
    }
    if payload.prefix_limit > 0 {
        custom_fields["prefix_limit"] = serde_json::Value::from(payload.prefix_limit);
    }
    if let Some(key) = &payload.md5_key {
        if !key.is_empty() {
            custom_fields["md5"] = serde_json::Value::String(key.clone());
        }
    }

    serde_json::json!({
        "name": payload.name,
        "status": "active",
        "site": payload.site_id,
        "device": payload.device_id,
        "local_address": payload.local_address_id,
        "remote_address": payload.remote_address_id,
        "local_as": payload.local_as_id,
        "remote_as": payload.remote_as_id,
        "tenant": payload.tenant_id,
        "peer_group": payload.peer_group_id,
        "description": payload.description,
        "custom_fields": custom_fields,
    })
}

fn address_record(record: &NbIpAddress) -> GatewayResult<AddressRecord> {
    let address: IpNet = record.address.parse().map_err(|_| {
        GatewayError::Decode(format!("bad inventory address '{}'", record.address))
    })?;
    Ok(AddressRecord {
        id: record.id,
        address,
    })
}

// ============================================================================
// API response types
// ============================================================================

/// Paginated NetBox list response
#[derive(Debug, Deserialize)]
struct NbList<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct NbRef {
    id: i64,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NbIpAddress {
    id: i64,
    address: String,
    assigned_object: Option<NbAssignedObject>,
}

/// Interface an address is bound to; only device interfaces carry a device
#[derive(Debug, Deserialize)]
struct NbAssignedObject {
    device: Option<NbRef>,
}

#[derive(Debug, Deserialize)]
struct NbDevice {
    id: i64,
    name: Option<String>,
    site: NbRef,
}

#[derive(Debug, Deserialize)]
struct NbPrefix {
    id: i64,
    prefix: String,
}

#[derive(Debug, Deserialize)]
struct NbTenant {
    id: i64,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct NbAsn {
    id: i64,
    asn: u32,
}

#[derive(Debug, Deserialize)]
struct NbSession {
    id: i64,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NbPeerGroup {
    id: i64,
}

// ============================================================================
// Tests
// ============================================================================
