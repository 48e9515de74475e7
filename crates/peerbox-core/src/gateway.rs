//! Gateway traits for the registry and inventory backends.
//!
//! The engine only ever talks to these traits; HTTP clients and in-memory
//! doubles implement them interchangeably. Lookups return `None` for
//! absent data, errors are reserved for transport and write failures.

use crate::error::GatewayResult;
use crate::{
    AddressRecord, AsnProfile, AsnRecord, DeviceSite, ExchangePresence, SessionPayload,
    SessionRecord, SubnetRecord, Tenant,
};
use async_trait::async_trait;
use ipnet::IpNet;
use std::net::IpAddr;

/// Public peering registry (read-only)
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Profile for an ASN, `None` when the registry has no entry
    async fn asn_profile(&self, asn: u32) -> GatewayResult<Option<AsnProfile>>;

    /// All exchange presence records for an ASN
    async fn exchange_presence(&self, asn: u32) -> GatewayResult<Vec<ExchangePresence>>;
}

/// Network source of truth (IPAM, devices, BGP sessions)
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// Address record whose host part matches, regardless of mask
    async fn find_address(&self, ip: IpAddr) -> GatewayResult<Option<AddressRecord>>;

    /// Most specific prefix containing the address
    async fn find_covering_subnet(&self, ip: IpAddr) -> GatewayResult<Option<SubnetRecord>>;

    /// Device and site for an address assigned to a device interface
    async fn find_device_site(&self, ip: IpAddr) -> GatewayResult<Option<DeviceSite>>;

    /// Any BGP session whose remote side is this address
    async fn find_session_by_remote_address(
        &self,
        ip: IpAddr,
    ) -> GatewayResult<Option<SessionRecord>>;

    /// Tenants whose name or slug contains the text, case-insensitive
    async fn find_tenants(&self, text: &str) -> GatewayResult<Vec<Tenant>>;

    /// ASN record owned by a specific tenant
    async fn find_tenant_asn(&self, asn: u32, tenant_id: i64) -> GatewayResult<Option<AsnRecord>>;

    /// ASN record regardless of owner
    async fn find_asn(&self, asn: u32) -> GatewayResult<Option<AsnRecord>>;

    /// BGP peer group id by exact name
    async fn find_peer_group(&self, name: &str) -> GatewayResult<Option<i64>>;

    /// Create an active, tenant-owned address
    async fn create_address(
        &self,
        cidr: IpNet,
        tenant_id: i64,
        description: &str,
    ) -> GatewayResult<AddressRecord>;

    /// Create an active BGP session
    async fn create_session(&self, payload: &SessionPayload) -> GatewayResult<SessionRecord>;
}
