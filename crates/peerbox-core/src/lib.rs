//! Peerbox Provisioning Engine
//!
//! Turns "two autonomous system numbers" into a validated, deduplicated set
//! of IP address and BGP session records ready to be written to the network
//! source of truth. Registry and inventory backends are injected behind
//! gateway traits; every interactive choice goes through a decision source.

pub mod decision;
pub mod error;
pub mod execute;
pub mod gateway;
pub mod intersect;
pub mod mock;
pub mod naming;
pub mod policy;
pub mod prepare;
pub mod tenant;
pub mod validate;
pub mod workflow;

pub use decision::*;
pub use error::*;
pub use execute::*;
pub use gateway::*;
pub use intersect::*;
pub use mock::*;
pub use naming::*;
pub use policy::*;
pub use prepare::*;
pub use tenant::*;
pub use validate::*;
pub use workflow::*;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Default inventory peer group for IXP sessions
pub const DEFAULT_PEER_GROUP: &str = "Peering - IXP";

/// Peer type tag written into every session's structured fields
pub const PEER_TYPE_IXP: &str = "peer_ixp";

/// Address family of a peering candidate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Family of a concrete address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Inventory tag used by the session address-family field
    pub fn tag(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "4u",
            AddressFamily::V6 => "6u",
        }
    }
}

/// Registry profile for an autonomous system.
///
/// The registry publishes two prefix-count fields per family: an explicit
/// limit and an announced-route estimate. Both are kept so the policy
/// stage owns the fallback between them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AsnProfile {
    pub asn: u32,
    pub name: String,
    pub website: Option<String>,
    /// Raw space-separated AS-SET token list, may be empty
    pub irr_as_set: String,
    pub prefix_limit_v4: Option<u32>,
    pub prefix_limit_v6: Option<u32>,
    pub announced_prefixes_v4: Option<u32>,
    pub announced_prefixes_v6: Option<u32>,
}

/// One (ASN, exchange) presence record from the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExchangePresence {
    pub exchange_id: u32,
    pub exchange_name: String,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

/// An exchange where both the operator and the peer are present
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommonExchangeMatch {
    pub exchange_id: u32,
    pub exchange_name: String,
    pub local_ipv4: Option<Ipv4Addr>,
    pub local_ipv6: Option<Ipv6Addr>,
    pub remote_ipv4: Option<Ipv4Addr>,
    pub remote_ipv6: Option<Ipv6Addr>,
}

/// One concrete remote address extracted from a common-exchange match.
///
/// The local side for the same family may be absent; such candidates are
/// still validated but cannot become ready sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressCandidate {
    pub exchange_id: u32,
    pub exchange_name: String,
    pub family: AddressFamily,
    pub remote_ip: IpAddr,
    pub local_ip: Option<IpAddr>,
}

/// Inventory state of one candidate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub exists_in_inventory: bool,
    pub has_covering_subnet: bool,
    pub bgp_session_exists: bool,
}

impl ValidationResult {
    /// A candidate needs work when a subnet covers it and no session exists
    pub fn is_actionable(&self) -> bool {
        self.has_covering_subnet && !self.bgp_session_exists
    }
}

/// Candidate plus its validation outcome and any found address record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidatedCandidate {
    pub candidate: AddressCandidate,
    pub result: ValidationResult,
    pub address: Option<AddressRecord>,
}

/// Inventory tenant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Inventory IP address record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressRecord {
    pub id: i64,
    pub address: IpNet,
}

/// Inventory prefix record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubnetRecord {
    pub id: i64,
    pub prefix: IpNet,
}

/// Device and site an address is assigned to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSite {
    pub device_id: i64,
    pub device_name: String,
    pub site_id: i64,
    pub site_name: String,
}

/// Inventory BGP session record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: i64,
    pub name: String,
}

/// Inventory ASN record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AsnRecord {
    pub id: i64,
    pub asn: u32,
}

/// Resolved local side of a session: address record plus device and site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalContext {
    pub address: AddressRecord,
    pub device: DeviceSite,
}

/// Per-run session options gathered from the operator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionOptions {
    /// Keep the inventory session synchronized from the registry
    pub sync_from_registry: bool,
    pub md5_key: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sync_from_registry: true,
            md5_key: None,
        }
    }
}

/// Everything resolved once per run and shared by all session writes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionContext {
    pub tenant: Tenant,
    pub local_as: AsnRecord,
    pub peer_as: AsnRecord,
    pub peer_group_id: i64,
    pub options: SessionOptions,
}

/// A fully parameterized session, ready to write when the local side
/// resolved to a device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreparedSession {
    pub exchange_id: u32,
    pub exchange_name: String,
    pub family: AddressFamily,
    pub remote_ip: IpAddr,
    /// Existing inventory record for the remote address, if validation found one
    pub remote_record: Option<AddressRecord>,
    /// None when the local address is missing or not assigned to a device
    pub local: Option<LocalContext>,
    /// Remote address with the local side's prefix length
    pub remote_cidr: Option<IpNet>,
    pub session_name: String,
    pub session_description: String,
    pub address_description: String,
    pub prefix_limit: u32,
    pub as_set: String,
}

impl PreparedSession {
    /// Ready sessions have a resolved local context and a derived CIDR
    pub fn is_ready(&self) -> bool {
        self.local.is_some() && self.remote_cidr.is_some()
    }
}

/// Write-ready session payload handed to the inventory gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionPayload {
    pub name: String,
    pub site_id: i64,
    pub device_id: i64,
    pub local_address_id: i64,
    pub remote_address_id: i64,
    pub local_as_id: i64,
    pub remote_as_id: i64,
    pub tenant_id: i64,
    pub peer_group_id: i64,
    pub address_family: AddressFamily,
    /// Empty string means "no AS-SET", the field is omitted on write
    pub as_set: String,
    /// Zero means "no enforced limit", the field is omitted on write
    pub prefix_limit: u32,
    pub sync_from_registry: bool,
    pub md5_key: Option<String>,
    pub description: String,
}

/// Terminal state of one executed item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Local context unresolved, nothing written
    NotReady,
    /// Remote address creation failed, session step skipped
    AddressFailed { error: String },
    /// Address in place but the session write failed; the address is kept
    SessionFailed { address_id: i64, error: String },
    /// Session written
    Created {
        address_id: i64,
        session_id: i64,
        /// Whether the remote address was created by this run
        address_created: bool,
    },
}

/// Outcome of one prepared session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemReport {
    pub exchange_name: String,
    pub remote_ip: IpAddr,
    pub outcome: ItemOutcome,
}

/// Accumulated outcomes of an execution batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionReport {
    pub items: Vec<ItemReport>,
}

impl ExecutionReport {
    pub fn created_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Created { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| {
                matches!(
                    i.outcome,
                    ItemOutcome::AddressFailed { .. } | ItemOutcome::SessionFailed { .. }
                )
            })
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::NotReady))
            .count()
    }

    /// True when nothing failed (skipped items are not failures)
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }
}
