//! In-memory gateways and a scripted decision source (for testing and
//! development).

use crate::decision::{DecisionResult, DecisionSource};
use crate::error::{DecisionError, GatewayError, GatewayResult};
use crate::gateway::{InventoryGateway, RegistryGateway};
use crate::{
    AddressRecord, AsnProfile, AsnRecord, DeviceSite, ExchangePresence, SessionPayload,
    SessionRecord, SubnetRecord, Tenant,
};
use async_trait::async_trait;
use ipnet::IpNet;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory registry gateway
#[derive(Default)]
pub struct MemoryRegistry {
    profiles: RwLock<HashMap<u32, AsnProfile>>,
    presence: RwLock<HashMap<u32, Vec<ExchangePresence>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, profile: AsnProfile) {
        self.profiles.write().insert(profile.asn, profile);
    }

    pub fn add_presence(&self, asn: u32, records: Vec<ExchangePresence>) {
        self.presence.write().insert(asn, records);
    }
}

#[async_trait]
impl RegistryGateway for MemoryRegistry {
    async fn asn_profile(&self, asn: u32) -> GatewayResult<Option<AsnProfile>> {
        Ok(self.profiles.read().get(&asn).cloned())
    }

    async fn exchange_presence(&self, asn: u32) -> GatewayResult<Vec<ExchangePresence>> {
        Ok(self.presence.read().get(&asn).cloned().unwrap_or_default())
    }
}

/// In-memory inventory gateway.
///
/// Created records become visible to later finds, so a whole provisioning
/// run against it behaves like a run against a tiny live inventory.
/// Write failures can be injected per target to exercise error paths.
pub struct MemoryInventory {
    next_id: AtomicI64,
    addresses: RwLock<HashMap<IpAddr, AddressRecord>>,
    subnets: RwLock<Vec<SubnetRecord>>,
    device_sites: RwLock<HashMap<IpAddr, DeviceSite>>,
    /// (remote address id, session)
    sessions: RwLock<Vec<(i64, SessionRecord)>>,
    tenants: RwLock<Vec<Tenant>>,
    /// (record, owning tenant)
    asns: RwLock<Vec<(AsnRecord, Option<i64>)>>,
    peer_groups: RwLock<HashMap<String, i64>>,
    created_sessions: RwLock<Vec<SessionPayload>>,
    fail_address_creates: RwLock<Vec<IpAddr>>,
    fail_session_creates: RwLock<Vec<i64>>,
}

impl Default for MemoryInventory {
    fn default() -> Self {
        Self {
            // seeded fixtures use small ids, generated ones start high
            next_id: AtomicI64::new(1000),
            addresses: RwLock::new(HashMap::new()),
            subnets: RwLock::new(Vec::new()),
            device_sites: RwLock::new(HashMap::new()),
            sessions: RwLock::new(Vec::new()),
            tenants: RwLock::new(Vec::new()),
            asns: RwLock::new(Vec::new()),
            peer_groups: RwLock::new(HashMap::new()),
            created_sessions: RwLock::new(Vec::new()),
            fail_address_creates: RwLock::new(Vec::new()),
            fail_session_creates: RwLock::new(Vec::new()),
        }
    }
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_address(&self, record: AddressRecord) {
        self.addresses.write().insert(record.address.addr(), record);
    }

    pub fn add_subnet(&self, record: SubnetRecord) {
        self.subnets.write().push(record);
    }

    pub fn add_device_site(&self, ip: IpAddr, context: DeviceSite) {
        self.device_sites.write().insert(ip, context);
    }

    pub fn add_session(&self, remote_address_id: i64, record: SessionRecord) {
        self.sessions.write().push((remote_address_id, record));
    }

    pub fn add_tenant(&self, tenant: Tenant) {
        self.tenants.write().push(tenant);
    }

    pub fn add_asn(&self, record: AsnRecord, tenant_id: Option<i64>) {
        self.asns.write().push((record, tenant_id));
    }

    pub fn add_peer_group(&self, name: &str, id: i64) {
        self.peer_groups.write().insert(name.to_string(), id);
    }

    /// Make the next create of this address fail
    pub fn fail_address_create(&self, ip: IpAddr) {
        self.fail_address_creates.write().push(ip);
    }

    /// Make session creates referencing this remote address id fail
    pub fn fail_session_create(&self, remote_address_id: i64) {
        self.fail_session_creates.write().push(remote_address_id);
    }

    /// Payloads of every session written so far
    pub fn created_sessions(&self) -> Vec<SessionPayload> {
        self.created_sessions.read().clone()
    }
}

#[async_trait]
impl InventoryGateway for MemoryInventory {
    async fn find_address(&self, ip: IpAddr) -> GatewayResult<Option<AddressRecord>> {
        Ok(self.addresses.read().get(&ip).cloned())
    }

    async fn find_covering_subnet(&self, ip: IpAddr) -> GatewayResult<Option<SubnetRecord>> {
        let subnets = self.subnets.read();
        let mut best: Option<&SubnetRecord> = None;
        for subnet in subnets.iter() {
            if subnet.prefix.contains(&ip)
                && best.map_or(true, |b| subnet.prefix.prefix_len() > b.prefix.prefix_len())
            {
                best = Some(subnet);
            }
        }
        Ok(best.cloned())
    }

    async fn find_device_site(&self, ip: IpAddr) -> GatewayResult<Option<DeviceSite>> {
        Ok(self.device_sites.read().get(&ip).cloned())
    }

    async fn find_session_by_remote_address(
        &self,
        ip: IpAddr,
    ) -> GatewayResult<Option<SessionRecord>> {
        let address_id = match self.addresses.read().get(&ip) {
            Some(record) => record.id,
            None => return Ok(None),
        };
        Ok(self
            .sessions
            .read()
            .iter()
            .find(|(remote_id, _)| *remote_id == address_id)
            .map(|(_, session)| session.clone()))
    }

    async fn find_tenants(&self, text: &str) -> GatewayResult<Vec<Tenant>> {
        let needle = text.to_lowercase();
        Ok(self
            .tenants
            .read()
            .iter()
            .filter(|t| {
                t.name.to_lowercase().contains(&needle) || t.slug.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn find_tenant_asn(&self, asn: u32, tenant_id: i64) -> GatewayResult<Option<AsnRecord>> {
        Ok(self
            .asns
            .read()
            .iter()
            .find(|(record, owner)| record.asn == asn && *owner == Some(tenant_id))
            .map(|(record, _)| record.clone()))
    }

    async fn find_asn(&self, asn: u32) -> GatewayResult<Option<AsnRecord>> {
        Ok(self
            .asns
            .read()
            .iter()
            .find(|(record, _)| record.asn == asn)
            .map(|(record, _)| record.clone()))
    }

    async fn find_peer_group(&self, name: &str) -> GatewayResult<Option<i64>> {
        Ok(self.peer_groups.read().get(name).copied())
    }

    async fn create_address(
        &self,
        cidr: IpNet,
        _tenant_id: i64,
        _description: &str,
    ) -> GatewayResult<AddressRecord> {
        if self.fail_address_creates.read().contains(&cidr.addr()) {
            return Err(GatewayError::Create {
                what: "ip address".to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let record = AddressRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            address: cidr,
        };
        self.addresses.write().insert(cidr.addr(), record.clone());
        Ok(record)
    }

    async fn create_session(&self, payload: &SessionPayload) -> GatewayResult<SessionRecord> {
        if self
            .fail_session_creates
            .read()
            .contains(&payload.remote_address_id)
        {
            return Err(GatewayError::Create {
                what: "bgp session".to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let record = SessionRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: payload.name.clone(),
        };
        self.sessions
            .write()
            .push((payload.remote_address_id, record.clone()));
        self.created_sessions.write().push(payload.clone());
        Ok(record)
    }
}

/// Inventory double whose every call fails (for error-path tests)
pub struct FailingInventory;

#[async_trait]
impl InventoryGateway for FailingInventory {
    async fn find_address(&self, _ip: IpAddr) -> GatewayResult<Option<AddressRecord>> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn find_covering_subnet(&self, _ip: IpAddr) -> GatewayResult<Option<SubnetRecord>> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn find_device_site(&self, _ip: IpAddr) -> GatewayResult<Option<DeviceSite>> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn find_session_by_remote_address(
        &self,
        _ip: IpAddr,
    ) -> GatewayResult<Option<SessionRecord>> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn find_tenants(&self, _text: &str) -> GatewayResult<Vec<Tenant>> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn find_tenant_asn(&self, _asn: u32, _tenant_id: i64) -> GatewayResult<Option<AsnRecord>> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn find_asn(&self, _asn: u32) -> GatewayResult<Option<AsnRecord>> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn find_peer_group(&self, _name: &str) -> GatewayResult<Option<i64>> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn create_address(
        &self,
        _cidr: IpNet,
        _tenant_id: i64,
        _description: &str,
    ) -> GatewayResult<AddressRecord> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }

    async fn create_session(&self, _payload: &SessionPayload) -> GatewayResult<SessionRecord> {
        Err(GatewayError::Transport("inventory offline".to_string()))
    }
}

/// Canned operator replies, consumed in order
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Confirm(bool),
    Limit(Option<u32>),
    Term(Option<String>),
    Index(usize),
}

/// Decision source that replays a fixed script
pub struct ScriptedDecisions {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedDecisions {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn next(&self) -> DecisionResult<ScriptedReply> {
        self.replies.lock().pop_front().ok_or(DecisionError::Closed)
    }
}

#[async_trait]
impl DecisionSource for ScriptedDecisions {
    async fn confirm(&self, _prompt: &str, _default_yes: bool) -> DecisionResult<bool> {
        match self.next()? {
            ScriptedReply::Confirm(value) => Ok(value),
            other => Err(DecisionError::Read(format!(
                "expected a confirm reply, got {:?}",
                other
            ))),
        }
    }

    async fn manual_limit(&self, _prompt: &str) -> DecisionResult<Option<u32>> {
        match self.next()? {
            ScriptedReply::Limit(value) => Ok(value),
            other => Err(DecisionError::Read(format!(
                "expected a limit reply, got {:?}",
                other
            ))),
        }
    }

    async fn search_term(&self, _prompt: &str) -> DecisionResult<Option<String>> {
        match self.next()? {
            ScriptedReply::Term(value) => Ok(value),
            other => Err(DecisionError::Read(format!(
                "expected a term reply, got {:?}",
                other
            ))),
        }
    }

    async fn pick_index(&self, _prompt: &str, _len: usize) -> DecisionResult<usize> {
        match self.next()? {
            ScriptedReply::Index(value) => Ok(value),
            other => Err(DecisionError::Read(format!(
                "expected an index reply, got {:?}",
                other
            ))),
        }
    }
}
