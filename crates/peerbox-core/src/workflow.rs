//! Staged provisioning workflow over injected gateways.
//!
//! The workflow exposes one method per stage instead of a single run loop so
//! the presentation layer can render results and collect selections between
//! stages. Nothing is written to the inventory before [`execute`].
//!
//! [`execute`]: ProvisioningWorkflow::execute

use crate::decision::DecisionSource;
use crate::error::{AbortReason, WorkflowError, WorkflowResult};
use crate::execute::execute_sessions;
use crate::gateway::{InventoryGateway, RegistryGateway};
use crate::intersect::common_exchanges;
use crate::policy::{resolve_prefix_limits, PrefixLimits};
use crate::prepare::prepare_sessions;
use crate::tenant::{resolve_tenant, TenantState};
use crate::validate::validate_candidates;
use crate::{
    AddressCandidate, AsnProfile, AsnRecord, CommonExchangeMatch, ExecutionReport,
    PreparedSession, ProvisionContext, Tenant, ValidatedCandidate, DEFAULT_PEER_GROUP,
};

/// Per-invocation settings for a provisioning run
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// The operator's own AS number
    pub operator_asn: u32,
    /// Inventory peer-group name new sessions attach to
    pub peer_group: String,
}

impl WorkflowConfig {
    pub fn new(operator_asn: u32) -> Self {
        Self {
            operator_asn,
            peer_group: DEFAULT_PEER_GROUP.to_string(),
        }
    }

    pub fn with_peer_group(mut self, name: &str) -> Self {
        self.peer_group = name.to_string();
        self
    }
}

/// Inventory records resolved before the first write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub peer_group_id: i64,
    pub local_as: AsnRecord,
    pub peer_as: AsnRecord,
}

/// Drives one provisioning run against a registry, an inventory and a
/// decision source, all borrowed for the duration of the run.
pub struct ProvisioningWorkflow<'a, R, I, D> {
    registry: &'a R,
    inventory: &'a I,
    decisions: &'a D,
    config: WorkflowConfig,
}

impl<'a, R, I, D> ProvisioningWorkflow<'a, R, I, D>
where
    R: RegistryGateway,
    I: InventoryGateway,
    D: DecisionSource,
{
    pub fn new(registry: &'a R, inventory: &'a I, decisions: &'a D, config: WorkflowConfig) -> Self {
        Self {
            registry,
            inventory,
            decisions,
            config,
        }
    }

    /// Registry profile of the peer, if the registry knows the ASN
    pub async fn peer_profile(&self, asn: u32) -> WorkflowResult<Option<AsnProfile>> {
        self.registry
            .asn_profile(asn)
            .await
            .map_err(WorkflowError::Registry)
    }

    /// Exchanges where both the operator and the peer are present
    pub async fn common_exchanges(
        &self,
        peer_asn: u32,
    ) -> WorkflowResult<Vec<CommonExchangeMatch>> {
        let remote = self
            .registry
            .exchange_presence(peer_asn)
            .await
            .map_err(WorkflowError::Registry)?;
        let local = self
            .registry
            .exchange_presence(self.config.operator_asn)
            .await
            .map_err(WorkflowError::Registry)?;
        Ok(common_exchanges(&local, &remote))
    }

    /// Per-family prefix limits, falling back to operator-entered values
    /// when the registry publishes none
    pub async fn resolve_limits(&self, profile: &AsnProfile) -> WorkflowResult<PrefixLimits> {
        Ok(resolve_prefix_limits(profile, self.decisions).await?)
    }

    /// Inventory state of every candidate; lookup failures degrade the
    /// result instead of stopping the run
    pub async fn validate(&self, candidates: &[AddressCandidate]) -> Vec<ValidatedCandidate> {
        validate_candidates(self.inventory, candidates).await
    }

    /// Runs the tenant search conversation until confirmed or abandoned
    pub async fn resolve_tenant(&self, initial_term: &str) -> WorkflowResult<Tenant> {
        match resolve_tenant(self.inventory, self.decisions, initial_term).await? {
            TenantState::Confirmed(tenant) => Ok(tenant),
            _ => Err(WorkflowError::Aborted(AbortReason::TenantSearch)),
        }
    }

    /// Resolves everything execution needs before the first write.
    ///
    /// A peer ASN not yet assigned to the tenant asks the operator to create
    /// it out of band and re-checks on confirmation; declining aborts with
    /// nothing written.
    pub async fn preflight(&self, tenant: &Tenant, peer_asn: u32) -> WorkflowResult<Preflight> {
        let peer_group_id = self
            .inventory
            .find_peer_group(&self.config.peer_group)
            .await
            .map_err(WorkflowError::Inventory)?
            .ok_or_else(|| WorkflowError::MissingPeerGroup(self.config.peer_group.clone()))?;

        let local_as = self
            .inventory
            .find_asn(self.config.operator_asn)
            .await
            .map_err(WorkflowError::Inventory)?
            .ok_or(WorkflowError::MissingOperatorAsn(self.config.operator_asn))?;

        let peer_as = loop {
            let found = self
                .inventory
                .find_tenant_asn(peer_asn, tenant.id)
                .await
                .map_err(WorkflowError::Inventory)?;
            if let Some(record) = found {
                break record;
            }

            tracing::warn!("AS{} is not assigned to tenant '{}'", peer_asn, tenant.name);
            let retry = self
                .decisions
                .confirm(
                    &format!(
                        "AS{} is not assigned to tenant '{}'. Create it in the inventory, then re-check?",
                        peer_asn, tenant.name
                    ),
                    true,
                )
                .await?;
            if !retry {
                return Err(WorkflowError::Aborted(AbortReason::PeerAsnMissing));
            }
        };

        Ok(Preflight {
            peer_group_id,
            local_as,
            peer_as,
        })
    }

    /// Builds write-ready sessions for the given candidates
    pub async fn prepare(
        &self,
        validated: &[ValidatedCandidate],
        tenant: &Tenant,
        peer_asn: u32,
        limits: &PrefixLimits,
        irr_as_set: &str,
    ) -> Vec<PreparedSession> {
        prepare_sessions(
            self.inventory,
            validated,
            tenant,
            peer_asn,
            limits,
            irr_as_set,
        )
        .await
    }

    /// Last gate before any write; the default answer is no
    pub async fn confirm_apply(&self, prompt: &str) -> WorkflowResult<()> {
        if self.decisions.confirm(prompt, false).await? {
            Ok(())
        } else {
            Err(WorkflowError::Aborted(AbortReason::ApplyDeclined))
        }
    }

    /// Writes the batch and reports every per-item outcome
    pub async fn execute(
        &self,
        context: &ProvisionContext,
        prepared: &[PreparedSession],
    ) -> ExecutionReport {
        execute_sessions(self.inventory, context, prepared).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::expand_candidates;
    use crate::mock::{MemoryInventory, MemoryRegistry, ScriptedDecisions, ScriptedReply};
    use crate::validate::actionable;
    use crate::{
        AddressRecord, DeviceSite, ExchangePresence, SessionOptions, SubnetRecord,
    };

    fn peer_profile() -> AsnProfile {
        AsnProfile {
            asn: 64511,
            name: "Peer Networks".to_string(),
            website: Some("https://peer.example".to_string()),
            irr_as_set: "AS-PEER AS-PEER-V6".to_string(),
            prefix_limit_v4: Some(100),
            prefix_limit_v6: Some(20),
            announced_prefixes_v4: Some(80),
            announced_prefixes_v6: Some(15),
        }
    }

    fn seeded_registry() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.add_profile(peer_profile());
        registry.add_presence(
            64511,
            vec![
                ExchangePresence {
                    exchange_id: 31,
                    exchange_name: "DE-CIX Frankfurt".to_string(),
                    ipv4: Some("80.81.192.10".parse().unwrap()),
                    ipv6: Some("2001:7f8::10".parse().unwrap()),
                },
                ExchangePresence {
                    exchange_id: 90,
                    exchange_name: "LONAP".to_string(),
                    ipv4: Some("5.57.80.1".parse().unwrap()),
                    ipv6: None,
                },
            ],
        );
        registry.add_presence(
            64496,
            vec![ExchangePresence {
                exchange_id: 31,
                exchange_name: "DE-CIX Frankfurt".to_string(),
                ipv4: Some("80.81.192.20".parse().unwrap()),
                ipv6: Some("2001:7f8::20".parse().unwrap()),
            }],
        );
        registry
    }

    fn seeded_inventory() -> MemoryInventory {
        let inventory = MemoryInventory::new();
        inventory.add_subnet(SubnetRecord {
            id: 1,
            prefix: "80.81.192.0/22".parse().unwrap(),
        });
        inventory.add_subnet(SubnetRecord {
            id: 2,
            prefix: "2001:7f8::/64".parse().unwrap(),
        });
        for (id, cidr) in [(11, "80.81.192.20/22"), (12, "2001:7f8::20/64")] {
            let net: ipnet::IpNet = cidr.parse().unwrap();
            inventory.add_address(AddressRecord { id, address: net });
            inventory.add_device_site(
                net.addr(),
                DeviceSite {
                    device_id: 5,
                    device_name: "edge-fra-1".to_string(),
                    site_id: 3,
                    site_name: "FRA".to_string(),
                },
            );
        }
        inventory.add_tenant(Tenant {
            id: 7,
            name: "Peer Networks".to_string(),
            slug: "peer-networks".to_string(),
        });
        inventory.add_asn(AsnRecord { id: 70, asn: 64496 }, None);
        inventory.add_asn(AsnRecord { id: 71, asn: 64511 }, Some(7));
        inventory.add_peer_group(DEFAULT_PEER_GROUP, 9);
        inventory
    }

    #[tokio::test]
    async fn test_full_run_creates_both_families() {
        let registry = seeded_registry();
        let inventory = seeded_inventory();
        let decisions = ScriptedDecisions::new(vec![
            ScriptedReply::Confirm(true), // tenant
            ScriptedReply::Confirm(true), // apply
        ]);
        let workflow = ProvisioningWorkflow::new(
            &registry,
            &inventory,
            &decisions,
            WorkflowConfig::new(64496),
        );

        let profile = workflow.peer_profile(64511).await.unwrap().unwrap();
        let matches = workflow.common_exchanges(64511).await.unwrap();
        assert_eq!(matches.len(), 1);

        let candidates = expand_candidates(&matches);
        assert_eq!(candidates.len(), 2);

        let limits = workflow.resolve_limits(&profile).await.unwrap();
        assert_eq!(limits.v4, 100);
        assert_eq!(limits.v6, 20);

        let validated = workflow.validate(&candidates).await;
        let todo = actionable(&validated);
        assert_eq!(todo.len(), 2);

        let tenant = workflow.resolve_tenant("peer").await.unwrap();
        assert_eq!(tenant.id, 7);

        let flight = workflow.preflight(&tenant, 64511).await.unwrap();
        assert_eq!(flight.peer_group_id, 9);
        assert_eq!(flight.local_as.id, 70);
        assert_eq!(flight.peer_as.id, 71);

        let prepared = workflow
            .prepare(&todo, &tenant, 64511, &limits, &profile.irr_as_set)
            .await;
        assert!(prepared.iter().all(|p| p.is_ready()));

        workflow.confirm_apply("Apply 2 sessions?").await.unwrap();

        let context = ProvisionContext {
            tenant,
            local_as: flight.local_as,
            peer_as: flight.peer_as,
            peer_group_id: flight.peer_group_id,
            options: SessionOptions::default(),
        };
        let report = workflow.execute(&context, &prepared).await;
        assert_eq!(report.created_count(), 2);
        assert!(report.is_clean());

        let payloads = inventory.created_sessions();
        assert_eq!(payloads.len(), 2);
        assert!(payloads.iter().any(|p| p.as_set == "AS-PEER"));
        assert!(payloads.iter().any(|p| p.as_set == "AS-PEER-V6"));
    }

    #[tokio::test]
    async fn test_preflight_retry_declined_aborts() {
        let registry = seeded_registry();
        let inventory = seeded_inventory();
        let tenant = Tenant {
            id: 8,
            name: "Other Networks".to_string(),
            slug: "other".to_string(),
        };
        // AS64511 is owned by tenant 7, not 8: retry once, then give up
        let decisions = ScriptedDecisions::new(vec![
            ScriptedReply::Confirm(true),
            ScriptedReply::Confirm(false),
        ]);
        let workflow = ProvisioningWorkflow::new(
            &registry,
            &inventory,
            &decisions,
            WorkflowConfig::new(64496),
        );

        let err = workflow.preflight(&tenant, 64511).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Aborted(AbortReason::PeerAsnMissing)
        ));
        assert!(inventory.created_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_preflight_missing_peer_group() {
        let registry = seeded_registry();
        let inventory = MemoryInventory::new();
        let decisions = ScriptedDecisions::empty();
        let workflow = ProvisioningWorkflow::new(
            &registry,
            &inventory,
            &decisions,
            WorkflowConfig::new(64496).with_peer_group("Peering - Custom"),
        );
        let tenant = Tenant {
            id: 7,
            name: "Peer Networks".to_string(),
            slug: "peer-networks".to_string(),
        };

        let err = workflow.preflight(&tenant, 64511).await.unwrap_err();
        match err {
            WorkflowError::MissingPeerGroup(name) => assert_eq!(name, "Peering - Custom"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preflight_missing_operator_asn() {
        let registry = seeded_registry();
        let inventory = MemoryInventory::new();
        inventory.add_peer_group(DEFAULT_PEER_GROUP, 9);
        let decisions = ScriptedDecisions::empty();
        let workflow = ProvisioningWorkflow::new(
            &registry,
            &inventory,
            &decisions,
            WorkflowConfig::new(64496),
        );
        let tenant = Tenant {
            id: 7,
            name: "Peer Networks".to_string(),
            slug: "peer-networks".to_string(),
        };

        let err = workflow.preflight(&tenant, 64511).await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingOperatorAsn(64496)));
    }

    #[tokio::test]
    async fn test_tenant_search_abandoned() {
        let registry = seeded_registry();
        let inventory = seeded_inventory();
        // nothing matches, operator declines to enter a new term
        let decisions = ScriptedDecisions::new(vec![ScriptedReply::Term(None)]);
        let workflow = ProvisioningWorkflow::new(
            &registry,
            &inventory,
            &decisions,
            WorkflowConfig::new(64496),
        );

        let err = workflow.resolve_tenant("nonexistent").await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Aborted(AbortReason::TenantSearch)
        ));
    }

    #[tokio::test]
    async fn test_apply_declined() {
        let registry = seeded_registry();
        let inventory = seeded_inventory();
        let decisions = ScriptedDecisions::new(vec![ScriptedReply::Confirm(false)]);
        let workflow = ProvisioningWorkflow::new(
            &registry,
            &inventory,
            &decisions,
            WorkflowConfig::new(64496),
        );

        let err = workflow.confirm_apply("Apply?").await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Aborted(AbortReason::ApplyDeclined)
        ));
        assert!(inventory.created_sessions().is_empty());
    }
}
