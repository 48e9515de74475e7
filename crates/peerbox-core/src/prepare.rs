//! Assembly of write-ready sessions from actionable candidates.

use crate::gateway::InventoryGateway;
use crate::naming::NamingStrategy;
use crate::policy::{select_as_set, PrefixLimits};
use crate::{LocalContext, PreparedSession, Tenant, ValidatedCandidate, PEER_TYPE_IXP};
use ipnet::IpNet;
use std::net::IpAddr;

/// Resolves the local side of one candidate to an address record and the
/// device it is assigned to.
///
/// Any gap (no local address for the family, address unknown to the
/// inventory, address not on a device, lookup failure) leaves the session
/// not ready instead of failing the batch.
async fn resolve_local_context<I: InventoryGateway>(
    inventory: &I,
    local_ip: Option<IpAddr>,
    exchange_name: &str,
) -> Option<LocalContext> {
    let ip = match local_ip {
        Some(ip) => ip,
        None => {
            tracing::warn!(
                "No local address on {} for this family, session not ready",
                exchange_name
            );
            return None;
        }
    };

    let address = match inventory.find_address(ip).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::warn!("Local address {} is not in the inventory, session not ready", ip);
            return None;
        }
        Err(e) => {
            tracing::warn!("Local address lookup for {} failed: {}", ip, e);
            return None;
        }
    };

    let device = match inventory.find_device_site(ip).await {
        Ok(Some(device)) => device,
        Ok(None) => {
            tracing::warn!(
                "Local address {} is not assigned to a device, session not ready",
                ip
            );
            return None;
        }
        Err(e) => {
            tracing::warn!("Device lookup for {} failed: {}", ip, e);
            return None;
        }
    };

    Some(LocalContext { address, device })
}

/// Pure assembly of one prepared session once the local context is known.
///
/// The remote CIDR reuses the local address's prefix length: both sides of
/// an exchange LAN share the subnet, and the registry only publishes the
/// remote side as a bare address.
fn assemble(
    validated: &ValidatedCandidate,
    local: Option<LocalContext>,
    tenant: &Tenant,
    peer_asn: u32,
    limits: &PrefixLimits,
    irr_as_set: &str,
) -> PreparedSession {
    let candidate = &validated.candidate;
    let remote_cidr = local
        .as_ref()
        .and_then(|ctx| IpNet::new(candidate.remote_ip, ctx.address.address.prefix_len()).ok());
    let clean_name = NamingStrategy::StrictAlphanumeric.sanitize(&tenant.name);

    PreparedSession {
        exchange_id: candidate.exchange_id,
        exchange_name: candidate.exchange_name.clone(),
        family: candidate.family,
        remote_ip: candidate.remote_ip,
        remote_record: validated.address.clone(),
        local,
        remote_cidr,
        session_name: tenant.name.clone(),
        session_description: format!(
            "[peer_type={},peer_as={},peer_name={}]",
            PEER_TYPE_IXP, peer_asn, clean_name
        ),
        address_description: format!("{} - {}", tenant.name, candidate.exchange_name),
        prefix_limit: limits.for_family(candidate.family),
        as_set: select_as_set(irr_as_set, candidate.family),
    }
}

/// Builds a prepared session for every candidate, resolving each local
/// context against the inventory.
///
/// Candidates whose local side does not resolve stay in the output as
/// not-ready items so the caller can surface them before execution.
pub async fn prepare_sessions<I: InventoryGateway>(
    inventory: &I,
    validated: &[ValidatedCandidate],
    tenant: &Tenant,
    peer_asn: u32,
    limits: &PrefixLimits,
    irr_as_set: &str,
) -> Vec<PreparedSession> {
    let mut prepared = Vec::with_capacity(validated.len());
    for item in validated {
        let local = resolve_local_context(
            inventory,
            item.candidate.local_ip,
            &item.candidate.exchange_name,
        )
        .await;
        prepared.push(assemble(item, local, tenant, peer_asn, limits, irr_as_set));
    }

    tracing::debug!(
        "Prepared {} sessions, {} ready",
        prepared.len(),
        prepared.iter().filter(|p| p.is_ready()).count()
    );
    prepared
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryInventory;
    use crate::{
        AddressCandidate, AddressFamily, AddressRecord, DeviceSite, ValidationResult,
    };

    fn tenant() -> Tenant {
        Tenant {
            id: 7,
            name: "IT.Gate S.p.A.".to_string(),
            slug: "itgate".to_string(),
        }
    }

    fn validated(remote: &str, local: Option<&str>, exchange: &str) -> ValidatedCandidate {
        let remote_ip: IpAddr = remote.parse().unwrap();
        ValidatedCandidate {
            candidate: AddressCandidate {
                exchange_id: 31,
                exchange_name: exchange.to_string(),
                family: AddressFamily::of(&remote_ip),
                remote_ip,
                local_ip: local.map(|s| s.parse().unwrap()),
            },
            result: ValidationResult {
                exists_in_inventory: false,
                has_covering_subnet: true,
                bgp_session_exists: false,
            },
            address: None,
        }
    }

    fn limits() -> PrefixLimits {
        PrefixLimits { v4: 100, v6: 20 }
    }

    fn seed_local(inventory: &MemoryInventory, cidr: &str) {
        let net: IpNet = cidr.parse().unwrap();
        inventory.add_address(AddressRecord {
            id: 11,
            address: net,
        });
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

    #[tokio::test]
    async fn test_ready_session_inherits_local_mask() {
        let inventory = MemoryInventory::new();
        seed_local(&inventory, "80.81.192.20/22");
        let items = vec![validated(
            "80.81.192.10",
            Some("80.81.192.20"),
            "DE-CIX Frankfurt",
        )];

        let prepared = prepare_sessions(
            &inventory,
            &items,
            &tenant(),
            64511,
            &limits(),
            "AS-EXAMPLE",
        )
        .await;

        assert_eq!(prepared.len(), 1);
        let session = &prepared[0];
        assert!(session.is_ready());
        assert_eq!(
            session.remote_cidr,
            Some("80.81.192.10/22".parse().unwrap())
        );
        assert_eq!(session.local.as_ref().unwrap().device.device_name, "edge-fra-1");
        assert_eq!(session.prefix_limit, 100);
        assert_eq!(session.as_set, "AS-EXAMPLE");
    }

    #[tokio::test]
    async fn test_missing_local_address_is_not_ready() {
        let inventory = MemoryInventory::new();
        let items = vec![
            validated("80.81.192.10", None, "DE-CIX Frankfurt"),
            validated("80.249.208.1", Some("80.249.208.99"), "AMS-IX"),
        ];

        let prepared =
            prepare_sessions(&inventory, &items, &tenant(), 64511, &limits(), "").await;

        // first has no local ip, second has one the inventory does not know
        assert_eq!(prepared.len(), 2);
        assert!(!prepared[0].is_ready());
        assert!(!prepared[1].is_ready());
        assert!(prepared[0].remote_cidr.is_none());
    }

    #[tokio::test]
    async fn test_descriptions_and_name() {
        let inventory = MemoryInventory::new();
        seed_local(&inventory, "80.81.192.20/22");
        let items = vec![validated(
            "80.81.192.10",
            Some("80.81.192.20"),
            "DE-CIX Frankfurt",
        )];

        let prepared = prepare_sessions(
            &inventory,
            &items,
            &tenant(),
            64511,
            &limits(),
            "AS-EXAMPLE AS-EXAMPLE-V6",
        )
        .await;

        let session = &prepared[0];
        assert_eq!(session.session_name, "IT.Gate S.p.A.");
        assert_eq!(
            session.session_description,
            "[peer_type=peer_ixp,peer_as=64511,peer_name=ITGateSpA]"
        );
        assert_eq!(
            session.address_description,
            "IT.Gate S.p.A. - DE-CIX Frankfurt"
        );
        assert_eq!(session.as_set, "AS-EXAMPLE");
    }

    #[tokio::test]
    async fn test_v6_candidate_uses_v6_limit_and_as_set() {
        let inventory = MemoryInventory::new();
        seed_local(&inventory, "2001:7f8::20/64");
        let items = vec![validated(
            "2001:7f8::10",
            Some("2001:7f8::20"),
            "DE-CIX Frankfurt",
        )];

        let prepared = prepare_sessions(
            &inventory,
            &items,
            &tenant(),
            64511,
            &limits(),
            "AS-EXAMPLE AS-EXAMPLE-V6",
        )
        .await;

        let session = &prepared[0];
        assert!(session.is_ready());
        assert_eq!(session.remote_cidr, Some("2001:7f8::10/64".parse().unwrap()));
        assert_eq!(session.prefix_limit, 20);
        assert_eq!(session.as_set, "AS-EXAMPLE-V6");
    }

    #[tokio::test]
    async fn test_existing_remote_record_is_carried() {
        let inventory = MemoryInventory::new();
        seed_local(&inventory, "80.81.192.20/22");
        let mut item = validated("80.81.192.10", Some("80.81.192.20"), "DE-CIX Frankfurt");
        item.address = Some(AddressRecord {
            id: 42,
            address: "80.81.192.10/22".parse().unwrap(),
        });

        let prepared =
            prepare_sessions(&inventory, &[item], &tenant(), 64511, &limits(), "").await;

        assert_eq!(prepared[0].remote_record.as_ref().map(|r| r.id), Some(42));
    }
}
