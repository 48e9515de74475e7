//! Inventory validation of remote address candidates.
//!
//! One read-only pass per candidate: does the address exist, does a
//! subnet cover it, does a session already use it. Lookup failures are
//! logged and degrade to "not found" so a flaky backend never aborts
//! the whole batch.

use crate::gateway::InventoryGateway;
use crate::{AddressCandidate, ValidatedCandidate, ValidationResult};

/// Validate candidates in order against the inventory. No writes.
pub async fn validate_candidates<I: InventoryGateway>(
    inventory: &I,
    candidates: &[AddressCandidate],
) -> Vec<ValidatedCandidate> {
    let mut validated = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        validated.push(validate_one(inventory, candidate).await);
    }
    validated
}

async fn validate_one<I: InventoryGateway>(
    inventory: &I,
    candidate: &AddressCandidate,
) -> ValidatedCandidate {
    let address = match inventory.find_address(candidate.remote_ip).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(
                "address lookup for {} failed ({}), treating as missing",
                candidate.remote_ip,
                e
            );
            None
        }
    };

    let result = if address.is_some() {
        let bgp_session_exists = match inventory
            .find_session_by_remote_address(candidate.remote_ip)
            .await
        {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(
                    "session lookup for {} failed ({}), treating as missing",
                    candidate.remote_ip,
                    e
                );
                false
            }
        };
        ValidationResult {
            exists_in_inventory: true,
            has_covering_subnet: true,
            bgp_session_exists,
        }
    } else {
        let has_covering_subnet = match inventory.find_covering_subnet(candidate.remote_ip).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(
                    "subnet lookup for {} failed ({}), treating as missing",
                    candidate.remote_ip,
                    e
                );
                false
            }
        };
        ValidationResult {
            exists_in_inventory: false,
            has_covering_subnet,
            bgp_session_exists: false,
        }
    };

    tracing::debug!(
        "{} at {}: exists={} subnet={} session={}",
        candidate.remote_ip,
        candidate.exchange_name,
        result.exists_in_inventory,
        result.has_covering_subnet,
        result.bgp_session_exists
    );

    ValidatedCandidate {
        candidate: candidate.clone(),
        result,
        address,
    }
}

/// Subset that needs work: a covering subnet exists and no session does.
pub fn actionable(validated: &[ValidatedCandidate]) -> Vec<ValidatedCandidate> {
    validated
        .iter()
        .filter(|v| v.result.is_actionable())
        .cloned()
        .collect()
}
