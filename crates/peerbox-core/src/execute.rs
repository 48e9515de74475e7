//! Sequential write phase: remote addresses first, then BGP sessions.

use crate::gateway::InventoryGateway;
use crate::{
    ExecutionReport, ItemOutcome, ItemReport, LocalContext, PreparedSession, ProvisionContext,
    SessionPayload,
};

/// Writes one prepared session, creating the remote address first when the
/// inventory does not have it yet.
///
/// A failed address create skips the session step for this item only. A
/// failed session create keeps the address that was just written; the next
/// run will find it and reuse it.
async fn execute_one<I: InventoryGateway>(
    inventory: &I,
    context: &ProvisionContext,
    session: &PreparedSession,
) -> ItemOutcome {
    let (local, remote_cidr) = match (&session.local, &session.remote_cidr) {
        (Some(local), Some(cidr)) => (local, cidr),
        _ => {
            tracing::warn!(
                "Skipping {} on {}: local side unresolved",
                session.remote_ip,
                session.exchange_name
            );
            return ItemOutcome::NotReady;
        }
    };

    let (remote_address_id, address_created) = match &session.remote_record {
        Some(record) => (record.id, false),
        None => {
            match inventory
                .create_address(*remote_cidr, context.tenant.id, &session.address_description)
                .await
            {
                Ok(record) => {
                    tracing::info!("Created address {} (id {})", record.address, record.id);
                    (record.id, true)
                }
                Err(e) => {
                    tracing::error!("Failed to create address {}: {}", remote_cidr, e);
                    return ItemOutcome::AddressFailed {
                        error: e.to_string(),
                    };
                }
            }
        }
    };

    let payload = build_payload(context, session, local, remote_address_id);
    match inventory.create_session(&payload).await {
        Ok(record) => {
            tracing::info!(
                "Created session {} on {} (id {})",
                record.name,
                session.exchange_name,
                record.id
            );
            ItemOutcome::Created {
                address_id: remote_address_id,
                session_id: record.id,
                address_created,
            }
        }
        Err(e) => {
            tracing::error!(
                "Failed to create session on {}: {}",
                session.exchange_name,
                e
            );
            ItemOutcome::SessionFailed {
                address_id: remote_address_id,
                error: e.to_string(),
            }
        }
    }
}

fn build_payload(
    context: &ProvisionContext,
    session: &PreparedSession,
    local: &LocalContext,
    remote_address_id: i64,
) -> SessionPayload {
    SessionPayload {
        name: session.session_name.clone(),
        site_id: local.device.site_id,
        device_id: local.device.device_id,
        local_address_id: local.address.id,
        remote_address_id,
        local_as_id: context.local_as.id,
        remote_as_id: context.peer_as.id,
        tenant_id: context.tenant.id,
        peer_group_id: context.peer_group_id,
        address_family: session.family,
        as_set: session.as_set.clone(),
        prefix_limit: session.prefix_limit,
        sync_from_registry: context.options.sync_from_registry,
        md5_key: context.options.md5_key.clone(),
        description: session.session_description.clone(),
    }
}

/// Runs the whole batch in order and reports every per-item outcome.
///
/// Failures never stop the batch; later items still get their chance.
pub async fn execute_sessions<I: InventoryGateway>(
    inventory: &I,
    context: &ProvisionContext,
    prepared: &[PreparedSession],
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    for session in prepared {
        let outcome = execute_one(inventory, context, session).await;
        report.items.push(ItemReport {
            exchange_name: session.exchange_name.clone(),
            remote_ip: session.remote_ip,
            outcome,
        });
    }

    tracing::info!(
        "Execution finished: {} created, {} failed, {} skipped",
        report.created_count(),
        report.failed_count(),
        report.skipped_count()
    );
    report
}

// ============================================================================
// Tests
// ============================================================================
