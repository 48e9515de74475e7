//! Interactive provisioning wizard

use super::Settings;
use crate::render;
use crate::term::{self, TerminalDecisions};
use colored::Colorize;
use peerbox_core::{
    actionable, expand_candidates, DecisionSource, ProvisionContext, ProvisioningWorkflow,
    SessionOptions, WorkflowConfig, WorkflowError,
};
use peerbox_netbox::NetBoxClient;
use peerbox_peeringdb::PeeringDbClient;

/// Runs the wizard end to end. Exit code 0 covers success and clean
/// aborts, 2 means the batch finished with per-item failures.
pub async fn handle(peer_asn: u32, settings: &Settings) -> Result<i32, String> {
    let operator_asn = settings.require_operator_asn()?;
    let registry = settings.registry();
    let inventory = settings.inventory()?;
    let decisions = TerminalDecisions;

    let config = WorkflowConfig::new(operator_asn).with_peer_group(&settings.peer_group);
    let workflow = ProvisioningWorkflow::new(&registry, &inventory, &decisions, config);

    match run(&workflow, &decisions, peer_asn).await {
        Ok(code) => Ok(code),
        Err(WorkflowError::Aborted(reason)) => {
            println!("{} {}", "Aborted:".yellow().bold(), reason);
            Ok(0)
        }
        Err(e) => Err(e.to_string()),
    }
}

async fn run(
    workflow: &ProvisioningWorkflow<'_, PeeringDbClient, NetBoxClient, TerminalDecisions>,
    decisions: &TerminalDecisions,
    peer_asn: u32,
) -> Result<i32, WorkflowError> {
    let profile = match workflow.peer_profile(peer_asn).await? {
        Some(profile) => profile,
        None => {
            println!(
                "{} AS{} not found in the registry.",
                "!".red().bold(),
                peer_asn
            );
            return Ok(1);
        }
    };
    println!("{}\n", render::profile_panel(&profile));

    let matches = workflow.common_exchanges(peer_asn).await?;
    if matches.is_empty() {
        println!("No common exchanges with AS{}. Nothing to do.", peer_asn);
        return Ok(0);
    }
    println!("{}", render::match_table(&matches));

    let picked = term::ask_selection(matches.len())?;
    let selected: Vec<_> = picked.iter().map(|&i| matches[i].clone()).collect();
    let candidates = expand_candidates(&selected);

    let limits = workflow.resolve_limits(&profile).await?;

    println!(
        "Checking {} addresses against the inventory...",
        candidates.len()
    );
    let validated = workflow.validate(&candidates).await;
    println!("{}", render::validation_table(&validated));

    let todo = actionable(&validated);
    if todo.is_empty() {
        println!(
            "{}",
            "Every selected address already has a session or lacks a covering subnet. Nothing to do."
                .green()
        );
        return Ok(0);
    }

    println!("Searching the inventory for tenant '{}'...", profile.name);
    let tenant = workflow.resolve_tenant(&profile.name).await?;
    println!(
        "{} tenant '{}' (id {})",
        "Using".green().bold(),
        tenant.name,
        tenant.id
    );

    let flight = workflow.preflight(&tenant, peer_asn).await?;

    let sync = decisions
        .confirm("Keep sessions synchronized from the registry?", true)
        .await?;
    let md5 = term::ask_md5()?;
    let options = SessionOptions {
        sync_from_registry: sync,
        md5_key: md5,
    };

    let prepared = workflow
        .prepare(&todo, &tenant, peer_asn, &limits, &profile.irr_as_set)
        .await;
    let ready = prepared.iter().filter(|p| p.is_ready()).count();
    if ready == 0 {
        println!("No session has a resolved local side. Nothing to create.");
        return Ok(0);
    }
    if ready < prepared.len() {
        println!(
            "{} {} of {} sessions have no resolved local side and will be skipped.",
            "WARNING:".yellow().bold(),
            prepared.len() - ready,
            prepared.len()
        );
    }
    println!(
        "{}",
        render::preview_table(&prepared, options.md5_key.is_some())
    );

    workflow
        .confirm_apply(&format!("Create {} session(s) in the inventory?", ready))
        .await?;

    let context = ProvisionContext {
        tenant,
        local_as: flight.local_as,
        peer_as: flight.peer_as,
        peer_group_id: flight.peer_group_id,
        options,
    };
    let report = workflow.execute(&context, &prepared).await;
    println!("{}", render::execution_report(&report));

    if report.is_clean() {
        Ok(0)
    } else {
        Ok(2)
    }
}
