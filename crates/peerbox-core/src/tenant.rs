//! Tenant resolution.
//!
//! Finds the inventory tenant owning the peer organization. The search
//! loop is a small state machine driven entirely by decision-source
//! replies, so a scripted source resolves it deterministically.

use crate::decision::{DecisionResult, DecisionSource};
use crate::gateway::InventoryGateway;
use crate::Tenant;

/// Resolution state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantState {
    /// Query the inventory with this term next
    Searching(String),
    /// Exactly one hit, awaiting confirmation
    OneMatch(Tenant),
    /// Several hits, awaiting selection
    ManyMatches(Vec<Tenant>),
    /// Terminal: tenant confirmed for the run
    Confirmed(Tenant),
    /// Terminal: operator abandoned the search
    Aborted,
}

impl TenantState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TenantState::Confirmed(_) | TenantState::Aborted)
    }

    /// One transition. Terminal states return themselves.
    pub async fn advance<I: InventoryGateway, D: DecisionSource>(
        self,
        inventory: &I,
        decisions: &D,
    ) -> DecisionResult<TenantState> {
        match self {
            TenantState::Searching(term) => {
                let mut candidates = match inventory.find_tenants(&term).await {
                    Ok(list) => list,
                    Err(e) => {
                        tracing::warn!("tenant search for '{}' failed: {}", term, e);
                        Vec::new()
                    }
                };
                match candidates.len() {
                    0 => {
                        tracing::info!("no tenant matched '{}'", term);
                        next_search(decisions, "No tenant found. Enter a new search term").await
                    }
                    1 => Ok(TenantState::OneMatch(candidates.remove(0))),
                    _ => Ok(TenantState::ManyMatches(candidates)),
                }
            }
            TenantState::OneMatch(tenant) => {
                let prompt = format!("Use tenant '{}' (id {})?", tenant.name, tenant.id);
                if decisions.confirm(&prompt, true).await? {
                    tracing::info!("tenant '{}' confirmed", tenant.name);
                    Ok(TenantState::Confirmed(tenant))
                } else {
                    next_search(decisions, "Enter a new search term").await
                }
            }
            TenantState::ManyMatches(tenants) => {
                let picked = decisions.pick_index("Select a tenant", tenants.len()).await?;
                if picked == 0 {
                    next_search(decisions, "Enter a new search term").await
                } else if picked <= tenants.len() {
                    let tenant = tenants[picked - 1].clone();
                    tracing::info!("tenant '{}' selected", tenant.name);
                    Ok(TenantState::Confirmed(tenant))
                } else {
                    tracing::warn!("selection {} is out of range", picked);
                    Ok(TenantState::ManyMatches(tenants))
                }
            }
            terminal => Ok(terminal),
        }
    }
}

async fn next_search<D: DecisionSource>(decisions: &D, prompt: &str) -> DecisionResult<TenantState> {
    match decisions.search_term(prompt).await? {
        Some(term) => Ok(TenantState::Searching(term)),
        None => Ok(TenantState::Aborted),
    }
}

/// Drive the search to a terminal state, starting from the registry
/// organization name.
pub async fn resolve_tenant<I: InventoryGateway, D: DecisionSource>(
    inventory: &I,
    decisions: &D,
    initial_term: &str,
) -> DecisionResult<TenantState> {
    let mut state = TenantState::Searching(initial_term.to_string());
    while !state.is_terminal() {
        state = state.advance(inventory, decisions).await?;
    }
    Ok(state)
}
