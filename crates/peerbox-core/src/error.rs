//! Engine error types.
//!
//! Absence of data is never an error here: gateway lookups return `Option`
//! and validation findings travel as values. Errors cover transport and
//! decode failures, rejected writes, and clean operator aborts.

use std::fmt;
use thiserror::Error;

/// Gateway errors
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("create {what} failed: {reason}")]
    Create { what: String, reason: String },
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Decision source errors
#[derive(Debug, Clone, Error)]
pub enum DecisionError {
    #[error("decision source closed")]
    Closed,

    #[error("read error: {0}")]
    Read(String),
}

/// Why a run terminated before writing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Tenant search abandoned by the operator
    TenantSearch,
    /// Peer ASN not assigned to the tenant and the re-check was declined
    PeerAsnMissing,
    /// Final apply confirmation declined
    ApplyDeclined,
    /// The decision source went away mid-run
    DecisionsClosed,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AbortReason::TenantSearch => "tenant search abandoned",
            AbortReason::PeerAsnMissing => "peer ASN missing from tenant",
            AbortReason::ApplyDeclined => "apply declined",
            AbortReason::DecisionsClosed => "decision source closed",
        };
        f.write_str(text)
    }
}

/// Workflow errors
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// Clean terminate requested by the operator, nothing was written
    #[error("aborted: {0}")]
    Aborted(AbortReason),

    #[error("registry: {0}")]
    Registry(GatewayError),

    #[error("inventory: {0}")]
    Inventory(GatewayError),

    #[error("peer group '{0}' not found in inventory")]
    MissingPeerGroup(String),

    #[error("operator AS{0} not found in inventory")]
    MissingOperatorAsn(u32),
}

impl From<DecisionError> for WorkflowError {
    fn from(_: DecisionError) -> Self {
        WorkflowError::Aborted(AbortReason::DecisionsClosed)
    }
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GatewayError::Create {
            what: "bgp session".to_string(),
            reason: "400 Bad Request".to_string(),
        };
        assert_eq!(err.to_string(), "create bgp session failed: 400 Bad Request");

        let aborted = WorkflowError::Aborted(AbortReason::ApplyDeclined);
        assert_eq!(aborted.to_string(), "aborted: apply declined");
    }

    #[test]
    fn test_decision_error_maps_to_abort() {
        let err: WorkflowError = DecisionError::Closed.into();
        assert!(matches!(
            err,
            WorkflowError::Aborted(AbortReason::DecisionsClosed)
        ));
    }
}
