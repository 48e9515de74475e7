//! Common-exchange intersection.
//!
//! Builds the list of exchanges where both sides hold a presence and
//! expands it into per-address candidates.

use crate::{AddressCandidate, AddressFamily, CommonExchangeMatch, ExchangePresence};
use std::collections::HashMap;
use std::net::IpAddr;

/// Exchanges present in both lists, sorted by exchange name.
///
/// One match is emitted per remote record whose exchange id also appears
/// on the local side. Duplicate local records for the same exchange keep
/// the last one seen. Ties in the name sort keep input order.
pub fn common_exchanges(
    local: &[ExchangePresence],
    remote: &[ExchangePresence],
) -> Vec<CommonExchangeMatch> {
    let mut local_by_exchange: HashMap<u32, &ExchangePresence> = HashMap::new();
    for presence in local {
        if local_by_exchange
            .insert(presence.exchange_id, presence)
            .is_some()
        {
            tracing::debug!(
                "duplicate local presence for exchange {}, keeping the later record",
                presence.exchange_id
            );
        }
    }

    let mut matches: Vec<CommonExchangeMatch> = remote
        .iter()
        .filter_map(|remote_presence| {
            local_by_exchange
                .get(&remote_presence.exchange_id)
                .map(|local_presence| CommonExchangeMatch {
                    exchange_id: remote_presence.exchange_id,
                    exchange_name: remote_presence.exchange_name.clone(),
                    local_ipv4: local_presence.ipv4,
                    local_ipv6: local_presence.ipv6,
                    remote_ipv4: remote_presence.ipv4,
                    remote_ipv6: remote_presence.ipv6,
                })
        })
        .collect();

    matches.sort_by(|a, b| a.exchange_name.cmp(&b.exchange_name));
    matches
}

/// One candidate per remote address, v4 before v6 within a match.
///
/// Candidates are emitted even when the local side lacks the family; the
/// preparation stage marks those not ready instead of dropping them here.
pub fn expand_candidates(matches: &[CommonExchangeMatch]) -> Vec<AddressCandidate> {
    let mut candidates = Vec::new();
    for exchange_match in matches {
        if let Some(remote) = exchange_match.remote_ipv4 {
            candidates.push(AddressCandidate {
                exchange_id: exchange_match.exchange_id,
                exchange_name: exchange_match.exchange_name.clone(),
                family: AddressFamily::V4,
                remote_ip: IpAddr::V4(remote),
                local_ip: exchange_match.local_ipv4.map(IpAddr::V4),
            });
        }
        if let Some(remote) = exchange_match.remote_ipv6 {
            candidates.push(AddressCandidate {
                exchange_id: exchange_match.exchange_id,
                exchange_name: exchange_match.exchange_name.clone(),
                family: AddressFamily::V6,
                remote_ip: IpAddr::V6(remote),
                local_ip: exchange_match.local_ipv6.map(IpAddr::V6),
            });
        }
    }
    candidates
}
