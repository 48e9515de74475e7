//! Terminal rendering for panels, tables and reports

use colored::Colorize;
use peerbox_core::{
    AddressFamily, AsnProfile, CommonExchangeMatch, ExecutionReport, ItemOutcome, PreparedSession,
    ValidatedCandidate,
};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct MatchRow {
    index: usize,
    exchange: String,
    ipv4: String,
    ipv6: String,
}

#[derive(Tabled)]
struct ValidationRow {
    exchange: String,
    family: &'static str,
    remote: String,
    address: String,
    session: String,
}

#[derive(Tabled)]
struct PreviewRow {
    exchange: String,
    remote: String,
    device: String,
    limit: u32,
    as_set: String,
    md5: &'static str,
}

/// Registry profile summary printed ahead of the wizard
pub fn profile_panel(profile: &AsnProfile) -> String {
    let as_set = if profile.irr_as_set.is_empty() {
        "-".to_string()
    } else {
        profile.irr_as_set.clone()
    };
    let lines = [
        format!(
            "{} {}",
            format!("AS{}", profile.asn).cyan().bold(),
            profile.name.bold()
        ),
        format!(
            "  Website:     {}",
            profile.website.as_deref().unwrap_or("-")
        ),
        format!("  IRR AS-SET:  {}", as_set),
        format!(
            "  IPv4 limit:  {:<8} announced: {}",
            count(profile.prefix_limit_v4),
            count(profile.announced_prefixes_v4)
        ),
        format!(
            "  IPv6 limit:  {:<8} announced: {}",
            count(profile.prefix_limit_v6),
            count(profile.announced_prefixes_v6)
        ),
    ];
    lines.join("\n")
}

/// Numbered table of shared exchanges, one row per exchange
pub fn match_table(matches: &[CommonExchangeMatch]) -> String {
    let rows = matches
        .iter()
        .enumerate()
        .map(|(i, m)| MatchRow {
            index: i + 1,
            exchange: m.exchange_name.clone(),
            ipv4: pair(m.local_ipv4, m.remote_ipv4),
            ipv6: pair(m.local_ipv6, m.remote_ipv6),
        })
        .collect::<Vec<_>>();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Inventory state of each candidate address
pub fn validation_table(validated: &[ValidatedCandidate]) -> String {
    let rows = validated
        .iter()
        .map(|v| {
            let address = if v.result.exists_in_inventory {
                "found"
            } else if v.result.has_covering_subnet {
                "missing"
            } else {
                "no subnet"
            };
            let session = if !v.result.exists_in_inventory {
                "-"
            } else if v.result.bgp_session_exists {
                "exists"
            } else {
                "missing"
            };
            ValidationRow {
                exchange: v.candidate.exchange_name.clone(),
                family: family_label(v.candidate.family),
                remote: v.candidate.remote_ip.to_string(),
                address: address.to_string(),
                session: session.to_string(),
            }
        })
        .collect::<Vec<_>>();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Dry-run view of everything the apply step would write
pub fn preview_table(prepared: &[PreparedSession], md5_set: bool) -> String {
    let rows = prepared
        .iter()
        .map(|p| PreviewRow {
            exchange: p.exchange_name.clone(),
            remote: p
                .remote_cidr
                .map(|c| c.to_string())
                .unwrap_or_else(|| p.remote_ip.to_string()),
            device: p
                .local
                .as_ref()
                .map(|l| l.device.device_name.clone())
                .unwrap_or_else(|| "unresolved".to_string()),
            limit: p.prefix_limit,
            as_set: if p.as_set.is_empty() {
                "-".to_string()
            } else {
                p.as_set.clone()
            },
            md5: if md5_set { "yes" } else { "-" },
        })
        .collect::<Vec<_>>();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Per-item outcome lines plus a totals line
pub fn execution_report(report: &ExecutionReport) -> String {
    let mut lines = Vec::new();
    for item in &report.items {
        let line = match &item.outcome {
            ItemOutcome::Created {
                session_id,
                address_created,
                ..
            } => format!(
                "  {} {} {} (session {}{})",
                "OK".green().bold(),
                item.exchange_name,
                item.remote_ip,
                session_id,
                if *address_created {
                    ", address created"
                } else {
                    ""
                }
            ),
            ItemOutcome::AddressFailed { error } => format!(
                "  {} {} {} address: {}",
                "FAIL".red().bold(),
                item.exchange_name,
                item.remote_ip,
                error
            ),
            ItemOutcome::SessionFailed { error, .. } => format!(
                "  {} {} {} session: {}",
                "FAIL".red().bold(),
                item.exchange_name,
                item.remote_ip,
                error
            ),
            ItemOutcome::NotReady => format!(
                "  {} {} {} local side unresolved",
                "SKIP".yellow().bold(),
                item.exchange_name,
                item.remote_ip
            ),
        };
        lines.push(line);
    }
    lines.push(format!(
        "{} created, {} failed, {} skipped",
        report.created_count(),
        report.failed_count(),
        report.skipped_count()
    ));
    lines.join("\n")
}

fn count(value: Option<u32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn pair<T: std::fmt::Display>(local: Option<T>, remote: Option<T>) -> String {
    match (local, remote) {
        (Some(l), Some(r)) => format!("{} -> {}", l, r),
        (None, Some(r)) => format!("- -> {}", r),
        (Some(l), None) => format!("{} -> -", l),
        (None, None) => "-".to_string(),
    }
}

fn family_label(family: AddressFamily) -> &'static str {
    match family {
        AddressFamily::V4 => "IPv4",
        AddressFamily::V6 => "IPv6",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use peerbox_core::{AddressCandidate, ValidationResult};

    fn match_fixture() -> CommonExchangeMatch {
        CommonExchangeMatch {
            exchange_id: 31,
            exchange_name: "DE-CIX Frankfurt".to_string(),
            local_ipv4: Some("80.81.192.20".parse().unwrap()),
            local_ipv6: None,
            remote_ipv4: Some("80.81.192.10".parse().unwrap()),
            remote_ipv6: Some("2001:7f8::10".parse().unwrap()),
        }
    }

    #[test]
    fn test_match_table_pairs_and_gaps() {
        let out = match_table(&[match_fixture()]);
        assert!(out.contains("DE-CIX Frankfurt"));
        assert!(out.contains("80.81.192.20 -> 80.81.192.10"));
        assert!(out.contains("- -> 2001:7f8::10"));
    }

    #[test]
    fn test_validation_table_states() {
        let candidate = AddressCandidate {
            exchange_id: 31,
            exchange_name: "DE-CIX Frankfurt".to_string(),
            family: AddressFamily::V4,
            remote_ip: "80.81.192.10".parse().unwrap(),
            local_ip: None,
        };
        let rows = vec![
            ValidatedCandidate {
                candidate: candidate.clone(),
                result: ValidationResult {
                    exists_in_inventory: true,
                    has_covering_subnet: true,
                    bgp_session_exists: true,
                },
                address: None,
            },
            ValidatedCandidate {
                candidate: candidate.clone(),
                result: ValidationResult {
                    exists_in_inventory: false,
                    has_covering_subnet: true,
                    bgp_session_exists: false,
                },
                address: None,
            },
            ValidatedCandidate {
                candidate,
                result: ValidationResult {
                    exists_in_inventory: false,
                    has_covering_subnet: false,
                    bgp_session_exists: false,
                },
                address: None,
            },
        ];
        let out = validation_table(&rows);
        assert!(out.contains("exists"));
        assert!(out.contains("missing"));
        assert!(out.contains("no subnet"));
        assert!(out.contains("IPv4"));
    }

    #[test]
    fn test_preview_table_unresolved_row() {
        let prepared = PreparedSession {
            exchange_id: 31,
            exchange_name: "DE-CIX Frankfurt".to_string(),
            family: AddressFamily::V4,
            remote_ip: "80.81.192.10".parse().unwrap(),
            remote_record: None,
            local: None,
            remote_cidr: None,
            session_name: "Peer Networks".to_string(),
            session_description: String::new(),
            address_description: String::new(),
            prefix_limit: 100,
            as_set: String::new(),
        };
        let out = preview_table(&[prepared], false);
        assert!(out.contains("unresolved"));
        assert!(out.contains("80.81.192.10"));
        assert!(out.contains("100"));
    }

    #[test]
    fn test_profile_panel_missing_fields() {
        let profile = AsnProfile {
            asn: 64511,
            name: "Peer Networks".to_string(),
            website: None,
            irr_as_set: String::new(),
            prefix_limit_v4: Some(100),
            prefix_limit_v6: None,
            announced_prefixes_v4: None,
            announced_prefixes_v6: None,
        };
        let out = profile_panel(&profile);
        assert!(out.contains("AS64511"));
        assert!(out.contains("Peer Networks"));
        assert!(out.contains("Website:     -"));
    }

    #[test]
    fn test_execution_report_totals() {
        let report = ExecutionReport {
            items: vec![
                peerbox_core::ItemReport {
                    exchange_name: "DE-CIX Frankfurt".to_string(),
                    remote_ip: "80.81.192.10".parse().unwrap(),
                    outcome: ItemOutcome::Created {
                        address_id: 1000,
                        session_id: 1001,
                        address_created: true,
                    },
                },
                peerbox_core::ItemReport {
                    exchange_name: "LONAP".to_string(),
                    remote_ip: "5.57.80.1".parse().unwrap(),
                    outcome: ItemOutcome::NotReady,
                },
            ],
        };
        let out = execution_report(&report);
        assert!(out.contains("session 1001, address created"));
        assert!(out.contains("1 created, 0 failed, 1 skipped"));
    }
}
