//! Session policy: prefix limits and AS-SET selection.

use crate::decision::{DecisionResult, DecisionSource};
use crate::{AddressFamily, AsnProfile};
use serde::{Deserialize, Serialize};

/// Per-family prefix limits after registry fallback and manual entry.
/// Zero means no enforced limit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrefixLimits {
    pub v4: u32,
    pub v6: u32,
}

impl PrefixLimits {
    pub fn for_family(&self, family: AddressFamily) -> u32 {
        match family {
            AddressFamily::V4 => self.v4,
            AddressFamily::V6 => self.v6,
        }
    }
}

/// Effective limit published by the registry for one family.
///
/// The explicit limit field wins; a missing or zero value falls back to
/// the announced-route estimate, then to zero.
pub fn registry_limit(profile: &AsnProfile, family: AddressFamily) -> u32 {
    let (preferred, secondary) = match family {
        AddressFamily::V4 => (profile.prefix_limit_v4, profile.announced_prefixes_v4),
        AddressFamily::V6 => (profile.prefix_limit_v6, profile.announced_prefixes_v6),
    };
    preferred
        .filter(|v| *v > 0)
        .or(secondary.filter(|v| *v > 0))
        .unwrap_or(0)
}

/// Resolve both limits, asking the operator for a manual value whenever
/// the registry publishes none. Skipping the manual entry keeps the
/// limit at zero.
pub async fn resolve_prefix_limits<D: DecisionSource>(
    profile: &AsnProfile,
    decisions: &D,
) -> DecisionResult<PrefixLimits> {
    let v4 = resolve_family(profile, AddressFamily::V4, decisions).await?;
    let v6 = resolve_family(profile, AddressFamily::V6, decisions).await?;
    Ok(PrefixLimits { v4, v6 })
}

async fn resolve_family<D: DecisionSource>(
    profile: &AsnProfile,
    family: AddressFamily,
    decisions: &D,
) -> DecisionResult<u32> {
    let published = registry_limit(profile, family);
    if published > 0 {
        tracing::debug!(
            "AS{} {} prefix limit {} from registry",
            profile.asn,
            family.tag(),
            published
        );
        return Ok(published);
    }

    tracing::warn!(
        "AS{} has no {} prefix limit in the registry",
        profile.asn,
        family.tag()
    );
    let label = match family {
        AddressFamily::V4 => "IPv4",
        AddressFamily::V6 => "IPv6",
    };
    match decisions
        .manual_limit(&format!("{} prefix limit is 0 or missing. Enter a manual limit", label))
        .await?
    {
        Some(value) if value > 0 => Ok(value),
        _ => Ok(0),
    }
}

/// AS-SET token for a family from the raw registry string.
///
/// Operators commonly publish "AS-FOO AS-FOO-V6" in one field. The first
/// token is the default; for v6 sessions the first two tokens are
/// scanned and one containing "V6" wins.
pub fn select_as_set(raw: &str, family: AddressFamily) -> String {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return String::new();
    }
    if family == AddressFamily::V6 {
        for token in tokens.iter().take(2) {
            if token.to_uppercase().contains("V6") {
                return (*token).to_string();
            }
        }
    }
    tokens[0].to_string()
}
