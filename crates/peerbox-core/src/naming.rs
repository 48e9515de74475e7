//! Sanitization of tenant names for use inside session descriptions.

use serde::{Deserialize, Serialize};

/// How non-alphanumeric characters in a tenant name are handled when the
/// name is embedded in a structured session description.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Drop every character that is not ASCII alphanumeric.
    #[default]
    StrictAlphanumeric,
    /// Collapse each run of non-alphanumeric characters into a single
    /// underscore, with no leading or trailing underscore.
    Underscore,
}

impl NamingStrategy {
    /// Produces the sanitized form of `name` under this strategy.
    pub fn sanitize(&self, name: &str) -> String {
        match self {
            NamingStrategy::StrictAlphanumeric => {
                name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
            }
            NamingStrategy::Underscore => {
                let mut out = String::with_capacity(name.len());
                let mut gap = false;
                for c in name.chars() {
                    if c.is_ascii_alphanumeric() {
                        if gap && !out.is_empty() {
                            out.push('_');
                        }
                        gap = false;
                        out.push(c);
                    } else {
                        gap = true;
                    }
                }
                out
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_drops_punctuation_and_spaces() {
        assert_eq!(
            NamingStrategy::StrictAlphanumeric.sanitize("IT.Gate S.p.A."),
            "ITGateSpA"
        );
        assert_eq!(
            NamingStrategy::StrictAlphanumeric.sanitize("AS-64500 (lab)"),
            "AS64500lab"
        );
    }

    #[test]
    fn underscore_collapses_runs() {
        assert_eq!(
            NamingStrategy::Underscore.sanitize("IT.Gate S.p.A."),
            "IT_Gate_S_p_A"
        );
        assert_eq!(
            NamingStrategy::Underscore.sanitize("--Edge  Net--"),
            "Edge_Net"
        );
    }

    #[test]
    fn clean_names_pass_through() {
        assert_eq!(
            NamingStrategy::StrictAlphanumeric.sanitize("ExampleNet"),
            "ExampleNet"
        );
        assert_eq!(NamingStrategy::Underscore.sanitize("ExampleNet"), "ExampleNet");
    }

    #[test]
    fn default_is_strict() {
        assert_eq!(NamingStrategy::default(), NamingStrategy::StrictAlphanumeric);
    }
}
