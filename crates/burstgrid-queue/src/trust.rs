//! Endpoint trust rules.
//!
//! Every queue endpoint the portal advertises gets checked against an
//! operator-configured list of (name, identity) pattern pairs before we
//! query it for jobs. Both patterns must match the whole string; a rule
//! for `example.org` must not trust `example.org.evil.net`.

use regex::Regex;

use burstgrid_core::config::TrustRuleConfig;

use crate::error::{QueueError, QueueResult};

/// One compiled (name, identity) pair.
#[derive(Debug)]
struct TrustRule {
    name: Regex,
    identity: Regex,
}

impl TrustRule {
    fn matches(&self, name: &str, identity: &str) -> bool {
        self.name.is_match(name) && self.identity.is_match(identity)
    }
}

/// The configured trust list.
#[derive(Debug, Default)]
pub struct TrustRules {
    rules: Vec<TrustRule>,
}

impl TrustRules {
    /// Compile the configured rules. Fails on the first bad pattern; a
    /// half-working trust list is worse than none.
    pub fn compile(configs: &[TrustRuleConfig]) -> QueueResult<Self> {
        let mut rules = Vec::with_capacity(configs.len());
        for config in configs {
            rules.push(TrustRule {
                name: anchored(&config.name)?,
                identity: anchored(&config.identity)?,
            });
        }
        Ok(Self { rules })
    }

    /// `true` when any rule matches both the endpoint name and the
    /// identity it authenticated as.
    pub fn permits(&self, name: &str, identity: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(name, identity))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compile `pattern` anchored to the full string.
pub(crate) fn anchored(pattern: &str) -> QueueResult<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| QueueError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, identity: &str) -> TrustRuleConfig {
        TrustRuleConfig {
            name: name.to_string(),
            identity: identity.to_string(),
        }
    }

    #[test]
    fn both_patterns_must_match() {
        let rules =
            TrustRules::compile(&[rule("submit-.*[.]example[.]org", "osg@example[.]org")]).unwrap();
        assert!(rules.permits("submit-1.example.org", "osg@example.org"));
        assert!(!rules.permits("submit-1.example.org", "intruder@example.org"));
        assert!(!rules.permits("other.example.org", "osg@example.org"));
    }

    #[test]
    fn match_is_anchored_not_substring() {
        let rules = TrustRules::compile(&[rule("example[.]org", ".*")]).unwrap();
        assert!(rules.permits("example.org", "anyone"));
        assert!(!rules.permits("example.org.evil.net", "anyone"));
        assert!(!rules.permits("prefix-example.org", "anyone"));
    }

    #[test]
    fn any_rule_suffices() {
        let rules = TrustRules::compile(&[
            rule("submit-a", "a@site"),
            rule("submit-b", "b@site"),
        ])
        .unwrap();
        assert!(rules.permits("submit-a", "a@site"));
        assert!(rules.permits("submit-b", "b@site"));
        assert!(!rules.permits("submit-a", "b@site"));
    }

    #[test]
    fn alternation_stays_anchored() {
        // Without the non-capturing group the `|` would escape the anchors.
        let rules = TrustRules::compile(&[rule("a|b", ".*")]).unwrap();
        assert!(rules.permits("a", "x"));
        assert!(rules.permits("b", "x"));
        assert!(!rules.permits("ab", "x"));
        assert!(!rules.permits("xa", "x"));
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let err = TrustRules::compile(&[rule("unclosed(", ".*")]).unwrap_err();
        assert!(matches!(err, QueueError::BadPattern { .. }));
    }

    #[test]
    fn empty_rule_set_permits_nothing() {
        let rules = TrustRules::compile(&[]).unwrap();
        assert!(rules.is_empty());
        assert!(!rules.permits("anything", "anyone"));
    }
}
