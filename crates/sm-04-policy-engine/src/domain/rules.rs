//! Rule set validation and selection.

use shared_types::{PolicyError, PolicyRule, RuleId};

/// A validated, versioned policy rule set.
///
/// Validation guarantees every score in [0, 1] matches at least one rule;
/// selection resolves overlaps to the lowest rule id, making the pair
/// (validate, select) a total deterministic function of the score.
#[derive(Clone, Debug)]
pub struct RuleSet {
    /// Rules sorted by id ascending (the tie-break order).
    rules: Vec<PolicyRule>,
    pub version: u32,
}

impl RuleSet {
    /// Validate and index a rule set.
    ///
    /// # Errors
    ///
    /// - empty set
    /// - a rule with an invalid or out-of-range severity range
    /// - duplicate rule ids
    /// - a gap: some severity in [0, 1] matched by no rule
    pub fn load(mut rules: Vec<PolicyRule>, version: u32) -> Result<Self, PolicyError> {
        if rules.is_empty() {
            return Err(PolicyError::InvalidRuleSet("empty rule set".to_string()));
        }

        rules.sort_by_key(|r| r.id);
        for window in rules.windows(2) {
            if window[0].id == window[1].id {
                return Err(PolicyError::InvalidRuleSet(format!(
                    "duplicate rule id {}",
                    window[0].id
                )));
            }
        }

        for rule in &rules {
            let valid_range = rule.min_severity >= 0.0
                && rule.max_severity <= 1.0
                && rule.min_severity < rule.max_severity
                && rule.min_severity.is_finite()
                && rule.max_severity.is_finite();
            if !valid_range {
                return Err(PolicyError::InvalidRuleSet(format!(
                    "rule {} has invalid range [{}, {})",
                    rule.id, rule.min_severity, rule.max_severity
                )));
            }
            if rule.allowed_actions.is_empty() {
                return Err(PolicyError::InvalidRuleSet(format!(
                    "rule {} allows no actions",
                    rule.id
                )));
            }
        }

        // Coverage check: walk the range bounds ordered by start; the
        // covered prefix must reach 1.0 without a gap.
        let mut by_start = rules.clone();
        by_start.sort_by(|a, b| {
            a.min_severity
                .partial_cmp(&b.min_severity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut covered_to = 0.0f64;
        for rule in &by_start {
            if rule.min_severity > covered_to {
                return Err(PolicyError::InvalidRuleSet(format!(
                    "severity gap: [{covered_to}, {}) matched by no rule",
                    rule.min_severity
                )));
            }
            covered_to = covered_to.max(rule.max_severity);
        }
        if covered_to < 1.0 {
            return Err(PolicyError::InvalidRuleSet(format!(
                "severity gap: [{covered_to}, 1.0] matched by no rule"
            )));
        }

        Ok(Self { rules, version })
    }

    /// Select the rule for a score: the matching rule with the lowest id.
    pub fn select(&self, score: f64) -> Result<&PolicyRule, PolicyError> {
        self.rules
            .iter()
            .find(|rule| rule.contains(score))
            .ok_or(PolicyError::NoMatchingRule(score))
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&PolicyRule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ActionDiscriminant;
    use std::collections::BTreeSet;

    fn rule(id: u32, min: f64, max: f64) -> PolicyRule {
        PolicyRule {
            id: RuleId(id),
            min_severity: min,
            max_severity: max,
            allowed_actions: BTreeSet::from([ActionDiscriminant::Alert]),
            resource_cost: 1,
            legal_constraint_tag: "default".to_string(),
        }
    }

    #[test]
    fn test_valid_partition_loads() {
        let set = RuleSet::load(vec![rule(1, 0.0, 0.5), rule(2, 0.5, 1.0)], 1).unwrap();
        assert_eq!(set.rules().len(), 2);
    }

    #[test]
    fn test_gap_rejected() {
        let result = RuleSet::load(vec![rule(1, 0.0, 0.4), rule(2, 0.5, 1.0)], 1);
        assert!(matches!(result, Err(PolicyError::InvalidRuleSet(_))));
    }

    #[test]
    fn test_missing_tail_rejected() {
        let result = RuleSet::load(vec![rule(1, 0.0, 0.9)], 1);
        assert!(matches!(result, Err(PolicyError::InvalidRuleSet(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = RuleSet::load(vec![rule(7, 0.0, 0.5), rule(7, 0.5, 1.0)], 1);
        assert!(matches!(result, Err(PolicyError::InvalidRuleSet(_))));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = RuleSet::load(vec![rule(1, 0.6, 0.4), rule(2, 0.0, 1.0)], 1);
        assert!(matches!(result, Err(PolicyError::InvalidRuleSet(_))));
    }

    #[test]
    fn test_selection_boundaries() {
        let set = RuleSet::load(vec![rule(1, 0.0, 0.5), rule(2, 0.5, 1.0)], 1).unwrap();

        assert_eq!(set.select(0.0).unwrap().id, RuleId(1));
        assert_eq!(set.select(0.499).unwrap().id, RuleId(1));
        assert_eq!(set.select(0.5).unwrap().id, RuleId(2));
        assert_eq!(set.select(1.0).unwrap().id, RuleId(2));
    }

    #[test]
    fn test_overlap_resolves_to_lowest_id() {
        // Overlapping ranges are legal; the tie-break is explicit.
        let set = RuleSet::load(vec![rule(2, 0.0, 1.0), rule(1, 0.3, 0.6)], 1).unwrap();

        assert_eq!(set.select(0.4).unwrap().id, RuleId(1));
        assert_eq!(set.select(0.2).unwrap().id, RuleId(2));
    }

    #[test]
    fn test_exactly_one_rule_after_tiebreak() {
        // For any score, selection is a function: same input, same rule.
        let set = RuleSet::load(
            vec![rule(1, 0.0, 0.4), rule(2, 0.4, 0.7), rule(3, 0.7, 1.0)],
            1,
        )
        .unwrap();

        for i in 0..=100 {
            let score = f64::from(i) / 100.0;
            let a = set.select(score).unwrap().id;
            let b = set.select(score).unwrap().id;
            assert_eq!(a, b);
        }
    }
}
