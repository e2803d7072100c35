//! Budgeted rule packing for a single consumer.
//!
//! [`RuleContextManager::pack_rules`] filters rules to the consumer's target
//! sections, scores them, always keeps error-severity and security rules,
//! then fills the remaining budget in score order. Nothing mandatory is ever
//! dropped: when mandatory rules alone exceed the budget the overage is
//! reported on the pack instead.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::budget::{self, BudgetUsage, Candidate};
use crate::metrics::METRICS;
use crate::obs;
use crate::rules::chunk;
use crate::rules::model::{Rule, RuleCategory, RuleLevel, RuleSeverity};
use crate::spec::SectionId;

/// Default rule budget, in estimated tokens.
pub const DEFAULT_RULE_BUDGET: usize = 4000;

/// Score weights for rule prioritisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub severity: BTreeMap<RuleSeverity, u32>,
    pub category: BTreeMap<RuleCategory, u32>,
    pub level: BTreeMap<RuleLevel, u32>,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            severity: BTreeMap::from([
                (RuleSeverity::Error, 100),
                (RuleSeverity::Warning, 50),
                (RuleSeverity::Info, 10),
            ]),
            category: BTreeMap::from([
                (RuleCategory::Security, 80),
                (RuleCategory::Testing, 60),
                (RuleCategory::Api, 50),
                (RuleCategory::Performance, 40),
                (RuleCategory::CodeQuality, 30),
                (RuleCategory::Documentation, 20),
            ]),
            level: BTreeMap::from([
                (RuleLevel::Local, 100),
                (RuleLevel::Scoped, 70),
                (RuleLevel::Global, 40),
            ]),
        }
    }
}

impl PriorityWeights {
    pub fn score(&self, rule: &Rule) -> u32 {
        self.severity.get(&rule.severity).copied().unwrap_or(0)
            + self.category.get(&rule.category).copied().unwrap_or(0)
            + self.level.get(&rule.level).copied().unwrap_or(0)
    }
}

/// Why a rule made it into a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionReason {
    ErrorSeverity,
    SecurityCategory,
    FitsBudget,
}

/// Why a relevant rule was left out of a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    BudgetExceeded,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::BudgetExceeded => f.write_str("budget_exceeded"),
        }
    }
}

/// An included rule with its packing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedRule {
    pub rule: Rule,
    pub score: u32,
    pub size: usize,
    pub reason: InclusionReason,
}

/// A relevant rule that did not fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedRule {
    pub rule_id: String,
    pub severity: RuleSeverity,
    pub score: u32,
    pub size: usize,
    pub reason: ExclusionReason,
}

/// Counts describing a pack.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackSummary {
    pub included: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub excluded_ids: Vec<String>,
    pub overage: usize,
}

impl fmt::Display for PackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Included {} rules: {} errors, {} warnings, {} info",
            self.included, self.errors, self.warnings, self.info
        )?;
        if !self.excluded_ids.is_empty() {
            write!(
                f,
                "\nExcluded {} rules due to context limits: {}",
                self.excluded_ids.len(),
                self.excluded_ids.join(", ")
            )?;
        }
        if self.overage > 0 {
            write!(
                f,
                "\nWARNING: mandatory rules exceed the budget by {}",
                self.overage
            )?;
        }
        Ok(())
    }
}

/// Result of packing rules for one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RulePack {
    pub consumer: String,
    pub target_sections: Vec<SectionId>,
    /// Included rules, highest score first; ties keep input order.
    pub included: Vec<PackedRule>,
    pub excluded: Vec<ExcludedRule>,
    /// Ids of rules dropped by the relevance filter or disabled.
    pub not_applicable: Vec<String>,
    pub usage: BudgetUsage,
    pub summary: PackSummary,
}

impl RulePack {
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.included.iter().map(|p| &p.rule)
    }

    pub fn included_ids(&self) -> Vec<&str> {
        self.included.iter().map(|p| p.rule.id.as_str()).collect()
    }

    pub fn excluded_ids(&self) -> Vec<&str> {
        self.excluded.iter().map(|e| e.rule_id.as_str()).collect()
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.included.iter().any(|p| p.rule.id == rule_id)
    }

    pub fn len(&self) -> usize {
        self.included.len()
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    /// Prompt-ready listing grouped by category.
    pub fn to_prompt(&self) -> String {
        let mut lines = vec!["# Active Rules\n".to_string()];

        let mut by_category: Vec<(RuleCategory, Vec<&Rule>)> = Vec::new();
        for rule in self.rules() {
            match by_category.iter_mut().find(|(c, _)| *c == rule.category) {
                Some((_, rules)) => rules.push(rule),
                None => by_category.push((rule.category, vec![rule])),
            }
        }

        for (category, rules) in by_category {
            lines.push(format!("## {}", chunk::category_title(category)));
            for rule in rules {
                lines.push(format!(
                    "- [{}] **{}**: {}",
                    rule.severity, rule.id, rule.name
                ));
                if !rule.description.is_empty() {
                    lines.push(format!("  - {}", rule.description));
                }
            }
            lines.push(String::new());
        }

        if !self.excluded.is_empty() {
            lines.push(format!(
                "\n*Note: {} lower-priority rules omitted to fit context.*",
                self.excluded.len()
            ));
        }
        lines.join("\n")
    }
}

/// Packs rules into per-consumer budgets.
#[derive(Debug, Clone)]
pub struct RuleContextManager {
    weights: PriorityWeights,
    default_budget: usize,
}

impl Default for RuleContextManager {
    fn default() -> Self {
        Self::new(DEFAULT_RULE_BUDGET)
    }
}

impl RuleContextManager {
    pub fn new(default_budget: usize) -> Self {
        Self {
            weights: PriorityWeights::default(),
            default_budget,
        }
    }

    pub fn with_weights(mut self, weights: PriorityWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn default_budget(&self) -> usize {
        self.default_budget
    }

    pub fn weights(&self) -> &PriorityWeights {
        &self.weights
    }

    /// Pack with the manager's default budget.
    pub fn pack(&self, rules: &[Rule], target_sections: &[SectionId], consumer: &str) -> RulePack {
        self.pack_rules(rules, target_sections, consumer, self.default_budget)
    }

    /// Pack `rules` for `consumer` into `budget`.
    pub fn pack_rules(
        &self,
        rules: &[Rule],
        target_sections: &[SectionId],
        consumer: &str,
        budget: usize,
    ) -> RulePack {
        let mut not_applicable = Vec::new();
        let mut candidates = Vec::new();
        for rule in rules {
            if !rule.enabled || !rule.is_relevant_to(target_sections) {
                not_applicable.push(rule.id.clone());
                continue;
            }
            candidates.push(Candidate::new(
                rule,
                self.weights.score(rule),
                rule.size(),
                rule.is_mandatory(),
            ));
        }

        let packed = budget::pack(candidates, budget);

        let included: Vec<PackedRule> = packed
            .included
            .into_iter()
            .map(|c| PackedRule {
                reason: if c.item.severity == RuleSeverity::Error {
                    InclusionReason::ErrorSeverity
                } else if c.item.category == RuleCategory::Security {
                    InclusionReason::SecurityCategory
                } else {
                    InclusionReason::FitsBudget
                },
                rule: c.item.clone(),
                score: c.score,
                size: c.size,
            })
            .collect();

        let excluded: Vec<ExcludedRule> = packed
            .excluded
            .into_iter()
            .map(|c| ExcludedRule {
                rule_id: c.item.id.clone(),
                severity: c.item.severity,
                score: c.score,
                size: c.size,
                reason: ExclusionReason::BudgetExceeded,
            })
            .collect();

        let count = |severity: RuleSeverity| {
            included
                .iter()
                .filter(|p| p.rule.severity == severity)
                .count()
        };
        let summary = PackSummary {
            included: included.len(),
            errors: count(RuleSeverity::Error),
            warnings: count(RuleSeverity::Warning),
            info: count(RuleSeverity::Info),
            excluded_ids: excluded.iter().map(|e| e.rule_id.clone()).collect(),
            overage: packed.usage.overage,
        };

        obs::emit_rules_packed(consumer, included.len(), excluded.len(), &packed.usage);
        METRICS.add_rules_packed(included.len() as u64, excluded.len() as u64);

        RulePack {
            consumer: consumer.to_string(),
            target_sections: target_sections.to_vec(),
            included,
            excluded,
            not_applicable,
            usage: packed.usage,
            summary,
        }
    }

    /// Split `rules` into sequential chunks of at most `chunk_size`.
    pub fn chunk_rules(&self, rules: &[Rule], chunk_size: usize) -> Vec<Vec<Rule>> {
        chunk::chunk_rules(rules, chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, severity: RuleSeverity, category: RuleCategory, size: usize) -> Rule {
        Rule::new(id, id)
            .with_severity(severity)
            .with_category(category)
            .with_size(size)
    }

    #[test]
    fn test_score_uses_fixed_weights() {
        let weights = PriorityWeights::default();
        let r = Rule::new("x", "x")
            .with_severity(RuleSeverity::Error)
            .with_category(RuleCategory::Security)
            .with_level(RuleLevel::Local);
        assert_eq!(weights.score(&r), 280);
        let r = Rule::new("y", "y")
            .with_severity(RuleSeverity::Info)
            .with_category(RuleCategory::Documentation)
            .with_level(RuleLevel::Global);
        assert_eq!(weights.score(&r), 70);
    }

    #[test]
    fn test_budget_scenario_keeps_only_mandatory_rule() {
        let rules = vec![
            rule("R1", RuleSeverity::Error, RuleCategory::Security, 10),
            rule("R2", RuleSeverity::Warning, RuleCategory::Testing, 10),
            rule("R3", RuleSeverity::Info, RuleCategory::Documentation, 10),
        ];
        let pack = RuleContextManager::default().pack_rules(&rules, &[], "coding_agent", 10);

        assert_eq!(pack.included_ids(), vec!["R1"]);
        assert_eq!(pack.excluded_ids(), vec!["R2", "R3"]);
        assert!(pack
            .excluded
            .iter()
            .all(|e| e.reason == ExclusionReason::BudgetExceeded));
        assert_eq!(pack.summary.included, 1);
        assert_eq!(pack.summary.excluded_ids.len(), 2);
        assert_eq!(pack.usage.remaining(), 0);
    }

    #[test]
    fn test_mandatory_rules_exceeding_budget_surface_overage() {
        let rules = vec![
            rule("E1", RuleSeverity::Error, RuleCategory::Api, 30),
            rule("S1", RuleSeverity::Info, RuleCategory::Security, 30),
            rule("W1", RuleSeverity::Warning, RuleCategory::Api, 1),
        ];
        let pack = RuleContextManager::default().pack_rules(&rules, &[], "c", 0);
        assert!(pack.contains("E1"));
        assert!(pack.contains("S1"));
        assert!(!pack.contains("W1"));
        assert_eq!(pack.usage.overage, 60);
        assert!(pack.summary.to_string().contains("exceed the budget by 60"));
    }

    #[test]
    fn test_inclusion_reasons() {
        let rules = vec![
            rule("E1", RuleSeverity::Error, RuleCategory::Api, 1),
            rule("S1", RuleSeverity::Warning, RuleCategory::Security, 1),
            rule("W1", RuleSeverity::Warning, RuleCategory::Api, 1),
        ];
        let pack = RuleContextManager::default().pack_rules(&rules, &[], "c", 100);
        let reasons: BTreeMap<&str, InclusionReason> = pack
            .included
            .iter()
            .map(|p| (p.rule.id.as_str(), p.reason))
            .collect();
        assert_eq!(reasons["E1"], InclusionReason::ErrorSeverity);
        assert_eq!(reasons["S1"], InclusionReason::SecurityCategory);
        assert_eq!(reasons["W1"], InclusionReason::FitsBudget);
    }

    #[test]
    fn test_filter_drops_rules_for_other_sections_and_disabled_rules() {
        let rules = vec![
            Rule::new("API", "api").applies_to([SectionId::ApiContract]),
            Rule::new("PERF", "perf").applies_to([SectionId::Performance]),
            Rule::new("ANY", "any"),
            Rule::new("OFF", "off").disabled(),
        ];
        let pack = RuleContextManager::default().pack_rules(
            &rules,
            &[SectionId::ApiContract],
            "c",
            1000,
        );
        assert_eq!(pack.included_ids(), vec!["API", "ANY"]);
        assert_eq!(pack.not_applicable, vec!["PERF".to_string(), "OFF".to_string()]);
    }

    #[test]
    fn test_included_rules_are_score_descending() {
        let rules = vec![
            rule("DOC", RuleSeverity::Info, RuleCategory::Documentation, 1),
            rule("TEST", RuleSeverity::Warning, RuleCategory::Testing, 1),
            rule("ERR", RuleSeverity::Error, RuleCategory::CodeQuality, 1),
        ];
        let pack = RuleContextManager::default().pack_rules(&rules, &[], "c", 100);
        assert_eq!(pack.included_ids(), vec!["ERR", "TEST", "DOC"]);
        let scores: Vec<u32> = pack.included.iter().map(|p| p.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_empty_rule_set_packs_cleanly() {
        let pack = RuleContextManager::default().pack(&[], &[SectionId::Security], "c");
        assert!(pack.is_empty());
        assert_eq!(pack.summary.to_string(), "Included 0 rules: 0 errors, 0 warnings, 0 info");
    }

    #[test]
    fn test_prompt_groups_by_category_and_notes_omissions() {
        let rules = vec![
            rule("S1", RuleSeverity::Error, RuleCategory::Security, 5)
                .with_description("Never log credentials"),
            rule("D1", RuleSeverity::Info, RuleCategory::Documentation, 50),
        ];
        let pack = RuleContextManager::default().pack_rules(&rules, &[], "c", 10);
        let prompt = pack.to_prompt();
        assert!(prompt.contains("## Security"));
        assert!(prompt.contains("- [error] **S1**: S1"));
        assert!(prompt.contains("Never log credentials"));
        assert!(prompt.contains("1 lower-priority rules omitted"));
    }
}
