//! Rule vocabulary: `Rule`, `RuleCategory`, `RuleSeverity`, `RuleLevel`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::spec::SectionId;

/// Functional area a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Security,
    Testing,
    Api,
    Performance,
    CodeQuality,
    Documentation,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Security => "security",
            RuleCategory::Testing => "testing",
            RuleCategory::Api => "api",
            RuleCategory::Performance => "performance",
            RuleCategory::CodeQuality => "code_quality",
            RuleCategory::Documentation => "documentation",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a violation of the rule is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    /// Must be fixed before proceeding.
    Error,
    Warning,
    Info,
}

impl RuleSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSeverity::Error => "error",
            RuleSeverity::Warning => "warning",
            RuleSeverity::Info => "info",
        }
    }
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope at which a rule was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleLevel {
    /// Declared on a single block.
    Local,
    /// Declared on a block and inherited by its descendants.
    Scoped,
    /// Applies project-wide.
    Global,
}

impl RuleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleLevel::Local => "local",
            RuleLevel::Scoped => "scoped",
            RuleLevel::Global => "global",
        }
    }
}

impl fmt::Display for RuleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_level() -> RuleLevel {
    RuleLevel::Global
}

fn default_category() -> RuleCategory {
    RuleCategory::CodeQuality
}

fn default_severity() -> RuleSeverity {
    RuleSeverity::Warning
}

fn default_enabled() -> bool {
    true
}

/// Section names; the literal `"all"` collapses the set to "everywhere".
fn deserialize_applies_to<'de, D>(deserializer: D) -> Result<BTreeSet<SectionId>, D::Error>
where
    D: Deserializer<'de>,
{
    let names: Vec<String> = Vec::deserialize(deserializer)?;
    if names.iter().any(|n| n == "all") {
        return Ok(BTreeSet::new());
    }
    names
        .iter()
        .map(|n| n.parse::<SectionId>().map_err(serde::de::Error::custom))
        .collect()
}

/// A policy rule. Immutable value object once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier, e.g. `"SEC-001"`.
    pub id: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: RuleCategory,
    #[serde(default = "default_severity")]
    pub severity: RuleSeverity,
    #[serde(default = "default_level")]
    pub level: RuleLevel,
    /// Sections the rule targets; empty means every section.
    #[serde(
        default,
        alias = "applies_to_sections",
        deserialize_with = "deserialize_applies_to"
    )]
    pub applies_to: BTreeSet<SectionId>,
    /// Name of the validator that checks the rule, if any.
    #[serde(default, alias = "validation_fn", skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Explicit size, overriding the text-based estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

impl Rule {
    /// A global, warning-level code-quality rule that applies everywhere.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: default_category(),
            severity: default_severity(),
            level: default_level(),
            applies_to: BTreeSet::new(),
            validator: None,
            description: String::new(),
            enabled: true,
            size: None,
        }
    }

    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_severity(mut self, severity: RuleSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_level(mut self, level: RuleLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_validator(mut self, validator: impl Into<String>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn applies_to(mut self, sections: impl IntoIterator<Item = SectionId>) -> Self {
        self.applies_to = sections.into_iter().collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Error-severity and security-category rules can never be dropped.
    pub fn is_mandatory(&self) -> bool {
        self.severity == RuleSeverity::Error || self.category == RuleCategory::Security
    }

    /// Whether the rule is relevant to any of `targets`.
    ///
    /// A rule without target sections applies everywhere, and an empty
    /// `targets` slice matches every rule.
    pub fn is_relevant_to(&self, targets: &[SectionId]) -> bool {
        self.applies_to.is_empty()
            || targets.is_empty()
            || targets.iter().any(|t| self.applies_to.contains(t))
    }

    /// Size charged against a packing budget.
    pub fn size(&self) -> usize {
        self.size.unwrap_or_else(|| self.estimated_size())
    }

    /// Token estimate from the rule text plus fixed formatting overhead.
    pub fn estimated_size(&self) -> usize {
        let sections = self
            .applies_to
            .iter()
            .map(SectionId::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let text = format!("{} {} {}{}", self.id, self.name, self.description, sections);
        text.len() / 4 + 20
    }
}
