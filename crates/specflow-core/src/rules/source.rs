//! Rule sources: JSON arrays, `{"rules": [...]}` objects and TOML
//! `[[rules]]` tables.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::rules::error::{RuleError, RuleResult};
use crate::rules::model::Rule;

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRuleSource {
    List(Vec<Rule>),
    Wrapped { rules: Vec<Rule> },
}

#[derive(Deserialize)]
struct TomlRuleSource {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// A validated, ordered collection of rules with unique identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validate and wrap `rules`, keeping their order.
    pub fn new(rules: Vec<Rule>) -> RuleResult<Self> {
        let mut seen = HashSet::new();
        for (position, rule) in rules.iter().enumerate() {
            if rule.id.trim().is_empty() {
                return Err(RuleError::EmptyIdentifier { position });
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleError::DuplicateRule {
                    id: rule.id.clone(),
                });
            }
        }
        Ok(Self { rules })
    }

    pub fn from_json_str(raw: &str) -> RuleResult<Self> {
        let rules = match serde_json::from_str(raw)? {
            JsonRuleSource::List(rules) => rules,
            JsonRuleSource::Wrapped { rules } => rules,
        };
        Self::new(rules)
    }

    pub fn from_toml_str(raw: &str) -> RuleResult<Self> {
        let source: TomlRuleSource = toml::from_str(raw)?;
        Self::new(source.rules)
    }

    /// Load from a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> RuleResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            Some("toml") => Self::from_toml_str(&raw),
            other => Err(RuleError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn as_slice(&self) -> &[Rule] {
        &self.rules
    }

    pub fn into_vec(self) -> Vec<Rule> {
        self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
