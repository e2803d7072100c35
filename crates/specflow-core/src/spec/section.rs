//! Section catalog: the fixed vocabulary of specification sections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::spec::error::SpecError;

/// Identifier of a specification section.
///
/// Variant order is the canonical catalog order; `Ord` follows it, so a
/// `BTreeMap<SectionId, _>` iterates sections the way a spec document lists
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Metadata,
    Overview,
    Inputs,
    Outputs,
    Dependencies,
    ApiContract,
    TestCases,
    EdgeCases,
    ErrorHandling,
    Performance,
    Security,
    Implementation,
    Acceptance,
}

impl SectionId {
    /// Every section in catalog order.
    pub const ALL: [SectionId; 13] = [
        SectionId::Metadata,
        SectionId::Overview,
        SectionId::Inputs,
        SectionId::Outputs,
        SectionId::Dependencies,
        SectionId::ApiContract,
        SectionId::TestCases,
        SectionId::EdgeCases,
        SectionId::ErrorHandling,
        SectionId::Performance,
        SectionId::Security,
        SectionId::Implementation,
        SectionId::Acceptance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Metadata => "metadata",
            SectionId::Overview => "overview",
            SectionId::Inputs => "inputs",
            SectionId::Outputs => "outputs",
            SectionId::Dependencies => "dependencies",
            SectionId::ApiContract => "api_contract",
            SectionId::TestCases => "test_cases",
            SectionId::EdgeCases => "edge_cases",
            SectionId::ErrorHandling => "error_handling",
            SectionId::Performance => "performance",
            SectionId::Security => "security",
            SectionId::Implementation => "implementation",
            SectionId::Acceptance => "acceptance",
        }
    }

    /// Heading used when rendering a section, e.g. `"Api Contract"`.
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| SpecError::UnknownSection(s.to_string()))
    }
}

/// Content held by a section.
///
/// Deserialized untagged: a JSON/TOML string becomes `Text`, an array of
/// strings becomes `Items`, anything else is kept as `Structured`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionContent {
    Text(String),
    Items(Vec<String>),
    Structured(serde_json::Value),
}

impl SectionContent {
    /// Render the content the way it is presented to an agent.
    pub fn render(&self) -> String {
        match self {
            SectionContent::Text(text) if text.is_empty() => "(empty)".to_string(),
            SectionContent::Text(text) => text.clone(),
            SectionContent::Items(items) if items.is_empty() => "(empty)".to_string(),
            SectionContent::Items(items) => items
                .iter()
                .map(|item| format!("- {item}"))
                .collect::<Vec<_>>()
                .join("\n"),
            SectionContent::Structured(serde_json::Value::Null) => "(empty)".to_string(),
            SectionContent::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    fn raw_len(&self) -> usize {
        match self {
            SectionContent::Text(text) => text.len(),
            SectionContent::Items(items) => items.iter().map(|i| i.len() + 2).sum(),
            SectionContent::Structured(value) => value.to_string().len(),
        }
    }
}

/// A single, immutable specification section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub content: SectionContent,
}

impl Section {
    pub fn new(id: SectionId, content: SectionContent) -> Self {
        Self { id, content }
    }

    pub fn text(id: SectionId, text: impl Into<String>) -> Self {
        Self::new(id, SectionContent::Text(text.into()))
    }

    pub fn items<I, S>(id: SectionId, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            id,
            SectionContent::Items(items.into_iter().map(Into::into).collect()),
        )
    }

    /// Rough token estimate: four bytes of content per token.
    pub fn size_estimate(&self) -> usize {
        self.content.raw_len() / 4
    }
}
