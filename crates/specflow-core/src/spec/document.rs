//! The specification document agents are routed against.
//!
//! On disk a specification is a JSON or TOML document:
//!
//! ```toml
//! [spec]
//! id = "auth-service"
//! version = "1.2.0"
//!
//! [sections]
//! overview = "Issues and validates session tokens."
//! inputs = ["username", "password"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::spec::error::{SpecError, SpecResult};
use crate::spec::section::{Section, SectionContent, SectionId};

/// Identifying metadata of a specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecInfo {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SpecInfo {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            title: None,
        }
    }
}

/// Wire shape of a specification document.
#[derive(Debug, Serialize, Deserialize)]
struct SpecDocument {
    spec: SpecInfo,
    #[serde(default)]
    sections: BTreeMap<String, SectionContent>,
}

/// A loaded specification: metadata plus sections in catalog order.
///
/// Built once per run and shared read-only (behind an `Arc`) by the
/// orchestrator and every routed view.
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    info: SpecInfo,
    sections: BTreeMap<SectionId, Section>,
    source: Option<PathBuf>,
}

impl Specification {
    pub fn new(info: SpecInfo) -> Self {
        Self {
            info,
            sections: BTreeMap::new(),
            source: None,
        }
    }

    /// Builder-style section insertion. A later section with the same id
    /// replaces the earlier one.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.insert(section.id, section);
        self
    }

    pub fn with_text(self, id: SectionId, text: impl Into<String>) -> Self {
        self.with_section(Section::text(id, text))
    }

    pub fn info(&self) -> &SpecInfo {
        &self.info
    }

    /// File the specification was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(&id)
    }

    pub fn contains(&self, id: SectionId) -> bool {
        self.sections.contains_key(&id)
    }

    /// Section ids present in this specification, in catalog order.
    pub fn section_ids(&self) -> impl Iterator<Item = SectionId> + '_ {
        self.sections.keys().copied()
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sum of every section's size estimate.
    pub fn size_estimate(&self) -> usize {
        self.sections.values().map(Section::size_estimate).sum()
    }

    /// SHA-256 hex digest over the canonical JSON form of the document.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(&self.to_document()).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }

    pub fn from_json_str(input: &str) -> SpecResult<Self> {
        let doc: SpecDocument = serde_json::from_str(input)?;
        Self::from_document(doc)
    }

    pub fn from_toml_str(input: &str) -> SpecResult<Self> {
        let doc: SpecDocument = toml::from_str(input)?;
        Self::from_document(doc)
    }

    /// Load a specification file, picking the parser from the extension.
    pub fn load(path: impl AsRef<Path>) -> SpecResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut spec = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&raw)?,
            Some("toml") => Self::from_toml_str(&raw)?,
            other => {
                return Err(SpecError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };
        spec.source = Some(path.to_path_buf());
        Ok(spec)
    }

    pub fn to_json_string(&self) -> SpecResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    fn from_document(doc: SpecDocument) -> SpecResult<Self> {
        let sections = doc
            .sections
            .into_iter()
            .map(|(key, content)| {
                let id: SectionId = key.parse()?;
                Ok((id, Section::new(id, content)))
            })
            .collect::<SpecResult<BTreeMap<_, _>>>()?;
        Ok(Self {
            info: doc.spec,
            sections,
            source: None,
        })
    }

    fn to_document(&self) -> SpecDocument {
        SpecDocument {
            spec: self.info.clone(),
            sections: self
                .sections
                .iter()
                .map(|(id, s)| (id.to_string(), s.content.clone()))
                .collect(),
        }
    }
}
