//! Static consumer → section policy table.
//!
//! The registry is configuration: [`SectionPolicyRegistry::standard`] carries
//! the built-in table, and a flow config file can override or extend it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::spec::SectionId;

/// Sections a consumer needs. Optional sections are listed in priority order,
/// highest first; budgeted routing drops them from the end.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionPolicy {
    #[serde(default)]
    pub required: Vec<SectionId>,
    #[serde(default)]
    pub optional: Vec<SectionId>,
}

impl SectionPolicy {
    pub fn new(
        required: impl IntoIterator<Item = SectionId>,
        optional: impl IntoIterator<Item = SectionId>,
    ) -> Self {
        Self {
            required: required.into_iter().collect(),
            optional: optional.into_iter().collect(),
        }
    }

    /// Whether `id` is required or optional under this policy.
    pub fn allows(&self, id: SectionId) -> bool {
        self.required.contains(&id) || self.optional.contains(&id)
    }
}

/// Policies keyed by consumer identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionPolicyRegistry {
    policies: BTreeMap<String, SectionPolicy>,
}

impl SectionPolicyRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in table for the standard agent roster.
    pub fn standard() -> Self {
        use SectionId::*;

        let test_policy = SectionPolicy::new(
            [TestCases, EdgeCases, Inputs, Outputs],
            [ApiContract, ErrorHandling],
        );

        let mut registry = Self::empty();
        registry.register(
            "coding_agent",
            SectionPolicy::new(
                [Overview, Inputs, Outputs, ApiContract, Dependencies],
                [Implementation, ErrorHandling],
            ),
        );
        registry.register("test_generator_agent", test_policy.clone());
        registry.register("testing_agent", test_policy);
        registry.register(
            "security_agent",
            SectionPolicy::new([Security, ApiContract], [Inputs, Outputs, Dependencies]),
        );
        registry.register(
            "performance_agent",
            SectionPolicy::new([Performance, ApiContract], [Dependencies, Implementation]),
        );
        registry.register(
            "code_review_agent",
            SectionPolicy::new(
                [Overview, ApiContract, Security, ErrorHandling],
                [Performance, Implementation],
            ),
        );
        registry.register("linter_agent", SectionPolicy::new([Metadata], []));
        registry.register(
            "architecture_agent",
            SectionPolicy::new([Overview, Dependencies, ApiContract], [Implementation]),
        );
        registry
    }

    /// Register or replace the policy for `consumer`.
    pub fn register(&mut self, consumer: impl Into<String>, policy: SectionPolicy) {
        self.policies.insert(consumer.into(), policy);
    }

    /// Overlay `other` on top of this registry; its entries win.
    pub fn merge(&mut self, other: SectionPolicyRegistry) {
        self.policies.extend(other.policies);
    }

    pub fn get(&self, consumer: &str) -> Option<&SectionPolicy> {
        self.policies.get(consumer)
    }

    pub fn consumers(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_covers_roster() {
        let registry = SectionPolicyRegistry::standard();
        for consumer in [
            "coding_agent",
            "test_generator_agent",
            "testing_agent",
            "security_agent",
            "performance_agent",
            "code_review_agent",
            "linter_agent",
            "architecture_agent",
        ] {
            assert!(registry.get(consumer).is_some(), "missing {consumer}");
        }
    }

    #[test]
    fn test_merge_overrides_existing_policy() {
        let mut registry = SectionPolicyRegistry::standard();
        let mut overlay = SectionPolicyRegistry::empty();
        overlay.register("linter_agent", SectionPolicy::new([SectionId::Overview], []));
        overlay.register("docs_agent", SectionPolicy::new([SectionId::Overview], []));
        registry.merge(overlay);

        assert_eq!(
            registry.get("linter_agent").unwrap().required,
            vec![SectionId::Overview]
        );
        assert!(registry.get("docs_agent").is_some());
    }

    #[test]
    fn test_registry_deserializes_from_toml_table() {
        let raw = r#"
[docs_agent]
required = ["overview"]
optional = ["api_contract", "implementation"]
"#;
        let registry: SectionPolicyRegistry = toml::from_str(raw).unwrap();
        let policy = registry.get("docs_agent").unwrap();
        assert!(policy.allows(SectionId::Implementation));
        assert!(!policy.allows(SectionId::Security));
    }
}
