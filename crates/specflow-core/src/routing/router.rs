//! Routes specification sections to consumers according to their policy.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::budget::{self, BudgetUsage, Candidate};
use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::policy::{SectionPolicy, SectionPolicyRegistry};
use crate::spec::{Section, SectionId, Specification};

/// A consumer's view of a specification: a subset of its sections.
#[derive(Debug, Clone)]
pub struct RoutedSpec {
    consumer: String,
    spec: Arc<Specification>,
    sections: Vec<SectionId>,
    omitted: Vec<SectionId>,
    size_estimate: usize,
    usage: Option<BudgetUsage>,
}

impl RoutedSpec {
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// The specification this view was cut from.
    pub fn specification(&self) -> &Arc<Specification> {
        &self.spec
    }

    /// Routed section ids: required first, then optional, in policy order.
    pub fn section_ids(&self) -> &[SectionId] {
        &self.sections
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter_map(|id| self.spec.section(*id))
    }

    pub fn contains(&self, id: SectionId) -> bool {
        self.sections.contains(&id)
    }

    /// Optional sections present in the spec but dropped to fit a budget.
    pub fn omitted(&self) -> &[SectionId] {
        &self.omitted
    }

    pub fn size_estimate(&self) -> usize {
        self.size_estimate
    }

    /// Budget accounting, when the view was produced by
    /// [`SectionRouter::route_within`].
    pub fn budget_usage(&self) -> Option<BudgetUsage> {
        self.usage
    }

    /// Render the view as prompt context for the consumer.
    pub fn to_prompt_context(&self) -> String {
        let mut lines = vec![format!("# Relevant Spec Sections for {}\n", self.consumer)];
        for section in self.sections() {
            lines.push(format!("## {}", section.id.title()));
            lines.push(section.content.render());
            lines.push(String::new());
        }
        lines.join("\n")
    }

    /// Serializable summary of the view (for CLI and logging).
    pub fn describe(&self) -> RoutedSpecSummary {
        RoutedSpecSummary {
            consumer: self.consumer.clone(),
            spec_id: self.spec.info().id.clone(),
            sections: self.sections.clone(),
            omitted: self.omitted.clone(),
            size_estimate: self.size_estimate,
        }
    }
}

/// Flat description of a [`RoutedSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedSpecSummary {
    pub consumer: String,
    pub spec_id: String,
    pub sections: Vec<SectionId>,
    pub omitted: Vec<SectionId>,
    pub size_estimate: usize,
}

/// Section router backed by a [`SectionPolicyRegistry`].
#[derive(Debug, Clone)]
pub struct SectionRouter {
    registry: SectionPolicyRegistry,
}

impl Default for SectionRouter {
    fn default() -> Self {
        Self::new(SectionPolicyRegistry::standard())
    }
}

impl SectionRouter {
    pub fn new(registry: SectionPolicyRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SectionPolicyRegistry {
        &self.registry
    }

    pub fn register(&mut self, consumer: impl Into<String>, policy: SectionPolicy) {
        self.registry.register(consumer, policy);
    }

    /// Required sections for `consumer`, or an empty list when unknown.
    pub fn required_sections(&self, consumer: &str) -> Vec<SectionId> {
        self.registry
            .get(consumer)
            .map(|p| p.required.clone())
            .unwrap_or_default()
    }

    /// Route every required section plus every optional section present.
    pub fn route(&self, spec: &Arc<Specification>, consumer: &str) -> RoutingResult<RoutedSpec> {
        let policy = self.checked_policy(spec, consumer)?;
        let sections = Self::candidate_ids(spec, policy);
        let size_estimate = Self::size_of(spec, &sections);

        debug!(
            consumer = %consumer,
            sections = sections.len(),
            size_estimate,
            "routed specification"
        );

        Ok(RoutedSpec {
            consumer: consumer.to_string(),
            spec: Arc::clone(spec),
            sections,
            omitted: Vec::new(),
            size_estimate,
            usage: None,
        })
    }

    /// Route under a size budget.
    ///
    /// Required sections are always kept even when they alone exceed
    /// `budget` (the overage is reported in [`RoutedSpec::budget_usage`]).
    /// Optional sections are ranked by their position in the policy and the
    /// lowest-ranked ones are dropped first.
    pub fn route_within(
        &self,
        spec: &Arc<Specification>,
        consumer: &str,
        budget: usize,
    ) -> RoutingResult<RoutedSpec> {
        let policy = self.checked_policy(spec, consumer)?;
        let ordered = Self::candidate_ids(spec, policy);

        let optional_count = policy.optional.len() as u32;
        let candidates = ordered
            .iter()
            .map(|id| {
                let size = spec.section(*id).map(Section::size_estimate).unwrap_or(0);
                if policy.required.contains(id) {
                    Candidate::new(*id, u32::MAX, size, true)
                } else {
                    let rank = policy.optional.iter().position(|o| o == id).unwrap_or(0) as u32;
                    Candidate::new(*id, optional_count - rank, size, false)
                }
            })
            .collect();

        let packed = budget::pack(candidates, budget);
        let kept: HashSet<SectionId> = packed.included.iter().map(|c| c.item).collect();
        let (sections, omitted): (Vec<SectionId>, Vec<SectionId>) =
            ordered.into_iter().partition(|id| kept.contains(id));

        if !omitted.is_empty() {
            debug!(
                consumer = %consumer,
                omitted = ?omitted,
                budget,
                "dropped optional sections to fit budget"
            );
        }

        Ok(RoutedSpec {
            consumer: consumer.to_string(),
            spec: Arc::clone(spec),
            sections,
            omitted,
            size_estimate: packed.usage.consumed,
            usage: Some(packed.usage),
        })
    }

    fn checked_policy<'a>(
        &'a self,
        spec: &Specification,
        consumer: &str,
    ) -> RoutingResult<&'a SectionPolicy> {
        let policy = self
            .registry
            .get(consumer)
            .ok_or_else(|| RoutingError::UnknownConsumer {
                consumer: consumer.to_string(),
            })?;

        let missing: Vec<SectionId> = policy
            .required
            .iter()
            .copied()
            .filter(|id| !spec.contains(*id))
            .collect();
        if !missing.is_empty() {
            return Err(RoutingError::MissingRequiredSection {
                consumer: consumer.to_string(),
                missing,
            });
        }
        Ok(policy)
    }

    /// Required ids then present optional ids, without duplicates.
    fn candidate_ids(spec: &Specification, policy: &SectionPolicy) -> Vec<SectionId> {
        let mut ids: Vec<SectionId> = Vec::new();
        for id in &policy.required {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        for id in &policy.optional {
            if spec.contains(*id) && !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    fn size_of(spec: &Specification, ids: &[SectionId]) -> usize {
        ids.iter()
            .filter_map(|id| spec.section(*id))
            .map(Section::size_estimate)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SpecInfo;

    fn security_spec() -> Arc<Specification> {
        Arc::new(
            Specification::new(SpecInfo::new("auth", "1.0"))
                .with_text(SectionId::Security, "never log secrets")
                .with_text(SectionId::ApiContract, "POST /login")
                .with_text(SectionId::Inputs, "username, password")
                .with_text(SectionId::Overview, "login service"),
        )
    }

    #[test]
    fn test_route_includes_required_and_present_optional() {
        let router = SectionRouter::default();
        let routed = router.route(&security_spec(), "security_agent").unwrap();
        assert_eq!(
            routed.section_ids(),
            &[SectionId::Security, SectionId::ApiContract, SectionId::Inputs]
        );
        assert!(!routed.contains(SectionId::Overview));
    }

    #[test]
    fn test_route_unknown_consumer_fails() {
        let router = SectionRouter::default();
        let err = router.route(&security_spec(), "docs_agent").unwrap_err();
        assert_eq!(
            err,
            RoutingError::UnknownConsumer {
                consumer: "docs_agent".to_string()
            }
        );
    }

    #[test]
    fn test_route_reports_every_missing_required_section() {
        let router = SectionRouter::default();
        let err = router.route(&security_spec(), "coding_agent").unwrap_err();
        match err {
            RoutingError::MissingRequiredSection { missing, .. } => {
                assert_eq!(
                    missing,
                    vec![SectionId::Outputs, SectionId::Dependencies]
                );
            }
            other => panic!("expected MissingRequiredSection, got {other:?}"),
        }
    }

    #[test]
    fn test_size_estimate_sums_routed_sections() {
        let router = SectionRouter::default();
        let spec = security_spec();
        let routed = router.route(&spec, "security_agent").unwrap();
        let expected: usize = routed.sections().map(Section::size_estimate).sum();
        assert_eq!(routed.size_estimate(), expected);
    }

    #[test]
    fn test_prompt_context_has_heading_per_section() {
        let router = SectionRouter::default();
        let routed = router.route(&security_spec(), "security_agent").unwrap();
        let prompt = routed.to_prompt_context();
        assert!(prompt.starts_with("# Relevant Spec Sections for security_agent"));
        assert!(prompt.contains("## Api Contract"));
        assert!(prompt.contains("never log secrets"));
        assert!(!prompt.contains("login service"));
    }

    #[test]
    fn test_route_within_drops_lowest_priority_optional_first() {
        let spec = Arc::new(
            Specification::new(SpecInfo::new("s", "1"))
                .with_text(SectionId::Security, "x".repeat(40))
                .with_text(SectionId::Inputs, "i".repeat(40))
                .with_text(SectionId::Outputs, "o".repeat(40))
                .with_text(SectionId::Dependencies, "d".repeat(40))
                .with_text(SectionId::ApiContract, "a".repeat(40)),
        );
        let router = SectionRouter::default();
        // Each section estimates to 10; required (security, api_contract) = 20.
        let routed = router.route_within(&spec, "security_agent", 40).unwrap();
        assert_eq!(
            routed.section_ids(),
            &[
                SectionId::Security,
                SectionId::ApiContract,
                SectionId::Inputs,
                SectionId::Outputs
            ]
        );
        assert_eq!(routed.omitted(), &[SectionId::Dependencies]);
        assert_eq!(routed.size_estimate(), 40);
    }

    #[test]
    fn test_route_within_keeps_required_over_budget() {
        let router = SectionRouter::default();
        let routed = router.route_within(&security_spec(), "security_agent", 0).unwrap();
        assert_eq!(
            routed.section_ids(),
            &[SectionId::Security, SectionId::ApiContract]
        );
        let usage = routed.budget_usage().unwrap();
        assert!(usage.is_over_budget());
    }
}
