//! Flow configuration files.
//!
//! A flow file (TOML or JSON, chosen by extension) sets the execution
//! strategy and budgets, extends the section policy table and describes the
//! agent graph, either as an explicit `[[agents]]` list or a named template.
//!
//! ```toml
//! strategy = "dag"
//! rule_budget = 2000
//! max_concurrent = 2
//! template = "full"
//!
//! [policies.docs_agent]
//! required = ["overview"]
//! optional = ["api_contract"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flow::{AgentSpec, FlowStrategy, FlowTemplate, InFlightPolicy, OrchestratorConfig};
use crate::routing::{SectionPolicyRegistry, SectionRouter};
use crate::rules::DEFAULT_RULE_BUDGET;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
    pub strategy: FlowStrategy,
    pub rule_budget: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_budget: Option<usize>,
    pub max_concurrent: usize,
    pub in_flight: InFlightPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Used when `agents` is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<FlowTemplate>,
    /// Overrides and additions to the standard section policies.
    pub policies: SectionPolicyRegistry,
    pub agents: Vec<AgentSpec>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            strategy: FlowStrategy::default(),
            rule_budget: DEFAULT_RULE_BUDGET,
            section_budget: None,
            max_concurrent: 4,
            in_flight: InFlightPolicy::default(),
            project_root: None,
            language: None,
            template: None,
            policies: SectionPolicyRegistry::empty(),
            agents: Vec::new(),
        }
    }
}

impl FlowConfig {
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&raw),
            Some("json") => Self::from_json_str(&raw),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.template.is_some() && !self.agents.is_empty() {
            return Err(ConfigError::Invalid(
                "set either `template` or `agents`, not both".to_string(),
            ));
        }
        Ok(())
    }

    /// Standard policies with this file's overrides applied.
    pub fn router(&self) -> SectionRouter {
        let mut registry = SectionPolicyRegistry::standard();
        registry.merge(self.policies.clone());
        SectionRouter::new(registry)
    }

    /// Explicit agents, else the template's, else none.
    pub fn agent_specs(&self) -> Vec<AgentSpec> {
        if !self.agents.is_empty() {
            return self.agents.clone();
        }
        self.template
            .map(|t| t.agent_specs())
            .unwrap_or_default()
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            strategy: self.strategy,
            rule_budget: self.rule_budget,
            section_budget: self.section_budget,
            max_concurrent: self.max_concurrent,
            in_flight: self.in_flight,
            project_root: self
                .project_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            language: self.language.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SectionId;

    #[test]
    fn test_defaults_when_file_is_empty() {
        let config = FlowConfig::from_toml_str("").unwrap();
        assert_eq!(config, FlowConfig::default());
        assert_eq!(config.rule_budget, 4000);
        assert_eq!(config.strategy, FlowStrategy::Sequential);
        assert_eq!(config.in_flight, InFlightPolicy::Detach);
    }

    #[test]
    fn test_toml_with_agents_and_policies() {
        let raw = r#"
strategy = "dag"
rule_budget = 500
in_flight = "drain"
language = "rust"

[policies.docs_agent]
required = ["overview"]

[[agents]]
name = "coding_agent"
provides = ["code"]
priority = 100

[[agents]]
name = "docs_agent"
depends_on = ["coding_agent"]
"#;
        let config = FlowConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.strategy, FlowStrategy::Dag);
        assert_eq!(config.in_flight, InFlightPolicy::Drain);
        assert_eq!(config.agent_specs().len(), 2);

        let router = config.router();
        assert_eq!(router.required_sections("docs_agent"), vec![SectionId::Overview]);
        assert!(router.registry().get("coding_agent").is_some());

        let orch = config.orchestrator_config();
        assert_eq!(orch.rule_budget, 500);
        assert_eq!(orch.language.as_deref(), Some("rust"));
    }

    #[test]
    fn test_template_supplies_agents() {
        let config = FlowConfig::from_json_str(r#"{"template": "quick"}"#).unwrap();
        let names: Vec<String> = config.agent_specs().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["coding_agent", "security_agent"]);
    }

    #[test]
    fn test_template_alias_in_flow_file() {
        let config = FlowConfig::from_toml_str("template = \"test\"").unwrap();
        assert_eq!(config.template, Some(FlowTemplate::TestFocused));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            FlowConfig::from_toml_str("max_concurrent = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            FlowConfig::from_toml_str("strategy = \"parallel\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            FlowConfig::from_toml_str("retries = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.toml");
        std::fs::write(&path, "strategy = \"dag\"").unwrap();
        assert_eq!(FlowConfig::load(&path).unwrap().strategy, FlowStrategy::Dag);

        let yaml = dir.path().join("flow.yaml");
        std::fs::write(&yaml, "strategy: dag").unwrap();
        assert!(matches!(
            FlowConfig::load(&yaml),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
    }
}
