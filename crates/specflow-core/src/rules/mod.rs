//! Policy rules and budgeted rule packing.
//!
//! - [`model`]: `Rule` and its category/severity/level vocabulary
//! - [`source`]: `RuleSet` loading from JSON or TOML
//! - [`context`]: `RuleContextManager::pack_rules` and `RulePack`
//! - [`chunk`]: sequential chunking and condensed summaries
//! - [`error`]: `RuleError`, `RuleResult`

pub mod chunk;
pub mod context;
pub mod error;
pub mod model;
pub mod source;

pub use chunk::{chunk_rules, summarize_rules};
pub use context::{
    ExcludedRule, ExclusionReason, InclusionReason, PackSummary, PackedRule, PriorityWeights,
    RuleContextManager, RulePack, DEFAULT_RULE_BUDGET,
};
pub use error::{RuleError, RuleResult};
pub use model::{Rule, RuleCategory, RuleLevel, RuleSeverity};
pub use source::RuleSet;
