//! Loading rule files and packing them per consumer.

use std::sync::Arc;

use specflow_core::rules::{ExclusionReason, InclusionReason};
use specflow_core::{
    chunk_rules, summarize_rules, RuleContextManager, RuleError, RuleSet, RuleSeverity, SectionId,
    SectionRouter, SpecInfo, Specification,
};

const RULES_TOML: &str = r#"
[[rules]]
id = "SEC-001"
name = "Never log credentials"
category = "security"
severity = "warning"
applies_to = ["security"]

[[rules]]
id = "API-001"
name = "Version every endpoint"
category = "api"
severity = "error"
applies_to = ["api_contract"]
size = 30

[[rules]]
id = "TEST-001"
name = "Cover every edge case"
category = "testing"
applies_to = ["test_cases", "edge_cases"]
size = 30

[[rules]]
id = "DOC-001"
name = "Public items have docs"
category = "documentation"
severity = "info"
applies_to = ["all"]
size = 30

[[rules]]
id = "OLD-001"
name = "Retired rule"
enabled = false
"#;

fn rules() -> RuleSet {
    RuleSet::from_toml_str(RULES_TOML).unwrap()
}

#[test]
fn test_load_rule_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.toml");
    std::fs::write(&path, RULES_TOML).unwrap();

    let loaded = RuleSet::load(&path).unwrap();
    assert_eq!(loaded.len(), 5);
    assert!(loaded.get("DOC-001").unwrap().applies_to.is_empty());
    assert_eq!(loaded.get("API-001").unwrap().severity, RuleSeverity::Error);
    assert!(!loaded.get("OLD-001").unwrap().enabled);
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let raw = r#"[{"id": "R1", "name": "a"}, {"id": "R1", "name": "b"}]"#;
    assert!(matches!(
        RuleSet::from_json_str(raw),
        Err(RuleError::DuplicateRule { id }) if id == "R1"
    ));
}

#[test]
fn test_pack_for_routed_security_consumer() {
    let spec = Arc::new(
        Specification::new(SpecInfo::new("svc", "1"))
            .with_text(SectionId::Security, "tls only")
            .with_text(SectionId::ApiContract, "GET /v1/items"),
    );
    let routed = SectionRouter::default()
        .route(&spec, "security_agent")
        .unwrap();

    let pack = RuleContextManager::default().pack(
        rules().as_slice(),
        routed.section_ids(),
        "security_agent",
    );

    assert_eq!(pack.included_ids(), vec!["API-001", "SEC-001", "DOC-001"]);
    assert_eq!(pack.not_applicable, vec!["TEST-001", "OLD-001"]);
    assert!(pack.excluded.is_empty());

    let reasons: Vec<InclusionReason> = pack.included.iter().map(|p| p.reason).collect();
    assert_eq!(
        reasons,
        vec![
            InclusionReason::ErrorSeverity,
            InclusionReason::SecurityCategory,
            InclusionReason::FitsBudget,
        ]
    );
}

#[test]
fn test_tight_budget_drops_optional_rules_but_keeps_mandatory() {
    let all = rules();
    let pack = RuleContextManager::default().pack_rules(all.as_slice(), &[], "coding_agent", 40);

    assert!(pack.contains("API-001"));
    assert!(pack.contains("SEC-001"));
    assert_eq!(pack.excluded_ids(), vec!["TEST-001", "DOC-001"]);
    assert!(pack
        .excluded
        .iter()
        .all(|e| e.reason == ExclusionReason::BudgetExceeded));

    let summary = pack.summary.to_string();
    assert!(summary.starts_with("Included 2 rules: 1 errors, 1 warnings, 0 info"));
    assert!(summary.contains("Excluded 2 rules due to context limits: TEST-001, DOC-001"));

    let prompt = pack.to_prompt();
    assert!(prompt.starts_with("# Active Rules"));
    assert!(prompt.contains("2 lower-priority rules omitted"));
}

#[test]
fn test_chunks_and_summary_cover_the_whole_set() {
    let all = rules();
    let chunks = chunk_rules(all.as_slice(), 60);
    let flattened: Vec<&str> = chunks.iter().flatten().map(|r| r.id.as_str()).collect();
    let original: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(flattened, original);
    assert!(chunks
        .iter()
        .all(|c| c.len() == 1 || c.iter().map(|r| r.size()).sum::<usize>() <= 60));

    let summary = summarize_rules(all.as_slice());
    assert!(summary.starts_with("# Rules Summary"));
    assert!(summary.contains("## Security (1 rules)"));
    assert!(summary.contains("- 1 blocking errors"));
}
