//! Sequential chunking and condensed summaries for large rule sets.

use std::collections::BTreeMap;

use crate::rules::model::{Rule, RuleCategory, RuleSeverity};

/// Split `rules` into sequential chunks whose total size stays within
/// `chunk_size`.
///
/// Input order is preserved and never re-ranked. A single rule larger than
/// `chunk_size` forms its own chunk.
pub fn chunk_rules(rules: &[Rule], chunk_size: usize) -> Vec<Vec<Rule>> {
    let mut chunks = Vec::new();
    let mut current: Vec<Rule> = Vec::new();
    let mut current_size = 0usize;

    for rule in rules {
        let size = rule.size();
        if !current.is_empty() && current_size + size > chunk_size {
            chunks.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current.push(rule.clone());
        current_size += size;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Display heading for a category.
pub fn category_title(category: RuleCategory) -> &'static str {
    match category {
        RuleCategory::Security => "Security",
        RuleCategory::Testing => "Testing",
        RuleCategory::Api => "Api",
        RuleCategory::Performance => "Performance",
        RuleCategory::CodeQuality => "Code Quality",
        RuleCategory::Documentation => "Documentation",
    }
}

/// Condensed per-category summary for rule sets too large to list.
pub fn summarize_rules(rules: &[Rule]) -> String {
    let mut by_category: BTreeMap<RuleCategory, Vec<&Rule>> = BTreeMap::new();
    for rule in rules {
        by_category.entry(rule.category).or_default().push(rule);
    }

    let mut lines = vec!["# Rules Summary\n".to_string()];
    for (category, rules) in by_category {
        let errors = rules
            .iter()
            .filter(|r| r.severity == RuleSeverity::Error)
            .count();
        let warnings = rules
            .iter()
            .filter(|r| r.severity == RuleSeverity::Warning)
            .count();

        lines.push(format!("## {} ({} rules)", category_title(category), rules.len()));
        if errors > 0 {
            lines.push(format!("- {errors} blocking errors"));
        }
        if warnings > 0 {
            lines.push(format!("- {warnings} warnings"));
        }

        let ids: Vec<&str> = rules.iter().take(5).map(|r| r.id.as_str()).collect();
        let more = if rules.len() > 5 { "..." } else { "" };
        lines.push(format!("- Key rules: {}{}", ids.join(", "), more));
        lines.push(String::new());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(id: &str, size: usize) -> Rule {
        Rule::new(id, id).with_size(size)
    }

    fn ids(chunk: &[Rule]) -> Vec<&str> {
        chunk.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_chunks_preserve_order_and_respect_size() {
        let rules = vec![sized("a", 4), sized("b", 4), sized("c", 4), sized("d", 1)];
        let chunks = chunk_rules(&rules, 8);
        assert_eq!(chunks.len(), 2);
        assert_eq!(ids(&chunks[0]), vec!["a", "b"]);
        assert_eq!(ids(&chunks[1]), vec!["c", "d"]);

        let flattened: Vec<Rule> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, rules);
    }

    #[test]
    fn test_oversized_rule_gets_its_own_chunk() {
        let rules = vec![sized("a", 2), sized("huge", 50), sized("b", 2)];
        let chunks = chunk_rules(&rules, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(ids(&chunks[1]), vec!["huge"]);
    }

    #[test]
    fn test_chunking_does_not_rerank_by_priority() {
        let rules = vec![
            sized("info", 5).with_severity(RuleSeverity::Info),
            sized("err", 5).with_severity(RuleSeverity::Error),
        ];
        let chunks = chunk_rules(&rules, 5);
        assert_eq!(ids(&chunks[0]), vec!["info"]);
        assert_eq!(ids(&chunks[1]), vec!["err"]);
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_rules(&[], 10).is_empty());
    }

    #[test]
    fn test_summary_counts_and_truncates_ids() {
        let mut rules: Vec<Rule> = (1..=6)
            .map(|i| Rule::new(format!("SEC-{i}"), "s").with_category(RuleCategory::Security))
            .collect();
        rules[0].severity = RuleSeverity::Error;
        rules.push(Rule::new("DOC-1", "d").with_category(RuleCategory::Documentation));

        let summary = summarize_rules(&rules);
        assert!(summary.contains("## Security (6 rules)"));
        assert!(summary.contains("- 1 blocking errors"));
        assert!(summary.contains("- 5 warnings"));
        assert!(summary.contains("SEC-1, SEC-2, SEC-3, SEC-4, SEC-5..."));
        assert!(summary.contains("## Documentation (1 rules)"));
    }
}
