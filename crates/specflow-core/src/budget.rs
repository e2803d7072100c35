//! Priority packing under a size budget.
//!
//! Shared by rule packing and budgeted section routing. Candidates are
//! ranked by descending score (stable, so equal scores keep input order).
//! Mandatory candidates are always taken and their size is charged first;
//! the budget is soft for them and hard for everything else. Optional
//! candidates are then taken greedily in rank order while they fit.

use serde::{Deserialize, Serialize};

/// An item offered to the packer.
#[derive(Debug, Clone)]
pub struct Candidate<T> {
    pub item: T,
    pub score: u32,
    pub size: usize,
    pub mandatory: bool,
}

impl<T> Candidate<T> {
    pub fn new(item: T, score: u32, size: usize, mandatory: bool) -> Self {
        Self {
            item,
            score,
            size,
            mandatory,
        }
    }
}

/// Outcome of [`pack`].
#[derive(Debug, Clone)]
pub struct Packed<T> {
    /// Taken candidates in rank order.
    pub included: Vec<Candidate<T>>,
    /// Optional candidates that did not fit, in rank order.
    pub excluded: Vec<Candidate<T>>,
    pub usage: BudgetUsage,
}

/// Budget accounting for a packing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetUsage {
    /// Configured limit.
    pub budget: usize,
    /// Total size of everything included.
    pub consumed: usize,
    /// Size charged by mandatory candidates alone.
    pub mandatory: usize,
    /// How far mandatory candidates alone overshoot the budget.
    pub overage: usize,
}

impl BudgetUsage {
    pub fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.consumed)
    }

    pub fn is_over_budget(&self) -> bool {
        self.overage > 0
    }
}

/// Pack `candidates` into `budget`.
pub fn pack<T>(candidates: Vec<Candidate<T>>, budget: usize) -> Packed<T> {
    let mut ranked = candidates;
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    let mandatory: usize = ranked.iter().filter(|c| c.mandatory).map(|c| c.size).sum();
    // May go negative; optional fill then takes nothing.
    let mut remaining = budget as i128 - mandatory as i128;
    let mut consumed = mandatory;

    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for candidate in ranked {
        if candidate.mandatory {
            included.push(candidate);
        } else if candidate.size as i128 <= remaining {
            remaining -= candidate.size as i128;
            consumed += candidate.size;
            included.push(candidate);
        } else {
            excluded.push(candidate);
        }
    }

    Packed {
        included,
        excluded,
        usage: BudgetUsage {
            budget,
            consumed,
            mandatory,
            overage: mandatory.saturating_sub(budget),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(name: &'static str, score: u32, size: usize, mandatory: bool) -> Candidate<&'static str> {
        Candidate::new(name, score, size, mandatory)
    }

    fn names(v: &[Candidate<&'static str>]) -> Vec<&'static str> {
        v.iter().map(|c| c.item).collect()
    }

    #[test]
    fn test_mandatory_items_survive_zero_budget() {
        let packed = pack(vec![c("a", 10, 5, true), c("b", 90, 1, false)], 0);
        assert_eq!(names(&packed.included), vec!["a"]);
        assert_eq!(names(&packed.excluded), vec!["b"]);
        assert_eq!(packed.usage.overage, 5);
        assert!(packed.usage.is_over_budget());
    }

    #[test]
    fn test_optional_fill_respects_remaining_budget() {
        let packed = pack(
            vec![
                c("m", 100, 4, true),
                c("big", 80, 7, false),
                c("small", 50, 3, false),
                c("tiny", 10, 4, false),
            ],
            10,
        );
        // 4 mandatory, 6 left: big does not fit, small does, tiny does not.
        assert_eq!(names(&packed.included), vec!["m", "small"]);
        assert_eq!(names(&packed.excluded), vec!["big", "tiny"]);
        assert_eq!(packed.usage.consumed, 7);
        assert_eq!(packed.usage.remaining(), 3);
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let packed = pack(
            vec![c("first", 50, 1, false), c("second", 50, 1, false), c("third", 50, 1, false)],
            100,
        );
        assert_eq!(names(&packed.included), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_included_items_are_rank_ordered_across_mandatory_and_optional() {
        let packed = pack(
            vec![c("low-mandatory", 10, 1, true), c("high-optional", 99, 1, false)],
            10,
        );
        assert_eq!(names(&packed.included), vec!["high-optional", "low-mandatory"]);
    }

    #[test]
    fn test_empty_input_is_a_valid_outcome() {
        let packed: Packed<&str> = pack(Vec::new(), 10);
        assert!(packed.included.is_empty());
        assert_eq!(packed.usage.consumed, 0);
    }
}
