use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::aggregation::{CategoryScore, CompositePolicy};
use super::domain::CategoryId;

/// Completion state of a score card. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardState {
    Empty,
    Partial,
    Complete,
}

impl CardState {
    pub const fn label(self) -> &'static str {
        match self {
            CardState::Empty => "empty",
            CardState::Partial => "partial",
            CardState::Complete => "complete",
        }
    }
}

/// Derived summary of every category plus the composite readiness score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub version: u64,
    pub category_scores: BTreeMap<CategoryId, Option<f64>>,
    pub breakdown: Vec<CategoryScore>,
    pub overall_score: Option<f64>,
    pub state: CardState,
    pub is_complete: bool,
}

impl ScoreCard {
    pub fn assemble(breakdown: Vec<CategoryScore>, policy: &CompositePolicy, version: u64) -> Self {
        let category_scores: BTreeMap<CategoryId, Option<f64>> = breakdown
            .iter()
            .map(|entry| (entry.category, entry.score))
            .collect();

        let scored = category_scores.values().filter(|score| score.is_some()).count();
        let state = if scored == 0 {
            CardState::Empty
        } else if scored == category_scores.len() {
            CardState::Complete
        } else {
            CardState::Partial
        };
        let is_complete = state == CardState::Complete;

        let overall_score = if policy.require_complete() && !is_complete {
            None
        } else {
            policy.combine(&category_scores)
        };

        Self {
            version,
            category_scores,
            breakdown,
            overall_score,
            state,
            is_complete,
        }
    }

    pub fn category(&self, category: CategoryId) -> Option<&CategoryScore> {
        self.breakdown
            .iter()
            .find(|entry| entry.category == category)
    }

    pub fn score_of(&self, category: CategoryId) -> Option<f64> {
        self.category_scores.get(&category).copied().flatten()
    }
}

/// What moved between two cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum ScoreTarget {
    Category(CategoryId),
    Overall,
}

/// Old and new value of a score affected by a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub target: ScoreTarget,
    pub before: Option<f64>,
    pub after: Option<f64>,
}

/// Lists every category (and the overall score) whose value differs between cards.
pub fn diff(before: &ScoreCard, after: &ScoreCard) -> Vec<ScoreChange> {
    let mut changes = Vec::new();
    let categories = before
        .category_scores
        .keys()
        .chain(after.category_scores.keys())
        .copied()
        .collect::<std::collections::BTreeSet<_>>();

    for category in categories {
        let old = before.score_of(category);
        let new = after.score_of(category);
        if old != new {
            changes.push(ScoreChange {
                target: ScoreTarget::Category(category),
                before: old,
                after: new,
            });
        }
    }

    if before.overall_score != after.overall_score {
        changes.push(ScoreChange {
            target: ScoreTarget::Overall,
            before: before.overall_score,
            after: after.overall_score,
        });
    }

    changes
}
