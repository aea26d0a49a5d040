use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::super::domain::CategoryId;
use super::super::validation::{validate_weight_set, ScoringError, FULL_WEIGHT};

/// Share of the composite assigned to one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub category: CategoryId,
    pub weight: f64,
}

impl CategoryWeight {
    pub fn new(category: CategoryId, weight: f64) -> Self {
        Self { category, weight }
    }
}

/// Track-combination policy used for the overall readiness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolicyDraft")]
pub struct CompositePolicy {
    weights: Vec<CategoryWeight>,
    #[serde(default)]
    require_complete: bool,
}

#[derive(Deserialize)]
struct PolicyDraft {
    weights: Vec<CategoryWeight>,
    #[serde(default)]
    require_complete: bool,
}

impl TryFrom<PolicyDraft> for CompositePolicy {
    type Error = ScoringError;

    fn try_from(draft: PolicyDraft) -> Result<Self, Self::Error> {
        CompositePolicy::new(draft.weights, draft.require_complete)
    }
}

impl CompositePolicy {
    /// Validates the category weights with the same rule as group weights.
    pub fn new(weights: Vec<CategoryWeight>, require_complete: bool) -> Result<Self, ScoringError> {
        let mut seen = BTreeSet::new();
        for entry in &weights {
            if !seen.insert(entry.category) {
                return Err(ScoringError::DuplicateCategory(entry.category));
            }
        }

        validate_weight_set(
            weights
                .iter()
                .map(|entry| (entry.category.key(), entry.weight)),
        )?;

        Ok(Self {
            weights,
            require_complete,
        })
    }

    /// Splits 100 evenly across the given categories.
    pub fn equal(categories: &[CategoryId]) -> Self {
        let share = if categories.is_empty() {
            0.0
        } else {
            FULL_WEIGHT / categories.len() as f64
        };

        Self {
            weights: categories
                .iter()
                .map(|category| CategoryWeight::new(*category, share))
                .collect(),
            require_complete: false,
        }
    }

    pub fn requiring_completion(mut self, require_complete: bool) -> Self {
        self.require_complete = require_complete;
        self
    }

    pub fn weights(&self) -> &[CategoryWeight] {
        &self.weights
    }

    pub fn require_complete(&self) -> bool {
        self.require_complete
    }

    pub fn categories(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.weights.iter().map(|entry| entry.category)
    }

    /// Weighted mean over the categories that currently have a score.
    ///
    /// A lone contributing category passes its score through unchanged. Unscored categories
    /// drop out of both numerator and denominator.
    pub(crate) fn combine(&self, scores: &BTreeMap<CategoryId, Option<f64>>) -> Option<f64> {
        if let [only] = self.weights.as_slice() {
            return scores.get(&only.category).copied().flatten();
        }

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for entry in &self.weights {
            if let Some(score) = scores.get(&entry.category).copied().flatten() {
                numerator += score * entry.weight;
                denominator += entry.weight;
            }
        }

        (denominator > 0.0).then(|| numerator / denominator)
    }
}
