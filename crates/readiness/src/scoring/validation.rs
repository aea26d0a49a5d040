use std::collections::BTreeSet;

use super::domain::{CategoryId, ComponentId, GroupId};

/// Allowed drift when several weights must add up to 100.
pub const WEIGHT_TOLERANCE: f64 = 0.01;
pub const FULL_WEIGHT: f64 = 100.0;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Validation failures raised by the scoring model. None of them leave partial state behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("score {score} is outside the 0-10 range")]
    InvalidScore { score: f64 },
    #[error("weight {weight} for {component_id} is outside the 0-100 range")]
    WeightOutOfRange { component_id: String, weight: f64 },
    #[error("weights must sum to 100 (found {sum:.2})")]
    WeightSumInvalid { sum: f64 },
    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),
    #[error("group {group_id} is waiting for rebalanced weights (current sum {sum:.2})")]
    GroupNotReady { group_id: GroupId, sum: f64 },
    #[error("unknown group {0}")]
    UnknownGroup(GroupId),
    #[error("category {0} is not part of this model")]
    UnknownCategory(CategoryId),
    #[error("component {0} is already registered")]
    DuplicateComponent(ComponentId),
    #[error("category {0} is declared more than once")]
    DuplicateCategory(CategoryId),
    #[error("group {0} is declared by more than one category")]
    DuplicateGroup(GroupId),
    #[error("weights for group {group_id} must name each current member exactly once")]
    MembershipMismatch { group_id: GroupId },
    #[error("component {component_id} reports into {component_category}, not {group_category}")]
    CategoryMismatch {
        component_id: ComponentId,
        component_category: CategoryId,
        group_category: CategoryId,
    },
}

impl ScoringError {
    /// Stable machine readable discriminator for API payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            ScoringError::InvalidScore { .. } => "invalid_score",
            ScoringError::WeightOutOfRange { .. } => "weight_out_of_range",
            ScoringError::WeightSumInvalid { .. } => "weight_sum_invalid",
            ScoringError::UnknownComponent(_) => "unknown_component",
            ScoringError::GroupNotReady { .. } => "group_not_ready",
            ScoringError::UnknownGroup(_) => "unknown_group",
            ScoringError::UnknownCategory(_) => "unknown_category",
            ScoringError::DuplicateComponent(_) => "duplicate_component",
            ScoringError::DuplicateCategory(_) => "duplicate_category",
            ScoringError::DuplicateGroup(_) => "duplicate_group",
            ScoringError::MembershipMismatch { .. } => "membership_mismatch",
            ScoringError::CategoryMismatch { .. } => "category_mismatch",
        }
    }
}

pub fn validate_score(score: f64) -> Result<f64, ScoringError> {
    if score.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(score)
    } else {
        Err(ScoringError::InvalidScore { score })
    }
}

pub fn validate_weight(label: &str, weight: f64) -> Result<f64, ScoringError> {
    if weight.is_finite() && (0.0..=FULL_WEIGHT).contains(&weight) {
        Ok(weight)
    } else {
        Err(ScoringError::WeightOutOfRange {
            component_id: label.to_string(),
            weight,
        })
    }
}

/// Absorbs binary rounding so a sum landing on the tolerance edge (100.01, 99.99) still passes.
const SUM_SLACK: f64 = 1e-9;

pub fn weights_balanced(sum: f64) -> bool {
    (sum - FULL_WEIGHT).abs() <= WEIGHT_TOLERANCE + SUM_SLACK
}

/// Checks every weight's range and, when more than one entry is present, the sum.
pub fn validate_weight_set<'a, I>(entries: I) -> Result<f64, ScoringError>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut count = 0usize;
    let mut sum = 0.0;
    for (label, weight) in entries {
        sum += validate_weight(label, weight)?;
        count += 1;
    }

    if count > 1 && !weights_balanced(sum) {
        return Err(ScoringError::WeightSumInvalid { sum });
    }

    Ok(sum)
}

/// True when `proposed` names the same components as `current`, each once.
pub(crate) fn same_membership<'a>(
    current: impl IntoIterator<Item = &'a ComponentId>,
    proposed: impl IntoIterator<Item = &'a ComponentId>,
) -> bool {
    let current: Vec<&ComponentId> = current.into_iter().collect();
    let mut seen = BTreeSet::new();
    let mut proposed_len = 0usize;
    for id in proposed {
        if !seen.insert(id) {
            return false;
        }
        proposed_len += 1;
    }

    proposed_len == current.len() && current.iter().all(|id| seen.contains(id))
}
