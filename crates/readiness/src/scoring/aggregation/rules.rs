use serde::{Deserialize, Serialize};

use super::super::domain::{ComponentId, GroupId};
use super::super::group::WeightedGroup;
use super::super::store::EvaluationStore;
use super::super::validation::{ScoringError, FULL_WEIGHT, MAX_SCORE};

/// Weighted contribution of one group, with completeness counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupScore {
    pub group_id: GroupId,
    pub score: Option<f64>,
    pub evaluated_count: usize,
    pub total_count: usize,
    pub revision: u64,
}

/// Running tally over a set of leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Tally {
    pub score: Option<f64>,
    pub evaluated: usize,
    pub total: usize,
}

/// `sum(score * weight / 100)` over evaluated members. Unevaluated weight is not redistributed,
/// and a lone member contributes its raw score whatever its stored weight. Weights may overshoot
/// 100 by the tolerance, so the total is capped at the top of the score range.
pub(crate) fn weighted_group(
    group_id: &GroupId,
    group: Option<&WeightedGroup>,
    records: &EvaluationStore,
) -> Result<GroupScore, ScoringError> {
    let Some(group) = group else {
        return Ok(GroupScore {
            group_id: group_id.clone(),
            score: None,
            evaluated_count: 0,
            total_count: 0,
            revision: 0,
        });
    };

    group.ensure_ready()?;

    let members = group.members();
    let mut evaluated = 0usize;
    let mut total = 0.0;
    for member in members {
        if let Some(score) = records.score_of(&member.component_id) {
            evaluated += 1;
            total += if members.len() == 1 {
                score
            } else {
                score * member.weight / FULL_WEIGHT
            };
        }
    }

    Ok(GroupScore {
        group_id: group.group_id().clone(),
        score: (evaluated > 0).then_some(total.min(MAX_SCORE)),
        evaluated_count: evaluated,
        total_count: members.len(),
        revision: group.revision(),
    })
}

/// Unweighted arithmetic mean of whatever has been evaluated.
pub(crate) fn mean<'a>(
    components: impl IntoIterator<Item = &'a ComponentId>,
    records: &EvaluationStore,
) -> Tally {
    let mut tally = Tally::default();
    let mut sum = 0.0;
    for component_id in components {
        tally.total += 1;
        if let Some(score) = records.score_of(component_id) {
            tally.evaluated += 1;
            sum += score;
        }
    }

    if tally.evaluated > 0 {
        tally.score = Some(sum / tally.evaluated as f64);
    }
    tally
}

/// `a / 2 + b / 2`; a missing half contributes zero, both missing yields nothing.
pub(crate) fn blend(source_a: Option<f64>, source_b: Option<f64>) -> Option<f64> {
    if source_a.is_none() && source_b.is_none() {
        return None;
    }
    Some(source_a.unwrap_or(0.0) / 2.0 + source_b.unwrap_or(0.0) / 2.0)
}
