mod policy;
mod rules;

pub use policy::{CategoryWeight, CompositePolicy};
pub use rules::GroupScore;

pub(crate) use rules::weighted_group;

use serde::{Deserialize, Serialize};

use super::domain::{CategoryId, GroupId, ScorableUnit, UnitKind};
use super::group::WeightedGroup;
use super::store::EvaluationStore;

/// Track-specific combination rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CategoryRule {
    /// Score is the weighted sum over the group's evaluated members.
    WeightedGroup { group_id: GroupId },
    /// Half the mean of `leaves` units plus half the weighted group.
    Blended { leaves: UnitKind, group_id: GroupId },
    /// Mean of every evaluated unit registered to the category.
    SimpleAverage,
}

impl CategoryRule {
    pub fn group_id(&self) -> Option<&GroupId> {
        match self {
            CategoryRule::WeightedGroup { group_id } | CategoryRule::Blended { group_id, .. } => {
                Some(group_id)
            }
            CategoryRule::SimpleAverage => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            CategoryRule::WeightedGroup { .. } => "weighted_group",
            CategoryRule::Blended { .. } => "blended",
            CategoryRule::SimpleAverage => "simple_average",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Scored,
    AwaitingEvaluation,
    GroupNotReady,
}

/// Which halves of a blended category had data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendedSources {
    pub source_a_count: usize,
    pub source_a_total: usize,
    pub source_b_count: usize,
    pub source_b_total: usize,
}

/// Output of one category aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category: CategoryId,
    pub rule: &'static str,
    pub score: Option<f64>,
    pub evaluated_count: usize,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<BlendedSources>,
    pub status: CategoryStatus,
}

impl CategoryScore {
    fn new(category: CategoryId, rule: &CategoryRule, score: Option<f64>) -> Self {
        Self {
            category,
            rule: rule.label(),
            score,
            evaluated_count: 0,
            total_count: 0,
            sources: None,
            status: if score.is_some() {
                CategoryStatus::Scored
            } else {
                CategoryStatus::AwaitingEvaluation
            },
        }
    }

    fn suspended(category: CategoryId, rule: &CategoryRule, total_count: usize) -> Self {
        Self {
            total_count,
            status: CategoryStatus::GroupNotReady,
            ..Self::new(category, rule, None)
        }
    }
}

/// Everything a category aggregator reads. Borrowed so recomputation never mutates.
pub struct CategoryInputs<'a> {
    pub category: CategoryId,
    pub rule: &'a CategoryRule,
    pub units: Vec<&'a ScorableUnit>,
    pub group: Option<&'a WeightedGroup>,
    pub records: &'a EvaluationStore,
}

/// Pure recomputation of one category from its current inputs.
pub fn aggregate(inputs: &CategoryInputs<'_>) -> CategoryScore {
    let CategoryInputs {
        category,
        rule,
        units,
        group,
        records,
    } = inputs;
    let (category, rule) = (*category, *rule);
    let suspended_total = group.map(WeightedGroup::len).unwrap_or_default();

    match rule {
        CategoryRule::WeightedGroup { group_id } => {
            match rules::weighted_group(group_id, *group, records) {
                Ok(group_score) => CategoryScore {
                    evaluated_count: group_score.evaluated_count,
                    total_count: group_score.total_count,
                    ..CategoryScore::new(category, rule, group_score.score)
                },
                Err(_) => CategoryScore::suspended(category, rule, suspended_total),
            }
        }
        CategoryRule::Blended { leaves, group_id } => {
            let group_score = match rules::weighted_group(group_id, *group, records) {
                Ok(score) => score,
                Err(_) => {
                    let leaf_total = units.iter().filter(|unit| unit.kind() == *leaves).count();
                    return CategoryScore::suspended(category, rule, leaf_total + suspended_total);
                }
            };

            let leaf_ids = units
                .iter()
                .filter(|unit| unit.kind() == *leaves)
                .map(|unit| unit.component_id())
                .filter(|id| !group.is_some_and(|group| group.contains(id)));
            let source_a = rules::mean(leaf_ids, records);

            CategoryScore {
                evaluated_count: source_a.evaluated + group_score.evaluated_count,
                total_count: source_a.total + group_score.total_count,
                sources: Some(BlendedSources {
                    source_a_count: source_a.evaluated,
                    source_a_total: source_a.total,
                    source_b_count: group_score.evaluated_count,
                    source_b_total: group_score.total_count,
                }),
                ..CategoryScore::new(
                    category,
                    rule,
                    rules::blend(source_a.score, group_score.score),
                )
            }
        }
        CategoryRule::SimpleAverage => {
            let tally = rules::mean(units.iter().map(|unit| unit.component_id()), records);
            CategoryScore {
                evaluated_count: tally.evaluated,
                total_count: tally.total,
                ..CategoryScore::new(category, rule, tally.score)
            }
        }
    }
}
