use serde::{Deserialize, Serialize};

use super::aggregation::CompositePolicy;
use super::blueprint::ReadinessBlueprint;
use super::domain::{EvaluationRecord, GroupId, RegisteredUnit, ScoreSubmission, StudentId};
use super::group::{GroupMember, GroupStatus};
use super::scorebook::Scorebook;
use super::validation::ScoringError;

/// Persisted form of a weighted group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub group_id: GroupId,
    pub members: Vec<GroupMember>,
    #[serde(default)]
    pub pending: bool,
}

/// Serializable dump of a scorebook. Restoring replays it through the validating operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorebookSnapshot {
    pub student_id: StudentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<CompositePolicy>,
    #[serde(default)]
    pub components: Vec<RegisteredUnit>,
    #[serde(default)]
    pub groups: Vec<GroupSnapshot>,
    #[serde(default)]
    pub evaluations: Vec<EvaluationRecord>,
}

impl Scorebook {
    pub fn snapshot(&self) -> ScorebookSnapshot {
        ScorebookSnapshot {
            student_id: self.student_id().clone(),
            policy: Some(self.policy().clone()),
            components: self.units().cloned().collect(),
            groups: self
                .groups()
                .map(|group| GroupSnapshot {
                    group_id: group.group_id().clone(),
                    members: group.weights(),
                    pending: matches!(group.status(), GroupStatus::Pending { .. }),
                })
                .collect(),
            evaluations: self.records().iter().cloned().collect(),
        }
    }

    /// Rebuilds a scorebook; any record or weight set breaking an invariant aborts the restore.
    pub fn from_snapshot(
        blueprint: ReadinessBlueprint,
        snapshot: ScorebookSnapshot,
    ) -> Result<Self, ScoringError> {
        let ScorebookSnapshot {
            student_id,
            policy,
            components,
            groups,
            evaluations,
        } = snapshot;

        let mut scorebook = Scorebook::new(student_id, blueprint);
        if let Some(policy) = policy {
            scorebook.set_policy(policy)?;
        }

        for registered in components {
            scorebook.register_component(registered.unit, registered.category)?;
        }

        for group in groups {
            restore_group(&mut scorebook, group)?;
        }

        for record in evaluations {
            let evaluated_at = record.evaluated_at;
            let submission = ScoreSubmission {
                component_id: record.component_id,
                score: record.score,
                evaluator_id: record.evaluator_id,
                feedback: record.feedback,
            };
            scorebook.submit_score_at(submission, evaluated_at)?;
        }

        Ok(scorebook)
    }
}

fn restore_group(scorebook: &mut Scorebook, group: GroupSnapshot) -> Result<(), ScoringError> {
    let GroupSnapshot {
        group_id,
        members,
        pending,
    } = group;

    let Some((first, rest)) = members.split_first() else {
        return Ok(());
    };

    scorebook.add_member(&group_id, &first.component_id, Some(first.weight))?;
    for member in rest {
        scorebook.add_member(&group_id, &member.component_id, Some(member.weight))?;
    }

    if !rest.is_empty() && !pending {
        scorebook.set_weights(&group_id, members.clone())?;
    }
    Ok(())
}
