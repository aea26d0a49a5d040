use serde::{Deserialize, Serialize};

use super::domain::{CategoryId, ComponentId, GroupId};
use super::validation::{
    same_membership, validate_weight, validate_weight_set, ScoringError, FULL_WEIGHT,
};

/// One sibling inside a weighted group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub component_id: ComponentId,
    pub weight: f64,
}

impl GroupMember {
    pub fn new(component_id: impl Into<ComponentId>, weight: f64) -> Self {
        Self {
            component_id: component_id.into(),
            weight,
        }
    }
}

/// Whether the group's weights can currently be used for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GroupStatus {
    Balanced,
    Pending { sum: f64 },
}

/// Sibling components whose contributions are operator-assigned percentages.
///
/// Weight sets are validated as a whole before they replace the stored members, so a
/// balanced group is never observed half-written. Structural edits (appending a member
/// without a full weight set, removing one of several members) park the group in
/// [`GroupStatus::Pending`] until `set_weights` supplies a balanced set again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedGroup {
    group_id: GroupId,
    category: CategoryId,
    members: Vec<GroupMember>,
    #[serde(default)]
    awaiting_weights: bool,
    #[serde(default)]
    revision: u64,
}

impl WeightedGroup {
    /// Starts a group with its first member; weight defaults to 100.
    pub fn with_first_member(
        group_id: GroupId,
        category: CategoryId,
        component_id: ComponentId,
        weight: Option<f64>,
    ) -> Result<Self, ScoringError> {
        let weight = validate_weight(component_id.as_str(), weight.unwrap_or(FULL_WEIGHT))?;
        Ok(Self {
            group_id,
            category,
            members: vec![GroupMember {
                component_id,
                weight,
            }],
            awaiting_weights: false,
            revision: 1,
        })
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn weights(&self) -> Vec<GroupMember> {
        self.members.clone()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, component_id: &ComponentId) -> bool {
        self.members
            .iter()
            .any(|member| &member.component_id == component_id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn weight_sum(&self) -> f64 {
        self.members.iter().map(|member| member.weight).sum()
    }

    pub fn status(&self) -> GroupStatus {
        if self.members.len() > 1 && self.awaiting_weights {
            GroupStatus::Pending {
                sum: self.weight_sum(),
            }
        } else {
            GroupStatus::Balanced
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status(), GroupStatus::Balanced)
    }

    /// Replaces every weight at once. The set must name exactly the current members.
    pub fn set_weights(&mut self, weights: &[GroupMember]) -> Result<(), ScoringError> {
        self.check_membership(
            self.members.iter().map(|member| &member.component_id),
            weights,
        )?;
        validate_weight_set(
            weights
                .iter()
                .map(|member| (member.component_id.as_str(), member.weight)),
        )?;

        self.members = weights.to_vec();
        self.awaiting_weights = false;
        self.revision += 1;
        Ok(())
    }

    /// Appends a member without touching sibling weights; a multi-member group goes pending.
    pub fn append(
        &mut self,
        component_id: ComponentId,
        weight: Option<f64>,
    ) -> Result<(), ScoringError> {
        if self.contains(&component_id) {
            return Err(ScoringError::DuplicateComponent(component_id));
        }

        let default = if self.members.is_empty() {
            FULL_WEIGHT
        } else {
            0.0
        };
        let weight = validate_weight(component_id.as_str(), weight.unwrap_or(default))?;

        self.members.push(GroupMember {
            component_id,
            weight,
        });
        self.awaiting_weights = self.members.len() > 1;
        self.revision += 1;
        Ok(())
    }

    /// Appends a member and rebalances every weight in the same step.
    pub fn append_with_weights(
        &mut self,
        component_id: ComponentId,
        weights: &[GroupMember],
    ) -> Result<(), ScoringError> {
        if self.contains(&component_id) {
            return Err(ScoringError::DuplicateComponent(component_id));
        }

        self.check_membership(
            self.members
                .iter()
                .map(|member| &member.component_id)
                .chain(std::iter::once(&component_id)),
            weights,
        )?;
        validate_weight_set(
            weights
                .iter()
                .map(|member| (member.component_id.as_str(), member.weight)),
        )?;

        self.members = weights.to_vec();
        self.awaiting_weights = false;
        self.revision += 1;
        Ok(())
    }

    /// Drops a member. A lone survivor is forced to 100; several survivors go pending.
    pub fn remove(&mut self, component_id: &ComponentId) -> Result<(), ScoringError> {
        let position = self
            .members
            .iter()
            .position(|member| &member.component_id == component_id)
            .ok_or_else(|| ScoringError::UnknownComponent(component_id.clone()))?;

        self.members.remove(position);
        match self.members.as_mut_slice() {
            [] => self.awaiting_weights = false,
            [survivor] => {
                survivor.weight = FULL_WEIGHT;
                self.awaiting_weights = false;
            }
            _ => self.awaiting_weights = true,
        }
        self.revision += 1;
        Ok(())
    }

    pub(crate) fn ensure_ready(&self) -> Result<(), ScoringError> {
        match self.status() {
            GroupStatus::Balanced => Ok(()),
            GroupStatus::Pending { sum } => Err(ScoringError::GroupNotReady {
                group_id: self.group_id.clone(),
                sum,
            }),
        }
    }

    fn check_membership<'a>(
        &self,
        expected: impl IntoIterator<Item = &'a ComponentId>,
        weights: &'a [GroupMember],
    ) -> Result<(), ScoringError> {
        if same_membership(expected, weights.iter().map(|member| &member.component_id)) {
            Ok(())
        } else {
            Err(ScoringError::MembershipMismatch {
                group_id: self.group_id.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(members: &[(&str, f64)]) -> WeightedGroup {
        let (first, rest) = members.split_first().expect("at least one member");
        let mut group = WeightedGroup::with_first_member(
            GroupId::from("pointer-2"),
            CategoryId::Pointer2,
            ComponentId::from(first.0),
            Some(first.1),
        )
        .expect("first member accepted");
        if !rest.is_empty() {
            let weights: Vec<GroupMember> = members
                .iter()
                .map(|(id, weight)| GroupMember::new(*id, *weight))
                .collect();
            for (id, _) in rest {
                group
                    .append(ComponentId::from(*id), None)
                    .expect("member appended");
            }
            group.set_weights(&weights).expect("weights balanced");
        }
        group
    }

    #[test]
    fn first_member_defaults_to_full_weight() {
        let group = WeightedGroup::with_first_member(
            GroupId::from("g"),
            CategoryId::Pointer3,
            ComponentId::from("a"),
            None,
        )
        .expect("group created");
        assert_eq!(group.members()[0].weight, 100.0);
        assert!(group.is_ready());
    }

    #[test]
    fn set_weights_accepts_balanced_and_rejects_overflow() {
        let mut group = group(&[("a", 50.0), ("b", 30.0), ("c", 20.0)]);
        let revision = group.revision();

        let err = group
            .set_weights(&[
                GroupMember::new("a", 50.0),
                GroupMember::new("b", 30.0),
                GroupMember::new("c", 21.0),
            ])
            .expect_err("sum of 101 rejected");

        match err {
            ScoringError::WeightSumInvalid { sum } => assert!((sum - 101.0).abs() < 1e-9),
            other => panic!("expected weight sum error, got {other:?}"),
        }
        assert_eq!(group.revision(), revision, "rejected set leaves no trace");
        assert_eq!(group.members()[2].weight, 20.0);
    }

    #[test]
    fn set_weights_rejects_unknown_members() {
        let mut group = group(&[("a", 60.0), ("b", 40.0)]);
        let err = group
            .set_weights(&[GroupMember::new("a", 60.0), GroupMember::new("z", 40.0)])
            .expect_err("foreign member rejected");
        assert!(matches!(err, ScoringError::MembershipMismatch { .. }));
    }

    #[test]
    fn single_member_accepts_any_in_range_weight() {
        let mut group = group(&[("a", 100.0)]);
        group
            .set_weights(&[GroupMember::new("a", 35.0)])
            .expect("single weight is informational");
        assert!(group.is_ready());
        assert!(group.set_weights(&[GroupMember::new("a", 101.0)]).is_err());
    }

    #[test]
    fn appending_parks_group_until_rebalanced() {
        let mut group = group(&[("a", 100.0)]);
        group
            .append(ComponentId::from("b"), None)
            .expect("member appended");

        assert!(matches!(group.status(), GroupStatus::Pending { sum } if sum == 100.0));
        assert!(group.ensure_ready().is_err());

        group
            .set_weights(&[GroupMember::new("a", 70.0), GroupMember::new("b", 30.0)])
            .expect("balanced");
        assert!(group.is_ready());
    }

    #[test]
    fn removing_down_to_one_member_forces_full_weight() {
        let mut group = group(&[("a", 70.0), ("b", 30.0)]);
        group.remove(&ComponentId::from("a")).expect("removed");
        assert_eq!(group.weights(), vec![GroupMember::new("b", 100.0)]);
        assert!(group.is_ready());
    }

    #[test]
    fn removing_from_three_members_requires_rebalance() {
        let mut group = group(&[("a", 40.0), ("b", 40.0), ("c", 20.0)]);
        group.remove(&ComponentId::from("c")).expect("removed");
        assert!(!group.is_ready());
        assert!(matches!(
            group.remove(&ComponentId::from("c")),
            Err(ScoringError::UnknownComponent(_))
        ));
    }
}
