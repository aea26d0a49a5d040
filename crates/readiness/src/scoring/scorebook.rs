use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregation::{self, CategoryInputs, CategoryScore, CompositePolicy, GroupScore};
use super::blueprint::ReadinessBlueprint;
use super::card::{self, ScoreCard, ScoreChange};
use super::domain::{
    CategoryId, ComponentId, EvaluationRecord, GroupId, RegisteredUnit, ScorableUnit,
    ScoreSubmission, StudentId,
};
use super::group::{GroupMember, WeightedGroup};
use super::store::EvaluationStore;
use super::validation::{validate_score, ScoringError};

/// Event that invalidated the score card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecalculationTrigger {
    ComponentRegistered { component_id: ComponentId },
    ComponentRemoved { component_id: ComponentId },
    EvaluationSubmitted { component_id: ComponentId },
    WeightsUpdated { group_id: GroupId },
    MemberAdded { group_id: GroupId, component_id: ComponentId },
    MemberRemoved { group_id: GroupId, component_id: ComponentId },
    PolicyUpdated,
}

/// Result of a successful mutation: the updated value plus the recomputed card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationOutcome<T> {
    pub value: T,
    pub trigger: RecalculationTrigger,
    pub changes: Vec<ScoreChange>,
    pub card: ScoreCard,
    pub version: u64,
}

/// Record written by `submit_score` alongside the one it replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreUpdate {
    pub record: EvaluationRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<EvaluationRecord>,
}

/// One student's evaluation model: registered units, evaluation records and weighted groups.
///
/// Every mutating call validates first and mutates second, bumps the version and returns the
/// freshly recomputed [`ScoreCard`]. Reads never mutate.
#[derive(Debug, Clone)]
pub struct Scorebook {
    student_id: StudentId,
    blueprint: ReadinessBlueprint,
    units: BTreeMap<ComponentId, RegisteredUnit>,
    records: EvaluationStore,
    groups: BTreeMap<GroupId, WeightedGroup>,
    version: u64,
}

impl Scorebook {
    pub fn new(student_id: StudentId, blueprint: ReadinessBlueprint) -> Self {
        Self {
            student_id,
            blueprint,
            units: BTreeMap::new(),
            records: EvaluationStore::default(),
            groups: BTreeMap::new(),
            version: 0,
        }
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn blueprint(&self) -> &ReadinessBlueprint {
        &self.blueprint
    }

    pub fn policy(&self) -> &CompositePolicy {
        self.blueprint.policy()
    }

    pub fn unit(&self, component_id: &ComponentId) -> Option<&RegisteredUnit> {
        self.units.get(component_id)
    }

    pub fn units(&self) -> impl Iterator<Item = &RegisteredUnit> {
        self.units.values()
    }

    pub fn records(&self) -> &EvaluationStore {
        &self.records
    }

    pub fn groups(&self) -> impl Iterator<Item = &WeightedGroup> {
        self.groups.values()
    }

    pub fn group(&self, group_id: &GroupId) -> Option<&WeightedGroup> {
        self.groups.get(group_id)
    }

    pub fn register_component(
        &mut self,
        unit: ScorableUnit,
        category: CategoryId,
    ) -> Result<MutationOutcome<ScorableUnit>, ScoringError> {
        if self.blueprint.definition(category).is_none() {
            return Err(ScoringError::UnknownCategory(category));
        }
        let component_id = unit.component_id().clone();
        if self.units.contains_key(&component_id) {
            return Err(ScoringError::DuplicateComponent(component_id));
        }

        let before = self.recompute();
        self.units.insert(
            component_id.clone(),
            RegisteredUnit {
                category,
                unit: unit.clone(),
            },
        );
        Ok(self.commit(
            before,
            RecalculationTrigger::ComponentRegistered { component_id },
            unit,
        ))
    }

    /// Drops the unit, its evaluation and its group membership.
    pub fn remove_component(
        &mut self,
        component_id: &ComponentId,
    ) -> Result<MutationOutcome<ScorableUnit>, ScoringError> {
        let registered = self
            .units
            .get(component_id)
            .ok_or_else(|| ScoringError::UnknownComponent(component_id.clone()))?;

        let membership = self
            .groups
            .values()
            .find(|group| group.contains(component_id))
            .map(|group| {
                let mut next = group.clone();
                next.remove(component_id).map(|()| next)
            })
            .transpose()?;
        let unit = registered.unit.clone();

        let before = self.recompute();
        if let Some(next) = membership {
            self.store_group(next);
        }
        self.records.remove(component_id);
        self.units.remove(component_id);

        Ok(self.commit(
            before,
            RecalculationTrigger::ComponentRemoved {
                component_id: component_id.clone(),
            },
            unit,
        ))
    }

    pub fn submit_score(
        &mut self,
        submission: ScoreSubmission,
    ) -> Result<MutationOutcome<ScoreUpdate>, ScoringError> {
        self.submit_score_at(submission, Utc::now())
    }

    /// Same as `submit_score` with an explicit evaluation timestamp.
    pub fn submit_score_at(
        &mut self,
        submission: ScoreSubmission,
        evaluated_at: DateTime<Utc>,
    ) -> Result<MutationOutcome<ScoreUpdate>, ScoringError> {
        validate_score(submission.score)?;
        if !self.units.contains_key(&submission.component_id) {
            return Err(ScoringError::UnknownComponent(submission.component_id));
        }

        let component_id = submission.component_id.clone();
        let record = submission.into_record(evaluated_at);

        let before = self.recompute();
        let previous = self.records.put(record.clone());
        Ok(self.commit(
            before,
            RecalculationTrigger::EvaluationSubmitted { component_id },
            ScoreUpdate { record, previous },
        ))
    }

    pub fn get_score(&self, component_id: &ComponentId) -> Option<&EvaluationRecord> {
        self.records.get(component_id)
    }

    /// Exactly the weights last committed, in the order they were supplied.
    pub fn get_weights(&self, group_id: &GroupId) -> Result<Vec<GroupMember>, ScoringError> {
        self.owning_category(group_id)?;
        Ok(self
            .groups
            .get(group_id)
            .map(WeightedGroup::weights)
            .unwrap_or_default())
    }

    pub fn set_weights(
        &mut self,
        group_id: &GroupId,
        weights: Vec<GroupMember>,
    ) -> Result<MutationOutcome<WeightedGroup>, ScoringError> {
        self.owning_category(group_id)?;
        let mut next = match self.groups.get(group_id) {
            Some(group) => group.clone(),
            None => {
                return Err(ScoringError::MembershipMismatch {
                    group_id: group_id.clone(),
                })
            }
        };
        next.set_weights(&weights)?;

        let before = self.recompute();
        self.store_group(next.clone());
        Ok(self.commit(
            before,
            RecalculationTrigger::WeightsUpdated {
                group_id: group_id.clone(),
            },
            next,
        ))
    }

    /// Adds a member. The first member defaults to weight 100; later members park the group
    /// until the caller re-supplies a full weight set.
    pub fn add_member(
        &mut self,
        group_id: &GroupId,
        component_id: &ComponentId,
        weight: Option<f64>,
    ) -> Result<MutationOutcome<WeightedGroup>, ScoringError> {
        let next = match self.prepare_membership(group_id, component_id)? {
            Some(mut group) => {
                group.append(component_id.clone(), weight)?;
                group
            }
            None => self.start_group(group_id, component_id, weight)?,
        };
        self.apply_membership(group_id, component_id, next)
    }

    /// Adds a member and commits a complete, balanced weight set in the same step.
    pub fn add_member_with_weights(
        &mut self,
        group_id: &GroupId,
        component_id: &ComponentId,
        weights: Vec<GroupMember>,
    ) -> Result<MutationOutcome<WeightedGroup>, ScoringError> {
        let next = match self.prepare_membership(group_id, component_id)? {
            Some(mut group) => {
                group.append_with_weights(component_id.clone(), &weights)?;
                group
            }
            None => {
                let weight = match weights.as_slice() {
                    [only] if &only.component_id == component_id => Some(only.weight),
                    [] => None,
                    _ => {
                        return Err(ScoringError::MembershipMismatch {
                            group_id: group_id.clone(),
                        })
                    }
                };
                self.start_group(group_id, component_id, weight)?
            }
        };
        self.apply_membership(group_id, component_id, next)
    }

    /// Removes a member; returns `None` once the last member is gone and the group deleted.
    pub fn remove_member(
        &mut self,
        group_id: &GroupId,
        component_id: &ComponentId,
    ) -> Result<MutationOutcome<Option<WeightedGroup>>, ScoringError> {
        self.owning_category(group_id)?;
        let mut next = self
            .groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| ScoringError::UnknownComponent(component_id.clone()))?;
        next.remove(component_id)?;

        let before = self.recompute();
        let value = self.store_group(next);
        Ok(self.commit(
            before,
            RecalculationTrigger::MemberRemoved {
                group_id: group_id.clone(),
                component_id: component_id.clone(),
            },
            value,
        ))
    }

    /// Weighted score of one group; fails with `GroupNotReady` while weights are unbalanced.
    pub fn group_score(&self, group_id: &GroupId) -> Result<GroupScore, ScoringError> {
        self.owning_category(group_id)?;
        aggregation::weighted_group(group_id, self.groups.get(group_id), &self.records)
    }

    pub fn category_score(&self, category: CategoryId) -> Result<CategoryScore, ScoringError> {
        let definition = self
            .blueprint
            .definition(category)
            .ok_or(ScoringError::UnknownCategory(category))?;

        let units: Vec<&ScorableUnit> = self
            .units
            .values()
            .filter(|registered| registered.category == category)
            .map(|registered| &registered.unit)
            .collect();
        let group = definition
            .rule
            .group_id()
            .and_then(|group_id| self.groups.get(group_id));

        Ok(aggregation::aggregate(&CategoryInputs {
            category,
            rule: &definition.rule,
            units,
            group,
            records: &self.records,
        }))
    }

    /// Pure recomputation of every category and the composite.
    pub fn recompute(&self) -> ScoreCard {
        let breakdown = self
            .blueprint
            .categories()
            .iter()
            .filter_map(|definition| self.category_score(definition.category).ok())
            .collect();
        ScoreCard::assemble(breakdown, self.blueprint.policy(), self.version)
    }

    pub fn set_policy(
        &mut self,
        policy: CompositePolicy,
    ) -> Result<MutationOutcome<CompositePolicy>, ScoringError> {
        self.blueprint.check_policy(&policy)?;

        let before = self.recompute();
        self.blueprint = self.blueprint.clone().with_policy(policy.clone())?;
        Ok(self.commit(before, RecalculationTrigger::PolicyUpdated, policy))
    }

    fn commit<T>(
        &mut self,
        before: ScoreCard,
        trigger: RecalculationTrigger,
        value: T,
    ) -> MutationOutcome<T> {
        self.version += 1;
        let card = self.recompute();
        let changes = card::diff(&before, &card);
        MutationOutcome {
            value,
            trigger,
            changes,
            card,
            version: self.version,
        }
    }

    fn owning_category(&self, group_id: &GroupId) -> Result<CategoryId, ScoringError> {
        self.blueprint
            .group_owner(group_id)
            .ok_or_else(|| ScoringError::UnknownGroup(group_id.clone()))
    }

    /// Checks the component may join the group and returns a working copy of the group.
    fn prepare_membership(
        &self,
        group_id: &GroupId,
        component_id: &ComponentId,
    ) -> Result<Option<WeightedGroup>, ScoringError> {
        let group_category = self.owning_category(group_id)?;
        let registered = self
            .units
            .get(component_id)
            .ok_or_else(|| ScoringError::UnknownComponent(component_id.clone()))?;
        if registered.category != group_category {
            return Err(ScoringError::CategoryMismatch {
                component_id: component_id.clone(),
                component_category: registered.category,
                group_category,
            });
        }

        Ok(self.groups.get(group_id).cloned())
    }

    fn start_group(
        &self,
        group_id: &GroupId,
        component_id: &ComponentId,
        weight: Option<f64>,
    ) -> Result<WeightedGroup, ScoringError> {
        let category = self.owning_category(group_id)?;
        WeightedGroup::with_first_member(
            group_id.clone(),
            category,
            component_id.clone(),
            weight,
        )
    }

    fn apply_membership(
        &mut self,
        group_id: &GroupId,
        component_id: &ComponentId,
        next: WeightedGroup,
    ) -> Result<MutationOutcome<WeightedGroup>, ScoringError> {
        let before = self.recompute();
        self.store_group(next.clone());
        Ok(self.commit(
            before,
            RecalculationTrigger::MemberAdded {
                group_id: group_id.clone(),
                component_id: component_id.clone(),
            },
            next,
        ))
    }

    /// Writes the group back, deleting it once empty.
    fn store_group(&mut self, group: WeightedGroup) -> Option<WeightedGroup> {
        if group.is_empty() {
            self.groups.remove(group.group_id());
            None
        } else {
            self.groups.insert(group.group_id().clone(), group.clone());
            Some(group)
        }
    }
}
