use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::aggregation::{CategoryRule, CompositePolicy};
use super::domain::{CategoryId, GroupId, UnitKind};
use super::validation::ScoringError;

/// A track together with its combination rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub category: CategoryId,
    pub rule: CategoryRule,
}

/// The registered categories and the composite policy every scorebook starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessBlueprint {
    categories: Vec<CategoryDefinition>,
    policy: CompositePolicy,
}

impl ReadinessBlueprint {
    pub fn standard() -> Self {
        let categories = standard_categories();
        let policy = CompositePolicy::equal(
            &categories
                .iter()
                .map(|definition| definition.category)
                .collect::<Vec<_>>(),
        );
        Self { categories, policy }
    }

    pub fn new(
        categories: Vec<CategoryDefinition>,
        policy: CompositePolicy,
    ) -> Result<Self, ScoringError> {
        let mut seen_categories = BTreeSet::new();
        let mut seen_groups = BTreeSet::new();
        for definition in &categories {
            if !seen_categories.insert(definition.category) {
                return Err(ScoringError::DuplicateCategory(definition.category));
            }
            if let Some(group_id) = definition.rule.group_id() {
                if !seen_groups.insert(group_id.clone()) {
                    return Err(ScoringError::DuplicateGroup(group_id.clone()));
                }
            }
        }

        let blueprint = Self {
            categories,
            policy: CompositePolicy::equal(&[]),
        };
        blueprint.with_policy(policy)
    }

    /// Swaps the composite policy; every weighted category must be registered.
    pub fn with_policy(mut self, policy: CompositePolicy) -> Result<Self, ScoringError> {
        self.check_policy(&policy)?;
        self.policy = policy;
        Ok(self)
    }

    pub fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    pub fn policy(&self) -> &CompositePolicy {
        &self.policy
    }

    pub fn definition(&self, category: CategoryId) -> Option<&CategoryDefinition> {
        self.categories
            .iter()
            .find(|definition| definition.category == category)
    }

    /// Category whose rule reads the given group.
    pub fn group_owner(&self, group_id: &GroupId) -> Option<CategoryId> {
        self.categories
            .iter()
            .find(|definition| definition.rule.group_id() == Some(group_id))
            .map(|definition| definition.category)
    }

    pub(crate) fn check_policy(&self, policy: &CompositePolicy) -> Result<(), ScoringError> {
        match policy
            .categories()
            .find(|category| self.definition(*category).is_none())
        {
            Some(missing) => Err(ScoringError::UnknownCategory(missing)),
            None => Ok(()),
        }
    }
}

fn standard_categories() -> Vec<CategoryDefinition> {
    vec![
        CategoryDefinition {
            category: CategoryId::FormalAcademic,
            rule: CategoryRule::Blended {
                leaves: UnitKind::Document,
                group_id: GroupId::from("formal-academic-subsections"),
            },
        },
        CategoryDefinition {
            category: CategoryId::InformalAcademic,
            rule: CategoryRule::WeightedGroup {
                group_id: GroupId::from("informal-academic"),
            },
        },
        CategoryDefinition {
            category: CategoryId::Pointer2,
            rule: CategoryRule::WeightedGroup {
                group_id: GroupId::from("pointer-2"),
            },
        },
        CategoryDefinition {
            category: CategoryId::Pointer3,
            rule: CategoryRule::WeightedGroup {
                group_id: GroupId::from("pointer-3"),
            },
        },
        CategoryDefinition {
            category: CategoryId::Pointer4,
            rule: CategoryRule::WeightedGroup {
                group_id: GroupId::from("pointer-4"),
            },
        },
        CategoryDefinition {
            category: CategoryId::EnrichmentCourses,
            rule: CategoryRule::SimpleAverage,
        },
    ]
}
