//! Weighted score aggregation for admissions readiness.
//!
//! Evaluators attach 0-10 scores to scorable units; operators assign weights to sibling units
//! inside weighted groups. Each category aggregator combines those inputs with its track rule
//! and the score card folds every category into one composite readiness score. All derived
//! values are recomputed from the underlying records on every mutation.

pub mod aggregation;
pub mod blueprint;
pub mod card;
pub mod domain;
pub mod group;
pub mod repository;
pub mod router;
pub mod scorebook;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use aggregation::{
    aggregate, BlendedSources, CategoryInputs, CategoryRule, CategoryScore, CategoryStatus,
    CategoryWeight, CompositePolicy, GroupScore,
};
pub use blueprint::{CategoryDefinition, ReadinessBlueprint};
pub use card::{CardState, ScoreCard, ScoreChange, ScoreTarget};
pub use domain::{
    CategoryId, ComponentId, ComponentSummary, EvaluationRecord, EvaluatorId, GroupId, RegisteredUnit,
    ScorableUnit, ScoreSubmission, StudentId, UnitKind, UnknownCategoryKey,
};
pub use group::{GroupMember, GroupStatus, WeightedGroup};
pub use repository::{
    PublishError, RepositoryError, ScoreChangeNotice, ScoreChangePublisher, ScorebookRepository,
};
pub use router::readiness_router;
pub use scorebook::{MutationOutcome, RecalculationTrigger, ScoreUpdate, Scorebook};
pub use service::{ReadinessService, ReadinessServiceError};
pub use snapshot::{GroupSnapshot, ScorebookSnapshot};
pub use store::EvaluationStore;
pub use validation::{ScoringError, WEIGHT_TOLERANCE};
