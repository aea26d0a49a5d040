use serde::{Deserialize, Serialize};

use super::card::ScoreChange;
use super::domain::StudentId;
use super::scorebook::{RecalculationTrigger, Scorebook};

/// Storage abstraction so the service can run over memory or a document store.
pub trait ScorebookRepository: Send + Sync {
    fn insert(&self, scorebook: Scorebook) -> Result<Scorebook, RepositoryError>;
    fn update(&self, scorebook: Scorebook) -> Result<(), RepositoryError>;
    fn fetch(&self, student_id: &StudentId) -> Result<Option<Scorebook>, RepositoryError>;
    fn students(&self) -> Result<Vec<StudentId>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("scorebook already exists")]
    Conflict,
    #[error("scorebook not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for the notification layer; receives every non-empty change set.
pub trait ScoreChangePublisher: Send + Sync {
    fn publish(&self, notice: ScoreChangeNotice) -> Result<(), PublishError>;
}

/// Score movements caused by one mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChangeNotice {
    pub student_id: StudentId,
    pub trigger: RecalculationTrigger,
    pub changes: Vec<ScoreChange>,
    pub version: u64,
}

/// Notice dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("notice transport unavailable: {0}")]
    Transport(String),
}
