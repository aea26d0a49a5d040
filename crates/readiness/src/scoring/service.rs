use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::aggregation::{CategoryScore, CompositePolicy, GroupScore};
use super::blueprint::ReadinessBlueprint;
use super::card::ScoreCard;
use super::domain::{
    CategoryId, ComponentId, ComponentSummary, EvaluationRecord, GroupId, ScorableUnit,
    ScoreSubmission, StudentId,
};
use super::group::{GroupMember, WeightedGroup};
use super::repository::{
    RepositoryError, ScoreChangeNotice, ScoreChangePublisher, ScorebookRepository,
};
use super::scorebook::{MutationOutcome, Scorebook, ScoreUpdate};
use super::validation::ScoringError;

/// Service composing the scorebook repository, the change publisher and the blueprint.
///
/// Writes are serialized so a reader never sees a scorebook between validation and commit.
pub struct ReadinessService<R, P> {
    repository: Arc<R>,
    publisher: Arc<P>,
    blueprint: Arc<ReadinessBlueprint>,
    writes: Mutex<()>,
    cards: Mutex<HashMap<StudentId, ScoreCard>>,
}

impl<R, P> ReadinessService<R, P>
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    pub fn new(repository: Arc<R>, publisher: Arc<P>, blueprint: ReadinessBlueprint) -> Self {
        Self {
            repository,
            publisher,
            blueprint: Arc::new(blueprint),
            writes: Mutex::new(()),
            cards: Mutex::new(HashMap::new()),
        }
    }

    pub fn blueprint(&self) -> &ReadinessBlueprint {
        &self.blueprint
    }

    /// Open an empty scorebook for a student.
    pub fn enroll(&self, student_id: StudentId) -> Result<ScoreCard, ReadinessServiceError> {
        let _guard = self.writes.lock().expect("write mutex poisoned");
        let scorebook = Scorebook::new(student_id.clone(), self.blueprint.as_ref().clone());
        let stored = self.repository.insert(scorebook)?;
        info!(%student_id, "student enrolled");
        Ok(self.remember(&stored))
    }

    pub fn students(&self) -> Result<Vec<StudentId>, ReadinessServiceError> {
        Ok(self.repository.students()?)
    }

    /// Registered components with their current score, ordered by component id.
    pub fn components(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<ComponentSummary>, ReadinessServiceError> {
        let book = self.load(student_id)?;
        Ok(book
            .units()
            .map(|registered| ComponentSummary {
                component_id: registered.unit.component_id().clone(),
                category: registered.category,
                kind: registered.unit.kind(),
                title: registered.unit.title().to_string(),
                score: book.records().score_of(registered.unit.component_id()),
            })
            .collect())
    }

    pub fn register_component(
        &self,
        student_id: &StudentId,
        unit: ScorableUnit,
        category: CategoryId,
    ) -> Result<MutationOutcome<ScorableUnit>, ReadinessServiceError> {
        self.mutate(student_id, |book| book.register_component(unit, category))
    }

    pub fn remove_component(
        &self,
        student_id: &StudentId,
        component_id: &ComponentId,
    ) -> Result<MutationOutcome<ScorableUnit>, ReadinessServiceError> {
        self.mutate(student_id, |book| book.remove_component(component_id))
    }

    pub fn submit_score(
        &self,
        student_id: &StudentId,
        submission: ScoreSubmission,
    ) -> Result<MutationOutcome<ScoreUpdate>, ReadinessServiceError> {
        self.mutate(student_id, |book| book.submit_score(submission))
    }

    pub fn get_score(
        &self,
        student_id: &StudentId,
        component_id: &ComponentId,
    ) -> Result<Option<EvaluationRecord>, ReadinessServiceError> {
        let book = self.load(student_id)?;
        if book.unit(component_id).is_none() {
            return Err(ScoringError::UnknownComponent(component_id.clone()).into());
        }
        Ok(book.get_score(component_id).cloned())
    }

    pub fn get_weights(
        &self,
        student_id: &StudentId,
        group_id: &GroupId,
    ) -> Result<Vec<GroupMember>, ReadinessServiceError> {
        Ok(self.load(student_id)?.get_weights(group_id)?)
    }

    pub fn set_weights(
        &self,
        student_id: &StudentId,
        group_id: &GroupId,
        weights: Vec<GroupMember>,
    ) -> Result<MutationOutcome<WeightedGroup>, ReadinessServiceError> {
        self.mutate(student_id, |book| book.set_weights(group_id, weights))
    }

    pub fn add_member(
        &self,
        student_id: &StudentId,
        group_id: &GroupId,
        component_id: &ComponentId,
        weight: Option<f64>,
    ) -> Result<MutationOutcome<WeightedGroup>, ReadinessServiceError> {
        self.mutate(student_id, |book| {
            book.add_member(group_id, component_id, weight)
        })
    }

    pub fn add_member_with_weights(
        &self,
        student_id: &StudentId,
        group_id: &GroupId,
        component_id: &ComponentId,
        weights: Vec<GroupMember>,
    ) -> Result<MutationOutcome<WeightedGroup>, ReadinessServiceError> {
        self.mutate(student_id, |book| {
            book.add_member_with_weights(group_id, component_id, weights)
        })
    }

    pub fn remove_member(
        &self,
        student_id: &StudentId,
        group_id: &GroupId,
        component_id: &ComponentId,
    ) -> Result<MutationOutcome<Option<WeightedGroup>>, ReadinessServiceError> {
        self.mutate(student_id, |book| book.remove_member(group_id, component_id))
    }

    pub fn set_policy(
        &self,
        student_id: &StudentId,
        policy: CompositePolicy,
    ) -> Result<MutationOutcome<CompositePolicy>, ReadinessServiceError> {
        self.mutate(student_id, |book| book.set_policy(policy))
    }

    pub fn group_score(
        &self,
        student_id: &StudentId,
        group_id: &GroupId,
    ) -> Result<GroupScore, ReadinessServiceError> {
        Ok(self.load(student_id)?.group_score(group_id)?)
    }

    pub fn category_score(
        &self,
        student_id: &StudentId,
        category: CategoryId,
    ) -> Result<CategoryScore, ReadinessServiceError> {
        Ok(self.load(student_id)?.category_score(category)?)
    }

    /// Current card, memoized per student and keyed by the scorebook version.
    pub fn score_card(&self, student_id: &StudentId) -> Result<ScoreCard, ReadinessServiceError> {
        let book = self.load(student_id)?;
        {
            let cards = self.cards.lock().expect("card cache mutex poisoned");
            if let Some(card) = cards
                .get(student_id)
                .filter(|card| card.version == book.version())
            {
                debug!(%student_id, version = card.version, "score card cache hit");
                return Ok(card.clone());
            }
        }
        Ok(self.remember(&book))
    }

    fn load(&self, student_id: &StudentId) -> Result<Scorebook, ReadinessServiceError> {
        Ok(self
            .repository
            .fetch(student_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn remember(&self, book: &Scorebook) -> ScoreCard {
        let card = book.recompute();
        self.cards
            .lock()
            .expect("card cache mutex poisoned")
            .insert(book.student_id().clone(), card.clone());
        card
    }

    fn mutate<T, F>(
        &self,
        student_id: &StudentId,
        apply: F,
    ) -> Result<MutationOutcome<T>, ReadinessServiceError>
    where
        F: FnOnce(&mut Scorebook) -> Result<MutationOutcome<T>, ScoringError>,
    {
        let _guard = self.writes.lock().expect("write mutex poisoned");
        let mut book = self.load(student_id)?;

        let outcome = apply(&mut book).map_err(|error| {
            warn!(%student_id, kind = error.kind(), %error, "scoring mutation rejected");
            error
        })?;

        self.repository.update(book)?;
        self.cards
            .lock()
            .expect("card cache mutex poisoned")
            .insert(student_id.clone(), outcome.card.clone());

        info!(
            %student_id,
            version = outcome.version,
            changes = outcome.changes.len(),
            trigger = ?outcome.trigger,
            "score card recomputed"
        );

        // The mutation is already stored; a lost notice must not turn it into an error.
        if !outcome.changes.is_empty() {
            if let Err(error) = self.publisher.publish(ScoreChangeNotice {
                student_id: student_id.clone(),
                trigger: outcome.trigger.clone(),
                changes: outcome.changes.clone(),
                version: outcome.version,
            }) {
                warn!(%student_id, version = outcome.version, %error, "score change notice dropped");
            }
        }

        Ok(outcome)
    }
}

/// Error raised by the readiness service.
#[derive(Debug, thiserror::Error)]
pub enum ReadinessServiceError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
