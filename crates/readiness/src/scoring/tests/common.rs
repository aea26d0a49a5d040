use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::scoring::{
    readiness_router, CategoryId, ComponentId, GroupId, PublishError, ReadinessBlueprint,
    ReadinessService, RepositoryError, ScorableUnit, ScoreChangeNotice, ScoreChangePublisher,
    ScoreSubmission, Scorebook, ScorebookRepository, StudentId,
};

pub(super) const EVALUATOR: &str = "evaluator-7";

pub(super) fn student() -> StudentId {
    StudentId::from("stu-1001")
}

pub(super) fn document(id: &str, title: &str) -> ScorableUnit {
    ScorableUnit::Document {
        component_id: ComponentId::from(id),
        title: title.to_string(),
        document_type: Some("transcript".to_string()),
    }
}

pub(super) fn activity(id: &str, name: &str) -> ScorableUnit {
    ScorableUnit::Activity {
        component_id: ComponentId::from(id),
        name: name.to_string(),
        description: None,
    }
}

pub(super) fn subsection(id: &str, label: &str) -> ScorableUnit {
    ScorableUnit::Subsection {
        component_id: ComponentId::from(id),
        section: "formal-academic".to_string(),
        label: label.to_string(),
    }
}

pub(super) fn course(id: &str, name: &str) -> ScorableUnit {
    ScorableUnit::CourseCertificate {
        component_id: ComponentId::from(id),
        course_name: name.to_string(),
        provider: Some("Coursera".to_string()),
    }
}

pub(super) fn pointer_2() -> GroupId {
    GroupId::from("pointer-2")
}

pub(super) fn formal_subsections() -> GroupId {
    GroupId::from("formal-academic-subsections")
}

pub(super) fn score(id: &str, value: f64) -> ScoreSubmission {
    ScoreSubmission::new(id, value, EVALUATOR)
}

pub(super) fn scorebook() -> Scorebook {
    Scorebook::new(student(), ReadinessBlueprint::standard())
}

/// Scorebook with three pointer-2 activities already grouped (no weights committed yet).
pub(super) fn pointer_scorebook() -> Scorebook {
    let mut book = scorebook();
    for (id, name) in [("act-1", "Debate"), ("act-2", "Robotics"), ("act-3", "Choir")] {
        book.register_component(activity(id, name), CategoryId::Pointer2)
            .expect("activity registers");
        book.add_member(&pointer_2(), &ComponentId::from(id), None)
            .expect("member joins");
    }
    book
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn assert_score(actual: Option<f64>, expected: f64) {
    match actual {
        Some(value) => assert_close(value, expected),
        None => panic!("expected score {expected}, got none"),
    }
}

pub(super) fn build_service() -> (
    Arc<ReadinessService<MemoryRepository, MemoryPublisher>>,
    Arc<MemoryRepository>,
    Arc<MemoryPublisher>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let publisher = Arc::new(MemoryPublisher::default());
    let service = Arc::new(ReadinessService::new(
        repository.clone(),
        publisher.clone(),
        ReadinessBlueprint::standard(),
    ));
    (service, repository, publisher)
}

pub(super) fn enrolled_service() -> (
    Arc<ReadinessService<MemoryRepository, MemoryPublisher>>,
    Arc<MemoryPublisher>,
) {
    let (service, _, publisher) = build_service();
    service.enroll(student()).expect("student enrolls");
    (service, publisher)
}

pub(super) fn router_with_service(
    service: Arc<ReadinessService<MemoryRepository, MemoryPublisher>>,
) -> Router {
    readiness_router(service)
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    books: Arc<Mutex<HashMap<StudentId, Scorebook>>>,
}

impl ScorebookRepository for MemoryRepository {
    fn insert(&self, scorebook: Scorebook) -> Result<Scorebook, RepositoryError> {
        let mut guard = self.books.lock().expect("mutex poisoned");
        if guard.contains_key(scorebook.student_id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(scorebook.student_id().clone(), scorebook.clone());
        Ok(scorebook)
    }

    fn update(&self, scorebook: Scorebook) -> Result<(), RepositoryError> {
        let mut guard = self.books.lock().expect("mutex poisoned");
        guard.insert(scorebook.student_id().clone(), scorebook);
        Ok(())
    }

    fn fetch(&self, student_id: &StudentId) -> Result<Option<Scorebook>, RepositoryError> {
        let guard = self.books.lock().expect("mutex poisoned");
        Ok(guard.get(student_id).cloned())
    }

    fn students(&self) -> Result<Vec<StudentId>, RepositoryError> {
        let guard = self.books.lock().expect("mutex poisoned");
        let mut students: Vec<StudentId> = guard.keys().cloned().collect();
        students.sort();
        Ok(students)
    }
}

#[derive(Default)]
pub(super) struct MemoryPublisher {
    notices: Arc<Mutex<Vec<ScoreChangeNotice>>>,
}

impl MemoryPublisher {
    pub(super) fn notices(&self) -> Vec<ScoreChangeNotice> {
        self.notices.lock().expect("mutex poisoned").clone()
    }
}

impl ScoreChangePublisher for MemoryPublisher {
    fn publish(&self, notice: ScoreChangeNotice) -> Result<(), PublishError> {
        self.notices.lock().expect("mutex poisoned").push(notice);
        Ok(())
    }
}

pub(super) struct OfflinePublisher;

impl ScoreChangePublisher for OfflinePublisher {
    fn publish(&self, _notice: ScoreChangeNotice) -> Result<(), PublishError> {
        Err(PublishError::Transport("queue offline".into()))
    }
}

pub(super) struct UnavailableRepository;

impl ScorebookRepository for UnavailableRepository {
    fn insert(&self, _scorebook: Scorebook) -> Result<Scorebook, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn update(&self, _scorebook: Scorebook) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn fetch(&self, _student_id: &StudentId) -> Result<Option<Scorebook>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }

    fn students(&self) -> Result<Vec<StudentId>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".into()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
