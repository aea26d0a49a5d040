//! End-to-end readiness scoring through the public service facade and HTTP router.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use admissions_readiness::scoring::{
        ComponentId, PublishError, ReadinessBlueprint, ReadinessService, RepositoryError,
        ScorableUnit, ScoreChangeNotice, ScoreChangePublisher, Scorebook, ScorebookRepository,
        StudentId,
    };

    pub(super) fn student() -> StudentId {
        StudentId::from("stu-2040")
    }

    pub(super) fn activity(id: &str, name: &str) -> ScorableUnit {
        ScorableUnit::Activity {
            component_id: ComponentId::from(id),
            name: name.to_string(),
            description: Some("verified by school counsellor".to_string()),
        }
    }

    pub(super) fn document(id: &str, title: &str) -> ScorableUnit {
        ScorableUnit::Document {
            component_id: ComponentId::from(id),
            title: title.to_string(),
            document_type: None,
        }
    }

    pub(super) fn approx(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|value| (value - expected).abs() < 1e-9)
    }

    #[derive(Default)]
    pub(super) struct MemoryRepository {
        books: Mutex<HashMap<StudentId, Scorebook>>,
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
            self.books
                .lock()
                .expect("mutex poisoned")
                .insert(scorebook.student_id().clone(), scorebook);
            Ok(())
        }

        fn fetch(&self, student_id: &StudentId) -> Result<Option<Scorebook>, RepositoryError> {
            Ok(self
                .books
                .lock()
                .expect("mutex poisoned")
                .get(student_id)
                .cloned())
        }

        fn students(&self) -> Result<Vec<StudentId>, RepositoryError> {
            Ok(self
                .books
                .lock()
                .expect("mutex poisoned")
                .keys()
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    pub(super) struct MemoryPublisher {
        pub(super) notices: Mutex<Vec<ScoreChangeNotice>>,
    }

    impl ScoreChangePublisher for MemoryPublisher {
        fn publish(&self, notice: ScoreChangeNotice) -> Result<(), PublishError> {
            self.notices.lock().expect("mutex poisoned").push(notice);
            Ok(())
        }
    }

    pub(super) type Service = ReadinessService<MemoryRepository, MemoryPublisher>;

    pub(super) fn service() -> (Arc<Service>, Arc<MemoryPublisher>) {
        let publisher = Arc::new(MemoryPublisher::default());
        let service = Arc::new(ReadinessService::new(
            Arc::new(MemoryRepository::default()),
            publisher.clone(),
            ReadinessBlueprint::standard(),
        ));
        (service, publisher)
    }
}

use admissions_readiness::scoring::{
    readiness_router, CardState, CategoryId, CategoryStatus, ComponentId, GroupId, GroupMember,
    ReadinessServiceError, ScoreSubmission, ScoringError,
};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

#[test]
fn pointer_group_lifecycle_through_the_service() {
    let (service, publisher) = service();
    let student = student();
    let group = GroupId::from("pointer-3");
    service.enroll(student.clone()).expect("enrolls");

    for (id, name) in [("act-chess", "Chess club"), ("act-theatre", "Theatre")] {
        service
            .register_component(&student, activity(id, name), CategoryId::Pointer3)
            .expect("registers");
    }
    service
        .add_member(&student, &group, &ComponentId::from("act-chess"), None)
        .expect("first member");
    service
        .submit_score(&student, ScoreSubmission::new("act-chess", 8.0, "eval-1"))
        .expect("scored");
    assert!(approx(
        service.score_card(&student).expect("card").score_of(CategoryId::Pointer3),
        8.0
    ));

    service
        .add_member(&student, &group, &ComponentId::from("act-theatre"), None)
        .expect("second member");
    let suspended = service
        .category_score(&student, CategoryId::Pointer3)
        .expect("category");
    assert_eq!(suspended.status, CategoryStatus::GroupNotReady);
    match service.group_score(&student, &group) {
        Err(ReadinessServiceError::Scoring(ScoringError::GroupNotReady { .. })) => {}
        other => panic!("expected pending group, got {other:?}"),
    }

    service
        .set_weights(
            &student,
            &group,
            vec![
                GroupMember::new("act-chess", 25.0),
                GroupMember::new("act-theatre", 75.0),
            ],
        )
        .expect("balanced");
    service
        .submit_score(&student, ScoreSubmission::new("act-theatre", 6.0, "eval-2"))
        .expect("scored");

    let card = service.score_card(&student).expect("card");
    assert!(approx(card.score_of(CategoryId::Pointer3), 6.5));
    assert_eq!(card.state, CardState::Partial);
    assert!(approx(card.overall_score, 6.5));

    let notices = publisher.notices.lock().expect("mutex poisoned");
    assert!(notices.iter().all(|notice| notice.student_id == student));
    assert_eq!(notices.last().expect("notice").version, card.version);
}

#[test]
fn composite_averages_scored_tracks_only() {
    let (service, _) = service();
    let student = student();
    service.enroll(student.clone()).expect("enrolls");

    service
        .register_component(&student, document("doc-1", "Transcript"), CategoryId::FormalAcademic)
        .expect("registers");
    service
        .register_component(&student, activity("act-1", "Debate"), CategoryId::Pointer2)
        .expect("registers");
    service
        .add_member(&student, &GroupId::from("pointer-2"), &ComponentId::from("act-1"), None)
        .expect("joins");

    service
        .submit_score(&student, ScoreSubmission::new("doc-1", 8.0, "eval-1"))
        .expect("scored");
    let outcome = service
        .submit_score(&student, ScoreSubmission::new("act-1", 6.0, "eval-1"))
        .expect("scored");

    assert!(approx(outcome.card.score_of(CategoryId::FormalAcademic), 4.0));
    assert!(approx(outcome.card.score_of(CategoryId::Pointer2), 6.0));
    assert!(approx(outcome.card.overall_score, 5.0));
    assert!(!outcome.card.is_complete);
}

async fn call(router: &axum::Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body");
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json payload")
    };
    (status, payload)
}

#[tokio::test]
async fn http_surface_scores_a_weighted_group() {
    let (service, _) = service();
    let router = readiness_router(service);
    let base = "/api/v1/readiness/students";

    let (status, _) = call(&router, "POST", base, json!({ "student_id": "stu-2040" })).await;
    assert_eq!(status, StatusCode::CREATED);

    for id in ["act-a", "act-b"] {
        let (status, _) = call(
            &router,
            "POST",
            &format!("{base}/stu-2040/components"),
            json!({
                "category": "pointer_4",
                "unit": { "kind": "activity", "component_id": id, "name": "Service" }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = call(
        &router,
        "POST",
        &format!("{base}/stu-2040/groups/pointer-4/members"),
        json!({ "component_id": "act-a" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &router,
        "POST",
        &format!("{base}/stu-2040/groups/pointer-4/members"),
        json!({
            "component_id": "act-b",
            "weights": [
                { "component_id": "act-a", "weight": 40.0 },
                { "component_id": "act-b", "weight": 60.0 }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trigger"]["event"], "member_added");

    for (id, score) in [("act-a", 5.0), ("act-b", 10.0)] {
        let (status, _) = call(
            &router,
            "PUT",
            &format!("{base}/stu-2040/components/{id}/evaluation"),
            json!({ "score": score, "evaluator_id": "eval-9", "feedback": "solid" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, weights) = call(
        &router,
        "GET",
        &format!("{base}/stu-2040/groups/pointer-4/weights"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(weights["weights"][1]["weight"].as_f64(), Some(60.0));

    let (status, group) = call(
        &router,
        "GET",
        &format!("{base}/stu-2040/groups/pointer-4/score"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(group["score"].as_f64(), Some(8.0));
    assert_eq!(group["evaluated_count"], 2);

    let (status, removed) = call(
        &router,
        "DELETE",
        &format!("{base}/stu-2040/groups/pointer-4/members/act-a"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["value"]["members"][0]["weight"].as_f64(), Some(100.0));
}
