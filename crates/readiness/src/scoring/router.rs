use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    CategoryId, ComponentId, EvaluatorId, GroupId, ScorableUnit, ScoreSubmission, StudentId,
};
use super::group::GroupMember;
use super::repository::{RepositoryError, ScoreChangePublisher, ScorebookRepository};
use super::service::{ReadinessService, ReadinessServiceError};
use super::validation::ScoringError;

type SharedService<R, P> = Arc<ReadinessService<R, P>>;

/// Router builder exposing the scoring engine over HTTP.
pub fn readiness_router<R, P>(service: SharedService<R, P>) -> Router
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/readiness/students",
            post(enroll_handler::<R, P>).get(list_students_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/scorecard",
            get(scorecard_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/components",
            post(register_handler::<R, P>).get(list_components_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/components/:component_id",
            delete(remove_component_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/components/:component_id/evaluation",
            put(submit_score_handler::<R, P>).get(get_score_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/groups/:group_id/weights",
            get(get_weights_handler::<R, P>).put(set_weights_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/groups/:group_id/members",
            post(add_member_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/groups/:group_id/members/:component_id",
            delete(remove_member_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/groups/:group_id/score",
            get(group_score_handler::<R, P>),
        )
        .route(
            "/api/v1/readiness/students/:student_id/categories/:category",
            get(category_handler::<R, P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollRequest {
    pub(crate) student_id: StudentId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) category: CategoryId,
    pub(crate) unit: ScorableUnit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluationRequest {
    pub(crate) score: f64,
    pub(crate) evaluator_id: EvaluatorId,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WeightsPayload {
    pub(crate) weights: Vec<GroupMember>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddMemberRequest {
    pub(crate) component_id: ComponentId,
    #[serde(default)]
    pub(crate) weight: Option<f64>,
    #[serde(default)]
    pub(crate) weights: Option<Vec<GroupMember>>,
}

pub(crate) async fn enroll_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Json(request): Json<EnrollRequest>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    match service.enroll(request.student_id) {
        Ok(card) => (StatusCode::CREATED, Json(card)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_students_handler<R, P>(
    State(service): State<SharedService<R, P>>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(
        service.students().map(|students| json!({ "students": students })),
        StatusCode::OK,
    )
}

pub(crate) async fn list_components_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(
        service
            .components(&StudentId(student_id))
            .map(|components| json!({ "components": components })),
        StatusCode::OK,
    )
}

pub(crate) async fn scorecard_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(service.score_card(&StudentId(student_id)), StatusCode::OK)
}

pub(crate) async fn register_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(student_id): Path<String>,
    Json(request): Json<RegisterRequest>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(
        service.register_component(&StudentId(student_id), request.unit, request.category),
        StatusCode::CREATED,
    )
}

pub(crate) async fn remove_component_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, component_id)): Path<(String, String)>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(
        service.remove_component(&StudentId(student_id), &ComponentId(component_id)),
        StatusCode::OK,
    )
}

pub(crate) async fn submit_score_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, component_id)): Path<(String, String)>,
    Json(request): Json<EvaluationRequest>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    let submission = ScoreSubmission {
        component_id: ComponentId(component_id),
        score: request.score,
        evaluator_id: request.evaluator_id,
        feedback: request.feedback,
    };
    respond(
        service.submit_score(&StudentId(student_id), submission),
        StatusCode::OK,
    )
}

pub(crate) async fn get_score_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, component_id)): Path<(String, String)>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    match service.get_score(&StudentId(student_id), &ComponentId(component_id.clone())) {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => {
            let payload = json!({
                "component_id": component_id,
                "status": "not_evaluated",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_weights_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, group_id)): Path<(String, String)>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(
        service
            .get_weights(&StudentId(student_id), &GroupId(group_id))
            .map(|weights| WeightsPayload { weights }),
        StatusCode::OK,
    )
}

pub(crate) async fn set_weights_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, group_id)): Path<(String, String)>,
    Json(payload): Json<WeightsPayload>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(
        service.set_weights(&StudentId(student_id), &GroupId(group_id), payload.weights),
        StatusCode::OK,
    )
}

pub(crate) async fn add_member_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, group_id)): Path<(String, String)>,
    Json(request): Json<AddMemberRequest>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    let student_id = StudentId(student_id);
    let group_id = GroupId(group_id);
    let outcome = match request.weights {
        Some(weights) => service.add_member_with_weights(
            &student_id,
            &group_id,
            &request.component_id,
            weights,
        ),
        None => service.add_member(&student_id, &group_id, &request.component_id, request.weight),
    };
    respond(outcome, StatusCode::OK)
}

pub(crate) async fn remove_member_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, group_id, component_id)): Path<(String, String, String)>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(
        service.remove_member(
            &StudentId(student_id),
            &GroupId(group_id),
            &ComponentId(component_id),
        ),
        StatusCode::OK,
    )
}

pub(crate) async fn group_score_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, group_id)): Path<(String, String)>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    respond(
        service.group_score(&StudentId(student_id), &GroupId(group_id)),
        StatusCode::OK,
    )
}

pub(crate) async fn category_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path((student_id, category)): Path<(String, String)>,
) -> Response
where
    R: ScorebookRepository + 'static,
    P: ScoreChangePublisher + 'static,
{
    let category = match category.parse::<CategoryId>() {
        Ok(category) => category,
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
                "kind": "unknown_category",
            });
            return (StatusCode::NOT_FOUND, Json(payload)).into_response();
        }
    };
    respond(
        service.category_score(&StudentId(student_id), category),
        StatusCode::OK,
    )
}

fn respond<T: Serialize>(result: Result<T, ReadinessServiceError>, status: StatusCode) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: ReadinessServiceError) -> Response {
    let (status, payload) = match &error {
        ReadinessServiceError::Scoring(scoring) => {
            let status = match scoring {
                ScoringError::UnknownComponent(_)
                | ScoringError::UnknownGroup(_)
                | ScoringError::UnknownCategory(_) => StatusCode::NOT_FOUND,
                ScoringError::GroupNotReady { .. } | ScoringError::DuplicateComponent(_) => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            let mut payload = json!({
                "error": scoring.to_string(),
                "kind": scoring.kind(),
            });
            if let ScoringError::WeightSumInvalid { sum } | ScoringError::GroupNotReady { sum, .. } =
                scoring
            {
                payload["sum"] = json!(sum);
            }
            (status, payload)
        }
        ReadinessServiceError::Repository(RepositoryError::NotFound) => (
            StatusCode::NOT_FOUND,
            json!({ "error": "student is not enrolled" }),
        ),
        ReadinessServiceError::Repository(RepositoryError::Conflict) => (
            StatusCode::CONFLICT,
            json!({ "error": "student already enrolled" }),
        ),
        ReadinessServiceError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };
    (status, Json(payload)).into_response()
}
