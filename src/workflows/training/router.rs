//! HTTP facade over the lifecycle engine.
//!
//! The routing layer stays thin: resolve the actor, call the service, map the
//! typed error onto a status code. Domain rules never live here.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, ApplicationId, ApplicationOutcome, BrandId, CustomerId, DeliveryMode, TaskId,
    TrainerId, TrainingId, TrainingStatus,
};
use super::repository::{AuthProvider, Notifier, StoreError, TrainingStore};
use super::service::{NewTraining, TrainingService, TrainingServiceError};

pub struct EngineState<S, N, A> {
    service: Arc<TrainingService<S, N>>,
    auth: Arc<A>,
}

impl<S, N, A> Clone for EngineState<S, N, A> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            auth: self.auth.clone(),
        }
    }
}

/// Router builder exposing the operation-level API under `/api/v1`.
pub fn training_router<S, N, A>(
    service: Arc<TrainingService<S, N>>,
    auth: Arc<A>,
) -> Router
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
    A: AuthProvider + 'static,
{
    Router::new()
        .route("/api/v1/trainings", post(create_handler::<S, N, A>))
        .route(
            "/api/v1/trainings/:training_id/status",
            post(transition_handler::<S, N, A>),
        )
        .route(
            "/api/v1/trainings/:training_id/applications",
            post(apply_handler::<S, N, A>),
        )
        .route(
            "/api/v1/trainings/:training_id/trainer/unassign",
            post(unassign_handler::<S, N, A>),
        )
        .route(
            "/api/v1/applications/:application_id/decision",
            post(decision_handler::<S, N, A>),
        )
        .route(
            "/api/v1/tasks/:task_id/complete",
            post(complete_task_handler::<S, N, A>),
        )
        .route(
            "/api/v1/trainings/:training_id/activity",
            get(activity_handler::<S, N, A>),
        )
        .with_state(EngineState { service, auth })
}

#[derive(Debug, Deserialize)]
struct CreateTrainingRequest {
    brand_id: u64,
    customer_id: u64,
    title: String,
    delivery_mode: DeliveryMode,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    generate_checklist: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    target: TrainingStatus,
}

#[derive(Debug, Deserialize)]
struct ApplyRequest {
    trainer_id: u64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    proposed_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DecisionRequest {
    outcome: ApplicationOutcome,
}

async fn create_handler<S, N, A>(
    State(state): State<EngineState<S, N, A>>,
    headers: HeaderMap,
    Json(payload): Json<CreateTrainingRequest>,
) -> Response
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
    A: AuthProvider + 'static,
{
    let actor = match authenticated_actor(&headers, state.auth.as_ref()) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let input = NewTraining {
        brand_id: BrandId(payload.brand_id),
        customer_id: CustomerId(payload.customer_id),
        title: payload.title,
        delivery_mode: payload.delivery_mode,
        start_date: payload.start_date,
        end_date: payload.end_date,
        generate_checklist: payload.generate_checklist,
    };
    match state.service.create_training(input, &actor) {
        Ok(training) => (StatusCode::CREATED, Json(training)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn transition_handler<S, N, A>(
    State(state): State<EngineState<S, N, A>>,
    Path(training_id): Path<u64>,
    headers: HeaderMap,
    Json(payload): Json<TransitionRequest>,
) -> Response
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
    A: AuthProvider + 'static,
{
    let actor = match authenticated_actor(&headers, state.auth.as_ref()) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state
        .service
        .transition_training(TrainingId(training_id), payload.target, &actor)
    {
        Ok(training) => (StatusCode::OK, Json(training)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn apply_handler<S, N, A>(
    State(state): State<EngineState<S, N, A>>,
    Path(training_id): Path<u64>,
    Json(payload): Json<ApplyRequest>,
) -> Response
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
    A: AuthProvider + 'static,
{
    match state.service.apply_as_trainer(
        TrainingId(training_id),
        TrainerId(payload.trainer_id),
        payload.message,
        payload.proposed_rate,
    ) {
        Ok(application) => (StatusCode::ACCEPTED, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn unassign_handler<S, N, A>(
    State(state): State<EngineState<S, N, A>>,
    Path(training_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
    A: AuthProvider + 'static,
{
    let actor = match authenticated_actor(&headers, state.auth.as_ref()) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state
        .service
        .unassign_trainer(TrainingId(training_id), &actor)
    {
        Ok(training) => (StatusCode::OK, Json(training)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn decision_handler<S, N, A>(
    State(state): State<EngineState<S, N, A>>,
    Path(application_id): Path<u64>,
    headers: HeaderMap,
    Json(payload): Json<DecisionRequest>,
) -> Response
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
    A: AuthProvider + 'static,
{
    let actor = match authenticated_actor(&headers, state.auth.as_ref()) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state
        .service
        .decide_application(ApplicationId(application_id), payload.outcome, &actor)
    {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn complete_task_handler<S, N, A>(
    State(state): State<EngineState<S, N, A>>,
    Path(task_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
    A: AuthProvider + 'static,
{
    let actor = match authenticated_actor(&headers, state.auth.as_ref()) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state.service.complete_task(TaskId(task_id), &actor) {
        Ok(task) => (StatusCode::OK, Json(task)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn activity_handler<S, N, A>(
    State(state): State<EngineState<S, N, A>>,
    Path(training_id): Path<u64>,
) -> Response
where
    S: TrainingStore + 'static,
    N: Notifier + 'static,
    A: AuthProvider + 'static,
{
    match state.service.list_activity(TrainingId(training_id)) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

fn authenticated_actor<A: AuthProvider>(
    headers: &HeaderMap,
    auth: &A,
) -> Result<Actor, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token.and_then(|token| auth.authenticate(token)) {
        Some(actor) => Ok(actor),
        None => {
            let payload = json!({ "error": "missing or unknown bearer token" });
            Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response())
        }
    }
}

fn error_response(err: TrainingServiceError) -> Response {
    let status = match &err {
        TrainingServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        TrainingServiceError::InvalidTransition(_)
        | TrainingServiceError::TrainingNotOpen { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TrainingServiceError::DuplicateApplication { .. }
        | TrainingServiceError::TrainerAlreadyAssigned { .. }
        | TrainingServiceError::ApplicationAlreadyDecided(_) => StatusCode::CONFLICT,
        TrainingServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        TrainingServiceError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        TrainingServiceError::Store(StoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        TrainingServiceError::Store(StoreError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
