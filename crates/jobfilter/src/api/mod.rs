use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::api::models::{ErrorBody, JobsPageResponse};
use crate::error::FilterError;
use crate::families::{DeadLetterFamily, JobsFamily};
use crate::filters::{
    clamp_limits, FamilyBinding, FilterEngine, RawParams, DEFAULT_LIMIT, MAX_LIMIT,
};
use crate::store::JobStore;

pub mod models;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn JobStore>,
    pub jobs: FamilyBinding,
    pub dead_letter: FamilyBinding,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl ApiState {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            jobs: FamilyBinding::bound(JobsFamily::default()),
            dead_letter: FamilyBinding::bound(DeadLetterFamily::default()),
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }

    pub fn with_limits(mut self, default_limit: i64, max_limit: i64) -> Self {
        (self.default_limit, self.max_limit) = clamp_limits(default_limit, max_limit);
        self
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/dlq", get(list_dlq))
        .route("/health", get(health))
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn filter_err(e: FilterError) -> ApiError {
    let status = if e.is_client_error() {
        tracing::warn!(error = %e, "bad dashboard request");
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!(error = %e, "dashboard query failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
}

pub async fn list_jobs(
    State(state): State<ApiState>,
    Query(raw): Query<RawParams>,
) -> Result<Json<JobsPageResponse>, ApiError> {
    let binding = state.jobs.clone();
    build_page(&state, &raw, binding).await
}

pub async fn list_dlq(
    State(state): State<ApiState>,
    Query(raw): Query<RawParams>,
) -> Result<Json<JobsPageResponse>, ApiError> {
    let binding = state.dead_letter.clone();
    build_page(&state, &raw, binding).await
}

async fn build_page(
    state: &ApiState,
    raw: &RawParams,
    binding: FamilyBinding,
) -> Result<Json<JobsPageResponse>, ApiError> {
    let engine = FilterEngine::from_raw(raw, state.store.clone(), binding)
        .map_err(filter_err)?
        .with_limits(state.default_limit, state.max_limit);

    let family = engine.family_name().map_err(filter_err)?;
    let records = engine.records().await.map_err(filter_err)?;
    let next_page = engine.next_page_params().await.map_err(filter_err)?;
    let filtered_count = engine.filtered_count().await.map_err(filter_err)?;
    let queues = engine.queues().await.map_err(filter_err)?;
    let job_classes = engine.job_classes().await.map_err(filter_err)?;
    let states = engine.states().await.map_err(filter_err)?;
    let state_names = engine.state_names().map_err(filter_err)?.to_vec();

    Ok(Json(JobsPageResponse {
        family,
        items: records,
        next_page,
        filtered_count,
        queues,
        job_classes,
        states,
        state_names,
        params: engine.to_params(&[]),
    }))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
