use std::sync::Arc;

use axum::Router;
use axum::extract::{FromRequestParts, Json, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::metrics::{self, MetricsQuery, MetricsView};
use crate::state::AppState;
use crate::survey::{SurveyEntry, SurveyForm};
use crate::views;

/// Header carrying the id of the user an upstream auth layer signed in.
pub const USER_ID_HEADER: &str = "x-user-id";

pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/devices/register", post(register_device))
        .route("/devices/link", post(link_device))
        .route("/predictions", post(record_prediction))
        .route(
            "/student-entries",
            get(survey_entries).post(record_survey_entry),
        )
        .route("/metrics", get(metrics_report));

    Router::new()
        .route("/", get(views::metrics::metrics_page))
        .route("/devices", get(views::devices::device_list))
        .route("/devices/{id}", get(views::devices::device_detail))
        .nest("/api", api_routes)
        .with_state(state)
}

/// Signed-in user, trusted from [`USER_ID_HEADER`].
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_owned()))
            .ok_or(ApiError::Unauthenticated)
    }
}

#[derive(Deserialize)]
pub struct DeviceCredentials {
    device_id: String,
    device_password: String,
}

#[derive(Serialize)]
pub struct DeviceResponse {
    message: String,
    device_id: String,
}

pub async fn register_device(
    State(state): State<Arc<AppState>>,
    Json(data): Json<DeviceCredentials>,
) -> Result<(StatusCode, Json<DeviceResponse>), ApiError> {
    let mut store = state.store_mut();
    let device = store.register_device(&data.device_id, &data.device_password)?;

    Ok((
        StatusCode::CREATED,
        Json(DeviceResponse {
            message: "Device registered and unclaimed. Ready for pairing.".to_owned(),
            device_id: device.device_id.clone(),
        }),
    ))
}

pub async fn link_device(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(data): Json<DeviceCredentials>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let mut store = state.store_mut();
    let device = store.link_device(&user_id, &data.device_id, &data.device_password)?;

    Ok(Json(DeviceResponse {
        message: "Device successfully linked to your account.".to_owned(),
        device_id: device.device_id.clone(),
    }))
}

#[derive(Deserialize)]
pub struct PredictionRequest {
    device_id: String,
    device_password: String,
    predicted_label: String,
    #[serde(default)]
    model_type: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct PredictionResponse {
    id: u64,
    created_at: String,
}

pub async fn record_prediction(
    State(state): State<Arc<AppState>>,
    Json(data): Json<PredictionRequest>,
) -> Result<(StatusCode, Json<PredictionResponse>), ApiError> {
    let mut store = state.store_mut();
    let prediction = store.record_prediction(
        &data.device_id,
        &data.device_password,
        &data.predicted_label,
        data.model_type.as_deref().unwrap_or_default(),
        data.created_at,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(PredictionResponse {
            id: prediction.id,
            created_at: prediction.created_at.to_rfc3339(),
        }),
    ))
}

#[derive(Serialize)]
pub struct SurveyEntryResponse {
    message: String,
    entry: SurveyEntry,
}

pub async fn record_survey_entry(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(form): Json<SurveyForm>,
) -> Result<(StatusCode, Json<SurveyEntryResponse>), ApiError> {
    let fields = form.validate()?;
    let mut store = state.store_mut();
    let entry = store.record_survey_entry(&user_id, fields).clone();

    Ok((
        StatusCode::CREATED,
        Json(SurveyEntryResponse {
            message: "Manual entry saved.".to_owned(),
            entry,
        }),
    ))
}

pub async fn survey_entries(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> Json<Vec<SurveyEntry>> {
    let store = state.store();
    Json(
        store
            .survey_entries_for_user(&user_id)
            .into_iter()
            .cloned()
            .collect(),
    )
}

pub async fn metrics_report(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<MetricsView>, ApiError> {
    metrics::build_metrics_view(&state, &user_id, &query).map(Json)
}
