use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use voyage_agents::{PipelineError, PipelineSettings, TripPipeline};
use voyage_core::present::DEFAULT_IMAGE_COUNT;
use voyage_core::{
    fetch_image_urls, map_view, render_itinerary_document, MapView, ParameterError, SessionState,
    TripParameters, VoyageConfig, EXPORT_FILE_NAME,
};
use voyage_geo::{GeoResolver, OsmGeoResolver};
use voyage_model::{load_model, PlanModel};
use voyage_observability::{AppMetrics, MetricsSnapshot};
use voyage_storage::{MemorySessionStore, SessionStore};

const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_IMAGE_COUNT: usize = 9;
const MAX_KEYWORD_LEN: usize = 120;

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: TripPipeline,
    pub metrics: Arc<AppMetrics>,
    pub model_configured: bool,
}

impl ApiState {
    pub fn new(pipeline: TripPipeline, metrics: Arc<AppMetrics>, model_configured: bool) -> Self {
        Self {
            pipeline,
            metrics,
            model_configured,
        }
    }

    fn store(&self) -> &Arc<dyn SessionStore> {
        self.pipeline.store()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: MetricsSnapshot,
    model: String,
    model_configured: bool,
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct SessionView {
    session_id: String,
    running: bool,
    state: SessionState,
    map: Option<MapView>,
    gallery: Option<Gallery>,
}

#[derive(Debug, Serialize)]
struct Gallery {
    destination: Vec<String>,
    places: Vec<PlaceImages>,
}

#[derive(Debug, Serialize)]
struct PlaceImages {
    place: String,
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlanRequest {
    destination: String,
    days: u32,
    budget: String,
    #[serde(default)]
    styles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesQuery {
    keyword: String,
    count: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ImagesResponse {
    keyword: String,
    urls: Vec<String>,
}

/// Wires the live OpenStreetMap resolver and the configured model into a
/// router backed by an in-memory session store.
pub fn build_app(config: &VoyageConfig) -> Result<Router> {
    config.validate().context("invalid configuration")?;

    let resolver: Arc<dyn GeoResolver> = Arc::new(OsmGeoResolver::from_config(config));
    let model = load_model(config).context("failed to initialize model client")?;

    Ok(build_router(build_state(config, resolver, model)))
}

pub fn build_state(
    config: &VoyageConfig,
    resolver: Arc<dyn GeoResolver>,
    model: Arc<dyn PlanModel>,
) -> ApiState {
    let metrics = AppMetrics::shared();
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let pipeline = TripPipeline::new(
        resolver,
        model,
        store,
        metrics.clone(),
        PipelineSettings::from_config(config),
    );

    ApiState::new(pipeline, metrics, config.model_configured())
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/sessions", post(create_session))
        .route(
            "/v1/sessions/:session_id",
            get(get_session).delete(delete_session),
        )
        .route("/v1/sessions/:session_id/plan", post(plan_session))
        .route("/v1/sessions/:session_id/export", get(export_session))
        .route("/v1/images", get(images))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        model: state.pipeline.model_name().to_string(),
        model_configured: state.model_configured,
    };
    (StatusCode::OK, Json(payload))
}

async fn create_session(State(state): State<ApiState>) -> impl IntoResponse {
    let session_id = state.store().create_session();
    info!(session_id = %session_id, "session created");
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(session) = state.store().get(&session_id) else {
        return unknown_session(&session_id);
    };

    let view = session_view(&state, session_id, session);
    (StatusCode::OK, Json(view)).into_response()
}

async fn delete_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.pipeline.remove_session(&session_id) {
        Ok(()) => {
            info!(session_id = %session_id, "session removed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(error) => pipeline_error_response(&error),
    }
}

async fn plan_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_parameters",
                &rejection.body_text(),
            )
        }
    };
    let params = match TripParameters::from_raw(
        &request.destination,
        request.days,
        &request.budget,
        &request.styles,
    ) {
        Ok(params) => params,
        Err(error) => return parameter_error_response(&error),
    };

    // Detached so a dropped connection cannot cut a run short.
    let pipeline = state.pipeline.clone();
    let run = tokio::spawn(async move { pipeline.run(&session_id, params).await });

    match run.await {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(error)) => pipeline_error_response(&error),
        Err(join_error) => {
            error!(error = %join_error, "planning task aborted");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "run_aborted",
                "the planning run stopped unexpectedly",
            )
        }
    }
}

async fn export_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(session) = state.store().get(&session_id) else {
        return unknown_session(&session_id);
    };
    let Some(plan) = session.plan.as_ref() else {
        return error_response(
            StatusCode::NOT_FOUND,
            "no_plan",
            "this session has no plan to export yet",
        );
    };

    let destination = session.destination.as_deref().unwrap_or_default();
    let document = render_itinerary_document(destination, plan);
    let bytes = match document.to_pdf() {
        Ok(bytes) => bytes,
        Err(export_error) => {
            error!(error = %export_error, session_id = %session_id, "export failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "export_failed",
                &export_error.to_string(),
            );
        }
    };
    let disposition = format!("attachment; filename=\"{EXPORT_FILE_NAME}\"");

    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

async fn images(Query(query): Query<ImagesQuery>) -> Response {
    let keyword = query.keyword.trim();
    if keyword.is_empty() || keyword.chars().count() > MAX_KEYWORD_LEN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_keyword",
            &format!("keyword must be 1-{MAX_KEYWORD_LEN} characters"),
        );
    }

    let count = query
        .count
        .unwrap_or(DEFAULT_IMAGE_COUNT)
        .min(MAX_IMAGE_COUNT);
    let payload = ImagesResponse {
        keyword: keyword.to_string(),
        urls: fetch_image_urls(keyword, count),
    };
    (StatusCode::OK, Json(payload)).into_response()
}

fn session_view(state: &ApiState, session_id: String, session: SessionState) -> SessionView {
    let marker = session.destination.clone().unwrap_or_default();
    let map = session.geo.as_ref().map(|geo| map_view(geo, &marker));
    let gallery = match (&session.destination, &session.geo) {
        (Some(destination), Some(geo)) => Some(Gallery {
            destination: fetch_image_urls(destination, DEFAULT_IMAGE_COUNT),
            places: geo
                .places
                .iter()
                .map(|place| PlaceImages {
                    place: place.clone(),
                    images: fetch_image_urls(place, DEFAULT_IMAGE_COUNT),
                })
                .collect(),
        }),
        _ => None,
    };

    SessionView {
        running: state.pipeline.is_running(&session_id),
        session_id,
        state: session,
        map,
        gallery,
    }
}

fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::GeoNotFound { .. } | PipelineError::UnknownSession(_) => {
            StatusCode::NOT_FOUND
        }
        PipelineError::ModelFailure(_) | PipelineError::MalformedResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
        PipelineError::Busy(_) => StatusCode::CONFLICT,
        PipelineError::SessionRemoved { .. } => StatusCode::GONE,
    }
}

fn pipeline_error_response(error: &PipelineError) -> Response {
    let status = status_for(error);
    if status.is_server_error() {
        warn!(error = %error, code = error.code(), "planning run failed upstream");
    }
    (
        status,
        Json(serde_json::json!({
            "error": error.code(),
            "message": error.to_string(),
            "stage": error.stage(),
        })),
    )
        .into_response()
}

fn parameter_error_response(error: &ParameterError) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "invalid_parameters",
        &error.to_string(),
    )
}

fn unknown_session(session_id: &str) -> Response {
    pipeline_error_response(&PipelineError::UnknownSession(session_id.to_string()))
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response()
}
