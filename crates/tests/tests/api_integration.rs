use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;
use voyage_api::{build_app, build_router, build_state};
use voyage_core::{GeoResult, VoyageConfig};
use voyage_geo::GeoResolver;
use voyage_model::{ModelError, PlanModel};

const PARIS_REPLY: &str = "```json\n{\"itinerary\":{\"Day 1\":[\"Visit Eiffel Tower\"],\"Day 2\":[\"Visit Louvre\"],\"Day 3\":[\"Seine cruise\"]},\"hotels\":[\"Hotel A\"],\"food\":[\"Croissant\"],\"tips\":[\"Book museums early\"]}\n```";

struct StubResolver;

#[async_trait]
impl GeoResolver for StubResolver {
    async fn resolve(&self, place_name: &str, limit: usize) -> Option<GeoResult> {
        if !place_name.eq_ignore_ascii_case("paris") {
            return None;
        }
        Some(GeoResult {
            latitude: 48.8566,
            longitude: 2.3522,
            places: ["Eiffel Tower", "Louvre"]
                .into_iter()
                .take(limit)
                .map(ToString::to_string)
                .collect(),
        })
    }
}

/// Hands out queued replies in order; `None` fails the call.
struct StubModel {
    replies: Mutex<VecDeque<Option<String>>>,
}

impl StubModel {
    fn new(replies: &[Option<&str>]) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|reply| reply.map(ToString::to_string))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl PlanModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or(ModelError::EmptyCompletion)
    }
}

/// Holds every completion until the test releases it.
struct GatedModel {
    release: Arc<Notify>,
}

#[async_trait]
impl PlanModel for GatedModel {
    fn model_name(&self) -> &str {
        "gated"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        self.release.notified().await;
        Ok(PARIS_REPLY.to_string())
    }
}

fn app_with(replies: &[Option<&str>]) -> Router {
    app_with_model(Arc::new(StubModel::new(replies)))
}

fn app_with_model(model: Arc<dyn PlanModel>) -> Router {
    let state = build_state(&VoyageConfig::default(), Arc::new(StubResolver), model);
    build_router(state)
}

async fn wait_until_running(app: &Router, session_id: &str) {
    for _ in 0..200 {
        let (_, view) = send(app, get(&format!("/v1/sessions/{session_id}"))).await;
        if view["running"] == true {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run for {session_id} never started");
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, parsed)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn new_session(app: &Router) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/sessions")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

fn paris_request() -> Value {
    json!({
        "destination": "Paris",
        "days": 3,
        "budget": "Medium",
        "styles": ["Relax", "Couple"]
    })
}

#[tokio::test]
async fn health_reports_unconfigured_model() {
    let app = build_app(&VoyageConfig::default()).expect("app should build");

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_configured"], false);
    assert_eq!(body["model"], "unconfigured");
    assert_eq!(body["metrics"]["runs_total"], 0);
}

#[tokio::test]
async fn new_session_starts_empty() {
    let app = app_with(&[]);
    let session_id = new_session(&app).await;

    let (status, body) = send(&app, get(&format!("/v1/sessions/{session_id}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(body["running"], false);
    assert!(body["state"]["plan"].is_null());
    assert!(body["state"]["geo"].is_null());
    assert!(body["map"].is_null());
    assert!(body["gallery"].is_null());
}

#[tokio::test]
async fn paris_plan_fills_session() {
    let app = app_with(&[Some(PARIS_REPLY)]);
    let session_id = new_session(&app).await;

    let (status, report) = send(
        &app,
        post_json(&format!("/v1/sessions/{session_id}/plan"), paris_request()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["model"], "stub");
    assert_eq!(report["stages"].as_array().unwrap().last().unwrap(), "done");
    let itinerary = report["state"]["plan"]["itinerary"].as_object().unwrap();
    assert_eq!(itinerary.len(), 3);
    assert_eq!(report["state"]["geo"]["places"], json!(["Eiffel Tower", "Louvre"]));

    let (status, view) = send(&app, get(&format!("/v1/sessions/{session_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"]["destination"], "Paris");
    assert_eq!(view["map"]["marker_label"], "Paris");
    assert_eq!(view["map"]["zoom"], 12);
    assert_eq!(view["gallery"]["destination"].as_array().unwrap().len(), 3);
    assert_eq!(view["gallery"]["places"].as_array().unwrap().len(), 2);
    assert_eq!(view["gallery"]["places"][0]["place"], "Eiffel Tower");

    let (_, health) = send(&app, get("/health")).await;
    assert_eq!(health["metrics"]["runs_succeeded"], 1);
}

#[tokio::test]
async fn unknown_destination_is_not_found_and_keeps_state() {
    let app = app_with(&[Some(PARIS_REPLY)]);
    let session_id = new_session(&app).await;
    let plan_uri = format!("/v1/sessions/{session_id}/plan");

    let (status, _) = send(&app, post_json(&plan_uri, paris_request())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post_json(
            &plan_uri,
            json!({ "destination": "Atlantis", "days": 2, "budget": "low" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "geo_not_found");
    assert_eq!(body["stage"], "resolve_failed");

    let (_, view) = send(&app, get(&format!("/v1/sessions/{session_id}"))).await;
    assert_eq!(view["state"]["destination"], "Paris");
    assert_eq!(
        view["state"]["plan"]["itinerary"].as_object().unwrap().len(),
        3
    );
}

#[tokio::test]
async fn malformed_reply_is_bad_gateway() {
    let app = app_with(&[Some("Sorry, I cannot plan that trip.")]);
    let session_id = new_session(&app).await;

    let (status, body) = send(
        &app,
        post_json(&format!("/v1/sessions/{session_id}/plan"), paris_request()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "malformed_response");
    assert_eq!(body["stage"], "plan_failed");

    let (_, view) = send(&app, get(&format!("/v1/sessions/{session_id}"))).await;
    assert!(view["state"]["plan"].is_null());
}

#[tokio::test]
async fn model_failure_is_bad_gateway() {
    let app = app_with(&[None]);
    let session_id = new_session(&app).await;

    let (status, body) = send(
        &app,
        post_json(&format!("/v1/sessions/{session_id}/plan"), paris_request()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "model_failure");
}

#[tokio::test]
async fn invalid_parameters_are_rejected() {
    let app = app_with(&[Some(PARIS_REPLY)]);
    let session_id = new_session(&app).await;
    let plan_uri = format!("/v1/sessions/{session_id}/plan");

    for body in [
        json!({ "destination": "Paris", "days": 0, "budget": "medium" }),
        json!({ "destination": "Paris", "days": 15, "budget": "medium" }),
        json!({ "destination": "   ", "days": 3, "budget": "medium" }),
        json!({ "destination": "Paris", "days": 3, "budget": "platinum" }),
        json!({ "destination": "Paris", "days": 3, "budget": "low", "styles": ["party"] }),
        json!({ "destination": "Paris", "days": -1, "budget": "low" }),
        json!({ "destination": "Paris", "budget": "low" }),
        json!({ "destination": "Paris", "days": "three", "budget": "low" }),
    ] {
        let (status, response) = send(&app, post_json(&plan_uri, body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["error"], "invalid_parameters");
        assert!(response["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    let truncated = Request::builder()
        .method("POST")
        .uri(&plan_uri)
        .header("content-type", "application/json")
        .body(Body::from("{\"destination\": \"Paris\""))
        .unwrap();
    let (status, response) = send(&app, truncated).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_parameters");

    let (_, health) = send(&app, get("/health")).await;
    assert_eq!(health["metrics"]["runs_total"], 0);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = app_with(&[Some(PARIS_REPLY)]);

    let (status, body) = send(
        &app,
        post_json("/v1/sessions/does-not-exist/plan", paris_request()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_session");

    let (status, _) = send(&app, get("/v1/sessions/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_returns_pdf_attachment() {
    let app = app_with(&[Some(PARIS_REPLY)]);
    let session_id = new_session(&app).await;
    let export_uri = format!("/v1/sessions/{session_id}/export");

    let (status, body) = send(&app, get(&export_uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_plan");

    send(
        &app,
        post_json(&format!("/v1/sessions/{session_id}/plan"), paris_request()),
    )
    .await;

    let response = app.clone().oneshot(get(&export_uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .starts_with("application/pdf"));
    assert!(response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .contains("trip_plan.pdf"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"%PDF"));
    assert!(body.len() > 200);
}

#[tokio::test]
async fn images_endpoint_bounds_count() {
    let app = app_with(&[]);

    let (status, body) = send(&app, get("/v1/images?keyword=Kyoto")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["urls"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, get("/v1/images?keyword=Kyoto&count=50")).await;
    assert_eq!(status, StatusCode::OK);
    let urls = body["urls"].as_array().unwrap();
    assert_eq!(urls.len(), 9);
    assert!(urls[0]
        .as_str()
        .unwrap()
        .starts_with("https://source.unsplash.com/800x600/?Kyoto,travel&sig="));

    let (status, body) = send(&app, get("/v1/images?keyword=%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_keyword");
}

#[tokio::test]
async fn deleted_session_is_gone() {
    let app = app_with(&[]);
    let session_id = new_session(&app).await;
    let uri = format!("/v1/sessions/{session_id}");

    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_session");
}

#[tokio::test]
async fn run_finishes_after_client_disconnects() {
    let release = Arc::new(Notify::new());
    let app = app_with_model(Arc::new(GatedModel {
        release: release.clone(),
    }));
    let session_id = new_session(&app).await;

    let request = post_json(&format!("/v1/sessions/{session_id}/plan"), paris_request());
    let dropped = tokio::time::timeout(
        Duration::from_millis(50),
        app.clone().oneshot(request),
    )
    .await;
    assert!(dropped.is_err(), "gated run should not answer yet");

    wait_until_running(&app, &session_id).await;
    release.notify_one();

    for _ in 0..200 {
        let (_, view) = send(&app, get(&format!("/v1/sessions/{session_id}"))).await;
        if view["running"] == false && !view["state"]["plan"].is_null() {
            assert_eq!(view["state"]["destination"], "Paris");
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("detached run never saved its plan");
}

#[tokio::test]
async fn delete_during_run_is_conflict() {
    let release = Arc::new(Notify::new());
    let app = app_with_model(Arc::new(GatedModel {
        release: release.clone(),
    }));
    let session_id = new_session(&app).await;
    let uri = format!("/v1/sessions/{session_id}");

    let run = tokio::spawn({
        let app = app.clone();
        let request = post_json(&format!("{uri}/plan"), paris_request());
        async move { send(&app, request).await }
    });
    wait_until_running(&app, &session_id).await;

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(Body::empty())
            .unwrap()
    };
    let (status, body) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "run_in_progress");

    release.notify_one();
    let (status, _) = run.await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
