//! In-process stand-in for the identification service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

/// What the mock service has seen and will answer with.
#[derive(Default)]
pub struct MockState {
    pub annotations: Vec<Value>,
    pub job: Option<Value>,
    pub logs: Vec<Value>,
    pub images: Vec<String>,
    /// `(method path, SessionID header)` per request, in arrival order.
    pub requests: Vec<(String, Option<String>)>,
    /// Bodies posted to the annotations endpoint.
    pub submitted: Vec<Value>,
    pub deleted_images: Vec<String>,
}

pub type Shared = Arc<Mutex<MockState>>;

fn record(state: &Shared, route: &str, headers: &HeaderMap) {
    let session = headers
        .get("SessionID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .lock()
        .unwrap()
        .requests
        .push((route.to_string(), session));
}

pub fn zebra(id: i64, name: &str, confidence: f64) -> Value {
    json!({
        "id": id,
        "file_name": format!("images/{id}.jpg"),
        "cropped_file_name": format!("crops/{id}.jpg"),
        "bbox": [0.0, 0.0, 10.0, 10.0],
        "species_confidence": confidence,
        "predicted_species": "grevys_zebra",
        "predicted_name": name,
        "accepted": false,
        "ignored": false
    })
}

async fn get_annotations(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "GET /annotations", &headers);
    let annotations = state.lock().unwrap().annotations.clone();
    Json(json!({ "status": "ok", "annotations": annotations }))
}

async fn post_annotations(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, "POST /annotations", &headers);
    state.lock().unwrap().submitted.push(body);
    Json(json!({ "status": "ok" }))
}

async fn get_predictions(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "GET /predictions", &headers);
    let annotations = state.lock().unwrap().annotations.clone();
    Json(json!({ "annotations": annotations }))
}

async fn get_retrain_job(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "GET /retrain_job", &headers);
    match state.lock().unwrap().job.clone() {
        Some(job) => Json(json!({ "status": "ok", "job": job })),
        None => Json(json!({ "status": "ok" })),
    }
}

async fn delete_retrain_job(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "DELETE /retrain_job", &headers);
    state.lock().unwrap().job = None;
    Json(json!({ "status": "ok" }))
}

async fn start_retrain(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "GET /retrain", &headers);
    let session = headers
        .get("SessionID")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.lock().unwrap().job = Some(json!({
        "session_id": session,
        "created_at": 1_700_000_000.5,
        "status": "in progress"
    }));
    Json(json!({ "status": "ok" }))
}

async fn abort_retrain(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "GET /abort_retrain_job", &headers);
    let mut guard = state.lock().unwrap();
    if let Some(job) = guard.job.as_mut() {
        job["status"] = json!("aborted");
    }
    Json(json!({ "status": "ok" }))
}

async fn get_retrain_logs(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "GET /retrain_logs", &headers);
    let logs = state.lock().unwrap().logs.clone();
    Json(json!({ "status": "ok", "logs": logs }))
}

async fn get_sessions(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "GET /sessions", &headers);
    Json(json!({
        "status": "ok",
        "sessions": [
            { "id": "s1", "name": "Ol Pejeta" },
            { "id": "s2", "name": "Mpala" }
        ]
    }))
}

async fn put_session(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, "PUT /sessions", &headers);
    Json(json!({
        "status": "ok",
        "session": { "id": "s3", "name": body["name"] }
    }))
}

async fn get_images(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record(&state, "GET /images", &headers);
    let images = state.lock().unwrap().images.clone();
    Json(json!({ "status": "ok", "images": images }))
}

async fn delete_images(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, "DELETE /images", &headers);
    let names: Vec<String> = serde_json::from_value(body["images"].clone()).unwrap_or_default();
    let mut guard = state.lock().unwrap();
    guard.images.retain(|image| !names.contains(image));
    guard.deleted_images.extend(names);
    Json(json!({ "status": "ok" }))
}

async fn rejected() -> Json<Value> {
    Json(json!({ "status": "error", "error": "session not found" }))
}

async fn server_error() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "model crashed")
}

async fn not_json() -> &'static str {
    "<html>gateway</html>"
}

async fn wrong_shape() -> Json<Value> {
    Json(json!({ "status": "ok", "annotations": [{ "id": "seven" }] }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "status": "ok", "annotations": [] }))
}

/// Router serving the annotation, retraining, session and image endpoints
/// from `state`.
pub fn service_router(state: Shared) -> Router {
    Router::new()
        .route("/api/v1/annotations", get(get_annotations).post(post_annotations))
        .route("/api/v1/predictions", get(get_predictions))
        .route("/api/v1/retrain", get(start_retrain))
        .route("/api/v1/retrain_job", get(get_retrain_job).delete(delete_retrain_job))
        .route("/api/v1/abort_retrain_job", get(abort_retrain))
        .route("/api/v1/retrain_logs", get(get_retrain_logs))
        .route("/api/v1/sessions", get(get_sessions).put(put_session))
        .route("/api/v1/images", get(get_images).delete(delete_images))
        .with_state(state)
}

/// Router whose every endpoint misbehaves in the named way.
pub fn failing_router(mode: &str) -> Router {
    let route = match mode {
        "rejected" => get(rejected).post(rejected),
        "server_error" => get(server_error).post(server_error),
        "not_json" => get(not_json).post(not_json),
        "wrong_shape" => get(wrong_shape).post(wrong_shape),
        "slow" => get(slow).post(slow),
        other => panic!("unknown failure mode {other}"),
    };
    Router::new()
        .route("/api/v1/annotations", route.clone())
        .route("/api/v1/predictions", route)
}

/// Serve `router` on an ephemeral local port, returning its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{addr}")
}
