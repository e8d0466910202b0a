use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use quill::adapters::api_handler::ApiState;
use quill::adapters::file_template_store::FileTemplateStore;
use quill::adapters::template_store::InMemoryTemplateStore;
use quill::config::validator::TemplateValidator;
use quill::config::Settings;
use quill::domain::{Template, TemplateStore, TriggerNotifier};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

const SCENE: &str = r#"{
    "_meta": { "name": "Scene", "trigger": "/scene" },
    "$schemas": { "tag": "$input" },
    "title": "$input:Title",
    "genre": "noir",
    "tags": "$array:tag"
}"#;

fn app_with(templates: Vec<(String, Template)>) -> (Router, TriggerNotifier) {
    let temp_dir = tempfile::tempdir().unwrap();
    let settings = Settings::from_root(temp_dir.path().to_str().unwrap()).unwrap();
    let store = Arc::new(InMemoryTemplateStore::with_templates(templates));
    let notifier = TriggerNotifier::new(vec![]);
    let state = ApiState::new(settings, store, notifier.clone());
    (quill::create_app(state), notifier)
}

fn scene_app() -> (Router, TriggerNotifier) {
    app_with(vec![("scene".into(), Template::parse(SCENE).unwrap())])
}

async fn send(app: &Router, method: &str, uri: &str, body: impl Into<String>) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .header("Content-Type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body_bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (app, _) = scene_app();
    let (status, body) = send(&app, "GET", "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["templates"], 1);
}

#[tokio::test]
async fn test_template_crud_publishes_triggers() {
    let (app, notifier) = scene_app();

    let (status, body) = send(&app, "POST", "/api/templates", r#"{"_meta": {"trigger": "/note"}, "body": "$input"}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(notifier.current(), vec!["/scene".to_string(), "/note".to_string()]);

    let (status, body) = send(&app, "GET", "/api/templates", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "PUT", &format!("/api/templates/{}", id), r#"{"_meta": {"trigger": "/memo"}}"#).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/api/triggers", "").await;
    assert_eq!(body["data"], json!(["/scene", "/memo"]));

    let (status, _) = send(&app, "DELETE", &format!("/api/templates/{}", id), "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notifier.current(), vec!["/scene".to_string()]);

    let (status, body) = send(&app, "GET", &format!("/api/templates/{}", id), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_create_rejects_invalid_templates() {
    let (app, _) = scene_app();

    let (status, body) = send(&app, "POST", "/api/templates", "{ nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON"));

    let (status, body) = send(&app, "POST", "/api/templates", r#"{"_meta": {"trigger": "/scene"}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Duplicate trigger"));

    let (status, _) = send(&app, "POST", "/api/templates", r#"{"_meta": {"trigger": "scene2"}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_keeps_own_trigger() {
    let (app, _) = scene_app();
    let (status, _) = send(&app, "PUT", "/api/templates/scene", SCENE).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "PUT", "/api/templates/missing", SCENE).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_match() {
    let (app, _) = scene_app();
    let (status, body) = send(&app, "POST", "/api/match", json!({ "text": "a /scene" }).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["trigger"], "/scene");
    assert_eq!(body["data"]["template"]["_meta"]["name"], "Scene");

    let (_, body) = send(&app, "POST", "/api/match", json!({ "text": "a /scene b", "cursor": 3 }).to_string()).await;
    assert_eq!(body["data"]["trigger"], Value::Null);
}

#[tokio::test]
async fn test_render_form() {
    let (app, _) = scene_app();
    let request = json!({ "trigger": "/scene", "values": { "tags": ["a", { "value": "b" }] } });
    let (status, body) = send(&app, "POST", "/api/forms/render", request.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let nodes = body["data"]["fields"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0]["label"], "Title");
    assert_eq!(nodes[2]["items"].as_array().unwrap().len(), 2);
    assert_eq!(nodes[2]["items"][1]["ordinal"], "#2");
    assert_eq!(body["data"]["schemas"], json!(["tag"]));
}

#[tokio::test]
async fn test_generate_output() {
    let (app, _) = scene_app();
    let request = json!({
        "trigger": "/scene",
        "values": { "title": "Rooftops", "genre": "ignored", "tags": [{ "value": "rain" }] }
    });
    let (status, body) = send(&app, "POST", "/api/forms/generate", request.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["format"], "json");
    assert_eq!(
        body["data"]["output"],
        json!({ "title": "Rooftops", "genre": "noir", "tags": ["rain"] })
    );
    assert!(body["data"]["text"].as_str().unwrap().starts_with("{\n  \"title\""));
}

#[tokio::test]
async fn test_generate_inline_template_without_schema() {
    let (app, _) = app_with(vec![]);
    let request = json!({ "template": { "items": "$array:missing", "x": "$select:a|b" } });
    let (status, body) = send(&app, "POST", "/api/forms/generate", request.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["output"], json!({ "items": [], "x": "" }));

    let (status, _) = send(&app, "POST", "/api/forms/generate", json!({ "trigger": "/nope" }).to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_keeps_stored_array_items() {
    let (app, _) = app_with(vec![]);
    let request = json!({
        "template": { "$schemas.tag": "value", "tags": "$array:tag" },
        "values": { "tags": [{ "value": "x" }, "y"] }
    });
    let (status, body) = send(&app, "POST", "/api/forms/generate", request.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["output"], json!({ "tags": ["x", "y"] }));

    let request = json!({
        "template": { "$schemas": { "tag": "$input" }, "tags": "$array:tag", "n": "$input" },
        "values": { "tags": [{ "value": "x" }, "y"], "n": 3 }
    });
    let (_, body) = send(&app, "POST", "/api/forms/generate", request.to_string()).await;
    assert_eq!(body["data"]["output"], json!({ "tags": ["x", "y"], "n": 3 }));
}

#[tokio::test]
async fn test_inline_template_with_path_characters_rejected() {
    let (app, _) = app_with(vec![]);
    let request = json!({ "template": { "a.b": "$input", "a": { "b": "$input" } } });
    let (status, body) = send(&app, "POST", "/api/forms/generate", request.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'a.b'"));

    let (status, _) = send(&app, "POST", "/api/forms/render", request.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = r#"{"_meta": {"trigger": "/dotted"}, "a.b": "$input"}"#;
    let (status, _) = send(&app, "POST", "/api/templates", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_padded_trigger_rejected() {
    let (app, notifier) = scene_app();
    let (status, body) = send(&app, "POST", "/api/templates", r#"{"_meta": {"trigger": " /note "}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("must start with '/'"));
    assert_eq!(notifier.current(), Vec::<String>::new());
}

#[tokio::test]
async fn test_concurrent_creates_with_same_trigger() {
    let (app, _) = app_with(vec![]);
    let body = r#"{"_meta": {"trigger": "/race"}, "x": "$input"}"#;
    let (a, b, c, d) = tokio::join!(
        send(&app, "POST", "/api/templates", body),
        send(&app, "POST", "/api/templates", body),
        send(&app, "POST", "/api/templates", body),
        send(&app, "POST", "/api/templates", body),
    );
    let created = [a.0, b.0, c.0, d.0].iter().filter(|s| **s == StatusCode::CREATED).count();
    assert_eq!(created, 1);

    let (_, body) = send(&app, "GET", "/api/triggers", "").await;
    assert_eq!(body["data"], json!(["/race"]));
}

#[tokio::test]
async fn test_created_template_survives_directory_reload() {
    let temp_dir = tempfile::tempdir().unwrap();
    let settings = Settings::from_root(temp_dir.path().to_str().unwrap()).unwrap();
    let templates_dir = temp_dir.path().join("templates");
    std::fs::create_dir_all(&templates_dir).unwrap();
    std::fs::write(templates_dir.join("scene.json"), SCENE).unwrap();

    let store = Arc::new(FileTemplateStore::open(&templates_dir, TemplateValidator::default()).unwrap());
    let notifier = TriggerNotifier::new(store.get_all_triggers().await.unwrap());
    let app = quill::create_app(ApiState::new(settings, store.clone(), notifier));

    let (status, body) = send(&app, "POST", "/api/templates", r#"{"_meta": {"trigger": "/note"}, "body": "$input"}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // Simulates the watcher firing after an unrelated file changed
    std::fs::write(templates_dir.join("other.json"), r#"{"_meta": {"trigger": "/other"}}"#).unwrap();
    assert_eq!(store.reload().await.unwrap(), 3);

    let (status, body) = send(&app, "GET", &format!("/api/templates/{}", id), "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["template"]["_meta"]["trigger"], "/note");

    let (status, _) = send(&app, "DELETE", &format!("/api/templates/{}", id), "").await;
    assert_eq!(status, StatusCode::OK);
    store.reload().await.unwrap();
    let (status, _) = send(&app, "GET", &format!("/api/templates/{}", id), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
