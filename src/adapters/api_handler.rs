//! REST API handlers for template management and form rendering
//!
//! Provides CRUD endpoints for templates plus stateless trigger matching,
//! form rendering and output generation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::validator::{TemplateValidator, ValidationError};
use crate::config::Settings;
use crate::domain::{StoredTemplate, Template, TemplateStore, TriggerNotifier};
use crate::engine::trigger::{match_trigger, text_before_cursor};
use crate::engine::{generate, resolve_schemas, FieldTree, FormState, OutputFormat, ValueTree};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub settings: Arc<RwLock<Settings>>,
    pub store: Arc<dyn TemplateStore>,
    pub notifier: TriggerNotifier,
    /// Held from validation until the write lands so trigger checks see every prior write
    authoring: Arc<Mutex<()>>,
}

impl ApiState {
    pub fn new(settings: Settings, store: Arc<dyn TemplateStore>, notifier: TriggerNotifier) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            store,
            notifier,
            authoring: Arc::new(Mutex::new(())),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchRequest {
    pub text: String,
    /// Cursor position in characters; defaults to the end of `text`
    #[serde(default)]
    pub cursor: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MatchResult {
    pub trigger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
}

/// A form request names its template inline or by trigger
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FormRequest {
    #[serde(default)]
    pub template: Option<Value>,
    #[serde(default)]
    pub trigger: Option<String>,
    /// Previously entered values, shaped like the output document
    #[serde(default)]
    pub values: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RenderedForm {
    pub fields: FieldTree,
    pub schemas: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedOutput {
    pub format: OutputFormat,
    pub output: Value,
    /// `output` serialized exactly as it would be inserted
    pub text: String,
}

fn validation_message(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

/// Push the store's current trigger list to listeners
async fn publish_triggers(state: &ApiState) {
    match state.store.get_all_triggers().await {
        Ok(triggers) => state.notifier.publish(triggers),
        Err(e) => warn!("Failed to refresh trigger list: {}", e),
    }
}

/// Templates other than `exclude_id`, for duplicate-trigger checks
async fn other_templates(state: &ApiState, exclude_id: Option<&str>) -> anyhow::Result<Vec<Template>> {
    Ok(state
        .store
        .get_all()
        .await?
        .into_iter()
        .filter(|stored| Some(stored.id.as_str()) != exclude_id)
        .map(|stored| stored.template)
        .collect())
}

async fn validate_body(state: &ApiState, body: &str, exclude_id: Option<&str>) -> Result<Template, (StatusCode, String)> {
    let validator = state.settings.read().await.validator();
    let others = other_templates(state, exclude_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let others: Vec<&Template> = others.iter().collect();
    validator
        .validate_text(body, &others)
        .map_err(|errors| (StatusCode::BAD_REQUEST, validation_message(&errors)))
}

async fn resolve_form_template(state: &ApiState, request: &FormRequest) -> Result<Template, (StatusCode, String)> {
    if let Some(value) = &request.template {
        let template = Template::from_value(value.clone()).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        let errors = TemplateValidator::field_key_errors(&template);
        if !errors.is_empty() {
            return Err((StatusCode::BAD_REQUEST, validation_message(&errors)));
        }
        return Ok(template);
    }
    let Some(trigger) = &request.trigger else {
        return Err((StatusCode::BAD_REQUEST, "Either template or trigger is required".to_string()));
    };
    match state.store.get_by_trigger(trigger).await {
        Ok(Some(template)) => Ok(template),
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("No template for trigger '{}'", trigger))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn build_form(state: &ApiState, request: FormRequest) -> Result<FormState, (StatusCode, String)> {
    let template = resolve_form_template(state, &request).await?;
    let policy = state.settings.read().await.forms.delete_policy;
    let values = request.values.map(ValueTree::from_value).unwrap_or_default();
    Ok(FormState::with_values(template.into_document(), &values, policy))
}

// ============================================================================
// Template CRUD Endpoints
// ============================================================================

/// GET /api/templates - List all templates
pub async fn list_templates(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.get_all().await {
        Ok(templates) => (StatusCode::OK, Json(ApiResponse::success(templates))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<Vec<StoredTemplate>>::error(e.to_string())),
        ),
    }
}

/// GET /api/templates/:id - Get a single template
pub async fn get_template(State(state): State<ApiState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.store.get(&id).await {
        Ok(Some(stored)) => (StatusCode::OK, Json(ApiResponse::success(stored))),
        Ok(None) => (StatusCode::NOT_FOUND, Json(ApiResponse::<StoredTemplate>::error("Template not found"))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<StoredTemplate>::error(e.to_string())),
        ),
    }
}

/// POST /api/templates - Create a template from raw JSON text
pub async fn create_template(State(state): State<ApiState>, body: String) -> impl IntoResponse {
    let _authoring = state.authoring.lock().await;
    let template = match validate_body(&state, &body, None).await {
        Ok(template) => template,
        Err((status, message)) => return (status, Json(ApiResponse::<StoredTemplate>::error(message))),
    };

    match state.store.put(None, template).await {
        Ok(stored) => {
            info!("Created template {}", stored.id);
            publish_triggers(&state).await;
            (StatusCode::CREATED, Json(ApiResponse::success(stored)))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<StoredTemplate>::error(e.to_string())),
        ),
    }
}

/// PUT /api/templates/:id - Replace a template from raw JSON text
pub async fn update_template(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: String,
) -> impl IntoResponse {
    let _authoring = state.authoring.lock().await;
    match state.store.get(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, Json(ApiResponse::<StoredTemplate>::error("Template not found"))),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<StoredTemplate>::error(e.to_string())),
            )
        }
    }

    let template = match validate_body(&state, &body, Some(&id)).await {
        Ok(template) => template,
        Err((status, message)) => return (status, Json(ApiResponse::<StoredTemplate>::error(message))),
    };

    match state.store.put(Some(id), template).await {
        Ok(stored) => {
            info!("Updated template {}", stored.id);
            publish_triggers(&state).await;
            (StatusCode::OK, Json(ApiResponse::success(stored)))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<StoredTemplate>::error(e.to_string())),
        ),
    }
}

/// DELETE /api/templates/:id - Delete a template
pub async fn delete_template(State(state): State<ApiState>, Path(id): Path<String>) -> impl IntoResponse {
    let _authoring = state.authoring.lock().await;
    match state.store.delete(&id).await {
        Ok(true) => {
            info!("Deleted template {}", id);
            publish_triggers(&state).await;
            (StatusCode::OK, Json(ApiResponse::<()>::ok()))
        }
        Ok(false) => (StatusCode::NOT_FOUND, Json(ApiResponse::<()>::error("Template not found"))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::<()>::error(e.to_string()))),
    }
}

// ============================================================================
// Trigger and Form Endpoints
// ============================================================================

/// GET /api/triggers - All known triggers, in storage order
pub async fn list_triggers(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.get_all_triggers().await {
        Ok(triggers) => (StatusCode::OK, Json(ApiResponse::success(triggers))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<Vec<String>>::error(e.to_string())),
        ),
    }
}

/// POST /api/match - Find the trigger the text before the cursor ends with
pub async fn match_text(State(state): State<ApiState>, Json(request): Json<MatchRequest>) -> impl IntoResponse {
    let triggers = match state.store.get_all_triggers().await {
        Ok(triggers) => triggers,
        Err(e) => {
            warn!("Failed to load triggers: {}", e);
            Vec::new()
        }
    };

    let cursor = request.cursor.unwrap_or_else(|| request.text.chars().count());
    let before = text_before_cursor(&request.text, cursor);
    let trigger = match_trigger(&triggers, before).map(String::from);

    let template = match &trigger {
        Some(trigger) => state.store.get_by_trigger(trigger).await.ok().flatten(),
        None => None,
    };

    (StatusCode::OK, Json(ApiResponse::success(MatchResult { trigger, template })))
}

/// POST /api/forms/render - Field tree for a template
pub async fn render_form(State(state): State<ApiState>, Json(request): Json<FormRequest>) -> impl IntoResponse {
    match build_form(&state, request).await {
        Ok(form) => {
            let rendered = RenderedForm {
                fields: form.tree().clone(),
                schemas: form.schemas().names().map(String::from).collect(),
            };
            (StatusCode::OK, Json(ApiResponse::success(rendered)))
        }
        Err((status, message)) => (status, Json(ApiResponse::<RenderedForm>::error(message))),
    }
}

/// POST /api/forms/generate - Output document for a template and values
///
/// Values are used as given: static fields and array items keep whatever
/// the caller stored, without passing through a form.
pub async fn generate_output(State(state): State<ApiState>, Json(request): Json<FormRequest>) -> impl IntoResponse {
    let template = match resolve_form_template(&state, &request).await {
        Ok(template) => template,
        Err((status, message)) => return (status, Json(ApiResponse::<GeneratedOutput>::error(message))),
    };

    let values = request.values.map(ValueTree::from_value).unwrap_or_default();
    let format = template.output_format();
    let output = generate(template.document(), &resolve_schemas(template.document()), &values);
    match format.render(&output) {
        Ok(text) => (StatusCode::OK, Json(ApiResponse::success(GeneratedOutput { format, output, text }))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<GeneratedOutput>::error(e.to_string())),
        ),
    }
}
