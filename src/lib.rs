//! # Quill - structured text from JSON templates
//!
//! Quill turns a JSON template into an editable form and the filled-in form
//! back into a structured document. Typing a template's trigger followed by
//! space or tab in a text field opens its form; submitting inserts the
//! generated JSON (or YAML) where the trigger was.
//!
//! ## Features
//!
//! - **Markers**: static literals, `$input`, `$select:a|b` and `$array:<schema>`
//! - **Schemas**: reusable item shapes declared under `$schemas`
//! - **Trigger detection**: trigger list pushed to listeners on every change
//! - **HTTP API**: template CRUD plus stateless render/generate endpoints
//! - **Live Reload**: the templates directory is watched for changes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quill::engine::{FormState, DeletePolicy};
//! use serde_json::json;
//!
//! let template = json!({ "title": "$input" });
//! let mut form = FormState::new(template.as_object().cloned().unwrap(), DeletePolicy::default());
//! form.set_value(&"title".parse().unwrap(), "Hello").unwrap();
//! assert_eq!(form.preview(), json!({ "title": "Hello" }));
//! ```
//!
//! ## Architecture
//!
//! - **Engine**: pure template, form and output logic
//! - **Domain**: templates and the ports to storage and text fields
//! - **Adapters**: store, sessions, trigger listener, HTTP handlers
//! - **Config**: settings, template validation and directory watching

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::health_handler::HealthHandler;
use axum::{routing::{get, post}, Router};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `state` - Shared settings, template store and trigger notifier
///
/// # Returns
///
/// Configured Axum Router
pub fn create_app(state: ApiState) -> Router {
    let health_handler = Arc::new(HealthHandler::new(state.store.clone()));

    let health_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }));

    let api_router = Router::new()
        // Templates CRUD
        .route("/templates", get(api_handler::list_templates).post(api_handler::create_template))
        .route("/templates/:id", get(api_handler::get_template).put(api_handler::update_template).delete(api_handler::delete_template))
        // Triggers and forms
        .route("/triggers", get(api_handler::list_triggers))
        .route("/match", post(api_handler::match_text))
        .route("/forms/render", post(api_handler::render_form))
        .route("/forms/generate", post(api_handler::generate_output))
        .with_state(state);

    health_router.nest("/api", api_router).layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
