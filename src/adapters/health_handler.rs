use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::TemplateStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub store: String,
    pub templates: usize,
}

pub struct HealthHandler {
    store: Arc<dyn TemplateStore>,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self {
            store,
            start_time: std::time::Instant::now(),
        }
    }

    /// Basic health check - 200 while the server runs, with store status
    pub async fn health(&self) -> impl IntoResponse {
        let (store, templates) = match self.store.get_all_triggers().await {
            Ok(triggers) => ("ok".to_string(), triggers.len()),
            Err(e) => (format!("error: {}", e), 0),
        };
        let status = HealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            checks: HealthChecks { store, templates },
        };

        (StatusCode::OK, Json(status))
    }

    /// Readiness check - 200 once at least one template is loaded
    pub async fn ready(&self) -> impl IntoResponse {
        let loaded = self
            .store
            .get_all_triggers()
            .await
            .map(|t| !t.is_empty())
            .unwrap_or(false);

        if loaded {
            (StatusCode::OK, Json(serde_json::json!({
                "status": "ready",
                "message": "Templates loaded"
            })))
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({
                "status": "not_ready",
                "message": "No templates loaded"
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::template_store::InMemoryTemplateStore;
    use crate::domain::Template;

    #[tokio::test]
    async fn test_health_endpoint() {
        let handler = HealthHandler::new(Arc::new(InMemoryTemplateStore::new()));
        let response = handler.health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint_without_templates() {
        let handler = HealthHandler::new(Arc::new(InMemoryTemplateStore::new()));
        let response = handler.ready().await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ready_endpoint_with_templates() {
        let template = Template::parse(r#"{"_meta": {"trigger": "/s"}}"#).unwrap();
        let store = InMemoryTemplateStore::with_templates(vec![("s".into(), template)]);
        let handler = HealthHandler::new(Arc::new(store));
        let response = handler.ready().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
