//! HTTP control surface: start/stop/status for the alert loop.

use std::sync::Arc;

use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MonitorError, MonitorResult};

use super::{MonitorController, MonitorStatus};

const INDEX_HTML: &str = include_str!("../ui/index.html");

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<MonitorController>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReply {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

impl CommandReply {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.into(),
            run_id: None,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/start", post(start_monitoring))
        .route("/stop", post(stop_monitoring))
        .route("/status", get(get_status))
        .route("/health", get(health))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn start_monitoring(
    State(state): State<AppState>,
    body: Option<Json<StartRequest>>,
) -> MonitorResult<Json<CommandReply>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    match state.controller.start(request.token, request.chat_id).await {
        Ok(run_id) => Ok(Json(CommandReply {
            ok: true,
            message: "Monitoring started".into(),
            run_id: Some(run_id),
        })),
        Err(MonitorError::AlreadyRunning) => Ok(CommandReply::ok("Monitoring already running")),
        Err(err) => Err(err),
    }
}

async fn stop_monitoring(State(state): State<AppState>) -> Json<CommandReply> {
    if state.controller.stop().await {
        CommandReply::ok("Monitoring stopped")
    } else {
        CommandReply::ok("Monitoring not running")
    }
}

async fn get_status(State(state): State<AppState>) -> Json<MonitorStatus> {
    Json(state.controller.status().await)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::StatisticsResolver;
    use crate::models::Source;
    use crate::settings::Settings;
    use crate::testing::{FakeLauncher, FakeNotifier, ScriptedExtractor};

    fn app_state() -> AppState {
        let resolver = StatisticsResolver::new(
            Box::new(ScriptedExtractor::new(Source::Ocr, [])),
            Box::new(ScriptedExtractor::failing(Source::Html)),
        );
        let controller = MonitorController::new(
            Arc::new(Settings::default()),
            Arc::new(FakeLauncher::new()),
            Arc::new(FakeNotifier::default()),
            Arc::new(resolver),
        );
        AppState {
            controller: Arc::new(controller),
        }
    }

    fn body(token: &str, chat_id: &str) -> Option<Json<StartRequest>> {
        Some(Json(StartRequest {
            token: Some(token.into()),
            chat_id: Some(chat_id.into()),
        }))
    }

    #[test]
    fn start_request_uses_camel_case() {
        let request: StartRequest =
            serde_json::from_str(r#"{"token":"1:a","chatId":"42"}"#).unwrap();
        assert_eq!(request.chat_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn start_without_credentials_is_rejected() {
        let err = start_monitoring(State(app_state()), None).await.unwrap_err();
        assert!(matches!(err, MonitorError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn repeated_start_is_not_an_error() {
        let state = app_state();
        let first = start_monitoring(State(state.clone()), body("1:abc", "42"))
            .await
            .unwrap();
        assert!(first.0.ok);
        assert!(first.0.run_id.is_some());

        let second = start_monitoring(State(state.clone()), body("1:abc", "42"))
            .await
            .unwrap();
        assert!(second.0.ok);
        assert_eq!(second.0.message, "Monitoring already running");

        assert_eq!(stop_monitoring(State(state.clone())).await.0.message, "Monitoring stopped");
        assert_eq!(stop_monitoring(State(state)).await.0.message, "Monitoring not running");
    }

    #[tokio::test]
    async fn idle_status_and_health() {
        let status = get_status(State(app_state())).await;
        assert!(!status.0.running);
        assert_eq!(health().await.0["status"], "ok");
    }

    #[tokio::test]
    async fn index_serves_controller_page() {
        assert!(index().await.0.contains("/start"));
    }
}
