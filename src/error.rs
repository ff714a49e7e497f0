//! Error taxonomy for the monitor.
//!
//! Startup errors (`InvalidCredentials`, `RendererUnavailable`,
//! `AlreadyRunning`) are returned to the control surface. The recoverable ones
//! (`ExtractionFailed`, `NotifierFailure`) are absorbed by the alert loop and
//! only show up in logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("page renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("no percentages found by OCR or page text")]
    ExtractionFailed,

    #[error("notification failed: {0}")]
    NotifierFailure(#[from] NotifierError),

    #[error("monitoring already running")]
    AlreadyRunning,
}

impl MonitorError {
    pub fn renderer(err: anyhow::Error) -> Self {
        MonitorError::RendererUnavailable(format!("{err:#}"))
    }

    fn code(&self) -> &'static str {
        match self {
            MonitorError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            MonitorError::RendererUnavailable(_) => "RENDERER_UNAVAILABLE",
            MonitorError::ExtractionFailed => "EXTRACTION_FAILED",
            MonitorError::NotifierFailure(_) => "NOTIFIER_FAILURE",
            MonitorError::AlreadyRunning => "ALREADY_RUNNING",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            MonitorError::InvalidCredentials(_) => StatusCode::BAD_REQUEST,
            MonitorError::RendererUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MonitorError::AlreadyRunning => StatusCode::CONFLICT,
            MonitorError::ExtractionFailed | MonitorError::NotifierFailure(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

/// Delivery failures reported by a [`crate::notifier::Notifier`].
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("messaging API rejected the message (status={status}): {description}")]
    Rejected { status: u16, description: String },
}

impl From<reqwest::Error> for NotifierError {
    fn from(err: reqwest::Error) -> Self {
        NotifierError::Http(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    message: String,
    code: &'static str,
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            message: self.to_string(),
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
