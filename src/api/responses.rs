//! API response structures

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    error::TimerError,
    state::{Category, HistoryEntry, Timer, TimerStatus},
};

/// A timer as rendered to clients, with its progress fraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerView {
    #[serde(flatten)]
    pub timer: Timer,
    pub progress: f64,
}

impl From<&Timer> for TimerView {
    fn from(timer: &Timer) -> Self {
        Self {
            timer: timer.clone(),
            progress: timer.progress(),
        }
    }
}

/// Response for operations acting on a single timer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerView,
}

impl TimerResponse {
    pub fn new(message: String, timer: &Timer) -> Self {
        Self {
            status: "ok".to_string(),
            message,
            timestamp: Utc::now(),
            timer: timer.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerListResponse {
    pub count: usize,
    pub timers: Vec<TimerView>,
}

/// One category section of the grouped timer list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySection {
    pub category: Category,
    pub timers: Vec<TimerView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedTimersResponse {
    pub sections: Vec<CategorySection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub entries: Vec<HistoryEntry>,
}

/// Status response with per-status counts and server metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub total: usize,
    pub paused: usize,
    pub running: usize,
    pub completed: usize,
    pub active_countdowns: usize,
    pub uptime: String,
    pub port: u16,
    pub host: String,
}

impl StatusResponse {
    pub fn count(timers: &[Timer], status: TimerStatus) -> usize {
        timers.iter().filter(|t| t.status == status).count()
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body returned for failed requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Request failures mapped onto HTTP status codes
#[derive(Debug)]
pub enum ApiError {
    /// A timer operation failed
    Timer(TimerError),
    /// The request body could not be decoded
    InvalidBody(String),
}

impl From<TimerError> for ApiError {
    fn from(err: TimerError) -> Self {
        Self::Timer(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            ApiError::InvalidBody(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Timer(err) => {
                let code = match &err {
                    TimerError::Validation(_) => StatusCode::BAD_REQUEST,
                    TimerError::NotFound(_) => StatusCode::NOT_FOUND,
                    TimerError::InvalidTransition { .. } => StatusCode::CONFLICT,
                    TimerError::Persistence(e) => {
                        error!("Persistence failure while handling request: {}", e);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (code, err.to_string())
            }
        };
        let body = ErrorResponse {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
        };
        (code, Json(body)).into_response()
    }
}
