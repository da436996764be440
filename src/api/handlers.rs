//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::TimerError,
    state::{group_by_category, AppState, Category, NewTimer, TimerId, TimerStatus},
};
use super::responses::{
    ApiError, CategorySection, GroupedTimersResponse, HealthResponse, HistoryResponse,
    StatusResponse, TimerListResponse, TimerResponse, TimerView,
};

/// Optional `?category=` filter
#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
    pub category: Option<Category>,
}

impl CategoryFilter {
    fn admits(&self, category: Category) -> bool {
        self.category.map_or(true, |wanted| wanted == category)
    }
}

/// Handle GET /timers - List timers, optionally for one category
pub async fn list_timers_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CategoryFilter>,
) -> Json<TimerListResponse> {
    let timers: Vec<TimerView> = state
        .engine
        .timers()
        .iter()
        .filter(|t| filter.admits(t.category))
        .map(TimerView::from)
        .collect();

    Json(TimerListResponse {
        count: timers.len(),
        timers,
    })
}

/// Handle GET /timers/grouped - Timers in per-category sections
pub async fn grouped_timers_handler(State(state): State<Arc<AppState>>) -> Json<GroupedTimersResponse> {
    let sections = group_by_category(&state.engine.timers())
        .into_iter()
        .map(|(category, timers)| CategorySection {
            category,
            timers: timers.iter().map(TimerView::from).collect(),
        })
        .collect();

    Json(GroupedTimersResponse { sections })
}

/// Handle POST /timers - Create a new timer
pub async fn create_timer_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTimer>, JsonRejection>,
) -> Result<(StatusCode, Json<TimerResponse>), ApiError> {
    let Json(draft) = payload?;
    let timer = state.engine.create_timer(draft).await?;
    info!("Create endpoint called - timer {} added", timer.id);
    Ok((
        StatusCode::CREATED,
        Json(TimerResponse::new("Timer created".to_string(), &timer)),
    ))
}

/// Handle GET /timers/:id - Fetch one timer
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    let id = TimerId::from(id);
    let timer = state
        .engine
        .get(&id)
        .ok_or(TimerError::NotFound(id))?;
    Ok(Json(TimerResponse::new("Timer found".to_string(), &timer)))
}

/// Handle POST /timers/:id/start - Start counting down
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.engine.start(&TimerId::from(id)).await?;
    Ok(Json(TimerResponse::new("Timer running".to_string(), &timer)))
}

/// Handle POST /timers/:id/pause - Pause the countdown
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.engine.pause(&TimerId::from(id)).await?;
    Ok(Json(TimerResponse::new("Timer paused".to_string(), &timer)))
}

/// Handle POST /timers/:id/reset - Restore the full duration
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.engine.reset(&TimerId::from(id)).await?;
    Ok(Json(TimerResponse::new("Timer reset".to_string(), &timer)))
}

/// Handle GET /history - Completion history in completion order
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CategoryFilter>,
) -> Json<HistoryResponse> {
    let entries: Vec<_> = state
        .engine
        .history()
        .await
        .into_iter()
        .filter(|e| filter.admits(e.category()))
        .collect();

    Json(HistoryResponse {
        count: entries.len(),
        entries,
    })
}

/// Handle GET /status - Return timer counts and server metadata
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let timers = state.engine.timers();

    Json(StatusResponse {
        total: timers.len(),
        paused: StatusResponse::count(&timers, TimerStatus::Paused),
        running: StatusResponse::count(&timers, TimerStatus::Running),
        completed: StatusResponse::count(&timers, TimerStatus::Completed),
        active_countdowns: state.engine.active_countdowns().await,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
