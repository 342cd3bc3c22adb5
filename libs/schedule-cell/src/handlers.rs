use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{
    CreateScheduleRequest, ScheduleBlockView, ScheduleError, UpdateScheduleRequest,
};
use crate::services::ScheduleService;

fn map_error(e: ScheduleError) -> AppError {
    match e {
        ScheduleError::InvalidTimeFormat { .. }
        | ScheduleError::InvalidDayOfWeek(_)
        | ScheduleError::InvalidTimeRange => AppError::ValidationError(e.to_string()),
        ScheduleError::NotFound => AppError::NotFound("Schedule not found".to_string()),
        ScheduleError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleBlockView>), AppError> {
    let service = ScheduleService::new(state.db.clone());

    let block = service
        .create(request, auth.token())
        .await
        .map_err(map_error)?;

    Ok((StatusCode::CREATED, Json(block.into())))
}

#[axum::debug_handler]
pub async fn get_doctor_schedules(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Vec<ScheduleBlockView>>, AppError> {
    let service = ScheduleService::new(state.db.clone());

    let blocks = service
        .get_by_doctor(doctor_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(blocks.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(schedule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<ScheduleBlockView>, AppError> {
    let service = ScheduleService::new(state.db.clone());

    let block = service
        .get_by_id(schedule_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(block.into()))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(schedule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<ScheduleBlockView>, AppError> {
    let service = ScheduleService::new(state.db.clone());

    let block = service
        .update(schedule_id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(block.into()))
}

#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Path(schedule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.db.clone());

    let deleted = service
        .delete(schedule_id, auth.token())
        .await
        .map_err(map_error)?;

    if !deleted {
        return Err(AppError::NotFound("Schedule not found".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Schedule deleted successfully"
    })))
}
