use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::availability::DEFAULT_SLOT_MINUTES;
use crate::services::booking::DEFAULT_PAGE_SIZE;
use crate::services::{AppointmentBookingService, AvailabilityService};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot_minutes: Option<u32>,
}

fn map_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::Validation(msg) => AppError::ValidationError(msg),
        AppointmentError::OutsideSchedule => AppError::BadRequest(e.to_string()),
        AppointmentError::SlotTaken => AppError::Conflict(e.to_string()),
        AppointmentError::InvalidStatusTransition { .. } | AppointmentError::NotModifiable(_) => {
            AppError::BadRequest(e.to_string())
        }
        AppointmentError::Database(msg) => AppError::Database(msg),
    }
}

/// The authenticated caller is the patient; ownership scoping starts here.
fn patient_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid patient ID".to_string()))
}

// ==============================================================================
// BOOKING AND LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient_id = patient_id(&user)?;
    let service = AppointmentBookingService::new(state.db.clone());

    let appointment = service
        .create(patient_id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment booked successfully",
            "data": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = patient_id(&user)?;
    let service = AppointmentBookingService::new(state.db.clone());

    let appointment = service
        .update(appointment_id, patient_id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment updated successfully",
        "data": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = patient_id(&user)?;
    let service = AppointmentBookingService::new(state.db.clone());

    service
        .cancel(appointment_id, patient_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = patient_id(&user)?;
    let service = AppointmentBookingService::new(state.db.clone());

    let appointment = service
        .confirm(appointment_id, patient_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment confirmed successfully",
        "data": appointment
    })))
}

// ==============================================================================
// READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = patient_id(&user)?;
    let service = AppointmentBookingService::new(state.db.clone());

    let appointment = service
        .get(appointment_id, patient_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "data": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAppointmentsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = patient_id(&user)?;
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let service = AppointmentBookingService::new(state.db.clone());

    let appointments = service
        .list(patient_id, params.status, page, limit, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "data": appointments,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": appointments.len()
        }
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailableSlotsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(state.db.clone());
    let slot_minutes = params.slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);

    let grid = service
        .compute_slots(params.doctor_id, params.date, slot_minutes, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "doctor_id": params.doctor_id,
            "date": params.date,
            "slots": grid.slots,
            "summary": grid.summary
        }
    })))
}
