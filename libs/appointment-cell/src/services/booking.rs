use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use schedule_cell::models::is_valid_time;
use shared_database::{DbError, SupabaseClient};

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentStatus,
    CreateAppointmentRequest, DoctorInfo, UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictGuard;
use crate::services::lifecycle::AppointmentLifecycleService;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Owns appointment creation and every state transition. All reads and
/// writes are scoped to the calling patient: an appointment owned by someone
/// else is indistinguishable from a missing one.
pub struct AppointmentBookingService {
    db: Arc<SupabaseClient>,
    conflict_guard: ConflictGuard,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self {
            conflict_guard: ConflictGuard::new(db.clone()),
            lifecycle: AppointmentLifecycleService::new(),
            db,
        }
    }

    pub async fn create(
        &self,
        patient_id: Uuid,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<AppointmentDetails, AppointmentError> {
        info!(
            "Booking appointment for patient {} with doctor {} at {} {}",
            patient_id, request.doctor_id, request.date, request.time
        );

        if !is_valid_time(&request.time) {
            return Err(AppointmentError::Validation(format!(
                "Invalid time: {}. Use HH:mm format",
                request.time
            )));
        }
        if request.reason.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "reason must not be empty".to_string(),
            ));
        }

        // Date-only comparison; booking for later today is allowed.
        let today = Utc::now().date_naive();
        if request.date < today {
            return Err(AppointmentError::Validation(
                "Cannot book appointments on past dates".to_string(),
            ));
        }

        if !self
            .conflict_guard
            .is_within_schedule(request.doctor_id, request.date, &request.time, auth_token)
            .await?
        {
            return Err(AppointmentError::OutsideSchedule);
        }

        if self
            .conflict_guard
            .has_conflict(request.doctor_id, request.date, &request.time, None, auth_token)
            .await?
        {
            return Err(AppointmentError::SlotTaken);
        }

        let appointment_data = json!({
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "date": request.date,
            "time": request.time,
            "status": AppointmentStatus::Scheduled,
            "reason": request.reason,
            "notes": request.notes,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(write_error)?;

        let appointment = parse_appointment_row(result.into_iter().next().ok_or_else(|| {
            AppointmentError::Database("insert returned no representation".to_string())
        })?)?;

        info!("Appointment {} created as scheduled", appointment.id);
        self.enrich(appointment, auth_token).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        patient_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let existing = self.fetch_scoped(id, patient_id, auth_token).await?;

        if !self.lifecycle.can_modify(&existing.status) {
            return Err(AppointmentError::NotModifiable(existing.status));
        }

        if let Some(ref time) = request.time {
            if !is_valid_time(time) {
                return Err(AppointmentError::Validation(format!(
                    "Invalid time: {}. Use HH:mm format",
                    time
                )));
            }
        }
        if let Some(ref reason) = request.reason {
            if reason.trim().is_empty() {
                return Err(AppointmentError::Validation(
                    "reason must not be empty".to_string(),
                ));
            }
        }

        let target_date = request.date.unwrap_or(existing.date);
        let target_time = request.time.clone().unwrap_or_else(|| existing.time.clone());
        let slot_changed = target_date != existing.date || target_time != existing.time;

        if slot_changed {
            let today = Utc::now().date_naive();
            if target_date < today {
                return Err(AppointmentError::Validation(
                    "Cannot book appointments on past dates".to_string(),
                ));
            }

            if !self
                .conflict_guard
                .is_within_schedule(existing.doctor_id, target_date, &target_time, auth_token)
                .await?
            {
                return Err(AppointmentError::OutsideSchedule);
            }

            // Exclude our own row so an unchanged half of the slot tuple
            // does not read as a conflict.
            if self
                .conflict_guard
                .has_conflict(existing.doctor_id, target_date, &target_time, Some(id), auth_token)
                .await?
            {
                return Err(AppointmentError::SlotTaken);
            }
        }

        let mut update_data = serde_json::Map::new();
        if let Some(date) = request.date {
            update_data.insert("date".to_string(), json!(date));
        }
        if let Some(time) = request.time {
            update_data.insert("time".to_string(), json!(time));
        }
        if let Some(reason) = request.reason {
            update_data.insert("reason".to_string(), json!(reason));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let appointment = self
            .patch_scoped(id, patient_id, Value::Object(update_data), auth_token)
            .await?;

        info!("Appointment {} updated", appointment.id);
        self.enrich(appointment, auth_token).await
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let existing = self.fetch_scoped(id, patient_id, auth_token).await?;

        self.lifecycle
            .validate_transition(&existing.status, AppointmentStatus::Cancelled)?;

        self.set_status(id, patient_id, AppointmentStatus::Cancelled, auth_token)
            .await?;

        info!("Appointment {} cancelled", id);
        Ok(())
    }

    pub async fn confirm(
        &self,
        id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let existing = self.fetch_scoped(id, patient_id, auth_token).await?;

        self.lifecycle
            .validate_transition(&existing.status, AppointmentStatus::Confirmed)?;

        let appointment = self
            .set_status(id, patient_id, AppointmentStatus::Confirmed, auth_token)
            .await?;

        info!("Appointment {} confirmed", id);
        self.enrich(appointment, auth_token).await
    }

    pub async fn get(
        &self,
        id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let appointment = self.fetch_scoped(id, patient_id, auth_token).await?;
        self.enrich(appointment, auth_token).await
    }

    /// Patient's appointments, newest first, paginated.
    pub async fn list(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
        page: u32,
        page_size: u32,
        auth_token: &str,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * page_size;

        let mut path = format!("/rest/v1/appointments?patient_id=eq.{}", patient_id);
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        path.push_str(&format!(
            "&order=date.desc,time.desc&limit={}&offset={}",
            page_size, offset
        ));

        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let appointments: Vec<Appointment> = rows
            .into_iter()
            .map(parse_appointment_row)
            .collect::<Result<_, _>>()?;

        // One doctor fetch per distinct doctor across the page.
        let mut doctors: HashMap<Uuid, DoctorInfo> = HashMap::new();
        let mut details = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            if !doctors.contains_key(&appointment.doctor_id) {
                let doctor = self.fetch_doctor(appointment.doctor_id, auth_token).await?;
                doctors.insert(appointment.doctor_id, doctor);
            }
            let doctor = &doctors[&appointment.doctor_id];
            details.push(AppointmentDetails::new(appointment, doctor));
        }

        debug!("Listed {} appointments for patient {}", details.len(), patient_id);
        Ok(details)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn fetch_scoped(
        &self,
        id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patient_id=eq.{}",
            id, patient_id
        );

        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(AppointmentError::NotFound)?;
        parse_appointment_row(row)
    }

    async fn patch_scoped(
        &self,
        id: Uuid,
        patient_id: Uuid,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patient_id=eq.{}",
            id, patient_id
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let rows: Vec<Value> = self
            .db
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(write_error)?;

        let row = rows.into_iter().next().ok_or(AppointmentError::NotFound)?;
        parse_appointment_row(row)
    }

    async fn set_status(
        &self,
        id: Uuid,
        patient_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339()
        });
        self.patch_scoped(id, patient_id, body, auth_token).await
    }

    async fn fetch_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorInfo, AppointmentError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=id,first_name,last_name,specialty",
            doctor_id
        );

        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or_else(|| {
            warn!("Doctor {} missing during enrichment", doctor_id);
            AppointmentError::DoctorNotFound
        })?;

        serde_json::from_value(row)
            .map_err(|e| AppointmentError::Database(format!("failed to parse doctor: {}", e)))
    }

    async fn enrich(
        &self,
        appointment: Appointment,
        auth_token: &str,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let doctor = self.fetch_doctor(appointment.doctor_id, auth_token).await?;
        Ok(AppointmentDetails::new(appointment, &doctor))
    }
}

fn parse_appointment_row(row: Value) -> Result<Appointment, AppointmentError> {
    serde_json::from_value(row)
        .map_err(|e| AppointmentError::Database(format!("failed to parse appointment: {}", e)))
}

/// A 409 from the storage layer is the partial unique index on
/// (doctor_id, date, time) for active statuses firing: the caller lost the
/// race for the slot, not a server fault.
fn write_error(e: DbError) -> AppointmentError {
    match e {
        DbError::Conflict(_) => AppointmentError::SlotTaken,
        other => AppointmentError::Database(other.to_string()),
    }
}
