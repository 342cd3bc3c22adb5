use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use schedule_cell::models::weekday_index;
use schedule_cell::services::ScheduleService;
use shared_database::SupabaseClient;

use crate::models::AppointmentError;

/// Pre-write occupancy and schedule-membership checks. The authoritative
/// double-booking guarantee lives in the storage schema (partial unique index
/// over doctor_id/date/time for active statuses); this service exists to give
/// callers a friendly error before the insert races.
pub struct ConflictGuard {
    db: Arc<SupabaseClient>,
    schedules: ScheduleService,
}

impl ConflictGuard {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self {
            schedules: ScheduleService::new(db.clone()),
            db,
        }
    }

    /// True when an active appointment already occupies the exact
    /// (doctor, date, time) tuple. `exclude_appointment_id` keeps an update
    /// from conflicting with itself.
    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        debug!("Checking conflicts for doctor {} at {} {}", doctor_id, date, time);

        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&time=eq.{}&status=in.(scheduled,confirmed)&select=id",
            doctor_id, date, time
        );
        if let Some(exclude_id) = exclude_appointment_id {
            path.push_str(&format!("&id=neq.{}", exclude_id));
        }

        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        if !rows.is_empty() {
            warn!(
                "Conflict detected for doctor {} at {} {} ({} occupant)",
                doctor_id,
                date,
                time,
                rows.len()
            );
        }

        Ok(!rows.is_empty())
    }

    /// True when some active block for the date's weekday contains the time.
    /// Bounds are inclusive on both ends, a deliberately distinct policy from
    /// slot generation's exclusive end.
    pub async fn is_within_schedule(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let weekday = weekday_index(date);

        let blocks = self
            .schedules
            .get_by_doctor(doctor_id, auth_token)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let within = blocks.iter().any(|block| {
            block.active
                && block.day_of_week == weekday
                && block.start_time.as_str() <= time
                && time <= block.end_time.as_str()
        });

        debug!(
            "Schedule membership for doctor {} at {} {}: {}",
            doctor_id, date, time, within
        );

        Ok(within)
    }
}
