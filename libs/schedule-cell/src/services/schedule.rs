use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};

use crate::models::{
    is_valid_time, CreateScheduleRequest, ScheduleBlock, ScheduleError, UpdateScheduleRequest,
};

pub struct ScheduleService {
    db: Arc<SupabaseClient>,
}

impl ScheduleService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self { db }
    }

    /// Create a weekly availability block for a doctor.
    pub async fn create(
        &self,
        request: CreateScheduleRequest,
        auth_token: &str,
    ) -> Result<ScheduleBlock, ScheduleError> {
        debug!("Creating schedule block for doctor: {}", request.doctor_id);

        if !is_valid_time(&request.start_time) {
            return Err(ScheduleError::InvalidTimeFormat {
                field: "start_time",
                value: request.start_time,
            });
        }
        if !is_valid_time(&request.end_time) {
            return Err(ScheduleError::InvalidTimeFormat {
                field: "end_time",
                value: request.end_time,
            });
        }
        if !(0..=6).contains(&request.day_of_week) {
            return Err(ScheduleError::InvalidDayOfWeek(request.day_of_week));
        }
        // Zero-padded HH:mm compares lexically in clock order.
        if request.start_time >= request.end_time {
            return Err(ScheduleError::InvalidTimeRange);
        }

        let block_data = json!({
            "doctor_id": request.doctor_id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time,
            "end_time": request.end_time,
            "active": request.active.unwrap_or(true),
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
                "/rest/v1/schedules",
                Some(auth_token),
                Some(block_data),
                Some(headers),
            )
            .await
            .map_err(db_error)?;

        let row = result.into_iter().next().ok_or_else(|| {
            ScheduleError::Database("insert returned no representation".to_string())
        })?;

        let block: ScheduleBlock = serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("failed to parse schedule: {}", e)))?;
        debug!("Schedule block created with ID: {}", block.id);

        Ok(block)
    }

    /// All blocks for a doctor, ordered by weekday then start time.
    pub async fn get_by_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ScheduleBlock>, ScheduleError> {
        debug!("Fetching schedule blocks for doctor: {}", doctor_id);

        let path = format!(
            "/rest/v1/schedules?doctor_id=eq.{}&order=day_of_week.asc,start_time.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(db_error)?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| ScheduleError::Database(format!("failed to parse schedule: {}", e)))
            })
            .collect()
    }

    pub async fn get_by_id(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<ScheduleBlock, ScheduleError> {
        let path = format!("/rest/v1/schedules?id=eq.{}", id);
        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(db_error)?;

        let row = result.into_iter().next().ok_or(ScheduleError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("failed to parse schedule: {}", e)))
    }

    /// Partial update. Unspecified fields keep their stored values; the
    /// merged time range is re-validated before the patch is issued.
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateScheduleRequest,
        auth_token: &str,
    ) -> Result<ScheduleBlock, ScheduleError> {
        debug!("Updating schedule block: {}", id);

        let existing = self.get_by_id(id, auth_token).await?;

        if let Some(ref start) = request.start_time {
            if !is_valid_time(start) {
                return Err(ScheduleError::InvalidTimeFormat {
                    field: "start_time",
                    value: start.clone(),
                });
            }
        }
        if let Some(ref end) = request.end_time {
            if !is_valid_time(end) {
                return Err(ScheduleError::InvalidTimeFormat {
                    field: "end_time",
                    value: end.clone(),
                });
            }
        }

        let merged_start = request.start_time.as_deref().unwrap_or(&existing.start_time);
        let merged_end = request.end_time.as_deref().unwrap_or(&existing.end_time);
        if merged_start >= merged_end {
            return Err(ScheduleError::InvalidTimeRange);
        }

        let mut update_data = serde_json::Map::new();
        if let Some(start) = request.start_time {
            update_data.insert("start_time".to_string(), json!(start));
        }
        if let Some(end) = request.end_time {
            update_data.insert("end_time".to_string(), json!(end));
        }
        if let Some(active) = request.active {
            update_data.insert("active".to_string(), json!(active));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/schedules?id=eq.{}", id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .db
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(db_error)?;

        let row = result.into_iter().next().ok_or(ScheduleError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("failed to parse schedule: {}", e)))
    }

    /// Returns false when no row existed for the id.
    pub async fn delete(&self, id: Uuid, auth_token: &str) -> Result<bool, ScheduleError> {
        debug!("Deleting schedule block: {}", id);

        let path = format!("/rest/v1/schedules?id=eq.{}", id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let deleted: Vec<Value> = self
            .db
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(db_error)?;

        Ok(!deleted.is_empty())
    }
}

fn db_error(e: DbError) -> ScheduleError {
    ScheduleError::Database(e.to_string())
}
