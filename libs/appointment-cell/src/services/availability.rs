use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use schedule_cell::models::weekday_index;
use schedule_cell::services::ScheduleService;
use shared_database::SupabaseClient;

use crate::models::{AppointmentError, Slot, SlotGrid, SlotSummary};

/// Default consultation length in minutes.
pub const DEFAULT_SLOT_MINUTES: u32 = 40;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Pure derivation of bookable slots for a date: schedule blocks in, grid of
/// available/occupied slots out. Owns no state of its own.
pub struct AvailabilityService {
    db: Arc<SupabaseClient>,
    schedules: ScheduleService,
}

#[derive(Debug, Deserialize)]
struct BookedSlotRow {
    id: Uuid,
    time: String,
    reason: String,
}

impl AvailabilityService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self {
            schedules: ScheduleService::new(db.clone()),
            db,
        }
    }

    pub async fn compute_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot_minutes: u32,
        auth_token: &str,
    ) -> Result<SlotGrid, AppointmentError> {
        debug!("Calculating slots for doctor {} on {}", doctor_id, date);

        if slot_minutes == 0 || slot_minutes > MINUTES_PER_DAY {
            return Err(AppointmentError::Validation(format!(
                "slot duration must be between 1 and {} minutes, got {}",
                MINUTES_PER_DAY, slot_minutes
            )));
        }

        let weekday = weekday_index(date);

        let blocks = self
            .schedules
            .get_by_doctor(doctor_id, auth_token)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        // First active block for the weekday wins; overlapping blocks for the
        // same day are not merged.
        let block = match blocks
            .iter()
            .find(|b| b.day_of_week == weekday && b.active)
        {
            Some(block) => block,
            None => {
                debug!("Doctor {} has no schedule block on weekday {}", doctor_id, weekday);
                return Ok(SlotGrid::empty());
            }
        };

        let times = generate_slot_times(&block.start_time, &block.end_time, slot_minutes);
        let booked = self.booked_times(doctor_id, date, auth_token).await?;

        let slots: Vec<Slot> = times
            .into_iter()
            .map(|time| match booked.get(&time) {
                Some((appointment_id, reason)) => {
                    Slot::occupied(time, *appointment_id, reason.clone())
                }
                None => Slot::available(time),
            })
            .collect();

        let occupied = slots.iter().filter(|s| !s.available).count();
        let summary = SlotSummary {
            total: slots.len(),
            available: slots.len() - occupied,
            occupied,
        };

        debug!(
            "Doctor {} on {}: {} slots, {} available",
            doctor_id, date, summary.total, summary.available
        );

        Ok(SlotGrid { slots, summary })
    }

    /// Times already taken by active appointments for the doctor and date,
    /// keyed by normalized `HH:mm` string.
    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<HashMap<String, (Uuid, String)>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&status=in.(scheduled,confirmed)&select=id,time,reason",
            doctor_id, date
        );

        let rows: Vec<Value> = self
            .db
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let mut booked = HashMap::new();
        for row in rows {
            let row: BookedSlotRow = serde_json::from_value(row)
                .map_err(|e| AppointmentError::Database(format!("failed to parse appointment: {}", e)))?;
            booked.insert(normalize_time(&row.time), (row.id, row.reason));
        }

        Ok(booked)
    }
}

/// Candidate slot start times from `start` stepping by `step_minutes`,
/// exclusive of the end boundary: a slot starting exactly at `end` is never
/// produced.
pub fn generate_slot_times(start: &str, end: &str, step_minutes: u32) -> Vec<String> {
    let (start_min, end_min) = match (parse_minutes(start), parse_minutes(end)) {
        (Some(s), Some(e)) => (s, e),
        _ => return Vec::new(),
    };

    let mut slots = Vec::new();
    let mut current = start_min;
    while current < end_min {
        slots.push(format_minutes(current));
        current += step_minutes;
    }

    slots
}

/// Database time columns come back as `HH:mm:ss`; slot comparison happens on
/// the `HH:mm` prefix.
pub fn normalize_time(time: &str) -> String {
    if time.len() > 5 && time.as_bytes().get(2) == Some(&b':') {
        time[..5].to_string()
    } else {
        time.to_string()
    }
}

fn parse_minutes(time: &str) -> Option<u32> {
    let (hours, minutes) = time.split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

fn format_minutes(total: u32) -> String {
    format!("{:02}:{:02}", total / 60, total % 60)
}
