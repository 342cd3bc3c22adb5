use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use schedule_cell::models::{day_name, weekday_index};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String, // HH:mm
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Display label for patient-facing listings.
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::NoShow => "No Show",
        }
    }

    /// Active statuses occupy their slot; terminal ones release it.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only doctor row consumed for response enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
}

impl DoctorInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Appointment enriched with the read-side doctor join and display fields.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor_name: String,
    pub specialty: String,
    pub day_name: &'static str,
    pub status_label: &'static str,
}

impl AppointmentDetails {
    pub fn new(appointment: Appointment, doctor: &DoctorInfo) -> Self {
        let day_name = day_name(weekday_index(appointment.date));
        let status_label = appointment.status.label();
        Self {
            doctor_name: doctor.full_name(),
            specialty: doctor.specialty.clone(),
            day_name,
            status_label,
            appointment,
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

// ==============================================================================
// DERIVED SLOT MODELS (never persisted)
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Available,
    Occupied,
}

#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub time: String,
    pub state: SlotState,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
}

impl Slot {
    pub fn available(time: String) -> Self {
        Self {
            time,
            state: SlotState::Available,
            available: true,
            reason: None,
            appointment_id: None,
        }
    }

    pub fn occupied(time: String, appointment_id: Uuid, reason: String) -> Self {
        Self {
            time,
            state: SlotState::Occupied,
            available: false,
            reason: Some(reason),
            appointment_id: Some(appointment_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SlotSummary {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotGrid {
    pub slots: Vec<Slot>,
    pub summary: SlotSummary,
}

impl SlotGrid {
    /// A doctor with no block on the requested weekday simply has no slots.
    pub fn empty() -> Self {
        Self {
            slots: Vec::new(),
            summary: SlotSummary::default(),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("The doctor has no availability at the requested date and time")]
    OutsideSchedule,

    #[error("The requested slot is already booked")]
    SlotTaken,

    #[error("Appointment cannot become {requested} from status {current}; requires {required}")]
    InvalidStatusTransition {
        current: AppointmentStatus,
        requested: AppointmentStatus,
        required: &'static str,
    },

    #[error("Only scheduled appointments can be modified; current status is {0}")]
    NotModifiable(AppointmentStatus),

    #[error("Database error: {0}")]
    Database(String),
}
