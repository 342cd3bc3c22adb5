use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Central transition table for the appointment state machine. Every status
/// change goes through here; handlers and services never compare status
/// strings on their own.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// All valid next statuses for a given current status.
    pub fn valid_transitions(&self, current: &AppointmentStatus) -> &'static [AppointmentStatus] {
        match current {
            AppointmentStatus::Scheduled => {
                &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Confirmed => &[AppointmentStatus::Cancelled],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => &[],
        }
    }

    /// Validate that a status transition is allowed.
    pub fn validate_transition(
        &self,
        current: &AppointmentStatus,
        requested: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current, requested);

        if !self.valid_transitions(current).contains(&requested) {
            warn!("Invalid status transition attempted: {} -> {}", current, requested);
            return Err(AppointmentError::InvalidStatusTransition {
                current: *current,
                requested,
                required: required_source(requested),
            });
        }

        Ok(())
    }

    /// Field mutation (date, time, reason, notes) is only allowed while the
    /// appointment is still scheduled.
    pub fn can_modify(&self, current: &AppointmentStatus) -> bool {
        matches!(current, AppointmentStatus::Scheduled)
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

/// The source states from which the requested status is reachable.
fn required_source(requested: AppointmentStatus) -> &'static str {
    match requested {
        AppointmentStatus::Confirmed => "scheduled",
        AppointmentStatus::Cancelled => "scheduled or confirmed",
        AppointmentStatus::Scheduled
        | AppointmentStatus::Completed
        | AppointmentStatus::NoShow => "no reachable source state",
    }
}
