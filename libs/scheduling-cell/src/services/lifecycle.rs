// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, SchedulingError};

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(SchedulingError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Booked => vec![
                AppointmentStatus::Canceled,
                AppointmentStatus::Completed,
            ],
            // Terminal states
            AppointmentStatus::Canceled => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }

    /// Only booked appointments hold their slot.
    pub fn holds_slot(&self, status: AppointmentStatus) -> bool {
        status == AppointmentStatus::Booked
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        self.get_valid_transitions(status).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_booked_can_be_canceled_or_completed() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Booked, AppointmentStatus::Canceled)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Booked, AppointmentStatus::Completed)
            .is_ok());
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let lifecycle = AppointmentLifecycleService::new();

        assert_matches!(
            lifecycle.validate_status_transition(
                AppointmentStatus::Completed,
                AppointmentStatus::Canceled
            ),
            Err(SchedulingError::InvalidStatusTransition {
                from: AppointmentStatus::Completed,
                to: AppointmentStatus::Canceled,
            })
        );
        assert_matches!(
            lifecycle.validate_status_transition(
                AppointmentStatus::Canceled,
                AppointmentStatus::Booked
            ),
            Err(SchedulingError::InvalidStatusTransition { .. })
        );
        assert!(lifecycle.is_terminal(AppointmentStatus::Canceled));
        assert!(lifecycle.is_terminal(AppointmentStatus::Completed));
        assert!(!lifecycle.is_terminal(AppointmentStatus::Booked));
    }

    #[test]
    fn test_only_booked_holds_slot() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle.holds_slot(AppointmentStatus::Booked));
        assert!(!lifecycle.holds_slot(AppointmentStatus::Canceled));
        assert!(!lifecycle.holds_slot(AppointmentStatus::Completed));
    }
}
