// libs/appointment-cell/src/models.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scheduling_cell::models::{Appointment, SchedulingError};
use shared_models::error::AppError;

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Untrusted booking form, as submitted by a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(default, alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    pub doctor_id: Option<Uuid>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// `HH:MM` or `HH:MM:SS`
    #[serde(default)]
    pub time: String,
    #[serde(alias = "duration")]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Uuid,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid date or time: {0}")]
    InvalidDateTime(String),

    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(i64),

    #[error("Appointment slot is already taken")]
    SlotTaken,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(SchedulingError),
}

impl From<SchedulingError> for BookingError {
    fn from(error: SchedulingError) -> Self {
        match error {
            SchedulingError::Conflict => BookingError::SlotTaken,
            SchedulingError::DoctorNotFound => BookingError::NotFound("Doctor"),
            SchedulingError::PatientNotFound => BookingError::NotFound("Patient"),
            SchedulingError::AppointmentNotFound => BookingError::NotFound("Appointment"),
            other => BookingError::Store(other),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        match error {
            BookingError::MissingField(_)
            | BookingError::InvalidDateTime(_)
            | BookingError::InvalidDuration(_) => AppError::ValidationError(error.to_string()),
            BookingError::SlotTaken => AppError::Conflict(error.to_string()),
            BookingError::NotFound(_) => AppError::NotFound(error.to_string()),
            BookingError::Store(inner) => inner.into(),
        }
    }
}
