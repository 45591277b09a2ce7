// libs/scheduling-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// A doctor's `[start, end)` slot. Times are clinic-local wall clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        slots_overlap(self.start, self.end, start, end)
    }
}

/// Dashboard row: the appointment plus the names it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor_name: String,
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub patient_name: String,
    pub patient_phone: String,
}

/// Half-open interval overlap. Touching slots (`a_end == b_start`) do not overlap.
pub fn slots_overlap(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Canceled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "booked" => Ok(AppointmentStatus::Booked),
            "canceled" | "cancelled" => Ok(AppointmentStatus::Canceled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(format!("unknown appointment status: {}", other)),
        }
    }
}

impl ToSql for AppointmentStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AppointmentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

// ==============================================================================
// REQUEST/QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub clinic_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorQuery {
    pub clinic_id: Option<Uuid>,
}

/// Dashboard filter. Every field is optional; results are newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub patient_name_contains: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub limit: Option<u32>,
}

/// A pair of booked appointments of one doctor whose slots overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    pub doctor_id: Uuid,
    pub first_appointment_id: Uuid,
    pub second_appointment_id: Uuid,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment conflicts with existing booking")]
    Conflict,

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("A clinic named {0} already exists")]
    DuplicateName(String),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl From<SchedulingError> for AppError {
    fn from(error: SchedulingError) -> Self {
        match error {
            SchedulingError::Validation(msg) => AppError::ValidationError(msg),
            SchedulingError::Conflict => {
                AppError::Conflict("Appointment slot conflicts with existing booking".to_string())
            }
            SchedulingError::ClinicNotFound
            | SchedulingError::DoctorNotFound
            | SchedulingError::PatientNotFound
            | SchedulingError::AppointmentNotFound => AppError::NotFound(error.to_string()),
            SchedulingError::DuplicateName(_) => AppError::Conflict(error.to_string()),
            SchedulingError::InvalidStatusTransition { .. } => {
                AppError::BadRequest(error.to_string())
            }
            SchedulingError::Database(_) | SchedulingError::Sqlite(_) => {
                AppError::Database(error.to_string())
            }
            SchedulingError::TaskFailed(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_overlap_detects_partial_overlap() {
        assert!(slots_overlap(at(10, 0), at(10, 30), at(10, 15), at(10, 45)));
        assert!(slots_overlap(at(10, 15), at(10, 45), at(10, 0), at(10, 30)));
    }

    #[test]
    fn test_overlap_detects_containment() {
        assert!(slots_overlap(at(9, 0), at(12, 0), at(10, 0), at(10, 30)));
        assert!(slots_overlap(at(10, 0), at(10, 30), at(10, 0), at(10, 30)));
    }

    #[test]
    fn test_touching_slots_do_not_overlap() {
        assert!(!slots_overlap(at(10, 0), at(10, 30), at(10, 30), at(11, 0)));
        assert!(!slots_overlap(at(10, 30), at(11, 0), at(10, 0), at(10, 30)));
    }

    #[test]
    fn test_disjoint_slots_do_not_overlap() {
        assert!(!slots_overlap(at(8, 0), at(9, 0), at(10, 0), at(11, 0)));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            AppointmentStatus::Booked,
            AppointmentStatus::Canceled,
            AppointmentStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(status));
        }
        assert_eq!("cancelled".parse::<AppointmentStatus>(), Ok(AppointmentStatus::Canceled));
        assert!("no_show".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_error_mapping_to_app_error() {
        assert!(matches!(AppError::from(SchedulingError::Conflict), AppError::Conflict(_)));
        assert!(matches!(
            AppError::from(SchedulingError::DoctorNotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(SchedulingError::Validation("end before start".into())),
            AppError::ValidationError(_)
        ));
    }
}
