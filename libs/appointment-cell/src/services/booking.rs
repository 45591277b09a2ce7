// libs/appointment-cell/src/services/booking.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{info, warn};
use uuid::Uuid;

use scheduling_cell::services::SchedulingStore;
use shared_config::AppConfig;

use crate::models::{BookAppointmentRequest, BookingError};

/// Upper bound for one appointment; longer requests are treated as typos.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Turns an untrusted booking form into a single store transaction.
#[derive(Debug, Clone)]
pub struct AppointmentBookingService {
    default_duration_minutes: i64,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_default_duration(config.default_duration_minutes)
    }

    pub fn with_default_duration(default_duration_minutes: i64) -> Self {
        Self {
            default_duration_minutes,
        }
    }

    /// Validates `request` and books it. Patient lookup, conflict check and
    /// insert commit together or not at all.
    pub fn book(
        &self,
        store: &mut SchedulingStore,
        request: &BookAppointmentRequest,
    ) -> Result<Uuid, BookingError> {
        let full_name = required(&request.full_name, "full_name")?;
        let phone = required(&request.phone, "phone")?;
        let doctor_id = request.doctor_id.ok_or(BookingError::MissingField("doctor_id"))?;
        let date = required(&request.date, "date")?;
        let time = required(&request.time, "time")?;

        let start = parse_start(date, time)?;
        let duration_minutes = request
            .duration_minutes
            .unwrap_or(self.default_duration_minutes);
        let end = slot_end(start, duration_minutes)?;

        info!(
            "Booking doctor {} from {} for {} minutes",
            doctor_id, start, duration_minutes
        );

        let (patient_id, appointment_id) = store
            .book_slot(full_name, phone, doctor_id, start, end)
            .map_err(|e| {
                let error = BookingError::from(e);
                warn!("Booking for doctor {} at {} rejected: {}", doctor_id, start, error);
                error
            })?;

        info!("Appointment {} booked for patient {}", appointment_id, patient_id);
        Ok(appointment_id)
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, BookingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookingError::MissingField(field));
    }
    Ok(trimmed)
}

pub fn parse_start(date: &str, time: &str) -> Result<NaiveDateTime, BookingError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidDateTime(format!("unrecognized date {:?}", date)))?;

    let clock = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(time, format).ok())
        .ok_or_else(|| BookingError::InvalidDateTime(format!("unrecognized time {:?}", time)))?;

    Ok(day.and_time(clock))
}

pub fn slot_end(start: NaiveDateTime, duration_minutes: i64) -> Result<NaiveDateTime, BookingError> {
    if duration_minutes <= 0 || duration_minutes > MAX_DURATION_MINUTES {
        return Err(BookingError::InvalidDuration(duration_minutes));
    }

    start
        .checked_add_signed(Duration::minutes(duration_minutes))
        .ok_or(BookingError::InvalidDuration(duration_minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_start_accepts_minutes_and_seconds() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap();

        assert_eq!(parse_start("2025-03-10", "10:15").unwrap(), expected);
        assert_eq!(parse_start("2025-03-10", "10:15:00").unwrap(), expected);
    }

    #[test]
    fn test_parse_start_rejects_garbage() {
        assert_matches!(
            parse_start("10/03/2025", "10:15"),
            Err(BookingError::InvalidDateTime(_))
        );
        assert_matches!(
            parse_start("2025-02-30", "10:15"),
            Err(BookingError::InvalidDateTime(_))
        );
        assert_matches!(
            parse_start("2025-03-10", "25:00"),
            Err(BookingError::InvalidDateTime(_))
        );
    }

    #[test]
    fn test_slot_end_bounds() {
        let start = parse_start("2025-03-10", "23:30").unwrap();

        assert_eq!(
            slot_end(start, 45).unwrap(),
            parse_start("2025-03-11", "00:15").unwrap()
        );
        assert_matches!(slot_end(start, 0), Err(BookingError::InvalidDuration(0)));
        assert_matches!(slot_end(start, -30), Err(BookingError::InvalidDuration(-30)));
        assert_matches!(
            slot_end(start, MAX_DURATION_MINUTES + 1),
            Err(BookingError::InvalidDuration(_))
        );
    }
}
