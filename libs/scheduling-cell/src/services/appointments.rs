// libs/scheduling-cell/src/services/appointments.rs
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentFilter, AppointmentStatus, SchedulingError,
};
use crate::services::conflict::conflicting_appointments_tx;
use crate::services::patients::find_or_create_patient_tx;
use crate::services::store::{
    exists_tx, naive_from_column, now_epoch, to_epoch, utc_from_column, SchedulingStore,
};

pub(crate) const APPOINTMENT_COLUMNS: &str =
    "a.id, a.doctor_id, a.patient_id, a.start_at, a.end_at, a.status, a.created_at, a.updated_at";

const DETAILS_FROM: &str = "FROM appointments a \
     JOIN doctors d ON d.id = a.doctor_id \
     JOIN clinics c ON c.id = d.clinic_id \
     JOIN patients p ON p.id = a.patient_id";

impl SchedulingStore {
    /// Inserts a booked appointment after checking the doctor's slot inside
    /// the same immediate transaction.
    pub fn create_appointment(
        &mut self,
        doctor_id: Uuid,
        patient_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Uuid, SchedulingError> {
        validate_slot(start, end)?;

        let tx = self.write_tx()?;
        let appointment_id = create_appointment_tx(&tx, doctor_id, patient_id, start, end)?;
        tx.commit()?;
        Ok(appointment_id)
    }

    /// Patient lookup-or-create, conflict check and insert as one transaction.
    /// Returns `(patient_id, appointment_id)`.
    pub fn book_slot(
        &mut self,
        full_name: &str,
        phone: &str,
        doctor_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(Uuid, Uuid), SchedulingError> {
        validate_slot(start, end)?;

        let tx = self.write_tx()?;
        if !exists_tx(&tx, "SELECT 1 FROM doctors WHERE id = ?1", doctor_id)? {
            return Err(SchedulingError::DoctorNotFound);
        }
        let patient_id = find_or_create_patient_tx(&tx, full_name, phone)?;
        let appointment_id = create_appointment_tx(&tx, doctor_id, patient_id, start, end)?;
        tx.commit()?;

        Ok((patient_id, appointment_id))
    }

    /// Cancels a booked appointment. Canceling twice is a no-op.
    pub fn cancel_appointment(&mut self, appointment_id: Uuid) -> Result<(), SchedulingError> {
        self.transition_appointment(appointment_id, AppointmentStatus::Canceled)
    }

    /// Marks a booked appointment completed. Completing twice is a no-op.
    pub fn complete_appointment(&mut self, appointment_id: Uuid) -> Result<(), SchedulingError> {
        self.transition_appointment(appointment_id, AppointmentStatus::Completed)
    }

    fn transition_appointment(
        &mut self,
        appointment_id: Uuid,
        target: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        let lifecycle = self.lifecycle;
        let tx = self.write_tx()?;

        let current: AppointmentStatus = tx
            .query_row(
                "SELECT status FROM appointments WHERE id = ?1",
                params![appointment_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(SchedulingError::AppointmentNotFound)?;

        if current == target {
            debug!("Appointment {} already {}", appointment_id, target);
            return Ok(());
        }
        lifecycle.validate_status_transition(current, target)?;

        tx.execute(
            "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![target, now_epoch(), appointment_id],
        )?;
        tx.commit()?;

        info!("Appointment {} moved from {} to {}", appointment_id, current, target);
        Ok(())
    }

    /// Hard delete, reserved for the admin dashboard.
    pub fn delete_appointment(&mut self, appointment_id: Uuid) -> Result<(), SchedulingError> {
        let tx = self.write_tx()?;
        let deleted = tx.execute("DELETE FROM appointments WHERE id = ?1", params![appointment_id])?;
        if deleted == 0 {
            return Err(SchedulingError::AppointmentNotFound);
        }
        tx.commit()?;

        warn!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    pub fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<AppointmentDetails, SchedulingError> {
        let sql = format!(
            "SELECT {}, d.name, c.id, c.name, p.full_name, p.phone {} WHERE a.id = ?1",
            APPOINTMENT_COLUMNS, DETAILS_FROM
        );
        self.conn
            .query_row(&sql, params![appointment_id], details_from_row)
            .optional()?
            .ok_or(SchedulingError::AppointmentNotFound)
    }

    /// Appointments matching `filter`, newest start first.
    pub fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentDetails>, SchedulingError> {
        debug!("Listing appointments with filter {:?}", filter);

        let (day_start, day_end) = match filter.date {
            Some(date) => {
                let start = date.and_time(NaiveTime::default());
                (Some(to_epoch(start)), Some(to_epoch(start + Duration::days(1))))
            }
            None => (None, None),
        };
        let name_pattern = filter
            .patient_name_contains
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
            .map(escape_like);
        // SQLite treats a negative LIMIT as unbounded.
        let limit = filter.limit.map(i64::from).unwrap_or(-1);

        let sql = format!(
            "SELECT {}, d.name, c.id, c.name, p.full_name, p.phone {} \
             WHERE (?1 IS NULL OR a.doctor_id = ?1) \
               AND (?2 IS NULL OR a.start_at >= ?2) \
               AND (?3 IS NULL OR a.start_at < ?3) \
               AND (?4 IS NULL OR p.full_name LIKE '%' || ?4 || '%' ESCAPE '\\') \
               AND (?5 IS NULL OR a.status = ?5) \
             ORDER BY a.start_at DESC, a.created_at DESC \
             LIMIT ?6",
            APPOINTMENT_COLUMNS, DETAILS_FROM
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    filter.doctor_id,
                    day_start,
                    day_end,
                    name_pattern,
                    filter.status,
                    limit
                ],
                details_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Slots are stored with whole-second precision.
pub(crate) fn validate_slot(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), SchedulingError> {
    if start.nanosecond() != 0 || end.nanosecond() != 0 {
        return Err(SchedulingError::Validation(
            "appointment times must be whole seconds".to_string(),
        ));
    }
    if end <= start {
        return Err(SchedulingError::Validation(
            "appointment end must be after its start".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn create_appointment_tx(
    conn: &Connection,
    doctor_id: Uuid,
    patient_id: Uuid,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Uuid, SchedulingError> {
    validate_slot(start, end)?;

    if !exists_tx(conn, "SELECT 1 FROM doctors WHERE id = ?1", doctor_id)? {
        return Err(SchedulingError::DoctorNotFound);
    }
    if !exists_tx(conn, "SELECT 1 FROM patients WHERE id = ?1", patient_id)? {
        return Err(SchedulingError::PatientNotFound);
    }
    if !conflicting_appointments_tx(conn, doctor_id, start, end)?.is_empty() {
        return Err(SchedulingError::Conflict);
    }

    let appointment_id = Uuid::new_v4();
    let now = now_epoch();
    conn.execute(
        "INSERT INTO appointments(id, doctor_id, patient_id, start_at, end_at, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            appointment_id,
            doctor_id,
            patient_id,
            to_epoch(start),
            to_epoch(end),
            AppointmentStatus::Booked,
            now
        ],
    )?;

    info!(
        "Booked appointment {} for doctor {} from {} to {}",
        appointment_id, doctor_id, start, end
    );
    Ok(appointment_id)
}

pub(crate) fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        doctor_id: row.get(1)?,
        patient_id: row.get(2)?,
        start: naive_from_column(row, 3)?,
        end: naive_from_column(row, 4)?,
        status: row.get(5)?,
        created_at: utc_from_column(row, 6)?,
        updated_at: utc_from_column(row, 7)?,
    })
}

fn details_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentDetails> {
    Ok(AppointmentDetails {
        appointment: appointment_from_row(row)?,
        doctor_name: row.get(8)?,
        clinic_id: row.get(9)?,
        clinic_name: row.get(10)?,
        patient_name: row.get(11)?,
        patient_phone: row.get(12)?,
    })
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("Sara"), "Sara");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_validate_slot_rejects_empty_and_negative() {
        let start = chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        assert!(validate_slot(start, start).is_err());
        assert!(validate_slot(start, start - Duration::minutes(5)).is_err());
        assert!(validate_slot(start, start + Duration::minutes(5)).is_ok());
    }

    #[test]
    fn test_validate_slot_rejects_fractional_seconds() {
        let start = chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_milli_opt(12, 0, 0, 100)
            .unwrap();

        assert!(validate_slot(start, start + Duration::milliseconds(600)).is_err());
        assert!(validate_slot(start - Duration::milliseconds(100), start).is_err());
    }
}
