// libs/scheduling-cell/src/services/conflict.rs
use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, OverlapReport, SchedulingError};
use crate::services::appointments::{appointment_from_row, validate_slot, APPOINTMENT_COLUMNS};
use crate::services::store::{to_epoch, SchedulingStore};

impl SchedulingStore {
    /// True iff a booked appointment of `doctor_id` overlaps `[start, end)`.
    pub fn has_conflict(
        &self,
        doctor_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<bool, SchedulingError> {
        Ok(!self.conflicting_appointments(doctor_id, start, end)?.is_empty())
    }

    pub fn conflicting_appointments(
        &self,
        doctor_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        validate_slot(start, end)?;
        conflicting_appointments_tx(&self.conn, doctor_id, start, end)
    }

    /// Scans every booked appointment and reports overlapping pairs per
    /// doctor. Empty on a healthy database.
    pub fn audit_overlaps(&self) -> Result<Vec<OverlapReport>, SchedulingError> {
        let sql = format!(
            "SELECT {} FROM appointments a ORDER BY a.doctor_id, a.start_at",
            APPOINTMENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let appointments = stmt
            .query_map([], appointment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_doctor: HashMap<Uuid, Vec<Appointment>> = HashMap::new();
        for appointment in appointments {
            if self.lifecycle.holds_slot(appointment.status) {
                by_doctor.entry(appointment.doctor_id).or_default().push(appointment);
            }
        }

        let mut reports = Vec::new();
        for (doctor_id, booked) in by_doctor {
            for (i, first) in booked.iter().enumerate() {
                for second in &booked[i + 1..] {
                    if first.overlaps(second.start, second.end) {
                        reports.push(OverlapReport {
                            doctor_id,
                            first_appointment_id: first.id,
                            second_appointment_id: second.id,
                        });
                    }
                }
            }
        }

        if !reports.is_empty() {
            warn!("Scheduling audit found {} overlapping pairs", reports.len());
        }
        Ok(reports)
    }
}

pub(crate) fn conflicting_appointments_tx(
    conn: &Connection,
    doctor_id: Uuid,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Appointment>, SchedulingError> {
    debug!("Checking conflicts for doctor {} from {} to {}", doctor_id, start, end);

    let sql = format!(
        "SELECT {} FROM appointments a \
         WHERE a.doctor_id = ?1 AND a.status = ?2 AND a.start_at < ?3 AND a.end_at > ?4 \
         ORDER BY a.start_at",
        APPOINTMENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let conflicts = stmt
        .query_map(
            params![doctor_id, AppointmentStatus::Booked, to_epoch(end), to_epoch(start)],
            appointment_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    if !conflicts.is_empty() {
        warn!(
            "Conflict detected for doctor {} - {} conflicting appointments",
            doctor_id,
            conflicts.len()
        );
    }
    Ok(conflicts)
}
