// libs/scheduling-cell/src/services/patients.rs
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Patient, SchedulingError};
use crate::services::store::{now_epoch, required, utc_from_column, SchedulingStore};

impl SchedulingStore {
    /// Returns the patient registered under `phone` (exact match), creating
    /// one with `full_name` when none exists. An existing patient's name is
    /// left as first recorded.
    pub fn find_or_create_patient(
        &mut self,
        full_name: &str,
        phone: &str,
    ) -> Result<Uuid, SchedulingError> {
        let tx = self.write_tx()?;
        let patient_id = find_or_create_patient_tx(&tx, full_name, phone)?;
        tx.commit()?;
        Ok(patient_id)
    }

    pub fn get_patient(&self, patient_id: Uuid) -> Result<Patient, SchedulingError> {
        self.conn
            .query_row(
                "SELECT id, full_name, phone, created_at FROM patients WHERE id = ?1",
                params![patient_id],
                |row| {
                    Ok(Patient {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        phone: row.get(2)?,
                        created_at: utc_from_column(row, 3)?,
                    })
                },
            )
            .optional()?
            .ok_or(SchedulingError::PatientNotFound)
    }
}

pub(crate) fn find_or_create_patient_tx(
    conn: &Connection,
    full_name: &str,
    phone: &str,
) -> Result<Uuid, SchedulingError> {
    let full_name = required(full_name, "full name")?;
    let phone = required(phone, "phone")?;

    let existing: Option<Uuid> = conn
        .query_row("SELECT id FROM patients WHERE phone = ?1", params![phone], |row| {
            row.get(0)
        })
        .optional()?;
    if let Some(patient_id) = existing {
        debug!("Reusing patient {} for phone {}", patient_id, phone);
        return Ok(patient_id);
    }

    let patient_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO patients(id, full_name, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![patient_id, full_name, phone, now_epoch()],
    )?;

    info!("Registered patient {} ({})", full_name, patient_id);
    Ok(patient_id)
}
