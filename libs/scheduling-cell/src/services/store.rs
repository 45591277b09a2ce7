// libs/scheduling-cell/src/services/store.rs
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::Database;

use crate::models::{Clinic, Doctor, SchedulingError};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Scheduling store over one SQLite connection. Mutations run in
/// `BEGIN IMMEDIATE` transactions, so check-then-insert sequences are
/// serialized by the database across connections and processes.
pub struct SchedulingStore {
    pub(crate) conn: Connection,
    pub(crate) lifecycle: AppointmentLifecycleService,
}

impl SchedulingStore {
    pub fn new(config: &AppConfig) -> Result<Self, SchedulingError> {
        Self::open(&Database::new(config))
    }

    pub fn open(database: &Database) -> Result<Self, SchedulingError> {
        Ok(Self::from_connection(database.connect()?))
    }

    /// Wraps an already configured and migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Runs `f` against a fresh store on the blocking thread pool.
    pub async fn run<T, F>(config: Arc<AppConfig>, f: F) -> Result<T, SchedulingError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SchedulingStore) -> Result<T, SchedulingError> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || {
            let mut store = SchedulingStore::new(&config)?;
            f(&mut store)
        })
        .await
        .map_err(|e| SchedulingError::TaskFailed(e.to_string()))?
    }

    pub(crate) fn write_tx(&mut self) -> Result<Transaction<'_>, SchedulingError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    // ==========================================================================
    // CLINICS
    // ==========================================================================

    pub fn create_clinic(&mut self, name: &str) -> Result<Uuid, SchedulingError> {
        let name = required(name, "clinic name")?;

        let tx = self.write_tx()?;
        let existing: Option<Uuid> = tx
            .query_row("SELECT id FROM clinics WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;
        if existing.is_some() {
            return Err(SchedulingError::DuplicateName(name.to_string()));
        }

        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO clinics(id, name, created_at) VALUES (?1, ?2, ?3)",
            params![id, name, now_epoch()],
        )
        .map_err(|e| map_unique_violation(e, name))?;
        tx.commit()?;

        info!("Created clinic {} ({})", name, id);
        Ok(id)
    }

    pub fn list_clinics(&self) -> Result<Vec<Clinic>, SchedulingError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM clinics ORDER BY name")?;
        let clinics = stmt
            .query_map([], |row| {
                Ok(Clinic {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: utc_from_column(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(clinics)
    }

    // ==========================================================================
    // DOCTORS
    // ==========================================================================

    pub fn create_doctor(&mut self, name: &str, clinic_id: Uuid) -> Result<Uuid, SchedulingError> {
        let name = required(name, "doctor name")?;

        let tx = self.write_tx()?;
        if !exists_tx(&tx, "SELECT 1 FROM clinics WHERE id = ?1", clinic_id)? {
            return Err(SchedulingError::ClinicNotFound);
        }

        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO doctors(id, clinic_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, clinic_id, name, now_epoch()],
        )?;
        tx.commit()?;

        info!("Created doctor {} ({}) in clinic {}", name, id, clinic_id);
        Ok(id)
    }

    pub fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, SchedulingError> {
        self.conn
            .query_row(
                "SELECT id, clinic_id, name, created_at FROM doctors WHERE id = ?1",
                params![doctor_id],
                doctor_from_row,
            )
            .optional()?
            .ok_or(SchedulingError::DoctorNotFound)
    }

    /// Doctors ordered by name, optionally limited to one clinic.
    pub fn list_doctors(&self, clinic_id: Option<Uuid>) -> Result<Vec<Doctor>, SchedulingError> {
        debug!("Listing doctors (clinic: {:?})", clinic_id);

        let mut stmt = self.conn.prepare(
            "SELECT id, clinic_id, name, created_at FROM doctors \
             WHERE ?1 IS NULL OR clinic_id = ?1 ORDER BY name",
        )?;
        let doctors = stmt
            .query_map(params![clinic_id], doctor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(doctors)
    }
}

// ==============================================================================
// ROW AND VALUE HELPERS
// ==============================================================================

pub(crate) fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, SchedulingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SchedulingError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}

pub(crate) fn exists_tx(conn: &Connection, sql: &str, id: Uuid) -> Result<bool, SchedulingError> {
    Ok(conn
        .query_row(sql, params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

pub(crate) fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Wall-clock values are stored as seconds as if they were UTC.
pub(crate) fn to_epoch(value: NaiveDateTime) -> i64 {
    value.and_utc().timestamp()
}

pub(crate) fn naive_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    Ok(utc_from_column(row, idx)?.naive_utc())
}

pub(crate) fn utc_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {}", secs).into(),
        )
    })
}

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        name: row.get(2)?,
        created_at: utc_from_column(row, 3)?,
    })
}

fn map_unique_violation(err: rusqlite::Error, name: &str) -> SchedulingError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            SchedulingError::DuplicateName(name.to_string())
        }
        _ => SchedulingError::Sqlite(err),
    }
}
