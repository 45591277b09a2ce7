use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::sqlite::DatabaseError;

/// Ordered schema steps. A step is never edited once released; new schema
/// changes get a new version number appended at the end.
pub const MIGRATIONS: &[(i64, &str, &str)] = &[
    (1, "create scheduling tables", V1_SCHEDULING_TABLES),
    (2, "appointment lookup indexes", V2_APPOINTMENT_INDEXES),
];

pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|(version, _, _)| *version).unwrap_or(0)
}

pub fn current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Runs every step above the stored `user_version`, each in its own
/// immediate transaction so concurrent starters apply a step at most once.
pub fn apply(conn: &mut Connection) -> Result<i64, DatabaseError> {
    let supported = latest_version();
    let found = current_version(conn)?;
    if found > supported {
        return Err(DatabaseError::SchemaTooNew { found, supported });
    }

    for (version, name, sql) in MIGRATIONS {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let applied = current_version(&tx)?;
        if applied >= *version {
            continue;
        }

        info!("Applying migration {} ({})", version, name);
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
    }

    current_version(conn)
}

const V1_SCHEDULING_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS clinics (
    id BLOB PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS doctors (
    id BLOB PRIMARY KEY NOT NULL,
    clinic_id BLOB NOT NULL REFERENCES clinics(id),
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS patients (
    id BLOB PRIMARY KEY NOT NULL,
    full_name TEXT NOT NULL,
    phone TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS appointments (
    id BLOB PRIMARY KEY NOT NULL,
    doctor_id BLOB NOT NULL REFERENCES doctors(id),
    patient_id BLOB NOT NULL REFERENCES patients(id),
    start_at INTEGER NOT NULL,
    end_at INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'booked'
        CHECK (status IN ('booked', 'canceled', 'completed')),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    CHECK (end_at > start_at)
);
"#;

const V2_APPOINTMENT_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_doctors_clinic ON doctors(clinic_id);
CREATE INDEX IF NOT EXISTS idx_appointments_doctor_slot
    ON appointments(doctor_id, status, start_at, end_at);
CREATE INDEX IF NOT EXISTS idx_appointments_start ON appointments(start_at);
CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
"#;
