// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use scheduling_cell::models::AppointmentFilter;
use scheduling_cell::services::SchedulingStore;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, BookingError, ConflictCheckQuery, ConflictCheckResponse};
use crate::services::AppointmentBookingService;

// ==============================================================================
// PUBLIC BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = tokio::task::spawn_blocking(move || {
        let mut store = SchedulingStore::new(&config)?;
        let appointment_id = AppointmentBookingService::new(&config).book(&mut store, &request)?;
        Ok::<_, BookingError>(store.get_appointment(appointment_id)?)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<ConflictCheckResponse>, AppError> {
    if query.end <= query.start {
        return Err(AppError::ValidationError(
            "end must be after start".to_string(),
        ));
    }

    let conflicting_appointments = SchedulingStore::run(config, move |store| {
        store.conflicting_appointments(query.doctor_id, query.start, query.end)
    })
    .await?;

    Ok(Json(ConflictCheckResponse {
        has_conflict: !conflicting_appointments.is_empty(),
        conflicting_appointments,
    }))
}

// ==============================================================================
// ADMIN DASHBOARD HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let appointments = SchedulingStore::run(config, move |store| store.list_appointments(&filter)).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment =
        SchedulingStore::run(config, move |store| store.get_appointment(appointment_id)).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Admin {} canceling appointment {}", user.id, appointment_id);

    let appointment = SchedulingStore::run(config, move |store| {
        store.cancel_appointment(appointment_id)?;
        store.get_appointment(appointment_id)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment canceled"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Admin {} completing appointment {}", user.id, appointment_id);

    let appointment = SchedulingStore::run(config, move |store| {
        store.complete_appointment(appointment_id)?;
        store.get_appointment(appointment_id)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("Admin {} deleting appointment {}", user.id, appointment_id);

    SchedulingStore::run(config, move |store| store.delete_appointment(appointment_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn check_scheduling_consistency(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let overlaps = SchedulingStore::run(config, |store| store.audit_overlaps()).await?;

    Ok(Json(json!({
        "healthy": overlaps.is_empty(),
        "overlaps": overlaps
    })))
}
