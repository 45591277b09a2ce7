// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateClinicRequest, CreateDoctorRequest, DoctorQuery};
use crate::services::SchedulingStore;

#[axum::debug_handler]
pub async fn list_clinics(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let clinics = SchedulingStore::run(config, |store| store.list_clinics()).await?;

    Ok(Json(json!({
        "clinics": clinics,
        "total": clinics.len()
    })))
}

#[axum::debug_handler]
pub async fn create_clinic(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("Admin {} creating clinic {}", user.id, request.name);

    let name = request.name.trim().to_string();
    let clinic_id = SchedulingStore::run(config, {
        let name = name.clone();
        move |store| store.create_clinic(&name)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "clinic": { "id": clinic_id, "name": name }
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = SchedulingStore::run(config, move |store| store.list_doctors(query.clinic_id)).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("Admin {} adding doctor {} to clinic {}", user.id, request.name, request.clinic_id);

    let doctor = SchedulingStore::run(config, move |store| {
        let doctor_id = store.create_doctor(&request.name, request.clinic_id)?;
        store.get_doctor(doctor_id)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "doctor": doctor
        })),
    ))
}
