// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::admin_middleware;

use crate::handlers;

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    // The booking form needs the clinic and doctor pickers without a login
    let public_routes = Router::new()
        .route("/", get(handlers::list_clinics))
        .route("/doctors", get(handlers::list_doctors));

    let admin_routes = Router::new()
        .route("/", post(handlers::create_clinic))
        .route("/doctors", post(handlers::create_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), admin_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
