//! Superfície HTTP (JSON) do portal
//!
//! Pilha de camadas, da mais externa para a mais interna:
//! trace → CORS → compressão → limite de concorrência → handler.

mod extract;
mod handlers;
mod response;

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use rand::RngCore;
use sqlx::SqlitePool;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::PortalConfig;
use crate::services::appointments::OwnershipPolicy;
use crate::session::SessionKeys;

pub use extract::CurrentSession;
pub use handlers::LoginGrant;

/// Estado compartilhado pelos handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub keys: Arc<SessionKeys>,
    pub ownership: OwnershipPolicy,
}

impl AppState {
    pub fn new(pool: SqlitePool, keys: SessionKeys, ownership: OwnershipPolicy) -> Self {
        Self {
            pool,
            keys: Arc::new(keys),
            ownership,
        }
    }

    /// Monta o estado a partir da configuração.
    ///
    /// Sem segredo configurado, gera um aleatório: os tokens não sobrevivem
    /// a um reinício do processo.
    pub fn from_config(pool: SqlitePool, config: &PortalConfig) -> Self {
        let ttl = chrono::Duration::minutes(config.session_ttl_minutes);
        let keys = match &config.session_secret {
            Some(secret) => SessionKeys::new(secret.as_bytes(), ttl),
            None => {
                warn!("HOSPITAL_SESSION_SECRET ausente; usando segredo aleatório por processo");
                let mut secret = zeroize::Zeroizing::new([0u8; 32]);
                rand::thread_rng().fill_bytes(&mut secret[..]);
                SessionKeys::new(&secret[..], ttl)
            }
        };
        Self::new(pool, keys, config.ownership_policy())
    }
}

pub fn router(state: AppState, max_concurrent_requests: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/registration", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route(
            "/edit_profile",
            get(handlers::profile).post(handlers::edit_profile),
        )
        .route("/departments", get(handlers::departments))
        .route("/department/:dept_id", get(handlers::department_details))
        .route(
            "/doctor/:doctor_id/availability",
            get(handlers::doctor_availability),
        )
        .route("/patient_dashboard", get(handlers::patient_dashboard))
        .route("/doctor/:doctor_id/book", post(handlers::book_appointment))
        .route(
            "/cancel_appointment/:appt_id",
            post(handlers::cancel_appointment),
        )
        .route("/my_history", get(handlers::my_history))
        .route(
            "/patient/:patient_id/history",
            get(handlers::patient_history),
        )
        .route("/doctor_dashboard", get(handlers::doctor_dashboard))
        .route(
            "/doctor/complete/:appt_id",
            post(handlers::complete_appointment),
        )
        .route(
            "/doctor/cancel/:appt_id",
            post(handlers::doctor_cancel_appointment),
        )
        .route(
            "/doctor/appointment/:appt_id/update",
            post(handlers::record_treatment),
        )
        .route("/admin_dashboard", get(handlers::admin_dashboard))
        .route(
            "/admin_dashboard/create_doctor",
            post(handlers::create_doctor),
        )
        .route(
            "/admin_dashboard/edit_doctor/:doctor_id",
            post(handlers::edit_doctor),
        )
        .route(
            "/admin_dashboard/delete_doctor/:doctor_id",
            post(handlers::delete_doctor),
        )
        .route(
            "/admin_dashboard/delete_appointment/:appt_id",
            post(handlers::delete_appointment),
        )
        .fallback(handlers::not_found)
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
