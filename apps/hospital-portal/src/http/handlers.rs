//! Handlers HTTP. Cada um extrai a sessão e delega ao serviço correspondente.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use hospital_db::models::{Appointment, Department, DoctorProfile, Role, Treatment, User};

use super::extract::{accept, CurrentSession, Guard};
use super::AppState;
use crate::built_info;
use crate::error::ServiceError;
use crate::outcome::{Destination, Outcome};
use crate::services::admin::{self, AdminOverview, CreateDoctorForm, EditDoctorForm};
use crate::services::appointments::{self, BookingForm, DoctorDashboard, PatientDashboard};
use crate::services::directory::{self, DepartmentDetails, DoctorAvailability};
use crate::services::identity::{self, LoginForm, ProfileForm, RegistrationForm};
use crate::services::treatments::{self, PatientHistory, TreatmentForm};
use crate::session::Operation;

type Reply<T> = Result<Outcome<T>, ServiceError>;
type View<T> = Result<Json<T>, ServiceError>;
type Body<T> = Result<Json<T>, JsonRejection>;
type Id = Result<Path<Uuid>, PathRejection>;

/// Dados entregues ao cliente após o login
#[derive(Debug, Serialize)]
pub struct LoginGrant {
    pub token: String,
    pub role: Role,
    /// Validade do token, em segundos
    pub expires_in: i64,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(e) => {
            warn!(error = %e, "Health check: banco indisponível");
            "unavailable"
        }
    };
    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "database": database,
            "version": built_info::PKG_VERSION,
        })),
    )
}

// Identidade

pub async fn register(
    State(state): State<AppState>,
    session: CurrentSession,
    form: Body<RegistrationForm>,
) -> Reply<User> {
    let Json(form) = accept(form, &session, Guard::Public(Destination::Registration))?;
    identity::register(&state.pool, &form).await
}

pub async fn login(
    State(state): State<AppState>,
    session: CurrentSession,
    form: Body<LoginForm>,
) -> Reply<LoginGrant> {
    let Json(form) = accept(form, &session, Guard::Public(Destination::Login))?;
    let outcome = identity::login(&state.pool, &form).await?;
    let session = outcome.data;
    let token = state.keys.issue(&session)?;

    Ok(Outcome::new(
        outcome.redirect,
        outcome.flash,
        LoginGrant {
            token,
            role: session.role,
            expires_in: state.keys.ttl().num_seconds(),
        },
    ))
}

pub async fn logout(session: CurrentSession) -> Outcome<()> {
    identity::logout(session.context())
}

pub async fn profile(State(state): State<AppState>, session: CurrentSession) -> View<User> {
    identity::profile(&state.pool, session.context()).await.map(Json)
}

pub async fn edit_profile(
    State(state): State<AppState>,
    session: CurrentSession,
    form: Body<ProfileForm>,
) -> Reply<User> {
    let Json(form) = accept(form, &session, Guard::Protected(Operation::EditProfile))?;
    identity::edit_profile(&state.pool, session.context(), &form).await
}

// Diretório

pub async fn departments(
    State(state): State<AppState>,
    session: CurrentSession,
) -> View<Vec<Department>> {
    directory::list_departments(&state.pool, session.context())
        .await
        .map(Json)
}

pub async fn department_details(
    State(state): State<AppState>,
    session: CurrentSession,
    department_id: Id,
) -> View<DepartmentDetails> {
    let Path(department_id) =
        accept(department_id, &session, Guard::Protected(Operation::DepartmentDetails))?;
    directory::department_details(&state.pool, session.context(), department_id)
        .await
        .map(Json)
}

pub async fn doctor_availability(
    State(state): State<AppState>,
    session: CurrentSession,
    doctor_id: Id,
) -> View<DoctorAvailability> {
    let Path(doctor_id) = accept(doctor_id, &session, Guard::Public(Destination::Home))?;
    directory::doctor_availability(&state.pool, doctor_id)
        .await
        .map(Json)
}

// Paciente

pub async fn patient_dashboard(
    State(state): State<AppState>,
    session: CurrentSession,
) -> View<PatientDashboard> {
    appointments::patient_dashboard(&state.pool, session.context())
        .await
        .map(Json)
}

pub async fn book_appointment(
    State(state): State<AppState>,
    session: CurrentSession,
    doctor_id: Id,
    form: Body<BookingForm>,
) -> Reply<Appointment> {
    let guard = Guard::Protected(Operation::BookAppointment);
    let Path(doctor_id) = accept(doctor_id, &session, guard)?;
    let Json(form) = accept(form, &session, guard)?;
    appointments::book(&state.pool, session.context(), doctor_id, &form).await
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    session: CurrentSession,
    appointment_id: Id,
) -> Reply<Appointment> {
    let Path(appointment_id) =
        accept(appointment_id, &session, Guard::Protected(Operation::CancelAppointment))?;
    appointments::cancel_by_patient(&state.pool, session.context(), appointment_id).await
}

pub async fn my_history(
    State(state): State<AppState>,
    session: CurrentSession,
) -> View<PatientHistory> {
    treatments::my_history(&state.pool, session.context())
        .await
        .map(Json)
}

pub async fn patient_history(
    State(state): State<AppState>,
    session: CurrentSession,
    patient_id: Id,
) -> View<PatientHistory> {
    let Path(patient_id) =
        accept(patient_id, &session, Guard::Protected(Operation::ViewPatientHistory))?;
    treatments::history(&state.pool, session.context(), patient_id)
        .await
        .map(Json)
}

// Médico

pub async fn doctor_dashboard(
    State(state): State<AppState>,
    session: CurrentSession,
) -> View<DoctorDashboard> {
    appointments::doctor_dashboard(&state.pool, session.context())
        .await
        .map(Json)
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    session: CurrentSession,
    appointment_id: Id,
) -> Reply<Appointment> {
    let Path(appointment_id) = accept(
        appointment_id,
        &session,
        Guard::Protected(Operation::DoctorCompleteAppointment),
    )?;
    appointments::complete_by_doctor(
        &state.pool,
        session.context(),
        appointment_id,
        state.ownership,
    )
    .await
}

pub async fn doctor_cancel_appointment(
    State(state): State<AppState>,
    session: CurrentSession,
    appointment_id: Id,
) -> Reply<Appointment> {
    let Path(appointment_id) = accept(
        appointment_id,
        &session,
        Guard::Protected(Operation::DoctorCancelAppointment),
    )?;
    appointments::cancel_by_doctor(
        &state.pool,
        session.context(),
        appointment_id,
        state.ownership,
    )
    .await
}

pub async fn record_treatment(
    State(state): State<AppState>,
    session: CurrentSession,
    appointment_id: Id,
    form: Body<TreatmentForm>,
) -> Reply<Treatment> {
    let guard = Guard::Protected(Operation::RecordTreatment);
    let Path(appointment_id) = accept(appointment_id, &session, guard)?;
    let Json(form) = accept(form, &session, guard)?;
    treatments::record(&state.pool, session.context(), appointment_id, &form).await
}

// Administração

pub async fn admin_dashboard(
    State(state): State<AppState>,
    session: CurrentSession,
) -> View<AdminOverview> {
    admin::overview(&state.pool, session.context()).await.map(Json)
}

pub async fn create_doctor(
    State(state): State<AppState>,
    session: CurrentSession,
    form: Body<CreateDoctorForm>,
) -> Reply<DoctorProfile> {
    let Json(form) = accept(form, &session, Guard::Protected(Operation::CreateDoctor))?;
    admin::create_doctor(&state.pool, session.context(), &form).await
}

pub async fn edit_doctor(
    State(state): State<AppState>,
    session: CurrentSession,
    doctor_id: Id,
    form: Body<EditDoctorForm>,
) -> Reply<DoctorProfile> {
    let guard = Guard::Protected(Operation::EditDoctor);
    let Path(doctor_id) = accept(doctor_id, &session, guard)?;
    let Json(form) = accept(form, &session, guard)?;
    admin::edit_doctor(&state.pool, session.context(), doctor_id, &form).await
}

pub async fn delete_doctor(
    State(state): State<AppState>,
    session: CurrentSession,
    doctor_id: Id,
) -> Reply<()> {
    let Path(doctor_id) = accept(doctor_id, &session, Guard::Protected(Operation::DeleteDoctor))?;
    admin::delete_doctor(&state.pool, session.context(), doctor_id).await
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    session: CurrentSession,
    appointment_id: Id,
) -> Reply<()> {
    let Path(appointment_id) =
        accept(appointment_id, &session, Guard::Protected(Operation::DeleteAppointment))?;
    appointments::delete(&state.pool, session.context(), appointment_id).await
}

pub async fn not_found() -> ServiceError {
    ServiceError::not_found("Página não encontrada.", Destination::Home)
}
