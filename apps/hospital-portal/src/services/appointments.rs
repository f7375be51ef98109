//! Ciclo de vida das consultas: agendar, cancelar, concluir e painéis

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use hospital_db::models::{
    Appointment, AppointmentStatus, AppointmentSummary, Department, DoctorProfile, User,
};
use hospital_db::queries::appointments::{self, NewAppointment};
use hospital_db::queries::{departments, doctors, users};

use crate::error::ServiceError;
use crate::outcome::{Destination, Flash, Outcome};
use crate::session::{authorize, Operation, SessionContext};

/// Tipo atribuído a toda consulta agendada pelo paciente
pub const DEFAULT_VISIT_TYPE: &str = "In-person";

/// Se um médico pode concluir ou cancelar consultas de outro médico.
///
/// `Unchecked` mantém o comportamento histórico e só registra um aviso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipPolicy {
    #[default]
    Unchecked,
    Enforced,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BookingForm {
    #[validate(length(min = 1, max = 20))]
    pub date: String,
    #[validate(length(min = 1, max = 20))]
    pub time: String,
}

/// Consultas de um paciente separadas por status
#[derive(Debug, Serialize)]
pub struct PatientAppointments {
    pub upcoming_appointments: Vec<AppointmentSummary>,
    pub cancelled_appointments: Vec<AppointmentSummary>,
}

#[derive(Debug, Serialize)]
pub struct PatientDashboard {
    pub patient: User,
    pub departments: Vec<Department>,
    #[serde(flatten)]
    pub appointments: PatientAppointments,
}

#[derive(Debug, Serialize)]
pub struct DoctorDashboard {
    pub doctor: User,
    pub doc_profile: Option<DoctorProfile>,
    pub upcoming_appointments: Vec<AppointmentSummary>,
}

/// Consultas `booked` e `cancelled` do paciente
pub async fn list_for_patient(
    pool: &SqlitePool,
    patient_id: Uuid,
) -> Result<PatientAppointments, ServiceError> {
    Ok(PatientAppointments {
        upcoming_appointments: appointments::list_for_patient(
            pool,
            patient_id,
            AppointmentStatus::Booked,
        )
        .await?,
        cancelled_appointments: appointments::list_for_patient(
            pool,
            patient_id,
            AppointmentStatus::Cancelled,
        )
        .await?,
    })
}

/// Consultas `booked` do usuário médico
pub async fn list_for_doctor(
    pool: &SqlitePool,
    doctor_user_id: Uuid,
) -> Result<Vec<AppointmentSummary>, ServiceError> {
    Ok(appointments::list_for_doctor(pool, doctor_user_id, AppointmentStatus::Booked).await?)
}

pub async fn patient_dashboard(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
) -> Result<PatientDashboard, ServiceError> {
    let caller = authorize(session, Operation::PatientDashboard)?;

    let patient = users::find_by_id(pool, caller.user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Paciente não encontrado.", Destination::Login))?;

    Ok(PatientDashboard {
        departments: departments::list(pool).await?,
        appointments: list_for_patient(pool, patient.id).await?,
        patient,
    })
}

pub async fn doctor_dashboard(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
) -> Result<DoctorDashboard, ServiceError> {
    let caller = authorize(session, Operation::DoctorDashboard)?;

    let doctor = users::find_by_id(pool, caller.user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Médico não encontrado.", Destination::Login))?;

    Ok(DoctorDashboard {
        doc_profile: doctors::profile_by_user_id(pool, doctor.id).await?,
        upcoming_appointments: list_for_doctor(pool, doctor.id).await?,
        doctor,
    })
}

/// Agenda uma consulta do paciente com o médico (id do perfil).
///
/// Não há verificação de conflito de horário.
pub async fn book(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    doctor_id: Uuid,
    form: &BookingForm,
) -> Result<Outcome<Appointment>, ServiceError> {
    let caller = authorize(session, Operation::BookAppointment)?;
    form.validate()
        .map_err(|e| ServiceError::from_validation(&e, Destination::DoctorAvailability(doctor_id)))?;

    let doctor = doctors::find_by_id(pool, doctor_id).await?.ok_or_else(|| {
        ServiceError::not_found("Médico não encontrado.", Destination::PatientDashboard)
    })?;

    let appointment = appointments::insert(
        pool,
        &NewAppointment {
            doctor_id: doctor.user_id,
            patient_id: caller.user_id,
            date: form.date.trim(),
            time: form.time.trim(),
            appointment_type: DEFAULT_VISIT_TYPE,
        },
    )
    .await?;

    info!(
        appointment_id = %appointment.id,
        doctor_user_id = %doctor.user_id,
        patient_id = %caller.user_id,
        "Consulta agendada"
    );
    Ok(Outcome::new(
        Destination::PatientDashboard,
        Flash::success("Consulta agendada!"),
        appointment,
    ))
}

/// Cancelamento pelo paciente dono da consulta
pub async fn cancel_by_patient(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    appointment_id: Uuid,
) -> Result<Outcome<Appointment>, ServiceError> {
    let caller = authorize(session, Operation::CancelAppointment)?;
    let back_to = Destination::PatientDashboard;

    let appointment = find(pool, appointment_id, back_to).await?;
    if appointment.patient_id != caller.user_id {
        warn!(
            appointment_id = %appointment.id,
            caller = %caller.user_id,
            "Paciente tentou cancelar consulta de outro paciente"
        );
        return Err(ServiceError::authorization("Não permitido!", back_to));
    }

    let cancelled = transition(pool, appointment, AppointmentStatus::Cancelled, back_to).await?;
    info!(appointment_id = %cancelled.id, "Consulta cancelada pelo paciente");
    Ok(Outcome::new(back_to, Flash::info("Consulta cancelada!"), cancelled))
}

/// Conclusão pelo médico
pub async fn complete_by_doctor(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    appointment_id: Uuid,
    policy: OwnershipPolicy,
) -> Result<Outcome<Appointment>, ServiceError> {
    let caller = authorize(session, Operation::DoctorCompleteAppointment)?;
    let back_to = Destination::DoctorDashboard;

    let appointment = find(pool, appointment_id, back_to).await?;
    check_doctor_ownership(&appointment, &caller, policy)?;

    let completed = transition(pool, appointment, AppointmentStatus::Completed, back_to).await?;
    info!(appointment_id = %completed.id, doctor = %caller.user_id, "Consulta concluída");
    Ok(Outcome::new(
        back_to,
        Flash::success("Consulta marcada como concluída!"),
        completed,
    ))
}

/// Cancelamento pelo médico
pub async fn cancel_by_doctor(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    appointment_id: Uuid,
    policy: OwnershipPolicy,
) -> Result<Outcome<Appointment>, ServiceError> {
    let caller = authorize(session, Operation::DoctorCancelAppointment)?;
    let back_to = Destination::DoctorDashboard;

    let appointment = find(pool, appointment_id, back_to).await?;
    check_doctor_ownership(&appointment, &caller, policy)?;

    let cancelled = transition(pool, appointment, AppointmentStatus::Cancelled, back_to).await?;
    info!(appointment_id = %cancelled.id, doctor = %caller.user_id, "Consulta cancelada pelo médico");
    Ok(Outcome::new(
        back_to,
        Flash::info("Consulta cancelada com sucesso!"),
        cancelled,
    ))
}

/// Remoção administrativa; tratamentos vinculados saem em cascata
pub async fn delete(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    appointment_id: Uuid,
) -> Result<Outcome<()>, ServiceError> {
    let caller = authorize(session, Operation::DeleteAppointment)?;

    appointments::delete(pool, appointment_id)
        .await
        .map_err(|e| match e {
            hospital_db::DbError::NotFound(_) => {
                ServiceError::not_found("Consulta não encontrada.", Destination::AdminDashboard)
            }
            other => other.into(),
        })?;

    info!(appointment_id = %appointment_id, admin = %caller.user_id, "Consulta removida");
    Ok(Outcome::new(
        Destination::AdminDashboard,
        Flash::info("Consulta removida."),
        (),
    ))
}

async fn find(
    pool: &SqlitePool,
    appointment_id: Uuid,
    back_to: Destination,
) -> Result<Appointment, ServiceError> {
    appointments::find_by_id(pool, appointment_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Consulta não encontrada.", back_to))
}

fn check_doctor_ownership(
    appointment: &Appointment,
    caller: &SessionContext,
    policy: OwnershipPolicy,
) -> Result<(), ServiceError> {
    if appointment.doctor_id == caller.user_id {
        return Ok(());
    }

    match policy {
        OwnershipPolicy::Enforced => {
            warn!(
                appointment_id = %appointment.id,
                caller = %caller.user_id,
                "Médico tentou alterar consulta de outro médico"
            );
            Err(ServiceError::authorization(
                "Você só pode alterar suas próprias consultas.",
                Destination::DoctorDashboard,
            ))
        }
        OwnershipPolicy::Unchecked => {
            warn!(
                appointment_id = %appointment.id,
                caller = %caller.user_id,
                owner = %appointment.doctor_id,
                "Médico alterando consulta de outro médico (posse não verificada)"
            );
            Ok(())
        }
    }
}

/// Aplica a transição; estados finais não mudam mais
async fn transition(
    pool: &SqlitePool,
    mut appointment: Appointment,
    next: AppointmentStatus,
    back_to: Destination,
) -> Result<Appointment, ServiceError> {
    let invalid = || {
        ServiceError::validation(
            format!("A consulta já está {}.", status_label(appointment.status)),
            back_to,
        )
    };

    if !appointment.status.can_transition_to(next) {
        return Err(invalid());
    }
    if !appointments::transition_status(pool, appointment.id, appointment.status, next).await? {
        // Outra requisição finalizou a consulta entre a leitura e a escrita
        let current = find(pool, appointment.id, back_to).await?;
        return Err(ServiceError::validation(
            format!("A consulta já está {}.", status_label(current.status)),
            back_to,
        ));
    }

    appointment.status = next;
    Ok(appointment)
}

pub(crate) fn status_label(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Booked => "agendada",
        AppointmentStatus::Completed => "concluída",
        AppointmentStatus::Cancelled => "cancelada",
    }
}
