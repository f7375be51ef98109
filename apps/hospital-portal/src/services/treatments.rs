//! Registro de atendimentos e histórico longitudinal do paciente

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use hospital_db::models::{
    AppointmentStatus, NewTreatment, Role, Treatment, TreatmentHistoryEntry, User,
};
use hospital_db::queries::{appointments, treatments, users};

use super::appointments::status_label;
use super::non_blank;
use crate::error::ServiceError;
use crate::outcome::{Destination, Flash, Outcome};
use crate::session::{authorize, Operation, SessionContext};

#[derive(Debug, Default, Deserialize)]
pub struct TreatmentForm {
    pub visit_type: Option<String>,
    pub test_done: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub medicines: Option<String>,
}

impl TreatmentForm {
    fn to_record(&self) -> NewTreatment {
        let field = |value: &Option<String>| non_blank(value).map(str::to_string);
        NewTreatment {
            visit_type: field(&self.visit_type),
            test_done: field(&self.test_done),
            diagnosis: field(&self.diagnosis),
            prescription: field(&self.prescription),
            medicines: field(&self.medicines),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PatientHistory {
    pub patient: User,
    pub treatments: Vec<TreatmentHistoryEntry>,
}

/// Registra o atendimento e conclui a consulta na mesma transação.
///
/// Só o médico da consulta pode registrar.
pub async fn record(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    appointment_id: Uuid,
    form: &TreatmentForm,
) -> Result<Outcome<Treatment>, ServiceError> {
    let caller = authorize(session, Operation::RecordTreatment)?;
    let back_to = Destination::DoctorDashboard;

    let mut tx = pool.begin().await.map_err(hospital_db::DbError::from)?;

    let appointment = appointments::find_by_id(&mut *tx, appointment_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Consulta não encontrada.", back_to))?;

    if appointment.doctor_id != caller.user_id {
        warn!(
            appointment_id = %appointment.id,
            caller = %caller.user_id,
            "Médico tentou registrar atendimento de consulta alheia"
        );
        return Err(ServiceError::authorization(
            "Você só pode atualizar suas próprias consultas.",
            back_to,
        ));
    }

    if appointment.status == AppointmentStatus::Cancelled {
        return Err(ServiceError::validation(
            format!("A consulta está {}.", status_label(appointment.status)),
            back_to,
        ));
    }

    let treatment = treatments::insert(&mut *tx, appointment.id, &form.to_record()).await?;

    if appointment.status == AppointmentStatus::Booked
        && !appointments::transition_status(
            &mut *tx,
            appointment.id,
            AppointmentStatus::Booked,
            AppointmentStatus::Completed,
        )
        .await?
    {
        // Rollback implícito ao descartar `tx`
        return Err(ServiceError::validation(
            "A consulta mudou de status durante o registro.",
            back_to,
        ));
    }

    tx.commit().await.map_err(hospital_db::DbError::from)?;

    info!(
        appointment_id = %appointment.id,
        treatment_id = %treatment.id,
        "Atendimento registrado"
    );
    Ok(Outcome::new(
        back_to,
        Flash::success("Histórico do paciente atualizado com sucesso."),
        treatment,
    ))
}

/// Histórico de um paciente. Pacientes só veem o próprio.
pub async fn history(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    patient_id: Uuid,
) -> Result<PatientHistory, ServiceError> {
    let caller = authorize(session, Operation::ViewPatientHistory)?;
    let back_to = Destination::dashboard_for(caller.role);

    if caller.role == Role::Patient && caller.user_id != patient_id {
        return Err(ServiceError::authorization(
            "Você só pode ver o seu próprio histórico.",
            back_to,
        ));
    }

    let patient = users::find_by_id(pool, patient_id)
        .await?
        .filter(|user| user.role == Role::Patient)
        .ok_or_else(|| ServiceError::not_found("Paciente não encontrado.", back_to))?;

    Ok(PatientHistory {
        treatments: treatments::history_for_patient(pool, patient.id).await?,
        patient,
    })
}

/// Histórico do próprio paciente
pub async fn my_history(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
) -> Result<PatientHistory, ServiceError> {
    let caller = authorize(session, Operation::MyHistory)?;
    history(pool, Some(&caller), caller.user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::appointments::{book, cancel_by_patient, BookingForm};
    use crate::services::fixtures::{self, DoctorAccount};
    use hospital_db::models::Appointment;
    use hospital_db::testing::memory_pool;

    struct Scenario {
        pool: SqlitePool,
        doctor: DoctorAccount,
        patient: SessionContext,
        appointment: Appointment,
    }

    async fn scenario() -> Scenario {
        let pool = memory_pool().await.unwrap();
        let dept = fixtures::department(&pool, "Cardiology").await;
        let doctor = fixtures::doctor(&pool, "dr-d", dept.id).await;
        let patient = fixtures::session_of(&fixtures::user(&pool, "pat", Role::Patient).await);
        let appointment = book(
            &pool,
            Some(&patient),
            doctor.doctor_id,
            &BookingForm {
                date: "05/12/2025".into(),
                time: "08:00 - 12:00 am".into(),
            },
        )
        .await
        .unwrap()
        .data;
        Scenario {
            pool,
            doctor,
            patient,
            appointment,
        }
    }

    fn ecg() -> TreatmentForm {
        TreatmentForm {
            visit_type: Some("In-person".into()),
            test_done: Some("ECG".into()),
            diagnosis: Some("Arritmia leve".into()),
            prescription: Some("Repouso".into()),
            medicines: Some("Med1 1-0-1, Med2 0-1-0".into()),
        }
    }

    async fn treatment_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM treatments")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn status_of(pool: &SqlitePool, id: Uuid) -> AppointmentStatus {
        appointments::find_by_id(pool, id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn record_creates_treatment_and_completes() {
        let s = scenario().await;

        let outcome = record(&s.pool, Some(&s.doctor.session), s.appointment.id, &ecg())
            .await
            .unwrap();

        assert_eq!(outcome.data.appointment_id, s.appointment.id);
        assert_eq!(outcome.redirect, Destination::DoctorDashboard);
        assert_eq!(treatment_count(&s.pool).await, 1);
        assert_eq!(status_of(&s.pool, s.appointment.id).await, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn other_doctor_cannot_record() {
        let s = scenario().await;
        let dept = fixtures::department(&s.pool, "Oncology").await;
        let other = fixtures::doctor(&s.pool, "dr-o", dept.id).await;

        let err = record(&s.pool, Some(&other.session), s.appointment.id, &ecg())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Authorization { .. }), "{err:?}");
        assert_eq!(treatment_count(&s.pool).await, 0);
        assert_eq!(status_of(&s.pool, s.appointment.id).await, AppointmentStatus::Booked);
    }

    #[tokio::test]
    async fn cancelled_appointment_takes_no_treatment() {
        let s = scenario().await;
        cancel_by_patient(&s.pool, Some(&s.patient), s.appointment.id)
            .await
            .unwrap();

        let err = record(&s.pool, Some(&s.doctor.session), s.appointment.id, &ecg())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation { .. }));
        assert_eq!(treatment_count(&s.pool).await, 0);
        assert_eq!(status_of(&s.pool, s.appointment.id).await, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn completed_appointment_accepts_follow_up_record() {
        let s = scenario().await;
        record(&s.pool, Some(&s.doctor.session), s.appointment.id, &ecg())
            .await
            .unwrap();

        record(&s.pool, Some(&s.doctor.session), s.appointment.id, &TreatmentForm::default())
            .await
            .unwrap();

        assert_eq!(treatment_count(&s.pool).await, 2);
        assert_eq!(status_of(&s.pool, s.appointment.id).await, AppointmentStatus::Completed);
    }

    async fn install_trigger(pool: &SqlitePool, action: &str) {
        sqlx::query(&format!(
            "CREATE TRIGGER hold_status BEFORE UPDATE ON appointments
             BEGIN SELECT RAISE({action}); END"
        ))
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn failed_status_update_rolls_back_treatment() {
        let s = scenario().await;
        install_trigger(&s.pool, "ABORT, 'status bloqueado'").await;

        let err = record(&s.pool, Some(&s.doctor.session), s.appointment.id, &ecg())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Store(_)), "{err:?}");
        assert_eq!(treatment_count(&s.pool).await, 0);
        assert_eq!(status_of(&s.pool, s.appointment.id).await, AppointmentStatus::Booked);
    }

    #[tokio::test]
    async fn status_changed_mid_record_rolls_back_treatment() {
        let s = scenario().await;
        // Linha ignorada: o UPDATE condicional não afeta nenhuma linha
        install_trigger(&s.pool, "IGNORE").await;

        let err = record(&s.pool, Some(&s.doctor.session), s.appointment.id, &ecg())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation { .. }), "{err:?}");
        assert_eq!(treatment_count(&s.pool).await, 0);
        assert_eq!(status_of(&s.pool, s.appointment.id).await, AppointmentStatus::Booked);
    }

    #[tokio::test]
    async fn missing_appointment_is_not_found() {
        let s = scenario().await;
        let err = record(&s.pool, Some(&s.doctor.session), Uuid::new_v4(), &ecg())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn blank_fields_are_stored_as_absent() {
        let s = scenario().await;
        let form = TreatmentForm {
            diagnosis: Some("  ".into()),
            ..ecg()
        };

        let outcome = record(&s.pool, Some(&s.doctor.session), s.appointment.id, &form)
            .await
            .unwrap();
        assert_eq!(outcome.data.diagnosis, None);
        assert_eq!(outcome.data.test_done.as_deref(), Some("ECG"));
    }

    #[tokio::test]
    async fn history_visibility() {
        let s = scenario().await;
        record(&s.pool, Some(&s.doctor.session), s.appointment.id, &ecg())
            .await
            .unwrap();

        let mine = my_history(&s.pool, Some(&s.patient)).await.unwrap();
        assert_eq!(mine.treatments.len(), 1);
        assert_eq!(mine.treatments[0].doctor_name, "dr-d");

        let seen_by_doctor = history(&s.pool, Some(&s.doctor.session), s.patient.user_id)
            .await
            .unwrap();
        assert_eq!(seen_by_doctor.patient.id, s.patient.user_id);

        let stranger = fixtures::user(&s.pool, "outro", Role::Patient).await;
        let err = history(&s.pool, Some(&fixtures::session_of(&stranger)), s.patient.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization { .. }));

        let err = history(&s.pool, Some(&s.doctor.session), s.doctor.user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }
}
