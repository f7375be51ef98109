//! Consultas da tabela `treatments`

use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{NewTreatment, Treatment, TreatmentHistoryEntry};

pub async fn insert<'e, E>(
    executor: E,
    appointment_id: Uuid,
    new_treatment: &NewTreatment,
) -> Result<Treatment, DbError>
where
    E: SqliteExecutor<'e>,
{
    let treatment = Treatment {
        id: Uuid::new_v4(),
        appointment_id,
        visit_type: new_treatment.visit_type.clone(),
        test_done: new_treatment.test_done.clone(),
        diagnosis: new_treatment.diagnosis.clone(),
        prescription: new_treatment.prescription.clone(),
        medicines: new_treatment.medicines.clone(),
        prescribed_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO treatments
            (id, appointment_id, visit_type, test_done, diagnosis, prescription, medicines, prescribed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(treatment.id)
    .bind(treatment.appointment_id)
    .bind(&treatment.visit_type)
    .bind(&treatment.test_done)
    .bind(&treatment.diagnosis)
    .bind(&treatment.prescription)
    .bind(&treatment.medicines)
    .bind(treatment.prescribed_at)
    .execute(executor)
    .await?;

    Ok(treatment)
}

pub async fn list_for_appointment<'e, E>(
    executor: E,
    appointment_id: Uuid,
) -> Result<Vec<Treatment>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let treatments = sqlx::query_as::<_, Treatment>(
        "SELECT * FROM treatments WHERE appointment_id = ? ORDER BY prescribed_at",
    )
    .bind(appointment_id)
    .fetch_all(executor)
    .await?;
    Ok(treatments)
}

/// Todos os tratamentos alcançáveis pelas consultas do paciente, mais recentes primeiro
pub async fn history_for_patient<'e, E>(
    executor: E,
    patient_id: Uuid,
) -> Result<Vec<TreatmentHistoryEntry>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let history = sqlx::query_as::<_, TreatmentHistoryEntry>(
        "SELECT t.*, a.date AS appointment_date, a.time AS appointment_time,
                doc.username AS doctor_name
         FROM treatments t
         JOIN appointments a ON a.id = t.appointment_id
         JOIN users doc ON doc.id = a.doctor_id
         WHERE a.patient_id = ?
         ORDER BY t.prescribed_at DESC",
    )
    .bind(patient_id)
    .fetch_all(executor)
    .await?;
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::queries::appointments::{self, NewAppointment};
    use crate::queries::users::{self, NewUser};
    use crate::testing::memory_pool;

    #[tokio::test]
    async fn deleting_appointment_cascades_to_treatments() -> anyhow::Result<()> {
        let pool = memory_pool().await?;
        let doctor = users::insert(
            &pool,
            &NewUser {
                username: "doc",
                email: "doc@example.com",
                password_hash: "$argon2id$fake",
                role: Role::Doctor,
            },
        )
        .await?;
        let patient = users::insert(
            &pool,
            &NewUser {
                username: "pat",
                email: "pat@example.com",
                password_hash: "$argon2id$fake",
                role: Role::Patient,
            },
        )
        .await?;
        let appt = appointments::insert(
            &pool,
            &NewAppointment {
                doctor_id: doctor.id,
                patient_id: patient.id,
                date: "05/12/2025",
                time: "08:00 - 12:00 am",
                appointment_type: "In-person",
            },
        )
        .await?;

        let record = NewTreatment {
            visit_type: Some("In-person".into()),
            test_done: Some("ECG".into()),
            diagnosis: Some("Arritmia leve".into()),
            prescription: None,
            medicines: Some("Med1 1-0-1".into()),
        };
        insert(&pool, appt.id, &record).await?;
        insert(&pool, appt.id, &record).await?;

        let history = history_for_patient(&pool, patient.id).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].doctor_name, "doc");
        assert_eq!(history[0].appointment_date, "05/12/2025");
        assert_eq!(history[0].treatment.test_done.as_deref(), Some("ECG"));

        appointments::delete(&pool, appt.id).await?;

        assert!(list_for_appointment(&pool, appt.id).await?.is_empty());
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM treatments")
            .fetch_one(&pool)
            .await?;
        assert_eq!(remaining, 0);
        Ok(())
    }
}
