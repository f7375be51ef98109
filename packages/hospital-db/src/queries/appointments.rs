//! Consultas da tabela `appointments`

use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{Appointment, AppointmentStatus, AppointmentSummary};

const SUMMARY_SELECT: &str = "
    SELECT a.id, a.doctor_id, doc.username AS doctor_name,
           a.patient_id, pat.username AS patient_name,
           a.date, a.time, a.type, a.status
    FROM appointments a
    JOIN users doc ON doc.id = a.doctor_id
    JOIN users pat ON pat.id = a.patient_id";

/// Dados de uma nova consulta; o status inicial é sempre `booked`
#[derive(Debug, Clone)]
pub struct NewAppointment<'a> {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: &'a str,
    pub time: &'a str,
    pub appointment_type: &'a str,
}

pub async fn insert<'e, E>(
    executor: E,
    new_appointment: &NewAppointment<'_>,
) -> Result<Appointment, DbError>
where
    E: SqliteExecutor<'e>,
{
    let appointment = Appointment {
        id: Uuid::new_v4(),
        doctor_id: new_appointment.doctor_id,
        patient_id: new_appointment.patient_id,
        date: new_appointment.date.to_string(),
        time: new_appointment.time.to_string(),
        appointment_type: new_appointment.appointment_type.to_string(),
        status: AppointmentStatus::Booked,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO appointments (id, doctor_id, patient_id, date, time, type, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(appointment.id)
    .bind(appointment.doctor_id)
    .bind(appointment.patient_id)
    .bind(&appointment.date)
    .bind(&appointment.time)
    .bind(&appointment.appointment_type)
    .bind(appointment.status.as_str())
    .bind(appointment.created_at)
    .execute(executor)
    .await?;

    Ok(appointment)
}

pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Appointment>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let appointment = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(appointment)
}

/// Muda o status apenas se a consulta ainda estiver em `from`.
///
/// Retorna `false` quando nenhuma linha foi alterada.
pub async fn transition_status<'e, E>(
    executor: E,
    id: Uuid,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<bool, DbError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ? AND status = ?")
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_for_patient<'e, E>(
    executor: E,
    patient_id: Uuid,
    status: AppointmentStatus,
) -> Result<Vec<AppointmentSummary>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{SUMMARY_SELECT} WHERE a.patient_id = ? AND a.status = ? ORDER BY a.created_at");
    let appointments = sqlx::query_as::<_, AppointmentSummary>(&sql)
        .bind(patient_id)
        .bind(status.as_str())
        .fetch_all(executor)
        .await?;
    Ok(appointments)
}

pub async fn list_for_doctor<'e, E>(
    executor: E,
    doctor_id: Uuid,
    status: AppointmentStatus,
) -> Result<Vec<AppointmentSummary>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{SUMMARY_SELECT} WHERE a.doctor_id = ? AND a.status = ? ORDER BY a.created_at");
    let appointments = sqlx::query_as::<_, AppointmentSummary>(&sql)
        .bind(doctor_id)
        .bind(status.as_str())
        .fetch_all(executor)
        .await?;
    Ok(appointments)
}

pub async fn list_all<'e, E>(executor: E) -> Result<Vec<AppointmentSummary>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{SUMMARY_SELECT} ORDER BY a.created_at");
    let appointments = sqlx::query_as::<_, AppointmentSummary>(&sql)
        .fetch_all(executor)
        .await?;
    Ok(appointments)
}

/// Pares (data, horário) já agendados para um usuário médico
pub async fn booked_slots<'e, E>(
    executor: E,
    doctor_id: Uuid,
) -> Result<Vec<(String, String)>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let slots = sqlx::query_as::<_, (String, String)>(
        "SELECT DISTINCT date, time FROM appointments
         WHERE doctor_id = ? AND status = 'booked'
         ORDER BY date, time",
    )
    .bind(doctor_id)
    .fetch_all(executor)
    .await?;
    Ok(slots)
}

/// Quantas consultas referenciam o usuário, como médico ou paciente
pub async fn count_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<i64, DbError>
where
    E: SqliteExecutor<'e>,
{
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE doctor_id = ? OR patient_id = ?",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Remove a consulta; os tratamentos vinculados saem em cascata
pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<(), DbError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(format!("Consulta {}", id)));
    }
    Ok(())
}
