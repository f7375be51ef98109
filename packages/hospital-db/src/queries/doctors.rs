//! Consultas da tabela `doctors` e da visão de perfil com usuário e departamento

use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{Doctor, DoctorProfile};

const PROFILE_SELECT: &str = "
    SELECT d.id AS doctor_id, d.user_id, u.username AS name, u.email,
           d.department_id, dep.name AS department_name,
           d.qualification, d.experience_years
    FROM doctors d
    JOIN users u ON u.id = d.user_id
    JOIN departments dep ON dep.id = d.department_id";

pub async fn insert<'e, E>(
    executor: E,
    user_id: Uuid,
    department_id: Uuid,
    qualification: Option<&str>,
    experience_years: i64,
) -> Result<Doctor, DbError>
where
    E: SqliteExecutor<'e>,
{
    let doctor = Doctor {
        id: Uuid::new_v4(),
        user_id,
        department_id,
        qualification: qualification.map(str::to_string),
        experience_years,
    };

    sqlx::query(
        "INSERT INTO doctors (id, user_id, department_id, qualification, experience_years)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(doctor.id)
    .bind(doctor.user_id)
    .bind(doctor.department_id)
    .bind(&doctor.qualification)
    .bind(doctor.experience_years)
    .execute(executor)
    .await?;

    Ok(doctor)
}

pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Doctor>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let doctor = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(doctor)
}

pub async fn update_profile<'e, E>(
    executor: E,
    id: Uuid,
    department_id: Uuid,
    qualification: Option<&str>,
    experience_years: i64,
) -> Result<(), DbError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE doctors SET department_id = ?, qualification = ?, experience_years = ? WHERE id = ?",
    )
    .bind(department_id)
    .bind(qualification)
    .bind(experience_years)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(format!("Médico {}", id)));
    }
    Ok(())
}

pub async fn profile_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<DoctorProfile>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{PROFILE_SELECT} WHERE d.id = ?");
    let profile = sqlx::query_as::<_, DoctorProfile>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(profile)
}

pub async fn profile_by_user_id<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<DoctorProfile>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{PROFILE_SELECT} WHERE d.user_id = ?");
    let profile = sqlx::query_as::<_, DoctorProfile>(&sql)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(profile)
}

pub async fn list_profiles_by_department<'e, E>(
    executor: E,
    department_id: Uuid,
) -> Result<Vec<DoctorProfile>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{PROFILE_SELECT} WHERE d.department_id = ? ORDER BY u.username");
    let profiles = sqlx::query_as::<_, DoctorProfile>(&sql)
        .bind(department_id)
        .fetch_all(executor)
        .await?;
    Ok(profiles)
}

pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<(), DbError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM doctors WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(format!("Médico {}", id)));
    }
    Ok(())
}
