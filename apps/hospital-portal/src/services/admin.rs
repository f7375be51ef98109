//! Administração: cadastro, edição e remoção de médicos, visão geral

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use hospital_db::models::{AppointmentSummary, Department, DoctorProfile, Role, User};
use hospital_db::queries::users::NewUser;
use hospital_db::queries::{appointments, departments, doctors, users};
use hospital_db::DbError;

use super::{hash_secret, non_blank};
use crate::error::ServiceError;
use crate::outcome::{Destination, Flash, Outcome};
use crate::session::{authorize, Operation, SessionContext};

#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct CreateDoctorForm {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(email, length(max = 150))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[zeroize(skip)]
    pub department_id: Uuid,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub qualification: Option<String>,
    #[validate(range(min = 0, max = 80))]
    #[serde(default)]
    pub experience: i64,
}

#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct EditDoctorForm {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(email, length(max = 150))]
    pub email: String,
    /// Só substitui a senha quando não vazia
    #[serde(default)]
    pub password: Option<String>,
    #[zeroize(skip)]
    pub department_id: Uuid,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub qualification: Option<String>,
    #[validate(range(min = 0, max = 80))]
    #[serde(default)]
    pub experience: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminOverview {
    pub doctors: Vec<User>,
    pub patients: Vec<User>,
    pub appointments: Vec<AppointmentSummary>,
    pub departments: Vec<Department>,
}

pub async fn overview(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
) -> Result<AdminOverview, ServiceError> {
    authorize(session, Operation::AdminDashboard)?;

    Ok(AdminOverview {
        doctors: users::list_by_role(pool, Role::Doctor).await?,
        patients: users::list_by_role(pool, Role::Patient).await?,
        appointments: appointments::list_all(pool).await?,
        departments: departments::list(pool).await?,
    })
}

/// Cria usuário médico e perfil na mesma transação
pub async fn create_doctor(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    form: &CreateDoctorForm,
) -> Result<Outcome<DoctorProfile>, ServiceError> {
    let caller = authorize(session, Operation::CreateDoctor)?;
    let back_to = Destination::AdminDashboard;
    form.validate()
        .map_err(|e| ServiceError::from_validation(&e, back_to))?;

    let name = form.name.trim();
    let email = form.email.trim();
    let password_hash = hash_secret(&form.password).await?;

    let mut tx = begin(pool).await?;

    ensure_department(&mut tx, form.department_id).await?;
    ensure_identity_free(&mut tx, name, email, None).await?;

    let user = users::insert(
        &mut *tx,
        &NewUser {
            username: name,
            email,
            password_hash: &password_hash,
            role: Role::Doctor,
        },
    )
    .await
    .map_err(|e| ServiceError::from_store_conflict(e, "E-mail já cadastrado.", back_to))?;

    let doctor = doctors::insert(
        &mut *tx,
        user.id,
        form.department_id,
        non_blank(&form.qualification),
        form.experience,
    )
    .await?;

    let profile = doctors::profile_by_id(&mut *tx, doctor.id)
        .await?
        .ok_or_else(|| DbError::InternalError("Perfil recém-criado não encontrado".into()))?;

    tx.commit().await.map_err(DbError::from)?;

    info!(doctor_id = %doctor.id, user_id = %user.id, admin = %caller.user_id, "Médico cadastrado");
    Ok(Outcome::new(back_to, Flash::success("Médico cadastrado!"), profile))
}

/// Atualiza usuário e perfil do médico juntos
pub async fn edit_doctor(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    doctor_id: Uuid,
    form: &EditDoctorForm,
) -> Result<Outcome<DoctorProfile>, ServiceError> {
    let caller = authorize(session, Operation::EditDoctor)?;
    let back_to = Destination::AdminDashboard;
    form.validate()
        .map_err(|e| ServiceError::from_validation(&e, back_to))?;

    let name = form.name.trim();
    let email = form.email.trim();
    let password_hash = match non_blank(&form.password) {
        Some(password) => Some(hash_secret(password).await?),
        None => None,
    };

    let mut tx = begin(pool).await?;

    let doctor = doctors::find_by_id(&mut *tx, doctor_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Médico não encontrado.", back_to))?;

    ensure_department(&mut tx, form.department_id).await?;
    ensure_identity_free(&mut tx, name, email, Some(doctor.user_id)).await?;

    users::update_identity(&mut *tx, doctor.user_id, name, email, password_hash.as_deref())
        .await
        .map_err(|e| ServiceError::from_store_conflict(e, "E-mail já cadastrado.", back_to))?;
    doctors::update_profile(
        &mut *tx,
        doctor.id,
        form.department_id,
        non_blank(&form.qualification),
        form.experience,
    )
    .await?;

    let profile = doctors::profile_by_id(&mut *tx, doctor.id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Médico não encontrado.", back_to))?;

    tx.commit().await.map_err(DbError::from)?;

    info!(doctor_id = %doctor.id, admin = %caller.user_id, "Médico atualizado");
    Ok(Outcome::new(back_to, Flash::success("Médico atualizado!"), profile))
}

/// Remove perfil e usuário. Recusado enquanto houver consultas do médico.
pub async fn delete_doctor(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    doctor_id: Uuid,
) -> Result<Outcome<()>, ServiceError> {
    let caller = authorize(session, Operation::DeleteDoctor)?;
    let back_to = Destination::AdminDashboard;

    let mut tx = begin(pool).await?;

    let doctor = doctors::find_by_id(&mut *tx, doctor_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Médico não encontrado.", back_to))?;

    let referenced = appointments::count_for_user(&mut *tx, doctor.user_id).await?;
    if referenced > 0 {
        warn!(doctor_id = %doctor.id, referenced, "Remoção de médico com consultas recusada");
        return Err(ServiceError::conflict(
            "O médico possui consultas e não pode ser removido.",
            back_to,
        ));
    }

    doctors::delete(&mut *tx, doctor.id).await?;
    users::delete(&mut *tx, doctor.user_id).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(doctor_id = %doctor.id, admin = %caller.user_id, "Médico removido");
    Ok(Outcome::new(back_to, Flash::info("Médico removido."), ()))
}

async fn begin(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, ServiceError> {
    Ok(pool.begin().await.map_err(DbError::from)?)
}

async fn ensure_department(
    tx: &mut Transaction<'_, Sqlite>,
    department_id: Uuid,
) -> Result<(), ServiceError> {
    if departments::find_by_id(&mut **tx, department_id).await?.is_none() {
        return Err(ServiceError::not_found(
            "Departamento não encontrado.",
            Destination::AdminDashboard,
        ));
    }
    Ok(())
}

async fn ensure_identity_free(
    tx: &mut Transaction<'_, Sqlite>,
    username: &str,
    email: &str,
    owner: Option<Uuid>,
) -> Result<(), ServiceError> {
    if users::email_taken(&mut **tx, email, owner).await? {
        return Err(ServiceError::conflict(
            "E-mail já cadastrado.",
            Destination::AdminDashboard,
        ));
    }
    if users::username_taken(&mut **tx, username, owner).await? {
        return Err(ServiceError::conflict(
            "Nome de usuário já em uso.",
            Destination::AdminDashboard,
        ));
    }
    Ok(())
}
