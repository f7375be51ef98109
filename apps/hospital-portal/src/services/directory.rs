//! Diretório somente leitura: departamentos, médicos e disponibilidade

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use hospital_db::models::{Department, DoctorProfile};
use hospital_db::queries::{appointments, departments, doctors};

use crate::error::ServiceError;
use crate::outcome::Destination;
use crate::session::{authorize, Operation, SessionContext};

/// Horários oferecidos em todos os dias do catálogo
const SAMPLE_TIMES: &[&str] = &["08:00 - 12:00 am", "04:00 - 09:00 pm"];

/// Dias do catálogo fixo, 05/12/2025 a 12/12/2025
const SAMPLE_DATES: &[&str] = &[
    "05/12/2025",
    "06/12/2025",
    "07/12/2025",
    "08/12/2025",
    "09/12/2025",
    "10/12/2025",
    "11/12/2025",
    "12/12/2025",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityDay {
    pub date: &'static str,
    pub times: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookedSlot {
    pub date: String,
    pub time: String,
}

/// Catálogo fixo e horários já ocupados, lado a lado.
///
/// O catálogo não é filtrado; cabe a quem exibe conciliar as duas listas.
#[derive(Debug, Serialize)]
pub struct DoctorAvailability {
    pub doctor: DoctorProfile,
    pub slots: Vec<AvailabilityDay>,
    pub booked_slots: Vec<BookedSlot>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentDetails {
    pub department: Department,
    pub doctors: Vec<DoctorProfile>,
}

pub fn availability_catalog() -> Vec<AvailabilityDay> {
    SAMPLE_DATES
        .iter()
        .map(|&date| AvailabilityDay {
            date,
            times: SAMPLE_TIMES,
        })
        .collect()
}

pub async fn list_departments(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
) -> Result<Vec<Department>, ServiceError> {
    authorize(session, Operation::ListDepartments)?;
    Ok(departments::list(pool).await?)
}

pub async fn list_doctors_in_department(
    pool: &SqlitePool,
    department_id: Uuid,
) -> Result<Vec<DoctorProfile>, ServiceError> {
    Ok(doctors::list_profiles_by_department(pool, department_id).await?)
}

pub async fn department_details(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    department_id: Uuid,
) -> Result<DepartmentDetails, ServiceError> {
    let caller = authorize(session, Operation::DepartmentDetails)?;

    let department = departments::find_by_id(pool, department_id)
        .await?
        .ok_or_else(|| {
            ServiceError::not_found(
                "Departamento não encontrado.",
                Destination::dashboard_for(caller.role),
            )
        })?;

    Ok(DepartmentDetails {
        doctors: list_doctors_in_department(pool, department.id).await?,
        department,
    })
}

/// Disponibilidade de um médico (id do perfil). Aberto sem sessão.
pub async fn doctor_availability(
    pool: &SqlitePool,
    doctor_id: Uuid,
) -> Result<DoctorAvailability, ServiceError> {
    let doctor = doctors::profile_by_id(pool, doctor_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Médico não encontrado.", Destination::Home))?;

    let booked_slots = appointments::booked_slots(pool, doctor.user_id)
        .await?
        .into_iter()
        .map(|(date, time)| BookedSlot { date, time })
        .collect();

    Ok(DoctorAvailability {
        slots: availability_catalog(),
        booked_slots,
        doctor,
    })
}
