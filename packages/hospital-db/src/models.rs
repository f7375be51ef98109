//! Modelos de dados do hospital
//!
//! Este módulo define as estruturas persistidas e as visões de leitura
//! usadas pelos painéis (consultas com nomes, histórico de tratamentos).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;
use uuid::Uuid;

/// Erro de conversão de texto para um enum persistido
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Valor inválido para {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Lê uma coluna de texto e converte para um enum persistido
fn decode_text_enum<T>(row: &SqliteRow, column: &str) -> sqlx::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: ParseEnumError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Papel de um usuário no sistema. Cada usuário tem exatamente um.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            _ => Err(ParseEnumError {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

/// Status possíveis de uma consulta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Consulta agendada, estado inicial
    Booked,
    /// Médico registrou o atendimento
    Completed,
    /// Cancelada pelo paciente ou pelo médico
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// `completed` e `cancelled` são finais
    pub fn is_terminal(self) -> bool {
        !matches!(self, AppointmentStatus::Booked)
    }

    /// Transições permitidas: apenas a partir de `booked`
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Booked, AppointmentStatus::Completed)
                | (AppointmentStatus::Booked, AppointmentStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(AppointmentStatus::Booked),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(ParseEnumError {
                kind: "appointment status",
                value: s.to_string(),
            }),
        }
    }
}

/// Registro de identidade
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Hash Argon2id no formato PHC, nunca serializado
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for User {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: decode_text_enum(row, "role")?,
            registered_at: row.try_get("registered_at")?,
        })
    }
}

/// Departamento do hospital
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Perfil profissional ligado 1:1 a um usuário médico
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub department_id: Uuid,
    pub qualification: Option<String>,
    pub experience_years: i64,
}

/// Perfil de médico com os dados do usuário e do departamento
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorProfile {
    pub doctor_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub department_id: Uuid,
    pub department_name: String,
    pub qualification: Option<String>,
    pub experience_years: i64,
}

/// Consulta entre um usuário médico e um usuário paciente
#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    pub id: Uuid,
    /// Usuário (papel doctor), não o perfil
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    /// Texto livre de exibição, ex. "05/12/2025"
    pub date: String,
    /// Texto livre de exibição, ex. "08:00 - 12:00 am"
    pub time: String,
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Appointment {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            doctor_id: row.try_get("doctor_id")?,
            patient_id: row.try_get("patient_id")?,
            date: row.try_get("date")?,
            time: row.try_get("time")?,
            appointment_type: row.try_get("type")?,
            status: decode_text_enum(row, "status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Consulta com nomes do médico e do paciente, para os painéis
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub date: String,
    pub time: String,
    pub appointment_type: String,
    pub status: AppointmentStatus,
}

impl FromRow<'_, SqliteRow> for AppointmentSummary {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            doctor_id: row.try_get("doctor_id")?,
            doctor_name: row.try_get("doctor_name")?,
            patient_id: row.try_get("patient_id")?,
            patient_name: row.try_get("patient_name")?,
            date: row.try_get("date")?,
            time: row.try_get("time")?,
            appointment_type: row.try_get("type")?,
            status: decode_text_enum(row, "status")?,
        })
    }
}

/// Registro de atendimento, imutável depois de criado
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Treatment {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub visit_type: Option<String>,
    pub test_done: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    /// Texto livre, ex. "Med1 1-0-1, Med2 0-1-0"
    pub medicines: Option<String>,
    pub prescribed_at: DateTime<Utc>,
}

/// Dados de um novo atendimento
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTreatment {
    pub visit_type: Option<String>,
    pub test_done: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub medicines: Option<String>,
}

/// Linha do histórico longitudinal de um paciente
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TreatmentHistoryEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub treatment: Treatment,
    pub appointment_date: String,
    pub appointment_time: String,
    pub doctor_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Admin, Role::Doctor, Role::Patient] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Doctor).unwrap();
        assert_eq!(json, "\"doctor\"");
    }

    #[test]
    fn only_booked_can_transition() {
        use AppointmentStatus::*;

        assert!(Booked.can_transition_to(Completed));
        assert!(Booked.can_transition_to(Cancelled));
        assert!(!Booked.can_transition_to(Booked));
        for terminal in [Completed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Booked, Completed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn user_never_serializes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Patient,
            registered_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "patient");
    }
}
