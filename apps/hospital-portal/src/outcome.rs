//! Resultado de uma operação para a camada de apresentação: destino de
//! redirecionamento, mensagem transitória e o pacote de dados.

use serde::Serialize;
use uuid::Uuid;

use hospital_db::models::Role;

/// Severidade de uma mensagem transitória
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

/// Mensagem exibida uma única vez após um redirecionamento
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, message)
    }
}

/// Telas para onde o cliente é enviado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Home,
    Login,
    Registration,
    EditProfile,
    AdminDashboard,
    DoctorDashboard,
    PatientDashboard,
    Department(Uuid),
    DoctorAvailability(Uuid),
}

impl Destination {
    /// Painel correspondente ao papel
    pub fn dashboard_for(role: Role) -> Self {
        match role {
            Role::Admin => Destination::AdminDashboard,
            Role::Doctor => Destination::DoctorDashboard,
            Role::Patient => Destination::PatientDashboard,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Destination::Home => "/".to_string(),
            Destination::Login => "/login".to_string(),
            Destination::Registration => "/registration".to_string(),
            Destination::EditProfile => "/edit_profile".to_string(),
            Destination::AdminDashboard => "/admin_dashboard".to_string(),
            Destination::DoctorDashboard => "/doctor_dashboard".to_string(),
            Destination::PatientDashboard => "/patient_dashboard".to_string(),
            Destination::Department(id) => format!("/department/{id}"),
            Destination::DoctorAvailability(id) => format!("/doctor/{id}/availability"),
        }
    }
}

impl Serialize for Destination {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

/// Resultado de uma ação bem-sucedida
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub redirect: Destination,
    pub flash: Flash,
    pub data: T,
}

impl<T> Outcome<T> {
    pub fn new(redirect: Destination, flash: Flash, data: T) -> Self {
        Self {
            redirect,
            flash,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_follows_role() {
        assert_eq!(Destination::dashboard_for(Role::Admin).path(), "/admin_dashboard");
        assert_eq!(Destination::dashboard_for(Role::Doctor).path(), "/doctor_dashboard");
        assert_eq!(Destination::dashboard_for(Role::Patient).path(), "/patient_dashboard");
    }

    #[test]
    fn outcome_serializes_redirect_as_path() {
        let outcome = Outcome::new(Destination::Login, Flash::info("Até logo"), ());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["redirect"], "/login");
        assert_eq!(json["flash"]["level"], "info");
        assert_eq!(json["flash"]["message"], "Até logo");
    }
}
