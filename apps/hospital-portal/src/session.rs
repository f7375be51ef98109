//! Sessão por requisição e tabela de capacidades
//!
//! Nenhuma operação lê estado global: cada uma recebe o `SessionContext`
//! (ou a ausência dele) e chama `authorize` com a própria `Operation`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use hospital_db::models::Role;

use crate::error::ServiceError;

/// Identidade autenticada do chamador
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub role: Role,
}

/// Exigência de acesso de uma operação protegida
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Qualquer sessão válida
    Authenticated,
    /// Sessão com exatamente este papel
    Role(Role),
}

/// Operações protegidas do portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    EditProfile,
    ListDepartments,
    DepartmentDetails,
    ViewPatientHistory,
    PatientDashboard,
    BookAppointment,
    CancelAppointment,
    MyHistory,
    DoctorDashboard,
    DoctorCompleteAppointment,
    DoctorCancelAppointment,
    RecordTreatment,
    AdminDashboard,
    CreateDoctor,
    EditDoctor,
    DeleteDoctor,
    DeleteAppointment,
}

impl Operation {
    pub const fn access(self) -> Access {
        match self {
            Operation::EditProfile
            | Operation::ListDepartments
            | Operation::DepartmentDetails
            | Operation::ViewPatientHistory => Access::Authenticated,

            Operation::PatientDashboard
            | Operation::BookAppointment
            | Operation::CancelAppointment
            | Operation::MyHistory => Access::Role(Role::Patient),

            Operation::DoctorDashboard
            | Operation::DoctorCompleteAppointment
            | Operation::DoctorCancelAppointment
            | Operation::RecordTreatment => Access::Role(Role::Doctor),

            Operation::AdminDashboard
            | Operation::CreateDoctor
            | Operation::EditDoctor
            | Operation::DeleteDoctor
            | Operation::DeleteAppointment => Access::Role(Role::Admin),
        }
    }
}

/// Confere a sessão contra a exigência da operação
pub fn authorize(
    session: Option<&SessionContext>,
    operation: Operation,
) -> Result<SessionContext, ServiceError> {
    let Some(session) = session else {
        debug!(?operation, "Operação sem sessão");
        return Err(ServiceError::AccessDenied);
    };

    match operation.access() {
        Access::Authenticated => Ok(*session),
        Access::Role(required) if session.role == required => Ok(*session),
        Access::Role(required) => {
            debug!(
                ?operation,
                role = %session.role,
                required = %required,
                "Papel incompatível com a operação"
            );
            Err(ServiceError::AccessDenied)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    role: Role,
    exp: i64,
    iat: i64,
}

/// Chaves HS256 usadas para emitir e validar tokens de sessão
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Emite um token para a sessão
    pub fn issue(&self, session: &SessionContext) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: session.user_id,
            role: session.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Token ausente, expirado ou adulterado equivale a "sem sessão"
    pub fn verify(&self, token: &str) -> Option<SessionContext> {
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => Some(SessionContext {
                user_id: data.claims.sub,
                role: data.claims.role,
            }),
            Err(e) => {
                debug!("Token de sessão rejeitado: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> SessionContext {
        SessionContext {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn missing_session_is_denied_everywhere() {
        for op in [
            Operation::EditProfile,
            Operation::BookAppointment,
            Operation::RecordTreatment,
            Operation::CreateDoctor,
        ] {
            assert!(matches!(authorize(None, op), Err(ServiceError::AccessDenied)));
        }
    }

    #[test]
    fn role_must_match_exactly() {
        let patient = session(Role::Patient);
        let doctor = session(Role::Doctor);
        let admin = session(Role::Admin);

        assert!(authorize(Some(&patient), Operation::BookAppointment).is_ok());
        assert!(authorize(Some(&doctor), Operation::BookAppointment).is_err());
        assert!(authorize(Some(&admin), Operation::BookAppointment).is_err());

        assert!(authorize(Some(&doctor), Operation::RecordTreatment).is_ok());
        assert!(authorize(Some(&patient), Operation::DoctorCancelAppointment).is_err());

        assert!(authorize(Some(&admin), Operation::CreateDoctor).is_ok());
        assert!(authorize(Some(&doctor), Operation::EditDoctor).is_err());
    }

    #[test]
    fn any_role_may_edit_profile() {
        for role in [Role::Admin, Role::Doctor, Role::Patient] {
            let s = session(role);
            assert_eq!(authorize(Some(&s), Operation::EditProfile).unwrap(), s);
        }
    }

    #[test]
    fn token_round_trip() {
        let keys = SessionKeys::new(b"segredo-de-teste", Duration::minutes(5));
        let s = session(Role::Doctor);

        let token = keys.issue(&s).unwrap();
        assert_eq!(keys.verify(&token), Some(s));
    }

    #[test]
    fn foreign_or_expired_tokens_are_ignored() {
        let keys = SessionKeys::new(b"segredo-de-teste", Duration::minutes(5));
        let other = SessionKeys::new(b"outro-segredo", Duration::minutes(5));
        let expired = SessionKeys::new(b"segredo-de-teste", Duration::minutes(-10));
        let s = session(Role::Patient);

        assert_eq!(keys.verify(&other.issue(&s).unwrap()), None);
        assert_eq!(keys.verify(&expired.issue(&s).unwrap()), None);
        assert_eq!(keys.verify("nem-um-token"), None);
    }
}
