//! Extração da sessão (`Authorization: Bearer <token>`) e tratamento de
//! entradas rejeitadas pelos extratores do axum

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::fmt::Display;
use tracing::debug;

use super::AppState;
use crate::error::ServiceError;
use crate::outcome::Destination;
use crate::session::{authorize, Operation, SessionContext};

/// Sessão do chamador, se houver.
///
/// Nunca rejeita a requisição: a decisão de acesso é de cada operação.
#[derive(Debug, Clone, Copy)]
pub struct CurrentSession(pub Option<SessionContext>);

impl CurrentSession {
    pub fn context(&self) -> Option<&SessionContext> {
        self.0.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| state.keys.verify(token.trim()));

        Ok(CurrentSession(session))
    }
}

/// Quem pode chegar à rota; decide o destino de uma entrada rejeitada
#[derive(Debug, Clone, Copy)]
pub enum Guard {
    Public(Destination),
    Protected(Operation),
}

/// Rejeição de extrator convertida no erro do portal
pub trait InputRejection: Display {
    fn into_service_error(self, back_to: Destination) -> ServiceError;
}

impl InputRejection for JsonRejection {
    fn into_service_error(self, back_to: Destination) -> ServiceError {
        ServiceError::validation(format!("Formulário inválido: {}", self.body_text()), back_to)
    }
}

impl InputRejection for PathRejection {
    fn into_service_error(self, back_to: Destination) -> ServiceError {
        ServiceError::not_found("Recurso não encontrado.", back_to)
    }
}

/// Desembrulha a entrada extraída.
///
/// Em rotas protegidas o acesso é conferido antes: sem sessão ou com papel
/// errado o chamador vai para o login, nunca recebe erro de validação.
pub fn accept<T, R: InputRejection>(
    extracted: Result<T, R>,
    session: &CurrentSession,
    guard: Guard,
) -> Result<T, ServiceError> {
    let rejection = match extracted {
        Ok(value) => return Ok(value),
        Err(rejection) => rejection,
    };

    let back_to = match guard {
        Guard::Public(destination) => destination,
        Guard::Protected(operation) => {
            Destination::dashboard_for(authorize(session.context(), operation)?.role)
        }
    };

    debug!(%rejection, "Entrada rejeitada pelo extrator");
    Err(rejection.into_service_error(back_to))
}
