//! Erros das operações do portal
//!
//! Cada variante sabe para onde o cliente volta e qual mensagem transitória
//! exibir. Detalhes internos do banco nunca chegam ao cliente.

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use hospital_db::DbError;

use crate::outcome::{Destination, Flash, FlashLevel};

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Entrada malformada ou inconsistente
    #[error("Dados inválidos: {message}")]
    Validation {
        message: String,
        back_to: Destination,
    },

    /// Violação de unicidade (e-mail, nome de usuário) ou dependentes existentes
    #[error("Conflito: {message}")]
    Conflict {
        message: String,
        back_to: Destination,
    },

    /// Credenciais inválidas; usuário inexistente e senha errada são indistinguíveis
    #[error("Falha de autenticação")]
    Authentication,

    /// Violação de posse
    #[error("Não autorizado: {message}")]
    Authorization {
        message: String,
        back_to: Destination,
    },

    #[error("Não encontrado: {message}")]
    NotFound {
        message: String,
        back_to: Destination,
    },

    /// Sem sessão, ou papel diferente do exigido pela operação
    #[error("Acesso negado")]
    AccessDenied,

    #[error("Erro de banco de dados: {0}")]
    Store(#[from] DbError),

    /// Falha ao emitir o token de sessão
    #[error("Erro de sessão: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>, back_to: Destination) -> Self {
        ServiceError::Validation {
            message: message.into(),
            back_to,
        }
    }

    pub fn conflict(message: impl Into<String>, back_to: Destination) -> Self {
        ServiceError::Conflict {
            message: message.into(),
            back_to,
        }
    }

    pub fn authorization(message: impl Into<String>, back_to: Destination) -> Self {
        ServiceError::Authorization {
            message: message.into(),
            back_to,
        }
    }

    pub fn not_found(message: impl Into<String>, back_to: Destination) -> Self {
        ServiceError::NotFound {
            message: message.into(),
            back_to,
        }
    }

    /// Converte erros de validação de formulário
    pub fn from_validation(errors: &ValidationErrors, back_to: Destination) -> Self {
        ServiceError::validation(describe_validation(errors), back_to)
    }

    /// Trata violação de unicidade como conflito, o resto como erro de banco
    pub fn from_store_conflict(error: DbError, message: &str, back_to: Destination) -> Self {
        if error.is_unique_violation() {
            ServiceError::conflict(message, back_to)
        } else {
            ServiceError::Store(error)
        }
    }

    /// Tela para onde o cliente deve ser enviado
    pub fn redirect(&self) -> Destination {
        match self {
            ServiceError::Validation { back_to, .. }
            | ServiceError::Conflict { back_to, .. }
            | ServiceError::Authorization { back_to, .. }
            | ServiceError::NotFound { back_to, .. } => *back_to,
            ServiceError::Authentication | ServiceError::AccessDenied => Destination::Login,
            ServiceError::Store(_) => Destination::Home,
            ServiceError::Session(_) => Destination::Login,
        }
    }

    /// Mensagem transitória exibida ao cliente
    pub fn flash(&self) -> Flash {
        match self {
            ServiceError::Validation { message, .. } => Flash::new(FlashLevel::Danger, message),
            ServiceError::Conflict { message, .. } => Flash::new(FlashLevel::Warning, message),
            ServiceError::Authentication => Flash::new(FlashLevel::Danger, "Login inválido"),
            ServiceError::Authorization { message, .. } => Flash::new(FlashLevel::Danger, message),
            ServiceError::NotFound { message, .. } => Flash::new(FlashLevel::Warning, message),
            ServiceError::AccessDenied => {
                Flash::new(FlashLevel::Info, "Faça login para continuar.")
            }
            ServiceError::Store(_) | ServiceError::Session(_) => Flash::new(
                FlashLevel::Danger,
                "Ocorreu um erro interno. Tente novamente.",
            ),
        }
    }
}

fn describe_validation(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = Vec::new();

    for (field, kind) in errors.errors() {
        let ValidationErrorsKind::Field(field_errors) = kind else {
            continue;
        };
        for error in field_errors {
            let message = match error.code.as_ref() {
                "must_match" => "As senhas não coincidem!".to_string(),
                "email" => "E-mail inválido.".to_string(),
                "length" => format!("Campo obrigatório ou muito longo: {field}."),
                "range" => format!("Valor fora do intervalo permitido: {field}."),
                _ => format!("Valor inválido: {field}."),
            };
            if !messages.contains(&message) {
                messages.push(message);
            }
        }
    }

    if messages.is_empty() {
        return "Dados inválidos.".to_string();
    }
    messages.sort();
    messages.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Passwords {
        #[validate(length(min = 1))]
        password: String,
        #[validate(must_match = "password")]
        confirm_password: String,
    }

    #[test]
    fn mismatch_is_reported_in_plain_words() {
        let form = Passwords {
            password: "a".into(),
            confirm_password: "b".into(),
        };
        let errors = form.validate().unwrap_err();

        let err = ServiceError::from_validation(&errors, Destination::Registration);
        assert_eq!(err.redirect(), Destination::Registration);
        assert_eq!(err.flash().level, FlashLevel::Danger);
        assert_eq!(err.flash().message, "As senhas não coincidem!");
    }

    #[test]
    fn store_errors_hide_detail() {
        let err = ServiceError::from(DbError::QueryError("no such table: users".into()));
        assert_eq!(err.redirect(), Destination::Home);
        assert!(!err.flash().message.contains("users"));
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let err = ServiceError::from_store_conflict(
            DbError::UniqueViolation("UNIQUE constraint failed: users.email".into()),
            "E-mail já cadastrado.",
            Destination::Registration,
        );
        assert!(matches!(err, ServiceError::Conflict { .. }));
        assert_eq!(err.flash().level, FlashLevel::Warning);

        let err = ServiceError::from_store_conflict(
            DbError::QueryError("boom".into()),
            "E-mail já cadastrado.",
            Destination::Registration,
        );
        assert!(matches!(err, ServiceError::Store(_)));
    }

    #[test]
    fn access_denied_goes_to_login() {
        assert_eq!(ServiceError::AccessDenied.redirect(), Destination::Login);
        assert_eq!(ServiceError::Authentication.redirect(), Destination::Login);
    }
}
