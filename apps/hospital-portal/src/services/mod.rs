//! Componentes do portal: identidade, consultas, tratamentos, diretório,
//! administração e bootstrap.
//!
//! Toda operação protegida começa com `session::authorize`.

pub mod admin;
pub mod appointments;
pub mod bootstrap;
pub mod directory;
pub mod identity;
pub mod treatments;

use hospital_db::crypto;
use hospital_db::DbError;
use zeroize::Zeroizing;

use crate::error::ServiceError;

/// Roda trabalho de CPU (Argon2) fora do executor assíncrono.
///
/// Pânico ou cancelamento da tarefa vira erro interno, nunca um resultado padrão.
pub(crate) async fn run_blocking<F, T>(work: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DbError::InternalError(format!("Tarefa bloqueante falhou: {e}")).into())
}

/// Gera o hash da senha fora do executor assíncrono
pub(crate) async fn hash_secret(password: &str) -> Result<String, ServiceError> {
    let password = Zeroizing::new(password.to_string());
    Ok(run_blocking(move || crypto::hash_password(&password)).await??)
}

/// Trata texto em branco como ausente
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
