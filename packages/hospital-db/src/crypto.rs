//! Hash de senhas
//!
//! Senhas são guardadas como strings PHC Argon2id com salt aleatório.
//! O texto puro circula apenas dentro de `Zeroizing`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use zeroize::Zeroizing;

use crate::error::DbError;

/// Senha em texto puro, apagada da memória ao sair de escopo
pub type PlainPassword = Zeroizing<String>;

/// Gera o hash Argon2id de uma senha
pub fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::CryptoError(format!("Falha ao gerar hash da senha: {}", e)))
}

/// Confere uma senha contra o hash armazenado.
///
/// Um hash malformado conta como senha incorreta.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Hash de senha inválido no banco: {}", e);
            false
        }
    }
}
