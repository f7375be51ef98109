//! Identidade e acesso: cadastro, login, logout e edição de perfil

use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::OnceLock;
use tracing::{info, warn};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use hospital_db::crypto;
use hospital_db::models::{Role, User};
use hospital_db::queries::users::{self, NewUser};

use super::{hash_secret, non_blank, run_blocking};
use crate::error::ServiceError;
use crate::outcome::{Destination, Flash, Outcome};
use crate::session::{authorize, Operation, SessionContext};

#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct RegistrationForm {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email, length(max = 150))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(must_match = "password")]
    pub confirm_password: String,
}

#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct ProfileForm {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email, length(max = 150))]
    pub email: String,
    /// Só substitui a senha quando não vazia
    #[serde(default)]
    pub password: Option<String>,
}

/// Hash usado quando o usuário não existe, para que as duas falhas custem o mesmo.
/// Calculado na primeira chamada; só deve ser chamado dentro de `run_blocking`.
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| crypto::hash_password("decoy-password").unwrap_or_default())
}

/// Cadastra um paciente. O papel é sempre `patient`.
pub async fn register(
    pool: &SqlitePool,
    form: &RegistrationForm,
) -> Result<Outcome<User>, ServiceError> {
    form.validate()
        .map_err(|e| ServiceError::from_validation(&e, Destination::Registration))?;

    let username = form.username.trim();
    let email = form.email.trim();

    if users::email_taken(pool, email, None).await? {
        warn!("Cadastro recusado: e-mail já existente");
        return Err(ServiceError::conflict(
            "E-mail já cadastrado.",
            Destination::Registration,
        ));
    }
    if users::username_taken(pool, username, None).await? {
        warn!("Cadastro recusado: nome de usuário já existente");
        return Err(ServiceError::conflict(
            "Nome de usuário já em uso.",
            Destination::Registration,
        ));
    }

    let password_hash = hash_secret(&form.password).await?;
    let user = users::insert(
        pool,
        &NewUser {
            username,
            email,
            password_hash: &password_hash,
            role: Role::Patient,
        },
    )
    .await
    .map_err(|e| {
        ServiceError::from_store_conflict(e, "E-mail ou nome de usuário já cadastrado.", Destination::Registration)
    })?;

    info!(user_id = %user.id, "Paciente cadastrado");
    Ok(Outcome::new(
        Destination::Login,
        Flash::success("Cadastro realizado com sucesso!"),
        user,
    ))
}

/// Autentica e devolve a sessão, enviando o usuário ao painel do seu papel
pub async fn login(
    pool: &SqlitePool,
    form: &LoginForm,
) -> Result<Outcome<SessionContext>, ServiceError> {
    let user = users::find_by_username(pool, form.username.trim()).await?;

    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let password = Zeroizing::new(form.password.clone());
    let matches = run_blocking(move || match stored_hash {
        Some(hash) => crypto::verify_password(&password, &hash),
        None => crypto::verify_password(&password, decoy_hash()),
    })
    .await?;

    match user {
        Some(user) if matches => {
            let session = SessionContext {
                user_id: user.id,
                role: user.role,
            };
            info!(user_id = %user.id, role = %user.role, "Login realizado");
            Ok(Outcome::new(
                Destination::dashboard_for(user.role),
                Flash::success(format!("Bem-vindo, {}!", user.username)),
                session,
            ))
        }
        _ => {
            warn!("Tentativa de login inválida");
            Err(ServiceError::Authentication)
        }
    }
}

/// Encerra a sessão. Nunca falha.
pub fn logout(session: Option<&SessionContext>) -> Outcome<()> {
    if let Some(session) = session {
        info!(user_id = %session.user_id, "Logout");
    }
    Outcome::new(Destination::Login, Flash::info("Sessão encerrada."), ())
}

/// Dados atuais do perfil do chamador
pub async fn profile(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
) -> Result<User, ServiceError> {
    let caller = authorize(session, Operation::EditProfile)?;
    users::find_by_id(pool, caller.user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Usuário não encontrado.", Destination::Login))
}

/// Atualiza nome, e-mail e, se informada, a senha do próprio chamador
pub async fn edit_profile(
    pool: &SqlitePool,
    session: Option<&SessionContext>,
    form: &ProfileForm,
) -> Result<Outcome<User>, ServiceError> {
    let caller = authorize(session, Operation::EditProfile)?;
    form.validate()
        .map_err(|e| ServiceError::from_validation(&e, Destination::EditProfile))?;

    let username = form.username.trim();
    let email = form.email.trim();

    let user = users::find_by_id(pool, caller.user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Usuário não encontrado.", Destination::Login))?;

    if users::email_taken(pool, email, Some(user.id)).await? {
        return Err(ServiceError::conflict(
            "E-mail já cadastrado.",
            Destination::EditProfile,
        ));
    }
    if users::username_taken(pool, username, Some(user.id)).await? {
        return Err(ServiceError::conflict(
            "Nome de usuário já em uso.",
            Destination::EditProfile,
        ));
    }

    let password_hash = match non_blank(&form.password) {
        Some(password) => Some(hash_secret(password).await?),
        None => None,
    };

    users::update_identity(pool, user.id, username, email, password_hash.as_deref())
        .await
        .map_err(|e| {
            ServiceError::from_store_conflict(e, "E-mail ou nome de usuário já cadastrado.", Destination::EditProfile)
        })?;

    let updated = users::find_by_id(pool, user.id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Usuário não encontrado.", Destination::Login))?;

    info!(user_id = %updated.id, "Perfil atualizado");
    Ok(Outcome::new(
        Destination::dashboard_for(updated.role),
        Flash::success("Perfil atualizado com sucesso!"),
        updated,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use hospital_db::testing::memory_pool;

    fn registration(username: &str, email: &str, password: &str, confirm: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    fn login_form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: username.into(),
            password: password.into(),
        }
    }

    async fn user_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn registration_always_creates_patient() {
        let pool = memory_pool().await.unwrap();

        let outcome = register(&pool, &registration("ana", "ana@example.com", "pw", "pw"))
            .await
            .unwrap();

        assert_eq!(outcome.data.role, Role::Patient);
        assert_eq!(outcome.redirect, Destination::Login);
        assert_ne!(outcome.data.password_hash, "pw");
    }

    #[tokio::test]
    async fn password_mismatch_is_validation_error() {
        let pool = memory_pool().await.unwrap();

        let err = register(&pool, &registration("ana", "ana@example.com", "pw", "other"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation { .. }), "{err:?}");
        assert_eq!(err.redirect(), Destination::Registration);
        assert_eq!(user_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let pool = memory_pool().await.unwrap();

        let err = register(&pool, &registration("ana", "ana-sem-arroba", "pw", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation { .. }), "{err:?}");
        assert_eq!(err.redirect(), Destination::Registration);
        assert_eq!(user_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict_and_creates_nothing() {
        let pool = memory_pool().await.unwrap();
        register(&pool, &registration("ana", "ana@example.com", "pw", "pw"))
            .await
            .unwrap();

        let err = register(&pool, &registration("bia", "ana@example.com", "pw", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict { .. }), "{err:?}");
        assert_eq!(user_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn login_routes_by_role() {
        let pool = memory_pool().await.unwrap();
        let doctor = fixtures::user(&pool, "doc", Role::Doctor).await;

        let outcome = login(&pool, &login_form("doc", "senha")).await.unwrap();

        assert_eq!(outcome.redirect, Destination::DoctorDashboard);
        assert_eq!(outcome.data.user_id, doctor.id);
        assert_eq!(outcome.data.role, Role::Doctor);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let pool = memory_pool().await.unwrap();
        fixtures::user(&pool, "ana", Role::Patient).await;

        let wrong_password = login(&pool, &login_form("ana", "errada")).await.unwrap_err();
        let unknown_user = login(&pool, &login_form("ninguem", "senha")).await.unwrap_err();

        assert!(matches!(wrong_password, ServiceError::Authentication));
        assert!(matches!(unknown_user, ServiceError::Authentication));
        assert_eq!(wrong_password.flash(), unknown_user.flash());
        assert_eq!(wrong_password.redirect(), unknown_user.redirect());
    }

    #[tokio::test]
    async fn decoy_hash_is_built_off_the_async_workers() {
        let hash = run_blocking(|| decoy_hash().to_string()).await.unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(!crypto::verify_password("senha", &hash));
    }

    #[test]
    fn logout_is_unconditional() {
        assert_eq!(logout(None).redirect, Destination::Login);
        let session = SessionContext {
            user_id: uuid::Uuid::new_v4(),
            role: Role::Admin,
        };
        assert_eq!(logout(Some(&session)).redirect, Destination::Login);
    }

    #[tokio::test]
    async fn edit_profile_keeps_password_when_blank() {
        let pool = memory_pool().await.unwrap();
        let ana = fixtures::user(&pool, "ana", Role::Patient).await;
        let session = fixtures::session_of(&ana);

        let form = ProfileForm {
            username: "ana-maria".into(),
            email: "ana.maria@example.com".into(),
            password: Some("   ".into()),
        };
        let outcome = edit_profile(&pool, Some(&session), &form).await.unwrap();

        assert_eq!(outcome.redirect, Destination::PatientDashboard);
        assert_eq!(outcome.data.username, "ana-maria");
        assert!(login(&pool, &login_form("ana-maria", "senha")).await.is_ok());
    }

    #[tokio::test]
    async fn edit_profile_replaces_password_when_given() {
        let pool = memory_pool().await.unwrap();
        let doc = fixtures::user(&pool, "doc", Role::Doctor).await;
        let session = fixtures::session_of(&doc);

        let form = ProfileForm {
            username: "doc".into(),
            email: "doc@example.com".into(),
            password: Some("nova".into()),
        };
        let outcome = edit_profile(&pool, Some(&session), &form).await.unwrap();

        assert_eq!(outcome.redirect, Destination::DoctorDashboard);
        assert!(login(&pool, &login_form("doc", "senha")).await.is_err());
        assert!(login(&pool, &login_form("doc", "nova")).await.is_ok());
    }

    #[tokio::test]
    async fn edit_profile_rejects_someone_elses_email() {
        let pool = memory_pool().await.unwrap();
        let ana = fixtures::user(&pool, "ana", Role::Patient).await;
        fixtures::user(&pool, "bia", Role::Patient).await;

        let form = ProfileForm {
            username: "ana".into(),
            email: "bia@example.com".into(),
            password: None,
        };
        let err = edit_profile(&pool, Some(&fixtures::session_of(&ana)), &form)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn edit_profile_requires_session() {
        let pool = memory_pool().await.unwrap();
        let form = ProfileForm {
            username: "x".into(),
            email: "x@example.com".into(),
            password: None,
        };

        let err = edit_profile(&pool, None, &form).await.unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied));
    }
}
