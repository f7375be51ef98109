//! Consultas da tabela `users`

use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{Role, User};

/// Dados para inserir um usuário; a senha já deve vir com hash
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

pub async fn insert<'e, E>(executor: E, new_user: &NewUser<'_>) -> Result<User, DbError>
where
    E: SqliteExecutor<'e>,
{
    let user = User {
        id: Uuid::new_v4(),
        username: new_user.username.to_string(),
        email: new_user.email.to_string(),
        password_hash: new_user.password_hash.to_string(),
        role: new_user.role,
        registered_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role, registered_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.registered_at)
    .execute(executor)
    .await?;

    Ok(user)
}

pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<User>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn find_by_username<'e, E>(executor: E, username: &str) -> Result<Option<User>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

/// Verifica se o e-mail pertence a outro usuário além de `exclude`
pub async fn email_taken<'e, E>(
    executor: E,
    email: &str,
    exclude: Option<Uuid>,
) -> Result<bool, DbError>
where
    E: SqliteExecutor<'e>,
{
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND (? IS NULL OR id <> ?))",
    )
    .bind(email)
    .bind(exclude)
    .bind(exclude)
    .fetch_one(executor)
    .await?;
    Ok(taken)
}

/// Verifica se o nome de usuário pertence a outro usuário além de `exclude`
pub async fn username_taken<'e, E>(
    executor: E,
    username: &str,
    exclude: Option<Uuid>,
) -> Result<bool, DbError>
where
    E: SqliteExecutor<'e>,
{
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? AND (? IS NULL OR id <> ?))",
    )
    .bind(username)
    .bind(exclude)
    .bind(exclude)
    .fetch_one(executor)
    .await?;
    Ok(taken)
}

/// Atualiza nome e e-mail; o hash só é trocado quando informado
pub async fn update_identity<'e, E>(
    executor: E,
    id: Uuid,
    username: &str,
    email: &str,
    password_hash: Option<&str>,
) -> Result<(), DbError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE users
         SET username = ?, email = ?, password_hash = COALESCE(?, password_hash)
         WHERE id = ?",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(format!("Usuário {}", id)));
    }
    Ok(())
}

pub async fn list_by_role<'e, E>(executor: E, role: Role) -> Result<Vec<User>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let users =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = ? ORDER BY registered_at, username")
            .bind(role.as_str())
            .fetch_all(executor)
            .await?;
    Ok(users)
}

pub async fn count_by_username<'e, E>(executor: E, username: &str) -> Result<i64, DbError>
where
    E: SqliteExecutor<'e>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

pub async fn count_by_role<'e, E>(executor: E, role: Role) -> Result<i64, DbError>
where
    E: SqliteExecutor<'e>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(role.as_str())
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Remove um usuário; falha com `ForeignKeyViolation` se ainda houver dependentes
pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<(), DbError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(format!("Usuário {}", id)));
    }
    Ok(())
}
