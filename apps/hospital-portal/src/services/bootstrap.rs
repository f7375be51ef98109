//! Dados iniciais: departamentos padrão e o usuário administrador

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

use hospital_db::models::Role;
use hospital_db::queries::users::NewUser;
use hospital_db::queries::{departments, users};

use super::hash_secret;

const ADMIN_USERNAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@gmail.com";

const DEFAULT_DEPARTMENTS: &[(&str, &str)] = &[
    ("Cardiology", "Heart care"),
    ("Oncology", "Cancer care"),
    ("General Medicine", "General checkups"),
];

/// O que o bootstrap criou nesta execução
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub departments_created: usize,
    pub admin_created: bool,
}

/// Semeia o banco. Idempotente: rodar de novo não cria nada.
pub async fn seed(pool: &SqlitePool, admin_password: &str) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    // Argon2 fora da transação
    let admin_hash = hash_secret(admin_password)
        .await
        .context("Falha ao gerar hash da senha do administrador")?;

    let mut tx = pool.begin().await.context("Falha ao iniciar transação de bootstrap")?;

    if departments::count(&mut *tx).await? == 0 {
        for &(name, description) in DEFAULT_DEPARTMENTS {
            departments::insert(&mut *tx, name, Some(description))
                .await
                .with_context(|| format!("Falha ao criar departamento {name}"))?;
            report.departments_created += 1;
        }
    }

    let admins = users::count_by_role(&mut *tx, Role::Admin).await?;
    let username_taken = users::count_by_username(&mut *tx, ADMIN_USERNAME).await? > 0;
    let email_taken = users::email_taken(&mut *tx, ADMIN_EMAIL, None).await?;

    if admins > 0 || username_taken || email_taken {
        // Administrador renomeado continua valendo
        if !username_taken {
            warn!(
                admins,
                email_taken,
                "Usuário admin ausente; criação do administrador padrão ignorada"
            );
        }
    } else {
        users::insert(
            &mut *tx,
            &NewUser {
                username: ADMIN_USERNAME,
                email: ADMIN_EMAIL,
                password_hash: &admin_hash,
                role: Role::Admin,
            },
        )
        .await
        .context("Falha ao criar usuário administrador")?;
        report.admin_created = true;
    }

    tx.commit().await.context("Falha ao confirmar bootstrap")?;

    info!(
        departments_created = report.departments_created,
        admin_created = report.admin_created,
        "Bootstrap concluído"
    );
    Ok(report)
}
