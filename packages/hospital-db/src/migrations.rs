//! Sistema de migrações para banco de dados
//!
//! Este módulo gerencia as migrações do banco de dados SQLite

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{error, info};

/// Lista de migrações SQL a serem aplicadas
pub const MIGRATIONS: &[&str] = &[
    // 001_initial_schema.sql
    r#"
    -- Usuários: administradores, médicos e pacientes
    CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('admin', 'doctor', 'patient')),
        registered_at TEXT NOT NULL
    );

    -- Departamentos do hospital
    CREATE TABLE IF NOT EXISTS departments (
        id BLOB PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at TEXT NOT NULL
    );

    -- Perfil profissional, 1:1 com um usuário de papel 'doctor'
    CREATE TABLE IF NOT EXISTS doctors (
        id BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL UNIQUE,
        department_id BLOB NOT NULL,
        qualification TEXT,
        experience_years INTEGER NOT NULL DEFAULT 0 CHECK (experience_years >= 0),
        FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE RESTRICT,
        FOREIGN KEY (department_id) REFERENCES departments (id) ON DELETE RESTRICT
    );

    -- Consultas entre um usuário médico e um usuário paciente
    CREATE TABLE IF NOT EXISTS appointments (
        id BLOB PRIMARY KEY NOT NULL,
        doctor_id BLOB NOT NULL,
        patient_id BLOB NOT NULL,
        date TEXT NOT NULL,
        time TEXT NOT NULL,
        type TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'booked' CHECK (status IN ('booked', 'completed', 'cancelled')),
        created_at TEXT NOT NULL,
        FOREIGN KEY (doctor_id) REFERENCES users (id) ON DELETE RESTRICT,
        FOREIGN KEY (patient_id) REFERENCES users (id) ON DELETE RESTRICT
    );

    -- Registros de atendimento, removidos junto com a consulta
    CREATE TABLE IF NOT EXISTS treatments (
        id BLOB PRIMARY KEY NOT NULL,
        appointment_id BLOB NOT NULL,
        visit_type TEXT,
        test_done TEXT,
        diagnosis TEXT,
        prescription TEXT,
        medicines TEXT,
        prescribed_at TEXT NOT NULL,
        FOREIGN KEY (appointment_id) REFERENCES appointments (id) ON DELETE CASCADE
    );

    -- Índices para otimização
    CREATE INDEX IF NOT EXISTS idx_doctors_department_id ON doctors (department_id);
    CREATE INDEX IF NOT EXISTS idx_appointments_doctor_status ON appointments (doctor_id, status);
    CREATE INDEX IF NOT EXISTS idx_appointments_patient_status ON appointments (patient_id, status);
    CREATE INDEX IF NOT EXISTS idx_treatments_appointment_id ON treatments (appointment_id);
    "#,
];

/// Executa todas as migrações pendentes no banco de dados
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Aplicando migrações de banco de dados...");

    let version: i64 = match sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
    {
        Ok(v) => v,
        Err(e) => {
            // Pode ser a primeira execução
            error!("Erro ao obter versão do banco: {}", e);
            0
        }
    };

    info!("Versão atual do banco: {}", version);

    for (i, migration_sql) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as i64;

        if migration_version <= version {
            info!("Migração {} já aplicada", migration_version);
            continue;
        }

        info!("Aplicando migração {}...", migration_version);

        let mut transaction = pool.begin().await.context(format!(
            "Falha ao iniciar transação para migração {}",
            migration_version
        ))?;

        sqlx::query(migration_sql)
            .execute(&mut *transaction)
            .await
            .context(format!("Falha ao executar migração {}", migration_version))?;

        sqlx::query(&format!("PRAGMA user_version = {}", migration_version))
            .execute(&mut *transaction)
            .await
            .context(format!(
                "Falha ao atualizar versão para {}",
                migration_version
            ))?;

        transaction.commit().await.context(format!(
            "Falha ao confirmar transação para migração {}",
            migration_version
        ))?;

        info!("Migração {} aplicada com sucesso", migration_version);
    }

    info!("Migrações concluídas. Versão atual: {}", MIGRATIONS.len());
    Ok(())
}
