//! Consultas da tabela `departments`

use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::Department;

pub async fn insert<'e, E>(
    executor: E,
    name: &str,
    description: Option<&str>,
) -> Result<Department, DbError>
where
    E: SqliteExecutor<'e>,
{
    let department = Department {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: description.map(str::to_string),
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO departments (id, name, description, created_at) VALUES (?, ?, ?, ?)")
        .bind(department.id)
        .bind(&department.name)
        .bind(&department.description)
        .bind(department.created_at)
        .execute(executor)
        .await?;

    Ok(department)
}

pub async fn list<'e, E>(executor: E) -> Result<Vec<Department>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let departments =
        sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY created_at, name")
            .fetch_all(executor)
            .await?;
    Ok(departments)
}

pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Department>, DbError>
where
    E: SqliteExecutor<'e>,
{
    let department = sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(department)
}

pub async fn count<'e, E>(executor: E) -> Result<i64, DbError>
where
    E: SqliteExecutor<'e>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
        .fetch_one(executor)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_pool;

    #[tokio::test]
    async fn insert_list_and_count() -> anyhow::Result<()> {
        let pool = memory_pool().await?;
        assert_eq!(count(&pool).await?, 0);

        let cardio = insert(&pool, "Cardiology", Some("Heart care")).await?;
        insert(&pool, "Oncology", None).await?;

        assert_eq!(count(&pool).await?, 2);
        let found = find_by_id(&pool, cardio.id).await?.expect("departamento");
        assert_eq!(found.description.as_deref(), Some("Heart care"));

        let names: Vec<String> = list(&pool).await?.into_iter().map(|d| d.name).collect();
        assert!(names.contains(&"Oncology".to_string()));
        assert!(find_by_id(&pool, Uuid::new_v4()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_name_rejected() -> anyhow::Result<()> {
        let pool = memory_pool().await?;
        insert(&pool, "Cardiology", None).await?;

        let err = insert(&pool, "Cardiology", None).await.unwrap_err();
        assert!(err.is_unique_violation());
        Ok(())
    }
}
