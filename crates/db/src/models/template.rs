use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::schedule::Frequency;

/// Reference data describing a maintenance routine (e.g. "Replace HVAC
/// filter"). Never mutated by the engine once created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub default_frequency: Frequency,
    pub instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub default_frequency: Frequency,
    pub instructions: Option<String>,
}

impl Template {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Template>(
            "SELECT id, name, description, category, default_frequency, instructions, created_at, updated_at
               FROM templates
               WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Template>(
            "SELECT id, name, description, category, default_frequency, instructions, created_at, updated_at
               FROM templates
               ORDER BY category ASC, name ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateTemplate,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Template>(
            "INSERT INTO templates (id, name, description, category, default_frequency, instructions)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, name, description, category, default_frequency, instructions, created_at, updated_at",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.category)
        .bind(data.default_frequency)
        .bind(&data.instructions)
        .fetch_one(pool)
        .await
    }
}
