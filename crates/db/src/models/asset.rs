use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A maintainable item in the home (appliance, HVAC unit, water heater...).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAsset {
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
}

impl Asset {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Asset>(
            "SELECT id, name, category, location, created_at, updated_at
               FROM assets
               WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asset>(
            "SELECT id, name, category, location, created_at, updated_at
               FROM assets
               ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateAsset, id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Asset>(
            "INSERT INTO assets (id, name, category, location)
               VALUES ($1, $2, $3, $4)
               RETURNING id, name, category, location, created_at, updated_at",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.category)
        .bind(&data.location)
        .fetch_one(pool)
        .await
    }
}
