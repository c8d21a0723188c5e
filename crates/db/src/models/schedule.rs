use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// How often a schedule recurs. Every non-custom value maps to a fixed
/// day-count; `Custom` carries its day-count in
/// `Schedule::custom_frequency_days`.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
    Custom,
}

impl Frequency {
    /// Day offset for the fixed frequencies; `None` for `Custom`, whose
    /// interval lives on the schedule.
    pub fn fixed_interval_days(&self) -> Option<i64> {
        match self {
            Frequency::Weekly => Some(7),
            Frequency::Biweekly => Some(14),
            Frequency::Monthly => Some(30),
            Frequency::Quarterly => Some(91),
            Frequency::Semiannual => Some(182),
            Frequency::Annual => Some(365),
            Frequency::Custom => None,
        }
    }
}

/// A recurring maintenance obligation for one asset, or for the whole home
/// when `asset_id` is `None`. Never hard-deleted: removal flips `is_active`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Schedule {
    pub id: Uuid,
    pub asset_id: Option<Uuid>,
    pub template_id: Uuid,
    pub frequency: Frequency,
    pub custom_frequency_days: Option<i32>,
    pub next_due_date: DateTime<Utc>,
    pub last_completed_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateSchedule {
    pub asset_id: Option<Uuid>,
    pub template_id: Uuid,
    pub frequency: Frequency,
    pub custom_frequency_days: Option<i32>,
    pub next_due_date: DateTime<Utc>,
}

const SCHEDULE_COLUMNS: &str = "id, asset_id, template_id, frequency, custom_frequency_days, \
     next_due_date, last_completed_date, is_active, created_at, updated_at";

impl Schedule {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Schedule>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Schedule>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules ORDER BY next_due_date ASC"
        ))
        .fetch_all(pool)
        .await
    }

    /// The active schedule for an (asset, template) pair, if any. `IS`
    /// rather than `=` so a `None` asset matches whole-home schedules.
    pub async fn find_active_for_pair<'e, E>(
        executor: E,
        asset_id: Option<Uuid>,
        template_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Schedule>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules
               WHERE template_id = $1 AND asset_id IS $2 AND is_active = 1"
        ))
        .bind(template_id)
        .bind(asset_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateSchedule,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Schedule>(&format!(
            "INSERT INTO schedules (id, asset_id, template_id, frequency, custom_frequency_days,
                                    next_due_date, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $7)
               RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(id)
        .bind(data.asset_id)
        .bind(data.template_id)
        .bind(data.frequency)
        .bind(data.custom_frequency_days)
        .bind(data.next_due_date)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn update_frequency(
        pool: &SqlitePool,
        id: Uuid,
        frequency: Frequency,
        custom_frequency_days: Option<i32>,
        next_due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Schedule>(&format!(
            "UPDATE schedules
               SET frequency = $2, custom_frequency_days = $3, next_due_date = $4, updated_at = $5
               WHERE id = $1
               RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(id)
        .bind(frequency)
        .bind(custom_frequency_days)
        .bind(next_due_date)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn set_active(
        pool: &SqlitePool,
        id: Uuid,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Schedule>(&format!(
            "UPDATE schedules
               SET is_active = $2, updated_at = $3
               WHERE id = $1
               RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(id)
        .bind(is_active)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Record a completion: stamp `last_completed_date` and move
    /// `next_due_date` forward. Runs inside the completion transaction.
    pub async fn record_completion<'e, E>(
        executor: E,
        id: Uuid,
        completed_at: DateTime<Utc>,
        next_due_date: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Schedule>(&format!(
            "UPDATE schedules
               SET last_completed_date = $2, next_due_date = $3, updated_at = $2
               WHERE id = $1
               RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(id)
        .bind(completed_at)
        .bind(next_due_date)
        .fetch_one(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        DBService,
        models::template::{CreateTemplate, Template},
    };

    /// The one-active-schedule-per-pair rule is enforced by the partial
    /// unique index itself, not only by the service-level pre-check.
    #[tokio::test]
    async fn unique_index_blocks_second_active_schedule() {
        let db = DBService::new_in_memory().await.unwrap();
        let template = Template::create(
            &db.pool,
            &CreateTemplate {
                name: "Test smoke detectors".to_string(),
                description: None,
                category: "safety".to_string(),
                default_frequency: Frequency::Semiannual,
                instructions: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let now: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let data = CreateSchedule {
            asset_id: None,
            template_id: template.id,
            frequency: Frequency::Semiannual,
            custom_frequency_days: None,
            next_due_date: now + Duration::days(182),
        };

        let first = Schedule::create(&db.pool, &data, Uuid::new_v4(), now)
            .await
            .unwrap();

        let err = Schedule::create(&db.pool, &data, Uuid::new_v4(), now)
            .await
            .unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("expected unique violation, got {other:?}"),
        }

        Schedule::set_active(&db.pool, first.id, false, now)
            .await
            .unwrap();

        Schedule::create(&db.pool, &data, Uuid::new_v4(), now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn find_active_for_pair_matches_null_assets() {
        let db = DBService::new_in_memory().await.unwrap();
        let template = Template::create(
            &db.pool,
            &CreateTemplate {
                name: "Clean dryer vent".to_string(),
                description: None,
                category: "laundry".to_string(),
                default_frequency: Frequency::Annual,
                instructions: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let now: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let schedule = Schedule::create(
            &db.pool,
            &CreateSchedule {
                asset_id: None,
                template_id: template.id,
                frequency: Frequency::Annual,
                custom_frequency_days: None,
                next_due_date: now + Duration::days(365),
            },
            Uuid::new_v4(),
            now,
        )
        .await
        .unwrap();

        let found = Schedule::find_active_for_pair(&db.pool, None, template.id)
            .await
            .unwrap()
            .expect("whole-home schedule found");
        assert_eq!(found.id, schedule.id);

        // A different (non-null) asset does not match the whole-home row.
        let other = Schedule::find_active_for_pair(&db.pool, Some(Uuid::new_v4()), template.id)
            .await
            .unwrap();
        assert!(other.is_none());
    }
}
