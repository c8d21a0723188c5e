//! Recurring-schedule lifecycle: frequency interpretation, template
//! application, frequency edits, pause/resume, soft removal.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use db::{
    DBService,
    models::{
        asset::Asset,
        schedule::{CreateSchedule, Frequency, Schedule},
        task::{CreateTask, Task},
        template::Template,
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::clock::Clock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),
    #[error("an active schedule already exists for this asset and template")]
    DuplicateSchedule,
    #[error("{0} not found")]
    NotFound(&'static str),
}

pub const MAX_CUSTOM_FREQUENCY_DAYS: i32 = 365;

/// Resolve a frequency (plus the custom day count when applicable) into the
/// day offset used for date arithmetic.
pub fn resolve_interval_days(
    frequency: Frequency,
    custom_days: Option<i32>,
) -> Result<i64, ScheduleError> {
    if let Some(days) = frequency.fixed_interval_days() {
        return Ok(days);
    }
    match custom_days {
        Some(days) if (1..=MAX_CUSTOM_FREQUENCY_DAYS).contains(&days) => Ok(i64::from(days)),
        Some(days) => Err(ScheduleError::InvalidFrequency(format!(
            "custom day count must be between 1 and {MAX_CUSTOM_FREQUENCY_DAYS}, got {days}"
        ))),
        None => Err(ScheduleError::InvalidFrequency(
            "custom frequency requires a day count".to_string(),
        )),
    }
}

/// `base + interval` in calendar days. The time-of-day component of `base`
/// carries through unchanged.
pub fn compute_next_due_date(
    base: DateTime<Utc>,
    frequency: Frequency,
    custom_days: Option<i32>,
) -> Result<DateTime<Utc>, ScheduleError> {
    Ok(base + Duration::days(resolve_interval_days(frequency, custom_days)?))
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ApplyTemplateRequest {
    pub asset_id: Option<Uuid>,
    pub frequency: Frequency,
    pub custom_frequency_days: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EditFrequencyRequest {
    pub frequency: Frequency,
    pub custom_frequency_days: Option<i32>,
}

#[derive(Clone)]
pub struct ScheduleService {
    db: DBService,
    clock: Arc<dyn Clock>,
}

impl ScheduleService {
    pub fn new(db: DBService, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn get(&self, id: Uuid) -> Result<Schedule, ScheduleError> {
        Schedule::find_by_id(&self.db.pool, id)
            .await?
            .ok_or(ScheduleError::NotFound("schedule"))
    }

    pub async fn list(&self) -> Result<Vec<Schedule>, ScheduleError> {
        Ok(Schedule::find_all(&self.db.pool).await?)
    }

    /// Apply a template to an asset (or the whole home when `asset_id` is
    /// `None`): creates the schedule and its first pending task in one
    /// transaction. At most one active schedule may exist per
    /// (asset, template) pair; the partial unique index backs up the
    /// in-transaction check, so a lost race surfaces as the same conflict.
    pub async fn apply_template(
        &self,
        template_id: Uuid,
        req: ApplyTemplateRequest,
    ) -> Result<(Schedule, Task), ScheduleError> {
        resolve_interval_days(req.frequency, req.custom_frequency_days)?;
        let now = self.clock.now();

        let mut tx = self.db.pool.begin().await?;

        let template = Template::find_by_id(&mut *tx, template_id)
            .await?
            .ok_or(ScheduleError::NotFound("template"))?;

        if let Some(asset_id) = req.asset_id {
            Asset::find_by_id(&mut *tx, asset_id)
                .await?
                .ok_or(ScheduleError::NotFound("asset"))?;
        }

        if Schedule::find_active_for_pair(&mut *tx, req.asset_id, template_id)
            .await?
            .is_some()
        {
            return Err(ScheduleError::DuplicateSchedule);
        }

        let custom_frequency_days = (req.frequency == Frequency::Custom)
            .then_some(req.custom_frequency_days)
            .flatten();
        let next_due_date = compute_next_due_date(now, req.frequency, custom_frequency_days)?;

        let schedule = Schedule::create(
            &mut *tx,
            &CreateSchedule {
                asset_id: req.asset_id,
                template_id,
                frequency: req.frequency,
                custom_frequency_days,
                next_due_date,
            },
            Uuid::new_v4(),
            now,
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ScheduleError::DuplicateSchedule
            }
            other => ScheduleError::Database(other),
        })?;

        let first_task = Task::create(
            &mut *tx,
            &CreateTask::first_occurrence(&schedule, &template),
            Uuid::new_v4(),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            schedule_id = %schedule.id,
            template_id = %template_id,
            asset_id = ?req.asset_id,
            next_due_date = %schedule.next_due_date,
            "template applied, schedule and first task created"
        );

        Ok((schedule, first_task))
    }

    /// Change a schedule's frequency. The next occurrence is recomputed
    /// from the last completion (or creation, if never completed) under the
    /// new frequency; time already served under the old one is not
    /// reinterpreted.
    pub async fn edit_frequency(
        &self,
        schedule_id: Uuid,
        req: EditFrequencyRequest,
    ) -> Result<Schedule, ScheduleError> {
        resolve_interval_days(req.frequency, req.custom_frequency_days)?;

        let schedule = self.get(schedule_id).await?;
        let anchor = schedule.last_completed_date.unwrap_or(schedule.created_at);

        let custom_frequency_days = (req.frequency == Frequency::Custom)
            .then_some(req.custom_frequency_days)
            .flatten();
        let next_due_date = compute_next_due_date(anchor, req.frequency, custom_frequency_days)?;

        let updated = Schedule::update_frequency(
            &self.db.pool,
            schedule_id,
            req.frequency,
            custom_frequency_days,
            next_due_date,
            self.clock.now(),
        )
        .await?;

        info!(
            schedule_id = %schedule_id,
            frequency = %req.frequency,
            next_due_date = %updated.next_due_date,
            "schedule frequency updated"
        );

        Ok(updated)
    }

    /// Pause or resume a schedule. Pausing suppresses next-task generation
    /// on completion; resuming re-enables it from the next completion
    /// onward, with no catch-up for time spent paused.
    pub async fn toggle_active(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        let schedule = self.get(schedule_id).await?;
        let updated = Schedule::set_active(
            &self.db.pool,
            schedule_id,
            !schedule.is_active,
            self.clock.now(),
        )
        .await?;

        info!(schedule_id = %schedule_id, is_active = updated.is_active, "schedule toggled");
        Ok(updated)
    }

    /// Soft removal: deactivates the schedule and leaves every existing
    /// task untouched.
    pub async fn remove(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        self.get(schedule_id).await?;
        let updated =
            Schedule::set_active(&self.db.pool, schedule_id, false, self.clock.now()).await?;

        info!(schedule_id = %schedule_id, "schedule removed (deactivated)");
        Ok(updated)
    }
}
