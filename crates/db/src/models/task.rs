use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::{schedule::Schedule, template::Template};

/// Stored task status. Overdue is deliberately absent: it is derived at
/// read time from `due_date` (see [`Task::is_overdue`]) so it can never
/// drift out of sync with the stored date.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// The transition table for the task state machine. Reopen is the only
    /// way out of `Completed` back to `Pending`; nothing leaves `Cancelled`.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (Completed, Pending)
                | (Completed, Cancelled)
        )
    }
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// A single actionable maintenance item, standalone or generated as an
/// occurrence of a [`Schedule`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub asset_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub schedule_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_notes: Option<String>,
    pub actual_cost: Option<f64>,
    pub cost_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Read-time overdue projection. Only pending tasks go overdue; a task
    /// started past its due date stays plain in-progress.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.due_date.is_some_and(|due| due < now)
    }
}

/// A task together with its derived overdue flag, as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskWithOverdue {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub overdue: bool,
}

impl std::ops::Deref for TaskWithOverdue {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

/// Full detail view: task, overdue flag, and completion photo references.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub overdue: bool,
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub asset_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub schedule_id: Option<Uuid>,
}

impl CreateTask {
    /// The first occurrence generated when a template is applied.
    pub fn first_occurrence(schedule: &Schedule, template: &Template) -> Self {
        Self {
            title: template.name.clone(),
            description: template
                .instructions
                .clone()
                .or_else(|| template.description.clone()),
            due_date: Some(schedule.next_due_date),
            priority: None,
            asset_id: schedule.asset_id,
            template_id: Some(schedule.template_id),
            schedule_id: Some(schedule.id),
        }
    }

    /// The next occurrence generated when a scheduled task completes.
    /// Carries title/description/priority forward from the completed task.
    pub fn next_occurrence(schedule: &Schedule, previous: &Task) -> Self {
        Self {
            title: previous.title.clone(),
            description: previous.description.clone(),
            due_date: Some(schedule.next_due_date),
            priority: Some(previous.priority),
            asset_id: schedule.asset_id,
            template_id: Some(schedule.template_id),
            schedule_id: Some(schedule.id),
        }
    }
}

const TASK_COLUMNS: &str = "id, title, description, due_date, priority, status, asset_id, \
     template_id, schedule_id, completed_at, completion_notes, actual_cost, cost_notes, \
     created_at, updated_at";

impl Task {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
               ORDER BY due_date IS NULL, due_date ASC, created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_schedule_id(
        pool: &SqlitePool,
        schedule_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
               WHERE schedule_id = $1
               ORDER BY created_at ASC"
        ))
        .bind(schedule_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateTask,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let priority = data.priority.unwrap_or_default();
        sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, title, description, due_date, priority, status,
                                asset_id, template_id, schedule_id, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $9)
               RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.due_date)
        .bind(priority)
        .bind(data.asset_id)
        .bind(data.template_id)
        .bind(data.schedule_id)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn mark_completed<'e, E>(
        executor: E,
        id: Uuid,
        completed_at: DateTime<Utc>,
        completion_notes: Option<&str>,
        actual_cost: Option<f64>,
        cost_notes: Option<&str>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
               SET status = 'completed', completed_at = $2, completion_notes = $3,
                   actual_cost = $4, cost_notes = $5, updated_at = $2
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(completed_at)
        .bind(completion_notes)
        .bind(actual_cost)
        .bind(cost_notes)
        .fetch_one(executor)
        .await
    }

    /// Put a completed task back to pending, clearing completion metadata.
    pub async fn reopen<'e, E>(
        executor: E,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
               SET status = 'pending', completed_at = NULL, completion_notes = NULL,
                   actual_cost = NULL, cost_notes = NULL, updated_at = $2
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(now)
        .fetch_one(executor)
        .await
    }
}

/// Completion photo reference, one row per photo (no JSON-encoded lists).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TaskPhoto {
    pub id: Uuid,
    pub task_id: Uuid,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
}

impl TaskPhoto {
    pub async fn insert_many(
        conn: &mut sqlx::SqliteConnection,
        task_id: Uuid,
        photo_urls: &[String],
    ) -> Result<(), sqlx::Error> {
        for url in photo_urls {
            sqlx::query("INSERT INTO task_photos (id, task_id, photo_url) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(task_id)
                .bind(url)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    pub async fn urls_for_task<'e, E>(executor: E, task_id: Uuid) -> Result<Vec<String>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, String>(
            "SELECT photo_url FROM task_photos WHERE task_id = $1 ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(executor)
        .await
    }

    pub async fn delete_for_task<'e, E>(executor: E, task_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM task_photos WHERE task_id = $1")
            .bind(task_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
