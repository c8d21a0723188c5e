//! Task status state machine and completion handling, including schedule
//! advancement when a scheduled task completes.

use std::sync::Arc;

use db::{
    DBService,
    models::{
        schedule::Schedule,
        task::{CreateTask, Task, TaskDetails, TaskPhoto, TaskStatus, TaskWithOverdue},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::clock::Clock;
use uuid::Uuid;

use super::schedule::{ScheduleError, compute_next_due_date};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("task not found")]
    NotFound,
    #[error("invalid task transition from {from} to {to}")]
    InvalidStateTransition { from: TaskStatus, to: TaskStatus },
    #[error("completing this task requires at least one photo")]
    PhotoRequired,
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CompleteTaskRequest {
    pub completion_notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub actual_cost: Option<f64>,
    pub cost_notes: Option<String>,
    /// Per-home "require completion photo" policy, supplied by the caller.
    /// When set, at least one photo reference must accompany completion.
    #[serde(default)]
    pub require_photo: bool,
}

/// Result of completing a task: the completed task itself, plus the next
/// occurrence when an active schedule generated one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CompletionOutcome {
    pub task: Task,
    pub next_task: Option<Task>,
}

#[derive(Clone)]
pub struct TaskService {
    db: DBService,
    clock: Arc<dyn Clock>,
}

fn ensure_transition(task: &Task, to: TaskStatus) -> Result<(), TaskError> {
    if task.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(TaskError::InvalidStateTransition {
            from: task.status,
            to,
        })
    }
}

impl TaskService {
    pub fn new(db: DBService, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn create(&self, data: CreateTask) -> Result<Task, TaskError> {
        let task = Task::create(&self.db.pool, &data, Uuid::new_v4(), self.clock.now()).await?;
        info!(task_id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    pub async fn get(&self, id: Uuid) -> Result<TaskDetails, TaskError> {
        let task = Task::find_by_id(&self.db.pool, id)
            .await?
            .ok_or(TaskError::NotFound)?;
        let photos = TaskPhoto::urls_for_task(&self.db.pool, id).await?;
        let overdue = task.is_overdue(self.clock.now());
        Ok(TaskDetails {
            task,
            overdue,
            photos,
        })
    }

    pub async fn list(&self) -> Result<Vec<TaskWithOverdue>, TaskError> {
        let now = self.clock.now();
        let tasks = Task::find_all(&self.db.pool).await?;
        Ok(tasks
            .into_iter()
            .map(|task| {
                let overdue = task.is_overdue(now);
                TaskWithOverdue { task, overdue }
            })
            .collect())
    }

    pub async fn start(&self, id: Uuid) -> Result<Task, TaskError> {
        let task = Task::find_by_id(&self.db.pool, id)
            .await?
            .ok_or(TaskError::NotFound)?;
        ensure_transition(&task, TaskStatus::InProgress)?;

        let task =
            Task::update_status(&self.db.pool, id, TaskStatus::InProgress, self.clock.now())
                .await?;
        info!(task_id = %id, "task started");
        Ok(task)
    }

    /// Complete a task. When the task belongs to a schedule, the schedule
    /// is advanced and the next occurrence conditionally created inside the
    /// same transaction, so completion and generation commit or fail
    /// together.
    pub async fn complete(
        &self,
        id: Uuid,
        req: CompleteTaskRequest,
    ) -> Result<CompletionOutcome, TaskError> {
        let now = self.clock.now();

        let mut tx = self.db.pool.begin().await?;

        let task = Task::find_by_id(&mut *tx, id)
            .await?
            .ok_or(TaskError::NotFound)?;
        ensure_transition(&task, TaskStatus::Completed)?;

        if req.require_photo && req.photos.is_empty() {
            return Err(TaskError::PhotoRequired);
        }

        let task = Task::mark_completed(
            &mut *tx,
            id,
            now,
            req.completion_notes.as_deref(),
            req.actual_cost,
            req.cost_notes.as_deref(),
        )
        .await?;

        if !req.photos.is_empty() {
            TaskPhoto::insert_many(&mut *tx, id, &req.photos).await?;
        }

        let mut next_task = None;
        if let Some(schedule_id) = task.schedule_id {
            // Re-read inside the write transaction: the pause flag checked
            // here is the commit-time value, not an earlier stale read.
            let schedule = Schedule::find_by_id(&mut *tx, schedule_id)
                .await?
                .ok_or(ScheduleError::NotFound("schedule"))?;

            let next_due =
                compute_next_due_date(now, schedule.frequency, schedule.custom_frequency_days)?;
            let schedule =
                Schedule::record_completion(&mut *tx, schedule_id, now, next_due).await?;

            if schedule.is_active {
                next_task = Some(
                    Task::create(
                        &mut *tx,
                        &CreateTask::next_occurrence(&schedule, &task),
                        Uuid::new_v4(),
                        now,
                    )
                    .await?,
                );
            }
        }

        tx.commit().await?;

        info!(
            task_id = %id,
            schedule_id = ?task.schedule_id,
            next_task_id = ?next_task.as_ref().map(|t| t.id),
            "task completed"
        );

        Ok(CompletionOutcome { task, next_task })
    }

    /// Reopen a completed task: back to pending with completion metadata
    /// and photos cleared. Any schedule advancement the completion caused
    /// stays committed; the generated next occurrence is not deleted.
    pub async fn reopen(&self, id: Uuid) -> Result<Task, TaskError> {
        let now = self.clock.now();

        let mut tx = self.db.pool.begin().await?;

        let task = Task::find_by_id(&mut *tx, id)
            .await?
            .ok_or(TaskError::NotFound)?;
        ensure_transition(&task, TaskStatus::Pending)?;

        let task = Task::reopen(&mut *tx, id, now).await?;
        TaskPhoto::delete_for_task(&mut *tx, id).await?;

        tx.commit().await?;

        info!(task_id = %id, "task reopened");
        Ok(task)
    }

    /// Cancel ("delete") a task. The linked schedule, if any, is untouched.
    pub async fn cancel(&self, id: Uuid) -> Result<Task, TaskError> {
        let task = Task::find_by_id(&self.db.pool, id)
            .await?
            .ok_or(TaskError::NotFound)?;
        ensure_transition(&task, TaskStatus::Cancelled)?;

        let task =
            Task::update_status(&self.db.pool, id, TaskStatus::Cancelled, self.clock.now())
                .await?;
        info!(task_id = %id, "task cancelled");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use db::models::{
        schedule::Frequency,
        template::{CreateTemplate, Template},
    };
    use utils::clock::FixedClock;

    use super::*;
    use crate::services::schedule::{ApplyTemplateRequest, EditFrequencyRequest, ScheduleService};

    fn date(s: &str) -> DateTime<Utc> {
        format!("{s}T09:00:00Z").parse().unwrap()
    }

    struct Fixture {
        schedules: ScheduleService,
        tasks: TaskService,
        db: DBService,
        clock: Arc<FixedClock>,
    }

    async fn setup() -> Fixture {
        let db = DBService::new_in_memory().await.unwrap();
        let clock = Arc::new(FixedClock::new(date("2024-01-01")));
        Fixture {
            schedules: ScheduleService::new(db.clone(), clock.clone()),
            tasks: TaskService::new(db.clone(), clock.clone()),
            db,
            clock,
        }
    }

    async fn seed_template(db: &DBService) -> Template {
        Template::create(
            &db.pool,
            &CreateTemplate {
                name: "Flush water heater".to_string(),
                description: None,
                category: "plumbing".to_string(),
                default_frequency: Frequency::Annual,
                instructions: Some("Drain sediment from the tank".to_string()),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn standalone_task(fx: &Fixture, due: Option<DateTime<Utc>>) -> Task {
        fx.tasks
            .create(CreateTask {
                title: "Clean gutters".to_string(),
                description: None,
                due_date: due,
                priority: None,
                asset_id: None,
                template_id: None,
                schedule_id: None,
            })
            .await
            .unwrap()
    }

    async fn scheduled_setup(fx: &Fixture, frequency: Frequency) -> (Schedule, Task) {
        let template = seed_template(&fx.db).await;
        fx.schedules
            .apply_template(
                template.id,
                ApplyTemplateRequest {
                    asset_id: None,
                    frequency,
                    custom_frequency_days: None,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn start_requires_pending() {
        let fx = setup().await;
        let task = standalone_task(&fx, None).await;

        let started = fx.tasks.start(task.id).await.unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);

        let err = fx.tasks.start(task.id).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidStateTransition {
                from: TaskStatus::InProgress,
                to: TaskStatus::InProgress,
            }
        ));
    }

    #[tokio::test]
    async fn complete_allowed_from_pending_and_in_progress() {
        let fx = setup().await;

        let pending = standalone_task(&fx, None).await;
        let outcome = fx
            .tasks
            .complete(pending.id, CompleteTaskRequest::default())
            .await
            .unwrap();
        assert_eq!(outcome.task.status, TaskStatus::Completed);
        assert_eq!(outcome.task.completed_at, Some(date("2024-01-01")));
        assert!(outcome.next_task.is_none());

        let in_progress = standalone_task(&fx, None).await;
        fx.tasks.start(in_progress.id).await.unwrap();
        let outcome = fx
            .tasks
            .complete(in_progress.id, CompleteTaskRequest::default())
            .await
            .unwrap();
        assert_eq!(outcome.task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn cancelled_is_terminal() {
        let fx = setup().await;
        let task = standalone_task(&fx, None).await;

        fx.tasks.cancel(task.id).await.unwrap();

        let err = fx.tasks.cancel(task.id).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidStateTransition { .. }));

        let err = fx
            .tasks
            .complete(task.id, CompleteTaskRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidStateTransition {
                from: TaskStatus::Cancelled,
                to: TaskStatus::Completed,
            }
        ));
    }

    #[tokio::test]
    async fn photo_policy_enforced_when_instructed() {
        let fx = setup().await;
        let task = standalone_task(&fx, None).await;

        let err = fx
            .tasks
            .complete(
                task.id,
                CompleteTaskRequest {
                    require_photo: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::PhotoRequired));

        // The failed attempt must not have completed the task.
        let details = fx.tasks.get(task.id).await.unwrap();
        assert_eq!(details.task.status, TaskStatus::Pending);

        fx.tasks
            .complete(
                task.id,
                CompleteTaskRequest {
                    photos: vec!["photos/after.jpg".to_string()],
                    require_photo: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let details = fx.tasks.get(task.id).await.unwrap();
        assert_eq!(details.photos, vec!["photos/after.jpg".to_string()]);
    }

    #[tokio::test]
    async fn overdue_is_derived_and_pending_only() {
        let fx = setup().await;
        let task = standalone_task(&fx, Some(date("2024-01-10"))).await;

        fx.clock.set(date("2024-02-01"));

        let details = fx.tasks.get(task.id).await.unwrap();
        assert!(details.overdue);
        assert_eq!(details.task.status, TaskStatus::Pending);

        // Starting the task clears the overdue projection even though the
        // due date is unchanged and still in the past.
        fx.tasks.start(task.id).await.unwrap();
        let details = fx.tasks.get(task.id).await.unwrap();
        assert!(!details.overdue);

        let listed = fx.tasks.list().await.unwrap();
        assert!(listed.iter().all(|t| !t.overdue));
    }

    #[tokio::test]
    async fn completing_scheduled_task_advances_exactly_once() {
        let fx = setup().await;
        let (schedule, first) = scheduled_setup(&fx, Frequency::Monthly).await;
        assert_eq!(schedule.next_due_date, date("2024-01-31"));
        assert_eq!(first.due_date, Some(date("2024-01-31")));

        fx.clock.set(date("2024-02-05"));

        let outcome = fx
            .tasks
            .complete(
                first.id,
                CompleteTaskRequest {
                    completion_notes: Some("Filter was filthy".to_string()),
                    actual_cost: Some(18.50),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.task.status, TaskStatus::Completed);
        assert_eq!(outcome.task.actual_cost, Some(18.50));

        let advanced = fx.schedules.get(schedule.id).await.unwrap();
        assert_eq!(advanced.last_completed_date, Some(date("2024-02-05")));
        assert_eq!(advanced.next_due_date, date("2024-03-06"));

        let next = outcome.next_task.expect("next occurrence created");
        assert_eq!(next.status, TaskStatus::Pending);
        assert_eq!(next.due_date, Some(date("2024-03-06")));
        assert_eq!(next.schedule_id, Some(schedule.id));
        assert_eq!(next.title, first.title);

        let occurrences = Task::find_by_schedule_id(&fx.db.pool, schedule.id)
            .await
            .unwrap();
        assert_eq!(occurrences.len(), 2);
    }

    #[tokio::test]
    async fn paused_schedule_records_completion_but_generates_nothing() {
        let fx = setup().await;
        let (schedule, first) = scheduled_setup(&fx, Frequency::Weekly).await;

        fx.schedules.toggle_active(schedule.id).await.unwrap();
        fx.clock.set(date("2024-01-09"));

        let outcome = fx
            .tasks
            .complete(first.id, CompleteTaskRequest::default())
            .await
            .unwrap();
        assert!(outcome.next_task.is_none());

        let paused = fx.schedules.get(schedule.id).await.unwrap();
        assert_eq!(paused.last_completed_date, Some(date("2024-01-09")));
        assert_eq!(paused.next_due_date, date("2024-01-16"));

        let occurrences = Task::find_by_schedule_id(&fx.db.pool, schedule.id)
            .await
            .unwrap();
        assert_eq!(occurrences.len(), 1);
    }

    #[tokio::test]
    async fn reopen_clears_metadata_but_keeps_advancement() {
        let fx = setup().await;
        let (schedule, first) = scheduled_setup(&fx, Frequency::Monthly).await;

        fx.clock.set(date("2024-02-05"));
        let outcome = fx
            .tasks
            .complete(
                first.id,
                CompleteTaskRequest {
                    completion_notes: Some("Done".to_string()),
                    photos: vec!["photos/proof.jpg".to_string()],
                    actual_cost: Some(40.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let next = outcome.next_task.unwrap();

        let reopened = fx.tasks.reopen(first.id).await.unwrap();
        assert_eq!(reopened.status, TaskStatus::Pending);
        assert_eq!(reopened.completed_at, None);
        assert_eq!(reopened.completion_notes, None);
        assert_eq!(reopened.actual_cost, None);

        let details = fx.tasks.get(first.id).await.unwrap();
        assert!(details.photos.is_empty());

        // The advancement stays committed: next_due_date and the generated
        // occurrence are untouched.
        let after = fx.schedules.get(schedule.id).await.unwrap();
        assert_eq!(after.next_due_date, date("2024-03-06"));
        assert_eq!(after.last_completed_date, Some(date("2024-02-05")));
        assert_eq!(
            fx.tasks.get(next.id).await.unwrap().task.status,
            TaskStatus::Pending
        );
    }

    #[tokio::test]
    async fn reopen_requires_completed() {
        let fx = setup().await;
        let task = standalone_task(&fx, None).await;

        let err = fx.tasks.reopen(task.id).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidStateTransition {
                from: TaskStatus::Pending,
                to: TaskStatus::Pending,
            }
        ));
    }

    #[tokio::test]
    async fn edit_frequency_anchors_on_last_completion() {
        let fx = setup().await;
        let (schedule, first) = scheduled_setup(&fx, Frequency::Monthly).await;

        fx.clock.set(date("2024-02-05"));
        fx.tasks
            .complete(first.id, CompleteTaskRequest::default())
            .await
            .unwrap();

        let updated = fx
            .schedules
            .edit_frequency(
                schedule.id,
                EditFrequencyRequest {
                    frequency: Frequency::Weekly,
                    custom_frequency_days: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.next_due_date, date("2024-02-12"));
    }

    #[tokio::test]
    async fn cancel_leaves_schedule_untouched() {
        let fx = setup().await;
        let (schedule, first) = scheduled_setup(&fx, Frequency::Quarterly).await;

        fx.tasks.cancel(first.id).await.unwrap();

        let unchanged = fx.schedules.get(schedule.id).await.unwrap();
        assert!(unchanged.is_active);
        assert_eq!(unchanged.next_due_date, schedule.next_due_date);
        assert_eq!(unchanged.last_completed_date, None);
    }
}
