use super::lifecycle::LessonService;
use crate::domain::task::{ScheduledTask, TaskKind};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub dispatched: usize,
    /// Failed and put back with a later due time.
    pub failed: usize,
    /// Failed for the last allowed time and dropped.
    pub abandoned: usize,
}

/// Executes due tasks from the task store against the lifecycle service.
///
/// A task is removed only after its handler succeeded; a failing handler
/// leaves the task in place with its attempt count bumped and its due time
/// pushed back, so later runs pick it up again. After
/// [`MAX_TASK_ATTEMPTS`](crate::domain::task::MAX_TASK_ATTEMPTS) failures the task is dropped and logged as an error.
/// Handlers are idempotent, so redelivery is harmless.
#[derive(Clone)]
pub struct Scheduler {
    service: Arc<LessonService>,
}

impl Scheduler {
    pub fn new(service: Arc<LessonService>) -> Self {
        Self { service }
    }

    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        for mut task in self.service.tasks.due(now).await? {
            match self.dispatch(&task, now).await {
                Ok(()) => {
                    report.dispatched += 1;
                    if let Err(error) = self.service.tasks.remove(task.key).await {
                        tracing::warn!(task = %task.key, %error, "finished task not removed, it will be redelivered");
                    }
                }
                Err(error) => {
                    task.record_failure(error.to_string(), now);
                    if task.exhausted() {
                        tracing::error!(task = %task.key, attempts = task.attempts, %error, "task abandoned");
                        report.abandoned += 1;
                        if let Err(error) = self.service.tasks.remove(task.key).await {
                            tracing::warn!(task = %task.key, %error, "abandoned task not removed");
                        }
                    } else {
                        tracing::warn!(task = %task.key, attempts = task.attempts, retry_at = %task.due_at, %error, "task failed");
                        report.failed += 1;
                        let key = task.key;
                        if let Err(error) = self.service.tasks.schedule(task).await {
                            tracing::warn!(task = %key, %error, "task retry not recorded");
                        }
                    }
                }
            }
        }
        if report != DispatchReport::default() {
            tracing::debug!(?report, %now, "scheduler run finished");
        }
        Ok(report)
    }

    async fn dispatch(&self, task: &ScheduledTask, now: DateTime<Utc>) -> Result<()> {
        let lesson = task.key.lesson;
        match task.key.kind {
            TaskKind::Reminder => {
                self.service.send_reminder(lesson).await?;
            }
            TaskKind::RescheduleResponse => {
                self.service.expire_reschedule_offer(lesson, now).await?;
            }
            TaskKind::AutoComplete => {
                self.service.auto_complete(lesson, now).await?;
            }
            TaskKind::ReleasePayment => {
                self.service.release_payment(lesson).await?;
            }
        }
        Ok(())
    }

    /// Polls the task store on a fixed period until the handle is stopped.
    pub fn spawn(self, period: Duration) -> SchedulerHandle {
        let (stop, mut stopped) = mpsc::channel(1);
        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            tracing::info!(?period, "scheduler started");
            loop {
                select! {
                    _ = interval.tick() => {
                        if let Err(error) = self.run_due(Utc::now()).await {
                            tracing::error!(%error, "scheduler run failed");
                        }
                    }
                    _ = stopped.recv() => break,
                }
            }
            tracing::info!("scheduler stopped");
        });
        SchedulerHandle { stop, join }
    }
}

pub struct SchedulerHandle {
    stop: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn stop(self) {
        let _ = self.stop.send(()).await;
        let _ = self.join.await;
    }
}
