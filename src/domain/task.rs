use super::lesson::LessonId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failed attempts after which a task is dropped from the store.
pub const MAX_TASK_ATTEMPTS: u32 = 10;

/// Delay before the next attempt: one minute, doubling per failure, capped at an hour.
pub fn retry_delay(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(6);
    Duration::minutes(1 << exponent).min(Duration::hours(1))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Reminder,
    RescheduleResponse,
    AutoComplete,
    ReleasePayment,
}

/// Idempotency key of a scheduled transition: one pending task per lesson and kind.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct TaskKey {
    pub lesson: LessonId,
    pub kind: TaskKind,
}

impl TaskKey {
    pub fn new(lesson: LessonId, kind: TaskKind) -> Self {
        Self { lesson, kind }
    }

    /// Stable byte encoding used as a storage key.
    pub fn to_bytes(self) -> [u8; 5] {
        let mut bytes = [0u8; 5];
        bytes[..4].copy_from_slice(&self.lesson.to_be_bytes());
        bytes[4] = self.kind as u8;
        bytes
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.lesson, self.kind)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ScheduledTask {
    pub key: TaskKey,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl ScheduledTask {
    pub fn new(lesson: LessonId, kind: TaskKind, due_at: DateTime<Utc>) -> Self {
        Self {
            key: TaskKey::new(lesson, kind),
            due_at,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Records a failed attempt and pushes the task back by the retry delay.
    pub fn record_failure(&mut self, error: String, now: DateTime<Utc>) {
        self.attempts += 1;
        self.last_error = Some(error);
        self.due_at = now + retry_delay(self.attempts);
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= MAX_TASK_ATTEMPTS
    }
}
