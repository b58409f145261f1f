use super::lesson::LessonId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Messages the lifecycle sends to students and teachers.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    LessonReminder {
        lesson: LessonId,
        student: String,
        teacher: String,
        starts_at: DateTime<Utc>,
    },
    RescheduleOffer {
        lesson: LessonId,
        student: String,
        respond_by: DateTime<Utc>,
        reschedule_by: DateTime<Utc>,
    },
    /// The teacher missed the lesson; the student picks a refund or a new slot.
    RefundOrReschedule { lesson: LessonId, student: String },
    TeacherSuspended { teacher: String, absences: u32 },
}
