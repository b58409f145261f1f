//! One command type per lifecycle operation, carrying only what that operation may change.

use crate::domain::lesson::{LessonId, Party};
use crate::domain::money::Amount;
use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct BookLessonCommand {
    pub lesson: LessonId,
    pub student: String,
    pub teacher: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub price: Amount,
    /// Adapter to charge the student through; `None` when payment is settled elsewhere.
    pub payment_method: Option<String>,
}

impl BookLessonCommand {
    pub fn validate(&self) -> Result<()> {
        if self.student.trim().is_empty() {
            return Err(BookingError::ValidationError("student is required".into()));
        }
        if self.teacher.trim().is_empty() {
            return Err(BookingError::ValidationError("teacher is required".into()));
        }
        if self.student == self.teacher {
            return Err(BookingError::ValidationError(
                "student and teacher must differ".into(),
            ));
        }
        if self.duration_minutes == 0 {
            return Err(BookingError::ValidationError(
                "duration must be at least one minute".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkAbsentCommand {
    pub lesson: LessonId,
    pub party: Party,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkAttendedCommand {
    pub lesson: LessonId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompleteLessonCommand {
    pub lesson: LessonId,
    /// Must be the lesson's own student.
    pub student: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescheduleCommand {
    pub lesson: LessonId,
    pub new_start: DateTime<Utc>,
}
