use super::pricing::PriceBreakdown;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type LessonId = u32;

/// Lead time of the reminder sent before a lesson starts.
pub const REMINDER_LEAD: Duration = Duration::minutes(30);
/// Grace period after a lesson ends before it is completed automatically.
pub const AUTO_COMPLETE_GRACE: Duration = Duration::hours(48);
/// How far ahead a missed lesson may be moved.
pub const RESCHEDULE_WINDOW: Duration = Duration::days(7);
/// How long a student has to answer a reschedule offer.
pub const RESPONSE_WINDOW: Duration = Duration::hours(24);
/// Reschedules granted per lesson before absences force completion.
pub const MAX_RESCHEDULES: u8 = 1;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum LessonStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
    NoShow,
}

impl LessonStatus {
    /// Terminal lessons accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Pending,
    Attended,
    Absent,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Pending,
    Manual,
    Auto,
    Disputed,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Student,
    Teacher,
}

macro_rules! display_via_serde {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match serde_json::to_value(self) {
                    Ok(serde_json::Value::String(s)) => f.write_str(&s),
                    _ => write!(f, "{self:?}"),
                }
            }
        }
    )*};
}

display_via_serde!(LessonStatus, AttendanceStatus, CompletionStatus, Party);

/// Why a lifecycle operation left a lesson untouched.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum TransitionRejected {
    #[error("lesson is already {0}")]
    Terminal(LessonStatus),
    #[error("completion already recorded as {0}")]
    NotPending(CompletionStatus),
    #[error("lesson is {0}, expected {1}")]
    WrongStatus(LessonStatus, LessonStatus),
    #[error("deadline not reached yet")]
    NotDue,
    #[error("reschedule response window has closed")]
    ResponseWindowClosed,
    #[error("new start is outside the reschedule window")]
    OutsideRescheduleWindow,
}

/// What a successful lifecycle operation did to a lesson.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Transition {
    Attended,
    RescheduleOffered {
        response_deadline: DateTime<Utc>,
        reschedule_deadline: DateTime<Utc>,
    },
    Rescheduled {
        starts_at: DateTime<Utc>,
    },
    Completed(CompletionStatus),
    Cancelled,
}

/// A scheduled teaching session between a student and a teacher.
///
/// The price breakdown is computed once by the booking flow and never
/// touched again. Every state change goes through one of the transition
/// methods below, which refuse to modify a terminal lesson.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Lesson {
    pub id: LessonId,
    pub student: String,
    pub teacher: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pricing: PriceBreakdown,
    pub status: LessonStatus,
    pub attendance_status: AttendanceStatus,
    pub completion_status: CompletionStatus,
    pub reschedule_count: u8,
    pub auto_complete_at: DateTime<Utc>,
    pub reschedule_deadline: Option<DateTime<Utc>>,
    pub response_deadline: Option<DateTime<Utc>>,
    pub payment_released: bool,
    /// Bumped by the store on every successful write.
    pub version: u64,
}

impl Lesson {
    pub fn book(
        id: LessonId,
        student: String,
        teacher: String,
        starts_at: DateTime<Utc>,
        duration_minutes: u32,
        pricing: PriceBreakdown,
    ) -> Self {
        let mut lesson = Self {
            id,
            student,
            teacher,
            date: starts_at.date_naive(),
            start_time: starts_at.time(),
            duration_minutes,
            pricing,
            status: LessonStatus::Scheduled,
            attendance_status: AttendanceStatus::Pending,
            completion_status: CompletionStatus::Pending,
            reschedule_count: 0,
            auto_complete_at: starts_at,
            reschedule_deadline: None,
            response_deadline: None,
            payment_released: false,
            version: 0,
        };
        lesson.auto_complete_at = lesson.ends_at() + AUTO_COMPLETE_GRACE;
        lesson
    }

    pub fn pricing(&self) -> &PriceBreakdown {
        &self.pricing
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.start_time).and_utc()
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at() + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn reminder_at(&self) -> DateTime<Utc> {
        self.starts_at() - REMINDER_LEAD
    }

    fn ensure_active(&self) -> Result<(), TransitionRejected> {
        if self.status.is_terminal() {
            Err(TransitionRejected::Terminal(self.status))
        } else {
            Ok(())
        }
    }

    fn ensure_pending(&self) -> Result<(), TransitionRejected> {
        self.ensure_active()?;
        if self.completion_status != CompletionStatus::Pending {
            return Err(TransitionRejected::NotPending(self.completion_status));
        }
        Ok(())
    }

    fn complete(&mut self, how: CompletionStatus) -> Transition {
        self.status = LessonStatus::Completed;
        self.completion_status = how;
        self.response_deadline = None;
        Transition::Completed(how)
    }

    /// Records that both parties showed up.
    pub fn mark_attended(&mut self) -> Result<Transition, TransitionRejected> {
        self.ensure_pending()?;
        if self.status != LessonStatus::Scheduled {
            return Err(TransitionRejected::WrongStatus(
                self.status,
                LessonStatus::Scheduled,
            ));
        }
        self.attendance_status = AttendanceStatus::Attended;
        Ok(Transition::Attended)
    }

    /// First absence buys one reschedule; any later absence completes the lesson.
    pub fn mark_student_absent(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionRejected> {
        self.ensure_pending()?;
        self.attendance_status = AttendanceStatus::Absent;
        if self.reschedule_count >= MAX_RESCHEDULES {
            return Ok(self.complete(CompletionStatus::Auto));
        }

        let response_deadline = now + RESPONSE_WINDOW;
        let reschedule_deadline = now + RESCHEDULE_WINDOW;
        self.status = LessonStatus::Rescheduled;
        self.reschedule_count += 1;
        self.response_deadline = Some(response_deadline);
        self.reschedule_deadline = Some(reschedule_deadline);
        Ok(Transition::RescheduleOffered {
            response_deadline,
            reschedule_deadline,
        })
    }

    pub fn mark_teacher_absent(&mut self) -> Result<Transition, TransitionRejected> {
        self.ensure_active()?;
        self.status = LessonStatus::Cancelled;
        self.attendance_status = AttendanceStatus::Absent;
        self.response_deadline = None;
        Ok(Transition::Cancelled)
    }

    /// Moves a rescheduled lesson back to `scheduled` at a new start time.
    pub fn reschedule(
        &mut self,
        new_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionRejected> {
        self.ensure_pending()?;
        if self.status != LessonStatus::Rescheduled {
            return Err(TransitionRejected::WrongStatus(
                self.status,
                LessonStatus::Rescheduled,
            ));
        }
        if self.response_deadline.is_none_or(|deadline| now > deadline) {
            return Err(TransitionRejected::ResponseWindowClosed);
        }
        if new_start <= now
            || self
                .reschedule_deadline
                .is_none_or(|deadline| new_start > deadline)
        {
            return Err(TransitionRejected::OutsideRescheduleWindow);
        }

        self.date = new_start.date_naive();
        self.start_time = new_start.time();
        self.status = LessonStatus::Scheduled;
        self.attendance_status = AttendanceStatus::Pending;
        self.response_deadline = None;
        self.auto_complete_at = self.ends_at() + AUTO_COMPLETE_GRACE;
        Ok(Transition::Rescheduled {
            starts_at: new_start,
        })
    }

    /// Student confirmed the lesson took place. Not accepted before it starts.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<Transition, TransitionRejected> {
        self.ensure_pending()?;
        if self.status != LessonStatus::Scheduled {
            return Err(TransitionRejected::WrongStatus(
                self.status,
                LessonStatus::Scheduled,
            ));
        }
        if now < self.starts_at() {
            return Err(TransitionRejected::NotDue);
        }
        self.attendance_status = AttendanceStatus::Attended;
        Ok(self.complete(CompletionStatus::Manual))
    }

    /// Backstop run at `auto_complete_at`.
    pub fn auto_complete(&mut self, now: DateTime<Utc>) -> Result<Transition, TransitionRejected> {
        self.ensure_pending()?;
        if now < self.auto_complete_at {
            return Err(TransitionRejected::NotDue);
        }
        Ok(self.complete(CompletionStatus::Auto))
    }

    /// Completes a rescheduled lesson whose offer went unanswered.
    pub fn expire_reschedule_offer(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionRejected> {
        self.ensure_pending()?;
        if self.status != LessonStatus::Rescheduled {
            return Err(TransitionRejected::WrongStatus(
                self.status,
                LessonStatus::Rescheduled,
            ));
        }
        match self.response_deadline {
            Some(deadline) if now >= deadline => Ok(self.complete(CompletionStatus::Auto)),
            _ => Err(TransitionRejected::NotDue),
        }
    }

    /// Whether teacher earnings are owed and have not been credited yet.
    pub fn payment_due(&self) -> bool {
        self.status == LessonStatus::Completed && !self.payment_released
    }
}
