use super::commands::{
    BookLessonCommand, CompleteLessonCommand, MarkAbsentCommand, MarkAttendedCommand,
    RescheduleCommand,
};
use super::payments::PaymentGateway;
use crate::domain::lesson::{Lesson, LessonId, Party, Transition, TransitionRejected};
use crate::domain::money::{Amount, Balance};
use crate::domain::notification::Notification;
use crate::domain::ports::{
    LedgerBox, LessonStoreBox, NotifierBox, TaskStoreBox, TeacherAccountsBox,
};
use crate::domain::pricing::PricingPolicy;
use crate::domain::task::{ScheduledTask, TaskKey, TaskKind};
use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};

/// Teacher absences after which the account is suspended.
pub const SUSPENSION_THRESHOLD: u32 = 3;

/// Optimistic write attempts before a transition gives up with `Conflict`.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Result of a lifecycle operation that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied(Transition),
    /// The lesson was left untouched, e.g. because it is already terminal.
    Ignored(TransitionRejected),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Everything the lifecycle talks to outside its own rules.
pub struct LessonPorts {
    pub lessons: LessonStoreBox,
    pub tasks: TaskStoreBox,
    pub teachers: TeacherAccountsBox,
    pub ledger: LedgerBox,
    pub notifier: NotifierBox,
    pub payments: PaymentGateway,
}

/// Drives lessons through booking, attendance, completion and payment release.
///
/// Every state change is a read-modify-write against the lesson store guarded
/// by the lesson's version, so two triggers racing for the same lesson (a
/// student confirmation and the auto-completion backstop, say) resolve to a
/// single winner. Time-driven follow-ups are written to the task store and
/// executed later by the [`Scheduler`](super::scheduler::Scheduler).
pub struct LessonService {
    pricing: PricingPolicy,
    lessons: LessonStoreBox,
    pub(crate) tasks: TaskStoreBox,
    teachers: TeacherAccountsBox,
    ledger: LedgerBox,
    notifier: NotifierBox,
    payments: PaymentGateway,
}

impl LessonService {
    pub fn new(pricing: PricingPolicy, ports: LessonPorts) -> Self {
        Self {
            pricing,
            lessons: ports.lessons,
            tasks: ports.tasks,
            teachers: ports.teachers,
            ledger: ports.ledger,
            notifier: ports.notifier,
            payments: ports.payments,
        }
    }

    pub async fn lesson(&self, id: LessonId) -> Result<Lesson> {
        self.lessons
            .get(id)
            .await?
            .ok_or_else(|| BookingError::not_found("lesson", id))
    }

    pub async fn lessons(&self) -> Result<Vec<Lesson>> {
        self.lessons.get_all().await
    }

    pub async fn balances(&self) -> Result<Vec<(String, Balance)>> {
        self.ledger.balances().await
    }

    /// Creates a scheduled lesson and queues its reminder and auto-completion.
    pub async fn book(&self, cmd: BookLessonCommand, now: DateTime<Utc>) -> Result<Lesson> {
        cmd.validate()?;
        if cmd.starts_at <= now {
            return Err(BookingError::ValidationError(format!(
                "lesson {} must start in the future",
                cmd.lesson
            )));
        }
        if self.lessons.get(cmd.lesson).await?.is_some() {
            return Err(BookingError::ValidationError(format!(
                "lesson {} is already booked",
                cmd.lesson
            )));
        }
        if self.teachers.is_suspended(&cmd.teacher).await? {
            return Err(BookingError::ValidationError(format!(
                "teacher {} is suspended",
                cmd.teacher
            )));
        }

        let pricing = self.pricing.quote(cmd.price)?;
        if let Some(method) = &cmd.payment_method {
            let total = Amount::new(pricing.total_amount)?;
            self.payments.charge(method, &cmd.student, total).await?;
        }

        let lesson = self
            .lessons
            .insert(Lesson::book(
                cmd.lesson,
                cmd.student,
                cmd.teacher,
                cmd.starts_at,
                cmd.duration_minutes,
                pricing,
            ))
            .await?;

        self.schedule(lesson.id, TaskKind::Reminder, lesson.reminder_at())
            .await?;
        self.schedule(lesson.id, TaskKind::AutoComplete, lesson.auto_complete_at)
            .await?;

        tracing::info!(
            lesson = lesson.id,
            student = %lesson.student,
            teacher = %lesson.teacher,
            total = %lesson.pricing().total_amount,
            "lesson booked"
        );
        Ok(lesson)
    }

    pub async fn mark_attended(&self, cmd: MarkAttendedCommand, now: DateTime<Utc>) -> Result<Outcome> {
        self.transition(cmd.lesson, now, |lesson| lesson.mark_attended())
            .await
    }

    pub async fn mark_absent(&self, cmd: MarkAbsentCommand, now: DateTime<Utc>) -> Result<Outcome> {
        match cmd.party {
            Party::Student => {
                self.transition(cmd.lesson, now, |lesson| lesson.mark_student_absent(now))
                    .await
            }
            Party::Teacher => {
                self.transition(cmd.lesson, now, |lesson| lesson.mark_teacher_absent())
                    .await
            }
        }
    }

    pub async fn respond_to_reschedule(
        &self,
        cmd: RescheduleCommand,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        self.transition(cmd.lesson, now, |lesson| lesson.reschedule(cmd.new_start, now))
            .await
    }

    /// Manual completion by the lesson's student.
    pub async fn confirm_completion(
        &self,
        cmd: CompleteLessonCommand,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let lesson = self.lesson(cmd.lesson).await?;
        if lesson.student != cmd.student {
            return Err(BookingError::ValidationError(format!(
                "{} is not the student of lesson {}",
                cmd.student, cmd.lesson
            )));
        }
        self.transition(cmd.lesson, now, |lesson| lesson.confirm(now))
            .await
    }

    /// Completes the lesson if it is still pending at its auto-complete deadline.
    pub async fn auto_complete(&self, id: LessonId, now: DateTime<Utc>) -> Result<Outcome> {
        self.transition(id, now, |lesson| lesson.auto_complete(now))
            .await
    }

    /// Completes a rescheduled lesson whose student never answered the offer.
    pub async fn expire_reschedule_offer(&self, id: LessonId, now: DateTime<Utc>) -> Result<Outcome> {
        self.transition(id, now, |lesson| lesson.expire_reschedule_offer(now))
            .await
    }

    /// Sends the pre-lesson reminder if the lesson is still on.
    pub async fn send_reminder(&self, id: LessonId) -> Result<bool> {
        let lesson = self.lesson(id).await?;
        if lesson.status != crate::domain::lesson::LessonStatus::Scheduled {
            tracing::debug!(lesson = id, status = %lesson.status, "reminder skipped");
            return Ok(false);
        }
        self.notify(Notification::LessonReminder {
            lesson: id,
            student: lesson.student.clone(),
            teacher: lesson.teacher.clone(),
            starts_at: lesson.starts_at(),
        })
        .await;
        Ok(true)
    }

    /// Credits the teacher for a completed lesson, at most once.
    ///
    /// The ledger credit is keyed by lesson, so a crash between the credit
    /// and the flag write is repaired by simply running this again.
    pub async fn release_payment(&self, id: LessonId) -> Result<bool> {
        let lesson = self.lesson(id).await?;
        if !lesson.payment_due() {
            self.tasks
                .remove(TaskKey::new(id, TaskKind::ReleasePayment))
                .await?;
            return Ok(false);
        }

        let earnings = Balance::new(lesson.pricing().teacher_earnings());
        let credited = self
            .ledger
            .credit(&lesson.teacher, earnings, &format!("lesson-{id}"))
            .await?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut lesson = self.lesson(id).await?;
            if lesson.payment_released {
                break;
            }
            lesson.payment_released = true;
            match self.lessons.update(lesson).await {
                Ok(_) => break,
                Err(BookingError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        self.tasks
            .remove(TaskKey::new(id, TaskKind::ReleasePayment))
            .await?;

        if credited {
            tracing::info!(lesson = id, teacher = %lesson.teacher, amount = %earnings.0, "payment released");
        }
        Ok(credited)
    }

    async fn transition<F>(&self, id: LessonId, now: DateTime<Utc>, op: F) -> Result<Outcome>
    where
        F: Fn(&mut Lesson) -> std::result::Result<Transition, TransitionRejected>,
    {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut lesson = self.lesson(id).await?;
            let transition = match op(&mut lesson) {
                Ok(transition) => transition,
                Err(rejected) => {
                    tracing::warn!(lesson = id, status = %lesson.status, reason = %rejected, "transition ignored");
                    // A completion whose follow-up was lost is settled by the next trigger.
                    if lesson.payment_due() {
                        self.release_payment(id).await?;
                    }
                    return Ok(Outcome::Ignored(rejected));
                }
            };

            match self.lessons.update(lesson).await {
                Ok(stored) => {
                    tracing::info!(lesson = id, status = %stored.status, ?transition, "lesson transitioned");
                    self.after_transition(&stored, transition, now).await?;
                    return Ok(Outcome::Applied(transition));
                }
                Err(BookingError::Conflict(_)) => {
                    tracing::debug!(lesson = id, "concurrent update, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(BookingError::Conflict(id))
    }

    async fn after_transition(
        &self,
        lesson: &Lesson,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match transition {
            Transition::Attended => {}
            Transition::RescheduleOffered {
                response_deadline,
                reschedule_deadline,
            } => {
                self.tasks
                    .remove(TaskKey::new(lesson.id, TaskKind::Reminder))
                    .await?;
                self.schedule(lesson.id, TaskKind::RescheduleResponse, response_deadline)
                    .await?;
                self.notify(Notification::RescheduleOffer {
                    lesson: lesson.id,
                    student: lesson.student.clone(),
                    respond_by: response_deadline,
                    reschedule_by: reschedule_deadline,
                })
                .await;
            }
            Transition::Rescheduled { .. } => {
                self.tasks
                    .remove(TaskKey::new(lesson.id, TaskKind::RescheduleResponse))
                    .await?;
                self.schedule(lesson.id, TaskKind::Reminder, lesson.reminder_at())
                    .await?;
                self.schedule(lesson.id, TaskKind::AutoComplete, lesson.auto_complete_at)
                    .await?;
            }
            Transition::Completed(_) => {
                self.schedule(lesson.id, TaskKind::ReleasePayment, now)
                    .await?;
                if let Err(error) = self.release_payment(lesson.id).await {
                    tracing::warn!(lesson = lesson.id, %error, "payment release deferred to scheduler");
                }
                self.clear_pending(lesson.id).await?;
            }
            Transition::Cancelled => {
                self.clear_pending(lesson.id).await?;
                self.on_teacher_absence(lesson).await?;
            }
        }
        Ok(())
    }

    async fn on_teacher_absence(&self, lesson: &Lesson) -> Result<()> {
        let absences = self.teachers.record_absence(&lesson.teacher).await?;
        tracing::info!(teacher = %lesson.teacher, absences, "teacher absence recorded");
        if absences == SUSPENSION_THRESHOLD {
            self.teachers.suspend(&lesson.teacher).await?;
            tracing::warn!(teacher = %lesson.teacher, absences, "teacher suspended");
            self.notify(Notification::TeacherSuspended {
                teacher: lesson.teacher.clone(),
                absences,
            })
            .await;
        }
        self.notify(Notification::RefundOrReschedule {
            lesson: lesson.id,
            student: lesson.student.clone(),
        })
        .await;
        Ok(())
    }

    async fn clear_pending(&self, id: LessonId) -> Result<()> {
        for kind in [
            TaskKind::Reminder,
            TaskKind::RescheduleResponse,
            TaskKind::AutoComplete,
        ] {
            self.tasks.remove(TaskKey::new(id, kind)).await?;
        }
        Ok(())
    }

    async fn schedule(&self, id: LessonId, kind: TaskKind, due_at: DateTime<Utc>) -> Result<()> {
        tracing::debug!(lesson = id, ?kind, %due_at, "task scheduled");
        self.tasks
            .schedule(ScheduledTask::new(id, kind, due_at))
            .await
    }

    async fn notify(&self, notification: Notification) {
        if let Err(error) = self.notifier.send(notification).await {
            tracing::warn!(%error, "notification not delivered");
        }
    }
}
