use chrono::{DateTime, Duration, TimeZone, Utc};
use lessonbook::application::commands::{
    BookLessonCommand, CompleteLessonCommand, MarkAbsentCommand, RescheduleCommand,
};
use lessonbook::application::lifecycle::{LessonPorts, LessonService, Outcome};
use lessonbook::application::payments::PaymentGateway;
use lessonbook::application::payout::PayoutGate;
use lessonbook::application::scheduler::Scheduler;
use lessonbook::application::support::SupportDesk;
use lessonbook::domain::lesson::{CompletionStatus, LessonStatus, Party};
use lessonbook::domain::money::{Amount, Balance};
use lessonbook::domain::notification::Notification;
use lessonbook::domain::payout::{PayoutMethod, PayoutStatus};
use lessonbook::domain::pricing::PricingPolicy;
use lessonbook::domain::ticket::{TicketCategory, TicketStatus};
use lessonbook::error::BookingError;
use lessonbook::infrastructure::in_memory::{
    InMemoryLedger, InMemoryLessonStore, InMemoryPayoutStore, InMemoryTaskStore,
    InMemoryTeacherAccounts, InMemoryTicketStore, RecordingNotifier, SimulatedPaymentMethod,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

struct Platform {
    lessons: Arc<LessonService>,
    scheduler: Scheduler,
    payouts: PayoutGate,
    notifier: RecordingNotifier,
    card: SimulatedPaymentMethod,
}

fn platform() -> Platform {
    let notifier = RecordingNotifier::new();
    let card = SimulatedPaymentMethod::approving("card");
    let lessons = Arc::new(LessonService::new(
        PricingPolicy::default(),
        LessonPorts {
            lessons: Box::new(InMemoryLessonStore::new()),
            tasks: Box::new(InMemoryTaskStore::new()),
            teachers: Box::new(InMemoryTeacherAccounts::new()),
            ledger: Box::new(InMemoryLedger::new()),
            notifier: Box::new(notifier.clone()),
            payments: PaymentGateway::new().with(Box::new(card.clone())),
        },
    ));
    Platform {
        scheduler: Scheduler::new(lessons.clone()),
        lessons,
        payouts: PayoutGate::new(Box::new(InMemoryPayoutStore::new())),
        notifier,
        card,
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap()
}

fn booking(lesson: u32, teacher: &str, price: rust_decimal::Decimal) -> BookLessonCommand {
    BookLessonCommand {
        lesson,
        student: format!("s{lesson}"),
        teacher: teacher.into(),
        starts_at: t0() + Duration::days(1),
        duration_minutes: 60,
        price: Amount::new(price).unwrap(),
        payment_method: Some("card".into()),
    }
}

#[tokio::test]
async fn test_booking_to_payout() {
    let p = platform();
    p.lessons.book(booking(1, "t1", dec!(25)), t0()).await.unwrap();
    assert_eq!(p.card.charges().await, vec![("s1".to_string(), Amount::new(dec!(32.10)).unwrap())]);

    // Teacher has nothing to withdraw yet, but the gate only checks the method minimum.
    let early = p
        .payouts
        .request_payout("t1", dec!(5), PayoutMethod::Paypal, t0())
        .await;
    assert!(matches!(early, Err(BookingError::BelowMinimumThreshold { .. })));

    let lesson_end = t0() + Duration::days(1) + Duration::hours(1);
    let outcome = p
        .lessons
        .confirm_completion(
            CompleteLessonCommand {
                lesson: 1,
                student: "s1".into(),
            },
            lesson_end,
        )
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Applied(lessonbook::domain::lesson::Transition::Completed(CompletionStatus::Manual)));
    assert_eq!(
        p.lessons.balances().await.unwrap(),
        vec![("t1".to_string(), Balance::new(dec!(20)))]
    );

    let request = p
        .payouts
        .request_payout("t1", dec!(10), PayoutMethod::Paypal, lesson_end)
        .await
        .unwrap();
    assert_eq!(request.status, PayoutStatus::Pending);
    assert_eq!(request.minimum_threshold, dec!(10));
    assert_eq!(p.payouts.requests_for("t1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_absence_reschedule_and_second_absence() {
    let p = platform();
    let lesson = p.lessons.book(booking(1, "t1", dec!(25)), t0()).await.unwrap();
    let absent_at = lesson.starts_at() + Duration::minutes(15);

    p.lessons
        .mark_absent(
            MarkAbsentCommand {
                lesson: 1,
                party: Party::Student,
            },
            absent_at,
        )
        .await
        .unwrap();
    assert!(p
        .notifier
        .sent()
        .await
        .iter()
        .any(|n| matches!(n, Notification::RescheduleOffer { lesson: 1, .. })));

    let new_start = absent_at + Duration::days(3);
    let outcome = p
        .lessons
        .respond_to_reschedule(RescheduleCommand { lesson: 1, new_start }, absent_at + Duration::hours(2))
        .await
        .unwrap();
    assert!(outcome.is_applied());
    let rescheduled = p.lessons.lesson(1).await.unwrap();
    assert_eq!(rescheduled.status, LessonStatus::Scheduled);
    assert_eq!(rescheduled.starts_at(), new_start);
    assert_eq!(rescheduled.reschedule_count, 1);

    // The unanswered-offer deadline no longer applies once rescheduled.
    p.scheduler.run_due(absent_at + Duration::hours(25)).await.unwrap();
    assert_eq!(p.lessons.lesson(1).await.unwrap().status, LessonStatus::Scheduled);

    // A second absence completes the lesson and pays the teacher.
    p.lessons
        .mark_absent(
            MarkAbsentCommand {
                lesson: 1,
                party: Party::Student,
            },
            new_start + Duration::minutes(10),
        )
        .await
        .unwrap();
    let done = p.lessons.lesson(1).await.unwrap();
    assert_eq!(done.status, LessonStatus::Completed);
    assert_eq!(done.completion_status, CompletionStatus::Auto);
    assert!(done.payment_released);

    // Nothing left for the scheduler that could pay twice.
    let report = p.scheduler.run_due(new_start + Duration::days(10)).await.unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(
        p.lessons.balances().await.unwrap(),
        vec![("t1".to_string(), Balance::new(dec!(20)))]
    );
}

#[tokio::test]
async fn test_suspended_teacher_cannot_be_booked() {
    let p = platform();
    for id in 1..=3 {
        let lesson = p.lessons.book(booking(id, "t9", dec!(30)), t0()).await.unwrap();
        p.lessons
            .mark_absent(
                MarkAbsentCommand {
                    lesson: id,
                    party: Party::Teacher,
                },
                lesson.starts_at() + Duration::minutes(5),
            )
            .await
            .unwrap();
    }
    assert!(p
        .notifier
        .sent()
        .await
        .iter()
        .any(|n| matches!(n, Notification::TeacherSuspended { absences: 3, .. })));

    let result = p.lessons.book(booking(4, "t9", dec!(30)), t0()).await;
    assert!(matches!(result, Err(BookingError::ValidationError(_))));
    assert!(p.lessons.balances().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_support_ticket_defaults() {
    let desk = SupportDesk::new(Box::new(InMemoryTicketStore::new()));
    let ticket = desk
        .file_ticket(
            "s1",
            TicketCategory::Billing,
            "Charged twice",
            "My card shows two charges",
            t0(),
        )
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(desk.tickets_for("s1").await.unwrap(), vec![ticket]);
}
