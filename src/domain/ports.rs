use super::catalog::TeacherProfile;
use super::lesson::{Lesson, LessonId};
use super::money::{Amount, Balance};
use super::notification::Notification;
use super::payout::PayoutRequest;
use super::task::{ScheduledTask, TaskKey};
use super::ticket::SupportTicket;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn get(&self, id: LessonId) -> Result<Option<Lesson>>;
    /// Stores a new lesson, failing with `Conflict` when the id is taken.
    async fn insert(&self, lesson: Lesson) -> Result<Lesson>;
    /// Writes `lesson` only if the stored version still equals `lesson.version`.
    ///
    /// Returns the stored copy with its bumped version, or `Conflict` when
    /// another writer got there first.
    async fn update(&self, lesson: Lesson) -> Result<Lesson>;
    async fn get_all(&self) -> Result<Vec<Lesson>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts or replaces the pending task with the same key.
    async fn schedule(&self, task: ScheduledTask) -> Result<()>;
    /// Tasks due at `now`, earliest first.
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTask>>;
    async fn remove(&self, key: TaskKey) -> Result<()>;
    async fn get_all(&self) -> Result<Vec<ScheduledTask>>;
}

#[async_trait]
pub trait TeacherAccounts: Send + Sync {
    /// Increments and returns the teacher's absence count.
    async fn record_absence(&self, teacher: &str) -> Result<u32>;
    async fn suspend(&self, teacher: &str) -> Result<()>;
    async fn is_suspended(&self, teacher: &str) -> Result<bool>;
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Credits `amount` once per `reference`. Returns `false` if the reference was already applied.
    async fn credit(&self, teacher: &str, amount: Balance, reference: &str) -> Result<bool>;
    async fn balance(&self, teacher: &str) -> Result<Balance>;
    async fn balances(&self) -> Result<Vec<(String, Balance)>>;
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    async fn next_id(&self) -> Result<u64>;
    async fn store(&self, request: PayoutRequest) -> Result<()>;
    async fn for_teacher(&self, teacher: &str) -> Result<Vec<PayoutRequest>>;
    async fn get_all(&self) -> Result<Vec<PayoutRequest>>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn next_id(&self) -> Result<u64>;
    async fn store(&self, ticket: SupportTicket) -> Result<()>;
    async fn for_user(&self, user: &str) -> Result<Vec<SupportTicket>>;
}

#[async_trait]
pub trait TeacherDirectory: Send + Sync {
    async fn all_teachers(&self) -> Result<Vec<TeacherProfile>>;
}

/// Fire-and-forget delivery of user-facing messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<()>;
}

/// A single way of charging a student (card, PayPal, wallet, ...).
#[async_trait]
pub trait PaymentMethodAdapter: Send + Sync {
    fn name(&self) -> &str;
    /// Returns whether the charge went through.
    async fn charge(&self, student: &str, amount: Amount) -> Result<bool>;
}

pub type LessonStoreBox = Box<dyn LessonStore>;
pub type TaskStoreBox = Box<dyn TaskStore>;
pub type TeacherAccountsBox = Box<dyn TeacherAccounts>;
pub type LedgerBox = Box<dyn Ledger>;
pub type PayoutStoreBox = Box<dyn PayoutStore>;
pub type TicketStoreBox = Box<dyn TicketStore>;
pub type TeacherDirectoryBox = Box<dyn TeacherDirectory>;
pub type NotifierBox = Box<dyn Notifier>;
pub type PaymentMethodAdapterBox = Box<dyn PaymentMethodAdapter>;
