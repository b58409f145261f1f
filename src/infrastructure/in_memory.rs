use crate::domain::catalog::TeacherProfile;
use crate::domain::lesson::{Lesson, LessonId};
use crate::domain::money::{Amount, Balance};
use crate::domain::notification::Notification;
use crate::domain::payout::PayoutRequest;
use crate::domain::ports::{
    LessonStore, Ledger, Notifier, PaymentMethodAdapter, PayoutStore, TaskStore, TeacherAccounts,
    TeacherDirectory, TicketStore,
};
use crate::domain::task::{ScheduledTask, TaskKey};
use crate::domain::ticket::SupportTicket;
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// A thread-safe in-memory lesson store with optimistic version checks.
///
/// Cloning shares the underlying map, so tests can keep a handle to inspect
/// what the service wrote.
#[derive(Default, Clone)]
pub struct InMemoryLessonStore {
    lessons: Arc<RwLock<HashMap<LessonId, Lesson>>>,
}

impl InMemoryLessonStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LessonStore for InMemoryLessonStore {
    async fn get(&self, id: LessonId) -> Result<Option<Lesson>> {
        let lessons = self.lessons.read().await;
        Ok(lessons.get(&id).cloned())
    }

    async fn insert(&self, mut lesson: Lesson) -> Result<Lesson> {
        let mut lessons = self.lessons.write().await;
        if lessons.contains_key(&lesson.id) {
            return Err(BookingError::Conflict(lesson.id));
        }
        lesson.version = 1;
        lessons.insert(lesson.id, lesson.clone());
        Ok(lesson)
    }

    async fn update(&self, mut lesson: Lesson) -> Result<Lesson> {
        let mut lessons = self.lessons.write().await;
        let stored = lessons
            .get(&lesson.id)
            .ok_or_else(|| BookingError::not_found("lesson", lesson.id))?;
        if stored.version != lesson.version {
            return Err(BookingError::Conflict(lesson.id));
        }
        lesson.version += 1;
        lessons.insert(lesson.id, lesson.clone());
        Ok(lesson)
    }

    async fn get_all(&self) -> Result<Vec<Lesson>> {
        let lessons = self.lessons.read().await;
        let mut all: Vec<Lesson> = lessons.values().cloned().collect();
        all.sort_by_key(|l| l.id);
        Ok(all)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<BTreeMap<TaskKey, ScheduledTask>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn schedule(&self, task: ScheduledTask) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.key, task);
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTask>> {
        let tasks = self.tasks.read().await;
        let mut due: Vec<ScheduledTask> =
            tasks.values().filter(|t| t.is_due(now)).cloned().collect();
        due.sort_by_key(|t| (t.due_at, t.key));
        Ok(due)
    }

    async fn remove(&self, key: TaskKey) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(&key);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<ScheduledTask>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTeacherAccounts {
    absences: Arc<RwLock<HashMap<String, u32>>>,
    suspended: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryTeacherAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeacherAccounts for InMemoryTeacherAccounts {
    async fn record_absence(&self, teacher: &str) -> Result<u32> {
        let mut absences = self.absences.write().await;
        let count = absences.entry(teacher.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn suspend(&self, teacher: &str) -> Result<()> {
        self.suspended.write().await.insert(teacher.to_string());
        Ok(())
    }

    async fn is_suspended(&self, teacher: &str) -> Result<bool> {
        Ok(self.suspended.read().await.contains(teacher))
    }
}

#[derive(Default)]
struct LedgerState {
    balances: BTreeMap<String, Balance>,
    applied: HashSet<String>,
}

/// Teacher balances, credited at most once per reference.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn credit(&self, teacher: &str, amount: Balance, reference: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.applied.contains(reference) {
            return Ok(false);
        }
        let current = state.balances.get(teacher).copied().unwrap_or_default();
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| BookingError::balance_overflow(teacher))?;
        state.balances.insert(teacher.to_string(), updated);
        state.applied.insert(reference.to_string());
        Ok(true)
    }

    async fn balance(&self, teacher: &str) -> Result<Balance> {
        let state = self.state.read().await;
        Ok(state.balances.get(teacher).copied().unwrap_or_default())
    }

    async fn balances(&self) -> Result<Vec<(String, Balance)>> {
        let state = self.state.read().await;
        Ok(state
            .balances
            .iter()
            .map(|(teacher, balance)| (teacher.clone(), *balance))
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPayoutStore {
    next: Arc<AtomicU64>,
    requests: Arc<RwLock<BTreeMap<u64, PayoutRequest>>>,
}

impl InMemoryPayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayoutStore for InMemoryPayoutStore {
    async fn next_id(&self) -> Result<u64> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn store(&self, request: PayoutRequest) -> Result<()> {
        self.requests.write().await.insert(request.id, request);
        Ok(())
    }

    async fn for_teacher(&self, teacher: &str) -> Result<Vec<PayoutRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| r.teacher == teacher)
            .cloned()
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<PayoutRequest>> {
        Ok(self.requests.read().await.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTicketStore {
    next: Arc<AtomicU64>,
    tickets: Arc<RwLock<BTreeMap<u64, SupportTicket>>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn next_id(&self) -> Result<u64> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn store(&self, ticket: SupportTicket) -> Result<()> {
        self.tickets.write().await.insert(ticket.id, ticket);
        Ok(())
    }

    async fn for_user(&self, user: &str) -> Result<Vec<SupportTicket>> {
        let tickets = self.tickets.read().await;
        Ok(tickets
            .values()
            .filter(|t| t.user == user)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTeacherDirectory {
    teachers: Arc<RwLock<Vec<TeacherProfile>>>,
}

impl InMemoryTeacherDirectory {
    pub fn new(teachers: Vec<TeacherProfile>) -> Self {
        Self {
            teachers: Arc::new(RwLock::new(teachers)),
        }
    }
}

#[async_trait]
impl TeacherDirectory for InMemoryTeacherDirectory {
    async fn all_teachers(&self) -> Result<Vec<TeacherProfile>> {
        Ok(self.teachers.read().await.clone())
    }
}

/// Keeps every notification it is handed; used by tests and dry runs.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        tracing::info!(?notification, "notification dispatched");
        Ok(())
    }
}

/// A payment adapter with a fixed answer, standing in for a real processor.
#[derive(Clone)]
pub struct SimulatedPaymentMethod {
    name: String,
    approve: bool,
    charged: Arc<Mutex<Vec<(String, Amount)>>>,
}

impl SimulatedPaymentMethod {
    pub fn approving(name: &str) -> Self {
        Self {
            name: name.to_string(),
            approve: true,
            charged: Arc::default(),
        }
    }

    pub fn declining(name: &str) -> Self {
        Self {
            approve: false,
            ..Self::approving(name)
        }
    }

    pub async fn charges(&self) -> Vec<(String, Amount)> {
        self.charged.lock().await.clone()
    }
}

#[async_trait]
impl PaymentMethodAdapter for SimulatedPaymentMethod {
    fn name(&self) -> &str {
        &self.name
    }

    async fn charge(&self, student: &str, amount: Amount) -> Result<bool> {
        if self.approve {
            self.charged.lock().await.push((student.to_string(), amount));
        }
        Ok(self.approve)
    }
}
