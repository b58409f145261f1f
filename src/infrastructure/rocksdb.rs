use crate::domain::lesson::{Lesson, LessonId};
use crate::domain::money::Balance;
use crate::domain::payout::PayoutRequest;
use crate::domain::ports::{LessonStore, Ledger, PayoutStore, TaskStore, TeacherAccounts};
use crate::domain::task::{ScheduledTask, TaskKey};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for lesson records, keyed by big-endian lesson id.
pub const CF_LESSONS: &str = "lessons";
/// Column Family for pending scheduled tasks, keyed by [`TaskKey::to_bytes`].
pub const CF_TASKS: &str = "tasks";
/// Column Family for teacher balances.
pub const CF_BALANCES: &str = "balances";
/// Column Family for ledger references already credited.
pub const CF_CREDITS: &str = "credits";
/// Column Family for teacher absence counters and suspension flags.
pub const CF_TEACHERS: &str = "teachers";
/// Column Family for payout requests, keyed by big-endian request id.
pub const CF_PAYOUTS: &str = "payouts";
/// Column Family for sequences.
pub const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_LESSONS,
    CF_TASKS,
    CF_BALANCES,
    CF_CREDITS,
    CF_TEACHERS,
    CF_PAYOUTS,
    CF_META,
];

const PAYOUT_SEQUENCE: &[u8] = b"payout_seq";

#[derive(Debug, Default, Serialize, serde::Deserialize)]
struct TeacherRecord {
    absences: u32,
    suspended: bool,
}

/// A persistent store implementation using RocksDB.
///
/// One database backs lessons, scheduled tasks, the ledger, teacher
/// counters and payouts, each in its own column family. Read-check-write
/// sequences (version checks, ledger credits, counters) are serialized
/// through a single async mutex shared by all clones.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::default(),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            BookingError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(self.cf(cf)?, key, bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn all_json<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn all_keyed_json<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<(Vec<u8>, T)>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (key, value) = item?;
            values.push((key.to_vec(), serde_json::from_slice(&value)?));
        }
        Ok(values)
    }
}

#[async_trait]
impl LessonStore for RocksDBStore {
    async fn get(&self, id: LessonId) -> Result<Option<Lesson>> {
        self.get_json(CF_LESSONS, &id.to_be_bytes())
    }

    async fn insert(&self, mut lesson: Lesson) -> Result<Lesson> {
        let _guard = self.write_lock.lock().await;
        let key = lesson.id.to_be_bytes();
        if self.db.get_pinned_cf(self.cf(CF_LESSONS)?, key)?.is_some() {
            return Err(BookingError::Conflict(lesson.id));
        }
        lesson.version = 1;
        self.put_json(CF_LESSONS, &key, &lesson)?;
        Ok(lesson)
    }

    async fn update(&self, mut lesson: Lesson) -> Result<Lesson> {
        let _guard = self.write_lock.lock().await;
        let key = lesson.id.to_be_bytes();
        let stored: Lesson = self
            .get_json(CF_LESSONS, &key)?
            .ok_or_else(|| BookingError::not_found("lesson", lesson.id))?;
        if stored.version != lesson.version {
            return Err(BookingError::Conflict(lesson.id));
        }
        lesson.version += 1;
        self.put_json(CF_LESSONS, &key, &lesson)?;
        Ok(lesson)
    }

    async fn get_all(&self) -> Result<Vec<Lesson>> {
        self.all_json(CF_LESSONS)
    }
}

#[async_trait]
impl TaskStore for RocksDBStore {
    async fn schedule(&self, task: ScheduledTask) -> Result<()> {
        self.put_json(CF_TASKS, &task.key.to_bytes(), &task)
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTask>> {
        let mut due: Vec<ScheduledTask> = self
            .all_json::<ScheduledTask>(CF_TASKS)?
            .into_iter()
            .filter(|t| t.is_due(now))
            .collect();
        due.sort_by_key(|t| (t.due_at, t.key));
        Ok(due)
    }

    async fn remove(&self, key: TaskKey) -> Result<()> {
        self.db.delete_cf(self.cf(CF_TASKS)?, key.to_bytes())?;
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<ScheduledTask>> {
        self.all_json(CF_TASKS)
    }
}

#[async_trait]
impl Ledger for RocksDBStore {
    async fn credit(&self, teacher: &str, amount: Balance, reference: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let credits = self.cf(CF_CREDITS)?;
        if self.db.get_pinned_cf(credits, reference)?.is_some() {
            return Ok(false);
        }
        let current: Balance = self
            .get_json(CF_BALANCES, teacher.as_bytes())?
            .unwrap_or_default();
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| BookingError::balance_overflow(teacher))?;

        // Reference and balance land together or not at all.
        let mut batch = WriteBatch::default();
        batch.put_cf(credits, reference, teacher);
        batch.put_cf(
            self.cf(CF_BALANCES)?,
            teacher,
            serde_json::to_vec(&updated)?,
        );
        self.db.write(batch)?;
        Ok(true)
    }

    async fn balance(&self, teacher: &str) -> Result<Balance> {
        Ok(self
            .get_json(CF_BALANCES, teacher.as_bytes())?
            .unwrap_or_default())
    }

    async fn balances(&self) -> Result<Vec<(String, Balance)>> {
        self.all_keyed_json::<Balance>(CF_BALANCES)?
            .into_iter()
            .map(|(key, balance)| {
                String::from_utf8(key)
                    .map(|teacher| (teacher, balance))
                    .map_err(|e| BookingError::InternalError(Box::new(e)))
            })
            .collect()
    }
}

#[async_trait]
impl TeacherAccounts for RocksDBStore {
    async fn record_absence(&self, teacher: &str) -> Result<u32> {
        let _guard = self.write_lock.lock().await;
        let mut record: TeacherRecord = self
            .get_json(CF_TEACHERS, teacher.as_bytes())?
            .unwrap_or_default();
        record.absences += 1;
        self.put_json(CF_TEACHERS, teacher.as_bytes(), &record)?;
        Ok(record.absences)
    }

    async fn suspend(&self, teacher: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record: TeacherRecord = self
            .get_json(CF_TEACHERS, teacher.as_bytes())?
            .unwrap_or_default();
        record.suspended = true;
        self.put_json(CF_TEACHERS, teacher.as_bytes(), &record)
    }

    async fn is_suspended(&self, teacher: &str) -> Result<bool> {
        Ok(self
            .get_json::<TeacherRecord>(CF_TEACHERS, teacher.as_bytes())?
            .is_some_and(|r| r.suspended))
    }
}

#[async_trait]
impl PayoutStore for RocksDBStore {
    async fn next_id(&self) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let next = self
            .get_json::<u64>(CF_META, PAYOUT_SEQUENCE)?
            .unwrap_or_default()
            + 1;
        self.put_json(CF_META, PAYOUT_SEQUENCE, &next)?;
        Ok(next)
    }

    async fn store(&self, request: PayoutRequest) -> Result<()> {
        self.put_json(CF_PAYOUTS, &request.id.to_be_bytes(), &request)
    }

    async fn for_teacher(&self, teacher: &str) -> Result<Vec<PayoutRequest>> {
        Ok(self
            .all_json::<PayoutRequest>(CF_PAYOUTS)?
            .into_iter()
            .filter(|r| r.teacher == teacher)
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<PayoutRequest>> {
        self.all_json(CF_PAYOUTS)
    }
}
