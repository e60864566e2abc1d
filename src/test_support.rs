use crate::store::{
    DeleteOutcome, InsertOutcome, LockRecord, LockStore, MemoryLockStore, StoreError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

/// Memory store with switchable faults and call counters.
#[derive(Debug, Default)]
pub(crate) struct FaultyStore {
    pub(crate) inner: MemoryLockStore,
    fail_inserts: AtomicBool,
    fail_deletes: AtomicBool,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
}

impl FaultyStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl LockStore for FaultyStore {
    fn put_if_absent(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("request throttled".to_string()));
        }
        self.inner.put_if_absent(record)
    }

    fn delete(&self, task_id: &str) -> Result<DeleteOutcome, StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.delete(task_id)
    }

    fn get(&self, task_id: &str) -> Result<Option<LockRecord>, StoreError> {
        self.inner.get(task_id)
    }

    fn location(&self) -> String {
        "faulty-memory".to_string()
    }
}

/// Memory store whose first delete pauses until the test lets it through.
///
/// The delete meets the test at `entered`, then waits at `proceed`.
#[derive(Debug)]
pub(crate) struct GatedStore {
    pub(crate) inner: MemoryLockStore,
    pub(crate) entered: Barrier,
    pub(crate) proceed: Barrier,
    armed: AtomicBool,
    deletes: AtomicUsize,
}

impl GatedStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryLockStore::new(),
            entered: Barrier::new(2),
            proceed: Barrier::new(2),
            armed: AtomicBool::new(true),
            deletes: AtomicUsize::new(0),
        })
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl LockStore for GatedStore {
    fn put_if_absent(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError> {
        self.inner.put_if_absent(record)
    }

    fn delete(&self, task_id: &str) -> Result<DeleteOutcome, StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.proceed.wait();
        }
        self.inner.delete(task_id)
    }

    fn get(&self, task_id: &str) -> Result<Option<LockRecord>, StoreError> {
        self.inner.get(task_id)
    }

    fn location(&self) -> String {
        "gated-memory".to_string()
    }
}
