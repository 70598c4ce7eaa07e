use crate::error::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Pool size used when the environment does not configure one.
pub const DEFAULT_CONCURRENT_READERS: usize = 5;
pub const MAX_CONCURRENT_READERS: usize = 64;
pub const CONCURRENT_READERS_ENV: &str = "COMPLIANCE_CONCURRENT_READERS";

fn parse_concurrent_readers(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .min(MAX_CONCURRENT_READERS)
}

fn concurrent_readers_from_env() -> usize {
    let raw = std::env::var(CONCURRENT_READERS_ENV).ok();
    parse_concurrent_readers(raw.as_deref(), DEFAULT_CONCURRENT_READERS)
}

fn knob() -> &'static AtomicUsize {
    static CONCURRENT_READERS: OnceLock<AtomicUsize> = OnceLock::new();
    CONCURRENT_READERS.get_or_init(|| AtomicUsize::new(concurrent_readers_from_env()))
}

/// Process-wide `ConcurrentReaders` knob read when an index is constructed.
pub fn concurrent_readers() -> usize {
    knob().load(Ordering::Relaxed)
}

/// Overrides the process-wide knob. Pools already constructed keep their size.
///
/// A value of 0 is accepted here and rejected by the first pool operation
/// that would submit work.
pub fn set_concurrent_readers(readers: usize) {
    knob().store(readers, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub capacity: usize,
    pub in_flight: usize,
    pub waiters: usize,
    pub peak_in_flight: usize,
}

#[derive(Debug, Default)]
struct PoolCounters {
    in_flight: AtomicUsize,
    waiters: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl PoolCounters {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
    }
}

/// Fixed-size permit pool bounding concurrent filesystem work.
///
/// Clones share the same permits.
#[derive(Debug, Clone)]
pub struct ReaderPool {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    counters: Arc<PoolCounters>,
}

impl ReaderPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    /// Pool sized from the process-wide knob
    pub fn from_knob() -> Self {
        Self::new(concurrent_readers())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fails when the pool could never hand out a permit.
    pub fn check(&self) -> Result<()> {
        if self.capacity < 1 {
            return Err(PoolError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }

    /// Waits until a permit is available.
    pub async fn acquire(&self) -> Result<ReaderPermit> {
        self.check()?;
        let waiter = WaiterGuard::new(&self.counters);
        // The semaphore is never closed; acquire failures are not expected.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("reader pool semaphore closed"));
        drop(waiter);
        self.counters.enter();
        Ok(ReaderPermit {
            permit,
            counters: self.counters.clone(),
        })
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            capacity: self.capacity,
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
            waiters: self.counters.waiters.load(Ordering::Relaxed),
            peak_in_flight: self.counters.peak_in_flight.load(Ordering::Relaxed),
        }
    }
}

/// One unit of the reader budget; returned to the pool on drop.
pub struct ReaderPermit {
    #[allow(dead_code)]
    permit: OwnedSemaphorePermit,
    counters: Arc<PoolCounters>,
}

impl ReaderPermit {
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ReaderPermit {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

struct WaiterGuard<'a> {
    counters: &'a PoolCounters,
}

impl<'a> WaiterGuard<'a> {
    fn new(counters: &'a PoolCounters) -> Self {
        counters.waiters.fetch_add(1, Ordering::Relaxed);
        Self { counters }
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.counters.waiters.fetch_sub(1, Ordering::Relaxed);
    }
}
