//! Allocation bookkeeping for diagnosing leaks and double frees.
//!
//! Each thread keeps its own `Stats`. With the `global` feature the
//! per-thread figures are folded into a process-wide ledger when the thread
//! exits, or earlier through `flush`.

use std::cell::RefCell;

#[cfg(feature = "global")]
use lazy_static::lazy_static;
#[cfg(feature = "global")]
use parking_lot::Mutex;

/// Counts of managed values and counter cells.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats
{
    /// Values taken under management by any handle.
    pub values_adopted: usize,

    /// Managed values whose destructor has run.
    pub values_dropped: usize,

    /// Managed values handed back to the caller without being dropped.
    pub values_released: usize,

    /// Counter cells and `RefCountBlock`s allocated.
    pub counters_allocated: usize,

    /// Counter cells and `RefCountBlock`s freed.
    pub counters_freed: usize,
}

fn net(added: usize, removed: usize) -> i64 { added as i64 - removed as i64 }

impl Stats
{
    /// Values currently owned by some handle, floored at zero.
    ///
    /// Only meaningful between flushes: a value adopted before `flush` and
    /// dropped after it shows up here as nothing. `net_values` keeps the
    /// sign.
    pub fn live_values(&self) -> usize { self.net_values().max(0) as usize }

    /// Counter cells currently allocated, floored at zero. See
    /// `live_values`.
    pub fn live_counters(&self) -> usize { self.net_counters().max(0) as usize }

    /// Adopted minus dropped and released values. Negative when this
    /// snapshot saw values go that it never saw arrive.
    pub fn net_values(&self) -> i64
    {
        net(self.values_adopted, self.values_dropped + self.values_released)
    }

    /// Allocated minus freed counter cells. May be negative, as for
    /// `net_values`.
    pub fn net_counters(&self) -> i64 { net(self.counters_allocated, self.counters_freed) }

    fn absorb(&mut self, other: &Stats)
    {
        self.values_adopted += other.values_adopted;
        self.values_dropped += other.values_dropped;
        self.values_released += other.values_released;
        self.counters_allocated += other.counters_allocated;
        self.counters_freed += other.counters_freed;
    }
}

struct LocalLedger(Stats);

thread_local! {
    static LOCAL_LEDGER: RefCell<LocalLedger> = RefCell::new(LocalLedger(Stats::default()));
}

#[cfg(feature = "global")]
lazy_static! {
    static ref GLOBAL_LEDGER: Mutex<Stats> = Mutex::new(Stats::default());
}

impl Drop for LocalLedger
{
    fn drop(&mut self)
    {
        #[cfg(feature = "global")]
        GLOBAL_LEDGER.lock().absorb(&self.0);
    }
}

// Handles may be dropped while thread-locals are being torn down; those
// events go unrecorded.
fn record(f: impl FnOnce(&mut Stats))
{
    let _ = LOCAL_LEDGER.try_with(|l| f(&mut l.borrow_mut().0));
}

/// Snapshot of the calling thread's statistics.
pub fn thread_local_stats() -> Stats
{
    LOCAL_LEDGER
        .try_with(|l| l.borrow().0)
        .unwrap_or_default()
}

/// Snapshot of the process-wide statistics.
///
/// Only includes threads that have exited or called `flush`.
#[cfg(feature = "global")]
pub fn global_stats() -> Stats { *GLOBAL_LEDGER.lock() }

/// Move the calling thread's statistics into the process-wide ledger and
/// start counting from zero.
#[cfg(feature = "global")]
pub fn flush()
{
    let local = LOCAL_LEDGER
        .try_with(|l| std::mem::take(&mut l.borrow_mut().0))
        .unwrap_or_default();
    GLOBAL_LEDGER.lock().absorb(&local);
}

pub(crate) fn value_adopted() { record(|s| s.values_adopted += 1) }

pub(crate) fn value_dropped() { record(|s| s.values_dropped += 1) }

pub(crate) fn value_released() { record(|s| s.values_released += 1) }

pub(crate) fn counter_allocated(kind: &'static str, at: *const ())
{
    log::trace!("allocated {kind} at {at:p}");
    record(|s| s.counters_allocated += 1)
}

pub(crate) fn counter_freed(kind: &'static str, at: *const ())
{
    log::trace!("freed {kind} at {at:p}");
    record(|s| s.counters_freed += 1)
}
