use std::{cell::Cell, fmt};

use crate::counter::CheckedCounter;

/// Owner bookkeeping stored in a heap cell shared by every alias of one
/// managed value.
///
/// All counts are `CheckedCounter`s, so unbalanced bookkeeping (a double
/// release, a runaway clone loop) faults instead of wrapping.
pub(crate) trait Tracking
{
    /// Name used in trace output.
    const KIND: &'static str;

    /// A fresh cell recording exactly one owner.
    fn fresh() -> Self;

    fn owners(&self) -> CheckedCounter;

    fn add_owner(&self);

    /// Remove one owner, returning how many remain.
    fn remove_owner(&self) -> CheckedCounter;

    /// True if nothing but owners refers to the cell. Once the owners are
    /// gone as well the cell may be freed.
    fn unobserved(&self) -> bool;

    /// Hold the cell alive while the value's destructor runs.
    fn pin(&self);

    fn unpin(&self);
}

#[track_caller]
fn step(cell: &Cell<CheckedCounter>, up: bool) -> CheckedCounter
{
    let mut c = cell.get();
    let n = if up { c.increment() } else { c.decrement() };
    cell.set(c);
    n
}

/// Single owner count, backing `Shared`.
pub(crate) struct ShareCount(Cell<CheckedCounter>);

impl Tracking for ShareCount
{
    const KIND: &'static str = "share count";

    fn fresh() -> Self { Self(Cell::new(CheckedCounter::new(1))) }

    fn owners(&self) -> CheckedCounter { self.0.get() }

    #[track_caller]
    fn add_owner(&self) { step(&self.0, true); }

    #[track_caller]
    fn remove_owner(&self) -> CheckedCounter { step(&self.0, false) }

    fn unobserved(&self) -> bool { true }

    fn pin(&self) {}

    fn unpin(&self) {}
}

/// Strong and weak counts of one `Observed` allocation.
///
/// The value lives while the strong count is non-zero. The block itself
/// lives until both counts are zero, so a `Weak` can always read it to
/// learn whether the value is gone.
pub struct RefCountBlock
{
    strong: Cell<CheckedCounter>,
    weak: Cell<CheckedCounter>,
}

impl RefCountBlock
{
    pub(crate) fn new() -> Self
    {
        Self {
            strong: Cell::new(CheckedCounter::new(1)),
            weak: Cell::new(CheckedCounter::ZERO),
        }
    }

    /// Number of `Observed` handles.
    pub fn strong_count(&self) -> CheckedCounter { self.strong.get() }

    /// Number of `Weak` handles.
    pub fn weak_count(&self) -> CheckedCounter { self.weak.get() }

    pub fn total_count(&self) -> CheckedCounter { self.strong.get() + self.weak.get() }

    pub fn has_no_strong_ref(&self) -> bool { self.strong.get().is_zero() }

    pub fn has_no_weak_ref(&self) -> bool { self.weak.get().is_zero() }

    pub fn has_no_reference(&self) -> bool { self.has_no_strong_ref() && self.has_no_weak_ref() }

    #[track_caller]
    pub(crate) fn inc_strong(&self) { step(&self.strong, true); }

    #[track_caller]
    pub(crate) fn dec_strong(&self) -> CheckedCounter { step(&self.strong, false) }

    #[track_caller]
    pub(crate) fn inc_weak(&self) { step(&self.weak, true); }

    #[track_caller]
    pub(crate) fn dec_weak(&self) -> CheckedCounter { step(&self.weak, false) }

    /// Add a strong reference unless the value is already gone.
    pub(crate) fn try_inc_strong(&self) -> bool
    {
        if self.has_no_strong_ref() {
            false
        } else {
            self.inc_strong();
            true
        }
    }
}

impl Tracking for RefCountBlock
{
    const KIND: &'static str = "ref count block";

    fn fresh() -> Self { Self::new() }

    fn owners(&self) -> CheckedCounter { self.strong_count() }

    #[track_caller]
    fn add_owner(&self) { self.inc_strong() }

    #[track_caller]
    fn remove_owner(&self) -> CheckedCounter { self.dec_strong() }

    fn unobserved(&self) -> bool { self.has_no_weak_ref() }

    #[track_caller]
    fn pin(&self) { self.inc_weak() }

    #[track_caller]
    fn unpin(&self) { self.dec_weak(); }
}

impl fmt::Debug for RefCountBlock
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("RefCountBlock")
            .field("strong", &self.strong.get().get())
            .field("weak", &self.weak.get().get())
            .finish()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn block_starts_with_one_strong_owner()
    {
        let b = RefCountBlock::new();
        assert_eq!(b.strong_count(), 1u64);
        assert_eq!(b.weak_count(), 0u64);
        assert!(!b.has_no_strong_ref());
        assert!(b.has_no_weak_ref());
        assert_eq!(b.total_count(), 1u64);
    }

    #[test]
    fn block_counts_both_kinds()
    {
        let b = RefCountBlock::new();
        b.inc_weak();
        b.inc_strong();
        assert_eq!(b.total_count(), 3u64);
        assert_eq!(b.dec_strong(), 1u64);
        assert_eq!(b.dec_strong(), 0u64);
        assert!(!b.try_inc_strong());
        assert!(!b.has_no_reference());
        assert_eq!(b.dec_weak(), 0u64);
        assert!(b.has_no_reference());
    }

    #[test]
    #[cfg(not(feature = "abort_on_fault"))]
    #[should_panic(expected = "numeric underflow")]
    fn releasing_a_released_count_faults()
    {
        let c = ShareCount::fresh();
        c.remove_owner();
        c.remove_owner();
    }
}
