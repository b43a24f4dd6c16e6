//! Overflow-checked counters and reference-counted ownership handles.
//!
//! The crate is built on `CheckedCounter`, an unsigned 64-bit magnitude
//! whose arithmetic refuses to wrap: an operation that would leave the
//! range `0..=u64::MAX` is a fault, never a silently wrong number. Every
//! reference count below is such a counter, so a double release or a
//! runaway clone shows up as a fault instead of a use-after-free.
//!
//! On top of it sit three ownership handles:
//!
//! * `Exclusive`, the sole owner of a heap value, like `Box` with an empty
//!   state;
//! * `Shared`, counted shared ownership with one owner count per
//!   allocation;
//! * `Observed`, counted shared ownership whose counts live in a
//!   `RefCountBlock` that also tracks `Weak` observers.
//!
//! Handles other than `Exclusive` are single-threaded. Allocation
//! statistics are kept per thread (`thread_local_stats`) and, with the
//! default `global` feature, folded into a process-wide ledger.
//!
//! Faults are raised through `ErrorContext::raise`: logged at error level
//! and then a panic, or a process abort with the `abort_on_fault` feature.
//!
//! ```
//! use ownref::{CheckedCounter, Shared};
//!
//! let a = Shared::new(vec![1, 2, 3]);
//! let b = a.clone();
//! assert_eq!(a.count(), 2u64);
//! assert_eq!(b.len(), 3);
//!
//! let n = CheckedCounter::new(7);
//! assert!(n.try_sub(8).is_err());
//! ```

pub mod axioms;
pub mod counter;
pub mod error;
pub mod ledger;
pub mod observed;
pub mod pointers;
pub mod text;

pub(crate) mod raw_ref;
pub(crate) mod tracking;

#[cfg(test)]
mod tests;

pub use axioms::Axioms;
pub use counter::{CheckedCounter, Operand};
pub use error::{Error, ErrorContext, ErrorKind};
#[cfg(feature = "global")]
pub use ledger::{flush, global_stats};
pub use ledger::{thread_local_stats, Stats};
pub use observed::{build_observed, Observed, Weak};
pub use pointers::{build_shared, Exclusive, Shared};
pub use text::Text;
pub use tracking::RefCountBlock;
