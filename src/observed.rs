//! Shared ownership with observers.
//!
//! An `Observed` allocation has two heap cells: the value, and a
//! `RefCountBlock` counting strong (`Observed`) and weak (`Weak`) handles.
//! The value is dropped with the last strong handle. The block stays until
//! the last weak handle is gone as well, so a `Weak` can always tell
//! whether its value still exists.
//!
//! ```
//! use ownref::Observed;
//!
//! let a = Observed::new(String::from("seen"));
//! let w = a.downgrade();
//! assert_eq!(w.upgrade().as_deref().map(String::as_str), Some("seen"));
//!
//! drop(a);
//! assert!(!w.is_alive());
//! assert!(w.upgrade().is_none());
//! ```

use std::{fmt, ops::Deref, ptr, ptr::NonNull};

use crate::{
    counter::CheckedCounter,
    error::empty_handle,
    raw_ref::RawRef,
    tracking::RefCountBlock,
};

/// Strong handle to a value with a detachable `RefCountBlock`.
pub struct Observed<T>(RawRef<T, RefCountBlock>);

#[allow(dead_code)]
impl<T> Observed<T>
{
    /// Move `it` onto the heap under a fresh block (strong 1, weak 0).
    pub fn new(it: T) -> Self { Self::from(Box::new(it)) }

    pub const fn empty() -> Self { Self(RawRef::empty()) }

    /// Take ownership of a raw allocation. Null gives an empty handle and
    /// allocates no block.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` and must not be owned
    /// by anything else.
    pub unsafe fn from_raw(ptr: *mut T) -> Self { Self(RawRef::from_raw(ptr)) }

    /// Give up this strong reference and adopt `it` under a fresh block.
    ///
    /// If this was the last strong reference the old value is dropped; the
    /// old block survives while weak references remain.
    #[track_caller]
    pub fn reset(&mut self, it: Option<Box<T>>) { self.0.reset(it) }

    /// As `reset`, for a raw allocation. Resetting to the pointer already
    /// held is a no-op.
    ///
    /// # Safety
    ///
    /// As for `from_raw`.
    #[track_caller]
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) { self.0.reset_raw(ptr) }

    pub fn take(&mut self) -> Self { Self(self.0.take()) }

    /// Raw pointer to the value, null if empty.
    pub fn get_ptr(&self) -> *const T { self.0.as_ptr() }

    pub fn get_ref(&self) -> Option<&T> { self.0.value() }

    /// Mutable access, only with one strong and no weak references.
    pub fn get_mut(&mut self) -> Option<&mut T> { self.0.value_mut() }

    pub fn get_ref_counter(&self) -> Option<&RefCountBlock> { self.0.counter() }

    pub fn strong_count(&self) -> CheckedCounter { self.0.owners() }

    pub fn weak_count(&self) -> CheckedCounter
    {
        self.get_ref_counter()
            .map_or(CheckedCounter::ZERO, RefCountBlock::weak_count)
    }

    pub fn is_some(&self) -> bool { self.0.is_some() }

    pub fn is_empty(&self) -> bool { !self.0.is_some() }

    pub fn ptr_eq(&self, other: &Self) -> bool { ptr::eq(self.get_ptr(), other.get_ptr()) }

    /// New weak reference to this allocation. Downgrading an empty handle
    /// gives a dangling `Weak`.
    #[track_caller]
    pub fn downgrade(&self) -> Weak<T>
    {
        let (Some(value), Some(block)) = (self.0.value_ptr(), self.0.counter_ptr()) else {
            return Weak::new();
        };
        unsafe { block.as_ref() }.inc_weak();
        Weak {
            parts: Some((value, block)),
        }
    }

    /// Move the value out if this is the only strong reference. Existing
    /// `Weak`s stop being able to upgrade.
    #[track_caller]
    pub fn try_into_inner(self) -> Result<T, Self> { self.0.try_into_inner().map_err(Self) }
}

/// Construct a value directly under an `Observed` handle.
pub fn build_observed<T>(it: T) -> Observed<T> { Observed::new(it) }

impl<T> From<Box<T>> for Observed<T>
{
    fn from(it: Box<T>) -> Self { Self(RawRef::adopt(it)) }
}

impl<T> Default for Observed<T>
{
    fn default() -> Self { Self::empty() }
}

impl<T> Clone for Observed<T>
{
    #[track_caller]
    fn clone(&self) -> Self { Self(self.0.alias()) }
}

impl<T> Deref for Observed<T>
{
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T { self.0.value().unwrap_or_else(|| empty_handle("Observed")) }
}

impl<T> PartialEq for Observed<T>
{
    fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl<T> Eq for Observed<T> {}

impl<T> fmt::Debug for Observed<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Observed")
            .field("ptr", &self.get_ptr())
            .field("block", &self.get_ref_counter())
            .finish()
    }
}

/// Non-owning reference to an `Observed` allocation.
///
/// Keeps the `RefCountBlock` alive but not the value. `upgrade` hands out a
/// new strong reference while the value exists.
pub struct Weak<T>
{
    parts: Option<(NonNull<T>, NonNull<RefCountBlock>)>,
}

impl<T> Weak<T>
{
    /// A weak reference to nothing. Never upgrades.
    pub const fn new() -> Self { Self { parts: None } }

    fn block(&self) -> Option<&RefCountBlock> { self.parts.map(|(_, b)| unsafe { &*b.as_ptr() }) }

    fn block_ptr(&self) -> *const RefCountBlock { self.parts.map_or(ptr::null(), |(_, b)| b.as_ptr() as *const _) }

    /// A new strong reference, or `None` once the value has been dropped.
    #[track_caller]
    pub fn upgrade(&self) -> Option<Observed<T>>
    {
        let (value, block) = self.parts?;
        if unsafe { block.as_ref() }.try_inc_strong() {
            Some(Observed(unsafe { RawRef::from_parts(value, block) }))
        } else {
            None
        }
    }

    pub fn is_alive(&self) -> bool { self.block().is_some_and(|b| !b.has_no_strong_ref()) }

    pub fn strong_count(&self) -> CheckedCounter
    {
        self.block()
            .map_or(CheckedCounter::ZERO, RefCountBlock::strong_count)
    }

    pub fn weak_count(&self) -> CheckedCounter
    {
        self.block()
            .map_or(CheckedCounter::ZERO, RefCountBlock::weak_count)
    }

    /// Same allocation. Dangling references are equal to each other.
    pub fn ptr_eq(&self, other: &Self) -> bool { ptr::eq(self.block_ptr(), other.block_ptr()) }
}

impl<T> Default for Weak<T>
{
    fn default() -> Self { Self::new() }
}

impl<T> Clone for Weak<T>
{
    #[track_caller]
    fn clone(&self) -> Self
    {
        if let Some(b) = self.block() {
            b.inc_weak();
        }
        Self { parts: self.parts }
    }
}

impl<T> Drop for Weak<T>
{
    fn drop(&mut self)
    {
        let Some((_, block)) = self.parts.take() else {
            return;
        };
        let b = unsafe { block.as_ref() };
        b.dec_weak();
        if b.has_no_reference() {
            unsafe { RawRef::<T, RefCountBlock>::free_counter(block) }
        }
    }
}

impl<T> PartialEq for Weak<T>
{
    fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl<T> PartialEq<Observed<T>> for Weak<T>
{
    fn eq(&self, other: &Observed<T>) -> bool
    {
        let theirs = other
            .0
            .counter_ptr()
            .map_or(ptr::null(), |b| b.as_ptr() as *const RefCountBlock);
        ptr::eq(self.block_ptr(), theirs)
    }
}

impl<T> PartialEq<Weak<T>> for Observed<T>
{
    fn eq(&self, other: &Weak<T>) -> bool { other == self }
}

impl<T> fmt::Debug for Weak<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Weak")
            .field("block", &self.block())
            .finish()
    }
}
