use std::{
    fmt,
    marker::PhantomData,
    mem,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
};

use crate::{
    counter::CheckedCounter,
    error::empty_handle,
    ledger,
    raw_ref::RawRef,
    tracking::ShareCount,
};

/// Sole owner of a heap allocation.
///
/// Has the semantics of `Box` with an explicit empty state: the value can be
/// released back to the caller or replaced in place, and dropping a
/// non-empty `Exclusive` drops the value.
///
/// There is no way to duplicate an `Exclusive`:
///
/// ```compile_fail
/// let a = ownref::Exclusive::new(1);
/// let b = Clone::clone(&a);
/// ```
///
/// Dereferencing an empty handle raises a `Logic` fault.
pub struct Exclusive<T>
{
    ptr: Option<NonNull<T>>,
    _owns: PhantomData<Box<T>>,
}
unsafe impl<T: Send> Send for Exclusive<T> {}
unsafe impl<T: Sync> Sync for Exclusive<T> {}

#[allow(dead_code)]
impl<T> Exclusive<T>
{
    /// Move `it` onto the heap.
    pub fn new(it: T) -> Self { Self::from(Box::new(it)) }

    pub const fn empty() -> Self
    {
        Self {
            ptr: None,
            _owns: PhantomData,
        }
    }

    /// Take ownership of a raw allocation. Null gives an empty handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` and must not be owned
    /// by anything else.
    pub unsafe fn from_raw(ptr: *mut T) -> Self
    {
        if ptr.is_null() {
            Self::empty()
        } else {
            Self::from(Box::from_raw(ptr))
        }
    }

    /// Give up ownership without dropping the value.
    ///
    /// The handle is empty afterwards; on an empty handle this is `None`.
    pub fn release(&mut self) -> Option<Box<T>>
    {
        let ptr = self.ptr.take()?;
        ledger::value_released();
        Some(unsafe { Box::from_raw(ptr.as_ptr()) })
    }

    /// As `release`, as a raw pointer. Null if the handle was empty.
    pub fn release_raw(&mut self) -> *mut T { self.release().map_or(ptr::null_mut(), Box::into_raw) }

    /// Drop the current value, if any, and adopt `it`.
    pub fn reset(&mut self, it: Option<Box<T>>)
    {
        self.free();
        if let Some(b) = it {
            *self = Self::from(b);
        }
    }

    /// Drop the current value and adopt a raw allocation. Resetting to the
    /// pointer already held is a no-op.
    ///
    /// # Safety
    ///
    /// As for `from_raw`.
    pub unsafe fn reset_raw(&mut self, ptr: *mut T)
    {
        if ptr::eq(ptr, self.as_ptr()) {
            return;
        }
        self.free();
        *self = Self::from_raw(ptr);
    }

    /// Move ownership out, leaving this handle empty.
    pub fn take(&mut self) -> Self { mem::replace(self, Self::empty()) }

    pub fn into_inner(mut self) -> Option<T> { self.release().map(|b| *b) }

    pub fn get(&self) -> Option<&T> { self.ptr.map(|p| unsafe { &*p.as_ptr() }) }

    pub fn get_mut(&mut self) -> Option<&mut T> { self.ptr.map(|p| unsafe { &mut *p.as_ptr() }) }

    /// Raw pointer to the value, null if empty.
    pub fn as_ptr(&self) -> *const T { self.ptr.map_or(ptr::null(), |p| p.as_ptr() as *const T) }

    pub fn is_some(&self) -> bool { self.ptr.is_some() }

    pub fn is_empty(&self) -> bool { self.ptr.is_none() }

    fn free(&mut self)
    {
        if let Some(p) = self.ptr.take() {
            mem::drop(unsafe { Box::from_raw(p.as_ptr()) });
            ledger::value_dropped();
        }
    }
}

impl<T> From<Box<T>> for Exclusive<T>
{
    fn from(it: Box<T>) -> Self
    {
        ledger::value_adopted();
        Self {
            ptr: Some(NonNull::from(Box::leak(it))),
            _owns: PhantomData,
        }
    }
}

impl<T> Default for Exclusive<T>
{
    fn default() -> Self { Self::empty() }
}

impl<T> Deref for Exclusive<T>
{
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T { self.get().unwrap_or_else(|| empty_handle("Exclusive")) }
}

impl<T> DerefMut for Exclusive<T>
{
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T
    {
        match self.ptr {
            Some(p) => unsafe { &mut *p.as_ptr() },
            None => empty_handle("Exclusive"),
        }
    }
}

impl<T> Drop for Exclusive<T>
{
    fn drop(&mut self) { self.free() }
}

impl<T> fmt::Debug for Exclusive<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Exclusive").field("ptr", &self.as_ptr()).finish()
    }
}

/// Shared owner of a heap allocation.
///
/// Every clone of a `Shared` refers to the same value and the same owner
/// count. The value and its count are freed together when the last clone
/// is dropped or reset.
///
/// Comparison is by identity: two handles are equal when they point at the
/// same allocation, or are both empty.
pub struct Shared<T>(RawRef<T, ShareCount>);

#[allow(dead_code)]
impl<T> Shared<T>
{
    /// Move `it` onto the heap as the first of its owners.
    pub fn new(it: T) -> Self { Self::from(Box::new(it)) }

    pub const fn empty() -> Self { Self(RawRef::empty()) }

    /// Take ownership of a raw allocation. Null gives an empty handle and
    /// allocates no count.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` and must not be owned
    /// by anything else.
    pub unsafe fn from_raw(ptr: *mut T) -> Self { Self(RawRef::from_raw(ptr)) }

    /// Give up this owner and adopt `it` under a fresh count.
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

    /// Move this owner out, leaving the handle empty. The count is
    /// unchanged.
    pub fn take(&mut self) -> Self { Self(self.0.take()) }

    /// Raw pointer to the value, null if empty.
    pub fn get(&self) -> *const T { self.0.as_ptr() }

    pub fn get_ref(&self) -> Option<&T> { self.0.value() }

    /// Mutable access, only while this is the sole owner.
    pub fn get_mut(&mut self) -> Option<&mut T> { self.0.value_mut() }

    /// Number of owners, zero for an empty handle.
    pub fn count(&self) -> CheckedCounter { self.0.owners() }

    pub fn is_some(&self) -> bool { self.0.is_some() }

    pub fn is_empty(&self) -> bool { !self.0.is_some() }

    pub fn ptr_eq(&self, other: &Self) -> bool { ptr::eq(self.get(), other.get()) }

    /// Move the value out if this is the sole owner.
    #[track_caller]
    pub fn try_into_inner(self) -> Result<T, Self> { self.0.try_into_inner().map_err(Self) }
}

/// Construct a value directly under a `Shared` handle.
pub fn build_shared<T>(it: T) -> Shared<T> { Shared::new(it) }

impl<T> From<Box<T>> for Shared<T>
{
    fn from(it: Box<T>) -> Self { Self(RawRef::adopt(it)) }
}

impl<T> Default for Shared<T>
{
    fn default() -> Self { Self::empty() }
}

impl<T> Clone for Shared<T>
{
    #[track_caller]
    fn clone(&self) -> Self { Self(self.0.alias()) }
}

impl<T> Deref for Shared<T>
{
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T { self.0.value().unwrap_or_else(|| empty_handle("Shared")) }
}

impl<T> PartialEq for Shared<T>
{
    fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl<T> Eq for Shared<T> {}

impl<T> fmt::Debug for Shared<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Shared")
            .field("ptr", &self.get())
            .field("count", &self.count().get())
            .finish()
    }
}
