use std::{marker::PhantomData, mem, ptr, ptr::NonNull};

use crate::{counter::CheckedCounter, ledger, tracking::Tracking};

/// A managed value and the cell counting its owners.
struct Parts<T, C>
{
    value: NonNull<T>,
    counter: NonNull<C>,
}

impl<T, C> Clone for Parts<T, C>
{
    fn clone(&self) -> Self { *self }
}
impl<T, C> Copy for Parts<T, C> {}

/// Owning core shared by `Shared` and `Observed`.
///
/// Either empty, or holding one counted owner of a boxed value. Copying
/// adds an owner, `take` moves the owner out, and dropping or resetting
/// removes it. The last owner drops the value; the counter cell goes with
/// it unless something else still observes the cell.
///
/// Neither `Send` nor `Sync`: the counts are plain cells.
pub(crate) struct RawRef<T, C: Tracking>
{
    parts: Option<Parts<T, C>>,
    _owns: PhantomData<(Box<T>, Box<C>)>,
}

impl<T, C: Tracking> RawRef<T, C>
{
    pub(crate) const fn empty() -> Self
    {
        Self {
            parts: None,
            _owns: PhantomData,
        }
    }

    pub(crate) fn adopt(value: Box<T>) -> Self
    {
        let value = NonNull::from(Box::leak(value));
        let counter = NonNull::from(Box::leak(Box::new(C::fresh())));
        ledger::value_adopted();
        ledger::counter_allocated(C::KIND, counter.as_ptr().cast());
        Self {
            parts: Some(Parts { value, counter }),
            _owns: PhantomData,
        }
    }

    /// Take ownership of a raw allocation. Null gives an empty handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` and must not be owned
    /// by anything else.
    pub(crate) unsafe fn from_raw(ptr: *mut T) -> Self
    {
        if ptr.is_null() {
            Self::empty()
        } else {
            Self::adopt(Box::from_raw(ptr))
        }
    }

    /// Rebuild a handle around an owner the caller has already counted.
    ///
    /// # Safety
    ///
    /// `value` and `counter` must belong together and the counter must
    /// already include the owner this handle represents.
    pub(crate) unsafe fn from_parts(value: NonNull<T>, counter: NonNull<C>) -> Self
    {
        Self {
            parts: Some(Parts { value, counter }),
            _owns: PhantomData,
        }
    }

    #[track_caller]
    pub(crate) fn alias(&self) -> Self
    {
        if let Some(p) = self.parts {
            unsafe { p.counter.as_ref() }.add_owner();
        }
        Self {
            parts: self.parts,
            _owns: PhantomData,
        }
    }

    pub(crate) fn take(&mut self) -> Self
    {
        Self {
            parts: self.parts.take(),
            _owns: PhantomData,
        }
    }

    #[track_caller]
    pub(crate) fn reset(&mut self, value: Option<Box<T>>)
    {
        self.release();
        if let Some(b) = value {
            *self = Self::adopt(b);
        }
    }

    /// Replace the managed value with a raw allocation.
    ///
    /// Resetting to the pointer already held is a no-op.
    ///
    /// # Safety
    ///
    /// As for `from_raw`.
    #[track_caller]
    pub(crate) unsafe fn reset_raw(&mut self, ptr: *mut T)
    {
        if !ptr.is_null() && ptr::eq(ptr, self.as_ptr()) {
            return;
        }
        self.release();
        *self = Self::from_raw(ptr);
    }

    /// Give up this owner. Afterwards the handle is empty.
    #[track_caller]
    pub(crate) fn release(&mut self)
    {
        let Some(Parts { value, counter }) = self.parts.take() else {
            return;
        };
        let ctr = unsafe { counter.as_ref() };
        if !ctr.remove_owner().is_zero() {
            return;
        }
        ctr.pin();
        mem::drop(unsafe { Box::from_raw(value.as_ptr()) });
        ledger::value_dropped();
        ctr.unpin();
        if ctr.unobserved() {
            unsafe { Self::free_counter(counter) }
        }
    }

    /// Move the value out if this is its only owner. Observers of the
    /// counter cell, if any, see the value as gone.
    #[track_caller]
    pub(crate) fn try_into_inner(mut self) -> Result<T, Self>
    {
        if self.owners() != 1u64 {
            return Err(self);
        }
        let Some(Parts { value, counter }) = self.parts.take() else {
            return Err(self);
        };
        let ctr = unsafe { counter.as_ref() };
        ctr.remove_owner();
        let it = *unsafe { Box::from_raw(value.as_ptr()) };
        ledger::value_released();
        if ctr.unobserved() {
            unsafe { Self::free_counter(counter) }
        }
        Ok(it)
    }

    /// Owner count, zero when empty.
    pub(crate) fn owners(&self) -> CheckedCounter { self.counter().map_or(CheckedCounter::ZERO, C::owners) }

    /// # Safety
    ///
    /// No owner or observer may refer to `counter` any more.
    pub(crate) unsafe fn free_counter(counter: NonNull<C>)
    {
        ledger::counter_freed(C::KIND, counter.as_ptr().cast());
        mem::drop(Box::from_raw(counter.as_ptr()));
    }

    pub(crate) fn is_some(&self) -> bool { self.parts.is_some() }

    /// Sole owner, with nothing else observing the counter cell.
    pub(crate) fn is_unique(&self) -> bool
    {
        self.counter()
            .is_some_and(|c| c.owners() == 1u64 && c.unobserved())
    }

    pub(crate) fn as_ptr(&self) -> *const T
    {
        self.parts
            .map_or(ptr::null(), |p| p.value.as_ptr() as *const T)
    }

    pub(crate) fn value_ptr(&self) -> Option<NonNull<T>> { self.parts.map(|p| p.value) }

    pub(crate) fn counter_ptr(&self) -> Option<NonNull<C>> { self.parts.map(|p| p.counter) }

    pub(crate) fn value(&self) -> Option<&T> { self.parts.map(|p| unsafe { &*p.value.as_ptr() }) }

    pub(crate) fn value_mut(&mut self) -> Option<&mut T>
    {
        if self.is_unique() {
            self.parts.map(|p| unsafe { &mut *p.value.as_ptr() })
        } else {
            None
        }
    }

    pub(crate) fn counter(&self) -> Option<&C> { self.parts.map(|p| unsafe { &*p.counter.as_ptr() }) }
}

impl<T, C: Tracking> Drop for RawRef<T, C>
{
    fn drop(&mut self) { self.release() }
}
