//! Overflow-checked unsigned 64-bit counter.
//!
//! `CheckedCounter` behaves like a `u64` that refuses to wrap. Every
//! arithmetic operation comes in two flavours: a `try_*` method returning
//! `Result`, and an operator (`+`, `-`, `*`, `/` and the assigning forms)
//! that raises the failure as a fault. In both cases a failed operation
//! leaves the counter untouched.
//!
//! The right-hand side may be another counter or any built-in integer.
//! Signed operands follow a fixed policy: a negative addend subtracts its
//! magnitude, a negative subtrahend adds it, a negative multiplier
//! overflows and a negative divisor counts as division by zero, since
//! the result could never be a non-negative magnitude.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign},
};

use crate::error::Error;

mod sealed
{
    pub trait Sealed {}
}

/// Anything that can stand on either side of a counter operation.
///
/// Implemented for `CheckedCounter` and every built-in integer type.
pub trait Operand: Copy + sealed::Sealed
{
    /// Sign and absolute value. The sign is `true` only for values below
    /// zero.
    fn sign_magnitude(self) -> (bool, u128);
}

#[derive(Clone, Copy, Default)]
#[repr(transparent)]
pub struct CheckedCounter(u64);

impl CheckedCounter
{
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    pub const fn new(magnitude: u64) -> Self { Self(magnitude) }

    /// Raw magnitude.
    pub const fn get(self) -> u64 { self.0 }

    pub const fn is_zero(self) -> bool { self.0 == 0 }

    /// Add one, returning the new value.
    ///
    /// Fails with `NumOverflow` at `u64::MAX`.
    pub fn try_increment(&mut self) -> Result<Self, Error>
    {
        let n = self
            .0
            .checked_add(1)
            .ok_or(Error::overflow("increment past u64::MAX"))?;
        self.0 = n;
        Ok(*self)
    }

    /// Subtract one, returning the new value.
    ///
    /// Fails with `NumUnderflow` at zero.
    pub fn try_decrement(&mut self) -> Result<Self, Error>
    {
        let n = self
            .0
            .checked_sub(1)
            .ok_or(Error::underflow("decrement below zero"))?;
        self.0 = n;
        Ok(*self)
    }

    /// Prefix increment: returns the new value.
    #[track_caller]
    pub fn increment(&mut self) -> Self { or_raise(self.try_increment()) }

    /// Postfix increment: returns the value before incrementing.
    #[track_caller]
    pub fn post_increment(&mut self) -> Self
    {
        let old = *self;
        or_raise(self.try_increment());
        old
    }

    /// Prefix decrement: returns the new value.
    #[track_caller]
    pub fn decrement(&mut self) -> Self { or_raise(self.try_decrement()) }

    /// Postfix decrement: returns the value before decrementing.
    #[track_caller]
    pub fn post_decrement(&mut self) -> Self
    {
        let old = *self;
        or_raise(self.try_decrement());
        old
    }

    pub fn try_add(self, rhs: impl Operand) -> Result<Self, Error>
    {
        match rhs.sign_magnitude() {
            (false, m) => self.add_magnitude(m),
            (true, m) => self.sub_magnitude(m),
        }
    }

    pub fn try_sub(self, rhs: impl Operand) -> Result<Self, Error>
    {
        match rhs.sign_magnitude() {
            (false, m) => self.sub_magnitude(m),
            (true, m) => self.add_magnitude(m),
        }
    }

    pub fn try_mul(self, rhs: impl Operand) -> Result<Self, Error>
    {
        let m = match rhs.sign_magnitude() {
            (true, _) => return Err(Error::overflow("negative multiplier")),
            (false, m) => m,
        };
        match u64::try_from(m) {
            Ok(b) if b == 0 || self.0 <= u64::MAX / b => Ok(Self(self.0 * b)),
            Err(_) if self.0 == 0 => Ok(Self::ZERO),
            _ => Err(Error::overflow("product exceeds u64::MAX")),
        }
    }

    pub fn try_div(self, rhs: impl Operand) -> Result<Self, Error>
    {
        match rhs.sign_magnitude() {
            (true, _) => Err(Error::divide_by_zero("negative divisor")),
            (false, 0) => Err(Error::divide_by_zero("divisor is zero")),
            // quotient never exceeds the dividend
            (false, m) => Ok(Self((self.0 as u128 / m) as u64)),
        }
    }

    /// `lhs - self`, for integers on the left of the operator.
    fn try_rsub(self, lhs: impl Operand) -> Result<Self, Error>
    {
        match lhs.sign_magnitude() {
            (true, _) => Err(Error::underflow("negative minuend")),
            (false, m) if m < self.0 as u128 => Err(Error::underflow("subtrahend exceeds minuend")),
            (false, m) => narrow(m - self.0 as u128),
        }
    }

    /// `lhs / self`, for integers on the left of the operator.
    fn try_rdiv(self, lhs: impl Operand) -> Result<Self, Error>
    {
        if self.0 == 0 {
            return Err(Error::divide_by_zero("divisor is zero"));
        }
        match lhs.sign_magnitude() {
            (true, _) => Err(Error::underflow("negative dividend")),
            (false, m) => narrow(m / self.0 as u128),
        }
    }

    fn add_magnitude(self, m: u128) -> Result<Self, Error>
    {
        match u64::try_from(m) {
            Ok(b) if self.0 <= u64::MAX - b => Ok(Self(self.0 + b)),
            _ => Err(Error::overflow("sum exceeds u64::MAX")),
        }
    }

    fn sub_magnitude(self, m: u128) -> Result<Self, Error>
    {
        match u64::try_from(m) {
            Ok(b) if self.0 >= b => Ok(Self(self.0 - b)),
            _ => Err(Error::underflow("difference below zero")),
        }
    }

    fn compare(self, rhs: impl Operand) -> Ordering
    {
        match rhs.sign_magnitude() {
            (true, _) => Ordering::Greater,
            (false, m) => (self.0 as u128).cmp(&m),
        }
    }
}

fn narrow(m: u128) -> Result<CheckedCounter, Error>
{
    u64::try_from(m)
        .map(CheckedCounter)
        .map_err(|_| Error::overflow("result exceeds u64::MAX"))
}

#[track_caller]
fn or_raise(r: Result<CheckedCounter, Error>) -> CheckedCounter
{
    match r {
        Ok(c) => c,
        Err(e) => e.raise(),
    }
}

impl sealed::Sealed for CheckedCounter {}

impl Operand for CheckedCounter
{
    #[inline(always)]
    fn sign_magnitude(self) -> (bool, u128) { (false, self.0 as u128) }
}

impl From<CheckedCounter> for u64
{
    fn from(it: CheckedCounter) -> u64 { it.0 }
}

impl From<CheckedCounter> for u128
{
    fn from(it: CheckedCounter) -> u128 { it.0 as u128 }
}

impl<R: Operand> PartialEq<R> for CheckedCounter
{
    fn eq(&self, other: &R) -> bool { self.compare(*other) == Ordering::Equal }
}

impl Eq for CheckedCounter {}

impl<R: Operand> PartialOrd<R> for CheckedCounter
{
    fn partial_cmp(&self, other: &R) -> Option<Ordering> { Some(self.compare(*other)) }
}

impl Ord for CheckedCounter
{
    fn cmp(&self, other: &Self) -> Ordering { self.0.cmp(&other.0) }
}

impl Hash for CheckedCounter
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.0.hash(state) }
}

impl fmt::Display for CheckedCounter
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(&self.0, f) }
}

impl fmt::Debug for CheckedCounter
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_tuple("CheckedCounter").field(&self.0).finish()
    }
}

macro_rules! counter_op {
    ($op:ident :: $method:ident, $assign:ident :: $assign_method:ident => $checked:ident) => {
        impl<R: Operand> $op<R> for CheckedCounter
        {
            type Output = CheckedCounter;

            #[track_caller]
            fn $method(self, rhs: R) -> CheckedCounter { or_raise(self.$checked(rhs)) }
        }

        impl<R: Operand> $assign<R> for CheckedCounter
        {
            #[track_caller]
            fn $assign_method(&mut self, rhs: R) { *self = or_raise(self.$checked(rhs)) }
        }
    };
}

counter_op!(Add::add, AddAssign::add_assign => try_add);
counter_op!(Sub::sub, SubAssign::sub_assign => try_sub);
counter_op!(Mul::mul, MulAssign::mul_assign => try_mul);
counter_op!(Div::div, DivAssign::div_assign => try_div);

macro_rules! integer_operand {
    (unsigned: $($t:ty),*) => {
        $(
            impl From<$t> for CheckedCounter
            {
                fn from(it: $t) -> Self { Self(u64::try_from(it).unwrap_or(u64::MAX)) }
            }

            impl Operand for $t
            {
                #[inline(always)]
                fn sign_magnitude(self) -> (bool, u128) { (false, self as u128) }
            }

            integer_operand!(@common $t);
        )*
    };
    (signed: $($t:ty),*) => {
        $(
            /// Negative values clamp to zero.
            impl From<$t> for CheckedCounter
            {
                fn from(it: $t) -> Self
                {
                    if it < 0 {
                        Self::ZERO
                    } else {
                        Self(u64::try_from(it).unwrap_or(u64::MAX))
                    }
                }
            }

            impl Operand for $t
            {
                #[inline(always)]
                fn sign_magnitude(self) -> (bool, u128) { (self < 0, self.unsigned_abs() as u128) }
            }

            integer_operand!(@common $t);
        )*
    };
    (@common $t:ty) => {
        impl sealed::Sealed for $t {}

        impl PartialEq<CheckedCounter> for $t
        {
            fn eq(&self, other: &CheckedCounter) -> bool { other == self }
        }

        impl PartialOrd<CheckedCounter> for $t
        {
            fn partial_cmp(&self, other: &CheckedCounter) -> Option<Ordering>
            {
                Some(other.compare(*self).reverse())
            }
        }

        impl Add<CheckedCounter> for $t
        {
            type Output = CheckedCounter;

            #[track_caller]
            fn add(self, rhs: CheckedCounter) -> CheckedCounter { or_raise(rhs.try_add(self)) }
        }

        impl Sub<CheckedCounter> for $t
        {
            type Output = CheckedCounter;

            #[track_caller]
            fn sub(self, rhs: CheckedCounter) -> CheckedCounter { or_raise(rhs.try_rsub(self)) }
        }

        impl Mul<CheckedCounter> for $t
        {
            type Output = CheckedCounter;

            #[track_caller]
            fn mul(self, rhs: CheckedCounter) -> CheckedCounter { or_raise(rhs.try_mul(self)) }
        }

        impl Div<CheckedCounter> for $t
        {
            type Output = CheckedCounter;

            #[track_caller]
            fn div(self, rhs: CheckedCounter) -> CheckedCounter { or_raise(rhs.try_rdiv(self)) }
        }
    };
}

integer_operand!(unsigned: u8, u16, u32, u64, u128, usize);
integer_operand!(signed: i8, i16, i32, i64, i128, isize);
