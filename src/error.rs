use std::fmt;

use thiserror::Error;

use crate::text::Text;

/// Categories of invariant violation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind
{
    /// The program logic does not match the expected logic.
    #[error("logic error")]
    Logic,

    /// Access outside the bounds of a container.
    #[error("index out of range")]
    IndexOutOfRange,

    /// A function received an unsupported argument.
    #[error("invalid argument")]
    InvalidArgument,

    /// A numeric value exceeded its maximum representable value.
    #[error("numeric overflow")]
    NumOverflow,

    /// A numeric value went below its minimum representable value.
    #[error("numeric underflow")]
    NumUnderflow,

    /// Division by zero.
    #[error("divide by zero")]
    DivideByZero,
}

/// A failed checked operation.
///
/// Returned by the `try_*` family on `CheckedCounter`. The operator forms
/// turn it into an `ErrorContext` and raise it instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{kind}: {what}")]
pub struct Error
{
    pub kind: ErrorKind,
    pub what: &'static str,
}

impl Error
{
    pub const fn new(kind: ErrorKind, what: &'static str) -> Self { Self { kind, what } }

    pub(crate) const fn overflow(what: &'static str) -> Self { Self::new(ErrorKind::NumOverflow, what) }

    pub(crate) const fn underflow(what: &'static str) -> Self
    {
        Self::new(ErrorKind::NumUnderflow, what)
    }

    pub(crate) const fn divide_by_zero(what: &'static str) -> Self
    {
        Self::new(ErrorKind::DivideByZero, what)
    }

    /// Raise this error as a fault. Does not return.
    #[track_caller]
    pub fn raise(self) -> ! { ErrorContext::from(self).raise() }
}

/// Verbose record of a fault: its kind plus a human-readable description.
#[derive(Clone, PartialEq, Eq)]
pub struct ErrorContext
{
    kind: ErrorKind,
    description: Text,
}

impl ErrorContext
{
    pub fn new(kind: ErrorKind, description: impl Into<Text>) -> Self
    {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind { self.kind }

    pub fn description(&self) -> &Text { &self.description }

    /// Log the fault and halt.
    ///
    /// Panics by default, so the fault unwinds through any live handles and
    /// runs their destructors. With the `abort_on_fault` feature this is
    /// `terminate` instead.
    #[track_caller]
    pub fn raise(self) -> !
    {
        if cfg!(feature = "abort_on_fault") {
            self.terminate()
        }
        log::error!("{self}");
        panic!("{self}")
    }

    /// Log the fault and abort the process without unwinding.
    pub fn terminate(&self) -> !
    {
        log::error!("{self}");
        eprintln!("{self}");
        std::process::abort()
    }
}

impl From<Error> for ErrorContext
{
    fn from(e: Error) -> Self { Self::new(e.kind, e.what) }
}

impl fmt::Display for ErrorContext
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[ERR]: {}: {}", self.kind, self.description)
    }
}

impl fmt::Debug for ErrorContext
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ErrorContext")
            .field("kind", &self.kind)
            .field("description", &self.description.as_str())
            .finish()
    }
}

impl std::error::Error for ErrorContext {}

/// Raise a `Logic` fault for an operation on an empty handle.
#[track_caller]
pub(crate) fn empty_handle(handle: &'static str) -> !
{
    ErrorContext::new(ErrorKind::Logic, format!("dereferenced an empty `{handle}`")).raise()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn display_matches_diagnostic_format()
    {
        let ctx = ErrorContext::new(ErrorKind::NumOverflow, "increment past maximum");
        assert_eq!(ctx.to_string(), "[ERR]: numeric overflow: increment past maximum");
    }

    #[test]
    fn error_converts_into_context()
    {
        let ctx = ErrorContext::from(Error::underflow("decrement below zero"));
        assert_eq!(ctx.kind(), ErrorKind::NumUnderflow);
        assert_eq!(ctx.description().as_str(), "decrement below zero");
    }

    #[test]
    #[cfg(not(feature = "abort_on_fault"))]
    #[should_panic(expected = "[ERR]: divide by zero")]
    fn raise_panics()
    {
        Error::divide_by_zero("divisor is zero").raise();
    }
}
