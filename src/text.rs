use std::{
    fmt,
    ops::{Add, AddAssign},
};

use crate::counter::CheckedCounter;

/// Owned, growable character sequence with a checked length.
///
/// Copies are deep: cloning a `Text` duplicates its buffer. Concatenation
/// computes the new length with `CheckedCounter` arithmetic before touching
/// the buffer.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Text
{
    buf: String,
    len: CheckedCounter,
}

impl Text
{
    pub fn new() -> Self { Self::default() }

    /// Length in bytes.
    pub fn len(&self) -> CheckedCounter { self.len }

    pub fn is_empty(&self) -> bool { self.len.is_zero() }

    pub fn as_str(&self) -> &str { &self.buf }

    /// Clear the buffer and release its storage.
    pub fn reset(&mut self)
    {
        self.buf = String::new();
        self.len = CheckedCounter::ZERO;
    }

    #[track_caller]
    pub fn push_str(&mut self, s: &str)
    {
        self.len += s.len();
        self.buf.push_str(s);
    }
}

impl From<&str> for Text
{
    fn from(s: &str) -> Self
    {
        Self {
            buf: s.to_owned(),
            len: CheckedCounter::from(s.len()),
        }
    }
}

impl From<String> for Text
{
    fn from(buf: String) -> Self
    {
        let len = CheckedCounter::from(buf.len());
        Self { buf, len }
    }
}

impl AsRef<str> for Text
{
    fn as_ref(&self) -> &str { &self.buf }
}

impl<S: AsRef<str>> AddAssign<S> for Text
{
    #[track_caller]
    fn add_assign(&mut self, rhs: S) { self.push_str(rhs.as_ref()) }
}

impl<S: AsRef<str>> Add<S> for Text
{
    type Output = Text;

    #[track_caller]
    fn add(mut self, rhs: S) -> Text
    {
        self += rhs;
        self
    }
}

impl fmt::Display for Text
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.buf) }
}

impl fmt::Debug for Text
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(&self.buf, f) }
}
