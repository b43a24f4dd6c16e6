/// Axiomatic model of one `Observed` allocation.
///
/// Each operation on the handles is viewed in terms of how it alters the
/// number of strong and weak references and which heap cells are still
/// alive. Every transition asserts its preconditions, so a sequence of
/// transitions that runs to completion is a legal history.
///
/// The model also covers `Shared`, which is the special case with no weak
/// references.
#[allow(dead_code)]
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axioms
{
    /// Live `Observed` handles.
    pub strong: u64,

    /// Live `Weak` handles.
    pub weak: u64,

    /// The managed value has not been dropped.
    pub value_alive: bool,

    /// The `RefCountBlock` has not been freed.
    pub block_alive: bool,
}

#[allow(dead_code)]
impl Axioms
{
    /// Constructing a handle creates the value and a block with one strong
    /// reference.
    ///
    /// ```notest
    /// Self { strong: 1, weak: 0, value_alive: true, block_alive: true }
    /// ```
    pub fn construct() -> Self
    {
        Self {
            strong: 1,
            weak: 0,
            value_alive: true,
            block_alive: true,
        }
    }

    /// Copying a strong handle needs a live value.
    ///
    /// ```notest
    /// assert!(self.value_alive);
    /// self.strong += 1;
    /// self
    /// ```
    pub fn copy(mut self) -> Self
    {
        assert!(self.value_alive);
        self.strong += 1;
        self
    }

    /// Dropping the last strong handle drops the value, and also frees the
    /// block when no weak handle remains.
    ///
    /// ```notest
    /// assert!(self.strong > 0);
    /// self.strong -= 1;
    /// if self.strong == 0 {
    ///     self.value_alive = false;
    ///     self.block_alive = self.weak > 0;
    /// }
    /// self
    /// ```
    ///
    /// Sequencing:
    /// ```
    /// ownref::Axioms::construct().copy().drop_strong().drop_strong().finished();
    /// ```
    pub fn drop_strong(mut self) -> Self
    {
        assert!(self.strong > 0);
        self.strong -= 1;
        if self.strong == 0 {
            self.value_alive = false;
            self.block_alive = self.weak > 0;
        }
        self
    }

    /// Downgrading adds a weak reference to a live allocation.
    ///
    /// ```notest
    /// assert!(self.strong > 0);
    /// self.weak += 1;
    /// self
    /// ```
    pub fn downgrade(mut self) -> Self
    {
        assert!(self.strong > 0);
        self.weak += 1;
        self
    }

    /// A weak handle can be copied whether or not the value lives.
    ///
    /// ```notest
    /// assert!(self.weak > 0);
    /// self.weak += 1;
    /// self
    /// ```
    pub fn copy_weak(mut self) -> Self
    {
        assert!(self.weak > 0 && self.block_alive);
        self.weak += 1;
        self
    }

    /// Dropping the last reference of either kind frees the block.
    ///
    /// ```notest
    /// assert!(self.weak > 0);
    /// self.weak -= 1;
    /// self.block_alive = self.strong + self.weak > 0;
    /// self
    /// ```
    ///
    /// Sequencing, with the weak reference outliving the value:
    /// ```
    /// ownref::Axioms::construct()
    ///     .downgrade()
    ///     .drop_strong()
    ///     .drop_weak()
    ///     .finished();
    /// ```
    pub fn drop_weak(mut self) -> Self
    {
        assert!(self.weak > 0 && self.block_alive);
        self.weak -= 1;
        self.block_alive = self.strong + self.weak > 0;
        self
    }

    /// Upgrading succeeds exactly when the value is alive, and then adds a
    /// strong reference.
    ///
    /// ```notest
    /// assert!(self.weak > 0);
    /// if self.value_alive { self.strong += 1 }
    /// (self, self.value_alive)
    /// ```
    ///
    /// ```
    /// let (a, ok) = ownref::Axioms::construct().downgrade().upgrade();
    /// assert!(ok);
    /// let (a, ok) = a.drop_strong().drop_strong().upgrade();
    /// assert!(!ok);
    /// a.drop_weak().finished();
    /// ```
    pub fn upgrade(mut self) -> (Self, bool)
    {
        assert!(self.weak > 0 && self.block_alive);
        let ok = self.value_alive;
        if ok {
            self.strong += 1;
        }
        (self, ok)
    }

    /// A finished history has released both cells.
    ///
    /// ```notest
    /// assert_eq!(self.strong + self.weak, 0);
    /// assert!(!self.value_alive && !self.block_alive);
    /// ```
    pub fn finished(self)
    {
        assert_eq!(self.strong + self.weak, 0);
        assert!(!self.value_alive && !self.block_alive);
    }

    /// The value lives exactly while strong references exist, and the block
    /// exactly while references of either kind exist. Holds after every
    /// transition:
    ///
    /// ```
    /// let a = ownref::Axioms::construct().downgrade().copy_weak();
    /// assert!(a.consistent());
    /// let a = a.drop_strong();
    /// assert!(a.consistent() && a.block_alive && !a.value_alive);
    /// ```
    pub fn consistent(&self) -> bool
    {
        self.value_alive == (self.strong > 0) && self.block_alive == (self.strong + self.weak > 0)
    }

    /// The main claim: however many observers an allocation gathers, the
    /// value is dropped once and the block is freed once.
    ///
    /// ```
    /// ownref::Axioms::observers_outlive_value()
    /// ```
    pub fn observers_outlive_value()
    {
        let mut a = Self::construct().copy();
        for _ in 0..100 {
            a = a.downgrade();
        }
        a = a.drop_strong().drop_strong();
        assert!(!a.value_alive && a.block_alive);
        for _ in 0..100 {
            a = a.drop_weak();
        }
        a.finished()
    }
}
