use std::thread::{self, ThreadId};

use crate::{Error, Result};

/// Remembers which thread created it and can tell whether a later call happens on that
/// same thread.
///
/// Types whose operations are only meaningful on their owning thread embed one of these and
/// check it at the start of each such operation.
///
/// # Example
///
/// ```rust
/// use events_wait::AffinityGuard;
///
/// let guard = AffinityGuard::new();
/// assert!(guard.is_current());
///
/// std::thread::spawn(move || {
///     assert!(!guard.is_current());
///     assert!(guard.check("example").is_err());
/// })
/// .join()
/// .unwrap();
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AffinityGuard {
    owner: ThreadId,
}

impl AffinityGuard {
    /// Creates a guard owned by the current thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// The thread that created the guard.
    #[must_use]
    pub fn owner(self) -> ThreadId {
        self.owner
    }

    /// Whether the current thread is the one that created the guard.
    #[must_use]
    pub fn is_current(self) -> bool {
        self.owner == thread::current().id()
    }

    /// Returns [`Error::WrongThread`] naming `operation` if the current thread is not the
    /// one that created the guard.
    ///
    /// # Errors
    ///
    /// Returns an error if called from any thread other than the owner.
    pub fn check(self, operation: &'static str) -> Result<()> {
        let current = thread::current().id();

        if current == self.owner {
            Ok(())
        } else {
            Err(Error::WrongThread {
                operation,
                owner: self.owner,
                current,
            })
        }
    }
}

impl Default for AffinityGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(AffinityGuard: Send, Sync, Copy);

    #[test]
    fn owner_thread_passes() {
        let guard = AffinityGuard::new();

        assert!(guard.is_current());
        assert_eq!(guard.owner(), thread::current().id());
        guard.check("test").unwrap();
    }

    #[test]
    fn other_thread_fails() {
        let guard = AffinityGuard::default();

        let (is_current, result) =
            thread::spawn(move || (guard.is_current(), guard.check("test")))
                .join()
                .unwrap();

        assert!(!is_current);
        assert!(matches!(
            result,
            Err(Error::WrongThread { operation: "test", owner, .. }) if owner == guard.owner()
        ));
    }

    #[test]
    fn guard_created_elsewhere_belongs_to_creator() {
        let guard = thread::spawn(AffinityGuard::new).join().unwrap();

        assert!(!guard.is_current());
        assert!(guard.check("test").is_err());
    }
}
