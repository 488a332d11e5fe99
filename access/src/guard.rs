//! Per-instance reentrancy guard.

use crate::error::AccessError;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-operation-at-a-time lock for a contract instance.
///
/// The flag is set on entry and cleared when the returned [`GuardToken`] is
/// dropped, so every early return releases it. A second entry while the
/// flag is held fails immediately with `ReentrantCall`; it never blocks.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self {
            entered: AtomicBool::new(false),
        }
    }

    pub fn enter(&self) -> Result<GuardToken<'_>, AccessError> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| AccessError::ReentrantCall)?;
        Ok(GuardToken { guard: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Proof that the guard is held. Releases the guard on drop.
#[must_use = "the guard is released as soon as the token is dropped"]
#[derive(Debug)]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_entry_fails_fast() {
        let guard = ReentrancyGuard::new();
        let _token = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert_eq!(guard.enter().unwrap_err(), AccessError::ReentrantCall);
    }

    #[test]
    fn drop_releases() {
        let guard = ReentrancyGuard::new();
        {
            let _token = guard.enter().unwrap();
        }
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn early_return_releases() {
        fn failing(guard: &ReentrancyGuard) -> Result<(), AccessError> {
            let _token = guard.enter()?;
            Err(AccessError::InvalidOwner)
        }
        let guard = ReentrancyGuard::new();
        assert!(failing(&guard).is_err());
        assert!(!guard.is_entered());
    }

    #[test]
    fn other_thread_is_rejected_not_queued() {
        let guard = ReentrancyGuard::new();
        let _token = guard.enter().unwrap();
        std::thread::scope(|scope| {
            let other = scope.spawn(|| guard.enter().map(|_| ()));
            assert_eq!(other.join().unwrap(), Err(AccessError::ReentrantCall));
        });
    }
}
