//! Deadline allocation for pipeline stages.
//!
//! A request arrives with an overall deadline (possibly unbounded). Each
//! stage derives its own child deadline from a fixed stage budget; the child
//! never exceeds the parent, so a stage is never granted more time than the
//! overall request has left.

use std::time::{Duration, Instant};

/// An absolute point in time by which an operation must complete.
///
/// Deadlines are monotonic (`Instant`-based): they guard in-process elapsed
/// time, not wall-clock time. An unbounded deadline never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn unbounded() -> Self {
        Self { expires_at: None }
    }

    /// A deadline at an absolute instant.
    pub fn at(instant: Instant) -> Self {
        Self {
            expires_at: Some(instant),
        }
    }

    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(budget),
        }
    }

    /// The absolute expiry instant, or `None` if unbounded.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Whether the deadline has already passed.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// Time left before expiry: `None` when unbounded, `Duration::ZERO`
    /// when already expired.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Derive a child deadline for one stage: the earlier of this deadline
    /// and `now + budget`.
    ///
    /// The child never exceeds the parent. If the parent has already passed,
    /// the child is already expired, so the stage fails immediately instead
    /// of attempting work.
    pub fn derive(&self, budget: Duration) -> Deadline {
        let candidate = Instant::now().checked_add(budget);
        let expires_at = match (self.expires_at, candidate) {
            (Some(parent), Some(child)) => Some(parent.min(child)),
            (Some(parent), None) => Some(parent),
            (None, child) => child,
        };
        Deadline { expires_at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_never_exceeds_parent() {
        let parent = Deadline::after(Duration::from_millis(50));
        let child = parent.derive(Duration::from_secs(10));

        assert_eq!(child.expires_at(), parent.expires_at());
    }

    #[test]
    fn test_child_bounded_by_budget() {
        let parent = Deadline::after(Duration::from_secs(10));
        let child = parent.derive(Duration::from_millis(200));

        let remaining = child.remaining().unwrap();
        assert!(remaining <= Duration::from_millis(200));
        assert!(child.expires_at().unwrap() <= parent.expires_at().unwrap());
    }

    #[test]
    fn test_expired_parent_derives_expired_child() {
        let past = Instant::now() - Duration::from_millis(10);
        let parent = Deadline::at(past);
        assert!(parent.is_expired());

        let child = parent.derive(Duration::from_secs(10));
        assert!(child.is_expired());
        assert_eq!(child.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_unbounded_parent_yields_budget_child() {
        let parent = Deadline::unbounded();
        assert!(!parent.is_expired());
        assert_eq!(parent.remaining(), None);

        let child = parent.derive(Duration::from_millis(200));
        assert!(child.expires_at().is_some());
        assert!(child.remaining().unwrap() <= Duration::from_millis(200));
    }

    #[test]
    fn test_remaining_counts_down() {
        let deadline = Deadline::after(Duration::from_millis(100));
        let first = deadline.remaining().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let second = deadline.remaining().unwrap();

        assert!(second < first);
    }
}
