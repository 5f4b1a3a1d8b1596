//! Reactors
//!
//! A reactor pairs a boolean-valued condition behavior with a side-effecting
//! action. Each tick the owning entity samples the condition; when it is
//! truthy the action runs. Actions routinely retarget the owning entity's
//! attributes and may install brand-new reactors on it, which is how the
//! classic boundary bounce works: a one-shot reactor reverses a rate and, in
//! the same action, installs a fresh one-shot watching the opposite
//! boundary. Two alternating reactors implement the whole edge-triggered
//! state machine.
//!
//! A non-recurring reactor is retired from its owner's active set after the
//! tick in which it fires, giving at-most-once semantics however long the
//! condition stays true.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::behavior::Behavior;
use crate::error::Result;

/// Unique identifier for a reactor, used to retire fired one-shots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReactorId(u64);

impl ReactorId {
    /// Generate a new unique reactor ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ReactorId {
    fn default() -> Self {
        Self::new()
    }
}

/// The action a reactor fires. It may mutate entities, install reactors,
/// or raise the engine's stop signal.
pub type Action = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// A condition-gated discrete trigger, one-shot or recurring.
pub struct Reactor {
    id: ReactorId,
    condition: Behavior,
    action: Action,
    recurring: bool,
}

impl Reactor {
    /// Create a one-shot reactor: after it fires, its owner drops it.
    pub fn new<F>(condition: Behavior, action: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::with(condition, Arc::new(action), false)
    }

    /// Create a recurring reactor: it fires on every tick its condition
    /// holds and is never retired.
    pub fn recurring<F>(condition: Behavior, action: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::with(condition, Arc::new(action), true)
    }

    fn with(condition: Behavior, action: Action, recurring: bool) -> Self {
        Self {
            id: ReactorId::new(),
            condition,
            action,
            recurring,
        }
    }

    /// Get the reactor's unique ID.
    pub fn id(&self) -> ReactorId {
        self.id
    }

    /// Whether the reactor survives firing.
    pub fn is_recurring(&self) -> bool {
        self.recurring
    }

    /// The condition behavior this reactor watches.
    pub fn condition(&self) -> &Behavior {
        &self.condition
    }

    /// Sample the condition and fire the action if it holds. Returns
    /// whether the action fired.
    pub(crate) fn poll(&self) -> Result<bool> {
        if !self.condition.value()?.truthy() {
            return Ok(false);
        }
        tracing::debug!(id = self.id.raw(), recurring = self.recurring, "reactor fired");
        (self.action)()?;
        Ok(true)
    }
}

impl Clone for Reactor {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            condition: self.condition.clone(),
            action: Arc::clone(&self.action),
            recurring: self.recurring,
        }
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("id", &self.id)
            .field("recurring", &self.recurring)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn fires_only_when_condition_holds() {
        let fired = Arc::new(AtomicI32::new(0));

        let fired_clone = fired.clone();
        let quiet = Reactor::new(Behavior::constant(false), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(!quiet.poll().unwrap());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        let fired_clone = fired.clone();
        let ready = Reactor::new(Behavior::constant(true), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(ready.poll().unwrap());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn condition_uses_truthiness() {
        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();

        // A nonzero number is as good as `true`.
        let reactor = Reactor::recurring(Behavior::constant(2.0), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(reactor.poll().unwrap());
        assert!(reactor.poll().unwrap());
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reactor_ids_are_unique() {
        let a = Reactor::new(Behavior::constant(true), || Ok(()));
        let b = Reactor::new(Behavior::constant(true), || Ok(()));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn action_errors_propagate() {
        let reactor = Reactor::new(Behavior::constant("text"), || Ok(()));
        // Truthy text fires fine; a failing condition read propagates.
        assert!(reactor.poll().unwrap());

        let broken = Reactor::new(Behavior::constant("x").neg(), || Ok(()));
        assert!(broken.poll().is_err());
    }
}
