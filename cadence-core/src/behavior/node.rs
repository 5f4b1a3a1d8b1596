//! Graph Nodes
//!
//! This module defines the node kinds that make up the behavior graph and
//! their evaluation contract.
//!
//! # The contract
//!
//! Every node exposes three operations:
//!
//! - `value()` is a pure read. It derives through mapped chains but never
//!   changes any node's state, so every read taken before the advance pass
//!   observes a single consistent snapshot: the state as of the end of the
//!   previous tick.
//!
//! - `advance(dt)` performs the node's one per-tick state transition and
//!   recursively advances the dependencies it owns. It is gated by the
//!   node's `dirty` flag: the first advance in a tick does the work, every
//!   later one is a no-op. That guard is what deduplicates fan-in (two
//!   parents sharing a source or an accumulator refresh it exactly once),
//!   and it is the only thing that does, so the flag is cleared *before*
//!   recursing into dependencies.
//!
//! - `reset_dirty()` restores `dirty = true` for the next tick, recursing
//!   through owned dependencies with the mirror-image guard (a node that is
//!   already dirty has been reset through another parent).
//!
//! # Identity
//!
//! `Behavior` is a cheap cloneable handle; clones share the underlying node.
//! This is what makes the alias kind work: everything that captured an alias
//! as an upstream dependency keeps observing it after its target is swapped,
//! because it captured the handle, not the target.

use std::fmt;
use std::io;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::value::Value;

/// A pure single-input transform, shared by mapped nodes.
pub(crate) type UnaryFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// A pure two-input transform, shared by combined nodes.
pub(crate) type BinaryFn = Arc<dyn Fn(Value, Value) -> Result<Value> + Send + Sync>;

/// A non-blocking poll of an external collaborator. Returning an error is
/// a transient hiccup: the node keeps its previous value.
pub(crate) type PollFn = Box<dyn FnMut() -> io::Result<Value> + Send + Sync>;

/// A time-varying value: one node of the behavior graph.
///
/// Clones share identity and state, in the same way two clones of a signal
/// handle observe the same underlying value.
pub struct Behavior {
    inner: Arc<RwLock<Node>>,
}

struct Node {
    /// True until the node participates in an advance pass this tick.
    dirty: bool,
    kind: NodeKind,
}

enum NodeKind {
    /// An immutable value; advancing is a no-op.
    Constant(Value),

    /// A pure transform over one upstream node. The value is derived on
    /// read; advancing only propagates the update request upstream.
    Mapped {
        upstream: Behavior,
        transform: UnaryFn,
    },

    /// A pure transform over two upstream nodes. Both operands are sampled
    /// at read time; neither is ever captured unevaluated.
    Combined {
        left: Behavior,
        right: Behavior,
        transform: BinaryFn,
    },

    /// External, time-varying state, re-polled at most once per tick.
    Source { current: Value, poll: PollFn },

    /// A running total: explicit Euler integration of the input at the
    /// step size handed down by the scheduler on every advance.
    Accumulator { input: Behavior, total: f64 },

    /// Indirection to another node. The only kind whose target may be
    /// swapped after construction.
    Alias { target: Behavior },
}

/// Owned pieces cloned out of a node so the lock is released before
/// recursing into dependencies.
enum Deps {
    One(Behavior),
    Two(Behavior, Behavior),
}

impl Behavior {
    fn from_kind(kind: NodeKind) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Node { dirty: true, kind })),
        }
    }

    /// Create a constant node wrapping an immutable value.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::from_kind(NodeKind::Constant(value.into()))
    }

    /// Create a source node. `poll` is invoked at most once per tick; an
    /// `Err` is logged and the previous value is kept (transient source
    /// failures never abort the run). `value()` reports `initial` until
    /// the first advance.
    pub fn source<F>(initial: impl Into<Value>, poll: F) -> Self
    where
        F: FnMut() -> io::Result<Value> + Send + Sync + 'static,
    {
        Self::from_kind(NodeKind::Source {
            current: initial.into(),
            poll: Box::new(poll),
        })
    }

    /// Create an alias forwarding to `target`.
    pub fn alias(target: Behavior) -> Self {
        Self::from_kind(NodeKind::Alias { target })
    }

    pub(crate) fn mapped(upstream: Behavior, transform: UnaryFn) -> Self {
        Self::from_kind(NodeKind::Mapped {
            upstream,
            transform,
        })
    }

    pub(crate) fn combined(left: Behavior, right: Behavior, transform: BinaryFn) -> Self {
        Self::from_kind(NodeKind::Combined {
            left,
            right,
            transform,
        })
    }

    pub(crate) fn accumulator(input: Behavior) -> Self {
        Self::from_kind(NodeKind::Accumulator { input, total: 0.0 })
    }

    /// Pure read of the most-recently-advanced state.
    pub fn value(&self) -> Result<Value> {
        enum Read {
            Forward(Behavior),
            Unary(Behavior, UnaryFn),
            Binary(Behavior, Behavior, BinaryFn),
        }

        let read = {
            let node = self.inner.read();
            match &node.kind {
                NodeKind::Constant(v) => return Ok(v.clone()),
                NodeKind::Source { current, .. } => return Ok(current.clone()),
                NodeKind::Accumulator { total, .. } => return Ok(Value::Num(*total)),
                NodeKind::Alias { target } => Read::Forward(target.clone()),
                NodeKind::Mapped {
                    upstream,
                    transform,
                } => Read::Unary(upstream.clone(), Arc::clone(transform)),
                NodeKind::Combined {
                    left,
                    right,
                    transform,
                } => Read::Binary(left.clone(), right.clone(), Arc::clone(transform)),
            }
        };

        match read {
            Read::Forward(target) => target.value(),
            Read::Unary(upstream, f) => f(upstream.value()?),
            Read::Binary(left, right, f) => f(left.value()?, right.value()?),
        }
    }

    /// Perform this node's one per-tick state transition, recursively
    /// advancing owned dependencies. A second call in the same tick is a
    /// no-op.
    pub fn advance(&self, dt: f64) -> Result<()> {
        let deps = {
            let mut node = self.inner.write();
            if !node.dirty {
                return Ok(());
            }
            // Cleared before recursing: a dependency shared by two parents
            // transitions at most once, and alias cycles terminate.
            node.dirty = false;

            match &mut node.kind {
                NodeKind::Constant(_) => return Ok(()),
                NodeKind::Source { current, poll } => {
                    match poll() {
                        Ok(value) => *current = value,
                        Err(err) => {
                            tracing::debug!(error = %err, "source poll failed, keeping previous value");
                        }
                    }
                    return Ok(());
                }
                NodeKind::Mapped { upstream, .. } => Deps::One(upstream.clone()),
                NodeKind::Alias { target } => Deps::One(target.clone()),
                NodeKind::Accumulator { input, .. } => {
                    let input = input.clone();
                    drop(node);

                    input.advance(dt)?;
                    let rate = input.value()?.as_num("integral")?;

                    let mut node = self.inner.write();
                    if let NodeKind::Accumulator { total, .. } = &mut node.kind {
                        *total += rate * dt;
                    }
                    return Ok(());
                }
                NodeKind::Combined { left, right, .. } => {
                    Deps::Two(left.clone(), right.clone())
                }
            }
        };

        match deps {
            Deps::One(dep) => dep.advance(dt),
            Deps::Two(left, right) => {
                left.advance(dt)?;
                right.advance(dt)
            }
        }
    }

    /// Restore `dirty = true` for the next tick, recursing through owned
    /// dependencies. Idempotent within a reset pass.
    pub fn reset_dirty(&self) {
        let deps = {
            let mut node = self.inner.write();
            if node.dirty {
                // Already reset through another parent this pass.
                return;
            }
            node.dirty = true;

            match &node.kind {
                NodeKind::Constant(_) | NodeKind::Source { .. } => return,
                NodeKind::Mapped { upstream, .. } => Deps::One(upstream.clone()),
                NodeKind::Alias { target } => Deps::One(target.clone()),
                NodeKind::Accumulator { input, .. } => Deps::One(input.clone()),
                NodeKind::Combined { left, right, .. } => {
                    Deps::Two(left.clone(), right.clone())
                }
            }
        };

        match deps {
            Deps::One(dep) => dep.reset_dirty(),
            Deps::Two(left, right) => {
                left.reset_dirty();
                right.reset_dirty();
            }
        }
    }

    /// Swap the target of an alias node. Handles that captured the alias
    /// keep working; they observe the new target on their next read.
    pub fn retarget(&self, new_target: Behavior) -> Result<()> {
        let mut node = self.inner.write();
        match &mut node.kind {
            NodeKind::Alias { target } => {
                *target = new_target;
                Ok(())
            }
            _ => Err(Error::RetargetNonAlias),
        }
    }

    /// Whether this node is an alias.
    pub fn is_alias(&self) -> bool {
        matches!(self.inner.read().kind, NodeKind::Alias { .. })
    }

    /// Whether the node has yet to participate in an advance pass this tick.
    pub fn is_dirty(&self) -> bool {
        self.inner.read().dirty
    }

    fn kind_name(&self) -> &'static str {
        match self.inner.read().kind {
            NodeKind::Constant(_) => "constant",
            NodeKind::Mapped { .. } => "mapped",
            NodeKind::Combined { .. } => "combined",
            NodeKind::Source { .. } => "source",
            NodeKind::Accumulator { .. } => "accumulator",
            NodeKind::Alias { .. } => "alias",
        }
    }
}

impl Clone for Behavior {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("kind", &self.kind_name())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_source(counter: Arc<AtomicUsize>) -> Behavior {
        Behavior::source(0.0, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Value::Num(n as f64))
        })
    }

    #[test]
    fn constant_value_survives_advance() {
        let c = Behavior::constant(7.5);
        assert_eq!(c.value().unwrap(), Value::Num(7.5));
        c.advance(0.1).unwrap();
        assert_eq!(c.value().unwrap(), Value::Num(7.5));
    }

    #[test]
    fn source_polls_at_most_once_per_tick() {
        let polls = Arc::new(AtomicUsize::new(0));
        let source = counting_source(polls.clone());

        source.advance(0.1).unwrap();
        source.advance(0.1).unwrap();
        source.advance(0.1).unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 1);

        source.reset_dirty();
        source.advance(0.1).unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shared_dependency_advances_once_across_parents() {
        let polls = Arc::new(AtomicUsize::new(0));
        let shared = counting_source(polls.clone());

        let a = shared.map(|v| v.mul(&Value::Num(2.0)));
        let b = shared.map(|v| v.add(&Value::Num(1.0)));

        a.advance(0.1).unwrap();
        b.advance(0.1).unwrap();

        // Both parents requested an update; the shared source refreshed once.
        assert_eq!(polls.load(Ordering::SeqCst), 1);
        assert_eq!(a.value().unwrap(), Value::Num(2.0));
        assert_eq!(b.value().unwrap(), Value::Num(2.0));
    }

    #[test]
    fn value_before_advance_reads_previous_snapshot() {
        let polls = Arc::new(AtomicUsize::new(0));
        let source = counting_source(polls.clone());

        // Initial construction value, no poll has happened.
        assert_eq!(source.value().unwrap(), Value::Num(0.0));
        assert_eq!(polls.load(Ordering::SeqCst), 0);

        source.advance(0.1).unwrap();
        assert_eq!(source.value().unwrap(), Value::Num(1.0));

        // A read in the next tick's sample phase still sees the end of the
        // previous tick, however many times it is taken.
        source.reset_dirty();
        assert_eq!(source.value().unwrap(), Value::Num(1.0));
        assert_eq!(source.value().unwrap(), Value::Num(1.0));
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn source_poll_error_keeps_previous_value() {
        let fail = Arc::new(AtomicUsize::new(0));
        let fail_clone = fail.clone();
        let source = Behavior::source(Value::Num(3.0), move || {
            if fail_clone.load(Ordering::SeqCst) == 1 {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "transient"))
            } else {
                Ok(Value::Num(9.0))
            }
        });

        source.advance(0.1).unwrap();
        assert_eq!(source.value().unwrap(), Value::Num(9.0));

        fail.store(1, Ordering::SeqCst);
        source.reset_dirty();
        source.advance(0.1).unwrap();
        assert_eq!(source.value().unwrap(), Value::Num(9.0));
    }

    #[test]
    fn accumulator_integrates_rate_times_step() {
        let rate = Behavior::constant(5.0);
        let total = Behavior::accumulator(rate);

        for _ in 0..10 {
            total.advance(0.1).unwrap();
            total.reset_dirty();
        }

        let sum = total.value().unwrap().as_num("test").unwrap();
        assert!((sum - 5.0).abs() < 1e-9, "expected ~5.0, got {sum}");
    }

    #[test]
    fn accumulator_double_advance_steps_once() {
        let total = Behavior::accumulator(Behavior::constant(1.0));
        total.advance(0.5).unwrap();
        total.advance(0.5).unwrap();
        assert_eq!(total.value().unwrap(), Value::Num(0.5));
    }

    #[test]
    fn step_size_is_late_bound() {
        // The same accumulator integrates at whatever step the scheduler
        // hands it, tick by tick.
        let total = Behavior::accumulator(Behavior::constant(1.0));
        total.advance(0.1).unwrap();
        total.reset_dirty();
        total.advance(0.4).unwrap();
        assert_eq!(total.value().unwrap(), Value::Num(0.5));
    }

    #[test]
    fn alias_forwards_and_retargets() {
        let alias = Behavior::alias(Behavior::constant(1.0));
        assert_eq!(alias.value().unwrap(), Value::Num(1.0));
        assert!(alias.is_alias());

        alias.retarget(Behavior::constant(2.0)).unwrap();
        assert_eq!(alias.value().unwrap(), Value::Num(2.0));
    }

    #[test]
    fn retarget_rejects_non_alias() {
        let c = Behavior::constant(1.0);
        assert!(matches!(
            c.retarget(Behavior::constant(2.0)),
            Err(Error::RetargetNonAlias)
        ));
    }

    #[test]
    fn captured_alias_observes_retarget() {
        let alias = Behavior::alias(Behavior::constant(10.0));
        let doubled = alias.map(|v| v.mul(&Value::Num(2.0)));

        assert_eq!(doubled.value().unwrap(), Value::Num(20.0));

        alias.retarget(Behavior::constant(-3.0)).unwrap();
        assert_eq!(doubled.value().unwrap(), Value::Num(-6.0));
    }

    #[test]
    fn self_referential_accumulator_terminates() {
        // x = integral(x): the alias ends up inside its own target. The
        // dirty guard makes the advance pass terminate, and each tick adds
        // total * dt.
        let x = Behavior::alias(Behavior::constant(1.0));
        x.retarget(Behavior::accumulator(x.clone())).unwrap();

        // total starts at 0, so it stays at 0; the point is termination.
        for _ in 0..3 {
            x.advance(0.1).unwrap();
            x.reset_dirty();
        }
        assert_eq!(x.value().unwrap(), Value::Num(0.0));
    }

    #[test]
    fn clone_shares_identity() {
        let a = Behavior::constant(1.0);
        let b = a.clone();
        assert_eq!(b.value().unwrap(), Value::Num(1.0));
        assert_eq!(a.is_dirty(), b.is_dirty());
    }
}
