//! Entities and Reactive Attributes
//!
//! An entity is an owner of reactive attributes and reactors. Its
//! attributes are per-instance named bindings that always resolve to an
//! alias node: the first assignment creates the alias around the assigned
//! behavior, every later assignment swaps the alias's target in place.
//! Anything that captured the attribute earlier keeps working after a
//! reassignment because it captured the alias, not the target.
//!
//! That indirection is what makes self-referential definitions legal:
//! `x = integral(x)` reads the existing alias while building the right-hand
//! side, and the new target is installed only once the graph is fully
//! constructed (read-before-write).
//!
//! Assignments are coerced: a behavior passes through, a raw value becomes
//! a constant, and a bare transform is rejected loudly at assignment time,
//! since a transform is not evaluable without an input node.
//!
//! Entities are *not* registered anywhere by construction. The caller hands
//! them to the engine explicitly.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::behavior::{Behavior, Transform};
use crate::error::{Error, Result};
use crate::reactor::{Reactor, ReactorId};
use crate::value::{Key, Value};

/// Anything assignable to a reactive attribute.
///
/// The `Transform` variant exists so the rejection happens inside
/// [`Attributes::set`] with a useful error, not at some distant call site.
#[derive(Debug)]
pub enum Binding {
    Behavior(Behavior),
    Value(Value),
    Transform(Transform),
}

impl From<Behavior> for Binding {
    fn from(b: Behavior) -> Self {
        Binding::Behavior(b)
    }
}

impl From<&Behavior> for Binding {
    fn from(b: &Behavior) -> Self {
        Binding::Behavior(b.clone())
    }
}

impl From<Transform> for Binding {
    fn from(t: Transform) -> Self {
        Binding::Transform(t)
    }
}

impl From<Value> for Binding {
    fn from(v: Value) -> Self {
        Binding::Value(v)
    }
}

impl From<f64> for Binding {
    fn from(n: f64) -> Self {
        Binding::Value(Value::Num(n))
    }
}

impl From<i64> for Binding {
    fn from(n: i64) -> Self {
        Binding::Value(Value::Num(n as f64))
    }
}

impl From<bool> for Binding {
    fn from(b: bool) -> Self {
        Binding::Value(Value::Bool(b))
    }
}

impl From<&str> for Binding {
    fn from(t: &str) -> Self {
        Binding::Value(Value::from(t))
    }
}

impl From<Key> for Binding {
    fn from(k: Key) -> Self {
        Binding::Value(Value::Key(k))
    }
}

/// Per-instance mapping from field name to alias node.
#[derive(Debug, Default)]
pub struct Attributes {
    slots: IndexMap<String, Behavior>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`. First assignment creates the alias; later assignments
    /// retarget it in place, preserving identity for existing captures.
    pub fn set(&mut self, name: &str, binding: impl Into<Binding>) -> Result<()> {
        let behavior = match binding.into() {
            Binding::Behavior(b) => b,
            Binding::Value(v) => Behavior::constant(v),
            Binding::Transform(_) => {
                return Err(Error::BareTransform {
                    field: name.to_string(),
                })
            }
        };

        match self.slots.get(name) {
            Some(alias) => alias.retarget(behavior),
            None => {
                self.slots
                    .insert(name.to_string(), Behavior::alias(behavior));
                Ok(())
            }
        }
    }

    /// The attribute's alias handle, or `None` if never assigned.
    pub fn get(&self, name: &str) -> Option<Behavior> {
        self.slots.get(name).cloned()
    }

    /// Sample the attribute's current value.
    pub fn value(&self, name: &str) -> Result<Value> {
        match self.slots.get(name) {
            Some(alias) => alias.value(),
            None => Err(Error::UnboundAttribute {
                field: name.to_string(),
            }),
        }
    }

    /// Iterate over the bound alias nodes in assignment order.
    pub fn behaviors(&self) -> impl Iterator<Item = &Behavior> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Default)]
struct EntityInner {
    attrs: Attributes,
    reactors: SmallVec<[Reactor; 4]>,
}

/// An owner of reactive attributes and reactors.
///
/// Clones share identity and state, so reactor actions can capture a
/// handle to their owning entity and mutate it when they fire.
#[derive(Clone, Default)]
pub struct Entity {
    inner: Arc<RwLock<EntityInner>>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a reactive attribute. See [`Attributes::set`].
    pub fn set_attr(&self, name: &str, binding: impl Into<Binding>) -> Result<()> {
        self.inner.write().attrs.set(name, binding)
    }

    /// The attribute's alias handle, or `None` if never assigned.
    pub fn attr(&self, name: &str) -> Option<Behavior> {
        self.inner.read().attrs.get(name)
    }

    /// Sample an attribute's current value.
    pub fn attr_value(&self, name: &str) -> Result<Value> {
        self.inner.read().attrs.value(name)
    }

    /// Install a reactor on this entity. Safe to call from a firing
    /// reactor's action; the new reactor joins the active set next tick.
    pub fn add_reactor(&self, reactor: Reactor) {
        self.inner.write().reactors.push(reactor);
    }

    /// Number of active reactors.
    pub fn reactor_count(&self) -> usize {
        self.inner.read().reactors.len()
    }

    /// Sample every attribute once, forcing derivation through any mapped
    /// chains hanging off them.
    pub(crate) fn sample(&self) -> Result<()> {
        let attrs: Vec<Behavior> = {
            let inner = self.inner.read();
            inner.attrs.behaviors().cloned().collect()
        };
        for behavior in &attrs {
            behavior.value()?;
        }
        Ok(())
    }

    /// Evaluate a snapshot of the active reactors once each, then retire
    /// fired one-shots.
    ///
    /// Actions run with no entity lock held, so they are free to retarget
    /// attributes and install new reactors on this very entity; additions
    /// made mid-pass are neither evaluated nor retired this tick.
    ///
    /// A failing poll aborts the pass, but one-shots that already fired are
    /// retired before the error propagates: firing is at most once even on
    /// the error path.
    pub(crate) fn evaluate_reactors(&self) -> Result<()> {
        let snapshot: Vec<Reactor> = {
            let inner = self.inner.read();
            inner.reactors.iter().cloned().collect()
        };

        let mut retired: Vec<ReactorId> = Vec::new();
        let mut failed: Option<Error> = None;
        for reactor in &snapshot {
            match reactor.poll() {
                Ok(fired) => {
                    if fired && !reactor.is_recurring() {
                        retired.push(reactor.id());
                    }
                }
                Err(err) => {
                    failed = Some(err);
                    break;
                }
            }
        }

        if !retired.is_empty() {
            let mut inner = self.inner.write();
            inner.reactors.retain(|r| !retired.contains(&r.id()));
            tracing::debug!(count = retired.len(), "retired one-shot reactors");
        }
        match failed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Advance the entity's own nodes: attribute aliases and the remaining
    /// reactor conditions. Dirty-flag dedup applies as everywhere else.
    pub(crate) fn advance(&self, dt: f64) -> Result<()> {
        let nodes = self.owned_nodes();
        for node in &nodes {
            node.advance(dt)?;
        }
        Ok(())
    }

    /// Reset dirty flags on the entity's own nodes for the next tick.
    pub(crate) fn reset_dirty(&self) {
        for node in self.owned_nodes() {
            node.reset_dirty();
        }
    }

    fn owned_nodes(&self) -> Vec<Behavior> {
        let inner = self.inner.read();
        inner
            .attrs
            .behaviors()
            .cloned()
            .chain(inner.reactors.iter().map(|r| r.condition().clone()))
            .collect()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Entity")
            .field("attributes", &inner.attrs.len())
            .field("reactors", &inner.reactors.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{integral, lift};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn first_assignment_creates_an_alias() {
        let entity = Entity::new();
        entity.set_attr("x", 3.0).unwrap();

        let x = entity.attr("x").unwrap();
        assert!(x.is_alias());
        assert_eq!(x.value().unwrap(), Value::Num(3.0));
    }

    #[test]
    fn unset_attribute_is_explicit() {
        let entity = Entity::new();
        assert!(entity.attr("missing").is_none());
        assert!(matches!(
            entity.attr_value("missing"),
            Err(Error::UnboundAttribute { .. })
        ));
    }

    #[test]
    fn reassignment_preserves_identity() {
        let entity = Entity::new();
        entity.set_attr("speed", 1.0).unwrap();

        let before = entity.attr("speed").unwrap();
        entity.set_attr("speed", 2.0).unwrap();
        let after = entity.attr("speed").unwrap();

        // Same alias, new target: the old capture observes the new value.
        assert_eq!(before.value().unwrap(), Value::Num(2.0));
        assert_eq!(after.value().unwrap(), Value::Num(2.0));
    }

    #[test]
    fn captured_expression_tracks_reassignment() {
        let entity = Entity::new();
        entity.set_attr("x", 4.0).unwrap();

        let x = entity.attr("x").unwrap();
        let doubled = x.mul(2.0);
        assert_eq!(doubled.value().unwrap(), Value::Num(8.0));

        // Rebinding x does not invalidate the expression built from it.
        entity.set_attr("x", 10.0).unwrap();
        assert_eq!(doubled.value().unwrap(), Value::Num(20.0));
    }

    #[test]
    fn bare_transform_is_rejected_at_assignment() {
        let entity = Entity::new();
        let err = entity
            .set_attr("x", lift(|v| v.neg()))
            .unwrap_err();
        assert!(matches!(err, Error::BareTransform { field } if field == "x"));
    }

    #[test]
    fn self_reference_reads_before_writing() {
        let entity = Entity::new();
        entity.set_attr("vx", 5.0).unwrap();

        // position = integral(velocity), assigned back onto the same
        // entity. The right-hand side is built against the existing alias
        // before the new target is installed.
        let vx = entity.attr("vx").unwrap();
        entity.set_attr("x", integral(&vx)).unwrap();

        let x = entity.attr("x").unwrap();
        x.advance(0.1).unwrap();
        assert_eq!(x.value().unwrap(), Value::Num(0.5));
    }

    #[test]
    fn behavior_assignment_passes_through() {
        let entity = Entity::new();
        let clock = Behavior::constant(1.0).add(2.0);
        entity.set_attr("t", &clock).unwrap();
        assert_eq!(entity.attr_value("t").unwrap(), Value::Num(3.0));
    }

    #[test]
    fn reactors_can_mutate_their_owner() {
        let entity = Entity::new();
        entity.set_attr("hits", 0.0).unwrap();

        let owner = entity.clone();
        entity.add_reactor(Reactor::recurring(Behavior::constant(true), move || {
            let hits = owner.attr_value("hits")?.as_num("hits")?;
            owner.set_attr("hits", hits + 1.0)
        }));

        entity.evaluate_reactors().unwrap();
        entity.evaluate_reactors().unwrap();
        assert_eq!(entity.attr_value("hits").unwrap(), Value::Num(2.0));
    }

    #[test]
    fn fired_one_shot_is_retired() {
        let entity = Entity::new();
        entity.add_reactor(Reactor::new(Behavior::constant(true), || Ok(())));
        assert_eq!(entity.reactor_count(), 1);

        entity.evaluate_reactors().unwrap();
        assert_eq!(entity.reactor_count(), 0);
    }

    #[test]
    fn recurring_reactor_survives_firing() {
        let entity = Entity::new();
        entity.add_reactor(Reactor::recurring(Behavior::constant(true), || Ok(())));

        entity.evaluate_reactors().unwrap();
        entity.evaluate_reactors().unwrap();
        assert_eq!(entity.reactor_count(), 1);
    }

    #[test]
    fn fired_one_shot_is_retired_even_when_a_later_reactor_errors() {
        let fired = Arc::new(AtomicUsize::new(0));
        let entity = Entity::new();

        let fired_clone = fired.clone();
        entity.add_reactor(Reactor::new(Behavior::constant(true), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        // A condition whose read fails: negating text is an evaluation error.
        entity.add_reactor(Reactor::new(Behavior::constant("x").neg(), || Ok(())));

        // The pass errors, but the one-shot that already fired is gone.
        assert!(entity.evaluate_reactors().is_err());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(entity.reactor_count(), 1);

        // The next pass must not fire it a second time.
        assert!(entity.evaluate_reactors().is_err());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reactor_installed_mid_pass_waits_for_next_tick() {
        let entity = Entity::new();
        let owner = entity.clone();

        entity.add_reactor(Reactor::new(Behavior::constant(true), move || {
            owner.add_reactor(Reactor::new(Behavior::constant(true), || Ok(())));
            Ok(())
        }));

        // The installer fires and is retired; the newly installed reactor
        // is neither evaluated nor retired this pass.
        entity.evaluate_reactors().unwrap();
        assert_eq!(entity.reactor_count(), 1);

        entity.evaluate_reactors().unwrap();
        assert_eq!(entity.reactor_count(), 0);
    }
}
