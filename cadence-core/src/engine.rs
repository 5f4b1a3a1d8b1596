//! The Engine
//!
//! The engine drives the behavior graph forward with a fixed-step,
//! single-threaded tick loop. Each tick runs four phases in strict order:
//!
//! 1. **Sample**: read every root behavior (pure; forces derivation
//!    through mapped chains) and invoke the render sink once with the
//!    registered entities. All reads observe the state as of the end of
//!    the previous tick.
//! 2. **Advance**: perform each root's per-tick state transition; the
//!    dirty-flag guard deduplicates shared dependencies.
//! 3. **Entity pass**: per entity, sample its attributes, evaluate a
//!    snapshot of its active reactors once each, retire fired one-shots,
//!    then advance the entity's own nodes.
//! 4. **Reset**: restore every dirty flag for the next tick.
//!
//! Between ticks [`Engine::run`] pauses for the step size. The pause plus
//! processing time determines real elapsed time, so tick timing is
//! best-effort periodic; wall-clock sources read actual elapsed time
//! rather than assuming exact spacing.
//!
//! There is no parallelism and no suspension point: the four phases run to
//! completion before the next sleep. Cancellation is cooperative: a
//! [`StopHandle`], typically raised by a quit reactor, ends the loop at
//! the next tick boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::behavior::Behavior;
use crate::entity::Entity;
use crate::error::{Error, Result};

/// The render sink: invoked once per tick with the registered entities.
/// It reads positions and glyphs off them; it performs no graph mutation.
pub type RenderFn = Box<dyn FnMut(&[Entity]) + Send>;

/// Cooperative stop signal for the run loop.
///
/// Clones share the flag, so a quit reactor can hold one and raise it from
/// inside a tick; the loop notices at the next boundary.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run loop end after the current tick.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// The fixed-step scheduler owning the root behaviors and the entity
/// registry.
pub struct Engine {
    step_size: f64,
    behaviors: Vec<Behavior>,
    entities: Vec<Entity>,
    render: Option<RenderFn>,
    stop: StopHandle,
    ticks: u64,
}

impl Engine {
    /// Create an engine with the given step size in seconds per tick.
    ///
    /// The step size is validated here and threaded into every accumulator
    /// advance, so it is the single authority on integration granularity.
    pub fn new(step_size: f64) -> Result<Self> {
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(Error::InvalidStepSize(step_size));
        }
        Ok(Self {
            step_size,
            behaviors: Vec::new(),
            entities: Vec::new(),
            render: None,
            stop: StopHandle::new(),
            ticks: 0,
        })
    }

    /// Seconds per tick.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Register a root behavior. Roots are what the engine samples and
    /// advances; anything reachable from them comes along for free.
    pub fn add_behavior(&mut self, behavior: Behavior) {
        self.behaviors.push(behavior);
    }

    /// Register an entity. Registration is always explicit; constructing
    /// an entity never touches the engine.
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Install the render sink.
    pub fn set_render<F>(&mut self, render: F)
    where
        F: FnMut(&[Entity]) + Send + 'static,
    {
        self.render = Some(Box::new(render));
    }

    /// A handle that stops [`Engine::run`] at the next tick boundary.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick: sample, advance, entity pass, reset.
    pub fn tick(&mut self) -> Result<()> {
        tracing::trace!(tick = self.ticks, "sample");
        for behavior in &self.behaviors {
            behavior.value()?;
        }
        if let Some(render) = self.render.as_mut() {
            render(&self.entities);
        }

        tracing::trace!(tick = self.ticks, "advance");
        for behavior in &self.behaviors {
            behavior.advance(self.step_size)?;
        }

        tracing::trace!(tick = self.ticks, "entity pass");
        for entity in &self.entities {
            entity.sample()?;
            entity.evaluate_reactors()?;
            entity.advance(self.step_size)?;
        }

        tracing::trace!(tick = self.ticks, "reset");
        for behavior in &self.behaviors {
            behavior.reset_dirty();
        }
        for entity in &self.entities {
            entity.reset_dirty();
        }

        self.ticks += 1;
        Ok(())
    }

    /// Tick until the stop handle is raised, pausing for the step size
    /// between ticks.
    pub fn run(&mut self) -> Result<()> {
        let pause = Duration::from_secs_f64(self.step_size);
        while !self.stop.is_stopped() {
            thread::sleep(pause);
            self.tick()?;
        }
        tracing::debug!(ticks = self.ticks, "run loop stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("step_size", &self.step_size)
            .field("behaviors", &self.behaviors.len())
            .field("entities", &self.entities.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
