//! Cadence Core
//!
//! This crate is a minimal functional-reactive runtime for small,
//! fixed-step interactive simulations. It implements:
//!
//! - A behavior graph of time-varying values (constants, mapped and
//!   combined derivations, external sources, Euler accumulators, and
//!   swappable aliases)
//! - A combinator algebra for building that graph from ordinary
//!   arithmetic and comparison expressions
//! - Reactive attributes: per-entity bindings that can be redefined
//!   without invalidating expressions that already captured them
//! - Reactors: condition-gated one-shot or recurring triggers
//! - A synchronous, glitch-free, fixed-step scheduler
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `behavior`: the node algebra, combinators, and source contracts
//! - `entity`: reactive attribute binding and entity ownership
//! - `reactor`: discrete triggers
//! - `engine`: the four-phase tick scheduler
//! - `value`: the dynamic value type flowing through the graph
//! - `error`: construction- and evaluation-time error taxonomy
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{integral, Engine, Entity, Reactor};
//!
//! # fn main() -> cadence_core::Result<()> {
//! // A ball moving at 5 units/second, position integrated from velocity.
//! let ball = Entity::new();
//! ball.set_attr("vx", 5.0)?;
//! let vx = ball.attr("vx").unwrap();
//! ball.set_attr("x", integral(&vx))?;
//!
//! // Reverse velocity when the ball reaches the right wall.
//! let x = ball.attr("x").unwrap();
//! let at_wall = x.ge(20.0);
//! let owner = ball.clone();
//! ball.add_reactor(Reactor::new(at_wall, move || {
//!     let v = owner.attr_value("vx")?.as_num("vx")?;
//!     owner.set_attr("vx", -v)
//! }));
//!
//! let mut engine = Engine::new(0.1)?;
//! engine.add_entity(ball.clone());
//! for _ in 0..100 {
//!     engine.tick()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod behavior;
pub mod engine;
pub mod entity;
pub mod error;
pub mod reactor;
pub mod value;

pub use behavior::{hold, integral, keyboard, lift, time, Behavior, Transform};
pub use engine::{Engine, RenderFn, StopHandle};
pub use entity::{Attributes, Binding, Entity};
pub use error::{Error, Result};
pub use reactor::{Reactor, ReactorId};
pub use value::{Key, Value};
