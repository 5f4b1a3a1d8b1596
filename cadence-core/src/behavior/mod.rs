//! The Behavior Graph
//!
//! A behavior is a value that varies over discrete ticks. User code builds
//! a graph of them out of six node kinds:
//!
//! - **Constant**: an immutable value.
//! - **Mapped**: a pure transform over one upstream node.
//! - **Combined**: a pure transform over two upstream nodes.
//! - **Source**: state refreshed from an external collaborator (clock,
//!   keyboard) at most once per tick.
//! - **Accumulator**: a running total integrating its input at the
//!   scheduler's step size (explicit Euler).
//! - **Alias**: swappable indirection, the device behind reactive
//!   attributes.
//!
//! Reads are pure and advances are deduplicated by a per-node dirty flag,
//! so within a tick every read observes one consistent snapshot and every
//! shared dependency transitions at most once. The scheduler drives the
//! sample / advance / reset cycle; see `engine`.

mod combinators;
mod node;
mod source;

pub use combinators::{hold, integral, lift, Transform};
pub use node::Behavior;
pub use source::{keyboard, time};
