//! Error Types
//!
//! The runtime distinguishes two families of errors:
//!
//! - *Configuration errors* are raised while the graph is being wired:
//!   assigning a bare transform to a reactive attribute, retargeting a node
//!   that is not an alias, or constructing an engine with a nonsensical step
//!   size. These abort wiring immediately; there is no partial-graph
//!   fallback.
//!
//! - *Evaluation errors* surface while the graph runs: arithmetic on a
//!   non-numeric value or an ordering comparison between values that have no
//!   order. They propagate out of the tick loop through ordinary `Result`s.
//!
//! Transient I/O failures from source collaborators are deliberately *not*
//! represented here. A source that fails to poll keeps its previous value
//! and the failure is logged, never propagated (see `behavior::node`).

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by graph construction and evaluation.
#[derive(Debug, Error)]
pub enum Error {
    /// A bare transform was assigned to a reactive attribute. A transform is
    /// not evaluable without an input node, so this is rejected loudly at
    /// assignment time instead of being coerced.
    #[error("reactive attribute `{field}` must be assigned a behavior or a value, not a bare transform")]
    BareTransform {
        /// The attribute that was being assigned.
        field: String,
    },

    /// Attempted to swap the target of a node that is not an alias.
    #[error("only alias nodes can be retargeted")]
    RetargetNonAlias,

    /// The engine was configured with a step size that is not a positive,
    /// finite number of seconds.
    #[error("step size must be a positive, finite number of seconds, got {0}")]
    InvalidStepSize(f64),

    /// A numeric operation was applied to a non-numeric value.
    #[error("`{op}` expects a numeric value, got {found}")]
    NotNumeric {
        /// The operation that required a number.
        op: &'static str,
        /// The kind of value actually found.
        found: &'static str,
    },

    /// An ordering comparison was applied to values that have no order.
    #[error("cannot order {left} against {right}")]
    Incomparable {
        /// Kind of the left operand.
        left: &'static str,
        /// Kind of the right operand.
        right: &'static str,
    },

    /// An attribute was read before it was ever assigned.
    #[error("reactive attribute `{field}` has not been assigned")]
    UnboundAttribute {
        /// The attribute that was requested.
        field: String,
    },
}
