//! Source Nodes
//!
//! Sources are the boundary between the graph and the outside world: a
//! node whose state originates from a non-graph collaborator and is
//! refreshed at most once per tick. The collaborators themselves (raw
//! terminal capture, clocks) live outside this crate; what lives here is
//! the narrow polling contract they are consumed through.

use std::io;
use std::time::Instant;

use crate::value::{Key, Value};

use super::node::Behavior;

/// Wall-clock elapsed seconds since the node was built.
///
/// Reads real elapsed time rather than assuming exact step spacing: tick
/// timing is best-effort periodic and accumulated drift is expected.
pub fn time() -> Behavior {
    let start = Instant::now();
    Behavior::source(0.0, move || Ok(Value::Num(start.elapsed().as_secs_f64())))
}

/// Wrap a non-blocking keystroke reader into a source node.
///
/// The reader returns `Ok(None)` immediately when nothing is pending,
/// which becomes [`Value::Nil`]. A read error is a transient hiccup; the
/// node keeps its previous value for the tick and the run continues.
pub fn keyboard<F>(mut read_key: F) -> Behavior
where
    F: FnMut() -> io::Result<Option<Key>> + Send + Sync + 'static,
{
    Behavior::source(Value::Nil, move || {
        Ok(match read_key()? {
            Some(key) => Value::Key(key),
            None => Value::Nil,
        })
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
