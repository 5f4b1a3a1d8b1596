//! Runtime Values
//!
//! The behavior graph is dynamically typed: a node may carry a number, a
//! boolean, a piece of text (an entity glyph, say), a keystroke token, or
//! nothing at all. `Value` is the closed set of those shapes, and this
//! module defines the arithmetic, ordering, and boolean operations the
//! combinator layer builds its transforms from.
//!
//! Operations that are only meaningful for some shapes (`add`, `lt`, ...)
//! return `Result` and fail with a descriptive error; total operations
//! (`truthy`, equality) do not.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// A discrete keystroke token, as delivered by a keyboard collaborator.
///
/// This is the full vocabulary a source node may report; anything the
/// collaborator cannot classify is simply "no input".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Esc,
    Backspace,
    Tab,
    Enter,
    /// Any printable character.
    Char(char),
}

/// A value flowing through the behavior graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The explicit "nothing" value: an unpressed keyboard, an empty slot.
    Nil,
    Bool(bool),
    Num(f64),
    Text(String),
    Key(Key),
}

impl Value {
    /// Human-readable name of this value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "a boolean",
            Value::Num(_) => "a number",
            Value::Text(_) => "text",
            Value::Key(_) => "a key",
        }
    }

    /// Numeric view of the value.
    pub fn as_num(&self, op: &'static str) -> Result<f64> {
        match self {
            Value::Num(n) => Ok(*n),
            other => Err(Error::NotNumeric {
                op,
                found: other.kind(),
            }),
        }
    }

    /// Total boolean view: nil is false, numbers are true when nonzero,
    /// text when non-empty, keys always.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Text(t) => !t.is_empty(),
            Value::Key(_) => true,
        }
    }

    /// Addition. Numbers add; text concatenates.
    pub fn add(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => {
                let mut joined = a.clone();
                joined.push_str(b);
                Ok(Value::Text(joined))
            }
            _ => Ok(Value::Num(self.as_num("add")? + other.as_num("add")?)),
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value> {
        Ok(Value::Num(self.as_num("sub")? - other.as_num("sub")?))
    }

    pub fn mul(&self, other: &Value) -> Result<Value> {
        Ok(Value::Num(self.as_num("mul")? * other.as_num("mul")?))
    }

    /// Division follows IEEE 754: dividing by zero yields an infinity.
    pub fn div(&self, other: &Value) -> Result<Value> {
        Ok(Value::Num(self.as_num("div")? / other.as_num("div")?))
    }

    pub fn rem(&self, other: &Value) -> Result<Value> {
        Ok(Value::Num(self.as_num("rem")? % other.as_num("rem")?))
    }

    pub fn neg(&self) -> Result<Value> {
        Ok(Value::Num(-self.as_num("neg")?))
    }

    pub fn abs(&self) -> Result<Value> {
        Ok(Value::Num(self.as_num("abs")?.abs()))
    }

    /// Ordering between two values. Only numbers have an order; NaN
    /// operands are rejected rather than silently compared.
    fn order(&self, other: &Value) -> Result<Ordering> {
        if let (Value::Num(a), Value::Num(b)) = (self, other) {
            if let Some(ordering) = a.partial_cmp(b) {
                return Ok(ordering);
            }
        }
        Err(Error::Incomparable {
            left: self.kind(),
            right: other.kind(),
        })
    }

    pub fn lt(&self, other: &Value) -> Result<Value> {
        Ok(Value::Bool(self.order(other)? == Ordering::Less))
    }

    pub fn le(&self, other: &Value) -> Result<Value> {
        Ok(Value::Bool(self.order(other)? != Ordering::Greater))
    }

    pub fn gt(&self, other: &Value) -> Result<Value> {
        Ok(Value::Bool(self.order(other)? == Ordering::Greater))
    }

    pub fn ge(&self, other: &Value) -> Result<Value> {
        Ok(Value::Bool(self.order(other)? != Ordering::Less))
    }

    /// Boolean conjunction via truthiness. Total: any shapes combine.
    pub fn and(&self, other: &Value) -> Value {
        Value::Bool(self.truthy() && other.truthy())
    }

    /// Boolean disjunction via truthiness.
    pub fn or(&self, other: &Value) -> Value {
        Value::Bool(self.truthy() || other.truthy())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Text(t) => write!(f, "{t}"),
            Value::Key(k) => write!(f, "{k:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Num(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(t: &str) -> Self {
        Value::Text(t.to_string())
    }
}

impl From<String> for Value {
    fn from(t: String) -> Self {
        Value::Text(t)
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        Value::Key(k)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
