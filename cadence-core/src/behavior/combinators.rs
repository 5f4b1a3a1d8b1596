//! Combinator Layer
//!
//! Everything here builds graph nodes out of ordinary-looking expressions:
//! lifting pure functions into transforms, piping behaviors through them,
//! and an arithmetic/comparison/boolean builder algebra on `Behavior`.
//!
//! # Two-node operands
//!
//! Every binary builder routes through [`Behavior::combine`], which samples
//! *both* operands at read time. The single-operand shortcut of capturing
//! the right-hand node unevaluated inside the transform is deliberately not
//! offered anywhere; see DESIGN.md for the background on why.
//!
//! # Operator sugar
//!
//! `+ - * / %` and unary `-` are implemented for `&Behavior` (with scalar
//! operands on either side). `Behavior` is a dedicated node type used for
//! nothing else, so the overloads are unambiguous. Comparisons stay methods
//! (`lt`, `ge`, ...) since Rust's comparison operators cannot return nodes.

use std::sync::Arc;

use crate::error::Result;
use crate::value::{Key, Value};

use super::node::{Behavior, UnaryFn};

/// A pure transform awaiting an input node.
///
/// Distinct from a value-bearing behavior: a transform cannot be evaluated
/// on its own, which is why reactive attributes refuse it. It becomes a
/// node only once applied to a behavior.
#[derive(Clone)]
pub struct Transform {
    f: UnaryFn,
}

impl Transform {
    /// Wrap a pure function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Sequential composition: `self` first, then `next`.
    pub fn then(&self, next: &Transform) -> Transform {
        let first = Arc::clone(&self.f);
        let second = Arc::clone(&next.f);
        Transform::new(move |value| second(first(value)?))
    }

    /// Apply the transform to a behavior, yielding a mapped node.
    pub fn applied_to(&self, behavior: &Behavior) -> Behavior {
        Behavior::mapped(behavior.clone(), Arc::clone(&self.f))
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform").finish_non_exhaustive()
    }
}

/// Lift a pure function into a [`Transform`].
pub fn lift<F>(f: F) -> Transform
where
    F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
{
    Transform::new(f)
}

/// Build an accumulator integrating `input` at the scheduler's step size.
pub fn integral(input: &Behavior) -> Behavior {
    Behavior::accumulator(input.clone())
}

/// Freeze a behavior's current value into a constant.
pub fn hold(behavior: &Behavior) -> Result<Behavior> {
    Ok(Behavior::constant(behavior.value()?))
}

impl Behavior {
    /// Map this behavior through a pure function.
    pub fn map<F>(&self, f: F) -> Behavior
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Behavior::mapped(self.clone(), Arc::new(f))
    }

    /// Pipe this behavior through a transform. Equivalent to
    /// `transform.applied_to(self)`.
    pub fn pipe(&self, transform: &Transform) -> Behavior {
        transform.applied_to(self)
    }

    /// The explicit two-node combinator: both operands are sampled each
    /// read and fed to `f`.
    pub fn combine<F>(left: &Behavior, right: &Behavior, f: F) -> Behavior
    where
        F: Fn(Value, Value) -> Result<Value> + Send + Sync + 'static,
    {
        Behavior::combined(left.clone(), right.clone(), Arc::new(f))
    }

    pub fn add(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.add(&b))
    }

    pub fn sub(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.sub(&b))
    }

    pub fn mul(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.mul(&b))
    }

    pub fn div(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.div(&b))
    }

    pub fn rem(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.rem(&b))
    }

    pub fn neg(&self) -> Behavior {
        self.map(|v| v.neg())
    }

    pub fn abs(&self) -> Behavior {
        self.map(|v| v.abs())
    }

    pub fn lt(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.lt(&b))
    }

    pub fn le(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.le(&b))
    }

    pub fn gt(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.gt(&b))
    }

    pub fn ge(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| a.ge(&b))
    }

    /// Equality against another node or a scalar. Named to stay clear of
    /// `PartialEq::eq`.
    pub fn eq_val(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| Ok(Value::Bool(a == b)))
    }

    pub fn ne_val(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| Ok(Value::Bool(a != b)))
    }

    pub fn and(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| Ok(a.and(&b)))
    }

    pub fn or(&self, other: impl Into<Behavior>) -> Behavior {
        Behavior::combine(self, &other.into(), |a, b| Ok(a.or(&b)))
    }
}

impl From<Value> for Behavior {
    fn from(v: Value) -> Self {
        Behavior::constant(v)
    }
}

impl From<f64> for Behavior {
    fn from(n: f64) -> Self {
        Behavior::constant(n)
    }
}

impl From<i64> for Behavior {
    fn from(n: i64) -> Self {
        Behavior::constant(n)
    }
}

impl From<bool> for Behavior {
    fn from(b: bool) -> Self {
        Behavior::constant(b)
    }
}

impl From<&str> for Behavior {
    fn from(t: &str) -> Self {
        Behavior::constant(t)
    }
}

impl From<Key> for Behavior {
    fn from(k: Key) -> Self {
        Behavior::constant(k)
    }
}

impl From<&Behavior> for Behavior {
    fn from(b: &Behavior) -> Self {
        b.clone()
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident) => {
        impl std::ops::$trait<&Behavior> for &Behavior {
            type Output = Behavior;
            fn $method(self, rhs: &Behavior) -> Behavior {
                Behavior::$method(self, rhs)
            }
        }

        impl std::ops::$trait<f64> for &Behavior {
            type Output = Behavior;
            fn $method(self, rhs: f64) -> Behavior {
                Behavior::$method(self, rhs)
            }
        }

        // Reflected form: the scalar becomes the sampled left operand.
        impl std::ops::$trait<&Behavior> for f64 {
            type Output = Behavior;
            fn $method(self, rhs: &Behavior) -> Behavior {
                Behavior::$method(&Behavior::from(self), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);
impl_binary_op!(Mul, mul);
impl_binary_op!(Div, div);
impl_binary_op!(Rem, rem);

impl std::ops::Neg for &Behavior {
    type Output = Behavior;
    fn neg(self) -> Behavior {
        Behavior::neg(self)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
