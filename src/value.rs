//! The dynamic value model shared by every later stage of the pipeline:
//! the evaluator produces [`Value`]s, the environment stores them, and the
//! parser/emitter stringifies them into output bytes.
//!
//! `Value` is a plain Rust enum built once and never mutated in place:
//! `convert` and arithmetic always produce a *new* `Value` rather than
//! mutating through a `set_int`-style method.

use crate::error::{Error, Result};
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// Absolute tolerance used by the "almost equal" float predicate.
pub const FLOAT_EPSILON: f64 = 1e-6;

/// `classify(a - b) == Zero` when available, else `|a-b| < FLOAT_EPSILON`.
///
/// Rust's `f64` doesn't expose a subnormal-aware "is exactly zero" classifier
/// beyond `== 0.0`, which already is the strongest available predicate; we
/// fall back directly to the tolerance comparison, which is intentionally
/// loose.
pub fn float_almost_eq(a: f64, b: f64) -> bool {
    let diff = a - b;
    diff == 0.0 || diff.abs() < FLOAT_EPSILON
}

/// A callable `(src, args) -> Result<Value>` usable from the `|` operator.
///
/// Reference-counted because the same filter value may be pushed into more
/// than one [`Environment`](crate::env::Environment) scope. A closure capturing
/// its own state is enough; Rust's ownership model makes cleanup implicit,
/// with no separate destructor to manage.
#[derive(Clone)]
pub struct Filter {
    name: &'static str,
    func: Rc<dyn Fn(Value, &[Value]) -> Result<Value>>,
}

impl Filter {
    pub fn new(
        name: &'static str,
        func: impl Fn(Value, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name,
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, src: Value, args: &[Value]) -> Result<Value> {
        (self.func)(src, args)
    }
}

impl Debug for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({})", self.name)
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

/// The kind a [`Value`] can be converted to/from, used by [`Value::convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    String,
    Array,
    Filter,
}

/// A dynamically-typed value flowing through expressions, the environment,
/// and template output.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(Vec<u8>),
    Array(Vec<Value>),
    Filter(Filter),
}

impl Value {
    pub fn string(s: impl Into<Vec<u8>>) -> Self {
        Value::String(s.into())
    }

    /// The raw bytes of a `String` value; errors for any other kind.
    pub fn bytes(&self) -> Result<&[u8]> {
        match self {
            Value::String(bytes) => Ok(bytes),
            other => Err(Error::invalid_operand(
                format!("expected a string, got a {:?} value", other.kind()),
                None,
            )),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Filter(_) => ValueKind::Filter,
        }
    }

    /// Append an element to an array in place; errors if `self` isn't an array.
    pub fn push(&mut self, value: Value) -> Result<()> {
        match self {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(Error::invalid_operand(
                format!("cannot append to a {:?} value", other.kind()),
                None,
            )),
        }
    }

    /// Prepend an element to an array in place; errors if `self` isn't an array.
    pub fn prepend(&mut self, value: Value) -> Result<()> {
        match self {
            Value::Array(items) => {
                items.insert(0, value);
                Ok(())
            }
            other => Err(Error::invalid_operand(
                format!("cannot prepend to a {:?} value", other.kind()),
                None,
            )),
        }
    }

    /// Stringify: Int decimal, Float shortest round-trippable
    /// decimal, String verbatim (lossily decoded), Array recursively bracketed,
    /// Filter is an error.
    pub fn to_display_string(&self) -> Result<String> {
        match self {
            Value::Int(n) => Ok(n.to_string()),
            Value::Float(f) => Ok(format_float(*f)),
            Value::String(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Value::Array(items) => {
                let mut out = String::from("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&item.to_display_string()?);
                }
                out.push(']');
                Ok(out)
            }
            Value::Filter(_) => Err(Error::invalid_operand(
                "a filter value cannot be stringified",
                None,
            )),
        }
    }

    /// Non-destructive conversion to the requested kind; returns
    /// a new `Value`, never mutates `self`.
    pub fn convert(&self, target: ValueKind) -> Result<Value> {
        if self.kind() == target {
            return Ok(self.clone());
        }
        if self.kind() == ValueKind::Filter {
            return Err(Error::invalid_operand(
                format!("cannot convert a filter value to {target:?}"),
                None,
            ));
        }
        match target {
            ValueKind::Array => Ok(Value::Array(vec![self.clone()])),
            ValueKind::String => Ok(Value::String(self.to_display_string()?.into_bytes())),
            ValueKind::Float => match self {
                Value::Int(n) => Ok(Value::Float(*n as f64)),
                Value::String(bytes) => parse_whole_str_float(bytes),
                _ => Err(Error::invalid_operand(
                    format!("cannot convert {:?} to float", self.kind()),
                    None,
                )),
            },
            ValueKind::Int => match self {
                Value::Float(f) => {
                    if float_almost_eq(*f, f.trunc()) {
                        Ok(Value::Int(f.trunc() as i64))
                    } else {
                        Err(Error::invalid_operand(
                            format!("float {f} has a fractional part, cannot convert to int"),
                            None,
                        ))
                    }
                }
                Value::String(bytes) => parse_whole_str_int(bytes),
                _ => Err(Error::invalid_operand(
                    format!("cannot convert {:?} to int", self.kind()),
                    None,
                )),
            },
            ValueKind::Filter => Err(Error::invalid_operand(
                "values cannot be converted to a filter",
                None,
            )),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self.convert(ValueKind::Int)? {
            Value::Int(n) => Ok(n),
            _ => unreachable!(),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self.convert(ValueKind::Float)? {
            Value::Float(f) => Ok(f),
            _ => unreachable!(),
        }
    }

    /// Boolean projection: Array nonempty, Float not-almost-zero,
    /// Int nonzero, String nonempty; Filter has no defined projection.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Array(items) => Ok(!items.is_empty()),
            Value::Float(f) => Ok(!float_almost_eq(*f, 0.0)),
            Value::Int(n) => Ok(*n != 0),
            Value::String(bytes) => Ok(!bytes.is_empty()),
            Value::Filter(_) => Err(Error::invalid_operand(
                "a filter value has no boolean projection",
                None,
            )),
        }
    }

    /// Coerce to an `Array`, treating any non-array scalar as a one-element
    /// array (used by `for`, and indexing of scalar "iterables").
    pub fn into_array(self) -> Vec<Value> {
        match self {
            Value::Array(items) => items,
            other => vec![other],
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::eval::cmp_values(self, other).map(|o| o == std::cmp::Ordering::Equal) == Ok(true)
    }
}

/// ASCII-only, locale-independent float formatting equivalent to the `%.15g`
/// semantics, trimmed to the shortest
/// representation Rust's formatter can round-trip.
fn format_float(f: f64) -> String {
    if f == f.trunc() && f.is_finite() && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        let s = format!("{f}");
        s
    }
}

fn parse_whole_str_int(bytes: &[u8]) -> Result<Value> {
    let s = std::str::from_utf8(bytes)
        .map_err(|_| Error::invalid_operand("string is not valid UTF-8", None))?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_operand("cannot convert empty string to int", None));
    }
    trimmed
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|e| Error::invalid_operand(format!("cannot convert \"{s}\" to int: {e}"), None))
}

fn parse_whole_str_float(bytes: &[u8]) -> Result<Value> {
    let s = std::str::from_utf8(bytes)
        .map_err(|_| Error::invalid_operand("string is not valid UTF-8", None))?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_operand(
            "cannot convert empty string to float",
            None,
        ));
    }
    trimmed
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|e| Error::invalid_operand(format!("cannot convert \"{s}\" to float: {e}"), None))
}
