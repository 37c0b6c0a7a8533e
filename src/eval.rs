//! The evaluator: computes a [`TokenExpr`] against an [`Environment`],
//! producing a [`Value`].
//!
//! `&&`/`||` are evaluated eagerly on both sides rather than short-circuiting:
//! both operands are always evaluated, in left-to-right order.

use crate::env::Environment;
use crate::error::Error;
use crate::error::Result;
use crate::token::{Operator, TokenExpr, TokenExprKind};
use crate::value::{float_almost_eq, Value, ValueKind};
use std::cmp::Ordering;

/// Evaluate `expr` against `env`, then apply its `indexes` chain left to right.
pub fn eval(expr: &TokenExpr, env: &Environment) -> Result<Value> {
    let mut value = eval_kind(&expr.kind, env)?;
    for index_expr in &expr.indexes {
        let index = eval(index_expr, env)?.as_int()?;
        if index < 0 {
            return Err(Error::invalid_operand(
                format!("array index must be non-negative, got {index}"),
                None,
            ));
        }
        value = match value {
            Value::Array(mut items) => {
                let i = index as usize;
                if i >= items.len() {
                    return Err(Error::invalid_operand(
                        format!("index {i} out of bounds for array of length {}", items.len()),
                        None,
                    ));
                }
                items.swap_remove(i)
            }
            other => {
                return Err(Error::invalid_operand(
                    format!("cannot index a {:?} value", other.kind()),
                    None,
                ))
            }
        };
    }
    Ok(value)
}

fn eval_kind(kind: &TokenExprKind, env: &Environment) -> Result<Value> {
    match kind {
        TokenExprKind::Value(v) => Ok(v.clone()),
        TokenExprKind::Symbol(name) => env
            .lookup(name)
            .cloned()
            .ok_or_else(|| Error::SymbolNotFound {
                name: name.clone(),
                position: None,
            }),
        TokenExprKind::Operator { op, lhs, rhs } => eval_operator(*op, lhs, rhs, env),
    }
}

fn eval_operator(op: Operator, lhs: &TokenExpr, rhs: &TokenExpr, env: &Environment) -> Result<Value> {
    if op == Operator::Filter {
        let source = eval(lhs, env)?;
        let name = match &rhs.kind {
            TokenExprKind::Symbol(name) => name,
            _ => {
                return Err(Error::invalid_operand(
                    "the right-hand side of '|' must be a filter name",
                    None,
                ))
            }
        };
        let filter = env.lookup(name).ok_or_else(|| Error::SymbolNotFound {
            name: name.clone(),
            position: None,
        })?;
        return match filter {
            Value::Filter(f) => {
                log::debug!("invoking filter '{}'", f.name());
                f.call(source, &[])
            }
            other => Err(Error::invalid_operand(
                format!("`{name}` is a {:?}, not a filter", other.kind()),
                None,
            )),
        };
    }

    // Every other operator evaluates both operands eagerly, in left-to-right
    // order, regardless of whether the result depends on both.
    let l = eval(lhs, env)?;
    let r = eval(rhs, env)?;

    match op {
        Operator::And => Ok(Value::Int((l.as_bool()? && r.as_bool()?) as i64)),
        Operator::Or => Ok(Value::Int((l.as_bool()? || r.as_bool()?) as i64)),
        Operator::Eq | Operator::Ne | Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => {
            let ord = cmp_values(&l, &r)?;
            let result = match op {
                Operator::Eq => ord == Ordering::Equal,
                Operator::Ne => ord != Ordering::Equal,
                Operator::Lt => ord == Ordering::Less,
                Operator::Gt => ord == Ordering::Greater,
                Operator::Le => ord != Ordering::Greater,
                Operator::Ge => ord != Ordering::Less,
                _ => unreachable!(),
            };
            Ok(Value::Int(result as i64))
        }
        Operator::Add => add(l, r),
        Operator::Sub => sub(l, r),
        Operator::Mul => mul(l, r),
        Operator::Div => div(l, r),
        Operator::Mod => rem(l, r),
        Operator::Filter => unreachable!("handled above"),
    }
}

fn add(l: Value, r: Value) -> Result<Value> {
    match (l, r) {
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (Value::Array(mut a), other) => {
            a.push(other);
            Ok(Value::Array(a))
        }
        (other, Value::Array(b)) => {
            let mut a = vec![other];
            a.extend(b);
            Ok(Value::Array(a))
        }
        (Value::String(mut a), Value::String(b)) => {
            a.extend(b);
            Ok(Value::String(a))
        }
        (Value::String(mut a), other @ (Value::Int(_) | Value::Float(_))) => {
            a.extend(other.to_display_string()?.into_bytes());
            Ok(Value::String(a))
        }
        (other @ (Value::Int(_) | Value::Float(_)), Value::String(b)) => {
            let mut out = other.to_display_string()?.into_bytes();
            out.extend(b);
            Ok(Value::String(out))
        }
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(b)
            .map(Value::Int)
            .ok_or_else(|| Error::Range {
                message: format!("integer overflow computing {a} + {b}"),
                position: None,
            }),
        (l, r) if l.kind() == ValueKind::Float || r.kind() == ValueKind::Float => {
            Ok(Value::Float(l.as_float()? + r.as_float()?))
        }
        (l, r) => Err(Error::invalid_operand(
            format!("cannot add {:?} and {:?}", l.kind(), r.kind()),
            None,
        )),
    }
}

fn sub(l: Value, r: Value) -> Result<Value> {
    Ok(Value::Float(l.as_float()? - r.as_float()?))
}

fn mul(l: Value, r: Value) -> Result<Value> {
    if l.kind() == ValueKind::Array || r.kind() == ValueKind::Array {
        return Err(Error::invalid_operand(
            "arrays cannot be multiplied",
            None,
        ));
    }
    match (&l, &r) {
        (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
            if *n < 1 {
                return Ok(Value::String(Vec::new()));
            }
            let count = *n as usize;
            let total = s.len().checked_mul(count).ok_or_else(|| Error::Failed {
                message: "string repetition size overflow".into(),
                position: None,
            })?;
            let mut out = Vec::with_capacity(total);
            for _ in 0..count {
                out.extend_from_slice(s);
            }
            Ok(Value::String(out))
        }
        _ if l.kind() == ValueKind::Float || r.kind() == ValueKind::Float => {
            Ok(Value::Float(l.as_float()? * r.as_float()?))
        }
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| Error::Range {
                message: format!("integer overflow computing {a} * {b}"),
                position: None,
            }),
        _ => Err(Error::invalid_operand(
            format!("cannot multiply {:?} and {:?}", l.kind(), r.kind()),
            None,
        )),
    }
}

fn div(l: Value, r: Value) -> Result<Value> {
    let a = l.as_float()?;
    let b = r.as_float()?;
    if b == 0.0 {
        return Err(Error::Failed {
            message: "division by zero".into(),
            position: None,
        });
    }
    Ok(Value::Float(a / b))
}

fn rem(l: Value, r: Value) -> Result<Value> {
    let a = l.as_int()?;
    let b = r.as_int()?;
    if b == 0 {
        return Err(Error::Failed {
            message: "modulo by zero".into(),
            position: None,
        });
    }
    a.checked_rem(b).map(Value::Int).ok_or_else(|| Error::Range {
        message: format!("integer overflow computing {a} % {b}"),
        position: None,
    })
}

/// Comparison used by `==`/`!=`/`<`/`>`/`<=`/`>=` and by [`Value`]'s
/// `PartialEq` impl. `Array` only compares against `Array` (everything else
/// is an error). Any pairing involving a `String` is stringified and
/// compared byte-for-byte, even against a number; only once both operands
/// are non-string, non-array does a Float operand trigger numeric
/// comparison.
pub(crate) fn cmp_values(a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys.iter()) {
                let ord = cmp_values(x, y)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(xs.len().cmp(&ys.len()))
        }
        (Value::Array(_), _) | (_, Value::Array(_)) => Err(Error::invalid_operand(
            "an array can only be compared with another array",
            None,
        )),
        (Value::Filter(_), _) | (_, Value::Filter(_)) => Err(Error::invalid_operand(
            "a filter value cannot be compared",
            None,
        )),
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::String(_), _) | (_, Value::String(_)) => {
            let sa = a.to_display_string()?;
            let sb = b.to_display_string()?;
            Ok(sa.as_bytes().cmp(sb.as_bytes()))
        }
        _ if a.kind() == ValueKind::Float || b.kind() == ValueKind::Float => {
            let (af, bf) = (a.as_float()?, b.as_float()?);
            if float_almost_eq(af, bf) {
                Ok(Ordering::Equal)
            } else {
                af.partial_cmp(&bf).ok_or_else(|| Error::invalid_operand(
                    "cannot order NaN values",
                    None,
                ))
            }
        }
        _ => Err(Error::invalid_operand(
            format!("cannot compare {:?} and {:?}", a.kind(), b.kind()),
            None,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenExpr;

    fn env_with(name: &str, value: Value) -> Environment {
        let mut env = Environment::new();
        env.push(name, value);
        env
    }

    #[test]
    fn symbol_lookup_errors_when_absent() {
        let env = Environment::new();
        assert!(eval(&TokenExpr::symbol("missing"), &env).is_err());
    }

    #[test]
    fn string_plus_int_concatenates_stringified() {
        let env = env_with("n", Value::Int(42));
        let expr = TokenExpr::binary(
            Operator::Add,
            TokenExpr::value(Value::string(b"n=".to_vec())),
            TokenExpr::symbol("n"),
        );
        let v = eval(&expr, &env).unwrap();
        assert_eq!(v.to_display_string().unwrap(), "n=42");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let expr = TokenExpr::binary(
            Operator::Div,
            TokenExpr::value(Value::Int(1)),
            TokenExpr::value(Value::Int(0)),
        );
        assert!(eval(&expr, &Environment::new()).is_err());
    }

    #[test]
    fn logical_and_is_eager_both_sides_evaluated() {
        // The right-hand symbol is unbound; `&&` must still try to evaluate
        // it (no short-circuiting), so this must error rather than return 0.
        let expr = TokenExpr::binary(
            Operator::And,
            TokenExpr::value(Value::Int(0)),
            TokenExpr::symbol("unbound"),
        );
        assert!(eval(&expr, &Environment::new()).is_err());
    }

    #[test]
    fn array_equality_is_elementwise_with_length_tiebreak() {
        let a = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        let c = Value::Array(vec![Value::Int(1)]);
        assert_eq!(cmp_values(&a, &b).unwrap(), Ordering::Equal);
        assert_eq!(cmp_values(&c, &a).unwrap(), Ordering::Less);
    }

    #[test]
    fn array_vs_scalar_comparison_errors() {
        let a = Value::Array(vec![Value::Int(1)]);
        assert!(cmp_values(&a, &Value::Int(1)).is_err());
    }

    #[test]
    fn string_vs_int_compares_via_stringification() {
        let a = Value::string(b"42".to_vec());
        let b = Value::Int(42);
        assert_eq!(cmp_values(&a, &b).unwrap(), Ordering::Equal);
    }

    #[test]
    fn string_vs_float_compares_via_stringification_not_numeric_parse() {
        let non_numeric = Value::string(b"abc".to_vec());
        assert!(cmp_values(&non_numeric, &Value::Float(1.5)).is_ok());

        // Numerically 3.00 == 3.0, but lexically "3.00" > "3.0": the fallback
        // must take the byte comparison, not a numeric one.
        let a = Value::string(b"3.00".to_vec());
        let b = Value::Float(3.0);
        assert_eq!(cmp_values(&a, &b).unwrap(), Ordering::Greater);
    }

    #[test]
    fn indexing_out_of_bounds_errors() {
        let expr = TokenExpr::value(Value::Array(vec![Value::Int(1)]))
            .with_index(TokenExpr::value(Value::Int(5)));
        assert!(eval(&expr, &Environment::new()).is_err());
    }

    #[test]
    fn negative_index_errors() {
        let expr = TokenExpr::value(Value::Array(vec![Value::Int(1)]))
            .with_index(TokenExpr::value(Value::Int(-1)));
        assert!(eval(&expr, &Environment::new()).is_err());
    }
}
