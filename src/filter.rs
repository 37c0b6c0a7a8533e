//! The built-in filter set bound into every fresh [`Environment`] for use
//! with the `|` operator. Each filter is a plain
//! `Value::Filter` binding, exactly as a `for`-bound or environment-loaded
//! value would be — there is no separate filter namespace.

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::{Filter, Value, ValueKind};
use once_cell::sync::Lazy;

/// Names reserved by the built-in filter set, computed once and shared by
/// every [`register_builtins`] call.
static BUILTIN_FILTER_NAMES: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["upper", "lower", "len", "trim"]);

/// Whether `name` names one of the built-in filters.
pub fn is_builtin_filter_name(name: &str) -> bool {
    BUILTIN_FILTER_NAMES.contains(&name)
}

/// Push `upper`, `lower`, `len`, and `trim` into `env`.
pub fn register_builtins(env: &mut Environment) {
    debug_assert_eq!(BUILTIN_FILTER_NAMES.len(), 4);
    env.push("upper", Value::Filter(Filter::new("upper", upper)));
    env.push("lower", Value::Filter(Filter::new("lower", lower)));
    env.push("len", Value::Filter(Filter::new("len", len)));
    env.push("trim", Value::Filter(Filter::new("trim", trim)));
}

fn upper(src: Value, _args: &[Value]) -> Result<Value> {
    let s = src.to_display_string()?;
    Ok(Value::string(s.to_uppercase().into_bytes()))
}

fn lower(src: Value, _args: &[Value]) -> Result<Value> {
    let s = src.to_display_string()?;
    Ok(Value::string(s.to_lowercase().into_bytes()))
}

fn len(src: Value, _args: &[Value]) -> Result<Value> {
    match src {
        Value::Array(items) => Ok(Value::Int(items.len() as i64)),
        Value::String(bytes) => Ok(Value::Int(bytes.len() as i64)),
        other => Err(Error::invalid_operand(
            format!("'len' expects an array or string, found {:?}", other.kind()),
            None,
        )),
    }
}

fn trim(src: Value, _args: &[Value]) -> Result<Value> {
    if src.kind() != ValueKind::String {
        return Err(Error::invalid_operand(
            format!("'trim' expects a string, found {:?}", src.kind()),
            None,
        ));
    }
    let s = src.to_display_string()?;
    Ok(Value::string(s.trim().to_string().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval;
    use crate::expr_lexer;
    use crate::stream::InputStream;
    use std::io::Cursor;

    fn eval_str(env: &Environment, s: &str) -> Value {
        let mut stream = InputStream::new("<test>", Cursor::new(s.as_bytes().to_vec()));
        let expr = expr_lexer::parse(&mut stream).unwrap();
        eval(&expr, env).unwrap()
    }

    #[test]
    fn upper_filter_uppercases_a_string() {
        let mut env = Environment::new();
        register_builtins(&mut env);
        env.push("name", Value::string(b"ada".to_vec()));
        let v = eval_str(&env, "name | upper");
        assert_eq!(v.to_display_string().unwrap(), "ADA");
    }

    #[test]
    fn len_filter_counts_array_elements() {
        let mut env = Environment::new();
        register_builtins(&mut env);
        env.push("xs", Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        let v = eval_str(&env, "xs | len");
        assert_eq!(v.as_int().unwrap(), 3);
    }

    #[test]
    fn trim_filter_strips_surrounding_blanks() {
        let mut env = Environment::new();
        register_builtins(&mut env);
        env.push("s", Value::string(b"  hi  ".to_vec()));
        let v = eval_str(&env, "s | trim");
        assert_eq!(v.to_display_string().unwrap(), "hi");
    }

    #[test]
    fn len_on_a_non_sized_value_errors() {
        assert!(len(Value::Int(3), &[]).is_err());
    }

    #[test]
    fn recognizes_builtin_filter_names() {
        assert!(is_builtin_filter_name("upper"));
        assert!(!is_builtin_filter_name("custom"));
    }
}
