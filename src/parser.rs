//! The emitter: walks a lexed `Vec<Token>` tree and writes template output
//! to an arbitrary byte sink.
//!
//! Writes go through `std::io::Write` directly, so any blocking sink works
//! (a file, a buffer, stdout). `for` loops push the iterator binding before
//! the body renders and pop it again even if the body errors, so a render
//! failure never leaves a stale binding behind in the caller's environment.

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::eval;
use crate::token::Token;
use std::io::Write;

/// Render `tokens` against `env`, writing output to `out`.
pub fn render<W: Write>(tokens: &[Token], env: &mut Environment, out: &mut W) -> Result<()> {
    for token in tokens {
        render_one(token, env, out)?;
    }
    Ok(())
}

fn render_one<W: Write>(token: &Token, env: &mut Environment, out: &mut W) -> Result<()> {
    match token {
        Token::Data(bytes) => write_bytes(out, bytes),
        Token::Expr(expr) => {
            let value = eval(expr, env)?;
            let s = value.to_display_string()?;
            write_bytes(out, s.as_bytes())
        }
        Token::If {
            condition,
            then_body,
            else_body,
        } => {
            let taken = eval(condition, env)?.as_bool()?;
            log::trace!("if block entry: condition = {taken}");
            let result = if taken {
                render(then_body, env, out)
            } else if let Some(else_body) = else_body {
                render(else_body, env, out)
            } else {
                Ok(())
            };
            log::trace!("if block exit");
            result
        }
        Token::For {
            iterable,
            iterator_name,
            body,
        } => {
            let items = eval(iterable, env)?.into_array();
            log::trace!("for block entry: '{iterator_name}' over {} item(s)", items.len());
            for item in items {
                env.push(iterator_name.clone(), item);
                let result = render(body, env, out);
                env.pop(iterator_name);
                result?;
            }
            log::trace!("for block exit: '{iterator_name}'");
            Ok(())
        }
    }
}

fn write_bytes<W: Write>(out: &mut W, bytes: &[u8]) -> Result<()> {
    out.write_all(bytes).map_err(|source| Error::Io {
        source,
        position: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::register_builtins;
    use crate::lexer::lex;
    use crate::stream::InputStream;
    use crate::value::Value;
    use std::io::Cursor;

    fn render_str(template: &str, env: &mut Environment) -> String {
        let mut stream = InputStream::new("<test>", Cursor::new(template.as_bytes().to_vec()));
        let tokens = lex(&mut stream).unwrap();
        let mut out = Vec::new();
        render(&tokens, env, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn simple_substitution() {
        let mut env = Environment::new();
        env.push("name", Value::string(b"Ada".to_vec()));
        assert_eq!(render_str("Hello, {name}!", &mut env), "Hello, Ada!");
    }

    #[test]
    fn arithmetic_precedence() {
        let mut env = Environment::new();
        assert_eq!(render_str("{1 + 2 * 3}", &mut env), "7");
    }

    #[test]
    fn conditional_with_comparison_and_string_concat() {
        let mut env = Environment::new();
        env.push("age", Value::Int(20));
        let out = render_str(
            "{if age >= 18}{\"adult \" + \"status\"}{else}minor{end}",
            &mut env,
        );
        assert_eq!(out, "adult status");
    }

    #[test]
    fn for_over_array_with_indexing() {
        let mut env = Environment::new();
        env.push(
            "xs",
            Value::Array(vec![Value::Int(10), Value::Int(20), Value::Int(30)]),
        );
        let out = render_str("{for i in xs}[{i}]{end}", &mut env);
        assert_eq!(out, "[10][20][30]");
    }

    #[test]
    fn nested_if_for_with_numeric_roundtrip() {
        let mut env = Environment::new();
        env.push("xs", Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        let out = render_str(
            "{for x in xs}{if x % 2 == 0}even{else}odd{end} {end}",
            &mut env,
        );
        assert_eq!(out, "odd even odd ");
    }

    #[test]
    fn filter_pipe_uppercases() {
        let mut env = Environment::new();
        register_builtins(&mut env);
        env.push("name", Value::string(b"ada".to_vec()));
        assert_eq!(render_str("{name | upper}", &mut env), "ADA");
    }

    #[test]
    fn for_loop_pops_iterator_binding_even_on_body_error() {
        let mut env = Environment::new();
        env.push("outer", Value::Int(1));
        env.push("xs", Value::Array(vec![Value::Int(1)]));
        let mut stream = InputStream::new(
            "<test>",
            Cursor::new(b"{for outer in xs}{missing}{end}".to_vec()),
        );
        let tokens = lex(&mut stream).unwrap();
        let mut out = Vec::new();
        assert!(render(&tokens, &mut env, &mut out).is_err());
        assert_eq!(env.lookup("outer").unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn scalar_iterable_is_treated_as_one_element_array() {
        let mut env = Environment::new();
        env.push("x", Value::Int(9));
        assert_eq!(render_str("{for i in x}<{i}>{end}", &mut env), "<9>");
    }
}
