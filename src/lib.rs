//! `ctpl` is a small text-templating language: a lexer, expression
//! evaluator, and emitter built over a symbol environment.
//!
//! # Overview
//!
//! A template is plain text interleaved with `{…}` directives. An
//! expression directive (`{name}`, `{= price * qty}`) evaluates an
//! expression and writes its stringified result; `{if cond}…{else}…{end}`
//! branches on a boolean projection of a value; `{for x in xs}…{end}`
//! iterates an array, binding `x` for the duration of the body. Directives
//! read and write values through an [`Environment`], a stack-of-bindings
//! map that supports the shadowing `for` loops need.
//!
//! # Design
//!
//! The pipeline mirrors a conventional interpreter: [`stream::InputStream`]
//! wraps an arbitrary byte source with position tracking, [`lexer`] turns a
//! template into a [`token::Token`] tree (text/expr/if/for), [`expr_lexer`]
//! turns the text of a single expression directive into a [`token::TokenExpr`]
//! tree, [`eval`] computes a `TokenExpr` against an `Environment` into a
//! [`value::Value`], and [`parser`] walks the `Token` tree writing output.
//! [`env_loader`] parses the plain-text environment format used to seed an
//! `Environment` from a file or inline chunk, and [`filter`] registers the
//! built-in `|`-pipeable filters.
//!
//! # Example
//!
//! ```
//! use ctpl::{filter, render_template, Environment, Value};
//!
//! let mut env = Environment::new();
//! env.push("name", Value::string(b"world".to_vec()));
//! filter::register_builtins(&mut env);
//!
//! let mut out = Vec::new();
//! ctpl::render_template(
//!     "<inline>",
//!     "Hello, {name | upper}!".as_bytes(),
//!     &mut env,
//!     &mut out,
//! )
//! .unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "Hello, WORLD!");
//! ```
//!
//! # License
//! `ctpl` is provided under the MIT OR Apache-2.0 license.

pub mod env;
pub mod env_loader;
pub mod error;
pub mod eval;
pub mod expr_lexer;
pub mod filter;
pub mod lexer;
pub mod parser;
pub mod stream;
pub mod token;
pub mod value;

pub use env::Environment;
pub use error::{Error, Position, Result};
pub use stream::InputStream;
pub use value::{Filter, Value, ValueKind};

use std::io::{Read, Write};

/// Lex and render a complete template in one call: read `source` as a
/// template, evaluate its directives against `env`, and write the result to
/// `out`. `origin` labels the source in error positions (a file path, or a
/// placeholder like `"<inline>"`).
pub fn render_template<R: Read, W: Write>(
    origin: impl Into<String>,
    source: R,
    env: &mut Environment,
    out: &mut W,
) -> Result<()> {
    let mut stream = InputStream::new(origin, source);
    let tokens = lexer::lex(&mut stream)?;
    parser::render(&tokens, env, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_template_end_to_end() {
        let mut env = Environment::new();
        filter::register_builtins(&mut env);
        env.push("items", Value::Array(vec![Value::Int(1), Value::Int(2)]));
        let mut out = Vec::new();
        render_template(
            "<inline>",
            "{for x in items}{x}{end}".as_bytes(),
            &mut env,
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "12");
    }
}
