//! Parses the environment textual format into an
//! [`Environment`]: a flat sequence of `symbol = value ;` statements, with
//! `#`-to-end-of-line comments and nested array literals.
//!
//! ```text
//! statement := symbol '=' value ';'
//! value     := string_literal | number | array
//! array     := '[' (value (',' value)*)? ']'
//! ```
//!
//! Grounded the same way [`crate::expr_lexer`] is: a value is read directly
//! off the [`InputStream`] rather than through an intermediate token list.

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::stream::InputStream;
use crate::value::Value;
use std::io::Read;

/// Parse a full environment-chunk source and push every statement's bindings
/// into `env`.
pub fn load<R: Read>(stream: &mut InputStream<R>, env: &mut Environment) -> Result<()> {
    loop {
        skip_ignorable(stream)?;
        if stream.eof()? {
            return Ok(());
        }
        let name = stream.read_symbol()?;
        if name.is_empty() {
            return Err(Error::syntax(
                "expected a symbol name",
                Some(stream.position()),
            ));
        }
        skip_ignorable(stream)?;
        expect(stream, b'=')?;
        skip_ignorable(stream)?;
        let value = parse_value(stream)?;
        skip_ignorable(stream)?;
        expect(stream, b';')?;
        env.push(name, value);
    }
}

fn skip_ignorable<R: Read>(stream: &mut InputStream<R>) -> Result<()> {
    loop {
        stream.skip_blank()?;
        if stream.peek_byte()? == Some(b'#') {
            stream.skip_while(|b| b != b'\n')?;
        } else {
            break;
        }
    }
    Ok(())
}

fn expect<R: Read>(stream: &mut InputStream<R>, byte: u8) -> Result<()> {
    match stream.get_byte()? {
        Some(b) if b == byte => Ok(()),
        _ => Err(Error::syntax(
            format!("expected '{}'", byte as char),
            Some(stream.position()),
        )),
    }
}

fn parse_value<R: Read>(stream: &mut InputStream<R>) -> Result<Value> {
    skip_ignorable(stream)?;
    match stream.peek_byte()? {
        Some(b'"') => {
            let s = stream.read_string_literal()?;
            Ok(Value::string(s.into_bytes()))
        }
        Some(b'[') => parse_array(stream),
        Some(b) if b.is_ascii_digit() || b == b'+' || b == b'-' => stream.read_number(),
        _ => Err(Error::syntax(
            "expected a string, number, or array literal",
            Some(stream.position()),
        )),
    }
}

fn parse_array<R: Read>(stream: &mut InputStream<R>) -> Result<Value> {
    expect(stream, b'[')?;
    skip_ignorable(stream)?;
    let mut items = Vec::new();
    if stream.peek_byte()? == Some(b']') {
        stream.skip(1)?;
        return Ok(Value::Array(items));
    }
    loop {
        items.push(parse_value(stream)?);
        skip_ignorable(stream)?;
        match stream.get_byte()? {
            Some(b',') => {
                skip_ignorable(stream)?;
                continue;
            }
            Some(b']') => break,
            _ => {
                return Err(Error::syntax(
                    "expected ',' or ']' in array literal",
                    Some(stream.position()),
                ))
            }
        }
    }
    Ok(Value::Array(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load_str(s: &str) -> Environment {
        let mut stream = InputStream::new("<test>", Cursor::new(s.as_bytes().to_vec()));
        let mut env = Environment::new();
        load(&mut stream, &mut env).unwrap();
        env
    }

    #[test]
    fn loads_scalar_statements() {
        let env = load_str(r#"name = "Ada"; count = 3;"#);
        assert_eq!(env.lookup("name").unwrap().bytes().unwrap(), b"Ada");
        assert_eq!(env.lookup("count").unwrap().as_int().unwrap(), 3);
    }

    #[test]
    fn skips_line_comments() {
        let env = load_str("# a comment\nx = 1; # trailing comment\n");
        assert_eq!(env.lookup("x").unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn loads_nested_array_literal() {
        let env = load_str("xs = [1, [2, 3], \"z\"];");
        match env.lookup("xs").unwrap() {
            Value::Array(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0].as_int().unwrap(), 1);
                assert!(matches!(&items[1], Value::Array(_)));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn loads_empty_array_literal() {
        let env = load_str("xs = [];");
        match env.lookup("xs").unwrap() {
            Value::Array(items) => assert!(items.is_empty()),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn missing_semicolon_is_an_error() {
        let mut stream = InputStream::new("<test>", Cursor::new(b"x = 1".to_vec()));
        let mut env = Environment::new();
        assert!(load(&mut stream, &mut env).is_err());
    }

    #[test]
    fn multiple_statements_accumulate_in_order() {
        let env = load_str("x = 1; x = 2;");
        assert_eq!(env.lookup("x").unwrap().as_int().unwrap(), 2);
    }
}
