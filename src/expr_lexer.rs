//! A precedence-climbing (Pratt) lexer that scans a `TokenExpr` tree
//! straight off an [`InputStream`], honoring this grammar:
//!
//! ```text
//! expr         := or_expr
//! or_expr      := and_expr ( '||' and_expr )*
//! and_expr     := eq_expr  ( '&&' eq_expr )*
//! eq_expr      := cmp_expr ( ('==' | '!=') cmp_expr )*
//! cmp_expr     := add_expr ( ('<' | '>' | '<=' | '>=') add_expr )*
//! add_expr     := mul_expr ( ('+' | '-') mul_expr )*
//! mul_expr     := filter_expr ( ('*' | '/' | '%') filter_expr )*
//! filter_expr  := primary ( '|' symbol )*
//! primary      := number_literal | string_literal | symbol_ref indexes?
//!               | '(' expr ')' indexes? | ('+' | '-') primary
//! indexes      := ( '[' expr ']' )+
//! ```
//!
//! Each grammar layer is its own function rather than a single generic
//! climbing loop, so the precedence table is directly visible in the call
//! graph instead of being encoded as numeric levels.

use crate::error::{Error, Result};
use crate::stream::{is_symbol_byte, is_symbol_start, InputStream};
use crate::token::{Operator, TokenExpr};
use crate::value::Value;
use std::io::Read;

/// Scan one expression from `stream`, stopping at the first byte that can't
/// extend it (closing `}`, `,`, `]`, EOF) and leaving that byte unconsumed.
pub fn parse<R: Read>(stream: &mut InputStream<R>) -> Result<TokenExpr> {
    parse_or(stream)
}

/// Peeks whether the next bytes equal `token` exactly; consumes them if so.
fn eat<R: Read>(stream: &mut InputStream<R>, token: &[u8]) -> Result<bool> {
    let mut buf = vec![0u8; token.len()];
    if stream.peek(&mut buf)? < token.len() {
        return Ok(false);
    }
    if buf == token {
        stream.skip(token.len())?;
        Ok(true)
    } else {
        Ok(false)
    }
}

macro_rules! left_assoc_level {
    ($name:ident, $next:ident, [$(($tok:expr, $op:expr)),+ $(,)?]) => {
        fn $name<R: Read>(stream: &mut InputStream<R>) -> Result<TokenExpr> {
            let mut lhs = $next(stream)?;
            loop {
                stream.skip_blank()?;
                let mut matched = None;
                $(
                    if eat(stream, $tok)? {
                        matched = Some($op);
                    } else
                )+
                {}
                match matched {
                    Some(op) => {
                        stream.skip_blank()?;
                        let rhs = $next(stream)?;
                        lhs = TokenExpr::binary(op, lhs, rhs);
                    }
                    None => break,
                }
            }
            Ok(lhs)
        }
    };
}

left_assoc_level!(parse_or, parse_and, [(b"||", Operator::Or)]);
left_assoc_level!(parse_and, parse_eq, [(b"&&", Operator::And)]);
left_assoc_level!(
    parse_eq,
    parse_cmp,
    [(b"==", Operator::Eq), (b"!=", Operator::Ne)]
);
// Longer tokens must be tried first so `<=` isn't mistaken for `<` followed
// by a stray `=`.
left_assoc_level!(
    parse_cmp,
    parse_add,
    [
        (b"<=", Operator::Le),
        (b">=", Operator::Ge),
        (b"<", Operator::Lt),
        (b">", Operator::Gt),
    ]
);
left_assoc_level!(
    parse_add,
    parse_mul,
    [(b"+", Operator::Add), (b"-", Operator::Sub)]
);
left_assoc_level!(
    parse_mul,
    parse_filter,
    [
        (b"*", Operator::Mul),
        (b"/", Operator::Div),
        (b"%", Operator::Mod)
    ]
);

fn parse_filter<R: Read>(stream: &mut InputStream<R>) -> Result<TokenExpr> {
    let mut lhs = parse_primary(stream)?;
    loop {
        stream.skip_blank()?;
        // A lone `|` is the filter pipe; `||` belongs to `or_expr` and must
        // not be swallowed here.
        let is_single_pipe = matches!(stream_peek_pair(stream)?, (Some(b'|'), second) if second != Some(b'|'));
        if !is_single_pipe {
            break;
        }
        stream.skip(1)?;
        stream.skip_blank()?;
        let name = stream.read_symbol()?;
        if name.is_empty() {
            return Err(Error::syntax(
                "expected a filter name after '|'",
                Some(stream.position()),
            ));
        }
        lhs = TokenExpr::binary(Operator::Filter, lhs, TokenExpr::symbol(name));
    }
    Ok(lhs)
}

fn stream_peek_pair<R: Read>(stream: &mut InputStream<R>) -> Result<(Option<u8>, Option<u8>)> {
    let mut buf = [0u8; 2];
    let n = stream.peek(&mut buf)?;
    let first = if n >= 1 { Some(buf[0]) } else { None };
    let second = if n >= 2 { Some(buf[1]) } else { None };
    Ok((first, second))
}

fn parse_primary<R: Read>(stream: &mut InputStream<R>) -> Result<TokenExpr> {
    stream.skip_blank()?;
    match stream.peek_byte()? {
        None => Err(Error::syntax(
            "missing operand: unexpected end of input",
            Some(stream.position()),
        )),
        Some(b'+') => {
            stream.skip(1)?;
            stream.skip_blank()?;
            parse_primary(stream)
        }
        Some(b'-') => {
            stream.skip(1)?;
            stream.skip_blank()?;
            Ok(TokenExpr::negate(parse_primary(stream)?))
        }
        Some(b'"') => {
            let s = stream.read_string_literal()?;
            Ok(TokenExpr::value(Value::string(s.into_bytes())))
        }
        Some(b) if b.is_ascii_digit() => {
            let value = stream.read_number()?;
            Ok(TokenExpr::value(value))
        }
        Some(b'(') => {
            stream.skip(1)?;
            stream.skip_blank()?;
            let inner = parse_or(stream)?;
            stream.skip_blank()?;
            match stream.get_byte()? {
                Some(b')') => {}
                _ => {
                    return Err(Error::syntax(
                        "unbalanced parentheses: expected ')'",
                        Some(stream.position()),
                    ))
                }
            }
            parse_indexes(stream, inner)
        }
        Some(b) if is_symbol_start(b) => {
            let name = stream.read_symbol()?;
            parse_indexes(stream, TokenExpr::symbol(name))
        }
        Some(b) => Err(Error::syntax(
            format!("unexpected character '{}' while parsing an expression", b as char),
            Some(stream.position()),
        )),
    }
}

fn parse_indexes<R: Read>(stream: &mut InputStream<R>, mut node: TokenExpr) -> Result<TokenExpr> {
    loop {
        stream.skip_blank()?;
        match stream.peek_byte()? {
            Some(b'[') => {
                stream.skip(1)?;
                stream.skip_blank()?;
                let index = parse_or(stream)?;
                stream.skip_blank()?;
                match stream.get_byte()? {
                    Some(b']') => {}
                    _ => {
                        return Err(Error::syntax(
                            "unbalanced brackets: expected ']'",
                            Some(stream.position()),
                        ))
                    }
                }
                node = node.with_index(index);
            }
            _ => break,
        }
    }
    Ok(node)
}

#[allow(dead_code)]
fn is_symbol_char_or_start(b: u8) -> bool {
    is_symbol_byte(b) || is_symbol_start(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::eval::eval;
    use std::io::Cursor;

    fn parse_str(s: &str) -> TokenExpr {
        let mut stream = InputStream::new("<test>", Cursor::new(s.as_bytes().to_vec()));
        parse(&mut stream).unwrap()
    }

    fn eval_str(s: &str) -> Value {
        let env = Environment::new();
        eval(&parse_str(s), &env).unwrap()
    }

    #[test]
    fn precedence_multiplication_over_addition() {
        assert_eq!(eval_str("1 + 2 * 3").as_int().unwrap(), 7);
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(eval_str("(1 + 2) * 3").as_int().unwrap(), 9);
    }

    #[test]
    fn filter_binds_tighter_than_multiplication() {
        // `a * b | f` means `a * (b | f)`.
        let expr = parse_str("a * b | f");
        match expr.kind {
            crate::token::TokenExprKind::Operator { op, rhs, .. } => {
                assert_eq!(op, Operator::Mul);
                assert!(matches!(
                    rhs.kind,
                    crate::token::TokenExprKind::Operator { op: Operator::Filter, .. }
                ));
            }
            _ => panic!("expected multiplication at the top"),
        }
    }

    #[test]
    fn indexing_chain_applies_left_to_right() {
        let mut env = Environment::new();
        env.push(
            "xs",
            Value::Array(vec![Value::Array(vec![Value::Int(9)])]),
        );
        let v = eval(&parse_str("xs[0][0]"), &env).unwrap();
        assert_eq!(v.as_int().unwrap(), 9);
    }

    #[test]
    fn stops_at_closing_brace() {
        let mut stream = InputStream::new("<test>", Cursor::new(b"1 + 2}rest".to_vec()));
        let expr = parse(&mut stream).unwrap();
        assert_eq!(eval(&expr, &Environment::new()).unwrap().as_int().unwrap(), 3);
        assert_eq!(stream.peek_byte().unwrap(), Some(b'}'));
    }

    #[test]
    fn unbalanced_parenthesis_is_a_syntax_error() {
        let mut stream = InputStream::new("<test>", Cursor::new(b"(1 + 2".to_vec()));
        assert!(parse(&mut stream).is_err());
    }

    #[test]
    fn unary_minus_desugars_to_zero_minus_operand() {
        assert_eq!(eval_str("-5 + 10").as_int().unwrap(), 5);
    }
}
