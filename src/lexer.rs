//! The template lexer: scans raw template bytes into a [`Token`] list,
//! interpreting `{…}` directives.
//!
//! Block matching (`if`/`else`/`end`, `for`/`end`) is owned entirely by this
//! lexer, which returns fully nested `Token::If`/`Token::For` subtrees, so
//! the evaluator never has to re-discover block structure. This is
//! implemented as a small recursive descent, since template block nesting
//! is a much simpler grammar than a general-purpose language.

use crate::error::{Error, Result};
use crate::expr_lexer;
use crate::stream::InputStream;
use crate::token::Token;
use std::io::Read;

/// What ended a run of [`lex_block`]: ran out of input, hit a matching `end`,
/// or hit an `else` (only valid as the tail of an `if`'s then-body).
enum BlockEnd {
    Eof,
    End,
    Else,
}

enum Directive {
    Token(Token),
    End,
    Else,
}

/// Lex a complete template. Errors if an `end`/`else` appears with no
/// enclosing block, or if a block is left unterminated at EOF.
pub fn lex<R: Read>(stream: &mut InputStream<R>) -> Result<Vec<Token>> {
    let (tokens, end) = lex_block(stream)?;
    match end {
        BlockEnd::Eof => Ok(tokens),
        BlockEnd::End => Err(Error::UnmatchedBlock {
            message: "'end' with no open 'if' or 'for'".into(),
            position: Some(stream.position()),
        }),
        BlockEnd::Else => Err(Error::UnmatchedBlock {
            message: "'else' with no open 'if'".into(),
            position: Some(stream.position()),
        }),
    }
}

fn lex_block<R: Read>(stream: &mut InputStream<R>) -> Result<(Vec<Token>, BlockEnd)> {
    let mut tokens = Vec::new();
    let mut data = Vec::new();
    loop {
        match stream.peek_byte()? {
            None => {
                flush(&mut tokens, &mut data);
                return Ok((tokens, BlockEnd::Eof));
            }
            Some(b'{') => {
                let mut lookahead = [0u8; 2];
                let n = stream.peek(&mut lookahead)?;
                if n == 2 && lookahead[1] == b'{' {
                    // `{{` is a literal-`{` escape in text mode.
                    stream.skip(2)?;
                    data.push(b'{');
                    continue;
                }
                stream.skip(1)?;
                flush(&mut tokens, &mut data);
                match lex_directive(stream)? {
                    Directive::Token(tok) => tokens.push(tok),
                    Directive::End => return Ok((tokens, BlockEnd::End)),
                    Directive::Else => return Ok((tokens, BlockEnd::Else)),
                }
            }
            Some(_) => {
                // `}` in text mode needs no escaping.
                data.push(stream.get_byte()?.expect("just peeked"));
            }
        }
    }
}

fn flush(tokens: &mut Vec<Token>, data: &mut Vec<u8>) {
    if !data.is_empty() {
        tokens.push(Token::Data(std::mem::take(data)));
    }
}

fn expect(stream: &mut InputStream<impl Read>, byte: u8) -> Result<()> {
    match stream.get_byte()? {
        Some(b) if b == byte => Ok(()),
        _ => Err(Error::syntax(
            format!("expected '{}'", byte as char),
            Some(stream.position()),
        )),
    }
}

fn lex_directive<R: Read>(stream: &mut InputStream<R>) -> Result<Directive> {
    stream.skip_blank()?;
    let keyword = stream.peek_symbol()?;
    log::trace!("directive at {}: keyword '{keyword}'", stream.position());
    match keyword.as_str() {
        "if" => {
            stream.skip(keyword.len())?;
            stream.skip_blank()?;
            let condition = expr_lexer::parse(stream)?;
            stream.skip_blank()?;
            expect(stream, b'}')?;
            let (then_body, end) = lex_block(stream)?;
            match end {
                BlockEnd::End => Ok(Directive::Token(Token::If {
                    condition,
                    then_body,
                    else_body: None,
                })),
                BlockEnd::Else => {
                    let (else_body, end2) = lex_block(stream)?;
                    match end2 {
                        BlockEnd::End => Ok(Directive::Token(Token::If {
                            condition,
                            then_body,
                            else_body: Some(else_body),
                        })),
                        BlockEnd::Else => Err(Error::UnmatchedBlock {
                            message: "'else' already used for this 'if'".into(),
                            position: Some(stream.position()),
                        }),
                        BlockEnd::Eof => Err(Error::UnmatchedBlock {
                            message: "missing 'end' for 'if'/'else'".into(),
                            position: Some(stream.position()),
                        }),
                    }
                }
                BlockEnd::Eof => Err(Error::UnmatchedBlock {
                    message: "missing 'end' for 'if'".into(),
                    position: Some(stream.position()),
                }),
            }
        }
        "for" => {
            stream.skip(keyword.len())?;
            stream.skip_blank()?;
            let iterator_name = stream.read_symbol()?;
            if iterator_name.is_empty() {
                return Err(Error::syntax(
                    "expected an iterator symbol after 'for'",
                    Some(stream.position()),
                ));
            }
            stream.skip_blank()?;
            let in_kw = stream.peek_symbol()?;
            if in_kw != "in" {
                return Err(Error::syntax(
                    "expected 'in' after the 'for' iterator symbol",
                    Some(stream.position()),
                ));
            }
            stream.skip(in_kw.len())?;
            stream.skip_blank()?;
            let iterable = expr_lexer::parse(stream)?;
            stream.skip_blank()?;
            expect(stream, b'}')?;
            let (body, end) = lex_block(stream)?;
            match end {
                BlockEnd::End => Ok(Directive::Token(Token::For {
                    iterable,
                    iterator_name,
                    body,
                })),
                BlockEnd::Else => Err(Error::UnmatchedBlock {
                    message: "'else' with no open 'if' (inside 'for')".into(),
                    position: Some(stream.position()),
                }),
                BlockEnd::Eof => Err(Error::UnmatchedBlock {
                    message: "missing 'end' for 'for'".into(),
                    position: Some(stream.position()),
                }),
            }
        }
        "end" => {
            stream.skip(keyword.len())?;
            stream.skip_blank()?;
            expect(stream, b'}')?;
            Ok(Directive::End)
        }
        "else" => {
            stream.skip(keyword.len())?;
            stream.skip_blank()?;
            expect(stream, b'}')?;
            Ok(Directive::Else)
        }
        _ => {
            if stream.peek_byte()? == Some(b'=') {
                stream.skip(1)?;
                stream.skip_blank()?;
            }
            let expr = expr_lexer::parse(stream)?;
            stream.skip_blank()?;
            expect(stream, b'}')?;
            Ok(Directive::Token(Token::Expr(expr)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lex_str(s: &str) -> Vec<Token> {
        let mut stream = InputStream::new("<test>", Cursor::new(s.as_bytes().to_vec()));
        lex(&mut stream).unwrap()
    }

    #[test]
    fn data_and_expr_mix() {
        let tokens = lex_str("Hello {name}!");
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[0], Token::Data(_)));
        assert!(matches!(tokens[1], Token::Expr(_)));
        assert!(matches!(tokens[2], Token::Data(_)));
    }

    #[test]
    fn double_brace_escapes_to_literal_brace() {
        let tokens = lex_str("{{literal}}");
        match &tokens[0] {
            Token::Data(bytes) => assert_eq!(bytes, b"{literal}"),
            other => panic!("expected data token, got {other:?}"),
        }
    }

    #[test]
    fn if_else_end_builds_nested_token() {
        let tokens = lex_str("{if n}yes{else}no{end}");
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            Token::If {
                then_body,
                else_body,
                ..
            } => {
                assert_eq!(then_body.len(), 1);
                assert!(else_body.is_some());
            }
            other => panic!("expected if token, got {other:?}"),
        }
    }

    #[test]
    fn for_in_builds_for_token() {
        let tokens = lex_str("{for x in xs}[{x}]{end}");
        match &tokens[0] {
            Token::For {
                iterator_name,
                body,
                ..
            } => {
                assert_eq!(iterator_name, "x");
                assert_eq!(body.len(), 3);
            }
            other => panic!("expected for token, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_end_is_an_error() {
        let mut stream = InputStream::new("<test>", Cursor::new(b"{end}".to_vec()));
        assert!(lex(&mut stream).is_err());
    }

    #[test]
    fn missing_end_is_an_error() {
        let mut stream = InputStream::new("<test>", Cursor::new(b"{if x}no end".to_vec()));
        assert!(lex(&mut stream).is_err());
    }

    #[test]
    fn equals_prefixed_directive_is_an_expr_token() {
        let tokens = lex_str("{= 1 + 1}");
        assert!(matches!(tokens[0], Token::Expr(_)));
    }
}
