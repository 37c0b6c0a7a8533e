//! A positional, buffered byte input stream with line/column tracking and the
//! typed readers the rest of the crate needs (symbol, string literal, number).
//!
//! This wraps an arbitrary [`std::io::Read`] byte source rather than a whole
//! in-memory slice, so any blocking reader works (a file, a pipe, an
//! in-memory cursor).
//!
//! Every operation that touches the underlying source returns a [`Result`]
//! rather than a plain `Option`, since a real byte source can fail mid-read
//! and that failure must propagate with position information.

mod number;

use crate::error::{Error, Position, Result};
use crate::value::Value;
use std::collections::VecDeque;
use std::io::Read;

const DEFAULT_CHUNK: usize = 4096;
const GROWTH_INCREMENT: usize = 64;

/// `[ \t\v\r\n]` — the blank byte set.
pub fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | 0x0B | b'\r' | b'\n')
}

/// `[A-Za-z0-9_]` — the symbol-character set.
pub fn is_symbol_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `[A-Za-z_]` — valid first byte of a symbol (symbols must not start with a digit).
pub fn is_symbol_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// A buffered, line/column-tracking reader over an arbitrary byte source.
pub struct InputStream<R> {
    origin: String,
    line: usize,
    column: usize,
    cache: VecDeque<u8>,
    chunk: usize,
    source: R,
    source_exhausted: bool,
}

impl<R: Read> InputStream<R> {
    pub fn new(origin: impl Into<String>, source: R) -> Self {
        Self {
            origin: origin.into(),
            line: 1,
            column: 0,
            cache: VecDeque::new(),
            chunk: DEFAULT_CHUNK,
            source,
            source_exhausted: false,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.origin.clone(), self.line, self.column)
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Io {
            source,
            position: Some(self.position()),
        }
    }

    /// Pulls more bytes from the source until the cache holds at least `n`
    /// bytes or the source is exhausted. Grows the read-ahead chunk size in
    /// 64-byte increments when a single request exceeds it.
    fn ensure(&mut self, n: usize) -> Result<()> {
        while self.cache.len() < n && !self.source_exhausted {
            if n > self.chunk {
                while self.chunk < n {
                    self.chunk += GROWTH_INCREMENT;
                }
            }
            let mut buf = vec![0u8; self.chunk];
            let read = self.source.read(&mut buf).map_err(|e| self.io_error(e))?;
            if read == 0 {
                self.source_exhausted = true;
            } else {
                self.cache.extend(&buf[..read]);
            }
        }
        Ok(())
    }

    /// True only after attempting to fill the cache.
    pub fn eof(&mut self) -> Result<bool> {
        self.ensure(1)?;
        Ok(self.cache.is_empty())
    }

    pub fn peek_byte(&mut self) -> Result<Option<u8>> {
        self.ensure(1)?;
        Ok(self.cache.front().copied())
    }

    fn peek_at(&mut self, offset: usize) -> Result<Option<u8>> {
        self.ensure(offset + 1)?;
        Ok(self.cache.get(offset).copied())
    }

    fn advance_position(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.line += 1;
                self.column = 0;
            }
            b'\r' => {
                self.column = 0;
            }
            _ => {
                self.column += 1;
            }
        }
    }

    pub fn get_byte(&mut self) -> Result<Option<u8>> {
        self.ensure(1)?;
        match self.cache.pop_front() {
            Some(b) => {
                self.advance_position(b);
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }

    /// Copies up to `buf.len()` bytes without consuming; may grow the cache.
    pub fn peek(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure(buf.len())?;
        let n = buf.len().min(self.cache.len());
        for (slot, byte) in buf.iter_mut().zip(self.cache.iter()).take(n) {
            *slot = *byte;
        }
        Ok(n)
    }

    /// Copies up to `buf.len()` bytes, consuming them and updating position.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure(buf.len())?;
        let n = buf.len().min(self.cache.len());
        for slot in buf.iter_mut().take(n) {
            let b = self.cache.pop_front().expect("checked by ensure");
            self.advance_position(b);
            *slot = b;
        }
        Ok(n)
    }

    /// Consumes exactly `n` bytes, ignoring the content.
    pub fn skip(&mut self, n: usize) -> Result<usize> {
        let mut skipped = 0;
        while skipped < n {
            match self.get_byte()? {
                Some(_) => skipped += 1,
                None => break,
            }
        }
        Ok(skipped)
    }

    pub fn skip_while(&mut self, predicate: impl Fn(u8) -> bool) -> Result<usize> {
        let mut skipped = 0;
        while let Some(b) = self.peek_byte()? {
            if !predicate(b) {
                break;
            }
            self.get_byte()?;
            skipped += 1;
        }
        Ok(skipped)
    }

    pub fn skip_blank(&mut self) -> Result<usize> {
        self.skip_while(is_blank)
    }

    pub fn read_while(&mut self, predicate: impl Fn(u8) -> bool) -> Result<String> {
        let mut out = Vec::new();
        while let Some(b) = self.peek_byte()? {
            if !predicate(b) {
                break;
            }
            out.push(self.get_byte()?.expect("just peeked"));
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    pub fn peek_while(&mut self, predicate: impl Fn(u8) -> bool) -> Result<String> {
        let mut out = Vec::new();
        let mut offset = 0;
        while let Some(b) = self.peek_at(offset)? {
            if !predicate(b) {
                break;
            }
            out.push(b);
            offset += 1;
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    pub fn read_symbol(&mut self) -> Result<String> {
        self.read_while(is_symbol_byte)
    }

    pub fn peek_symbol(&mut self) -> Result<String> {
        self.peek_while(is_symbol_byte)
    }

    /// Reads a `"`-delimited string literal. `\` drops itself and keeps the
    /// following byte literal, even if that byte is itself `"`.
    pub fn read_string_literal(&mut self) -> Result<String> {
        match self.get_byte()? {
            Some(b'"') => {}
            Some(_) | None => {
                return Err(Error::InvalidString {
                    message: "string literal must start with '\"'".into(),
                    position: Some(self.position()),
                })
            }
        }
        let mut out = Vec::new();
        loop {
            match self.get_byte()? {
                None => {
                    return Err(Error::Eof {
                        position: Some(self.position()),
                    })
                }
                Some(b'\\') => match self.get_byte()? {
                    None => {
                        return Err(Error::Eof {
                            position: Some(self.position()),
                        })
                    }
                    Some(escaped) => out.push(escaped),
                },
                Some(b'"') => break,
                Some(b) => out.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Reads a signed decimal/binary/octal/hex integer, or a decimal/hex
    /// float with an optional fractional part and exponent.
    pub fn read_number(&mut self) -> Result<Value> {
        number::read_number(self)
    }

    pub fn read_int(&mut self) -> Result<i64> {
        match self.read_number()? {
            Value::Int(n) => Ok(n),
            Value::Float(_) => Err(Error::InvalidNumber {
                message: "expected an integer literal, found a float".into(),
                position: Some(self.position()),
            }),
            _ => unreachable!("read_number only produces Int or Float"),
        }
    }

    pub fn read_float(&mut self) -> Result<f64> {
        match self.read_number()? {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Err(Error::InvalidNumber {
                message: format!("expected a float literal, found integer {n}"),
                position: Some(self.position()),
            }),
            _ => unreachable!("read_number only produces Int or Float"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(s: &str) -> InputStream<Cursor<Vec<u8>>> {
        InputStream::new("<test>", Cursor::new(s.as_bytes().to_vec()))
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let mut s = stream("ab\ncd");
        for _ in 0..3 {
            s.get_byte().unwrap();
        }
        assert_eq!(s.position().line, 2);
        assert_eq!(s.position().column, 0);
    }

    #[test]
    fn crlf_advances_one_line() {
        let mut s = stream("a\r\nb");
        s.skip(3).unwrap();
        assert_eq!(s.position().line, 2);
        assert_eq!(s.position().column, 0);
    }

    #[test]
    fn skip_blank_stops_at_non_blank() {
        let mut s = stream("   \t x");
        let n = s.skip_blank().unwrap();
        assert_eq!(n, 4);
        assert_eq!(s.peek_byte().unwrap(), Some(b'x'));
    }

    #[test]
    fn read_symbol_stops_at_non_symbol_char() {
        let mut s = stream("foo_1 bar");
        assert_eq!(s.read_symbol().unwrap(), "foo_1");
        assert_eq!(s.peek_byte().unwrap(), Some(b' '));
    }

    #[test]
    fn string_literal_drops_backslash_and_keeps_escaped_byte() {
        let mut s = stream(r#""a\"b\\c""#);
        assert_eq!(s.read_string_literal().unwrap(), "a\"b\\c");
    }

    #[test]
    fn string_literal_errors_on_eof() {
        let mut s = stream("\"unterminated");
        assert!(s.read_string_literal().is_err());
    }

    #[test]
    fn eof_true_only_at_end() {
        let mut s = stream("x");
        assert!(!s.eof().unwrap());
        s.get_byte().unwrap();
        assert!(s.eof().unwrap());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut s = stream("xyz");
        let mut buf = [0u8; 2];
        assert_eq!(s.peek(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"xy");
        assert_eq!(s.get_byte().unwrap(), Some(b'x'));
    }
}
