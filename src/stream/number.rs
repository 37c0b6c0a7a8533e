//! `InputStream::read_number` — the numeric literal grammar.
//!
//! The scan is purely speculative: every byte is inspected with `peek_at`
//! before anything is consumed, so a failed parse (e.g. `+ff`) leaves the
//! stream untouched at its original position.

use super::InputStream;
use crate::error::{Error, Result};
use crate::value::Value;
use std::io::Read;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Base {
    Bin,
    Oct,
    Dec,
    Hex,
}

impl Base {
    fn radix(self) -> u32 {
        match self {
            Base::Bin => 2,
            Base::Oct => 8,
            Base::Dec => 10,
            Base::Hex => 16,
        }
    }

    fn is_digit(self, b: u8) -> bool {
        (b as char).is_digit(self.radix())
    }
}

pub(super) fn read_number<R: Read>(stream: &mut InputStream<R>) -> Result<Value> {
    let mut offset = 0usize;

    let negative = match stream.peek_at(0)? {
        Some(b'-') => {
            offset = 1;
            true
        }
        Some(b'+') => {
            offset = 1;
            false
        }
        _ => false,
    };

    let base = match (stream.peek_at(offset)?, stream.peek_at(offset + 1)?) {
        (Some(b'0'), Some(b'b' | b'B')) => Some(Base::Bin),
        (Some(b'0'), Some(b'o' | b'O')) => Some(Base::Oct),
        (Some(b'0'), Some(b'x' | b'X')) => Some(Base::Hex),
        _ => None,
    };

    let base = match base {
        Some(b) => {
            // A prefix requires at least one valid digit to follow it.
            match stream.peek_at(offset + 2)? {
                Some(d) if b.is_digit(d) => {
                    offset += 2;
                    b
                }
                _ => Base::Dec,
            }
        }
        None => Base::Dec,
    };

    let int_digits_start = offset;
    while let Some(b) = stream.peek_at(offset)? {
        if base.is_digit(b) {
            offset += 1;
        } else {
            break;
        }
    }
    let int_digit_count = offset - int_digits_start;

    let mut has_fraction = false;
    let frac_digits_start;
    let mut frac_digit_count = 0;
    if matches!(base, Base::Dec | Base::Hex) && stream.peek_at(offset)? == Some(b'.') {
        let mut probe = offset + 1;
        let mut count = 0;
        while let Some(b) = stream.peek_at(probe)? {
            if base.is_digit(b) {
                probe += 1;
                count += 1;
            } else {
                break;
            }
        }
        if count > 0 {
            has_fraction = true;
            frac_digits_start = offset + 1;
            frac_digit_count = count;
            offset = probe;
        } else {
            frac_digits_start = offset;
        }
    } else {
        frac_digits_start = offset;
    }

    if int_digit_count == 0 && frac_digit_count == 0 {
        return Err(Error::InvalidNumber {
            message: "no digits found while scanning a number literal".into(),
            position: Some(stream.position()),
        });
    }

    let exponent_marker: Option<u8> = match base {
        Base::Dec => Some(b'e'),
        Base::Hex => Some(b'p'),
        _ => None,
    };

    let mut has_exponent = false;
    let mut exponent_negative = false;
    let exp_digits_start;
    let mut exp_digit_count = 0;
    if let Some(marker) = exponent_marker {
        if matches!(stream.peek_at(offset)?, Some(b) if b.to_ascii_lowercase() == marker) {
            let mut probe = offset + 1;
            let neg = match stream.peek_at(probe)? {
                Some(b'-') => {
                    probe += 1;
                    true
                }
                Some(b'+') => {
                    probe += 1;
                    false
                }
                _ => false,
            };
            let digits_start = probe;
            while matches!(stream.peek_at(probe)?, Some(b) if b.is_ascii_digit()) {
                probe += 1;
            }
            let count = probe - digits_start;
            if count > 0 {
                has_exponent = true;
                exponent_negative = neg;
                exp_digits_start = digits_start;
                exp_digit_count = count;
                offset = probe;
            } else {
                exp_digits_start = offset;
            }
        } else {
            exp_digits_start = offset;
        }
    } else {
        exp_digits_start = offset;
    }

    // Materialize the spans now that the full extent of the literal is known,
    // then consume exactly that many bytes from the stream.
    let mut text = Vec::with_capacity(offset);
    for i in 0..offset {
        text.push(stream.peek_at(i)?.expect("within scanned range"));
    }
    stream.skip(offset)?;

    let is_float = has_fraction || has_exponent;

    if !is_float {
        let digits = std::str::from_utf8(&text[int_digits_start..int_digits_start + int_digit_count])
            .expect("ascii digits");
        let magnitude = i64::from_str_radix(digits, base.radix()).map_err(|e| Error::Range {
            message: format!("integer literal out of range: {e}"),
            position: Some(stream.position()),
        })?;
        let value = if negative { -magnitude } else { magnitude };
        return Ok(Value::Int(value));
    }

    let value = match base {
        Base::Dec => {
            let s = std::str::from_utf8(&text).expect("ascii digits");
            s.parse::<f64>().map_err(|e| Error::InvalidNumber {
                message: format!("invalid float literal '{s}': {e}"),
                position: Some(stream.position()),
            })?
        }
        Base::Hex => {
            let int_part = std::str::from_utf8(&text[int_digits_start..int_digits_start + int_digit_count])
                .expect("ascii digits");
            let mut mantissa = int_part
                .chars()
                .fold(0f64, |acc, c| acc * 16.0 + c.to_digit(16).unwrap() as f64);
            if frac_digit_count > 0 {
                let frac_part =
                    std::str::from_utf8(&text[frac_digits_start..frac_digits_start + frac_digit_count])
                        .expect("ascii digits");
                let mut scale = 1f64 / 16.0;
                for c in frac_part.chars() {
                    mantissa += c.to_digit(16).unwrap() as f64 * scale;
                    scale /= 16.0;
                }
            }
            if has_exponent {
                let exp_str =
                    std::str::from_utf8(&text[exp_digits_start..exp_digits_start + exp_digit_count])
                        .expect("ascii digits");
                let exp_value: i32 = exp_str.parse().map_err(|e| Error::InvalidNumber {
                    message: format!("invalid hex-float exponent: {e}"),
                    position: Some(stream.position()),
                })?;
                let exp_value = if exponent_negative { -exp_value } else { exp_value };
                mantissa *= 2f64.powi(exp_value);
            }
            mantissa
        }
        Base::Bin | Base::Oct => unreachable!("fractional/exponent forms only apply to dec/hex"),
    };

    Ok(Value::Float(if negative { -value } else { value }))
}
