use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A 1-based line/column location within a named byte source, produced by
/// [`InputStream`](crate::stream::InputStream) as it consumes bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub origin: String,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(origin: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            origin: origin.into(),
            line,
            column,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.origin, self.line, self.column)
    }
}

/// Every fallible outcome in the template pipeline, from byte I/O up through
/// evaluation, collected into a single typed enum. Most variants carry an
/// optional [`Position`]; callers are expected to match on the variant, never
/// on the `Display` text.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        position: Option<Position>,
    },

    #[error("unexpected end of file")]
    Eof { position: Option<Position> },

    #[error("invalid number: {message}")]
    InvalidNumber {
        message: String,
        position: Option<Position>,
    },

    #[error("invalid string literal: {message}")]
    InvalidString {
        message: String,
        position: Option<Position>,
    },

    #[error("value out of range: {message}")]
    Range {
        message: String,
        position: Option<Position>,
    },

    #[error("syntax error: {message}")]
    Syntax {
        message: String,
        position: Option<Position>,
    },

    #[error("unmatched block directive: {message}")]
    UnmatchedBlock {
        message: String,
        position: Option<Position>,
    },

    #[error("missing symbol: {message}")]
    MissingSymbol {
        message: String,
        position: Option<Position>,
    },

    #[error("missing value: {message}")]
    MissingValue {
        message: String,
        position: Option<Position>,
    },

    #[error("missing separator: {message}")]
    MissingSeparator {
        message: String,
        position: Option<Position>,
    },

    #[error("invalid operand: {message}")]
    InvalidOperand {
        message: String,
        position: Option<Position>,
    },

    #[error("symbol not found: `{name}`")]
    SymbolNotFound {
        name: String,
        position: Option<Position>,
    },

    #[error("operation failed: {message}")]
    Failed {
        message: String,
        position: Option<Position>,
    },
}

impl Error {
    pub fn position(&self) -> Option<&Position> {
        match self {
            Error::Io { position, .. }
            | Error::Eof { position }
            | Error::InvalidNumber { position, .. }
            | Error::InvalidString { position, .. }
            | Error::Range { position, .. }
            | Error::Syntax { position, .. }
            | Error::UnmatchedBlock { position, .. }
            | Error::MissingSymbol { position, .. }
            | Error::MissingValue { position, .. }
            | Error::MissingSeparator { position, .. }
            | Error::InvalidOperand { position, .. }
            | Error::SymbolNotFound { position, .. }
            | Error::Failed { position, .. } => position.as_ref(),
        }
    }

    /// Renders the error together with its position, when known, for
    /// user-facing reporting (the CLI prints this to stderr).
    pub fn describe(&self) -> String {
        match self.position() {
            Some(p) => format!("{self} at {p}"),
            None => self.to_string(),
        }
    }

    pub fn syntax(message: impl Into<String>, position: Option<Position>) -> Self {
        Error::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn failed(message: impl Into<String>, position: Option<Position>) -> Self {
        Error::Failed {
            message: message.into(),
            position,
        }
    }

    pub fn invalid_operand(message: impl Into<String>, position: Option<Position>) -> Self {
        Error::InvalidOperand {
            message: message.into(),
            position,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_display_matches_origin_line_column() {
        let p = Position::new("<stream>", 3, 7);
        assert_eq!(p.to_string(), "<stream>:3:7");
    }

    #[test]
    fn describe_includes_position_when_present() {
        let err = Error::SymbolNotFound {
            name: "x".into(),
            position: Some(Position::new("<stream>", 1, 1)),
        };
        assert_eq!(err.describe(), "symbol not found: `x` at <stream>:1:1");
    }

    #[test]
    fn describe_omits_position_when_absent() {
        let err = Error::SymbolNotFound {
            name: "x".into(),
            position: None,
        };
        assert_eq!(err.describe(), "symbol not found: `x`");
    }
}
