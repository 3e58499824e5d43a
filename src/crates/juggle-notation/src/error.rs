use crate::span::Span;
use std::fmt;

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    UnexpectedEof {
        expected: String,
    },
    UnclosedDelimiter {
        delimiter: char,
        open_span: Span,
    },
    InvalidNumber {
        value: String,
        span: Span,
    },
    /// Character that is not a compact siteswap throw
    InvalidThrow {
        value: String,
        span: Span,
    },
    /// Notation parsed but does not describe a usable pattern
    Eval(juggle_core::Error),
}

impl ParseError {
    pub fn unexpected_token(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        ParseError::UnexpectedEof {
            expected: expected.into(),
        }
    }

    pub fn unclosed_delimiter(delimiter: char, open_span: Span) -> Self {
        ParseError::UnclosedDelimiter { delimiter, open_span }
    }

    pub fn invalid_number(value: impl Into<String>, span: Span) -> Self {
        ParseError::InvalidNumber {
            value: value.into(),
            span,
        }
    }

    pub fn invalid_throw(value: impl Into<String>, span: Span) -> Self {
        ParseError::InvalidThrow {
            value: value.into(),
            span,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { span, .. } => Some(*span),
            ParseError::UnexpectedEof { .. } => None,
            ParseError::UnclosedDelimiter { open_span, .. } => Some(*open_span),
            ParseError::InvalidNumber { span, .. } => Some(*span),
            ParseError::InvalidThrow { span, .. } => Some(*span),
            ParseError::Eval(_) => None,
        }
    }

    /// True when the text was well formed but the pattern was rejected
    pub fn is_eval(&self) -> bool {
        matches!(self, ParseError::Eval(_))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { expected, found, span } => {
                write!(f, "Expected {}, found {} at {}", expected, found, span)
            }
            ParseError::UnexpectedEof { expected } => {
                write!(f, "Unexpected end of input, expected {}", expected)
            }
            ParseError::UnclosedDelimiter { delimiter, open_span } => {
                write!(f, "Unclosed delimiter '{}' opened at {}", delimiter, open_span)
            }
            ParseError::InvalidNumber { value, span } => {
                write!(f, "Invalid number '{}' at {}", value, span)
            }
            ParseError::InvalidThrow { value, span } => {
                write!(f, "Invalid throw '{}' at {}", value, span)
            }
            ParseError::Eval(err) => write!(f, "Invalid pattern: {}", err),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Eval(err) => Some(err),
            _ => None,
        }
    }
}

impl From<juggle_core::Error> for ParseError {
    fn from(err: juggle_core::Error) -> Self {
        ParseError::Eval(err)
    }
}
