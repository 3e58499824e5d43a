//! Text notation for MHN+ juggling patterns
//!
//! This crate provides lexing, parsing, formatting and evaluation of the two
//! surface syntaxes used to write patterns.
//!
//! # Examples
//!
//! ```
//! use juggle_notation::{parse, evaluate, format};
//!
//! // Parse notation
//! let ast = parse("[43]14").unwrap();
//!
//! // Evaluate to a pattern
//! let pattern = evaluate(&ast).unwrap();
//! assert_eq!(pattern.props(), 4);
//!
//! // Canonical array form
//! assert_eq!(format(&pattern.get_mhn()), "[[[[0,4],[0,3]],[[0,1]],[[0,4]]]]");
//! ```
//!
//! # Syntax
//!
//! - Array: nested, comma-separated lists such as `[[[1,2]],[[0,2]]]`
//! - Compact: one character per throw, `0`-`9` then `a`-`z`: `531`, `b1`
//! - Compact multiplex: `[54]24`
//! - Comments: `# to end of line`
//!
//! Any comma outside a comment selects array syntax.
//!
//! # Main Functions
//!
//! - [`parse`]: Parse notation to a syntax tree
//! - [`evaluate`]: Build a [`juggle_core::Pattern`] from a syntax tree
//! - [`parse_pattern`]: Both steps at once
//! - [`format()`]: Write canonical array notation
//! - [`format_compact`]: Write compact siteswap when the pattern allows it

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod span;


pub use ast::{Ast, Syntax};
pub use error::{ParseError, Result};
pub use evaluator::{evaluate, evaluate_with_limits, parse_pattern, to_mhn};
pub use formatter::{format, format_ast, format_compact};
pub use lexer::{Lexer, Token};
pub use parser::{compact_height, detect_syntax, parse, parse_with, Parser};
pub use span::Span;
