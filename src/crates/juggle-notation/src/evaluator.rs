//! Evaluator for notation syntax trees
//!
//! Converts parsed trees into the canonical [`Mhn`] value and from there
//! into a [`Pattern`].
use crate::ast::*;
use crate::error::{ParseError, Result};
use crate::parser::parse;
use juggle_core::{ConfigError, Limits, Mhn, Pattern};

/// Nested-array value of a syntax tree
pub fn to_mhn(ast: &Ast) -> Mhn {
    match ast {
        Ast::Number(n) => Mhn::Num(n.value),
        Ast::List(l) => Mhn::List(l.items.iter().map(to_mhn).collect()),
    }
}

/// Build a pattern with the default size limits
pub fn evaluate(ast: &Ast) -> Result<Pattern> {
    evaluate_with_limits(ast, Limits::default())
}

pub fn evaluate_with_limits(ast: &Ast, limits: Limits) -> Result<Pattern> {
    if ast.depth() > 4 {
        return Err(ParseError::Eval(
            ConfigError::MalformedNotation(format!(
                "nesting depth {} at {} exceeds 4",
                ast.depth(),
                ast.span()
            ))
            .into(),
        ));
    }
    Ok(Pattern::with_limits(&to_mhn(ast), limits)?)
}

/// Parse and evaluate in one step
pub fn parse_pattern(source: &str) -> Result<Pattern> {
    evaluate(&parse(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use juggle_core::{Error, InvariantViolation};

    #[test]
    fn test_to_mhn() {
        let ast = parse("[[4,3],1,4]").unwrap();
        let expected: Mhn = Mhn::List(vec![
            Mhn::List(vec![Mhn::Num(4.0), Mhn::Num(3.0)]),
            Mhn::Num(1.0),
            Mhn::Num(4.0),
        ]);
        assert_eq!(to_mhn(&ast), expected);
    }

    #[test]
    fn test_compact_and_array_agree() {
        let compact = parse_pattern("[43]14").unwrap();
        let array = parse_pattern("[[4,3],1,4]").unwrap();
        assert_eq!(compact.get_mhn(), array.get_mhn());
        assert_eq!(compact.props(), 4);
    }

    #[test]
    fn test_multi_row() {
        let p = parse_pattern("[[[1,2]],[[2,2]],[[0,2]]]").unwrap();
        assert_eq!(p.num_rows(), 3);
    }

    #[test]
    fn test_eval_errors_keep_their_kind() {
        let err = parse_pattern("532").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Eval(Error::Invariant(InvariantViolation::NonIntegralProps { .. }))
        ));
        let err = parse_pattern("[[[[[1,2]]]]]").unwrap_err();
        assert!(err.is_eval());
        let err = parse_pattern("[[[5,3]]]").unwrap_err();
        assert!(matches!(err, ParseError::Eval(Error::Config(_))));
    }

    #[test]
    fn test_limits() {
        let limits = Limits {
            max_period: 2,
            ..Limits::default()
        };
        let ast = parse("531").unwrap();
        assert!(evaluate_with_limits(&ast, limits).is_err());
        assert!(evaluate(&ast).is_ok());
    }
}
