// Formatter: write patterns back out as notation
use crate::ast::Ast;
use crate::evaluator::to_mhn;
use juggle_core::{Mhn, Pattern, Throw};

/// Array notation, integers written without a fractional part
pub fn format(mhn: &Mhn) -> String {
    match mhn {
        Mhn::Num(n) => format_number(*n),
        Mhn::List(items) => {
            let inner: Vec<String> = items.iter().map(format).collect();
            format!("[{}]", inner.join(","))
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Array notation of a syntax tree, dropping comments and whitespace
pub fn format_ast(ast: &Ast) -> String {
    format(&to_mhn(ast))
}

/// Compact siteswap text for a single-row pattern
///
/// Returns `None` when the pattern has several rows or a throw that compact
/// syntax cannot express (bounces, destination beats, heights above 35).
pub fn format_compact(pattern: &Pattern) -> Option<String> {
    let [row] = pattern.rows() else {
        return None;
    };

    let mut out = String::new();
    for column in row.columns() {
        match column.as_slice() {
            [] => out.push('0'),
            [throw] => out.push(compact_char(throw)?),
            throws => {
                out.push('[');
                for throw in throws {
                    out.push(compact_char(throw)?);
                }
                out.push(']');
            }
        }
    }
    Some(out)
}

fn compact_char(throw: &Throw) -> Option<char> {
    if throw.dest_row != 0 || throw.dest_beats != 0 || throw.bounces > 0 {
        return None;
    }
    let height = u32::try_from(throw.flt_beats).ok()?;
    std::char::from_digit(height, 36)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::parse_pattern;
    use crate::parser::parse;

    #[test]
    fn test_format_numbers() {
        assert_eq!(format(&Mhn::Num(3.0)), "3");
        assert_eq!(format(&Mhn::Num(-1.0)), "-1");
        assert_eq!(format(&Mhn::Num(2.5)), "2.5");
    }

    #[test]
    fn test_format_canonical() {
        let p = parse_pattern("3").unwrap();
        assert_eq!(format(&p.get_mhn()), "[[[[0,3]]]]");
    }

    #[test]
    fn test_format_ast_strips_layout() {
        let ast = parse("# box\n[ [4, 3],\n  1, 4 ]").unwrap();
        assert_eq!(format_ast(&ast), "[[4,3],1,4]");
    }

    #[test]
    fn test_format_compact() {
        for source in ["531", "[43]14", "b1", "3"] {
            let p = parse_pattern(source).unwrap();
            assert_eq!(format_compact(&p).as_deref(), Some(source));
        }
    }

    #[test]
    fn test_format_compact_rejects_rows() {
        let p = parse_pattern("[[[1,2]],[[0,2]]]").unwrap();
        assert_eq!(format_compact(&p), None);
    }

    #[test]
    fn test_format_compact_rejects_bounces() {
        let p = parse_pattern("[[[0,3,0,1]]]").unwrap();
        assert_eq!(format_compact(&p), None);
    }
}
