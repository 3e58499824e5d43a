use crate::ast::*;
use crate::error::{ParseError, Result};
use crate::lexer::{Lexer, Token};
use crate::span::Span;

/// Parser for pattern notation
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    syntax: Syntax,
}

/// Array syntax whenever a comma appears outside a comment
pub fn detect_syntax(source: &str) -> Syntax {
    let comma = source
        .lines()
        .filter_map(|line| line.split('#').next())
        .any(|code| code.contains(','));
    if comma {
        Syntax::Array
    } else {
        Syntax::Compact
    }
}

impl<'source> Parser<'source> {
    /// Create a parser, choosing the syntax from the source text
    pub fn new(source: &'source str) -> Self {
        Parser::with_syntax(source, detect_syntax(source))
    }

    pub fn with_syntax(source: &'source str, syntax: Syntax) -> Self {
        Parser {
            lexer: Lexer::new(source),
            syntax,
        }
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Parse the whole input as one pattern
    pub fn parse(&mut self) -> Result<Ast> {
        let ast = match self.syntax {
            Syntax::Array => self.parse_value()?,
            Syntax::Compact => self.parse_compact()?,
        };
        if let Some((token, span)) = self.next() {
            return Err(ParseError::unexpected_token("end of input", token.to_string(), span));
        }
        Ok(ast)
    }

    /// A number or a bracketed, comma-separated list of values
    fn parse_value(&mut self) -> Result<Ast> {
        match self.next() {
            Some((Token::Number(n), span)) => Ok(Ast::number(n, span)),
            Some((Token::LBracket, open)) => self.parse_list(open),
            Some((Token::Error, span)) => Err(self.invalid_number(span)),
            Some((token, span)) => Err(ParseError::unexpected_token(
                "number or '['",
                token.to_string(),
                span,
            )),
            None => Err(ParseError::unexpected_eof("number or '['")),
        }
    }

    fn parse_list(&mut self, open: Span) -> Result<Ast> {
        let mut items = Vec::new();
        if let Some((Token::RBracket, close)) = self.peek() {
            self.next();
            return Ok(Ast::list(items, open.merge(close)));
        }

        loop {
            if self.peek().is_none() {
                return Err(ParseError::unclosed_delimiter('[', open));
            }
            items.push(self.parse_value()?);
            match self.next() {
                Some((Token::Comma, _)) => continue,
                Some((Token::RBracket, close)) => return Ok(Ast::list(items, open.merge(close))),
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token("',' or ']'", token.to_string(), span))
                }
                None => return Err(ParseError::unclosed_delimiter('[', open)),
            }
        }
    }

    /// Compact siteswap: one character per throw, brackets for multiplexes
    fn parse_compact(&mut self) -> Result<Ast> {
        let mut beats = Vec::new();
        let mut span: Option<Span> = None;

        while let Some((token, token_span)) = self.next() {
            span = Some(span.map_or(token_span, |s| s.merge(token_span)));
            match token {
                Token::Number(_) | Token::Letters => beats.extend(self.compact_throws(token_span)?),
                Token::LBracket => {
                    let multiplex = self.parse_compact_multiplex(token_span)?;
                    span = Some(span.map_or(multiplex.span(), |s| s.merge(multiplex.span())));
                    beats.push(multiplex);
                }
                Token::Error => return Err(self.invalid_throw(token_span)),
                other => {
                    return Err(ParseError::unexpected_token("throw", other.to_string(), token_span))
                }
            }
        }

        match span {
            Some(span) => Ok(Ast::list(beats, span)),
            None => Err(ParseError::unexpected_eof("throw")),
        }
    }

    fn parse_compact_multiplex(&mut self, open: Span) -> Result<Ast> {
        let mut throws = Vec::new();
        loop {
            match self.next() {
                Some((Token::Number(_) | Token::Letters, span)) => throws.extend(self.compact_throws(span)?),
                Some((Token::RBracket, close)) => {
                    if throws.is_empty() {
                        return Err(ParseError::unexpected_token("throw", "]", close));
                    }
                    return Ok(Ast::list(throws, open.merge(close)));
                }
                Some((Token::Error, span)) => return Err(self.invalid_throw(span)),
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token("throw or ']'", token.to_string(), span))
                }
                None => return Err(ParseError::unclosed_delimiter('[', open)),
            }
        }
    }

    /// Split a run of digits and letters into single-character throws
    fn compact_throws(&self, span: Span) -> Result<Vec<Ast>> {
        let text = self.lexer.slice(span);
        text.char_indices()
            .map(|(offset, ch)| {
                let at = Span::at(span.start + offset);
                compact_height(ch)
                    .map(|h| Ast::number(h as f64, at))
                    .ok_or_else(|| ParseError::invalid_throw(ch.to_string(), at))
            })
            .collect()
    }

    fn invalid_number(&self, span: Span) -> ParseError {
        ParseError::invalid_number(self.lexer.slice(span), span)
    }

    fn invalid_throw(&self, span: Span) -> ParseError {
        ParseError::invalid_throw(self.lexer.slice(span), span)
    }

    fn next(&mut self) -> Option<(Token, Span)> {
        self.lexer.next_token()
    }

    fn peek(&mut self) -> Option<(Token, Span)> {
        self.lexer.peek_token()
    }
}

/// Height of a compact siteswap character: `0`-`9`, then `a`-`z` for 10-35
pub fn compact_height(ch: char) -> Option<u32> {
    match ch {
        '0'..='9' => ch.to_digit(10),
        'a'..='z' => Some(ch as u32 - 'a' as u32 + 10),
        _ => None,
    }
}

/// Parse notation, detecting array or compact syntax
pub fn parse(source: &str) -> Result<Ast> {
    Parser::new(source).parse()
}

/// Parse notation with an explicit syntax
pub fn parse_with(source: &str, syntax: Syntax) -> Result<Ast> {
    Parser::with_syntax(source, syntax).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(ast: &Ast) -> Vec<f64> {
        match ast {
            Ast::Number(n) => vec![n.value],
            Ast::List(l) => l.items.iter().flat_map(numbers).collect(),
        }
    }

    #[test]
    fn test_detect_syntax() {
        assert_eq!(detect_syntax("531"), Syntax::Compact);
        assert_eq!(detect_syntax("[5,3,1]"), Syntax::Array);
        assert_eq!(detect_syntax("# a, b\n531"), Syntax::Compact);
    }

    #[test]
    fn test_parse_array() {
        let ast = parse("[[4,3],1,4]").unwrap();
        assert_eq!(ast.depth(), 2);
        assert_eq!(numbers(&ast), vec![4.0, 3.0, 1.0, 4.0]);
        assert_eq!(ast.span(), Span::new(0, 11));
    }

    #[test]
    fn test_parse_compact() {
        let ast = parse("531").unwrap();
        assert_eq!(ast.depth(), 1);
        assert_eq!(numbers(&ast), vec![5.0, 3.0, 1.0]);
        match &ast {
            Ast::List(l) => assert_eq!(l.items[1].span(), Span::new(1, 2)),
            _ => panic!("Expected List"),
        }
    }

    #[test]
    fn test_parse_compact_multiplex_and_letters() {
        let ast = parse("[54]2a").unwrap();
        assert_eq!(ast.depth(), 2);
        assert_eq!(numbers(&ast), vec![5.0, 4.0, 2.0, 10.0]);
    }

    #[test]
    fn test_empty_list() {
        let ast = parse_with("[]", Syntax::Array).unwrap();
        assert_eq!(ast, Ast::list(vec![], Span::new(0, 2)));
    }

    #[test]
    fn test_unclosed() {
        assert!(matches!(
            parse("[5,3,1"),
            Err(ParseError::UnclosedDelimiter { delimiter: '[', .. })
        ));
        assert!(matches!(
            parse("[54"),
            Err(ParseError::UnclosedDelimiter { .. })
        ));
    }

    #[test]
    fn test_trailing_tokens() {
        assert!(matches!(
            parse("[5,3],1"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_invalid_compact_throw() {
        let err = parse("5-1").unwrap_err();
        assert_eq!(err, ParseError::invalid_throw("-", Span::new(1, 2)));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse(""), Err(ParseError::UnexpectedEof { .. })));
        assert!(matches!(parse("# nothing"), Err(ParseError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_compact_height() {
        assert_eq!(compact_height('7'), Some(7));
        assert_eq!(compact_height('z'), Some(35));
        assert_eq!(compact_height('A'), None);
    }
}
