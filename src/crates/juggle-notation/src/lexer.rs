use crate::span::Span;
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[regex(r"-?[0-9]+(\.[0-9]+)?", parse_number, priority = 10)]
    Number(f64),

    // Compact siteswap heights 10..35
    #[regex(r"[a-z]+")]
    Letters,

    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,

    #[regex(r"#[^\n]*")]
    Comment,

    Error,
}

fn parse_number(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Letters => write!(f, "letters"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Comment => write!(f, "comment"),
            Token::Error => write!(f, "error"),
        }
    }
}

/// Lexer wrapper with one token of lookahead
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    peeked: Option<Option<(Token, Span)>>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Lexer {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    pub fn next_token(&mut self) -> Option<(Token, Span)> {
        if let Some(peeked) = self.peeked.take() {
            return peeked;
        }

        loop {
            let token = self.inner.next()?;
            let span = Span::from(self.inner.span());

            if matches!(token, Ok(Token::Comment)) {
                continue;
            }

            let token = token.unwrap_or(Token::Error);
            return Some((token, span));
        }
    }

    pub fn peek_token(&mut self) -> Option<(Token, Span)> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_token());
        }
        self.peeked.as_ref().and_then(|x| x.clone())
    }

    pub fn source(&self) -> &'source str {
        self.inner.source()
    }

    pub fn slice(&self, span: Span) -> &'source str {
        &self.source()[span.to_range()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        while let Some((token, _)) = lexer.next_token() {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_lex_array() {
        assert_eq!(
            lex("[[1, 2], 0]"),
            vec![
                Token::LBracket,
                Token::LBracket,
                Token::Number(1.0),
                Token::Comma,
                Token::Number(2.0),
                Token::RBracket,
                Token::Comma,
                Token::Number(0.0),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn test_lex_negative_and_fraction() {
        assert_eq!(lex("-1 2.5"), vec![Token::Number(-1.0), Token::Number(2.5)]);
    }

    #[test]
    fn test_lex_compact() {
        assert_eq!(
            lex("[54]2b"),
            vec![
                Token::LBracket,
                Token::Number(54.0),
                Token::RBracket,
                Token::Number(2.0),
                Token::Letters,
            ]
        );
    }

    #[test]
    fn test_lex_skip_comments() {
        assert_eq!(lex("# box\n[4,4,1]").len(), 7);
    }

    #[test]
    fn test_lex_error() {
        assert_eq!(lex("3;"), vec![Token::Number(3.0), Token::Error]);
    }

    #[test]
    fn test_lexer_slice_and_peek() {
        let mut lexer = Lexer::new("531 a");
        let (token, span) = lexer.peek_token().unwrap();
        assert_eq!(token, Token::Number(531.0));
        assert_eq!(lexer.slice(span), "531");
        lexer.next_token().unwrap();
        let (token, span) = lexer.next_token().unwrap();
        assert_eq!(token, Token::Letters);
        assert_eq!(lexer.slice(span), "a");
        assert!(lexer.next_token().is_none());
    }
}
