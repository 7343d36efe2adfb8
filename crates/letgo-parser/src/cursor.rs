use letgo_common::Span;
use letgo_lexer::{Token, TokenKind};

/// Read position over a token sequence that never changes once built.
/// The position only moves forward.
pub struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    pub fn peek_ahead_kind(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Consume the current token. At end of input nothing moves.
    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Span of the current token, or an empty span just past the last
    /// token when the input is exhausted.
    pub fn current_span(&self) -> Span {
        match self.peek() {
            Some(token) => token.span,
            None => Span::point(self.tokens.last().map_or(0, |t| t.span.end)),
        }
    }

    pub fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letgo_lexer::tokenize;

    fn cursor(source: &str) -> TokenCursor {
        TokenCursor::new(tokenize(source).expect("lex error"))
    }

    #[test]
    fn test_peek_does_not_consume() {
        let c = cursor("LET X");
        assert_eq!(c.peek_kind(), Some(TokenKind::Let));
        assert_eq!(c.peek_kind(), Some(TokenKind::Let));
        assert_eq!(c.peek_ahead_kind(1), Some(TokenKind::Ident));
        assert_eq!(c.peek_ahead_kind(2), None);
        assert_eq!(c.current_span(), Span::new(0, 3));
    }

    #[test]
    fn test_eat_only_matching_kind() {
        let mut c = cursor("GO TO");
        assert!(!c.eat(TokenKind::To));
        assert!(c.eat(TokenKind::Go));
        assert!(c.eat(TokenKind::To));
        assert!(c.at_end());
        assert_eq!(c.prev_span(), Span::new(3, 5));
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut c = cursor("END");
        assert_eq!(c.advance().map(|t| t.text.as_str()), Some("END"));
        assert!(c.advance().is_none());
        assert!(c.at_end());
        assert_eq!(c.prev_span(), Span::new(0, 3));
    }

    #[test]
    fn test_spans_at_end_of_input() {
        let mut c = cursor("PRINT A  ");
        c.advance();
        c.advance();
        assert_eq!(c.prev_span(), Span::new(6, 7));
        assert_eq!(c.current_span(), Span::point(7));

        let empty = cursor("   ");
        assert!(empty.is_empty());
        assert_eq!(empty.current_span(), Span::point(0));
        assert_eq!(empty.prev_span(), Span::point(0));
    }
}
