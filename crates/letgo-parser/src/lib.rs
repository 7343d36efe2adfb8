pub mod ast;
mod cursor;

use std::collections::HashSet;
use std::fmt;

use ast::*;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use letgo_common::{FileId, Span};
use letgo_lexer::{tokenize, LexError, Token, TokenKind};
use thiserror::Error;
use tracing::{debug, trace};

pub use cursor::TokenCursor;

/// What the parser was looking at when it gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    Token(Token),
    EndOfInput,
}

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Found::Token(token) => write!(f, "'{}'", token.text),
            Found::EndOfInput => f.write_str("end of input"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("{0}")]
    Syntax(String),
    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),
    #[error("branch index {index} out of range: expected 1 to {len}")]
    BranchIndexOutOfRange { index: i32, len: usize },
    #[error("invalid branch index '{0}'")]
    InvalidBranchIndex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub found: Found,
}

impl ParseError {
    /// Duplicate labels and bad branch indexes are grammatical but meaningless.
    pub fn is_semantic(&self) -> bool {
        !matches!(self.kind, ParseErrorKind::Syntax(_))
    }

    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        let title = if self.is_semantic() {
            "semantic error"
        } else {
            "syntax error"
        };
        Diagnostic::error()
            .with_message(format!("{title}: {self}"))
            .with_labels(vec![Label::primary(file_id, self.span.to_range())
                .with_message(format!("found {}", self.found))])
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// How deeply commands and expressions may nest before the walk gives up.
pub const MAX_NESTING: usize = 128;

/// Outcome of checking source text: either stage can reject it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] ParseError),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Lexical(e) => e.span,
            Error::Syntax(e) => e.span,
        }
    }

    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        match self {
            Error::Lexical(e) => e.to_diagnostic(file_id),
            Error::Syntax(e) => e.to_diagnostic(file_id),
        }
    }
}

/// Single-use parse context: the token cursor plus the labels declared so
/// far. Every rule returns a `ParseResult`, so the first error unwinds the
/// whole descent without touching the context again.
pub struct Parser {
    cursor: TokenCursor,
    labels: HashSet<String>,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            cursor: TokenCursor::new(tokens),
            labels: HashSet::new(),
            depth: 0,
        }
    }

    /// Program ::= CommandSequence END
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        if self.cursor.is_empty() {
            return Err(self.syntax_error("expected END"));
        }
        let start = self.cursor.current_span();

        // A lone END is the empty program.
        let commands = if self.cursor.check(TokenKind::End) {
            Vec::new()
        } else {
            self.parse_command_sequence()?
        };

        self.expect(TokenKind::End, "expected END")?;
        if !self.cursor.at_end() {
            return Err(self.syntax_error("unexpected tokens after END"));
        }

        Ok(Program {
            commands,
            span: start.merge(self.cursor.prev_span()),
        })
    }

    // ── Commands ────────────────────────────────────────────

    fn parse_command_sequence(&mut self) -> ParseResult<Vec<Command>> {
        let mut commands = vec![self.parse_command()?];
        loop {
            if self.cursor.eat(TokenKind::Semicolon) {
                // `;` right before END (or the end of input) closes the sequence
                if self.at_sequence_end() {
                    break;
                }
                commands.push(self.parse_command()?);
            } else if self.at_sequence_end() {
                break;
            } else {
                return Err(self.syntax_error("expected ';' or 'END'"));
            }
        }
        Ok(commands)
    }

    fn at_sequence_end(&self) -> bool {
        self.cursor.at_end() || self.cursor.check(TokenKind::End)
    }

    fn at_label(&self) -> bool {
        self.cursor.check(TokenKind::Ident)
            && self.cursor.peek_ahead_kind(1) == Some(TokenKind::Colon)
    }

    fn parse_command(&mut self) -> ParseResult<Command> {
        self.nested(|p| match p.cursor.peek_kind() {
            Some(TokenKind::Let) => p.parse_let(),
            Some(TokenKind::Go) => p.parse_goto(),
            Some(TokenKind::Read) => p.parse_read(),
            Some(TokenKind::Print) => p.parse_print(),
            Some(TokenKind::If) => p.parse_if(),
            Some(TokenKind::Ident) if p.at_label() => p.parse_labeled(),
            _ => Err(p.syntax_error("expected a keyword or label")),
        })
    }

    /// Run a recursive rule one level deeper. Past `MAX_NESTING` this is a
    /// syntax error at the current token.
    fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.syntax_error(&format!("nesting deeper than {MAX_NESTING} levels")));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn parse_labeled(&mut self) -> ParseResult<Command> {
        let start = self.cursor.current_span();
        let label = self.current_text();
        if !self.labels.insert(label.clone()) {
            return Err(self.error(ParseErrorKind::DuplicateLabel(label)));
        }
        debug!(label = %label, "label declared");
        self.cursor.advance(); // label
        self.cursor.advance(); // ':'

        let command = self.parse_command()?;
        let span = start.merge(command.span());
        Ok(Command::Labeled {
            label,
            command: Box::new(command),
            span,
        })
    }

    fn parse_let(&mut self) -> ParseResult<Command> {
        let start = self.cursor.current_span();
        self.cursor.advance(); // LET
        let target = self.expect_ident("expected identifier after 'LET'")?;
        self.expect(TokenKind::Assign, "expected ':=' after identifier")?;
        let value = self.parse_expr()?;
        Ok(Command::Let {
            target,
            value,
            span: start.merge(self.cursor.prev_span()),
        })
    }

    fn parse_goto(&mut self) -> ParseResult<Command> {
        let start = self.cursor.current_span();
        self.cursor.advance(); // GO
        self.expect(TokenKind::To, "expected 'TO' after 'GO'")?;
        match self.cursor.peek_kind() {
            Some(TokenKind::Ident) => {
                // Targets are not resolved against declared labels.
                let (target, _) = self.bump();
                Ok(Command::Goto {
                    target,
                    span: start.merge(self.cursor.prev_span()),
                })
            }
            Some(TokenKind::Number) => self.parse_computed_goto(start),
            _ => Err(self.syntax_error("expected label or number after 'GO TO'")),
        }
    }

    /// GO TO n OF label, ...; `n` picks a label by 1-based position.
    fn parse_computed_goto(&mut self, start: Span) -> ParseResult<Command> {
        let index_found = self.found();
        let (index_text, index_span) = self.bump();
        self.expect(TokenKind::Of, "expected 'OF' after branch index")?;
        let targets = self.parse_ident_list("label", "'OF'")?;

        // Same range as a signed 32-bit integer; anything wider is malformed.
        let Ok(index) = index_text.parse::<i32>() else {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidBranchIndex(index_text),
                span: index_span,
                found: index_found,
            });
        };
        if index < 1 || index as usize > targets.len() {
            return Err(ParseError {
                kind: ParseErrorKind::BranchIndexOutOfRange {
                    index,
                    len: targets.len(),
                },
                span: index_span,
                found: index_found,
            });
        }

        Ok(Command::ComputedGoto {
            index,
            targets,
            span: start.merge(self.cursor.prev_span()),
        })
    }

    fn parse_read(&mut self) -> ParseResult<Command> {
        let start = self.cursor.current_span();
        self.cursor.advance(); // READ
        let targets = self.parse_ident_list("identifier", "'READ'")?;
        Ok(Command::Read {
            targets,
            span: start.merge(self.cursor.prev_span()),
        })
    }

    fn parse_print(&mut self) -> ParseResult<Command> {
        let start = self.cursor.current_span();
        self.cursor.advance(); // PRINT
        let mut values = vec![self.parse_expr()?];
        while self.cursor.eat(TokenKind::Comma) {
            values.push(self.parse_expr()?);
        }
        Ok(Command::Print {
            values,
            span: start.merge(self.cursor.prev_span()),
        })
    }

    fn parse_if(&mut self) -> ParseResult<Command> {
        let start = self.cursor.current_span();
        self.cursor.advance(); // IF
        let lhs = self.parse_expr()?;
        let op = self.expect_rel_op()?;
        let rhs = self.parse_expr()?;

        self.expect(TokenKind::Then, "expected 'THEN' after comparison")?;
        let then_branch = self.parse_branch("'THEN'")?;
        self.expect(TokenKind::Else, "expected 'ELSE'")?;
        let else_branch = self.parse_branch("'ELSE'")?;

        Ok(Command::If {
            lhs,
            op,
            rhs,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span: start.merge(self.cursor.prev_span()),
        })
    }

    /// Both IF branches are mandatory; an empty one is an error, not a no-op.
    fn parse_branch(&mut self, after: &str) -> ParseResult<Command> {
        let starts_command = matches!(
            self.cursor.peek_kind(),
            Some(
                TokenKind::Let
                    | TokenKind::Go
                    | TokenKind::Read
                    | TokenKind::Print
                    | TokenKind::If
            )
        ) || self.at_label();
        if !starts_command {
            return Err(self.syntax_error(&format!("expected a command after {after}")));
        }
        self.parse_command()
    }

    fn expect_rel_op(&mut self) -> ParseResult<RelOp> {
        let op = match self.cursor.peek_kind() {
            Some(TokenKind::Eq) => RelOp::Eq,
            Some(TokenKind::Gt) => RelOp::Gt,
            Some(TokenKind::Lt) => RelOp::Lt,
            Some(TokenKind::Ge) => RelOp::Ge,
            Some(TokenKind::Le) => RelOp::Le,
            _ => {
                return Err(
                    self.syntax_error("expected comparison operator ('=', '>', '<', '>=', '<=')")
                )
            }
        };
        self.cursor.advance();
        Ok(op)
    }

    /// `what (',' what)*`, at least one item and no trailing comma.
    fn parse_ident_list(&mut self, what: &str, after: &str) -> ParseResult<Vec<String>> {
        let mut names = vec![self.expect_ident(&format!("expected {what} after {after}"))?];
        while self.cursor.eat(TokenKind::Comma) {
            names.push(self.expect_ident(&format!("expected {what} after ','"))?);
        }
        Ok(names)
    }

    // ── Expressions ─────────────────────────────────────────

    /// Expression ::= Factor (op Factor)*
    ///
    /// All four operators share one level and group to the left, so
    /// `2+3*4` is `(2+3)*4`.
    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.nested(|p| {
            let mut lhs = p.parse_factor()?;
            while let Some(op) = p.peek_binop() {
                p.cursor.advance();
                let rhs = p.parse_factor()?;
                let span = lhs.span().merge(rhs.span());
                lhs = Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    span,
                };
            }
            Ok(lhs)
        })
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        match self.cursor.peek_kind() {
            Some(TokenKind::Ident) => {
                let (name, span) = self.bump();
                Ok(Expr::Variable { name, span })
            }
            Some(TokenKind::Number) => {
                let (text, span) = self.bump();
                Ok(Expr::Number { text, span })
            }
            Some(TokenKind::LParen) => {
                let start = self.cursor.current_span();
                self.cursor.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "expected ')'")?;
                Ok(Expr::Group {
                    inner: Box::new(inner),
                    span: start.merge(self.cursor.prev_span()),
                })
            }
            _ => Err(self.syntax_error("expected identifier, number or '('")),
        }
    }

    fn peek_binop(&self) -> Option<BinOp> {
        match self.cursor.peek_kind()? {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            _ => None,
        }
    }

    // ── Token helpers ─────────────────────────────────────

    fn current_text(&self) -> String {
        self.cursor
            .peek()
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    /// Consume the current token, returning its text and span.
    fn bump(&mut self) -> (String, Span) {
        self.cursor
            .advance()
            .map(|t| (t.text.clone(), t.span))
            .unwrap_or_default()
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> ParseResult<()> {
        if self.cursor.eat(kind) {
            Ok(())
        } else {
            Err(self.syntax_error(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> ParseResult<String> {
        if self.cursor.check(TokenKind::Ident) {
            Ok(self.bump().0)
        } else {
            Err(self.syntax_error(message))
        }
    }

    fn found(&self) -> Found {
        match self.cursor.peek() {
            Some(token) => Found::Token(token.clone()),
            None => Found::EndOfInput,
        }
    }

    fn syntax_error(&self, message: &str) -> ParseError {
        self.error(ParseErrorKind::Syntax(message.to_string()))
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            span: self.cursor.current_span(),
            found: self.found(),
        }
    }
}

/// Check an already tokenized program.
pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Program> {
    trace!(tokens = tokens.len(), "parsing program");
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

/// Tokenize and check `source`. A lexical error stops everything before
/// the grammar walk begins; otherwise the first syntax or semantic error
/// is the only one reported.
pub fn parse(source: &str) -> Result<Program, Error> {
    let tokens = tokenize(source).map_err(|e| {
        debug!(offset = e.offset, character = %e.character, "lexical error");
        e
    })?;
    parse_tokens(tokens).map_err(|e| {
        debug!(error = %e, span = ?e.span, "parse failed");
        Error::from(e)
    })
}
