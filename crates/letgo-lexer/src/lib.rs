use std::fmt;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use letgo_common::{FileId, Span};
use logos::Logos;
use thiserror::Error;

/// Raw lexemes recognized by logos. Words are classified into keywords or
/// identifiers afterwards, so the reserved-word table stays the only place
/// that decides what a keyword is.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"\s+")]
enum RawToken {
    /// A Unicode letter, then letters, decimal digits, or `_`.
    #[regex(r"\p{L}[\p{L}\p{Nd}_]*")]
    Word,
    #[regex("[0-9]+")]
    Number,

    #[token(":=")]
    Assign,
    #[token(">=")]
    Ge,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token("<")]
    Lt,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

/// The five token classes of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Keyword,
    Identifier,
    Number,
    Operator,
    Punctuation,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Keyword => "Keyword",
            Category::Identifier => "Identifier",
            Category::Number => "Number",
            Category::Operator => "Operator",
            Category::Punctuation => "Punctuation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    End,
    Let,
    Go,
    To,
    Of,
    Read,
    Print,
    If,
    Then,
    Else,

    Ident,
    Number,

    // Operators
    Assign,
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Plus,
    Minus,
    Star,
    Slash,

    // Punctuation
    Colon,
    Semicolon,
    Comma,
    LParen,
    RParen,
}

/// Reserved words in their canonical (uppercase) spelling.
const KEYWORDS: [(&str, TokenKind); 10] = [
    ("END", TokenKind::End),
    ("LET", TokenKind::Let),
    ("GO", TokenKind::Go),
    ("TO", TokenKind::To),
    ("OF", TokenKind::Of),
    ("READ", TokenKind::Read),
    ("PRINT", TokenKind::Print),
    ("IF", TokenKind::If),
    ("THEN", TokenKind::Then),
    ("ELSE", TokenKind::Else),
];

/// Look a word up in the reserved-word table, ignoring ASCII case.
/// Returns the keyword kind together with its canonical spelling.
pub fn keyword(word: &str) -> Option<(TokenKind, &'static str)> {
    KEYWORDS
        .iter()
        .find(|(text, _)| text.eq_ignore_ascii_case(word))
        .map(|&(text, kind)| (kind, text))
}

impl TokenKind {
    pub fn category(self) -> Category {
        match self {
            TokenKind::End
            | TokenKind::Let
            | TokenKind::Go
            | TokenKind::To
            | TokenKind::Of
            | TokenKind::Read
            | TokenKind::Print
            | TokenKind::If
            | TokenKind::Then
            | TokenKind::Else => Category::Keyword,
            TokenKind::Ident => Category::Identifier,
            TokenKind::Number => Category::Number,
            TokenKind::Assign
            | TokenKind::Eq
            | TokenKind::Gt
            | TokenKind::Ge
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash => Category::Operator,
            TokenKind::Colon
            | TokenKind::Semicolon
            | TokenKind::Comma
            | TokenKind::LParen
            | TokenKind::RParen => Category::Punctuation,
        }
    }

    pub fn is_keyword(self) -> bool {
        self.category() == Category::Keyword
    }

    fn from_raw(raw: RawToken) -> Self {
        match raw {
            RawToken::Word => TokenKind::Ident,
            RawToken::Number => TokenKind::Number,
            RawToken::Assign => TokenKind::Assign,
            RawToken::Ge => TokenKind::Ge,
            RawToken::Gt => TokenKind::Gt,
            RawToken::Le => TokenKind::Le,
            RawToken::Lt => TokenKind::Lt,
            RawToken::Eq => TokenKind::Eq,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Comma => TokenKind::Comma,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::End => "'END'",
            TokenKind::Let => "'LET'",
            TokenKind::Go => "'GO'",
            TokenKind::To => "'TO'",
            TokenKind::Of => "'OF'",
            TokenKind::Read => "'READ'",
            TokenKind::Print => "'PRINT'",
            TokenKind::If => "'IF'",
            TokenKind::Then => "'THEN'",
            TokenKind::Else => "'ELSE'",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::Assign => "':='",
            TokenKind::Eq => "'='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
        };
        f.write_str(text)
    }
}

/// A classified lexeme. Keywords carry their uppercase spelling; every other
/// token keeps the text exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn category(&self) -> Category {
        self.kind.category()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.category(), self.text)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid character '{character}' at offset {offset}")]
pub struct LexError {
    /// Position of the character counted in characters, not bytes.
    /// `span` holds the byte range for rendering.
    pub offset: usize,
    pub character: char,
    pub span: Span,
}

impl LexError {
    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(vec![
                Label::primary(file_id, self.span.to_range()).with_message("unrecognized character")
            ])
    }
}

/// Split `source` into tokens in a single left-to-right pass. The first
/// character that cannot start a token aborts the whole run.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = Span::from(lexer.span());
        let raw = match result {
            Ok(raw) => raw,
            Err(()) => {
                let character = source[span.start..]
                    .chars()
                    .next()
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                return Err(LexError {
                    offset: source[..span.start].chars().count(),
                    character,
                    span: Span::new(span.start, span.start + character.len_utf8()),
                });
            }
        };

        let slice = lexer.slice();
        let token = match (raw, keyword(slice)) {
            (RawToken::Word, Some((kind, canonical))) => Token {
                kind,
                text: canonical.to_string(),
                span,
            },
            _ => Token {
                kind: TokenKind::from_raw(raw),
                text: slice.to_string(),
                span,
            },
        };
        tokens.push(token);
    }

    Ok(tokens)
}
