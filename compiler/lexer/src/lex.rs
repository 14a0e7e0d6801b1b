use std::fmt::{Display, Formatter};
use std::str::Chars;

use thiserror::Error;

use crate::TokenStream;

/// Value stored for integer literals that do not fit in an `i32`
pub const LITERAL_OVERFLOW: i32 = i32::MAX;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character")]
    UnexpectedChar,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenType,
    pub literal: String,
    pub value: TokenValue,
    pub line: usize,
    pub col: usize,
}

impl Token {
    fn new(kind: TokenType, literal: &str, value: TokenValue, line: usize, col: usize) -> Self {
        Self {
            kind,
            literal: literal.to_string(),
            value,
            line,
            col,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenType::Eof => write!(f, "end of file"),
            TokenType::Identifier | TokenType::Constant | TokenType::Unknown => {
                write!(f, "{:?} '{}'", self.kind, self.literal)
            }
            _ => write!(f, "'{}'", self.literal),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenValue {
    None,
    Integer(i32),
    Error(LexError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single-character tokens
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Semicolon,
    Colon,
    Comma,
    Equal,
    Plus,
    Minus,
    Star,
    Slash,

    // Literals
    Identifier,
    Constant,

    // Keywords
    Int,
    Return,

    // Informational
    Whitespace,
    Eof,
    Unknown,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenType::OpenParen => "'('",
            TokenType::CloseParen => "')'",
            TokenType::OpenBrace => "'{'",
            TokenType::CloseBrace => "'}'",
            TokenType::OpenBracket => "'['",
            TokenType::CloseBracket => "']'",
            TokenType::Semicolon => "';'",
            TokenType::Colon => "':'",
            TokenType::Comma => "','",
            TokenType::Equal => "'='",
            TokenType::Plus => "'+'",
            TokenType::Minus => "'-'",
            TokenType::Star => "'*'",
            TokenType::Slash => "'/'",
            TokenType::Identifier => "an identifier",
            TokenType::Constant => "an integer constant",
            TokenType::Int => "'int'",
            TokenType::Return => "'return'",
            TokenType::Whitespace => "whitespace",
            TokenType::Eof => "end of file",
            TokenType::Unknown => "an unknown character",
        };

        write!(f, "{}", text)
    }
}

const EOF: char = '\0';

pub struct Lexer<'a> {
    /// Source Text
    source: &'a str,

    /// Remaining source characters
    chars: Chars<'a>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            line: 1,
            col: 1,
        }
    }

    /// Scans the whole source. The returned stream always ends with exactly one Eof token.
    pub fn tokenize(mut self) -> TokenStream {
        let mut tokens = vec![];

        loop {
            let token = self.scan_token();
            match token.kind {
                TokenType::Whitespace => continue,
                TokenType::Eof => {
                    tokens.push(token);
                    break;
                }
                _ => tokens.push(token),
            }
        }

        TokenStream::new(tokens)
    }

    fn scan_token(&mut self) -> Token {
        let start = self.offset();
        let line = self.line;
        let col = self.col;

        let c = match self.advance() {
            Some(c) => c,
            None => return Token::new(TokenType::Eof, "", TokenValue::None, line, col),
        };

        let token_type = match c {
            '(' => TokenType::OpenParen,
            ')' => TokenType::CloseParen,
            '{' => TokenType::OpenBrace,
            '}' => TokenType::CloseBrace,
            '[' => TokenType::OpenBracket,
            ']' => TokenType::CloseBracket,
            ';' => TokenType::Semicolon,
            ':' => TokenType::Colon,
            ',' => TokenType::Comma,
            '=' => TokenType::Equal,
            '+' => TokenType::Plus,
            '-' => TokenType::Minus,
            '*' => TokenType::Star,
            '/' => TokenType::Slash,
            '0'..='9' => self.number(),
            'a'..='z' | 'A'..='Z' | '_' => self.identifier(start),
            ' ' | '\r' | '\t' => TokenType::Whitespace,
            '\n' => {
                self.line += 1;
                self.col = 1;
                TokenType::Whitespace
            }
            _ => TokenType::Unknown,
        };

        let end = self.offset();
        let literal = &self.source[start..end];

        let token_value = match token_type {
            TokenType::Constant => {
                TokenValue::Integer(literal.parse::<i32>().unwrap_or(LITERAL_OVERFLOW))
            }
            TokenType::Unknown => TokenValue::Error(LexError::UnexpectedChar),
            _ => TokenValue::None,
        };

        Token::new(token_type, literal, token_value, line, col)
    }

    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        TokenType::Constant
    }

    fn identifier(&mut self, start: usize) -> TokenType {
        while self.peek().is_ascii_alphabetic() || self.peek() == '_' {
            self.advance();
        }

        match &self.source[start..self.offset()] {
            "int" => TokenType::Int,
            "return" => TokenType::Return,
            _ => TokenType::Identifier,
        }
    }

    /// Get offset into source text
    fn offset(&self) -> usize {
        self.source.len() - self.chars.as_str().len()
    }

    fn peek(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.col += 1;

        Some(c)
    }
}
