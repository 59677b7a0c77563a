//! Lexer (tokenizer) for netlists.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{KirchhoffError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in a netlist.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An identifier (component name, node name, keyword)
    Identifier,
    /// A number, possibly with a scale suffix and unit (`10k`, `4.7uF`)
    Number,
    /// A directive (starts with '.')
    Directive,
    /// Equals sign '='
    Equals,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing netlist input.
pub struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;
        let token = |kind, text: String| Token {
            kind,
            text,
            line,
            column,
        };

        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(token(TokenKind::Eof, String::new())),
        };

        let token = match ch {
            '\n' => {
                self.advance();
                token(TokenKind::Newline, "\n".to_string())
            }
            '.' if !self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                let text = self.read_identifier();
                token(TokenKind::Directive, format!(".{}", text))
            }
            '=' => {
                self.advance();
                token(TokenKind::Equals, "=".to_string())
            }
            '-' | '+' | '.' | '0'..='9' => token(TokenKind::Number, self.read_number()),
            _ if ch.is_alphabetic() || ch == '_' => {
                token(TokenKind::Identifier, self.read_identifier())
            }
            _ => {
                return Err(KirchhoffError::lexer(
                    line,
                    column,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        Ok(token)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, ch)| ch)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '*' | '#' | ';' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();

        if let Some(sign @ ('-' | '+')) = self.peek() {
            text.push(sign);
            self.advance();
        }

        self.read_digits(&mut text);

        if self.peek() == Some('.') {
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }

        // Exponent only when digits follow, so "2end" stays a name-like number
        if let Some(e @ ('e' | 'E')) = self.peek() {
            let mut ahead = self.chars.clone();
            ahead.next();
            let next = ahead.next().map(|(_, c)| c);
            let after_sign = ahead.next().map(|(_, c)| c);
            let has_exponent = match next {
                Some(c) if c.is_ascii_digit() => true,
                Some('-' | '+') => after_sign.is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                text.push(e);
                self.advance();
                if let Some(sign @ ('-' | '+')) = self.peek() {
                    text.push(sign);
                    self.advance();
                }
                self.read_digits(&mut text);
            }
        }

        // Scale suffix and unit letters (k, meg, uF, ...)
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == 'µ' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        text
    }
}

/// Length in bytes of the numeric part of `text`.
fn numeric_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

/// Parse a number with an optional SI scale suffix and unit.
///
/// Suffixes: `f p n u m k meg g t`, with `M` also accepted for mega and
/// `meg` matched case-insensitively. Letters after the suffix are a unit and
/// ignored, so `4.7uF` and `5V` parse.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let split = numeric_prefix_len(text);
    let (number, suffix) = text.split_at(split);
    let number: f64 = number.parse().ok()?;

    if !suffix.chars().all(|c| c.is_alphabetic()) {
        return None;
    }

    let multiplier = if suffix.len() >= 3 && suffix[..3].eq_ignore_ascii_case("meg") {
        1e6
    } else {
        match suffix.chars().next() {
            None => 1.0,
            Some('f' | 'F') => 1e-15,
            Some('p' | 'P') => 1e-12,
            Some('n' | 'N') => 1e-9,
            Some('u' | 'U' | 'µ') => 1e-6,
            Some('m') => 1e-3,
            Some('M') => 1e6,
            Some('k' | 'K') => 1e3,
            Some('g' | 'G') => 1e9,
            Some('t' | 'T') => 1e12,
            Some(_) => 1.0,
        }
    };

    Some(number * multiplier)
}
