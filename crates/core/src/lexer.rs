//! Base lexical scanner.
//!
//! Produces the *uncorrected* token stream. The replay engine drives it
//! through the [`TokenSource`] trait: one token per call, with the scan
//! position exposed so recorded edits can be matched against it and the
//! position fast-forwarded past removed or replaced spans.

use crate::error::ScanError;
use crate::span::Span;
use crate::token::{Token, TokenKind, TokenOrigin};

/// A pull-based scanner over source text.
pub trait TokenSource {
    /// Scan the next real token. At end of input this keeps returning
    /// [`TokenKind::Eof`].
    fn next_raw_token(&mut self) -> Result<TokenKind, ScanError>;

    /// Offset just past the most recently scanned token.
    fn current_position(&self) -> u32;

    /// Offset of the first byte of the most recently scanned token.
    fn start_position(&self) -> u32;

    /// Move the scan position. The next call to
    /// [`next_raw_token`](TokenSource::next_raw_token) resumes from here.
    fn set_current_position(&mut self, position: u32);

    /// Source text of the most recently scanned token.
    fn current_token_source(&self) -> &str;
}

pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    start: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Scanner {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            start: 0,
        }
    }

    pub fn source(&self) -> &'a str {
        self.src
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn char_at(&self, pos: usize) -> char {
        self.src
            .get(pos..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or('\u{FFFD}')
    }

    fn skip_trivia(&mut self) -> Result<(), ScanError> {
        loop {
            match (self.peek_at(0), self.peek_at(1)) {
                (Some(c), _) if c.is_ascii_whitespace() => self.pos += 1,
                // Line comment
                (Some(b'/'), Some(b'/')) => {
                    while let Some(c) = self.peek_at(0) {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                // Block comment
                (Some(b'/'), Some(b'*')) => {
                    let opened = self.pos as u32;
                    self.pos += 2;
                    loop {
                        match (self.peek_at(0), self.peek_at(1)) {
                            (None, _) => return Err(ScanError::UnterminatedComment { offset: opened }),
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            _ => self.pos += 1,
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_escape(&mut self) -> Result<(), ScanError> {
        // positioned on the backslash
        let offset = self.pos as u32;
        self.pos += 1;
        match self.peek_at(0) {
            Some(b'n' | b't' | b'r' | b'b' | b'f' | b's' | b'0' | b'"' | b'\'' | b'\\') => {
                self.pos += 1;
                Ok(())
            }
            Some(b'u') => {
                while self.peek_at(0) == Some(b'u') {
                    self.pos += 1;
                }
                for _ in 0..4 {
                    match self.peek_at(0) {
                        Some(c) if c.is_ascii_hexdigit() => self.pos += 1,
                        _ => return Err(ScanError::InvalidEscape { offset, escape: 'u' }),
                    }
                }
                Ok(())
            }
            Some(_) => Err(ScanError::InvalidEscape {
                offset,
                escape: self.char_at(self.pos),
            }),
            None => Err(ScanError::UnterminatedString { offset }),
        }
    }

    fn scan_quoted(&mut self, quote: u8) -> Result<TokenKind, ScanError> {
        let opened = self.pos as u32;
        let unterminated = || {
            if quote == b'"' {
                ScanError::UnterminatedString { offset: opened }
            } else {
                ScanError::UnterminatedCharacter { offset: opened }
            }
        };
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                None | Some(b'\n') => return Err(unterminated()),
                Some(b'\\') => self.scan_escape().map_err(|e| match e {
                    ScanError::UnterminatedString { .. } => unterminated(),
                    other => other,
                })?,
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        Ok(if quote == b'"' {
            TokenKind::StringLiteral
        } else {
            TokenKind::CharacterLiteral
        })
    }

    fn eat_digits(&mut self, radix_hex: bool) -> usize {
        let from = self.pos;
        while let Some(c) = self.peek_at(0) {
            let ok = if radix_hex {
                c.is_ascii_hexdigit() || c == b'_'
            } else {
                c.is_ascii_digit() || c == b'_'
            };
            if !ok {
                break;
            }
            self.pos += 1;
        }
        self.pos - from
    }

    fn scan_number(&mut self) -> Result<TokenKind, ScanError> {
        let start = self.pos;
        let malformed = |scanner: &Self| ScanError::MalformedNumber {
            offset: start as u32,
            text: scanner.src[start..scanner.pos].to_owned(),
        };

        if self.peek_at(0) == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            if self.eat_digits(true) == 0 {
                return Err(malformed(self));
            }
            let kind = if matches!(self.peek_at(0), Some(b'l' | b'L')) {
                self.pos += 1;
                TokenKind::LongLiteral
            } else {
                TokenKind::IntegerLiteral
            };
            if matches!(self.peek_at(0), Some(c) if c.is_ascii_alphanumeric()) {
                self.pos += 1;
                return Err(malformed(self));
            }
            return Ok(kind);
        }

        self.eat_digits(false);
        let mut fractional = false;
        if self.peek_at(0) == Some(b'.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
            self.eat_digits(false);
            fractional = true;
        }
        if matches!(self.peek_at(0), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek_at(0), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.eat_digits(false) == 0 {
                return Err(malformed(self));
            }
            fractional = true;
        }
        let kind = match self.peek_at(0) {
            Some(b'l' | b'L') if !fractional => {
                self.pos += 1;
                TokenKind::LongLiteral
            }
            Some(b'f' | b'F') => {
                self.pos += 1;
                TokenKind::FloatingPointLiteral
            }
            Some(b'd' | b'D') => {
                self.pos += 1;
                TokenKind::DoubleLiteral
            }
            _ if fractional => TokenKind::DoubleLiteral,
            _ => TokenKind::IntegerLiteral,
        };
        if matches!(self.peek_at(0), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
            return Err(malformed(self));
        }
        Ok(kind)
    }

    fn scan_word(&mut self) -> TokenKind {
        while let Some(c) = self.peek_at(0) {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80 {
                self.pos += 1;
            } else {
                break;
            }
        }
        TokenKind::keyword(&self.src[self.start..self.pos]).unwrap_or(TokenKind::Identifier)
    }

    fn scan_operator(&mut self, c: u8) -> Result<TokenKind, ScanError> {
        let next = self.peek_at(1);
        let (kind, width) = match (c, next) {
            (b'{', _) => (TokenKind::LBrace, 1),
            (b'}', _) => (TokenKind::RBrace, 1),
            (b'[', _) => (TokenKind::LBracket, 1),
            (b']', _) => (TokenKind::RBracket, 1),
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b';', _) => (TokenKind::Semicolon, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b'.', _) => (TokenKind::Dot, 1),
            (b':', _) => (TokenKind::Colon, 1),
            (b'?', _) => (TokenKind::Question, 1),
            (b'@', _) => (TokenKind::At, 1),
            (b'~', _) => (TokenKind::Tilde, 1),
            (b'^', _) => (TokenKind::Xor, 1),
            (b'%', _) => (TokenKind::Percent, 1),
            (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
            (b'=', _) => (TokenKind::Eq, 1),
            (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
            (b'!', _) => (TokenKind::Not, 1),
            (b'<', Some(b'=')) => (TokenKind::LtEq, 2),
            (b'<', _) => (TokenKind::Lt, 1),
            (b'>', Some(b'=')) => (TokenKind::GtEq, 2),
            (b'>', _) => (TokenKind::Gt, 1),
            (b'+', Some(b'+')) => (TokenKind::PlusPlus, 2),
            (b'+', Some(b'=')) => (TokenKind::PlusEq, 2),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', Some(b'-')) => (TokenKind::MinusMinus, 2),
            (b'-', Some(b'=')) => (TokenKind::MinusEq, 2),
            (b'-', Some(b'>')) => (TokenKind::Arrow, 2),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'*', Some(b'=')) => (TokenKind::StarEq, 2),
            (b'*', _) => (TokenKind::Star, 1),
            (b'/', Some(b'=')) => (TokenKind::SlashEq, 2),
            (b'/', _) => (TokenKind::Slash, 1),
            (b'&', Some(b'&')) => (TokenKind::AndAnd, 2),
            (b'&', _) => (TokenKind::And, 1),
            (b'|', Some(b'|')) => (TokenKind::OrOr, 2),
            (b'|', _) => (TokenKind::Or, 1),
            _ => {
                return Err(ScanError::UnexpectedCharacter {
                    offset: self.pos as u32,
                    found: self.char_at(self.pos),
                })
            }
        };
        self.pos += width;
        Ok(kind)
    }
}

impl<'a> TokenSource for Scanner<'a> {
    fn next_raw_token(&mut self) -> Result<TokenKind, ScanError> {
        self.skip_trivia()?;
        self.start = self.pos;
        let Some(c) = self.peek_at(0) else {
            return Ok(TokenKind::Eof);
        };
        match c {
            b'"' | b'\'' => self.scan_quoted(c),
            b'0'..=b'9' => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c >= 0x80 => {
                Ok(self.scan_word())
            }
            c => self.scan_operator(c),
        }
    }

    fn current_position(&self) -> u32 {
        self.pos as u32
    }

    fn start_position(&self) -> u32 {
        self.start as u32
    }

    fn set_current_position(&mut self, position: u32) {
        self.pos = (position as usize).min(self.bytes.len());
    }

    fn current_token_source(&self) -> &str {
        self.src.get(self.start..self.pos).unwrap_or("")
    }
}

/// Scan the whole source without any recovery, ending with an `Eof` token.
pub fn lex(src: &str) -> Result<Vec<Token>, ScanError> {
    let mut scanner = Scanner::new(src);
    let mut tokens = Vec::new();
    loop {
        let kind = scanner.next_raw_token()?;
        tokens.push(Token {
            kind,
            span: Span::new(scanner.start_position(), scanner.current_position()),
            text: scanner.current_token_source().to_owned(),
            origin: TokenOrigin::Source,
        });
        if kind == TokenKind::Eof {
            return Ok(tokens);
        }
    }
}
