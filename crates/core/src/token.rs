use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Payload carried by a synthetic identifier token.
///
/// Later phases compare names against this marker to recognize names that
/// were fabricated by recovery rather than written by the user.
pub const MISSING_IDENTIFIER: &str = "$missing$";

/// Identifier used for placeholder children filled in when a mandatory
/// child was never parsed.
pub const PLACEHOLDER_IDENTIFIER: &str = "MISSING";

/// Terminal kinds of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Identifier,
    /// Contextual `record`, only ever produced by the parser's recovery tables.
    RestrictedRecord,
    /// Contextual `yield`, only ever produced by the parser's recovery tables.
    RestrictedYield,

    // Literals
    IntegerLiteral,
    LongLiteral,
    FloatingPointLiteral,
    DoubleLiteral,
    CharacterLiteral,
    StringLiteral,

    // Keywords
    Abstract,
    Boolean,
    Break,
    Byte,
    Case,
    Char,
    Class,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extends,
    False,
    Final,
    Float,
    For,
    If,
    Implements,
    Import,
    Instanceof,
    Int,
    Interface,
    Long,
    New,
    Null,
    Package,
    Private,
    Protected,
    Public,
    Return,
    Short,
    Static,
    Super,
    Switch,
    This,
    Throw,
    True,
    Void,
    While,

    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Semicolon,
    Comma,
    Dot,
    Colon,
    Question,
    At,
    Arrow,

    // Operators
    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Not,
    Tilde,
    AndAnd,
    OrOr,
    And,
    Or,
    Xor,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    /// Placeholder in termination tables for "no token at all".
    Invalid,
    Eof,
}

impl TokenKind {
    /// Map a scanned word to its keyword kind, if it is one.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "abstract" => TokenKind::Abstract,
            "boolean" => TokenKind::Boolean,
            "break" => TokenKind::Break,
            "byte" => TokenKind::Byte,
            "case" => TokenKind::Case,
            "char" => TokenKind::Char,
            "class" => TokenKind::Class,
            "continue" => TokenKind::Continue,
            "default" => TokenKind::Default,
            "do" => TokenKind::Do,
            "double" => TokenKind::Double,
            "else" => TokenKind::Else,
            "enum" => TokenKind::Enum,
            "extends" => TokenKind::Extends,
            "false" => TokenKind::False,
            "final" => TokenKind::Final,
            "float" => TokenKind::Float,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "implements" => TokenKind::Implements,
            "import" => TokenKind::Import,
            "instanceof" => TokenKind::Instanceof,
            "int" => TokenKind::Int,
            "interface" => TokenKind::Interface,
            "long" => TokenKind::Long,
            "new" => TokenKind::New,
            "null" => TokenKind::Null,
            "package" => TokenKind::Package,
            "private" => TokenKind::Private,
            "protected" => TokenKind::Protected,
            "public" => TokenKind::Public,
            "return" => TokenKind::Return,
            "short" => TokenKind::Short,
            "static" => TokenKind::Static,
            "super" => TokenKind::Super,
            "switch" => TokenKind::Switch,
            "this" => TokenKind::This,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }
}

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOrigin {
    /// Scanned from the source text.
    Source,
    /// Emitted from a recorded Insert edit.
    Inserted,
    /// Emitted from a recorded Replace edit.
    Replaced,
}

/// A token of the corrected stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
    pub origin: TokenOrigin,
}

impl Token {
    /// Build a synthetic token. Identifiers carry [`MISSING_IDENTIFIER`],
    /// everything else an empty payload.
    pub fn synthetic(kind: TokenKind, span: Span, origin: TokenOrigin) -> Self {
        let text = match kind {
            TokenKind::Identifier => MISSING_IDENTIFIER.to_owned(),
            _ => String::new(),
        };
        Token {
            kind,
            span,
            text,
            origin,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin != TokenOrigin::Source
    }

    /// True for a synthetic identifier standing in for a missing name.
    pub fn is_missing_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier && self.is_synthetic() && self.text == MISSING_IDENTIFIER
    }
}
