//! Diagnostic records as the propagator sees them.
//!
//! Only the category, the source range and the `used` bit matter here. The
//! full problem model (messages, arguments, severity) lives elsewhere.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    // Syntax recovery
    ParsingErrorOnKeywordNoSuggestion,
    ParsingErrorOnKeyword,
    ParsingError,
    ParsingErrorNoSuggestion,
    ParsingErrorInsertTokenBefore,
    ParsingErrorInsertTokenAfter,
    ParsingErrorDeleteToken,
    ParsingErrorDeleteTokens,
    ParsingErrorMergeTokens,
    ParsingErrorInvalidToken,
    ParsingErrorMisplacedConstruct,
    ParsingErrorReplaceTokens,
    ParsingErrorNoSuggestionForTokens,
    ParsingErrorUnexpectedEof,
    ParsingErrorInsertToComplete,
    ParsingErrorInsertToCompleteScope,
    ParsingErrorInsertToCompletePhrase,
    EndOfSource,

    // Malformed lexical input
    InvalidHexa,
    InvalidOctal,
    InvalidCharacterConstant,
    InvalidEscape,
    InvalidInput,
    InvalidUnicodeEscape,
    InvalidFloat,
    NullSourceString,
    UnterminatedString,
    UnterminatedComment,
    InvalidDigit,

    // Everything below is unrelated to recovery
    TypeMismatch,
    UndefinedName,
    UndefinedMethod,
    UnusedImport,
    UnreachableCode,
    Other,
}

impl ProblemCategory {
    /// Categories that can be explained by syntax recovery.
    pub fn is_syntax_recovery(self) -> bool {
        use ProblemCategory::*;
        matches!(
            self,
            ParsingErrorOnKeywordNoSuggestion
                | ParsingErrorOnKeyword
                | ParsingError
                | ParsingErrorNoSuggestion
                | ParsingErrorInsertTokenBefore
                | ParsingErrorInsertTokenAfter
                | ParsingErrorDeleteToken
                | ParsingErrorDeleteTokens
                | ParsingErrorMergeTokens
                | ParsingErrorInvalidToken
                | ParsingErrorMisplacedConstruct
                | ParsingErrorReplaceTokens
                | ParsingErrorNoSuggestionForTokens
                | ParsingErrorUnexpectedEof
                | ParsingErrorInsertToComplete
                | ParsingErrorInsertToCompleteScope
                | ParsingErrorInsertToCompletePhrase
                | EndOfSource
                | InvalidHexa
                | InvalidOctal
                | InvalidCharacterConstant
                | InvalidEscape
                | InvalidInput
                | InvalidUnicodeEscape
                | InvalidFloat
                | NullSourceString
                | UnterminatedString
                | UnterminatedComment
                | InvalidDigit
        )
    }
}

/// A categorized problem with an inclusive source range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: ProblemCategory,
    pub start: u32,
    pub end: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Set once the record has been correlated to a tree region.
    #[serde(default)]
    pub used: bool,
}

impl Diagnostic {
    pub fn new(category: ProblemCategory, start: u32, end: u32) -> Self {
        Diagnostic {
            category,
            start,
            end,
            message: String::new(),
            used: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// True if either endpoint falls inside the inclusive range `start..=end`.
    pub fn touches(&self, start: i64, end: i64) -> bool {
        let (s, e) = (i64::from(self.start), i64::from(self.end));
        (start <= s && s <= end) || (start <= e && e <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_allow_list() {
        assert!(ProblemCategory::ParsingErrorInsertTokenAfter.is_syntax_recovery());
        assert!(ProblemCategory::UnterminatedComment.is_syntax_recovery());
        assert!(!ProblemCategory::TypeMismatch.is_syntax_recovery());
        assert!(!ProblemCategory::Other.is_syntax_recovery());
    }

    #[test]
    fn touches_either_endpoint() {
        let diag = Diagnostic::new(ProblemCategory::ParsingError, 5, 12);
        assert!(diag.touches(0, 5));
        assert!(diag.touches(10, 20));
        assert!(!diag.touches(6, 11));
        assert!(!diag.touches(13, 20));
    }

    #[test]
    fn used_defaults_to_false_when_absent() {
        let diag: Diagnostic =
            serde_json::from_str(r#"{"category": "type_mismatch", "start": 1, "end": 2}"#).unwrap();
        assert!(!diag.used);
        assert_eq!(diag.category, ProblemCategory::TypeMismatch);
    }
}
