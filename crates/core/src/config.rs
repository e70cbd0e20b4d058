//! Recovery configuration.
//!
//! Controls which token kinds the edit log accepts for synthesis. All fields
//! default, so an empty TOML table is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::token::TokenKind;

/// Language level of the source being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLevel {
    Java8,
    Java11,
    Java17,
    #[default]
    Java21,
}

impl SourceLevel {
    /// Soft-keyword placeholder kinds never eligible for synthetic
    /// insertion or replacement at this level.
    ///
    /// Downstream phases treat these as ordinary identifiers, so a
    /// fabricated one would silently change meaning.
    pub fn excluded_soft_keywords(self) -> &'static [TokenKind] {
        match self {
            SourceLevel::Java8 | SourceLevel::Java11 => {
                &[TokenKind::RestrictedRecord, TokenKind::RestrictedYield]
            }
            SourceLevel::Java17 | SourceLevel::Java21 => &[TokenKind::RestrictedRecord],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub source_level: SourceLevel,
    /// Kinds excluded from synthesis on top of the level's soft keywords.
    pub extra_excluded: Vec<TokenKind>,
    /// An Insert whose `completes` hint is one of these kinds is not recorded.
    pub statement_recovery_filter: Vec<TokenKind>,
    /// When false, every `record_*` call is a no-op.
    pub recording: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            source_level: SourceLevel::default(),
            extra_excluded: Vec::new(),
            statement_recovery_filter: Vec::new(),
            recording: true,
        }
    }
}

impl RecoveryConfig {
    pub fn with_source_level(source_level: SourceLevel) -> Self {
        RecoveryConfig {
            source_level,
            ..RecoveryConfig::default()
        }
    }

    /// True if `kind` may appear in a synthetic Insert or Replace.
    pub fn is_synthesizable(&self, kind: TokenKind) -> bool {
        !self.source_level.excluded_soft_keywords().contains(&kind)
            && !self.extra_excluded.contains(&kind)
    }

    /// True if an Insert completing `completes` must be dropped.
    pub fn filters_completion(&self, completes: TokenKind) -> bool {
        self.statement_recovery_filter.contains(&completes)
    }
}
