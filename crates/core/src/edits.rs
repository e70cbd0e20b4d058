//! The edit log.
//!
//! The parser records its error-recovery decisions here as positional
//! edits against the original token stream. Nothing in this module decides
//! *what* to edit; it only stores, filters and hands edits back in a shape
//! the replay engine and the propagator can use.
//!
//! Positions are inclusive byte offsets. An Insert anchor is the offset of
//! the last byte of the token after which the insertion happens.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::RecoveryConfig;
use crate::token::TokenKind;

/// Tokens to emit once, as soon as the stream reaches `anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertEdit {
    /// Stored last-to-first; replay pops from the back.
    tokens: Vec<TokenKind>,
    pub anchor: u32,
    pub completes: Option<TokenKind>,
    pub consumed: bool,
}

/// Tokens substituted for whatever the scanner yields in `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceEdit {
    /// Stored last-to-first; replay pops from the back.
    tokens: Vec<TokenKind>,
    pub start: u32,
    pub end: u32,
    pub consumed: bool,
}

/// A span skipped entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveEdit {
    pub start: u32,
    pub end: u32,
    pub consumed: bool,
}

impl InsertEdit {
    /// Tokens in the order they are emitted.
    pub fn tokens(&self) -> impl Iterator<Item = TokenKind> + '_ {
        self.tokens.iter().rev().copied()
    }

    /// Tokens in storage order.
    pub fn stored_tokens(&self) -> &[TokenKind] {
        &self.tokens
    }
}

impl ReplaceEdit {
    /// Tokens in the order they are emitted.
    pub fn tokens(&self) -> impl Iterator<Item = TokenKind> + '_ {
        self.tokens.iter().rev().copied()
    }

    pub fn stored_tokens(&self) -> &[TokenKind] {
        &self.tokens
    }
}

/// One recovery decision as a caller describes it, tokens in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum EditRequest {
    Insert {
        tokens: Vec<TokenKind>,
        anchor: u32,
        #[serde(default)]
        completes: Option<TokenKind>,
    },
    /// Append one token to the Insert recorded at `index`; it is emitted
    /// after that Insert's own tokens.
    InsertAhead { token: TokenKind, index: usize },
    Replace {
        tokens: Vec<TokenKind>,
        start: u32,
        end: u32,
    },
    Remove {
        start: u32,
        end: u32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EditLog {
    config: RecoveryConfig,
    inserted: Vec<InsertEdit>,
    replaced: Vec<ReplaceEdit>,
    removed: Vec<RemoveEdit>,
}

impl EditLog {
    pub fn new(config: RecoveryConfig) -> Self {
        EditLog {
            config,
            ..EditLog::default()
        }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    pub fn is_recording(&self) -> bool {
        self.config.recording
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.config.recording = recording;
    }

    /// Drop kinds that may not be synthesized, then store the rest
    /// last-to-first.
    fn prepare(&self, tokens: &[TokenKind]) -> Vec<TokenKind> {
        let mut kept: Vec<TokenKind> = tokens
            .iter()
            .copied()
            .filter(|kind| {
                let ok = self.config.is_synthesizable(*kind);
                if !ok {
                    trace!(?kind, "dropping non-synthesizable token");
                }
                ok
            })
            .collect();
        kept.reverse();
        kept
    }

    /// Record an insertion of `tokens` (source order) after `anchor`.
    ///
    /// Returns the slot index, or `None` when nothing was recorded: recording
    /// is off, every token was filtered out, or `completes` is a filtered
    /// completion.
    pub fn record_insert(
        &mut self,
        tokens: &[TokenKind],
        completes: Option<TokenKind>,
        anchor: u32,
    ) -> Option<usize> {
        if !self.config.recording {
            return None;
        }
        let tokens = self.prepare(tokens);
        if tokens.is_empty() {
            debug!(anchor, "insert dropped: no synthesizable tokens");
            return None;
        }
        if let Some(kind) = completes {
            if self.config.filters_completion(kind) {
                debug!(anchor, ?kind, "insert dropped: completion is filtered");
                return None;
            }
        }
        self.inserted.push(InsertEdit {
            tokens,
            anchor,
            completes,
            consumed: false,
        });
        debug!(anchor, index = self.inserted.len() - 1, "insert recorded");
        Some(self.inserted.len() - 1)
    }

    /// Add `token` to the Insert at `index`. It goes to the bottom of the
    /// stored stack, so it is emitted after the tokens already scheduled
    /// there.
    ///
    /// This is a structural edit and bypasses the soft-keyword filter.
    /// Returns false if there is no Insert at `index` or recording is off.
    pub fn insert_token_ahead(&mut self, token: TokenKind, index: usize) -> bool {
        if !self.config.recording {
            return false;
        }
        match self.inserted.get_mut(index) {
            Some(insert) => {
                insert.tokens.insert(0, token);
                debug!(index, ?token, "token inserted ahead");
                true
            }
            None => false,
        }
    }

    /// Record a replacement of `start..=end` by `tokens` (source order).
    pub fn record_replace(&mut self, tokens: &[TokenKind], start: u32, end: u32) -> Option<usize> {
        if !self.config.recording {
            return None;
        }
        let tokens = self.prepare(tokens);
        if tokens.is_empty() {
            debug!(start, end, "replace dropped: no synthesizable tokens");
            return None;
        }
        self.replaced.push(ReplaceEdit {
            tokens,
            start,
            end,
            consumed: false,
        });
        debug!(start, end, index = self.replaced.len() - 1, "replace recorded");
        Some(self.replaced.len() - 1)
    }

    /// Record removal of `start..=end`.
    pub fn record_remove(&mut self, start: u32, end: u32) -> Option<usize> {
        if !self.config.recording {
            return None;
        }
        self.removed.push(RemoveEdit {
            start,
            end,
            consumed: false,
        });
        debug!(start, end, index = self.removed.len() - 1, "remove recorded");
        Some(self.removed.len() - 1)
    }

    /// Record a caller-described edit.
    pub fn apply(&mut self, request: &EditRequest) -> Option<usize> {
        match request {
            EditRequest::Insert {
                tokens,
                anchor,
                completes,
            } => self.record_insert(tokens, *completes, *anchor),
            EditRequest::InsertAhead { token, index } => {
                self.insert_token_ahead(*token, *index).then_some(*index)
            }
            EditRequest::Replace { tokens, start, end } => self.record_replace(tokens, *start, *end),
            EditRequest::Remove { start, end } => self.record_remove(*start, *end),
        }
    }

    pub fn inserted(&self) -> &[InsertEdit] {
        &self.inserted
    }

    pub fn replaced(&self) -> &[ReplaceEdit] {
        &self.replaced
    }

    pub fn removed(&self) -> &[RemoveEdit] {
        &self.removed
    }

    /// Index of the last recorded Insert, if any.
    pub fn last_insert_index(&self) -> Option<usize> {
        self.inserted.len().checked_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.replaced.is_empty() && self.removed.is_empty()
    }

    pub(crate) fn insert_at(&mut self, index: usize) -> Option<&mut InsertEdit> {
        self.inserted.get_mut(index)
    }

    pub(crate) fn replace_at(&mut self, index: usize) -> Option<&mut ReplaceEdit> {
        self.replaced.get_mut(index)
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Option<&mut RemoveEdit> {
        self.removed.get_mut(index)
    }

    /// Clear every `consumed` flag ahead of a fresh replay pass.
    pub fn reset_consumed(&mut self) {
        self.inserted.iter_mut().for_each(|e| e.consumed = false);
        self.replaced.iter_mut().for_each(|e| e.consumed = false);
        self.removed.iter_mut().for_each(|e| e.consumed = false);
    }
}
