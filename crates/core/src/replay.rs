//! Token replay engine.
//!
//! [`RecoveryScanner`] wraps a base [`TokenSource`] and interleaves the
//! edits recorded in an [`EditLog`] into the stream it produces. The source
//! text itself is never touched: inserted and replaced tokens come from a
//! small pending buffer, and removed or replaced spans are skipped by moving
//! the base scanner's position forward.

use tracing::trace;

use crate::edits::EditLog;
use crate::error::ScanError;
use crate::lexer::TokenSource;
use crate::span::Span;
use crate::token::{Token, TokenKind, TokenOrigin};

pub struct RecoveryScanner<S> {
    scanner: S,
    log: EditLog,
    /// Pending synthetic kinds, next one at the back.
    pending: Vec<TokenKind>,
    /// Origin of the tokens currently in `pending`.
    pending_origin: TokenOrigin,
    /// Where the pending tokens are reported to sit.
    pending_at: u32,
    /// Highest Insert index applied at the current position.
    skip_inserted: Option<usize>,
    /// Where the last Replace or Remove asked the scan to resume. The base
    /// scanner clamps its position to the end of input, so this is what
    /// keeps an edit at end of input from matching `Eof` again.
    resume_floor: u32,
    preceded_by_removed: bool,
    last: Option<Token>,
}

impl<S: TokenSource> RecoveryScanner<S> {
    pub fn new(scanner: S, log: EditLog) -> Self {
        RecoveryScanner {
            scanner,
            log,
            pending: Vec::new(),
            pending_origin: TokenOrigin::Inserted,
            pending_at: 0,
            skip_inserted: None,
            resume_floor: 0,
            preceded_by_removed: false,
            last: None,
        }
    }

    pub fn log(&self) -> &EditLog {
        &self.log
    }

    /// The log stays writable while scanning: the parser records further
    /// edits as it discovers them.
    pub fn log_mut(&mut self) -> &mut EditLog {
        &mut self.log
    }

    pub fn into_log(self) -> EditLog {
        self.log
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.log.set_recording(recording);
    }

    /// Seed the pending buffer directly; `kinds` are in emission order.
    pub fn set_pending_tokens(&mut self, kinds: &[TokenKind]) {
        self.pending = kinds.iter().rev().copied().collect();
        self.pending_origin = TokenOrigin::Inserted;
        self.pending_at = self.scanner.current_position();
    }

    /// Restart from offset 0 for a new pass. Every `consumed` flag is reset.
    pub fn rewind(&mut self) {
        self.scanner.set_current_position(0);
        self.pending.clear();
        self.skip_inserted = None;
        self.resume_floor = 0;
        self.preceded_by_removed = false;
        self.last = None;
        self.log.reset_consumed();
    }

    fn emit_pending(&mut self) -> Option<Token> {
        let kind = self.pending.pop()?;
        let token = Token::synthetic(kind, Span::empty_at(self.pending_at), self.pending_origin);
        self.last = Some(token.clone());
        Some(token)
    }

    /// Produce the next token of the corrected stream.
    pub fn next_token(&mut self) -> Result<Token, ScanError> {
        if let Some(token) = self.emit_pending() {
            return Ok(token);
        }

        let mut preceded_by_removed = false;
        loop {
            let position = self.scanner.current_position();

            let insert = self.log.inserted().iter().enumerate().position(|(i, edit)| {
                edit.anchor.checked_add(1) == Some(position)
                    && self.skip_inserted.map_or(true, |skip| i > skip)
            });
            if let Some(index) = insert {
                if let Some(edit) = self.log.insert_at(index) {
                    edit.consumed = true;
                    self.pending = edit.stored_tokens().to_vec();
                }
                trace!(index, position, "replaying insert");
                self.pending_origin = TokenOrigin::Inserted;
                self.pending_at = position;
                self.skip_inserted = Some(index);
                self.preceded_by_removed = preceded_by_removed;
                if let Some(token) = self.emit_pending() {
                    return Ok(token);
                }
                continue;
            }
            self.skip_inserted = None;

            let previous = position.max(self.resume_floor);
            let kind = self.scanner.next_raw_token()?;
            let start = self.scanner.start_position();
            let end = self.scanner.current_position();
            let covers = |edit_start: u32, edit_end: u32| {
                edit_start >= previous && edit_start <= start && i64::from(edit_end) >= i64::from(end) - 1
            };

            let replace = self
                .log
                .replaced()
                .iter()
                .position(|edit| covers(edit.start, edit.end));
            if let Some(index) = replace {
                let mut resume = end;
                if let Some(edit) = self.log.replace_at(index) {
                    edit.consumed = true;
                    self.pending = edit.stored_tokens().to_vec();
                    resume = edit.end.saturating_add(1);
                }
                trace!(index, start, resume, "replaying replace");
                self.scanner.set_current_position(resume);
                self.resume_floor = resume;
                self.pending_origin = TokenOrigin::Replaced;
                self.pending_at = start;
                self.preceded_by_removed = preceded_by_removed;
                if let Some(token) = self.emit_pending() {
                    return Ok(token);
                }
                continue;
            }

            let remove = self
                .log
                .removed()
                .iter()
                .position(|edit| covers(edit.start, edit.end));
            if let Some(index) = remove {
                if let Some(edit) = self.log.remove_at(index) {
                    edit.consumed = true;
                    let resume = edit.end.saturating_add(1);
                    trace!(index, start, resume, "skipping removed span");
                    self.scanner.set_current_position(resume);
                    self.resume_floor = resume;
                }
                preceded_by_removed = true;
                continue;
            }

            let token = Token {
                kind,
                span: Span::new(start, end),
                text: self.scanner.current_token_source().to_owned(),
                origin: TokenOrigin::Source,
            };
            self.preceded_by_removed = preceded_by_removed;
            self.last = Some(token.clone());
            return Ok(token);
        }
    }

    /// Drain the corrected stream up to and including `Eof`.
    pub fn tokens(&mut self) -> Result<Vec<Token>, ScanError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Text of the last token; synthetic tokens report their fake payload.
    pub fn current_token_source(&self) -> &str {
        match &self.last {
            Some(token) if token.is_synthetic() => &token.text,
            _ => self.scanner.current_token_source(),
        }
    }

    pub fn is_fake_token(&self) -> bool {
        self.last.as_ref().is_some_and(Token::is_synthetic)
    }

    pub fn is_inserted_token(&self) -> bool {
        self.last
            .as_ref()
            .is_some_and(|t| t.origin == TokenOrigin::Inserted)
    }

    pub fn is_replaced_token(&self) -> bool {
        self.last
            .as_ref()
            .is_some_and(|t| t.origin == TokenOrigin::Replaced)
    }

    /// True when a removed span was skipped right before the last token.
    pub fn is_preceded_by_removed_token(&self) -> bool {
        self.preceded_by_removed
    }

    pub fn current_position(&self) -> u32 {
        self.scanner.current_position()
    }
}
