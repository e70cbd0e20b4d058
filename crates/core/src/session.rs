//! End-to-end recovery over one compilation unit.
//!
//! A [`RecoverySession`] is the serialized hand-off between a parser and
//! this crate: the source text, the recovery decisions the parser made, the
//! diagnostics it reported and the tree it built from the corrected stream.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ast::Ast;
use crate::config::RecoveryConfig;
use crate::diagnostic::Diagnostic;
use crate::edits::{EditLog, EditRequest};
use crate::error::SessionError;
use crate::lexer::Scanner;
use crate::propagate::propagate;
use crate::replay::RecoveryScanner;
use crate::token::Token;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoverySession {
    #[serde(default)]
    pub config: RecoveryConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub edits: Vec<EditRequest>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub tree: Ast,
}

/// What [`RecoverySession::propagate`] hands back.
#[derive(Debug, Clone, Serialize)]
pub struct Propagated {
    pub tree: Ast,
    pub diagnostics: Vec<Diagnostic>,
    /// The corrected stream, when the session carried source text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<Token>>,
}

impl RecoverySession {
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Record every edit request, in order, into a fresh log.
    pub fn edit_log(&self) -> EditLog {
        let mut log = EditLog::new(self.config.clone());
        for (i, request) in self.edits.iter().enumerate() {
            if log.apply(request).is_none() {
                warn!(request = i, "edit request not recorded");
            }
        }
        log
    }

    /// Scan the source with the edits replayed.
    pub fn replay(&self) -> Result<Vec<Token>, SessionError> {
        let (tokens, _) = self.replay_with(self.edit_log())?;
        Ok(tokens)
    }

    fn replay_with(&self, log: EditLog) -> Result<(Vec<Token>, EditLog), SessionError> {
        let source = self.source.as_deref().ok_or(SessionError::NoSource)?;
        let mut scanner = RecoveryScanner::new(Scanner::new(source), log);
        let tokens = scanner.tokens()?;
        debug!(tokens = tokens.len(), "replay finished");
        Ok((tokens, scanner.into_log()))
    }

    /// Flag recovered nodes and settle diagnostics. The source, if any, is
    /// replayed first so lexical errors surface before the tree is touched.
    pub fn propagate(self) -> Result<Propagated, SessionError> {
        let mut log = self.edit_log();
        let tokens = match self.source {
            Some(_) => {
                let (tokens, replayed) = self.replay_with(log)?;
                log = replayed;
                Some(tokens)
            }
            None => None,
        };
        let RecoverySession {
            mut tree,
            mut diagnostics,
            ..
        } = self;
        propagate(&mut tree, &mut diagnostics, &log);
        info!(
            nodes = tree.len(),
            diagnostics_used = diagnostics.iter().filter(|d| d.used).count(),
            "propagation complete"
        );
        Ok(Propagated {
            tree,
            diagnostics,
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{TokenKind, TokenOrigin};

    #[test]
    fn replay_requires_source() {
        let session = RecoverySession::default();
        assert!(matches!(session.replay(), Err(SessionError::NoSource)));
    }

    #[test]
    fn replay_applies_requests_in_order() {
        let session = RecoverySession {
            source: Some("x = ;".into()),
            edits: vec![EditRequest::Insert {
                tokens: vec![TokenKind::Identifier],
                anchor: 2,
                completes: None,
            }],
            ..RecoverySession::default()
        };
        let tokens = session.replay().unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Identifier,
                TokenKind::Eq,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[2].origin, TokenOrigin::Inserted);
    }

    #[test]
    fn lexical_errors_surface() {
        let session = RecoverySession {
            source: Some("\"open".into()),
            ..RecoverySession::default()
        };
        assert!(matches!(session.replay(), Err(SessionError::Scan(_))));
        assert!(matches!(session.propagate(), Err(SessionError::Scan(_))));
    }

    #[test]
    fn malformed_tree_is_rejected() {
        let json = r#"{
            "tree": {"root": 0, "nodes": [
                {"kind": {"shape": "expression_statement", "expression": 0},
                 "span": {"start": 0, "end": 2}}
            ]}
        }"#;
        let err = RecoverySession::from_json(json).unwrap_err();
        assert!(matches!(err, SessionError::Json(_)));
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn empty_document_propagates_to_nothing() {
        let outcome = RecoverySession::from_json("{}").unwrap().propagate().unwrap();
        assert!(outcome.tree.is_empty());
        assert!(outcome.tokens.is_none());
    }
}
