//! salvage-core: syntax error recovery for a compiler front end.
//!
//! Two stages sit between a parser's error recovery and the consumers of
//! its output:
//!
//! 1. **Replay.** The parser records its recovery decisions as positional
//!    edits in an [`EditLog`]. [`RecoveryScanner`] wraps the base scanner
//!    and interleaves those edits into the token stream, leaving the source
//!    buffer untouched.
//! 2. **Propagation.** Once a tree has been built from the corrected
//!    stream, [`propagate()`] marks every node whose shape came from
//!    recovery, correlating edits and diagnostics with node ranges, and
//!    repairs a few shapes recovery is known to get wrong.
//!
//! # Public API
//!
//! - [`EditLog`], [`EditRequest`] -- recording edits
//! - [`RecoveryScanner`], [`Scanner`], [`TokenSource`] -- replay
//! - [`Ast`], [`NodeKind`], [`NodeFlags`], [`Visitor`], [`walk()`] -- trees
//! - [`propagate()`], [`RecoveryPropagator`] -- recovery propagation
//! - [`RecoverySession`] -- both stages over one serialized unit

pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod edits;
pub mod error;
pub mod lexer;
pub mod propagate;
pub mod replay;
pub mod session;
pub mod span;
pub mod token;
pub mod visit;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{Ast, Node, NodeFlags, NodeId, NodeKind, NodeShape};
pub use config::{RecoveryConfig, SourceLevel};
pub use diagnostic::{Diagnostic, ProblemCategory};
pub use edits::{EditLog, EditRequest};
pub use error::{ScanError, SessionError, TreeError};
pub use lexer::{Scanner, TokenSource};
pub use span::Span;
pub use token::{Token, TokenKind, TokenOrigin, MISSING_IDENTIFIER};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use lexer::lex;
pub use propagate::{propagate, RecoveryPropagator};
pub use replay::RecoveryScanner;
pub use session::{Propagated, RecoverySession};
pub use visit::{walk, Visitor};
