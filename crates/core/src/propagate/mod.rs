//! Attribution of recovery edits to tree nodes.
//!
//! After a tree has been built from the corrected token stream, the
//! propagator walks it once and sets [`NodeFlags::RECOVERED`] on every node
//! whose shape was synthesized or altered by recovery. Two regimes apply:
//!
//! - **outline** (outside any block): declarations are flagged when a
//!   syntax-recovery diagnostic falls inside them.
//! - **body** (inside a block): nodes are flagged from the edit log. Insert
//!   edits are attributed lazily through a pending stack so that an
//!   insertion at a shared end offset reaches the right node; Remove and
//!   Replace edits go to the innermost node that contains them.
//!
//! A handful of shapes recovery is known to get wrong are then repaired in
//! place: dangling assignments, spurious `for` declarations, initializers
//! left holding a missing name and truncated annotations.

mod ending;
mod repair;

use tracing::{debug, trace};

pub use ending::ending_tokens;

use crate::ast::{Ast, NodeFlags, NodeId, NodeShape};
use crate::diagnostic::Diagnostic;
use crate::edits::EditLog;
use crate::span::Span;
use crate::token::TokenKind;
use crate::visit::{walk, Visitor};

/// Annotate `ast` in place from `log` and `diagnostics`.
///
/// Syntax-recovery diagnostics correlated to a node's range get `used` set.
/// The edits' `consumed` flags are not consulted: attribution is purely
/// positional.
pub fn propagate(ast: &mut Ast, diagnostics: &mut [Diagnostic], log: &EditLog) {
    let Some(root) = ast.root() else {
        debug!("tree has no root, nothing to propagate");
        return;
    };
    let mut propagator = RecoveryPropagator::new(log, diagnostics);
    walk(ast, root, &mut propagator);
    debug!(
        recovered = ast
            .preorder()
            .into_iter()
            .filter(|id| ast.is_recovered(*id))
            .count(),
        "recovery propagated"
    );
}

/// One synthetic token of the edit log, flattened out of its Insert.
#[derive(Debug, Clone)]
struct InsertedToken {
    kind: TokenKind,
    position: i64,
    flagged: bool,
}

pub struct RecoveryPropagator<'a> {
    log: &'a EditLog,
    diagnostics: &'a mut [Diagnostic],
    /// Diagnostics already dealt with, relevant or not.
    settled: Vec<bool>,
    depth: i32,
    last_end: Option<i64>,
    inserted: Vec<InsertedToken>,
    removed_flagged: Vec<bool>,
    replaced_flagged: Vec<bool>,
    pending: Vec<NodeId>,
}

impl<'a> RecoveryPropagator<'a> {
    pub fn new(log: &'a EditLog, diagnostics: &'a mut [Diagnostic]) -> Self {
        let inserted = log
            .inserted()
            .iter()
            .flat_map(|edit| {
                edit.stored_tokens().iter().map(move |kind| InsertedToken {
                    kind: *kind,
                    position: i64::from(edit.anchor),
                    flagged: false,
                })
            })
            .collect();
        RecoveryPropagator {
            log,
            settled: vec![false; diagnostics.len()],
            diagnostics,
            depth: 0,
            last_end: None,
            inserted,
            removed_flagged: vec![false; log.removed().len()],
            replaced_flagged: vec![false; log.replaced().len()],
            pending: Vec::new(),
        }
    }

    fn in_body(&self) -> bool {
        self.depth > 0
    }

    fn flag(ast: &mut Ast, id: NodeId, reason: &'static str) {
        if !ast.is_recovered(id) {
            trace!(%id, shape = ?ast.kind(id).shape(), reason, "node recovered");
        }
        ast.add_flags(id, NodeFlags::RECOVERED);
    }

    /// Settle diagnostics against the inclusive range `start..=end`. Returns
    /// true if a syntax-recovery diagnostic falls inside it.
    ///
    /// Diagnostics of unrelated categories are settled on first sight and
    /// never marked used.
    fn mark_included_problems(&mut self, start: i64, end: i64) -> bool {
        let mut found = false;
        for (diagnostic, settled) in self.diagnostics.iter_mut().zip(self.settled.iter_mut()) {
            if *settled {
                continue;
            }
            if !diagnostic.category.is_syntax_recovery() {
                *settled = true;
                continue;
            }
            if diagnostic.touches(start, end) {
                *settled = true;
                diagnostic.used = true;
                found = true;
            }
        }
        found
    }

    /// In a body, only descend into nodes some edit falls into.
    fn touches_edits(&self, span: Span) -> bool {
        let (start, end) = (i64::from(span.start), span.last());
        self.inserted
            .iter()
            .any(|token| start <= token.position && token.position <= end)
            || self
                .log
                .removed()
                .iter()
                .any(|edit| span.encloses(edit.start, edit.end))
            || self
                .log
                .replaced()
                .iter()
                .any(|edit| span.encloses(edit.start, edit.end))
    }

    fn end_visit_node(&mut self, ast: &mut Ast, id: NodeId) {
        let span = ast.span(id);
        let (start, end) = (i64::from(span.start), span.last());

        if !self.in_body() {
            if is_outline_unit(ast.kind(id).shape()) && self.mark_included_problems(start, end) {
                Self::flag(ast, id, "diagnostic in declaration");
            }
        } else {
            self.mark_included_problems(start, end);

            if !self.inserted.is_empty() {
                if self.last_end != Some(end) {
                    self.flush(ast);
                }
                self.pending.push(id);
            }

            for (edit, flagged) in self.log.removed().iter().zip(self.removed_flagged.iter_mut()) {
                if !*flagged && span.encloses(edit.start, edit.end) {
                    Self::flag(ast, id, "contains removed tokens");
                    *flagged = true;
                }
            }
            for (edit, flagged) in self.log.replaced().iter().zip(self.replaced_flagged.iter_mut()) {
                if !*flagged && span.encloses(edit.start, edit.end) {
                    Self::flag(ast, id, "contains replaced tokens");
                    *flagged = true;
                }
            }
        }
        self.last_end = Some(end);
    }

    /// Attribute Inserts to the pending run of nodes, then start a new run.
    fn flush(&mut self, ast: &mut Ast) {
        let pending = std::mem::take(&mut self.pending);
        if self.inserted.is_empty() || pending.is_empty() {
            return;
        }
        trace!(nodes = pending.len(), "flushing pending nodes");
        // The run is pushed in post-order, so push order is innermost first.
        // Both passes go that way: an insertion belongs to the smallest node
        // that ends on it or contains it.
        for &id in &pending {
            self.flag_inserted_at_end(ast, id);
        }
        for &id in &pending {
            self.flag_inserted_inside(ast, id);
        }
    }

    fn flag_inserted_at_end(&mut self, ast: &mut Ast, id: NodeId) {
        let Some(expected) = ending_tokens(ast.kind(id).shape()) else {
            return;
        };
        let end = ast.span(id).last();

        let mut flag_parent = false;
        for token in self.inserted.iter_mut().rev() {
            if token.flagged || token.position != end {
                continue;
            }
            token.flagged = true;
            if expected.contains(&token.kind) {
                Self::flag(ast, id, "missing terminator inserted");
                break;
            }
            flag_parent = true;
        }

        if flag_parent {
            Self::flag(ast, id, "foreign token inserted at end");
            let mut next = ast.parent(id);
            while let Some(parent) = next {
                Self::flag(ast, parent, "child ends with inserted token");
                next = if ast.span(parent).last() == end {
                    ast.parent(parent)
                } else {
                    None
                };
            }
        }
    }

    fn flag_inserted_inside(&mut self, ast: &mut Ast, id: NodeId) {
        let span = ast.span(id);
        let (start, end) = (i64::from(span.start), span.last());
        for token in &mut self.inserted {
            if !token.flagged && start <= token.position && token.position < end {
                Self::flag(ast, id, "token inserted inside");
                token.flagged = true;
            }
        }
    }
}

/// Shapes that diagnostics may flag outside of a body.
fn is_outline_unit(shape: NodeShape) -> bool {
    matches!(
        shape,
        NodeShape::CompilationUnit
            | NodeShape::PackageDeclaration
            | NodeShape::ImportDeclaration
            | NodeShape::TypeDeclaration
            | NodeShape::FieldDeclaration
            | NodeShape::MethodDeclaration
            | NodeShape::Initializer
            | NodeShape::MarkerAnnotation
            | NodeShape::NormalAnnotation
            | NodeShape::SingleMemberAnnotation
            | NodeShape::Block
    )
}

impl Visitor for RecoveryPropagator<'_> {
    fn visit(&mut self, ast: &Ast, id: NodeId) -> bool {
        let descend = !self.in_body() || self.touches_edits(ast.span(id));
        if ast.kind(id).shape() == NodeShape::Block {
            self.depth += 1;
        }
        descend
    }

    fn end_visit(&mut self, ast: &mut Ast, id: NodeId) {
        let shape = ast.kind(id).shape();
        if shape == NodeShape::Block {
            self.depth -= 1;
            if self.depth <= 0 {
                self.flush(ast);
            }
        }
        self.end_visit_node(ast, id);

        match shape {
            NodeShape::ExpressionStatement => repair::dangling_assignment(ast, id),
            NodeShape::ForStatement => repair::spurious_for_declaration(ast, id),
            NodeShape::VariableDeclarationStatement => repair::dangling_initializers(ast, id),
            NodeShape::NormalAnnotation | NodeShape::SingleMemberAnnotation if !self.in_body() => {
                repair::truncated_annotation(ast, id)
            }
            _ => {}
        }
    }
}
