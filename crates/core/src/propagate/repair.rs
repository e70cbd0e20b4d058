//! Local rewrites for shapes that recovery is known to produce wrongly.
//!
//! Every repair checks its own preconditions and does nothing when they do
//! not hold. A tree edit that fails anyway is logged and abandoned.

use tracing::{debug, warn};

use crate::ast::{Ast, NodeFlags, NodeId, NodeKind};

fn is_protected(ast: &Ast, id: NodeId) -> bool {
    ast.flags(id).contains(NodeFlags::PROTECT)
}

/// `x = <missing>;` becomes `x;`: the statement takes the assignment's
/// left-hand side as its expression.
pub(super) fn dangling_assignment(ast: &mut Ast, stmt: NodeId) {
    if !ast.is_recovered(stmt) {
        return;
    }
    let &NodeKind::ExpressionStatement { expression } = ast.kind(stmt) else {
        return;
    };
    let &NodeKind::Assignment { lhs, rhs, .. } = ast.kind(expression) else {
        return;
    };
    if !ast.is_missing_name(rhs) {
        return;
    }
    if is_protected(ast, stmt) || is_protected(ast, expression) {
        warn!(%stmt, "dangling assignment left in place: node is protected");
        return;
    }
    let rewritten = ast
        .detach(lhs)
        .and_then(|()| ast.replace_child(stmt, expression, lhs))
        .and_then(|()| ast.detach(rhs));
    match rewritten {
        Ok(()) => {
            ast.add_flags(lhs, NodeFlags::RECOVERED);
            debug!(%stmt, %lhs, "dangling assignment collapsed to its left-hand side");
        }
        Err(err) => warn!(%stmt, %err, "dangling assignment repair failed"),
    }
}

/// Drop declarations of a missing name from a single-clause `for` header.
/// A declaration left with no fragments is dropped from the header as well.
pub(super) fn spurious_for_declaration(ast: &mut Ast, stmt: NodeId) {
    let NodeKind::ForStatement { initializers, .. } = ast.kind(stmt) else {
        return;
    };
    let [init] = initializers.as_slice() else {
        return;
    };
    let init = *init;
    let NodeKind::VariableDeclarationExpression { fragments, .. } = ast.kind(init) else {
        return;
    };
    let missing: Vec<NodeId> = fragments
        .iter()
        .copied()
        .filter(|&fragment| match ast.kind(fragment) {
            NodeKind::VariableDeclarationFragment { name, .. } => ast.is_missing_name(*name),
            _ => false,
        })
        .collect();
    if missing.is_empty() {
        return;
    }
    for fragment in missing {
        if let Err(err) = ast.remove_child(init, fragment) {
            warn!(%stmt, %fragment, %err, "spurious for-loop fragment kept");
            return;
        }
    }
    ast.add_flags(init, NodeFlags::RECOVERED);
    debug!(%stmt, %init, "spurious for-loop fragments removed");

    if ast.children(init).len() == 1 {
        // only the type is left
        match ast.remove_child(stmt, init) {
            Ok(()) => debug!(%stmt, %init, "empty for-loop declaration removed"),
            Err(err) => warn!(%stmt, %err, "empty for-loop declaration kept"),
        }
    }
}

/// `int x = <missing>;` becomes `int x;`.
pub(super) fn dangling_initializers(ast: &mut Ast, stmt: NodeId) {
    let NodeKind::VariableDeclarationStatement { fragments, .. } = ast.kind(stmt) else {
        return;
    };
    for fragment in fragments.clone() {
        let &NodeKind::VariableDeclarationFragment {
            initializer: Some(init),
            ..
        } = ast.kind(fragment)
        else {
            continue;
        };
        if !ast.is_recovered(init) || !ast.is_missing_name(init) {
            continue;
        }
        match ast.remove_child(fragment, init) {
            Ok(()) => {
                ast.add_flags(fragment, NodeFlags::RECOVERED);
                debug!(%fragment, "dangling initializer cleared");
            }
            Err(err) => warn!(%fragment, %err, "dangling initializer kept"),
        }
    }
}

/// Flag an annotation whose last value runs to the annotation's own end,
/// i.e. one cut off right after its final argument.
pub(super) fn truncated_annotation(ast: &mut Ast, id: NodeId) {
    let last_value = match ast.kind(id) {
        NodeKind::NormalAnnotation { values, .. } => values.last().copied(),
        NodeKind::SingleMemberAnnotation { value, .. } => Some(*value),
        _ => None,
    };
    let Some(last_value) = last_value else {
        return;
    };
    if ast.span(last_value).end == ast.span(id).end {
        ast.add_flags(id, NodeFlags::RECOVERED);
        debug!(%id, "annotation ends on its last value");
    }
}
