//! Depth-first traversal over an [`Ast`].

use crate::ast::{Ast, NodeId};

/// Callbacks for [`walk`].
///
/// `visit` runs on the way down and decides whether to descend into the
/// node's children; `end_visit` runs on the way back up whether or not the
/// children were visited, and may restructure the subtree it just left.
pub trait Visitor {
    fn visit(&mut self, _ast: &Ast, _id: NodeId) -> bool {
        true
    }

    fn end_visit(&mut self, _ast: &mut Ast, _id: NodeId) {}
}

/// Walk the subtree rooted at `id` in source reading order.
///
/// Children are collected before descending, so `end_visit` on a child may
/// rewrite its parent's slots without disturbing the traversal.
pub fn walk<V: Visitor + ?Sized>(ast: &mut Ast, id: NodeId, visitor: &mut V) {
    if visitor.visit(ast, id) {
        for child in ast.children(id) {
            walk(ast, child, visitor);
        }
    }
    visitor.end_visit(ast, id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{InfixOperator, NodeKind};
    use crate::span::Span;

    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
        skip: Option<NodeId>,
    }

    impl Visitor for Trace {
        fn visit(&mut self, _ast: &Ast, id: NodeId) -> bool {
            self.events.push(format!("enter {id}"));
            self.skip != Some(id)
        }

        fn end_visit(&mut self, _ast: &mut Ast, id: NodeId) {
            self.events.push(format!("leave {id}"));
        }
    }

    fn sample() -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let a = ast
            .alloc(NodeKind::SimpleName { identifier: "a".into() }, Span::new(0, 1))
            .unwrap();
        let b = ast
            .alloc(NodeKind::SimpleName { identifier: "b".into() }, Span::new(4, 5))
            .unwrap();
        let sum = ast
            .alloc(
                NodeKind::InfixExpression {
                    lhs: a,
                    operator: InfixOperator::Plus,
                    rhs: b,
                },
                Span::new(0, 5),
            )
            .unwrap();
        (ast, sum)
    }

    #[test]
    fn enter_and_leave_nest() {
        let (mut ast, root) = sample();
        let mut trace = Trace::default();
        walk(&mut ast, root, &mut trace);
        assert_eq!(
            trace.events,
            ["enter #2", "enter #0", "leave #0", "enter #1", "leave #1", "leave #2"]
        );
    }

    #[test]
    fn declining_visit_skips_children_but_still_leaves() {
        let (mut ast, root) = sample();
        let mut trace = Trace {
            skip: Some(root),
            ..Trace::default()
        };
        walk(&mut ast, root, &mut trace);
        assert_eq!(trace.events, ["enter #2", "leave #2"]);
    }
}
