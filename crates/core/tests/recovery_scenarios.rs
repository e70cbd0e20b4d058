//! End-to-end recovery scenarios: edits are replayed over real source text,
//! a tree is assembled from the corrected token spans the way a parser
//! would, and the propagator's verdict is checked node by node.

use salvage_core::ast::{AssignmentOperator, InfixOperator, PrimitiveTypeCode};
use salvage_core::{
    propagate, Ast, Diagnostic, EditLog, NodeId, NodeKind, ProblemCategory, RecoveryScanner,
    Scanner, Span, Token, TokenKind, TokenOrigin, MISSING_IDENTIFIER,
};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn replay(src: &str, log: EditLog) -> (Vec<Token>, EditLog) {
    let mut scanner = RecoveryScanner::new(Scanner::new(src), log);
    let tokens = scanner.tokens().expect("source lexes");
    (tokens, scanner.into_log())
}

struct Tree {
    ast: Ast,
}

impl Tree {
    fn new() -> Self {
        Tree { ast: Ast::new() }
    }

    fn node(&mut self, kind: NodeKind, start: u32, end: u32) -> NodeId {
        self.ast.alloc(kind, Span::new(start, end)).expect("valid node")
    }

    fn name(&mut self, identifier: &str, span: Span) -> NodeId {
        self.ast
            .alloc(
                NodeKind::SimpleName {
                    identifier: identifier.to_owned(),
                },
                span,
            )
            .expect("valid name")
    }

    fn name_from(&mut self, token: &Token) -> NodeId {
        self.name(&token.text, token.span)
    }

    fn finish(mut self, root: NodeId) -> Ast {
        self.ast.set_root(root).expect("root is detached");
        self.ast
    }
}

fn recovered(ast: &Ast) -> Vec<NodeId> {
    ast.preorder()
        .into_iter()
        .filter(|id| ast.is_recovered(*id))
        .collect()
}

// ──────────────────────────────────────────────
// Scenario A: `int x = ;`
// ──────────────────────────────────────────────

#[test]
fn dangling_initializer_is_cleared() {
    let src = "{ int x = ; }";
    let mut log = EditLog::default();
    log.record_insert(&[TokenKind::Identifier], None, 8);
    let (tokens, log) = replay(src, log);

    // { int x = <missing> ; }
    assert_eq!(tokens[4].kind, TokenKind::Identifier);
    assert_eq!(tokens[4].text, MISSING_IDENTIFIER);
    assert_eq!(tokens[4].origin, TokenOrigin::Inserted);
    assert_eq!(tokens[5].kind, TokenKind::Semicolon);

    let mut t = Tree::new();
    let ty = t.node(
        NodeKind::PrimitiveType {
            code: PrimitiveTypeCode::Int,
        },
        2,
        5,
    );
    let x = t.name_from(&tokens[2]);
    let missing = t.name_from(&tokens[4]);
    let fragment = t.node(
        NodeKind::VariableDeclarationFragment {
            name: x,
            initializer: Some(missing),
        },
        6,
        9,
    );
    let decl = t.node(
        NodeKind::VariableDeclarationStatement {
            ty,
            fragments: vec![fragment],
        },
        2,
        11,
    );
    let block = t.node(
        NodeKind::Block {
            statements: vec![decl],
        },
        0,
        13,
    );
    let mut ast = t.finish(block);

    propagate(&mut ast, &mut [], &log);

    assert!(ast.is_recovered(fragment));
    assert_eq!(ast.children(fragment), vec![x]);
    assert_eq!(ast.parent(missing), None);
    assert!(!ast.is_recovered(decl));
    assert!(!ast.is_recovered(block));
}

// ──────────────────────────────────────────────
// Scenario B: `for (x = ; ; );`
// ──────────────────────────────────────────────

#[test]
fn spurious_for_declaration_is_dropped() {
    let src = "{ for (x = ; ; ); }";
    let mut log = EditLog::default();
    log.record_insert(&[TokenKind::Identifier], None, 9);
    let (tokens, log) = replay(src, log);
    // { for ( x = <missing> ; ; ) ; }
    assert!(tokens[5].is_missing_identifier());

    let mut t = Tree::new();
    let type_name = t.name_from(&tokens[3]);
    let ty = t.node(NodeKind::SimpleType { name: type_name }, 7, 8);
    let missing = t.name_from(&tokens[5]);
    let fragment = t
        .ast
        .alloc(
            NodeKind::VariableDeclarationFragment {
                name: missing,
                initializer: None,
            },
            tokens[5].span,
        )
        .expect("valid fragment");
    let decl = t.node(
        NodeKind::VariableDeclarationExpression {
            ty,
            fragments: vec![fragment],
        },
        7,
        10,
    );
    let body = t.node(NodeKind::EmptyStatement, 16, 17);
    let for_stmt = t.node(
        NodeKind::ForStatement {
            initializers: vec![decl],
            condition: None,
            updaters: Vec::new(),
            body,
        },
        2,
        17,
    );
    let block = t.node(
        NodeKind::Block {
            statements: vec![for_stmt],
        },
        0,
        19,
    );
    let mut ast = t.finish(block);

    propagate(&mut ast, &mut [], &log);

    assert!(ast.is_recovered(decl));
    assert_eq!(ast.children(for_stmt), vec![body]);
    match ast.kind(for_stmt) {
        NodeKind::ForStatement { initializers, .. } => assert!(initializers.is_empty()),
        other => panic!("unexpected shape {other:?}"),
    }
}

// ──────────────────────────────────────────────
// Scenario C: stray closing brace
// ──────────────────────────────────────────────

/// `{ a(); } b(); }` with the first `}` removed.
fn stray_brace_block() -> (Ast, NodeId, NodeId, NodeId, EditLog) {
    let src = "{ a(); } b(); }";
    let mut log = EditLog::default();
    log.record_remove(7, 7);
    let (tokens, log) = replay(src, log);
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        [
            TokenKind::LBrace,
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::RBrace,
            TokenKind::Eof,
        ]
    );
    assert!(log.removed()[0].consumed);

    let mut t = Tree::new();
    let statement = |t: &mut Tree, name: &Token, start: u32| {
        let name = t.name_from(name);
        let call = t.node(
            NodeKind::MethodInvocation {
                target: None,
                name,
                arguments: Vec::new(),
            },
            start,
            start + 3,
        );
        t.node(NodeKind::ExpressionStatement { expression: call }, start, start + 4)
    };
    let first = statement(&mut t, &tokens[1], 2);
    let second = statement(&mut t, &tokens[5], 9);
    let block = t.node(
        NodeKind::Block {
            statements: vec![first, second],
        },
        0,
        15,
    );
    (t.finish(block), block, first, second, log)
}

#[test]
fn stray_brace_flags_body_block_through_its_diagnostic() {
    let (mut ast, block, first, second, log) = stray_brace_block();
    let mut diagnostics = vec![Diagnostic::new(ProblemCategory::ParsingErrorDeleteToken, 7, 7)];

    propagate(&mut ast, &mut diagnostics, &log);

    assert!(ast.is_recovered(block));
    assert!(diagnostics[0].used);
    assert_eq!(recovered(&ast), vec![block]);
    assert!(!ast.is_recovered(first));
    assert!(!ast.is_recovered(second));
}

#[test]
fn stray_brace_in_nested_block_flags_that_block_only() {
    // an inner block whose two statements are separated by a stray `}`
    let mut log = EditLog::default();
    log.record_remove(11, 11);
    let mut t = Tree::new();
    let statement = |t: &mut Tree, start: u32| {
        let expression = t.name("s", Span::new(start, start + 1));
        t.node(NodeKind::ExpressionStatement { expression }, start, start + 2)
    };
    let a = statement(&mut t, 4);
    let b = statement(&mut t, 13);
    let inner = t.node(
        NodeKind::Block {
            statements: vec![a, b],
        },
        2,
        17,
    );
    let c = statement(&mut t, 19);
    let outer = t.node(
        NodeKind::Block {
            statements: vec![inner, c],
        },
        0,
        23,
    );
    let mut ast = t.finish(outer);

    propagate(&mut ast, &mut [], &log);

    assert_eq!(recovered(&ast), vec![inner]);
}

// ──────────────────────────────────────────────
// Scenario D: unrelated diagnostics
// ──────────────────────────────────────────────

#[test]
fn semantic_diagnostic_never_flags_and_stays_unused() {
    let mut t = Tree::new();
    let type_name = t.name("C", Span::new(6, 7));
    let int = t.node(
        NodeKind::PrimitiveType {
            code: PrimitiveTypeCode::Int,
        },
        10,
        13,
    );
    let field_name = t.name("f", Span::new(14, 15));
    let fragment = t.node(
        NodeKind::VariableDeclarationFragment {
            name: field_name,
            initializer: None,
        },
        14,
        15,
    );
    let field = t.node(
        NodeKind::FieldDeclaration {
            modifiers: Vec::new(),
            ty: int,
            fragments: vec![fragment],
        },
        10,
        16,
    );
    let class = t.node(
        NodeKind::TypeDeclaration {
            modifiers: Vec::new(),
            name: type_name,
            is_interface: false,
            body: vec![field],
        },
        0,
        18,
    );
    let unit = t.node(
        NodeKind::CompilationUnit {
            package: None,
            imports: Vec::new(),
            types: vec![class],
        },
        0,
        18,
    );
    let mut ast = t.finish(unit);
    let mut diagnostics = vec![
        Diagnostic::new(ProblemCategory::TypeMismatch, 10, 15),
        Diagnostic::new(ProblemCategory::UnusedImport, 0, 17),
    ];

    propagate(&mut ast, &mut diagnostics, &EditLog::default());

    assert!(recovered(&ast).is_empty());
    assert!(diagnostics.iter().all(|d| !d.used));
}

#[test]
fn recovery_diagnostic_flags_the_first_declaration_reached() {
    // class C { int f }   -- `;` expected after `f`
    let mut t = Tree::new();
    let type_name = t.name("C", Span::new(6, 7));
    let int = t.node(
        NodeKind::PrimitiveType {
            code: PrimitiveTypeCode::Int,
        },
        10,
        13,
    );
    let field_name = t.name("f", Span::new(14, 15));
    let fragment = t.node(
        NodeKind::VariableDeclarationFragment {
            name: field_name,
            initializer: None,
        },
        14,
        15,
    );
    let field = t.node(
        NodeKind::FieldDeclaration {
            modifiers: Vec::new(),
            ty: int,
            fragments: vec![fragment],
        },
        10,
        15,
    );
    let class = t.node(
        NodeKind::TypeDeclaration {
            modifiers: Vec::new(),
            name: type_name,
            is_interface: false,
            body: vec![field],
        },
        0,
        17,
    );
    let mut ast = t.finish(class);
    let mut diagnostics = vec![Diagnostic::new(
        ProblemCategory::ParsingErrorInsertTokenAfter,
        14,
        14,
    )];

    propagate(&mut ast, &mut diagnostics, &EditLog::default());

    // the field is end-visited before its class, so it claims the diagnostic
    assert_eq!(recovered(&ast), vec![field]);
    assert!(diagnostics[0].used);
}

// ──────────────────────────────────────────────
// Boundary propagation
// ──────────────────────────────────────────────

/// `{ x = a + b; }`: `b`, `a + b` and the assignment all end at offset 10.
struct SharedEnd {
    ast: Ast,
    b: NodeId,
    sum: NodeId,
    assign: NodeId,
    stmt: NodeId,
    block: NodeId,
}

fn shared_end() -> SharedEnd {
    let mut t = Tree::new();
    let x = t.name("x", Span::new(2, 3));
    let a = t.name("a", Span::new(6, 7));
    let b = t.name("b", Span::new(10, 11));
    let sum = t.node(
        NodeKind::InfixExpression {
            lhs: a,
            operator: InfixOperator::Plus,
            rhs: b,
        },
        6,
        11,
    );
    let assign = t.node(
        NodeKind::Assignment {
            lhs: x,
            operator: AssignmentOperator::Assign,
            rhs: sum,
        },
        2,
        11,
    );
    let stmt = t.node(NodeKind::ExpressionStatement { expression: assign }, 2, 12);
    let block = t.node(
        NodeKind::Block {
            statements: vec![stmt],
        },
        0,
        14,
    );
    SharedEnd {
        ast: t.finish(block),
        b,
        sum,
        assign,
        stmt,
        block,
    }
}

#[test]
fn foreign_token_at_shared_end_propagates_to_every_node_ending_there() {
    let mut tree = shared_end();
    let mut log = EditLog::default();
    log.record_insert(&[TokenKind::Dot], None, 10);

    propagate(&mut tree.ast, &mut [], &log);

    assert!(tree.ast.is_recovered(tree.b));
    assert!(tree.ast.is_recovered(tree.sum));
    assert!(tree.ast.is_recovered(tree.assign));
    // the first ancestor ending elsewhere is flagged too, and nothing above it
    assert!(tree.ast.is_recovered(tree.stmt));
    assert!(!tree.ast.is_recovered(tree.block));
}

#[test]
fn legitimate_terminator_at_shared_end_flags_innermost_only() {
    let mut tree = shared_end();
    let mut log = EditLog::default();
    log.record_insert(&[TokenKind::Identifier], None, 10);

    propagate(&mut tree.ast, &mut [], &log);

    assert_eq!(recovered(&tree.ast), vec![tree.b]);
}

// ──────────────────────────────────────────────
// Containment monotonicity
// ──────────────────────────────────────────────

#[test]
fn one_removal_is_attributed_once() {
    let mut tree = shared_end();
    let mut log = EditLog::default();
    // inside `a + b` only
    log.record_remove(8, 8);

    propagate(&mut tree.ast, &mut [], &log);

    assert_eq!(recovered(&tree.ast), vec![tree.sum]);
}

#[test]
fn distinct_edits_flag_nested_nodes_independently() {
    let mut tree = shared_end();
    let mut log = EditLog::default();
    log.record_remove(8, 8);
    // between `x` and `=`: in the assignment, outside `a + b`
    log.record_replace(&[TokenKind::Eq], 4, 4);

    propagate(&mut tree.ast, &mut [], &log);

    assert!(tree.ast.is_recovered(tree.sum));
    assert!(tree.ast.is_recovered(tree.assign));
    assert!(!tree.ast.is_recovered(tree.stmt));
}

// ──────────────────────────────────────────────
// Dangling assignment
// ──────────────────────────────────────────────

#[test]
fn dangling_assignment_becomes_its_left_hand_side() {
    // `)` where the right-hand side should be
    let src = "{ x = ) ; }";
    let mut log = EditLog::default();
    log.record_replace(&[TokenKind::Identifier], 6, 6);
    let (tokens, log) = replay(src, log);
    assert!(tokens[3].is_missing_identifier());
    assert_eq!(tokens[3].origin, TokenOrigin::Replaced);
    assert_eq!(tokens[4].kind, TokenKind::Semicolon);

    let mut t = Tree::new();
    let x = t.name_from(&tokens[1]);
    let missing = t.name_from(&tokens[3]);
    let assign = t.node(
        NodeKind::Assignment {
            lhs: x,
            operator: AssignmentOperator::Assign,
            rhs: missing,
        },
        2,
        6,
    );
    let stmt = t.node(NodeKind::ExpressionStatement { expression: assign }, 2, 9);
    let block = t.node(
        NodeKind::Block {
            statements: vec![stmt],
        },
        0,
        11,
    );
    let mut ast = t.finish(block);
    let mut diagnostics = vec![Diagnostic::new(
        ProblemCategory::ParsingErrorReplaceTokens,
        6,
        6,
    )];

    propagate(&mut ast, &mut diagnostics, &log);

    // the statement is the first node enclosing the replaced `)`
    assert!(ast.is_recovered(stmt));
    assert_eq!(ast.children(stmt), vec![x]);
    assert!(ast.is_recovered(x));
    assert_eq!(ast.parent(assign), None);
    assert_eq!(ast.parent(missing), None);
    assert!(diagnostics[0].used);
}

// ──────────────────────────────────────────────
// Replay ordering
// ──────────────────────────────────────────────

#[test]
fn inserted_tokens_follow_source_order() {
    let mut log = EditLog::default();
    log.record_insert(
        &[TokenKind::LParen, TokenKind::Identifier, TokenKind::RParen],
        None,
        0,
    );
    let (tokens, _) = replay("f;", log);
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        [
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::Identifier,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn token_inserted_ahead_follows_the_recorded_ones() {
    let mut log = EditLog::default();
    let index = log
        .record_insert(&[TokenKind::Identifier, TokenKind::RParen], None, 1)
        .unwrap();
    assert!(log.insert_token_ahead(TokenKind::Comma, index));
    let (tokens, _) = replay("f(;", log);
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        [
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::Identifier,
            TokenKind::RParen,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn ahead_token_stays_with_its_insert_when_another_shares_the_anchor() {
    let mut log = EditLog::default();
    let first = log.record_insert(&[TokenKind::Identifier], None, 1).unwrap();
    log.record_insert(&[TokenKind::RParen], None, 1).unwrap();
    log.insert_token_ahead(TokenKind::Comma, first);
    let (tokens, log) = replay("f(;", log);
    let kinds: Vec<_> = tokens[2..].iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        [
            TokenKind::Identifier,
            TokenKind::Comma,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
    assert!(log.inserted().iter().all(|edit| edit.consumed));
}

#[test]
fn every_applied_edit_is_consumed_exactly_once() {
    let mut log = EditLog::default();
    log.record_insert(&[TokenKind::Semicolon], None, 0);
    log.record_replace(&[TokenKind::Eq], 2, 3);
    log.record_remove(7, 7);
    // an Insert anchored nowhere near a token boundary never fires
    log.record_insert(&[TokenKind::Comma], None, 40);
    let mut scanner = RecoveryScanner::new(Scanner::new("a := b c d"), log);
    scanner.tokens().unwrap();
    let log = scanner.log();
    assert!(log.inserted()[0].consumed);
    assert!(!log.inserted()[1].consumed);
    assert!(log.replaced()[0].consumed);
    assert!(log.removed()[0].consumed);

    scanner.rewind();
    assert!(!scanner.log().replaced()[0].consumed);
    scanner.tokens().unwrap();
    assert!(scanner.log().replaced()[0].consumed);
}
