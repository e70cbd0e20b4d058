//! Arena syntax tree.
//!
//! Nodes live in a single [`Ast`] arena and refer to each other by
//! [`NodeId`]. Children are owned through the ids stored in their parent's
//! [`NodeKind`]; the parent link is navigational only. Every structural
//! edit goes through the arena so that a node can never be attached twice
//! or under one of its own descendants.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::span::Span;
use crate::token::{MISSING_IDENTIFIER, PLACEHOLDER_IDENTIFIER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct NodeFlags: u8 {
        /// The node was built from syntactically malformed input.
        const MALFORMED = 1;
        /// The node was produced by the parser, not by a later rewrite.
        const ORIGINAL = 1 << 1;
        /// Structural edits to the node are rejected.
        const PROTECT = 1 << 2;
        /// The node's shape comes from recovery and must not be trusted.
        const RECOVERED = 1 << 3;
    }
}

// ──────────────────────────────────────────────
// Operators
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOperator {
    Assign,
    PlusAssign,
    MinusAssign,
    TimesAssign,
    DivideAssign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfixOperator {
    Times,
    Divide,
    Remainder,
    Plus,
    Minus,
    Less,
    Greater,
    LessEquals,
    GreaterEquals,
    Equals,
    NotEquals,
    And,
    Or,
    Xor,
    ConditionalAnd,
    ConditionalOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostfixOperator {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveTypeCode {
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Void,
}

// ──────────────────────────────────────────────
// Node shapes
// ──────────────────────────────────────────────

/// Concrete node kinds and their children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum NodeKind {
    // Declarations
    CompilationUnit {
        package: Option<NodeId>,
        #[serde(default)]
        imports: Vec<NodeId>,
        #[serde(default)]
        types: Vec<NodeId>,
    },
    PackageDeclaration {
        #[serde(default)]
        annotations: Vec<NodeId>,
        name: NodeId,
    },
    ImportDeclaration {
        name: NodeId,
        #[serde(default)]
        is_static: bool,
        #[serde(default)]
        on_demand: bool,
    },
    TypeDeclaration {
        #[serde(default)]
        modifiers: Vec<NodeId>,
        name: NodeId,
        #[serde(default)]
        is_interface: bool,
        #[serde(default)]
        body: Vec<NodeId>,
    },
    FieldDeclaration {
        #[serde(default)]
        modifiers: Vec<NodeId>,
        ty: NodeId,
        #[serde(default)]
        fragments: Vec<NodeId>,
    },
    MethodDeclaration {
        #[serde(default)]
        modifiers: Vec<NodeId>,
        return_type: Option<NodeId>,
        name: NodeId,
        #[serde(default)]
        parameters: Vec<NodeId>,
        body: Option<NodeId>,
    },
    Initializer {
        body: NodeId,
    },
    SingleVariableDeclaration {
        ty: NodeId,
        name: NodeId,
    },
    VariableDeclarationFragment {
        name: NodeId,
        initializer: Option<NodeId>,
    },
    MarkerAnnotation {
        type_name: NodeId,
    },
    NormalAnnotation {
        type_name: NodeId,
        #[serde(default)]
        values: Vec<NodeId>,
    },
    MemberValuePair {
        name: NodeId,
        value: NodeId,
    },
    SingleMemberAnnotation {
        type_name: NodeId,
        value: NodeId,
    },

    // Types
    PrimitiveType {
        code: PrimitiveTypeCode,
    },
    SimpleType {
        name: NodeId,
    },
    ArrayType {
        element: NodeId,
    },

    // Statements
    Block {
        #[serde(default)]
        statements: Vec<NodeId>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    VariableDeclarationStatement {
        ty: NodeId,
        #[serde(default)]
        fragments: Vec<NodeId>,
    },
    ReturnStatement {
        expression: Option<NodeId>,
    },
    IfStatement {
        condition: NodeId,
        then_statement: NodeId,
        else_statement: Option<NodeId>,
    },
    ForStatement {
        #[serde(default)]
        initializers: Vec<NodeId>,
        condition: Option<NodeId>,
        #[serde(default)]
        updaters: Vec<NodeId>,
        body: NodeId,
    },
    WhileStatement {
        condition: NodeId,
        body: NodeId,
    },
    DoStatement {
        body: NodeId,
        condition: NodeId,
    },
    BreakStatement {
        label: Option<NodeId>,
    },
    ContinueStatement {
        label: Option<NodeId>,
    },
    EmptyStatement,
    ThrowStatement {
        expression: NodeId,
    },
    SwitchStatement {
        expression: NodeId,
        #[serde(default)]
        statements: Vec<NodeId>,
    },
    /// A `case` label; no expressions means `default`.
    SwitchCase {
        #[serde(default)]
        expressions: Vec<NodeId>,
    },

    // Expressions
    SimpleName {
        identifier: String,
    },
    QualifiedName {
        qualifier: NodeId,
        name: NodeId,
    },
    NumberLiteral {
        token: String,
    },
    StringLiteral {
        escaped: String,
    },
    CharacterLiteral {
        escaped: String,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    ThisExpression,
    Assignment {
        lhs: NodeId,
        operator: AssignmentOperator,
        rhs: NodeId,
    },
    InfixExpression {
        lhs: NodeId,
        operator: InfixOperator,
        rhs: NodeId,
    },
    PostfixExpression {
        operand: NodeId,
        operator: PostfixOperator,
    },
    ParenthesizedExpression {
        expression: NodeId,
    },
    MethodInvocation {
        target: Option<NodeId>,
        name: NodeId,
        #[serde(default)]
        arguments: Vec<NodeId>,
    },
    ClassInstanceCreation {
        ty: NodeId,
        #[serde(default)]
        arguments: Vec<NodeId>,
    },
    ArrayAccess {
        array: NodeId,
        index: NodeId,
    },
    VariableDeclarationExpression {
        ty: NodeId,
        #[serde(default)]
        fragments: Vec<NodeId>,
    },
}

/// Shape tag of a node, without its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    CompilationUnit,
    PackageDeclaration,
    ImportDeclaration,
    TypeDeclaration,
    FieldDeclaration,
    MethodDeclaration,
    Initializer,
    SingleVariableDeclaration,
    VariableDeclarationFragment,
    MarkerAnnotation,
    NormalAnnotation,
    MemberValuePair,
    SingleMemberAnnotation,
    PrimitiveType,
    SimpleType,
    ArrayType,
    Block,
    ExpressionStatement,
    VariableDeclarationStatement,
    ReturnStatement,
    IfStatement,
    ForStatement,
    WhileStatement,
    DoStatement,
    BreakStatement,
    ContinueStatement,
    EmptyStatement,
    ThrowStatement,
    SwitchStatement,
    SwitchCase,
    SimpleName,
    QualifiedName,
    NumberLiteral,
    StringLiteral,
    CharacterLiteral,
    BooleanLiteral,
    NullLiteral,
    ThisExpression,
    Assignment,
    InfixExpression,
    PostfixExpression,
    ParenthesizedExpression,
    MethodInvocation,
    ClassInstanceCreation,
    ArrayAccess,
    VariableDeclarationExpression,
}

/// A mutable view of one child slot.
enum Slot<'a> {
    One(&'a mut NodeId),
    Opt(&'a mut Option<NodeId>),
    Many(&'a mut Vec<NodeId>),
}

impl NodeKind {
    pub fn shape(&self) -> NodeShape {
        use NodeKind as K;
        match self {
            K::CompilationUnit { .. } => NodeShape::CompilationUnit,
            K::PackageDeclaration { .. } => NodeShape::PackageDeclaration,
            K::ImportDeclaration { .. } => NodeShape::ImportDeclaration,
            K::TypeDeclaration { .. } => NodeShape::TypeDeclaration,
            K::FieldDeclaration { .. } => NodeShape::FieldDeclaration,
            K::MethodDeclaration { .. } => NodeShape::MethodDeclaration,
            K::Initializer { .. } => NodeShape::Initializer,
            K::SingleVariableDeclaration { .. } => NodeShape::SingleVariableDeclaration,
            K::VariableDeclarationFragment { .. } => NodeShape::VariableDeclarationFragment,
            K::MarkerAnnotation { .. } => NodeShape::MarkerAnnotation,
            K::NormalAnnotation { .. } => NodeShape::NormalAnnotation,
            K::MemberValuePair { .. } => NodeShape::MemberValuePair,
            K::SingleMemberAnnotation { .. } => NodeShape::SingleMemberAnnotation,
            K::PrimitiveType { .. } => NodeShape::PrimitiveType,
            K::SimpleType { .. } => NodeShape::SimpleType,
            K::ArrayType { .. } => NodeShape::ArrayType,
            K::Block { .. } => NodeShape::Block,
            K::ExpressionStatement { .. } => NodeShape::ExpressionStatement,
            K::VariableDeclarationStatement { .. } => NodeShape::VariableDeclarationStatement,
            K::ReturnStatement { .. } => NodeShape::ReturnStatement,
            K::IfStatement { .. } => NodeShape::IfStatement,
            K::ForStatement { .. } => NodeShape::ForStatement,
            K::WhileStatement { .. } => NodeShape::WhileStatement,
            K::DoStatement { .. } => NodeShape::DoStatement,
            K::BreakStatement { .. } => NodeShape::BreakStatement,
            K::ContinueStatement { .. } => NodeShape::ContinueStatement,
            K::EmptyStatement => NodeShape::EmptyStatement,
            K::ThrowStatement { .. } => NodeShape::ThrowStatement,
            K::SwitchStatement { .. } => NodeShape::SwitchStatement,
            K::SwitchCase { .. } => NodeShape::SwitchCase,
            K::SimpleName { .. } => NodeShape::SimpleName,
            K::QualifiedName { .. } => NodeShape::QualifiedName,
            K::NumberLiteral { .. } => NodeShape::NumberLiteral,
            K::StringLiteral { .. } => NodeShape::StringLiteral,
            K::CharacterLiteral { .. } => NodeShape::CharacterLiteral,
            K::BooleanLiteral { .. } => NodeShape::BooleanLiteral,
            K::NullLiteral => NodeShape::NullLiteral,
            K::ThisExpression => NodeShape::ThisExpression,
            K::Assignment { .. } => NodeShape::Assignment,
            K::InfixExpression { .. } => NodeShape::InfixExpression,
            K::PostfixExpression { .. } => NodeShape::PostfixExpression,
            K::ParenthesizedExpression { .. } => NodeShape::ParenthesizedExpression,
            K::MethodInvocation { .. } => NodeShape::MethodInvocation,
            K::ClassInstanceCreation { .. } => NodeShape::ClassInstanceCreation,
            K::ArrayAccess { .. } => NodeShape::ArrayAccess,
            K::VariableDeclarationExpression { .. } => NodeShape::VariableDeclarationExpression,
        }
    }

    /// Children in source reading order.
    pub fn children(&self) -> Vec<NodeId> {
        use NodeKind as K;
        let mut out = Vec::new();
        match self {
            K::CompilationUnit {
                package,
                imports,
                types,
            } => {
                out.extend(package);
                out.extend(imports);
                out.extend(types);
            }
            K::PackageDeclaration { annotations, name } => {
                out.extend(annotations);
                out.push(*name);
            }
            K::ImportDeclaration { name, .. } => out.push(*name),
            K::TypeDeclaration {
                modifiers,
                name,
                body,
                ..
            } => {
                out.extend(modifiers);
                out.push(*name);
                out.extend(body);
            }
            K::FieldDeclaration {
                modifiers,
                ty,
                fragments,
            } => {
                out.extend(modifiers);
                out.push(*ty);
                out.extend(fragments);
            }
            K::MethodDeclaration {
                modifiers,
                return_type,
                name,
                parameters,
                body,
            } => {
                out.extend(modifiers);
                out.extend(return_type);
                out.push(*name);
                out.extend(parameters);
                out.extend(body);
            }
            K::Initializer { body } => out.push(*body),
            K::SingleVariableDeclaration { ty, name } => out.extend([*ty, *name]),
            K::VariableDeclarationFragment { name, initializer } => {
                out.push(*name);
                out.extend(initializer);
            }
            K::MarkerAnnotation { type_name } => out.push(*type_name),
            K::NormalAnnotation { type_name, values } => {
                out.push(*type_name);
                out.extend(values);
            }
            K::MemberValuePair { name, value } => out.extend([*name, *value]),
            K::SingleMemberAnnotation { type_name, value } => out.extend([*type_name, *value]),
            K::PrimitiveType { .. } => {}
            K::SimpleType { name } => out.push(*name),
            K::ArrayType { element } => out.push(*element),
            K::Block { statements } => out.extend(statements),
            K::ExpressionStatement { expression } => out.push(*expression),
            K::VariableDeclarationStatement { ty, fragments }
            | K::VariableDeclarationExpression { ty, fragments } => {
                out.push(*ty);
                out.extend(fragments);
            }
            K::ReturnStatement { expression } => out.extend(expression),
            K::IfStatement {
                condition,
                then_statement,
                else_statement,
            } => {
                out.extend([*condition, *then_statement]);
                out.extend(else_statement);
            }
            K::ForStatement {
                initializers,
                condition,
                updaters,
                body,
            } => {
                out.extend(initializers);
                out.extend(condition);
                out.extend(updaters);
                out.push(*body);
            }
            K::WhileStatement { condition, body } => out.extend([*condition, *body]),
            K::DoStatement { body, condition } => out.extend([*body, *condition]),
            K::BreakStatement { label } | K::ContinueStatement { label } => out.extend(label),
            K::ThrowStatement { expression } => out.push(*expression),
            K::SwitchStatement {
                expression,
                statements,
            } => {
                out.push(*expression);
                out.extend(statements);
            }
            K::SwitchCase { expressions } => out.extend(expressions),
            K::QualifiedName { qualifier, name } => out.extend([*qualifier, *name]),
            K::Assignment { lhs, rhs, .. } | K::InfixExpression { lhs, rhs, .. } => {
                out.extend([*lhs, *rhs])
            }
            K::PostfixExpression { operand, .. } => out.push(*operand),
            K::ParenthesizedExpression { expression } => out.push(*expression),
            K::MethodInvocation {
                target,
                name,
                arguments,
            } => {
                out.extend(target);
                out.push(*name);
                out.extend(arguments);
            }
            K::ClassInstanceCreation { ty, arguments } => {
                out.push(*ty);
                out.extend(arguments);
            }
            K::ArrayAccess { array, index } => out.extend([*array, *index]),
            K::EmptyStatement
            | K::SimpleName { .. }
            | K::NumberLiteral { .. }
            | K::StringLiteral { .. }
            | K::CharacterLiteral { .. }
            | K::BooleanLiteral { .. }
            | K::NullLiteral
            | K::ThisExpression => {}
        }
        out
    }

    fn slots_mut(&mut self) -> Vec<Slot<'_>> {
        use NodeKind as K;
        use Slot::{Many, One, Opt};
        match self {
            K::CompilationUnit {
                package,
                imports,
                types,
            } => vec![Opt(package), Many(imports), Many(types)],
            K::PackageDeclaration { annotations, name } => vec![Many(annotations), One(name)],
            K::ImportDeclaration { name, .. } => vec![One(name)],
            K::TypeDeclaration {
                modifiers,
                name,
                body,
                ..
            } => vec![Many(modifiers), One(name), Many(body)],
            K::FieldDeclaration {
                modifiers,
                ty,
                fragments,
            } => vec![Many(modifiers), One(ty), Many(fragments)],
            K::MethodDeclaration {
                modifiers,
                return_type,
                name,
                parameters,
                body,
            } => vec![
                Many(modifiers),
                Opt(return_type),
                One(name),
                Many(parameters),
                Opt(body),
            ],
            K::Initializer { body } => vec![One(body)],
            K::SingleVariableDeclaration { ty, name } => vec![One(ty), One(name)],
            K::VariableDeclarationFragment { name, initializer } => {
                vec![One(name), Opt(initializer)]
            }
            K::MarkerAnnotation { type_name } => vec![One(type_name)],
            K::NormalAnnotation { type_name, values } => vec![One(type_name), Many(values)],
            K::MemberValuePair { name, value } => vec![One(name), One(value)],
            K::SingleMemberAnnotation { type_name, value } => vec![One(type_name), One(value)],
            K::SimpleType { name } => vec![One(name)],
            K::ArrayType { element } => vec![One(element)],
            K::Block { statements } => vec![Many(statements)],
            K::ExpressionStatement { expression } => vec![One(expression)],
            K::VariableDeclarationStatement { ty, fragments }
            | K::VariableDeclarationExpression { ty, fragments } => vec![One(ty), Many(fragments)],
            K::ReturnStatement { expression } => vec![Opt(expression)],
            K::IfStatement {
                condition,
                then_statement,
                else_statement,
            } => vec![One(condition), One(then_statement), Opt(else_statement)],
            K::ForStatement {
                initializers,
                condition,
                updaters,
                body,
            } => vec![Many(initializers), Opt(condition), Many(updaters), One(body)],
            K::WhileStatement { condition, body } => vec![One(condition), One(body)],
            K::DoStatement { body, condition } => vec![One(body), One(condition)],
            K::BreakStatement { label } | K::ContinueStatement { label } => vec![Opt(label)],
            K::ThrowStatement { expression } => vec![One(expression)],
            K::SwitchStatement {
                expression,
                statements,
            } => vec![One(expression), Many(statements)],
            K::SwitchCase { expressions } => vec![Many(expressions)],
            K::QualifiedName { qualifier, name } => vec![One(qualifier), One(name)],
            K::Assignment { lhs, rhs, .. } | K::InfixExpression { lhs, rhs, .. } => {
                vec![One(lhs), One(rhs)]
            }
            K::PostfixExpression { operand, .. } => vec![One(operand)],
            K::ParenthesizedExpression { expression } => vec![One(expression)],
            K::MethodInvocation {
                target,
                name,
                arguments,
            } => vec![Opt(target), One(name), Many(arguments)],
            K::ClassInstanceCreation { ty, arguments } => vec![One(ty), Many(arguments)],
            K::ArrayAccess { array, index } => vec![One(array), One(index)],
            K::PrimitiveType { .. }
            | K::EmptyStatement
            | K::SimpleName { .. }
            | K::NumberLiteral { .. }
            | K::StringLiteral { .. }
            | K::CharacterLiteral { .. }
            | K::BooleanLiteral { .. }
            | K::NullLiteral
            | K::ThisExpression => Vec::new(),
        }
    }

    /// Point the slot holding `old` at `new`. Returns false if `old` is not
    /// a child.
    fn swap_child(&mut self, old: NodeId, new: NodeId) -> bool {
        for slot in self.slots_mut() {
            let hit = match slot {
                Slot::One(id) => (*id == old).then_some(id),
                Slot::Opt(opt) => opt.as_mut().filter(|id| **id == old),
                Slot::Many(list) => list.iter_mut().find(|id| **id == old),
            };
            if let Some(id) = hit {
                *id = new;
                return true;
            }
        }
        false
    }

    /// Empty the optional or list slot holding `child`.
    fn take_child(&mut self, child: NodeId) -> Option<Result<(), ()>> {
        for slot in self.slots_mut() {
            match slot {
                Slot::One(id) if *id == child => return Some(Err(())),
                Slot::Opt(opt) if *opt == Some(child) => {
                    *opt = None;
                    return Some(Ok(()));
                }
                Slot::Many(list) => {
                    if let Some(pos) = list.iter().position(|id| *id == child) {
                        list.remove(pos);
                        return Some(Ok(()));
                    }
                }
                _ => {}
            }
        }
        None
    }
}

// ──────────────────────────────────────────────
// Arena
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    #[serde(default = "NodeFlags::empty")]
    pub flags: NodeFlags,
    #[serde(skip)]
    parent: Option<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_recovered(&self) -> bool {
        self.flags.contains(NodeFlags::RECOVERED)
    }
}

/// Serialized form of a tree; parent links are rebuilt on load.
#[derive(Debug, Clone, Deserialize)]
pub struct AstDocument {
    pub root: Option<NodeId>,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AstDocument")]
pub struct Ast {
    root: Option<NodeId>,
    nodes: Vec<Node>,
}

impl TryFrom<AstDocument> for Ast {
    type Error = TreeError;

    fn try_from(document: AstDocument) -> Result<Self, Self::Error> {
        Ast::relink(document.nodes, document.root)
    }
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    /// Rebuild parent links from child lists, rejecting shared children,
    /// dangling ids and cycles.
    pub fn relink(mut nodes: Vec<Node>, root: Option<NodeId>) -> Result<Ast, TreeError> {
        let count = nodes.len();
        for node in nodes.iter_mut() {
            node.parent = None;
        }
        for index in 0..count {
            let parent = NodeId(index as u32);
            for child in nodes[index].kind.children() {
                let slot = nodes.get_mut(child.index()).ok_or(TreeError::UnknownNode(child))?;
                if child == parent {
                    return Err(TreeError::Cycle { child, parent });
                }
                if let Some(existing) = slot.parent {
                    return Err(TreeError::AlreadyAttached {
                        child,
                        parent: existing,
                    });
                }
                slot.parent = Some(parent);
            }
        }
        let ast = Ast { root, nodes };
        if let Some(root) = root {
            ast.get(root).ok_or(TreeError::UnknownNode(root))?;
        }
        ast.check_acyclic()?;
        Ok(ast)
    }

    /// Every node has at most one parent, so a cycle is a parent chain that
    /// runs back into itself. Each chain is walked once: a node seen on the
    /// current walk closes a cycle, a node settled by an earlier walk ends
    /// it.
    fn check_acyclic(&self) -> Result<(), TreeError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unseen,
            OnPath,
            Settled,
        }

        let mut marks = vec![Mark::Unseen; self.nodes.len()];
        let mut path = Vec::new();
        for index in 0..self.nodes.len() {
            let mut next = Some(NodeId(index as u32));
            while let Some(id) = next {
                match marks[id.index()] {
                    Mark::Settled => break,
                    Mark::OnPath => {
                        let parent = self.nodes[id.index()].parent.unwrap_or(id);
                        return Err(TreeError::Cycle { child: id, parent });
                    }
                    Mark::Unseen => {
                        marks[id.index()] = Mark::OnPath;
                        path.push(id);
                        next = self.nodes[id.index()].parent;
                    }
                }
            }
            for id in path.drain(..) {
                marks[id.index()] = Mark::Settled;
            }
        }
        Ok(())
    }

    /// Add a node, adopting every child it names. Children must exist and
    /// be detached.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> Result<NodeId, TreeError> {
        let id = NodeId(self.nodes.len() as u32);
        let children = kind.children();
        for (i, child) in children.iter().enumerate() {
            let node = self.get(*child).ok_or(TreeError::UnknownNode(*child))?;
            if let Some(parent) = node.parent {
                return Err(TreeError::AlreadyAttached {
                    child: *child,
                    parent,
                });
            }
            if children[..i].contains(child) {
                return Err(TreeError::AlreadyAttached { child: *child, parent: id });
            }
        }
        for child in &children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            span,
            flags: NodeFlags::ORIGINAL,
            parent: None,
        });
        Ok(id)
    }

    /// A `MISSING` name standing in for a mandatory child that was never
    /// parsed.
    pub fn placeholder(&mut self, at: u32) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: NodeKind::SimpleName {
                identifier: PLACEHOLDER_IDENTIFIER.to_owned(),
            },
            span: Span::empty_at(at),
            flags: NodeFlags::MALFORMED,
            parent: None,
        });
        id
    }

    pub fn set_root(&mut self, root: NodeId) -> Result<(), TreeError> {
        let node = self.get(root).ok_or(TreeError::UnknownNode(root))?;
        if let Some(parent) = node.parent {
            return Err(TreeError::AlreadyAttached {
                child: root,
                parent,
            });
        }
        self.root = Some(root);
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Panics if `id` did not come from this arena.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).kind.children()
    }

    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.node(id).flags
    }

    pub fn add_flags(&mut self, id: NodeId, flags: NodeFlags) {
        self.nodes[id.index()].flags |= flags;
    }

    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        self.nodes[id.index()].flags = flags;
    }

    pub fn is_recovered(&self, id: NodeId) -> bool {
        self.node(id).is_recovered()
    }

    pub fn identifier(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::SimpleName { identifier } => Some(identifier),
            _ => None,
        }
    }

    /// True for a name built from a synthetic identifier token.
    pub fn is_missing_name(&self, id: NodeId) -> bool {
        self.identifier(id) == Some(MISSING_IDENTIFIER)
    }

    /// Walk up the parent chain, nearest first. Stops after visiting as many
    /// nodes as the arena holds, so a corrupted chain cannot loop forever.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = self.get(id).and_then(|n| n.parent);
        let mut budget = self.nodes.len();
        std::iter::from_fn(move || {
            if budget == 0 {
                return None;
            }
            budget -= 1;
            let current = next?;
            next = self.get(current).and_then(|n| n.parent);
            Some(current)
        })
    }

    /// True if `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    fn check_unprotected(&self, id: NodeId) -> Result<(), TreeError> {
        let node = self.get(id).ok_or(TreeError::UnknownNode(id))?;
        if node.flags.contains(NodeFlags::PROTECT) {
            return Err(TreeError::Protected(id));
        }
        Ok(())
    }

    /// Unlink `id` from its parent. An optional or list slot is emptied; a
    /// mandatory slot is refilled with a placeholder so the parent stays
    /// well-formed.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.get(id).ok_or(TreeError::UnknownNode(id))?.parent else {
            return Ok(());
        };
        self.check_unprotected(parent)?;
        if let Some(Err(())) = self.nodes[parent.index()].kind.take_child(id) {
            let hole = self.placeholder(self.span(id).start);
            self.nodes[parent.index()].kind.swap_child(id, hole);
            self.nodes[hole.index()].parent = Some(parent);
        }
        self.nodes[id.index()].parent = None;
        Ok(())
    }

    /// Put detached `new` in the slot of `parent` that holds `old`; `old`
    /// ends up detached.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        self.check_unprotected(parent)?;
        let new_node = self.get(new).ok_or(TreeError::UnknownNode(new))?;
        if let Some(existing) = new_node.parent {
            return Err(TreeError::AlreadyAttached {
                child: new,
                parent: existing,
            });
        }
        self.get(old).ok_or(TreeError::UnknownNode(old))?;
        if self.is_ancestor_or_self(new, parent) {
            return Err(TreeError::Cycle { child: new, parent });
        }
        if !self.nodes[parent.index()].kind.swap_child(old, new) {
            return Err(TreeError::NotAChild { child: old, parent });
        }
        self.nodes[old.index()].parent = None;
        self.nodes[new.index()].parent = Some(parent);
        Ok(())
    }

    /// Remove `child` from an optional or list slot of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_unprotected(parent)?;
        self.get(child).ok_or(TreeError::UnknownNode(child))?;
        match self.nodes[parent.index()].kind.take_child(child) {
            Some(Ok(())) => {
                self.nodes[child.index()].parent = None;
                Ok(())
            }
            Some(Err(())) => Err(TreeError::MandatoryChild { child, parent }),
            None => Err(TreeError::NotAChild { child, parent }),
        }
    }

    /// Node ids reachable from the root, in pre-order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}
