//! Legitimate terminators per node shape.
//!
//! An Insert landing exactly on a node's last offset either supplies the
//! token that normally closes that shape (the node is merely incomplete) or
//! something else (the node and the enclosing nodes that end with it are
//! unreliable). Shapes absent from the table never take part in boundary
//! attribution. `Invalid` stands for "may end with nothing at all".

use crate::ast::NodeShape;
use crate::token::TokenKind;

use TokenKind as T;

pub fn ending_tokens(shape: NodeShape) -> Option<&'static [TokenKind]> {
    let tokens: &'static [TokenKind] = match shape {
        NodeShape::ArrayAccess | NodeShape::ArrayType => &[T::RBracket],
        NodeShape::Block
        | NodeShape::Initializer
        | NodeShape::SwitchStatement
        | NodeShape::TypeDeclaration => &[T::RBrace],
        NodeShape::BooleanLiteral => &[T::False, T::True],
        NodeShape::BreakStatement
        | NodeShape::ContinueStatement
        | NodeShape::EmptyStatement
        | NodeShape::ExpressionStatement
        | NodeShape::FieldDeclaration
        | NodeShape::ImportDeclaration
        | NodeShape::PackageDeclaration
        | NodeShape::ReturnStatement
        | NodeShape::SingleVariableDeclaration
        | NodeShape::ThrowStatement
        | NodeShape::VariableDeclarationStatement => &[T::Semicolon],
        NodeShape::CharacterLiteral => &[T::CharacterLiteral],
        NodeShape::ClassInstanceCreation => &[T::RBrace, T::RParen],
        NodeShape::DoStatement
        | NodeShape::MethodInvocation
        | NodeShape::ParenthesizedExpression => &[T::RParen],
        NodeShape::MethodDeclaration => &[T::Invalid, T::Semicolon],
        NodeShape::NullLiteral => &[T::Null],
        NodeShape::NumberLiteral => &[
            T::IntegerLiteral,
            T::LongLiteral,
            T::FloatingPointLiteral,
            T::DoubleLiteral,
        ],
        NodeShape::PostfixExpression => &[T::PlusPlus, T::MinusMinus],
        NodeShape::PrimitiveType => &[
            T::Byte,
            T::Short,
            T::Char,
            T::Int,
            T::Long,
            T::Float,
            T::Boolean,
            T::Double,
            T::Void,
        ],
        NodeShape::SimpleName => &[T::Identifier],
        NodeShape::StringLiteral => &[T::StringLiteral],
        NodeShape::SwitchCase => &[T::Colon],
        NodeShape::ThisExpression => &[T::This],
        _ => return None,
    };
    Some(tokens)
}
