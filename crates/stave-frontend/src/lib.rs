//! Stave frontend contract: the AST node shapes the semantic core consumes.
//!
//! The lexer and parser live outside this workspace; what the core depends on
//! is the shape of parsed sources, declarations, expressions and type nodes,
//! plus the modifier flags the parser computes from keywords.

pub mod ast;
pub mod flags;

pub use ast::{
    AssertionExpression, BinaryExpression, BinaryOp, CallExpression, ClassDeclaration, ClassMember,
    DecoratorKind, DecoratorNode, ElementAccessExpression, EnumDeclaration, EnumValueDeclaration,
    ExportMember, ExportStatement, Expression, FieldDeclaration, FloatLiteralExpression,
    FunctionDeclaration, Ident, IdentifierExpression, ImportDeclaration, ImportStatement,
    IntegerLiteralExpression, NamedTypeNode, NamespaceDeclaration, ParameterNode,
    ParenthesizedExpression, PropertyAccessExpression, Source, Statement, StringLiteralExpression,
    SignatureNode, TypeDeclaration, TypeNode, TypeParameterNode, VariableDeclaration,
    VariableStatement,
};
pub use flags::CommonFlags;
pub use stave_identity::Span;
