// ast.rs
//
// Node shapes consumed by the semantic core. The parser producing these nodes
// is an external collaborator; from the core's perspective every node is a
// read-only reference whose span is retained for diagnostics.

use std::rc::Rc;

use stave_identity::{is_library_path, Span};

use crate::flags::CommonFlags;

/// An identifier as written in source.
#[derive(Debug, Clone)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

impl Ident {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct Source {
    /// Normalized path without extension, e.g. `src/main` or `~lib/array`.
    pub normalized_path: String,
    /// Whether this source is a module entry point.
    pub is_entry: bool,
    /// Whether this source belongs to the standard library (`~lib/` prefix).
    pub is_library: bool,
    pub statements: Vec<Statement>,
}

impl Source {
    pub fn new(normalized_path: impl Into<String>, is_entry: bool, statements: Vec<Statement>) -> Self {
        let normalized_path = normalized_path.into();
        let is_library = is_library_path(&normalized_path);
        Self {
            normalized_path,
            is_entry,
            is_library,
            statements,
        }
    }
}

/// Top-level statements the core dispatches on. Interfaces reuse the class
/// declaration shape; the variant is the discriminator.
#[derive(Debug, Clone)]
pub enum Statement {
    Class(Rc<ClassDeclaration>),
    Interface(Rc<ClassDeclaration>),
    Function(Rc<FunctionDeclaration>),
    Enum(Rc<EnumDeclaration>),
    Namespace(Rc<NamespaceDeclaration>),
    TypeAlias(Rc<TypeDeclaration>),
    Variable(Rc<VariableStatement>),
    Import(Rc<ImportStatement>),
    Export(Rc<ExportStatement>),
}

/// Type parameter declaration: `T`
#[derive(Debug, Clone)]
pub struct TypeParameterNode {
    pub name: Ident,
    pub span: Span,
}

/// Class or interface declaration.
#[derive(Debug, Clone)]
pub struct ClassDeclaration {
    pub name: Ident,
    pub type_parameters: Vec<TypeParameterNode>,
    pub extends_type: Option<TypeNode>,
    pub implements_types: Vec<TypeNode>,
    pub members: Vec<ClassMember>,
    pub flags: CommonFlags,
    pub decorators: Vec<DecoratorNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Field(Rc<FieldDeclaration>),
    /// Methods, accessors and constructors; discriminated by flags
    /// (`STATIC`, `GET`, `SET`, `CONSTRUCTOR`).
    Method(Rc<FunctionDeclaration>),
}

#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: Ident,
    pub ty: Option<TypeNode>,
    pub initializer: Option<Expression>,
    pub flags: CommonFlags,
    pub decorators: Vec<DecoratorNode>,
    pub span: Span,
}

/// Free function or method declaration. Bodies are opaque to the core and
/// therefore not represented.
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: Ident,
    pub type_parameters: Vec<TypeParameterNode>,
    pub signature: SignatureNode,
    pub flags: CommonFlags,
    pub decorators: Vec<DecoratorNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumDeclaration {
    pub name: Ident,
    pub values: Vec<EnumValueDeclaration>,
    pub flags: CommonFlags,
    pub decorators: Vec<DecoratorNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumValueDeclaration {
    pub name: Ident,
    pub initializer: Option<Expression>,
    pub span: Span,
}

/// Namespace declaration; multiple declarations with the same internal name
/// merge into one element.
#[derive(Debug, Clone)]
pub struct NamespaceDeclaration {
    pub name: Ident,
    pub members: Vec<Statement>,
    pub flags: CommonFlags,
    pub span: Span,
}

/// Type alias declaration: `type T<…> = …`
#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    pub name: Ident,
    pub type_parameters: Vec<TypeParameterNode>,
    pub alias: TypeNode,
    pub flags: CommonFlags,
    pub span: Span,
}

/// A `const`/`let` statement with one or more declarators.
#[derive(Debug, Clone)]
pub struct VariableStatement {
    pub declarations: Vec<Rc<VariableDeclaration>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub name: Ident,
    pub ty: Option<TypeNode>,
    pub initializer: Option<Expression>,
    pub flags: CommonFlags,
    pub decorators: Vec<DecoratorNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportStatement {
    /// `import { a, b as c } from "..."`; `None` for side-effect imports.
    pub declarations: Option<Vec<Rc<ImportDeclaration>>>,
    /// `import * as N from "..."` (unsupported by the core).
    pub namespace_name: Option<Ident>,
    /// Normalized path of the imported source.
    pub internal_path: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportDeclaration {
    /// Local name the import binds in the importing file.
    pub name: Ident,
    /// Name of the member in the exporting file.
    pub external_name: Ident,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExportStatement {
    pub members: Vec<ExportMember>,
    /// `export { x } from "..."`; marks a re-export when present.
    pub internal_path: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExportMember {
    pub local_name: Ident,
    pub exported_name: Ident,
    pub span: Span,
}

/// Decorator annotation, e.g. `@operator("+")`.
#[derive(Debug, Clone)]
pub struct DecoratorNode {
    pub name: Ident,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoratorKind {
    Global,
    Operator,
    Sealed,
    Unmanaged,
    Inline,
    Custom,
}

impl DecoratorNode {
    pub fn kind(&self) -> DecoratorKind {
        match self.name.text.as_str() {
            "global" => DecoratorKind::Global,
            "operator" => DecoratorKind::Operator,
            "sealed" => DecoratorKind::Sealed,
            "unmanaged" => DecoratorKind::Unmanaged,
            "inline" => DecoratorKind::Inline,
            _ => DecoratorKind::Custom,
        }
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone)]
pub enum TypeNode {
    Named(NamedTypeNode),
    Function(Box<SignatureNode>),
}

impl TypeNode {
    pub fn span(&self) -> Span {
        match self {
            TypeNode::Named(n) => n.span,
            TypeNode::Function(s) => s.span,
        }
    }

    /// Convenience constructor for a plain named type without arguments.
    pub fn named(name: impl Into<String>, span: Span) -> TypeNode {
        TypeNode::Named(NamedTypeNode {
            name: Ident::new(name, span),
            type_arguments: Vec::new(),
            nullable: false,
            span,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NamedTypeNode {
    pub name: Ident,
    pub type_arguments: Vec<TypeNode>,
    pub nullable: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SignatureNode {
    pub parameters: Vec<ParameterNode>,
    pub return_type: Option<TypeNode>,
    pub explicit_this_type: Option<TypeNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParameterNode {
    pub name: Ident,
    pub ty: TypeNode,
    /// Default value; parameters with defaults are optional.
    pub initializer: Option<Expression>,
    pub is_rest: bool,
    pub span: Span,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone)]
pub enum Expression {
    Identifier(IdentifierExpression),
    This(Span),
    Super(Span),
    Parenthesized(ParenthesizedExpression),
    Assertion(AssertionExpression),
    PropertyAccess(PropertyAccessExpression),
    ElementAccess(ElementAccessExpression),
    Call(CallExpression),
    StringLiteral(StringLiteralExpression),
    IntegerLiteral(IntegerLiteralExpression),
    FloatLiteral(FloatLiteralExpression),
    Binary(BinaryExpression),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Identifier(e) => e.span,
            Expression::This(span) | Expression::Super(span) => *span,
            Expression::Parenthesized(e) => e.span,
            Expression::Assertion(e) => e.span,
            Expression::PropertyAccess(e) => e.span,
            Expression::ElementAccess(e) => e.span,
            Expression::Call(e) => e.span,
            Expression::StringLiteral(e) => e.span,
            Expression::IntegerLiteral(e) => e.span,
            Expression::FloatLiteral(e) => e.span,
            Expression::Binary(e) => e.span,
        }
    }

    pub fn identifier(name: impl Into<String>, span: Span) -> Expression {
        Expression::Identifier(IdentifierExpression {
            name: name.into(),
            span,
        })
    }
}

#[derive(Debug, Clone)]
pub struct IdentifierExpression {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParenthesizedExpression {
    pub expression: Box<Expression>,
    pub span: Span,
}

/// `expr as T`
#[derive(Debug, Clone)]
pub struct AssertionExpression {
    pub expression: Box<Expression>,
    pub to_type: TypeNode,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PropertyAccessExpression {
    pub expression: Box<Expression>,
    pub property: Ident,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ElementAccessExpression {
    pub expression: Box<Expression>,
    pub element: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub expression: Box<Expression>,
    pub type_arguments: Vec<TypeNode>,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StringLiteralExpression {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IntegerLiteralExpression {
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FloatLiteralExpression {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}
