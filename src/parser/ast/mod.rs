//! The stable AST: source text lexes and parses into these nodes, and
//! nothing past the parser boundary ever looks at source text again.
//! Every node carries a [`Location`] for diagnostics; nodes are cheap to
//! clone (`Rc`-backed bodies) since the interpreter holds onto method and
//! block bodies for the lifetime of the object that owns them.

mod print;

pub use print::{format_program, format_statement};

use crate::lexer::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub location: Location,
}

impl Identifier {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self { name: name.into(), location }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Declaration(Declaration),
    Expression(Expression),
    Return(ReturnStatement),
}

impl Statement {
    pub fn location(&self) -> Location {
        match self {
            Statement::Declaration(d) => d.location(),
            Statement::Expression(e) => e.location(),
            Statement::Return(r) => r.location,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum Declaration {
    Dialect(DialectDecl),
    Import(ImportDecl),
    Def(DefDecl),
    Var(VarDecl),
    TypeDecl(TypeDecl),
    Method(MethodDecl),
    Class(ClassDecl),
}

impl Declaration {
    pub fn location(&self) -> Location {
        match self {
            Declaration::Dialect(d) => d.location,
            Declaration::Import(d) => d.location,
            Declaration::Def(d) => d.location,
            Declaration::Var(d) => d.location,
            Declaration::TypeDecl(d) => d.location,
            Declaration::Method(d) => d.location,
            Declaration::Class(d) => d.location,
        }
    }
}

/// `dialect "path"` — replaces the implicit prelude import for the rest of
/// the enclosing module (spec.md §4.1 "Dialects").
#[derive(Debug, Clone)]
pub struct DialectDecl {
    pub path: String,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: String,
    /// Empty means "bind the module object itself under its last path
    /// component"; non-empty names a destructured subset of its exports.
    pub names: Vec<Identifier>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct DefDecl {
    pub name: Identifier,
    pub pattern: Option<Expression>,
    pub value: Expression,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Identifier,
    pub pattern: Option<Expression>,
    pub value: Option<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: Identifier,
    pub value: Expression,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub signature: Signature,
    pub body: Vec<Statement>,
    pub is_override: bool,
    pub confidential: bool,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Identifier,
    pub constructor_signature: Option<Signature>,
    pub body: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Identifier,
    pub pattern: Option<Expression>,
    pub is_var_arg: bool,
}

#[derive(Debug, Clone)]
pub struct SignaturePart {
    pub name: String,
    pub generics: Vec<Identifier>,
    pub params: Vec<Parameter>,
    pub is_operator: bool,
    pub is_prefix: bool,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub parts: Vec<SignaturePart>,
    pub is_assignment: bool,
    pub return_pattern: Option<Expression>,
    pub location: Location,
}

/// One part of a request in call position — a name plus its argument
/// expressions (empty for a getter-shaped part).
#[derive(Debug, Clone)]
pub struct RequestPart {
    pub name: String,
    pub generics: Vec<Expression>,
    pub args: Vec<Expression>,
    pub has_params: bool,
    /// Set for a binary or prefix operator send (`a + b`, `-a`) so uglification
    /// picks the operator's canonical key rather than treating the symbol as a
    /// plain part name.
    pub is_operator: bool,
    pub is_prefix: bool,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct InheritsClause {
    pub parent: Box<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ObjectConstructor {
    pub inherits: Option<InheritsClause>,
    pub body: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct BlockExpr {
    pub params: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct TypeLiteral {
    pub name: Option<String>,
    pub signatures: Vec<Signature>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct UnqualifiedRequest {
    pub parts: Vec<RequestPart>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct QualifiedRequest {
    pub receiver: Box<Expression>,
    pub parts: Vec<RequestPart>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct AssignmentExpr {
    /// The left-hand side, restricted by the parser to a bare identifier or
    /// a single-part qualified request — never re-validated here, since the
    /// AST has no notion of "invalid node", only of what source produced.
    pub target: Box<Expression>,
    pub value: Box<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum Expression {
    NumberLiteral { value: f64, location: Location },
    StringLiteral { value: String, location: Location },
    BooleanLiteral { value: bool, location: Location },
    DoneLiteral(Location),
    SelfExpr(Location),
    SuperExpr(Location),
    OuterExpr(Location),
    UnqualifiedRequest(UnqualifiedRequest),
    QualifiedRequest(QualifiedRequest),
    ObjectConstructor(ObjectConstructor),
    Block(BlockExpr),
    TypeLiteral(TypeLiteral),
    Assignment(AssignmentExpr),
}

impl Expression {
    pub fn location(&self) -> Location {
        match self {
            Expression::NumberLiteral { location, .. }
            | Expression::StringLiteral { location, .. }
            | Expression::BooleanLiteral { location, .. } => *location,
            Expression::DoneLiteral(l)
            | Expression::SelfExpr(l)
            | Expression::SuperExpr(l)
            | Expression::OuterExpr(l) => *l,
            Expression::UnqualifiedRequest(r) => r.location,
            Expression::QualifiedRequest(r) => r.location,
            Expression::ObjectConstructor(o) => o.location,
            Expression::Block(b) => b.location,
            Expression::TypeLiteral(t) => t.location,
            Expression::Assignment(a) => a.location,
        }
    }

    /// A bare-name shorthand, the common case of an `UnqualifiedRequest`
    /// with a single argumentless part — what the parser produces for any
    /// lone identifier token.
    pub fn identifier(name: impl Into<String>, location: Location) -> Self {
        Expression::UnqualifiedRequest(UnqualifiedRequest {
            parts: vec![RequestPart {
                name: name.into(),
                generics: Vec::new(),
                args: Vec::new(),
                has_params: false,
                is_operator: false,
                is_prefix: false,
                location,
            }],
            location,
        })
    }

    /// If this expression is exactly a bare identifier, its name.
    pub fn as_bare_identifier(&self) -> Option<&str> {
        match self {
            Expression::UnqualifiedRequest(r) if r.parts.len() == 1 && !r.parts[0].has_params => {
                Some(&r.parts[0].name)
            }
            _ => None,
        }
    }
}
