//! AST node types consumed by the backend.
//!
//! The front end builds this tree once, after type and bounds checking, and
//! the backend only ever borrows it. Declarations, statements and expressions
//! carry a [`Span`] for error reporting. Order of every `Vec` is source order.

use serde::{Deserialize, Serialize};

use crate::ident::{IdMap, Ident};
use crate::ops::{AssignOp, AssocOp, BinaryOp, UnaryOp};
use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Compilation Unit
// ══════════════════════════════════════════════════════════════════════════════

/// Everything generated into one pair of C artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub files: Vec<File>,
}

impl CompilationUnit {
    pub fn new(files: Vec<File>) -> Self {
        Self { files }
    }

    /// All top-level declarations, file by file, in source order.
    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.files.iter().flat_map(|f| f.decls.iter())
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructDecl> {
        self.decls().filter_map(|d| match d {
            Decl::Struct(s) => Some(s),
            _ => None,
        })
    }

    pub fn funcs(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls().filter_map(|d| match d {
            Decl::Func(f) => Some(f),
            _ => None,
        })
    }

    pub fn statuses(&self) -> impl Iterator<Item = &StatusDecl> {
        self.decls().filter_map(|d| match d {
            Decl::Status(s) => Some(s),
            _ => None,
        })
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a unit handed over by the front end.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One source file's top-level declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub decls: Vec<Decl>,
}

impl File {
    pub fn new(name: impl Into<String>, decls: Vec<Decl>) -> Self {
        Self {
            name: name.into(),
            decls,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Declarations
// ══════════════════════════════════════════════════════════════════════════════

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Struct(StructDecl),
    Func(FuncDecl),
    /// A unit-specific status code. Status codes are always public: they
    /// share one enumeration in the interface artifact.
    Status(StatusDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Struct(s) => s.span,
            Decl::Func(f) => f.span,
            Decl::Status(s) => s.span,
        }
    }
}

/// `struct Name? (fields...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: Ident,
    pub public: bool,
    /// Instances carry resumable-execution state (hidden status and guard).
    pub suspendible: bool,
    pub fields: Vec<Field>,
    pub span: Span,
}

/// A struct field: `name type = default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: Ident,
    pub ty: TypeExpr,
    /// Default value; the front end has constant-folded it.
    pub default: Option<Expr>,
    pub span: Span,
}

impl Field {
    pub fn new(name: Ident, ty: TypeExpr) -> Self {
        Self {
            name,
            ty,
            default: None,
            span: Span::default(),
        }
    }

    pub fn with_default(mut self, value: Expr) -> Self {
        self.default = Some(value);
        self
    }
}

/// `func Receiver.name?(params) { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: Ident,
    /// The receiver struct's name for bound methods.
    pub receiver: Option<Ident>,
    pub public: bool,
    pub suspendible: bool,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
}

/// Whether a status code is a sticky error or a recoverable suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Error,
    Suspension,
}

/// `error "name"` or `suspension "name"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDecl {
    pub name: Ident,
    pub kind: StatusKind,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Types
// ══════════════════════════════════════════════════════════════════════════════

/// A type expression: a chain of qualifier nodes ending in a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// A bare type name (`u8`, `bool`, a struct name).
    Named(Ident),
    /// A package-qualified name: `pkg.name`.
    Qualified { package: Ident, name: Ident },
    /// `[len] elem`. The length is a compile-time constant.
    Array { len: Box<Expr>, elem: Box<TypeExpr> },
    /// `ptr elem`
    Pointer(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn array(len: i128, elem: TypeExpr) -> Self {
        TypeExpr::Array {
            len: Box::new(Expr::int(len)),
            elem: Box::new(elem),
        }
    }

    /// DSL spelling of the type, e.g. `[4] u8` or `ptr base.buf`.
    pub fn display(&self, ids: &IdMap) -> String {
        let mut out = String::new();
        let mut node = self;
        loop {
            match node {
                TypeExpr::Named(name) => {
                    out.push_str(&ids.name(*name));
                    return out;
                }
                TypeExpr::Qualified { package, name } => {
                    out.push_str(&ids.name(*package));
                    out.push('.');
                    out.push_str(&ids.name(*name));
                    return out;
                }
                TypeExpr::Array { len, elem } => {
                    match len.const_value {
                        Some(ConstValue::Int(n)) => out.push_str(&format!("[{n}] ")),
                        _ => out.push_str("[?] "),
                    }
                    node = elem;
                }
                TypeExpr::Pointer(elem) => {
                    out.push_str("ptr ");
                    node = elem;
                }
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// A statement in a function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `assert cond` — discharged by the verifier at compile time.
    Assert(AssertStmt),
    /// `lhs op rhs`
    Assign(AssignStmt),
    /// `if cond { ... } [else ...]`
    If(IfStmt),
    /// `break [label]` / `continue [label]`
    Jump(JumpStmt),
    /// `return [value]`
    Return(ReturnStmt),
    /// `var name type [= value]`
    Var(VarStmt),
    /// `while[.label] cond { ... }`
    While(WhileStmt),
}

impl Stmt {
    /// Short name of the statement kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Assert(_) => "assert",
            Stmt::Assign(_) => "assignment",
            Stmt::If(_) => "if",
            Stmt::Jump(j) => match j.kind {
                JumpKind::Break => "break",
                JumpKind::Continue => "continue",
            },
            Stmt::Return(_) => "return",
            Stmt::Var(_) => "var",
            Stmt::While(_) => "while",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Assert(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::Jump(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Var(s) => s.span,
            Stmt::While(s) => s.span,
        }
    }

    pub fn assign(lhs: Expr, op: AssignOp, rhs: Expr) -> Self {
        Stmt::Assign(AssignStmt {
            lhs,
            op,
            rhs,
            span: Span::default(),
        })
    }

    pub fn var(name: Ident, ty: TypeExpr, value: Option<Expr>) -> Self {
        Stmt::Var(VarStmt {
            name,
            ty,
            value,
            span: Span::default(),
        })
    }

    pub fn while_loop(label: Option<Ident>, condition: Expr, body: Vec<Stmt>) -> Self {
        Stmt::While(WhileStmt {
            label,
            condition,
            body,
            span: Span::default(),
        })
    }

    pub fn if_else(condition: Expr, then_body: Vec<Stmt>, else_branch: Option<ElseBranch>) -> Self {
        Stmt::If(IfStmt {
            condition,
            then_body,
            else_branch,
            span: Span::default(),
        })
    }

    pub fn jump(kind: JumpKind, label: Option<Ident>) -> Self {
        Stmt::Jump(JumpStmt {
            kind,
            label,
            span: Span::default(),
        })
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return(ReturnStmt {
            value,
            span: Span::default(),
        })
    }

    pub fn assert(condition: Expr) -> Self {
        Stmt::Assert(AssertStmt {
            condition,
            span: Span::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertStmt {
    pub condition: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub lhs: Expr,
    pub op: AssignOp,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_body: Vec<Stmt>,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

/// The else branch of an if statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElseBranch {
    /// `else if cond { ... }`
    ElseIf(Box<IfStmt>),
    /// `else { ... }`
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpKind {
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpStmt {
    pub kind: JumpKind,
    /// The target loop's label; `None` targets the innermost loop.
    pub label: Option<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarStmt {
    pub name: Ident,
    pub ty: TypeExpr,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub label: Option<Ident>,
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// A constant value computed by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstValue {
    Int(i128),
    Bool(bool),
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    /// Set when the front end folded this expression to a constant.
    pub const_value: Option<ConstValue>,
    pub span: Span,
}

/// The callee of a call expression, resolved by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncRef {
    /// Receiver struct for method calls.
    pub receiver_type: Option<Ident>,
    pub name: Ident,
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    // ── Other ──
    /// A literal token; its value is always in `const_value`.
    Literal,
    /// A local, parameter, or `this`.
    Ident(Ident),
    /// `base.field`
    Dot { base: Box<Expr>, field: Ident },
    /// `receiver.func(args...)` or `func(args...)`
    Call {
        func: FuncRef,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
    /// `base[index]`
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `base[low:high]`
    Slice {
        base: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
    },
    /// A status code by name: `status "short_src"`.
    Status(Ident),

    // ── Operators ──
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Associative { op: AssocOp, operands: Vec<Expr> },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            const_value: None,
            span,
        }
    }

    /// Attach a folded constant.
    pub fn with_const(mut self, value: ConstValue) -> Self {
        self.const_value = Some(value);
        self
    }

    pub fn int(value: i128) -> Self {
        Self::new(ExprKind::Literal, Span::default()).with_const(ConstValue::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Literal, Span::default()).with_const(ConstValue::Bool(value))
    }

    pub fn ident(id: Ident) -> Self {
        Self::new(ExprKind::Ident(id), Span::default())
    }

    pub fn this() -> Self {
        Self::ident(Ident::THIS)
    }

    pub fn dot(base: Expr, field: Ident) -> Self {
        Self::new(
            ExprKind::Dot {
                base: Box::new(base),
                field,
            },
            Span::default(),
        )
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        Self::new(
            ExprKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            Span::default(),
        )
    }

    pub fn status(name: Ident) -> Self {
        Self::new(ExprKind::Status(name), Span::default())
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            Span::default(),
        )
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Span::default(),
        )
    }

    pub fn associative(op: AssocOp, operands: Vec<Expr>) -> Self {
        Self::new(ExprKind::Associative { op, operands }, Span::default())
    }

    pub fn call(func: FuncRef, receiver: Option<Expr>, args: Vec<Expr>) -> Self {
        Self::new(
            ExprKind::Call {
                func,
                receiver: receiver.map(Box::new),
                args,
            },
            Span::default(),
        )
    }

    /// Short name of the expression form, for error messages.
    pub fn form_name(&self) -> &'static str {
        match self.kind {
            ExprKind::Literal => "literal",
            ExprKind::Ident(_) => "identifier",
            ExprKind::Dot { .. } => "field selection",
            ExprKind::Call { .. } => "call",
            ExprKind::Index { .. } => "index",
            ExprKind::Slice { .. } => "slice",
            ExprKind::Status(_) => "status",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Associative { .. } => "associative",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_and_kind_names() {
        assert_eq!(Expr::this().form_name(), "identifier");
        assert_eq!(
            Expr::associative(AssocOp::Plus, vec![Expr::int(1), Expr::int(2)]).form_name(),
            "associative"
        );
        assert_eq!(Stmt::jump(JumpKind::Continue, None).kind_name(), "continue");
        let mut ret = Stmt::ret(None);
        if let Stmt::Return(r) = &mut ret {
            r.span = Span::point(4, 2);
        }
        assert_eq!(ret.kind_name(), "return");
        assert_eq!(ret.span(), Span::point(4, 2));
    }

    #[test]
    fn test_type_display() {
        let mut ids = IdMap::new();
        let base = ids.intern("base");
        let buf = ids.intern("buf");
        let nested = TypeExpr::array(4, TypeExpr::array(8, TypeExpr::Named(Ident::U8)));
        assert_eq!(nested.display(&ids), "[4] [8] u8");
        let ptr = TypeExpr::Pointer(Box::new(TypeExpr::Qualified {
            package: base,
            name: buf,
        }));
        assert_eq!(ptr.display(&ids), "ptr base.buf");
    }

    #[test]
    fn test_unit_iterators_preserve_order() {
        let mut ids = IdMap::new();
        let a = ids.intern("a");
        let b = ids.intern("b");
        let s = |name| {
            Decl::Struct(StructDecl {
                name,
                public: true,
                suspendible: false,
                fields: vec![],
                span: Span::default(),
            })
        };
        let unit = CompilationUnit::new(vec![
            File::new("one.tern", vec![s(a)]),
            File::new("two.tern", vec![s(b)]),
        ]);
        let names: Vec<Ident> = unit.structs().map(|s| s.name).collect();
        assert_eq!(names, vec![a, b]);
        assert_eq!(unit.funcs().count(), 0);
    }

    #[test]
    fn test_unit_json_round_trip() {
        let mut ids = IdMap::new();
        let x = ids.intern("x");
        let func = FuncDecl {
            name: ids.intern("step"),
            receiver: None,
            public: true,
            suspendible: false,
            params: vec![],
            body: vec![Stmt::assign(
                Expr::ident(x),
                AssignOp::PlusEq,
                Expr::int(1),
            )],
            span: Span::point(3, 1),
        };
        let unit = CompilationUnit::new(vec![File::new("a.tern", vec![Decl::Func(func)])]);
        let json = unit.to_json().unwrap();
        let back = CompilationUnit::from_json(&json).unwrap();
        assert_eq!(back, unit);
    }
}
