//! Emission context: what every emitter may consult while walking the AST.

use std::collections::{HashMap, HashSet};

use tern_types::ast::{CompilationUnit, Decl, ElseBranch, Expr, ExprKind, IfStmt, JumpKind, Stmt, StructDecl, TypeExpr};
use tern_types::{IdMap, Ident, Span, MAX_BODY_DEPTH, MAX_EXPR_DEPTH};

use crate::config::CodegenOptions;
use crate::error::{CodegenError, CodegenResult};
use crate::names::{Names, EXIT_LABEL};
use crate::status::StatusTable;

// ══════════════════════════════════════════════════════════════════════════════
// UnitContext
// ══════════════════════════════════════════════════════════════════════════════

/// Read-only facts about the whole unit, built once per generation.
pub struct UnitContext<'a> {
    pub names: Names<'a>,
    pub statuses: StatusTable,
    /// Struct declarations by name, for receiver checks.
    pub structs: HashMap<Ident, &'a StructDecl>,
    pub version: u32,
}

impl<'a> UnitContext<'a> {
    pub fn new(
        unit: &'a CompilationUnit,
        ids: &'a IdMap,
        options: &CodegenOptions,
    ) -> CodegenResult<Self> {
        options.validate()?;
        check_idents(unit, ids)?;
        let names = Names::new(options, ids);
        let statuses = StatusTable::new(unit, &names)?;

        let mut structs = HashMap::new();
        for s in unit.structs() {
            if structs.insert(s.name, s).is_some() {
                return Err(CodegenError::invalid(
                    format!("struct {:?} is declared twice", names.ident(s.name)),
                    s.span,
                ));
            }
        }
        check_c_names(unit, &names, &statuses)?;

        Ok(Self {
            names,
            statuses,
            structs,
            version: options.version,
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Unit checks
// ══════════════════════════════════════════════════════════════════════════════

/// Every identifier the unit mentions must be interned in `ids`, and no
/// parameter or local may take a built-in name.
///
/// Bodies and expressions deeper than the emitters allow are not walked
/// here; emission reports them.
fn check_idents(unit: &CompilationUnit, ids: &IdMap) -> CodegenResult<()> {
    let walk = IdentWalk { ids };
    for decl in unit.decls() {
        match decl {
            Decl::Struct(s) => {
                walk.known(s.name, s.span)?;
                for field in &s.fields {
                    walk.known(field.name, field.span)?;
                    walk.ty(&field.ty, field.span)?;
                    if let Some(default) = &field.default {
                        walk.expr(default, 0)?;
                    }
                }
            }
            Decl::Func(f) => {
                walk.known(f.name, f.span)?;
                if let Some(receiver) = f.receiver {
                    walk.known(receiver, f.span)?;
                }
                for p in &f.params {
                    walk.declared(p.name, f.span)?;
                    walk.ty(&p.ty, f.span)?;
                }
                walk.body(&f.body, 0)?;
            }
            Decl::Status(s) => walk.known(s.name, s.span)?,
        }
    }
    Ok(())
}

struct IdentWalk<'a> {
    ids: &'a IdMap,
}

impl IdentWalk<'_> {
    fn known(&self, id: Ident, span: Span) -> CodegenResult<()> {
        if self.ids.contains(id) {
            Ok(())
        } else {
            Err(CodegenError::invalid(format!("unknown identifier {id}"), span))
        }
    }

    /// A name the unit introduces for a parameter or local.
    fn declared(&self, id: Ident, span: Span) -> CodegenResult<()> {
        self.known(id, span)?;
        if id.is_builtin() {
            return Err(CodegenError::invalid(
                format!("{:?} is a reserved name", self.ids.name(id)),
                span,
            ));
        }
        Ok(())
    }

    fn ty(&self, ty: &TypeExpr, span: Span) -> CodegenResult<()> {
        match ty {
            TypeExpr::Named(name) => self.known(*name, span),
            TypeExpr::Qualified { package, name } => {
                self.known(*package, span)?;
                self.known(*name, span)
            }
            TypeExpr::Array { len, elem } => {
                self.expr(len, 0)?;
                self.ty(elem, span)
            }
            TypeExpr::Pointer(elem) => self.ty(elem, span),
        }
    }

    fn body(&self, body: &[Stmt], depth: u32) -> CodegenResult<()> {
        if depth > MAX_BODY_DEPTH {
            return Ok(());
        }
        for stmt in body {
            match stmt {
                Stmt::Assert(s) => self.expr(&s.condition, 0)?,
                Stmt::Assign(s) => {
                    self.expr(&s.lhs, 0)?;
                    self.expr(&s.rhs, 0)?;
                }
                Stmt::If(s) => self.if_stmt(s, depth)?,
                Stmt::Jump(j) => {
                    if let Some(label) = j.label {
                        self.known(label, stmt.span())?;
                    }
                }
                Stmt::Return(r) => {
                    if let Some(value) = &r.value {
                        self.expr(value, 0)?;
                    }
                }
                Stmt::Var(v) => {
                    self.declared(v.name, v.span)?;
                    self.ty(&v.ty, v.span)?;
                    if let Some(value) = &v.value {
                        self.expr(value, 0)?;
                    }
                }
                Stmt::While(w) => {
                    if let Some(label) = w.label {
                        self.known(label, stmt.span())?;
                    }
                    self.expr(&w.condition, 0)?;
                    self.body(&w.body, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn if_stmt(&self, s: &IfStmt, depth: u32) -> CodegenResult<()> {
        self.expr(&s.condition, 0)?;
        self.body(&s.then_body, depth + 1)?;
        match &s.else_branch {
            None => Ok(()),
            Some(ElseBranch::Block(body)) => self.body(body, depth + 1),
            Some(ElseBranch::ElseIf(nested)) if depth < MAX_BODY_DEPTH => self.if_stmt(nested, depth + 1),
            Some(ElseBranch::ElseIf(_)) => Ok(()),
        }
    }

    fn expr(&self, expr: &Expr, depth: u32) -> CodegenResult<()> {
        if depth > MAX_EXPR_DEPTH {
            return Ok(());
        }
        let depth = depth + 1;
        match &expr.kind {
            ExprKind::Literal => Ok(()),
            ExprKind::Ident(id) | ExprKind::Status(id) => self.known(*id, expr.span),
            ExprKind::Dot { base, field } => {
                self.expr(base, depth)?;
                self.known(*field, expr.span)
            }
            ExprKind::Call {
                func,
                receiver,
                args,
            } => {
                if let Some(r) = func.receiver_type {
                    self.known(r, expr.span)?;
                }
                self.known(func.name, expr.span)?;
                if let Some(receiver) = receiver {
                    self.expr(receiver, depth)?;
                }
                args.iter().try_for_each(|a| self.expr(a, depth))
            }
            ExprKind::Index { base, index } => {
                self.expr(base, depth)?;
                self.expr(index, depth)
            }
            ExprKind::Slice { base, low, high } => {
                self.expr(base, depth)?;
                for bound in [low, high].into_iter().flatten() {
                    self.expr(bound, depth)?;
                }
                Ok(())
            }
            ExprKind::Unary { operand, .. } => self.expr(operand, depth),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs, depth)?;
                self.expr(rhs, depth)
            }
            ExprKind::Associative { operands, .. } => operands.iter().try_for_each(|o| self.expr(o, depth)),
        }
    }
}

/// No two declarations may produce the same C identifier. A free function
/// `decoder_decode` and a method `decoder.decode` both want
/// `<prefix>_<unit>_decoder_decode`.
fn check_c_names(unit: &CompilationUnit, names: &Names<'_>, statuses: &StatusTable) -> CodegenResult<()> {
    let mut taken: HashSet<String> = statuses.entries().iter().map(|e| e.c_name(names)).collect();
    taken.insert(names.status_type());

    for decl in unit.decls() {
        let emitted = match decl {
            Decl::Struct(s) if s.suspendible => vec![
                names.struct_type(s.name),
                names.constructor(s.name),
                names.destructor(s.name),
            ],
            Decl::Struct(s) => vec![names.struct_type(s.name)],
            Decl::Func(f) => vec![names.func(f.receiver, f.name)],
            // Already in the status table.
            Decl::Status(_) => continue,
        };
        for c_name in emitted {
            if !taken.insert(c_name.clone()) {
                return Err(CodegenError::invalid(
                    format!("C name {c_name} is declared twice"),
                    decl.span(),
                ));
            }
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// FuncContext
// ══════════════════════════════════════════════════════════════════════════════

/// An enclosing `while` loop.
#[derive(Debug, Clone)]
pub struct LoopFrame {
    pub label: Option<Ident>,
    /// Position of this loop among the function's loops, for unique labels.
    pub ordinal: usize,
    /// Whether a jump reached this loop's break point through `goto`.
    pub break_targeted: bool,
    /// Whether a jump reached this loop's continue point through `goto`.
    pub continue_targeted: bool,
}

/// Per-function state for the statement emitter.
pub struct FuncContext<'u, 'a> {
    pub unit: &'u UnitContext<'a>,
    /// Returns route through the status variable and the exit label.
    pub suspendible: bool,
    loops: Vec<LoopFrame>,
    loop_count: usize,
    exit_used: bool,
}

impl<'u, 'a> FuncContext<'u, 'a> {
    pub fn new(unit: &'u UnitContext<'a>, suspendible: bool) -> Self {
        Self {
            unit,
            suspendible,
            loops: Vec::new(),
            loop_count: 0,
            exit_used: false,
        }
    }

    pub fn names(&self) -> &Names<'a> {
        &self.unit.names
    }

    /// Enter a loop.
    pub fn push_loop(&mut self, label: Option<Ident>) {
        self.loops.push(LoopFrame {
            label,
            ordinal: self.loop_count,
            break_targeted: false,
            continue_targeted: false,
        });
        self.loop_count += 1;
    }

    /// Leave the innermost loop, returning what its body's jumps required.
    pub fn pop_loop(&mut self) -> Option<LoopFrame> {
        self.loops.pop()
    }

    /// The C label for a loop's break or continue point.
    pub fn loop_label(&self, frame: &LoopFrame, kind: JumpKind) -> String {
        let name = frame
            .label
            .map(|l| self.names().ident(l).into_owned())
            .unwrap_or_default();
        let point = match kind {
            JumpKind::Break => "break",
            JumpKind::Continue => "continue",
        };
        format!("label_{name}_{}_{point}", frame.ordinal)
    }

    /// The C statement for a jump. The innermost loop is reached with a
    /// plain `break`/`continue`; outer loops need a `goto`.
    pub fn jump(&mut self, kind: JumpKind, label: Option<Ident>, span: Span) -> CodegenResult<String> {
        let index = match label {
            None => self.loops.len().checked_sub(1),
            Some(l) => self.loops.iter().rposition(|f| f.label == Some(l)),
        };
        let Some(index) = index else {
            let reason = match label {
                Some(l) => format!("no enclosing loop is labeled {:?}", self.names().ident(l)),
                None => "jump outside of a loop".to_string(),
            };
            return Err(CodegenError::invalid(reason, span));
        };

        if index + 1 == self.loops.len() {
            return Ok(match kind {
                JumpKind::Break => "break;".to_string(),
                JumpKind::Continue => "continue;".to_string(),
            });
        }

        let frame = &mut self.loops[index];
        match kind {
            JumpKind::Break => frame.break_targeted = true,
            JumpKind::Continue => frame.continue_targeted = true,
        }
        let frame = frame.clone();
        Ok(format!("goto {};", self.loop_label(&frame, kind)))
    }

    /// `goto exit;`, recording that the exit label must be emitted.
    pub fn goto_exit(&mut self) -> String {
        self.exit_used = true;
        format!("goto {EXIT_LABEL};")
    }

    pub fn exit_used(&self) -> bool {
        self.exit_used
    }
}
