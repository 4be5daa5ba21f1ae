//! Statement code generation and local hoisting.
//!
//! Every local of a function is declared once at the top of the body; a
//! `var` statement only assigns. Statements are written one per line and
//! left unindented for the formatter to lay out.

use std::collections::{HashMap, HashSet};

use tern_types::ast::{ElseBranch, IfStmt, JumpKind, Param, ReturnStmt, Stmt, VarStmt, WhileStmt};
use tern_types::{Ident, MAX_BODY_DEPTH};

use crate::context::{FuncContext, UnitContext};
use crate::error::{CodegenError, CodegenResult, DepthKind};
use crate::expr::emit_expr;
use crate::mapper::{assign_op_symbol, is_array, is_bool, target_decl_text};
use crate::names::STATUS_VAR;

fn check_depth(depth: u32) -> CodegenResult<()> {
    if depth > MAX_BODY_DEPTH {
        return Err(CodegenError::DepthExceeded {
            kind: DepthKind::Body,
            limit: MAX_BODY_DEPTH,
        });
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Hoisting
// ══════════════════════════════════════════════════════════════════════════════

/// Every `var` statement in `body`, including those nested in `if` and
/// `while` bodies, in source order.
pub fn collect_locals(body: &[Stmt], depth: u32) -> CodegenResult<Vec<&VarStmt>> {
    let mut locals = Vec::new();
    walk_locals(body, depth, &mut locals)?;
    Ok(locals)
}

fn walk_locals<'s>(body: &'s [Stmt], depth: u32, locals: &mut Vec<&'s VarStmt>) -> CodegenResult<()> {
    check_depth(depth)?;
    for stmt in body {
        match stmt {
            Stmt::Var(v) => locals.push(v),
            Stmt::If(s) => walk_if_locals(s, depth, locals)?,
            Stmt::While(w) => walk_locals(&w.body, depth + 1, locals)?,
            Stmt::Assert(_) | Stmt::Assign(_) | Stmt::Jump(_) | Stmt::Return(_) => {}
        }
    }
    Ok(())
}

fn walk_if_locals<'s>(s: &'s IfStmt, depth: u32, locals: &mut Vec<&'s VarStmt>) -> CodegenResult<()> {
    walk_locals(&s.then_body, depth + 1, locals)?;
    match &s.else_branch {
        None => Ok(()),
        Some(ElseBranch::Block(body)) => walk_locals(body, depth + 1, locals),
        Some(ElseBranch::ElseIf(nested)) => {
            check_depth(depth + 1)?;
            walk_if_locals(nested, depth + 1, locals)
        }
    }
}

/// Write one declaration per distinct local of `body`.
///
/// All locals share the function's top-level scope, so locals of sibling
/// blocks that reuse a name and type share one declaration. Reusing a name
/// with a different type, or the name of a parameter, is rejected.
pub fn hoist_locals(body: &[Stmt], params: &[Param], ctx: &UnitContext<'_>, out: &mut String) -> CodegenResult<()> {
    let locals = collect_locals(body, 0)?;
    let params: HashSet<Ident> = params.iter().map(|p| p.name).collect();
    let mut declared: HashMap<Ident, String> = HashMap::new();
    for local in locals {
        let name = ctx.names.ident(local.name);
        if params.contains(&local.name) {
            return Err(CodegenError::invalid(
                format!("local {name:?} shadows a parameter"),
                local.span,
            ));
        }
        // Compared by spelling; spans inside array lengths may differ.
        let ty = local.ty.display(ctx.names.ids());
        match declared.get(&local.name) {
            Some(first) if *first == ty => continue,
            Some(first) => {
                return Err(CodegenError::invalid(
                    format!("local {name:?} is declared as both {first} and {ty}"),
                    local.span,
                ));
            }
            None => {
                declared.insert(local.name, ty);
            }
        }
        let decl = target_decl_text(&local.ty, &ctx.names.local(local.name), ctx.names.ids())?;
        out.push_str(&decl);
        out.push_str(";\n");
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

pub fn emit_stmts(body: &[Stmt], depth: u32, fctx: &mut FuncContext<'_, '_>, out: &mut String) -> CodegenResult<()> {
    for stmt in body {
        emit_stmt(stmt, depth, fctx, out)?;
    }
    Ok(())
}

/// Append the C text of one statement. Nested bodies are emitted at
/// `depth + 1`; each expression restarts at expression depth zero.
pub fn emit_stmt(stmt: &Stmt, depth: u32, fctx: &mut FuncContext<'_, '_>, out: &mut String) -> CodegenResult<()> {
    check_depth(depth)?;
    tracing::trace!(kind = stmt.kind_name(), at = %stmt.span(), depth, "emit statement");
    match stmt {
        // Discharged at compile time.
        Stmt::Assert(_) => Ok(()),
        Stmt::Assign(s) => {
            let symbol = assign_op_symbol(s.op).ok_or(CodegenError::UnsupportedOperator {
                op: s.op.as_str(),
                span: s.span,
            })?;
            emit_expr(&s.lhs, 0, fctx.unit, out)?;
            out.push_str(symbol);
            emit_expr(&s.rhs, 0, fctx.unit, out)?;
            out.push_str(";\n");
            Ok(())
        }
        Stmt::Var(v) => emit_var(v, fctx.unit, out),
        Stmt::If(s) => emit_if(s, depth, fctx, out),
        Stmt::Jump(j) => {
            let text = fctx.jump(j.kind, j.label, j.span)?;
            out.push_str(&text);
            out.push('\n');
            Ok(())
        }
        Stmt::Return(r) => emit_return(r, fctx, out),
        Stmt::While(w) => emit_while(w, depth, fctx, out),
    }
}

fn emit_var(v: &VarStmt, ctx: &UnitContext<'_>, out: &mut String) -> CodegenResult<()> {
    let name = ctx.names.local(v.name);
    if is_array(&v.ty) {
        if v.value.is_some() {
            return Err(CodegenError::UnsupportedStmt {
                kind: "var",
                reason: "array locals cannot have an initializer".to_string(),
                span: v.span,
            });
        }
        out.push_str(&format!("memset({name}, 0, sizeof({name}));\n"));
        return Ok(());
    }

    out.push_str(&name);
    out.push_str(" = ");
    match &v.value {
        Some(value) => emit_expr(value, 0, ctx, out)?,
        None if is_bool(&v.ty) => out.push_str("false"),
        None => out.push('0'),
    }
    out.push_str(";\n");
    Ok(())
}

fn emit_if(s: &IfStmt, depth: u32, fctx: &mut FuncContext<'_, '_>, out: &mut String) -> CodegenResult<()> {
    out.push_str("if (");
    emit_expr(&s.condition, 0, fctx.unit, out)?;
    out.push_str(") {\n");
    emit_stmts(&s.then_body, depth + 1, fctx, out)?;
    match &s.else_branch {
        None => {}
        Some(ElseBranch::Block(body)) => {
            out.push_str("} else {\n");
            emit_stmts(body, depth + 1, fctx, out)?;
        }
        Some(ElseBranch::ElseIf(nested)) => {
            check_depth(depth + 1)?;
            out.push_str("} else {\n");
            emit_if(nested, depth + 1, fctx, out)?;
        }
    }
    out.push_str("}\n");
    Ok(())
}

fn emit_while(w: &WhileStmt, depth: u32, fctx: &mut FuncContext<'_, '_>, out: &mut String) -> CodegenResult<()> {
    out.push_str("while (");
    emit_expr(&w.condition, 0, fctx.unit, out)?;
    out.push_str(") {\n");

    fctx.push_loop(w.label);
    emit_stmts(&w.body, depth + 1, fctx, out)?;
    let Some(frame) = fctx.pop_loop() else {
        return Err(CodegenError::invalid("unbalanced loop nesting", w.span));
    };

    if frame.continue_targeted {
        out.push_str(&fctx.loop_label(&frame, JumpKind::Continue));
        out.push_str(":;\n");
    }
    out.push_str("}\n");
    if frame.break_targeted {
        out.push_str(&fctx.loop_label(&frame, JumpKind::Break));
        out.push_str(":;\n");
    }
    Ok(())
}

fn emit_return(r: &ReturnStmt, fctx: &mut FuncContext<'_, '_>, out: &mut String) -> CodegenResult<()> {
    if !fctx.suspendible {
        if r.value.is_some() {
            return Err(CodegenError::UnsupportedStmt {
                kind: "return",
                reason: "only suspendible functions return a value".to_string(),
                span: r.span,
            });
        }
        out.push_str("return;\n");
        return Ok(());
    }

    out.push_str(STATUS_VAR);
    out.push_str(" = ");
    match &r.value {
        Some(value) => emit_expr(value, 0, fctx.unit, out)?,
        None => out.push_str(&fctx.names().status_ok()),
    }
    out.push_str(";\n");
    let exit = fctx.goto_exit();
    out.push_str(&exit);
    out.push('\n');
    Ok(())
}
