//! Expression code generation.
//!
//! Every binary node becomes exactly one parenthesized group, so C's
//! precedence table never has to agree with the DSL's. Associative chains
//! fold left to right through the same rule. Unary operators bind tighter
//! than anything produced here and get no parentheses of their own.

use tern_types::ast::{Expr, ExprKind, FuncRef};
use tern_types::ops::{AssocOp, BinaryOp, UnaryOp};
use tern_types::{Ident, Span, MAX_EXPR_DEPTH};

use crate::context::UnitContext;
use crate::error::{CodegenError, CodegenResult, DepthKind};
use crate::mapper::{assoc_op_symbol, binary_op_symbol, const_text, unary_op_symbol};
use crate::names::{FIELD_PREFIX, RECEIVER};

/// Emit `expr` as a fresh top-level expression and return its text.
pub fn expr_text(expr: &Expr, ctx: &UnitContext<'_>) -> CodegenResult<String> {
    let mut out = String::new();
    emit_expr(expr, 0, ctx, &mut out)?;
    Ok(out)
}

/// Append the C text of `expr` to `out`.
///
/// `depth` counts the enclosing expression nodes; past [`MAX_EXPR_DEPTH`]
/// emission fails instead of recursing further.
pub fn emit_expr(expr: &Expr, depth: u32, ctx: &UnitContext<'_>, out: &mut String) -> CodegenResult<()> {
    if depth > MAX_EXPR_DEPTH {
        return Err(CodegenError::DepthExceeded {
            kind: DepthKind::Expression,
            limit: MAX_EXPR_DEPTH,
        });
    }
    let depth = depth + 1;

    if let Some(value) = expr.const_value {
        out.push_str(&const_text(value, expr.span)?);
        return Ok(());
    }

    match &expr.kind {
        // ── Other ────────────────────────────────────────────────────────
        ExprKind::Literal => Err(CodegenError::invalid(
            "literal without a constant value",
            expr.span,
        )),
        ExprKind::Ident(id) => {
            emit_ident(*id, ctx, out);
            Ok(())
        }
        ExprKind::Dot { base, field } => emit_dot(base, *field, depth, ctx, out),
        ExprKind::Index { base, index } => {
            emit_expr(base, depth, ctx, out)?;
            out.push('[');
            emit_expr(index, depth, ctx, out)?;
            out.push(']');
            Ok(())
        }
        ExprKind::Call {
            func,
            receiver,
            args,
        } => emit_call(func, receiver.as_deref(), args, expr.span, depth, ctx, out),
        ExprKind::Slice { .. } => Err(CodegenError::UnsupportedExpr {
            form: expr.form_name(),
            span: expr.span,
        }),
        ExprKind::Status(name) => match ctx.statuses.lookup(*name, &ctx.names) {
            Some(entry) => {
                out.push_str(&entry.c_name(&ctx.names));
                Ok(())
            }
            None => Err(CodegenError::invalid(
                format!("unknown status {:?}", ctx.names.ident(*name)),
                expr.span,
            )),
        },

        // ── Operators ────────────────────────────────────────────────────
        ExprKind::Unary { op, operand } => emit_unary(*op, operand, expr.span, depth, ctx, out),
        ExprKind::Binary { op, lhs, rhs } => emit_binary(*op, lhs, rhs, expr.span, depth, ctx, out),
        ExprKind::Associative { op, operands } => {
            emit_associative(*op, operands, expr.span, depth, ctx, out)
        }
    }
}

fn is_this(expr: &Expr) -> bool {
    expr.const_value.is_none() && matches!(expr.kind, ExprKind::Ident(Ident::THIS))
}

fn emit_ident(id: Ident, ctx: &UnitContext<'_>, out: &mut String) {
    if id == Ident::THIS {
        out.push_str(RECEIVER);
    } else {
        out.push_str(&ctx.names.local(id));
    }
}

/// `self->f_x` through the receiver pointer, `base.f_x` for struct values.
fn emit_dot(base: &Expr, field: Ident, depth: u32, ctx: &UnitContext<'_>, out: &mut String) -> CodegenResult<()> {
    emit_expr(base, depth, ctx, out)?;
    out.push_str(if is_this(base) { "->" } else { "." });
    out.push_str(FIELD_PREFIX);
    out.push_str(&ctx.names.ident(field));
    Ok(())
}

fn emit_call(
    func: &FuncRef,
    receiver: Option<&Expr>,
    args: &[Expr],
    span: Span,
    depth: u32,
    ctx: &UnitContext<'_>,
    out: &mut String,
) -> CodegenResult<()> {
    if receiver.is_some() != func.receiver_type.is_some() {
        return Err(CodegenError::invalid(
            "method call receiver does not match its callee",
            span,
        ));
    }

    out.push_str(&ctx.names.func(func.receiver_type, func.name));
    out.push('(');
    let mut first = true;
    if let Some(recv) = receiver {
        if is_this(recv) {
            out.push_str(RECEIVER);
        } else {
            out.push('&');
            emit_expr(recv, depth, ctx, out)?;
        }
        first = false;
    }
    for arg in args {
        if !first {
            out.push_str(", ");
        }
        emit_expr(arg, depth, ctx, out)?;
        first = false;
    }
    out.push(')');
    Ok(())
}

fn emit_unary(
    op: UnaryOp,
    operand: &Expr,
    span: Span,
    depth: u32,
    ctx: &UnitContext<'_>,
    out: &mut String,
) -> CodegenResult<()> {
    let symbol = unary_op_symbol(op).ok_or(CodegenError::UnsupportedOperator {
        op: op.as_str(),
        span,
    })?;
    let mut inner = String::new();
    emit_expr(operand, depth, ctx, &mut inner)?;

    out.push_str(symbol);
    // `-` followed by `-x` must not fuse into the `--` token.
    if inner.starts_with(['+', '-']) {
        out.push('(');
        out.push_str(&inner);
        out.push(')');
    } else {
        out.push_str(&inner);
    }
    Ok(())
}

fn emit_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    span: Span,
    depth: u32,
    ctx: &UnitContext<'_>,
    out: &mut String,
) -> CodegenResult<()> {
    let symbol = binary_op_symbol(op).ok_or(CodegenError::UnsupportedOperator {
        op: op.as_str(),
        span,
    })?;
    out.push('(');
    emit_expr(lhs, depth, ctx, out)?;
    out.push_str(symbol);
    emit_expr(rhs, depth, ctx, out)?;
    out.push(')');
    Ok(())
}

/// `a + b + c` becomes `((a + b) + c)`.
fn emit_associative(
    op: AssocOp,
    operands: &[Expr],
    span: Span,
    depth: u32,
    ctx: &UnitContext<'_>,
    out: &mut String,
) -> CodegenResult<()> {
    let symbol = assoc_op_symbol(op).ok_or(CodegenError::UnsupportedOperator {
        op: op.as_str(),
        span,
    })?;
    let Some((first, rest)) = operands.split_first().filter(|(_, rest)| !rest.is_empty()) else {
        return Err(CodegenError::invalid(
            format!("associative {:?} needs at least two operands", op.as_str()),
            span,
        ));
    };

    for _ in rest {
        out.push('(');
    }
    emit_expr(first, depth, ctx, out)?;
    for operand in rest {
        out.push_str(symbol);
        emit_expr(operand, depth, ctx, out)?;
        out.push(')');
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenOptions;
    use pretty_assertions::assert_eq;
    use tern_types::ast::{CompilationUnit, ConstValue};
    use tern_types::IdMap;

    fn with_ctx<R>(ids: &IdMap, f: impl FnOnce(&UnitContext<'_>) -> R) -> R {
        let unit = CompilationUnit::default();
        let opts = CodegenOptions::new("t");
        let ctx = UnitContext::new(&unit, ids, &opts).unwrap();
        f(&ctx)
    }

    #[test]
    fn constant_short_circuits_the_tree() {
        let ids = IdMap::new();
        // A folded slice would fail if it were walked.
        let slice = Expr::new(
            ExprKind::Slice {
                base: Box::new(Expr::this()),
                low: None,
                high: None,
            },
            Span::default(),
        )
        .with_const(ConstValue::Int(7));
        assert_eq!(with_ctx(&ids, |ctx| expr_text(&slice, ctx).unwrap()), "7");
    }

    #[test]
    fn this_field_uses_arrow_and_nested_field_uses_dot() {
        let mut ids = IdMap::new();
        let hdr = ids.intern("hdr");
        let width = ids.intern("width");
        let e = Expr::dot(Expr::dot(Expr::this(), hdr), width);
        assert_eq!(
            with_ctx(&ids, |ctx| expr_text(&e, ctx).unwrap()),
            "self->f_hdr.f_width"
        );
    }

    #[test]
    fn binary_is_fully_parenthesized() {
        let mut ids = IdMap::new();
        let x = ids.intern("x");
        let e = Expr::binary(
            BinaryOp::Star,
            Expr::binary(BinaryOp::Plus, Expr::ident(x), Expr::int(1)),
            Expr::binary(BinaryOp::ShiftL, Expr::int(2), Expr::int(3)),
        );
        assert_eq!(
            with_ctx(&ids, |ctx| expr_text(&e, ctx).unwrap()),
            "((v_x + 1) * (2 << 3))"
        );
    }

    #[test]
    fn associative_folds_left() {
        let mut ids = IdMap::new();
        let a = ids.intern("a");
        let b = ids.intern("b");
        let c = ids.intern("c");
        let e = Expr::associative(
            AssocOp::Pipe,
            vec![Expr::ident(a), Expr::ident(b), Expr::ident(c)],
        );
        assert_eq!(
            with_ctx(&ids, |ctx| expr_text(&e, ctx).unwrap()),
            "((v_a | v_b) | v_c)"
        );
    }

    #[test]
    fn associative_needs_two_operands() {
        let ids = IdMap::new();
        let e = Expr::associative(AssocOp::Plus, vec![Expr::int(1)]);
        let err = with_ctx(&ids, |ctx| expr_text(&e, ctx).unwrap_err());
        assert!(matches!(err, CodegenError::InvalidInput { .. }), "{err:?}");
    }

    #[test]
    fn unary_has_no_parentheses_unless_signs_would_fuse() {
        let mut ids = IdMap::new();
        let x = ids.intern("x");
        let not = Expr::unary(
            UnaryOp::Not,
            Expr::binary(BinaryOp::Less, Expr::ident(x), Expr::int(3)),
        );
        let neg_neg = Expr::unary(UnaryOp::Minus, Expr::unary(UnaryOp::Minus, Expr::ident(x)));
        let neg_const = Expr::unary(UnaryOp::Minus, Expr::ident(x).with_const(ConstValue::Int(-4)));
        with_ctx(&ids, |ctx| {
            assert_eq!(expr_text(&not, ctx).unwrap(), "!(v_x < 3)");
            assert_eq!(expr_text(&neg_neg, ctx).unwrap(), "-(-v_x)");
            assert_eq!(expr_text(&neg_const, ctx).unwrap(), "-(-4)");
        });
    }

    #[test]
    fn unmapped_binary_operators_fail() {
        let ids = IdMap::new();
        for op in [BinaryOp::AmpHat, BinaryOp::As] {
            let e = Expr::binary(op, Expr::this(), Expr::int(1));
            let err = with_ctx(&ids, |ctx| expr_text(&e, ctx).unwrap_err());
            match err {
                CodegenError::UnsupportedOperator { op: name, .. } => assert_eq!(name, op.as_str()),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn slice_is_unsupported() {
        let ids = IdMap::new();
        let e = Expr::new(
            ExprKind::Slice {
                base: Box::new(Expr::this()),
                low: Some(Box::new(Expr::int(0))),
                high: None,
            },
            Span::point(9, 4),
        );
        let err = with_ctx(&ids, |ctx| expr_text(&e, ctx).unwrap_err());
        assert_eq!(err.to_string(), "9:4: unsupported expression form: slice");
    }

    #[test]
    fn calls_pass_receiver_first() {
        let mut ids = IdMap::new();
        let decoder = ids.intern("decoder");
        let lzw = ids.intern("lzw");
        let decode = ids.intern("decode");
        let n = ids.intern("n");
        let on_self = Expr::call(
            FuncRef {
                receiver_type: Some(decoder),
                name: decode,
            },
            Some(Expr::this()),
            vec![Expr::ident(n), Expr::int(2)],
        );
        let on_field = Expr::call(
            FuncRef {
                receiver_type: Some(lzw),
                name: decode,
            },
            Some(Expr::dot(Expr::this(), lzw)),
            vec![],
        );
        let free = Expr::call(FuncRef { receiver_type: None, name: decode }, None, vec![]);
        with_ctx(&ids, |ctx| {
            assert_eq!(expr_text(&on_self, ctx).unwrap(), "tern_t_decoder_decode(self, v_n, 2)");
            assert_eq!(expr_text(&on_field, ctx).unwrap(), "tern_t_lzw_decode(&self->f_lzw)");
            assert_eq!(expr_text(&free, ctx).unwrap(), "tern_t_decode()");
        });
    }

    #[test]
    fn index_and_status() {
        let mut ids = IdMap::new();
        let buf = ids.intern("buf");
        let i = ids.intern("i");
        let short_src = ids.intern("short_src");
        let idx = Expr::index(Expr::dot(Expr::this(), buf), Expr::ident(i));
        with_ctx(&ids, |ctx| {
            assert_eq!(expr_text(&idx, ctx).unwrap(), "self->f_buf[v_i]");
            assert_eq!(
                expr_text(&Expr::status(short_src), ctx).unwrap(),
                "tern_t_status_short_src"
            );
            assert!(expr_text(&Expr::status(buf), ctx).is_err());
        });
    }

    #[test]
    fn depth_limit_is_enforced() {
        let ids = IdMap::new();
        let mut deep = Expr::int(1);
        for _ in 0..(MAX_EXPR_DEPTH + 5) {
            deep = Expr::binary(BinaryOp::Plus, Expr::int(1), deep);
        }
        let err = with_ctx(&ids, |ctx| expr_text(&deep, ctx).unwrap_err());
        assert!(matches!(
            err,
            CodegenError::DepthExceeded {
                kind: DepthKind::Expression,
                ..
            }
        ));

        let mut shallow = Expr::int(1);
        for _ in 0..(MAX_EXPR_DEPTH - 1) {
            shallow = Expr::binary(BinaryOp::Plus, shallow, Expr::int(1));
        }
        assert!(with_ctx(&ids, |ctx| expr_text(&shallow, ctx)).is_ok());
    }
}
