//! Symbol and type mapping: DSL primitives and operators to their C spellings.
//!
//! Binary, associative and assignment symbols carry their surrounding spaces
//! so emitters can concatenate them directly. An operator with no entry here
//! is a fatal error at its use site; nothing falls back to a default.

use std::fmt::Write;

use tern_types::ast::{ConstValue, Field, TypeExpr};
use tern_types::ops::{AssignOp, AssocOp, BinaryOp, UnaryOp};
use tern_types::{IdMap, Ident, Span};

use crate::error::{CodegenError, CodegenResult};
use crate::names::Names;

// ══════════════════════════════════════════════════════════════════════════════
// Types
// ══════════════════════════════════════════════════════════════════════════════

/// The C type for a primitive type name, or `None` if `name` is not one.
pub fn target_primitive_name(name: Ident) -> Option<&'static str> {
    Some(match name {
        Ident::I8 => "int8_t",
        Ident::I16 => "int16_t",
        Ident::I32 => "int32_t",
        Ident::I64 => "int64_t",
        Ident::U8 => "uint8_t",
        Ident::U16 => "uint16_t",
        Ident::U32 => "uint32_t",
        Ident::U64 => "uint64_t",
        Ident::USIZE => "size_t",
        Ident::BOOL => "bool",
        _ => return None,
    })
}

/// A C declarator for `c_name` of type `ty`, e.g. `uint8_t f_buf[4][8]`.
///
/// Array suffixes follow the type chain outermost first, which is also C's
/// order. Any qualifier other than an array, or a terminal name that is not a
/// primitive, fails with the type's DSL spelling.
pub fn target_decl_text(ty: &TypeExpr, c_name: &str, ids: &IdMap) -> CodegenResult<String> {
    let unsupported = |reason| CodegenError::UnsupportedType {
        ty: ty.display(ids),
        reason,
    };

    let mut suffix = String::new();
    let mut node = ty;
    let base = loop {
        match node {
            TypeExpr::Array { len, elem } => {
                match len.const_value {
                    Some(ConstValue::Int(n)) if n > 0 => {
                        let _ = write!(suffix, "[{n}]");
                    }
                    Some(ConstValue::Int(_)) => return Err(unsupported("array length must be positive")),
                    _ => return Err(unsupported("array length is not a constant")),
                }
                node = elem;
            }
            TypeExpr::Named(name) => match target_primitive_name(*name) {
                Some(c) => break c,
                None => return Err(unsupported("not a primitive type")),
            },
            TypeExpr::Qualified { .. } | TypeExpr::Pointer(_) => {
                return Err(unsupported("unsupported qualifier"))
            }
        }
    };
    Ok(format!("{base} {c_name}{suffix}"))
}

/// The struct member declarator for `field`: `<type> f_<name>[N]...`.
pub fn target_field_text(field: &Field, names: &Names<'_>) -> CodegenResult<String> {
    target_decl_text(&field.ty, &names.field(field.name), names.ids())
}

pub fn is_array(ty: &TypeExpr) -> bool {
    matches!(ty, TypeExpr::Array { .. })
}

pub fn is_bool(ty: &TypeExpr) -> bool {
    matches!(ty, TypeExpr::Named(Ident::BOOL))
}

/// The literal text of a folded constant.
///
/// Integers must fit in `[i64::MIN, u64::MAX]`. `i64::MIN` is spelled as a
/// subtraction because `9223372036854775808` alone has no signed C type.
pub fn const_text(value: ConstValue, span: Span) -> CodegenResult<String> {
    Ok(match value {
        ConstValue::Int(n) if n < i64::MIN as i128 || n > u64::MAX as i128 => {
            return Err(CodegenError::invalid(
                format!("constant {n} does not fit in 64 bits"),
                span,
            ))
        }
        ConstValue::Int(n) if n == i64::MIN as i128 => format!("({} - 1)", i64::MIN + 1),
        // Above i64::MAX an unsuffixed decimal has no standard C type.
        ConstValue::Int(n) if n > i64::MAX as i128 => format!("{n}u"),
        ConstValue::Int(n) => n.to_string(),
        ConstValue::Bool(b) => b.to_string(),
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

/// `&^=` has no C compound-assignment form and stays unmapped.
pub fn assign_op_symbol(op: AssignOp) -> Option<&'static str> {
    Some(match op {
        AssignOp::Eq => " = ",
        AssignOp::PlusEq => " += ",
        AssignOp::MinusEq => " -= ",
        AssignOp::StarEq => " *= ",
        AssignOp::SlashEq => " /= ",
        AssignOp::ShiftLEq => " <<= ",
        AssignOp::ShiftREq => " >>= ",
        AssignOp::AmpEq => " &= ",
        AssignOp::AmpHatEq => return None,
        AssignOp::PipeEq => " |= ",
        AssignOp::HatEq => " ^= ",
    })
}

pub fn unary_op_symbol(op: UnaryOp) -> Option<&'static str> {
    Some(match op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
        UnaryOp::Not => "!",
    })
}

/// `&^` and `as` are unmapped.
pub fn binary_op_symbol(op: BinaryOp) -> Option<&'static str> {
    Some(match op {
        BinaryOp::Plus => " + ",
        BinaryOp::Minus => " - ",
        BinaryOp::Star => " * ",
        BinaryOp::Slash => " / ",
        BinaryOp::ShiftL => " << ",
        BinaryOp::ShiftR => " >> ",
        BinaryOp::Amp => " & ",
        BinaryOp::AmpHat => return None,
        BinaryOp::Pipe => " | ",
        BinaryOp::Hat => " ^ ",
        BinaryOp::NotEq => " != ",
        BinaryOp::Less => " < ",
        BinaryOp::LessEq => " <= ",
        BinaryOp::EqEq => " == ",
        BinaryOp::GreaterEq => " >= ",
        BinaryOp::Greater => " > ",
        BinaryOp::And => " && ",
        BinaryOp::Or => " || ",
        BinaryOp::As => return None,
    })
}

pub fn assoc_op_symbol(op: AssocOp) -> Option<&'static str> {
    Some(match op {
        AssocOp::Plus => " + ",
        AssocOp::Star => " * ",
        AssocOp::Amp => " & ",
        AssocOp::Pipe => " | ",
        AssocOp::Hat => " ^ ",
        AssocOp::And => " && ",
        AssocOp::Or => " || ",
    })
}
