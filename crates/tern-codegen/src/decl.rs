//! Declaration code generation: struct layouts, constructors, destructors,
//! function prototypes and function bodies.
//!
//! A suspendible struct starts with two hidden members. `status` holds the
//! sticky status of the last call; `magic` proves the constructor ran.
//! Public entry points check both before touching anything else.

use std::collections::HashSet;

use tern_types::ast::{FuncDecl, StructDecl};

use crate::context::{FuncContext, UnitContext};
use crate::error::{CodegenError, CodegenResult};
use crate::mapper::{const_text, is_array, target_decl_text, target_field_text};
use crate::names::{EXIT_LABEL, RECEIVER, STATUS_VAR};
use crate::status::{BAD_VERSION, CONSTRUCTOR_NOT_CALLED, NULL_RECEIVER};
use crate::stmt::{emit_stmts, hoist_locals};

/// The constructor's second argument when the caller already zeroed the
/// struct's memory.
pub const FOR_INTERNAL_USE_ONLY: &str = "for_internal_use_only";

/// Human-readable declaration name for error attribution.
pub fn struct_label(s: &StructDecl, ctx: &UnitContext<'_>) -> String {
    format!("struct {}", ctx.names.ident(s.name))
}

pub fn func_label(f: &FuncDecl, ctx: &UnitContext<'_>) -> String {
    match f.receiver {
        Some(r) => format!("func {}.{}", ctx.names.ident(r), ctx.names.ident(f.name)),
        None => format!("func {}", ctx.names.ident(f.name)),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Structs
// ══════════════════════════════════════════════════════════════════════════════

/// `typedef struct { ... } <prefix>_<unit>_<Struct>;`
pub fn write_struct(s: &StructDecl, ctx: &UnitContext<'_>, out: &mut String) -> CodegenResult<()> {
    tracing::trace!(name = %ctx.names.ident(s.name), "emit struct");
    let mut members = String::new();
    if s.suspendible {
        members.push_str(&format!("{} {STATUS_VAR};\n", ctx.names.status_type()));
        members.push_str("uint32_t magic;\n");
    }
    for field in &s.fields {
        members.push_str(&target_field_text(field, &ctx.names)?);
        members.push_str(";\n");
    }
    if members.is_empty() {
        // C forbids empty structs.
        members.push_str("uint8_t unused;\n");
    }

    out.push_str("typedef struct {\n");
    out.push_str(&members);
    out.push_str(&format!("}} {};\n\n", ctx.names.struct_type(s.name)));
    Ok(())
}

fn constructor_signature(s: &StructDecl, ctx: &UnitContext<'_>) -> String {
    format!(
        "void {}({} *{RECEIVER}, uint32_t {}, uint32_t {FOR_INTERNAL_USE_ONLY})",
        ctx.names.constructor(s.name),
        ctx.names.struct_type(s.name),
        ctx.names.version_param(),
    )
}

fn destructor_signature(s: &StructDecl, ctx: &UnitContext<'_>) -> String {
    format!(
        "void {}({} *{RECEIVER})",
        ctx.names.destructor(s.name),
        ctx.names.struct_type(s.name),
    )
}

/// Constructor and destructor prototypes. Only suspendible structs have
/// them; for other structs this writes nothing.
pub fn write_ctor_dtor_prototypes(s: &StructDecl, ctx: &UnitContext<'_>, out: &mut String) {
    if !s.suspendible {
        return;
    }
    if s.public {
        let ty = ctx.names.struct_type(s.name);
        out.push_str(&format!(
            "// {} is an initializer function.\n\
             //\n\
             // It must be called before any other {ty}_* function.\n\
             //\n\
             // Pass {} and 0 for {} and {FOR_INTERNAL_USE_ONLY}.\n",
            ctx.names.constructor(s.name),
            ctx.names.macro_name("VERSION"),
            ctx.names.version_param(),
        ));
    }
    out.push_str(&constructor_signature(s, ctx));
    out.push_str(";\n\n");
    out.push_str(&destructor_signature(s, ctx));
    out.push_str(";\n\n");
}

/// Constructor and destructor bodies for a suspendible struct.
pub fn write_ctor_dtor_impls(s: &StructDecl, ctx: &UnitContext<'_>, out: &mut String) -> CodegenResult<()> {
    if !s.suspendible {
        return Ok(());
    }
    let names = &ctx.names;

    out.push_str(&constructor_signature(s, ctx));
    out.push_str(" {\n");
    out.push_str(&format!("if (!{RECEIVER}) {{\nreturn;\n}}\n"));
    out.push_str(&format!(
        "if ({} != {}) {{\n{RECEIVER}->{STATUS_VAR} = {};\nreturn;\n}}\n",
        names.version_param(),
        names.macro_name("VERSION"),
        ctx.statuses.builtin(BAD_VERSION, names),
    ));
    out.push_str(&format!(
        "if ({FOR_INTERNAL_USE_ONLY} != {}) {{\nmemset({RECEIVER}, 0, sizeof(*{RECEIVER}));\n}}\n",
        names.macro_name("ALREADY_ZEROED"),
    ));
    out.push_str(&format!("{RECEIVER}->magic = {};\n", names.macro_name("MAGIC")));
    for field in &s.fields {
        let Some(default) = &field.default else {
            continue;
        };
        if is_array(&field.ty) {
            return Err(CodegenError::UnsupportedType {
                ty: field.ty.display(names.ids()),
                reason: "array fields cannot have a default value",
            });
        }
        let Some(value) = default.const_value else {
            return Err(CodegenError::invalid(
                format!("default of field {:?} is not a constant", names.ident(field.name)),
                field.span,
            ));
        };
        out.push_str(&format!(
            "{RECEIVER}->{} = {};\n",
            names.field(field.name),
            const_text(value, default.span)?,
        ));
    }
    out.push_str("}\n\n");

    out.push_str(&destructor_signature(s, ctx));
    out.push_str(" {\n");
    out.push_str(&format!("if (!{RECEIVER}) {{\nreturn;\n}}\n"));
    // TODO: call the destructors of contained suspendible structs once
    // struct-typed fields are supported.
    out.push_str("}\n\n");
    Ok(())
}

/// Reject field defaults that no constructor would ever apply.
pub fn check_struct(s: &StructDecl, ctx: &UnitContext<'_>) -> CodegenResult<()> {
    if s.suspendible {
        return Ok(());
    }
    match s.fields.iter().find(|f| f.default.is_some()) {
        Some(field) => Err(CodegenError::invalid(
            format!(
                "field {:?} has a default but the struct has no constructor",
                ctx.names.ident(field.name)
            ),
            field.span,
        )),
        None => Ok(()),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions
// ══════════════════════════════════════════════════════════════════════════════

/// `<status type | void> <name>(<S> *self, <params>)`
fn func_signature(f: &FuncDecl, ctx: &UnitContext<'_>) -> CodegenResult<String> {
    let names = &ctx.names;

    if let Some(receiver) = f.receiver {
        let Some(owner) = ctx.structs.get(&receiver) else {
            return Err(CodegenError::invalid(
                format!("receiver struct {:?} is not declared", names.ident(receiver)),
                f.span,
            ));
        };
        if owner.suspendible != f.suspendible {
            let reason = if f.suspendible {
                "suspendible method on a struct without status"
            } else {
                "non-suspendible method on a suspendible struct"
            };
            return Err(CodegenError::invalid(reason, f.span));
        }
        // The header would declare the method without its receiver type.
        if f.public && !owner.public {
            return Err(CodegenError::invalid(
                format!("public method on private struct {:?}", names.ident(receiver)),
                f.span,
            ));
        }
    }

    let mut params = Vec::with_capacity(f.params.len() + 1);
    if let Some(receiver) = f.receiver {
        params.push(format!("{} *{RECEIVER}", names.struct_type(receiver)));
    }
    let mut seen = HashSet::new();
    for p in &f.params {
        if !seen.insert(p.name) {
            return Err(CodegenError::invalid(
                format!("parameter {:?} is declared twice", names.ident(p.name)),
                f.span,
            ));
        }
        params.push(target_decl_text(&p.ty, &names.local(p.name), names.ids())?);
    }

    let ret = if f.suspendible {
        names.status_type()
    } else {
        "void".to_string()
    };
    let params = if params.is_empty() {
        "void".to_string()
    } else {
        params.join(", ")
    };
    Ok(format!("{ret} {}({params})", names.func(f.receiver, f.name)))
}

pub fn write_func_prototype(f: &FuncDecl, ctx: &UnitContext<'_>, out: &mut String) -> CodegenResult<()> {
    out.push_str(&func_signature(f, ctx)?);
    out.push_str(";\n\n");
    Ok(())
}

/// The function definition, wrapped in the status protocol when the
/// function is suspendible.
pub fn write_func_impl(f: &FuncDecl, ctx: &UnitContext<'_>, out: &mut String) -> CodegenResult<()> {
    tracing::trace!(func = %func_label(f, ctx), suspendible = f.suspendible, "emit function");
    let names = &ctx.names;
    let is_method = f.receiver.is_some();

    out.push_str(&func_signature(f, ctx)?);
    out.push_str(" {\n");

    if is_method && f.public {
        if f.suspendible {
            out.push_str(&format!(
                "if (!{RECEIVER}) {{\nreturn {};\n}}\n",
                ctx.statuses.builtin(NULL_RECEIVER, names),
            ));
        } else {
            out.push_str(&format!("if (!{RECEIVER}) {{\nreturn;\n}}\n"));
        }
    }

    if f.suspendible {
        let status_type = names.status_type();
        if is_method && f.public {
            out.push_str(&format!("{status_type} {STATUS_VAR} = {RECEIVER}->{STATUS_VAR};\n"));
        } else {
            out.push_str(&format!("{status_type} {STATUS_VAR} = {};\n", names.status_ok()));
        }
    }
    hoist_locals(&f.body, &f.params, ctx, out)?;

    let mut fctx = FuncContext::new(ctx, f.suspendible);
    if f.suspendible && is_method && f.public {
        out.push_str(&format!("if ({STATUS_VAR} & 1) {{\nreturn {STATUS_VAR};\n}}\n"));
        out.push_str(&format!(
            "if ({RECEIVER}->magic != {}) {{\n{STATUS_VAR} = {};\n{}\n}}\n",
            names.macro_name("MAGIC"),
            ctx.statuses.builtin(CONSTRUCTOR_NOT_CALLED, names),
            fctx.goto_exit(),
        ));
        out.push_str(&format!("{STATUS_VAR} = {};\n", names.status_ok()));
    }

    emit_stmts(&f.body, 0, &mut fctx, out)?;

    if f.suspendible {
        out.push('\n');
        if fctx.exit_used() {
            out.push_str(&format!("{EXIT_LABEL}:\n"));
        }
        if is_method {
            out.push_str(&format!("{RECEIVER}->{STATUS_VAR} = {STATUS_VAR};\n"));
        }
        out.push_str(&format!("return {STATUS_VAR};\n"));
    }
    out.push_str("}\n\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenOptions;
    use pretty_assertions::assert_eq;
    use tern_types::ast::{CompilationUnit, Decl, Expr, Field, File, Param, Stmt, TypeExpr};
    use tern_types::{IdMap, Ident, Span};

    fn decoder(ids: &mut IdMap, suspendible: bool) -> StructDecl {
        let name = ids.intern("decoder");
        let width = ids.intern("width");
        let keep = ids.intern("keep");
        StructDecl {
            name,
            public: true,
            suspendible,
            fields: vec![
                Field::new(width, TypeExpr::Named(Ident::U32)).with_default(Expr::int(640)),
                Field::new(keep, TypeExpr::Named(Ident::BOOL)),
            ],
            span: Span::default(),
        }
    }

    fn unit_of(decls: Vec<Decl>) -> CompilationUnit {
        CompilationUnit::new(vec![File::new("gif.tern", decls)])
    }

    #[test]
    fn suspendible_struct_layout_puts_hidden_fields_first() {
        let mut ids = IdMap::new();
        let s = decoder(&mut ids, true);
        let unit = unit_of(vec![Decl::Struct(s.clone())]);
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        let mut out = String::new();
        write_struct(&s, &ctx, &mut out).unwrap();
        assert_eq!(
            out,
            "typedef struct {\n\
             tern_gif_status status;\n\
             uint32_t magic;\n\
             uint32_t f_width;\n\
             bool f_keep;\n\
             } tern_gif_decoder;\n\n"
        );
    }

    #[test]
    fn empty_struct_gets_a_placeholder_member() {
        let mut ids = IdMap::new();
        let empty = ids.intern("empty");
        let s = StructDecl {
            name: empty,
            public: false,
            suspendible: false,
            fields: vec![],
            span: Span::default(),
        };
        let unit = CompilationUnit::default();
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        let mut out = String::new();
        write_struct(&s, &ctx, &mut out).unwrap();
        assert_eq!(out, "typedef struct {\nuint8_t unused;\n} tern_gif_empty;\n\n");
    }

    #[test]
    fn constructor_checks_version_then_zeroes_then_stamps() {
        let mut ids = IdMap::new();
        let s = decoder(&mut ids, true);
        let unit = unit_of(vec![Decl::Struct(s.clone())]);
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        let mut out = String::new();
        write_ctor_dtor_impls(&s, &ctx, &mut out).unwrap();
        assert_eq!(
            out,
            "void tern_gif_decoder_constructor(tern_gif_decoder *self, uint32_t tern_version, uint32_t for_internal_use_only) {\n\
             if (!self) {\nreturn;\n}\n\
             if (tern_version != TERN_VERSION) {\n\
             self->status = tern_gif_error_bad_version;\n\
             return;\n\
             }\n\
             if (for_internal_use_only != TERN_ALREADY_ZEROED) {\n\
             memset(self, 0, sizeof(*self));\n\
             }\n\
             self->magic = TERN_MAGIC;\n\
             self->f_width = 640;\n\
             }\n\n\
             void tern_gif_decoder_destructor(tern_gif_decoder *self) {\n\
             if (!self) {\nreturn;\n}\n\
             }\n\n"
        );
    }

    #[test]
    fn public_constructor_prototype_is_documented() {
        let mut ids = IdMap::new();
        let s = decoder(&mut ids, true);
        let unit = unit_of(vec![Decl::Struct(s.clone())]);
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        let mut out = String::new();
        write_ctor_dtor_prototypes(&s, &ctx, &mut out);
        assert!(out.starts_with("// tern_gif_decoder_constructor is an initializer function.\n"));
        assert!(out.contains("Pass TERN_VERSION and 0 for tern_version and for_internal_use_only."));
        assert!(out.ends_with("void tern_gif_decoder_destructor(tern_gif_decoder *self);\n\n"));

        let plain = StructDecl {
            suspendible: false,
            ..s.clone()
        };
        let mut out = String::new();
        write_ctor_dtor_prototypes(&plain, &ctx, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn defaults_need_a_constructor() {
        let mut ids = IdMap::new();
        let s = decoder(&mut ids, false);
        let unit = unit_of(vec![Decl::Struct(s.clone())]);
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        assert!(check_struct(&s, &ctx).is_err());
    }

    #[test]
    fn array_default_is_unsupported() {
        let mut ids = IdMap::new();
        let name = ids.intern("lut");
        let table = ids.intern("table");
        let s = StructDecl {
            name,
            public: false,
            suspendible: true,
            fields: vec![Field::new(table, TypeExpr::array(4, TypeExpr::Named(Ident::U8)))
                .with_default(Expr::int(0))],
            span: Span::default(),
        };
        let unit = unit_of(vec![Decl::Struct(s.clone())]);
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        let err = write_ctor_dtor_impls(&s, &ctx, &mut String::new()).unwrap_err();
        assert!(matches!(err, CodegenError::UnsupportedType { .. }), "{err:?}");
    }

    #[test]
    fn free_function_without_params_takes_void() {
        let mut ids = IdMap::new();
        let reset = ids.intern("reset");
        let f = FuncDecl {
            name: reset,
            receiver: None,
            public: true,
            suspendible: false,
            params: vec![],
            body: vec![],
            span: Span::default(),
        };
        let unit = unit_of(vec![Decl::Func(f.clone())]);
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        let mut out = String::new();
        write_func_prototype(&f, &ctx, &mut out).unwrap();
        assert_eq!(out, "void tern_gif_reset(void);\n\n");
    }

    #[test]
    fn params_follow_the_receiver() {
        let mut ids = IdMap::new();
        let s = decoder(&mut ids, true);
        let decode = ids.intern("decode");
        let n = ids.intern("n");
        let f = FuncDecl {
            name: decode,
            receiver: Some(s.name),
            public: false,
            suspendible: true,
            params: vec![Param {
                name: n,
                ty: TypeExpr::Named(Ident::USIZE),
            }],
            body: vec![Stmt::ret(None)],
            span: Span::default(),
        };
        let unit = unit_of(vec![Decl::Struct(s), Decl::Func(f.clone())]);
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        let mut out = String::new();
        write_func_impl(&f, &ctx, &mut out).unwrap();
        assert_eq!(
            out,
            "tern_gif_status tern_gif_decoder_decode(tern_gif_decoder *self, size_t v_n) {\n\
             tern_gif_status status = tern_gif_status_ok;\n\
             status = tern_gif_status_ok;\n\
             goto exit;\n\
             \n\
             exit:\n\
             self->status = status;\n\
             return status;\n\
             }\n\n"
        );
    }

    #[test]
    fn receiver_must_match_suspendibility() {
        let mut ids = IdMap::new();
        let s = decoder(&mut ids, false);
        let run = ids.intern("run");
        let missing = ids.intern("missing");
        let f = FuncDecl {
            name: run,
            receiver: Some(s.name),
            public: true,
            suspendible: true,
            params: vec![],
            body: vec![],
            span: Span::default(),
        };
        let unit = unit_of(vec![Decl::Struct(s), Decl::Func(f.clone())]);
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        let err = write_func_prototype(&f, &ctx, &mut String::new()).unwrap_err();
        assert!(err.to_string().contains("suspendible method"), "{err}");

        let orphan = FuncDecl {
            receiver: Some(missing),
            ..f
        };
        let err = write_func_prototype(&orphan, &ctx, &mut String::new()).unwrap_err();
        assert!(err.to_string().contains("\"missing\" is not declared"), "{err}");
    }

    #[test]
    fn labels_name_the_declaration() {
        let mut ids = IdMap::new();
        let s = decoder(&mut ids, true);
        let decode = ids.intern("decode");
        let unit = CompilationUnit::default();
        let opts = CodegenOptions::new("gif");
        let ctx = UnitContext::new(&unit, &ids, &opts).unwrap();
        assert_eq!(struct_label(&s, &ctx), "struct decoder");
        let f = FuncDecl {
            name: decode,
            receiver: Some(s.name),
            public: true,
            suspendible: true,
            params: vec![],
            body: vec![],
            span: Span::default(),
        };
        assert_eq!(func_label(&f, &ctx), "func decoder.decode");
    }
}
