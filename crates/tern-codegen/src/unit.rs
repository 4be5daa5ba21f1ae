//! Unit assembler: lays out the header and implementation artifacts.
//!
//! Both artifacts share the same interface text. The implementation
//! artifact continues after it with the private declarations and every
//! body. Within each section, declarations keep their source order, so the
//! output depends on nothing but the unit and the options.

use tern_types::ast::CompilationUnit;
use tern_types::IdMap;

use crate::config::{Artifact, CodegenOptions};
use crate::context::UnitContext;
use crate::decl::{
    check_struct, func_label, struct_label, write_ctor_dtor_impls, write_ctor_dtor_prototypes,
    write_func_impl, write_func_prototype, write_struct,
};
use crate::error::{CodegenError, CodegenResult};
use crate::format::{ClangFormat, Formatter};

/// Value stamped into `magic` by every constructor.
pub const MAGIC: u32 = 0xCB36_99CC;

/// Token a caller passes as `for_internal_use_only` when the memory is
/// already zeroed.
pub const ALREADY_ZEROED: u32 = 0x6860_2EF1;

/// First line of every artifact after the include guard.
pub const GENERATED_BANNER: &str = "// Code generated by tern-codegen. DO NOT EDIT.";

// ══════════════════════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════════════════════

/// Generate one artifact with the default formatter.
pub fn generate(
    unit: &CompilationUnit,
    ids: &IdMap,
    options: &CodegenOptions,
    artifact: Artifact,
) -> CodegenResult<String> {
    Generator::new(options.clone()).generate(unit, ids, artifact)
}

/// The header and implementation text of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub header: String,
    pub implementation: String,
}

/// A configured C generator.
pub struct Generator {
    options: CodegenOptions,
    formatter: Box<dyn Formatter + Send + Sync>,
}

impl Generator {
    /// A generator that formats its output with `clang-format`.
    pub fn new(options: CodegenOptions) -> Self {
        Self {
            options,
            formatter: Box::new(ClangFormat::default()),
        }
    }

    /// Replace the output formatter.
    pub fn with_formatter(mut self, formatter: impl Formatter + Send + Sync + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    /// Generate one artifact of `unit`.
    ///
    /// Fails without partial output on the first unsupported construct,
    /// malformed input, exceeded depth, or formatter failure.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(unit = %self.options.unit_name, artifact = ?artifact)
    )]
    pub fn generate(&self, unit: &CompilationUnit, ids: &IdMap, artifact: Artifact) -> CodegenResult<String> {
        let ctx = UnitContext::new(unit, ids, &self.options)?;
        let raw = Assembler::new(unit, &ctx).assemble(artifact)?;
        tracing::debug!(bytes = raw.len(), "assembled raw text");
        self.formatter.format(raw).map_err(|e| {
            tracing::debug!(error = %e, "formatter failed");
            CodegenError::from(e)
        })
    }

    /// Generate both artifacts of `unit`.
    pub fn generate_both(&self, unit: &CompilationUnit, ids: &IdMap) -> CodegenResult<Artifacts> {
        Ok(Artifacts {
            header: self.generate(unit, ids, Artifact::Header)?,
            implementation: self.generate(unit, ids, Artifact::Implementation)?,
        })
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Assembler
// ══════════════════════════════════════════════════════════════════════════════

struct Assembler<'u, 'a> {
    unit: &'a CompilationUnit,
    ctx: &'u UnitContext<'a>,
    out: String,
}

impl<'u, 'a> Assembler<'u, 'a> {
    fn new(unit: &'a CompilationUnit, ctx: &'u UnitContext<'a>) -> Self {
        Self {
            unit,
            ctx,
            out: String::new(),
        }
    }

    fn assemble(mut self, artifact: Artifact) -> CodegenResult<String> {
        for s in self.unit.structs() {
            check_struct(s, self.ctx).map_err(|e| e.in_decl(struct_label(s, self.ctx)))?;
        }

        // 1. Interface
        self.write_preamble();
        self.write_status_enum();
        self.write_structs(true)?;
        self.write_ctor_dtor_prototypes(true);
        self.write_func_prototypes(true)?;
        self.write_interface_end();
        tracing::debug!("interface assembled");

        if artifact == Artifact::Header {
            return Ok(self.out);
        }

        // 2. Private declarations
        self.write_structs(false)?;
        self.write_ctor_dtor_prototypes(false);
        self.write_func_prototypes(false)?;

        // 3. Bodies
        self.write_magic_numbers();
        self.write_ctor_dtor_impls()?;
        self.write_func_impls()?;
        tracing::debug!("implementation assembled");

        Ok(self.out)
    }

    fn section(&mut self, title: &str) {
        self.out.push_str("// ---------------- ");
        self.out.push_str(title);
        self.out.push_str("\n\n");
    }

    fn visibility(public: bool) -> &'static str {
        if public {
            "Public"
        } else {
            "Private"
        }
    }

    // ── Interface ────────────────────────────────────────────────────────

    fn write_preamble(&mut self) {
        let names = &self.ctx.names;
        let guard = names.include_guard();
        let version = names.macro_name("VERSION");
        self.out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
        self.out.push_str(GENERATED_BANNER);
        self.out.push_str("\n\n");
        self.out.push_str(
            "#include <stdbool.h>\n\
             #include <stddef.h>\n\
             #include <stdint.h>\n\
             #include <string.h>\n\n",
        );
        self.out.push_str(&format!(
            "#ifndef {version}\n#define {version} ((uint32_t)0x{:08X}U)\n#endif\n\n",
            self.ctx.version,
        ));
        self.out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");
    }

    fn write_status_enum(&mut self) {
        self.section("Status Codes");
        let ctx = self.ctx;
        let names = &ctx.names;
        let mut text = String::from("typedef enum {\n");
        for entry in ctx.statuses.entries() {
            text.push_str(&format!("{} = {},\n", entry.c_name(names), entry.value));
        }
        text.push_str(&format!("}} {};\n\n", names.status_type()));
        self.out.push_str(&text);
    }

    fn write_interface_end(&mut self) {
        self.out.push_str("#ifdef __cplusplus\n}  // extern \"C\"\n#endif\n\n");
        self.out.push_str(&format!("#endif  // {}\n\n", self.ctx.names.include_guard()));
    }

    // ── Declarations ─────────────────────────────────────────────────────

    fn write_structs(&mut self, public: bool) -> CodegenResult<()> {
        let (unit, ctx) = (self.unit, self.ctx);
        self.section(&format!("{} Structs", Self::visibility(public)));
        for s in unit.structs().filter(|s| s.public == public) {
            write_struct(s, ctx, &mut self.out).map_err(|e| e.in_decl(struct_label(s, ctx)))?;
        }
        Ok(())
    }

    fn write_ctor_dtor_prototypes(&mut self, public: bool) {
        self.section(&format!(
            "{} Constructor and Destructor Prototypes",
            Self::visibility(public)
        ));
        let (unit, ctx) = (self.unit, self.ctx);
        for s in unit.structs().filter(|s| s.public == public) {
            write_ctor_dtor_prototypes(s, ctx, &mut self.out);
        }
    }

    fn write_func_prototypes(&mut self, public: bool) -> CodegenResult<()> {
        let (unit, ctx) = (self.unit, self.ctx);
        self.section(&format!("{} Function Prototypes", Self::visibility(public)));
        for f in unit.funcs().filter(|f| f.public == public) {
            write_func_prototype(f, ctx, &mut self.out).map_err(|e| e.in_decl(func_label(f, ctx)))?;
        }
        Ok(())
    }

    // ── Bodies ───────────────────────────────────────────────────────────

    fn write_magic_numbers(&mut self) {
        self.section("Magic Numbers");
        let names = &self.ctx.names;
        self.out.push_str(&format!(
            "#define {} (0x{MAGIC:08X}U)\n\n#define {} (0x{ALREADY_ZEROED:08X}U)\n\n",
            names.macro_name("MAGIC"),
            names.macro_name("ALREADY_ZEROED"),
        ));
    }

    fn write_ctor_dtor_impls(&mut self) -> CodegenResult<()> {
        let (unit, ctx) = (self.unit, self.ctx);
        self.section("Constructor and Destructor Implementations");
        for s in unit.structs() {
            write_ctor_dtor_impls(s, ctx, &mut self.out).map_err(|e| e.in_decl(struct_label(s, ctx)))?;
        }
        Ok(())
    }

    fn write_func_impls(&mut self) -> CodegenResult<()> {
        let (unit, ctx) = (self.unit, self.ctx);
        self.section("Function Implementations");
        for f in unit.funcs() {
            write_func_impl(f, ctx, &mut self.out).map_err(|e| e.in_decl(func_label(f, ctx)))?;
        }
        Ok(())
    }
}
