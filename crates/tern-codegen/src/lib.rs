//! Tern C backend: generates a C header and implementation from a verified
//! AST.
//!
//! # Architecture
//!
//! The generator walks a [`tern_types::ast::CompilationUnit`] that the front
//! end has already type-checked and constant-folded, and writes C text in a
//! fixed section order (see [`unit`]). Output is deterministic: the same
//! unit, identifier map and options always yield the same bytes.
//!
//! ## Status protocol
//!
//! Suspendible functions return a status code. Zero is success, an odd code
//! is a sticky error and a negative even code is a suspension the caller may
//! resume from. A suspendible struct carries the status of its last call
//! and a magic number that proves its constructor ran:
//!
//! ```c
//! typedef struct {
//!   tern_gif_status status;
//!   uint32_t magic;
//!   uint32_t f_width;
//! } tern_gif_decoder;
//! ```
//!
//! ## Naming
//!
//! Every exported name is `<prefix>_<unit>_...`; see [`names::Names`].

pub mod config;
pub mod context;
pub mod decl;
pub mod error;
pub mod expr;
pub mod format;
pub mod mapper;
pub mod names;
pub mod status;
pub mod stmt;
pub mod unit;

pub use config::{Artifact, CodegenOptions};
pub use error::{CodegenError, CodegenResult, DepthKind, ErrorCategory};
pub use format::{ClangFormat, FormatError, Formatter, NoopFormatter};
pub use unit::{generate, Artifacts, Generator};
