//! Shared types for the Tern C backend.
//!
//! This crate defines the read-only input the backend consumes: interned
//! identifiers and their symbol table, source spans, and the verified AST
//! produced by the front end.

mod ident;
mod span;
pub mod ast;
pub mod ops;

pub use ident::{IdMap, IdMapError, Ident, BUILTIN_NAMES};
pub use span::Span;

/// Maximum nesting of expressions any recursive walk will descend into.
pub const MAX_EXPR_DEPTH: u32 = 255;

/// Maximum nesting of statement bodies any recursive walk will descend into.
pub const MAX_BODY_DEPTH: u32 = 255;
