//! Codegen error types.

use thiserror::Error;
use tern_types::Span;

use crate::format::FormatError;

/// Which recursive walk ran out of depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthKind {
    Expression,
    Body,
}

impl std::fmt::Display for DepthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepthKind::Expression => write!(f, "expression"),
            DepthKind::Body => write!(f, "body"),
        }
    }
}

/// Coarse classification of a [`CodegenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// An AST shape the generator does not emit.
    Unsupported,
    /// An unresolved or unsupported type.
    Type,
    /// Recursion depth exceeded.
    Depth,
    /// Input the front end should never have produced.
    Input,
    /// The external formatter failed.
    Format,
}

/// Errors that can occur during C code generation.
///
/// Every error is fatal for the compilation unit being generated.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// An expression form with no C rendering.
    #[error("{span}: unsupported expression form: {form}")]
    UnsupportedExpr { form: &'static str, span: Span },

    /// A statement form with no C rendering.
    #[error("{span}: unsupported {kind} statement: {reason}")]
    UnsupportedStmt {
        kind: &'static str,
        reason: String,
        span: Span,
    },

    /// An operator key with no C equivalent.
    #[error("{span}: operator {op:?} has no C equivalent")]
    UnsupportedOperator { op: &'static str, span: Span },

    /// A type chain that does not end in a mapped primitive.
    #[error("cannot convert type {ty:?} to C: {reason}")]
    UnsupportedType { ty: String, reason: &'static str },

    /// A recursive walk exceeded the shared depth limit.
    #[error("{kind} recursion depth too large (limit {limit})")]
    DepthExceeded { kind: DepthKind, limit: u32 },

    /// Malformed input that a verified AST cannot contain.
    #[error("{span}: invalid input: {reason}")]
    InvalidInput { reason: String, span: Span },

    /// A prefix or unit name that is not a lowercase C identifier.
    #[error("invalid {what} name {name:?}: must match [a-z_][a-z0-9_]*")]
    InvalidName { what: &'static str, name: String },

    /// Any of the above, attributed to the declaration being emitted.
    #[error("in {decl}: {source}")]
    InDecl {
        decl: String,
        #[source]
        source: Box<CodegenError>,
    },

    /// The external formatter failed.
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl CodegenError {
    pub fn invalid(reason: impl Into<String>, span: Span) -> Self {
        CodegenError::InvalidInput {
            reason: reason.into(),
            span,
        }
    }

    /// Attribute this error to `decl`, keeping the innermost attribution.
    pub fn in_decl(self, decl: impl Into<String>) -> Self {
        match self {
            already @ CodegenError::InDecl { .. } => already,
            other => CodegenError::InDecl {
                decl: decl.into(),
                source: Box::new(other),
            },
        }
    }

    /// The category of the root cause.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CodegenError::UnsupportedExpr { .. }
            | CodegenError::UnsupportedStmt { .. }
            | CodegenError::UnsupportedOperator { .. } => ErrorCategory::Unsupported,
            CodegenError::UnsupportedType { .. } => ErrorCategory::Type,
            CodegenError::DepthExceeded { .. } => ErrorCategory::Depth,
            CodegenError::InvalidInput { .. } | CodegenError::InvalidName { .. } => {
                ErrorCategory::Input
            }
            CodegenError::InDecl { source, .. } => source.category(),
            CodegenError::Format(_) => ErrorCategory::Format,
        }
    }

    /// The error with any declaration attribution stripped.
    pub fn root(&self) -> &CodegenError {
        match self {
            CodegenError::InDecl { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_decl_wraps_once() {
        let err = CodegenError::DepthExceeded {
            kind: DepthKind::Expression,
            limit: 255,
        }
        .in_decl("func decoder.decode")
        .in_decl("ignored");
        assert_eq!(
            err.to_string(),
            "in func decoder.decode: expression recursion depth too large (limit 255)"
        );
        assert_eq!(err.category(), ErrorCategory::Depth);
        assert!(matches!(err.root(), CodegenError::DepthExceeded { .. }));
    }

    #[test]
    fn test_categories() {
        let ty = CodegenError::UnsupportedType {
            ty: "ptr u8".into(),
            reason: "unsupported qualifier",
        };
        assert_eq!(ty.category(), ErrorCategory::Type);
        assert_eq!(
            ty.to_string(),
            "cannot convert type \"ptr u8\" to C: unsupported qualifier"
        );
        let op = CodegenError::UnsupportedOperator {
            op: "&^=",
            span: Span::point(4, 2),
        };
        assert_eq!(op.category(), ErrorCategory::Unsupported);
        assert_eq!(op.to_string(), "4:2: operator \"&^=\" has no C equivalent");
    }
}
