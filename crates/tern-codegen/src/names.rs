//! The C naming contract.
//!
//! External code links against these names, so every function here must be
//! deterministic in the prefix, unit name and DSL identifiers alone.

use tern_types::{IdMap, Ident};

use crate::config::CodegenOptions;

/// Prefix for struct fields, keeping them clear of C keywords and of the
/// hidden `status`/`magic` members.
pub const FIELD_PREFIX: &str = "f_";

/// Prefix for locals and parameters.
pub const LOCAL_PREFIX: &str = "v_";

/// The C spelling of the DSL's `this`.
pub const RECEIVER: &str = "self";

/// The status variable every suspendible function body carries.
pub const STATUS_VAR: &str = "status";

/// The single exit label of a suspendible function body.
pub const EXIT_LABEL: &str = "exit";

/// Derives C names from the configured prefix and unit name.
#[derive(Debug, Clone)]
pub struct Names<'a> {
    ids: &'a IdMap,
    /// `<prefix>_<unit>`
    base: String,
    prefix: String,
    prefix_upper: String,
    unit_upper: String,
}

impl<'a> Names<'a> {
    pub fn new(options: &CodegenOptions, ids: &'a IdMap) -> Self {
        Self {
            ids,
            base: format!("{}_{}", options.prefix, options.unit_name),
            prefix: options.prefix.clone(),
            prefix_upper: options.prefix.to_ascii_uppercase(),
            unit_upper: options.unit_name.to_ascii_uppercase(),
        }
    }

    pub fn ids(&self) -> &'a IdMap {
        self.ids
    }

    /// The display string of an identifier.
    pub fn ident(&self, id: Ident) -> std::borrow::Cow<'a, str> {
        self.ids.name(id)
    }

    /// `<prefix>_<unit>_status`
    pub fn status_type(&self) -> String {
        format!("{}_status", self.base)
    }

    /// `<prefix>_<unit>_status_ok`
    pub fn status_ok(&self) -> String {
        self.suspension("ok")
    }

    /// `<prefix>_<unit>_error_<name>`
    pub fn error(&self, name: &str) -> String {
        format!("{}_error_{name}", self.base)
    }

    /// `<prefix>_<unit>_status_<name>`
    pub fn suspension(&self, name: &str) -> String {
        format!("{}_status_{name}", self.base)
    }

    /// `<prefix>_<unit>_<Struct>`
    pub fn struct_type(&self, name: Ident) -> String {
        format!("{}_{}", self.base, self.ident(name))
    }

    /// `<prefix>_<unit>_<Struct>_constructor`
    pub fn constructor(&self, name: Ident) -> String {
        format!("{}_constructor", self.struct_type(name))
    }

    /// `<prefix>_<unit>_<Struct>_destructor`
    pub fn destructor(&self, name: Ident) -> String {
        format!("{}_destructor", self.struct_type(name))
    }

    /// `<prefix>_<unit>[_<Receiver>]_<name>`
    pub fn func(&self, receiver: Option<Ident>, name: Ident) -> String {
        match receiver {
            Some(r) => format!("{}_{}_{}", self.base, self.ident(r), self.ident(name)),
            None => format!("{}_{}", self.base, self.ident(name)),
        }
    }

    /// `<PREFIX>_<suffix>`, for unit-independent macros.
    pub fn macro_name(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.prefix_upper)
    }

    /// The constructor's version-token parameter, `<prefix>_version`.
    pub fn version_param(&self) -> String {
        format!("{}_version", self.prefix)
    }

    /// `<PREFIX>_<UNIT>_H`
    pub fn include_guard(&self) -> String {
        format!("{}_{}_H", self.prefix_upper, self.unit_upper)
    }

    /// `f_<name>`
    pub fn field(&self, name: Ident) -> String {
        format!("{FIELD_PREFIX}{}", self.ident(name))
    }

    /// `v_<name>`
    pub fn local(&self, name: Ident) -> String {
        format!("{LOCAL_PREFIX}{}", self.ident(name))
    }
}
