//! Generator options.

use serde::Deserialize;

use crate::error::{CodegenError, CodegenResult};

/// Default name prefix for every generated C identifier.
pub const DEFAULT_PREFIX: &str = "tern";

/// Default value of the `<PREFIX>_VERSION` macro: major 1, minor 0.
pub const DEFAULT_VERSION: u32 = 0x0001_0000;

/// Which artifact to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Artifact {
    /// Public interface only (`.h`).
    Header,
    /// Interface plus private declarations and all bodies (`.c`).
    Implementation,
}

/// Options for C code generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenOptions {
    /// Leading component of every generated name.
    pub prefix: String,
    /// The unit (package) name; second component of every generated name.
    pub unit_name: String,
    /// Value the constructors check the caller's version token against.
    pub version: u32,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            unit_name: String::new(),
            version: DEFAULT_VERSION,
        }
    }
}

impl CodegenOptions {
    /// Default options for the unit `unit_name`.
    pub fn new(unit_name: impl Into<String>) -> Self {
        Self {
            unit_name: unit_name.into(),
            ..Self::default()
        }
    }

    /// Set the name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the compiled-in version token.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Parse options from a JSON document, e.g. a build configuration file.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Check that the prefix and unit name are usable in C identifiers.
    pub fn validate(&self) -> CodegenResult<()> {
        check_name("prefix", &self.prefix)?;
        check_name("unit", &self.unit_name)
    }
}

fn check_name(what: &'static str, name: &str) -> CodegenResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c == '_' || c.is_ascii_lowercase() => {
            chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CodegenError::InvalidName {
            what,
            name: name.to_string(),
        })
    }
}
