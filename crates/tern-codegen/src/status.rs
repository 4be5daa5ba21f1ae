//! The status-code table of a compilation unit.
//!
//! Status codes are non-positive integers. Zero is success; the least
//! significant bit marks a non-recoverable error; negative even values are
//! recoverable suspensions. The built-in codes come first, then one entry per
//! status the unit declares, in source order.

use std::collections::HashMap;

use tern_types::ast::{CompilationUnit, StatusKind};
use tern_types::{Ident, Span};

use crate::error::{CodegenError, CodegenResult};
use crate::names::Names;

/// One entry of the status enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// The name as written in the DSL (`short_src`).
    pub name: String,
    /// `None` for `ok`.
    pub kind: Option<StatusKind>,
    pub value: i32,
}

impl StatusEntry {
    /// The enumerator name, e.g. `tern_gif_error_bad_version`.
    pub fn c_name(&self, names: &Names<'_>) -> String {
        match self.kind {
            Some(StatusKind::Error) => names.error(&self.name),
            Some(StatusKind::Suspension) | None => names.suspension(&self.name),
        }
    }

    pub fn is_error(&self) -> bool {
        self.value & 1 != 0
    }
}

/// The built-in codes: `(name, kind, ordinal)`. Ordinal `n` gives the value
/// `-2n + 1` for errors and `-2n` for suspensions.
const BUILTIN_STATUSES: [(&str, StatusKind, i32); 5] = [
    ("bad_version", StatusKind::Error, 1),
    ("null_receiver", StatusKind::Error, 2),
    ("constructor_not_called", StatusKind::Error, 3),
    ("short_dst", StatusKind::Suspension, 4),
    ("short_src", StatusKind::Suspension, 5),
];

pub const BAD_VERSION: &str = "bad_version";
pub const NULL_RECEIVER: &str = "null_receiver";
pub const CONSTRUCTOR_NOT_CALLED: &str = "constructor_not_called";

fn status_value(kind: StatusKind, ordinal: i32) -> i32 {
    match kind {
        StatusKind::Error => -2 * ordinal + 1,
        StatusKind::Suspension => -2 * ordinal,
    }
}

/// Every status code of a unit, in enumeration order.
#[derive(Debug, Clone)]
pub struct StatusTable {
    entries: Vec<StatusEntry>,
    by_name: HashMap<String, usize>,
}

impl StatusTable {
    /// Build the table for `unit`. Declared names must be distinct from each
    /// other and from the built-ins.
    pub fn new(unit: &CompilationUnit, names: &Names<'_>) -> CodegenResult<Self> {
        let mut table = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        };
        table.push("ok".to_string(), None, 0, Span::default())?;
        for (name, kind, ordinal) in BUILTIN_STATUSES {
            table.push(name.to_string(), Some(kind), status_value(kind, ordinal), Span::default())?;
        }

        let mut ordinal = BUILTIN_STATUSES.len() as i32;
        for decl in unit.statuses() {
            ordinal += 1;
            let name = names.ident(decl.name).into_owned();
            table.push(name, Some(decl.kind), status_value(decl.kind, ordinal), decl.span)?;
        }
        Ok(table)
    }

    fn push(&mut self, name: String, kind: Option<StatusKind>, value: i32, span: Span) -> CodegenResult<()> {
        if self.by_name.contains_key(&name) {
            return Err(CodegenError::invalid(format!("status {name:?} is declared twice"), span));
        }
        self.by_name.insert(name.clone(), self.entries.len());
        self.entries.push(StatusEntry { name, kind, value });
        Ok(())
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    /// The entry named by the DSL identifier `name`.
    pub fn lookup(&self, name: Ident, names: &Names<'_>) -> Option<&StatusEntry> {
        self.get(&names.ident(name))
    }

    pub fn get(&self, name: &str) -> Option<&StatusEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// The enumerator for a built-in code. Built-ins are always present.
    pub fn builtin(&self, name: &str, names: &Names<'_>) -> String {
        match self.get(name) {
            Some(entry) => entry.c_name(names),
            None => names.error(name),
        }
    }
}
