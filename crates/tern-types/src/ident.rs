//! Interned identifiers and the symbol table that names them.
//!
//! The front end interns every identifier it sees. A fixed set of built-in
//! names (the receiver keyword and the primitive type names) always occupies
//! the lowest indices, so the backend can recognize them without string
//! comparisons.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An interned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(pub u32);

impl Ident {
    /// The receiver keyword, `this`.
    pub const THIS: Self = Self(0);
    pub const I8: Self = Self(1);
    pub const I16: Self = Self(2);
    pub const I32: Self = Self(3);
    pub const I64: Self = Self(4);
    pub const U8: Self = Self(5);
    pub const U16: Self = Self(6);
    pub const U32: Self = Self(7);
    pub const U64: Self = Self(8);
    pub const USIZE: Self = Self(9);
    pub const BOOL: Self = Self(10);

    /// Whether this identifier is one of the pre-interned built-ins.
    pub fn is_builtin(self) -> bool {
        (self.0 as usize) < BUILTIN_NAMES.len()
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Display names of the built-in identifiers, indexed by [`Ident`] value.
pub const BUILTIN_NAMES: [&str; 11] = [
    "this", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "usize", "bool",
];

/// Errors raised while rebuilding an [`IdMap`] from serialized form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdMapError {
    #[error("built-in identifier {index} must be {expected:?}, found {found:?}")]
    BuiltinMismatch {
        index: usize,
        expected: &'static str,
        found: String,
    },

    #[error("identifier {0:?} is interned twice")]
    Duplicate(String),
}

/// Bidirectional mapping between [`Ident`]s and their display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct IdMap {
    names: Vec<String>,
    by_name: HashMap<String, Ident>,
}

impl IdMap {
    /// Create a map holding only the built-in identifiers.
    pub fn new() -> Self {
        let mut map = Self {
            names: Vec::with_capacity(BUILTIN_NAMES.len()),
            by_name: HashMap::new(),
        };
        for name in BUILTIN_NAMES {
            map.intern(name);
        }
        map
    }

    /// Intern `name`, returning the existing identifier if already present.
    pub fn intern(&mut self, name: &str) -> Ident {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = Ident(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Look up an identifier by display string.
    pub fn get(&self, name: &str) -> Option<Ident> {
        self.by_name.get(name).copied()
    }

    /// The display string for `id`. Unknown identifiers render as `#N` so
    /// that error messages stay readable even for malformed input.
    pub fn name(&self, id: Ident) -> std::borrow::Cow<'_, str> {
        match self.names.get(id.0 as usize) {
            Some(s) => std::borrow::Cow::Borrowed(s.as_str()),
            None => std::borrow::Cow::Owned(id.to_string()),
        }
    }

    /// Whether `id` was interned in this map.
    pub fn contains(&self, id: Ident) -> bool {
        (id.0 as usize) < self.names.len()
    }

    /// Number of interned identifiers, built-ins included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for IdMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<String>> for IdMap {
    type Error = IdMapError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        for (index, expected) in BUILTIN_NAMES.iter().enumerate() {
            match names.get(index) {
                Some(found) if found == expected => {}
                found => {
                    return Err(IdMapError::BuiltinMismatch {
                        index,
                        expected,
                        found: found.cloned().unwrap_or_default(),
                    })
                }
            }
        }
        let mut by_name = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if by_name.insert(name.clone(), Ident(i as u32)).is_some() {
                return Err(IdMapError::Duplicate(name.clone()));
            }
        }
        Ok(Self { names, by_name })
    }
}

impl From<IdMap> for Vec<String> {
    fn from(map: IdMap) -> Self {
        map.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_have_fixed_indices() {
        let map = IdMap::new();
        assert_eq!(map.get("this"), Some(Ident::THIS));
        assert_eq!(map.get("u8"), Some(Ident::U8));
        assert_eq!(map.get("usize"), Some(Ident::USIZE));
        assert_eq!(map.get("bool"), Some(Ident::BOOL));
        assert_eq!(map.len(), BUILTIN_NAMES.len());
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut map = IdMap::new();
        let a = map.intern("decoder");
        let b = map.intern("decoder");
        assert_eq!(a, b);
        assert_eq!(map.name(a), "decoder");
        assert!(!a.is_builtin());
    }

    #[test]
    fn test_unknown_ident_renders_placeholder() {
        let map = IdMap::new();
        assert_eq!(map.name(Ident(999)), "#999");
        assert!(!map.contains(Ident(999)));
    }

    #[test]
    fn test_json_round_trip() {
        let mut map = IdMap::new();
        let id = map.intern("width");
        let json = serde_json::to_string(&map).unwrap();
        let back: IdMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("width"), Some(id));
        assert_eq!(back, map);
    }

    #[test]
    fn test_rejects_missing_builtins() {
        let err = IdMap::try_from(vec!["this".to_string(), "x".to_string()]).unwrap_err();
        assert_eq!(
            err,
            IdMapError::BuiltinMismatch {
                index: 1,
                expected: "i8",
                found: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut names: Vec<String> = BUILTIN_NAMES.iter().map(|s| s.to_string()).collect();
        names.push("dup".to_string());
        names.push("dup".to_string());
        assert_eq!(
            IdMap::try_from(names).unwrap_err(),
            IdMapError::Duplicate("dup".to_string())
        );
    }
}
