//! Name-based fallback lookup for dependency sites without type
//! declarations.
//!
//! The alias table maps plain names to candidate keys. It is consulted
//! only when a constructor parameter (or explicit `Name` key) carries no
//! type declaration; a declared dependency is never satisfied through an
//! alias.

use std::collections::HashMap;

use crate::key::TypeKey;

/// Secondary index from names to candidate keys.
///
/// Entries come from two sources: explicit `add_alias` calls, and the
/// automatic derivation performed for every concrete registration unless
/// the container runs in strict mode (simple name, lowercase form, and
/// snake_case form, each pointing at the registered key).
#[derive(Debug, Default, Clone)]
pub(crate) struct AliasTable {
    entries: HashMap<String, Vec<TypeKey>>,
}

impl AliasTable {
    pub(crate) fn add(&mut self, name: impl Into<String>, key: TypeKey) {
        let candidates = self.entries.entry(name.into()).or_default();
        if !candidates.contains(&key) {
            candidates.push(key);
        }
    }

    /// Derives the three automatic entries for a registered type name.
    pub(crate) fn add_derived(&mut self, type_name: &'static str, key: &TypeKey) {
        let simple = simple_name(type_name);
        self.add(simple, key.clone());
        self.add(simple.to_lowercase(), key.clone());
        self.add(snake_name(simple), key.clone());
    }

    pub(crate) fn candidates(&self, name: &str) -> &[TypeKey] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The sole candidate for a name, if there is exactly one.
    pub(crate) fn single_candidate(&self, name: &str) -> Option<&TypeKey> {
        match self.candidates(name) {
            [key] => Some(key),
            _ => None,
        }
    }
}

/// Strips module path and generic arguments from a `type_name` result.
pub(crate) fn simple_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Snake-case form of a simple type name.
///
/// An underscore goes before an uppercase letter that follows a lowercase
/// letter or digit, and before the last uppercase letter of an uppercase
/// run that is followed by a lowercase letter. Digits attach to the
/// preceding word.
pub(crate) fn snake_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let boundary = match chars.get(i.wrapping_sub(1)) {
                _ if i == 0 => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => {
                    matches!(chars.get(i + 1), Some(n) if n.is_lowercase())
                }
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
