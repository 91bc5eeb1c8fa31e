//! Runtime-settable named variables (spec.md §6: `set`/`unset`).
//!
//! Distinct from [`crate::config::Config`]: `Config` is resolved once at
//! startup, while `Environment` models the original `env.c` collaborator's
//! table of simulator-wide variables a user can inspect and change from
//! the interactive prompt (e.g. `stepping`, a device's default redirect
//! path). Values are untyped strings at this layer; individual commands
//! parse the subset they care about.

use std::collections::BTreeMap;

/// A runtime-settable value. Kept as a small enum (rather than a bare
/// `String`) so `set NAME` without a value can still report the kind a
/// variable holds, mirroring the original `env.c`'s tagged `var_t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    /// A boolean flag (`set trace`, `unset trace`).
    Bool(bool),
    /// An unsigned integer, decimal or `0x`-prefixed hex.
    Uint(u64),
    /// A free-form string.
    Str(String),
}

impl std::fmt::Display for EnvValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Uint(v) => write!(f, "{v:#x}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// The table of runtime variables spec.md §6's `set`/`unset` commands
/// operate on.
#[derive(Debug, Default)]
pub struct Environment {
    vars: BTreeMap<String, EnvValue>,
}

impl Environment {
    /// Creates an empty variable table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `set NAME = VAL`: assigns a variable, inferring its kind from the
    /// token (decimal/hex integer, `true`/`false`, else string).
    pub fn set(&mut self, name: impl Into<String>, raw: &str) {
        let value = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16).map_or_else(|_| EnvValue::Str(raw.to_string()), EnvValue::Uint)
        } else if let Ok(v) = raw.parse::<u64>() {
            EnvValue::Uint(v)
        } else if let Ok(b) = raw.parse::<bool>() {
            EnvValue::Bool(b)
        } else {
            EnvValue::Str(raw.to_string())
        };
        self.vars.insert(name.into(), value);
    }

    /// `unset NAME`: removes a variable. Returns `true` if one existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    /// `set NAME` (no `=`): looks up a variable's current value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        self.vars.get(name)
    }

    /// `set` with no arguments: lists every variable, sorted by name.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvValue)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_infers_hex_decimal_bool_and_string() {
        let mut env = Environment::new();
        env.set("base", "0x1000");
        env.set("count", "42");
        env.set("trace", "true");
        env.set("name", "hello");
        assert_eq!(env.get("base"), Some(&EnvValue::Uint(0x1000)));
        assert_eq!(env.get("count"), Some(&EnvValue::Uint(42)));
        assert_eq!(env.get("trace"), Some(&EnvValue::Bool(true)));
        assert_eq!(env.get("name"), Some(&EnvValue::Str("hello".to_string())));
    }

    #[test]
    fn unset_removes_variable() {
        let mut env = Environment::new();
        env.set("stepping", "true");
        assert!(env.unset("stepping"));
        assert_eq!(env.get("stepping"), None);
        assert!(!env.unset("stepping"));
    }
}
