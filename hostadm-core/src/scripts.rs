//! Embedded admin scripts.
//!
//! Script bodies are compiled into the binary and exposed through a
//! [`ScriptLibrary`] that is built once at startup and injected into the
//! execution engine. The table is read-only after construction; tests can
//! build their own library with [`ScriptLibrary::from_entries`].

use std::collections::BTreeMap;

/// Read-only mapping from script reference (e.g. `scripts/disk-usage.sh`) to
/// script body.
#[derive(Clone, Debug, Default)]
pub struct ScriptLibrary {
    scripts: BTreeMap<String, String>,
}

impl ScriptLibrary {
    /// The scripts bundled with this build.
    pub fn builtin() -> Self {
        Self::from_entries([
            ("scripts/list-users.sh", include_str!("../scripts/list-users.sh")),
            ("scripts/disk-usage.sh", include_str!("../scripts/disk-usage.sh")),
            (
                "scripts/service-summary.sh",
                include_str!("../scripts/service-summary.sh"),
            ),
            (
                "scripts/listening-ports.sh",
                include_str!("../scripts/listening-ports.sh"),
            ),
        ])
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            scripts: entries
                .into_iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scripts_are_present() {
        let lib = ScriptLibrary::builtin();
        assert!(lib.len() >= 4);
        let body = lib.get("scripts/disk-usage.sh").unwrap();
        assert!(body.starts_with("#!/usr/bin/env bash"));
        assert!(lib.get("scripts/does-not-exist.sh").is_none());
    }

    #[test]
    fn custom_entries() {
        let lib = ScriptLibrary::from_entries([("scripts/hi.sh", "echo hi\n")]);
        assert_eq!(lib.get("scripts/hi.sh"), Some("echo hi\n"));
        assert_eq!(lib.names().collect::<Vec<_>>(), vec!["scripts/hi.sh"]);
    }
}
