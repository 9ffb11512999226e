//! Member identity and per-user delivery settings.

use std::collections::BTreeMap;

use crate::{Result, RoomError};

/// Fold a name to the key used for case-insensitive comparison.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Per-user delivery settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserConfig {
    /// Suppress announcements (join/leave notices).
    pub quiet: bool,
}

impl UserConfig {
    /// Flip quiet mode and return the new state.
    pub fn toggle_quiet(&mut self) -> bool {
        self.quiet = !self.quiet;
        self.quiet
    }
}

/// A user's name and the set of names they do not want to hear from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    /// Ignored names keyed by folded name, valued by the spelling given.
    ignored: BTreeMap<String, String>,
}

impl Identity {
    /// Create an identity.
    ///
    /// Names must be non-empty and must not contain whitespace, since command
    /// arguments are whitespace-delimited.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RoomError::InvalidName);
        }
        Ok(Self {
            name,
            ignored: BTreeMap::new(),
        })
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-folded name.
    pub fn key(&self) -> String {
        fold_name(&self.name)
    }

    /// Start ignoring `name`.
    pub fn ignore(&mut self, name: &str) -> Result<()> {
        let key = fold_name(name);
        if key == self.key() {
            return Err(RoomError::CannotIgnoreSelf);
        }
        if self.ignored.contains_key(&key) {
            return Err(RoomError::AlreadyIgnored(name.to_string()));
        }
        self.ignored.insert(key, name.to_string());
        Ok(())
    }

    /// Stop ignoring `name`.
    pub fn unignore(&mut self, name: &str) -> Result<()> {
        self.ignored
            .remove(&fold_name(name))
            .map(|_| ())
            .ok_or_else(|| RoomError::NotIgnored(name.to_string()))
    }

    /// Whether messages authored by `name` are suppressed for this identity.
    pub fn is_ignoring(&self, name: &str) -> bool {
        self.ignored.contains_key(&fold_name(name))
    }

    /// Ignored names, ordered by folded name.
    pub fn ignored(&self) -> Vec<&str> {
        self.ignored.values().map(String::as_str).collect()
    }
}
