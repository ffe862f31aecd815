//! Note flags
//!
//! Notes are free text made of comma-separated tokens. Some tokens are
//! flags the form can toggle on and off:
//! - plain flags ("Ceramica") toggle in place
//! - family flags ("Rami 2", "Sconto 20%") are exclusive: a family label
//!   followed by a value, at most one per family
//!
//! The text is rebuilt from tokens on every change, so removal never leaves
//! empty tokens or doubled separators behind.

use serde::{Deserialize, Serialize};

/// Separator used when rebuilding notes
pub const SEPARATOR: &str = ", ";

/// Default exclusive families
pub const DEFAULT_FAMILIES: &[&str] = &["Sconto", "Rami"];

/// Labels of the exclusive flag families
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFamilies(Vec<String>);

impl Default for NoteFamilies {
    fn default() -> Self {
        Self::new(DEFAULT_FAMILIES.iter().copied())
    }
}

impl NoteFamilies {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            labels
                .into_iter()
                .map(Into::into)
                .map(|l: String| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        )
    }

    /// Family label of a token: "Rami 4" → Some("Rami"). The label must be
    /// followed by whitespace and a non-empty value, so "Ramino" is not a
    /// member of "Rami".
    pub fn family_of<'a>(&'a self, token: &str) -> Option<&'a str> {
        self.0
            .iter()
            .find(|label| {
                token
                    .strip_prefix(label.as_str())
                    .is_some_and(|rest| rest.starts_with(char::is_whitespace) && !rest.trim().is_empty())
            })
            .map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }
}

/// Split notes into trimmed, non-empty tokens
pub fn tokens(notes: &str) -> Vec<&str> {
    notes
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Toggle `flag` in `notes` and return the rebuilt text.
///
/// A flag already present is removed. Otherwise, for a family flag every
/// other token of the same family is removed first, then the flag is
/// appended.
pub fn toggle_flag(notes: &str, flag: &str, families: &NoteFamilies) -> String {
    let flag = flag.trim();
    let mut current = tokens(notes);
    if flag.is_empty() {
        return current.join(SEPARATOR);
    }

    if current.contains(&flag) {
        current.retain(|t| *t != flag);
        return current.join(SEPARATOR);
    }

    if let Some(family) = families.family_of(flag) {
        current.retain(|t| families.family_of(t) != Some(family));
    }
    current.push(flag);
    current.join(SEPARATOR)
}

/// True when `flag` is one of the tokens of `notes`
pub fn has_flag(notes: &str, flag: &str) -> bool {
    tokens(notes).contains(&flag.trim())
}
