//! Token identifiers.
//!
//! A token id is a `(base, seq)` pair rendered as `base-seq`, e.g. `G-1`. Lookups
//! compare whole ids; matching on a text prefix is a separate, explicit query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Composite token identifier.
///
/// Ordering is by base, then numerically by sequence, so `G-2` sorts before `G-10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TokenId {
    base: String,
    seq: u32,
}

/// Text that does not have the `base-seq` shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid token id '{0}' (expected <base>-<number>)")]
pub struct TokenIdError(pub String);

impl TokenId {
    pub fn new(base: impl Into<String>, seq: u32) -> Self {
        Self { base: base.into(), seq }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Mint the next id for `base`: one past the highest sequence already used.
    ///
    /// With no removals this is `count + 1`; after removals it still never
    /// reuses a live id.
    pub fn next_for<'a>(base: &str, existing: impl IntoIterator<Item = &'a TokenId>) -> TokenId {
        let highest = existing
            .into_iter()
            .filter(|id| id.base == base)
            .map(|id| id.seq)
            .max()
            .unwrap_or(0);
        TokenId::new(base, highest + 1)
    }

    /// Whether the rendered id begins with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.to_string().starts_with(prefix)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.seq)
    }
}

impl FromStr for TokenId {
    type Err = TokenIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (base, seq) = s.rsplit_once('-').ok_or_else(|| TokenIdError(s.to_string()))?;
        if base.is_empty() || base.chars().any(char::is_whitespace) {
            return Err(TokenIdError(s.to_string()));
        }
        let seq = seq.parse().map_err(|_| TokenIdError(s.to_string()))?;
        Ok(TokenId::new(base, seq))
    }
}

impl From<TokenId> for String {
    fn from(id: TokenId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for TokenId {
    type Error = TokenIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders() {
        let id: TokenId = "G-12".parse().unwrap();
        assert_eq!(id.base(), "G");
        assert_eq!(id.seq(), 12);
        assert_eq!(id.to_string(), "G-12");

        let hyphenated: TokenId = "orc-boss-3".parse().unwrap();
        assert_eq!(hyphenated.base(), "orc-boss");
        assert_eq!(hyphenated.seq(), 3);
    }

    #[test]
    fn rejects_ids_without_sequence() {
        assert!("G".parse::<TokenId>().is_err());
        assert!("G-".parse::<TokenId>().is_err());
        assert!("-4".parse::<TokenId>().is_err());
        assert!("G-x".parse::<TokenId>().is_err());
    }

    #[test]
    fn next_for_counts_per_base() {
        let existing = vec![TokenId::new("G", 1), TokenId::new("G", 2), TokenId::new("Gob", 1)];
        assert_eq!(TokenId::next_for("G", &existing), TokenId::new("G", 3));
        assert_eq!(TokenId::next_for("Gob", &existing), TokenId::new("Gob", 2));
        assert_eq!(TokenId::next_for("O", &existing), TokenId::new("O", 1));
    }

    #[test]
    fn next_for_skips_past_gaps() {
        let existing = vec![TokenId::new("G", 2)];
        assert_eq!(TokenId::next_for("G", &existing), TokenId::new("G", 3));
    }

    #[test]
    fn numeric_ordering() {
        let mut ids = vec![TokenId::new("G", 10), TokenId::new("G", 2), TokenId::new("G", 1)];
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["G-1", "G-2", "G-10"]);
    }

    #[test]
    fn prefix_is_textual() {
        let id = TokenId::new("G", 10);
        assert!(id.has_prefix("G"));
        assert!(id.has_prefix("G-1"));
        assert!(!id.has_prefix("G-2"));
    }
}
