//! Attack profiles.
//!
//! Written as `name|mode|to_hit|damage|reach`, several separated by `;`:
//! `Scimitar|melee|+4|1d6+2|1/1;Shortbow|ranged|+4|1d6+2|2/16`. Only the name
//! is required.

use std::fmt;

use serde::{Deserialize, Serialize};
use skirmish_data::AttackKind;

/// Inclusive window of cell distances an attack can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachRange {
    pub min: u32,
    pub max: u32,
}

impl Default for ReachRange {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

impl ReachRange {
    /// Read `"min/max"`; a single number `n` means `1/n`. Anything else
    /// (including `min > max`) gives the default `1/1`.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let parsed = match text.split_once('/') {
            Some((min, max)) => min.trim().parse().ok().zip(max.trim().parse().ok()),
            None => text.parse().ok().map(|max| (1, max)),
        };
        match parsed {
            Some((min, max)) if min <= max => Self { min, max },
            _ => Self::default(),
        }
    }

    pub fn covers(&self, distance: u32) -> bool {
        (self.min..=self.max).contains(&distance)
    }
}

impl fmt::Display for ReachRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    pub name: String,
    /// Free text such as `melee`, `ranged` or `ranged spell`.
    pub mode: String,
    pub to_hit: i32,
    pub damage: String,
    pub reach: ReachRange,
}

impl Attack {
    pub fn parse(entry: &str) -> Option<Attack> {
        let mut fields = entry.split('|').map(str::trim);
        let name = fields.next().filter(|n| !n.is_empty())?;
        let mode = fields.next().filter(|m| !m.is_empty()).unwrap_or("melee");
        let to_hit = fields
            .next()
            .and_then(|h| h.trim_start_matches('+').parse().ok())
            .unwrap_or(0);
        let damage = fields.next().unwrap_or_default();
        let reach = fields.next().map(ReachRange::parse).unwrap_or_default();
        Some(Attack {
            name: name.to_string(),
            mode: mode.to_string(),
            to_hit,
            damage: damage.to_string(),
            reach,
        })
    }

    /// Parse a `;`-separated list, skipping entries without a name.
    pub fn parse_list(text: &str) -> Vec<Attack> {
        text.split(';').filter_map(Attack::parse).collect()
    }

    pub fn kind(&self) -> AttackKind {
        AttackKind::classify(&self.mode)
    }
}
