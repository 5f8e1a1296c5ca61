//! Built-in token archetypes.
//!
//! Consulted only when a `PLACE` or `CREATE` names something no `SPRITE DEF`
//! declared. Art is an inline SVG with `{{fill}}`, `{{stroke}}` and `{{label}}`
//! placeholders.

/// A built-in archetype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub faction: &'static str,
    /// Feet per turn.
    pub speed: u32,
    /// Footprint in cells.
    pub size: f64,
    pub fill: &'static str,
    pub stroke: &'static str,
    pub hp: i32,
    /// Attack list in the `name|mode|to_hit|damage|reach` format, `;`-separated.
    pub attacks: &'static str,
    pub art: &'static str,
}

const ROUND_ART: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 64">"#,
    r#"<circle cx="32" cy="32" r="28" fill="{{fill}}" stroke="{{stroke}}" stroke-width="4"/>"#,
    r#"<text x="32" y="40" text-anchor="middle" font-size="22" fill="{{stroke}}">{{label}}</text>"#,
    "</svg>"
);

const SHIELD_ART: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 64">"#,
    r#"<path d="M32 4 L58 14 L54 42 L32 60 L10 42 L6 14 Z" fill="{{fill}}" stroke="{{stroke}}" stroke-width="4"/>"#,
    r#"<text x="32" y="40" text-anchor="middle" font-size="20" fill="{{stroke}}">{{label}}</text>"#,
    "</svg>"
);

const SQUARE_ART: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 64">"#,
    r#"<rect x="6" y="6" width="52" height="52" rx="8" fill="{{fill}}" stroke="{{stroke}}" stroke-width="4"/>"#,
    r#"<text x="32" y="40" text-anchor="middle" font-size="20" fill="{{stroke}}">{{label}}</text>"#,
    "</svg>"
);

pub static TEMPLATES: &[TokenTemplate] = &[
    TokenTemplate {
        id: "goblin",
        name: "Goblin",
        category: "creature",
        faction: "enemy",
        speed: 30,
        size: 1.0,
        fill: "#5c8a3a",
        stroke: "#1f2d14",
        hp: 7,
        attacks: "Scimitar|melee|+4|1d6+2|1/1;Shortbow|ranged|+4|1d6+2|2/16",
        art: ROUND_ART,
    },
    TokenTemplate {
        id: "orc",
        name: "Orc",
        category: "creature",
        faction: "enemy",
        speed: 30,
        size: 1.0,
        fill: "#6b7d3c",
        stroke: "#26300f",
        hp: 15,
        attacks: "Greataxe|melee|+5|1d12+3|1/1;Javelin|ranged|+5|1d6+3|2/6",
        art: ROUND_ART,
    },
    TokenTemplate {
        id: "skeleton",
        name: "Skeleton",
        category: "undead",
        faction: "hostile",
        speed: 30,
        size: 1.0,
        fill: "#e8e2cf",
        stroke: "#4a4536",
        hp: 13,
        attacks: "Shortsword|melee|+4|1d6+2|1/1;Shortbow|ranged|+4|1d6+2|2/16",
        art: ROUND_ART,
    },
    TokenTemplate {
        id: "wolf",
        name: "Wolf",
        category: "beast",
        faction: "hostile",
        speed: 40,
        size: 1.0,
        fill: "#8a8a8a",
        stroke: "#2b2b2b",
        hp: 11,
        attacks: "Bite|melee|+4|2d4+2|1/1",
        art: ROUND_ART,
    },
    TokenTemplate {
        id: "hero",
        name: "Hero",
        category: "character",
        faction: "pc",
        speed: 30,
        size: 1.0,
        fill: "#2f6fd0",
        stroke: "#0d2247",
        hp: 24,
        attacks: "Longsword|melee|+5|1d8+3|1/1",
        art: SHIELD_ART,
    },
    TokenTemplate {
        id: "archer",
        name: "Archer",
        category: "character",
        faction: "ally",
        speed: 30,
        size: 1.0,
        fill: "#3fa36b",
        stroke: "#103522",
        hp: 18,
        attacks: "Longbow|ranged|+6|1d8+3|2/30;Dagger|melee|+4|1d4+2|1/1",
        art: SHIELD_ART,
    },
    TokenTemplate {
        id: "mage",
        name: "Mage",
        category: "character",
        faction: "ally",
        speed: 30,
        size: 1.0,
        fill: "#7a4fc9",
        stroke: "#24123f",
        hp: 14,
        attacks: "Fire Bolt|ranged spell|+6|1d10|1/24;Staff|melee|+2|1d6|1/1",
        art: SHIELD_ART,
    },
    TokenTemplate {
        id: "tree",
        name: "Tree",
        category: "terrain",
        faction: "neutral",
        speed: 0,
        size: 1.0,
        fill: "#2e6b2e",
        stroke: "#123012",
        hp: 0,
        attacks: "",
        art: ROUND_ART,
    },
    TokenTemplate {
        id: "rock",
        name: "Rock",
        category: "terrain",
        faction: "neutral",
        speed: 0,
        size: 1.0,
        fill: "#7d7468",
        stroke: "#302b25",
        hp: 0,
        attacks: "",
        art: SQUARE_ART,
    },
    TokenTemplate {
        id: "barrel",
        name: "Barrel",
        category: "object",
        faction: "neutral",
        speed: 0,
        size: 1.0,
        fill: "#8b5a2b",
        stroke: "#3b230e",
        hp: 5,
        attacks: "",
        art: SQUARE_ART,
    },
];

/// Look up a template by id, ignoring case.
pub fn find_template(id: &str) -> Option<&'static TokenTemplate> {
    TEMPLATES.iter().find(|t| t.id.eq_ignore_ascii_case(id))
}

impl TokenTemplate {
    /// Fill in the art placeholders. `fill` overrides the template's default color.
    pub fn render_art(&self, label: &str, fill: Option<&str>) -> String {
        self.art
            .replace("{{fill}}", fill.unwrap_or(self.fill))
            .replace("{{stroke}}", self.stroke)
            .replace("{{label}}", &escape_label(label))
    }
}

fn escape_label(label: &str) -> String {
    label
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(find_template("Goblin").map(|t| t.id), Some("goblin"));
        assert!(find_template("dragon").is_none());
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = TEMPLATES.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), TEMPLATES.len());
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let goblin = find_template("goblin").unwrap();
        let svg = goblin.render_art("G<1>", Some("#ff0000"));
        assert!(svg.contains("fill=\"#ff0000\""));
        assert!(svg.contains("G&lt;1&gt;"));
        assert!(!svg.contains("{{"));
    }
}
