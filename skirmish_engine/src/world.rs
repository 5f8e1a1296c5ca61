//! Canonical battle state.
//!
//! [`WorldState`] is what the renderer draws and what followers replicate. It is
//! only ever replaced wholesale by [`crate::Interpreter::apply`]; the one thing
//! allowed to touch it between batches is the animation [`crate::Scheduler`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use skirmish_data::{Attrs, Cell, GridType, TokenId, TokenTemplate, find_template, point_to_cell};
use variantly::Variantly;

use crate::combat::Attack;

pub const DEFAULT_MAP_ID: &str = "default";
pub const DEFAULT_CELL_SIZE_PX: u32 = 64;
pub const DEFAULT_SPEED_FT: u32 = 30;
pub const DEFAULT_FACTION: &str = "neutral";
pub const DEFAULT_CATEGORY: &str = "creature";

/// Board geometry, backdrop and terrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub id: String,
    pub grid_type: GridType,
    pub cell_size_px: u32,
    pub cols: u32,
    pub rows: u32,
    pub background: Option<String>,
    /// Sparse; a missing cell is height 0.
    pub heights: BTreeMap<Cell, f64>,
    /// Set by `REMOVE HEIGHTMAP` so an empty height map stays empty.
    pub disable_auto_heights: bool,
    pub roads: BTreeSet<Cell>,
}

impl Default for Map {
    fn default() -> Self {
        Self {
            id: DEFAULT_MAP_ID.to_string(),
            grid_type: GridType::Square,
            cell_size_px: DEFAULT_CELL_SIZE_PX,
            cols: 0,
            rows: 0,
            background: None,
            heights: BTreeMap::new(),
            disable_auto_heights: false,
            roads: BTreeSet::new(),
        }
    }
}

impl Map {
    /// Every cell of the board in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let (cols, rows) = (self.cols, self.rows);
        (0..rows).flat_map(move |row| (0..cols).map(move |col| Cell::new(col, row)))
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.col < self.cols && cell.row < self.rows
    }

    pub fn height_at(&self, cell: Cell) -> f64 {
        self.heights.get(&cell).copied().unwrap_or(0.0)
    }

    /// Enlarge the board so that it is at least `cols` x `rows`.
    pub fn grow_to(&mut self, cols: u32, rows: u32) {
        self.cols = self.cols.max(cols);
        self.rows = self.rows.max(rows);
    }

    /// Fill every cell with height 0 when nothing has been written and auto
    /// heights are still enabled.
    pub(crate) fn fill_flat_default(&mut self) {
        if self.heights.is_empty() && !self.disable_auto_heights {
            let cells: Vec<Cell> = self.cells().collect();
            self.heights.extend(cells.into_iter().map(|cell| (cell, 0.0)));
        }
    }
}

/// Reusable token archetype, declared by `SPRITE DEF` or taken from the
/// built-in template library on first use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDefinition {
    pub id: String,
    pub code: String,
    pub name: String,
    pub category: String,
    pub art_ref: Option<String>,
    pub model_ref: Option<String>,
    pub base_size: f64,
    pub color_tint: Option<String>,
    pub faction: String,
    /// Feet per turn.
    pub speed: u32,
    pub hp: Option<i32>,
    pub attacks: Vec<Attack>,
}

impl TokenDefinition {
    /// Build a definition from `SPRITE DEF` attributes. A `template=<id>` attribute
    /// starts from that archetype; every other recognized key overrides it.
    pub fn from_attrs(code: &str, attrs: &Attrs) -> Self {
        let mut def = match attrs.get("template").and_then(|t| find_template(t)) {
            Some(template) => Self::from_template(template),
            None => Self {
                id: code.to_string(),
                code: code.to_string(),
                name: code.to_string(),
                category: DEFAULT_CATEGORY.to_string(),
                art_ref: None,
                model_ref: None,
                base_size: 1.0,
                color_tint: None,
                faction: DEFAULT_FACTION.to_string(),
                speed: DEFAULT_SPEED_FT,
                hp: None,
                attacks: Vec::new(),
            },
        };
        def.id = code.to_string();
        def.code = code.to_string();

        if let Some(name) = attr(attrs, &["name"]) {
            def.name = name.to_string();
        }
        if let Some(category) = attr(attrs, &["category", "type", "kind"]) {
            def.category = category.to_string();
        }
        if let Some(art) = attr(attrs, &["art", "sprite", "image", "svg"]) {
            def.art_ref = Some(art.to_string());
        }
        if let Some(model) = attr(attrs, &["model"]) {
            def.model_ref = Some(model.to_string());
        }
        if let Some(size) = attr(attrs, &["size", "base_size"]).and_then(|s| s.parse().ok()) {
            def.base_size = size;
        }
        if let Some(color) = attr(attrs, &["color", "tint", "fill"]) {
            def.color_tint = Some(color.to_string());
        }
        if let Some(faction) = attr(attrs, &["faction", "team", "side"]) {
            def.faction = faction.to_lowercase();
        }
        if let Some(speed) = attr(attrs, &["speed"]).and_then(|s| s.parse().ok()) {
            def.speed = speed;
        }
        if let Some(hp) = attr(attrs, &["hp", "hpmax"]).and_then(|s| s.parse().ok()) {
            def.hp = Some(hp);
        }
        if let Some(attacks) = attr(attrs, &["attacks"]) {
            def.attacks = Attack::parse_list(attacks);
        }
        def
    }

    pub fn from_template(template: &TokenTemplate) -> Self {
        let label: String = template.name.chars().take(1).collect();
        Self {
            id: template.id.to_string(),
            code: template.id.to_string(),
            name: template.name.to_string(),
            category: template.category.to_string(),
            art_ref: Some(template.render_art(&label, None)),
            model_ref: None,
            base_size: template.size,
            color_tint: Some(template.fill.to_string()),
            faction: template.faction.to_string(),
            speed: template.speed,
            hp: Some(template.hp),
            attacks: Attack::parse_list(template.attacks),
        }
    }

    fn matches(&self, reference: &str) -> bool {
        self.code.eq_ignore_ascii_case(reference) || self.id.eq_ignore_ascii_case(reference)
    }
}

fn attr<'a>(attrs: &'a Attrs, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| attrs.get(*key))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Find a definition by code or id, ignoring case.
pub fn lookup_definition<'a>(definitions: &'a [TokenDefinition], reference: &str) -> Option<&'a TokenDefinition> {
    definitions.iter().find(|def| def.matches(reference))
}

/// Insert `def`, replacing any definition with the same code.
pub fn upsert_definition(definitions: &mut Vec<TokenDefinition>, def: TokenDefinition) {
    match definitions.iter_mut().find(|d| d.code.eq_ignore_ascii_case(&def.code)) {
        Some(existing) => *existing = def,
        None => definitions.push(def),
    }
}

/// Resolve a `PLACE` / `CREATE` reference: declared definitions first, then the
/// template library (which is recorded as a definition on first use).
pub fn resolve_definition(definitions: &mut Vec<TokenDefinition>, reference: &str) -> Option<TokenDefinition> {
    if let Some(def) = lookup_definition(definitions, reference) {
        return Some(def.clone());
    }
    let def = TokenDefinition::from_template(find_template(reference)?);
    upsert_definition(definitions, def.clone());
    Some(def)
}

/// Fractional board position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub col: f64,
    pub row: f64,
}

impl Point {
    pub fn distance(self, other: Point) -> f64 {
        (other.col - self.col).hypot(other.row - self.row)
    }
}

impl From<Cell> for Point {
    fn from(cell: Cell) -> Self {
        Point {
            col: f64::from(cell.col),
            row: f64::from(cell.row),
        }
    }
}

/// A token on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInstance {
    pub id: TokenId,
    pub def_id: String,
    pub map_id: String,
    /// Fractional while a move is animating.
    pub col: f64,
    pub row: f64,
    pub speed: u32,
    pub faction: String,
    pub kind: String,
    pub size: f64,
    pub name: String,
    pub art_override: Option<String>,
}

impl TokenInstance {
    /// Place a fresh instance of `def` at `cell`. `overrides` are the `CREATE`
    /// attributes (`name`, `faction`, `speed`, `size`, `art`).
    pub fn spawn(id: TokenId, def: &TokenDefinition, map_id: &str, cell: Cell, overrides: &Attrs) -> Self {
        let mut instance = Self {
            id,
            def_id: def.id.clone(),
            map_id: map_id.to_string(),
            col: f64::from(cell.col),
            row: f64::from(cell.row),
            speed: def.speed,
            faction: def.faction.clone(),
            kind: def.category.clone(),
            size: def.base_size,
            name: def.name.clone(),
            art_override: None,
        };
        instance.apply_attrs(overrides);
        if let Some(art) = attr(overrides, &["art", "sprite", "image", "svg"]) {
            instance.art_override = Some(art.to_string());
        }
        instance
    }

    /// Apply the instance-level keys of a `STATE` or `CREATE`; other keys are ignored.
    pub fn apply_attrs(&mut self, attrs: &Attrs) {
        if let Some(name) = attr(attrs, &["name"]) {
            self.name = name.to_string();
        }
        if let Some(faction) = attr(attrs, &["faction", "team", "side"]) {
            self.faction = faction.to_lowercase();
        }
        if let Some(speed) = attr(attrs, &["speed"]).and_then(|s| s.parse().ok()) {
            self.speed = speed;
        }
        if let Some(size) = attr(attrs, &["size"]).and_then(|s| s.parse().ok()) {
            self.size = size;
        }
    }

    pub fn position(&self) -> Point {
        Point {
            col: self.col,
            row: self.row,
        }
    }

    pub fn set_position(&mut self, point: Point) {
        self.col = point.col;
        self.row = point.row;
    }

    /// Nearest whole cell.
    pub fn cell(&self) -> Option<Cell> {
        point_to_cell(self.col, self.row)
    }
}

/// One token's queued walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMove {
    pub token_id: TokenId,
    pub path: Vec<Point>,
    /// Index of the waypoint being walked toward.
    pub index: usize,
    /// Cells per second before the global speed scale.
    pub speed: f64,
}

impl ActiveMove {
    pub fn next_waypoint(&self) -> Option<Point> {
        self.path.get(self.index).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.path.len()
    }
}

/// Where an effect starts or lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Variantly)]
#[serde(rename_all = "lowercase")]
pub enum EffectEndpoint {
    Token(TokenId),
    Cell(Cell),
}

/// A timed visual effect (attack swing, spell burst, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub id: u64,
    pub kind: String,
    pub source: EffectEndpoint,
    pub target: EffectEndpoint,
    pub speed: f64,
    /// Seconds.
    pub duration: f64,
    pub age: f64,
}

impl ActiveEffect {
    pub fn is_expired(&self) -> bool {
        self.age > self.duration
    }
}

/// Everything the renderer needs to draw one moment of the battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub map: Map,
    pub token_definitions: Vec<TokenDefinition>,
    /// Creation order.
    pub token_instances: Vec<TokenInstance>,
    pub active_moves: Vec<ActiveMove>,
    pub active_effects: Vec<ActiveEffect>,
    /// Id handed to the next effect.
    pub next_effect_id: u64,
}

impl WorldState {
    pub fn instance(&self, id: &TokenId) -> Option<&TokenInstance> {
        self.token_instances.iter().find(|t| &t.id == id)
    }

    pub fn instance_mut(&mut self, id: &TokenId) -> Option<&mut TokenInstance> {
        self.token_instances.iter_mut().find(|t| &t.id == id)
    }

    /// First instance, in creation order, whose rendered id starts with `prefix`.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&TokenInstance> {
        self.token_instances.iter().find(|t| t.id.has_prefix(prefix))
    }

    /// Resolve a script reference to a live token id: exact match, then (only
    /// if `prefix_fallback`) the first prefix match.
    pub fn resolve_token(&self, reference: &str, prefix_fallback: bool) -> Option<TokenId> {
        if let Ok(id) = reference.parse::<TokenId>()
            && self.instance(&id).is_some()
        {
            return Some(id);
        }
        if prefix_fallback {
            return self.find_by_prefix(reference).map(|t| t.id.clone());
        }
        None
    }

    pub fn definition(&self, reference: &str) -> Option<&TokenDefinition> {
        lookup_definition(&self.token_definitions, reference)
    }

    /// Next free id for `base`.
    pub fn mint_id(&self, base: &str) -> TokenId {
        TokenId::next_for(base, self.token_instances.iter().map(|t| &t.id))
    }

    pub fn active_move(&self, id: &TokenId) -> Option<&ActiveMove> {
        self.active_moves.iter().find(|m| &m.token_id == id)
    }

    /// Queue `mv`, replacing any in-flight move of the same token.
    pub fn replace_move(&mut self, mv: ActiveMove) {
        self.active_moves.retain(|m| m.token_id != mv.token_id);
        self.active_moves.push(mv);
    }

    pub fn push_effect(&mut self, mut effect: ActiveEffect) -> u64 {
        self.next_effect_id += 1;
        effect.id = self.next_effect_id;
        self.active_effects.push(effect);
        self.next_effect_id
    }

    /// Delete a token along with its queued move.
    pub fn remove_instance(&mut self, id: &TokenId) -> Option<TokenInstance> {
        let idx = self.token_instances.iter().position(|t| &t.id == id)?;
        self.active_moves.retain(|m| &m.token_id != id);
        Some(self.token_instances.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(ids: &[&str]) -> WorldState {
        let def = TokenDefinition::from_attrs("G", &Attrs::new());
        let mut world = WorldState::default();
        for id in ids {
            let id: TokenId = id.parse().unwrap();
            world
                .token_instances
                .push(TokenInstance::spawn(id, &def, DEFAULT_MAP_ID, Cell::new(0, 0), &Attrs::new()));
        }
        world
    }

    #[test]
    fn resolve_is_exact_unless_fallback_enabled() {
        let world = world_with(&["G-1", "G-10", "Gob-1"]);
        assert_eq!(world.resolve_token("G-10", false), Some("G-10".parse().unwrap()));
        assert_eq!(world.resolve_token("G", false), None);
        assert_eq!(world.resolve_token("G-3", false), None);
        assert_eq!(world.resolve_token("G", true), Some("G-1".parse().unwrap()));
        assert_eq!(world.resolve_token("Gob", true), Some("Gob-1".parse().unwrap()));
    }

    #[test]
    fn mint_skips_past_removed_ids() {
        let mut world = world_with(&["G-1", "G-2", "G-3"]);
        world.remove_instance(&"G-2".parse().unwrap());
        assert_eq!(world.mint_id("G").to_string(), "G-4");
        assert_eq!(world.mint_id("H").to_string(), "H-1");
    }

    #[test]
    fn flat_default_fills_only_when_empty_and_enabled() {
        let mut map = Map {
            cols: 3,
            rows: 2,
            ..Map::default()
        };
        map.fill_flat_default();
        assert_eq!(map.heights.len(), 6);
        assert!(map.heights.values().all(|h| *h == 0.0));

        let mut map = Map {
            cols: 3,
            rows: 2,
            disable_auto_heights: true,
            ..Map::default()
        };
        map.fill_flat_default();
        assert!(map.heights.is_empty());
    }

    #[test]
    fn sprite_attrs_override_template() {
        let mut attrs = Attrs::new();
        attrs.insert("template".into(), "goblin".into());
        attrs.insert("name".into(), "Goblin Boss".into());
        attrs.insert("hp".into(), "21".into());
        attrs.insert("faction".into(), "Hostile".into());
        let def = TokenDefinition::from_attrs("GB", &attrs);
        assert_eq!(def.code, "GB");
        assert_eq!(def.name, "Goblin Boss");
        assert_eq!(def.hp, Some(21));
        assert_eq!(def.faction, "hostile");
        assert_eq!(def.speed, 30);
        assert_eq!(def.attacks.len(), 2);
    }

    #[test]
    fn resolve_definition_falls_back_to_templates_once() {
        let mut defs = Vec::new();
        upsert_definition(&mut defs, TokenDefinition::from_attrs("G", &Attrs::new()));
        assert_eq!(resolve_definition(&mut defs, "g").map(|d| d.code), Some("G".into()));
        assert_eq!(resolve_definition(&mut defs, "Wolf").map(|d| d.code), Some("wolf".into()));
        assert_eq!(defs.len(), 2);
        assert!(resolve_definition(&mut defs, "dragon").is_none());
        assert_eq!(defs.len(), 2);
    }

    #[test]
    fn upsert_replaces_by_code() {
        let mut defs = Vec::new();
        upsert_definition(&mut defs, TokenDefinition::from_attrs("G", &Attrs::new()));
        let mut attrs = Attrs::new();
        attrs.insert("name".into(), "Goblin".into());
        upsert_definition(&mut defs, TokenDefinition::from_attrs("g", &attrs));
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "Goblin");
    }

    #[test]
    fn world_state_serializes_heights_as_cell_keys() {
        let mut world = WorldState::default();
        world.map.heights.insert(Cell::new(2, 1), 1.5);
        let json = serde_json::to_value(&world).unwrap();
        assert_eq!(json["map"]["heights"]["2,1"], 1.5);
    }
}
