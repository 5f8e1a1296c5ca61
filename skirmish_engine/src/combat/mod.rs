//! Combat mirror.
//!
//! A reduced copy of the battle (who is where, hit points, attacks, initiative)
//! fed by the same instruction stream as the world state. Tokens jump straight
//! to the end of a move; animation is the renderer's business, not the mirror's.
//! Suggestions built on top of it live in [`crate::suggest`].

mod attack;

pub use attack::{Attack, ReachRange};

use log::info;
use skirmish_data::{
    Attrs, Cell, ClearScope, EventSink, GridType, InitiativeEntry, Instruction, RowBase, Target, TokenId, TraceEvent,
    create_base, create_reference, height_rows_extent,
};

use crate::config::EngineConfig;
use crate::world::{TokenDefinition, resolve_definition, upsert_definition};

/// A combatant as the turn tracker sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatToken {
    pub id: TokenId,
    pub name: String,
    pub faction: String,
    pub hp: i32,
    pub hp_max: i32,
    pub position: Cell,
    /// Feet per turn.
    pub speed: u32,
    pub attacks: Vec<Attack>,
    pub conditions: Vec<String>,
}

impl CombatToken {
    pub fn position_ref(&self, base: RowBase) -> Option<String> {
        self.position.to_ref(base)
    }

    /// Apply the keys of a `STATE` line. `conditions` is a comma list where a
    /// leading `-` removes a condition and `none` clears them all.
    fn apply_state(&mut self, attrs: &Attrs) {
        if let Some(name) = attrs.get("name") {
            self.name.clone_from(name);
        }
        if let Some(faction) = attrs.get("faction") {
            self.faction = faction.to_lowercase();
        }
        if let Some(speed) = attrs.get("speed").and_then(|s| s.parse().ok()) {
            self.speed = speed;
        }
        if let Some(hp_max) = attrs
            .get("hpmax")
            .or_else(|| attrs.get("hp_max"))
            .and_then(|s| s.parse().ok())
        {
            self.hp_max = hp_max;
        }
        if let Some(hp) = attrs.get("hp").and_then(|s| s.parse().ok()) {
            self.hp = hp;
        }
        if let Some(list) = attrs.get("conditions").or_else(|| attrs.get("condition")) {
            for entry in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                if entry.eq_ignore_ascii_case("none") {
                    self.conditions.clear();
                } else if let Some(removed) = entry.strip_prefix('-') {
                    self.conditions.retain(|c| !c.eq_ignore_ascii_case(removed));
                } else if !self.conditions.iter().any(|c| c.eq_ignore_ascii_case(entry)) {
                    self.conditions.push(entry.to_lowercase());
                }
            }
        }
    }
}

/// Turn tracker and roster.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatState {
    /// Creation order.
    pub tokens: Vec<CombatToken>,
    /// Starts at 1; bumped each time the turn order wraps.
    pub round: u32,
    /// Explicit turn order. Empty until an initiative instruction arrives, in
    /// which case creation order is used.
    pub initiative_order: Vec<String>,
    pub active_index: usize,
    pub feet_per_cell: u32,
    pub grid: GridType,
    pub row_base: RowBase,
    /// Values behind the current order, in the order they were given.
    initiative_values: Vec<(String, i32)>,
    initiative_seeded: bool,
    definitions: Vec<TokenDefinition>,
    board: (u32, u32),
    default_hp: i32,
    prefix_fallback: bool,
}

impl Default for CombatState {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CombatState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tokens: Vec::new(),
            round: 1,
            initiative_order: Vec::new(),
            active_index: 0,
            feet_per_cell: config.combat.feet_per_cell,
            grid: GridType::Square,
            row_base: config.coords.row_base,
            initiative_values: Vec::new(),
            initiative_seeded: false,
            definitions: Vec::new(),
            board: (0, 0),
            default_hp: config.combat.default_hp,
            prefix_fallback: config.lookup.prefix_fallback,
        }
    }

    /// Fresh state with the same settings.
    fn emptied(&self) -> Self {
        Self {
            tokens: Vec::new(),
            round: 1,
            initiative_order: Vec::new(),
            active_index: 0,
            grid: GridType::Square,
            initiative_values: Vec::new(),
            initiative_seeded: false,
            definitions: Vec::new(),
            board: (0, 0),
            ..self.clone()
        }
    }

    /// Look up a token by exact id, then by prefix if enabled.
    pub fn token(&self, reference: &str) -> Option<&CombatToken> {
        if let Ok(id) = reference.parse::<TokenId>()
            && let Some(token) = self.tokens.iter().find(|t| t.id == id)
        {
            return Some(token);
        }
        if self.prefix_fallback {
            return self.tokens.iter().find(|t| t.id.has_prefix(reference));
        }
        None
    }

    fn token_mut(&mut self, reference: &str) -> Option<&mut CombatToken> {
        let id = self.token(reference)?.id.clone();
        self.tokens.iter_mut().find(|t| t.id == id)
    }

    /// Canonical id for an initiative entry; unknown references are kept as written.
    fn canonical(&self, reference: &str) -> String {
        self.token(reference)
            .map_or_else(|| reference.to_string(), |t| t.id.to_string())
    }

    /// Current turn order: the explicit initiative order, or creation order.
    pub fn turn_order(&self) -> Vec<String> {
        if self.initiative_seeded {
            self.initiative_order.clone()
        } else {
            self.tokens.iter().map(|t| t.id.to_string()).collect()
        }
    }

    pub fn active_id(&self) -> Option<String> {
        self.turn_order().get(self.active_index).cloned()
    }

    pub fn active_token(&self) -> Option<&CombatToken> {
        self.token(&self.active_id()?)
    }

    /// Pass the turn to the next combatant, starting a new round after the last.
    pub fn advance_turn(&mut self) {
        let len = self.turn_order().len();
        if len == 0 {
            return;
        }
        self.active_index += 1;
        if self.active_index >= len {
            self.active_index = 0;
            self.round += 1;
            info!("combat round {} begins", self.round);
        }
    }

    /// Fold a batch into the mirror. Instructions it cannot resolve are reported
    /// to `sink` and skipped.
    pub fn apply(&mut self, instructions: &[Instruction], sink: &mut dyn EventSink) {
        for instr in instructions {
            if let Err(reason) = self.apply_one(instr) {
                sink.record(TraceEvent::Skipped {
                    instruction: instr.kind(),
                    reason: format!("combat: {reason}"),
                });
            }
        }
    }

    fn apply_one(&mut self, instr: &Instruction) -> Result<(), String> {
        match instr {
            Instruction::Grid { grid, .. } => self.grid = *grid,
            Instruction::Board { cols, rows } => self.board = (*cols, *rows),
            Instruction::HeightRows { rows } => {
                let (cols, rows) = height_rows_extent(rows);
                self.board = (self.board.0.max(cols), self.board.1.max(rows));
            },
            Instruction::SpriteDef { code, attrs } => {
                upsert_definition(&mut self.definitions, TokenDefinition::from_attrs(code, attrs));
            },
            Instruction::Place { code, cells } => {
                let def = resolve_definition(&mut self.definitions, code)
                    .ok_or_else(|| format!("unknown definition '{code}'"))?;
                self.spawn(&def, code, cells, &Attrs::new());
            },
            Instruction::Create { attrs, target } => {
                let reference = create_reference(attrs).ok_or("no definition attribute")?;
                let def = resolve_definition(&mut self.definitions, reference)
                    .ok_or_else(|| format!("unknown definition '{reference}'"))?;
                let cells: Vec<Cell> = match target {
                    Target::Cells(cells) => cells.clone(),
                    Target::All => {
                        let (cols, rows) = self.board;
                        (0..rows)
                            .flat_map(|row| (0..cols).map(move |col| Cell::new(col, row)))
                            .collect()
                    },
                };
                let base = create_base(attrs).unwrap_or(reference).to_string();
                self.spawn(&def, &base, &cells, attrs);
            },
            Instruction::Move { id, path } => {
                let destination = path.destination().ok_or("empty path")?;
                let token = self.token_mut(id).ok_or_else(|| format!("unknown token '{id}'"))?;
                token.position = destination;
            },
            Instruction::State { attrs } => {
                let id = attrs
                    .get("id")
                    .or_else(|| attrs.get("token"))
                    .ok_or("missing id attribute")?
                    .clone();
                let token = self.token_mut(&id).ok_or_else(|| format!("unknown token '{id}'"))?;
                token.apply_state(attrs);
            },
            Instruction::Remove { id } => {
                let id = self
                    .token(id)
                    .map(|t| t.id.clone())
                    .ok_or_else(|| format!("unknown token '{id}'"))?;
                self.remove_token(&id);
            },
            Instruction::InitiativeSet { entries } => self.set_initiative(entries),
            Instruction::Initiative { value: Some(value), ids } => self.merge_initiative(*value, ids),
            Instruction::Initiative { value: None, ids } => {
                self.initiative_order = ids.iter().map(|id| self.canonical(id)).collect();
                self.initiative_seeded = true;
                self.active_index = 0;
            },
            Instruction::Clear {
                scope: ClearScope::Tokens,
            } => {
                self.tokens.clear();
                self.initiative_order.clear();
                self.initiative_values.clear();
                self.initiative_seeded = false;
                self.active_index = 0;
            },
            Instruction::Clear { scope: ClearScope::All } | Instruction::Reset => *self = self.emptied(),
            _ => {},
        }
        Ok(())
    }

    fn spawn(&mut self, def: &TokenDefinition, base: &str, cells: &[Cell], overrides: &Attrs) {
        for &cell in cells {
            let id = TokenId::next_for(base, self.tokens.iter().map(|t| &t.id));
            let hp = def.hp.unwrap_or(self.default_hp);
            let mut token = CombatToken {
                id,
                name: def.name.clone(),
                faction: def.faction.clone(),
                hp,
                hp_max: hp,
                position: cell,
                speed: def.speed,
                attacks: def.attacks.clone(),
                conditions: Vec::new(),
            };
            token.apply_state(overrides);
            self.tokens.push(token);
        }
    }

    fn remove_token(&mut self, id: &TokenId) {
        let active = self.active_id();
        self.tokens.retain(|t| &t.id != id);
        let rendered = id.to_string();
        self.initiative_order.retain(|entry| entry != &rendered);
        self.initiative_values.retain(|(entry, _)| entry != &rendered);
        // keep the same combatant active when someone else leaves
        let order = self.turn_order();
        self.active_index = match active.and_then(|a| order.iter().position(|e| *e == a)) {
            Some(idx) => idx,
            None if self.active_index >= order.len() => 0,
            None => self.active_index,
        };
    }

    /// Replace the initiative table.
    fn set_initiative(&mut self, entries: &[InitiativeEntry]) {
        self.initiative_values = entries.iter().map(|e| (self.canonical(&e.id), e.value)).collect();
        self.reseed();
    }

    /// Give `value` to each of `ids`, keeping everyone else's value.
    fn merge_initiative(&mut self, value: i32, ids: &[String]) {
        for id in ids {
            let id = self.canonical(id);
            match self.initiative_values.iter_mut().find(|(entry, _)| *entry == id) {
                Some(slot) => slot.1 = value,
                None => self.initiative_values.push((id, value)),
            }
        }
        self.reseed();
    }

    /// Order by value, highest first; ties keep the order they were given in.
    fn reseed(&mut self) {
        let mut values = self.initiative_values.clone();
        values.sort_by(|a, b| b.1.cmp(&a.1));
        self.initiative_order = values.into_iter().map(|(id, _)| id).collect();
        self.initiative_seeded = true;
        self.active_index = 0;
    }
}
