//! The instruction vocabulary.
//!
//! Every script line the parser understands becomes one [`Instruction`]. The same
//! values travel between the DM's session and spectators, feed the world-state
//! interpreter, and feed the combat mirror. Serialized form is an internally
//! tagged object: `{"type": "move", "id": "G-1", ...}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coord::Cell;

/// Free-form `key=value` attributes (keys already lowercased).
pub type Attrs = BTreeMap<String, String>;

/// Board topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    #[default]
    Square,
    Hex,
}

/// Damage channel used to pick the attack animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    #[default]
    Physical,
    Magic,
}

impl AttackKind {
    /// Words in an attack's mode string that mark it as magical.
    const MAGIC_WORDS: &'static [&'static str] = &[
        "magic", "spell", "arcane", "divine", "psychic", "radiant", "necrotic", "eldritch",
    ];

    /// Classify a free-text attack mode (`"melee"`, `"ranged spell"`, ...).
    pub fn classify(mode: &str) -> AttackKind {
        let mode = mode.to_lowercase();
        if Self::MAGIC_WORDS.iter().any(|word| mode.contains(word)) {
            AttackKind::Magic
        } else {
            AttackKind::Physical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttackKind::Physical => "physical",
            AttackKind::Magic => "magic",
        }
    }
}

/// What a `CLEAR` wipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearScope {
    Tokens,
    All,
}

/// Destination set for `CREATE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Cells(Vec<Cell>),
    /// Every cell of the current board.
    All,
}

/// Where a `MOVE` goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePath {
    /// Single leg from the token's current position.
    To(Cell),
    /// Walk each waypoint in order.
    Waypoints(Vec<Cell>),
}

impl MovePath {
    /// Build from a parsed coordinate list; `None` when the list is empty.
    pub fn from_cells(mut cells: Vec<Cell>) -> Option<MovePath> {
        match cells.len() {
            0 => None,
            1 => cells.pop().map(MovePath::To),
            _ => Some(MovePath::Waypoints(cells)),
        }
    }

    pub fn cells(&self) -> &[Cell] {
        match self {
            MovePath::To(cell) => std::slice::from_ref(cell),
            MovePath::Waypoints(cells) => cells,
        }
    }

    /// Final resting cell.
    pub fn destination(&self) -> Option<Cell> {
        self.cells().last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightCell {
    pub cell: Cell,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub id: String,
    pub value: i32,
}

/// One parsed directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Instruction {
    Background {
        reference: String,
    },
    Map {
        id: String,
    },
    /// Either a shared value for several ids, or a bare list in turn order.
    Initiative {
        value: Option<i32>,
        ids: Vec<String>,
    },
    InitiativeSet {
        entries: Vec<InitiativeEntry>,
    },
    Grid {
        grid: GridType,
        size: u32,
    },
    Board {
        cols: u32,
        rows: u32,
    },
    SpriteDef {
        code: String,
        attrs: Attrs,
    },
    Place {
        code: String,
        cells: Vec<Cell>,
    },
    Create {
        attrs: Attrs,
        target: Target,
    },
    Height {
        cells: Vec<HeightCell>,
    },
    /// Unparsed `coord=value` text gathered from a `HEIGHT` directive and its
    /// continuation lines.
    HeightRaw {
        text: String,
    },
    /// Rows of comma-separated numbers from a `HEIGHT_START` block.
    HeightRows {
        rows: Vec<String>,
    },
    #[serde(rename = "height-rando")]
    HeightRandom {
        seed: Option<u64>,
        min: f64,
        max: f64,
    },
    Roads {
        cells: Vec<Cell>,
    },
    State {
        attrs: Attrs,
    },
    Move {
        id: String,
        path: MovePath,
    },
    Attack {
        attacker: String,
        target: String,
        kind: AttackKind,
        speed: Option<f64>,
        duration: Option<f64>,
    },
    Effect {
        kind: String,
        at: Cell,
        duration: Option<f64>,
        speed: Option<f64>,
    },
    Remove {
        id: String,
    },
    RemoveHeightmap,
    Clear {
        scope: ClearScope,
    },
    Reset,
    // Presentation side channel: replayed by the transport, ignored by the core.
    CameraState,
    Selection,
    ViewParams,
    Tooltip,
    /// Any instruction type this build does not know.
    #[serde(other)]
    Unrecognized,
}

impl Instruction {
    /// Wire tag of this instruction.
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Background { .. } => "background",
            Instruction::Map { .. } => "map",
            Instruction::Initiative { .. } => "initiative",
            Instruction::InitiativeSet { .. } => "initiative-set",
            Instruction::Grid { .. } => "grid",
            Instruction::Board { .. } => "board",
            Instruction::SpriteDef { .. } => "sprite-def",
            Instruction::Place { .. } => "place",
            Instruction::Create { .. } => "create",
            Instruction::Height { .. } => "height",
            Instruction::HeightRaw { .. } => "height-raw",
            Instruction::HeightRows { .. } => "height-rows",
            Instruction::HeightRandom { .. } => "height-rando",
            Instruction::Roads { .. } => "roads",
            Instruction::State { .. } => "state",
            Instruction::Move { .. } => "move",
            Instruction::Attack { .. } => "attack",
            Instruction::Effect { .. } => "effect",
            Instruction::Remove { .. } => "remove",
            Instruction::RemoveHeightmap => "remove-heightmap",
            Instruction::Clear { .. } => "clear",
            Instruction::Reset => "reset",
            Instruction::CameraState => "camera-state",
            Instruction::Selection => "selection",
            Instruction::ViewParams => "view-params",
            Instruction::Tooltip => "tooltip",
            Instruction::Unrecognized => "unrecognized",
        }
    }

    /// Presentation-only or unknown instructions that carry no world-state change.
    pub fn is_side_channel(&self) -> bool {
        matches!(
            self,
            Instruction::CameraState
                | Instruction::Selection
                | Instruction::ViewParams
                | Instruction::Tooltip
                | Instruction::Unrecognized
        )
    }

    /// Instructions that throw away the entire world.
    pub fn wipes_world(&self) -> bool {
        matches!(
            self,
            Instruction::Reset
                | Instruction::Clear {
                    scope: ClearScope::All
                }
        )
    }
}

/// Attribute keys that name the definition a `CREATE` instantiates, in priority order.
pub const CREATE_DEFINITION_KEYS: &[&str] = &["code", "def", "template", "type"];

/// The definition (or template) a `CREATE` refers to.
pub fn create_reference(attrs: &Attrs) -> Option<&str> {
    CREATE_DEFINITION_KEYS
        .iter()
        .find_map(|key| attrs.get(*key))
        .map(String::as_str)
        .filter(|s| !s.is_empty())
}

/// Id base for tokens minted by a `CREATE`: an explicit `id`, else the definition reference.
pub fn create_base(attrs: &Attrs) -> Option<&str> {
    attrs
        .get("id")
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| create_reference(attrs))
}

/// Board extent `(cols, rows)` covered by a block of height rows: the widest
/// comma-separated row by the number of rows. Malformed entries still count.
pub fn height_rows_extent(rows: &[String]) -> (u32, u32) {
    let widest = rows.iter().map(|line| line.split(',').count()).max().unwrap_or(0);
    (
        u32::try_from(widest).unwrap_or(u32::MAX),
        u32::try_from(rows.len()).unwrap_or(u32::MAX),
    )
}
