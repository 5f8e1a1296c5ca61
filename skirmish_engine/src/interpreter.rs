//! World-state interpreter.
//!
//! [`Interpreter::apply`] folds a batch of instructions into a copy of the prior
//! state and returns the copy. Each instruction is applied or skipped on its own:
//! one that cannot be resolved is reported and skipped, and earlier instructions
//! in the same batch stay applied. Readers only ever see whole batches because the
//! caller swaps in the returned state.

use rand::Rng;
use skirmish_data::{
    Attrs, Cell, ClearScope, EventSink, Instruction, MovePath, RowBase, Target, TokenId, TraceEvent, create_base,
    create_reference, height_rows_extent, ref_to_index,
};
use thiserror::Error;

use crate::config::{AnimationConfig, EngineConfig, LookupConfig};
use crate::lcg::Lcg;
use crate::world::{
    ActiveEffect, ActiveMove, EffectEndpoint, Point, TokenDefinition, TokenInstance, WorldState, resolve_definition,
    upsert_definition,
};

/// Why a single instruction was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("unknown token '{0}'")]
    UnknownToken(String),
    #[error("unknown definition or template '{0}'")]
    UnknownDefinition(String),
    #[error("missing '{0}' attribute")]
    MissingAttribute(&'static str),
    #[error("board has no cells")]
    NoBoard,
    #[error("no valid coordinates")]
    NoCoordinates,
    #[error("invalid height range {min}..{max}")]
    InvalidRange { min: f64, max: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    animation: AnimationConfig,
    lookup: LookupConfig,
    row_base: RowBase,
}

impl Interpreter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            animation: config.animation,
            lookup: config.lookup,
            row_base: config.coords.row_base,
        }
    }

    /// Apply a batch to `prior`, returning the new state.
    ///
    /// Never fails. Instructions are applied or skipped one at a time (skips go
    /// to `sink`), there is no rollback, and the flat-default height fill runs
    /// once at the end. An empty batch returns `prior` unchanged.
    pub fn apply(&self, prior: &WorldState, instructions: &[Instruction], sink: &mut dyn EventSink) -> WorldState {
        if instructions.is_empty() {
            return prior.clone();
        }
        let mut working = prior.clone();
        for instr in instructions {
            if instr.is_side_channel() {
                sink.record(TraceEvent::Note(format!("ignored side-channel '{}'", instr.kind())));
                continue;
            }
            match self.fold(&mut working, instr, sink) {
                Ok(()) => sink.record(TraceEvent::Applied {
                    instruction: instr.kind(),
                }),
                Err(err) => sink.record(TraceEvent::Skipped {
                    instruction: instr.kind(),
                    reason: err.to_string(),
                }),
            }
        }
        working.map.fill_flat_default();
        sink.record(TraceEvent::Note(format!(
            "batch of {} committed: {} token(s), {} move(s), {} effect(s)",
            instructions.len(),
            working.token_instances.len(),
            working.active_moves.len(),
            working.active_effects.len()
        )));
        working
    }

    fn resolve(&self, world: &WorldState, reference: &str) -> Result<TokenId, ApplyError> {
        world
            .resolve_token(reference, self.lookup.prefix_fallback)
            .ok_or_else(|| ApplyError::UnknownToken(reference.to_string()))
    }

    fn fold(&self, world: &mut WorldState, instr: &Instruction, sink: &mut dyn EventSink) -> Result<(), ApplyError> {
        match instr {
            Instruction::Background { reference } => world.map.background = Some(reference.clone()),
            Instruction::Map { id } => world.map.id.clone_from(id),
            Instruction::Grid { grid, size } => {
                world.map.grid_type = *grid;
                world.map.cell_size_px = *size;
            },
            Instruction::Board { cols, rows } => {
                world.map.cols = *cols;
                world.map.rows = *rows;
            },
            Instruction::SpriteDef { code, attrs } => {
                upsert_definition(&mut world.token_definitions, TokenDefinition::from_attrs(code, attrs));
            },
            Instruction::Place { code, cells } => {
                let def = resolve_definition(&mut world.token_definitions, code)
                    .ok_or_else(|| ApplyError::UnknownDefinition(code.clone()))?;
                spawn_all(world, &def, code, cells, &Attrs::new())?;
            },
            Instruction::Create { attrs, target } => {
                let reference = create_reference(attrs).ok_or(ApplyError::MissingAttribute("type"))?;
                let def = resolve_definition(&mut world.token_definitions, reference)
                    .ok_or_else(|| ApplyError::UnknownDefinition(reference.to_string()))?;
                let cells: Vec<Cell> = match target {
                    Target::Cells(cells) => cells.clone(),
                    Target::All => world.map.cells().collect(),
                };
                if cells.is_empty() && *target == Target::All {
                    return Err(ApplyError::NoBoard);
                }
                let base = create_base(attrs).unwrap_or(reference).to_string();
                spawn_all(world, &def, &base, &cells, attrs)?;
            },
            Instruction::Height { cells } => {
                for hc in cells {
                    world.map.heights.insert(hc.cell, hc.value);
                }
            },
            Instruction::HeightRaw { text } => {
                for (cell, value) in self.height_pairs(text, sink) {
                    world.map.heights.insert(cell, value);
                }
            },
            Instruction::HeightRows { rows } => apply_height_rows(world, rows, sink),
            Instruction::HeightRandom { seed, min, max } => {
                let (min, max) = (*min, *max);
                // the sampler needs a finite span as well as finite bounds
                if !(max - min).is_finite() || min > max {
                    return Err(ApplyError::InvalidRange { min, max });
                }
                let cells: Vec<Cell> = world.map.cells().collect();
                if cells.is_empty() {
                    return Err(ApplyError::NoBoard);
                }
                let seed = seed.unwrap_or_else(|| {
                    let seed = Lcg::clock_seed();
                    sink.record(TraceEvent::Note(format!("height-rando seeded from clock: {seed}")));
                    seed
                });
                let mut rng = Lcg::new(seed);
                for cell in cells {
                    let value: f64 = rng.random_range(min..=max);
                    let rounded = (value * 10.0).round() / 10.0;
                    world.map.heights.insert(cell, if rounded.is_finite() { rounded } else { value });
                }
            },
            Instruction::Roads { cells } => world.map.roads.extend(cells.iter().copied()),
            Instruction::State { attrs } => {
                let reference = attrs
                    .get("id")
                    .or_else(|| attrs.get("token"))
                    .ok_or(ApplyError::MissingAttribute("id"))?;
                let id = self.resolve(world, reference)?;
                if let Some(instance) = world.instance_mut(&id) {
                    instance.apply_attrs(attrs);
                }
            },
            Instruction::Move { id, path } => {
                let token_id = self.resolve(world, id)?;
                let current = world
                    .instance(&token_id)
                    .map(TokenInstance::position)
                    .ok_or_else(|| ApplyError::UnknownToken(id.clone()))?;
                let (path, index) = match path {
                    MovePath::To(cell) => (vec![current, Point::from(*cell)], 1),
                    MovePath::Waypoints(cells) if !cells.is_empty() => (cells.iter().copied().map(Point::from).collect(), 0),
                    MovePath::Waypoints(_) => return Err(ApplyError::NoCoordinates),
                };
                world.replace_move(ActiveMove {
                    token_id,
                    path,
                    index,
                    speed: self.animation.move_cells_per_second,
                });
            },
            Instruction::Attack {
                attacker,
                target,
                kind,
                speed,
                duration,
            } => {
                let source = self.resolve(world, attacker)?;
                let target = self.resolve(world, target)?;
                world.push_effect(ActiveEffect {
                    id: 0,
                    kind: format!("{}-attack", kind.as_str()),
                    source: EffectEndpoint::Token(source),
                    target: EffectEndpoint::Token(target),
                    speed: speed.unwrap_or(self.animation.attack_speed),
                    duration: duration.unwrap_or(self.animation.attack_duration),
                    age: 0.0,
                });
            },
            Instruction::Effect {
                kind,
                at,
                duration,
                speed,
            } => {
                world.push_effect(ActiveEffect {
                    id: 0,
                    kind: kind.clone(),
                    source: EffectEndpoint::Cell(*at),
                    target: EffectEndpoint::Cell(*at),
                    speed: speed.unwrap_or(self.animation.effect_speed),
                    duration: duration.unwrap_or(self.animation.effect_duration),
                    age: 0.0,
                });
            },
            Instruction::Remove { id } => {
                let token_id = self.resolve(world, id)?;
                world.remove_instance(&token_id);
            },
            Instruction::RemoveHeightmap => {
                world.map.heights.clear();
                world.map.disable_auto_heights = true;
            },
            Instruction::Clear {
                scope: ClearScope::Tokens,
            } => {
                world.token_instances.clear();
                world.active_moves.clear();
                world
                    .active_effects
                    .retain(|e| !(e.source.is_token() || e.target.is_token()));
            },
            Instruction::Clear { scope: ClearScope::All } | Instruction::Reset => *world = WorldState::default(),
            // turn order lives in the combat mirror
            Instruction::Initiative { .. } | Instruction::InitiativeSet { .. } => {},
            Instruction::CameraState
            | Instruction::Selection
            | Instruction::ViewParams
            | Instruction::Tooltip
            | Instruction::Unrecognized => {},
        }
        Ok(())
    }

    /// Read `A1=2 B1=-0.5, C1=3`; malformed pairs are reported and dropped.
    fn height_pairs(&self, text: &str, sink: &mut dyn EventSink) -> Vec<(Cell, f64)> {
        let mut pairs = Vec::new();
        for entry in text.split(|c: char| c.is_whitespace() || c == ',').filter(|e| !e.is_empty()) {
            let parsed = entry.split_once('=').and_then(|(reference, value)| {
                let cell = ref_to_index(reference, self.row_base)?;
                let value: f64 = value.trim().parse().ok().filter(|v: &f64| v.is_finite())?;
                Some((cell, value))
            });
            match parsed {
                Some(pair) => pairs.push(pair),
                None => sink.record(TraceEvent::Note(format!("height: dropped malformed entry '{entry}'"))),
            }
        }
        pairs
    }
}

/// Mint one instance of `def` per cell.
fn spawn_all(
    world: &mut WorldState,
    def: &TokenDefinition,
    base: &str,
    cells: &[Cell],
    overrides: &Attrs,
) -> Result<(), ApplyError> {
    if cells.is_empty() {
        return Err(ApplyError::NoCoordinates);
    }
    let map_id = world.map.id.clone();
    for &cell in cells {
        let id = world.mint_id(base);
        world
            .token_instances
            .push(TokenInstance::spawn(id, def, &map_id, cell, overrides));
    }
    Ok(())
}

/// Write a `HEIGHT_START` block: row `r`, column `c` is the `c`-th number on the
/// `r`-th line. The board grows to fit; a malformed number leaves its cell unset.
fn apply_height_rows(world: &mut WorldState, rows: &[String], sink: &mut dyn EventSink) {
    for (row_idx, line) in (0u32..).zip(rows) {
        for (col_idx, entry) in (0u32..).zip(line.split(',')) {
            match entry.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    world.map.heights.insert(Cell::new(col_idx, row_idx), value);
                },
                _ => sink.record(TraceEvent::Note(format!(
                    "height rows: dropped malformed entry '{}' at row {row_idx}",
                    entry.trim()
                ))),
            }
        }
    }
    let (cols, rows) = height_rows_extent(rows);
    world.map.grow_to(cols, rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_data::{AttackKind, MemorySink, NullSink};

    fn apply(instrs: &[Instruction]) -> WorldState {
        Interpreter::default().apply(&WorldState::default(), instrs, &mut NullSink)
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attrs {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    fn id(text: &str) -> TokenId {
        text.parse().unwrap()
    }

    #[test]
    fn empty_batch_is_identity() {
        let mut prior = WorldState::default();
        prior.map.cols = 3;
        prior.map.rows = 3;
        let next = Interpreter::default().apply(&prior, &[], &mut NullSink);
        assert_eq!(next, prior);
        assert!(next.map.heights.is_empty());
    }

    #[test]
    fn place_uses_template_when_no_sprite_def() {
        let world = apply(&[Instruction::Place {
            code: "goblin".into(),
            cells: vec![Cell::new(1, 1)],
        }]);
        assert_eq!(world.token_instances.len(), 1);
        assert_eq!(world.token_instances[0].id, id("goblin-1"));
        assert_eq!(world.token_instances[0].name, "Goblin");
        assert!(world.definition("goblin").is_some());
    }

    #[test]
    fn unresolved_instruction_is_skipped_without_rollback() {
        let mut sink = MemorySink::new();
        let world = Interpreter::default().apply(
            &WorldState::default(),
            &[
                Instruction::Board { cols: 2, rows: 2 },
                Instruction::Place {
                    code: "dragon".into(),
                    cells: vec![Cell::new(0, 0)],
                },
                Instruction::Place {
                    code: "rock".into(),
                    cells: vec![Cell::new(1, 1)],
                },
            ],
            &mut sink,
        );
        assert_eq!(world.token_instances.len(), 1);
        assert_eq!(sink.skipped(), vec!["unknown definition or template 'dragon'"]);
    }

    #[test]
    fn create_overrides_and_explicit_id_base() {
        let world = apply(&[Instruction::Create {
            attrs: attrs(&[("type", "orc"), ("id", "boss"), ("name", "Grukk"), ("faction", "Hostile")]),
            target: Target::Cells(vec![Cell::new(0, 0)]),
        }]);
        let boss = world.instance(&id("boss-1")).unwrap();
        assert_eq!(boss.name, "Grukk");
        assert_eq!(boss.faction, "hostile");
        assert_eq!(boss.def_id, "orc");
    }

    #[test]
    fn create_all_without_board_is_skipped() {
        let mut sink = MemorySink::new();
        Interpreter::default().apply(
            &WorldState::default(),
            &[Instruction::Create {
                attrs: attrs(&[("type", "rock")]),
                target: Target::All,
            }],
            &mut sink,
        );
        assert_eq!(sink.skipped(), vec!["board has no cells"]);
    }

    #[test]
    fn move_replaces_in_flight_move() {
        let world = apply(&[
            Instruction::Place {
                code: "wolf".into(),
                cells: vec![Cell::new(0, 0)],
            },
            Instruction::Move {
                id: "wolf-1".into(),
                path: MovePath::Waypoints(vec![Cell::new(1, 0), Cell::new(2, 0)]),
            },
            Instruction::Move {
                id: "wolf-1".into(),
                path: MovePath::To(Cell::new(0, 3)),
            },
        ]);
        assert_eq!(world.active_moves.len(), 1);
        let mv = &world.active_moves[0];
        assert_eq!(mv.path, vec![Point { col: 0.0, row: 0.0 }, Point { col: 0.0, row: 3.0 }]);
        assert_eq!(mv.index, 1);
    }

    #[test]
    fn attack_needs_both_endpoints() {
        let mut sink = MemorySink::new();
        let world = Interpreter::default().apply(
            &WorldState::default(),
            &[
                Instruction::Place {
                    code: "hero".into(),
                    cells: vec![Cell::new(0, 0)],
                },
                Instruction::Attack {
                    attacker: "hero-1".into(),
                    target: "goblin-1".into(),
                    kind: AttackKind::Physical,
                    speed: None,
                    duration: None,
                },
                Instruction::Effect {
                    kind: "smoke".into(),
                    at: Cell::new(1, 1),
                    duration: Some(2.0),
                    speed: None,
                },
            ],
            &mut sink,
        );
        assert_eq!(world.active_effects.len(), 1);
        assert_eq!(world.active_effects[0].kind, "smoke");
        assert_eq!(world.active_effects[0].id, 1);
        assert_eq!(sink.skipped().len(), 1);
    }

    #[test]
    fn prefix_fallback_is_opt_in() {
        let place = Instruction::Place {
            code: "G".into(),
            cells: vec![Cell::new(0, 0)],
        };
        let def = Instruction::SpriteDef {
            code: "G".into(),
            attrs: Attrs::new(),
        };
        let remove = Instruction::Remove { id: "G".into() };

        let world = apply(&[def.clone(), place.clone(), remove.clone()]);
        assert_eq!(world.token_instances.len(), 1);

        let mut config = EngineConfig::default();
        config.lookup.prefix_fallback = true;
        let world = Interpreter::new(&config).apply(&WorldState::default(), &[def, place, remove], &mut NullSink);
        assert!(world.token_instances.is_empty());
    }

    #[test]
    fn height_raw_writes_pairs_and_drops_bad_ones() {
        let mut sink = MemorySink::new();
        let world = Interpreter::default().apply(
            &WorldState::default(),
            &[Instruction::HeightRaw {
                text: "A1=1 B1=2.5, C1=oops ??=4 D2=-1".into(),
            }],
            &mut sink,
        );
        assert_eq!(world.map.heights.len(), 3);
        assert_eq!(world.map.heights[&Cell::new(1, 0)], 2.5);
        assert_eq!(world.map.heights[&Cell::new(3, 1)], -1.0);
    }

    #[test]
    fn height_rando_is_reproducible_and_bounded() {
        let script = [
            Instruction::Board { cols: 5, rows: 4 },
            Instruction::HeightRandom {
                seed: Some(99),
                min: 1.0,
                max: 4.0,
            },
        ];
        let a = apply(&script);
        let b = apply(&script);
        assert_eq!(a.map.heights, b.map.heights);
        assert_eq!(a.map.heights.len(), 20);
        assert!(a.map.heights.values().all(|h| (1.0..=4.0).contains(h)));
    }

    #[test]
    fn height_rando_rejects_unsampleable_ranges() {
        let place = Instruction::Place {
            code: "goblin".into(),
            cells: vec![Cell::new(0, 0)],
        };
        for (min, max) in [(-1e308, 1e308), (f64::NAN, 1.0), (3.0, 1.0), (0.0, f64::INFINITY)] {
            let mut sink = MemorySink::new();
            let world = Interpreter::default().apply(
                &WorldState::default(),
                &[
                    Instruction::Board { cols: 2, rows: 2 },
                    Instruction::HeightRandom { seed: Some(1), min, max },
                    place.clone(),
                ],
                &mut sink,
            );
            let skipped = sink.skipped();
            assert_eq!(skipped.len(), 1, "{min}..{max}");
            assert!(skipped[0].starts_with("invalid height range"), "{}", skipped[0]);
            assert_eq!(world.token_instances.len(), 1);
            assert!(world.map.heights.values().all(|h| *h == 0.0));
        }
    }

    #[test]
    fn height_rando_keeps_huge_finite_bounds_finite() {
        let world = apply(&[
            Instruction::Board { cols: 3, rows: 1 },
            Instruction::HeightRandom {
                seed: Some(5),
                min: 1e307,
                max: 1e308,
            },
        ]);
        assert_eq!(world.map.heights.len(), 3);
        assert!(world.map.heights.values().all(|h| h.is_finite() && *h >= 1e307));
    }

    #[test]
    fn remove_heightmap_disables_flat_fill() {
        let world = apply(&[Instruction::Board { cols: 2, rows: 2 }]);
        assert_eq!(world.map.heights.len(), 4);
        let world = Interpreter::default().apply(&world, &[Instruction::RemoveHeightmap], &mut NullSink);
        assert!(world.map.heights.is_empty());
        assert!(world.map.disable_auto_heights);
    }

    #[test]
    fn clear_and_reset() {
        let world = apply(&[
            Instruction::Board { cols: 3, rows: 3 },
            Instruction::Place {
                code: "rock".into(),
                cells: vec![Cell::new(0, 0), Cell::new(1, 0)],
            },
            Instruction::Clear {
                scope: ClearScope::Tokens,
            },
        ]);
        assert!(world.token_instances.is_empty());
        assert_eq!(world.map.cols, 3);
        assert_eq!(world.definition("rock").map(|d| d.code.as_str()), Some("rock"));

        let world = Interpreter::default().apply(&world, &[Instruction::Reset], &mut NullSink);
        assert_eq!(world, WorldState::default());
    }

    #[test]
    fn state_updates_instance_fields() {
        let world = apply(&[
            Instruction::Place {
                code: "archer".into(),
                cells: vec![Cell::new(0, 0)],
            },
            Instruction::State {
                attrs: attrs(&[("id", "archer-1"), ("name", "Lyra"), ("speed", "35"), ("hp", "3")]),
            },
        ]);
        let archer = world.instance(&id("archer-1")).unwrap();
        assert_eq!(archer.name, "Lyra");
        assert_eq!(archer.speed, 35);
    }

    #[test]
    fn side_channel_is_ignored() {
        let mut sink = MemorySink::new();
        let world = Interpreter::default().apply(
            &WorldState::default(),
            &[Instruction::CameraState, Instruction::Unrecognized],
            &mut sink,
        );
        assert_eq!(world, WorldState::default());
        assert!(sink.skipped().is_empty());
    }
}
