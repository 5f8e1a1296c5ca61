use std::collections::HashSet;
use std::fmt;

use crate::ids::TokenId;
use crate::instruction::{ClearScope, Instruction, Target, create_base, create_reference, height_rows_extent};
use crate::templates::find_template;

/// Problem found while linting an instruction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    MissingReference { kind: &'static str, id: String, context: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::MissingReference { kind, id, context } => {
                write!(f, "missing {kind} '{id}' ({context})")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Replays the id bookkeeping of a script without building any world state.
#[derive(Default)]
struct LintState {
    sprites: HashSet<String>,
    live: Vec<TokenId>,
    board: Option<(u32, u32)>,
}

impl LintState {
    fn knows_definition(&self, code: &str) -> bool {
        self.sprites.contains(&code.to_lowercase()) || find_template(code).is_some()
    }

    /// Mints the way the interpreter does: one past the highest live sequence.
    fn mint(&mut self, base: &str, count: usize) {
        for _ in 0..count {
            let id = TokenId::next_for(base, &self.live);
            self.live.push(id);
        }
    }

    fn is_live(&self, id: &str) -> bool {
        self.live.iter().any(|token| token.to_string() == id)
    }

    fn grow_board(&mut self, cols: u32, rows: u32) {
        let (old_cols, old_rows) = self.board.unwrap_or((0, 0));
        let grown = (old_cols.max(cols), old_rows.max(rows));
        if grown.0 > 0 && grown.1 > 0 {
            self.board = Some(grown);
        }
    }

    fn check_token(&self, id: &str, context: &str, errors: &mut Vec<ValidationError>) {
        if !self.is_live(id) {
            errors.push(ValidationError::MissingReference {
                kind: "token",
                id: id.to_string(),
                context: context.to_string(),
            });
        }
    }
}

/// Lint a parsed script: duplicate sprite codes, unknown definitions, references
/// to tokens the script never created, and impossible board values.
///
/// An empty result does not mean the interpreter will accept every line (it
/// never rejects a batch); it means nothing in the script is known to be skipped.
///
/// ```
/// use skirmish_data::{Instruction, MovePath, Cell, validate_instructions};
///
/// let script = vec![
///     Instruction::Board { cols: 4, rows: 4 },
///     Instruction::Place { code: "goblin".into(), cells: vec![Cell::new(0, 0)] },
///     Instruction::Move { id: "goblin-1".into(), path: MovePath::To(Cell::new(1, 1)) },
/// ];
/// assert!(validate_instructions(&script).is_empty());
/// ```
pub fn validate_instructions(instructions: &[Instruction]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut state = LintState::default();

    for (idx, instr) in instructions.iter().enumerate() {
        let context = format!("instruction {} '{}'", idx + 1, instr.kind());
        match instr {
            Instruction::Board { cols, rows } => {
                if *cols == 0 || *rows == 0 {
                    errors.push(ValidationError::InvalidValue {
                        context: format!("{context}: board must be at least 1x1, got {cols}x{rows}"),
                    });
                }
                state.board = Some((*cols, *rows));
            },
            Instruction::Grid { size, .. } if *size == 0 => {
                errors.push(ValidationError::InvalidValue {
                    context: format!("{context}: cell size must be positive"),
                });
            },
            Instruction::SpriteDef { code, .. } => {
                if !state.sprites.insert(code.to_lowercase()) {
                    errors.push(ValidationError::DuplicateId {
                        kind: "sprite",
                        id: code.clone(),
                    });
                }
            },
            Instruction::Place { code, cells } => {
                if !state.knows_definition(code) {
                    errors.push(ValidationError::MissingReference {
                        kind: "definition",
                        id: code.clone(),
                        context,
                    });
                    continue;
                }
                if let Some((cols, rows)) = state.board
                    && let Some(cell) = cells.iter().find(|c| c.col >= cols || c.row >= rows)
                {
                    errors.push(ValidationError::InvalidValue {
                        context: format!("{context}: cell {cell} lies outside the {cols}x{rows} board"),
                    });
                }
                state.mint(code, cells.len());
            },
            Instruction::Create { attrs, target } => {
                let Some(reference) = create_reference(attrs) else {
                    errors.push(ValidationError::InvalidValue {
                        context: format!("{context}: no code, def, template or type attribute"),
                    });
                    continue;
                };
                if !state.knows_definition(reference) {
                    errors.push(ValidationError::MissingReference {
                        kind: "definition",
                        id: reference.to_string(),
                        context,
                    });
                    continue;
                }
                let count = match target {
                    Target::Cells(cells) => cells.len(),
                    Target::All => match state.board {
                        Some((cols, rows)) => (cols as usize) * (rows as usize),
                        None => {
                            errors.push(ValidationError::InvalidValue {
                                context: format!("{context}: '@ ALL' before any BOARD"),
                            });
                            0
                        },
                    },
                };
                let base = create_base(attrs).unwrap_or(reference).to_string();
                state.mint(&base, count);
            },
            Instruction::HeightRows { rows } => {
                let (cols, rows) = height_rows_extent(rows);
                state.grow_board(cols, rows);
            },
            Instruction::HeightRandom { min, max, .. } if min > max || !(max - min).is_finite() => {
                errors.push(ValidationError::InvalidValue {
                    context: format!("{context}: height range {min}..{max} cannot be sampled"),
                });
            },
            Instruction::Move { id, .. } => state.check_token(id, &context, &mut errors),
            Instruction::Attack { attacker, target, .. } => {
                state.check_token(attacker, &context, &mut errors);
                state.check_token(target, &context, &mut errors);
            },
            Instruction::State { attrs } => {
                if let Some(id) = attrs.get("id").or_else(|| attrs.get("token")) {
                    state.check_token(id, &context, &mut errors);
                }
            },
            Instruction::Remove { id } => {
                state.check_token(id, &context, &mut errors);
                state.live.retain(|token| token.to_string() != *id);
            },
            Instruction::Initiative { ids, .. } => {
                for id in ids {
                    state.check_token(id, &context, &mut errors);
                }
            },
            Instruction::InitiativeSet { entries } => {
                for entry in entries {
                    state.check_token(&entry.id, &context, &mut errors);
                }
            },
            Instruction::Clear {
                scope: ClearScope::Tokens,
            } => state.live.clear(),
            Instruction::Clear { scope: ClearScope::All } | Instruction::Reset => {
                state = LintState::default();
            },
            _ => {},
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Cell;
    use crate::instruction::{Attrs, InitiativeEntry, MovePath};

    fn place(code: &str, cells: &[(u32, u32)]) -> Instruction {
        Instruction::Place {
            code: code.into(),
            cells: cells.iter().map(|&(c, r)| Cell::new(c, r)).collect(),
        }
    }

    #[test]
    fn clean_script_has_no_errors() {
        let script = vec![
            Instruction::Board { cols: 4, rows: 4 },
            Instruction::SpriteDef {
                code: "G".into(),
                attrs: Attrs::new(),
            },
            place("G", &[(0, 0), (1, 1)]),
            Instruction::Move {
                id: "G-2".into(),
                path: MovePath::To(Cell::new(2, 2)),
            },
            Instruction::InitiativeSet {
                entries: vec![InitiativeEntry {
                    id: "G-1".into(),
                    value: 12,
                }],
            },
        ];
        assert!(validate_instructions(&script).is_empty());
    }

    #[test]
    fn reports_unknown_definition_and_token() {
        let script = vec![
            place("dragon", &[(0, 0)]),
            Instruction::Remove { id: "dragon-1".into() },
        ];
        let errors = validate_instructions(&script);
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], ValidationError::MissingReference { kind: "definition", id, .. } if id == "dragon"));
        assert!(matches!(&errors[1], ValidationError::MissingReference { kind: "token", id, .. } if id == "dragon-1"));
    }

    #[test]
    fn reports_duplicate_sprite_codes_case_insensitively() {
        let script = vec![
            Instruction::SpriteDef {
                code: "G".into(),
                attrs: Attrs::new(),
            },
            Instruction::SpriteDef {
                code: "g".into(),
                attrs: Attrs::new(),
            },
        ];
        let errors = validate_instructions(&script);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateId {
                kind: "sprite",
                id: "g".into()
            }]
        );
    }

    #[test]
    fn removed_tokens_are_no_longer_referencable() {
        let script = vec![
            place("goblin", &[(0, 0)]),
            Instruction::Remove { id: "goblin-1".into() },
            Instruction::Move {
                id: "goblin-1".into(),
                path: MovePath::To(Cell::new(1, 0)),
            },
        ];
        assert_eq!(validate_instructions(&script).len(), 1);
    }

    #[test]
    fn removing_the_highest_id_frees_it_for_the_next_place() {
        let script = vec![
            Instruction::SpriteDef {
                code: "G".into(),
                attrs: Attrs::new(),
            },
            place("G", &[(0, 0), (1, 0)]),
            Instruction::Remove { id: "G-2".into() },
            place("G", &[(2, 0)]),
            Instruction::Move {
                id: "G-2".into(),
                path: MovePath::To(Cell::new(0, 1)),
            },
        ];
        assert_eq!(validate_instructions(&script), vec![]);
    }

    #[test]
    fn clear_tokens_restarts_numbering() {
        let script = vec![
            place("wolf", &[(0, 0)]),
            Instruction::Clear {
                scope: ClearScope::Tokens,
            },
            place("wolf", &[(1, 0)]),
            Instruction::Move {
                id: "wolf-1".into(),
                path: MovePath::To(Cell::new(2, 0)),
            },
        ];
        assert_eq!(validate_instructions(&script), vec![]);
    }

    #[test]
    fn height_rows_count_as_a_board() {
        let mut attrs = Attrs::new();
        attrs.insert("type".into(), "rock".into());
        let script = vec![
            Instruction::HeightRows {
                rows: vec!["1,1,1".into(), "2,2,2".into()],
            },
            Instruction::Create {
                attrs,
                target: Target::All,
            },
            Instruction::Remove { id: "rock-6".into() },
        ];
        assert_eq!(validate_instructions(&script), vec![]);
    }

    #[test]
    fn flags_unsampleable_height_range() {
        let script = vec![Instruction::HeightRandom {
            seed: None,
            min: -1e308,
            max: 1e308,
        }];
        let errors = validate_instructions(&script);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("cannot be sampled"));
    }

    #[test]
    fn create_all_needs_a_board() {
        let mut attrs = Attrs::new();
        attrs.insert("type".into(), "rock".into());
        let script = vec![Instruction::Create {
            attrs,
            target: Target::All,
        }];
        let errors = validate_instructions(&script);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("before any BOARD"));
    }

    #[test]
    fn flags_out_of_board_placement_and_bad_board() {
        let script = vec![Instruction::Board { cols: 2, rows: 0 }, place("rock", &[(5, 0)])];
        let errors = validate_instructions(&script);
        assert_eq!(errors.len(), 2);
    }
}
