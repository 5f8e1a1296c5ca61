use pest::Parser;
use pest::iterators::Pair;

use skirmish_data::{
    AttackKind, ClearScope, GridType, InitiativeEntry, Instruction, MovePath, Target,
};

use super::helpers::{LineContext, option_value, parse_i32, parse_kv_list, parse_u32, unquote};
use super::{ParseError, Rule, ScriptParser};

/// Cell size in pixels when `GRID` omits `SIZE`.
pub(super) const DEFAULT_CELL_SIZE: u32 = 64;
/// Height range used by `HEIGHT_RANDOM` when `min` / `max` are absent.
pub(super) const DEFAULT_RANDOM_MIN: f64 = 0.0;
pub(super) const DEFAULT_RANDOM_MAX: f64 = 3.0;

/// What one recognized line asks the scanner to do.
#[derive(Debug)]
pub(super) enum Directive {
    Emit(Instruction),
    /// `HEIGHT ...`: open (or replace) the pending height buffer.
    HeightOpen(String),
    HeightStart,
    HeightEnd,
}

/// Recognize one logical line.
///
/// `Err` means no directive matched. `Ok(None)` means the line was a directive
/// but every operand it needed was dropped as malformed.
pub(super) fn parse_directive(line: &str, ctx: &mut LineContext<'_>) -> Result<Option<Directive>, ParseError> {
    let mut pairs = ScriptParser::parse(Rule::script_line, line).map_err(|e| ParseError::Pest(e.to_string()))?;
    let script_line = pairs.next().ok_or(ParseError::Shape("expected script line"))?;
    let directive = script_line
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty script line"))?;

    let instr = match directive.as_rule() {
        Rule::background => {
            let rest = operands(directive).next().ok_or(ParseError::Shape("background reference"))?;
            Instruction::Background {
                reference: unquote(rest.as_str()),
            }
        },
        Rule::map_dir => {
            let id = operands(directive).next().ok_or(ParseError::Shape("map id"))?;
            Instruction::Map {
                id: id.as_str().to_string(),
            }
        },
        Rule::initiative_set => {
            let mut entries = Vec::new();
            for pair in operands(directive) {
                let mut it = pair.into_inner();
                let id = it.next().ok_or(ParseError::Shape("initiative id"))?;
                let value = it.next().ok_or(ParseError::Shape("initiative value"))?;
                entries.push(InitiativeEntry {
                    id: id.as_str().to_string(),
                    value: parse_i32(&value)?,
                });
            }
            Instruction::InitiativeSet { entries }
        },
        Rule::initiative => {
            let mut value = None;
            let mut ids = Vec::new();
            for pair in operands(directive) {
                match pair.as_rule() {
                    Rule::init_value => value = Some(parse_i32(&pair)?),
                    Rule::id_list => ids.extend(pair.into_inner().map(|p| p.as_str().to_string())),
                    _ => {},
                }
            }
            Instruction::Initiative { value, ids }
        },
        Rule::grid => {
            let mut it = operands(directive);
            let kind = it.next().ok_or(ParseError::Shape("grid kind"))?;
            let grid = if kind.as_str().eq_ignore_ascii_case("hex") {
                GridType::Hex
            } else {
                GridType::Square
            };
            let size = match it.next() {
                Some(size) => parse_u32(&size)?,
                None => DEFAULT_CELL_SIZE,
            };
            Instruction::Grid { grid, size }
        },
        Rule::board => {
            let mut it = operands(directive);
            let cols = it.next().ok_or(ParseError::Shape("board columns"))?;
            let rows = it.next().ok_or(ParseError::Shape("board rows"))?;
            Instruction::Board {
                cols: parse_u32(&cols)?,
                rows: parse_u32(&rows)?,
            }
        },
        Rule::sprite_def => {
            let mut it = operands(directive);
            let code = it.next().ok_or(ParseError::Shape("sprite code"))?;
            let attrs = it.next().ok_or(ParseError::Shape("sprite attributes"))?;
            Instruction::SpriteDef {
                code: code.as_str().to_string(),
                attrs: parse_kv_list(attrs)?,
            }
        },
        Rule::place => {
            let mut it = operands(directive);
            let code = it.next().ok_or(ParseError::Shape("place code"))?;
            let list = it.next().ok_or(ParseError::Shape("place coordinates"))?;
            Instruction::Place {
                code: code.as_str().to_string(),
                cells: ctx.cells(list),
            }
        },
        Rule::create => {
            let mut attrs = None;
            let mut target = None;
            for pair in directive.into_inner() {
                match pair.as_rule() {
                    Rule::kv_list => attrs = Some(parse_kv_list(pair)?),
                    Rule::kw_all => target = Some(Target::All),
                    Rule::item_list => target = Some(Target::Cells(ctx.cells(pair))),
                    _ => {},
                }
            }
            Instruction::Create {
                attrs: attrs.unwrap_or_default(),
                target: target.ok_or(ParseError::Shape("create target"))?,
            }
        },
        Rule::height_random => {
            let list = operands(directive).next().ok_or(ParseError::Shape("height_random attributes"))?;
            let attrs = parse_kv_list(list)?;
            Instruction::HeightRandom {
                seed: ctx.attr_number(&attrs, "seed"),
                min: ctx.attr_number(&attrs, "min").unwrap_or(DEFAULT_RANDOM_MIN),
                max: ctx.attr_number(&attrs, "max").unwrap_or(DEFAULT_RANDOM_MAX),
            }
        },
        Rule::height_start => return Ok(Some(Directive::HeightStart)),
        Rule::height_end => return Ok(Some(Directive::HeightEnd)),
        Rule::height => {
            let text = operands(directive)
                .next()
                .map(|rest| rest.as_str().trim().to_string())
                .unwrap_or_default();
            return Ok(Some(Directive::HeightOpen(text)));
        },
        Rule::roads => {
            let list = operands(directive).next().ok_or(ParseError::Shape("road coordinates"))?;
            Instruction::Roads {
                cells: ctx.cells(list),
            }
        },
        Rule::state => {
            let list = operands(directive).next().ok_or(ParseError::Shape("state attributes"))?;
            Instruction::State {
                attrs: parse_kv_list(list)?,
            }
        },
        Rule::move_dir => {
            let mut it = operands(directive);
            let id = it.next().ok_or(ParseError::Shape("move token"))?;
            let list = it.next().ok_or(ParseError::Shape("move coordinates"))?;
            let Some(path) = MovePath::from_cells(ctx.cells(list)) else {
                return Ok(None);
            };
            Instruction::Move {
                id: id.as_str().to_string(),
                path,
            }
        },
        Rule::attack => {
            let mut refs = Vec::new();
            let mut kind = AttackKind::Physical;
            let mut speed = None;
            let mut duration = None;
            for pair in operands(directive) {
                match pair.as_rule() {
                    Rule::token_ref => refs.push(pair.as_str().to_string()),
                    Rule::attack_kind => {
                        if pair.as_str().eq_ignore_ascii_case("magic") {
                            kind = AttackKind::Magic;
                        }
                    },
                    Rule::speed_opt => speed = Some(option_value(pair)?),
                    Rule::dur_opt => duration = Some(option_value(pair)?),
                    _ => {},
                }
            }
            let [attacker, target]: [String; 2] = refs
                .try_into()
                .map_err(|_| ParseError::Shape("attack needs attacker and target"))?;
            Instruction::Attack {
                attacker,
                target,
                kind,
                speed,
                duration,
            }
        },
        Rule::effect => {
            let mut kind = None;
            let mut at = None;
            let mut speed = None;
            let mut duration = None;
            for pair in operands(directive) {
                match pair.as_rule() {
                    Rule::word => kind = Some(pair.as_str().to_string()),
                    Rule::list_item => at = Some(ctx.cell(pair.as_str())),
                    Rule::speed_opt => speed = Some(option_value(pair)?),
                    Rule::dur_opt => duration = Some(option_value(pair)?),
                    _ => {},
                }
            }
            let kind = kind.ok_or(ParseError::Shape("effect kind"))?;
            let Some(at) = at.ok_or(ParseError::Shape("effect location"))? else {
                return Ok(None);
            };
            Instruction::Effect {
                kind,
                at,
                duration,
                speed,
            }
        },
        Rule::remove_heightmap => Instruction::RemoveHeightmap,
        Rule::remove => {
            let id = operands(directive).next().ok_or(ParseError::Shape("remove token"))?;
            Instruction::Remove {
                id: id.as_str().to_string(),
            }
        },
        Rule::clear => {
            let scope = operands(directive).next().ok_or(ParseError::Shape("clear scope"))?;
            let scope = if scope.as_str().eq_ignore_ascii_case("all") {
                ClearScope::All
            } else {
                ClearScope::Tokens
            };
            Instruction::Clear { scope }
        },
        Rule::reset => Instruction::Reset,
        _ => return Err(ParseError::Shape("unknown directive")),
    };
    Ok(Some(Directive::Emit(instr)))
}

/// Whether a line belongs to a pending `HEIGHT` directive (`A1=2 B1=3`).
pub(super) fn is_height_continuation(line: &str) -> bool {
    ScriptParser::parse(Rule::height_pairs_line, line).is_ok()
}

/// Inner pairs of a directive with its keywords removed.
fn operands(directive: Pair<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    directive.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_background
            | Rule::kw_map
            | Rule::kw_initiative
            | Rule::kw_grid
            | Rule::kw_size
            | Rule::kw_board
            | Rule::kw_sprite
            | Rule::kw_def
            | Rule::kw_place
            | Rule::kw_create
            | Rule::kw_all
            | Rule::kw_height_rand
            | Rule::kw_height_start
            | Rule::kw_height_end
            | Rule::kw_height
            | Rule::kw_roads
            | Rule::kw_state
            | Rule::kw_move
            | Rule::kw_to
            | Rule::kw_attack
            | Rule::kw_type
            | Rule::kw_speed
            | Rule::kw_dur
            | Rule::kw_effect
            | Rule::kw_at
            | Rule::kw_remove
            | Rule::kw_heightmap
            | Rule::kw_clear
            | Rule::kw_reset
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_continuation_shapes() {
        assert!(is_height_continuation("A1=2"));
        assert!(is_height_continuation("A1=2 B1=-1.5, C1=3"));
        assert!(!is_height_continuation("MOVE G-1 TO A1"));
        assert!(!is_height_continuation("1,2,3"));
        assert!(!is_height_continuation("name=bob"));
    }
}
