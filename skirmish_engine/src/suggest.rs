//! Tactical suggestions for the combatant whose turn it is.
//!
//! Heuristic only: find the nearest opponent, attack it if an attack reaches,
//! otherwise walk toward it as far as the token's speed allows. Defending and
//! ending the turn are always offered. Choosing a suggestion yields an
//! [`Intent`], which [`CombatState::translate_intent`] turns back into
//! instructions for the interpreter.

use serde::{Deserialize, Serialize};
use skirmish_data::{AttackKind, Cell, Instruction, MovePath};

use crate::combat::{CombatState, CombatToken};
use crate::geometry::{clamp_toward, grid_distance};

/// Player-side factions.
const FRIENDLY: &[&str] = &["pc", "ally"];
/// Factions the players fight.
const HOSTILE: &[&str] = &["enemy", "npc", "hostile"];

/// Factions that `faction` fights; empty for factions that fight no one.
pub fn opposing_factions(faction: &str) -> &'static [&'static str] {
    let faction = faction.to_ascii_lowercase();
    if FRIENDLY.contains(&faction.as_str()) {
        HOSTILE
    } else if HOSTILE.contains(&faction.as_str()) {
        FRIENDLY
    } else {
        &[]
    }
}

/// Something the DM can order the active token to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Intent {
    MoveToCell {
        token_id: String,
        cell: Cell,
    },
    MoveToward {
        token_id: String,
        target_id: String,
    },
    Attack {
        attacker_id: String,
        target_id: String,
        attack: String,
    },
    Defend {
        token_id: String,
    },
    EndTurn {
        token_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub label: String,
    pub intent: Intent,
}

/// Everything a turn UI shows for the current turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionReport {
    pub round: u32,
    pub active_id: Option<String>,
    pub active_name: Option<String>,
    /// One-line summary of the active token.
    pub info: String,
    pub suggestions: Vec<Suggestion>,
}

impl CombatState {
    /// Cells `token` may move this turn.
    pub fn move_budget(&self, token: &CombatToken) -> u32 {
        token.speed / self.feet_per_cell.max(1)
    }

    pub fn distance(&self, a: &CombatToken, b: &CombatToken) -> u32 {
        grid_distance(self.grid, a.position, b.position)
    }

    /// Nearest standing opponent of `token`; ties go to the earlier-created token.
    pub fn nearest_opponent(&self, token: &CombatToken) -> Option<&CombatToken> {
        let opposing = opposing_factions(&token.faction);
        self.tokens
            .iter()
            .filter(|t| t.hp > 0 && opposing.contains(&t.faction.as_str()))
            .min_by_key(|t| self.distance(token, t))
    }

    pub fn suggestions(&self) -> SuggestionReport {
        let Some(active) = self.active_token() else {
            return SuggestionReport {
                round: self.round,
                active_id: self.active_id(),
                active_name: None,
                info: "no active combatant".to_string(),
                suggestions: Vec::new(),
            };
        };
        let id = active.id.to_string();
        let mut suggestions = Vec::new();

        if let Some(target) = self.nearest_opponent(active) {
            let distance = self.distance(active, target);
            let target_id = target.id.to_string();
            match active.attacks.iter().find(|a| a.reach.covers(distance)) {
                Some(attack) => suggestions.push(Suggestion {
                    label: format!("Attack {} with {} ({} ft)", target.name, attack.name, self.feet(distance)),
                    intent: Intent::Attack {
                        attacker_id: id.clone(),
                        target_id,
                        attack: attack.name.clone(),
                    },
                }),
                None => {
                    let budget = self.move_budget(active);
                    suggestions.push(Suggestion {
                        label: format!(
                            "Move toward {} ({} of {} cells)",
                            target.name,
                            distance.min(budget),
                            distance
                        ),
                        intent: Intent::MoveToward {
                            token_id: id.clone(),
                            target_id,
                        },
                    });
                },
            }
        }

        suggestions.push(Suggestion {
            label: "Defend".to_string(),
            intent: Intent::Defend { token_id: id.clone() },
        });
        suggestions.push(Suggestion {
            label: "End turn".to_string(),
            intent: Intent::EndTurn { token_id: id.clone() },
        });

        SuggestionReport {
            round: self.round,
            active_id: Some(id),
            active_name: Some(active.name.clone()),
            info: self.describe(active),
            suggestions,
        }
    }

    fn feet(&self, cells: u32) -> u32 {
        cells.saturating_mul(self.feet_per_cell)
    }

    fn describe(&self, token: &CombatToken) -> String {
        let conditions = if token.conditions.is_empty() {
            "none".to_string()
        } else {
            token.conditions.join(", ")
        };
        let at = token
            .position_ref(self.row_base)
            .unwrap_or_else(|| token.position.to_string());
        format!(
            "HP {}/{} | speed {} ft | at {at} | conditions: {conditions}",
            token.hp, token.hp_max, token.speed
        )
    }

    /// Turn a chosen intent into instructions. Moves are clamped to the
    /// token's speed budget no matter what the intent asks for; `Defend` and
    /// `EndTurn` produce nothing.
    pub fn translate_intent(&self, intent: &Intent) -> Vec<Instruction> {
        match intent {
            Intent::MoveToCell { token_id, cell } => self.move_instruction(token_id, *cell),
            Intent::MoveToward { token_id, target_id } => match self.token(target_id) {
                Some(target) => self.move_instruction(token_id, target.position),
                None => Vec::new(),
            },
            Intent::Attack {
                attacker_id,
                target_id,
                attack,
            } => {
                let (Some(attacker), Some(target)) = (self.token(attacker_id), self.token(target_id)) else {
                    return Vec::new();
                };
                let kind = attacker
                    .attacks
                    .iter()
                    .find(|a| a.name.eq_ignore_ascii_case(attack))
                    .map_or(AttackKind::Physical, |a| a.kind());
                vec![Instruction::Attack {
                    attacker: attacker.id.to_string(),
                    target: target.id.to_string(),
                    kind,
                    speed: None,
                    duration: None,
                }]
            },
            Intent::Defend { .. } | Intent::EndTurn { .. } => Vec::new(),
        }
    }

    fn move_instruction(&self, token_id: &str, goal: Cell) -> Vec<Instruction> {
        let Some(token) = self.token(token_id) else {
            return Vec::new();
        };
        let destination = clamp_toward(self.grid, token.position, goal, self.move_budget(token));
        if destination == token.position {
            return Vec::new();
        }
        vec![Instruction::Move {
            id: token.id.to_string(),
            path: MovePath::To(destination),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_data::NullSink;

    fn sprite(code: &str, attrs: &[(&str, &str)]) -> Instruction {
        Instruction::SpriteDef {
            code: code.into(),
            attrs: attrs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        }
    }

    fn place(code: &str, col: u32, row: u32) -> Instruction {
        Instruction::Place {
            code: code.into(),
            cells: vec![Cell::new(col, row)],
        }
    }

    #[test]
    fn factions_oppose_each_other() {
        assert_eq!(opposing_factions("PC"), HOSTILE);
        assert_eq!(opposing_factions("hostile"), FRIENDLY);
        assert!(opposing_factions("neutral").is_empty());
    }

    #[test]
    fn no_opponents_still_offers_defend_and_end_turn() {
        let mut combat = CombatState::default();
        combat.apply(&[place("hero", 0, 0), place("barrel", 1, 0)], &mut NullSink);
        let report = combat.suggestions();
        assert_eq!(report.active_name.as_deref(), Some("Hero"));
        let labels: Vec<_> = report.suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Defend", "End turn"]);
        assert!(report.info.contains("HP"));
        assert!(report.info.contains("at A1"));
    }

    #[test]
    fn downed_opponents_are_ignored() {
        let mut combat = CombatState::default();
        combat.apply(
            &[
                sprite("H", &[("faction", "pc"), ("attacks", "Sword|melee|+5|1d8|1/1")]),
                sprite("G", &[("faction", "enemy"), ("hp", "0")]),
                place("H", 0, 0),
                place("G", 1, 0),
            ],
            &mut NullSink,
        );
        let report = combat.suggestions();
        assert_eq!(report.suggestions.len(), 2);
    }

    #[test]
    fn attack_intent_classifies_mode() {
        let mut combat = CombatState::default();
        combat.apply(&[place("mage", 0, 0), place("orc", 3, 0)], &mut NullSink);
        let report = combat.suggestions();
        let Intent::Attack { attack, .. } = &report.suggestions[0].intent else {
            panic!("expected an attack, got {:?}", report.suggestions[0]);
        };
        assert_eq!(attack, "Fire Bolt");
        let instrs = combat.translate_intent(&report.suggestions[0].intent);
        assert_eq!(
            instrs,
            vec![Instruction::Attack {
                attacker: "mage-1".into(),
                target: "orc-1".into(),
                kind: AttackKind::Magic,
                speed: None,
                duration: None,
            }]
        );
    }

    #[test]
    fn defend_and_end_turn_translate_to_nothing() {
        let combat = CombatState::default();
        assert!(combat.translate_intent(&Intent::Defend { token_id: "x-1".into() }).is_empty());
        assert!(combat.translate_intent(&Intent::EndTurn { token_id: "x-1".into() }).is_empty());
    }

    #[test]
    fn intent_serializes_with_kind_tag() {
        let json = serde_json::to_value(Intent::MoveToward {
            token_id: "G-1".into(),
            target_id: "H-1".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "move-toward");
    }
}
