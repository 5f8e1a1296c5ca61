//! Animation clock.
//!
//! Advances queued moves and ages effects. This is the only code that mutates a
//! [`WorldState`] outside of [`crate::Interpreter::apply`], and it touches only
//! token positions, `active_moves` and `active_effects`.

use log::trace;
use serde::Serialize;
use skirmish_data::TokenId;

use crate::config::AnimationConfig;
use crate::world::{ActiveMove, Point, WorldState};

/// What changed during one [`Scheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Tokens whose move finished this tick.
    pub arrived: Vec<TokenId>,
    /// Ids of effects that expired this tick.
    pub expired_effects: Vec<u64>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.arrived.is_empty() && self.expired_effects.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    speed_scale: f64,
    epsilon: f64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(&AnimationConfig::default())
    }
}

impl Scheduler {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            speed_scale: if config.speed_scale.is_finite() {
                config.speed_scale.max(0.0)
            } else {
                1.0
            },
            epsilon: config.arrival_epsilon.abs(),
        }
    }

    /// Advance the world by `dt` seconds. A negative or non-finite `dt` counts as zero.
    pub fn tick(&self, world: &mut WorldState, dt: f64) -> TickReport {
        let dt = if dt.is_finite() { dt.max(0.0) * self.speed_scale } else { 0.0 };
        let mut report = TickReport::default();

        let moves = std::mem::take(&mut world.active_moves);
        for mut mv in moves {
            let Some(token) = world.instance_mut(&mv.token_id) else {
                trace!("dropping move of vanished token {}", mv.token_id);
                continue;
            };
            let mut position = token.position();
            self.walk(&mut mv, &mut position, dt);
            token.set_position(position);
            if mv.is_finished() {
                report.arrived.push(mv.token_id);
            } else {
                world.active_moves.push(mv);
            }
        }

        world.active_effects.retain_mut(|effect| {
            effect.age += dt;
            if effect.is_expired() {
                report.expired_effects.push(effect.id);
                false
            } else {
                true
            }
        });

        report
    }

    /// Spend `dt` seconds of travel on `mv`, possibly passing several waypoints.
    fn walk(&self, mv: &mut ActiveMove, position: &mut Point, dt: f64) {
        let mut budget = mv.speed.max(0.0) * dt;
        while let Some(target) = mv.next_waypoint() {
            let remaining = position.distance(target);
            if remaining <= budget || remaining < self.epsilon {
                budget -= remaining;
                *position = target;
                mv.index += 1;
                continue;
            }
            let fraction = budget / remaining;
            position.col += (target.col - position.col) * fraction;
            position.row += (target.row - position.row) * fraction;
            if position.distance(target) < self.epsilon {
                *position = target;
                mv.index += 1;
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::world::ActiveEffect;
    use crate::world::EffectEndpoint;
    use skirmish_data::{Cell, Instruction, MovePath, NullSink};

    fn world_with_move(path: MovePath) -> WorldState {
        Interpreter::default().apply(
            &WorldState::default(),
            &[
                Instruction::Place {
                    code: "wolf".into(),
                    cells: vec![Cell::new(0, 0)],
                },
                Instruction::Move {
                    id: "wolf-1".into(),
                    path,
                },
            ],
            &mut NullSink,
        )
    }

    fn wolf(world: &WorldState) -> Point {
        world.token_instances[0].position()
    }

    #[test]
    fn move_advances_at_speed_and_arrives() {
        let scheduler = Scheduler::default();
        let mut world = world_with_move(MovePath::To(Cell::new(8, 0)));

        let report = scheduler.tick(&mut world, 1.0);
        assert!(report.is_quiet());
        assert!((wolf(&world).col - 4.0).abs() < 1e-9);

        let report = scheduler.tick(&mut world, 1.5);
        assert_eq!(report.arrived, vec!["wolf-1".parse().unwrap()]);
        assert_eq!(wolf(&world), Point { col: 8.0, row: 0.0 });
        assert!(world.active_moves.is_empty());
    }

    #[test]
    fn waypoints_are_walked_in_order() {
        let scheduler = Scheduler::default();
        let mut world = world_with_move(MovePath::Waypoints(vec![Cell::new(0, 0), Cell::new(2, 0), Cell::new(2, 2)]));
        scheduler.tick(&mut world, 0.75);
        assert_eq!(wolf(&world), Point { col: 2.0, row: 1.0 });
        assert_eq!(world.active_moves[0].index, 2);
    }

    #[test]
    fn zero_and_invalid_dt_change_nothing() {
        let scheduler = Scheduler::default();
        let mut world = world_with_move(MovePath::To(Cell::new(3, 0)));
        let before = world.clone();
        scheduler.tick(&mut world, 0.0);
        scheduler.tick(&mut world, -2.0);
        scheduler.tick(&mut world, f64::NAN);
        assert_eq!(world, before);
    }

    #[test]
    fn moves_of_removed_tokens_are_dropped() {
        let scheduler = Scheduler::default();
        let mut world = world_with_move(MovePath::To(Cell::new(3, 0)));
        world.token_instances.clear();
        let report = scheduler.tick(&mut world, 0.1);
        assert!(world.active_moves.is_empty());
        assert!(report.arrived.is_empty());
    }

    #[test]
    fn effects_expire_after_duration() {
        let scheduler = Scheduler::default();
        let mut world = WorldState::default();
        let id = world.push_effect(ActiveEffect {
            id: 0,
            kind: "smoke".into(),
            source: EffectEndpoint::Cell(Cell::new(0, 0)),
            target: EffectEndpoint::Cell(Cell::new(0, 0)),
            speed: 1.0,
            duration: 1.0,
            age: 0.0,
        });
        assert!(scheduler.tick(&mut world, 0.6).is_quiet());
        assert_eq!(world.active_effects.len(), 1);
        let report = scheduler.tick(&mut world, 0.6);
        assert_eq!(report.expired_effects, vec![id]);
        assert!(world.active_effects.is_empty());
    }

    #[test]
    fn speed_scale_stretches_time() {
        let config = AnimationConfig {
            speed_scale: 0.5,
            ..AnimationConfig::default()
        };
        let scheduler = Scheduler::new(&config);
        let mut world = world_with_move(MovePath::To(Cell::new(8, 0)));
        scheduler.tick(&mut world, 1.0);
        assert!((wolf(&world).col - 2.0).abs() < 1e-9);
    }

    #[test]
    fn tick_leaves_map_and_definitions_alone() {
        let scheduler = Scheduler::default();
        let mut world = world_with_move(MovePath::To(Cell::new(1, 0)));
        let (map, defs) = (world.map.clone(), world.token_definitions.clone());
        scheduler.tick(&mut world, 5.0);
        assert_eq!(world.map, map);
        assert_eq!(world.token_definitions, defs);
    }
}
