// Per-entity smoothed "shadow" positions chasing the authoritative WorldState
//
// Each tick moves every shadow a fixed fraction `alpha` of the remaining distance toward
// its target. Non-positional attributes are copied verbatim; shadows of players that left
// are pruned.
use std::collections::HashMap;

use glam::DVec2;
use protocol::{Facing, Player};

use crate::utils::lerp;
use crate::world::WorldState;

#[derive(Debug, Clone, PartialEq)]
pub struct Shadow {
    pub position: DVec2,
    pub facing: Facing,
    pub moving: bool,
    pub animation_frame: usize,
    pub display_name: String,
    pub avatar_key: String,
}

impl Shadow {
    fn from_player(player: &Player) -> Self {
        Self {
            position: player.position(),
            facing: player.facing,
            moving: player.moving,
            animation_frame: player.animation_frame,
            display_name: player.display_name.clone(),
            avatar_key: player.avatar_key.clone(),
        }
    }

    fn follow(&mut self, player: &Player, alpha: f64) {
        self.position.x = lerp(self.position.x, player.x, alpha);
        self.position.y = lerp(self.position.y, player.y, alpha);
        self.facing = player.facing;
        self.moving = player.moving;
        self.animation_frame = player.animation_frame;
        self.display_name.clone_from(&player.display_name);
        self.avatar_key.clone_from(&player.avatar_key);
    }
}

#[derive(Debug, Clone)]
pub struct Interpolator {
    alpha: f64,
    shadows: HashMap<String, Shadow>,
}

impl Interpolator {
    /// `alpha` is the per-tick blend factor, expected in (0, 1).
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            shadows: HashMap::new(),
        }
    }

    /// Advance every shadow one tick toward its player.
    ///
    /// A player seen for the first time gets a shadow at its exact position.
    pub fn tick(&mut self, world: &WorldState) {
        self.shadows.retain(|id, _| world.player(id).is_some());
        for player in world.players() {
            match self.shadows.get_mut(&player.id) {
                Some(shadow) => shadow.follow(player, self.alpha),
                None => {
                    self.shadows
                        .insert(player.id.clone(), Shadow::from_player(player));
                }
            }
        }
    }

    /// Drop a single shadow so the next tick re-initializes it at the player's position.
    pub fn forget(&mut self, id: &str) {
        self.shadows.remove(id);
    }

    pub fn clear(&mut self) {
        self.shadows.clear();
    }

    #[inline]
    pub fn shadow(&self, id: &str) -> Option<&Shadow> {
        self.shadows.get(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shadows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shadows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::PlayerUpdate;

    fn world_with(players: &[(&str, f64, f64)]) -> WorldState {
        let mut world = WorldState::new();
        let map = players
            .iter()
            .map(|&(id, x, y)| (id.to_string(), Player::new(id, x, y)))
            .collect();
        world.apply_join_result("me".into(), map, HashMap::new());
        world
    }

    fn move_to(world: &mut WorldState, id: &str, x: f64, y: f64) {
        let updates = HashMap::from([(
            id.to_string(),
            PlayerUpdate {
                x: Some(x),
                y: Some(y),
                facing: Some(Facing::East),
                moving: Some(true),
                ..Default::default()
            },
        )]);
        world.apply_players_moved(&updates);
    }

    #[test]
    fn test_first_tick_snaps_to_target() {
        let world = world_with(&[("me", 10.0, 20.0)]);
        let mut interp = Interpolator::new(0.1);
        interp.tick(&world);
        assert_eq!(interp.shadow("me").unwrap().position, DVec2::new(10.0, 20.0));
    }

    #[test]
    fn test_single_tick_moves_alpha_of_distance() {
        let mut world = world_with(&[("p", 0.0, 0.0)]);
        let mut interp = Interpolator::new(0.1);
        interp.tick(&world);

        move_to(&mut world, "p", 100.0, 0.0);
        interp.tick(&world);

        let shadow = interp.shadow("p").unwrap();
        assert!((shadow.position.x - 10.0).abs() < 1e-9);
        assert_eq!(shadow.position.y, 0.0);
        // Non-positional attributes are copied, not blended.
        assert_eq!(shadow.facing, Facing::East);
        assert!(shadow.moving);
    }

    #[test]
    fn test_converges_within_tolerance() {
        let mut world = world_with(&[("p", 0.0, 0.0)]);
        let mut interp = Interpolator::new(0.1);
        interp.tick(&world);

        move_to(&mut world, "p", 100.0, 0.0);
        for _ in 0..200 {
            interp.tick(&world);
        }
        let shadow = interp.shadow("p").unwrap();
        assert!((shadow.position.x - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_distance_strictly_decreases() {
        for alpha in [0.1, 0.25] {
            let mut world = world_with(&[("p", 5.0, -3.0)]);
            let mut interp = Interpolator::new(alpha);
            interp.tick(&world);
            move_to(&mut world, "p", -40.0, 60.0);

            let target = DVec2::new(-40.0, 60.0);
            let mut last = interp.shadow("p").unwrap().position.distance(target);
            for _ in 0..50 {
                interp.tick(&world);
                let d = interp.shadow("p").unwrap().position.distance(target);
                if last > 0.0 {
                    assert!(d < last, "alpha {alpha}: {d} !< {last}");
                }
                last = d;
            }
        }
    }

    #[test]
    fn test_default_alpha_settles_within_200_ticks() {
        let mut world = world_with(&[("p", 0.0, 0.0)]);
        let mut interp = Interpolator::new(0.1);
        interp.tick(&world);
        move_to(&mut world, "p", 2048.0, 2048.0);

        let target = DVec2::new(2048.0, 2048.0);
        let ticks = (1..=200)
            .find(|_| {
                interp.tick(&world);
                interp.shadow("p").unwrap().position.distance(target) < 1e-3
            })
            .unwrap();
        assert!(ticks <= 200);
    }

    #[test]
    fn test_departed_players_are_pruned() {
        let mut world = world_with(&[("me", 0.0, 0.0), ("other", 5.0, 5.0)]);
        let mut interp = Interpolator::new(0.1);
        interp.tick(&world);
        assert_eq!(interp.len(), 2);

        world.apply_player_left("other");
        interp.tick(&world);
        assert_eq!(interp.len(), 1);
        assert!(interp.shadow("other").is_none());
    }

    #[test]
    fn test_forget_reinitializes_at_target() {
        let mut world = world_with(&[("p", 0.0, 0.0)]);
        let mut interp = Interpolator::new(0.1);
        interp.tick(&world);

        move_to(&mut world, "p", 500.0, 500.0);
        interp.forget("p");
        interp.tick(&world);
        assert_eq!(interp.shadow("p").unwrap().position, DVec2::new(500.0, 500.0));
    }
}
