//! Level provider seam and the built-in arena

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::collision::{CollisionWorld, Solid};
use super::r#match::Team;

/// Spawn point group requested from the level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnGroup {
    Team(Team),
    FreeForAll,
}

/// Fallback when a level defines no spawn points for a group
pub const DEFAULT_SPAWN: Vec3 = Vec3::new(0.0, 2.0, 0.0);

/// Static level content consumed by the simulation
pub trait LevelProvider: Send {
    /// Pick a spawn position for the group
    fn spawn_point(&mut self, group: SpawnGroup) -> Vec3;

    /// Collidable solids, registered once at load time
    fn solids(&self) -> &[Solid];
}

/// Register every solid of a level into a fresh collision world
pub fn load_collision(level: &dyn LevelProvider) -> CollisionWorld {
    let mut world = CollisionWorld::new();
    for solid in level.solids() {
        world.register_solid(*solid);
    }
    world
}

/// Walled square arena with a few cover blocks
pub struct ArenaLevel {
    solids: Vec<Solid>,
    red: Vec<Vec3>,
    blue: Vec<Vec3>,
    ffa: Vec<Vec3>,
    rng: ChaCha8Rng,
}

impl ArenaLevel {
    /// Half extent of the playable floor
    pub const HALF_SIZE: f32 = 50.0;
    const WALL_HEIGHT: f32 = 6.0;
    const WALL_THICKNESS: f32 = 1.0;

    pub fn new(seed: u64) -> Self {
        let h = Self::HALF_SIZE;
        let t = Self::WALL_THICKNESS;
        let y = Self::WALL_HEIGHT * 0.5;
        let span = 2.0 * (h + t);
        let edge = h + t * 0.5;
        let along_x = Vec3::new(span, Self::WALL_HEIGHT, t);
        let along_z = Vec3::new(t, Self::WALL_HEIGHT, span);

        let mut solids = vec![
            Solid::from_center(Vec3::new(0.0, y, -edge), along_x),
            Solid::from_center(Vec3::new(0.0, y, edge), along_x),
            Solid::from_center(Vec3::new(-edge, y, 0.0), along_z),
            Solid::from_center(Vec3::new(edge, y, 0.0), along_z),
        ];

        // Cover crates
        for (x, z) in [(-15.0, -15.0), (15.0, -15.0), (-15.0, 15.0), (15.0, 15.0), (0.0, 0.0)] {
            solids.push(Solid::from_center(Vec3::new(x, 1.5, z), Vec3::new(4.0, 3.0, 4.0)));
        }

        Self {
            solids,
            red: vec![
                Vec3::new(-40.0, 1.8, -40.0),
                Vec3::new(-40.0, 1.8, -30.0),
                Vec3::new(-30.0, 1.8, -40.0),
            ],
            blue: vec![
                Vec3::new(40.0, 1.8, 40.0),
                Vec3::new(40.0, 1.8, 30.0),
                Vec3::new(30.0, 1.8, 40.0),
            ],
            ffa: vec![
                Vec3::new(-40.0, 1.8, 40.0),
                Vec3::new(40.0, 1.8, -40.0),
                Vec3::new(0.0, 1.8, 30.0),
                Vec3::new(0.0, 1.8, -30.0),
                Vec3::new(30.0, 1.8, 0.0),
                Vec3::new(-30.0, 1.8, 0.0),
            ],
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl LevelProvider for ArenaLevel {
    fn spawn_point(&mut self, group: SpawnGroup) -> Vec3 {
        let points = match group {
            SpawnGroup::Team(Team::Red) => &self.red,
            SpawnGroup::Team(Team::Blue) => &self.blue,
            SpawnGroup::FreeForAll => &self.ffa,
        };
        if points.is_empty() {
            return DEFAULT_SPAWN;
        }
        points[self.rng.gen_range(0..points.len())]
    }

    fn solids(&self) -> &[Solid] {
        &self.solids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collision::PLAYER_RADIUS;

    #[test]
    fn spawn_points_are_clear_of_solids() {
        let mut level = ArenaLevel::new(1);
        let world = load_collision(&level);
        assert_eq!(world.solid_count(), 9);

        for group in [
            SpawnGroup::FreeForAll,
            SpawnGroup::Team(Team::Red),
            SpawnGroup::Team(Team::Blue),
        ] {
            for _ in 0..20 {
                let p = level.spawn_point(group);
                assert!(!world.is_blocked(p, PLAYER_RADIUS), "{group:?} spawn {p:?} blocked");
            }
        }
    }

    #[test]
    fn team_spawns_stay_on_their_side() {
        let mut level = ArenaLevel::new(9);
        for _ in 0..10 {
            assert!(level.spawn_point(SpawnGroup::Team(Team::Red)).x < 0.0);
            assert!(level.spawn_point(SpawnGroup::Team(Team::Blue)).x > 0.0);
        }
    }

    #[test]
    fn perimeter_walls_stop_movement() {
        let level = ArenaLevel::new(0);
        let world = load_collision(&level);
        let current = Vec3::new(0.0, 1.8, -49.0);
        let desired = Vec3::new(0.0, 1.8, -49.8);
        assert_eq!(world.resolve(current, desired, PLAYER_RADIUS), current);
    }
}
