//! Shared environment actors. Simulated by the relay peer, mirrored by the other.

use std::collections::HashSet;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uuid::Uuid;

use crate::ws::protocol::ActorState;

use super::combat::{CombatSystem, HitTarget, TargetKind};

/// Actor tuning
#[derive(Debug, Clone, Copy)]
pub struct ActorStats {
    pub batch_size: usize,
    /// Spawn within +/- this range on X and Z
    pub spawn_range: f32,
    pub spawn_height: f32,
    pub max_health: f32,
    pub speed: f32,
    pub contact_range: f32,
    pub contact_damage: f32,
    pub knockback: f32,
    /// A new batch is scheduled once the population drops below this
    pub min_population: usize,
    pub respawn_delay: f32,
}

impl Default for ActorStats {
    fn default() -> Self {
        Self {
            batch_size: 5,
            spawn_range: 40.0,
            spawn_height: 1.0,
            max_health: 100.0,
            speed: 3.0,
            contact_range: 2.0,
            contact_damage: 10.0,
            knockback: 5.0,
            min_population: 3,
            respawn_delay: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentActor {
    pub id: String,
    pub position: Vec3,
    pub health: f32,
}

/// Result of damaging an actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorDamage {
    pub health: f32,
    pub killed: bool,
}

pub struct ActorDirector {
    stats: ActorStats,
    actors: Vec<EnvironmentActor>,
    /// True on the peer that owns the actors
    simulate: bool,
    respawn_timer: Option<f32>,
    rng: ChaCha8Rng,
    /// Mirror only: ids killed here that the relay still lists
    killed: HashSet<String>,
}

impl ActorDirector {
    /// Owning director, spawns the first batch immediately
    pub fn simulated(seed: u64, stats: ActorStats) -> Self {
        let mut director = Self {
            stats,
            actors: Vec::new(),
            simulate: true,
            respawn_timer: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            killed: HashSet::new(),
        };
        director.spawn_batch();
        director
    }

    /// Mirror of the remote relay's actors, fed by world sync only
    pub fn mirror() -> Self {
        Self {
            stats: ActorStats::default(),
            actors: Vec::new(),
            simulate: false,
            respawn_timer: None,
            rng: ChaCha8Rng::seed_from_u64(0),
            killed: HashSet::new(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.simulate
    }

    pub fn actors(&self) -> &[EnvironmentActor] {
        &self.actors
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    fn spawn_batch(&mut self) {
        let range = self.stats.spawn_range;
        for _ in 0..self.stats.batch_size {
            let position = Vec3::new(
                self.rng.gen_range(-range..=range),
                self.stats.spawn_height,
                self.rng.gen_range(-range..=range),
            );
            let id = Uuid::from_bytes(self.rng.gen()).to_string();
            self.actors.push(EnvironmentActor {
                id,
                position,
                health: self.stats.max_health,
            });
        }
        debug!(count = self.actors.len(), "Spawned actor batch");
    }

    /// Chase `target` and return the contact damage dealt to it this tick.
    /// Does nothing on a mirror.
    pub fn update(&mut self, dt: f32, target: Option<Vec3>) -> f32 {
        if !self.simulate {
            return 0.0;
        }

        let mut damage = 0.0;
        if let Some(target) = target {
            let stats = self.stats;
            for actor in &mut self.actors {
                let mut to_target = target - actor.position;
                to_target.y = 0.0;
                let dir = to_target.normalize_or_zero();
                actor.position += dir * stats.speed * dt;

                let mut offset = target - actor.position;
                offset.y = 0.0;
                if offset.length() < stats.contact_range {
                    damage += stats.contact_damage;
                    actor.position -= dir * stats.knockback;
                }
            }
        }

        if self.actors.len() < self.stats.min_population {
            let remaining = self.respawn_timer.unwrap_or(self.stats.respawn_delay) - dt;
            if remaining <= 0.0 {
                self.respawn_timer = None;
                self.spawn_batch();
            } else {
                self.respawn_timer = Some(remaining);
            }
        }

        damage
    }

    /// Damage an actor, removing it on death. `None` for an unknown id.
    pub fn apply_damage(&mut self, id: &str, damage: f32) -> Option<ActorDamage> {
        let index = self.actors.iter().position(|a| a.id == id)?;
        let (health, killed) = CombatSystem::apply_damage(self.actors[index].health, damage);
        if killed {
            let actor = self.actors.swap_remove(index);
            if !self.simulate {
                self.killed.insert(actor.id);
            }
        } else {
            self.actors[index].health = health;
        }
        Some(ActorDamage { health, killed })
    }

    pub fn hit_targets(&self) -> Vec<HitTarget> {
        self.actors
            .iter()
            .map(|a| HitTarget {
                id: a.id.clone(),
                position: a.position,
                kind: TargetKind::Actor,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<ActorState> {
        self.actors
            .iter()
            .map(|a| ActorState {
                id: a.id.clone(),
                position: a.position,
                health: a.health,
            })
            .collect()
    }

    /// Overwrite the mirrored population with the relay's full list. Actors
    /// killed locally stay gone until the relay stops listing them.
    pub fn apply_world_sync(&mut self, states: &[ActorState]) {
        if self.simulate {
            return;
        }
        self.killed.retain(|id| states.iter().any(|s| &s.id == id));
        self.actors = states
            .iter()
            .filter(|s| s.health > 0.0 && !self.killed.contains(&s.id))
            .map(|s| EnvironmentActor {
                id: s.id.clone(),
                position: s.position,
                health: s.health,
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_batch_spawns_in_range() {
        let director = ActorDirector::simulated(42, ActorStats::default());
        assert_eq!(director.len(), 5);
        for actor in director.actors() {
            assert!(actor.position.x.abs() <= 40.0);
            assert!(actor.position.z.abs() <= 40.0);
            assert_eq!(actor.health, 100.0);
        }
    }

    #[test]
    fn same_seed_same_spawns() {
        let a = ActorDirector::simulated(7, ActorStats::default());
        let b = ActorDirector::simulated(7, ActorStats::default());
        assert_eq!(a.actors(), b.actors());
    }

    #[test]
    fn actors_chase_and_knock_back_on_contact() {
        let mut director = ActorDirector::simulated(1, ActorStats::default());
        director.actors.truncate(1);
        director.actors[0].position = Vec3::new(3.0, 1.0, 0.0);
        director.respawn_timer = None;

        // Chase closes the gap
        let damage = director.update(0.1, Some(Vec3::new(0.0, 1.8, 0.0)));
        assert_eq!(damage, 0.0);
        assert!((director.actors[0].position.x - 2.7).abs() < 1e-4);

        // Contact: damage and pushed away
        director.actors[0].position = Vec3::new(1.0, 1.0, 0.0);
        let damage = director.update(0.1, Some(Vec3::new(0.0, 1.8, 0.0)));
        assert_eq!(damage, 10.0);
        assert!(director.actors[0].position.x > 5.0);
    }

    #[test]
    fn batch_respawns_after_delay_when_population_drops() {
        let mut director = ActorDirector::simulated(3, ActorStats::default());
        let ids: Vec<String> = director.actors().iter().map(|a| a.id.clone()).collect();
        for id in &ids[..3] {
            let result = director.apply_damage(id, 200.0).unwrap();
            assert!(result.killed);
        }
        assert_eq!(director.len(), 2);

        director.update(1.0, None);
        assert_eq!(director.len(), 2);
        director.update(1.0, None);
        assert_eq!(director.len(), 7);
    }

    #[test]
    fn damage_on_unknown_actor_is_none() {
        let mut director = ActorDirector::simulated(3, ActorStats::default());
        assert_eq!(director.apply_damage("nope", 10.0), None);
        let id = director.actors()[0].id.clone();
        assert_eq!(
            director.apply_damage(&id, 30.0),
            Some(ActorDamage {
                health: 70.0,
                killed: false
            })
        );
    }

    #[test]
    fn mirror_follows_world_sync_and_never_simulates() {
        let relay = ActorDirector::simulated(5, ActorStats::default());
        let mut mirror = ActorDirector::mirror();
        assert!(mirror.is_empty());

        mirror.apply_world_sync(&relay.states());
        assert_eq!(mirror.actors(), relay.actors());

        let before = mirror.actors().to_vec();
        assert_eq!(mirror.update(1.0, Some(Vec3::ZERO)), 0.0);
        assert_eq!(mirror.actors(), &before[..]);

        mirror.apply_world_sync(&[]);
        assert!(mirror.is_empty());
    }

    #[test]
    fn mirror_keeps_killed_actor_gone_across_world_sync() {
        let relay = ActorDirector::simulated(5, ActorStats::default());
        let mut mirror = ActorDirector::mirror();
        mirror.apply_world_sync(&relay.states());
        let id = mirror.actors()[0].id.clone();

        assert!(mirror.apply_damage(&id, 150.0).unwrap().killed);
        for _ in 0..3 {
            mirror.apply_world_sync(&relay.states());
            assert_eq!(mirror.len(), relay.len() - 1);
            assert_eq!(mirror.apply_damage(&id, 150.0), None);
        }

        // Relay dropped it, so a later reuse of the id is shown again
        let others: Vec<ActorState> = relay.states().into_iter().filter(|s| s.id != id).collect();
        mirror.apply_world_sync(&others);
        assert!(mirror.killed.is_empty());
        mirror.apply_world_sync(&relay.states());
        assert_eq!(mirror.len(), relay.len());
    }
}
