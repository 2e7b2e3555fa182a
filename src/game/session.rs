//! Simulation context for one peer: local entity, weapons, match rules,
//! environment actors and the peer link, advanced one frame at a time

use std::collections::VecDeque;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::util::time::{unix_millis, SimClock, MAX_FRAME_DELTA};
use crate::ws::sync::{PeerSync, SyncEffect};
use crate::ws::transport::LinkEvent;

use super::actors::{ActorDirector, ActorStats};
use super::collision::CollisionWorld;
use super::combat::{Ballistics, CombatSystem, HitResult, HitTarget, TargetKind, WeaponKind};
use super::entity::{Entity, MAX_HEALTH};
use super::events::{ScoreboardRow, UiEvent};
use super::level::{load_collision, LevelProvider, SpawnGroup};
use super::physics::Locomotion;
use super::r#match::{CombatAuthority, GameMode};
use super::FrameInput;

/// Personal score for a hit on a remote player
pub const HIT_SCORE: u32 = 25;
/// Personal score when the remote credits us with a kill
pub const REMOTE_KILL_SCORE: u32 = 500;
/// Personal score for an environment actor kill
pub const ACTOR_KILL_SCORE: u32 = 100;

const ACTOR_NAME: &str = "Enemy";
const ACTOR_SEED_SALT: u64 = 0x5eed_ac70;

pub struct Session {
    config: SessionConfig,
    clock: SimClock,
    level: Box<dyn LevelProvider>,
    world: CollisionWorld,
    local: Entity,
    locomotion: Locomotion,
    ballistics: Ballistics,
    authority: CombatAuthority,
    actors: Option<ActorDirector>,
    sync: PeerSync,
    inbound: VecDeque<LinkEvent>,
    events: Vec<UiEvent>,
    /// Seconds until respawn while dead
    respawn_timer: Option<f32>,
    trigger_was_held: bool,
}

impl Session {
    pub fn new(config: SessionConfig, level: Box<dyn LevelProvider>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), config, level)
    }

    pub fn with_id(
        local_id: impl Into<String>,
        config: SessionConfig,
        mut level: Box<dyn LevelProvider>,
    ) -> Self {
        let local_id = local_id.into();
        let world = load_collision(level.as_ref());
        let authority = CombatAuthority::new(local_id.clone(), &config);

        let group = spawn_group(&authority, &local_id);
        let spawn = level.spawn_point(group);
        let mut local = Entity::new(local_id.clone(), config.player_name.clone(), spawn);
        local.team = authority.local_team();

        let actors = if !config.relay {
            Some(ActorDirector::mirror())
        } else if config.environment_actors {
            Some(ActorDirector::simulated(
                config.seed ^ ACTOR_SEED_SALT,
                ActorStats::default(),
            ))
        } else {
            None
        };

        info!(
            local_id = %local_id,
            mode = %config.mode,
            relay = config.relay,
            actors = actors.as_ref().map_or(0, ActorDirector::len),
            solids = world.solid_count(),
            "Session started"
        );

        let mut session = Self {
            clock: SimClock::new(),
            world,
            locomotion: Locomotion::new(config.movement),
            ballistics: Ballistics::new(local_id.clone(), config.seed),
            sync: PeerSync::new(local_id, &config),
            authority,
            actors,
            local,
            level,
            config,
            inbound: VecDeque::new(),
            events: Vec::new(),
            respawn_timer: None,
            trigger_was_held: false,
        };
        session.emit_loadout();
        session
    }

    pub fn local(&self) -> &Entity {
        &self.local
    }

    pub fn local_id(&self) -> &str {
        &self.local.id
    }

    pub fn authority(&self) -> &CombatAuthority {
        &self.authority
    }

    pub fn ballistics(&self) -> &Ballistics {
        &self.ballistics
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    pub fn sync(&self) -> &PeerSync {
        &self.sync
    }

    pub fn actors(&self) -> Option<&ActorDirector> {
        self.actors.as_ref()
    }

    pub fn is_dead(&self) -> bool {
        self.respawn_timer.is_some()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Queue a link event, applied at the end of the next tick
    pub fn enqueue(&mut self, event: LinkEvent) {
        self.inbound.push_back(event);
    }

    /// Presentation notifications since the last drain
    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance one frame.
    ///
    /// Order: input actions, locomotion, weapons and projectiles, actors,
    /// local hit detection, match rules, outbound snapshot, queued inbound.
    pub fn tick(&mut self, dt: f32, input: &FrameInput) {
        let dt = dt.clamp(0.0, MAX_FRAME_DELTA);
        self.clock.advance(dt);
        let now = self.clock.now_ms();

        self.apply_match_toggles(input);

        if self.is_dead() {
            self.update_respawn(dt);
            self.trigger_was_held = false;
        } else {
            self.apply_actions(input, now);
            self.move_local(dt, input);
            self.handle_trigger(input, now);
            self.local.last_update_ms = unix_millis();
        }

        for kind in self.ballistics.update(now) {
            if kind == self.ballistics.current_kind() {
                self.emit_ammo();
            }
        }
        self.ballistics.advance(dt);

        self.update_actors(dt);
        self.detect_hits();

        if self.authority.update(dt, &mut self.events) {
            self.respawn();
        }
        self.local.team = self.authority.local_team();

        self.send_outbound(now);
        self.apply_inbound();

        self.emit_frame_state(input);
    }

    fn apply_match_toggles(&mut self, input: &FrameInput) {
        if input.toggle_mode {
            let mode = self.authority.toggle_mode(&mut self.events);
            info!(mode = %mode, "Game mode toggled");
            self.respawn();
        }
        if input.switch_team && self.authority.switch_team(&mut self.events) {
            self.respawn();
        }
    }

    fn apply_actions(&mut self, input: &FrameInput, now: u64) {
        if let Some(slot) = input.switch_weapon {
            if self.ballistics.switch_weapon(slot) {
                self.local.weapon = self.ballistics.current_kind();
                self.emit_loadout();
            }
        }

        if input.reload && self.ballistics.reload(now) {
            self.events.push(UiEvent::ReloadStarted {
                duration_ms: self.ballistics.current().stats.reload_ms,
            });
        }

        self.locomotion.set_sprint(input.sprint);
        self.locomotion.set_crouch(input.crouch, &mut self.local.position);
        if input.jump {
            self.locomotion.try_jump(self.local.position);
        }
        if input.slide {
            self.locomotion.try_slide(&mut self.local.position, input.forward);
        }
    }

    fn move_local(&mut self, dt: f32, input: &FrameInput) {
        self.local.yaw = input.yaw;
        self.local.pitch = input.pitch;
        self.locomotion
            .update(dt, &mut self.local.position, input.yaw, input, &self.world);

        self.local.crouching = self.locomotion.is_crouching();
        self.local.sliding = self.locomotion.is_sliding();
        self.local.zooming = input.zoom;
    }

    /// Semi-automatic weapons fire on the press, automatic ones every tick held
    fn handle_trigger(&mut self, input: &FrameInput, now: u64) {
        let pressed = input.trigger && !self.trigger_was_held;
        self.trigger_was_held = input.trigger;

        let automatic = self.ballistics.current().stats.automatic;
        if !(pressed || (input.trigger && automatic)) {
            return;
        }

        let origin = self.local.position;
        let direction = self.local.view_direction();
        let spawned = self.ballistics.fire(now, origin, direction);
        if spawned.is_empty() {
            return;
        }

        self.emit_ammo();
        self.sync.send_shoot(
            self.ballistics.current_kind(),
            origin,
            direction,
            &mut self.events,
        );
    }

    fn update_respawn(&mut self, dt: f32) {
        let Some(remaining) = self.respawn_timer else {
            return;
        };
        let remaining = remaining - dt;
        if remaining <= 0.0 {
            self.respawn();
        } else {
            self.respawn_timer = Some(remaining);
            self.events.push(UiEvent::RespawnCountdown {
                secs: remaining.ceil(),
            });
        }
    }

    fn update_actors(&mut self, dt: f32) {
        let target = (!self.is_dead()).then_some(self.local.position);
        let Some(actors) = self.actors.as_mut() else {
            return;
        };
        let damage = actors.update(dt, target);
        if damage > 0.0 {
            self.take_damage(damage, None);
        }
    }

    fn detect_hits(&mut self) {
        let local_id = self.local.id.clone();
        let mut targets: Vec<HitTarget> = self
            .actors
            .as_ref()
            .map(ActorDirector::hit_targets)
            .unwrap_or_default();

        targets.extend(
            self.sync
                .remotes()
                .into_iter()
                .filter(|r| r.is_alive() && self.authority.can_damage(&local_id, &r.id))
                .map(|r| HitTarget {
                    id: r.id.clone(),
                    position: r.position,
                    kind: TargetKind::Player,
                }),
        );

        for hit in self.ballistics.test_hits(&targets) {
            self.apply_hit(hit);
        }
    }

    fn apply_hit(&mut self, hit: HitResult) {
        match hit.target_kind {
            TargetKind::Actor => {
                let Some(result) = self
                    .actors
                    .as_mut()
                    .and_then(|a| a.apply_damage(&hit.target_id, hit.damage))
                else {
                    return;
                };
                self.events.push(UiEvent::HitMarker);
                if result.killed {
                    debug!(actor = %hit.target_id, "Actor killed");
                    self.local.score += ACTOR_KILL_SCORE;
                    self.local.kills += 1;
                    self.emit_score();
                }
            }
            TargetKind::Player => {
                debug!(target_id = %hit.target_id, damage = hit.damage, "Hit remote player");
                self.sync.send_hit(&hit.target_id, hit.damage, &mut self.events);
                self.events.push(UiEvent::HitMarker);
                self.local.score += HIT_SCORE;
                self.events.push(UiEvent::ScoreChanged {
                    score: self.local.score,
                });
            }
        }
    }

    fn send_outbound(&mut self, now: u64) {
        self.sync.send_snapshot(now, &self.local, &mut self.events);

        if let Some(actors) = self.actors.as_ref().filter(|a| a.is_simulated()) {
            if self.sync.world_sync_due(now) {
                let states = actors.states();
                self.sync.send_world_sync(states, &mut self.events);
            }
        }
    }

    fn apply_inbound(&mut self) {
        let mut effects = self.sync.take_pending();
        while let Some(event) = self.inbound.pop_front() {
            effects.extend(self.sync.handle(event, &mut self.events));
        }
        for effect in effects {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: SyncEffect) {
        match effect {
            SyncEffect::Damage {
                attacker_id,
                attacker_name,
                damage,
            } => self.take_damage(damage, Some((attacker_id, attacker_name))),
            SyncEffect::KillCredited {
                victim_id,
                victim_name,
            } => {
                info!(victim = %victim_id, name = %victim_name, "Remote kill credited");
                self.local.score += REMOTE_KILL_SCORE;
                self.local.kills += 1;
                self.emit_score();
                let local_id = self.local.id.clone();
                self.authority.on_kill(&local_id, &victim_id, &mut self.events);
            }
            SyncEffect::RemoteShot {
                owner_id,
                weapon,
                origin,
                direction,
            } => {
                self.ballistics.spawn_remote(&owner_id, weapon, origin, direction);
            }
            SyncEffect::WorldSync(states) => {
                if let Some(actors) = self.actors.as_mut() {
                    actors.apply_world_sync(&states);
                }
            }
            SyncEffect::RemoteTeam { id, team } => self.authority.register_member(&id, team),
            SyncEffect::Departed { id } => {
                self.authority.remove_member(&id);
                self.events.push(UiEvent::EnemyHealth { health: None });
            }
        }
    }

    /// Apply damage to the local entity. Ignored while dead.
    /// `attacker` is (id, name) for a remote player, `None` for environment damage.
    pub fn take_damage(&mut self, damage: f32, attacker: Option<(String, String)>) {
        if !self.local.is_alive() || self.is_dead() {
            return;
        }
        let (health, dead) = CombatSystem::apply_damage(self.local.health, damage);
        self.local.health = health;
        self.events.push(UiEvent::HealthChanged { health });

        if dead {
            let (killer_id, killer_name) = match attacker {
                Some((id, name)) => (Some(id), Some(name)),
                None => (None, Some(ACTOR_NAME.to_string())),
            };
            self.die(killer_id, killer_name);
        }
    }

    fn die(&mut self, killer_id: Option<String>, killer_name: Option<String>) {
        info!(killer = ?killer_id, deaths = self.local.deaths + 1, "Local player died");
        self.local.health = 0.0;
        self.local.deaths += 1;
        self.respawn_timer = Some(self.config.respawn_secs);

        self.events.push(UiEvent::KillsDeathsChanged {
            kills: self.local.kills,
            deaths: self.local.deaths,
        });
        self.events.push(UiEvent::DeathScreenShown {
            respawn_secs: self.config.respawn_secs,
        });

        if let Some(killer) = killer_id.as_deref() {
            let local_id = self.local.id.clone();
            self.authority.on_kill(killer, &local_id, &mut self.events);
        }
        self.sync.send_death(killer_id, killer_name, &mut self.events);
        self.sync.force_snapshot();
    }

    /// Back to full health at a spawn point for the current mode and team
    pub fn respawn(&mut self) {
        let group = spawn_group(&self.authority, &self.local.id);
        let position = self.level.spawn_point(group);
        debug!(?position, ?group, "Respawning");

        let was_dead = self.respawn_timer.take().is_some();
        self.local.position = position;
        self.local.health = MAX_HEALTH;
        self.local.crouching = false;
        self.local.sliding = false;
        self.local.team = self.authority.local_team();
        self.locomotion.reset();
        self.ballistics.reset();
        self.trigger_was_held = false;

        if was_dead {
            self.events.push(UiEvent::DeathScreenHidden);
        }
        self.events.push(UiEvent::HealthChanged { health: MAX_HEALTH });
        self.emit_ammo();
        self.sync.force_snapshot();
    }

    fn emit_ammo(&mut self) {
        let weapon = self.ballistics.current();
        self.events.push(UiEvent::AmmoChanged {
            ammo: weapon.ammo,
            max_ammo: weapon.stats.max_ammo,
        });
    }

    fn emit_loadout(&mut self) {
        let kind: WeaponKind = self.ballistics.current_kind();
        self.events.push(UiEvent::WeaponSwitched {
            weapon: kind,
            slot: kind.slot(),
            name: kind.name(),
        });
        self.emit_ammo();
    }

    fn emit_score(&mut self) {
        self.events.push(UiEvent::ScoreChanged {
            score: self.local.score,
        });
        self.events.push(UiEvent::KillsDeathsChanged {
            kills: self.local.kills,
            deaths: self.local.deaths,
        });
    }

    fn emit_frame_state(&mut self, input: &FrameInput) {
        if let Some(first) = self.sync.remotes().first() {
            let health = Some(first.health);
            self.events.push(UiEvent::EnemyHealth { health });
        }

        if input.show_scoreboard {
            let rows = self.scoreboard();
            self.events.extend(rows.into_iter().map(UiEvent::ScoreboardRow));
        }
    }

    /// Local row first, then remotes by id
    pub fn scoreboard(&self) -> Vec<ScoreboardRow> {
        let row = |e: &Entity, is_local: bool| ScoreboardRow {
            id: e.id.clone(),
            name: e.name.clone(),
            score: e.score,
            kills: e.kills,
            deaths: e.deaths,
            ping_ms: e.ping_ms,
            is_local,
        };
        std::iter::once(row(&self.local, true))
            .chain(self.sync.remotes().into_iter().map(|e| row(e, false)))
            .collect()
    }
}

fn spawn_group(authority: &CombatAuthority, id: &str) -> SpawnGroup {
    match (authority.mode(), authority.team_of(id)) {
        (GameMode::TeamDeathmatch, Some(team)) => SpawnGroup::Team(team),
        _ => SpawnGroup::FreeForAll,
    }
}
