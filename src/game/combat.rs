//! Combat system - weapons, projectiles, hit detection

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::time::LEGACY_TICK_RATE;

/// Weapon kinds, in slot order (slot 1 = assault rifle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    AssaultRifle,
    Shotgun,
    Smg,
    SniperRifle,
    Lmg,
}

impl Default for WeaponKind {
    fn default() -> Self {
        Self::AssaultRifle
    }
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 5] = [
        WeaponKind::AssaultRifle,
        WeaponKind::Shotgun,
        WeaponKind::Smg,
        WeaponKind::SniperRifle,
        WeaponKind::Lmg,
    ];

    /// Weapon in a 1-based slot
    pub fn from_slot(slot: u8) -> Option<Self> {
        Self::ALL.get(usize::from(slot).checked_sub(1)?).copied()
    }

    pub fn slot(self) -> u8 {
        self as u8 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            WeaponKind::AssaultRifle => "Assault Rifle",
            WeaponKind::Shotgun => "Shotgun",
            WeaponKind::Smg => "SMG",
            WeaponKind::SniperRifle => "Sniper Rifle",
            WeaponKind::Lmg => "LMG",
        }
    }
}

/// Weapon stats per kind
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    pub max_ammo: u32,
    /// Damage per projectile
    pub damage: f32,
    /// Minimum time between shots (ms)
    pub fire_rate_ms: u64,
    /// Reload duration (ms)
    pub reload_ms: u64,
    pub projectile_speed: f32,
    /// Per-axis direction jitter
    pub spread: f32,
    /// Projectiles per shot
    pub pellets: u32,
    /// Keeps firing while the trigger is held
    pub automatic: bool,
}

impl WeaponStats {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::AssaultRifle => Self {
                max_ammo: 30,
                damage: 25.0,
                fire_rate_ms: 100,
                reload_ms: 2000,
                projectile_speed: 60.0,
                spread: 0.02,
                pellets: 1,
                automatic: true,
            },
            WeaponKind::Shotgun => Self {
                max_ammo: 8,
                damage: 20.0,
                fire_rate_ms: 800,
                reload_ms: 3000,
                projectile_speed: 50.0,
                spread: 0.15,
                pellets: 8,
                automatic: false,
            },
            WeaponKind::Smg => Self {
                max_ammo: 25,
                damage: 18.0,
                fire_rate_ms: 80,
                reload_ms: 1500,
                projectile_speed: 55.0,
                spread: 0.04,
                pellets: 1,
                automatic: true,
            },
            WeaponKind::SniperRifle => Self {
                max_ammo: 5,
                damage: 80.0,
                fire_rate_ms: 1500,
                reload_ms: 3500,
                projectile_speed: 100.0,
                spread: 0.005,
                pellets: 1,
                automatic: false,
            },
            WeaponKind::Lmg => Self {
                max_ammo: 100,
                damage: 30.0,
                fire_rate_ms: 120,
                reload_ms: 4000,
                projectile_speed: 65.0,
                spread: 0.03,
                pellets: 1,
                automatic: true,
            },
        }
    }
}

/// Lifetime of locally fired projectiles, in legacy ticks
pub const LOCAL_PROJECTILE_LIFE: f32 = 100.0;
/// Lifetime of replayed remote projectiles, in legacy ticks
pub const REMOTE_PROJECTILE_LIFE: f32 = 120.0;
/// Pellets replayed for a remote multi-pellet shot
pub const REMOTE_PELLETS: u32 = 5;
/// Jitter applied to replayed remote pellets
pub const REMOTE_PELLET_SPREAD: f32 = 0.1;

/// What a projectile is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Another peer's participant
    Player,
    /// Shared environment actor
    Actor,
}

impl TargetKind {
    /// Proximity that counts as a hit, independent of weapon
    pub fn hit_radius(self) -> f32 {
        match self {
            TargetKind::Player => 1.0,
            TargetKind::Actor => 1.5,
        }
    }
}

/// Candidate for local hit detection
#[derive(Debug, Clone)]
pub struct HitTarget {
    pub id: String,
    pub position: Vec3,
    pub kind: TargetKind,
}

/// Per-slot firing and reload state
#[derive(Debug, Clone)]
pub struct WeaponState {
    pub kind: WeaponKind,
    pub stats: WeaponStats,
    pub ammo: u32,
    last_shot_ms: Option<u64>,
    reload_started_ms: Option<u64>,
}

impl WeaponState {
    pub fn new(kind: WeaponKind) -> Self {
        let stats = WeaponStats::for_kind(kind);
        Self {
            kind,
            stats,
            ammo: stats.max_ammo,
            last_shot_ms: None,
            reload_started_ms: None,
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_started_ms.is_some()
    }

    pub fn can_fire(&self, now_ms: u64) -> bool {
        !self.is_reloading()
            && self.ammo > 0
            && self
                .last_shot_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= self.stats.fire_rate_ms)
    }

    pub fn can_reload(&self) -> bool {
        !self.is_reloading() && self.ammo < self.stats.max_ammo
    }

    /// Consume one round. Returns false when the shot is refused.
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        if !self.can_fire(now_ms) {
            return false;
        }
        self.last_shot_ms = Some(now_ms);
        self.ammo -= 1;
        true
    }

    pub fn try_reload(&mut self, now_ms: u64) -> bool {
        if !self.can_reload() {
            return false;
        }
        self.reload_started_ms = Some(now_ms);
        true
    }

    /// Complete a reload whose duration has elapsed. Returns true on completion.
    pub fn update(&mut self, now_ms: u64) -> bool {
        match self.reload_started_ms {
            Some(start) if now_ms.saturating_sub(start) >= self.stats.reload_ms => {
                self.ammo = self.stats.max_ammo;
                self.reload_started_ms = None;
                true
            }
            _ => false,
        }
    }
}

/// In-flight shot
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: Uuid,
    pub owner_id: String,
    pub weapon: WeaponKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: f32,
    /// Remaining lifetime in legacy ticks
    pub life: f32,
    /// Announced by the remote peer; visual only, never scored here
    pub remote: bool,
}

impl Projectile {
    /// Move by `velocity * dt`, returns false if expired
    pub fn update(&mut self, dt: f32) -> bool {
        self.position += self.velocity * dt;
        self.life -= dt * LEGACY_TICK_RATE;
        self.life > 0.0
    }
}

/// Hit result from local hit detection
#[derive(Debug, Clone)]
pub struct HitResult {
    pub projectile_id: Uuid,
    pub shooter_id: String,
    pub target_id: String,
    pub target_kind: TargetKind,
    pub damage: f32,
    pub position: Vec3,
}

/// Perturb `direction` independently per axis by up to `spread / 2`, then renormalize
fn jitter(rng: &mut ChaCha8Rng, direction: Vec3, spread: f32) -> Vec3 {
    if spread <= 0.0 {
        return direction.normalize_or_zero();
    }
    let offset = Vec3::new(
        (rng.gen::<f32>() - 0.5) * spread,
        (rng.gen::<f32>() - 0.5) * spread,
        (rng.gen::<f32>() - 0.5) * spread,
    );
    (direction + offset).normalize_or_zero()
}

/// Weapon slots and live projectiles for one participant
pub struct Ballistics {
    owner_id: String,
    slots: Vec<WeaponState>,
    current: usize,
    projectiles: Vec<Projectile>,
    rng: ChaCha8Rng,
}

impl Ballistics {
    pub fn new(owner_id: impl Into<String>, seed: u64) -> Self {
        Self {
            owner_id: owner_id.into(),
            slots: WeaponKind::ALL.iter().map(|k| WeaponState::new(*k)).collect(),
            current: 0,
            projectiles: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn current(&self) -> &WeaponState {
        &self.slots[self.current]
    }

    pub fn current_kind(&self) -> WeaponKind {
        self.slots[self.current].kind
    }

    pub fn weapon(&self, kind: WeaponKind) -> &WeaponState {
        &self.slots[kind as usize]
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Select a 1-based slot. No-op for unknown or already selected slots.
    pub fn switch_weapon(&mut self, slot: u8) -> bool {
        match WeaponKind::from_slot(slot) {
            Some(kind) if kind as usize != self.current => {
                self.current = kind as usize;
                true
            }
            _ => false,
        }
    }

    /// Fire the current weapon from `origin` toward `direction`.
    /// Returns the spawned projectiles, empty when the shot is refused.
    pub fn fire(&mut self, now_ms: u64, origin: Vec3, direction: Vec3) -> Vec<Projectile> {
        let weapon = &mut self.slots[self.current];
        if !weapon.try_fire(now_ms) {
            return Vec::new();
        }

        let kind = weapon.kind;
        let stats = weapon.stats;
        let spawned: Vec<Projectile> = (0..stats.pellets)
            .map(|_| Projectile {
                id: Uuid::new_v4(),
                owner_id: self.owner_id.clone(),
                weapon: kind,
                position: origin,
                velocity: jitter(&mut self.rng, direction, stats.spread) * stats.projectile_speed,
                damage: stats.damage,
                life: LOCAL_PROJECTILE_LIFE,
                remote: false,
            })
            .collect();

        self.projectiles.extend(spawned.iter().cloned());
        spawned
    }

    /// Start reloading the current weapon. Returns whether a reload started.
    pub fn reload(&mut self, now_ms: u64) -> bool {
        self.slots[self.current].try_reload(now_ms)
    }

    /// Complete elapsed reloads on every slot.
    /// Returns the kinds whose reload finished this tick.
    pub fn update(&mut self, now_ms: u64) -> Vec<WeaponKind> {
        self.slots
            .iter_mut()
            .filter_map(|w| w.update(now_ms).then_some(w.kind))
            .collect()
    }

    /// Replay a shot announced by the remote peer, visual only
    pub fn spawn_remote(
        &mut self,
        owner_id: &str,
        kind: WeaponKind,
        origin: Vec3,
        direction: Vec3,
    ) -> usize {
        let stats = WeaponStats::for_kind(kind);
        let (count, spread) = if stats.pellets > 1 {
            (REMOTE_PELLETS, REMOTE_PELLET_SPREAD)
        } else {
            (1, 0.0)
        };

        for _ in 0..count {
            let velocity = jitter(&mut self.rng, direction, spread) * stats.projectile_speed;
            self.projectiles.push(Projectile {
                id: Uuid::new_v4(),
                owner_id: owner_id.to_string(),
                weapon: kind,
                position: origin,
                velocity,
                damage: stats.damage,
                life: REMOTE_PROJECTILE_LIFE,
                remote: true,
            });
        }
        count as usize
    }

    /// Move every projectile and drop the expired ones
    pub fn advance(&mut self, dt: f32) {
        self.projectiles.retain_mut(|p| p.update(dt));
    }

    /// Test locally owned projectiles against `targets`.
    /// Each projectile scores at most one hit and is consumed by it.
    pub fn test_hits(&mut self, targets: &[HitTarget]) -> Vec<HitResult> {
        if targets.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        let owner_id = &self.owner_id;

        self.projectiles.retain(|projectile| {
            if projectile.remote || projectile.owner_id != *owner_id {
                return true;
            }

            let target = targets.iter().find(|t| {
                t.id != *owner_id
                    && projectile.position.distance(t.position) < t.kind.hit_radius()
            });

            match target {
                Some(target) => {
                    hits.push(HitResult {
                        projectile_id: projectile.id,
                        shooter_id: projectile.owner_id.clone(),
                        target_id: target.id.clone(),
                        target_kind: target.kind,
                        damage: projectile.damage,
                        position: projectile.position,
                    });
                    false
                }
                None => true,
            }
        });

        hits
    }

    /// Drop all projectiles and restore every slot, used on respawn
    pub fn reset(&mut self) {
        self.projectiles.clear();
        for slot in &mut self.slots {
            *slot = WeaponState::new(slot.kind);
        }
    }
}

/// Combat helpers
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }
}
