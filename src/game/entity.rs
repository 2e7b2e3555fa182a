//! Participant record shared by the local simulation and remote proxies

use glam::Vec3;

use super::combat::WeaponKind;
use super::r#match::Team;

/// Full health for every participant
pub const MAX_HEALTH: f32 = 100.0;

/// A participant in the session (local or remote)
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub name: String,

    // Camera-anchored position and view orientation
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,

    pub health: f32,
    pub weapon: WeaponKind,
    pub team: Option<Team>,

    // Posture
    pub crouching: bool,
    pub sliding: bool,
    pub zooming: bool,

    // Scoreboard
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,

    /// Wall-clock millis of the last live local frame or inbound snapshot
    pub last_update_ms: u64,
    /// One-way latency estimate from the last snapshot timestamp
    pub ping_ms: Option<u64>,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            yaw: 0.0,
            pitch: 0.0,
            health: MAX_HEALTH,
            weapon: WeaponKind::default(),
            team: None,
            crouching: false,
            sliding: false,
            zooming: false,
            score: 0,
            kills: 0,
            deaths: 0,
            last_update_ms: 0,
            ping_ms: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Unit view direction. Looks down -Z at zero yaw, matching the camera convention.
    pub fn view_direction(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }
}
