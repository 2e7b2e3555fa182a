//! Notifications for the presentation layer (fire-and-forget)

use serde::Serialize;

use super::combat::WeaponKind;
use super::r#match::{GameMode, Team};

/// One row of the scoreboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreboardRow {
    pub id: String,
    pub name: String,
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub ping_ms: Option<u64>,
    pub is_local: bool,
}

/// Presentation event emitted by the simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    HealthChanged { health: f32 },
    ScoreChanged { score: u32 },
    KillsDeathsChanged { kills: u32, deaths: u32 },
    AmmoChanged { ammo: u32, max_ammo: u32 },
    WeaponSwitched { weapon: WeaponKind, slot: u8, name: &'static str },
    ReloadStarted { duration_ms: u64 },
    HitMarker,
    KillFeed { message: String, duration_ms: u64 },
    DeathScreenShown { respawn_secs: f32 },
    RespawnCountdown { secs: f32 },
    DeathScreenHidden,
    /// Health of the first remote participant, `None` hides the bar
    EnemyHealth { health: Option<f32> },
    ScoreboardRow(ScoreboardRow),
    MatchModeChanged { mode: GameMode },
    TeamChanged { team: Team },
    TimerChanged { remaining_secs: f32 },
    TeamScoresChanged { red: u32, blue: u32 },
    MatchEnded { message: String },
}

impl UiEvent {
    pub fn kill_feed(message: impl Into<String>, duration_ms: u64) -> Self {
        UiEvent::KillFeed {
            message: message.into(),
            duration_ms,
        }
    }

    /// Events that fire every frame and would flood a log
    pub fn is_periodic(&self) -> bool {
        matches!(
            self,
            UiEvent::TimerChanged { .. }
                | UiEvent::RespawnCountdown { .. }
                | UiEvent::EnemyHealth { .. }
                | UiEvent::ScoreboardRow(_)
        )
    }
}
