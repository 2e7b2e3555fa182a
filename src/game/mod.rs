//! Game simulation modules

pub mod actors;
pub mod collision;
pub mod combat;
pub mod entity;
pub mod events;
pub mod level;
pub mod r#match;
pub mod physics;
pub mod session;
pub mod snapshot;

pub use events::UiEvent;
pub use level::{ArenaLevel, LevelProvider};
pub use r#match::{CombatAuthority, GameMode, Team};
pub use session::Session;

/// Local input for a single frame.
///
/// Movement, sprint, crouch, trigger and zoom are held states. Jump, slide,
/// reload and the toggles are presses and should be set for one frame only.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
    pub crouch: bool,
    pub trigger: bool,
    pub zoom: bool,

    pub jump: bool,
    pub slide: bool,
    pub reload: bool,
    /// 1-based weapon slot
    pub switch_weapon: Option<u8>,
    pub switch_team: bool,
    pub toggle_mode: bool,

    /// View orientation in radians
    pub yaw: f32,
    pub pitch: f32,

    pub show_scoreboard: bool,
}
