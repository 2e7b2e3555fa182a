//! Match rules: game mode, teams, scores, timer and end-of-match cooldown

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::config::SessionConfig;

use super::events::UiEvent;

/// Game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "ffa")]
    FreeForAll,
    #[serde(rename = "tdm")]
    TeamDeathmatch,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::FreeForAll => "ffa",
            GameMode::TeamDeathmatch => "tdm",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            GameMode::FreeForAll => GameMode::TeamDeathmatch,
            GameMode::TeamDeathmatch => GameMode::FreeForAll,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ffa" => Ok(GameMode::FreeForAll),
            "tdm" => Ok(GameMode::TeamDeathmatch),
            other => Err(format!("unknown game mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn other(self) -> Self {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Team::Red => "Red Team",
            Team::Blue => "Blue Team",
        }
    }
}

/// How a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Winner(Team),
    Draw,
    /// Free-for-all timer expiry
    TimeUp,
}

impl MatchOutcome {
    pub fn message(&self) -> String {
        match self {
            MatchOutcome::Winner(team) => format!("{} wins!", team.display_name()),
            MatchOutcome::Draw => "Game ended in a draw!".to_string(),
            MatchOutcome::TimeUp => "Time's up!".to_string(),
        }
    }
}

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchPhase {
    InProgress,
    /// Ended, waiting out the cooldown before a reset
    Ended { cooldown_remaining: f32 },
}

#[derive(Debug, Default)]
struct TeamRoster {
    score: u32,
    members: HashSet<String>,
}

/// Authority over damage permission, kill attribution and match end
#[derive(Debug)]
pub struct CombatAuthority {
    local_id: String,
    mode: GameMode,
    phase: MatchPhase,
    elapsed: f32,
    time_limit: f32,
    score_limit: u32,
    cooldown: f32,
    red: TeamRoster,
    blue: TeamRoster,
    outcome: Option<MatchOutcome>,
}

impl CombatAuthority {
    pub fn new(local_id: impl Into<String>, config: &SessionConfig) -> Self {
        let mut authority = Self {
            local_id: local_id.into(),
            mode: config.mode,
            phase: MatchPhase::InProgress,
            elapsed: 0.0,
            time_limit: config.time_limit_secs,
            score_limit: config.score_limit,
            cooldown: config.match_cooldown_secs,
            red: TeamRoster::default(),
            blue: TeamRoster::default(),
            outcome: None,
        };
        if authority.mode == GameMode::TeamDeathmatch {
            authority.assign_local_team();
        }
        authority
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == MatchPhase::InProgress
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn remaining_secs(&self) -> f32 {
        (self.time_limit - self.elapsed).max(0.0)
    }

    /// (red, blue)
    pub fn team_scores(&self) -> (u32, u32) {
        (self.red.score, self.blue.score)
    }

    pub fn team_of(&self, id: &str) -> Option<Team> {
        if self.red.members.contains(id) {
            Some(Team::Red)
        } else if self.blue.members.contains(id) {
            Some(Team::Blue)
        } else {
            None
        }
    }

    pub fn local_team(&self) -> Option<Team> {
        self.team_of(&self.local_id)
    }

    fn roster_mut(&mut self, team: Team) -> &mut TeamRoster {
        match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        }
    }

    /// Record a participant's team. Membership sets stay disjoint.
    pub fn register_member(&mut self, id: &str, team: Option<Team>) {
        if self.team_of(id) == team {
            return;
        }
        self.remove_member(id);
        if let Some(team) = team {
            self.roster_mut(team).members.insert(id.to_string());
        }
    }

    pub fn remove_member(&mut self, id: &str) {
        self.red.members.remove(id);
        self.blue.members.remove(id);
    }

    /// Unassigned participants are always fair game in team mode
    pub fn can_damage(&self, attacker_id: &str, target_id: &str) -> bool {
        match self.mode {
            GameMode::FreeForAll => true,
            GameMode::TeamDeathmatch => {
                match (self.team_of(attacker_id), self.team_of(target_id)) {
                    (Some(a), Some(t)) => a != t,
                    _ => true,
                }
            }
        }
    }

    /// Attribute a kill. Only team mode keeps score here.
    pub fn on_kill(&mut self, killer_id: &str, victim_id: &str, events: &mut Vec<UiEvent>) {
        if !self.is_active() || self.mode != GameMode::TeamDeathmatch {
            return;
        }
        let Some(team) = self.team_of(killer_id) else {
            return;
        };

        let score_limit = self.score_limit;
        let roster = self.roster_mut(team);
        roster.score += 1;
        let score = roster.score;

        info!(killer = %killer_id, victim = %victim_id, ?team, score, "Team kill scored");
        events.push(UiEvent::TeamScoresChanged {
            red: self.red.score,
            blue: self.blue.score,
        });

        if score >= score_limit {
            self.end_match(MatchOutcome::Winner(team), events);
        }
    }

    /// Freeze the match and start the reset cooldown
    pub fn end_match(&mut self, outcome: MatchOutcome, events: &mut Vec<UiEvent>) {
        if !self.is_active() {
            return;
        }
        info!(?outcome, elapsed = self.elapsed, "Match ended");
        self.outcome = Some(outcome);
        self.phase = MatchPhase::Ended {
            cooldown_remaining: self.cooldown,
        };
        events.push(UiEvent::MatchEnded {
            message: outcome.message(),
        });
    }

    /// Advance the timer. Returns true when the match was reset and the
    /// local entity should respawn.
    pub fn update(&mut self, dt: f32, events: &mut Vec<UiEvent>) -> bool {
        match self.phase {
            MatchPhase::Ended { cooldown_remaining } => {
                let remaining = cooldown_remaining - dt;
                if remaining <= 0.0 {
                    self.reset(events);
                    return true;
                }
                self.phase = MatchPhase::Ended {
                    cooldown_remaining: remaining,
                };
                false
            }
            MatchPhase::InProgress => {
                self.elapsed += dt;
                if self.elapsed >= self.time_limit {
                    let outcome = self.time_limit_outcome();
                    self.end_match(outcome, events);
                }
                events.push(UiEvent::TimerChanged {
                    remaining_secs: self.remaining_secs(),
                });
                false
            }
        }
    }

    fn time_limit_outcome(&self) -> MatchOutcome {
        match self.mode {
            GameMode::FreeForAll => MatchOutcome::TimeUp,
            GameMode::TeamDeathmatch => {
                if self.red.score > self.blue.score {
                    MatchOutcome::Winner(Team::Red)
                } else if self.blue.score > self.red.score {
                    MatchOutcome::Winner(Team::Blue)
                } else {
                    MatchOutcome::Draw
                }
            }
        }
    }

    /// Full reset: timer, scores and team assignment. Remote members are
    /// kept so the local assignment can balance against them.
    pub fn reset(&mut self, events: &mut Vec<UiEvent>) {
        self.elapsed = 0.0;
        self.phase = MatchPhase::InProgress;
        self.outcome = None;
        self.red.score = 0;
        self.blue.score = 0;

        let local_id = self.local_id.clone();
        self.remove_member(&local_id);

        if self.mode == GameMode::TeamDeathmatch {
            let team = self.assign_local_team();
            events.push(UiEvent::TeamChanged { team });
            events.push(UiEvent::TeamScoresChanged { red: 0, blue: 0 });
        }

        info!(mode = %self.mode, team = ?self.local_team(), "Match reset");
        events.push(UiEvent::MatchModeChanged { mode: self.mode });
    }

    fn assign_local_team(&mut self) -> Team {
        let team = if self.red.members.len() <= self.blue.members.len() {
            Team::Red
        } else {
            Team::Blue
        };
        let local_id = self.local_id.clone();
        self.register_member(&local_id, Some(team));
        team
    }

    pub fn set_mode(&mut self, mode: GameMode, events: &mut Vec<UiEvent>) {
        self.mode = mode;
        self.reset(events);
    }

    pub fn toggle_mode(&mut self, events: &mut Vec<UiEvent>) -> GameMode {
        self.set_mode(self.mode.toggled(), events);
        self.mode
    }

    /// Move the local participant to the other team. Team mode only.
    pub fn switch_team(&mut self, events: &mut Vec<UiEvent>) -> bool {
        if self.mode != GameMode::TeamDeathmatch {
            return false;
        }
        let team = self.local_team().map(Team::other).unwrap_or(Team::Red);
        let local_id = self.local_id.clone();
        self.register_member(&local_id, Some(team));
        events.push(UiEvent::TeamChanged { team });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority(mode: GameMode) -> CombatAuthority {
        let config = SessionConfig {
            mode,
            score_limit: 50,
            time_limit_secs: 600.0,
            match_cooldown_secs: 10.0,
            ..SessionConfig::default()
        };
        CombatAuthority::new("local", &config)
    }

    #[test]
    fn free_for_all_always_permits_damage() {
        let a = authority(GameMode::FreeForAll);
        assert!(a.can_damage("local", "remote"));
        assert!(a.can_damage("remote", "local"));
        assert!(a.can_damage("x", "y"));
        assert_eq!(a.local_team(), None);
    }

    #[test]
    fn team_mode_blocks_only_same_team() {
        let mut a = authority(GameMode::TeamDeathmatch);
        assert_eq!(a.local_team(), Some(Team::Red));

        a.register_member("mate", Some(Team::Red));
        a.register_member("enemy", Some(Team::Blue));

        assert!(!a.can_damage("local", "mate"));
        assert!(!a.can_damage("mate", "local"));
        assert!(a.can_damage("local", "enemy"));
        assert!(a.can_damage("enemy", "local"));
        // Unassigned actors are permissive both ways
        assert!(a.can_damage("local", "actor_1"));
        assert!(a.can_damage("actor_1", "local"));
        assert!(a.can_damage("actor_1", "actor_2"));
    }

    #[test]
    fn membership_stays_disjoint() {
        let mut a = authority(GameMode::TeamDeathmatch);
        a.register_member("p", Some(Team::Red));
        a.register_member("p", Some(Team::Blue));
        assert_eq!(a.team_of("p"), Some(Team::Blue));
        assert!(!a.red.members.contains("p"));

        a.register_member("p", None);
        assert_eq!(a.team_of("p"), None);
    }

    #[test]
    fn reaching_score_limit_ends_and_resets_after_cooldown() {
        let mut a = authority(GameMode::TeamDeathmatch);
        a.register_member("remote", Some(Team::Blue));
        let mut events = Vec::new();

        for _ in 0..49 {
            a.on_kill("local", "remote", &mut events);
        }
        assert!(a.is_active());

        a.on_kill("local", "remote", &mut events);
        assert_eq!(a.team_scores(), (50, 0));
        assert_eq!(a.outcome(), Some(MatchOutcome::Winner(Team::Red)));
        assert!(!a.is_active());
        assert!(events.contains(&UiEvent::MatchEnded {
            message: "Red Team wins!".to_string()
        }));

        // Frozen while ended
        a.on_kill("local", "remote", &mut events);
        assert_eq!(a.team_scores(), (50, 0));

        assert!(!a.update(5.0, &mut events));
        assert!(!a.is_active());
        assert!(a.update(5.0, &mut events));

        assert!(a.is_active());
        assert_eq!(a.team_scores(), (0, 0));
        assert_eq!(a.outcome(), None);
        assert_eq!(a.remaining_secs(), 600.0);
        // Remote is still blue, so local lands on red
        assert_eq!(a.local_team(), Some(Team::Red));
    }

    #[test]
    fn free_for_all_kills_do_not_touch_team_scores() {
        let mut a = authority(GameMode::FreeForAll);
        let mut events = Vec::new();
        a.on_kill("local", "remote", &mut events);
        assert_eq!(a.team_scores(), (0, 0));
        assert!(events.is_empty());
    }

    #[test]
    fn time_limit_outcomes() {
        let mut events = Vec::new();

        let mut ffa = authority(GameMode::FreeForAll);
        ffa.update(600.0, &mut events);
        assert_eq!(ffa.outcome(), Some(MatchOutcome::TimeUp));

        let mut tdm = authority(GameMode::TeamDeathmatch);
        tdm.update(600.0, &mut events);
        assert_eq!(tdm.outcome(), Some(MatchOutcome::Draw));

        let mut tdm = authority(GameMode::TeamDeathmatch);
        tdm.register_member("remote", Some(Team::Blue));
        tdm.on_kill("remote", "local", &mut events);
        tdm.update(601.0, &mut events);
        assert_eq!(tdm.outcome(), Some(MatchOutcome::Winner(Team::Blue)));
    }

    #[test]
    fn reset_balances_against_known_members() {
        let mut a = authority(GameMode::TeamDeathmatch);
        a.register_member("remote", Some(Team::Red));
        let mut events = Vec::new();
        a.reset(&mut events);
        assert_eq!(a.local_team(), Some(Team::Blue));
        assert!(events.contains(&UiEvent::TeamChanged { team: Team::Blue }));
    }

    #[test]
    fn switch_team_only_in_team_mode() {
        let mut events = Vec::new();
        let mut ffa = authority(GameMode::FreeForAll);
        assert!(!ffa.switch_team(&mut events));

        let mut tdm = authority(GameMode::TeamDeathmatch);
        assert!(tdm.switch_team(&mut events));
        assert_eq!(tdm.local_team(), Some(Team::Blue));
        assert!(tdm.switch_team(&mut events));
        assert_eq!(tdm.local_team(), Some(Team::Red));
    }

    #[test]
    fn toggle_mode_resets_the_match() {
        let mut a = authority(GameMode::FreeForAll);
        let mut events = Vec::new();
        a.update(100.0, &mut events);
        assert_eq!(a.toggle_mode(&mut events), GameMode::TeamDeathmatch);
        assert_eq!(a.remaining_secs(), 600.0);
        assert_eq!(a.local_team(), Some(Team::Red));

        assert_eq!(a.toggle_mode(&mut events), GameMode::FreeForAll);
        assert_eq!(a.local_team(), None);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("ffa".parse::<GameMode>().unwrap(), GameMode::FreeForAll);
        assert_eq!("TDM".parse::<GameMode>().unwrap(), GameMode::TeamDeathmatch);
        assert!("ctf".parse::<GameMode>().is_err());
    }
}
