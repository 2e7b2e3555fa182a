//! Peer synchronization: snapshots out, remote proxies and combat events in

use glam::Vec3;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::game::combat::WeaponKind;
use crate::game::entity::Entity;
use crate::game::events::UiEvent;
use crate::game::r#match::Team;
use crate::game::snapshot::{SnapshotBuilder, SnapshotStats};
use crate::util::time::unix_millis;

use super::protocol::{ActorState, EntitySnapshot, Envelope, PeerMsg};
use super::transport::{LinkEvent, Transport};

/// How many recent event sequence numbers are remembered per sender
pub const SEEN_WINDOW: usize = 1024;

const FEED_MS: u64 = 2000;
const KILL_CREDIT_FEED_MS: u64 = 3000;
const UNNAMED: &str = "Player";

/// Bounded memory of applied sequence numbers
#[derive(Debug, Default)]
struct SeqWindow {
    recent: VecDeque<u64>,
    /// Anything below this has aged out and is rejected
    floor: u64,
}

impl SeqWindow {
    /// Returns false if `seq` was already applied or is too old to tell
    fn accept(&mut self, seq: u64) -> bool {
        if seq < self.floor || self.recent.contains(&seq) {
            return false;
        }
        self.recent.push_back(seq);
        if self.recent.len() > SEEN_WINDOW {
            if let Some(oldest) = self.recent.pop_front() {
                self.floor = self.floor.max(oldest + 1);
            }
        }
        true
    }
}

#[derive(Debug, Default)]
struct SenderTrack {
    events: SeqWindow,
    last_state_seq: Option<u64>,
}

/// What the simulation must do in response to inbound traffic
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEffect {
    /// The remote's hit test scored on the local entity
    Damage {
        attacker_id: String,
        attacker_name: String,
        damage: f32,
    },
    /// The remote died to the local entity
    KillCredited { victim_id: String, victim_name: String },
    /// Replay a remote shot, visual only
    RemoteShot {
        owner_id: String,
        weapon: WeaponKind,
        origin: Vec3,
        direction: Vec3,
    },
    WorldSync(Vec<ActorState>),
    RemoteTeam { id: String, team: Option<Team> },
    Departed { id: String },
}

/// Link state, remote proxies and at-most-once bookkeeping for one peer link
pub struct PeerSync {
    local_id: String,
    local_name: String,
    relay: bool,
    transport: Option<Box<dyn Transport>>,
    next_seq: u64,
    remotes: HashMap<String, Entity>,
    tracks: HashMap<String, SenderTrack>,
    snapshots: SnapshotBuilder,
    stats: SnapshotStats,
    world_sync_interval_ms: u64,
    last_world_sync_ms: Option<u64>,
    /// Effects produced outside `handle`, e.g. a failed send
    pending: Vec<SyncEffect>,
}

impl PeerSync {
    pub fn new(local_id: impl Into<String>, config: &SessionConfig) -> Self {
        Self {
            local_id: local_id.into(),
            local_name: config.player_name.clone(),
            relay: config.relay,
            transport: None,
            next_seq: 0,
            remotes: HashMap::new(),
            tracks: HashMap::new(),
            snapshots: SnapshotBuilder::new(config.snapshot_interval_ms),
            stats: SnapshotStats::default(),
            world_sync_interval_ms: config.world_sync_interval_ms,
            last_world_sync_ms: None,
            pending: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_relay(&self) -> bool {
        self.relay
    }

    pub fn remote(&self, id: &str) -> Option<&Entity> {
        self.remotes.get(id)
    }

    /// Remote proxies, ordered by id for stable presentation
    pub fn remotes(&self) -> Vec<&Entity> {
        let mut remotes: Vec<&Entity> = self.remotes.values().collect();
        remotes.sort_by(|a, b| a.id.cmp(&b.id));
        remotes
    }

    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }

    pub fn force_snapshot(&mut self) {
        self.snapshots.force_next();
    }

    pub fn take_pending(&mut self) -> Vec<SyncEffect> {
        std::mem::take(&mut self.pending)
    }

    /// Apply one link event
    pub fn handle(&mut self, event: LinkEvent, events: &mut Vec<UiEvent>) -> Vec<SyncEffect> {
        match event {
            LinkEvent::Open(transport) => {
                if self.transport.is_some() {
                    warn!("Replacing an open peer link");
                }
                info!(local_id = %self.local_id, relay = self.relay, "Peer link open");
                self.transport = Some(transport);
                self.snapshots.force_next();
                self.last_world_sync_ms = None;
                Vec::new()
            }
            LinkEvent::Close => self.disconnect(events),
            LinkEvent::Data(frame) => match Envelope::decode(&frame) {
                Ok(envelope) => self.receive(envelope, events),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed peer frame");
                    Vec::new()
                }
            },
        }
    }

    fn disconnect(&mut self, events: &mut Vec<UiEvent>) -> Vec<SyncEffect> {
        self.transport = None;
        self.tracks.clear();

        let mut departed: Vec<Entity> = self.remotes.drain().map(|(_, e)| e).collect();
        departed.sort_by(|a, b| a.id.cmp(&b.id));

        info!(departed = departed.len(), "Peer link closed");
        departed
            .into_iter()
            .map(|entity| {
                events.push(UiEvent::kill_feed(
                    format!("{} left the game", entity.name),
                    FEED_MS,
                ));
                SyncEffect::Departed { id: entity.id }
            })
            .collect()
    }

    fn receive(&mut self, envelope: Envelope, events: &mut Vec<UiEvent>) -> Vec<SyncEffect> {
        let Envelope {
            seq,
            sender_id,
            sender_name,
            timestamp,
            msg,
        } = envelope;

        if sender_id == self.local_id {
            debug!(seq, "Ignoring echo of own frame");
            return Vec::new();
        }

        let track = self.tracks.entry(sender_id.clone()).or_default();

        if let PeerMsg::State(snapshot) = msg {
            if track.last_state_seq.is_some_and(|last| seq <= last) {
                debug!(peer_id = %sender_id, seq, "Dropping stale snapshot");
                return Vec::new();
            }
            track.last_state_seq = Some(seq);
            return self.apply_snapshot(sender_id, sender_name, timestamp, snapshot, events);
        }

        if !track.events.accept(seq) {
            debug!(peer_id = %sender_id, seq, kind = msg.kind(), "Dropping duplicate event");
            return Vec::new();
        }

        let sender_name = self.display_name(&sender_id, sender_name);

        match msg {
            PeerMsg::State(_) => Vec::new(),
            PeerMsg::Shoot {
                weapon,
                origin,
                direction,
            } => vec![SyncEffect::RemoteShot {
                owner_id: sender_id,
                weapon,
                origin,
                direction,
            }],
            PeerMsg::Hit { target_id, damage } => {
                if target_id != self.local_id {
                    warn!(peer_id = %sender_id, target_id = %target_id, "Hit for unknown entity");
                    return Vec::new();
                }
                debug!(peer_id = %sender_id, damage, "Hit received");
                events.push(UiEvent::kill_feed(
                    format!("Hit by {sender_name} for {damage} damage!"),
                    FEED_MS,
                ));
                vec![SyncEffect::Damage {
                    attacker_id: sender_id,
                    attacker_name: sender_name,
                    damage,
                }]
            }
            PeerMsg::Death {
                killer_id,
                killer_name,
            } => {
                if let Some(remote) = self.remotes.get_mut(&sender_id) {
                    remote.health = 0.0;
                }

                if killer_id.as_deref() == Some(self.local_id.as_str()) {
                    info!(victim = %sender_id, "Kill credited");
                    events.push(UiEvent::kill_feed(
                        format!("You eliminated {sender_name}! +500 points"),
                        KILL_CREDIT_FEED_MS,
                    ));
                    return vec![SyncEffect::KillCredited {
                        victim_id: sender_id,
                        victim_name: sender_name,
                    }];
                }

                let message = match killer_name {
                    Some(killer) => format!("{killer} eliminated {sender_name}"),
                    None => format!("{sender_name} died"),
                };
                events.push(UiEvent::kill_feed(message, FEED_MS));
                Vec::new()
            }
            PeerMsg::WorldSync { actors } => {
                if self.relay {
                    debug!(peer_id = %sender_id, "Ignoring world sync on relay");
                    return Vec::new();
                }
                vec![SyncEffect::WorldSync(actors)]
            }
        }
    }

    fn display_name(&self, sender_id: &str, sender_name: String) -> String {
        if !sender_name.is_empty() {
            return sender_name;
        }
        self.remotes
            .get(sender_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| UNNAMED.to_string())
    }

    fn apply_snapshot(
        &mut self,
        sender_id: String,
        sender_name: String,
        timestamp: u64,
        snapshot: EntitySnapshot,
        events: &mut Vec<UiEvent>,
    ) -> Vec<SyncEffect> {
        let now = unix_millis();
        let mut effects = Vec::new();

        if !self.remotes.contains_key(&sender_id) {
            let name = if sender_name.is_empty() {
                UNNAMED.to_string()
            } else {
                sender_name.clone()
            };
            info!(peer_id = %sender_id, name = %name, "Remote player joined");
            events.push(UiEvent::kill_feed(format!("{name} joined the game!"), FEED_MS));
            effects.push(SyncEffect::RemoteTeam {
                id: sender_id.clone(),
                team: snapshot.team,
            });
            let entity = Entity::new(sender_id.clone(), name, snapshot.position);
            self.remotes.insert(sender_id.clone(), entity);
        }

        let Some(remote) = self.remotes.get_mut(&sender_id) else {
            return effects;
        };

        if effects.is_empty() && remote.team != snapshot.team {
            effects.push(SyncEffect::RemoteTeam {
                id: sender_id.clone(),
                team: snapshot.team,
            });
        }

        if !sender_name.is_empty() {
            remote.name = sender_name;
        }
        remote.position = snapshot.position;
        remote.yaw = snapshot.yaw;
        remote.pitch = snapshot.pitch;
        remote.health = snapshot.health;
        remote.weapon = snapshot.weapon;
        remote.crouching = snapshot.crouching;
        remote.sliding = snapshot.sliding;
        remote.zooming = snapshot.zooming;
        remote.score = snapshot.score;
        remote.kills = snapshot.kills;
        remote.deaths = snapshot.deaths;
        remote.team = snapshot.team;
        remote.last_update_ms = now;
        if timestamp > 0 {
            remote.ping_ms = Some(now.saturating_sub(timestamp));
        }

        effects
    }

    fn send(&mut self, msg: PeerMsg, events: &mut Vec<UiEvent>) -> Option<usize> {
        let transport = self.transport.as_mut()?;

        let envelope = Envelope {
            seq: self.next_seq,
            sender_id: self.local_id.clone(),
            sender_name: self.local_name.clone(),
            timestamp: unix_millis(),
            msg,
        };
        self.next_seq += 1;

        let frame = match envelope.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, kind = envelope.msg.kind(), "Failed to encode peer message");
                return None;
            }
        };
        let bytes = frame.len();

        match transport.send(frame) {
            Ok(()) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Peer send failed, dropping link");
                let departed = self.disconnect(events);
                self.pending.extend(departed);
                None
            }
        }
    }

    /// Ship a snapshot of the local entity if the throttle allows
    pub fn send_snapshot(
        &mut self,
        now_ms: u64,
        local: &Entity,
        events: &mut Vec<UiEvent>,
    ) -> bool {
        if !self.is_connected() || !self.snapshots.should_send(now_ms) {
            return false;
        }
        let snapshot = self.snapshots.build(local);
        match self.send(PeerMsg::State(snapshot), events) {
            Some(bytes) => {
                self.stats.record(bytes);
                true
            }
            None => false,
        }
    }

    pub fn send_shoot(
        &mut self,
        weapon: WeaponKind,
        origin: Vec3,
        direction: Vec3,
        events: &mut Vec<UiEvent>,
    ) -> bool {
        let msg = PeerMsg::Shoot {
            weapon,
            origin,
            direction,
        };
        self.send(msg, events).is_some()
    }

    pub fn send_hit(&mut self, target_id: &str, damage: f32, events: &mut Vec<UiEvent>) -> bool {
        let msg = PeerMsg::Hit {
            target_id: target_id.to_string(),
            damage,
        };
        self.send(msg, events).is_some()
    }

    pub fn send_death(
        &mut self,
        killer_id: Option<String>,
        killer_name: Option<String>,
        events: &mut Vec<UiEvent>,
    ) -> bool {
        let msg = PeerMsg::Death {
            killer_id,
            killer_name,
        };
        self.send(msg, events).is_some()
    }

    /// Whether the relay should push world sync now. Marks the send time.
    pub fn world_sync_due(&mut self, now_ms: u64) -> bool {
        if !self.relay || !self.is_connected() {
            return false;
        }
        let due = self
            .last_world_sync_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.world_sync_interval_ms);
        if due {
            self.last_world_sync_ms = Some(now_ms);
        }
        due
    }

    pub fn send_world_sync(&mut self, actors: Vec<ActorState>, events: &mut Vec<UiEvent>) -> bool {
        self.send(PeerMsg::WorldSync { actors }, events).is_some()
    }
}
