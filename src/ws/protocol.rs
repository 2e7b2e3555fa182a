//! Peer protocol message definitions
//! These are the wire types exchanged between the two peers

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::combat::WeaponKind;
use crate::game::r#match::Team;

/// Every frame on the link is one envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number, strictly increasing
    pub seq: u64,
    /// Sender's entity id
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    /// Sender wall-clock millis
    #[serde(default)]
    pub timestamp: u64,
    #[serde(flatten)]
    pub msg: PeerMsg,
}

/// Messages exchanged between peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMsg {
    /// Full-state overwrite of the sender's entity
    State(EntitySnapshot),

    /// Sender fired; replay for visuals only
    Shoot {
        weapon: WeaponKind,
        origin: Vec3,
        direction: Vec3,
    },

    /// Sender's hit test scored on the receiver's entity
    Hit { target_id: String, damage: f32 },

    /// Sender's entity died
    Death {
        #[serde(default)]
        killer_id: Option<String>,
        #[serde(default)]
        killer_name: Option<String>,
    },

    /// Shared environment actors, relay only
    WorldSync { actors: Vec<ActorState> },
}

impl PeerMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMsg::State(_) => "state",
            PeerMsg::Shoot { .. } => "shoot",
            PeerMsg::Hit { .. } => "hit",
            PeerMsg::Death { .. } => "death",
            PeerMsg::WorldSync { .. } => "world_sync",
        }
    }
}

/// Entity state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySnapshot {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub health: f32,
    pub weapon: WeaponKind,
    pub crouching: bool,
    pub sliding: bool,
    pub zooming: bool,
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub team: Option<Team>,
}

impl Default for EntitySnapshot {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            health: crate::game::entity::MAX_HEALTH,
            weapon: WeaponKind::default(),
            crouching: false,
            sliding: false,
            zooming: false,
            score: 0,
            kills: 0,
            deaths: 0,
            team: None,
        }
    }
}

/// Shared environment actor state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: String,
    pub position: Vec3,
    pub health: f32,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Envelope {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wire_shape() {
        let env = Envelope {
            seq: 7,
            sender_id: "abc".into(),
            sender_name: "Alice".into(),
            timestamp: 1000,
            msg: PeerMsg::Hit {
                target_id: "def".into(),
                damage: 25.0,
            },
        };
        let json: serde_json::Value = serde_json::from_str(&env.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "hit");
        assert_eq!(json["seq"], 7);
        assert_eq!(json["sender_id"], "abc");
        assert_eq!(json["target_id"], "def");
    }

    #[test]
    fn unknown_fields_are_ignored_and_missing_ones_default() {
        let frame = r#"{
            "seq": 3,
            "sender_id": "p1",
            "type": "state",
            "position": [1.5, 1.8, -2.25],
            "yaw": 0.5,
            "future_field": {"nested": true}
        }"#;
        let env = Envelope::decode(frame).unwrap();
        assert_eq!(env.sender_name, "");
        match env.msg {
            PeerMsg::State(s) => {
                assert_eq!(s.position, Vec3::new(1.5, 1.8, -2.25));
                assert_eq!(s.yaw, 0.5);
                assert_eq!(s.health, 100.0);
                assert_eq!(s.weapon, WeaponKind::AssaultRifle);
                assert_eq!(s.team, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn death_without_killer() {
        let env = Envelope::decode(r#"{"seq":1,"sender_id":"p","type":"death"}"#).unwrap();
        assert_eq!(
            env.msg,
            PeerMsg::Death {
                killer_id: None,
                killer_name: None
            }
        );
    }

    #[test]
    fn vectors_keep_sub_centimeter_precision() {
        let origin = Vec3::new(12.345_678, 1.8, -98.765_43);
        let env = Envelope {
            seq: 1,
            sender_id: "p".into(),
            sender_name: String::new(),
            timestamp: 0,
            msg: PeerMsg::Shoot {
                weapon: WeaponKind::Shotgun,
                origin,
                direction: Vec3::NEG_Z,
            },
        };
        let back = Envelope::decode(&env.encode().unwrap()).unwrap();
        match back.msg {
            PeerMsg::Shoot { origin: o, weapon, .. } => {
                assert!(o.distance(origin) < 0.001);
                assert_eq!(weapon, WeaponKind::Shotgun);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Envelope::decode("not json").is_err());
        assert!(Envelope::decode(r#"{"seq":1,"sender_id":"p","type":"teleport"}"#).is_err());
    }
}
