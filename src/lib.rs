//! Blasterz peer - simulation core for a two-peer first-person arena shooter
//!
//! - Spatial resolver, locomotion, ballistics and match rules in [`game`]
//! - Peer synchronization and WebSocket transport in [`ws`]
//! - Host health/upgrade routes in [`http`]

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
