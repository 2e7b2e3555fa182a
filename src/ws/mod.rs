//! Peer link: wire protocol, synchronization and WebSocket transport

pub mod client;
pub mod handler;
pub mod protocol;
pub mod pump;
pub mod sync;
pub mod transport;

pub use protocol::{Envelope, PeerMsg};
pub use sync::{PeerSync, SyncEffect};
pub use transport::{memory_pair, LinkEvent, Transport, TransportError};
