//! Transport seam between the frame loop and the network tasks

use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("link closed")]
    Closed,
    #[error("failed to connect: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Outbound half of a peer link. Sends never block the frame loop.
pub trait Transport: Send {
    fn send(&mut self, frame: String) -> Result<(), TransportError>;
}

/// Link lifecycle as seen by the frame loop
pub enum LinkEvent {
    Open(Box<dyn Transport>),
    Data(String),
    Close,
}

impl fmt::Debug for LinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkEvent::Open(_) => f.write_str("Open"),
            LinkEvent::Data(frame) => f.debug_tuple("Data").field(frame).finish(),
            LinkEvent::Close => f.write_str("Close"),
        }
    }
}

/// Transport backed by the writer task's channel
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// Transport that delivers straight into the other end's inbound queue
struct MemoryTransport {
    peer: mpsc::UnboundedSender<LinkEvent>,
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.peer
            .send(LinkEvent::Data(frame))
            .map_err(|_| TransportError::Closed)
    }
}

/// One end of an in-process link
pub struct MemoryEndpoint {
    inbound: mpsc::UnboundedReceiver<LinkEvent>,
    peer: mpsc::UnboundedSender<LinkEvent>,
}

impl MemoryEndpoint {
    /// Everything queued for this end so far
    pub fn drain(&mut self) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbound.try_recv() {
            events.push(event);
        }
        events
    }

    /// Push a raw frame to the other end, bypassing any session
    pub fn send_raw(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        self.peer
            .send(LinkEvent::Data(frame.into()))
            .map_err(|_| TransportError::Closed)
    }

    /// Tell the other end the link went down
    pub fn close(&self) {
        let _ = self.peer.send(LinkEvent::Close);
    }
}

/// Connected pair of in-process endpoints. Both ends start with an `Open`.
pub fn memory_pair() -> (MemoryEndpoint, MemoryEndpoint) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();

    let _ = a_tx.send(LinkEvent::Open(Box::new(MemoryTransport { peer: b_tx.clone() })));
    let _ = b_tx.send(LinkEvent::Open(Box::new(MemoryTransport { peer: a_tx.clone() })));

    (
        MemoryEndpoint {
            inbound: a_rx,
            peer: b_tx,
        },
        MemoryEndpoint {
            inbound: b_rx,
            peer: a_tx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pair_delivers_both_ways() {
        let (mut a, mut b) = memory_pair();

        let mut a_events = a.drain();
        let mut b_events = b.drain();
        assert_eq!(a_events.len(), 1);
        assert_eq!(b_events.len(), 1);

        let LinkEvent::Open(mut a_tx) = a_events.remove(0) else {
            panic!("expected open");
        };
        let LinkEvent::Open(mut b_tx) = b_events.remove(0) else {
            panic!("expected open");
        };

        a_tx.send("to b".into()).unwrap();
        b_tx.send("to a".into()).unwrap();

        assert!(matches!(&b.drain()[..], [LinkEvent::Data(f)] if f == "to b"));
        assert!(matches!(&a.drain()[..], [LinkEvent::Data(f)] if f == "to a"));

        a.close();
        assert!(matches!(&b.drain()[..], [LinkEvent::Close]));
    }

    #[test]
    fn channel_transport_reports_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut transport = ChannelTransport::new(tx);
        assert!(transport.send("x".into()).is_ok());
        drop(rx);
        assert!(matches!(transport.send("y".into()), Err(TransportError::Closed)));
    }
}
