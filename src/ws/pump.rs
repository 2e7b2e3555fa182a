//! Socket pump shared by the host handler and the joining client

use std::fmt::Display;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::util::rate_limit::PeerRateLimiter;
use crate::ws::transport::LinkEvent;

/// What the pump cares about in a received frame
#[derive(Debug)]
pub enum Frame {
    Text(String),
    Binary,
    Close,
    Control,
}

/// Bridges a socket library's message type to the pump
pub trait WireMessage: Send + 'static {
    fn text(frame: String) -> Self;
    fn into_frame(self) -> Frame;
}

impl WireMessage for axum::extract::ws::Message {
    fn text(frame: String) -> Self {
        Self::Text(frame)
    }

    fn into_frame(self) -> Frame {
        match self {
            Self::Text(text) => Frame::Text(text),
            Self::Binary(_) => Frame::Binary,
            Self::Close(_) => Frame::Close,
            Self::Ping(_) | Self::Pong(_) => Frame::Control,
        }
    }
}

impl WireMessage for tokio_tungstenite::tungstenite::Message {
    fn text(frame: String) -> Self {
        Self::Text(frame)
    }

    fn into_frame(self) -> Frame {
        match self {
            Self::Text(text) => Frame::Text(text),
            Self::Binary(_) => Frame::Binary,
            Self::Close(_) => Frame::Close,
            Self::Ping(_) | Self::Pong(_) | Self::Frame(_) => Frame::Control,
        }
    }
}

/// Pump frames between a split socket and the frame loop until either side
/// goes away. `out_rx` carries frames queued by the link's transport.
/// Always ends by reporting `LinkEvent::Close`.
pub async fn run_link<M, Si, St, E>(
    mut sink: Si,
    mut stream: St,
    mut out_rx: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<LinkEvent>,
) where
    M: WireMessage,
    Si: Sink<M> + Unpin + Send + 'static,
    Si::Error: Display,
    St: Stream<Item = Result<M, E>> + Unpin,
    E: Display,
{
    // Writer task: frame loop -> socket
    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = sink.send(M::text(frame)).await {
                debug!(error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let rate_limiter = PeerRateLimiter::new();

    // Reader loop: socket -> frame loop
    while let Some(result) = stream.next().await {
        match result.map(WireMessage::into_frame) {
            Ok(Frame::Text(text)) => {
                if !rate_limiter.check_inbound() {
                    warn!("Rate limited peer frame");
                    continue;
                }
                if inbound.send(LinkEvent::Data(text)).is_err() {
                    debug!("Inbound channel closed");
                    break;
                }
            }
            Ok(Frame::Binary) => {
                warn!("Received binary message, ignoring");
            }
            Ok(Frame::Control) => {}
            Ok(Frame::Close) => {
                info!("Peer initiated close");
                break;
            }
            Err(e) => {
                error!(error = %e, "WebSocket error");
                break;
            }
        }
    }

    let _ = inbound.send(LinkEvent::Close);
    writer_handle.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestMsg {
        Text(String),
        Bytes,
        Close,
    }

    impl WireMessage for TestMsg {
        fn text(frame: String) -> Self {
            Self::Text(frame)
        }

        fn into_frame(self) -> Frame {
            match self {
                Self::Text(text) => Frame::Text(text),
                Self::Bytes => Frame::Binary,
                Self::Close => Frame::Close,
            }
        }
    }

    fn text(s: &str) -> Result<TestMsg, std::io::Error> {
        Ok(TestMsg::Text(s.to_string()))
    }

    #[tokio::test]
    async fn reader_forwards_text_and_reports_close() {
        let (sink, _sent) = futures::channel::mpsc::unbounded::<TestMsg>();
        let stream = futures::stream::iter(vec![
            text("one"),
            Ok(TestMsg::Bytes),
            text("two"),
            Ok(TestMsg::Close),
            text("after close"),
        ]);
        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let (inbound, mut events) = mpsc::unbounded_channel();

        run_link(sink, stream, out_rx, inbound).await;

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(received.len(), 3);
        assert!(matches!(&received[0], LinkEvent::Data(t) if t == "one"));
        assert!(matches!(&received[1], LinkEvent::Data(t) if t == "two"));
        assert!(matches!(received[2], LinkEvent::Close));
    }

    #[tokio::test]
    async fn stream_error_ends_the_link() {
        let (sink, _sent) = futures::channel::mpsc::unbounded::<TestMsg>();
        let stream = futures::stream::iter(vec![
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            text("never"),
        ]);
        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let (inbound, mut events) = mpsc::unbounded_channel();

        run_link(sink, stream, out_rx, inbound).await;

        assert!(matches!(events.try_recv(), Ok(LinkEvent::Close)));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn writer_sends_queued_frames_as_text() {
        let (sink, mut sent) = futures::channel::mpsc::unbounded::<TestMsg>();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (inbound, _events) = mpsc::unbounded_channel();
        out_tx.send("hello".to_string()).unwrap();
        drop(out_tx);

        // Reader stays open until the writer has drained and closed the sink
        let stream = futures::stream::pending::<Result<TestMsg, std::io::Error>>();
        let pump = tokio::spawn(run_link(sink, stream, out_rx, inbound));

        assert_eq!(sent.next().await, Some(TestMsg::Text("hello".into())));
        assert_eq!(sent.next().await, None);
        pump.abort();
    }
}
