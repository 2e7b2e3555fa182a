//! WebSocket client for the joining peer

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tracing::info;

use crate::ws::pump::run_link;
use crate::ws::transport::{ChannelTransport, LinkEvent, TransportError};

/// Connect to the host and pump frames in the background.
/// The link's lifecycle is reported through `inbound`.
pub async fn connect(
    url: &str,
    inbound: mpsc::UnboundedSender<LinkEvent>,
) -> Result<JoinHandle<()>, TransportError> {
    let (stream, _) = connect_async(url).await?;
    info!(url = %url, "Connected to host");

    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
    inbound
        .send(LinkEvent::Open(Box::new(ChannelTransport::new(out_tx))))
        .map_err(|_| TransportError::Closed)?;

    let (ws_sink, ws_stream) = stream.split();
    Ok(tokio::spawn(async move {
        run_link(ws_sink, ws_stream, out_rx, inbound).await;
        info!("Host link closed");
    }))
}
