//! Application state shared across routes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::ws::transport::LinkEvent;

/// Hands the single peer link to the frame loop
#[derive(Clone)]
pub struct LinkHub {
    inbound: mpsc::UnboundedSender<LinkEvent>,
    occupied: Arc<AtomicBool>,
}

impl LinkHub {
    pub fn new(inbound: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            inbound,
            occupied: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reserve the link slot. `None` if a peer is already linked.
    /// The slot is freed when the returned claim is dropped.
    pub fn try_claim(&self) -> Option<LinkClaim> {
        self.occupied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LinkClaim {
                occupied: self.occupied.clone(),
            })
    }

    pub fn is_connected(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }

    pub fn inbound(&self) -> mpsc::UnboundedSender<LinkEvent> {
        self.inbound.clone()
    }
}

/// Holds the link slot for one peer connection
pub struct LinkClaim {
    occupied: Arc<AtomicBool>,
}

impl Drop for LinkClaim {
    fn drop(&mut self) {
        self.occupied.store(false, Ordering::Release);
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub link: LinkHub,
}

impl AppState {
    pub fn new(config: Config, inbound: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            config: Arc::new(config),
            link: LinkHub::new(inbound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_peer_can_claim_the_link() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let hub = LinkHub::new(tx);
        let claim = hub.try_claim();
        assert!(claim.is_some());
        assert!(hub.is_connected());
        assert!(hub.clone().try_claim().is_none());
        drop(claim);
        assert!(!hub.is_connected());
        assert!(hub.try_claim().is_some());
    }

    #[test]
    fn claim_is_released_when_the_callback_never_runs() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let hub = LinkHub::new(tx);
        let claim = hub.try_claim();
        assert!(claim.is_some());

        // An upgrade callback that owns the claim and is dropped unrun
        let callback = move || drop(claim);
        drop(callback);

        assert!(!hub.is_connected());
        assert!(hub.try_claim().is_some());
    }
}
