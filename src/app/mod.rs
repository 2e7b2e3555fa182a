pub mod state;

pub use state::{AppState, LinkClaim, LinkHub};
