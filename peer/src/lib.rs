pub mod config;
pub mod error;
pub mod picker;
pub mod state;
pub mod swarm;
pub mod tracker_client;
pub mod transfer;

pub use config::PeerConfig;
pub use error::PeerError;
pub use swarm::Peer;
