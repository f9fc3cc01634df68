//! The membership directory: `register` / `get_peers` / `owners_of`,
//! plus a `/stats` status endpoint for operational visibility.

pub mod api;
pub mod error;
pub mod state;

pub use state::Tracker;
