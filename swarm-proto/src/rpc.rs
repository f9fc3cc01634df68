//! JSON bodies exchanged between a peer and the tracker.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `POST /register` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub peer_id: String,
    pub pieces: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub ok: bool,
}

/// `peer_id -> owned piece indices`, as last registered. A fresh copy is
/// handed out on every `get_peers` call; callers never see the tracker's
/// own map.
pub type PeerTable = HashMap<String, Vec<u32>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeersResponse {
    pub peers: PeerTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnersResponse {
    pub owners: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub peer_count: usize,
    pub register_count: u64,
    pub lookup_count: u64,
    pub uptime_secs: u64,
    pub popularity: HashMap<u32, u64>,
}
