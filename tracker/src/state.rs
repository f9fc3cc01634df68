use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use swarm_proto::rpc::PeerTable;

/// The tracker's full mutable state, behind a single mutex. No
/// finer-grained locking: every operation on `peers` and the counters is
/// serialized through one lock.
#[derive(Debug)]
pub struct TrackerState {
    peers: PeerTable,
    popularity: HashMap<u32, u64>,
    started_at: Instant,
    register_count: u64,
    lookup_count: u64,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            peers: HashMap::new(),
            popularity: HashMap::new(),
            started_at: Instant::now(),
            register_count: 0,
            lookup_count: 0,
        }
    }
}

/// Shared handle installed as axum state. Wraps the lock so handlers never
/// touch `std::sync::Mutex` directly.
#[derive(Debug, Default, Clone)]
pub struct Tracker {
    inner: std::sync::Arc<Mutex<TrackerState>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces `peers[peer_id]`, discarding any prior value.
    pub fn register(&self, peer_id: String, pieces: Vec<u32>) {
        let mut state = self.inner.lock().expect("tracker mutex poisoned");
        state.peers.insert(peer_id, pieces);
        state.register_count += 1;
    }

    /// Defensive snapshot copy of the membership table.
    pub fn get_peers(&self) -> PeerTable {
        let mut state = self.inner.lock().expect("tracker mutex poisoned");
        state.lookup_count += 1;
        state.peers.clone()
    }

    /// Every peer id whose last-registered piece set contains `index`.
    pub fn owners_of(&self, index: u32) -> Vec<String> {
        let mut state = self.inner.lock().expect("tracker mutex poisoned");
        state.lookup_count += 1;
        *state.popularity.entry(index).or_insert(0) += 1;
        state
            .peers
            .iter()
            .filter(|(_, pieces)| pieces.contains(&index))
            .map(|(peer_id, _)| peer_id.clone())
            .collect()
    }

    pub fn stats(&self) -> Stats {
        let state = self.inner.lock().expect("tracker mutex poisoned");
        Stats {
            peer_count: state.peers.len(),
            register_count: state.register_count,
            lookup_count: state.lookup_count,
            uptime_secs: state.started_at.elapsed().as_secs(),
            popularity: state.popularity.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub peer_count: usize,
    pub register_count: u64,
    pub lookup_count: u64,
    pub uptime_secs: u64,
    pub popularity: HashMap<u32, u64>,
}
