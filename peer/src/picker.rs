use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use swarm_proto::rpc::PeerTable;
use swarm_proto::SwarmConfig;

const RECOMPUTE_INTERVAL: Duration = Duration::from_secs(5);

/// Adaptive download concurrency cap. Recomputed at most once every 5s;
/// between recomputations the previous value governs.
#[derive(Debug)]
pub struct ParallelismController {
    target: u32,
    last_recompute: Option<Instant>,
}

impl ParallelismController {
    pub fn new(cfg: &SwarmConfig) -> Self {
        Self {
            target: cfg.base,
            last_recompute: None,
        }
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// Recomputes `target` from the swarm snapshot if the 5s gate has
    /// elapsed, otherwise leaves it unchanged.
    pub fn maybe_recompute(
        &mut self,
        snapshot: &PeerTable,
        self_id: &str,
        piece_count: u32,
        cfg: &SwarmConfig,
        now: Instant,
    ) {
        let due = match self.last_recompute {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= RECOMPUTE_INTERVAL,
        };
        if !due {
            return;
        }

        let (seeds, leechers) = classify_peers(snapshot, self_id, piece_count);
        self.target = (cfg.base + seeds * cfg.k_seed + leechers * cfg.k_leech).min(cfg.cap);
        self.last_recompute = Some(now);
    }
}

fn classify_peers(snapshot: &PeerTable, self_id: &str, piece_count: u32) -> (u32, u32) {
    let mut seeds = 0u32;
    let mut leechers = 0u32;
    for (peer_id, pieces) in snapshot {
        if peer_id == self_id {
            continue;
        }
        let n = pieces.len() as u32;
        if n == piece_count {
            seeds += 1;
        } else if n > 0 {
            leechers += 1;
        }
    }
    (seeds, leechers)
}

/// A piece selected for download and the provider chosen to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub piece_idx: u32,
    pub provider: String,
}

/// Rarest-first scheduling: builds the candidate map, orders by ascending
/// provider count then ascending index, takes the first `free_slots`
/// entries, and for each picks a random provider (preferring seeds over
/// non-seeds).
pub fn select_pieces(
    snapshot: &PeerTable,
    self_id: &str,
    owned: &HashSet<u32>,
    inflight: &HashSet<u32>,
    free_slots: usize,
    piece_count: u32,
) -> Vec<Selection> {
    if free_slots == 0 {
        return Vec::new();
    }

    let mut candidates: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for (peer_id, pieces) in snapshot {
        if peer_id == self_id {
            continue;
        }
        for &idx in pieces {
            if owned.contains(&idx) || inflight.contains(&idx) {
                continue;
            }
            candidates.entry(idx).or_default().push(peer_id.as_str());
        }
    }

    // BTreeMap already iterates in ascending-index order; a stable sort by
    // provider count alone preserves that order among ties.
    let mut ordered: Vec<(u32, Vec<&str>)> = candidates.into_iter().collect();
    ordered.sort_by_key(|(_, providers)| providers.len());

    let mut rng = rand::thread_rng();
    ordered
        .into_iter()
        .take(free_slots)
        .filter_map(|(idx, providers)| {
            let (seeds, leechers): (Vec<&str>, Vec<&str>) = providers
                .into_iter()
                .partition(|p| snapshot[*p].len() as u32 == piece_count);
            let provider = seeds
                .choose(&mut rng)
                .or_else(|| leechers.choose(&mut rng))
                .copied()?;
            Some(Selection {
                piece_idx: idx,
                provider: provider.to_string(),
            })
        })
        .collect()
}
