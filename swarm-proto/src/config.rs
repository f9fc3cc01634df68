use std::time::Duration;

/// Tunables shared swarm-wide. Every peer and the tracker must agree on
/// these; mismatches across processes are undefined behaviour, so in a
/// real deployment they'd come from one source of truth. Each field has a
/// built-in default and may be overridden by an environment variable,
/// read once at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwarmConfig {
    pub piece_size: usize,
    pub piece_count: u32,
    pub base: u32,
    pub k_seed: u32,
    pub k_leech: u32,
    pub cap: u32,
    pub interval: Duration,
    pub timeout: Duration,
    pub buffer_size: usize,
    pub max_upload: usize,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            piece_size: 1024 * 1024,
            piece_count: 500,
            base: 5,
            k_seed: 5,
            k_leech: 2,
            cap: 100,
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
            buffer_size: 64 * 1024,
            max_upload: 50,
        }
    }
}

impl SwarmConfig {
    pub fn total_bytes(&self) -> u64 {
        self.piece_size as u64 * self.piece_count as u64
    }

    /// Overrides defaults from `SWARMKIT_*` environment variables. Unset or
    /// unparsable variables leave the default in place.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_usize("SWARMKIT_PIECE_SIZE") {
            cfg.piece_size = v;
        }
        if let Some(v) = env_u32("SWARMKIT_PIECE_COUNT") {
            cfg.piece_count = v;
        }
        if let Some(v) = env_u32("SWARMKIT_BASE") {
            cfg.base = v;
        }
        if let Some(v) = env_u32("SWARMKIT_K_SEED") {
            cfg.k_seed = v;
        }
        if let Some(v) = env_u32("SWARMKIT_K_LEECH") {
            cfg.k_leech = v;
        }
        if let Some(v) = env_u32("SWARMKIT_CAP") {
            cfg.cap = v;
        }
        if let Some(v) = env_u64("SWARMKIT_INTERVAL_SECS") {
            cfg.interval = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("SWARMKIT_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_usize("SWARMKIT_BUFFER_SIZE") {
            cfg.buffer_size = v;
        }
        if let Some(v) = env_usize("SWARMKIT_MAX_UPLOAD") {
            cfg.max_upload = v;
        }
        cfg
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = SwarmConfig::default();
        assert_eq!(cfg.piece_size, 1024 * 1024);
        assert_eq!(cfg.piece_count, 500);
        assert_eq!(cfg.total_bytes(), 500 * 1024 * 1024);
        assert_eq!(cfg.base, 5);
        assert_eq!(cfg.cap, 100);
    }
}
