use std::net::SocketAddr;
use std::path::PathBuf;

use swarm_proto::SwarmConfig;

/// Per-process configuration: a plain struct with an explicit
/// constructor, no config-file crate.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub host: String,
    pub port: u16,
    pub is_seed: bool,
    pub tracker_url: String,
    pub artifact_name: String,
    pub swarm: SwarmConfig,
}

impl PeerConfig {
    pub fn new(host: String, port: u16, is_seed: bool) -> Self {
        Self {
            host,
            port,
            is_seed,
            tracker_url: std::env::var("SWARMKIT_TRACKER_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            artifact_name: std::env::var("SWARMKIT_ARTIFACT_NAME")
                .unwrap_or_else(|_| "artifact.bin".to_string()),
            swarm: SwarmConfig::from_env(),
        }
    }

    /// The peer's advertised identity and listen endpoint — never rewritten
    /// by the tracker.
    pub fn peer_id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn listen_addr(&self) -> std::io::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }

    /// `<host>_<port>_<artifact>`, colons replaced with underscores so the
    /// name is a valid filename on every target platform.
    pub fn backing_file_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}_{}_{}",
            self.host, self.port, self.artifact_name
        ))
    }

    /// Seeders read the shared `<artifact>` path directly; there is no
    /// per-peer copy to make since a seeder already owns every piece.
    pub fn seeder_artifact_path(&self) -> PathBuf {
        PathBuf::from(&self.artifact_name)
    }

    /// The file a request for an owned piece should be served from.
    pub fn local_artifact_path(&self) -> PathBuf {
        if self.is_seed {
            self.seeder_artifact_path()
        } else {
            self.backing_file_path()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_file_path_replaces_colons() {
        let cfg = PeerConfig::new("127.0.0.1".into(), 9001, false);
        assert_eq!(
            cfg.backing_file_path(),
            PathBuf::from("127.0.0.1_9001_artifact.bin")
        );
        assert_eq!(cfg.peer_id(), "127.0.0.1:9001");
    }
}
