use swarm_proto::rpc::{
    OwnersResponse, PeersResponse, PeerTable, RegisterRequest, RegisterResponse,
};

use crate::error::RpcError;

/// Thin reqwest-backed client for the tracker's three RPCs: one
/// `reqwest::Client` held across calls, JSON in and out.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    base_url: String,
}

impl TrackerClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Overwrites this peer's registered piece set.
    pub async fn register(&self, peer_id: &str, pieces: Vec<u32>) -> Result<(), RpcError> {
        let _: RegisterResponse = self
            .http
            .post(format!("{}/register", self.base_url))
            .json(&RegisterRequest {
                peer_id: peer_id.to_string(),
                pieces,
            })
            .send()
            .await?
            .json()
            .await?;
        Ok(())
    }

    /// Fetches a snapshot of every peer's registered piece set.
    pub async fn get_peers(&self) -> Result<PeerTable, RpcError> {
        let resp: PeersResponse = self
            .http
            .get(format!("{}/peers", self.base_url))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.peers)
    }

    /// Looks up who currently holds a given piece. The scheduler picks
    /// providers from `get_peers`'s full snapshot instead, so this is kept
    /// for diagnostics and future callers rather than the hot path.
    #[allow(dead_code)]
    pub async fn owners_of(&self, piece_idx: u32) -> Result<Vec<String>, RpcError> {
        let resp: OwnersResponse = self
            .http
            .get(format!("{}/owners/{}", self.base_url, piece_idx))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.owners)
    }
}
