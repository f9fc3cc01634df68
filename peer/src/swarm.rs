use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::PeerConfig;
use crate::error::{PeerError, TransferError};
use crate::picker::{self, ParallelismController};
use crate::state::SharedPieces;
use crate::tracker_client::TrackerClient;
use crate::transfer::{client::request_piece, server};

/// The peer engine: owns the convergence loop, the scheduler's `active`
/// map, and the download worker pool. `active` lives here rather than
/// behind the piece-state lock, since only this loop ever touches it —
/// every index in `active` has a matching entry in `inflight`, and only
/// the scheduler mutates either.
pub struct Peer {
    config: PeerConfig,
    pieces: Arc<SharedPieces>,
    tracker: TrackerClient,
    active: HashMap<u32, JoinHandle<Result<(), TransferError>>>,
    download_permits: Arc<Semaphore>,
    parallelism: ParallelismController,
}

impl Peer {
    pub fn new(config: PeerConfig) -> std::io::Result<Self> {
        let piece_count = config.swarm.piece_count;
        let total_bytes = config.swarm.total_bytes();
        let pieces = Arc::new(SharedPieces::open(
            &config.local_artifact_path(),
            total_bytes,
            piece_count,
            config.is_seed,
        )?);
        let tracker = TrackerClient::new(config.tracker_url.clone());
        let download_cap = config.swarm.cap as usize;
        Ok(Self {
            parallelism: ParallelismController::new(&config.swarm),
            tracker,
            pieces,
            active: HashMap::new(),
            download_permits: Arc::new(Semaphore::new(download_cap)),
            config,
        })
    }

    /// Runs the request server and, for a leecher, the convergence loop
    /// concurrently on the same runtime.
    pub async fn run(&mut self) -> Result<(), PeerError> {
        let listen_addr: SocketAddr = self.config.listen_addr()?;
        let ctx = Arc::new(server::ServerContext {
            pieces: Arc::clone(&self.pieces),
            artifact_path: self.config.local_artifact_path(),
            piece_size: self.config.swarm.piece_size as u64,
            buffer_size: self.config.swarm.buffer_size,
            op_timeout: self.config.swarm.timeout,
        });
        let upload_cap = self.config.swarm.max_upload;
        tokio::spawn(async move {
            if let Err(e) = server::run(listen_addr, ctx, upload_cap).await {
                tracing::error!(error = %e, "request server exited");
            }
        });

        let peer_id = self.config.peer_id();

        if self.config.is_seed {
            tracing::info!(%peer_id, "starting as seeder");
            self.tracker
                .register(&peer_id, self.pieces.owned_snapshot())
                .await
                .map_err(PeerError::from)?;
            // The request server keeps running; nothing else to do.
            std::future::pending::<()>().await;
            return Ok(());
        }

        self.run_leecher(&peer_id).await?;

        tracing::info!(%peer_id, "download complete, becoming a seeder");
        self.tracker
            .register(&peer_id, self.pieces.owned_snapshot())
            .await
            .map_err(PeerError::from)?;
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn run_leecher(&mut self, peer_id: &str) -> Result<(), PeerError> {
        let piece_count = self.config.swarm.piece_count;

        while !self.pieces.is_complete(piece_count) {
            tracing::info!(
                owned = self.pieces.owned_len(),
                total = piece_count,
                pct = 100.0 * self.pieces.owned_len() as f64 / piece_count as f64,
                "progress"
            );

            self.tracker
                .register(peer_id, self.pieces.owned_snapshot())
                .await
                .map_err(PeerError::from)?;

            let snapshot = self.tracker.get_peers().await.map_err(PeerError::from)?;

            self.parallelism.maybe_recompute(
                &snapshot,
                peer_id,
                piece_count,
                &self.config.swarm,
                Instant::now(),
            );

            self.reap().await;
            self.schedule(&snapshot, peer_id, piece_count);

            tokio::time::sleep(self.config.swarm.interval).await;
        }

        Ok(())
    }

    /// Drains completed download tasks from `active`, clearing `inflight`
    /// for any that failed. Successes have already updated
    /// `owned`/`inflight` via [`SharedPieces::persist_piece`] inside the
    /// task itself. Only tasks already observed finished are awaited, so
    /// this never blocks on a download still in flight.
    async fn reap(&mut self) {
        let finished: Vec<u32> = self
            .active
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(idx, _)| *idx)
            .collect();

        for idx in finished {
            let handle = self.active.remove(&idx).expect("just observed in map");
            match handle.await {
                Ok(Ok(())) => {} // persisted already; inflight already cleared.
                Ok(Err(e)) => {
                    tracing::warn!(piece = idx, error = %e, "transfer failed, retrying");
                    self.pieces.clear_inflight(idx);
                }
                Err(_join_err) => {
                    tracing::warn!(piece = idx, "download task panicked, retrying");
                    self.pieces.clear_inflight(idx);
                }
            }
        }
    }

    fn schedule(&mut self, snapshot: &swarm_proto::rpc::PeerTable, peer_id: &str, piece_count: u32) {
        let free_slots = (self.parallelism.target() as usize).saturating_sub(self.active.len());
        if free_slots == 0 {
            return;
        }

        let (owned, inflight) = self.pieces.snapshot();
        let selections = picker::select_pieces(snapshot, peer_id, &owned, &inflight, free_slots, piece_count);

        for selection in selections {
            if !self.pieces.mark_inflight(selection.piece_idx) {
                continue; // raced with a concurrent completion; skip this tick.
            }

            let Ok(provider_addr) = selection.provider.parse::<SocketAddr>() else {
                tracing::warn!(provider = %selection.provider, "unparseable provider address");
                self.pieces.clear_inflight(selection.piece_idx);
                continue;
            };

            let pieces = Arc::clone(&self.pieces);
            let permits = Arc::clone(&self.download_permits);
            let piece_size = self.config.swarm.piece_size;
            let timeout = self.config.swarm.timeout;
            let idx = selection.piece_idx;

            let handle: JoinHandle<Result<(), TransferError>> = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.expect("semaphore closed");
                let data = request_piece(provider_addr, idx, piece_size, timeout).await?;
                pieces.persist_piece(idx, &data, piece_size as u64)?;
                Ok(())
            });
            self.active.insert(idx, handle);
        }
    }

    /// Count of pieces currently held locally. Exposed for progress
    /// reporting and tests; the convergence loop uses
    /// [`SharedPieces::is_complete`] internally for the same check.
    pub fn owned_len(&self) -> usize {
        self.pieces.owned_len()
    }
}
