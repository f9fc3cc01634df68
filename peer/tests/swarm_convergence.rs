//! End-to-end convergence tests against a real tracker and real TCP
//! transfers, using a tiny artifact so the whole run completes in well
//! under a second of wall-clock polling.

use std::time::Duration;

use peer::config::PeerConfig;
use peer::swarm::Peer;
use swarm_proto::SwarmConfig;

fn tiny_swarm_config() -> SwarmConfig {
    SwarmConfig {
        piece_size: 8,
        piece_count: 4,
        base: 10,
        k_seed: 5,
        k_leech: 2,
        cap: 50,
        interval: Duration::from_millis(20),
        timeout: Duration::from_secs(2),
        buffer_size: 4,
        max_upload: 10,
    }
}

async fn spawn_tracker() -> String {
    let tracker = tracker::Tracker::new();
    let app = tracker::api::router(tracker);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn wait_until_complete(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// One seeder, one leecher, small artifact of all-zero bytes. The
/// leecher's file must end up byte-identical to the seeder's.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn seeder_and_leecher_converge() {
    let dir = tempfile::tempdir().unwrap();
    let tracker_url = spawn_tracker().await;
    let swarm = tiny_swarm_config();

    let seed_artifact = dir.path().join("artifact.bin");
    std::fs::write(&seed_artifact, vec![0u8; swarm.total_bytes() as usize]).unwrap();

    std::env::set_current_dir(dir.path()).unwrap();

    let seeder_cfg = PeerConfig {
        host: "127.0.0.1".to_string(),
        port: 19001,
        is_seed: true,
        tracker_url: tracker_url.clone(),
        artifact_name: "artifact.bin".to_string(),
        swarm,
    };
    let mut seeder = Peer::new(seeder_cfg).unwrap();
    tokio::spawn(async move {
        let _ = seeder.run().await;
    });

    // Give the seeder a moment to register and bind its listener.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let leecher_cfg = PeerConfig {
        host: "127.0.0.1".to_string(),
        port: 19002,
        is_seed: false,
        tracker_url,
        artifact_name: "artifact.bin".to_string(),
        swarm,
    };
    let pieces_path = leecher_cfg.backing_file_path();
    let mut leecher = Peer::new(leecher_cfg).unwrap();

    let handle = tokio::spawn(async move {
        let _ = leecher.run().await;
    });

    let expected = std::fs::read(&seed_artifact).unwrap();
    let completed = wait_until_complete(Duration::from_secs(10), || {
        std::fs::read(&pieces_path)
            .map(|actual| actual == expected)
            .unwrap_or(false)
    })
    .await;

    assert!(completed, "leecher did not converge to the seeder's artifact in time");
    handle.abort();
}
