use peer::{Peer, PeerConfig};

/// Fixed-arity process surface: `<program> <host> <port> <is_seed>`, no
/// flags, no config file. `is_seed` is compared case-insensitively
/// against `"true"`.
#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: {} <host> <port> <is_seed>", args.first().map(String::as_str).unwrap_or("peer"));
        std::process::exit(1);
    }

    let host = args[1].clone();
    let port: u16 = match args[2].parse() {
        Ok(p) => p,
        Err(_) => {
            eprintln!("invalid port: {}", args[2]);
            std::process::exit(1);
        }
    };
    let is_seed = args[3].eq_ignore_ascii_case("true");

    let config = PeerConfig::new(host, port, is_seed);
    let mut peer = match Peer::new(config) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to open backing file");
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = peer.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "peer exited with error");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }
}
