use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use super::{parse_request, MISS_REPLY};
use crate::state::SharedPieces;

/// Everything a connection handler needs, grouped so `run` only has to
/// clone one `Arc` per accepted connection.
pub struct ServerContext {
    pub pieces: Arc<SharedPieces>,
    pub artifact_path: PathBuf,
    pub piece_size: u64,
    pub buffer_size: usize,
    pub op_timeout: Duration,
}

/// Binds the peer's advertised listen address and serves owned pieces to
/// other peers, gated by a bounded upload pool.
pub async fn run(
    listen_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    upload_cap: usize,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "request server listening");
    let permits = Arc::new(Semaphore::new(upload_cap));

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let ctx = Arc::clone(&ctx);
        let permits = Arc::clone(&permits);
        tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.expect("semaphore closed");
            if let Err(e) = handle_connection(stream, &ctx).await {
                tracing::warn!(%peer_addr, error = %e, "request handling failed");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, ctx: &ServerContext) -> std::io::Result<()> {
    let mut buf = vec![0u8; 1024];
    let n = match timeout(ctx.op_timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return Err(e),
        Err(_) => return Ok(()), // read timed out; drop the connection silently.
    };
    if n == 0 {
        return Ok(());
    }

    let requested = parse_request(&buf[..n]);
    let hit = requested.is_some_and(|idx| ctx.pieces.is_owned(idx));

    if let (true, Some(idx)) = (hit, requested) {
        send_piece(&mut stream, ctx, idx).await
    } else {
        let _ = timeout(ctx.op_timeout, stream.write_all(MISS_REPLY)).await;
        Ok(())
    }
}

async fn send_piece(stream: &mut TcpStream, ctx: &ServerContext, idx: u32) -> std::io::Result<()> {
    let path = ctx.artifact_path.clone();
    let offset = idx as u64 * ctx.piece_size;
    let len = ctx.piece_size as usize;

    // Disk access happens on a blocking thread, never under the peer lock
    // and never on the async reactor.
    let data = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = std::fs::File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    })
    .await
    .expect("blocking read task panicked")?;

    // The server sends whatever was read in chunks of at most
    // `buffer_size`, no framing.
    for chunk in data.chunks(ctx.buffer_size) {
        timeout(ctx.op_timeout, stream.write_all(chunk))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "write timed out"))??;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::client::request_piece;

    #[tokio::test]
    async fn serves_owned_piece_and_rejects_missing() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_path = dir.path().join("artifact.bin");
        std::fs::write(&artifact_path, vec![0u8; 8]).unwrap();

        let backing = dir.path().join("backing.bin");
        let pieces = Arc::new(SharedPieces::open(&backing, 8, 2, false).unwrap());
        pieces.persist_piece(0, &[1, 2, 3, 4], 4).unwrap();

        let ctx = Arc::new(ServerContext {
            pieces: Arc::clone(&pieces),
            artifact_path: backing.clone(),
            piece_size: 4,
            buffer_size: 2,
            op_timeout: Duration::from_secs(2),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let server_ctx = Arc::clone(&ctx);
        let server = tokio::spawn(async move { run(addr, server_ctx, 50).await });
        // Give the listener a moment to bind.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let hit = request_piece(addr, 0, 4, Duration::from_secs(2)).await.unwrap();
        assert_eq!(hit, vec![1, 2, 3, 4]);

        let miss = request_piece(addr, 1, 4, Duration::from_secs(2)).await;
        assert!(miss.is_err());

        server.abort();
    }
}
