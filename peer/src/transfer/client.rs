use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::TransferError;

/// Fetches one piece from `provider`. Any short read — including the
/// ASCII miss reply, which is always shorter than `piece_size` — is
/// surfaced as [`TransferError::ShortRead`]; the caller must never
/// persist a short read as if it were the real piece.
pub async fn request_piece(
    provider: SocketAddr,
    piece_idx: u32,
    piece_size: usize,
    op_timeout: Duration,
) -> Result<Vec<u8>, TransferError> {
    let mut stream = timeout(op_timeout, TcpStream::connect(provider))
        .await
        .map_err(|_| TransferError::Timeout)?
        .map_err(TransferError::Connect)?;

    let request = format!("GET {piece_idx}");
    timeout(op_timeout, stream.write_all(request.as_bytes()))
        .await
        .map_err(|_| TransferError::Timeout)??;

    let mut data = Vec::with_capacity(piece_size);
    while data.len() < piece_size {
        let mut chunk = vec![0u8; piece_size - data.len()];
        let n = match timeout(op_timeout, stream.read(&mut chunk)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(TransferError::Io(e)),
            Err(_) => break, // timed out mid-stream: treat as a short read.
        };
        if n == 0 {
            break; // peer closed the connection.
        }
        data.extend_from_slice(&chunk[..n]);
    }

    if data.len() != piece_size {
        return Err(TransferError::ShortRead {
            got: data.len(),
            want: piece_size,
        });
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt as _;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn full_piece_round_trips() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let n = sock.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"GET 3");
            sock.write_all(&[9u8; 16]).await.unwrap();
        });

        let data = request_piece(addr, 3, 16, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(data, vec![9u8; 16]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn short_read_is_never_returned_as_success() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await.unwrap();
            sock.write_all(&[1u8; 4]).await.unwrap();
            // Close before delivering the rest: simulates a cut connection mid-transfer.
        });

        let result = request_piece(addr, 7, 16, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(TransferError::ShortRead { got: 4, want: 16 })));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn miss_reply_is_a_short_read() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await.unwrap();
            sock.write_all(crate::transfer::MISS_REPLY).await.unwrap();
        });

        let result = request_piece(addr, 1, 1024 * 1024, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(TransferError::ShortRead { .. })));
        server.await.unwrap();
    }
}
