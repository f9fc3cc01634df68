/// Errors from a single piece-transfer attempt. All variants route
/// through the scheduler's reaper, which clears `inflight` and lets the
/// piece re-enter the candidate pool — there is no retry counter or
/// backoff beyond the next tick.
#[derive(thiserror::Error, Debug)]
pub enum TransferError {
    #[error("connect failed: {0}")]
    Connect(std::io::Error),

    #[error("socket operation timed out")]
    Timeout,

    #[error("short read: got {got} of {want} bytes")]
    ShortRead { got: usize, want: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while writing a completed piece to the backing file. Handled
/// the same way as a transfer failure: logged, `inflight` cleared, piece
/// retried on a later tick.
#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PersistError> for TransferError {
    fn from(e: PersistError) -> Self {
        match e {
            PersistError::Io(e) => TransferError::Io(e),
        }
    }
}

/// Tracker RPC failures. Unhandled at the call site — propagated with
/// `?` out of the convergence loop, terminating the process.
#[derive(thiserror::Error, Debug)]
pub enum RpcError {
    #[error("tracker request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum PeerError {
    #[error("tracker rpc error: {0}")]
    Rpc(#[from] RpcError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PeerError>;
