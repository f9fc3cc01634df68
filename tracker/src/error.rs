#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
