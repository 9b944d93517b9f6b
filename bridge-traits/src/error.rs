use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Wi-Fi Direct is not supported on this device: {0}")]
    Unsupported(String),

    #[error("Channel is not valid: {0}")]
    InvalidChannel(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
