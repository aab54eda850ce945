use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV format error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid cut list: {0}")]
    InvalidCut(String),
}
