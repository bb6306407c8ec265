use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to cast FFmpeg element")]
    Cast,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid URI")]
    Uri,
    #[error("not a video file: no decodable video stream")]
    Caps,
    #[error("invalid framerate: {0}")]
    Framerate(f64),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("no video loaded")]
    NotLoaded,
    #[error("decoder worker is gone")]
    Sync,
    #[error("invalid display size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}
