mod framer;
mod sync;

#[cfg(feature = "tokio")]
mod tokio;

pub use framer::Frame;
pub use sync::SyncLineReader;

#[cfg(feature = "tokio")]
pub use self::tokio::AsyncLineReader;

const CHUNK_SIZE_BYTES: usize = 8192;
