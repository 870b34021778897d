use tokio::io::{AsyncRead, AsyncReadExt};

use super::framer::{Frame, LineFramer};
use super::CHUNK_SIZE_BYTES;

/// Async counterpart of [`super::SyncLineReader`].
pub struct AsyncLineReader<R: AsyncRead + Unpin> {
    reader: R,
    framer: LineFramer,
    chunk: Box<[u8; CHUNK_SIZE_BYTES]>,
    chunk_pos: usize,
    chunk_len: usize,
    done: bool,
}

impl<R: AsyncRead + Unpin> AsyncLineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            framer: LineFramer::new(max_line_bytes),
            chunk: Box::new([0u8; CHUNK_SIZE_BYTES]),
            chunk_pos: 0,
            chunk_len: 0,
            done: false,
        }
    }

    pub async fn next_frame(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }

        loop {
            if self.chunk_pos >= self.chunk_len {
                self.chunk_pos = 0;
                match self.reader.read(&mut self.chunk[..]).await {
                    Ok(0) => {
                        self.chunk_len = 0;
                        self.done = true;
                        return self.framer.finish();
                    }
                    Ok(n) => self.chunk_len = n,
                    Err(_) => {
                        self.chunk_len = 0;
                        self.done = true;
                        return Some(self.framer.io_error());
                    }
                }
            }

            let (consumed, frame) = self.framer.feed(&self.chunk[self.chunk_pos..self.chunk_len]);
            self.chunk_pos += consumed;
            if frame.is_some() {
                return frame;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_lines_from_async_source() {
        let data: &[u8] = b"put a 1447394143 1\r\n\nput b 1447394143 2";
        let mut reader = AsyncLineReader::new(data, 1024);

        let mut lines = Vec::new();
        while let Some(frame) = reader.next_frame().await {
            match frame {
                Frame::Line { bytes, .. } => lines.push(String::from_utf8(bytes).unwrap()),
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(
            lines,
            vec!["put a 1447394143 1\r", "", "put b 1447394143 2"]
        );
    }
}
