use std::io::{ErrorKind, Read};

use super::framer::{Frame, LineFramer};
use super::CHUNK_SIZE_BYTES;

/// Iterator of [`Frame`]s over any [`Read`] source.
pub struct SyncLineReader<R: Read> {
    reader: R,
    framer: LineFramer,
    chunk: [u8; CHUNK_SIZE_BYTES],
    chunk_pos: usize,
    chunk_len: usize,
    done: bool,
}

impl<R: Read> SyncLineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            framer: LineFramer::new(max_line_bytes),
            chunk: [0u8; CHUNK_SIZE_BYTES],
            chunk_pos: 0,
            chunk_len: 0,
            done: false,
        }
    }

    fn fill_chunk(&mut self) -> std::io::Result<usize> {
        self.chunk_pos = 0;
        loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => {
                    self.chunk_len = n;
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.chunk_len = 0;
                    return Err(err);
                }
            }
        }
    }
}

impl<R: Read> Iterator for SyncLineReader<R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.chunk_pos >= self.chunk_len {
                match self.fill_chunk() {
                    Ok(0) => {
                        self.done = true;
                        return self.framer.finish();
                    }
                    Ok(_) => {}
                    Err(_) => {
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
