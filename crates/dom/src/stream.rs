//! Chunked file input for the lexer.
//!
//! The buffer grows by one chunk when a refill would overflow it, and is
//! periodically compacted: consumed bytes are dropped, the tail moves to
//! the front, and an oversized buffer shrinks back toward the configured
//! chunk size. The lexer addresses the buffer through offsets which it
//! rebases after a compaction; refills only append, so offsets survive
//! them.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub(crate) struct StreamBuffer {
    file: File,
    buf: Vec<u8>,
    // valid bytes read into buf so far
    len: usize,
    chunk_size: usize,
    exhausted: bool,
}

const MIN_CHUNK_SIZE: usize = 10;

impl StreamBuffer {
    pub fn open(path: &Path, chunk_size: usize) -> io::Result<Self> {
        let chunk_size = if chunk_size < MIN_CHUNK_SIZE {
            crate::config::DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        let file = File::open(path)?;
        Ok(StreamBuffer {
            file,
            buf: vec![0; chunk_size],
            len: 0,
            chunk_size,
            exhausted: false,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Reads one chunk from the file, growing the buffer first when the
    /// chunk would not fit.
    pub fn read_chunk(&mut self) -> io::Result<()> {
        if self.exhausted {
            return Ok(());
        }
        if self.len + self.chunk_size > self.buf.len() && self.len > 0 {
            self.buf.resize(self.buf.len() + self.chunk_size, 0);
        }
        let mut read = 0;
        let want = self.chunk_size.min(self.buf.len() - self.len);
        while read < want {
            match self.file.read(&mut self.buf[self.len + read..self.len + want]) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.len += read;
        Ok(())
    }

    /// Drops the consumed prefix: bytes from `cursor` to the end of the
    /// valid region move to position 0, and an oversized buffer is cut back
    /// toward the chunk size. Returns the amount every outstanding offset
    /// must be rebased by.
    pub fn compact(&mut self, cursor: usize) -> usize {
        let keep = self.len - cursor;
        self.buf.copy_within(cursor..self.len, 0);
        self.len = keep;
        if self.buf.len() > self.chunk_size {
            let new_size = keep.max(self.chunk_size);
            self.buf.truncate(new_size);
        }
        cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_with(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn reads_in_chunks_until_exhausted() {
        let f = temp_with(b"abcdefghijklmnopqrstuvwxyz");
        let mut stream = StreamBuffer::open(f.path(), 10).unwrap();
        stream.read_chunk().unwrap();
        assert_eq!(stream.bytes(), b"abcdefghij");
        stream.read_chunk().unwrap();
        stream.read_chunk().unwrap();
        assert_eq!(stream.bytes(), b"abcdefghijklmnopqrstuvwxyz");
        assert!(stream.is_exhausted());
    }

    #[test]
    fn compaction_rebases_and_shrinks() {
        let f = temp_with(&[b'x'; 64]);
        let mut stream = StreamBuffer::open(f.path(), 16).unwrap();
        for _ in 0..4 {
            stream.read_chunk().unwrap();
        }
        assert_eq!(stream.bytes().len(), 64);
        let rebase = stream.compact(60);
        assert_eq!(rebase, 60);
        assert_eq!(stream.bytes().len(), 4);
        // shrunk back to one chunk
        assert_eq!(stream.buf.len(), 16);
    }

    #[test]
    fn tiny_chunk_size_falls_back_to_default() {
        let f = temp_with(b"hi");
        let stream = StreamBuffer::open(f.path(), 3).unwrap();
        assert_eq!(stream.chunk_size, crate::config::DEFAULT_CHUNK_SIZE);
    }
}
