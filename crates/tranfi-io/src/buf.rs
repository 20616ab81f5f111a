//! Output channel buffers and bounded file readers.
//!
//! A `ChannelBuffer` is append-only from the producer side and drained by
//! `read_into`. Consumed bytes are compacted away once they dominate the
//! allocation, so a long-running pipeline that is pulled regularly holds only
//! what has not been read yet.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Compact when at least this many consumed bytes sit at the front.
const COMPACT_MIN: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct ChannelBuffer {
    data: Vec<u8>,
    read: usize,
    total_written: u64,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.total_written += bytes.len() as u64;
    }

    /// Copy up to `buf.len()` unread bytes into `buf`, returning the count.
    /// Zero means nothing is pending.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let pending = &self.data[self.read..];
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        self.read += n;
        self.compact();
        n
    }

    /// Take every unread byte.
    pub fn drain_all(&mut self) -> Vec<u8> {
        let out = self.data.split_off(self.read);
        self.data.clear();
        self.read = 0;
        out
    }

    /// Unread bytes.
    pub fn len(&self) -> usize {
        self.data.len() - self.read
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes ever written, read or not.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    fn compact(&mut self) {
        if self.read == self.data.len() {
            self.data.clear();
            self.read = 0;
        } else if self.read >= COMPACT_MIN && self.read * 2 >= self.data.len() {
            self.data.drain(..self.read);
            self.read = 0;
        }
    }
}

/// A thin wrapper over `BufReader` with a fixed capacity, used to feed files
/// into a pipeline chunk by chunk.
pub struct BoundedBufReader<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> BoundedBufReader<R> {
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, reader),
        }
    }

    /// Hand each filled chunk to `each` until EOF.
    pub fn for_each_chunk<E>(
        &mut self,
        mut each: impl FnMut(&[u8]) -> Result<(), E>,
    ) -> Result<(), E>
    where
        E: From<io::Error>,
    {
        loop {
            let chunk = self.inner.fill_buf()?;
            if chunk.is_empty() {
                return Ok(());
            }
            let n = chunk.len();
            each(chunk)?;
            self.inner.consume(n);
        }
    }
}

pub fn bounded_from_path<P: AsRef<Path>>(
    path: P,
    cap: usize,
) -> io::Result<BoundedBufReader<File>> {
    let file = File::open(path)?;
    Ok(BoundedBufReader::with_capacity(cap, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_reads_preserve_order() {
        let mut b = ChannelBuffer::new();
        b.write(b"hello ");
        b.write(b"world");
        let mut buf = [0u8; 4];
        let mut got = Vec::new();
        loop {
            let n = b.read_into(&mut buf);
            if n == 0 {
                break;
            }
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(got, b"hello world");
        assert!(b.is_empty());
        assert_eq!(b.total_written(), 11);
    }

    #[test]
    fn drain_after_partial_read() {
        let mut b = ChannelBuffer::new();
        b.write(b"abcdef");
        let mut buf = [0u8; 2];
        assert_eq!(b.read_into(&mut buf), 2);
        assert_eq!(b.drain_all(), b"cdef");
        assert_eq!(b.len(), 0);
    }

    #[test]
    fn chunks_cover_file() {
        let mut reader = BoundedBufReader::with_capacity(3, &b"abcdefg"[..]);
        let mut seen = Vec::new();
        reader
            .for_each_chunk(|c| {
                assert!(c.len() <= 3);
                seen.extend_from_slice(c);
                Ok::<(), io::Error>(())
            })
            .expect("chunks");
        assert_eq!(seen, b"abcdefg");
    }
}
