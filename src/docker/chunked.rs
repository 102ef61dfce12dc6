//! Decoder of HTTP/1.1 chunked transfer encoding

use std::io::{self, BufRead, Read};

/// Reads the payload of a chunked body from `inner`
///
/// Chunk extensions and trailers are skipped.
pub struct Chunked<R> {
    inner: R,
    /// Bytes left in the current chunk
    remaining: u64,
    done: bool,
}

impl<R: BufRead> Chunked<R> {
    pub fn new(inner: R) -> Self {
        Chunked {
            inner,
            remaining: 0,
            done: false,
        }
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        let mut line = String::new();
        self.inner.read_line(&mut line)?;
        let size = line.trim_end().split(';').next().unwrap_or("").trim();
        self.remaining = u64::from_str_radix(size, 16).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid chunk size: {:?}", line),
            )
        })?;
        if self.remaining == 0 {
            loop {
                line.clear();
                if self.inner.read_line(&mut line)? == 0 || line.trim_end().is_empty() {
                    break;
                }
            }
            self.done = true;
        }
        Ok(())
    }
}

impl<R: BufRead> Read for Chunked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.remaining == 0 {
            if self.done {
                return Ok(0);
            }
            self.next_chunk()?;
        }
        let max = std::cmp::min(buf.len() as u64, self.remaining) as usize;
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Chunked body ends in the middle of a chunk",
            ));
        }
        self.remaining -= n as u64;
        if self.remaining == 0 {
            let mut crlf = [0; 2];
            self.inner.read_exact(&mut crlf)?;
        }
        Ok(n)
    }
}
