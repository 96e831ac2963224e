//! Sliding-window lookahead over a byte stream.
//!
//! A [`WindowedReader`] yields a fixed-size view of the most recent bytes of
//! a stream, advancing by a single byte per call. Overlapping views let the
//! format detectors scan for multi-byte signatures without backtracking or
//! buffering the whole stream.

use std::io::{self, Read};

use crate::error::{Error, Result};

/// Fixed-size sliding window over an [`io::Read`] stream.
///
/// End-of-stream is reported the `io::Read` way: `Ok(0)`. Once observed it
/// is permanent — every later call returns `Ok(0)` again.
pub struct WindowedReader<R> {
    inner: R,
    window_size: usize,
    /// Trailing `window_size - 1` bytes of the last full window; `None`
    /// until the first successful read.
    previous: Option<Vec<u8>>,
    exhausted: bool,
}

impl<R: Read> WindowedReader<R> {
    pub fn new(inner: R, window_size: usize) -> Self {
        Self {
            inner,
            window_size,
            previous: None,
            exhausted: false,
        }
    }

    /// Fill `window` with the current window of bytes and return the count
    /// of valid bytes.
    ///
    /// Every successful call after the first advances the stream by exactly
    /// one byte. If the stream holds fewer than `window_size` bytes total,
    /// a single short read is returned before end-of-stream. `window` must
    /// be exactly `window_size` bytes long.
    pub fn read_window(&mut self, window: &mut [u8]) -> Result<usize> {
        if window.len() != self.window_size {
            return Err(Error::WindowLength {
                expected: self.window_size,
                actual: window.len(),
            });
        }
        if self.exhausted {
            return Ok(0);
        }
        if self.previous.is_none() {
            return self.first_window(window);
        }

        let mut next = [0u8; 1];
        if read_full(&mut self.inner, &mut next)? == 0 {
            self.exhausted = true;
            return Ok(0);
        }
        if let Some(previous) = self.previous.as_mut() {
            window[..previous.len()].copy_from_slice(previous);
            previous.rotate_left(1);
            if let Some(last) = previous.last_mut() {
                *last = next[0];
            }
        }
        window[self.window_size - 1] = next[0];
        Ok(self.window_size)
    }

    /// Prime the trailing context and produce the first window.
    fn first_window(&mut self, window: &mut [u8]) -> Result<usize> {
        let mut previous = vec![0u8; self.window_size - 1];
        let got = read_full(&mut self.inner, &mut previous)?;
        if got < previous.len() {
            self.exhausted = true;
            window[..got].copy_from_slice(&previous[..got]);
            return Ok(got);
        }

        let mut next = [0u8; 1];
        if read_full(&mut self.inner, &mut next)? == 0 {
            // The stream was exactly window_size - 1 bytes long.
            self.exhausted = true;
            window[..previous.len()].copy_from_slice(&previous);
            return Ok(previous.len());
        }

        window[..previous.len()].copy_from_slice(&previous);
        window[self.window_size - 1] = next[0];
        previous.rotate_left(1);
        if let Some(last) = previous.last_mut() {
            *last = next[0];
        }
        self.previous = Some(previous);
        Ok(self.window_size)
    }

    /// Advance the window by `n` positions, discarding the output.
    ///
    /// Observably equivalent to `n` `read_window` calls into a scratch
    /// buffer. Returns `n` on full success. If the stream ends mid-skip,
    /// returns the positions covered before exhaustion (at least 1);
    /// returns `Ok(0)` only when the stream was already exhausted before
    /// the call began. Once the trailing context is primed, the remainder
    /// of the skip discards in bulk instead of stepping byte by byte.
    pub fn skip(&mut self, n: usize) -> Result<usize> {
        if n == 0 {
            return Ok(0);
        }

        let mut scratch = vec![0u8; self.window_size];
        let mut stepped = 0usize;
        while stepped < n && self.previous.is_none() && !self.exhausted {
            match self.read_window(&mut scratch)? {
                0 => return Ok(if stepped == 0 { 0 } else { stepped + 1 }),
                _ => stepped += 1,
            }
        }
        if stepped == n {
            return Ok(n);
        }
        if self.exhausted {
            return Ok(if stepped == 0 { 0 } else { stepped + 1 });
        }

        // Bulk fast path: with the context primed, each position advances
        // the underlying stream by exactly one byte.
        let remaining = n - stepped;
        let mut consumed = 0usize;
        let mut buf = [0u8; 4096];
        while consumed < remaining {
            let want = (remaining - consumed).min(buf.len());
            let got = match self.inner.read(&mut buf[..want]) {
                Ok(0) => {
                    self.exhausted = true;
                    let covered = stepped + consumed;
                    return Ok(if covered == 0 { 0 } else { covered + 1 });
                }
                Ok(got) => got,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if let Some(previous) = self.previous.as_mut() {
                retain_tail(previous, &buf[..got]);
            }
            consumed += got;
        }
        Ok(n)
    }
}

/// Read until `buf` is full or the stream ends; returns the byte count.
pub(crate) fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(total)
}

/// Shift `chunk` into the tail of `previous`, keeping the last
/// `previous.len()` bytes of the combined sequence.
fn retain_tail(previous: &mut [u8], chunk: &[u8]) {
    let k = previous.len();
    if k == 0 || chunk.is_empty() {
        return;
    }
    if chunk.len() >= k {
        previous.copy_from_slice(&chunk[chunk.len() - k..]);
    } else {
        previous.rotate_left(chunk.len());
        previous[k - chunk.len()..].copy_from_slice(chunk);
    }
}
