//! Minimal streaming reader for RIFF-family containers.
//!
//! Parses the outer `RIFF` header, exposes the form type, and iterates
//! top-level chunk headers. The reader itself implements [`Read`] for the
//! current chunk's payload; advancing to the next chunk drains whatever is
//! left of the current one, including the alignment pad byte after
//! odd-length payloads.

use std::io::{self, Read};

use crate::error::{Error, Result};

/// Four-character chunk identifier.
pub type FourCc = [u8; 4];

/// Streaming RIFF chunk iterator.
#[derive(Debug)]
pub struct RiffReader<R> {
    inner: R,
    /// Bytes of the list payload not yet consumed from the stream.
    remaining: u32,
    /// Unread payload bytes of the current chunk.
    chunk_unread: u32,
    /// Whether the current chunk carries a trailing pad byte.
    chunk_padded: bool,
}

impl<R: Read> RiffReader<R> {
    /// Read the `RIFF` header and return the container's form type along
    /// with a chunk iterator positioned before the first chunk.
    pub fn new(mut inner: R) -> Result<(FourCc, Self)> {
        let mut header = [0u8; 12];
        inner.read_exact(&mut header)?;
        if &header[..4] != b"RIFF" {
            return Err(Error::MalformedContainer {
                format: "riff",
                detail: "missing RIFF tag",
            });
        }
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if size < 4 {
            return Err(Error::MalformedContainer {
                format: "riff",
                detail: "declared size too small for a form type",
            });
        }
        let form = [header[8], header[9], header[10], header[11]];
        Ok((
            form,
            Self {
                inner,
                remaining: size - 4,
                chunk_unread: 0,
                chunk_padded: false,
            },
        ))
    }

    /// Advance to the next chunk header, returning its identifier and
    /// payload length, or `None` at the end of the container.
    ///
    /// Any unread payload of the previous chunk is consumed first.
    pub fn next_chunk(&mut self) -> Result<Option<(FourCc, u32)>> {
        self.drain_current()?;

        if self.remaining == 0 {
            return Ok(None);
        }
        if self.remaining < 8 {
            return Err(Error::MalformedContainer {
                format: "riff",
                detail: "trailing bytes too short for a chunk header",
            });
        }

        let mut header = [0u8; 8];
        self.inner.read_exact(&mut header)?;
        self.remaining -= 8;

        let id = [header[0], header[1], header[2], header[3]];
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let padded = u64::from(len) + u64::from(len % 2);
        if padded > u64::from(self.remaining) {
            return Err(Error::MalformedContainer {
                format: "riff",
                detail: "chunk overruns the container",
            });
        }
        self.chunk_unread = len;
        self.chunk_padded = len % 2 == 1;
        Ok(Some((id, len)))
    }

    /// Discard the rest of the current chunk's payload and pad byte.
    fn drain_current(&mut self) -> Result<()> {
        let skip = u64::from(self.chunk_unread) + u64::from(self.chunk_padded);
        if skip == 0 {
            return Ok(());
        }
        // chunk payload reads go through our Read impl so the counters stay
        // consistent; the pad byte is consumed from the raw stream below
        let payload = u64::from(self.chunk_unread);
        let copied = io::copy(&mut self.by_ref().take(payload), &mut io::sink())?;
        debug_assert_eq!(copied, payload);
        if self.chunk_padded {
            let mut pad = [0u8; 1];
            self.inner.read_exact(&mut pad)?;
            self.remaining -= 1;
            self.chunk_padded = false;
        }
        Ok(())
    }
}

impl<R: Read> Read for RiffReader<R> {
    /// Read from the current chunk's payload; `Ok(0)` once it is
    /// exhausted. A stream that ends before the declared payload length is
    /// an `UnexpectedEof` error, not a short chunk.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.chunk_unread == 0 {
            return Ok(0);
        }
        let want = buf.len().min(self.chunk_unread as usize);
        let got = self.inner.read(&mut buf[..want])?;
        if got == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "riff chunk truncated",
            ));
        }
        self.chunk_unread -= got as u32;
        self.remaining -= got as u32;
        Ok(got)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(id);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn container(form: &[u8; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: usize = chunks.iter().map(Vec::len).sum();
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((4 + body) as u32).to_le_bytes());
        out.extend_from_slice(form);
        for c in chunks {
            out.extend_from_slice(c);
        }
        out
    }

    #[test]
    fn walks_chunks_in_order() {
        let data = container(
            b"WEBP",
            &[chunk(b"VP8X", &[1u8; 10]), chunk(b"ANIM", &[2u8; 6])],
        );
        let (form, mut riff) = RiffReader::new(Cursor::new(data)).unwrap();
        assert_eq!(&form, b"WEBP");

        let (id, len) = riff.next_chunk().unwrap().unwrap();
        assert_eq!(&id, b"VP8X");
        assert_eq!(len, 10);
        let mut payload = [0u8; 10];
        riff.read_exact(&mut payload).unwrap();
        assert_eq!(payload, [1u8; 10]);

        let (id, len) = riff.next_chunk().unwrap().unwrap();
        assert_eq!(&id, b"ANIM");
        assert_eq!(len, 6);

        assert!(riff.next_chunk().unwrap().is_none());
    }

    #[test]
    fn drains_unread_payload_between_chunks() {
        let data = container(
            b"WEBP",
            &[chunk(b"AAAA", &[9u8; 40]), chunk(b"BBBB", b"ok")],
        );
        let (_, mut riff) = RiffReader::new(Cursor::new(data)).unwrap();

        // never touch AAAA's payload
        riff.next_chunk().unwrap().unwrap();
        let (id, _) = riff.next_chunk().unwrap().unwrap();
        assert_eq!(&id, b"BBBB");
        let mut payload = [0u8; 2];
        riff.read_exact(&mut payload).unwrap();
        assert_eq!(&payload, b"ok");
    }

    #[test]
    fn odd_payload_is_padded() {
        let data = container(b"WEBP", &[chunk(b"ODD ", &[7u8; 5]), chunk(b"NEXT", &[])]);
        let (_, mut riff) = RiffReader::new(Cursor::new(data)).unwrap();
        let (_, len) = riff.next_chunk().unwrap().unwrap();
        assert_eq!(len, 5);
        // the pad byte must not shift the next header
        let (id, _) = riff.next_chunk().unwrap().unwrap();
        assert_eq!(&id, b"NEXT");
    }

    #[test]
    fn chunk_read_is_capped_at_payload() {
        let data = container(b"WEBP", &[chunk(b"AAAA", b"abc" as &[u8]), chunk(b"BBBB", &[])]);
        let (_, mut riff) = RiffReader::new(Cursor::new(data)).unwrap();
        riff.next_chunk().unwrap().unwrap();
        let mut all = Vec::new();
        riff.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"abc");
    }

    #[test]
    fn rejects_non_riff_header() {
        let err = RiffReader::new(Cursor::new(b"LIST\x04\x00\x00\x00WEBP".to_vec())).unwrap_err();
        assert!(matches!(err, Error::MalformedContainer { .. }));
    }

    #[test]
    fn truncated_payload_is_unexpected_eof() {
        let mut data = container(b"WEBP", &[chunk(b"AAAA", &[1u8; 20])]);
        data.truncate(25);
        let (_, mut riff) = RiffReader::new(Cursor::new(data)).unwrap();
        riff.next_chunk().unwrap().unwrap();
        let mut payload = [0u8; 20];
        let err = riff.read_exact(&mut payload).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn chunk_longer_than_container_is_malformed() {
        let mut data = Vec::new();
        data.extend_from_slice(b"RIFF");
        data.extend_from_slice(&12u32.to_le_bytes());
        data.extend_from_slice(b"WEBP");
        data.extend_from_slice(b"AAAA");
        data.extend_from_slice(&100u32.to_le_bytes());
        let (_, mut riff) = RiffReader::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            riff.next_chunk(),
            Err(Error::MalformedContainer { .. })
        ));
    }
}
