//! APNG detection and first-frame extraction.
//!
//! Detection walks chunk headers through an 8-byte window looking for the
//! `acTL` animation control chunk before any `IDAT`. Extraction copies the
//! public chunks of the default image and terminates the output with a
//! synthesized `IEND`.
//!
//! References:
//! <https://www.w3.org/TR/PNG/> and the APNG specification.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::registry::{Animation, Format};
use crate::window::WindowedReader;

const SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Zero-length `IEND` chunk with its precomputed CRC.
const IEND_CHUNK: [u8; 12] = [
    0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82,
];

pub struct Png;

impl Format for Png {
    fn name(&self) -> &'static str {
        "png"
    }

    fn magic(&self) -> &'static [u8] {
        SIGNATURE
    }

    fn is_animated(&self, src: &mut dyn Read) -> Result<Animation> {
        detect(src)
    }

    fn render_first_frame(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<()> {
        extract(src, dst)
    }
}

fn detect(src: &mut dyn Read) -> Result<Animation> {
    let mut wr = WindowedReader::new(src, 8);
    let mut header = [0u8; 8];

    if wr.read_window(&mut header)? != 8 || header != *SIGNATURE {
        return Err(Error::InvalidFormat {
            format: "png",
            detail: "bad signature",
        });
    }
    // the window advanced one byte into the signature; step past the rest
    wr.skip(7)?;

    loop {
        if wr.read_window(&mut header)? != 8 {
            // stream ended on a chunk boundary before a decisive chunk
            return Ok(Animation::Inconclusive);
        }
        match &header[4..8] {
            b"acTL" => return Ok(Animation::Animated),
            // IDAT or IEND before acTL means a plain, still PNG
            b"IDAT" | b"IEND" => return Ok(Animation::Still),
            _ => {}
        }

        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        // rest of this header, then payload, then the 4 CRC bytes
        wr.skip(7)?;
        wr.skip(length as usize)?;
        wr.skip(4)?;
    }
}

fn extract(src: &mut dyn Read, dst: &mut dyn Write) -> Result<()> {
    let mut signature = [0u8; 8];
    read_exact_or_underflow(src, &mut signature)?;
    dst.write_all(&signature)?;

    let mut header = [0u8; 8];
    let mut saw_idat = false;
    loop {
        read_exact_or_underflow(src, &mut header)?;
        let kind = [header[4], header[5], header[6], header[7]];

        if &kind == b"fcTL" && saw_idat {
            // the default image is complete; fcTL opens the next frame
            dst.write_all(&IEND_CHUNK)?;
            return Ok(());
        }
        if &kind == b"IDAT" {
            saw_idat = true;
        }

        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let body = u64::from(length) + 4; // payload plus CRC

        // uppercase second byte marks a public chunk; private and APNG
        // control chunks are consumed but never forwarded
        let copied = if kind[1].is_ascii_uppercase() {
            dst.write_all(&header)?;
            io::copy(&mut (&mut *src).take(body), dst)?
        } else {
            io::copy(&mut (&mut *src).take(body), &mut io::sink())?
        };
        if copied < body {
            return Err(Error::Underflow);
        }
    }
}

fn read_exact_or_underflow(src: &mut dyn Read, buf: &mut [u8]) -> Result<()> {
    src.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Underflow,
        _ => Error::Io(e),
    })
}
