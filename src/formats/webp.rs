//! Animated WebP detection and first-frame extraction.
//!
//! An extended-format WebP opens with a `VP8X` chunk whose flag byte
//! carries the animation bit. Extraction pulls the first `ANMF` frame's
//! bitstream subchunks out of the container and reassembles them into a
//! minimal non-animated extended-format file around the original canvas
//! size.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::registry::{Animation, Format};
use crate::riff::{FourCc, RiffReader};

const FCC_WEBP: FourCc = *b"WEBP";
const FCC_VP8X: FourCc = *b"VP8X";
const FCC_ANIM: FourCc = *b"ANIM";
const FCC_ANMF: FourCc = *b"ANMF";
const FCC_ALPH: FourCc = *b"ALPH";
const FCC_VP8: FourCc = *b"VP8 ";
const FCC_VP8L: FourCc = *b"VP8L";

/// VP8X feature flag bits.
const FLAG_ANIMATION: u8 = 0x02;
const FLAG_ALPHA: u8 = 0x10;

/// Frame-positioning and timing prologue at the start of an ANMF payload.
const ANMF_PROLOGUE_LEN: u32 = 16;

pub struct Webp;

impl Format for Webp {
    fn name(&self) -> &'static str {
        "webp"
    }

    fn magic(&self) -> &'static [u8] {
        b"RIFF????WEBPVP8"
    }

    fn is_animated(&self, src: &mut dyn Read) -> Result<Animation> {
        detect(src)
    }

    fn render_first_frame(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<()> {
        extract(src, dst)
    }
}

fn open(src: &mut dyn Read) -> Result<RiffReader<&mut dyn Read>> {
    let (form, riff) = RiffReader::new(src)?;
    if form != FCC_WEBP {
        return Err(Error::MalformedContainer {
            format: "webp",
            detail: "form type is not WEBP",
        });
    }
    Ok(riff)
}

fn detect(src: &mut dyn Read) -> Result<Animation> {
    let mut riff = open(src)?;
    let Some((id, _)) = riff.next_chunk()? else {
        return Err(Error::MalformedContainer {
            format: "webp",
            detail: "container has no chunks",
        });
    };
    if id != FCC_VP8X {
        // simple lossy or lossless file, no extended features at all
        return Ok(Animation::Still);
    }
    // the VP8X chunk is structurally present, so a missing flag byte is an
    // error rather than a negative
    let mut flags = [0u8; 1];
    riff.read_exact(&mut flags)?;
    Ok(if flags[0] & FLAG_ANIMATION != 0 {
        Animation::Animated
    } else {
        Animation::Still
    })
}

fn extract(src: &mut dyn Read, dst: &mut dyn Write) -> Result<()> {
    let mut riff = open(src)?;
    let mut canvas_size: Option<[u8; 6]> = None;

    loop {
        let Some((id, len)) = riff.next_chunk()? else {
            return Err(Error::MalformedContainer {
                format: "webp",
                detail: "no animation frame found",
            });
        };
        match id {
            FCC_VP8X => {
                let mut payload = [0u8; 10];
                riff.read_exact(&mut payload)?;
                if payload[0] & FLAG_ANIMATION == 0 {
                    return Err(Error::NotAnimated { format: "webp" });
                }
                // flag byte, 3 reserved bytes, then the 6-byte canvas size
                let mut size = [0u8; 6];
                size.copy_from_slice(&payload[4..10]);
                canvas_size = Some(size);
            }
            FCC_ANIM => {
                // global animation parameters, nothing to keep
            }
            FCC_ANMF => {
                let Some(canvas_size) = canvas_size else {
                    return Err(Error::MalformedContainer {
                        format: "webp",
                        detail: "ANMF before VP8X",
                    });
                };
                if len < ANMF_PROLOGUE_LEN {
                    return Err(Error::MalformedContainer {
                        format: "webp",
                        detail: "ANMF chunk shorter than its prologue",
                    });
                }
                let mut prologue = [0u8; ANMF_PROLOGUE_LEN as usize];
                riff.read_exact(&mut prologue)?;

                let (bitstream, has_alpha) =
                    read_frame_bitstream(&mut riff, len - ANMF_PROLOGUE_LEN)?;
                return write_still(dst, &canvas_size, has_alpha, &bitstream);
            }
            _ => {
                return Err(Error::MalformedContainer {
                    format: "webp",
                    detail: "unexpected top-level chunk",
                });
            }
        }
    }
}

/// Copy the ANMF frame's subchunks — an optional `ALPH` alpha plane
/// followed by one `VP8 `/`VP8L` bitstream — into a buffer, keeping the
/// RIFF framing and even-byte alignment intact.
fn read_frame_bitstream(riff: &mut impl Read, len: u32) -> Result<(Vec<u8>, bool)> {
    let mut bitstream = Vec::new();
    let mut has_alpha = false;
    let mut left = u64::from(len);

    while left > 0 {
        if left < 8 {
            return Err(Error::MalformedContainer {
                format: "webp",
                detail: "trailing ANMF bytes too short for a subchunk header",
            });
        }
        let mut header = [0u8; 8];
        riff.read_exact(&mut header)?;
        left -= 8;

        let id = [header[0], header[1], header[2], header[3]];
        let sub_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        match id {
            FCC_ALPH => has_alpha = true,
            FCC_VP8 | FCC_VP8L => {}
            _ => {
                return Err(Error::MalformedContainer {
                    format: "webp",
                    detail: "unexpected subchunk in ANMF",
                });
            }
        }

        let padded = u64::from(sub_len) + u64::from(sub_len % 2);
        if padded > left {
            return Err(Error::MalformedContainer {
                format: "webp",
                detail: "subchunk overruns the frame",
            });
        }

        bitstream.extend_from_slice(&header);
        let copied = io::copy(&mut riff.by_ref().take(u64::from(sub_len)), &mut bitstream)?;
        if copied < u64::from(sub_len) {
            return Err(Error::MalformedContainer {
                format: "webp",
                detail: "truncated subchunk",
            });
        }
        if sub_len % 2 == 1 {
            // consume the source pad byte and emit a fresh one
            let mut pad = [0u8; 1];
            riff.read_exact(&mut pad)?;
            bitstream.push(0);
        }
        left -= padded;
    }
    Ok((bitstream, has_alpha))
}

/// Assemble a minimal non-animated extended-format WebP around the frame
/// bitstream.
fn write_still(
    dst: &mut dyn Write,
    canvas_size: &[u8; 6],
    has_alpha: bool,
    bitstream: &[u8],
) -> Result<()> {
    let file_size = 4 // WEBP form type
        + 8 // VP8X chunk header
        + 10 // VP8X payload
        + bitstream.len() as u32;

    dst.write_all(b"RIFF")?;
    dst.write_all(&file_size.to_le_bytes())?;
    dst.write_all(&FCC_WEBP)?;

    dst.write_all(&FCC_VP8X)?;
    dst.write_all(&10u32.to_le_bytes())?;
    let flags = if has_alpha { FLAG_ALPHA } else { 0 };
    dst.write_all(&[flags, 0, 0, 0])?;
    dst.write_all(canvas_size)?;

    dst.write_all(bitstream)?;
    Ok(())
}
