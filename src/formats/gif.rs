//! GIF detection and first-frame extraction.
//!
//! Detection never parses the block structure. It slides a 3-byte window
//! over the stream counting graphic control extension introducers that
//! follow a block terminator; two or more mean at least two frames.
//! Extraction decodes the first frame to RGBA and re-encodes it as a PNG,
//! since a truncated GIF byte range is rarely a valid image on its own.

use std::io::{Read, Write};

use gif::ColorOutput;

use crate::error::{Error, Result};
use crate::registry::{Animation, Format};
use crate::window::WindowedReader;

/// Block terminator followed by a graphic control extension introducer.
/// Every frame after the header block opens with this sequence.
const GCE_PATTERN: [u8; 3] = [0x00, b'!', 0xF9];

const TRAILER: u8 = 0x3B;

/// A single decoded frame, ready for re-encoding.
pub struct DecodedFrame {
    pub width: u16,
    pub height: u16,
    /// Tightly packed 8-bit RGBA, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// Decodes the first frame of a GIF stream.
///
/// Injectable so callers can swap in a hardened or instrumented decoder.
pub trait FrameDecoder: Send + Sync {
    fn decode_first_frame(&self, src: &mut dyn Read) -> Result<DecodedFrame>;
}

pub struct Gif {
    decoder: Box<dyn FrameDecoder>,
}

impl Gif {
    /// GIF format backed by the default LZW decoder.
    pub fn new() -> Self {
        Self::with_decoder(Box::new(LzwFrameDecoder))
    }

    pub fn with_decoder(decoder: Box<dyn FrameDecoder>) -> Self {
        Self { decoder }
    }
}

impl Default for Gif {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for Gif {
    fn name(&self) -> &'static str {
        "gif"
    }

    fn magic(&self) -> &'static [u8] {
        b"GIF8?a"
    }

    fn is_animated(&self, src: &mut dyn Read) -> Result<Animation> {
        detect(src)
    }

    fn render_first_frame(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<()> {
        let frame = self.decoder.decode_first_frame(src)?;
        encode_png(&frame, dst)
    }
}

fn detect(src: &mut dyn Read) -> Result<Animation> {
    let mut wr = WindowedReader::new(src, GCE_PATTERN.len());
    let mut window = [0u8; GCE_PATTERN.len()];
    let mut frames = 0u32;
    let mut last_byte = None;

    loop {
        let got = wr.read_window(&mut window)?;
        if got == 0 {
            // A well-formed GIF ends with the trailer byte. Anything else
            // is a truncated prefix, and a second frame may still follow.
            return Ok(match last_byte {
                Some(TRAILER) => Animation::Still,
                _ => Animation::Inconclusive,
            });
        }
        last_byte = Some(window[got - 1]);
        if got == window.len() && window == GCE_PATTERN {
            frames += 1;
            if frames >= 2 {
                return Ok(Animation::Animated);
            }
        }
    }
}

/// Default decoder built on the `gif` crate's streaming LZW decoder.
pub struct LzwFrameDecoder;

impl FrameDecoder for LzwFrameDecoder {
    fn decode_first_frame(&self, src: &mut dyn Read) -> Result<DecodedFrame> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(ColorOutput::RGBA);
        let mut decoder = options
            .read_info(src)
            .map_err(|e| Error::from_codec("gif", e))?;

        let frame = decoder
            .read_next_frame()
            .map_err(|e| Error::from_codec("gif", e))?
            .ok_or(Error::InvalidFormat {
                format: "gif",
                detail: "no frames in stream",
            })?;
        Ok(DecodedFrame {
            width: frame.width,
            height: frame.height,
            rgba: frame.buffer.to_vec(),
        })
    }
}

fn encode_png(frame: &DecodedFrame, dst: &mut dyn Write) -> Result<()> {
    let mut encoder = png::Encoder::new(dst, u32::from(frame.width), u32::from(frame.height));
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| Error::from_codec("png", e))?;
    writer
        .write_image_data(&frame.rgba)
        .map_err(|e| Error::from_codec("png", e))?;
    writer.finish().map_err(|e| Error::from_codec("png", e))?;
    Ok(())
}
