//! Streaming animation detection and first-frame extraction for GIF,
//! APNG, and WebP.
//!
//! Deanimation answers two questions about an image byte stream: does it
//! animate, and what does a still version look like? Detection reads only
//! as far as it must to decide, so it is safe to point at large or
//! still-downloading sources. Extraction writes a complete single-frame
//! image to any [`std::io::Write`] sink; for PNG and WebP the output stays
//! in the original container, while GIF frames are re-encoded as PNG.
//!
//! ```no_run
//! use std::fs::File;
//!
//! fn main() -> deanimator::Result<()> {
//!     let (verdict, format) = deanimator::is_animated(File::open("in.gif")?)?;
//!     if verdict.is_animated() {
//!         let mut out = File::create("still.png")?;
//!         deanimator::render_first_frame(File::open("in.gif")?, &mut out)?;
//!         println!("deanimated a {format}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Custom formats implement [`Format`] and join the process-wide registry
//! through [`register_format`], or a caller-owned [`Registry`] for
//! isolated configuration.

#![forbid(unsafe_code)]

mod error;
pub mod formats;
mod registry;
mod riff;
mod window;

pub use error::{Error, Result};
pub use registry::{Animation, Format, MAGIC_WILDCARD, Registry};
pub use window::WindowedReader;

use std::io::{Read, Write};
use std::sync::Arc;

/// Add a format to the process-wide registry. Built-in formats keep
/// sniffing priority; later registrations are tried in order after them.
pub fn register_format(format: Arc<dyn Format>) {
    registry::global().register(format);
}

/// Detect whether `src` is animated using the process-wide registry.
/// Returns the verdict and the matched format's name.
pub fn is_animated<R: Read>(src: R) -> Result<(Animation, &'static str)> {
    registry::global().is_animated(src)
}

/// Extract the first frame of `src` into `dst` as a complete still image,
/// using the process-wide registry. Returns the matched format's name.
pub fn render_first_frame<R: Read, W: Write>(src: R, dst: W) -> Result<&'static str> {
    registry::global().render_first_frame(src, dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bytes_are_rejected() {
        let err = is_animated(&b"certainly not an image"[..]).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
    }

    #[test]
    fn sniffs_png_through_the_facade() {
        // signature + truncated body: enough to route, too short to decide
        let (verdict, format) = is_animated(&b"\x89PNG\r\n\x1a\n"[..]).unwrap();
        assert_eq!(format, "png");
        assert!(!verdict.is_decisive());
    }

    #[cfg(feature = "gif")]
    #[test]
    fn sniffs_both_gif_versions() {
        for magic in [&b"GIF87a"[..], &b"GIF89a"[..]] {
            let mut data = magic.to_vec();
            data.push(0x3B);
            let (_, format) = is_animated(&data[..]).unwrap();
            assert_eq!(format, "gif");
        }
    }

    #[test]
    fn sniffs_webp() {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&14u32.to_le_bytes());
        data.extend_from_slice(b"WEBPVP8 ");
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0, 0]);
        let (verdict, format) = is_animated(&data[..]).unwrap();
        assert_eq!(format, "webp");
        assert_eq!(verdict, Animation::Still);
    }
}
