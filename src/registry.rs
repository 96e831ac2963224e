//! Format registry and stream sniffing.
//!
//! Formats register once with a name, a magic byte pattern, and the two
//! capabilities every format provides: animation detection and first-frame
//! extraction. Sniffing peeks the stream's leading bytes against each
//! registered pattern in registration order; the first match wins, and the
//! matched format then observes the stream from its original start.

use std::io::{self, Read, Write};
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{Error, Result};
use crate::window::read_full;

/// Byte that matches any input byte at its position in a magic pattern.
pub const MAGIC_WILDCARD: u8 = b'?';

/// Outcome of animation detection.
///
/// `Inconclusive` means the stream ended before a decisive signal was
/// reached — a truncated prefix of an animated file and a short still file
/// can look identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Animation {
    Animated,
    Still,
    Inconclusive,
}

impl Animation {
    /// Collapse the verdict to a bool; `Inconclusive` counts as not
    /// animated.
    pub fn is_animated(self) -> bool {
        matches!(self, Animation::Animated)
    }

    /// Whether the stream held enough data for a definitive answer.
    pub fn is_decisive(self) -> bool {
        !matches!(self, Animation::Inconclusive)
    }
}

/// An image format's detection and extraction capabilities.
pub trait Format: Send + Sync {
    /// Short lowercase format name, e.g. `"gif"`.
    fn name(&self) -> &'static str;

    /// Magic byte template matched against the stream's leading bytes.
    /// [`MAGIC_WILDCARD`] positions match any byte.
    fn magic(&self) -> &'static [u8];

    /// Report whether the stream holds multiple animation frames, reading
    /// only as much as needed to decide.
    fn is_animated(&self, src: &mut dyn Read) -> Result<Animation>;

    /// Write a complete still image holding only the first frame to `dst`.
    /// The output container may differ from the input (e.g. GIF to PNG).
    fn render_first_frame(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<()>;
}

fn magic_matches(magic: &[u8], candidate: &[u8]) -> bool {
    magic.len() == candidate.len()
        && magic
            .iter()
            .zip(candidate)
            .all(|(&m, &c)| m == MAGIC_WILDCARD || m == c)
}

/// Ordered, append-only collection of registered formats.
///
/// Registration publishes a new snapshot under the write lock; lookups
/// clone the current snapshot and never observe a partially-appended list.
/// Registration order is match-priority order.
pub struct Registry {
    formats: RwLock<Arc<Vec<Arc<dyn Format>>>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            formats: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// A registry holding the built-in formats, in the order they would
    /// disambiguate: GIF, PNG, WEBP.
    pub fn with_builtin_formats() -> Self {
        let registry = Self::new();
        #[cfg(feature = "gif")]
        registry.register(Arc::new(crate::formats::gif::Gif::new()));
        registry.register(Arc::new(crate::formats::png::Png));
        registry.register(Arc::new(crate::formats::webp::Webp));
        registry
    }

    /// Append a format. Earlier registrations take sniffing priority.
    pub fn register(&self, format: Arc<dyn Format>) {
        let mut guard = self
            .formats
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(format);
        *guard = Arc::new(next);
    }

    fn snapshot(&self) -> Arc<Vec<Arc<dyn Format>>> {
        self.formats
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Detect whether `src` is animated; returns the verdict and the
    /// matched format's name.
    pub fn is_animated<R: Read>(&self, src: R) -> Result<(Animation, &'static str)> {
        let (format, mut src) = self.sniff(src)?;
        let verdict = format.is_animated(&mut src)?;
        Ok((verdict, format.name()))
    }

    /// Extract the first frame of `src` into `dst` as a complete still
    /// image; returns the matched format's name.
    ///
    /// On error the sink may hold a partial prefix of the output — discard
    /// it.
    pub fn render_first_frame<R: Read, W: Write>(&self, src: R, mut dst: W) -> Result<&'static str> {
        let (format, mut src) = self.sniff(src)?;
        format.render_first_frame(&mut src, &mut dst)?;
        Ok(format.name())
    }

    /// Match the stream's leading bytes against the registered patterns and
    /// hand back the winning format plus a reader that replays the peeked
    /// prefix before the rest of the stream.
    fn sniff<R: Read>(
        &self,
        mut src: R,
    ) -> Result<(Arc<dyn Format>, io::Chain<io::Cursor<Vec<u8>>, R>)> {
        let formats = self.snapshot();
        let longest = formats.iter().map(|f| f.magic().len()).max().unwrap_or(0);

        let mut prefix = vec![0u8; longest];
        let got = read_full(&mut src, &mut prefix)?;
        prefix.truncate(got);

        let matched = formats
            .iter()
            .find(|f| {
                let magic = f.magic();
                prefix.len() >= magic.len() && magic_matches(magic, &prefix[..magic.len()])
            })
            .cloned()
            .ok_or(Error::UnknownFormat)?;
        Ok((matched, io::Cursor::new(prefix).chain(src)))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtin_formats()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Process-wide registry, lazily initialized with the built-in formats.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::with_builtin_formats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test format that records every byte its detector receives.
    struct Recording {
        name: &'static str,
        magic: &'static [u8],
        seen: Mutex<Vec<u8>>,
    }

    impl Recording {
        fn new(name: &'static str, magic: &'static [u8]) -> Arc<Self> {
            Arc::new(Self {
                name,
                magic,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Format for Recording {
        fn name(&self) -> &'static str {
            self.name
        }
        fn magic(&self) -> &'static [u8] {
            self.magic
        }
        fn is_animated(&self, src: &mut dyn Read) -> Result<Animation> {
            let mut all = Vec::new();
            src.read_to_end(&mut all)?;
            *self.seen.lock().unwrap() = all;
            Ok(Animation::Animated)
        }
        fn render_first_frame(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<()> {
            let mut all = Vec::new();
            src.read_to_end(&mut all)?;
            dst.write_all(&all)?;
            Ok(())
        }
    }

    #[test]
    fn magic_wildcards() {
        assert!(magic_matches(b"GIF8?a", b"GIF87a"));
        assert!(magic_matches(b"GIF8?a", b"GIF89a"));
        assert!(!magic_matches(b"GIF8?a", b"GIF88b"));
        assert!(!magic_matches(b"GIF8?a", b"GIF87"));
        assert!(magic_matches(b"RIFF????WEBPVP8", b"RIFF\x10\x00\x00\x00WEBPVP8"));
    }

    #[test]
    fn unknown_format_surfaces_from_both_operations() {
        let registry = Registry::new();
        registry.register(Recording::new("fake", b"FAKE"));

        let err = registry.is_animated(&b"not it"[..]).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));

        let mut out = Vec::new();
        let err = registry
            .render_first_frame(&b"not it"[..], &mut out)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
    }

    #[test]
    fn short_stream_is_no_match_not_an_error() {
        let registry = Registry::new();
        registry.register(Recording::new("fake", b"FAKEMAGIC"));
        let err = registry.is_animated(&b"FA"[..]).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
    }

    #[test]
    fn registration_order_breaks_ties() {
        let registry = Registry::new();
        registry.register(Recording::new("first", b"OV"));
        registry.register(Recording::new("second", b"OVERLAP"));

        let (_, name) = registry.is_animated(&b"OVERLAPPING DATA"[..]).unwrap();
        assert_eq!(name, "first");
    }

    #[test]
    fn detector_observes_stream_from_the_start() {
        let registry = Registry::new();
        let fake = Recording::new("fake", b"FAKE");
        registry.register(fake.clone());
        // a second, longer magic forces sniffing to peek past FAKE's length
        registry.register(Recording::new("longer", b"LONGERMAGICYET"));

        let data = b"FAKE plus the rest of the payload";
        registry.is_animated(&data[..]).unwrap();
        assert_eq!(fake.seen.lock().unwrap().as_slice(), &data[..]);
    }

    #[test]
    fn sniffing_is_payload_independent() {
        let registry = Registry::new();
        registry.register(Recording::new("fake", b"FAKE"));
        for filler in [0x00u8, 0x7F, 0xFF] {
            let mut data = b"FAKE".to_vec();
            data.extend(std::iter::repeat_n(filler, 64));
            let (_, name) = registry.is_animated(&data[..]).unwrap();
            assert_eq!(name, "fake");
        }
    }

    #[test]
    fn concurrent_registration_and_lookup() {
        let registry = Registry::new();
        registry.register(Recording::new("fake", b"FAKE"));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let (verdict, name) = registry.is_animated(&b"FAKE data"[..]).unwrap();
                        assert_eq!(name, "fake");
                        assert!(verdict.is_animated());
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..100 {
                    registry.register(Recording::new("extra", b"EXTRAMAGIC"));
                }
            });
        });
        assert_eq!(registry.snapshot().len(), 102);
    }
}
