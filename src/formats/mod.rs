//! Built-in image formats.

#[cfg(feature = "gif")]
pub mod gif;
pub mod png;
pub mod webp;
