//! Decoders for SAMI and SubRip subtitles into a shared caption timeline,
//! and an encoder from that timeline back to SubRip.

pub mod caption;
pub mod error;
pub mod markup;
pub mod parser;
pub mod sami;
pub mod serialiser;
pub mod source;

pub use caption::{strip_markup, Caption, HitStatus, Timeline};
pub use error::SubtitleError;
pub use source::Format;
