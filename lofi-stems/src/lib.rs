//! Vocal removal for LOFI - stem separation backends

mod separator;

pub use separator::{
    song_base_name, SeparationError, SeparationResult, SpleeterSeparator, StemSeparator,
    ACCOMPANIMENT_STEM, VOCALS_STEM,
};
