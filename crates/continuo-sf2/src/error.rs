//! Error types for continuo-sf2.

use thiserror::Error;

/// Result type alias for continuo-sf2 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a SoundFont bank.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying byte stream failed or came up short.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream is not a RIFF file with an `sfbk` form.
    #[error("not a SoundFont 2 file (missing RIFF/sfbk header)")]
    NotSoundFont,

    /// A required sub-chunk is absent.
    #[error("missing required chunk '{0}'")]
    MissingChunk(&'static str),

    /// A pdta sub-chunk's size is not a multiple of its record size.
    #[error("chunk '{chunk}' has size {size}, not a multiple of {record_size}")]
    MisalignedChunk {
        chunk: &'static str,
        size: u32,
        record_size: u32,
    },

    /// The file's `ifil` version tag names a major version other than 2.
    #[error("unsupported SoundFont version {major}.{minor:02}")]
    UnsupportedVersion { major: u16, minor: u16 },
}
