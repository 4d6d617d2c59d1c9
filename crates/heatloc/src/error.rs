//! See [`Error`].

use miette::Diagnostic;
use thiserror::Error;

/// Error types for this crate.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Box {start:?}..{end:?} lies outside of the integral image with shape {shape:?}")]
    #[diagnostic(
        code(heatloc::out_of_bounds),
        help("candidate corners are used as indices directly, they must be smaller than the shape")
    )]
    OutOfBounds {
        start: (usize, usize),
        end: (usize, usize),
        shape: (usize, usize),
    },

    #[error("Ground truth box has no extent (width: {width}, height: {height})")]
    #[diagnostic(
        code(heatloc::degenerate_ground_truth),
        help("skip or flag this sample, the scale error has no meaningful value")
    )]
    DegenerateGroundTruth { width: f64, height: f64 },

    #[error("Image has no extent (height: {height}, width: {width})")]
    #[diagnostic(
        code(heatloc::degenerate_image),
        help("the distance error is relative to the image diagonal, check the `image_size`")
    )]
    DegenerateImage { height: usize, width: usize },

    #[error("Expected {expected} parallel entries, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to read or write `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration")]
    ConfigDeserialize(#[from] toml::de::Error),

    #[error("Failed to (de)serialize json")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode message pack")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode message pack")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

impl Error {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Type alias for [`Result<T, Error>`].
pub type Result<T> = std::result::Result<T, Error>;
