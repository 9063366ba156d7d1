//! Library error type.
//!
//! Configuration problems and unusable reference signals are reported before
//! any output is produced. Degenerate correlation windows and target signals
//! without detected events are not errors (see [`crate::correlate`] and
//! [`crate::mask::peak_threshold`]).
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(
        "reference signal has no usable events for the pattern template \
         ({detected} detected, the first is always discarded)"
    )]
    InsufficientReferenceEvents { detected: usize },

    #[error(
        "reference event at sample {index} needs a window of ±{pattern_len} \
         samples but the signal has only {len} samples"
    )]
    PeakOutOfRange { index: usize, pattern_len: usize, len: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("event detector failed")]
    Detector(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FilterError>;
