//! FIR band-pass design and zero-phase application.
//!
//! - [`design`]: Hamming-windowed sinc band-pass built from two lowpass
//!   prototypes.
//! - [`apply`]: FFT overlap-add convolution with the linear-phase delay
//!   removed.
//!
//! Used by [`PanTompkins`](crate::detect::PanTompkins) to isolate the
//! transient band before slope and energy are measured.

pub mod apply;
pub mod design;

pub use apply::{filter_1d, ZeroPhaseFir};
pub use design::{auto_filter_length, auto_trans_bandwidth, design_bandpass, firwin, hamming};
