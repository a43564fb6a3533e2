//! Audio formats, device capture and sample-rate conversion.

pub mod capture;
pub mod format;
pub mod resample;

pub use capture::AudioCapture;
pub use format::AudioFormat;
pub use resample::RateConverter;
