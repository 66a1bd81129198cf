//! Live microphone capture for voice queries (feature `microphone`)

pub mod capture;
pub mod resampler;

pub use capture::{get_device, list_input_devices, record_clip, select_input_config, AudioDevice};
pub use resampler::{resample_to_target, AudioResampler, TARGET_SAMPLE_RATE};
