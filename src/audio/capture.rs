use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::traits::{Consumer as _, Observer as _, Producer as _, Split as _};
use ringbuf::{HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::resampler::{resample_to_target, TARGET_SAMPLE_RATE};
use crate::stt_client::{AudioClip, RecognitionError};

/// Extra ring buffer room beyond the requested recording length
const BUFFER_HEADROOM_SECONDS: u32 = 2;

/// Audio device information
#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub name: String,
    pub is_default: bool,
}

/// List available input devices
pub fn list_input_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let mut devices = Vec::new();
    for device in host
        .input_devices()
        .context("Failed to enumerate input devices")?
    {
        if let Ok(name) = device.name() {
            devices.push(AudioDevice {
                is_default: name == default_name,
                name,
            });
        }
    }

    Ok(devices)
}

/// Get device by name or return default
pub fn get_device(device_id: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    match device_id {
        Some(id) if id != "default" => {
            for device in host.input_devices().context("Failed to enumerate devices")? {
                if matches!(device.name(), Ok(ref name) if name == id) {
                    return Ok(device);
                }
            }
            anyhow::bail!("Device not found: {}", id);
        }
        _ => host
            .default_input_device()
            .context("No default input device available"),
    }
}

/// Selected audio configuration with both stream config and sample format
pub struct SelectedConfig {
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
}

/// Select an input configuration, preferring mono
pub fn select_input_config(device: &Device) -> Result<SelectedConfig> {
    if let Ok(supported) = device.supported_input_configs() {
        for config_range in supported {
            if config_range.channels() == 1 {
                let supported_config = config_range.with_max_sample_rate();
                debug!(
                    "Selected mono config: {} Hz, format {:?}",
                    supported_config.sample_rate().0,
                    supported_config.sample_format()
                );
                return Ok(SelectedConfig {
                    config: supported_config.clone().into(),
                    sample_format: supported_config.sample_format(),
                });
            }
        }
    }

    // Fall back to default (first channel is kept in the callback)
    let supported_config = device
        .default_input_config()
        .context("No default input config")?;
    debug!(
        "Using default config: {} Hz, {} channels, format {:?}",
        supported_config.sample_rate().0,
        supported_config.channels(),
        supported_config.sample_format()
    );
    Ok(SelectedConfig {
        config: supported_config.clone().into(),
        sample_format: supported_config.sample_format(),
    })
}

/// Input stream writing first-channel samples into a ring buffer
struct AudioCapture {
    stream: Stream,
    overflow_counter: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
}

impl AudioCapture {
    fn new(
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        mut producer: HeapProd<f32>,
    ) -> Result<Self> {
        let channels = usize::from(config.channels.max(1));
        let overflow_counter = Arc::new(AtomicU64::new(0));
        let overflow = overflow_counter.clone();
        let is_running = Arc::new(AtomicBool::new(false));
        let running = is_running.clone();

        info!(
            "Building input stream: {} Hz, {} channels, format {:?}",
            config.sample_rate.0, channels, sample_format
        );

        let error_callback = |err| {
            error!("Audio stream error: {}", err);
        };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _| {
                    if running.load(Ordering::Relaxed) {
                        push_frames(data, channels, &mut producer, &overflow, |s| s);
                    }
                },
                error_callback,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _| {
                    if running.load(Ordering::Relaxed) {
                        push_frames(data, channels, &mut producer, &overflow, |s| {
                            s as f32 / 32768.0
                        });
                    }
                },
                error_callback,
                None,
            ),
            SampleFormat::U8 => device.build_input_stream(
                config,
                move |data: &[u8], _| {
                    if running.load(Ordering::Relaxed) {
                        // u8 is unsigned: 0-255, with 128 as center
                        push_frames(data, channels, &mut producer, &overflow, |s| {
                            (s as f32 - 128.0) / 128.0
                        });
                    }
                },
                error_callback,
                None,
            ),
            _ => anyhow::bail!("Unsupported sample format: {:?}", sample_format),
        }
        .context("Failed to build input stream")?;

        Ok(Self {
            stream,
            overflow_counter,
            is_running,
        })
    }

    fn start(&self) -> Result<()> {
        self.is_running.store(true, Ordering::SeqCst);
        self.stream.play().context("Failed to start audio stream")?;
        info!("Audio capture started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.is_running.store(false, Ordering::SeqCst);
        self.stream.pause().context("Failed to stop audio stream")?;
        info!("Audio capture stopped");
        Ok(())
    }

    fn overflow_count(&self) -> u64 {
        self.overflow_counter.load(Ordering::Relaxed)
    }
}

/// Push the first channel of each frame, counting overflows
fn push_frames<T: Copy>(
    data: &[T],
    channels: usize,
    producer: &mut HeapProd<f32>,
    overflow_counter: &AtomicU64,
    convert: impl Fn(T) -> f32,
) {
    for frame in data.chunks(channels) {
        if producer.try_push(convert(frame[0])).is_err() {
            overflow_counter.fetch_add(1, Ordering::Relaxed);
            break;
        }
    }
}

/// Ring buffer capacity for a recording of `seconds` at `sample_rate`
fn ring_buffer_capacity(sample_rate: u32, seconds: u32) -> usize {
    (sample_rate as usize) * (seconds + BUFFER_HEADROOM_SECONDS) as usize
}

fn record(device_id: Option<&str>, duration: Duration) -> Result<AudioClip> {
    let device = get_device(device_id)?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio device: {}", device_name);

    let selected = select_input_config(&device)?;
    let sample_rate = selected.config.sample_rate.0;

    let seconds = duration.as_secs().max(1) as u32;
    let ring = HeapRb::<f32>::new(ring_buffer_capacity(sample_rate, seconds));
    let (producer, mut consumer) = ring.split();

    let capture = AudioCapture::new(&device, &selected.config, selected.sample_format, producer)?;
    capture.start()?;
    std::thread::sleep(duration);
    capture.stop()?;

    if capture.overflow_count() > 0 {
        warn!("Audio overflows detected: {}", capture.overflow_count());
    }

    let mut samples = vec![0.0f32; consumer.occupied_len()];
    let read = consumer.pop_slice(&mut samples);
    samples.truncate(read);
    debug!("Captured {} samples at {} Hz", samples.len(), sample_rate);

    let resampled = resample_to_target(&samples, sample_rate)?;
    Ok(AudioClip::new(resampled, TARGET_SAMPLE_RATE))
}

/// Record from a device (or the default) for `duration`, returning 16 kHz mono audio.
///
/// Blocks the calling thread for the whole recording.
pub fn record_clip(device_id: Option<&str>, duration: Duration) -> Result<AudioClip, RecognitionError> {
    record(device_id, duration).map_err(|e| RecognitionError::Audio(format!("{:#}", e)))
}
