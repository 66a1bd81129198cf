use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};
use tracing::debug;

/// Sample rate uploaded for transcription
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Chunk size fed to the FFT resampler
const INPUT_FRAMES: usize = 1024;

/// Audio resampler wrapper for converting device sample rate to 16kHz
pub struct AudioResampler {
    resampler: FftFixedIn<f32>,
    input_buffer: Vec<Vec<f32>>,
    output_buffer: Vec<Vec<f32>>,
    input_frames: usize,
}

impl AudioResampler {
    /// Create a new resampler from device sample rate to 16kHz
    pub fn new(device_sample_rate: u32) -> Result<Self> {
        debug!(
            "Creating resampler: {} Hz -> {} Hz (ratio: {:.4})",
            device_sample_rate,
            TARGET_SAMPLE_RATE,
            TARGET_SAMPLE_RATE as f64 / device_sample_rate as f64
        );

        let channels = 1;
        let resampler = FftFixedIn::new(
            device_sample_rate as usize,
            TARGET_SAMPLE_RATE as usize,
            INPUT_FRAMES,
            2, // sub_chunks for quality
            channels,
        )
        .context("Failed to create resampler")?;

        let input_buffer = vec![vec![0.0f32; INPUT_FRAMES]; channels];
        let output_buffer = resampler.output_buffer_allocate(true);

        Ok(Self {
            resampler,
            input_buffer,
            output_buffer,
            input_frames: INPUT_FRAMES,
        })
    }

    /// Number of input samples required per `process` call
    pub fn input_frames_next(&self) -> usize {
        self.input_frames
    }

    /// Resample exactly `input_frames_next()` samples
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_frames {
            anyhow::bail!(
                "Input length {} doesn't match expected {}",
                input.len(),
                self.input_frames
            );
        }

        self.input_buffer[0].copy_from_slice(input);

        let (_, output_frames) = self
            .resampler
            .process_into_buffer(&self.input_buffer, &mut self.output_buffer, None)
            .context("Resampling failed")?;

        Ok(self.output_buffer[0][..output_frames].to_vec())
    }
}

/// Resample a whole recording to [`TARGET_SAMPLE_RATE`].
///
/// The final partial chunk is zero-padded, so the output may carry a few
/// milliseconds of trailing silence.
pub fn resample_to_target(samples: &[f32], sample_rate: u32) -> Result<Vec<f32>> {
    if sample_rate == TARGET_SAMPLE_RATE || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = AudioResampler::new(sample_rate)?;
    let frames = resampler.input_frames_next();
    let expected = (samples.len() as u64 * TARGET_SAMPLE_RATE as u64 / sample_rate as u64) as usize;
    let mut output = Vec::with_capacity(expected + frames);
    let mut chunk = vec![0.0f32; frames];

    for piece in samples.chunks(frames) {
        chunk[..piece.len()].copy_from_slice(piece);
        chunk[piece.len()..].fill(0.0);
        output.extend(resampler.process(&chunk)?);
    }

    Ok(output)
}
