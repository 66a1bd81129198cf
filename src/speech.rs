//! Text-to-speech playback through external programs
//!
//! A synthesizer writes the spoken text to an audio file, then a player plays
//! it. Both run on a background thread owned by a [`PlaybackHandle`], which
//! can stop whichever process is currently running.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SpeechConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Playback failures
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Cannot speak empty text")]
    EmptyText,

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {code:?}")]
    Exit { program: String, code: Option<i32> },

    #[error("I/O error during playback: {0}")]
    Io(#[from] std::io::Error),

    #[error("Playback worker panicked")]
    WorkerPanicked,
}

type ChildSlot = Arc<Mutex<Option<Child>>>;

fn lock_slot(slot: &Mutex<Option<Child>>) -> MutexGuard<'_, Option<Child>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Substitute `{file}` then `{text}` in argument templates
fn expand_args(templates: &[String], file: &Path, text: &str) -> Vec<String> {
    let file = file.to_string_lossy();
    templates
        .iter()
        .map(|arg| arg.replace("{file}", &file).replace("{text}", text))
        .collect()
}

/// Starts playback jobs from a [`SpeechConfig`]
#[derive(Debug, Clone)]
pub struct Speaker {
    config: SpeechConfig,
}

impl Speaker {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    fn audio_path_for(&self, id: Uuid) -> PathBuf {
        let dir = self
            .config
            .output_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        dir.join(format!(
            "symptom-assistant-{}.{}",
            id, self.config.file_extension
        ))
    }

    /// Synthesize and play `text` in the background.
    ///
    /// Returns as soon as the worker thread is started; failures of the
    /// external programs are reported by [`PlaybackHandle::wait`].
    pub fn speak(&self, text: &str) -> Result<PlaybackHandle, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let id = Uuid::new_v4();
        let audio_path = self.audio_path_for(id);
        let steps = [
            Step {
                program: self.config.synth_program.clone(),
                args: expand_args(&self.config.synth_args, &audio_path, text),
            },
            Step {
                program: self.config.player_program.clone(),
                args: expand_args(&self.config.player_args, &audio_path, text),
            },
        ];

        let stop_flag = Arc::new(AtomicBool::new(false));
        let slot: ChildSlot = Arc::new(Mutex::new(None));

        let worker = {
            let stop_flag = stop_flag.clone();
            let slot = slot.clone();
            let audio_path = audio_path.clone();
            std::thread::Builder::new()
                .name(format!("playback-{}", id))
                .spawn(move || run_job(&steps, &audio_path, &stop_flag, &slot))?
        };

        info!("Playback {} started ({} chars)", id, text.chars().count());

        Ok(PlaybackHandle {
            id,
            audio_path,
            stop_flag,
            slot,
            worker: Some(worker),
        })
    }
}

struct Step {
    program: String,
    args: Vec<String>,
}

fn run_job(
    steps: &[Step],
    audio_path: &Path,
    stop_flag: &AtomicBool,
    slot: &Mutex<Option<Child>>,
) -> Result<(), SpeechError> {
    let mut result = Ok(());
    for step in steps {
        match run_step(step, stop_flag, slot) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    if audio_path.exists() {
        if let Err(e) = std::fs::remove_file(audio_path) {
            debug!("Could not remove {:?}: {}", audio_path, e);
        }
    }
    result
}

/// Run one program to completion; `Ok(false)` when playback was stopped
fn run_step(
    step: &Step,
    stop_flag: &AtomicBool,
    slot: &Mutex<Option<Child>>,
) -> Result<bool, SpeechError> {
    {
        // spawn under the lock so stop() either sees the child or we see the flag
        let mut guard = lock_slot(slot);
        if stop_flag.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let child = Command::new(&step.program)
            .args(&step.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: step.program.clone(),
                source,
            })?;
        debug!("Spawned {} (pid {})", step.program, child.id());
        *guard = Some(child);
    }

    loop {
        {
            let mut guard = lock_slot(slot);
            let Some(child) = guard.as_mut() else {
                // taken by stop()
                return Ok(false);
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    *guard = None;
                    if status.success() {
                        return Ok(true);
                    }
                    return Err(SpeechError::Exit {
                        program: step.program.clone(),
                        code: status.code(),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    *guard = None;
                    return Err(SpeechError::Io(e));
                }
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Owner of one running playback job.
///
/// Dropping the handle leaves playback running.
#[derive(Debug)]
pub struct PlaybackHandle {
    id: Uuid,
    audio_path: PathBuf,
    stop_flag: Arc<AtomicBool>,
    slot: ChildSlot,
    worker: Option<JoinHandle<Result<(), SpeechError>>>,
}

impl PlaybackHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path of the generated audio file (may not exist yet or any more)
    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Whether a synthesizer or player process is currently running
    pub fn is_running(&self) -> bool {
        lock_slot(&self.slot).is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Stop playback and delete the audio file.
    ///
    /// Returns true if a running process was killed. Safe to call repeatedly.
    pub fn stop(&mut self) -> bool {
        self.stop_flag.store(true, Ordering::SeqCst);

        let mut killed = false;
        if let Some(mut child) = lock_slot(&self.slot).take() {
            match child.try_wait() {
                Ok(Some(_)) => {}
                _ => match child.kill() {
                    Ok(()) => killed = true,
                    Err(e) => debug!("Kill failed for playback {}: {}", self.id, e),
                },
            }
            let _ = child.wait();
        }

        if self.audio_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.audio_path) {
                warn!("Could not remove {:?}: {}", self.audio_path, e);
            }
        }

        if killed {
            info!("Playback {} stopped", self.id);
        }
        killed
    }

    /// Block until playback ends, returning the first failure
    pub fn wait(mut self) -> Result<(), SpeechError> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| SpeechError::WorkerPanicked)?,
            None => Ok(()),
        }
    }
}
