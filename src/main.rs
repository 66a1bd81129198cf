use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use symptom_assistant::report::{render_json, render_outcome};
use symptom_assistant::{Assistant, Config, PlaybackHandle, QueryOutcome, Speaker};

/// Health query assistant: remedies, risk estimate and advice for symptoms
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Question to ask; runs interactively when no query source is given
    query: Vec<String>,

    /// Transcribe a WAV file and answer it
    #[arg(short, long, value_name = "WAV")]
    audio_file: Option<PathBuf>,

    /// Record a question from the microphone
    #[arg(long)]
    listen: bool,

    /// List available input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Read the advice aloud
    #[arg(short, long)]
    speak: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// Path to the config file (default: ~/.symptom-assistant/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat model name
    #[arg(short, long)]
    model: Option<String>,

    /// Input device name (use "default" or run with --list-devices)
    #[arg(short, long)]
    device: Option<String>,

    /// Transcription language code (e.g., "en", "auto")
    #[arg(short, long)]
    language: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.list_devices {
        return list_devices_and_exit();
    }

    let mut config = Config::load_with_env(args.config.as_deref())?;
    if let Some(model) = &args.model {
        config.chat_model = model.clone();
    }
    if let Some(device) = &args.device {
        config.input_device_id = (device != "default").then(|| device.clone());
    }
    if let Some(language) = &args.language {
        config.language = language.clone();
    }

    debug!("API: {}", config.api_base_url);
    debug!("Chat model: {}", config.chat_model);

    let speaker = args.speak.then(|| Speaker::new(config.speech.clone()));
    let assistant = Assistant::new(config).context("Failed to initialize assistant")?;

    let interrupt = Arc::new(Notify::new());
    spawn_interrupt_listener(interrupt.clone());

    let outcome = match interruptible(one_shot(&args, &assistant), &interrupt).await {
        Some(result) => result?,
        None => {
            eprintln!("Interrupted.");
            return Ok(());
        }
    };

    match outcome {
        Some(outcome) => {
            print_outcome(&outcome, args.json)?;
            if let Some(handle) = speaker.as_ref().and_then(|s| start_speaking(s, &outcome)) {
                wait_for_playback(handle, &interrupt).await;
            }
            Ok(())
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            interactive(stdin, &assistant, speaker.as_ref(), args.json, &interrupt).await
        }
    }
}

/// Answer the query given on the command line, if any
async fn one_shot(args: &Args, assistant: &Assistant) -> Result<Option<QueryOutcome>> {
    if let Some(path) = &args.audio_file {
        let (transcript, outcome) = assistant.handle_voice_file(path).await?;
        announce_transcript(&transcript, args.json);
        Ok(Some(outcome))
    } else if args.listen {
        let (transcript, outcome) = listen(assistant).await?;
        announce_transcript(&transcript, args.json);
        Ok(Some(outcome))
    } else if !args.query.is_empty() {
        Ok(Some(assistant.handle_query(&args.query.join(" ")).await?))
    } else {
        Ok(None)
    }
}

/// Forward every Ctrl+C to `interrupt` from a single listener task
fn spawn_interrupt_listener(interrupt: Arc<Notify>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("Received Ctrl+C");
            interrupt.notify_one();
        }
    });
}

/// Run `work` unless an interrupt arrives first
async fn interruptible<T>(work: impl Future<Output = T>, interrupt: &Notify) -> Option<T> {
    tokio::select! {
        output = work => Some(output),
        _ = interrupt.notified() => None,
    }
}

#[cfg(feature = "microphone")]
async fn listen(assistant: &Assistant) -> Result<(String, QueryOutcome)> {
    eprintln!(
        "Listening for {}s...",
        assistant.config().record_duration().as_secs()
    );
    Ok(assistant.handle_microphone().await?)
}

#[cfg(not(feature = "microphone"))]
async fn listen(_assistant: &Assistant) -> Result<(String, QueryOutcome)> {
    anyhow::bail!("Built without microphone support (enable the `microphone` feature)")
}

fn announce_transcript(transcript: &str, json: bool) {
    info!("Transcript: {}", transcript);
    if !json {
        println!("You said: {}\n", transcript);
    }
}

fn print_outcome(outcome: &QueryOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", render_json(outcome).context("Failed to serialize outcome")?);
    } else if matches!(outcome, QueryOutcome::Empty) {
        eprintln!("Please describe your symptoms.");
    } else {
        print!("{}", render_outcome(outcome));
    }
    Ok(())
}

fn start_speaking(speaker: &Speaker, outcome: &QueryOutcome) -> Option<PlaybackHandle> {
    let report = outcome.report()?;
    match speaker.speak(&report.advice) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Could not read advice aloud: {}", e);
            None
        }
    }
}

fn stop_playback(playback: &mut Option<PlaybackHandle>) -> bool {
    match playback.take() {
        Some(mut handle) => handle.stop(),
        None => false,
    }
}

/// Wait for playback to end; an interrupt stops it
async fn wait_for_playback(mut handle: PlaybackHandle, interrupt: &Notify) {
    loop {
        tokio::select! {
            _ = interrupt.notified() => {
                info!("Stopping playback...");
                handle.stop();
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                if handle.is_finished() {
                    break;
                }
            }
        }
    }

    if let Err(e) = handle.wait() {
        warn!("Playback failed: {}", e);
    }
}

/// How an interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Quit,
    Interrupted,
    EndOfInput,
}

/// Stop playback on an explicit exit; let it finish when input simply ran out
async fn finish_session(playback: Option<PlaybackHandle>, end: SessionEnd, interrupt: &Notify) {
    let Some(mut handle) = playback else { return };
    match end {
        SessionEnd::EndOfInput => wait_for_playback(handle, interrupt).await,
        SessionEnd::Quit | SessionEnd::Interrupted => {
            handle.stop();
        }
    }
}

/// Read queries line by line until end of input or `:quit`
async fn interactive<R>(
    reader: R,
    assistant: &Assistant,
    speaker: Option<&Speaker>,
    json: bool,
    interrupt: &Notify,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    eprintln!("Describe your symptoms (:stop ends playback, :quit exits).");

    let mut lines = reader.lines();
    let mut playback: Option<PlaybackHandle> = None;

    let end = loop {
        eprint!("> ");

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = interrupt.notified() => {
                if stop_playback(&mut playback) {
                    eprintln!("\nStopped.");
                    continue;
                }
                eprintln!();
                break SessionEnd::Interrupted;
            }
        };
        let Some(line) = line else { break SessionEnd::EndOfInput };

        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break SessionEnd::Quit,
            ":stop" => {
                if stop_playback(&mut playback) {
                    eprintln!("Stopped.");
                } else {
                    eprintln!("Nothing is playing.");
                }
                continue;
            }
            _ => {}
        }

        // a new question replaces whatever is still being read out
        stop_playback(&mut playback);

        match interruptible(assistant.handle_query(&line), interrupt).await {
            Some(Ok(outcome)) => {
                print_outcome(&outcome, json)?;
                playback = speaker.and_then(|s| start_speaking(s, &outcome));
            }
            Some(Err(e)) => {
                error!("Query failed: {}", e);
                eprintln!("{}", e);
            }
            None => eprintln!("\nCancelled."),
        }
    };

    finish_session(playback, end, interrupt).await;
    info!("Session complete ({:?})", end);
    Ok(())
}

#[cfg(feature = "microphone")]
fn list_devices_and_exit() -> Result<()> {
    use symptom_assistant::audio::list_input_devices;

    println!("Available input devices:\n");

    match list_input_devices() {
        Ok(devices) => {
            if devices.is_empty() {
                println!("  No input devices found.");
            } else {
                for device in devices {
                    let default_marker = if device.is_default { " (default)" } else { "" };
                    println!("  - {}{}", device.name, default_marker);
                }
            }
        }
        Err(e) => {
            error!("Failed to list devices: {}", e);
            println!("  Error: {}", e);
        }
    }

    Ok(())
}

#[cfg(not(feature = "microphone"))]
fn list_devices_and_exit() -> Result<()> {
    anyhow::bail!("Built without microphone support (enable the `microphone` feature)")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;
    use symptom_assistant::SpeechConfig;

    /// Speaker whose synthesizer writes `marker` after a short delay
    fn marker_speaker(dir: &Path, marker: &Path) -> Speaker {
        Speaker::new(SpeechConfig {
            synth_program: "sh".to_string(),
            synth_args: vec![
                "-c".to_string(),
                "sleep 0.3; echo spoken > \"$0\"".to_string(),
                marker.to_string_lossy().into_owned(),
            ],
            player_program: "true".to_string(),
            player_args: vec![],
            file_extension: "wav".to_string(),
            output_dir: Some(dir.to_path_buf()),
        })
    }

    #[tokio::test]
    async fn test_end_of_input_lets_playback_finish() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spoken");
        let handle = marker_speaker(dir.path(), &marker)
            .speak("rest and fluids")
            .unwrap();

        finish_session(Some(handle), SessionEnd::EndOfInput, &Notify::new()).await;
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_quit_stops_playback() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spoken");
        let handle = marker_speaker(dir.path(), &marker)
            .speak("rest and fluids")
            .unwrap();

        finish_session(Some(handle), SessionEnd::Quit, &Notify::new()).await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_interrupt_cuts_final_playback_short() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spoken");
        let handle = marker_speaker(dir.path(), &marker)
            .speak("rest and fluids")
            .unwrap();

        let interrupt = Notify::new();
        interrupt.notify_one();
        finish_session(Some(handle), SessionEnd::EndOfInput, &interrupt).await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_interruptible_returns_none_on_interrupt() {
        let interrupt = Notify::new();
        assert_eq!(interruptible(async { 7 }, &interrupt).await, Some(7));

        interrupt.notify_one();
        let pending = std::future::pending::<()>();
        assert!(interruptible(pending, &interrupt).await.is_none());
    }

    #[tokio::test]
    async fn test_session_reads_any_buffered_input() {
        let mut config = Config::default();
        config.api_key = Some("test".to_string());
        config.api_base_url = "http://127.0.0.1:1".to_string();
        let assistant = Assistant::new(config).unwrap();

        // commands and blank lines never reach the network
        let input: &[u8] = b":stop\n\n   \n:quit\n";
        interactive(input, &assistant, None, false, &Notify::new())
            .await
            .unwrap();
    }
}
