use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use macro_recorder::commands::macros;
use macro_recorder::commands::types::*;
use macro_recorder::device::{InputDevice, NoopDevice};
use macro_recorder::store::Sequence;
use macro_recorder::{MacroConfig, MacroError, MacroState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "macro-recorder")]
#[command(about = "Record and replay keyboard and mouse macros")]
#[command(version)]
struct Cli {
    /// Directory holding saved macros
    #[arg(long, global = true, env = "MACRO_RECORDER_DIR")]
    macros_dir: Option<PathBuf>,

    /// Combination that stops loop playback, e.g. "<ctrl>+s"
    #[arg(long, global = true, env = "MACRO_RECORDER_STOP_HOTKEY")]
    stop_hotkey: Option<String>,

    /// Log synthesized input instead of sending it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture input until Ctrl-C (or for a fixed duration)
    Record {
        /// Save under this name instead of auto-saving
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Play a saved macro
    Play {
        name: String,

        #[arg(short, long, default_value = "1.0")]
        speed: f64,

        #[arg(short, long, default_value = "1")]
        repeat: u32,
    },

    /// Play a saved macro until the stop hotkey, Escape or Ctrl-C
    Loop {
        name: String,

        #[arg(short, long, default_value = "1.0")]
        speed: f64,

        /// Seconds between passes
        #[arg(long)]
        delay: Option<f64>,
    },

    /// List saved macros
    List,

    /// Delete a saved macro
    Delete { name: String },

    /// Print one macro and its events
    Show { name: String },
}

fn open_device(dry_run: bool) -> Arc<dyn InputDevice> {
    #[cfg(feature = "rdev")]
    if !dry_run {
        return Arc::new(macro_recorder::device::native::RdevDevice::new());
    }

    #[cfg(not(feature = "rdev"))]
    if !dry_run {
        tracing::warn!("Built without native input support; running as --dry-run");
    }

    Arc::new(NoopDevice::new())
}

#[tokio::main]
async fn main() -> Result<()> {
    macro_recorder::init_tracing();
    let cli = Cli::parse();

    let mut config = MacroConfig::default();
    if let Some(dir) = cli.macros_dir {
        config.macros_dir = dir;
    }
    if let Some(hotkey) = cli.stop_hotkey {
        config.stop_hotkey = hotkey;
    }

    let state = Arc::new(
        MacroState::new(open_device(cli.dry_run), config).context("Failed to initialize")?,
    );

    match cli.command {
        Command::Record {
            name,
            description,
            duration,
        } => record(&state, name, description, duration).await,
        Command::Play {
            name,
            speed,
            repeat,
        } => {
            let response =
                macros::play_saved_macro(&state, PlaySavedMacroRequest { name, speed, repeat })
                    .await;
            check(response)?;
            wait_for_playback(&state).await
        }
        Command::Loop { name, speed, delay } => {
            let sequence = load(&state, &name)?;
            let response = macros::play_macro_loop(
                &state,
                PlayLoopRequest {
                    events: sequence.events,
                    speed,
                    delay,
                },
            )
            .await;
            check(response)?;
            println!(
                "Looping {:?}; press {} or Esc to stop",
                name,
                state.config().stop_hotkey
            );
            wait_for_playback(&state).await
        }
        Command::List => {
            let listed = macros::list_macros(&state).await;
            if listed.macros.is_empty() {
                println!("No saved macros in {}", state.store.dir().display());
            }
            for summary in listed.macros {
                let created = summary
                    .created
                    .map(|c| c.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<30} {:>7} events  {}  {}",
                    summary.name, summary.events_count, created, summary.description
                );
            }
            Ok(())
        }
        Command::Delete { name } => {
            check(macros::delete_macro(&state, DeleteMacroRequest { name: name.clone() }).await)?;
            println!("Deleted {:?}", name);
            Ok(())
        }
        Command::Show { name } => {
            let sequence = load(&state, &name)?;
            let stats = sequence.stats();
            println!(
                "{}: {} events, {} clicks, {} key presses, {:.1}s",
                sequence.name,
                sequence.events.len(),
                stats.clicks,
                stats.key_presses,
                stats.duration_secs
            );
            println!("{}", serde_json::to_string_pretty(&sequence)?);
            Ok(())
        }
    }
}

async fn record(
    state: &MacroState,
    name: Option<String>,
    description: String,
    duration: Option<f64>,
) -> Result<()> {
    check(macros::start_recording(state).await)?;
    println!("Recording... press Ctrl-C to stop");

    let limit = duration.and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, stopping recording");
        }
        _ = async {
            match limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        } => {}
    }

    let Some(name) = name else {
        let stopped = macros::stop_recording(state).await;
        println!("Captured {} events", stopped.events.len());
        match stopped.filepath {
            Some(path) => println!("Auto-saved to {}", path),
            None => println!("Nothing saved"),
        }
        return Ok(());
    };

    state.recorder.stop();
    let events = state.recorder.get_events();
    println!("Captured {} events", events.len());
    let saved = macros::save_macro(
        state,
        SaveMacroRequest {
            name,
            description,
            events,
        },
    )
    .await;
    match (saved.success, saved.filepath, saved.error) {
        (true, Some(path), _) => {
            println!("Saved to {}", path);
            Ok(())
        }
        (_, _, error) => bail!(error.unwrap_or_else(|| "Save failed".to_string())),
    }
}

/// Block until playback ends on its own, or stop it on Ctrl-C.
async fn wait_for_playback(state: &MacroState) -> Result<()> {
    let player = state.player.clone();
    let idle = tokio::task::spawn_blocking(move || player.wait_idle());

    tokio::select! {
        result = idle => {
            result.context("Playback wait failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, stopping playback");
            state.shutdown();
        }
    }
    Ok(())
}

fn load(state: &MacroState, name: &str) -> Result<Sequence> {
    let name = name.trim();
    state
        .store
        .load(name)?
        .ok_or_else(|| MacroError::NotFound(name.to_string()))
        .with_context(|| format!("Cannot open {:?}", name))
}

fn check(response: CommandResponse) -> Result<()> {
    match response.error {
        Some(error) if !response.success => bail!(error),
        _ if !response.success => bail!("Command failed"),
        _ => Ok(()),
    }
}
