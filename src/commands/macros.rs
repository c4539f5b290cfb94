//! Macro commands
//!
//! Each command takes the shared [`MacroState`] and a request payload and
//! returns a response payload. Failures are reported in the response, never
//! as a panic or an `Err`, so a front-end can pass them straight through.

use super::types::*;
use crate::capture::input::InputCaptureChannel;
use crate::config::MacroConfig;
use crate::device::InputDevice;
use crate::error::{MacroError, MacroResult};
use crate::replay::{ReplayEngine, ReplayState};
use crate::store::SequenceStore;
use std::sync::Arc;

const ALREADY_RECORDING: &str = "Recording already in progress";
const ALREADY_PLAYING: &str = "Playback already in progress";

/// Owns the capture session, the replay engine and the macro store.
pub struct MacroState {
    pub recorder: Arc<InputCaptureChannel>,
    pub player: ReplayEngine,
    pub store: SequenceStore,
    config: MacroConfig,
}

impl MacroState {
    pub fn new(device: Arc<dyn InputDevice>, config: MacroConfig) -> MacroResult<Self> {
        let stop_keys = config.stop_keys()?;
        let store = SequenceStore::new(&config.macros_dir)?;

        Ok(Self {
            recorder: Arc::new(InputCaptureChannel::new(device.clone(), config.move_throttle())),
            player: ReplayEngine::new(device, stop_keys, config.stop_timeout()),
            store,
            config,
        })
    }

    pub fn config(&self) -> &MacroConfig {
        &self.config
    }

    /// Best-effort stop of capture and playback.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down gracefully...");
        self.recorder.stop();
        self.player.stop();
    }
}

async fn blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("Background task failed: {}", e))
}

/// Log a failed command (caller mistakes at warn, system faults at error)
/// and turn it into a response.
fn rejected(command: &str, error: MacroError) -> CommandResponse {
    if let MacroError::NotFound(name) = &error {
        tracing::warn!("{}: no macro named {:?}", command, name);
    } else if error.is_user_error() {
        tracing::warn!("{} rejected: {}", command, error);
    } else {
        tracing::error!("{} failed: {}", command, error);
    }
    CommandResponse::failure(error)
}

pub async fn start_recording(state: &MacroState) -> CommandResponse {
    match state.recorder.start() {
        Ok(started) => CommandResponse::from_flag(started, ALREADY_RECORDING),
        Err(e) => rejected("start_recording", e),
    }
}

/// Stop recording and auto-save what was captured.
pub async fn stop_recording(state: &MacroState) -> StopCaptureResponse {
    let success = state.recorder.stop();
    if !success {
        return StopCaptureResponse {
            success,
            events: Vec::new(),
            auto_saved: false,
            filepath: None,
        };
    }

    let events = state.recorder.get_events();
    let store = state.store.clone();
    let to_save = events.clone();
    let saved = blocking(move || store.autosave(&to_save)).await;

    let filepath = match saved {
        Ok(Ok(Some(path))) => {
            tracing::info!("Macro auto-saved to: {:?}", path);
            Some(path.to_string_lossy().into_owned())
        }
        Ok(Ok(None)) => None,
        Ok(Err(e)) => {
            tracing::error!("Auto-save failed: {}", e);
            None
        }
        Err(e) => {
            tracing::error!("Auto-save failed: {}", e);
            None
        }
    };

    StopCaptureResponse {
        success,
        events,
        auto_saved: filepath.is_some(),
        filepath,
    }
}

pub async fn get_event_count(state: &MacroState) -> EventCountResponse {
    EventCountResponse {
        count: state.recorder.event_count(),
    }
}

pub async fn save_macro(state: &MacroState, request: SaveMacroRequest) -> SaveMacroResponse {
    let fail = |error: String| SaveMacroResponse {
        success: false,
        filepath: None,
        error: Some(error),
    };

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return fail("Name is required".to_string());
    }
    if request.events.is_empty() {
        return fail("No events to save".to_string());
    }

    let store = state.store.clone();
    let description = request.description.trim().to_string();
    let events = request.events;
    match blocking(move || store.save(&name, &events, &description)).await {
        Ok(Ok(path)) => SaveMacroResponse {
            success: true,
            filepath: Some(path.to_string_lossy().into_owned()),
            error: None,
        },
        Ok(Err(e)) => fail(rejected("save_macro", e).error.unwrap_or_default()),
        Err(e) => fail(e),
    }
}

pub async fn play_macro(state: &MacroState, request: PlayMacroRequest) -> CommandResponse {
    match state
        .player
        .play(request.events, request.speed, request.repeat)
    {
        Ok(started) => CommandResponse::from_flag(started, ALREADY_PLAYING),
        Err(e) => rejected("play_macro", e),
    }
}

pub async fn play_saved_macro(state: &MacroState, request: PlaySavedMacroRequest) -> CommandResponse {
    let store = state.store.clone();
    let name = request.name.trim().to_string();
    let lookup = name.clone();
    let sequence = match blocking(move || store.load(&lookup)).await {
        Ok(Ok(Some(sequence))) => sequence,
        Ok(Ok(None)) => return rejected("play_saved_macro", MacroError::NotFound(name)),
        Ok(Err(e)) => return rejected("play_saved_macro", e),
        Err(e) => return CommandResponse::failure(e),
    };

    tracing::info!(
        "Playing saved macro {:?} ({} events)",
        sequence.name,
        sequence.events.len()
    );
    match state
        .player
        .play(sequence.events, request.speed, request.repeat)
    {
        Ok(started) => CommandResponse::from_flag(started, ALREADY_PLAYING),
        Err(e) => rejected("play_saved_macro", e),
    }
}

pub async fn play_macro_loop(state: &MacroState, request: PlayLoopRequest) -> CommandResponse {
    let delay = request.delay.unwrap_or(state.config.loop_delay_secs);
    match state.player.play_loop(request.events, request.speed, delay) {
        Ok(started) => CommandResponse::from_flag(started, ALREADY_PLAYING),
        Err(e) => rejected("play_macro_loop", e),
    }
}

/// Stop playback. Waits for the playback thread off the async runtime.
pub async fn stop_playback(state: &MacroState) -> CommandResponse {
    let player = state.player.clone();
    match blocking(move || player.stop()).await {
        Ok(_) => CommandResponse::ok(),
        Err(e) => CommandResponse::failure(e),
    }
}

pub async fn list_macros(state: &MacroState) -> ListMacrosResponse {
    let store = state.store.clone();
    let macros = match blocking(move || store.list()).await {
        Ok(Ok(macros)) => macros,
        Ok(Err(e)) => {
            tracing::warn!("Could not list macros: {}", e);
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Could not list macros: {}", e);
            Vec::new()
        }
    };
    ListMacrosResponse { macros }
}

pub async fn delete_macro(state: &MacroState, request: DeleteMacroRequest) -> CommandResponse {
    let store = state.store.clone();
    let name = request.name.trim().to_string();
    let target = name.clone();
    match blocking(move || store.delete(&target)).await {
        Ok(Ok(true)) => CommandResponse::ok(),
        Ok(Ok(false)) => rejected("delete_macro", MacroError::NotFound(name)),
        Ok(Err(e)) => rejected("delete_macro", e),
        Err(e) => CommandResponse::failure(e),
    }
}

pub async fn get_status(state: &MacroState) -> StatusResponse {
    let replay = state.player.state();
    StatusResponse {
        recording: state.recorder.is_recording(),
        playing: replay != ReplayState::Idle,
        looping: replay == ReplayState::Looping,
        event_count: state.recorder.event_count(),
    }
}
