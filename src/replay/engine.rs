use super::cancel::{CancelToken, Completion, FinishOnDrop};
use super::dispatch::execute_event;
use super::hotkey::HotkeyCancellationListener;
use crate::capture::input::types::RecordedEvent;
use crate::config::StopKeys;
use crate::device::InputDevice;
use crate::error::{MacroError, MacroResult};
use parking_lot::Mutex as ParkingMutex;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

/// What the engine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    Repeating { repeat: u32 },
    Looping,
}

type ListenerSlot = Arc<ParkingMutex<Option<HotkeyCancellationListener>>>;

struct ActiveReplay {
    mode: ReplayState,
    cancel: CancelToken,
    done: Completion,
    worker: Option<JoinHandle<()>>,
    listener: ListenerSlot,
}

impl ActiveReplay {
    fn is_running(&self) -> bool {
        !self.done.is_finished()
    }

    /// Cancel, wait up to `timeout` for the worker and join it.
    ///
    /// Returns `false` if the worker is still inside a device call when the
    /// timeout expires. It stays cancelled and is joined by a later call.
    fn shutdown(&mut self, timeout: Duration) -> bool {
        self.cancel.cancel();
        if let Some(listener) = self.listener.lock().take() {
            listener.stop();
        }

        if !self.done.wait_timeout(timeout) {
            tracing::warn!("Playback thread did not stop within {:?}", timeout);
            return false;
        }
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != std::thread::current().id() {
                let _ = worker.join();
            }
        }
        true
    }
}

struct EngineInner {
    device: Arc<dyn InputDevice>,
    stop_keys: StopKeys,
    stop_timeout: Duration,
    session: ParkingMutex<Option<ActiveReplay>>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(mut active) = self.session.get_mut().take() {
            active.shutdown(self.stop_timeout);
        }
    }
}

/// Replays recorded events on a background thread.
///
/// At most one playback runs at a time. Cloning yields another handle to the
/// same engine.
#[derive(Clone)]
pub struct ReplayEngine {
    inner: Arc<EngineInner>,
}

impl ReplayEngine {
    pub fn new(device: Arc<dyn InputDevice>, stop_keys: StopKeys, stop_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                device,
                stop_keys,
                stop_timeout,
                session: ParkingMutex::new(None),
            }),
        }
    }

    /// Play `events` `repeat` times at `speed`. Returns immediately.
    ///
    /// `Ok(false)` if another playback is running.
    pub fn play(&self, events: Vec<RecordedEvent>, speed: f64, repeat: u32) -> MacroResult<bool> {
        validate(&events, speed)?;

        let mut session = self.inner.session.lock();
        if !self.clear_finished(&mut session) {
            return Ok(false);
        }

        let cancel = CancelToken::new();
        let done = Completion::new();
        let device = self.inner.device.clone();
        let worker = {
            let cancel = cancel.clone();
            let done = done.clone();
            std::thread::Builder::new()
                .name("macro-playback".to_string())
                .spawn(move || {
                    let _finish = FinishOnDrop(done);
                    run_repeat(device.as_ref(), &events, speed, repeat, &cancel);
                })?
        };

        *session = Some(ActiveReplay {
            mode: ReplayState::Repeating { repeat },
            cancel,
            done,
            worker: Some(worker),
            listener: Arc::new(ParkingMutex::new(None)),
        });
        tracing::info!("Playback started (speed={}, repeat={})", speed, repeat);
        Ok(true)
    }

    /// Play `events` over and over until stopped, pausing `delay_secs`
    /// between passes. The stop hotkeys are active while it runs.
    ///
    /// `Ok(false)` if another playback is running.
    pub fn play_loop(
        &self,
        events: Vec<RecordedEvent>,
        speed: f64,
        delay_secs: f64,
    ) -> MacroResult<bool> {
        validate(&events, speed)?;
        let delay = Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::ZERO);

        let mut session = self.inner.session.lock();
        if !self.clear_finished(&mut session) {
            return Ok(false);
        }

        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        let listener = HotkeyCancellationListener::start(
            self.inner.device.clone(),
            &self.inner.stop_keys,
            move || {
                if let Some(inner) = weak.upgrade() {
                    ReplayEngine { inner }.stop();
                }
            },
        );
        let listener: ListenerSlot = Arc::new(ParkingMutex::new(Some(listener)));

        let cancel = CancelToken::new();
        let done = Completion::new();
        let device = self.inner.device.clone();
        let worker = {
            let cancel = cancel.clone();
            let done = done.clone();
            let listener = listener.clone();
            std::thread::Builder::new()
                .name("macro-loop".to_string())
                .spawn(move || {
                    let _finish = FinishOnDrop(done);
                    run_loop(device.as_ref(), &events, speed, delay, &cancel);
                    if let Some(listener) = listener.lock().take() {
                        listener.stop();
                    }
                })
        };
        let worker = match worker {
            Ok(worker) => worker,
            Err(e) => {
                if let Some(listener) = listener.lock().take() {
                    listener.stop();
                }
                return Err(e.into());
            }
        };

        *session = Some(ActiveReplay {
            mode: ReplayState::Looping,
            cancel,
            done,
            worker: Some(worker),
            listener,
        });
        tracing::info!("Loop playback started (speed={}, delay={:?})", speed, delay);
        Ok(true)
    }

    /// Stop the current playback and wait for its thread to exit.
    ///
    /// Once this returns no further events are dispatched, unless the worker
    /// was stuck in a device call past the stop timeout. Such a worker keeps
    /// the engine busy until it exits. Returns whether a playback was running.
    pub fn stop(&self) -> bool {
        let mut session = self.inner.session.lock();
        let Some(mut active) = session.take() else {
            return false;
        };

        let was_running = active.is_running();
        let looping = active.mode == ReplayState::Looping;
        if !active.shutdown(self.inner.stop_timeout) {
            *session = Some(active);
        }

        if was_running {
            if looping {
                tracing::info!("Loop playback stopped by user");
            } else {
                tracing::info!("Playback stopped");
            }
        }
        was_running
    }

    pub fn state(&self) -> ReplayState {
        match self.inner.session.lock().as_ref() {
            Some(active) if active.is_running() => active.mode,
            _ => ReplayState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() != ReplayState::Idle
    }

    pub fn is_looping(&self) -> bool {
        self.state() == ReplayState::Looping
    }

    /// Block until the current playback (if any) ends on its own or is
    /// stopped.
    pub fn wait_idle(&self) {
        if let Some(done) = self.current_completion() {
            done.wait();
        }
    }

    /// Like [`wait_idle`](Self::wait_idle) with a timeout. Returns whether
    /// the engine is idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        match self.current_completion() {
            Some(done) => done.wait_timeout(timeout),
            None => true,
        }
    }

    fn current_completion(&self) -> Option<Completion> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|active| active.done.clone())
    }

    /// Joins a finished session so a new one can start. Returns `false` if a
    /// playback is still running.
    fn clear_finished(&self, session: &mut Option<ActiveReplay>) -> bool {
        if session.as_ref().is_some_and(ActiveReplay::is_running) {
            return false;
        }
        if let Some(mut stale) = session.take() {
            stale.shutdown(self.inner.stop_timeout);
        }
        true
    }
}

fn validate(events: &[RecordedEvent], speed: f64) -> MacroResult<()> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(MacroError::InvalidSpeed(speed));
    }
    if events.is_empty() {
        return Err(MacroError::EmptySequence);
    }
    Ok(())
}

/// One pass over `events`, keeping the recorded spacing divided by `speed`.
/// Returns `false` if cancelled part way.
fn run_pass(device: &dyn InputDevice, events: &[RecordedEvent], speed: f64, cancel: &CancelToken) -> bool {
    let mut last_offset = 0.0;

    for event in events {
        if cancel.is_cancelled() {
            return false;
        }

        let wait = (event.offset - last_offset) / speed;
        if wait > 0.0 {
            let wait = Duration::try_from_secs_f64(wait).unwrap_or(Duration::MAX);
            if cancel.sleep(wait) {
                return false;
            }
        }
        if cancel.is_cancelled() {
            return false;
        }

        if let Err(e) = execute_event(device, event) {
            tracing::warn!(
                "Error executing {} event at {:.3}s: {}",
                event.kind.label(),
                event.offset,
                e
            );
        }
        last_offset = event.offset;
    }

    true
}

fn run_repeat(
    device: &dyn InputDevice,
    events: &[RecordedEvent],
    speed: f64,
    repeat: u32,
    cancel: &CancelToken,
) {
    for iteration in 1..=repeat {
        if cancel.is_cancelled() {
            break;
        }
        tracing::debug!("Playback iteration {}/{}", iteration, repeat);
        if !run_pass(device, events, speed, cancel) {
            break;
        }
    }
    tracing::info!("Playback finished");
}

fn run_loop(
    device: &dyn InputDevice,
    events: &[RecordedEvent],
    speed: f64,
    delay: Duration,
    cancel: &CancelToken,
) {
    let mut loop_count = 0u64;

    while !cancel.is_cancelled() {
        loop_count += 1;
        tracing::debug!("Loop iteration #{}", loop_count);

        if !run_pass(device, events, speed, cancel) {
            break;
        }
        if !delay.is_zero() && cancel.sleep(delay) {
            break;
        }
    }

    tracing::info!("Loop playback finished after {} iterations", loop_count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::input::keys::KeySymbol;
    use crate::capture::input::types::{EventKind, MouseButton};
    use crate::device::fake::{FakeDevice, Synthesized};
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn engine(device: &Arc<FakeDevice>) -> ReplayEngine {
        ReplayEngine::new(device.clone(), StopKeys::default(), WAIT)
    }

    fn moves(offsets: &[f64]) -> Vec<RecordedEvent> {
        offsets
            .iter()
            .map(|&offset| RecordedEvent::new(offset, EventKind::MouseMove { x: offset, y: 0.0 }))
            .collect()
    }

    fn secs_between(a: Instant, b: Instant) -> f64 {
        b.duration_since(a).as_secs_f64()
    }

    #[test]
    fn test_speed_scales_waits() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        let start = Instant::now();
        assert!(engine.play(moves(&[0.0, 1.0, 2.0]), 2.0, 1).unwrap());
        assert!(engine.wait_idle_timeout(WAIT));

        let calls = device.timed_calls();
        assert_eq!(calls.len(), 3);
        let span = secs_between(calls[0].0, calls[2].0);
        assert!((0.9..1.3).contains(&span), "span was {}", span);
        assert!(secs_between(start, calls[0].0) < 0.2);
    }

    #[test]
    fn test_click_example_end_to_end() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);
        let events = vec![
            RecordedEvent::new(
                0.0,
                EventKind::MouseClick {
                    x: 10.0,
                    y: 10.0,
                    button: MouseButton::Left,
                    pressed: true,
                },
            ),
            RecordedEvent::new(
                0.2,
                EventKind::MouseClick {
                    x: 10.0,
                    y: 10.0,
                    button: MouseButton::Left,
                    pressed: false,
                },
            ),
        ];

        assert!(engine.play(events, 1.0, 1).unwrap());
        assert!(engine.is_active());
        assert!(engine.wait_idle_timeout(WAIT));
        assert_eq!(engine.state(), ReplayState::Idle);

        let calls = device.timed_calls();
        let kinds: Vec<_> = calls.iter().map(|(_, c)| c.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Synthesized::MoveTo(10.0, 10.0),
                Synthesized::Press(MouseButton::Left),
                Synthesized::MoveTo(10.0, 10.0),
                Synthesized::Release(MouseButton::Left),
            ]
        );
        let gap = secs_between(calls[1].0, calls[3].0);
        assert!((0.18..0.5).contains(&gap), "gap was {}", gap);
    }

    #[test]
    fn test_second_play_is_rejected_while_running() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        assert!(engine.play(moves(&[0.5]), 1.0, 1).unwrap());
        assert!(!engine.play(moves(&[0.0]), 1.0, 1).unwrap());
        assert!(!engine.play_loop(moves(&[0.0]), 1.0, 0.0).unwrap());
        assert_eq!(engine.state(), ReplayState::Repeating { repeat: 1 });

        assert!(engine.stop());
        assert_eq!(device.call_count(), 0);
    }

    #[test]
    fn test_can_play_again_after_finishing() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        assert!(engine.play(moves(&[0.0]), 1.0, 1).unwrap());
        assert!(engine.wait_idle_timeout(WAIT));
        assert!(engine.play(moves(&[0.0]), 1.0, 1).unwrap());
        assert!(engine.wait_idle_timeout(WAIT));
        assert_eq!(device.call_count(), 2);
    }

    #[test]
    fn test_repeat_count() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        assert!(engine.play(moves(&[0.0, 0.01]), 1.0, 3).unwrap());
        assert!(engine.wait_idle_timeout(WAIT));
        assert_eq!(device.call_count(), 6);
    }

    #[test]
    fn test_rejects_bad_input() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                engine.play(moves(&[0.0]), speed, 1),
                Err(MacroError::InvalidSpeed(_))
            ));
        }
        assert!(matches!(
            engine.play_loop(Vec::new(), 1.0, 1.0),
            Err(MacroError::EmptySequence)
        ));
        assert!(!engine.is_active());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);
        assert!(!engine.stop());
        assert!(!engine.stop());
        assert!(engine.wait_idle_timeout(Duration::ZERO));
    }

    #[test]
    fn test_stop_interrupts_long_wait() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        assert!(engine.play(moves(&[30.0]), 1.0, 1).unwrap());
        std::thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        assert!(engine.stop());
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(device.call_count(), 0);
        assert!(!engine.is_active());
    }

    #[test]
    fn test_failed_event_does_not_abort_playback() {
        let device = Arc::new(FakeDevice::new());
        device.fail_scroll(true);
        let engine = engine(&device);
        let events = vec![
            RecordedEvent::new(
                0.0,
                EventKind::MouseScroll {
                    x: 1.0,
                    y: 1.0,
                    dx: 0,
                    dy: 1,
                },
            ),
            RecordedEvent::new(0.0, EventKind::KeyPress { key: "Key.bogus".into() }),
            RecordedEvent::new(0.0, EventKind::KeyPress { key: String::new() }),
            RecordedEvent::new(
                0.0,
                EventKind::MouseClick {
                    x: 9.0,
                    y: 9.0,
                    button: MouseButton::Unknown("Button.x1".into()),
                    pressed: true,
                },
            ),
            RecordedEvent::new(0.01, EventKind::MouseMove { x: 2.0, y: 2.0 }),
        ];

        assert!(engine.play(events, 1.0, 1).unwrap());
        assert!(engine.wait_idle_timeout(WAIT));
        assert_eq!(
            device.calls(),
            vec![Synthesized::MoveTo(1.0, 1.0), Synthesized::MoveTo(2.0, 2.0)]
        );
    }

    #[test]
    fn test_loop_stops_cleanly() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        assert!(engine.play_loop(moves(&[0.0, 0.005]), 1.0, 0.005).unwrap());
        assert!(engine.is_looping());
        assert_eq!(device.hotkey_count(), 2);
        std::thread::sleep(Duration::from_millis(100));

        assert!(engine.stop());
        let after_stop = device.call_count();
        assert!(after_stop >= 4, "only {} calls", after_stop);

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(device.call_count(), after_stop);
        assert_eq!(device.hotkey_count(), 0);
        assert_eq!(engine.state(), ReplayState::Idle);
    }

    #[test]
    fn test_negative_or_nan_delay_runs_passes_back_to_back() {
        for delay in [-1.0, f64::NAN] {
            let device = Arc::new(FakeDevice::new());
            let engine = engine(&device);

            assert!(engine.play_loop(moves(&[0.0, 0.005]), 1.0, delay).unwrap());
            std::thread::sleep(Duration::from_millis(150));
            assert!(engine.stop());

            let count = device.call_count();
            assert!(count >= 8, "delay {}: only {} calls", delay, count);
        }
    }

    #[test]
    fn test_stuck_worker_keeps_engine_busy() {
        let device = Arc::new(FakeDevice::new());
        device.slow_moves(Duration::from_millis(400));
        let engine = ReplayEngine::new(
            device.clone(),
            StopKeys::default(),
            Duration::from_millis(50),
        );

        assert!(engine.play(moves(&[0.0]), 1.0, 1).unwrap());
        std::thread::sleep(Duration::from_millis(30));

        assert!(engine.stop());
        assert!(engine.is_active());
        assert!(!engine.play(moves(&[0.0]), 1.0, 1).unwrap());

        assert!(engine.wait_idle_timeout(WAIT));
        assert!(!engine.is_active());
        device.slow_moves(Duration::ZERO);
        assert!(engine.play(moves(&[0.0]), 1.0, 1).unwrap());
        assert!(engine.wait_idle_timeout(WAIT));
        assert_eq!(device.call_count(), 2);
    }

    #[test]
    fn test_loop_stop_during_delay_is_prompt() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        assert!(engine.play_loop(moves(&[0.0]), 1.0, 60.0).unwrap());
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(device.call_count(), 1);

        let start = Instant::now();
        assert!(engine.stop());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_hotkey_stops_loop() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        assert!(engine.play_loop(moves(&[0.0, 0.01]), 1.0, 0.01).unwrap());
        std::thread::sleep(Duration::from_millis(50));

        device.emit_key_down(KeySymbol::ESCAPE);
        assert!(engine.wait_idle_timeout(WAIT));
        assert!(!engine.is_active());
        assert_eq!(device.hotkey_count(), 0);

        let after = device.call_count();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(device.call_count(), after);
    }

    #[test]
    fn test_escape_fallback_stops_loop() {
        let device = Arc::new(FakeDevice::with_hotkeys(false));
        let engine = engine(&device);

        assert!(engine.play_loop(moves(&[0.0]), 1.0, 0.01).unwrap());
        assert_eq!(device.listener_count(), 1);
        std::thread::sleep(Duration::from_millis(30));

        device.emit_key_down(KeySymbol::ESCAPE);
        assert!(engine.wait_idle_timeout(WAIT));
        assert_eq!(device.listener_count(), 0);
    }

    #[test]
    fn test_dropping_engine_stops_playback() {
        let device = Arc::new(FakeDevice::new());
        let engine = engine(&device);

        assert!(engine.play_loop(moves(&[0.0]), 1.0, 0.01).unwrap());
        std::thread::sleep(Duration::from_millis(30));
        drop(engine);

        let after = device.call_count();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(device.call_count(), after);
    }
}
