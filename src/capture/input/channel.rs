use crate::capture::input::keys::KeySymbol;
use crate::capture::input::types::{EventKind, MouseButton, RecordedEvent};
use crate::device::{DeviceListener, InputDevice, SubscriptionHandle};
use crate::error::MacroResult;
use parking_lot::Mutex as ParkingMutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Append-only event buffer with mouse-move throttling.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    events: Vec<RecordedEvent>,
    move_throttle: f64,
}

impl CaptureBuffer {
    pub fn new(move_throttle: f64) -> Self {
        Self {
            events: Vec::new(),
            move_throttle,
        }
    }

    /// Append an event, returning whether it was kept.
    ///
    /// A move is dropped only when the last stored event is also a move and
    /// less than `move_throttle` seconds separate them. Any other event in
    /// between lets the next move through.
    pub fn push(&mut self, event: RecordedEvent) -> bool {
        if event.is_move() {
            if let Some(last) = self.events.last() {
                if last.is_move() && event.offset - last.offset < self.move_throttle {
                    return false;
                }
            }
        }
        self.events.push(event);
        true
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug)]
struct CaptureSession {
    active: bool,
    start_time: Option<Instant>,
    stop_time: Option<Instant>,
    buffer: CaptureBuffer,
    subscription: Option<SubscriptionHandle>,
}

impl CaptureSession {
    fn record(&mut self, kind: EventKind) {
        if !self.active {
            return;
        }
        let offset = self
            .start_time
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let label = kind.label();
        if self.buffer.push(RecordedEvent::new(offset, kind)) {
            tracing::trace!("Recorded {} at {:.3}s", label, offset);
        }
    }
}

/// Records mouse and keyboard notifications from an [`InputDevice`].
///
/// Only one capture session runs at a time. The buffer survives `stop` and
/// is cleared by the next `start`.
pub struct InputCaptureChannel {
    device: Arc<dyn InputDevice>,
    session: Arc<ParkingMutex<CaptureSession>>,
}

impl InputCaptureChannel {
    pub fn new(device: Arc<dyn InputDevice>, move_throttle: f64) -> Self {
        Self {
            device,
            session: Arc::new(ParkingMutex::new(CaptureSession {
                active: false,
                start_time: None,
                stop_time: None,
                buffer: CaptureBuffer::new(move_throttle),
                subscription: None,
            })),
        }
    }

    /// Start a new capture session.
    ///
    /// Returns `Ok(false)` if a session is already active. A failing device
    /// subscription leaves the channel idle and is returned as an error.
    pub fn start(&self) -> MacroResult<bool> {
        let mut session = self.session.lock();
        if session.active {
            return Ok(false);
        }

        session.buffer.clear();
        session.start_time = Some(Instant::now());
        session.stop_time = None;
        session.active = true;

        let sink = Arc::new(CaptureSink {
            session: self.session.clone(),
        });
        match self.device.subscribe(sink) {
            Ok(handle) => session.subscription = Some(handle),
            Err(e) => {
                session.active = false;
                session.start_time = None;
                tracing::error!("Failed to subscribe to {} input: {}", self.device.name(), e);
                return Err(e.into());
            }
        }

        tracing::info!("Recording started ({} input)", self.device.name());
        Ok(true)
    }

    /// Stop the active session. Returns `false` if nothing was recording.
    pub fn stop(&self) -> bool {
        let mut session = self.session.lock();
        if !session.active {
            return false;
        }

        session.active = false;
        session.stop_time = Some(Instant::now());
        if let Some(handle) = session.subscription.take() {
            self.device.unsubscribe(handle);
        }

        tracing::info!("Recording stopped. Captured {} events.", session.buffer.len());
        true
    }

    /// Snapshot of the recorded events.
    pub fn get_events(&self) -> Vec<RecordedEvent> {
        self.session.lock().buffer.events().to_vec()
    }

    pub fn event_count(&self) -> usize {
        self.session.lock().buffer.len()
    }

    pub fn is_recording(&self) -> bool {
        self.session.lock().active
    }

    /// Length of the running session, or of the last one once stopped.
    pub fn elapsed(&self) -> Duration {
        let session = self.session.lock();
        match (session.start_time, session.stop_time) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

struct CaptureSink {
    session: Arc<ParkingMutex<CaptureSession>>,
}

impl DeviceListener for CaptureSink {
    fn on_click(&self, x: f64, y: f64, button: MouseButton, pressed: bool) {
        self.session.lock().record(EventKind::MouseClick {
            x,
            y,
            button,
            pressed,
        });
    }

    fn on_move(&self, x: f64, y: f64) {
        self.session.lock().record(EventKind::MouseMove { x, y });
    }

    fn on_scroll(&self, x: f64, y: f64, dx: i64, dy: i64) {
        self.session
            .lock()
            .record(EventKind::MouseScroll { x, y, dx, dy });
    }

    fn on_key_down(&self, key: KeySymbol) {
        self.session.lock().record(EventKind::KeyPress {
            key: key.to_string(),
        });
    }

    fn on_key_up(&self, key: KeySymbol) {
        self.session.lock().record(EventKind::KeyRelease {
            key: key.to_string(),
        });
    }
}
