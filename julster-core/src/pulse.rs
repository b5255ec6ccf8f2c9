//! Two-phase countdown ("pulse") that runs while players guess.
//!
//! A pulse spends `warn` in the yellow phase and `critical` in the red phase.
//! Reaching the end uninterrupted resolves it as [`PulseOutcome::Expired`];
//! cancelling it earlier resolves it as [`PulseOutcome::Aborted`]. Whichever
//! happens first wins; the other path becomes a no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{BingoError, Result};

const RUNNING: u8 = 0;
const EXPIRED: u8 = 1;
const ABORTED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PulseId(u64);

impl PulseId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePhase {
    Warn,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    Expired,
    Aborted,
}

/// Messages the timer task posts back to the session loop. A cancelled
/// pulse posts nothing: the caller of [`PulseHandle::cancel`] already knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseEvent {
    Phase { id: PulseId, phase: PulsePhase },
    Expired { id: PulseId },
}

impl PulseEvent {
    pub fn id(&self) -> PulseId {
        match self {
            PulseEvent::Phase { id, .. } | PulseEvent::Expired { id } => *id,
        }
    }
}

/// Starts pulses and routes their events to one channel.
#[derive(Debug)]
pub struct PulseController {
    next_id: u64,
    events: mpsc::UnboundedSender<PulseEvent>,
}

impl PulseController {
    pub fn new(events: mpsc::UnboundedSender<PulseEvent>) -> Self {
        Self { next_id: 0, events }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PulseEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Start a pulse on the current tokio runtime.
    pub fn start(&mut self, warn: Duration, critical: Duration) -> Result<PulseHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| BingoError::Runtime(err.to_string()))?;

        self.next_id += 1;
        let started_at = Instant::now();
        let handle = PulseHandle {
            id: PulseId(self.next_id),
            started_at,
            warn,
            critical,
            state: Arc::new(AtomicU8::new(RUNNING)),
            token: CancellationToken::new(),
        };

        runtime.spawn(run_timer(handle.clone(), self.events.clone()));
        debug!(pulse = handle.id.0, ?warn, ?critical, "pulse started");
        Ok(handle)
    }
}

async fn run_timer(handle: PulseHandle, events: mpsc::UnboundedSender<PulseEvent>) {
    let (critical_at, expires_at) = handle.deadlines();

    tokio::select! {
        biased;
        _ = handle.token.cancelled() => return,
        _ = sleep_until(critical_at) => {}
    }
    if handle.is_running() {
        trace!(pulse = handle.id.0, "pulse entered critical phase");
        let _ = events.send(PulseEvent::Phase {
            id: handle.id,
            phase: PulsePhase::Critical,
        });
    }

    tokio::select! {
        biased;
        _ = handle.token.cancelled() => return,
        _ = sleep_until(expires_at) => {}
    }
    if handle.resolve(EXPIRED) {
        debug!(pulse = handle.id.0, "pulse expired");
        let _ = events.send(PulseEvent::Expired { id: handle.id });
    }
}

/// Handle to one running (or finished) pulse. Clones share state.
#[derive(Debug, Clone)]
pub struct PulseHandle {
    id: PulseId,
    started_at: Instant,
    warn: Duration,
    critical: Duration,
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl PulseHandle {
    pub fn id(&self) -> PulseId {
        self.id
    }

    /// `(critical phase starts, pulse expires)`.
    pub fn deadlines(&self) -> (Instant, Instant) {
        let critical_at = self.started_at + self.warn;
        (critical_at, critical_at + self.critical)
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    pub fn outcome(&self) -> Option<PulseOutcome> {
        match self.state.load(Ordering::Acquire) {
            EXPIRED => Some(PulseOutcome::Expired),
            ABORTED => Some(PulseOutcome::Aborted),
            _ => None,
        }
    }

    /// Visual phase at `now`; `None` once the pulse has resolved.
    pub fn phase_at(&self, now: Instant) -> Option<PulsePhase> {
        if !self.is_running() {
            return None;
        }
        let (critical_at, _) = self.deadlines();
        if now < critical_at {
            Some(PulsePhase::Warn)
        } else {
            Some(PulsePhase::Critical)
        }
    }

    /// Cancel both phase timers. Returns `Some(Aborted)` only for the call
    /// that actually stopped a running pulse; later calls, and calls after
    /// expiry, return `None`.
    pub fn cancel(&self) -> Option<PulseOutcome> {
        if !self.resolve(ABORTED) {
            return None;
        }
        self.token.cancel();
        debug!(pulse = self.id.0, "pulse aborted");
        Some(PulseOutcome::Aborted)
    }

    fn resolve(&self, outcome: u8) -> bool {
        self.state
            .compare_exchange(RUNNING, outcome, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
