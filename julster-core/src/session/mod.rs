//! One bingo session: owns the round machine, the wheel animation, the
//! track pool and the pulse timer, and turns transition actions into calls on
//! the collaborators.
//!
//! Everything runs on a single task. Inputs are processed one at a time and
//! evaluated against the state they find, so an input that queued up behind a
//! slow playback request is simply dropped by the transition guards if it is
//! no longer legal.

use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::animator::{AnimationEvent, AnimationHandle, SpinAnimator};
use crate::catalog::{Track, TrackMetadata};
use crate::collaborators::{
    AlertSink, ConfigurationSource, Notice, NoticeKind, Notifier, PlaybackError, PlaybackService,
    RenderSurface, Severity, TrackCatalog,
};
use crate::config::SessionConfig;
use crate::error::{BingoError, Result};
use crate::pool::TrackPool;
use crate::pulse::{PulseController, PulseEvent, PulseHandle, PulseOutcome, PulsePhase};
use crate::round::{RoundAction, RoundInput, RoundMachine, RoundState, Transition};
use crate::wheel::{self, SpinFlair};

#[cfg(test)]
mod tests;

/// Everything the session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub playback: Arc<dyn PlaybackService>,
    pub catalog: Arc<dyn TrackCatalog>,
    pub settings: Arc<dyn ConfigurationSource>,
    pub notifier: Arc<dyn Notifier>,
    pub render: Arc<dyn RenderSurface>,
    pub alert: Arc<dyn AlertSink>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// What the player can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    Spin,
    Pulse,
    /// End the current song early.
    Advance,
    NextRound,
    Reset,
    /// Frames stopped arriving mid-spin; land the wheel immediately.
    ResolveInterrupted,
    /// The wheel itself was clicked: spins when idle, pulses while playing.
    WheelClicked,
}

/// Everything a render surface needs to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub state: RoundState,
    /// Cumulative wheel rotation in degrees, clockwise-positive.
    pub rotation: f64,
    pub categories: Vec<String>,
    pub chosen_category: Option<String>,
    /// Only present once the song has been revealed.
    pub track: Option<TrackMetadata>,
    pub pulse_phase: Option<PulsePhase>,
    pub remaining: usize,
}

#[derive(Debug, Default)]
struct RoundContext {
    categories: Vec<String>,
    spin: Option<AnimationHandle>,
    chosen_index: Option<usize>,
    chosen_category: Option<String>,
    track: Option<Track>,
    track_revealed: bool,
    pulse: Option<PulseHandle>,
    playback_error: Option<PlaybackError>,
}

#[derive(Debug)]
pub struct BingoSessionBuilder {
    services: Collaborators,
    config: SessionConfig,
    seed: Option<u64>,
}

impl BingoSessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the session's random source for reproducible rounds.
    pub fn rng(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> BingoSession {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (pulses, pulse_rx) = PulseController::channel();

        BingoSession {
            machine: RoundMachine::new(self.config.pulse.alert_on_cancel),
            services: self.services,
            config: self.config,
            animator: SpinAnimator::default(),
            pool: TrackPool::new(),
            rng,
            pulses,
            pulse_rx: Some(pulse_rx),
            round: RoundContext::default(),
        }
    }
}

#[derive(Debug)]
pub struct BingoSession {
    services: Collaborators,
    config: SessionConfig,
    machine: RoundMachine,
    animator: SpinAnimator,
    pool: TrackPool,
    rng: StdRng,
    pulses: PulseController,
    /// Taken by [`BingoSession::run`] for the duration of the loop.
    pulse_rx: Option<mpsc::UnboundedReceiver<PulseEvent>>,
    round: RoundContext,
}

impl BingoSession {
    pub fn builder(services: Collaborators) -> BingoSessionBuilder {
        BingoSessionBuilder {
            services,
            config: SessionConfig::default(),
            seed: None,
        }
    }

    pub fn state(&self) -> RoundState {
        self.machine.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn animator(&self) -> &SpinAnimator {
        &self.animator
    }

    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.round.track.as_ref()
    }

    pub fn pulse(&self) -> Option<&PulseHandle> {
        self.round.pulse.as_ref()
    }

    /// Segment the current spin was aimed at.
    pub fn chosen_segment(&self) -> Option<usize> {
        self.round.chosen_index
    }

    fn pulse_expired(&self) -> bool {
        self.machine.state() == RoundState::Pulsing
            && self.round.pulse.as_ref().and_then(PulseHandle::outcome)
                == Some(PulseOutcome::Expired)
    }

    /// Fill the pool from the configured playlist. Returns how many new
    /// tracks were added.
    pub async fn load(&mut self) -> Result<usize> {
        let Some(playlist) = self.services.settings.playlist_reference() else {
            self.services.notifier.notify(&Notice::new(
                NoticeKind::MissingPlaylist,
                Severity::Error,
                "Please configure a valid playlist first",
            ));
            return Err(BingoError::MissingPlaylist);
        };

        let tracks = match self.services.catalog.load_tracks(&playlist).await {
            Ok(tracks) => tracks,
            Err(error) => {
                error!(%playlist, %error, "failed to load playlist");
                self.services.notifier.notify(&Notice::new(
                    NoticeKind::CatalogFailed,
                    Severity::Error,
                    format!("Could not load the playlist: {error}"),
                ));
                return Err(error.into());
            }
        };

        let before = self.pool.len();
        for track in tracks {
            self.pool.insert(track);
        }
        let added = self.pool.len() - before;
        info!(%playlist, added, available = self.pool.len(), "playlist loaded");

        let notice = if self.pool.is_empty() {
            Notice::new(
                NoticeKind::EmptyPlaylist,
                Severity::Warning,
                "The playlist has no playable songs",
            )
        } else {
            Notice::new(
                NoticeKind::TracksLoaded,
                Severity::Info,
                format!("Loaded {} songs", self.pool.len()),
            )
        };
        self.services.notifier.notify(&notice);

        if self.machine.state() == RoundState::Idle {
            self.round.categories = self.services.settings.categories();
        }
        self.publish();
        Ok(added)
    }

    pub async fn handle(&mut self, input: UserInput) -> Transition {
        let state = self.machine.state();
        let round_input = match input {
            UserInput::Spin => self.spin_request(),
            UserInput::WheelClicked if state == RoundState::Playing => RoundInput::PulseRequested,
            UserInput::WheelClicked => self.spin_request(),
            UserInput::Pulse => RoundInput::PulseRequested,
            // The timer may have run out while this input sat in the queue.
            UserInput::Advance if self.pulse_expired() => RoundInput::PulseExpired,
            UserInput::Advance => RoundInput::AdvanceRequested,
            UserInput::NextRound => RoundInput::NextRoundRequested,
            UserInput::Reset => RoundInput::SessionReset,
            UserInput::ResolveInterrupted => {
                return match self.animator.finish_now() {
                    Some(event) => self
                        .on_animation_event(event)
                        .await
                        .unwrap_or_else(|| Transition::ignored(state)),
                    None => Transition::ignored(state),
                };
            }
        };
        self.drive(round_input).await
    }

    /// Advance the wheel animation to `now`. Returns the transition the
    /// spin's completion caused, if this frame completed it.
    pub async fn on_frame(&mut self, now: Instant) -> Option<Transition> {
        match self.animator.tick(now) {
            Some(event) => self.on_animation_event(event).await,
            None => {
                self.publish();
                None
            }
        }
    }

    pub async fn on_pulse_event(&mut self, event: PulseEvent) -> Option<Transition> {
        let current = self.round.pulse.as_ref().map(PulseHandle::id);
        if current != Some(event.id()) {
            debug!(pulse = event.id().value(), "stale pulse event dropped");
            return None;
        }

        match event {
            PulseEvent::Phase { phase, .. } => {
                debug!(?phase, "pulse phase changed");
                self.publish();
                None
            }
            PulseEvent::Expired { .. } => Some(self.drive(RoundInput::PulseExpired).await),
        }
    }

    /// Handle every pulse event already queued, without waiting.
    pub async fn process_pulse_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(event) = self.pulse_rx.as_mut().and_then(|rx| rx.try_recv().ok()) else {
                break;
            };
            self.on_pulse_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Event loop over user inputs, animation frames and pulse events.
    /// Returns once `inputs` is closed.
    pub async fn run(&mut self, mut inputs: mpsc::Receiver<UserInput>) {
        let Some(mut pulse_events) = self.pulse_rx.take() else {
            warn!("session loop is already running");
            return;
        };

        let mut frames = tokio::time::interval(self.config.spin.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(remaining = self.pool.len(), "session started");
        self.publish();

        loop {
            let transition = tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => Some(self.handle(input).await),
                    None => break,
                },
                now = frames.tick(), if self.animator.is_animating() => {
                    self.on_frame(now).await
                }
                Some(event) = pulse_events.recv() => {
                    self.on_pulse_event(event).await
                }
            };

            if transition.is_some_and(|t| t.contains(RoundAction::StartPlayback))
                && !self.drop_queued_clicks(&mut inputs).await
            {
                break;
            }
        }

        self.pulse_rx = Some(pulse_events);
        self.shutdown();
        info!("session stopped");
    }

    /// Discard clicks that queued up while a song was being started; they
    /// were aimed at the previous state. Other inputs are handled in order.
    /// Returns `false` once the input channel has closed.
    async fn drop_queued_clicks(&mut self, inputs: &mut mpsc::Receiver<UserInput>) -> bool {
        let mut kept = Vec::new();
        let open = loop {
            match inputs.try_recv() {
                Ok(UserInput::Spin | UserInput::Pulse | UserInput::WheelClicked) => {
                    debug!("click during playback start dropped");
                }
                Ok(input) => kept.push(input),
                Err(mpsc::error::TryRecvError::Empty) => break true,
                Err(mpsc::error::TryRecvError::Disconnected) => break false,
            }
        };
        for input in kept {
            self.handle(input).await;
        }
        open
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let now = Instant::now();
        RenderSnapshot {
            state: self.machine.state(),
            rotation: self.animator.current_angle(),
            categories: self.round.categories.clone(),
            chosen_category: self.round.chosen_category.clone(),
            track: self
                .round
                .track
                .as_ref()
                .filter(|_| self.round.track_revealed)
                .map(|track| track.metadata.clone()),
            pulse_phase: self
                .round
                .pulse
                .as_ref()
                .and_then(|pulse| pulse.phase_at(now)),
            remaining: self.pool.len(),
        }
    }

    fn shutdown(&mut self) {
        if let Some(pulse) = self.round.pulse.as_ref() {
            pulse.cancel();
        }
        self.animator.cancel();
        self.round.spin = None;
    }

    fn publish(&self) {
        self.services.render.render(&self.snapshot());
    }

    fn spin_request(&mut self) -> RoundInput {
        if self.machine.state() == RoundState::Idle {
            self.round.categories = self.services.settings.categories();
        }
        RoundInput::SpinRequested {
            has_categories: !self.round.categories.is_empty(),
            track_available: !self.pool.is_empty(),
        }
    }

    async fn on_animation_event(&mut self, event: AnimationEvent) -> Option<Transition> {
        match event {
            AnimationEvent::Completed { handle, angle } if self.round.spin == Some(handle) => {
                self.round.spin = None;
                debug!(angle, "spin completed");
                let track_available = !self.pool.is_empty();
                Some(self.drive(RoundInput::SpinCompleted { track_available }).await)
            }
            other => {
                debug!(event = ?other, "animation event without a pending spin");
                None
            }
        }
    }

    async fn drive(&mut self, input: RoundInput) -> Transition {
        let mut step = self.machine.apply(input);
        if step.is_ignored() {
            debug!(state = %step.from, ?input, "input not allowed in current state");
            return step;
        }

        let mut transition = step.clone();
        info!(from = %step.from, to = %step.to, ?input, "round transition");
        while let Some(follow_up) = self.execute(&step.actions).await {
            step = self.machine.apply(follow_up);
            info!(from = %step.from, to = %step.to, input = ?follow_up, "round transition");
            transition = transition.chain(step.clone());
        }

        self.publish();
        transition
    }

    /// Run actions in order. Stops at the first action that produces a
    /// follow-up input for the machine.
    async fn execute(&mut self, actions: &[RoundAction]) -> Option<RoundInput> {
        for action in actions {
            if let Some(follow_up) = self.perform(*action).await {
                return Some(follow_up);
            }
        }
        None
    }

    async fn perform(&mut self, action: RoundAction) -> Option<RoundInput> {
        match action {
            RoundAction::StartSpin => return self.start_spin(),
            RoundAction::CancelSpin => {
                if let Some(event) = self.animator.cancel() {
                    debug!(angle = event.angle(), "spin cancelled");
                }
                self.round.spin = None;
            }
            RoundAction::RevealCategory => self.reveal_category(),
            RoundAction::SelectTrack => match self.pool.take(&mut self.rng) {
                Some(track) => {
                    info!(track = %track.id, remaining = self.pool.len(), "track selected");
                    self.round.track = Some(track);
                    self.round.track_revealed = false;
                }
                None => return Some(RoundInput::PoolExhausted),
            },
            RoundAction::StartPlayback => return Some(self.start_playback().await),
            RoundAction::RevealTrack => self.round.track_revealed = true,
            RoundAction::StartPulse => {
                let pulse = &self.config.pulse;
                match self.pulses.start(pulse.warn(), pulse.critical()) {
                    Ok(handle) => self.round.pulse = Some(handle),
                    Err(error) => error!(%error, "could not start pulse"),
                }
            }
            RoundAction::CancelPulse => {
                if let Some(pulse) = self.round.pulse.take()
                    && pulse.cancel().is_some()
                {
                    debug!(pulse = pulse.id().value(), "pulse cancelled");
                }
            }
            RoundAction::StopPlayback => {
                if let Err(error) = self.services.playback.stop_playback().await {
                    warn!(%error, "failed to stop playback");
                }
            }
            RoundAction::SoundAlert => self.services.alert.sound_alert(),
            RoundAction::ResetRotation => {
                self.animator.reset(0.0);
                self.round = RoundContext {
                    categories: self.services.settings.categories(),
                    ..RoundContext::default()
                };
            }
            RoundAction::Notify(kind) => self.notify(kind),
        }
        None
    }

    fn start_spin(&mut self) -> Option<RoundInput> {
        let segments = self.round.categories.len();
        let Some(index) = wheel::choose_segment(segments, &mut self.rng) else {
            error!("spin requested without categories");
            return Some(RoundInput::SessionReset);
        };
        let flair = SpinFlair::random(&mut self.rng, &self.config.spin);
        let from = self.animator.current_angle();

        match wheel::target_angle(segments, index, from, flair) {
            Ok(delta) => {
                let started =
                    self.animator
                        .start(from, from + delta, self.config.spin.duration(), Instant::now());
                self.round.spin = Some(started.handle);
                self.round.chosen_index = Some(index);
                debug!(
                    segment = index,
                    category = self.round.categories.get(index).map(String::as_str),
                    delta,
                    "wheel spinning"
                );
                None
            }
            Err(error) => {
                error!(%error, "could not plan spin");
                Some(RoundInput::SessionReset)
            }
        }
    }

    fn reveal_category(&mut self) {
        let segments = self.round.categories.len();
        match wheel::resolve_landed_segment(self.animator.current_angle(), segments) {
            Ok(landed) => {
                if self.round.chosen_index != Some(landed) {
                    warn!(
                        landed,
                        chosen = ?self.round.chosen_index,
                        "wheel landed outside the chosen segment"
                    );
                }
                self.round.chosen_category = self.round.categories.get(landed).cloned();
                info!(category = ?self.round.chosen_category, "category chosen");
            }
            Err(error) => warn!(%error, "could not resolve landed segment"),
        }
    }

    async fn start_playback(&mut self) -> RoundInput {
        let Some(id) = self.round.track.as_ref().map(|track| track.id.clone()) else {
            return RoundInput::PoolExhausted;
        };

        match self.services.playback.start_playback(&id).await {
            Ok(()) => {
                info!(track = %id, "playback started");
                self.round.playback_error = None;
                RoundInput::PlaybackStarted
            }
            Err(error) => {
                warn!(track = %id, %error, "playback failed to start");
                self.round.playback_error = Some(error);
                RoundInput::PlaybackFailed
            }
        }
    }

    fn notify(&self, kind: NoticeKind) {
        let notice = match (kind, &self.round.playback_error) {
            (NoticeKind::Exhausted, _) => Notice::exhausted(),
            (NoticeKind::PlaybackFailed, Some(error)) => Notice::playback_failed(error),
            (NoticeKind::PlaybackFailed, None) => {
                Notice::new(kind, Severity::Error, "Could not start the song")
            }
            (other, _) => Notice::new(other, Severity::Info, format!("{other:?}")),
        };
        self.services.notifier.notify(&notice);
    }
}
