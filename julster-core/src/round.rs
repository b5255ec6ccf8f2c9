//! Per-song round state machine.
//!
//! The machine is pure: it maps `(state, input)` to the next state plus the
//! side effects the session has to carry out, in order. Inputs that are not
//! legal in the current state produce an ignored transition.

use std::fmt::{self, Display};

use tracing::trace;

use crate::collaborators::NoticeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoundState {
    #[default]
    Idle,
    Spinning,
    CategoryChosen,
    Playing,
    Pulsing,
    Ended,
}

impl RoundState {
    /// Whether a song may be audible in this state.
    pub fn has_live_track(&self) -> bool {
        matches!(
            self,
            RoundState::CategoryChosen | RoundState::Playing | RoundState::Pulsing
        )
    }
}

impl Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundState::Idle => "idle",
            RoundState::Spinning => "spinning",
            RoundState::CategoryChosen => "category chosen",
            RoundState::Playing => "playing",
            RoundState::Pulsing => "pulsing",
            RoundState::Ended => "ended",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundInput {
    SpinRequested {
        has_categories: bool,
        track_available: bool,
    },
    SpinCompleted {
        track_available: bool,
    },
    PlaybackStarted,
    PlaybackFailed,
    PulseRequested,
    PulseExpired,
    AdvanceRequested,
    NextRoundRequested,
    SessionReset,
    PoolExhausted,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAction {
    StartSpin,
    CancelSpin,
    RevealCategory,
    SelectTrack,
    StartPlayback,
    RevealTrack,
    StartPulse,
    CancelPulse,
    StopPlayback,
    SoundAlert,
    ResetRotation,
    Notify(NoticeKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: RoundState,
    pub to: RoundState,
    pub actions: Vec<RoundAction>,
}

impl Transition {
    pub fn new(from: RoundState, to: RoundState, actions: Vec<RoundAction>) -> Self {
        Self { from, to, actions }
    }

    /// No state change and nothing to do.
    pub fn ignored(state: RoundState) -> Self {
        Self::new(state, state, Vec::new())
    }

    pub fn is_ignored(&self) -> bool {
        self.from == self.to && self.actions.is_empty()
    }

    pub fn contains(&self, action: RoundAction) -> bool {
        self.actions.contains(&action)
    }

    /// Fold a follow-up transition into this one.
    pub fn chain(mut self, next: Transition) -> Self {
        self.to = next.to;
        self.actions.extend(next.actions);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoundMachine {
    state: RoundState,
    alert_on_cancel: bool,
}

impl RoundMachine {
    pub fn new(alert_on_cancel: bool) -> Self {
        Self {
            state: RoundState::Idle,
            alert_on_cancel,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn apply(&mut self, input: RoundInput) -> Transition {
        use RoundAction::*;
        use RoundState::*;

        let from = self.state;
        let (to, actions) = match (from, input) {
            (_, RoundInput::SessionReset) => {
                let mut actions = vec![CancelSpin, CancelPulse];
                if from.has_live_track() {
                    actions.push(StopPlayback);
                }
                actions.push(ResetRotation);
                (Idle, actions)
            }
            (_, RoundInput::PoolExhausted) => (Idle, vec![Notify(NoticeKind::Exhausted)]),

            (
                Idle,
                RoundInput::SpinRequested {
                    has_categories: true,
                    ..
                },
            ) => (Spinning, vec![CancelPulse, StartSpin]),
            (
                Idle,
                RoundInput::SpinRequested {
                    has_categories: false,
                    track_available: true,
                },
            ) => (Playing, vec![CancelPulse, SelectTrack, StartPlayback]),
            (
                Idle,
                RoundInput::SpinRequested {
                    has_categories: false,
                    track_available: false,
                },
            ) => (Idle, vec![CancelPulse, Notify(NoticeKind::Exhausted)]),

            (
                Spinning,
                RoundInput::SpinCompleted {
                    track_available: true,
                },
            ) => (
                CategoryChosen,
                vec![RevealCategory, SelectTrack, StartPlayback],
            ),
            (
                Spinning,
                RoundInput::SpinCompleted {
                    track_available: false,
                },
            ) => (Idle, vec![Notify(NoticeKind::Exhausted)]),

            (CategoryChosen, RoundInput::PlaybackStarted) => (Playing, vec![RevealTrack]),
            (CategoryChosen, RoundInput::PlaybackFailed) => (
                Playing,
                vec![RevealTrack, Notify(NoticeKind::PlaybackFailed)],
            ),
            // Without a wheel the round is already Playing while the start
            // request is in flight.
            (Playing, RoundInput::PlaybackStarted) => (Playing, vec![RevealTrack]),
            (Playing, RoundInput::PlaybackFailed) => (
                Playing,
                vec![RevealTrack, Notify(NoticeKind::PlaybackFailed)],
            ),

            (Playing, RoundInput::PulseRequested) => (Pulsing, vec![StartPulse]),
            (Playing, RoundInput::AdvanceRequested) => (Ended, vec![StopPlayback]),

            (Pulsing, RoundInput::PulseExpired) => (Ended, vec![StopPlayback, SoundAlert]),
            (Pulsing, RoundInput::AdvanceRequested) => {
                let mut actions = vec![CancelPulse, StopPlayback];
                if self.alert_on_cancel {
                    actions.push(SoundAlert);
                }
                (Ended, actions)
            }

            (Ended, RoundInput::NextRoundRequested) => (Idle, vec![ResetRotation]),

            _ => {
                trace!(state = %from, ?input, "input ignored");
                return Transition::ignored(from);
            }
        };

        self.state = to;
        Transition::new(from, to, actions)
    }
}
