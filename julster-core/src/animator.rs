//! Time-based spin animation for the category wheel.
//!
//! The animator is driven by frame timestamps supplied by the caller, so it
//! holds no timer of its own. It owns the visual rotation while a spin is in
//! flight and hands it back on completion, cancellation or reset.

use std::time::Duration;

use tokio::time::Instant;

/// Easing curves applied to animation progress (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    EaseOutCubic,
}

impl Easing {
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Identifies one started animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationHandle(u64);

impl AnimationHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Terminal event of an animation. Each handle yields exactly one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationEvent {
    Completed { handle: AnimationHandle, angle: f64 },
    Cancelled { handle: AnimationHandle, angle: f64 },
}

impl AnimationEvent {
    pub fn handle(&self) -> AnimationHandle {
        match self {
            AnimationEvent::Completed { handle, .. } | AnimationEvent::Cancelled { handle, .. } => {
                *handle
            }
        }
    }

    pub fn angle(&self) -> f64 {
        match self {
            AnimationEvent::Completed { angle, .. } | AnimationEvent::Cancelled { angle, .. } => {
                *angle
            }
        }
    }
}

/// Result of [`SpinAnimator::start`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationStart {
    pub handle: AnimationHandle,
    /// Cancellation of the animation that was still in flight, if any.
    pub cancelled: Option<AnimationEvent>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    handle: AnimationHandle,
    from: f64,
    to: f64,
    started_at: Instant,
    duration: Duration,
}

impl InFlight {
    fn raw_progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpinAnimator {
    easing: Easing,
    next_id: u64,
    in_flight: Option<InFlight>,
    /// Last angle handed to the render layer.
    angle: f64,
}

impl SpinAnimator {
    pub fn new(initial_angle: f64) -> Self {
        Self {
            angle: initial_angle,
            ..Default::default()
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn is_animating(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn handle(&self) -> Option<AnimationHandle> {
        self.in_flight.map(|flight| flight.handle)
    }

    /// Angle the in-flight animation will settle on.
    pub fn target(&self) -> Option<f64> {
        self.in_flight.map(|flight| flight.to)
    }

    /// Most recently sampled angle.
    pub fn current_angle(&self) -> f64 {
        self.angle
    }

    /// Begin animating from `from` to `to`. Any animation still in flight is
    /// cancelled first and its cancellation is reported in the result.
    pub fn start(
        &mut self,
        from: f64,
        to: f64,
        duration: Duration,
        now: Instant,
    ) -> AnimationStart {
        let cancelled = self.cancel();

        self.next_id += 1;
        let handle = AnimationHandle(self.next_id);
        self.in_flight = Some(InFlight {
            handle,
            from,
            to,
            started_at: now,
            duration,
        });
        self.angle = from;

        AnimationStart { handle, cancelled }
    }

    /// Eased progress of the in-flight animation; 1.0 when idle.
    pub fn progress_at(&self, now: Instant) -> f64 {
        self.in_flight
            .map(|flight| self.easing.apply(flight.raw_progress(now)))
            .unwrap_or(1.0)
    }

    /// Interpolated angle at `now` without advancing state.
    pub fn angle_at(&self, now: Instant) -> f64 {
        match self.in_flight {
            Some(flight) => {
                let eased = self.easing.apply(flight.raw_progress(now));
                flight.from + (flight.to - flight.from) * eased
            }
            None => self.angle,
        }
    }

    /// Advance to `now`. Returns the completion event on the frame where
    /// progress reaches 1 and `None` on every other frame, including any
    /// redundant frames delivered after completion.
    pub fn tick(&mut self, now: Instant) -> Option<AnimationEvent> {
        let flight = self.in_flight?;
        if flight.raw_progress(now) < 1.0 {
            self.angle = self.angle_at(now);
            return None;
        }

        self.in_flight = None;
        self.angle = flight.to;
        Some(AnimationEvent::Completed {
            handle: flight.handle,
            angle: flight.to,
        })
    }

    /// Stop the in-flight animation where it currently stands.
    pub fn cancel(&mut self) -> Option<AnimationEvent> {
        let flight = self.in_flight.take()?;
        Some(AnimationEvent::Cancelled {
            handle: flight.handle,
            angle: self.angle,
        })
    }

    /// Jump straight to the target and complete. Used when frames stopped
    /// arriving mid-spin (hidden page, suspended terminal).
    pub fn finish_now(&mut self) -> Option<AnimationEvent> {
        let flight = self.in_flight.take()?;
        self.angle = flight.to;
        Some(AnimationEvent::Completed {
            handle: flight.handle,
            angle: flight.to,
        })
    }

    /// Take the rotation back and place it at `angle`.
    pub fn reset(&mut self, angle: f64) -> Option<AnimationEvent> {
        let cancelled = self.cancel();
        self.angle = angle;
        cancelled
    }
}
