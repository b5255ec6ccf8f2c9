//! Wheel geometry: mapping a chosen category to a rotation and back.
//!
//! Conventions used everywhere in the workspace:
//!
//! - the pointer is fixed at the **top** of the wheel;
//! - rotation is measured in **degrees** and is **clockwise-positive**;
//! - segment `i` of `n` covers `[i·w, (i+1)·w)` degrees, measured clockwise
//!   from the top of the wheel at rest, with `w = 360 / n`.
//!
//! Rotating the wheel clockwise by `θ` brings the wheel angle `(-θ) mod 360`
//! under the pointer. [`target_angle`] and [`resolve_landed_segment`] are
//! exact inverses of each other as long as the jitter stays strictly inside
//! half a segment, which [`SpinFlair`] enforces.

use rand::Rng;
use thiserror::Error;

use crate::config::SpinConfig;

/// One full turn of the wheel in degrees.
pub const FULL_TURN: f64 = 360.0;

/// Minimum number of full rotations added to every spin.
pub const MIN_FULL_TURNS: u32 = 3;

/// Hard ceiling on jitter, as a fraction of one segment width.
pub const MAX_JITTER_FRACTION: f64 = 0.49;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WheelError {
    #[error("wheel has no segments")]
    NoSegments,

    #[error("segment {index} out of range for a wheel with {segments} segments")]
    SegmentOutOfRange { index: usize, segments: usize },

    #[error("rotation angle is not finite: {0}")]
    NonFiniteAngle(f64),
}

/// Derived geometry of a wheel with `n` equal segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelGeometry {
    segments: usize,
}

impl WheelGeometry {
    pub fn new(segments: usize) -> Result<Self, WheelError> {
        if segments == 0 {
            return Err(WheelError::NoSegments);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Angular width of one segment in degrees.
    pub fn segment_width(&self) -> f64 {
        FULL_TURN / self.segments as f64
    }

    /// `[start, end)` of a segment in wheel coordinates.
    pub fn segment_span(&self, index: usize) -> Option<(f64, f64)> {
        (index < self.segments).then(|| {
            let width = self.segment_width();
            (index as f64 * width, (index + 1) as f64 * width)
        })
    }

    pub fn segment_center(&self, index: usize) -> Option<f64> {
        self.segment_span(index)
            .map(|(start, _)| start + self.segment_width() / 2.0)
    }

    /// Segment whose arc currently sits under the pointer.
    pub fn segment_under_pointer(&self, rotation: f64) -> usize {
        let offset = pointer_angle(rotation);
        let index = (offset / self.segment_width()).floor() as usize;
        index.min(self.segments - 1)
    }
}

/// Random flair applied on top of the exact landing angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinFlair {
    /// Extra full rotations. Values below [`MIN_FULL_TURNS`] are raised.
    pub full_turns: u32,
    /// Offset from the segment centre as a fraction of the segment width.
    pub jitter_fraction: f64,
}

impl SpinFlair {
    /// Deterministic flair: the given number of turns, no jitter.
    pub fn none(full_turns: u32) -> Self {
        Self {
            full_turns,
            jitter_fraction: 0.0,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R, config: &SpinConfig) -> Self {
        let min_turns = config.min_turns.max(MIN_FULL_TURNS);
        let max_turns = config.max_turns.max(min_turns);
        let full_turns = rng.random_range(min_turns..=max_turns);

        let bound = sanitize_fraction(config.max_jitter_fraction).abs();
        let jitter_fraction = if bound > 0.0 {
            rng.random_range(-bound..=bound)
        } else {
            0.0
        };

        Self {
            full_turns,
            jitter_fraction,
        }
    }

    fn turns(&self) -> u32 {
        self.full_turns.max(MIN_FULL_TURNS)
    }

    fn jitter(&self) -> f64 {
        sanitize_fraction(self.jitter_fraction)
    }
}

fn sanitize_fraction(fraction: f64) -> f64 {
    if fraction.is_finite() {
        fraction.clamp(-MAX_JITTER_FRACTION, MAX_JITTER_FRACTION)
    } else {
        0.0
    }
}

/// Wheel angle (degrees, `[0, 360)`) sitting under the pointer after the
/// wheel has been rotated by `rotation`.
pub fn pointer_angle(rotation: f64) -> f64 {
    let offset = (-rotation).rem_euclid(FULL_TURN);
    // rem_euclid can round a tiny negative input up to exactly 360.0
    if offset >= FULL_TURN { 0.0 } else { offset }
}

/// Uniformly pick a segment index in `[0, segments)`.
pub fn choose_segment<R: Rng + ?Sized>(segments: usize, rng: &mut R) -> Option<usize> {
    (segments > 0).then(|| rng.random_range(0..segments))
}

/// Rotation delta that, added to `prior`, brings segment `index` under the
/// pointer. The result is always positive: the wheel only spins forward.
pub fn target_angle(
    segments: usize,
    index: usize,
    prior: f64,
    flair: SpinFlair,
) -> Result<f64, WheelError> {
    let geometry = WheelGeometry::new(segments)?;
    if index >= segments {
        return Err(WheelError::SegmentOutOfRange { index, segments });
    }
    if !prior.is_finite() {
        return Err(WheelError::NonFiniteAngle(prior));
    }

    let width = geometry.segment_width();
    let jitter = if segments == 1 {
        0.0
    } else {
        flair.jitter() * width
    };
    let aim = index as f64 * width + width / 2.0 + jitter;

    // -(prior + delta) ≡ aim (mod 360)
    let mut remainder = (-aim - prior).rem_euclid(FULL_TURN);
    if remainder >= FULL_TURN {
        remainder = 0.0;
    }

    Ok(flair.turns() as f64 * FULL_TURN + remainder)
}

/// Segment under the pointer for a final cumulative rotation.
pub fn resolve_landed_segment(final_angle: f64, segments: usize) -> Result<usize, WheelError> {
    let geometry = WheelGeometry::new(segments)?;
    if !final_angle.is_finite() {
        return Err(WheelError::NonFiniteAngle(final_angle));
    }
    Ok(geometry.segment_under_pointer(final_angle))
}
