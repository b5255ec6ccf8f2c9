use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a bingo session.
///
/// All fields carry defaults so a settings file only needs to name the knobs
/// it actually changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wheel spin animation and flair.
    pub spin: SpinConfig,
    /// Pulse countdown phases and alert policy.
    pub pulse: PulseConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    /// Length of the spin animation (ms).
    pub duration_ms: u64,
    /// Lower bound of extra full rotations added for flair. Never below 3.
    pub min_turns: u32,
    /// Upper bound (inclusive) of extra full rotations.
    pub max_turns: u32,
    /// Jitter bound as a fraction of one segment width. Clamped below 0.5 so
    /// the pointer always stays inside the chosen segment.
    pub max_jitter_fraction: f64,
    /// Frame cadence used by the session loop while the wheel is spinning (ms).
    pub frame_interval_ms: u64,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            duration_ms: 5_000,
            min_turns: 3,
            max_turns: 7,
            max_jitter_fraction: 0.35,
            frame_interval_ms: 16,
        }
    }
}

impl SpinConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// Length of the yellow "warn" phase (ms).
    pub warn_ms: u64,
    /// Length of the red "critical" phase (ms).
    pub critical_ms: u64,
    /// Ring the buzzer when a running pulse is cancelled by the player.
    /// Expiry always rings it.
    pub alert_on_cancel: bool,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            warn_ms: 15_000,
            critical_ms: 5_000,
            alert_on_cancel: false,
        }
    }
}

impl PulseConfig {
    pub fn warn(&self) -> Duration {
        Duration::from_millis(self.warn_ms)
    }

    pub fn critical(&self) -> Duration {
        Duration::from_millis(self.critical_ms)
    }

    pub fn total(&self) -> Duration {
        self.warn() + self.critical()
    }
}
