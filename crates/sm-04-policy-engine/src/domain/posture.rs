//! Defense posture: how aggressively the node responds.
//!
//! Posture never overrides jurisdiction constraints and never escalates a
//! decision past what the matched rule allows; it caps (Passive) or widens
//! the mandatory-alert floor (Aggressive/Paranoid).

use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::warn;

/// Defense intensity levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefensePosture {
    /// Alert-only: automated intrusive responses disabled.
    Passive,
    Standard,
    Aggressive,
    /// Sustained attack: alert on nearly everything.
    Paranoid,
}

impl DefensePosture {
    /// Alert floor for this posture (severity at which silence is
    /// forbidden). Lower floor = more alerts.
    pub fn alert_floor(&self, configured_floor: f64) -> f64 {
        match self {
            Self::Passive | Self::Standard => configured_floor,
            Self::Aggressive => configured_floor.min(0.3),
            Self::Paranoid => configured_floor.min(0.2),
        }
    }

    /// Whether intrusive (non-Alert) automated actions are permitted.
    pub fn allows_intrusive(&self) -> bool {
        !matches!(self, Self::Passive)
    }
}

impl std::fmt::Display for DefensePosture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Passive => "passive",
            Self::Standard => "standard",
            Self::Aggressive => "aggressive",
            Self::Paranoid => "paranoid",
        };
        write!(f, "{s}")
    }
}

/// Thresholds driving automatic posture adjustment.
#[derive(Clone, Debug)]
pub struct PostureThresholds {
    /// Window over which actioned-incident volume is counted.
    pub volume_window_ms: u64,
    /// Actioned incidents within the window that trigger Paranoid.
    pub paranoid_volume: usize,
    /// Volume that triggers Aggressive.
    pub aggressive_volume: usize,
    /// Budget fraction below which the node drops to Passive.
    pub passive_budget_ratio: f64,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            volume_window_ms: 5 * 60 * 1_000,
            paranoid_volume: 20,
            aggressive_volume: 8,
            passive_budget_ratio: 0.05,
        }
    }
}

/// Tracks threat volume and derives the current posture.
///
/// A manual override (from configuration) pins the posture; otherwise it
/// follows load: sustained threat volume raises it, budget exhaustion
/// pressure lowers it.
pub struct PostureController {
    thresholds: PostureThresholds,
    override_posture: Option<DefensePosture>,
    current: Mutex<DefensePosture>,
    actioned_at: Mutex<VecDeque<u64>>,
}

impl PostureController {
    pub fn new(thresholds: PostureThresholds, override_posture: Option<DefensePosture>) -> Self {
        Self {
            thresholds,
            override_posture,
            current: Mutex::new(override_posture.unwrap_or(DefensePosture::Standard)),
            actioned_at: Mutex::new(VecDeque::new()),
        }
    }

    pub fn current(&self) -> DefensePosture {
        *self.current.lock()
    }

    /// Record that an incident was actioned (input to volume tracking).
    pub fn record_actioned(&self, now_ms: u64) {
        let mut log = self.actioned_at.lock();
        log.push_back(now_ms);
        let cutoff = now_ms.saturating_sub(self.thresholds.volume_window_ms);
        while log.front().is_some_and(|t| *t < cutoff) {
            log.pop_front();
        }
    }

    /// Re-derive the posture from current load. Returns the new posture.
    pub fn review(&self, now_ms: u64, budget_available: u64, budget_capacity: u64) -> DefensePosture {
        if let Some(pinned) = self.override_posture {
            return pinned;
        }

        let volume = {
            let mut log = self.actioned_at.lock();
            let cutoff = now_ms.saturating_sub(self.thresholds.volume_window_ms);
            while log.front().is_some_and(|t| *t < cutoff) {
                log.pop_front();
            }
            log.len()
        };

        let budget_ratio = if budget_capacity == 0 {
            0.0
        } else {
            budget_available as f64 / budget_capacity as f64
        };

        let next = if budget_ratio < self.thresholds.passive_budget_ratio {
            DefensePosture::Passive
        } else if volume >= self.thresholds.paranoid_volume {
            DefensePosture::Paranoid
        } else if volume >= self.thresholds.aggressive_volume {
            DefensePosture::Aggressive
        } else {
            DefensePosture::Standard
        };

        let mut current = self.current.lock();
        if *current != next {
            warn!(from = %*current, to = %next, volume, budget_ratio, "Defense posture changed");
            *current = next;
        }
        next
    }
}
