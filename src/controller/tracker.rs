//! # Arm-State Tracker
//!
//! Turns a stream of heartbeat arm flags into `Armed`/`Disarmed` edges.
//!
//! A missing or timed-out heartbeat is never an edge: absence of evidence is
//! not evidence of disarm. The first heartbeat has no synthetic disarmed
//! predecessor, so a vehicle that is already armed produces `Armed` at once.

use crate::mavlink::protocol::MAV_MODE_FLAG_SAFETY_ARMED;

/// Arm-state edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Armed,
    Disarmed,
}

/// Whether the heartbeat `base_mode` flags have the safety-armed bit set
pub fn classify(mode_flags: u8) -> bool {
    mode_flags & MAV_MODE_FLAG_SAFETY_ARMED != 0
}

/// Edge between two readings
///
/// `previous` is `None` before the first heartbeat; `current` is `None` when
/// the receive produced no heartbeat.
pub fn observe(current: Option<bool>, previous: Option<bool>) -> Option<Transition> {
    match (previous, current?) {
        (Some(false) | None, true) => Some(Transition::Armed),
        (Some(true), false) => Some(Transition::Disarmed),
        _ => None,
    }
}

/// Stateful wrapper around [`observe`]
#[derive(Debug, Default)]
pub struct ArmStateTracker {
    last: Option<bool>,
}

impl ArmStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one reading; `None` for a missing heartbeat
    pub fn update(&mut self, armed: Option<bool>) -> Option<Transition> {
        let transition = observe(armed, self.last);
        if armed.is_some() {
            self.last = armed;
        }
        transition
    }

    /// Last heartbeat arm flag, `None` before the first heartbeat
    pub fn last(&self) -> Option<bool> {
        self.last
    }

    /// Overwrite the remembered reading
    ///
    /// Used to rewind to disarmed so the next armed heartbeat is an edge again.
    pub fn rewind(&mut self, armed: bool) {
        self.last = Some(armed);
    }
}
