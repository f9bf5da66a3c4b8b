//! One-shot timer facility (§5 Concurrency & Resource Model).
//!
//! The stack never reads a wall clock directly; it asks a [`TimerDriver`]
//! for the current tick and arms [`TimerSlot`]s against it. Timers are
//! plain values embedded in whatever state owns them (a suppression
//! window, a retry backoff) rather than entries in a global timer wheel,
//! so cancelling one is just overwriting a struct field. Each arming
//! bumps a generation counter, so a firing queued behind an intervening
//! `cancel`/`arm` pair is recognized as stale and ignored.

use core::time::Duration;

/// Millisecond tick source. Implementations must be monotonic; wraparound
/// at `u64::MAX` ticks is outside any realistic deployment's uptime.
pub trait TimerDriver {
    fn now_ms(&self) -> u64;
}

pub fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// Identifies one particular arming of a [`TimerSlot`]. Only valid for
/// comparison against the slot it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerToken {
    generation: u32,
}

/// One timer's state: an optional deadline and the generation it was last
/// armed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerSlot {
    deadline_ms: Option<u64>,
    generation: u32,
}

impl TimerSlot {
    pub const fn new() -> Self {
        TimerSlot {
            deadline_ms: None,
            generation: 0,
        }
    }

    /// Arm for `delay` from `now`, invalidating any token from a previous
    /// arming of this slot.
    pub fn arm(&mut self, now_ms: u64, delay: Duration) -> TimerToken {
        self.generation = self.generation.wrapping_add(1);
        self.deadline_ms = Some(now_ms.saturating_add(millis(delay)));
        TimerToken {
            generation: self.generation,
        }
    }

    /// Disarm. A later `poll` returns `None` until the slot is armed again.
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.deadline_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Has this slot's current arming reached its deadline? Does not
    /// disarm the slot; the caller is expected to `cancel` once it acts.
    pub fn poll(&self, now_ms: u64) -> Option<TimerToken> {
        let deadline = self.deadline_ms?;
        (now_ms >= deadline).then_some(TimerToken {
            generation: self.generation,
        })
    }

    /// Does `token` still refer to this slot's current, unconsumed arming?
    pub fn is_current(&self, token: TimerToken) -> bool {
        self.deadline_ms.is_some() && self.generation == token.generation
    }
}

impl Default for TimerSlot {
    fn default() -> Self {
        Self::new()
    }
}
