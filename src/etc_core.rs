//! Event suppression, duplicate rejection, and collection windowing
//! (§4.5), grounded on `etc.c`'s `event_msg_t`/`collect_msg_t` dispatch and
//! `controller.c`'s `collect_cb`/`collect_timer_cb`.
//!
//! This module holds the stateful decisions that don't need the wire
//! codec, the radio, or a clock driver directly — only ticks and
//! addresses — so they're testable in isolation. [`crate::node`] wires
//! them to the codec, forward table, parent list, and radio.

use crate::beacon::seqn_is_newer;
use crate::codec::CollectPayload;
use crate::config::Config;
use crate::timer::TimerSlot;
use crate::{EventId, NodeAddr};

/// Tracks the newest sequence number seen per key (an event's source, or
/// a command's receiver), so a retransmission or late duplicate is
/// recognized rather than re-acted on.
pub struct SeqnTracker<const N: usize> {
    keys: [NodeAddr; N],
    last_seqn: [Option<u16>; N],
}

impl<const N: usize> SeqnTracker<N> {
    pub fn new(keys: [NodeAddr; N]) -> Self {
        SeqnTracker {
            keys,
            last_seqn: [None; N],
        }
    }

    fn index_of(&self, key: NodeAddr) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }

    /// Is `seqn` for `key` a duplicate (or stale) of one already seen?
    /// Unknown keys are never tracked and so never flagged as duplicates.
    /// Updates the tracked value when the sequence is genuinely newer.
    pub fn is_duplicate(&mut self, key: NodeAddr, seqn: u16) -> bool {
        let Some(idx) = self.index_of(key) else {
            return false;
        };
        match self.last_seqn[idx] {
            Some(seen) if !seqn_is_newer(seqn, seen) => true,
            _ => {
                self.last_seqn[idx] = Some(seqn);
                false
            }
        }
    }
}

/// Suppresses originating and re-propagating events too close together
/// (§4.5 "Suppression timers"), per the original's three-timer design:
/// `suppress_new` (a sensor not re-triggering), `suppress_prop` (a node
/// not re-forwarding the same event), and an early-release window once a
/// command closes the loop for that event.
pub struct Suppression {
    new_timer: TimerSlot,
    prop_event: Option<EventId>,
    prop_timer: TimerSlot,
}

impl Suppression {
    pub const fn new() -> Self {
        Suppression {
            new_timer: TimerSlot::new(),
            prop_event: None,
            prop_timer: TimerSlot::new(),
        }
    }

    /// May this sensor originate a fresh event right now?
    pub fn can_trigger_new(&self, now_ms: u64) -> bool {
        !(self.new_timer.is_armed() && self.new_timer.poll(now_ms).is_none())
    }

    /// Record that a new event was just originated.
    pub fn note_triggered(&mut self, now_ms: u64, cfg: &Config) {
        self.new_timer.arm(now_ms, cfg.suppression_timeout_new);
    }

    /// May an EVENT frame be propagated right now? Unconditional while
    /// `prop_timer` is armed: any incoming event is dropped, not just a
    /// repeat of whichever one armed the timer. (Recognizing a repeat is
    /// `event_dedup`'s job, called separately before this.)
    pub fn should_propagate(&self, now_ms: u64) -> bool {
        !(self.prop_timer.is_armed() && self.prop_timer.poll(now_ms).is_none())
    }

    /// Record that `event` was just propagated.
    pub fn note_propagated(&mut self, event: EventId, now_ms: u64, cfg: &Config) {
        self.prop_event = Some(event);
        self.prop_timer.arm(now_ms, cfg.suppression_timeout_prop);
    }

    /// A command closing `event`'s loop reached this node; if it's still
    /// suppressing that event's propagation, shorten the remaining window
    /// instead of holding it open for the full duration.
    pub fn shorten_on_command(&mut self, event: EventId, now_ms: u64, cfg: &Config) {
        if self.prop_event == Some(event) {
            self.prop_timer.arm(now_ms, cfg.suppression_timeout_end);
        }
    }
}

impl Default for Suppression {
    fn default() -> Self {
        Self::new()
    }
}

/// The controller's aggregation window for one in-flight event: collects
/// whichever sensors report in before [`Config::controller_collect_wait`]
/// elapses, then closes (`collect_timer_cb` in the original).
pub struct CollectionWindow<const SENSORS: usize> {
    event: Option<EventId>,
    timer: TimerSlot,
    sensors: [NodeAddr; SENSORS],
    readings: [Option<CollectPayload>; SENSORS],
}

impl<const SENSORS: usize> CollectionWindow<SENSORS> {
    pub fn new(sensors: [NodeAddr; SENSORS]) -> Self {
        CollectionWindow {
            event: None,
            timer: TimerSlot::new(),
            sensors,
            readings: [None; SENSORS],
        }
    }

    pub fn is_open(&self) -> bool {
        self.event.is_some()
    }

    /// Open a window for `event` if one isn't already open for it.
    /// Opening for a different event than whatever's in progress discards
    /// the prior (partial) window outright.
    pub fn open(&mut self, event: EventId, now_ms: u64, cfg: &Config) {
        if self.event != Some(event) {
            self.event = Some(event);
            self.readings = [None; SENSORS];
            self.timer.arm(now_ms, cfg.controller_collect_wait);
        }
    }

    /// Record one sensor's collect, if it matches the currently open
    /// event and that sensor hasn't already reported this round.
    pub fn record(&mut self, event: EventId, sender: NodeAddr, payload: CollectPayload) -> bool {
        if self.event != Some(event) {
            return false;
        }
        let Some(idx) = self.sensors.iter().position(|s| *s == sender) else {
            return false;
        };
        self.readings[idx] = Some(payload);
        true
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.timer.poll(now_ms).is_some()
    }

    /// Close the window, handing back the event and whatever readings
    /// arrived, and reset for the next one.
    pub fn close(&mut self) -> Option<(EventId, [Option<CollectPayload>; SENSORS])> {
        let event = self.event.take()?;
        self.timer.cancel();
        let readings = self.readings;
        self.readings = [None; SENSORS];
        Some((event, readings))
    }
}
