//! Test doubles for driving the stack without real hardware, grounded on
//! `other_examples`' generic `Radio`/`Timer` trait pattern.
//!
//! These stay fixed-capacity rather than reaching for `std`/`alloc`, like
//! everything else in the crate: a small ring of the most recent sends is
//! enough to assert against in a unit or integration test.

use crate::codec::CollectPayload;
use crate::node::EtcCallbacks;
use crate::radio::{BroadcastRadio, UnicastRadio};
use crate::timer::TimerDriver;
use crate::{CommandType, EventId, NodeAddr};

/// A manually advanced millisecond clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeTimerDriver {
    now_ms: u64,
}

impl FakeTimerDriver {
    pub const fn new(now_ms: u64) -> Self {
        FakeTimerDriver { now_ms }
    }

    pub fn advance(&mut self, delta_ms: u64) {
        self.now_ms += delta_ms;
    }

    pub fn set(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }
}

impl TimerDriver for FakeTimerDriver {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

/// A radio double that never actually transmits: it just records the
/// last `LOG` broadcast and unicast frames handed to it, and can be told
/// to fail the next send of either kind to exercise the retry paths.
pub struct LoopbackRadio<const FRAME_CAP: usize, const LOG: usize> {
    broadcasts: [Option<([u8; FRAME_CAP], usize)>; LOG],
    broadcast_count: usize,
    unicasts: [Option<(NodeAddr, [u8; FRAME_CAP], usize)>; LOG],
    unicast_count: usize,
    pub fail_next_broadcast: bool,
    pub fail_next_unicast: bool,
}

impl<const FRAME_CAP: usize, const LOG: usize> LoopbackRadio<FRAME_CAP, LOG> {
    pub const fn new() -> Self {
        LoopbackRadio {
            broadcasts: [None; LOG],
            broadcast_count: 0,
            unicasts: [None; LOG],
            unicast_count: 0,
            fail_next_broadcast: false,
            fail_next_unicast: false,
        }
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcast_count
    }

    pub fn unicast_count(&self) -> usize {
        self.unicast_count
    }

    pub fn last_broadcast(&self) -> Option<&[u8]> {
        if self.broadcast_count == 0 {
            return None;
        }
        let idx = (self.broadcast_count - 1) % LOG;
        self.broadcasts[idx].as_ref().map(|(buf, len)| &buf[..*len])
    }

    pub fn last_unicast(&self) -> Option<(NodeAddr, &[u8])> {
        if self.unicast_count == 0 {
            return None;
        }
        let idx = (self.unicast_count - 1) % LOG;
        self.unicasts[idx].as_ref().map(|(addr, buf, len)| (*addr, &buf[..*len]))
    }

    fn record_broadcast(&mut self, frame: &[u8]) {
        let idx = self.broadcast_count % LOG;
        let mut storage = [0u8; FRAME_CAP];
        let n = frame.len().min(FRAME_CAP);
        storage[..n].copy_from_slice(&frame[..n]);
        self.broadcasts[idx] = Some((storage, n));
        self.broadcast_count += 1;
    }

    fn record_unicast(&mut self, dest: NodeAddr, frame: &[u8]) {
        let idx = self.unicast_count % LOG;
        let mut storage = [0u8; FRAME_CAP];
        let n = frame.len().min(FRAME_CAP);
        storage[..n].copy_from_slice(&frame[..n]);
        self.unicasts[idx] = Some((dest, storage, n));
        self.unicast_count += 1;
    }
}

impl<const FRAME_CAP: usize, const LOG: usize> Default for LoopbackRadio<FRAME_CAP, LOG> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const FRAME_CAP: usize, const LOG: usize> BroadcastRadio for LoopbackRadio<FRAME_CAP, LOG> {
    fn send_broadcast(&mut self, _channel: u16, frame: &[u8]) -> bool {
        self.record_broadcast(frame);
        if self.fail_next_broadcast {
            self.fail_next_broadcast = false;
            false
        } else {
            true
        }
    }
}

impl<const FRAME_CAP: usize, const LOG: usize> UnicastRadio for LoopbackRadio<FRAME_CAP, LOG> {
    fn send_unicast(&mut self, _channel: u16, dest: NodeAddr, frame: &[u8]) -> bool {
        self.record_unicast(dest, frame);
        if self.fail_next_unicast {
            self.fail_next_unicast = false;
            false
        } else {
            true
        }
    }
}

/// A mesh of [`LoopbackRadio`]-style links between a small fixed set of
/// nodes, for integration tests that need a frame sent by one node to
/// actually reach another. Addressed by index, not [`NodeAddr`], since
/// the harness driving it already knows which index owns which address.
pub struct MeshRadio<const FRAME_CAP: usize, const NODES: usize> {
    pub broadcast_inbox: [[Option<([u8; FRAME_CAP], usize)>; NODES]; NODES],
    pub unicast_inbox: [[Option<([u8; FRAME_CAP], usize)>; NODES]; NODES],
    from: usize,
}

impl<const FRAME_CAP: usize, const NODES: usize> MeshRadio<FRAME_CAP, NODES> {
    pub const fn new(from: usize) -> Self {
        MeshRadio {
            broadcast_inbox: [[None; NODES]; NODES],
            unicast_inbox: [[None; NODES]; NODES],
            from,
        }
    }

    fn store(frame: &[u8]) -> ([u8; FRAME_CAP], usize) {
        let mut storage = [0u8; FRAME_CAP];
        let n = frame.len().min(FRAME_CAP);
        storage[..n].copy_from_slice(&frame[..n]);
        (storage, n)
    }
}

impl<const FRAME_CAP: usize, const NODES: usize> BroadcastRadio for MeshRadio<FRAME_CAP, NODES> {
    fn send_broadcast(&mut self, _channel: u16, frame: &[u8]) -> bool {
        let stored = Self::store(frame);
        for dest in 0..NODES {
            if dest != self.from {
                self.broadcast_inbox[dest][self.from] = Some(stored);
            }
        }
        true
    }
}

impl<const FRAME_CAP: usize, const NODES: usize> UnicastRadio for MeshRadio<FRAME_CAP, NODES> {
    fn send_unicast(&mut self, _channel: u16, _dest: NodeAddr, frame: &[u8]) -> bool {
        let stored = Self::store(frame);
        // The harness resolves `_dest` to a node index itself and reads
        // back out of `unicast_inbox[dest][from]`; recorded under every
        // slot here since this double doesn't know the address table.
        for dest in 0..NODES {
            if dest != self.from {
                self.unicast_inbox[dest][self.from] = Some(stored);
            }
        }
        true
    }
}

/// A minimal [`EtcCallbacks`] double: returns a fixed sensed value and
/// records the most recent actuation and collection result.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingCallbacks {
    pub sensed_value: u32,
    pub last_actuation: Option<(CommandType, u32)>,
    pub last_collected: Option<EventId>,
}

impl EtcCallbacks for RecordingCallbacks {
    fn sense(&mut self) -> u32 {
        self.sensed_value
    }

    fn actuate(&mut self, command: CommandType, threshold: u32) {
        self.last_actuation = Some((command, threshold));
    }

    fn collected(&mut self, event: EventId, _readings: &[Option<CollectPayload>]) {
        self.last_collected = Some(event);
    }
}
