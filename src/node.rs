//! Node façade (§3, §5), grounded on `etc.c`'s `etc_open`/`etc_close`/
//! `etc_trigger`/`etc_command`/`etc_update` and `node.c`'s role derivation.
//!
//! [`EtcNode`] owns every component's state for one node and is the only
//! type applications construct directly; the rest of the crate is wiring
//! it pulls together. A caller drives it from its own receive interrupts,
//! send-confirmation callbacks, and a periodic tick — nothing here spins
//! its own loop or owns a clock.

use core::time::Duration;

use crate::beacon::{ParentCandidate, ParentList, StrongestRssi};
use crate::buffer::{self, SendOutcome, UnicastBuffer};
use crate::codec::{
    BeaconPayload, BroadcastFrame, CollectPayload, CommandPayload, EventPayload, UnicastFrame,
    UnicastHeader, UnicastType, MAX_UNICAST_FRAME_LEN,
};
use crate::config::Config;
use crate::error::EtcError;
use crate::etc_core::{CollectionWindow, SeqnTracker, Suppression};
use crate::forward::ForwardTable;
use crate::policy::{Actuation, BoundaryPolicy, Policy, SensorReading};
use crate::radio::{BroadcastRadio, PacketBuffer, RecvMeta, UnicastRadio};
use crate::timer::{TimerDriver, TimerSlot};
use crate::{CommandType, EventId, NodeAddr, Role};

/// Application-level collaborator: sensing, actuation, and the
/// controller's aggregated-readings callback (§5 External Interfaces).
/// The stack never reads hardware or drives actuators itself.
pub trait EtcCallbacks {
    /// Read this node's current sensor value. Only called on a
    /// sensor/actuator node.
    fn sense(&mut self) -> u32;

    /// Apply a command this node's sensor/actuator just received, along
    /// with the threshold now in effect (already updated per §6).
    fn actuate(&mut self, command: CommandType, threshold: u32);

    /// The controller's aggregation window for `event` has closed. One
    /// entry per sensor the node was constructed with, in that order;
    /// `None` where that sensor didn't report before the window closed.
    fn collected(&mut self, event: EventId, readings: &[Option<CollectPayload>]);
}

/// One node's complete ETC stack.
///
/// `SENSORS` is the network's fixed sensor count, `PARENTS` bounds the
/// beacon-tree candidate list, `HOPS` bounds remembered reverse-path hops
/// per sensor, `BUF` is the outbound unicast FIFO depth, and `FRAME_CAP`
/// is the byte capacity of one wire frame — it must be at least
/// [`crate::codec::MAX_UNICAST_FRAME_LEN`] (which already covers the
/// smaller broadcast frames too).
pub struct EtcNode<
    const SENSORS: usize,
    const PARENTS: usize,
    const HOPS: usize,
    const BUF: usize,
    const FRAME_CAP: usize,
> {
    self_addr: NodeAddr,
    controller: NodeAddr,
    sensors: [NodeAddr; SENSORS],
    role: Role,
    config: Config,

    parents: ParentList<PARENTS>,
    forward: ForwardTable<SENSORS, HOPS>,
    buffer: UnicastBuffer<BUF, FRAME_CAP>,

    suppression: Suppression,
    event_dedup: SeqnTracker<SENSORS>,
    command_dedup: SeqnTracker<SENSORS>,
    collection: CollectionWindow<SENSORS>,

    /// Sensor/actuator-only: the threshold last set by a command, applied
    /// against fresh readings in [`EtcNode::etc_update`].
    sensor_threshold: u32,
    own_event_seqn: u16,

    beacon_timer: TimerSlot,
    beacon_seqn: u16,

    beacon_forward_timer: TimerSlot,
    beacon_forward_pending: bool,

    event_forward_timer: TimerSlot,
    event_forward_pending: Option<EventId>,

    collect_dispatch_timer: TimerSlot,
    collect_dispatch_pending: Option<EventId>,

    command_forward_timer: TimerSlot,
    command_forward_pending: Option<CommandPayload>,
}

impl<const SENSORS: usize, const PARENTS: usize, const HOPS: usize, const BUF: usize, const FRAME_CAP: usize>
    EtcNode<SENSORS, PARENTS, HOPS, BUF, FRAME_CAP>
{
    pub fn new(self_addr: NodeAddr, controller: NodeAddr, sensors: [NodeAddr; SENSORS], config: Config) -> Self {
        let role = Role::derive(self_addr, controller, &sensors);
        EtcNode {
            self_addr,
            controller,
            sensors,
            role,
            config,

            parents: ParentList::new(),
            forward: ForwardTable::new(sensors),
            buffer: UnicastBuffer::new(),

            suppression: Suppression::new(),
            event_dedup: SeqnTracker::new(sensors),
            command_dedup: SeqnTracker::new(sensors),
            collection: CollectionWindow::new(sensors),

            sensor_threshold: u32::MAX,
            own_event_seqn: 0,

            beacon_timer: TimerSlot::new(),
            beacon_seqn: 0,

            beacon_forward_timer: TimerSlot::new(),
            beacon_forward_pending: false,

            event_forward_timer: TimerSlot::new(),
            event_forward_pending: None,

            collect_dispatch_timer: TimerSlot::new(),
            collect_dispatch_pending: None,

            command_forward_timer: TimerSlot::new(),
            command_forward_pending: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_connected(&self) -> bool {
        self.role == Role::Controller || self.parents.is_connected()
    }

    /// Start the node: arms the controller's periodic beacon. Other
    /// roles have nothing to arm until their first beacon arrives.
    pub fn etc_open<T: TimerDriver>(&mut self, timer: &T) {
        if self.role == Role::Controller {
            self.beacon_timer.arm(timer.now_ms(), self.config.beacon_interval);
        }
    }

    /// Stop the node: disarms every timer and forgets the tree. A
    /// subsequent `etc_open` starts clean.
    pub fn etc_close(&mut self) {
        self.beacon_timer.cancel();
        self.beacon_forward_timer.cancel();
        self.event_forward_timer.cancel();
        self.collect_dispatch_timer.cancel();
        self.command_forward_timer.cancel();
        self.parents.clear();
    }

    /// Report a freshly sensed value. Crosses its current threshold?
    /// Originate a new event, subject to suppression.
    pub fn etc_update<T: TimerDriver, R: BroadcastRadio>(
        &mut self,
        value: u32,
        timer: &T,
        bradio: &mut R,
    ) -> Result<(), EtcError> {
        if self.role != Role::SensorActuator {
            return Ok(());
        }
        if value > self.sensor_threshold {
            self.etc_trigger(timer, bradio, self.config.collect_start_delay_min)?;
        }
        Ok(())
    }

    /// Originate a new event now. `collect_jitter` is the caller-supplied
    /// randomized delay (clamped into the configured range) before this
    /// sensor dispatches its own collect — desynchronizing many sensors
    /// that all just heard the same event from replying at once.
    pub fn etc_trigger<T: TimerDriver, R: BroadcastRadio>(
        &mut self,
        timer: &T,
        bradio: &mut R,
        collect_jitter: Duration,
    ) -> Result<EventId, EtcError> {
        let now = timer.now_ms();
        if !self.suppression.can_trigger_new(now) {
            return Err(EtcError::Suppressed);
        }

        self.own_event_seqn = self.own_event_seqn.wrapping_add(1);
        let event = EventId {
            source: self.self_addr,
            seqn: self.own_event_seqn,
        };
        self.suppression.note_triggered(now, &self.config);
        self.suppression.note_propagated(event, now, &self.config);
        self.event_dedup.is_duplicate(self.self_addr, event.seqn);

        let frame = BroadcastFrame::Event(EventPayload {
            event_seqn: event.seqn,
            event_source: event.source,
        });
        self.send_broadcast_frame(bradio, &frame)?;

        let delay = collect_jitter.clamp(
            self.config.collect_start_delay_min,
            self.config.collect_start_delay_max,
        );
        self.collect_dispatch_timer.arm(now, delay);
        self.collect_dispatch_pending = Some(event);

        Ok(event)
    }

    /// The controller's explicit command API; also used internally once
    /// an aggregation window's policy decision is ready. Fails with
    /// [`EtcError::NoRoute`] when no reverse-path hop is known for
    /// `receiver` — unlike a command already in flight and being relayed
    /// (see `handle_command_unicast`), this call never falls back to an
    /// emergency broadcast on its own; the caller decides what to do
    /// with a `NoRoute`.
    pub fn etc_command<T: TimerDriver, U: UnicastRadio>(
        &mut self,
        _timer: &T,
        uradio: &mut U,
        receiver: NodeAddr,
        event: EventId,
        command: CommandType,
        threshold: u32,
    ) -> Result<(), EtcError> {
        let hop = self.forward.first_hop(receiver).ok_or(EtcError::NoRoute)?;
        let payload = CommandPayload {
            event_seqn: event.seqn,
            event_source: event.source,
            receiver,
            command,
            threshold,
        };
        let header = UnicastHeader {
            unicast_type: UnicastType::Command,
            hops: 0,
            final_receiver: receiver,
        };
        self.send_unicast_frame(uradio, header, hop, UnicastFrame::Command(header, payload))
    }

    /// Dispatch a broadcast frame just received off the radio.
    pub fn on_broadcast_recv<T: TimerDriver, C: EtcCallbacks>(
        &mut self,
        timer: &T,
        cb: &mut C,
        meta: RecvMeta,
        raw: &[u8],
        jitter: Duration,
    ) -> Result<(), EtcError> {
        let frame = BroadcastFrame::decode(raw)?;
        match frame {
            BroadcastFrame::Beacon(payload) => self.handle_beacon(timer, meta, payload, jitter),
            BroadcastFrame::Event(payload) => self.handle_event(timer, payload, jitter)?,
            BroadcastFrame::ForwardDiscoveryRequest(_) | BroadcastFrame::ForwardDiscoveryResponse(_) => {
                // Forward discovery is not implemented; the stack always
                // falls back to an emergency broadcast instead (§4.3).
            }
            BroadcastFrame::EmergencyCommand(payload) => {
                self.handle_emergency_command(timer, payload, jitter, cb)?
            }
            BroadcastFrame::Unknown(_) => {}
        }
        Ok(())
    }

    /// Dispatch a unicast frame just received off the radio.
    pub fn on_unicast_recv<T: TimerDriver, U: UnicastRadio, C: EtcCallbacks>(
        &mut self,
        timer: &T,
        uradio: &mut U,
        cb: &mut C,
        meta: RecvMeta,
        raw: &[u8],
    ) -> Result<(), EtcError> {
        let frame = UnicastFrame::decode(raw)?;
        match frame {
            UnicastFrame::Collect(header, payload) => self.handle_collect(timer, uradio, header, payload, meta),
            UnicastFrame::Command(header, payload) => {
                self.handle_command_unicast(timer, uradio, cb, header, payload, meta)
            }
            UnicastFrame::Unknown(_) => Ok(()),
        }
    }

    /// The link layer's asynchronous result for the unicast frame most
    /// recently handed to it (always the buffer's front entry — only one
    /// unicast frame is ever in flight at a time, per `CONNECTION_UC_
    /// BUFFER_MAX_SEND`).
    pub fn on_unicast_sent<T: TimerDriver, U: UnicastRadio>(
        &mut self,
        timer: &T,
        uradio: &mut U,
        delivered: bool,
    ) -> Result<(), EtcError> {
        let Some(entry) = self.buffer.front().copied() else {
            return Ok(());
        };

        match self.buffer.record_result(delivered, &self.config) {
            Some(SendOutcome::LastChance) => {
                match self.reroute_last_chance(entry.final_receiver, entry.unicast_type, entry.next_hop) {
                    Some(hop) => {
                        if let Some(front) = self.buffer.front_mut() {
                            front.next_hop = hop;
                        }
                        self.flush_front(uradio);
                    }
                    None => {
                        // No alternative route. Give up on the unicast
                        // attempt outright rather than burn the
                        // last-chance retry on a hop we know is gone.
                        self.buffer.record_result(false, &self.config);
                        if entry.unicast_type == UnicastType::Command {
                            self.fall_back_to_emergency(timer, &entry)?;
                        }
                        self.flush_front(uradio);
                    }
                }
            }
            Some(SendOutcome::Retry) => self.flush_front(uradio),
            Some(SendOutcome::Delivered) | Some(SendOutcome::GiveUp) | None => self.flush_front(uradio),
        }
        Ok(())
    }

    /// Poll every internal timer and act on whichever are due. Call this
    /// on a fixed tick (the granularity of [`crate::timer::TimerDriver`]).
    pub fn on_timer_fired<T: TimerDriver, R: BroadcastRadio, U: UnicastRadio, C: EtcCallbacks>(
        &mut self,
        timer: &T,
        bradio: &mut R,
        uradio: &mut U,
        cb: &mut C,
    ) -> Result<(), EtcError> {
        let now = timer.now_ms();

        if self.role == Role::Controller && self.beacon_timer.poll(now).is_some() {
            self.beacon_seqn = self.beacon_seqn.wrapping_add(1);
            let frame = BroadcastFrame::Beacon(BeaconPayload {
                seqn: self.beacon_seqn,
                hopn: 0,
            });
            self.send_broadcast_frame(bradio, &frame)?;
            self.beacon_timer.arm(now, self.config.beacon_interval);
        }

        if self.beacon_forward_pending && self.beacon_forward_timer.poll(now).is_some() {
            self.beacon_forward_pending = false;
            if let Some(payload) = self.parents.outgoing_beacon() {
                let frame = BroadcastFrame::Beacon(payload);
                self.send_broadcast_frame(bradio, &frame)?;
            }
        }

        if let Some(event) = self.event_forward_pending {
            if self.event_forward_timer.poll(now).is_some() {
                self.event_forward_pending = None;
                let frame = BroadcastFrame::Event(EventPayload {
                    event_seqn: event.seqn,
                    event_source: event.source,
                });
                self.send_broadcast_frame(bradio, &frame)?;
            }
        }

        if let Some(event) = self.collect_dispatch_pending {
            if self.collect_dispatch_timer.poll(now).is_some() {
                self.collect_dispatch_pending = None;
                self.dispatch_collect(uradio, event, cb)?;
            }
        }

        if let Some(payload) = self.command_forward_pending {
            if self.command_forward_timer.poll(now).is_some() {
                self.command_forward_pending = None;
                let frame = BroadcastFrame::EmergencyCommand(payload);
                self.send_broadcast_frame(bradio, &frame)?;
            }
        }

        if self.role == Role::Controller && self.collection.is_due(now) {
            if let Some((event, readings)) = self.collection.close() {
                cb.collected(event, &readings);
                self.run_actuation_policy(timer, uradio, event, &readings)?;
            }
        }

        Ok(())
    }

    fn handle_beacon(&mut self, timer: &impl TimerDriver, meta: RecvMeta, payload: BeaconPayload, jitter: Duration) {
        if self.role == Role::Controller {
            return;
        }
        let now = timer.now_ms();
        let candidate = ParentCandidate {
            addr: meta.sender,
            hopn: payload.hopn,
            rssi: meta.rssi,
            seqn: payload.seqn,
        };
        if self.parents.consider(candidate, &self.config, &StrongestRssi) {
            let delay = jitter.min(self.config.beacon_forward_delay_max);
            self.beacon_forward_timer.arm(now, delay);
            self.beacon_forward_pending = true;
        }
    }

    fn handle_event(&mut self, timer: &impl TimerDriver, payload: EventPayload, jitter: Duration) -> Result<(), EtcError> {
        let event = EventId {
            source: payload.event_source,
            seqn: payload.event_seqn,
        };
        let now = timer.now_ms();

        if self.event_dedup.is_duplicate(event.source, event.seqn) {
            return Ok(());
        }
        if !self.suppression.should_propagate(now) {
            return Ok(());
        }
        self.suppression.note_propagated(event, now, &self.config);

        if self.role == Role::Controller {
            self.collection.open(event, now, &self.config);
            return Ok(());
        }

        let forward_delay = jitter.min(self.config.event_forward_delay_max);
        self.event_forward_timer.arm(now, forward_delay);
        self.event_forward_pending = Some(event);

        if self.role == Role::SensorActuator {
            let collect_delay = jitter.clamp(
                self.config.collect_start_delay_min,
                self.config.collect_start_delay_max,
            );
            self.collect_dispatch_timer.arm(now, collect_delay);
            self.collect_dispatch_pending = Some(event);
        }

        Ok(())
    }

    fn handle_emergency_command<C: EtcCallbacks>(
        &mut self,
        timer: &impl TimerDriver,
        payload: CommandPayload,
        jitter: Duration,
        cb: &mut C,
    ) -> Result<(), EtcError> {
        if self.command_dedup.is_duplicate(payload.receiver, payload.event_seqn) {
            return Ok(());
        }

        if self.self_addr == payload.receiver && self.role == Role::SensorActuator {
            self.apply_command(cb, payload);
            let event = EventId {
                source: payload.event_source,
                seqn: payload.event_seqn,
            };
            self.suppression.shorten_on_command(event, timer.now_ms(), &self.config);
            return Ok(());
        }

        let now = timer.now_ms();
        let delay = jitter.min(self.config.event_forward_delay_max);
        self.command_forward_timer.arm(now, delay);
        self.command_forward_pending = Some(payload);
        Ok(())
    }

    fn handle_collect<U: UnicastRadio>(
        &mut self,
        timer: &impl TimerDriver,
        uradio: &mut U,
        header: UnicastHeader,
        payload: CollectPayload,
        meta: RecvMeta,
    ) -> Result<(), EtcError> {
        if buffer::exceeds_max_hops(header.hops, &self.config) {
            return Err(EtcError::MaxHopsExceeded);
        }

        self.forward.learn(payload.sender, meta.sender, header.hops);

        if self.role == Role::Controller {
            let event = EventId {
                source: payload.event_source,
                seqn: payload.event_seqn,
            };
            let now = timer.now_ms();
            self.collection.open(event, now, &self.config);
            self.collection.record(event, payload.sender, payload);
            return Ok(());
        }

        let Some(parent) = self.parents.best().map(|p| p.addr) else {
            return Err(EtcError::Disconnected);
        };
        if buffer::would_loop(meta.sender, parent) {
            return Err(EtcError::LoopDetected);
        }

        let next_header = UnicastHeader {
            unicast_type: UnicastType::Collect,
            hops: header.hops + 1,
            final_receiver: header.final_receiver,
        };
        self.send_unicast_frame(uradio, next_header, parent, UnicastFrame::Collect(next_header, payload))
    }

    fn handle_command_unicast<U: UnicastRadio, C: EtcCallbacks>(
        &mut self,
        timer: &impl TimerDriver,
        uradio: &mut U,
        cb: &mut C,
        header: UnicastHeader,
        payload: CommandPayload,
        meta: RecvMeta,
    ) -> Result<(), EtcError> {
        if buffer::exceeds_max_hops(header.hops, &self.config) {
            return Err(EtcError::MaxHopsExceeded);
        }

        if self.self_addr == header.final_receiver {
            if self.role == Role::SensorActuator {
                self.apply_command(cb, payload);
                let event = EventId {
                    source: payload.event_source,
                    seqn: payload.event_seqn,
                };
                self.suppression.shorten_on_command(event, timer.now_ms(), &self.config);
            }
            return Ok(());
        }

        match self.forward.first_hop(header.final_receiver) {
            Some(hop) if hop != meta.sender => {
                let next_header = UnicastHeader {
                    unicast_type: UnicastType::Command,
                    hops: header.hops + 1,
                    final_receiver: header.final_receiver,
                };
                self.send_unicast_frame(uradio, next_header, hop, UnicastFrame::Command(next_header, payload))
            }
            _ => {
                self.command_forward_pending = Some(payload);
                self.command_forward_timer.arm(timer.now_ms(), Duration::ZERO);
                Ok(())
            }
        }
    }

    /// Runs the cross-sensor boundary policy (§6) over whichever sensors
    /// reported this window, then dispatches a command for every sensor
    /// the policy didn't leave at `CommandType::None`. A sensor that
    /// didn't report has no reading to compare with the others and takes
    /// no part in the decision.
    fn run_actuation_policy<T: TimerDriver, U: UnicastRadio>(
        &mut self,
        timer: &T,
        uradio: &mut U,
        event: EventId,
        readings: &[Option<CollectPayload>; SENSORS],
    ) -> Result<(), EtcError> {
        let policy = BoundaryPolicy;
        const EMPTY: Actuation = Actuation { command: CommandType::None, threshold: 0 };
        const EMPTY_READING: SensorReading = SensorReading { value: 0, threshold: 0 };

        let mut reporting = [EMPTY_READING; SENSORS];
        let mut reporting_index = [0usize; SENSORS];
        let mut count = 0;
        for (i, reading) in readings.iter().enumerate() {
            if let Some(collect) = reading {
                reporting[count] = SensorReading {
                    value: collect.value,
                    threshold: collect.threshold,
                };
                reporting_index[count] = i;
                count += 1;
            }
        }

        let mut decisions = [EMPTY; SENSORS];
        policy.decide(&reporting[..count], &mut decisions[..count]);

        for k in 0..count {
            let actuation = decisions[k];
            if actuation.command == CommandType::None {
                continue;
            }
            let i = reporting_index[k];
            self.etc_command(timer, uradio, self.sensors[i], event, actuation.command, actuation.threshold)?;
        }
        Ok(())
    }

    fn dispatch_collect<U: UnicastRadio>(
        &mut self,
        uradio: &mut U,
        event: EventId,
        cb: &mut impl EtcCallbacks,
    ) -> Result<(), EtcError> {
        let Some(parent) = self.parents.best().map(|p| p.addr) else {
            return Err(EtcError::Disconnected);
        };
        let value = cb.sense();
        let payload = CollectPayload {
            event_seqn: event.seqn,
            event_source: event.source,
            sender: self.self_addr,
            value,
            threshold: self.sensor_threshold,
        };
        let header = UnicastHeader {
            unicast_type: UnicastType::Collect,
            hops: 0,
            final_receiver: self.controller,
        };
        self.send_unicast_frame(uradio, header, parent, UnicastFrame::Collect(header, payload))
    }

    fn apply_command(&mut self, cb: &mut impl EtcCallbacks, payload: CommandPayload) {
        match payload.command {
            // RESET carries MAX_DIFF as its threshold (§6): the sensor
            // re-arms itself there rather than at a stale prior value.
            CommandType::Reset | CommandType::Threshold => self.sensor_threshold = payload.threshold,
            CommandType::None => {}
        }
        cb.actuate(payload.command, self.sensor_threshold);
    }

    fn reroute_last_chance(
        &mut self,
        final_receiver: NodeAddr,
        unicast_type: UnicastType,
        failed_hop: NodeAddr,
    ) -> Option<NodeAddr> {
        match unicast_type {
            UnicastType::Collect => {
                self.parents.remove(failed_hop);
                self.parents.best().map(|p| p.addr)
            }
            UnicastType::Command => {
                self.forward.remove_hop(failed_hop);
                self.forward.first_hop(final_receiver)
            }
        }
    }

    fn fall_back_to_emergency(
        &mut self,
        timer: &impl TimerDriver,
        entry: &crate::buffer::BufferEntry<FRAME_CAP>,
    ) -> Result<(), EtcError> {
        let payload_bytes = &entry.frame.data()[UnicastHeader::WIRE_LEN..];
        let payload = crate::codec::CommandPayload::decode(payload_bytes)?;
        self.command_forward_pending = Some(payload);
        self.command_forward_timer.arm(timer.now_ms(), Duration::ZERO);
        Ok(())
    }

    fn send_broadcast_frame<R: BroadcastRadio>(&self, bradio: &mut R, frame: &BroadcastFrame) -> Result<(), EtcError> {
        let mut raw = [0u8; FRAME_CAP];
        let n = frame.encode(&mut raw)?;
        if bradio.send_broadcast(self.config.broadcast_channel, &raw[..n]) {
            Ok(())
        } else {
            Err(EtcError::SendError)
        }
    }

    fn send_unicast_frame<U: UnicastRadio>(
        &mut self,
        uradio: &mut U,
        header: UnicastHeader,
        next_hop: NodeAddr,
        frame: UnicastFrame,
    ) -> Result<(), EtcError> {
        let mut raw = [0u8; FRAME_CAP];
        let n = frame.encode(&mut raw)?;
        let mut packet: PacketBuffer<FRAME_CAP> = PacketBuffer::new();
        packet.copy_from(&raw[..n]);

        let was_empty = self.buffer.is_empty();
        self.buffer
            .enqueue(next_hop, header.final_receiver, header.unicast_type, packet)?;
        if was_empty {
            self.flush_front(uradio);
        }
        Ok(())
    }

    fn flush_front<U: UnicastRadio>(&mut self, uradio: &mut U) {
        if let Some(entry) = self.buffer.front() {
            uradio.send_unicast(self.config.unicast_channel(), entry.next_hop, entry.frame.data());
        }
    }
}

/// Compile-time assertion helper: a `FRAME_CAP` too small to hold the
/// largest wire frame would silently truncate every encode. Call this
/// once at startup (e.g. in a test) with the same const generics the
/// node was built with.
pub const fn assert_frame_cap_sufficient<const FRAME_CAP: usize>() {
    assert!(FRAME_CAP >= MAX_UNICAST_FRAME_LEN);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTimerDriver, LoopbackRadio, RecordingCallbacks};

    fn addr(b: u8) -> NodeAddr {
        NodeAddr::new([b, 0])
    }

    const CONTROLLER: NodeAddr = NodeAddr::new([0x01, 0]);
    const SENSOR_A: NodeAddr = NodeAddr::new([0x02, 0]);

    fn node() -> EtcNode<1, 3, 2, 4, { MAX_UNICAST_FRAME_LEN }> {
        EtcNode::new(SENSOR_A, CONTROLLER, [SENSOR_A], Config::default())
    }

    #[test]
    fn frame_cap_assertion_holds_for_the_shared_constant() {
        assert_frame_cap_sufficient::<{ MAX_UNICAST_FRAME_LEN }>();
    }

    #[test]
    fn role_is_derived_at_construction() {
        let n = node();
        assert_eq!(n.role(), Role::SensorActuator);
        assert!(!n.is_connected());
    }

    #[test]
    fn sensor_hears_beacon_and_becomes_connected() {
        let mut n = node();
        let timer = FakeTimerDriver::new(0);
        let mut cb = RecordingCallbacks::default();
        let meta = RecvMeta {
            sender: CONTROLLER,
            rssi: -40,
        };
        let mut raw = [0u8; 8];
        let frame = BroadcastFrame::Beacon(BeaconPayload { seqn: 1, hopn: 0 });
        let n_bytes = frame.encode(&mut raw).unwrap();
        n.on_broadcast_recv(&timer, &mut cb, meta, &raw[..n_bytes], Duration::ZERO)
            .unwrap();
        assert!(n.is_connected());
    }

    #[test]
    fn trigger_is_suppressed_immediately_after_firing() {
        let mut n = node();
        let timer = FakeTimerDriver::new(0);
        let mut bradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
        n.etc_trigger(&timer, &mut bradio, Duration::from_secs(3)).unwrap();
        let second = n.etc_trigger(&timer, &mut bradio, Duration::from_secs(3));
        assert_eq!(second, Err(EtcError::Suppressed));
    }

    #[test]
    fn update_below_threshold_does_not_trigger() {
        let mut n = node();
        let timer = FakeTimerDriver::new(0);
        let mut bradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
        n.etc_update(10, &timer, &mut bradio).unwrap();
        assert_eq!(bradio.broadcast_count(), 0);
    }
}
