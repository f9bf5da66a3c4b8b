//! Multi-node integration scenarios driving `EtcNode` end to end over the
//! in-memory test doubles, without any real radio or clock.

use core::time::Duration;

use etc_protocol::beacon::ParentCandidate;
use etc_protocol::codec::{
    BeaconPayload, BroadcastFrame, CommandPayload, EventPayload, UnicastFrame, UnicastHeader, UnicastType,
    MAX_UNICAST_FRAME_LEN,
};
use etc_protocol::config::Config;
use etc_protocol::radio::RecvMeta;
use etc_protocol::testing::{FakeTimerDriver, LoopbackRadio, RecordingCallbacks};
use etc_protocol::{CommandType, EtcError, EtcNode, EventId, NodeAddr, Role};

const CONTROLLER: NodeAddr = NodeAddr::new([0x01, 0]);
const FORWARDER: NodeAddr = NodeAddr::new([0x02, 0]);
const SENSOR: NodeAddr = NodeAddr::new([0x03, 0]);

type Sensor = EtcNode<1, 3, 2, 4, { MAX_UNICAST_FRAME_LEN }>;
type Fwd = EtcNode<1, 3, 2, 4, { MAX_UNICAST_FRAME_LEN }>;
type Ctl = EtcNode<1, 3, 2, 4, { MAX_UNICAST_FRAME_LEN }>;

fn controller() -> Ctl {
    EtcNode::new(CONTROLLER, CONTROLLER, [SENSOR], Config::default())
}

fn forwarder() -> Fwd {
    EtcNode::new(FORWARDER, CONTROLLER, [SENSOR], Config::default())
}

fn sensor() -> Sensor {
    EtcNode::new(SENSOR, CONTROLLER, [SENSOR], Config::default())
}

fn recv(sender: NodeAddr, rssi: i16) -> RecvMeta {
    RecvMeta { sender, rssi }
}

/// Builds a two-hop tree: controller -> forwarder -> sensor, by hand-
/// delivering the beacon each node would actually broadcast.
fn build_tree(fwd: &mut Fwd, sens: &mut Sensor, timer: &FakeTimerDriver, cb: &mut RecordingCallbacks) {
    let root_beacon = BroadcastFrame::Beacon(BeaconPayload { seqn: 1, hopn: 0 });
    let mut raw = [0u8; 8];
    let n = root_beacon.encode(&mut raw).unwrap();
    fwd.on_broadcast_recv(timer, cb, recv(CONTROLLER, -40), &raw[..n], Duration::ZERO)
        .unwrap();
    assert!(fwd.is_connected());

    // the forwarder would now re-broadcast the same seqn, one hop deeper
    let relayed = BroadcastFrame::Beacon(BeaconPayload { seqn: 1, hopn: 1 });
    let n = relayed.encode(&mut raw).unwrap();
    sens.on_broadcast_recv(timer, cb, recv(FORWARDER, -50), &raw[..n], Duration::ZERO)
        .unwrap();
    assert!(sens.is_connected());
}

#[test]
fn two_hop_tree_builds_from_a_single_controller_beacon() {
    let timer = FakeTimerDriver::new(0);
    let mut cb = RecordingCallbacks::default();
    let mut fwd = forwarder();
    let mut sens = sensor();
    build_tree(&mut fwd, &mut sens, &timer, &mut cb);

    assert_eq!(fwd.role(), Role::Forwarder);
    assert_eq!(sens.role(), Role::SensorActuator);
}

#[test]
fn trigger_then_collect_reaches_the_controller_through_the_forwarder() {
    let timer = FakeTimerDriver::new(0);
    let mut cb = RecordingCallbacks { sensed_value: 12_000, ..Default::default() };
    let mut ctl = controller();
    let mut fwd = forwarder();
    let mut sens = sensor();
    build_tree(&mut fwd, &mut sens, &timer, &mut cb);

    let mut bradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    let event = sens
        .etc_trigger(&timer, &mut bradio, Duration::ZERO)
        .expect("trigger not suppressed on a cold node");

    // the event broadcast reaches the forwarder, which schedules its own
    // re-broadcast (not exercised here) and the controller directly.
    let event_frame = BroadcastFrame::Event(EventPayload {
        event_seqn: event.seqn,
        event_source: event.source,
    });
    let mut raw = [0u8; 8];
    let n = event_frame.encode(&mut raw).unwrap();
    ctl.on_broadcast_recv(&timer, &mut cb, recv(SENSOR, -40), &raw[..n], Duration::ZERO)
        .unwrap();

    // the collect dispatch is clamped to at least `collect_start_delay_min`
    // regardless of the zero jitter passed above, so the timer driver has
    // to advance to that deadline before the dispatch is due.
    let collect_due = FakeTimerDriver::new(Config::default().collect_start_delay_min.as_millis() as u64);
    let mut uradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    sens.on_timer_fired(&collect_due, &mut bradio, &mut uradio, &mut cb).unwrap();
    let (_dest, collect_bytes) = uradio.last_unicast().expect("sensor dispatched its collect");

    // hand that frame to the forwarder, which relays it one hop up to the controller
    let mut fwd_uradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    fwd.on_unicast_recv(&timer, &mut fwd_uradio, &mut cb, recv(SENSOR, -50), collect_bytes)
        .unwrap();
    let (_dest, relayed_bytes) = fwd_uradio.last_unicast().expect("forwarder relayed the collect");

    let mut ctl_uradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    ctl.on_unicast_recv(&timer, &mut ctl_uradio, &mut cb, recv(FORWARDER, -50), relayed_bytes)
        .unwrap();

    // advance past the aggregation window and let the controller close it
    let later = FakeTimerDriver::new(Config::default().controller_collect_wait.as_millis() as u64);
    let mut ctl_bradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    ctl.on_timer_fired(&later, &mut ctl_bradio, &mut ctl_uradio, &mut cb).unwrap();

    assert_eq!(cb.last_collected, Some(event));
}

#[test]
fn controller_command_with_no_learned_route_returns_no_route() {
    let timer = FakeTimerDriver::new(0);
    let mut cb = RecordingCallbacks::default();
    let mut ctl = controller();
    let mut fwd = forwarder();
    let mut sens = sensor();
    build_tree(&mut fwd, &mut sens, &timer, &mut cb);

    // the forwarder relayed a collect from the sensor once, which teaches
    // *its* forward table the reverse path; the controller never saw that
    // relay directly, so its own table still has no entry for the sensor.
    let mut bradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    let event = sens.etc_trigger(&timer, &mut bradio, Duration::ZERO).unwrap();
    let collect_due = FakeTimerDriver::new(Config::default().collect_start_delay_min.as_millis() as u64);
    let mut uradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    sens.on_timer_fired(&collect_due, &mut bradio, &mut uradio, &mut cb).unwrap();
    let (_dest, collect_bytes) = uradio.last_unicast().unwrap();
    let mut fwd_uradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    fwd.on_unicast_recv(&timer, &mut fwd_uradio, &mut cb, recv(SENSOR, -50), collect_bytes)
        .unwrap();

    let mut ctl_uradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    let err = ctl
        .etc_command(&timer, &mut ctl_uradio, SENSOR, event, CommandType::Threshold, 15_000)
        .unwrap_err();
    assert_eq!(err, EtcError::NoRoute);
}

#[test]
fn command_relay_with_no_further_route_falls_back_to_emergency_broadcast() {
    let timer = FakeTimerDriver::new(0);
    let mut cb = RecordingCallbacks::default();
    let mut fwd = forwarder();
    let mut sens = sensor();

    // the forwarder is handed a command for the sensor as if relayed from
    // upstream; it never learned a reverse-path hop for the sensor, so
    // `handle_command_unicast` falls back to an emergency broadcast rather
    // than returning an error.
    let header = UnicastHeader {
        unicast_type: UnicastType::Command,
        hops: 0,
        final_receiver: SENSOR,
    };
    let payload = CommandPayload {
        event_seqn: 1,
        event_source: SENSOR,
        receiver: SENSOR,
        command: CommandType::Threshold,
        threshold: 15_000,
    };
    let frame = UnicastFrame::Command(header, payload);
    let mut raw = [0u8; MAX_UNICAST_FRAME_LEN];
    let n = frame.encode(&mut raw).unwrap();

    let mut uradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    fwd.on_unicast_recv(&timer, &mut uradio, &mut cb, recv(CONTROLLER, -40), &raw[..n])
        .unwrap();

    let mut bradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    fwd.on_timer_fired(&timer, &mut bradio, &mut uradio, &mut cb).unwrap();
    let emergency = bradio.last_broadcast().expect("forwarder fell back to emergency broadcast");

    sens.on_broadcast_recv(&timer, &mut cb, recv(FORWARDER, -40), emergency, Duration::ZERO)
        .unwrap();
    assert_eq!(cb.last_actuation, Some((CommandType::Threshold, 15_000)));
}

#[test]
fn duplicate_event_is_not_re_propagated() {
    let timer = FakeTimerDriver::new(0);
    let mut cb = RecordingCallbacks::default();
    let mut fwd = forwarder();

    let frame = BroadcastFrame::Event(EventPayload {
        event_seqn: 5,
        event_source: SENSOR,
    });
    let mut raw = [0u8; 8];
    let n = frame.encode(&mut raw).unwrap();

    fwd.on_broadcast_recv(&timer, &mut cb, recv(SENSOR, -40), &raw[..n], Duration::ZERO)
        .unwrap();
    let mut bradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    let mut uradio: LoopbackRadio<{ MAX_UNICAST_FRAME_LEN }, 4> = LoopbackRadio::default();
    fwd.on_timer_fired(&timer, &mut bradio, &mut uradio, &mut cb).unwrap();
    let first_forward_count = bradio.broadcast_count();
    assert_eq!(first_forward_count, 1);

    // same event again: should not schedule a second forward
    fwd.on_broadcast_recv(&timer, &mut cb, recv(SENSOR, -40), &raw[..n], Duration::ZERO)
        .unwrap();
    fwd.on_timer_fired(&timer, &mut bradio, &mut uradio, &mut cb).unwrap();
    assert_eq!(bradio.broadcast_count(), first_forward_count);
}

#[test]
fn parent_list_drops_a_failed_parent_and_falls_back_to_the_next_best() {
    use etc_protocol::beacon::{ParentList, StrongestRssi};

    let cfg = Config::default();
    let mut parents: ParentList<3> = ParentList::new();
    parents.consider(
        ParentCandidate { addr: FORWARDER, hopn: 1, rssi: -40, seqn: 1 },
        &cfg,
        &StrongestRssi,
    );
    parents.consider(
        ParentCandidate { addr: SENSOR, hopn: 2, rssi: -60, seqn: 1 },
        &cfg,
        &StrongestRssi,
    );
    assert_eq!(parents.best().unwrap().addr, FORWARDER);

    parents.remove(FORWARDER);
    assert_eq!(parents.best().unwrap().addr, SENSOR);
}

#[test]
fn forward_table_loop_is_broken_by_dropping_the_failed_hop() {
    use etc_protocol::forward::ForwardTable;

    let mut table: ForwardTable<1, 2> = ForwardTable::new([SENSOR]);
    table.learn(SENSOR, FORWARDER, 1);
    assert_eq!(table.first_hop(SENSOR), Some(FORWARDER));

    table.remove_hop(FORWARDER);
    assert_eq!(table.first_hop(SENSOR), None);
}
