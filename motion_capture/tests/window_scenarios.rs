//! End-to-end scenarios for the capture loop, driven tick by tick with a
//! scripted sensor and an in-memory transport.
//!
//! Run with logging: RUST_LOG=debug cargo test -p motion_capture -- --nocapture

use std::sync::Once;

use motion_capture::{
    CaptureConfig, CaptureNode, ContinuousTrigger, EdgeFlag, EdgeTrigger, Error, Frame, Link, LinkError, PacketTransport, Reading,
    SampleSource, SendError, StreamStep, ThresholdTrigger, TransmissionState, Transport, TriggerEvent,
    WindowAssembler,
};

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

const CAPACITY: usize = 60;
const TICK_MS: u64 = 16;

#[derive(Debug)]
struct Exhausted;

/// Plays back a fixed list of readings, one per tick.
struct Scripted {
    readings: Vec<Reading>,
    next: usize,
}

impl Scripted {
    fn new(readings: Vec<Reading>) -> Self {
        Self { readings, next: 0 }
    }
}

impl SampleSource for Scripted {
    type Error = Exhausted;

    fn read(&mut self) -> Result<Reading, Exhausted> {
        let reading = self.readings.get(self.next).copied().ok_or(Exhausted)?;
        self.next += 1;
        Ok(reading)
    }
}

#[derive(Default)]
struct Recorder {
    offline: bool,
    sent: Vec<(u32, Reading)>,
}

impl Transport for Recorder {
    fn is_connected(&self) -> bool {
        !self.offline
    }

    fn send(&mut self, reading: &Reading, position: u32) -> Result<(), SendError> {
        if self.offline {
            return Err(SendError::Disconnected);
        }
        self.sent.push((position, *reading));
        Ok(())
    }
}

/// Every field carries the index, so a torn or misplaced reading shows.
fn tagged(i: usize) -> Reading {
    let v = i as f64;
    Reading::new(v, v, v, v, v, v)
}

/// Constant accel magnitude, index in the gyro fields.
fn motion(magnitude: f64, i: usize) -> Reading {
    let v = i as f64;
    Reading::new(0.0, 0.0, magnitude, v, v, v)
}

fn positions(sent: &[(u32, Reading)]) -> Vec<u32> {
    sent.iter().map(|(p, _)| *p).collect()
}

fn tick_all<S, T, X>(node: &mut CaptureNode<S, T, X, CAPACITY>, from: usize, count: usize) -> Vec<TriggerEvent>
where
    S: SampleSource,
    T: motion_capture::Trigger,
    X: Transport,
{
    (from..from + count)
        .filter_map(|i| node.tick(i as u64 * TICK_MS).ok())
        .map(|report| report.event)
        .collect()
}

#[test]
fn edge_window_streams_live_tail_in_order() {
    init_logger();
    let flag = EdgeFlag::new();
    let source = Scripted::new((0..200).map(tagged).collect());
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        source,
        EdgeTrigger::new(&flag),
        Recorder::default(),
    )
    .unwrap();

    tick_all(&mut node, 0, 60);
    assert!(node.transport().sent.is_empty());
    assert_eq!(node.state(), TransmissionState::Idle);

    flag.on_edge_event();
    let report = node.tick(60 * TICK_MS).unwrap();
    assert_eq!(report.event, TriggerEvent::Fire);
    let TransmissionState::Streaming { anchor, .. } = node.state() else {
        panic!("not streaming after fire: {:?}", node.state());
    };

    tick_all(&mut node, 61, 59);

    let sent = &node.transport().sent;
    assert_eq!(positions(sent), (0..60).collect::<Vec<u32>>());
    let values: Vec<Reading> = sent.iter().map(|(_, r)| *r).collect();
    assert_eq!(values, (60..120).map(tagged).collect::<Vec<_>>());
    let replay: Vec<Reading> = node.history().read_window(anchor, CAPACITY).collect();
    assert_eq!(values, replay);

    assert_eq!(node.state(), TransmissionState::Idle);
    assert!(!flag.is_armed());
}

#[test]
fn edge_stop_ends_window_and_next_press_restarts() {
    init_logger();
    let flag = EdgeFlag::new();
    let source = Scripted::new((0..200).map(tagged).collect());
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        source,
        EdgeTrigger::new(&flag),
        Recorder::default(),
    )
    .unwrap();

    tick_all(&mut node, 0, 5);
    flag.on_edge_event();
    tick_all(&mut node, 5, 10);
    flag.on_edge_event();
    let report = node.tick(15 * TICK_MS).unwrap();
    assert_eq!(report.event, TriggerEvent::Stop);
    assert_eq!(report.step, StreamStep::Idle);
    assert_eq!(node.transport().sent.len(), 10);

    tick_all(&mut node, 16, 5);
    assert_eq!(node.transport().sent.len(), 10);

    flag.on_edge_event();
    tick_all(&mut node, 21, 3);
    let sent = &node.transport().sent;
    assert_eq!(positions(&sent[10..]), [0, 1, 2]);
    assert_eq!(sent[10].1, tagged(21));
    assert_eq!(node.windows_started(), 2);
}

#[test]
fn threshold_fires_once_on_magnitude_step() {
    init_logger();
    let magnitudes = [1.0, 1.0, 1.0, 10.0, 1.0, 1.0];
    let source = Scripted::new(magnitudes.iter().enumerate().map(|(i, m)| motion(*m, i)).collect());
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        source,
        ThresholdTrigger::new(5.0, 1000),
        Recorder::default(),
    )
    .unwrap();

    let events = tick_all(&mut node, 0, magnitudes.len());
    let fires: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| **e == TriggerEvent::Fire)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(fires, [3]);
}

#[test]
fn cooldown_allows_one_fire_for_back_to_back_exceedances() {
    init_logger();
    let magnitudes = [0.0, 10.0, 0.0, 10.0, 0.0];
    let source = Scripted::new(magnitudes.iter().enumerate().map(|(i, m)| motion(*m, i)).collect());
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        source,
        ThresholdTrigger::new(5.0, 1000),
        Recorder::default(),
    )
    .unwrap();

    let events = tick_all(&mut node, 0, magnitudes.len());
    assert_eq!(events.iter().filter(|e| **e == TriggerEvent::Fire).count(), 1);
    assert_eq!(node.windows_started(), 1);
}

#[test]
fn threshold_window_straddles_the_motion() {
    init_logger();
    let readings: Vec<Reading> = (0..150)
        .map(|i| motion(if i == 70 { 30.0 } else { 9.8 }, i))
        .collect();
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        Scripted::new(readings),
        ThresholdTrigger::new(5.0, 1000),
        Recorder::default(),
    )
    .unwrap();

    tick_all(&mut node, 0, 150);

    let sent = &node.transport().sent;
    assert_eq!(positions(sent), (0..60).collect::<Vec<u32>>());
    let indices: Vec<f64> = sent.iter().map(|(_, r)| r.gx).collect();
    let want: Vec<f64> = (41..=100).map(|i| i as f64).collect();
    assert_eq!(indices, want);
    assert_eq!(node.windows_started(), 1);
}

#[test]
fn fires_during_streaming_do_not_restart_window() {
    init_logger();
    // a spike every fourth tick, no cool-down
    let readings: Vec<Reading> = (0..200)
        .map(|i| motion(if i >= 30 && i % 4 == 0 { 40.0 } else { 9.8 }, i))
        .collect();
    let config = CaptureConfig {
        cooldown_ms: 0,
        ..CaptureConfig::for_capacity(CAPACITY)
    };
    let trigger = ThresholdTrigger::from_config(&config);
    let mut node =
        CaptureNode::<_, _, _, CAPACITY>::new(config, Scripted::new(readings), trigger, Recorder::default()).unwrap();

    // window runs from the fire at tick 32 through tick 91; tick 92 spikes again
    let events = tick_all(&mut node, 0, 92);
    assert!(events.iter().filter(|e| **e == TriggerEvent::Fire).count() > 1);
    assert_eq!(node.windows_started(), 1);
    assert_eq!(positions(&node.transport().sent), (0..60).collect::<Vec<u32>>());
}

#[test]
fn disconnect_mid_window_stops_sending() {
    init_logger();
    let flag = EdgeFlag::new();
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        Scripted::new((0..100).map(tagged).collect()),
        EdgeTrigger::new(&flag),
        Recorder::default(),
    )
    .unwrap();

    flag.on_edge_event();
    tick_all(&mut node, 0, 5);
    assert_eq!(node.transport().sent.len(), 5);

    node.transport_mut().offline = true;
    match node.tick(5 * TICK_MS) {
        Err(Error::TransportDisconnected { position, dropped }) => {
            assert_eq!(position, 5);
            assert_eq!(dropped, 55);
        }
        other => panic!("expected disconnect, got {:?}", other.map(|r| r.step)),
    }
    assert_eq!(node.state(), TransmissionState::Idle);
    assert!(!flag.is_armed());

    node.transport_mut().offline = false;
    tick_all(&mut node, 6, 20);
    assert_eq!(node.transport().sent.len(), 5);
}

#[test]
fn exhausted_source_skips_ticks() {
    init_logger();
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        Scripted::new((0..3).map(tagged).collect()),
        ThresholdTrigger::new(5.0, 1000),
        Recorder::default(),
    )
    .unwrap();

    tick_all(&mut node, 0, 10);
    assert_eq!(node.ticks(), 3);
    assert_eq!(node.skipped_ticks(), 7);
    assert_eq!(node.history().len(), 3);
    assert!(matches!(node.tick(0), Err(Error::SampleRead(Exhausted))));
}

struct Loopback {
    assembler: WindowAssembler<CAPACITY>,
    windows: Vec<Vec<Frame>>,
}

impl Link for Loopback {
    fn is_connected(&self) -> bool {
        true
    }

    fn notify(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        if let Ok(Some(window)) = self.assembler.push_bytes(payload) {
            self.windows.push(window.frames().to_vec());
        }
        Ok(())
    }
}

#[test]
fn frames_reassemble_on_the_peer() {
    init_logger();
    let flag = EdgeFlag::new();
    let link = Loopback {
        assembler: WindowAssembler::new(CAPACITY).unwrap(),
        windows: Vec::new(),
    };
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        Scripted::new((0..300).map(tagged).collect()),
        EdgeTrigger::new(&flag),
        PacketTransport::new(link),
    )
    .unwrap();

    flag.on_edge_event();
    tick_all(&mut node, 0, 100);
    flag.on_edge_event();
    tick_all(&mut node, 100, 100);

    let transport = node.transport();
    assert_eq!(transport.frames_sent(), 120);
    let windows = &transport.link().windows;
    assert_eq!(windows.len(), 2);
    let first: Vec<Reading> = windows[0].iter().map(|f| f.reading).collect();
    assert_eq!(first, (0..60).map(tagged).collect::<Vec<_>>());
    assert_eq!(windows[1][0].reading, tagged(100));
    assert_eq!(windows[1][59].position, 59);
}

#[test]
fn continuous_mode_streams_every_reading_by_slot() {
    init_logger();
    let link = Loopback {
        assembler: WindowAssembler::new(CAPACITY).unwrap(),
        windows: Vec::new(),
    };
    let mut node = CaptureNode::<_, _, _, CAPACITY>::new(
        CaptureConfig::for_capacity(CAPACITY),
        Scripted::new((0..130).map(tagged).collect()),
        ContinuousTrigger,
        PacketTransport::new(link),
    )
    .unwrap();

    for i in 0..130 {
        let report = node.tick(i * TICK_MS).unwrap();
        assert_eq!(report.event, TriggerEvent::None);
        assert!(matches!(
            report.step,
            StreamStep::Emitted { delivered: true, window_complete: false, .. }
        ));
    }
    assert_eq!(node.state(), TransmissionState::Idle);
    assert_eq!(node.windows_started(), 0);

    let transport = node.transport();
    assert_eq!(transport.frames_sent(), 130);
    let laps = &transport.link().windows;
    assert_eq!(laps.len(), 2);
    let second: Vec<Reading> = laps[1].iter().map(|f| f.reading).collect();
    assert_eq!(second, (60..120).map(tagged).collect::<Vec<_>>());
    assert_eq!(transport.link().assembler.pending(), 10);
}
