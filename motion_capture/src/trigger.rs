//! Trigger strategies deciding when a window becomes worth sending.
//!
//! Triggers are polled once per tick with the reading just written to
//! history. The edge trigger follows a flag flipped from interrupt context and
//! the threshold trigger watches the acceleration magnitude itself. The
//! continuous trigger never fires: it selects streaming of every reading.

use core::sync::atomic::{AtomicBool, Ordering};

use libm::fabs;
use log::{debug, info};

use crate::config::CaptureConfig;
use crate::reading::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    None,
    Fire,
    Stop,
}

/// Where a window sits relative to the firing tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPlacement {
    /// Starts at the firing tick and follows the samples as they arrive.
    LiveTail,
    /// Half pre-trigger history, half live samples.
    Straddle,
    /// No windows; each tick's reading is sent as it is written.
    Continuous,
}

pub trait Trigger {
    fn poll(&mut self, latest: &Reading, now_ms: u64) -> TriggerEvent;

    fn placement(&self) -> WindowPlacement;

    /// Called when a window finished or was dropped without a `Stop`.
    fn window_ended(&mut self) {}
}

/// Armed flag shared between the button interrupt and the sampling loop.
///
/// The interrupt side only ever calls [`EdgeFlag::on_edge_event`]; the loop
/// observes the flag at the start of its next tick.
pub struct EdgeFlag {
    armed: AtomicBool,
}

impl Default for EdgeFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeFlag {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
        }
    }

    /// Toggles the armed state. Safe to call from an interrupt handler.
    pub fn on_edge_event(&self) {
        // load + store rather than fetch_xor: no CAS on thumbv6m
        critical_section::with(|_| {
            let armed = self.armed.load(Ordering::Relaxed);
            self.armed.store(!armed, Ordering::Release);
        });
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn disarm(&self) {
        critical_section::with(|_| self.armed.store(false, Ordering::Release));
    }
}

/// Fires on the rising edge of an [`EdgeFlag`], stops on the falling edge.
/// No debouncing; the event source is expected to do that.
pub struct EdgeTrigger<'a> {
    flag: &'a EdgeFlag,
    last: bool,
}

impl<'a> EdgeTrigger<'a> {
    pub fn new(flag: &'a EdgeFlag) -> Self {
        Self {
            flag,
            last: flag.is_armed(),
        }
    }
}

impl Trigger for EdgeTrigger<'_> {
    fn poll(&mut self, _latest: &Reading, _now_ms: u64) -> TriggerEvent {
        let armed = self.flag.is_armed();
        let event = match (self.last, armed) {
            (false, true) => TriggerEvent::Fire,
            (true, false) => TriggerEvent::Stop,
            _ => TriggerEvent::None,
        };
        self.last = armed;
        event
    }

    fn placement(&self) -> WindowPlacement {
        WindowPlacement::LiveTail
    }

    fn window_ended(&mut self) {
        self.flag.disarm();
        self.last = false;
    }
}

/// Fires when acceleration magnitude jumps by more than `threshold` between
/// two ticks, at most once per `cooldown_ms`.
#[derive(Debug, Clone)]
pub struct ThresholdTrigger {
    threshold: f64,
    cooldown_ms: u64,
    previous_magnitude: Option<f64>,
    last_fire_ms: Option<u64>,
}

impl ThresholdTrigger {
    pub fn new(threshold: f64, cooldown_ms: u64) -> Self {
        Self {
            threshold,
            cooldown_ms,
            previous_magnitude: None,
            last_fire_ms: None,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.threshold, config.cooldown_ms)
    }

    pub fn previous_magnitude(&self) -> Option<f64> {
        self.previous_magnitude
    }

    fn cooled_down(&self, now_ms: u64) -> bool {
        self.last_fire_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.cooldown_ms)
    }
}

impl Trigger for ThresholdTrigger {
    fn poll(&mut self, latest: &Reading, now_ms: u64) -> TriggerEvent {
        let magnitude = latest.magnitude();
        let mut event = TriggerEvent::None;

        if let Some(previous) = self.previous_magnitude {
            let delta = fabs(magnitude - previous);
            if delta > self.threshold {
                if self.cooled_down(now_ms) {
                    info!("Motion detected: |a| {:.3}, delta {:.3}", magnitude, delta);
                    self.last_fire_ms = Some(now_ms);
                    event = TriggerEvent::Fire;
                } else {
                    debug!("Motion within cool-down: delta {:.3}", delta);
                }
            }
        }

        self.previous_magnitude = Some(magnitude);
        event
    }

    fn placement(&self) -> WindowPlacement {
        WindowPlacement::Straddle
    }
}

/// Streams everything, tagged by history slot rather than window position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuousTrigger;

impl Trigger for ContinuousTrigger {
    fn poll(&mut self, _latest: &Reading, _now_ms: u64) -> TriggerEvent {
        TriggerEvent::None
    }

    fn placement(&self) -> WindowPlacement {
        WindowPlacement::Continuous
    }
}

/// Trigger chosen at startup.
pub enum AnyTrigger<'a> {
    Edge(EdgeTrigger<'a>),
    Threshold(ThresholdTrigger),
    Continuous(ContinuousTrigger),
}

impl Trigger for AnyTrigger<'_> {
    fn poll(&mut self, latest: &Reading, now_ms: u64) -> TriggerEvent {
        match self {
            AnyTrigger::Edge(t) => t.poll(latest, now_ms),
            AnyTrigger::Threshold(t) => t.poll(latest, now_ms),
            AnyTrigger::Continuous(t) => t.poll(latest, now_ms),
        }
    }

    fn placement(&self) -> WindowPlacement {
        match self {
            AnyTrigger::Edge(t) => t.placement(),
            AnyTrigger::Threshold(t) => t.placement(),
            AnyTrigger::Continuous(t) => t.placement(),
        }
    }

    fn window_ended(&mut self) {
        match self {
            AnyTrigger::Edge(t) => t.window_ended(),
            AnyTrigger::Threshold(t) => t.window_ended(),
            AnyTrigger::Continuous(t) => t.window_ended(),
        }
    }
}
