//! Replays a window out of the history while sampling goes on.
//!
//! The streamer emits at most one reading per tick, always reading back from
//! [`CircularHistory`]. In live-tail placement the reading emitted on a tick
//! is the one written on that same tick; in straddle placement the first half
//! of the window is history that already existed when streaming began and the
//! emission point trails the writer by that half. In continuous placement
//! there is no window at all: every tick's reading goes out tagged with its
//! history slot.

use log::{debug, info, warn};

use crate::history::CircularHistory;
use crate::transport::{SendError, Transport};
use crate::trigger::WindowPlacement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionState {
    Idle,
    /// Fired, waiting `ticks_left` more ticks before the anchor is taken.
    Armed { ticks_left: u32 },
    Streaming {
        anchor: usize,
        emitted: usize,
        length: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStep {
    Idle,
    Armed,
    Emitted {
        position: u32,
        delivered: bool,
        window_complete: bool,
    },
    /// The transport went away; the rest of the window is gone.
    Dropped { position: u32, remaining: usize },
}

impl StreamStep {
    /// True when this step took the streamer back to idle on its own.
    pub fn ends_window(&self) -> bool {
        matches!(
            self,
            StreamStep::Emitted { window_complete: true, .. } | StreamStep::Dropped { .. }
        )
    }
}

pub struct WindowStreamer {
    state: TransmissionState,
    placement: WindowPlacement,
    window_len: usize,
    arm_delay_ticks: u32,
    delivered: usize,
    windows_started: u32,
}

impl WindowStreamer {
    pub fn new(placement: WindowPlacement, window_len: usize, arm_delay_ticks: u32) -> Self {
        Self {
            state: TransmissionState::Idle,
            placement,
            window_len,
            arm_delay_ticks,
            delivered: 0,
            windows_started: 0,
        }
    }

    pub fn state(&self) -> TransmissionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TransmissionState::Idle
    }

    pub fn windows_started(&self) -> u32 {
        self.windows_started
    }

    /// Arms a new window. Ignored unless idle, so a repeated fire never
    /// restarts the window in flight.
    pub fn fire(&mut self) -> bool {
        if !self.is_idle() {
            debug!("Fire ignored in {:?}", self.state);
            return false;
        }
        self.state = TransmissionState::Armed {
            ticks_left: self.arm_delay_ticks,
        };
        debug!("Idle -> Armed ({} ticks)", self.arm_delay_ticks);
        true
    }

    /// Cancels the current window. Takes effect before this tick's emission.
    pub fn stop(&mut self) -> bool {
        if self.is_idle() {
            return false;
        }
        if let TransmissionState::Streaming { emitted, length, .. } = self.state {
            info!("Window stopped after {}/{} readings", emitted, length);
        }
        self.state = TransmissionState::Idle;
        true
    }

    fn begin<const N: usize>(&mut self, history: &CircularHistory<N>) {
        let newest = history.rewind(history.position(), 1);
        let anchor = match self.placement {
            WindowPlacement::LiveTail | WindowPlacement::Continuous => newest,
            WindowPlacement::Straddle => {
                let pre = (self.window_len / 2).max(1).min(history.len());
                history.rewind(history.position(), pre)
            }
        };
        self.state = TransmissionState::Streaming {
            anchor,
            emitted: 0,
            length: self.window_len,
        };
        self.delivered = 0;
        self.windows_started = self.windows_started.wrapping_add(1);
        info!(
            "Transmitting window {} from slot {} ({:?})",
            self.windows_started, anchor, self.placement
        );
    }

    /// Runs one tick of the streamer: count down an armed window, or emit the
    /// next reading of the streaming one.
    pub fn step<const N: usize, X: Transport>(
        &mut self,
        history: &CircularHistory<N>,
        transport: &mut X,
    ) -> StreamStep {
        if self.placement == WindowPlacement::Continuous {
            return self.step_continuous(history, transport);
        }

        match self.state {
            TransmissionState::Idle => return StreamStep::Idle,
            TransmissionState::Armed { ticks_left } if ticks_left > 0 => {
                self.state = TransmissionState::Armed {
                    ticks_left: ticks_left - 1,
                };
                return StreamStep::Armed;
            }
            TransmissionState::Armed { .. } => self.begin(history),
            TransmissionState::Streaming { .. } => {}
        }

        let TransmissionState::Streaming { anchor, emitted, length } = self.state else {
            return StreamStep::Idle;
        };
        let position = emitted as u32;

        if !transport.is_connected() {
            return self.drop_window(position, length - emitted);
        }

        let slot = history.wrap(anchor, emitted);
        let Some(reading) = history.get(slot).copied() else {
            warn!("Slot {} not populated, window truncated at {}", slot, emitted);
            self.state = TransmissionState::Idle;
            return StreamStep::Emitted {
                position,
                delivered: false,
                window_complete: true,
            };
        };

        let delivered = match transport.send(&reading, position) {
            Ok(()) => true,
            Err(SendError::Busy) => {
                warn!("Reading {} lost, transport busy", position);
                false
            }
            Err(SendError::Disconnected) => return self.drop_window(position, length - emitted),
        };
        if delivered {
            self.delivered += 1;
        }

        let emitted = emitted + 1;
        let window_complete = emitted >= length;
        if window_complete {
            info!("Finished transmission: {}/{} delivered", self.delivered, length);
            self.state = TransmissionState::Idle;
        } else {
            self.state = TransmissionState::Streaming { anchor, emitted, length };
        }

        StreamStep::Emitted {
            position,
            delivered,
            window_complete,
        }
    }

    fn step_continuous<const N: usize, X: Transport>(
        &mut self,
        history: &CircularHistory<N>,
        transport: &mut X,
    ) -> StreamStep {
        let Some(reading) = history.latest().copied() else {
            return StreamStep::Idle;
        };
        if !transport.is_connected() {
            return StreamStep::Idle;
        }
        let position = history.rewind(history.position(), 1) as u32;
        let delivered = match transport.send(&reading, position) {
            Ok(()) => true,
            Err(e) => {
                debug!("Slot {} not sent: {}", position, e);
                false
            }
        };
        StreamStep::Emitted {
            position,
            delivered,
            window_complete: false,
        }
    }

    fn drop_window(&mut self, position: u32, remaining: usize) -> StreamStep {
        warn!(
            "Transport disconnected at position {}, dropping {} readings",
            position, remaining
        );
        self.state = TransmissionState::Idle;
        StreamStep::Dropped { position, remaining }
    }
}
