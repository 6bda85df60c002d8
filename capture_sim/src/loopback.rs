use std::time::{Duration, Instant};

use log::{info, warn};
use motion_capture::{ConfigError, Link, LinkError, ReceivedWindow, WindowAssembler};

use crate::HISTORY_DEPTH;

/// Stands in for the BLE UART link and the web client behind it: every
/// notification is decoded straight into a [`WindowAssembler`].
///
/// After `outage_after` frames the peer drops off for `outage` and comes
/// back on its own.
pub struct LoopbackLink {
    assembler: WindowAssembler<HISTORY_DEPTH>,
    frames: u32,
    outage_after: u32,
    outage: Duration,
    reconnect_at: Option<Instant>,
    windows_received: u32,
    frames_lost: usize,
}

impl LoopbackLink {
    pub fn new(window_len: usize, outage_after: u32, outage: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            assembler: WindowAssembler::new(window_len)?,
            frames: 0,
            outage_after,
            outage,
            reconnect_at: None,
            windows_received: 0,
            frames_lost: 0,
        })
    }

    pub fn windows_received(&self) -> u32 {
        self.windows_received
    }

    pub fn frames_lost(&self) -> usize {
        self.frames_lost
    }

    /// Hands any half-received window to the report.
    pub fn finish(&mut self) {
        if let Some(window) = self.assembler.flush() {
            self.report(&window);
        }
    }

    fn report(&mut self, window: &ReceivedWindow<HISTORY_DEPTH>) {
        self.windows_received += 1;
        self.frames_lost += window.missing();
        let peak = window.readings().map(|r| r.magnitude()).fold(0.0, f64::max);
        info!(
            "Peer got window {}: {} readings, {} missing, peak |a| {:.2} m/s²",
            self.windows_received,
            window.len(),
            window.missing(),
            peak
        );
    }
}

impl Link for LoopbackLink {
    fn is_connected(&self) -> bool {
        self.reconnect_at.map_or(true, |at| Instant::now() >= at)
    }

    fn notify(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        self.reconnect_at = None;

        match self.assembler.push_bytes(payload) {
            Ok(Some(window)) => self.report(&window),
            Ok(None) => {}
            Err(e) => warn!("Peer rejected frame: {}", e),
        }

        self.frames += 1;
        if self.outage_after > 0 && self.frames % self.outage_after == 0 {
            warn!("Peer out of range for {:?}", self.outage);
            self.reconnect_at = Some(Instant::now() + self.outage);
        }
        Ok(())
    }
}
