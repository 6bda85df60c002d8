//! The periodic sample → store → trigger → stream loop.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::history::CircularHistory;
use crate::source::SampleSource;
use crate::streamer::{StreamStep, TransmissionState, WindowStreamer};
use crate::transport::Transport;
use crate::trigger::{Trigger, TriggerEvent};
use crate::Error;

/// Millisecond monotonic time.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// History write cursor after this tick's sample.
    pub position: usize,
    pub event: TriggerEvent,
    pub step: StreamStep,
}

/// Owns the history, the transmission state and both external collaborators.
/// Nothing else mutates them; the only input from another context is the
/// edge flag read by the trigger.
pub struct CaptureNode<S, T, X, const N: usize> {
    config: CaptureConfig,
    history: CircularHistory<N>,
    trigger: T,
    streamer: WindowStreamer,
    source: S,
    transport: X,
    ticks: u64,
    skipped: u64,
}

impl<S, T, X, const N: usize> CaptureNode<S, T, X, N>
where
    S: SampleSource,
    T: Trigger,
    X: Transport,
{
    pub fn new(config: CaptureConfig, source: S, trigger: T, transport: X) -> Result<Self, Error<S::Error>> {
        config.validate::<N>().map_err(Error::Config)?;
        let placement = trigger.placement();
        info!(
            "Capture node: {} slots, window {}, tick {} ms, {:?}",
            N, config.window_len, config.tick_interval_ms, placement
        );
        Ok(Self {
            streamer: WindowStreamer::new(placement, config.window_len, config.arm_delay_ticks),
            config,
            history: CircularHistory::new(),
            trigger,
            source,
            transport,
            ticks: 0,
            skipped: 0,
        })
    }

    /// One period: read a sample, store it, poll the trigger, emit at most one
    /// reading.
    ///
    /// `Error::SampleRead` means the tick was skipped with nothing changed.
    /// `Error::TransportDisconnected` means the window in flight was dropped.
    pub fn tick(&mut self, now_ms: u64) -> Result<TickReport, Error<S::Error>> {
        let reading = match self.source.read() {
            Ok(reading) => reading,
            Err(e) => {
                self.skipped += 1;
                return Err(Error::SampleRead(e));
            }
        };
        self.history.push(reading);
        self.ticks += 1;

        let event = self.trigger.poll(&reading, now_ms);
        match event {
            TriggerEvent::Fire => {
                self.streamer.fire();
            }
            TriggerEvent::Stop => {
                if self.streamer.stop() {
                    debug!("Stop at tick {}", self.ticks);
                }
            }
            TriggerEvent::None => {}
        }

        let step = self.streamer.step(&self.history, &mut self.transport);
        if step.ends_window() {
            self.trigger.window_ended();
        }
        if let StreamStep::Dropped { position, remaining } = step {
            return Err(Error::TransportDisconnected {
                position,
                dropped: remaining,
            });
        }

        Ok(TickReport {
            position: self.history.position(),
            event,
            step,
        })
    }

    /// Runs `count` ticks, sleeping out the rest of each tick interval.
    pub fn run_ticks<D: DelayNs, C: Clock>(&mut self, count: u64, delay: &mut D, clock: &C) {
        for _ in 0..count {
            self.run_once(delay, clock);
        }
    }

    pub fn run<D: DelayNs, C: Clock>(&mut self, delay: &mut D, clock: &C) -> ! {
        loop {
            self.run_once(delay, clock);
        }
    }

    fn run_once<D: DelayNs, C: Clock>(&mut self, delay: &mut D, clock: &C) {
        let started = clock.now_ms();
        match self.tick(started) {
            Ok(_) => {}
            Err(Error::SampleRead(e)) => warn!("Sample read failed, tick skipped: {:?}", e),
            Err(e) => warn!("{}", e),
        }
        let spent = clock.now_ms().saturating_sub(started);
        let interval = u64::from(self.config.tick_interval_ms);
        if spent < interval {
            delay.delay_ms((interval - spent) as u32);
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn history(&self) -> &CircularHistory<N> {
        &self.history
    }

    pub fn state(&self) -> TransmissionState {
        self.streamer.state()
    }

    pub fn windows_started(&self) -> u32 {
        self.streamer.windows_started()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    pub fn transport(&self) -> &X {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut X {
        &mut self.transport
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
