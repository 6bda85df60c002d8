use log::trace;
use motion_capture::{Reading, SampleSource};

const G_TO_MS2: f64 = 9.80665;
/// Length of one simulated stroke, in ticks.
const SWING_TICKS: u32 = 8;

#[derive(Debug)]
pub struct BusTimeout(pub u32);

/// Wrist at rest with a racket swing every `swing_every` ticks.
///
/// Every `fail_every` reads the bus "times out", which the capture loop must
/// treat as a skipped tick.
pub struct SwingSource {
    tick: u32,
    swing_every: u32,
    fail_every: u32,
}

impl SwingSource {
    pub fn new(swing_every: u32, fail_every: u32) -> Self {
        Self {
            tick: 0,
            swing_every: swing_every.max(SWING_TICKS + 1),
            fail_every,
        }
    }

    fn at_rest(&self) -> Reading {
        // slow sway so consecutive readings differ
        let phase = f64::from(self.tick) * 0.05;
        Reading::new(
            0.3 * phase.sin(),
            0.2 * phase.cos(),
            G_TO_MS2,
            0.01 * phase.cos(),
            0.0,
            0.01 * phase.sin(),
        )
    }

    fn swinging(&self, step: u32) -> Reading {
        let t = f64::from(step) / f64::from(SWING_TICKS);
        let envelope = (t * std::f64::consts::PI).sin();
        Reading::new(
            28.0 * envelope,
            -6.0 * envelope,
            G_TO_MS2 + 4.0 * envelope,
            0.5,
            7.5 * envelope,
            -3.0 * envelope,
        )
    }
}

impl SampleSource for SwingSource {
    type Error = BusTimeout;

    fn read(&mut self) -> Result<Reading, BusTimeout> {
        self.tick = self.tick.wrapping_add(1);
        if self.fail_every > 0 && self.tick % self.fail_every == 0 {
            return Err(BusTimeout(self.tick));
        }
        let step = self.tick % self.swing_every;
        let reading = if step < SWING_TICKS {
            self.swinging(step)
        } else {
            self.at_rest()
        };
        trace!("tick {} |a| {:.2}", self.tick, reading.magnitude());
        Ok(reading)
    }
}
