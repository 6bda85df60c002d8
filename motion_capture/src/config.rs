use core::fmt;

/// Readings per transmitted window.
pub const DEFAULT_WINDOW_LEN: usize = 60;
/// A 60-reading window spans roughly one second.
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 1000 / DEFAULT_WINDOW_LEN as u32;
/// Tick-over-tick change of acceleration magnitude, m/s².
pub const DEFAULT_THRESHOLD: f64 = 5.0;
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;

/// Startup parameters of the capture loop. History depth is the `N` of the
/// node's `CircularHistory<N>`; everything else lives here.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Readings emitted per window, at most the history capacity.
    pub window_len: usize,
    pub tick_interval_ms: u32,
    /// Magnitude delta that counts as motion (threshold trigger only).
    pub threshold: f64,
    /// Minimum time between two threshold fires.
    pub cooldown_ms: u64,
    /// Ticks spent armed between a fire and the first emitted reading.
    pub arm_delay_ticks: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            threshold: DEFAULT_THRESHOLD,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            arm_delay_ticks: 0,
        }
    }
}

impl CaptureConfig {
    /// Default parameters with the window sized to the full history.
    pub fn for_capacity(capacity: usize) -> Self {
        Self {
            window_len: capacity,
            ..Self::default()
        }
    }

    pub fn validate<const N: usize>(&self) -> Result<(), ConfigError> {
        if N == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.window_len == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.window_len > N {
            return Err(ConfigError::WindowExceedsCapacity {
                window_len: self.window_len,
                capacity: N,
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroCapacity,
    ZeroWindow,
    WindowExceedsCapacity { window_len: usize, capacity: usize },
    ZeroTickInterval,
    InvalidThreshold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroCapacity => write!(f, "history capacity is zero"),
            ConfigError::ZeroWindow => write!(f, "window length is zero"),
            ConfigError::WindowExceedsCapacity { window_len, capacity } => write!(
                f,
                "window length {} exceeds history capacity {}",
                window_len, capacity
            ),
            ConfigError::ZeroTickInterval => write!(f, "tick interval is zero"),
            ConfigError::InvalidThreshold => {
                write!(f, "motion threshold must be finite and non-negative")
            }
        }
    }
}
