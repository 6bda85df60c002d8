//! Windowed capture-and-stream pipeline for a wearable 6-axis motion node.
//!
//! A periodic loop samples the IMU into a fixed [`CircularHistory`], feeds
//! each reading to a [`Trigger`], and once the trigger fires replays a window
//! of readings to a [`Transport`], one reading per tick, while sampling
//! carries on.
//!
//! [`EdgeTrigger`] follows a button-driven [`EdgeFlag`] and streams the live
//! tail until stopped or full. [`ThresholdTrigger`] watches for sharp changes
//! in acceleration magnitude and sends a window straddling the motion.
//! [`ContinuousTrigger`] skips windows and sends every reading tagged with
//! its history slot.
//!
//! ```ignore
//! static BUTTON: EdgeFlag = EdgeFlag::new();
//!
//! let mut node = CaptureNode::<_, _, _, 60>::new(
//!     CaptureConfig::default(),
//!     imu,
//!     EdgeTrigger::new(&BUTTON),
//!     PacketTransport::new(ble_uart),
//! )?;
//! node.run(&mut delay, &clock);
//! ```

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod history;
pub mod node;
pub mod reading;
pub mod receiver;
pub mod source;
pub mod streamer;
pub mod transport;
pub mod trigger;
pub mod wire;

use core::fmt;

pub use config::{CaptureConfig, ConfigError};
pub use history::{CircularHistory, Window};
pub use node::{CaptureNode, Clock, TickReport};
pub use reading::Reading;
pub use receiver::{ReceivedWindow, WindowAssembler};
pub use source::SampleSource;
pub use streamer::{StreamStep, TransmissionState, WindowStreamer};
pub use transport::{Link, LinkError, PacketTransport, SendError, Transport};
pub use trigger::{AnyTrigger, ContinuousTrigger, EdgeFlag, EdgeTrigger, ThresholdTrigger, Trigger, TriggerEvent, WindowPlacement};
pub use wire::{Frame, WireError, FRAME_LEN};

/// Errors surfaced by the capture loop. `E` is the sample source's error.
#[derive(Debug)]
pub enum Error<E> {
    /// The source could not produce a reading; the tick was skipped.
    SampleRead(E),
    /// The peer went away mid-window; the rest of the window was dropped.
    TransportDisconnected { position: u32, dropped: usize },
    /// Rejected at startup.
    Config(ConfigError),
}

impl<E> From<ConfigError> for Error<E> {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SampleRead(e) => write!(f, "sample read failed: {:?}", e),
            Error::TransportDisconnected { position, dropped } => write!(
                f,
                "transport disconnected at position {}, {} readings dropped",
                position, dropped
            ),
            Error::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}
