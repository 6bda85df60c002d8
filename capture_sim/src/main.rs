//! Runs the capture loop on the host.
//!
//! ```text
//! capture_sim [edge|threshold|continuous] [ticks]
//! RUST_LOG=debug capture_sim edge 900
//! ```
//!
//! `threshold` sends a window around every simulated swing. `edge` ignores
//! the motion and instead a background thread plays the button: a press
//! starts a live window, a second press stops it early. `continuous` sends
//! every reading tagged with its history slot.

mod loopback;
mod platform;
mod swing_source;

use std::{process, thread, time::Duration};

use log::{error, info};
use motion_capture::{
    AnyTrigger, CaptureConfig, CaptureNode, ContinuousTrigger, EdgeFlag, EdgeTrigger, PacketTransport, ThresholdTrigger,
};

use crate::loopback::LoopbackLink;
use crate::platform::{StdClock, StdDelay};
use crate::swing_source::SwingSource;

pub const HISTORY_DEPTH: usize = 60;

const DEFAULT_TICKS: u64 = 600;
const SWING_EVERY_TICKS: u32 = 150;
const FAIL_EVERY_TICKS: u32 = 97;
const OUTAGE_AFTER_FRAMES: u32 = 150;
const OUTAGE: Duration = Duration::from_millis(1500);

/// Wired to the simulated button, the way an EXTI handler would own it.
static BUTTON: EdgeFlag = EdgeFlag::new();

fn spawn_button() {
    thread::spawn(|| {
        let mut presses: u32 = 0;
        loop {
            thread::sleep(Duration::from_millis(2500));
            info!("Button pressed");
            BUTTON.on_edge_event();
            presses += 1;
            if presses % 3 == 0 {
                // cut this window short
                thread::sleep(Duration::from_millis(400));
                info!("Button pressed");
                BUTTON.on_edge_event();
            }
        }
    });
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| String::from("threshold"));
    let ticks = match args.next().map(|s| s.parse::<u64>()) {
        None => DEFAULT_TICKS,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            error!("Invalid tick count: {}", e);
            process::exit(2);
        }
    };

    let config = CaptureConfig::for_capacity(HISTORY_DEPTH);
    let trigger = match mode.as_str() {
        "edge" => {
            spawn_button();
            AnyTrigger::Edge(EdgeTrigger::new(&BUTTON))
        }
        "threshold" => AnyTrigger::Threshold(ThresholdTrigger::from_config(&config)),
        "continuous" => AnyTrigger::Continuous(ContinuousTrigger),
        other => {
            error!("Unknown trigger mode {:?}, expected edge, threshold or continuous", other);
            process::exit(2);
        }
    };

    let link = match LoopbackLink::new(config.window_len, OUTAGE_AFTER_FRAMES, OUTAGE) {
        Ok(link) => link,
        Err(e) => {
            error!("Receiver setup failed: {}", e);
            process::exit(1);
        }
    };
    let source = SwingSource::new(SWING_EVERY_TICKS, FAIL_EVERY_TICKS);

    let mut node = match CaptureNode::<_, _, _, HISTORY_DEPTH>::new(config, source, trigger, PacketTransport::new(link)) {
        Ok(node) => node,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    info!("Running {} ticks in {} mode", ticks, mode);
    node.run_ticks(ticks, &mut StdDelay, &StdClock::new());

    let (ran, skipped, started) = (node.ticks(), node.skipped_ticks(), node.windows_started());
    let transport = node.transport_mut();
    let frames = transport.frames_sent();
    let link = transport.link_mut();
    link.finish();
    info!(
        "Done: {} ticks ({} skipped), {} windows started, {} frames sent, {} windows received, {} readings missing",
        ran,
        skipped,
        started,
        frames,
        link.windows_received(),
        link.frames_lost()
    );
}
