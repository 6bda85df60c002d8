//! Peer-side reconstruction of windows from a stream of frames.
//!
//! Frames carry their position inside the window but no window id, and the
//! link may reorder them. Position 0 arriving after later positions means the
//! sender started a new window; reaching the configured length closes the
//! current one. Frames are put back in position order when a window closes.

use heapless::Vec;
use log::{debug, warn};

use crate::config::ConfigError;
use crate::reading::Reading;
use crate::wire::{Frame, WireError};

#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedWindow<const N: usize> {
    frames: Vec<Frame, N>,
    expected: usize,
}

impl<const N: usize> ReceivedWindow<N> {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn readings(&self) -> impl Iterator<Item = Reading> + '_ {
        self.frames.iter().map(|f| f.reading)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.frames.len() >= self.expected
    }

    /// Readings the sender emitted but that never arrived.
    pub fn missing(&self) -> usize {
        self.expected.saturating_sub(self.frames.len())
    }
}

pub struct WindowAssembler<const N: usize> {
    window_len: usize,
    current: Vec<Frame, N>,
    windows: u32,
    duplicates: u32,
}

impl<const N: usize> WindowAssembler<N> {
    pub fn new(window_len: usize) -> Result<Self, ConfigError> {
        if window_len == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if window_len > N {
            return Err(ConfigError::WindowExceedsCapacity {
                window_len,
                capacity: N,
            });
        }
        Ok(Self {
            window_len,
            current: Vec::new(),
            windows: 0,
            duplicates: 0,
        })
    }

    pub fn windows(&self) -> u32 {
        self.windows
    }

    pub fn pending(&self) -> usize {
        self.current.len()
    }

    /// Frames discarded because their position was already received.
    pub fn duplicates(&self) -> u32 {
        self.duplicates
    }

    /// Decodes one notification payload and feeds it in.
    pub fn push_bytes(&mut self, payload: &[u8]) -> Result<Option<ReceivedWindow<N>>, WireError> {
        let frame = Frame::decode(payload)?;
        Ok(self.push(frame))
    }

    /// Feeds one frame, returning a window when this frame closed one.
    pub fn push(&mut self, frame: Frame) -> Option<ReceivedWindow<N>> {
        if frame.position != 0 && self.current.iter().any(|f| f.position == frame.position) {
            debug!("Duplicate position {}, discarded", frame.position);
            self.duplicates = self.duplicates.wrapping_add(1);
            return None;
        }

        let mut finished = None;
        if frame.position == 0 && !self.current.is_empty() {
            debug!("Position 0 after {} frames, new window", self.current.len());
            finished = self.flush();
        }

        if self.current.push(frame).is_err() {
            // unreachable while window_len <= N, closing early keeps the frame
            warn!("Window buffer full at position {}", frame.position);
            finished = self.flush();
            let _ = self.current.push(frame);
        }

        if self.current.len() >= self.window_len {
            return self.flush();
        }
        finished
    }

    /// Closes whatever has been received so far.
    pub fn flush(&mut self) -> Option<ReceivedWindow<N>> {
        if self.current.is_empty() {
            return None;
        }
        let mut frames = core::mem::take(&mut self.current);
        frames.sort_unstable_by_key(|f| f.position);
        self.windows = self.windows.wrapping_add(1);
        let window = ReceivedWindow {
            frames,
            expected: self.window_len,
        };
        if !window.is_complete() {
            warn!(
                "Window {} closed with {} of {} readings",
                self.windows,
                window.len(),
                self.window_len
            );
        }
        Some(window)
    }
}
