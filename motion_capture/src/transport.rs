use core::fmt;

use log::trace;

use crate::reading::Reading;
use crate::wire::Frame;

/// Best-effort delivery of positioned readings to the remote peer.
pub trait Transport {
    fn is_connected(&self) -> bool;

    fn send(&mut self, reading: &Reading, position: u32) -> Result<(), SendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// No peer; the rest of the window is dropped.
    Disconnected,
    /// The link refused this one reading.
    Busy,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Disconnected => write!(f, "transport disconnected"),
            SendError::Busy => write!(f, "transport busy"),
        }
    }
}

/// Byte-level notification channel, e.g. the TX characteristic of a BLE UART
/// service.
pub trait Link {
    fn is_connected(&self) -> bool;

    fn notify(&mut self, payload: &[u8]) -> Result<(), LinkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    NotConnected,
    Busy,
}

impl From<LinkError> for SendError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::NotConnected => SendError::Disconnected,
            LinkError::Busy => SendError::Busy,
        }
    }
}

/// Sends each reading as one fixed-size [`Frame`] notification.
pub struct PacketTransport<L> {
    link: L,
    frames_sent: u32,
}

impl<L: Link> PacketTransport<L> {
    pub fn new(link: L) -> Self {
        Self { link, frames_sent: 0 }
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn release(self) -> L {
        self.link
    }
}

impl<L: Link> Transport for PacketTransport<L> {
    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    fn send(&mut self, reading: &Reading, position: u32) -> Result<(), SendError> {
        let frame = Frame::new(*reading, position).encode();
        self.link.notify(&frame)?;
        self.frames_sent = self.frames_sent.wrapping_add(1);
        trace!("frame {} sent at position {}", self.frames_sent, position);
        Ok(())
    }
}
