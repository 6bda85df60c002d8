//! Frame layout of one positioned reading on the link.
//!
//! | offset | size | field            |
//! |--------|------|------------------|
//! | 0      | 8    | ax (f64 LE)      |
//! | 8      | 8    | ay               |
//! | 16     | 8    | az               |
//! | 24     | 8    | gx               |
//! | 32     | 8    | gy               |
//! | 40     | 8    | gz               |
//! | 48     | 4    | position (i32 LE)|
//!
//! Boards that send the raw C struct pad it to 56 bytes; decoding ignores
//! anything past byte 52.

use core::fmt;

use crate::reading::Reading;

pub const FRAME_LEN: usize = 52;

const POSITION_OFFSET: usize = 48;

/// A reading tagged with its 0-based position inside a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub reading: Reading,
    pub position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    TooShort(usize),
    NegativePosition(i32),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::TooShort(len) => {
                write!(f, "frame of {} bytes, expected at least {}", len, FRAME_LEN)
            }
            WireError::NegativePosition(pos) => write!(f, "negative window position {}", pos),
        }
    }
}

impl Frame {
    pub fn new(reading: Reading, position: u32) -> Self {
        Self { reading, position }
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let r = &self.reading;
        let mut buf = [0u8; FRAME_LEN];
        for (i, v) in [r.ax, r.ay, r.az, r.gx, r.gy, r.gz].iter().enumerate() {
            buf[i * 8..i * 8 + 8].copy_from_slice(&v.to_le_bytes());
        }
        let pos = i32::try_from(self.position).unwrap_or(i32::MAX);
        buf[POSITION_OFFSET..FRAME_LEN].copy_from_slice(&pos.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < FRAME_LEN {
            return Err(WireError::TooShort(bytes.len()));
        }
        let field = |i: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            f64::from_le_bytes(raw)
        };
        let mut raw_pos = [0u8; 4];
        raw_pos.copy_from_slice(&bytes[POSITION_OFFSET..FRAME_LEN]);
        let pos = i32::from_le_bytes(raw_pos);
        if pos < 0 {
            return Err(WireError::NegativePosition(pos));
        }
        Ok(Self {
            reading: Reading::new(field(0), field(1), field(2), field(3), field(4), field(5)),
            position: pos as u32,
        })
    }
}
