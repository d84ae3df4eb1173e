//! LDU slot buffers and their network record form.
//!
//! An LDU's nine voice records are held in a 225-byte buffer of 25-byte
//! slots. Each slot starts with the record's magic byte, so a zero slot-start
//! byte marks a lost voice slot; the IMBE codewords sit at fixed offsets
//! inside the slots, surrounded by link-control or encryption-sync hexbits
//! that this layer never moves.
//!
//! On the wire the nine records are packed to 154 bytes with per-record
//! widths; parsing validates the magic sequence. A record window that is
//! entirely zero is accepted as a lost slot (to be patched by silence
//! substitution); a wrong nonzero magic rejects the whole record.

use crate::errors::{ProtocolError, Result};
use crate::{IMBE_FRAME_LENGTH_BYTES, LDU_LENGTH_BYTES, MI_LENGTH_BYTES};

/// Offsets of the nine IMBE codewords inside the LDU buffer.
pub const IMBE_OFFSETS: [usize; 9] = [10, 26, 55, 80, 105, 130, 155, 180, 204];

/// Start offsets of the nine 25-byte slots inside the LDU buffer.
pub const SLOT_OFFSETS: [usize; 9] = [0, 25, 50, 75, 100, 125, 150, 175, 200];

/// Offsets of the nine records inside the packed 154-byte network form.
const RECORD_OFFSETS: [usize; 9] = [0, 22, 36, 53, 70, 87, 104, 121, 138];

/// Widths of the nine records inside the packed network form.
const RECORD_WIDTHS: [usize; 9] = [22, 14, 17, 17, 17, 17, 17, 17, 16];

/// Length of the packed network form of one LDU.
pub const RECORD_LENGTH_BYTES: usize = 154;

/// Which logical data unit a buffer or record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LduKind {
    /// LDU1: voice 1-9 with link control
    Ldu1,
    /// LDU2: voice 10-18 with encryption sync
    Ldu2,
}

impl LduKind {
    /// The magic byte leading record `i` (0..9).
    fn magic(self, i: usize) -> u8 {
        match self {
            Self::Ldu1 => 0x62 + i as u8,
            Self::Ldu2 => 0x6B + i as u8,
        }
    }
}

/// One LDU's worth of voice and signalling bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LduBuffer {
    bytes: [u8; LDU_LENGTH_BYTES],
}

impl Default for LduBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LduBuffer {
    /// An empty (all slots lost) buffer.
    pub fn new() -> Self {
        Self { bytes: [0; LDU_LENGTH_BYTES] }
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.bytes = [0; LDU_LENGTH_BYTES];
    }

    /// Raw view of the buffer.
    pub fn as_bytes(&self) -> &[u8; LDU_LENGTH_BYTES] {
        &self.bytes
    }

    /// Whether slot `i` (0..9) holds a received record.
    pub fn slot_present(&self, i: usize) -> bool {
        self.bytes[SLOT_OFFSETS[i]] != 0
    }

    /// Copy out IMBE codeword `i` (0..9).
    pub fn extract_imbe(&self, i: usize) -> [u8; IMBE_FRAME_LENGTH_BYTES] {
        let mut imbe = [0u8; IMBE_FRAME_LENGTH_BYTES];
        imbe.copy_from_slice(&self.bytes[IMBE_OFFSETS[i]..IMBE_OFFSETS[i] + 11]);
        imbe
    }

    /// Place IMBE codeword `i` (0..9).
    pub fn inject_imbe(&mut self, i: usize, imbe: &[u8; IMBE_FRAME_LENGTH_BYTES]) {
        self.bytes[IMBE_OFFSETS[i]..IMBE_OFFSETS[i] + 11].copy_from_slice(imbe);
    }

    /// LDU1 service options byte (emergency / encrypted / priority).
    pub fn service_options(&self) -> u8 {
        self.bytes[53]
    }

    /// LDU2 encryption algorithm identifier.
    pub fn alg_id(&self) -> u8 {
        self.bytes[126]
    }

    /// LDU2 encryption key identifier.
    pub fn key_id(&self) -> u16 {
        (u16::from(self.bytes[127]) << 8) | u16::from(self.bytes[128])
    }

    /// LDU2 message indicator, gathered from its three 3-byte runs.
    pub fn message_indicator(&self) -> [u8; MI_LENGTH_BYTES] {
        let mut mi = [0u8; MI_LENGTH_BYTES];
        mi[0..3].copy_from_slice(&self.bytes[51..54]);
        mi[3..6].copy_from_slice(&self.bytes[76..79]);
        mi[6..9].copy_from_slice(&self.bytes[101..104]);
        mi
    }

    /// Unpack a network record into a buffer, validating the magic sequence.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::TooShort` when fewer than 154 bytes are given
    /// - `ProtocolError::LduPrefix` when a record leads with a wrong nonzero
    ///   magic byte (an all-zero window is a lost slot, not an error)
    pub fn parse_record(kind: LduKind, record: &[u8]) -> Result<Self> {
        if record.len() < RECORD_LENGTH_BYTES {
            return Err(ProtocolError::TooShort {
                expected: RECORD_LENGTH_BYTES,
                actual: record.len(),
            });
        }

        let mut buffer = Self::new();
        for i in 0..9 {
            let offset = RECORD_OFFSETS[i];
            let width = RECORD_WIDTHS[i];
            let window = &record[offset..offset + width];
            if window[0] == kind.magic(i) {
                buffer.bytes[SLOT_OFFSETS[i]..SLOT_OFFSETS[i] + width].copy_from_slice(window);
            } else if window.iter().any(|&b| b != 0) {
                return Err(ProtocolError::LduPrefix { offset, found: window[0] });
            }
            // all-zero window: leave the slot lost
        }
        Ok(buffer)
    }

    /// Pack the buffer into its 154-byte network record, stamping the magic
    /// bytes.
    pub fn build_record(&self, kind: LduKind) -> [u8; RECORD_LENGTH_BYTES] {
        let mut record = [0u8; RECORD_LENGTH_BYTES];
        for i in 0..9 {
            let offset = RECORD_OFFSETS[i];
            let width = RECORD_WIDTHS[i];
            record[offset] = kind.magic(i);
            record[offset + 1..offset + width]
                .copy_from_slice(&self.bytes[SLOT_OFFSETS[i] + 1..SLOT_OFFSETS[i] + width]);
        }
        record
    }
}
