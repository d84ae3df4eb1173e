//! Per-call state shared by both machine kinds.

use crossmode_proto::MI_LENGTH_BYTES;
use crossmode_proto::dmr::Flco;
use crossmode_proto::p25::P25Record;

/// P25 algorithm identifier meaning "clear voice".
const ALG_UNENCRYPTED: u8 = 0x80;

/// Machine state: between calls or inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetState {
    /// No call in progress
    #[default]
    Idle,
    /// A voice call is being transcoded
    Audio,
}

/// Addressing and service attributes of one active voice call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Source radio identifier (24-bit)
    pub src_id: u32,
    /// Destination identifier (24-bit)
    pub dst_id: u32,
    /// Talkgroup call (vs. individual)
    pub group: bool,
    /// Emergency service option
    pub emergency: bool,
    /// Encrypted service option
    pub encrypted: bool,
    /// Priority level (0..=7)
    pub priority: u8,
    /// Encryption algorithm identifier
    pub alg_id: u8,
    /// Encryption key identifier
    pub key_id: u16,
    /// Encryption message indicator
    pub mi: [u8; MI_LENGTH_BYTES],
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            src_id: 0,
            dst_id: 0,
            group: true,
            emergency: false,
            encrypted: false,
            priority: 0,
            alg_id: ALG_UNENCRYPTED,
            key_id: 0,
            mi: [0; MI_LENGTH_BYTES],
        }
    }
}

impl CallContext {
    /// Build from DMR call addressing.
    pub fn from_dmr(flco: Flco, src_id: u32, dst_id: u32) -> Self {
        Self { src_id, dst_id, group: flco == Flco::Group, ..Self::default() }
    }

    /// Build from a P25 record header plus the LDU1 service options byte.
    pub fn from_p25(record: &P25Record, service_options: u8) -> Self {
        let mut context = Self {
            src_id: record.src_id,
            dst_id: record.dst_id,
            group: record.is_group(),
            ..Self::default()
        };
        context.apply_service_options(service_options);
        context
    }

    /// Apply a P25 service options byte.
    pub fn apply_service_options(&mut self, byte: u8) {
        self.emergency = byte & 0x80 != 0;
        self.encrypted = byte & 0x40 != 0;
        self.priority = byte & 0x07;
    }

    /// Apply the LDU2 encryption sync.
    pub fn apply_encryption_sync(&mut self, alg_id: u8, key_id: u16, mi: [u8; MI_LENGTH_BYTES]) {
        self.alg_id = alg_id;
        self.key_id = key_id;
        self.mi = mi;
    }

    /// The DMR opcode matching this call's addressing.
    pub fn flco(&self) -> Flco {
        if self.group { Flco::Group } else { Flco::Private }
    }
}
