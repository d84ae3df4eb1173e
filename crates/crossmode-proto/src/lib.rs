//! Wire formats for bridging DMR (ETSI TS 102 361) and P25 Phase 1 (TIA-102)
//! voice streams.
//!
//! Everything in this crate is pure bit and byte manipulation: DMR bursts and
//! the DMRD network datagram, P25 LDU records and the P25D datagram, the
//! FNE/master link tags, and the error-control codes the two air interfaces
//! prescribe. No I/O, no clock - the state machines in `crossmode-core` and
//! the sockets in `crossmode-host` build on top of this.
//!
//! # Invariants
//!
//! Every encoder in this crate has a matching decoder and the pair round-trips
//! exactly; the property tests in `tests/` pin this. Decoders never panic on
//! arbitrary input - malformed bytes surface as [`ProtocolError`].

pub mod dmr;
pub mod edac;
pub mod errors;
pub mod fne;
pub mod p25;

pub(crate) mod bits;

pub use errors::{ProtocolError, Result};

/// Length of one DMR burst payload as carried on the network.
pub const DMR_FRAME_LENGTH_BYTES: usize = 33;

/// Length of the three packed AMBE codewords inside one DMR burst.
pub const DMR_AMBE_LENGTH_BYTES: usize = 27;

/// Length of one AMBE+2 half-rate codeword (72 bits FEC-protected).
pub const AMBE_FRAME_LENGTH_BYTES: usize = 9;

/// AMBE codewords per DMR burst.
pub const AMBE_PER_BURST: usize = 3;

/// Length of one IMBE full-rate codeword (88 bits).
pub const IMBE_FRAME_LENGTH_BYTES: usize = 11;

/// Length of one P25 LDU slot buffer (9 records of 25 bytes).
pub const LDU_LENGTH_BYTES: usize = 225;

/// Length of the P25 encryption message indicator.
pub const MI_LENGTH_BYTES: usize = 9;

/// The IMBE codeword that synthesizes to silence, used to patch over lost
/// voice slots.
pub const NULL_IMBE: [u8; IMBE_FRAME_LENGTH_BYTES] =
    [0x04, 0x0C, 0xFD, 0x7B, 0xFB, 0x7D, 0xF2, 0x7B, 0x3D, 0x9E, 0x45];

/// The AMBE+2 codeword that synthesizes to silence.
pub const AMBE_SILENCE: [u8; AMBE_FRAME_LENGTH_BYTES] =
    [0xB9, 0xE8, 0x81, 0x52, 0x61, 0x73, 0x00, 0x2A, 0x6B];
