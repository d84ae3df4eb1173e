//! P25 Phase 1 (TIA-102) logical data units and network framing.

mod ldu;
mod record;

pub use ldu::{IMBE_OFFSETS, LduBuffer, LduKind, RECORD_LENGTH_BYTES, SLOT_OFFSETS};
pub use record::{Duid, P25Record};
