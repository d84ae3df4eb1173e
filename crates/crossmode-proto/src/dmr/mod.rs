//! DMR (ETSI TS 102 361) burst layout and network framing.
//!
//! A 33-byte burst is 264 bits: two 108-bit voice (or 98-bit data) halves
//! around a 48-bit centre. Voice bursts carry three AMBE codewords in the
//! halves and either the audio sync pattern or EMB + embedded-LC fragment in
//! the centre; data-sync bursts (headers, terminators) carry a BPTC-coded
//! full LC in the halves with the slot type and data sync in the centre.

mod ambe;
mod data;
mod emb;
mod embedded;
mod lc;
mod slot_type;
mod sync;

pub use ambe::{extract_ambe, insert_ambe, silence_payload, split_ambe};
pub use data::{DMRD_LENGTH_BYTES, DataType, DmrData, Flco};
pub use emb::Emb;
pub use embedded::EmbeddedData;
pub use lc::{FullLc, Lc};
pub use slot_type::SlotType;
pub use sync::{add_audio_sync, add_data_sync};
