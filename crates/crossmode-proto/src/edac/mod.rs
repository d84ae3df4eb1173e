//! Error detection and correction primitives.
//!
//! Each code is specified by its algebraic contract: `decode(encode(x)) == x`
//! for every data word, correctable error weights are corrected and counted,
//! anything beyond that is reported as uncorrectable. The voice path never
//! drops a frame for a codec error - corrected-bit counts bubble up as BER
//! statistics instead.

mod ambe_fec;
mod bptc;
mod crc;
mod golay;
mod hamming;
mod rs129;

pub use ambe_fec::AmbeFec;
pub use bptc::Bptc196_96;
pub use crc::{ccitt16, five_bit_checksum};
pub use golay::{Golay23, Golay24};
pub use hamming::{Hamming13_9, Hamming15_11, Hamming16_11};
pub use rs129::Rs12_9;
