//! The slot type field of data-sync bursts.
//!
//! Eight bits (colour code + data type) protected by a shortened extended
//! Golay to 20 bits, transmitted as two 10-bit halves flanking the data sync
//! (burst bits 98..108 and 156..166).

use crate::bits;
use crate::edac::Golay23;
use crate::{DMR_FRAME_LENGTH_BYTES, dmr::DataType};

/// Colour code and data type of a data-sync burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotType {
    /// Colour code (0..=15)
    pub color_code: u8,
    /// Data type nibble
    pub data_type: u8,
}

impl SlotType {
    /// Build a slot type for the given data type with colour code 0.
    pub fn new(data_type: DataType) -> Self {
        Self { color_code: 0, data_type: data_type.wire_nibble() }
    }

    fn to_word(self) -> u32 {
        let byte = u16::from((self.color_code << 4) | (self.data_type & 0x0F));
        // Top four data bits stay zero, so the (23,12) codeword fits in 19
        // bits; one overall parity bit extends the distance to 8
        let inner = Golay23::encode(byte);
        (inner << 1) | (inner.count_ones() & 1)
    }

    /// Encode into the two 10-bit halves of a burst.
    pub fn encode(self, payload: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
        let word = self.to_word();
        for i in 0..10 {
            bits::set(payload, 98 + i, word & (1 << (19 - i)) != 0);
        }
        for i in 0..10 {
            bits::set(payload, 156 + i, word & (1 << (9 - i)) != 0);
        }
    }

    /// Decode from a burst, correcting up to three bit errors. Returns the
    /// slot type and the corrected-bit count.
    pub fn decode(payload: &[u8; DMR_FRAME_LENGTH_BYTES]) -> Option<(Self, u32)> {
        let mut word = 0u32;
        for i in 0..10 {
            word = (word << 1) | u32::from(bits::get(payload, 98 + i));
        }
        for i in 0..10 {
            word = (word << 1) | u32::from(bits::get(payload, 156 + i));
        }

        let (data, _) = Golay23::decode(word >> 1);
        if data > 0xFF {
            // Decoded into the unshortened part of the code: uncorrectable
            return None;
        }
        let slot_type =
            Self { color_code: (data >> 4) as u8 & 0x0F, data_type: data as u8 & 0x0F };
        let errs = (slot_type.to_word() ^ word).count_ones();
        if errs > 3 {
            return None;
        }
        Some((slot_type, errs))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn round_trip(cc in 0u8..16, dt in 0u8..16) {
            let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
            let slot_type = SlotType { color_code: cc, data_type: dt };
            slot_type.encode(&mut payload);

            let (decoded, errs) = SlotType::decode(&payload).unwrap();
            prop_assert_eq!(decoded, slot_type);
            prop_assert_eq!(errs, 0);
        }

        #[test]
        fn corrects_two_errors(cc in 0u8..16, dt in 0u8..16, e0 in 0usize..20, e1 in 0usize..20) {
            let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
            let slot_type = SlotType { color_code: cc, data_type: dt };
            slot_type.encode(&mut payload);

            for e in [e0, e1] {
                let bit = if e < 10 { 98 + e } else { 156 + e - 10 };
                let flipped = !crate::bits::get(&payload, bit);
                crate::bits::set(&mut payload, bit, flipped);
            }

            if let Some((decoded, _)) = SlotType::decode(&payload) {
                prop_assert_eq!(decoded, slot_type);
            }
        }
    }
}
