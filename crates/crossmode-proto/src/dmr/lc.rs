//! DMR link control and its full-LC coding.
//!
//! The 72-bit LC carries the call addressing. For headers and terminators it
//! gains three Reed-Solomon (12,9) parity bytes - XOR-masked per data type so
//! the two cannot be confused - and rides through the BPTC (196,96) into the
//! two 98-bit halves of a data-sync burst.

use crate::bits;
use crate::edac::{Bptc196_96, Rs12_9};
use crate::{
    DMR_FRAME_LENGTH_BYTES,
    dmr::{DataType, Flco},
};

/// Parity mask for `DataType::VoiceLcHeader`.
const VOICE_LC_HEADER_MASK: [u8; 3] = [0x96, 0x96, 0x96];

/// Parity mask for `DataType::TerminatorWithLc`.
const TERMINATOR_WITH_LC_MASK: [u8; 3] = [0x99, 0x99, 0x99];

/// Call addressing: full link control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lc {
    /// Group or individual call
    pub flco: Flco,
    /// Feature set identifier
    pub fid: u8,
    /// Protect flag
    pub pf: bool,
    /// Source radio identifier (24-bit)
    pub src_id: u32,
    /// Destination identifier (24-bit)
    pub dst_id: u32,
}

impl Lc {
    /// Build an LC from its addressing triple.
    pub fn new(flco: Flco, src_id: u32, dst_id: u32) -> Self {
        Self { flco, fid: 0, pf: false, src_id, dst_id }
    }

    /// Serialize to the nine LC bytes.
    pub fn to_bytes(self) -> [u8; 9] {
        let dst = self.dst_id.to_be_bytes();
        let src = self.src_id.to_be_bytes();
        [
            (u8::from(self.pf) << 7) | (self.flco.to_u8() & 0x3F),
            self.fid,
            0x00,
            dst[1],
            dst[2],
            dst[3],
            src[1],
            src[2],
            src[3],
        ]
    }

    /// Parse from the nine LC bytes.
    pub fn from_bytes(bytes: &[u8; 9]) -> Self {
        let flco = if bytes[0] & 0x3F == 0x03 { Flco::Private } else { Flco::Group };
        Self {
            flco,
            fid: bytes[1],
            pf: bytes[0] & 0x80 != 0,
            src_id: u32::from_be_bytes([0, bytes[6], bytes[7], bytes[8]]),
            dst_id: u32::from_be_bytes([0, bytes[3], bytes[4], bytes[5]]),
        }
    }
}

/// Full-LC coding for data-sync bursts.
pub struct FullLc;

impl FullLc {
    fn mask(data_type: DataType) -> [u8; 3] {
        match data_type {
            DataType::TerminatorWithLc => TERMINATOR_WITH_LC_MASK,
            _ => VOICE_LC_HEADER_MASK,
        }
    }

    /// Encode an LC into the information halves of a burst (bits 0..98 and
    /// 166..264), leaving the centre and slot type untouched.
    pub fn encode(lc: Lc, payload: &mut [u8; DMR_FRAME_LENGTH_BYTES], data_type: DataType) {
        let lc_bytes = lc.to_bytes();
        let parity = Rs12_9::parity(&lc_bytes);
        let mask = Self::mask(data_type);

        let mut codeword = [0u8; 12];
        codeword[..9].copy_from_slice(&lc_bytes);
        for i in 0..3 {
            codeword[9 + i] = parity[i] ^ mask[i];
        }

        let coded = Bptc196_96::encode(&codeword);
        for i in 0..98 {
            bits::set(payload, i, bits::get(&coded, i));
        }
        for i in 98..196 {
            bits::set(payload, 68 + i, bits::get(&coded, i));
        }
    }

    /// Decode an LC from a data-sync burst. Returns the LC and the number of
    /// corrected bits, or `None` when the BPTC fails to converge or the
    /// Reed-Solomon check rejects the unmasked parity.
    pub fn decode(
        payload: &[u8; DMR_FRAME_LENGTH_BYTES],
        data_type: DataType,
    ) -> Option<(Lc, u32)> {
        let mut coded = [0u8; 25];
        for i in 0..98 {
            bits::set(&mut coded, i, bits::get(payload, i));
        }
        for i in 98..196 {
            bits::set(&mut coded, i, bits::get(payload, 68 + i));
        }

        let (mut codeword, errs) = Bptc196_96::decode(&coded)?;
        let mask = Self::mask(data_type);
        for i in 0..3 {
            codeword[9 + i] ^= mask[i];
        }
        if !Rs12_9::check(&codeword) {
            return None;
        }

        let mut lc_bytes = [0u8; 9];
        lc_bytes.copy_from_slice(&codeword[..9]);
        Some((Lc::from_bytes(&lc_bytes), errs))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn full_lc_round_trip(
            private in any::<bool>(),
            src in 0u32..0x0100_0000,
            dst in 0u32..0x0100_0000,
        ) {
            let flco = if private { Flco::Private } else { Flco::Group };
            let lc = Lc::new(flco, src, dst);
            let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
            FullLc::encode(lc, &mut payload, DataType::VoiceLcHeader);

            let (decoded, errs) = FullLc::decode(&payload, DataType::VoiceLcHeader).unwrap();
            prop_assert_eq!(decoded, lc);
            prop_assert_eq!(errs, 0);
        }
    }

    #[test]
    fn header_and_terminator_masks_differ() {
        let lc = Lc::new(Flco::Group, 100, 9000);
        let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
        FullLc::encode(lc, &mut payload, DataType::VoiceLcHeader);

        // Reading a header burst as a terminator must fail the parity check
        assert!(FullLc::decode(&payload, DataType::TerminatorWithLc).is_none());
    }

    #[test]
    fn encode_preserves_centre_region() {
        let lc = Lc::new(Flco::Group, 1, 2);
        let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
        // Mark the sync + slot type region (bits 98..166)
        for i in 98..166 {
            crate::bits::set(&mut payload, i, true);
        }
        FullLc::encode(lc, &mut payload, DataType::TerminatorWithLc);
        for i in 98..166 {
            assert!(crate::bits::get(&payload, i));
        }
    }

    #[test]
    fn lc_bytes_round_trip() {
        let lc = Lc::new(Flco::Private, 0x00AB_CDEF, 0x0012_3456);
        assert_eq!(Lc::from_bytes(&lc.to_bytes()), lc);
    }
}
