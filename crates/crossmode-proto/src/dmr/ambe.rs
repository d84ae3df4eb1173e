//! Packing of the three AMBE codewords inside a voice burst.
//!
//! The 216 voice bits straddle the 48-bit centre: 108 bits end at the high
//! nibble of byte 13, the remaining 108 resume at the low nibble of byte 19.
//! Splitting and joining leave the centre (sync or EMB + embedded LC)
//! untouched, so signalling written before or after a join survives.

use crate::{
    AMBE_FRAME_LENGTH_BYTES, AMBE_PER_BURST, AMBE_SILENCE, DMR_AMBE_LENGTH_BYTES,
    DMR_FRAME_LENGTH_BYTES,
};

/// Extract the 27 AMBE bytes from a voice burst payload.
pub fn extract_ambe(payload: &[u8; DMR_FRAME_LENGTH_BYTES]) -> [u8; DMR_AMBE_LENGTH_BYTES] {
    let mut ambe = [0u8; DMR_AMBE_LENGTH_BYTES];
    ambe[..14].copy_from_slice(&payload[..14]);
    ambe[13] &= 0xF0;
    ambe[13] |= payload[19] & 0x0F;
    ambe[14..].copy_from_slice(&payload[20..33]);
    ambe
}

/// Place 27 AMBE bytes into a voice burst payload, preserving the burst
/// centre (the low nibble of byte 13 through the high nibble of byte 19).
pub fn insert_ambe(ambe: &[u8; DMR_AMBE_LENGTH_BYTES], payload: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
    payload[..13].copy_from_slice(&ambe[..13]);
    payload[13] = (payload[13] & 0x0F) | (ambe[13] & 0xF0);
    payload[19] = (payload[19] & 0xF0) | (ambe[13] & 0x0F);
    payload[20..33].copy_from_slice(&ambe[14..]);
}

/// Split a voice burst into its three 9-byte AMBE codewords.
pub fn split_ambe(
    payload: &[u8; DMR_FRAME_LENGTH_BYTES],
) -> [[u8; AMBE_FRAME_LENGTH_BYTES]; AMBE_PER_BURST] {
    let flat = extract_ambe(payload);
    let mut frames = [[0u8; AMBE_FRAME_LENGTH_BYTES]; AMBE_PER_BURST];
    for (n, frame) in frames.iter_mut().enumerate() {
        frame.copy_from_slice(&flat[n * AMBE_FRAME_LENGTH_BYTES..(n + 1) * AMBE_FRAME_LENGTH_BYTES]);
    }
    frames
}

/// A burst payload carrying three silence codewords and an empty centre.
pub fn silence_payload() -> [u8; DMR_FRAME_LENGTH_BYTES] {
    let mut ambe = [0u8; DMR_AMBE_LENGTH_BYTES];
    for n in 0..AMBE_PER_BURST {
        ambe[n * AMBE_FRAME_LENGTH_BYTES..(n + 1) * AMBE_FRAME_LENGTH_BYTES]
            .copy_from_slice(&AMBE_SILENCE);
    }
    let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
    insert_ambe(&ambe, &mut payload);
    payload
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn insert_then_extract_is_identity(ambe in proptest::array::uniform27(any::<u8>())) {
            let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
            insert_ambe(&ambe, &mut payload);
            prop_assert_eq!(extract_ambe(&payload), ambe);
        }

        #[test]
        fn insert_preserves_burst_centre(
            ambe in proptest::array::uniform27(any::<u8>()),
            centre in proptest::array::uniform6(any::<u8>()),
            low in 0u8..16,
            high in 0u8..16,
        ) {
            let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
            payload[13] = low;
            payload[14..20].copy_from_slice(&centre);
            payload[19] = (high << 4) | (payload[19] & 0x0F);

            let expected_centre = payload[14..19].to_vec();
            let expected_low = payload[13] & 0x0F;
            let expected_high = payload[19] & 0xF0;

            insert_ambe(&ambe, &mut payload);
            prop_assert_eq!(&payload[14..19], &expected_centre[..]);
            prop_assert_eq!(payload[13] & 0x0F, expected_low);
            prop_assert_eq!(payload[19] & 0xF0, expected_high);
        }
    }

    #[test]
    fn split_matches_flat_extraction() {
        let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let flat = extract_ambe(&payload);
        let frames = split_ambe(&payload);
        assert_eq!(&frames[0][..], &flat[..9]);
        assert_eq!(&frames[1][..], &flat[9..18]);
        assert_eq!(&frames[2][..], &flat[18..]);
    }
}
