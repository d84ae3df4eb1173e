//! DMR base-station sync patterns.
//!
//! The 48-bit sync occupies the burst centre, nibble-aligned from the low
//! nibble of byte 13 to the high nibble of byte 19.

use crate::DMR_FRAME_LENGTH_BYTES;

/// BS-sourced data sync, nibble-aligned over bytes 13..=19.
const BS_DATA_SYNC: [u8; 7] = [0x0D, 0xFF, 0x57, 0xD7, 0x5D, 0xF5, 0xD0];

/// BS-sourced voice sync, nibble-aligned over bytes 13..=19.
const BS_VOICE_SYNC: [u8; 7] = [0x07, 0x55, 0xFD, 0x7D, 0xF7, 0x5F, 0x70];

fn add_sync(payload: &mut [u8; DMR_FRAME_LENGTH_BYTES], pattern: &[u8; 7]) {
    payload[13] = (payload[13] & 0xF0) | pattern[0];
    payload[14..19].copy_from_slice(&pattern[1..6]);
    payload[19] = (payload[19] & 0x0F) | pattern[6];
}

/// Write the BS data sync into a header/terminator burst.
pub fn add_data_sync(payload: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
    add_sync(payload, &BS_DATA_SYNC);
}

/// Write the BS audio sync into a voice sync burst.
pub fn add_audio_sync(payload: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
    add_sync(payload, &BS_VOICE_SYNC);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_leaves_voice_bits_alone() {
        let mut payload = [0xAAu8; DMR_FRAME_LENGTH_BYTES];
        add_audio_sync(&mut payload);
        assert_eq!(payload[12], 0xAA);
        assert_eq!(payload[13] & 0xF0, 0xA0);
        assert_eq!(payload[19] & 0x0F, 0x0A);
        assert_eq!(payload[20], 0xAA);
    }

    #[test]
    fn data_and_audio_sync_differ() {
        let mut a = [0u8; DMR_FRAME_LENGTH_BYTES];
        let mut b = [0u8; DMR_FRAME_LENGTH_BYTES];
        add_data_sync(&mut a);
        add_audio_sync(&mut b);
        assert_ne!(a, b);
    }
}
