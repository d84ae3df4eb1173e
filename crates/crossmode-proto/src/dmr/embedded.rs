//! Embedded link control, spread across a voice superframe.
//!
//! The 72-bit LC plus a 5-bit checksum fills seven Hamming (16,11,4) rows;
//! an eighth row carries column parity. The 128-bit matrix is serialized
//! column-major and handed out as four 32-bit fragments in voice bursts B-E,
//! with the LCSS in the EMB naming each fragment's position.

use crate::bits;
use crate::edac::{Hamming16_11, five_bit_checksum};
use crate::{DMR_FRAME_LENGTH_BYTES, dmr::Lc};

/// First burst bit of the embedded fragment (through bit 147).
const FRAGMENT_START: usize = 116;

/// Bits per fragment.
const FRAGMENT_BITS: usize = 32;

/// Assembler/generator for the embedded LC of one call.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedData {
    /// Serialized 128-bit matrix, column-major
    raw: [u8; 16],
    /// Fragments collected so far when receiving
    seen: [bool; 4],
    /// The LC decoded from (or encoded into) the matrix
    lc: Option<Lc>,
}

impl EmbeddedData {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently held LC, if any.
    pub fn lc(&self) -> Option<&Lc> {
        self.lc.as_ref()
    }

    /// Load an LC for transmission, building the coded matrix.
    pub fn set_lc(&mut self, lc: Lc) {
        let lc_bytes = lc.to_bytes();
        let checksum = five_bit_checksum(&lc_bytes);

        let mut matrix = [[false; 16]; 8];
        for row in 0..7 {
            let mut word = 0u16;
            for bit in 0..11 {
                let index = row * 11 + bit;
                let value = if index < 72 {
                    bits::get(&lc_bytes, index)
                } else {
                    checksum & (1 << (76 - index)) != 0
                };
                if value {
                    word |= 1 << (10 - bit);
                }
            }
            let codeword = Hamming16_11::encode(word);
            for col in 0..16 {
                matrix[row][col] = codeword & (1 << (15 - col)) != 0;
            }
        }
        for col in 0..16 {
            matrix[7][col] = (0..7).fold(false, |parity, row| parity ^ matrix[row][col]);
        }

        self.raw = [0u8; 16];
        for k in 0..128 {
            bits::set(&mut self.raw, k, matrix[k % 8][k / 8]);
        }
        self.seen = [true; 4];
        self.lc = Some(lc);
    }

    /// Write the embedded fragment for voice burst `n` into a payload and
    /// return the matching LCSS. Bursts outside B-E carry a null fragment.
    pub fn get_data(&self, payload: &mut [u8; DMR_FRAME_LENGTH_BYTES], n: u8) -> u8 {
        if !(1..=4).contains(&n) {
            for i in 0..FRAGMENT_BITS {
                bits::set(payload, FRAGMENT_START + i, false);
            }
            return 0;
        }

        let fragment = (usize::from(n) - 1) * FRAGMENT_BITS;
        for i in 0..FRAGMENT_BITS {
            bits::set(payload, FRAGMENT_START + i, bits::get(&self.raw, fragment + i));
        }
        match n {
            1 => 1,
            4 => 2,
            _ => 3,
        }
    }

    /// Collect the embedded fragment of voice burst `n` while receiving.
    /// Returns the reassembled LC once all four fragments have arrived and
    /// the matrix verifies.
    pub fn set_data(&mut self, payload: &[u8; DMR_FRAME_LENGTH_BYTES], n: u8) -> Option<Lc> {
        if !(1..=4).contains(&n) {
            return None;
        }

        let fragment = (usize::from(n) - 1) * FRAGMENT_BITS;
        for i in 0..FRAGMENT_BITS {
            bits::set(&mut self.raw, fragment + i, bits::get(payload, FRAGMENT_START + i));
        }
        self.seen[usize::from(n) - 1] = true;
        if !self.seen.iter().all(|&s| s) {
            return None;
        }

        self.seen = [false; 4];
        self.decode_matrix()
    }

    fn decode_matrix(&mut self) -> Option<Lc> {
        let mut matrix = [[false; 16]; 8];
        for k in 0..128 {
            matrix[k % 8][k / 8] = bits::get(&self.raw, k);
        }

        let mut data_bits = [false; 77];
        for row in 0..7 {
            let mut word = 0u16;
            for col in 0..16 {
                if matrix[row][col] {
                    word |= 1 << (15 - col);
                }
            }
            let (data, _) = Hamming16_11::decode(word)?;
            for bit in 0..11 {
                let index = row * 11 + bit;
                data_bits[index] = data & (1 << (10 - bit)) != 0;
            }
        }

        let mut lc_bytes = [0u8; 9];
        for (index, &bit) in data_bits.iter().take(72).enumerate() {
            bits::set(&mut lc_bytes, index, bit);
        }
        let mut checksum = 0u8;
        for (i, &bit) in data_bits[72..].iter().enumerate() {
            if bit {
                checksum |= 1 << (4 - i);
            }
        }
        if checksum != five_bit_checksum(&lc_bytes) {
            return None;
        }

        let lc = Lc::from_bytes(&lc_bytes);
        self.lc = Some(lc);
        Some(lc)
    }
}
