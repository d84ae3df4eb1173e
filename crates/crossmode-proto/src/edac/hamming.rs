//! Systematic Hamming codes used by the DMR block product code and the
//! embedded signalling matrix.
//!
//! Data bits lead, parity bits trail, so the codes compose into the BPTC
//! row/column product without shuffling. The syndrome is matched against the
//! parity-check columns to name the flipped bit. [`Hamming16_11`] adds an
//! overall parity bit for distance 4: double errors are detected rather than
//! miscorrected.

/// Parity-check columns for the 11 data bits of the (15,11) code: every
/// nonzero 4-bit pattern that is not a unit vector.
const COLS_15_11: [u8; 11] = [3, 5, 6, 7, 9, 10, 11, 12, 13, 14, 15];

/// Parity-check columns for the 9 data bits of the (13,9) code.
const COLS_13_9: [u8; 9] = [3, 5, 6, 7, 9, 10, 11, 12, 13];

fn parity_of(data: u16, cols: &[u8]) -> u8 {
    let k = cols.len();
    let mut parity = 0u8;
    for (i, &col) in cols.iter().enumerate() {
        if data & (1 << (k - 1 - i)) != 0 {
            parity ^= col;
        }
    }
    parity
}

fn decode_systematic(word: u16, cols: &[u8]) -> Option<(u16, u32)> {
    let k = cols.len();
    let mut data = word >> 4;
    let received_parity = (word & 0x0F) as u8;
    let syndrome = parity_of(data, cols) ^ received_parity;
    if syndrome == 0 {
        return Some((data, 0));
    }
    if syndrome.is_power_of_two() {
        // A parity bit itself flipped; data is intact
        return Some((data, 1));
    }
    let position = cols.iter().position(|&c| c == syndrome)?;
    data ^= 1 << (k - 1 - position);
    Some((data, 1))
}

/// Hamming (13,9,3): nine data bits, four trailing parity bits.
pub struct Hamming13_9;

impl Hamming13_9 {
    /// Encode 9 data bits into a 13-bit codeword (data high, parity low).
    pub fn encode(data: u16) -> u16 {
        let data = data & 0x01FF;
        (data << 4) | u16::from(parity_of(data, &COLS_13_9))
    }

    /// Decode a 13-bit word, correcting at most one bit error.
    ///
    /// Returns `None` when the syndrome names no position in the code.
    pub fn decode(word: u16) -> Option<(u16, u32)> {
        decode_systematic(word & 0x1FFF, &COLS_13_9)
    }
}

/// Hamming (15,11,3): eleven data bits, four trailing parity bits. The row
/// code of the BPTC (196,96) product.
pub struct Hamming15_11;

impl Hamming15_11 {
    /// Encode 11 data bits into a 15-bit codeword (data high, parity low).
    pub fn encode(data: u16) -> u16 {
        let data = data & 0x07FF;
        (data << 4) | u16::from(parity_of(data, &COLS_15_11))
    }

    /// Decode a 15-bit word, correcting at most one bit error.
    pub fn decode(word: u16) -> Option<(u16, u32)> {
        decode_systematic(word & 0x7FFF, &COLS_15_11)
    }
}

/// Hamming (16,11,4): systematic (15,11) plus an overall parity bit.
pub struct Hamming16_11;

impl Hamming16_11 {
    /// Encode 11 data bits into a 16-bit codeword.
    pub fn encode(data: u16) -> u16 {
        let data = data & 0x07FF;
        let inner = (data << 4) | u16::from(parity_of(data, &COLS_15_11));
        (inner << 1) | (inner.count_ones() as u16 & 1)
    }

    /// Decode a 16-bit word: corrects single errors, detects double errors
    /// (returned as `None`).
    pub fn decode(word: u16) -> Option<(u16, u32)> {
        let inner = word >> 1;
        let parity_even = word.count_ones() & 1 == 0;
        let data = inner >> 4;
        let syndrome = parity_of(data, &COLS_15_11) ^ (inner & 0x0F) as u8;
        match (syndrome, parity_even) {
            (0, true) => Some((data, 0)),
            // Overall parity bit itself flipped
            (0, false) => Some((data, 1)),
            // Single error inside the (15,11) word
            (s, false) => {
                if s.is_power_of_two() {
                    return Some((data, 1));
                }
                let position = COLS_15_11.iter().position(|&c| c == s)?;
                Some((data ^ (1 << (10 - position)), 1))
            },
            // Nonzero syndrome but even overall parity: double error
            (_, true) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn hamming13_9_corrects_one_error(data in 0u16..0x200, e in 0u32..13) {
            let corrupted = Hamming13_9::encode(data) ^ (1 << e) as u16;
            let (decoded, errs) = Hamming13_9::decode(corrupted).unwrap();
            prop_assert_eq!(decoded, data);
            prop_assert_eq!(errs, 1);
        }

        #[test]
        fn hamming16_11_corrects_one_error(data in 0u16..0x800, e in 0u32..16) {
            let corrupted = Hamming16_11::encode(data) ^ (1u16 << e);
            let (decoded, errs) = Hamming16_11::decode(corrupted).unwrap();
            prop_assert_eq!(decoded, data);
            prop_assert_eq!(errs, 1);
        }

        #[test]
        fn hamming16_11_detects_two_errors(data in 0u16..0x800, e0 in 0u32..16, e1 in 0u32..16) {
            prop_assume!(e0 != e1);
            let corrupted = Hamming16_11::encode(data) ^ (1u16 << e0) ^ (1u16 << e1);
            prop_assert!(Hamming16_11::decode(corrupted).is_none());
        }

        #[test]
        fn round_trips(data in 0u16..0x200) {
            prop_assert_eq!(Hamming13_9::decode(Hamming13_9::encode(data)), Some((data, 0)));
        }
    }
}
