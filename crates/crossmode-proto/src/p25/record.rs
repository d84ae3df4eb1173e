//! The P25D network datagram.
//!
//! One data unit per datagram: the tag, the DUID, a fixed call-routing
//! header (link control and encryption sync fields the records alone cannot
//! carry for every DUID), a length-prefixed record body, and a trailing
//! CRC-CCITT. Terminators travel with an empty body.

use bytes::BufMut;

use crate::edac::ccitt16;
use crate::errors::{ProtocolError, Result};
use crate::fne::TAG_P25_DATA;

/// Fixed header bytes between the tag and the length byte.
const HEADER_LENGTH_BYTES: usize = 14;

/// Minimum datagram: tag + header + length byte + CRC.
const MIN_LENGTH_BYTES: usize = 4 + HEADER_LENGTH_BYTES + 1 + 2;

/// P25 data unit identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duid {
    /// Header data unit
    Hdu,
    /// Terminator without link control
    Tdu,
    /// Logical data unit 1 (voice 1-9)
    Ldu1,
    /// Trunking signalling data unit
    Tsdu,
    /// Logical data unit 2 (voice 10-18)
    Ldu2,
    /// Packet data unit
    Pdu,
    /// Terminator with link control
    Tdulc,
}

impl Duid {
    /// Wire value.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Hdu => 0x00,
            Self::Tdu => 0x03,
            Self::Ldu1 => 0x05,
            Self::Tsdu => 0x07,
            Self::Ldu2 => 0x0A,
            Self::Pdu => 0x0C,
            Self::Tdulc => 0x0F,
        }
    }

    /// Parse a wire value.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Hdu),
            0x03 => Ok(Self::Tdu),
            0x05 => Ok(Self::Ldu1),
            0x07 => Ok(Self::Tsdu),
            0x0A => Ok(Self::Ldu2),
            0x0C => Ok(Self::Pdu),
            0x0F => Ok(Self::Tdulc),
            other => Err(ProtocolError::UnknownDuid(other)),
        }
    }
}

/// One P25 data unit as carried on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct P25Record {
    /// Data unit identifier
    pub duid: Duid,
    /// Link control opcode (0x00 group, 0x03 unit-to-unit)
    pub lco: u8,
    /// Manufacturer identifier
    pub mfid: u8,
    /// Encryption algorithm identifier
    pub alg_id: u8,
    /// Encryption key identifier
    pub key_id: u16,
    /// Source radio identifier (24-bit)
    pub src_id: u32,
    /// Destination identifier (24-bit)
    pub dst_id: u32,
    /// Low-speed data word
    pub lsd: [u8; 2],
    /// Packed record body (154 bytes for LDUs, empty for terminators)
    pub data: Vec<u8>,
}

impl P25Record {
    /// A bodiless record of the given DUID.
    pub fn control(duid: Duid, lco: u8, src_id: u32, dst_id: u32) -> Self {
        Self {
            duid,
            lco,
            mfid: 0,
            alg_id: 0x80, // unencrypted
            key_id: 0,
            src_id,
            dst_id,
            lsd: [0; 2],
            data: Vec::new(),
        }
    }

    /// Whether the link control addresses a talkgroup.
    pub fn is_group(&self) -> bool {
        self.lco != 0x03
    }

    /// Encode into a P25D datagram.
    pub fn encode(&self, dst: &mut impl BufMut) {
        let mut body = Vec::with_capacity(MIN_LENGTH_BYTES + self.data.len());
        body.push(self.duid.to_u8());
        body.push(self.lco);
        body.push(self.mfid);
        body.push(self.alg_id);
        body.extend_from_slice(&self.key_id.to_be_bytes());
        body.extend_from_slice(&self.src_id.to_be_bytes()[1..]);
        body.extend_from_slice(&self.dst_id.to_be_bytes()[1..]);
        body.extend_from_slice(&self.lsd);
        body.push(self.data.len() as u8);
        body.extend_from_slice(&self.data);

        dst.put_slice(TAG_P25_DATA);
        dst.put_slice(&body);
        dst.put_u16(ccitt16(&body));
    }

    /// Decode a P25D datagram, verifying the trailing CRC.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_LENGTH_BYTES {
            return Err(ProtocolError::TooShort {
                expected: MIN_LENGTH_BYTES,
                actual: bytes.len(),
            });
        }
        if &bytes[..4] != TAG_P25_DATA {
            return Err(ProtocolError::InvalidTag);
        }

        let body_len = usize::from(bytes[4 + HEADER_LENGTH_BYTES]);
        let total = 4 + HEADER_LENGTH_BYTES + 1 + body_len + 2;
        if bytes.len() < total {
            return Err(ProtocolError::TooShort { expected: total, actual: bytes.len() });
        }

        let body = &bytes[4..total - 2];
        let crc = (u16::from(bytes[total - 2]) << 8) | u16::from(bytes[total - 1]);
        if ccitt16(body) != crc {
            return Err(ProtocolError::Checksum);
        }

        Ok(Self {
            duid: Duid::from_u8(body[0])?,
            lco: body[1],
            mfid: body[2],
            alg_id: body[3],
            key_id: (u16::from(body[4]) << 8) | u16::from(body[5]),
            src_id: u32::from_be_bytes([0, body[6], body[7], body[8]]),
            dst_id: u32::from_be_bytes([0, body[9], body[10], body[11]]),
            lsd: [body[12], body[13]],
            data: body[15..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::p25::{LduBuffer, LduKind};

    #[test]
    fn ldu_record_round_trip() {
        let mut buffer = LduBuffer::new();
        buffer.inject_imbe(4, &[9u8; 11]);
        let record = P25Record {
            duid: Duid::Ldu1,
            lco: 0x00,
            mfid: 0,
            alg_id: 0x80,
            key_id: 0x1234,
            src_id: 200,
            dst_id: 5000,
            lsd: [0xAA, 0x55],
            data: buffer.build_record(LduKind::Ldu1).to_vec(),
        };

        let mut wire = Vec::new();
        record.encode(&mut wire);
        let decoded = P25Record::decode(&wire).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn corrupted_datagram_fails_the_crc() {
        let record = P25Record::control(Duid::Tdu, 0x00, 1, 2);
        let mut wire = Vec::new();
        record.encode(&mut wire);
        wire[7] ^= 0x01;
        assert_eq!(P25Record::decode(&wire), Err(ProtocolError::Checksum));
    }

    proptest! {
        #[test]
        fn control_records_round_trip(
            lco in prop_oneof![Just(0x00u8), Just(0x03u8)],
            src in 0u32..0x0100_0000,
            dst in 0u32..0x0100_0000,
        ) {
            let record = P25Record::control(Duid::Tdulc, lco, src, dst);
            let mut wire = Vec::new();
            record.encode(&mut wire);
            prop_assert_eq!(P25Record::decode(&wire).unwrap(), record);
        }
    }
}
