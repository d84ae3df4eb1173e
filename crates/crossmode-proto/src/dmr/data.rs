//! The DMRD network datagram.
//!
//! 55 bytes, bit-exact with the HBP convention used by MMDVM-family
//! repeaters: a fixed 20-byte routing header (parsed zero-copy), the 33-byte
//! burst payload, then BER and RSSI octets. The header's control byte packs
//! slot number, call type, frame type and the data-type-or-voice-sequence
//! nibble.

use bytes::BufMut;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};
use crate::{DMR_FRAME_LENGTH_BYTES, fne::TAG_DMR_DATA};

/// Total length of a DMRD datagram.
pub const DMRD_LENGTH_BYTES: usize = 55;

/// DMR burst data types.
///
/// The sync-framed types carry their wire nibble from the standard; `Voice`
/// and `VoiceSync` are distinguished by the network frame-type bits instead
/// and have no slot-type encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Privacy indicator header
    VoicePiHeader,
    /// Voice call header carrying a full LC
    VoiceLcHeader,
    /// Call terminator carrying a full LC
    TerminatorWithLc,
    /// Control signalling block
    Csbk,
    /// Data call header
    DataHeader,
    /// Rate 1/2 packet data
    Rate12Data,
    /// Rate 3/4 packet data
    Rate34Data,
    /// Channel idle filler
    Idle,
    /// Rate 1 packet data
    Rate1Data,
    /// Voice burst A (leads a superframe, carries the audio sync)
    VoiceSync,
    /// Voice bursts B-F (carry EMB + embedded signalling)
    Voice,
}

impl DataType {
    /// Wire nibble for sync-framed data types.
    pub fn wire_nibble(self) -> u8 {
        match self {
            Self::VoicePiHeader => 0x00,
            Self::VoiceLcHeader => 0x01,
            Self::TerminatorWithLc => 0x02,
            Self::Csbk => 0x03,
            Self::DataHeader => 0x06,
            Self::Rate12Data => 0x07,
            Self::Rate34Data => 0x08,
            Self::Idle => 0x09,
            Self::Rate1Data => 0x0A,
            // Voice frames are identified by frame type, not slot type
            Self::VoiceSync | Self::Voice => 0x0F,
        }
    }

    fn from_wire_nibble(nibble: u8) -> Result<Self> {
        match nibble {
            0x00 => Ok(Self::VoicePiHeader),
            0x01 => Ok(Self::VoiceLcHeader),
            0x02 => Ok(Self::TerminatorWithLc),
            0x03 => Ok(Self::Csbk),
            0x06 => Ok(Self::DataHeader),
            0x07 => Ok(Self::Rate12Data),
            0x08 => Ok(Self::Rate34Data),
            0x09 => Ok(Self::Idle),
            0x0A => Ok(Self::Rate1Data),
            other => Err(ProtocolError::UnknownDataType(other)),
        }
    }
}

/// Full link control opcode: group versus individual addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flco {
    /// Group voice call
    #[default]
    Group,
    /// Unit-to-unit voice call
    Private,
}

impl Flco {
    /// Wire opcode value.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Group => 0x00,
            Self::Private => 0x03,
        }
    }
}

/// Fixed 20-byte DMRD routing header (network byte order).
///
/// Stored as raw byte arrays so the struct can be cast from untrusted
/// datagram bytes without alignment or validity concerns.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct DmrdHeader {
    tag: [u8; 4],
    seq_no: u8,
    src_id: [u8; 3],
    dst_id: [u8; 3],
    peer_id: [u8; 4],
    bits: u8,
    stream_id: [u8; 4],
}

impl DmrdHeader {
    const SIZE: usize = 20;
}

/// One DMR frame as carried on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmrData {
    /// TDMA slot, 1 or 2
    pub slot_no: u8,
    /// Burst content type
    pub data_type: DataType,
    /// Group or individual call
    pub flco: Flco,
    /// Source radio identifier (24-bit)
    pub src_id: u32,
    /// Destination identifier (24-bit)
    pub dst_id: u32,
    /// Sending peer identifier
    pub peer_id: u32,
    /// Network sequence number
    pub seq_no: u8,
    /// Voice burst position within the superframe (0..=5)
    pub n: u8,
    /// Call stream identifier
    pub stream_id: u32,
    /// Reported bit error rate
    pub ber: u8,
    /// Reported signal strength
    pub rssi: u8,
    /// The 33-byte burst
    pub payload: [u8; DMR_FRAME_LENGTH_BYTES],
}

impl Default for DmrData {
    fn default() -> Self {
        Self {
            slot_no: 1,
            data_type: DataType::Idle,
            flco: Flco::Group,
            src_id: 0,
            dst_id: 0,
            peer_id: 0,
            seq_no: 0,
            n: 0,
            stream_id: 0,
            ber: 0,
            rssi: 0,
            payload: [0; DMR_FRAME_LENGTH_BYTES],
        }
    }
}

impl DmrData {
    /// Encode into a 55-byte DMRD datagram.
    pub fn encode(&self, dst: &mut impl BufMut) {
        let frame_type_bits = match self.data_type {
            DataType::Voice => 0x00,
            DataType::VoiceSync => 0x10,
            _ => 0x20,
        };
        let nibble = match self.data_type {
            DataType::Voice | DataType::VoiceSync => self.n & 0x0F,
            other => other.wire_nibble(),
        };
        let mut bits = frame_type_bits | nibble;
        if self.slot_no == 2 {
            bits |= 0x80;
        }
        if self.flco == Flco::Private {
            bits |= 0x40;
        }

        dst.put_slice(TAG_DMR_DATA);
        dst.put_u8(self.seq_no);
        dst.put_slice(&self.src_id.to_be_bytes()[1..]);
        dst.put_slice(&self.dst_id.to_be_bytes()[1..]);
        dst.put_u32(self.peer_id);
        dst.put_u8(bits);
        dst.put_u32(self.stream_id);
        dst.put_slice(&self.payload);
        dst.put_u8(self.ber);
        dst.put_u8(self.rssi);
    }

    /// Decode a DMRD datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DMRD_LENGTH_BYTES {
            return Err(ProtocolError::TooShort {
                expected: DMRD_LENGTH_BYTES,
                actual: bytes.len(),
            });
        }
        let header = DmrdHeader::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::TooShort {
                expected: DmrdHeader::SIZE,
                actual: bytes.len(),
            })?
            .0;
        if &header.tag != TAG_DMR_DATA {
            return Err(ProtocolError::InvalidTag);
        }

        let bits = header.bits;
        let (data_type, n) = match (bits >> 4) & 0x03 {
            0x00 => (DataType::Voice, bits & 0x0F),
            0x01 => (DataType::VoiceSync, bits & 0x0F),
            _ => (DataType::from_wire_nibble(bits & 0x0F)?, 0),
        };

        let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
        payload.copy_from_slice(&bytes[DmrdHeader::SIZE..DmrdHeader::SIZE + 33]);

        Ok(Self {
            slot_no: if bits & 0x80 != 0 { 2 } else { 1 },
            data_type,
            flco: if bits & 0x40 != 0 { Flco::Private } else { Flco::Group },
            src_id: u32::from_be_bytes([0, header.src_id[0], header.src_id[1], header.src_id[2]]),
            dst_id: u32::from_be_bytes([0, header.dst_id[0], header.dst_id[1], header.dst_id[2]]),
            peer_id: u32::from_be_bytes(header.peer_id),
            seq_no: header.seq_no,
            n,
            stream_id: u32::from_be_bytes(header.stream_id),
            ber: bytes[53],
            rssi: bytes[54],
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_frame() -> impl Strategy<Value = DmrData> {
        (
            1u8..=2,
            prop_oneof![
                Just(DataType::Voice),
                Just(DataType::VoiceSync),
                Just(DataType::VoiceLcHeader),
                Just(DataType::TerminatorWithLc),
            ],
            prop_oneof![Just(Flco::Group), Just(Flco::Private)],
            0u32..0x0100_0000,
            0u32..0x0100_0000,
            any::<u32>(),
            any::<u8>(),
            0u8..6,
            any::<u32>(),
            any::<[u8; 33]>(),
        )
            .prop_map(
                |(slot_no, data_type, flco, src_id, dst_id, peer_id, seq_no, n, stream_id, payload)| {
                    DmrData {
                        slot_no,
                        data_type,
                        flco,
                        src_id,
                        dst_id,
                        peer_id,
                        seq_no,
                        n: if matches!(data_type, DataType::Voice | DataType::VoiceSync) {
                            n
                        } else {
                            0
                        },
                        stream_id,
                        ber: 0,
                        rssi: 0,
                        payload,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn dmrd_round_trip(frame in arbitrary_frame()) {
            let mut wire = Vec::new();
            frame.encode(&mut wire);
            prop_assert_eq!(wire.len(), DMRD_LENGTH_BYTES);

            let decoded = DmrData::decode(&wire).unwrap();
            prop_assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn reject_truncated_datagram() {
        let frame = DmrData::default();
        let mut wire = Vec::new();
        frame.encode(&mut wire);
        let result = DmrData::decode(&wire[..40]);
        assert!(matches!(result, Err(ProtocolError::TooShort { .. })));
    }

    #[test]
    fn reject_wrong_tag() {
        let frame = DmrData::default();
        let mut wire = Vec::new();
        frame.encode(&mut wire);
        wire[0] = b'X';
        assert_eq!(DmrData::decode(&wire), Err(ProtocolError::InvalidTag));
    }
}
