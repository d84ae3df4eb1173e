//! FNE (master) link protocol: tag-prefixed binary over a single UDP socket.
//!
//! The repeater side drives a login handshake - `RPTL`, then `RPTK` with
//! `SHA-256(salt ∥ password)`, then the `RPTC` metadata block - and keeps the
//! link alive with `RPTPING`/`MSTPONG`. Traffic rides behind the `DMRD` and
//! `P25D` tags once the link is `Running`.

use sha2::{Digest, Sha256};

/// DMR traffic tag.
pub const TAG_DMR_DATA: &[u8; 4] = b"DMRD";
/// P25 traffic tag.
pub const TAG_P25_DATA: &[u8; 4] = b"P25D";
/// Login request tag.
pub const TAG_REPEATER_LOGIN: &[u8; 4] = b"RPTL";
/// Authentication response tag.
pub const TAG_REPEATER_AUTH: &[u8; 4] = b"RPTK";
/// Configuration tag.
pub const TAG_REPEATER_CONFIG: &[u8; 4] = b"RPTC";
/// Keepalive ping tag.
pub const TAG_REPEATER_PING: &[u8; 7] = b"RPTPING";
/// Repeater close tag.
pub const TAG_REPEATER_CLOSING: &[u8; 5] = b"RPTCL";
/// Master rejection tag.
pub const TAG_MASTER_NAK: &[u8; 6] = b"MSTNAK";
/// Master acknowledgement tag (login ack carries the salt after the tag).
pub const TAG_REPEATER_ACK: &[u8; 6] = b"MSTACK";
/// Keepalive pong tag.
pub const TAG_MASTER_PONG: &[u8; 7] = b"MSTPONG";
/// Master shutdown tag.
pub const TAG_MASTER_CLOSING: &[u8; 5] = b"MSTCL";
/// Radio-id whitelist push (ignored).
pub const TAG_MASTER_WL_RID: &[u8; 7] = b"MSTWRID";
/// Radio-id blacklist push (ignored).
pub const TAG_MASTER_BL_RID: &[u8; 7] = b"MSTBRID";
/// Talkgroup activation push (ignored).
pub const TAG_MASTER_ACTIVE_TGS: &[u8; 6] = b"MSTTID";
/// Talkgroup deactivation push (ignored).
pub const TAG_MASTER_DEACTIVE_TGS: &[u8; 7] = b"MSTDTID";

/// Software identifier reported in the RPTC block.
pub const SOFTWARE_ID: &str = "TCD_DMR_P25";

/// Link handshake state, in order of progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Socket not yet open or reconnecting
    WaitingConnect,
    /// `RPTL` sent, waiting for the salted ack
    WaitingLogin,
    /// `RPTK` sent, waiting for ack
    WaitingAuthorisation,
    /// `RPTC` sent, waiting for ack
    WaitingConfig,
    /// Logged in; traffic and pings flow
    Running,
}

/// Station metadata reported to the master in the RPTC block.
#[derive(Debug, Clone, Default)]
pub struct PeerMetadata {
    /// Station identity string
    pub identity: String,
    /// Receive frequency in Hz
    pub rx_frequency: u32,
    /// Transmit frequency in Hz
    pub tx_frequency: u32,
    /// Latitude in degrees
    pub latitude: f32,
    /// Longitude in degrees
    pub longitude: f32,
    /// Antenna height in metres
    pub height: i32,
    /// Free-form location text
    pub location: String,
    /// Transmit offset in MHz
    pub tx_offset_mhz: f32,
    /// Channel bandwidth in kHz
    pub ch_bandwidth_khz: f32,
    /// Channel identity
    pub channel_id: u8,
    /// Channel number
    pub channel_no: u32,
    /// Transmit power in watts
    pub power: u32,
}

/// Build the 8-byte `RPTL` login request.
pub fn login(peer_id: u32) -> [u8; 8] {
    let mut buffer = [0u8; 8];
    buffer[..4].copy_from_slice(TAG_REPEATER_LOGIN);
    buffer[4..].copy_from_slice(&peer_id.to_be_bytes());
    buffer
}

/// Build the 40-byte `RPTK` response: `SHA-256(salt ∥ password)`.
pub fn authorisation(peer_id: u32, salt: &[u8; 4], password: &str) -> [u8; 40] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    let mut buffer = [0u8; 40];
    buffer[..4].copy_from_slice(TAG_REPEATER_AUTH);
    buffer[4..8].copy_from_slice(&peer_id.to_be_bytes());
    buffer[8..].copy_from_slice(&digest);
    buffer
}

/// Build the 11-byte `RPTPING` keepalive.
pub fn ping(peer_id: u32) -> [u8; 11] {
    let mut buffer = [0u8; 11];
    buffer[..7].copy_from_slice(TAG_REPEATER_PING);
    buffer[7..].copy_from_slice(&peer_id.to_be_bytes());
    buffer
}

/// Build the 9-byte `RPTCL` close notice.
pub fn closing(peer_id: u32) -> [u8; 9] {
    let mut buffer = [0u8; 9];
    buffer[..5].copy_from_slice(TAG_REPEATER_CLOSING);
    buffer[5..].copy_from_slice(&peer_id.to_be_bytes());
    buffer
}

/// Left-justify (or truncate) into exactly `width` bytes.
fn left(text: &str, width: usize) -> String {
    let mut field = String::with_capacity(width);
    for ch in text.chars() {
        if field.len() + ch.len_utf8() > width {
            break;
        }
        field.push(ch);
    }
    while field.len() < width {
        field.push(' ');
    }
    field
}

/// Build the 168-byte `RPTC` configuration message (4-byte tag, peer id, and
/// the 160-byte fixed-width metadata block ending with the software id).
pub fn config(peer_id: u32, meta: &PeerMetadata) -> [u8; 168] {
    let mut block = String::with_capacity(160);
    block.push_str(&left(&meta.identity, 8));
    block.push_str(&format!("{:09}", meta.rx_frequency.min(999_999_999)));
    block.push_str(&format!("{:09}", meta.tx_frequency.min(999_999_999)));
    block.push_str(&left("", 10));
    block.push_str(&left(&format!("{:08.4}", meta.latitude), 8));
    block.push_str(&left(&format!("{:09.4}", meta.longitude), 9));
    block.push_str(&format!("{:03}", meta.height.clamp(0, 999)));
    block.push_str(&left(&meta.location, 20));
    block.push_str(&left("", 10));
    block.push_str(&left(&format!("{:02.2}", meta.tx_offset_mhz), 5));
    block.push_str(&left(&format!("{:02.2}", meta.ch_bandwidth_khz), 5));
    block.push_str(&left(&meta.channel_id.to_string(), 3));
    block.push_str(&left(&meta.channel_no.to_string(), 4));
    block.push_str(&format!("{:02}", meta.power.min(99)));
    block.push_str(&left(SOFTWARE_ID, 16));
    block.push_str(&left("", 10));
    block.push_str(&left("", 20));
    block.push_str(&format!("{:05}", 0));
    debug_assert_eq!(block.len(), 156);

    let mut buffer = [b' '; 168];
    buffer[..4].copy_from_slice(TAG_REPEATER_CONFIG);
    buffer[4..8].copy_from_slice(&peer_id.to_be_bytes());
    buffer[8..8 + block.len()].copy_from_slice(block.as_bytes());
    buffer
}

/// Extract the salt from a login `MSTACK` (tag + 4 salt bytes).
pub fn ack_salt(datagram: &[u8]) -> Option<[u8; 4]> {
    if datagram.len() < 10 || !datagram.starts_with(TAG_REPEATER_ACK) {
        return None;
    }
    let mut salt = [0u8; 4];
    salt.copy_from_slice(&datagram[6..10]);
    Some(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_layout() {
        let msg = login(0x0012_3456);
        assert_eq!(&msg[..4], b"RPTL");
        assert_eq!(&msg[4..], &[0x00, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn authorisation_hashes_salt_then_password() {
        let msg = authorisation(1, &[0xAB, 0xCD, 0xEF, 0x01], "passw0rd");

        let mut hasher = Sha256::new();
        hasher.update([0xAB, 0xCD, 0xEF, 0x01]);
        hasher.update(b"passw0rd");
        assert_eq!(&msg[8..], hasher.finalize().as_slice());
        assert_eq!(&msg[..4], b"RPTK");
    }

    #[test]
    fn config_block_is_exactly_168_bytes() {
        let meta = PeerMetadata {
            identity: "TCD-1".to_string(),
            location: "Somewhere, USA".to_string(),
            latitude: 41.25,
            longitude: -95.93,
            height: 12,
            power: 25,
            ..PeerMetadata::default()
        };
        let msg = config(312_000, &meta);
        assert_eq!(msg.len(), 168);
        assert_eq!(&msg[..4], b"RPTC");
        // identity field, left-justified over 8 bytes
        assert_eq!(&msg[8..16], b"TCD-1   ");
        let text = String::from_utf8_lossy(&msg[8..]);
        assert!(text.contains(SOFTWARE_ID));
    }

    #[test]
    fn salt_extraction() {
        let mut ack = Vec::new();
        ack.extend_from_slice(TAG_REPEATER_ACK);
        ack.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(ack_salt(&ack), Some([0xDE, 0xAD, 0xBE, 0xEF]));
        assert_eq!(ack_salt(b"MSTACK"), None);
        assert_eq!(ack_salt(b"MSTNAK\x01\x02\x03\x04"), None);
    }

    #[test]
    fn ping_and_closing_layout() {
        assert_eq!(&ping(7)[..7], b"RPTPING");
        assert_eq!(&ping(7)[7..], &[0, 0, 0, 7]);
        assert_eq!(&closing(7)[..5], b"RPTCL");
    }
}
