//! Wire format shared by sender and receiver
//!
//! A datagram is `[seq_hi, seq_lo, payload...]`. Only the sequence number is
//! interpreted; the payload is opaque PCM.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_DATAGRAM_SIZE, SEQUENCE_HEADER_LEN};
use crate::error::NetworkError;

/// Whether the sender writes a sequence prefix in front of the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceMode {
    /// Genuine incrementing big-endian counter before every payload
    #[default]
    Prefixed,
    /// Payload only; the receiver then reads the first two audio bytes
    /// as a pseudo sequence number
    Raw,
}

/// How a backwards jump across 65535 -> 0 is accounted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapPolicy {
    /// Plain signed difference; a rollover shows up as a large negative loss
    #[default]
    Signed,
    /// Difference taken modulo 2^16 and read as i16
    Rollover,
}

impl std::str::FromStr for WrapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signed" => Ok(WrapPolicy::Signed),
            "rollover" => Ok(WrapPolicy::Rollover),
            other => Err(format!("unknown wrap policy: {}", other)),
        }
    }
}

/// A decoded datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub sequence: u16,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(sequence: u16, payload: Bytes) -> Self {
        Self { sequence, payload }
    }

    /// Decode a received datagram
    ///
    /// Fails when fewer than two bytes arrived.
    pub fn decode(datagram: &[u8]) -> Result<Self, NetworkError> {
        let sequence = decode_sequence(datagram)?;
        Ok(Self {
            sequence,
            payload: Bytes::copy_from_slice(&datagram[SEQUENCE_HEADER_LEN..]),
        })
    }

    /// Serialize with the sequence prefix
    pub fn encode(&self) -> Result<Bytes, NetworkError> {
        let len = SEQUENCE_HEADER_LEN + self.payload.len();
        if len > MAX_DATAGRAM_SIZE {
            return Err(NetworkError::PacketTooLarge(len));
        }
        let mut buf = BytesMut::with_capacity(len);
        buf.put_u16(self.sequence);
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }
}

/// Read the leading big-endian sequence number without copying the payload
pub fn decode_sequence(datagram: &[u8]) -> Result<u16, NetworkError> {
    match datagram {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(NetworkError::InvalidPacket(datagram.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_big_endian() {
        let packet = Packet::decode(&[0x01, 0x02, 0xAA, 0xBB]).unwrap();
        assert_eq!(packet.sequence, 0x0102);
        assert_eq!(&packet.payload[..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_header_only_datagram() {
        let packet = Packet::decode(&[0xFF, 0xFF]).unwrap();
        assert_eq!(packet.sequence, u16::MAX);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn test_short_datagram_rejected() {
        assert!(matches!(
            decode_sequence(&[0x07]),
            Err(NetworkError::InvalidPacket(1))
        ));
        assert!(matches!(
            decode_sequence(&[]),
            Err(NetworkError::InvalidPacket(0))
        ));
    }

    #[test]
    fn test_encode_prefix() {
        let packet = Packet::new(258, Bytes::from_static(&[9, 9, 9]));
        let wire = packet.encode().unwrap();
        assert_eq!(&wire[..], &[1, 2, 9, 9, 9]);
        assert_eq!(Packet::decode(&wire).unwrap(), packet);
    }

    #[test]
    fn test_encode_too_large() {
        let packet = Packet::new(0, Bytes::from(vec![0u8; MAX_DATAGRAM_SIZE]));
        assert!(matches!(
            packet.encode(),
            Err(NetworkError::PacketTooLarge(n)) if n == MAX_DATAGRAM_SIZE + 2
        ));
    }

    #[test]
    fn test_wrap_policy_parse() {
        assert_eq!("signed".parse::<WrapPolicy>().unwrap(), WrapPolicy::Signed);
        assert_eq!("Rollover".parse::<WrapPolicy>().unwrap(), WrapPolicy::Rollover);
        assert!("modulo".parse::<WrapPolicy>().is_err());
    }
}
