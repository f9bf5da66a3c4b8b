//! Packet codec (§4.1).
//!
//! All frames are byte-packed, little-endian where multi-byte, with no
//! padding. An outer channel layer (not modeled here, see [`crate::radio`])
//! distinguishes broadcast from unicast; this module only encodes/decodes
//! the bytes that travel over either.
//!
//! Decoding never panics: a declared type whose payload length doesn't
//! match what's available returns [`CodecError::MalformedFrame`], and a tag
//! byte outside the known set decodes to an `Unknown` variant that the
//! caller logs and drops rather than treats as a hard error.

use crate::error::CodecError;
use crate::{CommandType, NodeAddr};

fn check_len(buf: &[u8], expected: usize) -> Result<(), CodecError> {
    if buf.len() != expected {
        return Err(CodecError::MalformedFrame {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

fn read_u16(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}

fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

fn read_addr(buf: &[u8]) -> NodeAddr {
    NodeAddr::new([buf[0], buf[1]])
}

/// One-byte discriminant on every broadcast frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BroadcastType {
    Beacon = 0,
    Event = 1,
    ForwardDiscoveryRequest = 2,
    ForwardDiscoveryResponse = 3,
    EmergencyCommand = 4,
}

impl BroadcastType {
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(BroadcastType::Beacon),
            1 => Some(BroadcastType::Event),
            2 => Some(BroadcastType::ForwardDiscoveryRequest),
            3 => Some(BroadcastType::ForwardDiscoveryResponse),
            4 => Some(BroadcastType::EmergencyCommand),
            _ => None,
        }
    }
}

/// Discriminant carried in a unicast frame's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UnicastType {
    Collect = 0,
    Command = 1,
}

impl UnicastType {
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(UnicastType::Collect),
            1 => Some(UnicastType::Command),
            _ => None,
        }
    }
}

/// `{seqn: u16, hopn: u16}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BeaconPayload {
    pub seqn: u16,
    pub hopn: u16,
}

impl BeaconPayload {
    pub const WIRE_LEN: usize = 4;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        buf[0..2].copy_from_slice(&self.seqn.to_le_bytes());
        buf[2..4].copy_from_slice(&self.hopn.to_le_bytes());
        Ok(Self::WIRE_LEN)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        Ok(BeaconPayload {
            seqn: read_u16(&buf[0..2]),
            hopn: read_u16(&buf[2..4]),
        })
    }
}

/// `{event_seqn: u16, event_source: addr}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventPayload {
    pub event_seqn: u16,
    pub event_source: NodeAddr,
}

impl EventPayload {
    pub const WIRE_LEN: usize = 4;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        buf[0..2].copy_from_slice(&self.event_seqn.to_le_bytes());
        buf[2..4].copy_from_slice(&self.event_source.bytes());
        Ok(Self::WIRE_LEN)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        Ok(EventPayload {
            event_seqn: read_u16(&buf[0..2]),
            event_source: read_addr(&buf[2..4]),
        })
    }
}

/// `{event_seqn, event_source, sender, value: u32, threshold: u32}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CollectPayload {
    pub event_seqn: u16,
    pub event_source: NodeAddr,
    pub sender: NodeAddr,
    pub value: u32,
    pub threshold: u32,
}

impl CollectPayload {
    pub const WIRE_LEN: usize = 2 + 2 + 2 + 4 + 4;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        buf[0..2].copy_from_slice(&self.event_seqn.to_le_bytes());
        buf[2..4].copy_from_slice(&self.event_source.bytes());
        buf[4..6].copy_from_slice(&self.sender.bytes());
        buf[6..10].copy_from_slice(&self.value.to_le_bytes());
        buf[10..14].copy_from_slice(&self.threshold.to_le_bytes());
        Ok(Self::WIRE_LEN)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        Ok(CollectPayload {
            event_seqn: read_u16(&buf[0..2]),
            event_source: read_addr(&buf[2..4]),
            sender: read_addr(&buf[4..6]),
            value: read_u32(&buf[6..10]),
            threshold: read_u32(&buf[10..14]),
        })
    }
}

/// `{event_seqn, event_source, receiver, command: u8, threshold: u32}`
///
/// Shared by COMMAND and EMERGENCY_COMMAND (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandPayload {
    pub event_seqn: u16,
    pub event_source: NodeAddr,
    pub receiver: NodeAddr,
    pub command: CommandType,
    pub threshold: u32,
}

impl CommandPayload {
    pub const WIRE_LEN: usize = 2 + 2 + 2 + 1 + 4;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        buf[0..2].copy_from_slice(&self.event_seqn.to_le_bytes());
        buf[2..4].copy_from_slice(&self.event_source.bytes());
        buf[4..6].copy_from_slice(&self.receiver.bytes());
        buf[6] = self.command.to_u8();
        buf[7..11].copy_from_slice(&self.threshold.to_le_bytes());
        Ok(Self::WIRE_LEN)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        let command = CommandType::from_u8(buf[6]).unwrap_or(CommandType::None);
        Ok(CommandPayload {
            event_seqn: read_u16(&buf[0..2]),
            event_source: read_addr(&buf[2..4]),
            receiver: read_addr(&buf[4..6]),
            command,
            threshold: read_u32(&buf[7..11]),
        })
    }
}

/// `{sensor: addr, distance: u8}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ForwardDiscoveryPayload {
    pub sensor: NodeAddr,
    pub distance: u8,
}

impl ForwardDiscoveryPayload {
    pub const WIRE_LEN: usize = 3;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        buf[0..2].copy_from_slice(&self.sensor.bytes());
        buf[2] = self.distance;
        Ok(Self::WIRE_LEN)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        check_len(buf, Self::WIRE_LEN)?;
        Ok(ForwardDiscoveryPayload {
            sensor: read_addr(&buf[0..2]),
            distance: buf[2],
        })
    }
}

/// Largest encoded size any broadcast frame can reach (tag byte plus the
/// largest payload, currently `EmergencyCommand`'s).
pub const MAX_BROADCAST_FRAME_LEN: usize = 1 + CommandPayload::WIRE_LEN;

/// Largest encoded size any unicast frame can reach (header plus the
/// largest payload, currently `Collect`'s).
pub const MAX_UNICAST_FRAME_LEN: usize = UnicastHeader::WIRE_LEN + CollectPayload::WIRE_LEN;

/// A decoded broadcast frame, tagged by its one-byte type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BroadcastFrame {
    Beacon(BeaconPayload),
    Event(EventPayload),
    ForwardDiscoveryRequest(ForwardDiscoveryPayload),
    ForwardDiscoveryResponse(ForwardDiscoveryPayload),
    EmergencyCommand(CommandPayload),
    /// Tag byte not among the known broadcast types. Logged and dropped by
    /// the caller, never an error.
    Unknown(u8),
}

impl BroadcastFrame {
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let (tag, rest) = buf
            .split_first()
            .ok_or(CodecError::MalformedFrame { expected: 1, actual: 0 })?;
        Ok(match BroadcastType::from_u8(*tag) {
            Some(BroadcastType::Beacon) => BroadcastFrame::Beacon(BeaconPayload::decode(rest)?),
            Some(BroadcastType::Event) => BroadcastFrame::Event(EventPayload::decode(rest)?),
            Some(BroadcastType::ForwardDiscoveryRequest) => {
                BroadcastFrame::ForwardDiscoveryRequest(ForwardDiscoveryPayload::decode(rest)?)
            }
            Some(BroadcastType::ForwardDiscoveryResponse) => {
                BroadcastFrame::ForwardDiscoveryResponse(ForwardDiscoveryPayload::decode(rest)?)
            }
            Some(BroadcastType::EmergencyCommand) => {
                BroadcastFrame::EmergencyCommand(CommandPayload::decode(rest)?)
            }
            None => BroadcastFrame::Unknown(*tag),
        })
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        if buf.is_empty() {
            return Err(CodecError::MalformedFrame {
                expected: 1,
                actual: 0,
            });
        }
        let (tag_byte, rest) = buf.split_at_mut(1);
        let (tag, len) = match self {
            BroadcastFrame::Beacon(p) => (BroadcastType::Beacon, p.encode(rest)?),
            BroadcastFrame::Event(p) => (BroadcastType::Event, p.encode(rest)?),
            BroadcastFrame::ForwardDiscoveryRequest(p) => {
                (BroadcastType::ForwardDiscoveryRequest, p.encode(rest)?)
            }
            BroadcastFrame::ForwardDiscoveryResponse(p) => {
                (BroadcastType::ForwardDiscoveryResponse, p.encode(rest)?)
            }
            BroadcastFrame::EmergencyCommand(p) => (BroadcastType::EmergencyCommand, p.encode(rest)?),
            BroadcastFrame::Unknown(raw) => {
                tag_byte[0] = *raw;
                return Ok(1);
            }
        };
        tag_byte[0] = tag.to_u8();
        Ok(1 + len)
    }
}

/// Header carried by every unicast frame: `{unicast_type, hops, final_receiver}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnicastHeader {
    pub unicast_type: UnicastType,
    pub hops: u8,
    pub final_receiver: NodeAddr,
}

impl UnicastHeader {
    pub const WIRE_LEN: usize = 4;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CodecError::MalformedFrame {
                expected: Self::WIRE_LEN,
                actual: buf.len(),
            });
        }
        buf[0] = self.unicast_type.to_u8();
        buf[1] = self.hops;
        buf[2..4].copy_from_slice(&self.final_receiver.bytes());
        Ok(Self::WIRE_LEN)
    }
}

/// A decoded unicast frame: header plus the type-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnicastFrame {
    Collect(UnicastHeader, CollectPayload),
    Command(UnicastHeader, CommandPayload),
    /// Unknown `unicast_type` tag. Logged and dropped by the caller.
    Unknown(u8),
}

impl UnicastFrame {
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < UnicastHeader::WIRE_LEN {
            return Err(CodecError::MalformedFrame {
                expected: UnicastHeader::WIRE_LEN,
                actual: buf.len(),
            });
        }
        let tag = buf[0];
        let hops = buf[1];
        let final_receiver = read_addr(&buf[2..4]);
        let rest = &buf[UnicastHeader::WIRE_LEN..];

        Ok(match UnicastType::from_u8(tag) {
            Some(UnicastType::Collect) => UnicastFrame::Collect(
                UnicastHeader {
                    unicast_type: UnicastType::Collect,
                    hops,
                    final_receiver,
                },
                CollectPayload::decode(rest)?,
            ),
            Some(UnicastType::Command) => UnicastFrame::Command(
                UnicastHeader {
                    unicast_type: UnicastType::Command,
                    hops,
                    final_receiver,
                },
                CommandPayload::decode(rest)?,
            ),
            None => UnicastFrame::Unknown(tag),
        })
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            UnicastFrame::Collect(header, payload) => {
                let hlen = header.encode(buf)?;
                let plen = payload.encode(&mut buf[hlen..])?;
                Ok(hlen + plen)
            }
            UnicastFrame::Command(header, payload) => {
                let hlen = header.encode(buf)?;
                let plen = payload.encode(&mut buf[hlen..])?;
                Ok(hlen + plen)
            }
            UnicastFrame::Unknown(tag) => {
                if buf.is_empty() {
                    return Err(CodecError::MalformedFrame {
                        expected: 1,
                        actual: 0,
                    });
                }
                buf[0] = *tag;
                Ok(1)
            }
        }
    }

    pub fn header(&self) -> Option<&UnicastHeader> {
        match self {
            UnicastFrame::Collect(h, _) | UnicastFrame::Command(h, _) => Some(h),
            UnicastFrame::Unknown(_) => None,
        }
    }
}
