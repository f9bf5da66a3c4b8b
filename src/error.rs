//! Error kinds shared across the stack (§7 of the design).
//!
//! Every error here is local: decode failures are logged and dropped,
//! routing/buffer failures surface only through `etc_trigger`/`etc_command`
//! return values or the unicast `sent` callback. Nothing panics on bad input.

use core::fmt;

/// Failure decoding a frame off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// The declared frame type's payload length didn't match what was received.
    MalformedFrame { expected: usize, actual: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MalformedFrame { expected, actual } => write!(
                f,
                "malformed frame: expected {expected} bytes, got {actual}"
            ),
        }
    }
}

/// Failure admitting a frame into the outbound unicast FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferFullError;

impl fmt::Display for BufferFullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unicast buffer full")
    }
}

/// Unified error type surfaced at the node façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EtcError {
    /// Wrong-size or unknown-type wire frame.
    MalformedFrame { expected: usize, actual: usize },
    /// The link layer rejected a transmit attempt.
    SendError,
    /// No parent: collects cannot be sent upward.
    Disconnected,
    /// No forward-table hop known for the final receiver.
    NoRoute,
    /// The unicast FIFO is at capacity.
    BufferFull,
    /// A frame arrived from where it could only have come by looping.
    LoopDetected,
    /// A unicast frame's hop counter exceeded the configured ceiling.
    MaxHopsExceeded,
    /// A trigger was requested while still within its suppression window.
    Suppressed,
}

impl From<CodecError> for EtcError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::MalformedFrame { expected, actual } => {
                EtcError::MalformedFrame { expected, actual }
            }
        }
    }
}

impl From<BufferFullError> for EtcError {
    fn from(_: BufferFullError) -> Self {
        EtcError::BufferFull
    }
}

impl fmt::Display for EtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtcError::MalformedFrame { expected, actual } => write!(
                f,
                "malformed frame: expected {expected} bytes, got {actual}"
            ),
            EtcError::SendError => write!(f, "link layer send failed"),
            EtcError::Disconnected => write!(f, "node has no parent"),
            EtcError::NoRoute => write!(f, "no forward-table route to receiver"),
            EtcError::BufferFull => write!(f, "unicast buffer full"),
            EtcError::LoopDetected => write!(f, "loop detected on receive"),
            EtcError::MaxHopsExceeded => write!(f, "hop count exceeded maximum"),
            EtcError::Suppressed => write!(f, "trigger suppressed by an active cooldown"),
        }
    }
}
