//! Event-Triggered Collection (ETC) protocol stack.
//!
//! A multi-hop wireless protocol for a small event-triggered control loop: a
//! distinguished controller collects threshold-violation reports from a
//! fixed set of sensor/actuator nodes and returns per-node actuation
//! commands, with plain forwarders carrying traffic in between. Every node
//! runs the same stack; its [`Role`] is derived once from its address.
//!
//! The radio driver, timer facility, and the application-level sensing/
//! actuation policy are external collaborators: this crate only specifies
//! and consumes their interfaces (see [`radio`] and [`timer`]).
#![no_std]

pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod etc_core;
pub mod forward;
pub mod node;
pub mod policy;
pub mod radio;
pub mod beacon;
pub mod timer;
pub mod testing;

pub use config::Config;
pub use error::EtcError;
pub use node::{EtcCallbacks, EtcNode};

/// Two-byte link-layer node address, with a distinguished "absent" value.
///
/// `NULL` (`00:00`) is never a real node's address; it marks an empty parent
/// slot, an empty forward-hop slot, or "no final receiver known".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeAddr([u8; 2]);

impl NodeAddr {
    /// The distinguished "absent" address.
    pub const NULL: NodeAddr = NodeAddr([0, 0]);

    pub const fn new(bytes: [u8; 2]) -> Self {
        NodeAddr(bytes)
    }

    pub const fn is_null(&self) -> bool {
        self.0[0] == 0 && self.0[1] == 0
    }

    pub const fn bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl Default for NodeAddr {
    fn default() -> Self {
        NodeAddr::NULL
    }
}

impl core::fmt::Debug for NodeAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02x}:{:02x}", self.0[0], self.0[1])
    }
}

/// A node's role in the tree, derived once from its address (§3, `node.c`'s
/// `node_get_role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    Controller,
    SensorActuator,
    Forwarder,
}

impl Role {
    /// Derive a role from `self_addr` against the compile-time controller
    /// address and ordered sensor set. Controller match takes priority over
    /// sensor membership; anything else is a plain forwarder.
    pub fn derive(self_addr: NodeAddr, controller: NodeAddr, sensors: &[NodeAddr]) -> Role {
        if self_addr == controller {
            return Role::Controller;
        }
        if sensors.iter().any(|s| *s == self_addr) {
            return Role::SensorActuator;
        }
        Role::Forwarder
    }
}

/// Identity of one event dissemination: the sensor that triggered it and its
/// local sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventId {
    pub source: NodeAddr,
    pub seqn: u16,
}

/// Actuation directive carried by a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandType {
    None = 0,
    Reset = 1,
    Threshold = 2,
}

impl CommandType {
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CommandType::None),
            1 => Some(CommandType::Reset),
            2 => Some(CommandType::Threshold),
            _ => None,
        }
    }
}
