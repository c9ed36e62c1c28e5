//! Bearer and stack configuration.

use crate::count::SnLen;
use crate::iface::{Gw, Rlc, Rrc};
use crate::security::Security;

/// Trait for PDCP stack configurations.
///
/// This trait bundles the types a surrounding protocol stack plugs into the sublayer: the RLC
/// transport below, the RRC and GW sinks above, and the security algorithm set. Every integrating
/// stack defines one type implementing this trait and instantiates its entities with it.
///
/// The bounds require the collaborators to be shareable across threads, since the upper and lower
/// layers drive an entity from threads of their own.
pub trait Config {
    /// The RLC transport carrying PDUs towards the air interface.
    type Rlc: Rlc + Send + Sync;

    /// The control-plane sink for SDUs received on signalling bearers.
    type Rrc: Rrc + Send + Sync;

    /// The user-plane sink for SDUs received on data bearers.
    type Gw: Gw + Send + Sync;

    /// The configured ciphering and integrity algorithms.
    type Security: Security + Send + Sync;
}

/// The kind of radio bearer served by an entity.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum RbType {
    /// Signalling radio bearer (control plane, integrity protected).
    Srb,
    /// Data radio bearer (user plane).
    Drb,
}

/// Per-bearer configuration, immutable once the entity is initialized.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct PdcpConfig {
    /// Bearer identity, used for log and status correlation only.
    pub bearer_id: u32,

    /// Whether the bearer carries signalling or user data.
    pub rb_type: RbType,

    /// Width of the sequence number on the wire.
    ///
    /// SRBs always use the 5-bit control-PDU format; DRBs use one of the two data-PDU formats.
    pub sn_len: SnLen,
}

impl PdcpConfig {
    /// Creates the configuration of a signalling radio bearer.
    pub fn srb(bearer_id: u32) -> Self {
        Self {
            bearer_id,
            rb_type: RbType::Srb,
            sn_len: SnLen::Sn5,
        }
    }

    /// Creates the configuration of a data radio bearer with the given SN width.
    pub fn drb(bearer_id: u32, sn_len: SnLen) -> Self {
        Self {
            bearer_id,
            rb_type: RbType::Drb,
            sn_len,
        }
    }

    /// Returns the size of this bearer's PDU header in octets.
    pub fn hdr_len(&self) -> usize {
        self.sn_len.header_len()
    }
}
