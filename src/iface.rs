//! Interfaces to the adjacent protocol layers.
//!
//! A PDCP entity sits between an upper layer (RRC for signalling bearers, the gateway for data
//! bearers) and the RLC sublayer below. The entity only ever *pushes*: protected PDUs go down
//! through [`Rlc`], received SDUs go up through [`Rrc`] or [`Gw`]. All three are implemented by
//! the integrating stack and handed to the entity at construction.
//!
//! Buffer ownership transfers with every call; a layer that cannot forward a PDU is free to drop
//! it.
//!
//! [`Rlc`]: trait.Rlc.html
//! [`Rrc`]: trait.Rrc.html
//! [`Gw`]: trait.Gw.html

use crate::buffer::PduBuf;

/// The RLC sublayer below PDCP.
pub trait Rlc {
    /// Hands a protected PDU down for transmission on logical channel `lcid`.
    ///
    /// With `blocking` set, the call may wait for transmit buffer space; otherwise RLC may drop
    /// the PDU under pressure. PDCP does not observe the outcome either way.
    fn write_sdu(&self, lcid: u32, sdu: PduBuf, blocking: bool);

    /// Returns whether logical channel `lcid` is mapped on an unacknowledged-mode RLC entity.
    fn rb_is_um(&self, lcid: u32) -> bool;
}

/// The RRC layer above PDCP; receives control-plane traffic.
pub trait Rrc {
    /// Delivers a received signalling SDU.
    fn write_pdu(&self, lcid: u32, pdu: PduBuf);

    /// Returns the display name of the bearer on `lcid` (e.g. `SRB1`), for log output.
    fn rb_name(&self, lcid: u32) -> String;
}

/// The user-plane gateway above PDCP; receives data-plane traffic.
pub trait Gw {
    /// Delivers a received user-plane SDU.
    fn write_pdu(&self, lcid: u32, pdu: PduBuf);
}
