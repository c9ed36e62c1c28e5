//! An LTE PDCP sublayer implementation.
//!
//! Tries to adhere to *3GPP TS 36.323* (V10.1.0) for the parts it implements: per-bearer sequence
//! numbering, header packing, ciphering, integrity protection on the control plane, and COUNT
//! reconstruction from short sequence numbers on reception.
//!
//! # Using the sublayer
//!
//! The crate is transport- and crypto-agnostic: it contains no radio code and no EEA/EIA
//! algorithms. You instantiate one [`PdcpEntity`] per radio bearer and provide it with a few
//! environment-specific services:
//! * An [`Rlc`] transport that carries protected PDUs towards the air interface.
//! * An [`Rrc`] sink for control-plane SDUs and a [`Gw`] sink for user-plane SDUs.
//! * A [`Security`] implementation supplying the configured ciphering and integrity algorithms,
//!   keyed by the 32-bit COUNT the entity reconstructs.
//!
//! These are bundled in a [`Config`] type implemented by the integrating stack. Entities are
//! created inert and brought up with [`PdcpEntity::init`]; both layer directions may then drive
//! them concurrently, one thread per layer.
//!
//! [`PdcpEntity`]: entity/struct.PdcpEntity.html
//! [`PdcpEntity::init`]: entity/struct.PdcpEntity.html#method.init
//! [`Rlc`]: iface/trait.Rlc.html
//! [`Rrc`]: iface/trait.Rrc.html
//! [`Gw`]: iface/trait.Gw.html
//! [`Security`]: security/trait.Security.html
//! [`Config`]: config/trait.Config.html

mod error;
mod utils;

pub mod buffer;
pub mod config;
pub mod count;
pub mod entity;
pub mod framing;
pub mod iface;
pub mod security;

pub use self::error::Error;
