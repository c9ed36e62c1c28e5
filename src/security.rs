//! The ciphering and integrity protection seam.
//!
//! The entity decides *what* to protect and derives the COUNT that keys the protection; the
//! actual EEA/EIA algorithms, their keys, and the bearer/direction parameters live behind the
//! [`Security`] trait and are supplied by the integrating stack. An implementation is scoped to
//! one bearer and one direction pair, so the trait methods only take the data and the COUNT.
//!
//! Whether an entity invokes the algorithms at all is controlled separately by the
//! [`SecurityFlags`] toggles, which RRC flips once the security mode procedure completes.
//!
//! [`Security`]: trait.Security.html
//! [`SecurityFlags`]: struct.SecurityFlags.html

use crate::count::Count;
use bitflags::bitflags;

/// Length in octets of the MAC-I trailer carried by control-plane PDUs.
pub const MAC_LEN: usize = 4;

bitflags! {
    /// Per-entity protection toggles.
    ///
    /// Both start out cleared; RRC enables them independently once keys are in place. Integrity
    /// protection only applies to signalling bearers.
    pub struct SecurityFlags: u8 {
        /// Generate and verify the MAC-I on control-plane PDUs.
        const INTEGRITY = 1 << 0;
        /// Cipher and decipher PDU payloads.
        const CIPHERING = 1 << 1;
    }
}

/// A configured set of ciphering and integrity algorithms.
///
/// Ciphering operates in place: LTE ciphers are keystream XORs, so encryption and decryption are
/// the same operation keyed by the same COUNT. The integrity algorithm digests the whole PDU
/// (header included, MAC-I excluded) into the 4-octet MAC-I.
pub trait Security {
    /// Computes the MAC-I over `pdu` for the given COUNT.
    fn integrity_generate(&self, pdu: &[u8], count: Count) -> [u8; MAC_LEN];

    /// Checks the MAC-I received with `pdu` against the given COUNT.
    fn integrity_verify(&self, pdu: &[u8], count: Count, mac: &[u8; MAC_LEN]) -> bool {
        self.integrity_generate(pdu, count) == *mac
    }

    /// Ciphers `data` in place, keyed by `count`.
    fn cipher_encrypt(&self, data: &mut [u8], count: Count);

    /// Deciphers `data` in place, keyed by `count`.
    fn cipher_decrypt(&self, data: &mut [u8], count: Count);
}

/// The null algorithm set (EEA0/EIA0): ciphering passes data through unchanged and every MAC-I
/// verifies.
///
/// This is the state of every bearer before the security mode procedure has run.
#[derive(Debug)]
pub struct NoSecurity;

impl Security for NoSecurity {
    fn integrity_generate(&self, _pdu: &[u8], _count: Count) -> [u8; MAC_LEN] {
        [0; MAC_LEN]
    }

    fn integrity_verify(&self, _pdu: &[u8], _count: Count, _mac: &[u8; MAC_LEN]) -> bool {
        true
    }

    fn cipher_encrypt(&self, _data: &mut [u8], _count: Count) {}

    fn cipher_decrypt(&self, _data: &mut [u8], _count: Count) {}
}
