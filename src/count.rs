//! COUNT and sequence number arithmetic.
//!
//! PDCP numbers PDUs with a short per-bearer sequence number (SN) of 5, 7 or 12 bits, but keys
//! ciphering and integrity protection with a 32-bit COUNT. The COUNT is the bit-exact
//! concatenation of a hyper-frame number (HFN) maintained locally on each side and the SN carried
//! in the PDU header:
//!
//! ```notrust
//! MSB                                LSB
//! +--------------------+--------------+
//! |        HFN         |      SN      |
//! | (32 - sn_len bits) | (sn_len bits)|
//! +--------------------+--------------+
//! ```
//!
//! The receiver never sees the HFN on the wire; it reconstructs the COUNT from the received SN
//! and its own HFN, bumping the HFN whenever the SN wraps. Getting this arithmetic wrong does not
//! fail loudly, it silently desynchronizes the cipher keystream for the rest of the session.

use std::fmt;

/// Width of the sequence number carried in a PDU header.
///
/// Signalling radio bearers always use the 5-bit control-PDU format; data radio bearers are
/// configured for either the short (7-bit) or long (12-bit) data-PDU format.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SnLen {
    /// 5-bit SN (control PDUs on SRBs).
    Sn5,
    /// 7-bit SN (short data PDUs).
    Sn7,
    /// 12-bit SN (long data PDUs).
    Sn12,
}

impl SnLen {
    /// Returns the SN width in bits.
    pub fn bits(self) -> u32 {
        match self {
            SnLen::Sn5 => 5,
            SnLen::Sn7 => 7,
            SnLen::Sn12 => 12,
        }
    }

    /// Returns the size of the PDU header carrying an SN of this width, in octets.
    pub fn header_len(self) -> usize {
        match self {
            SnLen::Sn5 | SnLen::Sn7 => 1,
            SnLen::Sn12 => 2,
        }
    }

    /// Returns the largest representable SN (`2^bits - 1`).
    pub fn max_sn(self) -> u32 {
        (1u32 << self.bits()) - 1
    }
}

/// A 32-bit PDCP COUNT.
///
/// This type implements wrapping arithmetic: the transmit COUNT rolls over at `u32::MAX`, and HFN
/// values passed to [`from_parts`] may themselves be the result of wrapping subtraction (the
/// receive paths key stale PDUs with `HFN - 1`, which underflows by design when the HFN is still
/// zero).
///
/// [`from_parts`]: #method.from_parts
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Default)]
pub struct Count(u32);

impl Count {
    /// A COUNT of 0 (default value).
    pub const ZERO: Self = Count(0);

    /// Creates a COUNT from its raw 32-bit value.
    pub fn new(raw: u32) -> Self {
        Count(raw)
    }

    /// Concatenates an HFN and an SN into a COUNT.
    ///
    /// HFN bits shifted beyond bit 31 are dropped, matching 32-bit unsigned arithmetic.
    pub fn from_parts(hfn: u32, sn: u32, sn_len: SnLen) -> Self {
        debug_assert!(sn <= sn_len.max_sn());
        Count((hfn << sn_len.bits()) | sn)
    }

    /// Returns the raw 32-bit value.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Extracts the SN half for the given SN width.
    pub fn sn(self, sn_len: SnLen) -> u32 {
        self.0 & sn_len.max_sn()
    }

    /// Extracts the HFN half for the given SN width.
    pub fn hfn(self, sn_len: SnLen) -> u32 {
        self.0 >> sn_len.bits()
    }

    /// Advances the COUNT by one, wrapping at `u32::MAX`.
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
