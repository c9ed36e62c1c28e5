//! Owned PDU buffers with header headroom.
//!
//! Every SDU/PDU travelling through the sublayer is carried in a [`PduBuf`]: a uniquely owned,
//! fixed-capacity byte buffer whose payload window can grow to the *left*. Prepending a PDCP
//! header is then a pointer adjustment instead of a copy, and stripping it on reception is the
//! inverse adjustment. Ownership of the buffer moves with it across layer boundaries; a PDU that
//! is discarded simply drops its buffer.
//!
//! The headroom reserved at allocation covers the largest header this crate prepends (2 octets
//! for the 12-bit-SN data header) with room to spare for layers below.
//!
//! [`PduBuf`]: struct.PduBuf.html

use crate::utils::HexDump;
use crate::Error;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Capacity of a [`PduBuf`] in bytes, headroom included.
///
/// Sized for the largest transport block a bearer can hand down in one piece.
///
/// [`PduBuf`]: struct.PduBuf.html
pub const PDU_BUF_SIZE: usize = 9216;

/// Offset of the payload window in a freshly allocated buffer.
const DEFAULT_HEADROOM: usize = 8;

/// A uniquely owned byte buffer with a moveable start.
///
/// Dereferences to the current payload window (`&[u8]`/`&mut [u8]`). The window is moved and
/// resized with [`grow_left`], [`strip_left`], [`append`] and [`truncate`]; the backing storage
/// never reallocates.
///
/// [`grow_left`]: #method.grow_left
/// [`strip_left`]: #method.strip_left
/// [`append`]: #method.append
/// [`truncate`]: #method.truncate
#[derive(Clone)]
pub struct PduBuf {
    buf: Box<[u8; PDU_BUF_SIZE]>,
    start: usize,
    len: usize,
}

impl PduBuf {
    /// Creates an empty buffer with the default header headroom.
    pub fn new() -> Self {
        Self {
            buf: Box::new([0; PDU_BUF_SIZE]),
            start: DEFAULT_HEADROOM,
            len: 0,
        }
    }

    /// Creates a buffer holding a copy of `data`, with the default header headroom in front
    /// of it.
    ///
    /// Returns `Error::Eof` when `data` does not fit.
    pub fn from_slice(data: &[u8]) -> Result<Self, Error> {
        let mut buf = Self::new();
        buf.append(data)?;
        Ok(buf)
    }

    /// Returns the number of unused bytes in front of the payload window.
    pub fn headroom(&self) -> usize {
        self.start
    }

    /// Returns the number of unused bytes behind the payload window.
    pub fn tailroom(&self) -> usize {
        PDU_BUF_SIZE - self.start - self.len
    }

    /// Moves the start of the payload window `n` bytes to the left.
    ///
    /// The bytes gained this way keep whatever contents they had; the caller is expected to
    /// overwrite them with a header immediately.
    ///
    /// Returns `Error::Eof` when less than `n` bytes of headroom are left.
    pub fn grow_left(&mut self, n: usize) -> Result<(), Error> {
        if self.start < n {
            return Err(Error::Eof);
        }
        self.start -= n;
        self.len += n;
        Ok(())
    }

    /// Drops the first `n` bytes of the payload window, reclaiming them as headroom.
    ///
    /// Panics when the window holds less than `n` bytes.
    pub fn strip_left(&mut self, n: usize) {
        assert!(n <= self.len);
        self.start += n;
        self.len -= n;
    }

    /// Appends `data` behind the payload window.
    ///
    /// Returns `Error::Eof` when less than `data.len()` bytes of tailroom are left.
    pub fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.tailroom() < data.len() {
            return Err(Error::Eof);
        }
        let end = self.start + self.len;
        self.buf[end..end + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    /// Shortens the payload window to `len` bytes, reclaiming the rest as tailroom.
    ///
    /// Has no effect when the window is already `len` bytes or shorter.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }
}

impl Default for PduBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for PduBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[self.start..self.start + self.len]
    }
}

impl DerefMut for PduBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.start..self.start + self.len]
    }
}

impl fmt::Debug for PduBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PduBuf({:?})", HexDump(self))
    }
}
