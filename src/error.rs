use std::fmt;

/// Errors returned by the PDCP sublayer.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Ran out of buffer space while reading or writing data.
    ///
    /// This is returned when an SDU does not leave enough headroom for the
    /// PDCP header (or tailroom for the MAC-I), and when a fixed-size buffer
    /// is asked to hold more bytes than it has capacity for.
    Eof,

    /// Invalid value supplied for a field.
    ///
    /// Returned by entity configuration when the bearer type and SN length
    /// do not go together.
    InvalidValue,

    /// The entity is not accepting traffic.
    ///
    /// Entities start out inert and stop accepting traffic after `reset`;
    /// only `init` makes them active.
    Inactive,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Error::Eof => "out of buffer space",
            Error::InvalidValue => "invalid value for field",
            Error::Inactive => "entity is not active",
        })
    }
}
