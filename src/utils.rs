use std::fmt;

/// `Debug`-formats a byte buffer as space-separated hex octets.
///
/// Used to dump PDU contents into log lines without paying for the formatting
/// when the log level filters the line out.
#[derive(Copy, Clone)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, byte) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format() {
        assert_eq!(format!("{:?}", HexDump(&[])), "[]");
        assert_eq!(format!("{:?}", HexDump(&[0x80, 0x01, 0xff])), "[80 01 ff]");
    }
}
