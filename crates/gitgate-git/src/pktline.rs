//! Git pkt-line framing.
//!
//! Each line is prefixed with a 4-character hex length that counts the
//! prefix itself.

/// A pkt-line data packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PktLine(Vec<u8>);

impl PktLine {
    /// Largest payload a single packet can carry.
    pub const MAX_DATA_LEN: usize = 65516;

    /// Creates a packet from a message, appending the trailing newline.
    pub fn line(message: &str) -> Self {
        let mut data = message.as_bytes().to_vec();
        if !message.ends_with('\n') {
            data.push(b'\n');
        }
        Self(data)
    }

    /// Encodes the packet to bytes.
    ///
    /// Payloads longer than [`PktLine::MAX_DATA_LEN`] are truncated so the
    /// length prefix always fits in four hex digits.
    pub fn encode(&self) -> Vec<u8> {
        let data = &self.0[..self.0.len().min(Self::MAX_DATA_LEN)];
        let len = data.len() + 4; // 4 bytes for the length prefix
        let mut result = format!("{:04x}", len).into_bytes();
        result.extend_from_slice(data);
        result
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: the length prefix equals message length + 5
        #[test]
        fn prop_line_length_prefix(message in "[ -~]{0,512}") {
            let encoded = PktLine::line(&message).encode();
            let prefix = std::str::from_utf8(&encoded[..4]).unwrap();
            let len = usize::from_str_radix(prefix, 16).unwrap();
            prop_assert_eq!(len, message.len() + 5);
            prop_assert_eq!(encoded.len(), len);
            prop_assert_eq!(*encoded.last().unwrap(), b'\n');
        }
    }
}
