// ABOUTME: Opaque 64-bit gateway message identifier preserved byte-for-byte from the wire
// ABOUTME: Provides the little-endian signed reinterpretation the SP-side API reports to callers

use std::fmt;

/// Gateway-assigned message identifier (Msg_Id, 8 octets).
///
/// The gateway packs timestamp, gateway id and a counter into this field, but
/// the client never needs to look inside: it is kept as the raw wire bytes so
/// a DELIVER_RESP can echo it untouched. [`MsgId::as_i64`] is the identity
/// reported to callers and event handlers - the 8 bytes reinterpreted as a
/// little-endian signed integer.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MsgId([u8; 8]);

impl MsgId {
    pub const SIZE: usize = 8;

    /// Wrap raw wire bytes.
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        MsgId(bytes)
    }

    /// The wire representation.
    pub fn as_bytes(&self) -> [u8; 8] {
        self.0
    }

    /// The identifier as a little-endian signed 64-bit integer.
    pub fn as_i64(&self) -> i64 {
        i64::from_le_bytes(self.0)
    }
}

impl From<i64> for MsgId {
    fn from(value: i64) -> Self {
        MsgId(value.to_le_bytes())
    }
}

impl fmt::Debug for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MsgId({self})")
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
