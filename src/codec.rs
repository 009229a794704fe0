// CMPP 3.0 Codec - Separates parsing/encoding logic from domain models
//
// This module provides a clean separation between the wire format (codec)
// and the domain models (PDUs). Each PDU implements Encodable/Decodable traits
// rather than having all parsing logic in a monolithic frame parser.

use crate::datatypes::CommandId;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks.
///
/// The largest legal CMPP 3.0 PDU is a SUBMIT addressed to 99 terminals,
/// well under this bound.
pub const MAX_PDU_SIZE: u32 = 8192;

/// CMPP 3.0 Message Header (12 bytes, common to all PDUs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub total_length: u32,
    pub command_id: CommandId,
    pub sequence_id: u32,
}

impl PduHeader {
    pub const SIZE: usize = 12;

    /// Decode a message header from the buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let total_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;
        let sequence_id = buf.get_u32();

        if total_length < Self::SIZE as u32 || total_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: total_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        Ok(PduHeader {
            total_length,
            command_id,
            sequence_id,
        })
    }

    /// Encode the message header to the buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.total_length);
        buf.put_u32(self.command_id as u32);
        buf.put_u32(self.sequence_id);
    }
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU, header included, to the buffer.
    ///
    /// The Total_Length field may be written as zero; `to_bytes` fixes it up.
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Convert this PDU to wire bytes with a correct Total_Length field.
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;

        let length = buf.len() as u32;
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer positioned after the header
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Return the expected command_id for this PDU type
    fn command_id() -> CommandId;

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {0:#x}")]
    InvalidCommandId(u32),

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode a fixed-length octet-string field.
///
/// CMPP octet strings are NUL-padded to their declared width with no
/// terminator byte; trailing NULs are trimmed on decode.
pub fn decode_octet_string(
    buf: &mut Cursor<&[u8]>,
    len: usize,
    field_name: &'static str,
) -> Result<String, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }

    let field_bytes = buf.copy_to_bytes(len);
    let end = field_bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);

    String::from_utf8(field_bytes[..end].to_vec()).map_err(|e| CodecError::Utf8Error {
        field: field_name,
        source: e,
    })
}

/// Encode a fixed-length octet-string field, truncating and NUL-padding.
pub fn encode_octet_string(buf: &mut BytesMut, value: &str, len: usize) {
    let bytes = value.as_bytes();
    let actual_len = bytes.len().min(len);

    buf.put_slice(&bytes[..actual_len]);
    for _ in actual_len..len {
        buf.put_u8(0);
    }
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 32-bit big-endian integer
pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u32())
}

/// Decode a fixed-size byte array (Msg_Id, authenticator digests)
pub fn decode_byte_array<const N: usize>(
    buf: &mut Cursor<&[u8]>,
) -> Result<[u8; N], CodecError> {
    if buf.remaining() < N {
        return Err(CodecError::Incomplete);
    }
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Generic frame type that can hold any PDU
#[derive(Debug)]
pub enum Frame {
    // Session management PDUs
    Connect(crate::datatypes::Connect),
    ConnectResp(crate::datatypes::ConnectResponse),
    Terminate(crate::datatypes::Terminate),
    TerminateResp(crate::datatypes::TerminateResponse),

    // Message PDUs (boxed for large structs)
    Submit(Box<crate::datatypes::Submit>),
    SubmitResp(crate::datatypes::SubmitResponse),
    Deliver(Box<crate::datatypes::Deliver>),
    DeliverResp(crate::datatypes::DeliverResponse),

    // Keepalive PDUs
    ActiveTest(crate::datatypes::ActiveTest),
    ActiveTestResp(crate::datatypes::ActiveTestResponse),
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

impl PduRegistry {
    /// Create a new registry with the CMPP 3.0 client PDUs registered
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        registry.register_pdu::<crate::datatypes::Connect, _>(Frame::Connect);
        registry.register_pdu::<crate::datatypes::ConnectResponse, _>(Frame::ConnectResp);
        registry.register_pdu::<crate::datatypes::Terminate, _>(Frame::Terminate);
        registry.register_pdu::<crate::datatypes::TerminateResponse, _>(Frame::TerminateResp);

        registry.register_pdu::<crate::datatypes::Submit, _>(|pdu| Frame::Submit(Box::new(pdu)));
        registry.register_pdu::<crate::datatypes::SubmitResponse, _>(Frame::SubmitResp);
        registry.register_pdu::<crate::datatypes::Deliver, _>(|pdu| Frame::Deliver(Box::new(pdu)));
        registry.register_pdu::<crate::datatypes::DeliverResponse, _>(Frame::DeliverResp);

        registry.register_pdu::<crate::datatypes::ActiveTest, _>(Frame::ActiveTest);
        registry.register_pdu::<crate::datatypes::ActiveTestResponse, _>(Frame::ActiveTestResp);

        registry
    }

    /// Register a PDU type with its frame constructor
    fn register_pdu<T, F>(&mut self, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        let command_id = T::command_id();
        let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
            let pdu = T::decode(header, buf)?;
            Ok(frame_constructor(pdu))
        });
        self.decoders.insert(command_id, decoder);
    }

    /// Decode a PDU given its header and body
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        match self.decoders.get(&header.command_id) {
            Some(decoder) => decoder(header, buf),
            None => Err(CodecError::InvalidCommandId(header.command_id as u32)),
        }
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Get the command_id for this frame
    pub fn command_id(&self) -> CommandId {
        match self {
            Frame::Connect(_) => CommandId::Connect,
            Frame::ConnectResp(_) => CommandId::ConnectResp,
            Frame::Terminate(_) => CommandId::Terminate,
            Frame::TerminateResp(_) => CommandId::TerminateResp,
            Frame::Submit(_) => CommandId::Submit,
            Frame::SubmitResp(_) => CommandId::SubmitResp,
            Frame::Deliver(_) => CommandId::Deliver,
            Frame::DeliverResp(_) => CommandId::DeliverResp,
            Frame::ActiveTest(_) => CommandId::ActiveTest,
            Frame::ActiveTestResp(_) => CommandId::ActiveTestResp,
        }
    }

    /// Get the sequence id for this frame
    pub fn sequence_id(&self) -> u32 {
        match self {
            Frame::Connect(pdu) => pdu.sequence_id,
            Frame::ConnectResp(pdu) => pdu.sequence_id,
            Frame::Terminate(pdu) => pdu.sequence_id,
            Frame::TerminateResp(pdu) => pdu.sequence_id,
            Frame::Submit(pdu) => pdu.sequence_id,
            Frame::SubmitResp(pdu) => pdu.sequence_id,
            Frame::Deliver(pdu) => pdu.sequence_id,
            Frame::DeliverResp(pdu) => pdu.sequence_id,
            Frame::ActiveTest(pdu) => pdu.sequence_id,
            Frame::ActiveTestResp(pdu) => pdu.sequence_id,
        }
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    /// Encode this frame to wire bytes
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        match self {
            Frame::Connect(pdu) => pdu.to_bytes(),
            Frame::ConnectResp(pdu) => pdu.to_bytes(),
            Frame::Terminate(pdu) => pdu.to_bytes(),
            Frame::TerminateResp(pdu) => pdu.to_bytes(),
            Frame::Submit(pdu) => pdu.to_bytes(),
            Frame::SubmitResp(pdu) => pdu.to_bytes(),
            Frame::Deliver(pdu) => pdu.to_bytes(),
            Frame::DeliverResp(pdu) => pdu.to_bytes(),
            Frame::ActiveTest(pdu) => pdu.to_bytes(),
            Frame::ActiveTestResp(pdu) => pdu.to_bytes(),
        }
    }

    /// Check whether the buffer holds at least one complete frame.
    ///
    /// Returns `Err(CodecError::Incomplete)` when more data is needed; the
    /// cursor position is left untouched.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<(), CodecError> {
        if buf.remaining() < PduHeader::SIZE {
            return Err(CodecError::Incomplete);
        }

        let pos = buf.position();
        let total_length = buf.get_u32();
        buf.set_position(pos);

        if total_length < PduHeader::SIZE as u32 || total_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: total_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < total_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(())
    }

    /// Parse one complete frame from the buffer
    pub fn parse(buf: &mut Cursor<&[u8]>) -> Result<Frame, CodecError> {
        let registry = PduRegistry::new();
        let header = PduHeader::decode(buf)?;
        registry.decode_pdu(header, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{ActiveTest, ActiveTestResponse, MsgId, SubmitResponse, Terminate};

    #[test]
    fn pdu_header_encode_decode() {
        let header = PduHeader {
            total_length: 12,
            command_id: CommandId::ActiveTest,
            sequence_id: 42,
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = PduHeader::decode(&mut cursor).unwrap();

        assert_eq!(header, decoded);
    }

    #[test]
    fn header_rejects_unknown_command_id() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x0c, // total_length
            0x00, 0x00, 0x00, 0x06, // command_id (query, not registered)
            0x00, 0x00, 0x00, 0x01, // sequence_id
        ];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            PduHeader::decode(&mut cursor),
            Err(CodecError::InvalidCommandId(0x06))
        ));
    }

    #[test]
    fn header_rejects_bad_lengths() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x08, // total_length too small
            0x00, 0x00, 0x00, 0x01, // command_id
            0x00, 0x00, 0x00, 0x01, // sequence_id
        ];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            PduHeader::decode(&mut cursor),
            Err(CodecError::InvalidPduLength { .. })
        ));
    }

    #[test]
    fn decode_octet_string_trims_padding() {
        let data = b"109000\0\0\0\0";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_octet_string(&mut cursor, 10, "test").unwrap();
        assert_eq!(result, "109000");
        assert_eq!(cursor.position(), 10);
    }

    #[test]
    fn decode_octet_string_keeps_interior_nul() {
        // only trailing padding is trimmed
        let data = b"ab\0cd\0\0\0";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_octet_string(&mut cursor, 8, "test").unwrap();
        assert_eq!(result, "ab\0cd");
    }

    #[test]
    fn encode_octet_string_pads_and_truncates() {
        let mut buf = BytesMut::new();
        encode_octet_string(&mut buf, "900001", 10);
        assert_eq!(buf.as_ref(), b"900001\0\0\0\0");

        let mut buf = BytesMut::new();
        encode_octet_string(&mut buf, "too-long-value", 6);
        assert_eq!(buf.as_ref(), b"too-lo");
    }

    #[test]
    fn frame_check_incomplete() {
        let data = vec![0x00, 0x00]; // only 2 bytes
        let mut cursor = Cursor::new(data.as_slice());
        assert!(matches!(
            Frame::check(&mut cursor),
            Err(CodecError::Incomplete)
        ));
    }

    #[test]
    fn frame_check_partial_body() {
        // header claims 20 bytes, only 12 present
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
        ];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            Frame::check(&mut cursor),
            Err(CodecError::Incomplete)
        ));
    }

    #[test]
    fn frame_accessors() {
        let probe = ActiveTest { sequence_id: 42 };
        let frame = Frame::ActiveTest(probe);
        assert_eq!(frame.command_id(), CommandId::ActiveTest);
        assert_eq!(frame.sequence_id(), 42);
        assert!(!frame.is_response());

        let frame = Frame::ActiveTestResp(ActiveTestResponse::new(43));
        assert_eq!(frame.command_id(), CommandId::ActiveTestResp);
        assert_eq!(frame.sequence_id(), 43);
        assert!(frame.is_response());
    }

    #[test]
    fn registry_decodes_submit_resp() {
        let resp = SubmitResponse {
            sequence_id: 7,
            msg_id: MsgId::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]),
            result: 0,
        };
        let bytes = resp.to_bytes().unwrap();

        let mut cursor = Cursor::new(bytes.as_ref());
        let frame = Frame::parse(&mut cursor).unwrap();
        match frame {
            Frame::SubmitResp(decoded) => {
                assert_eq!(decoded.sequence_id, 7);
                assert_eq!(decoded.result, 0);
                assert_eq!(decoded.msg_id.as_i64(), 0x0807060504030201);
            }
            other => panic!("expected SubmitResp, got {other:?}"),
        }
    }

    #[test]
    fn registry_roundtrips_terminate() {
        let bytes = Terminate { sequence_id: 9 }.to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let frame = Frame::parse(&mut cursor).unwrap();
        assert!(matches!(frame, Frame::Terminate(t) if t.sequence_id == 9));
    }

    #[test]
    fn registry_has_client_pdus() {
        let registry = PduRegistry::new();
        assert!(registry.is_registered(CommandId::ConnectResp));
        assert!(registry.is_registered(CommandId::SubmitResp));
        assert!(registry.is_registered(CommandId::Deliver));
        assert!(registry.is_registered(CommandId::ActiveTest));
        assert!(registry.is_registered(CommandId::Terminate));
    }
}
