// ABOUTME: CMPP_CONNECT and CMPP_CONNECT_RESP PDUs used to open an authenticated session
// ABOUTME: Carries the MD5 source authenticator and the MMddhhmmss login timestamp

use crate::codec::{
    decode_byte_array, decode_octet_string, decode_u32, decode_u8, encode_octet_string,
    CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::CommandId;
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// Protocol version negotiated in CONNECT: CMPP 3.0.
pub const CMPP_VERSION: u8 = 0x30;

/// CMPP_CONNECT - sent by the SP to open a session.
///
/// `authenticator_source` is MD5(Source_Addr + 9 zero octets + shared secret
/// + ASCII timestamp); the gateway recomputes it against the `timestamp`
/// field to verify the credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connect {
    pub sequence_id: u32,

    /// SP gateway login name (Source_Addr, 6 octets)
    pub source_addr: String,
    /// MD5 digest over login name, secret and timestamp (16 octets)
    pub authenticator_source: [u8; 16],
    /// Protocol version, 0x30 for CMPP 3.0
    pub version: u8,
    /// Login wall-clock time as decimal MMddhhmmss
    pub timestamp: u32,
}

/// CMPP_CONNECT_RESP - the gateway's verdict on a CONNECT.
///
/// Status 0 means the session is open; 1-4 report structural, source,
/// credential and version failures respectively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectResponse {
    pub sequence_id: u32,

    pub status: u32,
    /// MD5 digest the gateway returns for mutual authentication (16 octets)
    pub authenticator_ismg: [u8; 16],
    pub version: u8,
}

impl Encodable for Connect {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            total_length: 0,
            command_id: CommandId::Connect,
            sequence_id: self.sequence_id,
        };
        header.encode(buf);

        encode_octet_string(buf, &self.source_addr, 6);
        buf.put_slice(&self.authenticator_source);
        buf.put_u8(self.version);
        buf.put_u32(self.timestamp);
        Ok(())
    }
}

impl Decodable for Connect {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let source_addr = decode_octet_string(buf, 6, "source_addr")?;
        let authenticator_source = decode_byte_array::<16>(buf)?;
        let version = decode_u8(buf)?;
        let timestamp = decode_u32(buf)?;

        Ok(Connect {
            sequence_id: header.sequence_id,
            source_addr,
            authenticator_source,
            version,
            timestamp,
        })
    }

    fn command_id() -> CommandId {
        CommandId::Connect
    }
}

impl Encodable for ConnectResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            total_length: 0,
            command_id: CommandId::ConnectResp,
            sequence_id: self.sequence_id,
        };
        header.encode(buf);

        buf.put_u32(self.status);
        buf.put_slice(&self.authenticator_ismg);
        buf.put_u8(self.version);
        Ok(())
    }
}

impl Decodable for ConnectResponse {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let status = decode_u32(buf)?;
        let authenticator_ismg = decode_byte_array::<16>(buf)?;
        let version = decode_u8(buf)?;

        Ok(ConnectResponse {
            sequence_id: header.sequence_id,
            status,
            authenticator_ismg,
            version,
        })
    }

    fn command_id() -> CommandId {
        CommandId::ConnectResp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_roundtrip() {
        let original = Connect {
            sequence_id: 1,
            source_addr: "900001".to_string(),
            authenticator_source: [0xab; 16],
            version: CMPP_VERSION,
            timestamp: 214153045,
        };

        let bytes = original.to_bytes().unwrap();
        // 12 header + 6 + 16 + 1 + 4
        assert_eq!(bytes.len(), 39);

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        assert_eq!(header.total_length, 39);
        let decoded = Connect::decode(header, &mut cursor).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn connect_resp_roundtrip() {
        let original = ConnectResponse {
            sequence_id: 1,
            status: 3,
            authenticator_ismg: [0u8; 16],
            version: CMPP_VERSION,
        };

        let bytes = original.to_bytes().unwrap();
        assert_eq!(bytes.len(), 33);

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = ConnectResponse::decode(header, &mut cursor).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn connect_rejects_wrong_command_id() {
        let resp = ConnectResponse {
            sequence_id: 1,
            status: 0,
            authenticator_ismg: [0u8; 16],
            version: CMPP_VERSION,
        };
        let bytes = resp.to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        assert!(matches!(
            Connect::decode(header, &mut cursor),
            Err(CodecError::UnexpectedCommandId { .. })
        ));
    }
}
