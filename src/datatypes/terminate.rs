// ABOUTME: CMPP_TERMINATE and CMPP_TERMINATE_RESP PDUs for orderly session teardown
// ABOUTME: Both bodies are empty; only the header is exchanged

use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
use crate::datatypes::CommandId;
use bytes::BytesMut;
use std::io::Cursor;

/// CMPP_TERMINATE - either side requests session teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Terminate {
    pub sequence_id: u32,
}

/// CMPP_TERMINATE_RESP - teardown acknowledgement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminateResponse {
    pub sequence_id: u32,
}

impl Encodable for Terminate {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            total_length: 0,
            command_id: CommandId::Terminate,
            sequence_id: self.sequence_id,
        };
        header.encode(buf);
        Ok(())
    }
}

impl Decodable for Terminate {
    fn decode(header: PduHeader, _buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        Ok(Terminate {
            sequence_id: header.sequence_id,
        })
    }

    fn command_id() -> CommandId {
        CommandId::Terminate
    }
}

impl Encodable for TerminateResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            total_length: 0,
            command_id: CommandId::TerminateResp,
            sequence_id: self.sequence_id,
        };
        header.encode(buf);
        Ok(())
    }
}

impl Decodable for TerminateResponse {
    fn decode(header: PduHeader, _buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        Ok(TerminateResponse {
            sequence_id: header.sequence_id,
        })
    }

    fn command_id() -> CommandId {
        CommandId::TerminateResp
    }
}
