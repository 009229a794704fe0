// ABOUTME: CMPP_DELIVER and CMPP_DELIVER_RESP PDUs for mobile-originated traffic
// ABOUTME: Includes the status-report payload carried inside Msg_Content when Registered_Delivery is set

use crate::codec::{
    decode_byte_array, decode_octet_string, decode_u32, decode_u8, encode_octet_string,
    CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::{CommandId, MsgId};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// CMPP_DELIVER - gateway-originated traffic towards the SP.
///
/// Two flavours share this PDU: a subscriber's mobile-originated message
/// (`registered_delivery == 0`, Msg_Content is text) and a delivery status
/// report for an earlier SUBMIT (`registered_delivery == 1`, Msg_Content is
/// the packed [`DeliverReport`] structure).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deliver {
    pub sequence_id: u32,

    pub msg_id: MsgId,
    /// Destination the subscriber dialled (the SP service number)
    pub dest_id: String,
    pub service_id: String,
    pub tp_pid: u8,
    pub tp_udhi: u8,
    pub msg_fmt: u8,
    /// Originating subscriber number
    pub src_terminal_id: String,
    pub src_terminal_type: u8,
    pub registered_delivery: u8,
    pub msg_content: Bytes,
    pub link_id: String,
}

/// CMPP_DELIVER_RESP - acknowledgement the client returns for a DELIVER.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverResponse {
    pub sequence_id: u32,

    pub msg_id: MsgId,
    pub result: u32,
}

/// Status report packed inside a DELIVER's Msg_Content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverReport {
    /// Msg_Id of the SUBMIT this report refers to
    pub msg_id: MsgId,
    /// Seven-octet state, e.g. "DELIVRD", "EXPIRED", "UNDELIV"
    pub stat: String,
    pub submit_time: String,
    pub done_time: String,
    pub dest_terminal_id: String,
    pub smsc_sequence: u32,
}

impl Deliver {
    /// Parse the status report carried in Msg_Content.
    ///
    /// Only meaningful when `registered_delivery == 1`.
    pub fn status_report(&self) -> Result<DeliverReport, CodecError> {
        let mut buf = Cursor::new(self.msg_content.as_ref());

        let msg_id = MsgId::from_bytes(decode_byte_array::<8>(&mut buf)?);
        let stat = decode_octet_string(&mut buf, 7, "stat")?;
        let submit_time = decode_octet_string(&mut buf, 10, "submit_time")?;
        let done_time = decode_octet_string(&mut buf, 10, "done_time")?;
        let dest_terminal_id = decode_octet_string(&mut buf, 32, "dest_terminal_id")?;
        let smsc_sequence = decode_u32(&mut buf)?;

        Ok(DeliverReport {
            msg_id,
            stat,
            submit_time,
            done_time,
            dest_terminal_id,
            smsc_sequence,
        })
    }
}

impl DeliverReport {
    /// Pack this report into the Msg_Content layout.
    pub fn to_content(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(71);
        buf.put_slice(&self.msg_id.as_bytes());
        encode_octet_string(&mut buf, &self.stat, 7);
        encode_octet_string(&mut buf, &self.submit_time, 10);
        encode_octet_string(&mut buf, &self.done_time, 10);
        encode_octet_string(&mut buf, &self.dest_terminal_id, 32);
        buf.put_u32(self.smsc_sequence);
        buf.freeze()
    }
}

impl Encodable for Deliver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            total_length: 0,
            command_id: CommandId::Deliver,
            sequence_id: self.sequence_id,
        };
        header.encode(buf);

        buf.put_slice(&self.msg_id.as_bytes());
        encode_octet_string(buf, &self.dest_id, 21);
        encode_octet_string(buf, &self.service_id, 10);
        buf.put_u8(self.tp_pid);
        buf.put_u8(self.tp_udhi);
        buf.put_u8(self.msg_fmt);
        encode_octet_string(buf, &self.src_terminal_id, 32);
        buf.put_u8(self.src_terminal_type);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.msg_content.len() as u8);
        buf.put_slice(&self.msg_content);
        encode_octet_string(buf, &self.link_id, 20);
        Ok(())
    }
}

impl Decodable for Deliver {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let msg_id = MsgId::from_bytes(decode_byte_array::<8>(buf)?);
        let dest_id = decode_octet_string(buf, 21, "dest_id")?;
        let service_id = decode_octet_string(buf, 10, "service_id")?;
        let tp_pid = decode_u8(buf)?;
        let tp_udhi = decode_u8(buf)?;
        let msg_fmt = decode_u8(buf)?;
        let src_terminal_id = decode_octet_string(buf, 32, "src_terminal_id")?;
        let src_terminal_type = decode_u8(buf)?;
        let registered_delivery = decode_u8(buf)?;

        let msg_length = decode_u8(buf)? as usize;
        if buf.remaining() < msg_length {
            return Err(CodecError::Incomplete);
        }
        let msg_content = buf.copy_to_bytes(msg_length);
        let link_id = decode_octet_string(buf, 20, "link_id")?;

        Ok(Deliver {
            sequence_id: header.sequence_id,
            msg_id,
            dest_id,
            service_id,
            tp_pid,
            tp_udhi,
            msg_fmt,
            src_terminal_id,
            src_terminal_type,
            registered_delivery,
            msg_content,
            link_id,
        })
    }

    fn command_id() -> CommandId {
        CommandId::Deliver
    }
}

impl Encodable for DeliverResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            total_length: 0,
            command_id: CommandId::DeliverResp,
            sequence_id: self.sequence_id,
        };
        header.encode(buf);

        buf.put_slice(&self.msg_id.as_bytes());
        buf.put_u32(self.result);
        Ok(())
    }
}

impl Decodable for DeliverResponse {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let msg_id = MsgId::from_bytes(decode_byte_array::<8>(buf)?);
        let result = decode_u32(buf)?;

        Ok(DeliverResponse {
            sequence_id: header.sequence_id,
            msg_id,
            result,
        })
    }

    fn command_id() -> CommandId {
        CommandId::DeliverResp
    }
}
