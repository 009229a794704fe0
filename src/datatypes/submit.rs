// ABOUTME: CMPP_SUBMIT and CMPP_SUBMIT_RESP PDUs carrying SP-originated short messages
// ABOUTME: Encodes the full 3.0 body including fee fields and multi-terminal destinations

use crate::codec::{
    decode_byte_array, decode_octet_string, decode_u32, decode_u8, encode_octet_string,
    CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::{CommandId, MsgId};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Msg_Fmt value for big-endian UCS-2 payloads.
pub const MSG_FMT_UCS2: u8 = 8;
/// Carrier-specific Msg_Fmt marker some gateways honour to suppress the
/// appended service signature. The payload is still UCS-2.
pub const MSG_FMT_SPECIAL: u8 = 15;

/// Fee_UserType value billing the SP itself.
pub const FEE_USER_SP: u8 = 3;

/// Largest Msg_Content the protocol allows in one SUBMIT.
const MAX_CONTENT_LEN: usize = 160;

/// Most terminals one SUBMIT may address (DestUsr_tl).
const MAX_DEST_TERMINALS: usize = 99;

/// CMPP_SUBMIT - submit a short message for onward delivery.
///
/// The client leaves `msg_id` zeroed; the gateway assigns the identifier and
/// echoes it in the SUBMIT_RESP. `msg_content` holds the already-encoded
/// payload (UDH included when `tp_udhi` is 1); Msg_Length and DestUsr_tl are
/// derived during encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submit {
    pub sequence_id: u32,

    pub msg_id: MsgId,
    pub pk_total: u8,
    pub pk_number: u8,
    pub registered_delivery: u8,
    pub msg_level: u8,
    pub service_id: String,
    pub fee_user_type: u8,
    pub fee_terminal_id: String,
    pub fee_terminal_type: u8,
    pub tp_pid: u8,
    pub tp_udhi: u8,
    pub msg_fmt: u8,
    pub msg_src: String,
    pub fee_type: String,
    pub fee_code: String,
    pub valid_time: String,
    pub at_time: String,
    pub src_id: String,
    pub dest_terminal_ids: Vec<String>,
    pub dest_terminal_type: u8,
    pub msg_content: Bytes,
    pub link_id: String,
}

/// CMPP_SUBMIT_RESP - gateway receipt for one SUBMIT.
///
/// `result` 0 means accepted; 8 means the gateway is congested; 10-13 report
/// Msg_Src / FeeCode / Src_Id / Service_Id configuration rejections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitResponse {
    pub sequence_id: u32,

    pub msg_id: MsgId,
    pub result: u32,
}

impl Submit {
    /// Validates the field widths the wire format cannot represent.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.dest_terminal_ids.is_empty() || self.dest_terminal_ids.len() > MAX_DEST_TERMINALS {
            return Err(CodecError::FieldValidation {
                field: "dest_terminal_ids",
                reason: format!("1-{} terminals required, got {}", MAX_DEST_TERMINALS, self.dest_terminal_ids.len()),
            });
        }
        if self.msg_content.len() > MAX_CONTENT_LEN {
            return Err(CodecError::FieldValidation {
                field: "msg_content",
                reason: format!("{} bytes exceeds the {MAX_CONTENT_LEN}-byte limit", self.msg_content.len()),
            });
        }
        Ok(())
    }
}

impl Encodable for Submit {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            total_length: 0,
            command_id: CommandId::Submit,
            sequence_id: self.sequence_id,
        };
        header.encode(buf);

        buf.put_slice(&self.msg_id.as_bytes());
        buf.put_u8(self.pk_total);
        buf.put_u8(self.pk_number);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.msg_level);
        encode_octet_string(buf, &self.service_id, 10);
        buf.put_u8(self.fee_user_type);
        encode_octet_string(buf, &self.fee_terminal_id, 32);
        buf.put_u8(self.fee_terminal_type);
        buf.put_u8(self.tp_pid);
        buf.put_u8(self.tp_udhi);
        buf.put_u8(self.msg_fmt);
        encode_octet_string(buf, &self.msg_src, 6);
        encode_octet_string(buf, &self.fee_type, 2);
        encode_octet_string(buf, &self.fee_code, 6);
        encode_octet_string(buf, &self.valid_time, 17);
        encode_octet_string(buf, &self.at_time, 17);
        encode_octet_string(buf, &self.src_id, 21);
        buf.put_u8(self.dest_terminal_ids.len() as u8);
        for dest in &self.dest_terminal_ids {
            encode_octet_string(buf, dest, 32);
        }
        buf.put_u8(self.dest_terminal_type);
        buf.put_u8(self.msg_content.len() as u8);
        buf.put_slice(&self.msg_content);
        encode_octet_string(buf, &self.link_id, 20);
        Ok(())
    }
}

impl Decodable for Submit {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let msg_id = MsgId::from_bytes(decode_byte_array::<8>(buf)?);
        let pk_total = decode_u8(buf)?;
        let pk_number = decode_u8(buf)?;
        let registered_delivery = decode_u8(buf)?;
        let msg_level = decode_u8(buf)?;
        let service_id = decode_octet_string(buf, 10, "service_id")?;
        let fee_user_type = decode_u8(buf)?;
        let fee_terminal_id = decode_octet_string(buf, 32, "fee_terminal_id")?;
        let fee_terminal_type = decode_u8(buf)?;
        let tp_pid = decode_u8(buf)?;
        let tp_udhi = decode_u8(buf)?;
        let msg_fmt = decode_u8(buf)?;
        let msg_src = decode_octet_string(buf, 6, "msg_src")?;
        let fee_type = decode_octet_string(buf, 2, "fee_type")?;
        let fee_code = decode_octet_string(buf, 6, "fee_code")?;
        let valid_time = decode_octet_string(buf, 17, "valid_time")?;
        let at_time = decode_octet_string(buf, 17, "at_time")?;
        let src_id = decode_octet_string(buf, 21, "src_id")?;

        let dest_usr_tl = decode_u8(buf)? as usize;
        let mut dest_terminal_ids = Vec::with_capacity(dest_usr_tl);
        for _ in 0..dest_usr_tl {
            dest_terminal_ids.push(decode_octet_string(buf, 32, "dest_terminal_id")?);
        }
        let dest_terminal_type = decode_u8(buf)?;

        let msg_length = decode_u8(buf)? as usize;
        if buf.remaining() < msg_length {
            return Err(CodecError::Incomplete);
        }
        let msg_content = buf.copy_to_bytes(msg_length);
        let link_id = decode_octet_string(buf, 20, "link_id")?;

        Ok(Submit {
            sequence_id: header.sequence_id,
            msg_id,
            pk_total,
            pk_number,
            registered_delivery,
            msg_level,
            service_id,
            fee_user_type,
            fee_terminal_id,
            fee_terminal_type,
            tp_pid,
            tp_udhi,
            msg_fmt,
            msg_src,
            fee_type,
            fee_code,
            valid_time,
            at_time,
            src_id,
            dest_terminal_ids,
            dest_terminal_type,
            msg_content,
            link_id,
        })
    }

    fn command_id() -> CommandId {
        CommandId::Submit
    }
}

impl Encodable for SubmitResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            total_length: 0,
            command_id: CommandId::SubmitResp,
            sequence_id: self.sequence_id,
        };
        header.encode(buf);

        buf.put_slice(&self.msg_id.as_bytes());
        buf.put_u32(self.result);
        Ok(())
    }
}

impl Decodable for SubmitResponse {
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let msg_id = MsgId::from_bytes(decode_byte_array::<8>(buf)?);
        let result = decode_u32(buf)?;

        Ok(SubmitResponse {
            sequence_id: header.sequence_id,
            msg_id,
            result,
        })
    }

    fn command_id() -> CommandId {
        CommandId::SubmitResp
    }
}
