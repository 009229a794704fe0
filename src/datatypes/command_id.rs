// ABOUTME: Defines CMPP 3.0 command identifiers for the message-operation subset used by SP clients
// ABOUTME: Implements command_id field validation and response bit handling

use num_enum::TryFromPrimitive;

/// CMPP 3.0 Command Identifiers
///
/// The command_id field identifies the CMPP PDU type. It is a 4-octet field
/// in the 12-octet message header.
///
/// ## Command ID Structure
/// - **Bit 31 (MSB)**: Response indicator bit
///   - 0 = Request PDU
///   - 1 = Response PDU
/// - **Bits 30-0**: Command type identifier
///
/// Only the subset an SP-side client exercises is listed: session
/// establishment, teardown, submission, delivery and the keepalive probe.
/// Gateway-only operations (query, cancel, route management) are not
/// decoded; an unlisted id fails header decoding and resets the link.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Copy)]
pub enum CommandId {
    /// CMPP_CONNECT - request to open an authenticated session
    Connect = 0x0000_0001,
    /// CMPP_CONNECT_RESP - gateway verdict on the CONNECT digest
    ConnectResp = 0x8000_0001,

    /// CMPP_TERMINATE - orderly session teardown
    Terminate = 0x0000_0002,
    /// CMPP_TERMINATE_RESP - acknowledgement of a TERMINATE
    TerminateResp = 0x8000_0002,

    // 0x0000_0003 is reserved

    /// CMPP_SUBMIT - SP-originated short message
    Submit = 0x0000_0004,
    /// CMPP_SUBMIT_RESP - gateway receipt carrying Msg_Id and result
    SubmitResp = 0x8000_0004,

    /// CMPP_DELIVER - mobile-originated message or status report
    Deliver = 0x0000_0005,
    /// CMPP_DELIVER_RESP - acknowledgement the client returns for a DELIVER
    DeliverResp = 0x8000_0005,

    // 0x0000_0006 (query) and 0x0000_0007 (cancel) are not used by this client

    /// CMPP_ACTIVE_TEST - link keepalive probe
    ActiveTest = 0x0000_0008,
    /// CMPP_ACTIVE_TEST_RESP - keepalive probe answer
    ActiveTestResp = 0x8000_0008,
}

impl CommandId {
    /// Check if this command_id represents a response PDU
    pub fn is_response(&self) -> bool {
        (*self as u32) & 0x8000_0000 != 0
    }
}
