// ABOUTME: Delivery sink the client owns: mobile-originated messages and status reports
// ABOUTME: Decodes DELIVER content according to Msg_Fmt before it reaches the handler

use crate::client::fragment::decode_ucs2;
use crate::datatypes::{MSG_FMT_SPECIAL, MSG_FMT_UCS2};
use std::sync::Arc;

/// A subscriber's mobile-originated message routed to the SP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Decoded message text
    pub content: String,
    /// Originating subscriber number
    pub source: String,
    /// Gateway Msg_Id as a little-endian signed integer
    pub message_id: i64,
    /// The SP service number the subscriber dialled
    pub destination: String,
}

/// Gateway-generated delivery status for an earlier submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Msg_Id of the submission this report refers to
    pub message_id: i64,
    /// Seven-octet state, e.g. "DELIVRD"
    pub status: String,
    /// Subscriber number the message was delivered to
    pub destination: String,
}

/// Sink for gateway-originated traffic.
///
/// The client owns exactly one handler; both methods default to no-ops so an
/// implementation overrides only what it consumes. Handlers run on the
/// receive dispatcher and should hand heavy work off to their own tasks.
pub trait DeliveryHandler: Send + Sync {
    /// A subscriber's message arrived.
    fn on_message(&self, message: IncomingMessage) {
        let _ = message;
    }

    /// A delivery status report arrived.
    fn on_report(&self, report: StatusReport) {
        let _ = report;
    }
}

/// The unit handler discards everything; useful for submit-only clients.
impl DeliveryHandler for () {}

impl<T: DeliveryHandler> DeliveryHandler for Arc<T> {
    fn on_message(&self, message: IncomingMessage) {
        (**self).on_message(message);
    }

    fn on_report(&self, report: StatusReport) {
        (**self).on_report(report);
    }
}

/// Decode DELIVER content per its Msg_Fmt.
pub(crate) fn decode_content(msg_fmt: u8, content: &[u8]) -> String {
    match msg_fmt {
        MSG_FMT_UCS2 | MSG_FMT_SPECIAL => decode_ucs2(content),
        _ => String::from_utf8_lossy(content).into_owned(),
    }
}
