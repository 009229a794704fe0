pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;


// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};

// Re-export the main client API for easy access
pub use client::{
    ClientConfig, CmppClient, CmppError, CmppResult, DeliveryHandler, IncomingMessage,
    SendReceipt, SendStatus, SessionState, StatusReport,
};

/// Boxed error used by the frame-level connection layer.
///
/// Everything that can go wrong on the wire (socket failures, malformed
/// frames, a peer closing mid-PDU) is handled the same way by the session
/// engine: log it and drop the link, so the connection layer does not need
/// callers to distinguish causes. The session engine converts this into the
/// typed [`CmppError`] at the client boundary, and the codec keeps its own
/// [`CodecError`] enum because an incomplete frame is routine buffering
/// state there, not a failure.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for CMPP operations.
///
/// This is defined as a convenience.
///
/// # Examples
///
/// ```rust,no_run
/// use cmpp::{ClientConfig, CmppClient};
///
/// #[tokio::main]
/// async fn main() {
///     let config = ClientConfig::new("gateway.example.net:7890", "109000", "900001", "secret")
///         .with_service_id("MCGZ")
///         .with_signature("【示例】");
///
///     // Start the session worker; it connects and authenticates in the
///     // background and reconnects after link failures.
///     let client = CmppClient::start(config, ());
///
///     // Submit a message to one subscriber and wait for the gateway receipt.
///     let receipt = client.send("01", &["13800138000"], "hello", false).await;
///     println!("status: {:?}, ids: {:?}", receipt.status, receipt.message_ids);
///
///     client.stop().await;
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
