// ABOUTME: CMPP client module: session engine, configuration, events and error taxonomy
// ABOUTME: Exports the public client surface; fragmenting and window bookkeeping stay internal

//! CMPP Client Module
//!
//! The session engine behind [`CmppClient`]:
//!
//! * **One worker task** drives connect, authentication, the submission
//!   window and reconnection - the caller never touches the transport.
//! * **Per-connection reader task** answers gateway traffic (DELIVER,
//!   ACTIVE_TEST) inline and correlates SUBMIT_RESP receipts back to
//!   waiting senders.
//! * **Bounded window** of 16 in-flight submissions with per-submission
//!   deadlines; prepared submissions queue behind an admission gate.
//! * **Fragmenting** of long content into concatenated long SMS or
//!   independent short messages, driven by [`ClientConfig`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cmpp::{ClientConfig, CmppClient};
//!
//! # async fn example() {
//! let config = ClientConfig::new("gateway.example.net:7890", "109000", "900001", "secret");
//! let client = CmppClient::start(config, ());
//!
//! let receipt = client.send("01", &["13800138000"], "hello", false).await;
//! println!("{:?}", receipt.status);
//! # }
//! ```
//!
//! Inbound traffic is consumed through a [`DeliveryHandler`]:
//!
//! ```rust,no_run
//! use cmpp::{DeliveryHandler, IncomingMessage, StatusReport};
//!
//! struct Printer;
//!
//! impl DeliveryHandler for Printer {
//!     fn on_message(&self, message: IncomingMessage) {
//!         println!("{} says {}", message.source, message.content);
//!     }
//!     fn on_report(&self, report: StatusReport) {
//!         println!("message {} is {}", report.message_id, report.status);
//!     }
//! }
//! ```

pub(crate) mod auth;
pub mod config;
pub mod error;
pub mod events;
pub(crate) mod fragment;
pub mod session;
pub(crate) mod window;

// Re-export the main types for easy access
pub use config::ClientConfig;
pub use error::{CmppError, CmppResult, SendStatus};
pub use events::{DeliveryHandler, IncomingMessage, StatusReport};
pub use session::{CmppClient, SendReceipt, SessionState};
