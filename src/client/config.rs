// ABOUTME: Immutable client configuration covering credentials, billing fields and framing policy
// ABOUTME: Builder-style with_* methods supply the optional knobs over sensible defaults

/// CMPP client configuration
///
/// Immutable after the client starts. Credentials identify the service
/// provider towards the gateway; the framing flags decide how content that
/// does not fit a single SMS is packaged.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway endpoint, `host:port`
    pub gateway_addr: String,
    /// Service-provider short code (6 ASCII digits), used as Fee_terminal_Id
    /// and as the Src_Id prefix
    pub sp_code: String,
    /// Gateway login name (Source_Addr / Msg_src)
    pub username: String,
    /// Shared secret for the CONNECT digest
    pub password: String,
    /// Service signature the carrier attaches to delivered content; it never
    /// enters Msg_Content but consumes payload budget
    pub signature: String,
    /// Business tag (Service_Id)
    pub service_id: String,

    /// Refuse any submission that would need more than one SMS
    pub disable_long_message: bool,
    /// Split long text into independent short messages instead of a
    /// concatenated long SMS
    pub send_long_as_short: bool,
    /// When splitting, the signature leads every piece, so its encoded
    /// length is subtracted from each piece's budget
    pub prepositive_signature: bool,
    /// Ask the gateway to drop the signature by marking Msg_Fmt with the
    /// carrier-specific "special" value (0x0F) and skipping the signature
    /// budget. Only some gateways honour this.
    pub attempt_remove_signature: bool,

    /// FeeType field, two ASCII digits ("02" = free by default)
    pub fee_type: String,
    /// FeeCode field, up to six ASCII digits
    pub fee_code: String,
}

impl ClientConfig {
    /// Create a configuration with the mandatory identity fields.
    pub fn new(
        gateway_addr: impl Into<String>,
        sp_code: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            gateway_addr: gateway_addr.into(),
            sp_code: sp_code.into(),
            username: username.into(),
            password: password.into(),
            signature: String::new(),
            service_id: String::new(),
            disable_long_message: false,
            send_long_as_short: false,
            prepositive_signature: false,
            attempt_remove_signature: false,
            fee_type: "02".to_string(),
            fee_code: "05".to_string(),
        }
    }

    /// Set the service signature
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Set the business tag (Service_Id)
    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = service_id.into();
        self
    }

    /// Set the billing fields (FeeType / FeeCode)
    pub fn with_fee(mut self, fee_type: impl Into<String>, fee_code: impl Into<String>) -> Self {
        self.fee_type = fee_type.into();
        self.fee_code = fee_code.into();
        self
    }

    /// Refuse submissions that need more than one SMS
    pub fn without_long_messages(mut self) -> Self {
        self.disable_long_message = true;
        self
    }

    /// Split long text into independent short messages
    pub fn split_long_as_short(mut self) -> Self {
        self.send_long_as_short = true;
        self
    }

    /// Reserve budget for a signature the gateway prepends to every piece
    pub fn with_prepositive_signature(mut self) -> Self {
        self.prepositive_signature = true;
        self
    }

    /// Mark submissions with the carrier-specific Msg_Fmt that suppresses
    /// the signature
    pub fn attempt_remove_signature(mut self) -> Self {
        self.attempt_remove_signature = true;
        self
    }
}
