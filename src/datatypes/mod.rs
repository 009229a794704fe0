mod command_id;
mod connect;
mod deliver;
mod msg_id;
mod submit;
mod terminate;

pub use active_test::{ActiveTest, ActiveTestResponse};
pub use command_id::CommandId;
pub use connect::{Connect, ConnectResponse, CMPP_VERSION};
pub use deliver::{Deliver, DeliverReport, DeliverResponse};
pub use msg_id::MsgId;
pub use submit::{Submit, SubmitResponse, FEE_USER_SP, MSG_FMT_SPECIAL, MSG_FMT_UCS2};
pub use terminate::{Terminate, TerminateResponse};
