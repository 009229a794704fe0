// ABOUTME: CMPP session engine: connect, authenticate, pump the window, reconnect
// ABOUTME: One worker task owns outbound dispatch; a per-connection reader task answers inbound traffic

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::client::auth;
use crate::client::config::ClientConfig;
use crate::client::error::{CmppError, CmppResult, SendStatus};
use crate::client::events::{self, DeliveryHandler, IncomingMessage, StatusReport};
use crate::client::fragment::{self, FragmentError, FragmentMode, FragmentPart};
use crate::client::window::{PendingQueue, SendWindow, Submission};
use crate::codec::Frame;
use crate::connection::{Connection, FrameReader, FrameWriter};
use crate::datatypes::{
    ActiveTest, ActiveTestResponse, DeliverResponse, MsgId, Submit, Terminate, FEE_USER_SP,
    MSG_FMT_SPECIAL, MSG_FMT_UCS2,
};

/// Admission gate: a send call is refused once this many submissions queue.
const PENDING_LIMIT: usize = 16;

/// How long a submission may await its SUBMIT_RESP; also the caller's wait.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle span after which the link health is probed, and the span that marks
/// a link as stalled when submissions are timing out.
const IDLE_PROBE: Duration = Duration::from_secs(10);

/// Authentication must show transfer activity within this span.
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between reconnect attempts.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(3);

/// Pause before retrying a congested fragment.
const CONGESTED_BACKOFF: Duration = Duration::from_millis(100);

/// Pump pause when the window is full or nothing is pending.
const DISPATCH_IDLE: Duration = Duration::from_millis(50);

/// Pump pause on the idle-probe and authentication paths.
const PROBE_PAUSE: Duration = Duration::from_millis(100);

/// Pause in terminal states (authentication failed, disposed).
const TERMINAL_PAUSE: Duration = Duration::from_secs(1);

/// Session lifecycle state.
///
/// Only the session worker and the receive dispatcher move the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport; the worker will attempt a connect
    Disconnected,
    /// TCP connect in progress
    Connecting,
    /// CONNECT sent, awaiting the gateway verdict
    Authenticating,
    /// Authenticated; submissions flow
    Connected,
    /// Credentials rejected; no reconnect until restarted
    AuthenticationFailed,
    /// Stopped for good
    Disposed,
}

/// Outcome of a send call: the terminal status plus the message ids
/// acknowledged before it, in fragment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub status: SendStatus,
    pub message_ids: Vec<i64>,
}

impl SendReceipt {
    fn from_status(status: SendStatus) -> Self {
        SendReceipt {
            status,
            message_ids: Vec::new(),
        }
    }
}

/// Handle to a running CMPP client.
///
/// [`CmppClient::start`] spawns the session worker, which connects,
/// authenticates and keeps the link alive until [`CmppClient::stop`].
/// The handle is cheap to share behind an `Arc` across caller tasks.
pub struct CmppClient {
    core: Arc<ClientCore>,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

struct ClientCore {
    config: ClientConfig,
    handler: Box<dyn DeliveryHandler>,

    /// Session state plus the operator-readable reason for it
    state: StdMutex<(SessionState, String)>,
    /// Shared outbound sequence counter; post-increment, wraps naturally
    sequence: AtomicU32,
    /// Wall clock of the last frame seen or probe sent
    last_transfer: StdMutex<Instant>,
    /// Connection generation; bumped on every link drop so stale readers
    /// cannot tear down their successor
    epoch: AtomicU64,

    window: SendWindow,
    pending: PendingQueue,

    writer: Mutex<Option<FrameWriter>>,
    /// Stop signal for the current connection's reader task
    conn_stop: StdMutex<Option<watch::Sender<bool>>>,
}

impl CmppClient {
    /// Start the session worker and return the client handle.
    ///
    /// Must be called from within a Tokio runtime; the worker and the
    /// per-connection reader run as spawned tasks.
    pub fn start(config: ClientConfig, handler: impl DeliveryHandler + 'static) -> CmppClient {
        let core = Arc::new(ClientCore {
            config,
            handler: Box::new(handler),
            state: StdMutex::new((SessionState::Disconnected, String::new())),
            sequence: AtomicU32::new(0),
            last_transfer: StdMutex::new(Instant::now()),
            epoch: AtomicU64::new(0),
            window: SendWindow::new(),
            pending: PendingQueue::new(),
            writer: Mutex::new(None),
            conn_stop: StdMutex::new(None),
        });

        let worker = tokio::spawn(session_loop(core.clone()));
        CmppClient {
            core,
            worker: StdMutex::new(Some(worker)),
        }
    }

    /// Current session state.
    pub fn status(&self) -> SessionState {
        self.core.state()
    }

    /// Operator-readable reason for the current state.
    pub fn status_text(&self) -> String {
        self.core.state.lock().unwrap().1.clone()
    }

    /// Submit a message and wait for the gateway receipts.
    ///
    /// `extended_code` is appended to the SP code to form Src_Id, so replies
    /// can be routed back to the originating campaign. Long content is
    /// fragmented per the configured policy; `message_ids` collects one id
    /// per accepted fragment, in order, and is partial when a mid-stream
    /// fragment fails.
    pub async fn send(
        &self,
        extended_code: &str,
        receivers: &[&str],
        content: &str,
        need_status_report: bool,
    ) -> SendReceipt {
        let core = &self.core;

        // Pre-flight admission, before anything is queued.
        match core.state() {
            SessionState::Connected => {}
            SessionState::AuthenticationFailed => {
                return SendReceipt::from_status(SendStatus::ConfigError)
            }
            SessionState::Disposed => return SendReceipt::from_status(SendStatus::NotConnected),
            _ => return SendReceipt::from_status(SendStatus::Congested),
        }
        if core.pending.len() >= PENDING_LIMIT {
            return SendReceipt::from_status(SendStatus::Congested);
        }

        // Sample the counter once so every part shares the UDH reference.
        let reference = core.sequence.load(Ordering::Relaxed) as u8;
        let plan = match fragment::plan(content, &core.config.signature, &core.config, reference) {
            Ok(plan) => plan,
            Err(FragmentError::Empty) => return SendReceipt::from_status(SendStatus::Unknown),
            Err(_) => return SendReceipt::from_status(SendStatus::MessageTooLong),
        };

        let mut message_ids = Vec::with_capacity(plan.parts.len());
        for (index, part) in plan.parts.iter().enumerate() {
            loop {
                let message = core.build_submit(part, receivers, extended_code, need_status_report);
                let (status, message_id) = core.submit_and_wait(message).await;
                match status {
                    SendStatus::Success => {
                        message_ids.extend(message_id);
                        break;
                    }
                    SendStatus::Congested if retry_on_congestion(plan.mode, index) => {
                        debug!(part = index + 1, "gateway congested, retrying fragment");
                        sleep(CONGESTED_BACKOFF).await;
                    }
                    status => return SendReceipt { status, message_ids },
                }
            }
        }

        SendReceipt {
            status: SendStatus::Success,
            message_ids,
        }
    }

    /// Tear the session down for good.
    ///
    /// Sends a best-effort TERMINATE, releases the link and joins the
    /// worker. Submissions still pending time out on their own deadlines.
    pub async fn stop(&self) {
        let terminate = Terminate {
            sequence_id: self.core.next_sequence_id(),
        };
        if let Some(writer) = self.core.writer.lock().await.as_mut() {
            if let Err(e) = writer.write_frame(&Frame::Terminate(terminate)).await {
                debug!(error = %e, "terminate not delivered");
            }
        }

        self.core.set_state(SessionState::Disposed, "已停止");
        self.core
            .link_down(self.core.epoch.load(Ordering::Acquire), "已停止")
            .await;

        let worker = self.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

/// Whether a congested fragment is retried in place rather than surfaced.
///
/// Fragments after the first of a concatenated message must be delivered
/// with their siblings; independent pieces are each retried as well. A
/// congested first fragment aborts so the caller can back off instead.
fn retry_on_congestion(mode: FragmentMode, index: usize) -> bool {
    match mode {
        FragmentMode::Single => false,
        FragmentMode::Concatenated => index > 0,
        FragmentMode::Independent => true,
    }
}

impl ClientCore {
    fn state(&self) -> SessionState {
        self.state.lock().unwrap().0
    }

    fn set_state(&self, state: SessionState, text: &str) {
        let mut guard = self.state.lock().unwrap();
        *guard = (state, text.to_string());
    }

    /// Post-increment sequence counter shared by all outbound frames.
    fn next_sequence_id(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn touch(&self) {
        *self.last_transfer.lock().unwrap() = Instant::now();
    }

    fn idle(&self) -> Duration {
        self.last_transfer.lock().unwrap().elapsed()
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    async fn send_frame(&self, frame: &Frame) -> CmppResult<()> {
        let mut guard = self.writer.lock().await;
        match guard.as_mut() {
            Some(writer) => writer.write_frame(frame).await.map_err(CmppError::from),
            None => Err(CmppError::ConnectionClosed),
        }
    }

    /// Drop the current link and recover its in-flight submissions.
    ///
    /// Window entries go back to the front of the pending queue with their
    /// completion senders intact, so the retried submission resolves the
    /// original waiter (or the waiter's own deadline fires first). The epoch
    /// guard makes the drop idempotent across racing callers.
    async fn link_down(&self, epoch: u64, reason: &str) {
        if self
            .epoch
            .compare_exchange(epoch, epoch + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if let Some(stop) = self.conn_stop.lock().unwrap().take() {
            let _ = stop.send(true);
        }
        *self.writer.lock().await = None;

        let orphans = self.window.drain();
        if !orphans.is_empty() {
            info!(count = orphans.len(), "re-queueing in-flight submissions");
            self.pending.requeue_front(orphans);
        }

        let state = self.state();
        if state != SessionState::AuthenticationFailed && state != SessionState::Disposed {
            self.set_state(SessionState::Disconnected, reason);
        }
    }

    fn build_submit(
        &self,
        part: &FragmentPart,
        receivers: &[&str],
        extended_code: &str,
        need_status_report: bool,
    ) -> Submit {
        let config = &self.config;
        Submit {
            // assigned when the pump moves the submission into the window
            sequence_id: 0,
            msg_id: MsgId::default(),
            pk_total: 1,
            pk_number: 1,
            registered_delivery: need_status_report as u8,
            msg_level: 0,
            service_id: config.service_id.clone(),
            fee_user_type: FEE_USER_SP,
            fee_terminal_id: config.sp_code.clone(),
            fee_terminal_type: 0,
            tp_pid: 0,
            tp_udhi: part.udhi as u8,
            msg_fmt: if config.attempt_remove_signature {
                MSG_FMT_SPECIAL
            } else {
                MSG_FMT_UCS2
            },
            msg_src: config.username.clone(),
            fee_type: config.fee_type.clone(),
            fee_code: config.fee_code.clone(),
            valid_time: String::new(),
            at_time: String::new(),
            src_id: format!("{}{}", config.sp_code, extended_code),
            dest_terminal_ids: receivers.iter().map(|r| r.to_string()).collect(),
            dest_terminal_type: 0,
            msg_content: Bytes::from(part.content.clone()),
            link_id: String::new(),
        }
    }

    /// Queue one submission and wait for its receipt.
    async fn submit_and_wait(&self, message: Submit) -> (SendStatus, Option<i64>) {
        let (completion, receipt) = oneshot::channel();
        self.pending.push_back(Submission {
            message,
            completion,
        });

        match timeout(RESPONSE_TIMEOUT, receipt).await {
            Ok(Ok(Some(response))) => {
                let status = SendStatus::from_result(response.result);
                let message_id =
                    (status == SendStatus::Success).then(|| response.msg_id.as_i64());
                (status, message_id)
            }
            // released by the sweep or the link watchdog
            Ok(Ok(None)) => (SendStatus::Timeout, None),
            // sender dropped without a verdict
            Ok(Err(_)) => (SendStatus::Timeout, None),
            Err(_) => (SendStatus::Timeout, None),
        }
    }
}

/// Body of the session worker.
async fn session_loop(core: Arc<ClientCore>) {
    info!(gateway = %core.config.gateway_addr, "session worker started");
    loop {
        match core.state() {
            SessionState::Disposed => break,
            SessionState::Disconnected => {
                if let Err(e) = establish(&core).await {
                    warn!(error = %e, "connect attempt failed");
                    core.link_down(core.current_epoch(), "连接失败").await;
                    sleep(RECONNECT_BACKOFF).await;
                }
            }
            SessionState::Connecting => sleep(PROBE_PAUSE).await,
            SessionState::Authenticating => {
                if core.idle() > AUTH_TIMEOUT {
                    warn!("authentication timed out");
                    core.link_down(core.current_epoch(), "认证超时").await;
                    sleep(RECONNECT_BACKOFF).await;
                } else {
                    sleep(PROBE_PAUSE).await;
                }
            }
            SessionState::AuthenticationFailed => sleep(TERMINAL_PAUSE).await,
            SessionState::Connected => pump(&core).await,
        }
    }
    info!("session worker stopped");
}

/// Open the transport and send CONNECT; the dispatcher finishes the
/// handshake when CONNECT_RESP arrives.
async fn establish(core: &Arc<ClientCore>) -> CmppResult<()> {
    core.set_state(SessionState::Connecting, "正在连接");
    let (reader, writer) = Connection::open(&core.config.gateway_addr).await?;

    let (stop_tx, stop_rx) = watch::channel(false);
    *core.conn_stop.lock().unwrap() = Some(stop_tx);
    *core.writer.lock().await = Some(writer);
    core.touch();

    let epoch = core.current_epoch();
    tokio::spawn(read_loop(core.clone(), reader, stop_rx, epoch));

    core.set_state(SessionState::Authenticating, "正在认证");
    let connect = auth::build_connect(&core.config, core.next_sequence_id());
    core.send_frame(&Frame::Connect(connect)).await?;
    Ok(())
}

/// One pump iteration of the Connected state.
async fn pump(core: &Arc<ClientCore>) {
    // Sweep submissions that outlived their response deadline.
    let timed_out = core.window.sweep(RESPONSE_TIMEOUT);
    if timed_out > 0 {
        warn!(count = timed_out, "submissions timed out awaiting receipts");
        // Timeouts with a silent link mean the link is gone, not the
        // submissions.
        if core.idle() > IDLE_PROBE {
            warn!("link stalled, reconnecting");
            core.window.fail_all();
            core.link_down(core.current_epoch(), "链路超时").await;
            return;
        }
    }

    // Idle link, nothing to do: probe its health.
    if core.window.is_empty() && core.pending.is_empty() && core.idle() > IDLE_PROBE {
        let probe = ActiveTest {
            sequence_id: core.next_sequence_id(),
        };
        debug!(sequence_id = probe.sequence_id, "probing idle link");
        if core.send_frame(&Frame::ActiveTest(probe)).await.is_err() {
            core.link_down(core.current_epoch(), "发送失败").await;
            return;
        }
        core.touch();
        sleep(PROBE_PAUSE).await;
        return;
    }

    if core.window.is_full() || core.pending.is_empty() {
        sleep(DISPATCH_IDLE).await;
        return;
    }

    // Move pending submissions into free window slots and onto the wire.
    while !core.window.is_full() {
        let Some(mut submission) = core.pending.pop_front() else {
            break;
        };
        let sequence_id = core.next_sequence_id();
        submission.message.sequence_id = sequence_id;
        let message = submission.message.clone();

        if let Err(submission) = core.window.insert(sequence_id, submission) {
            // lost the slot; try again next iteration
            core.pending.push_front(submission);
            break;
        }

        if let Err(e) = core.send_frame(&Frame::Submit(Box::new(message))).await {
            warn!(error = %e, sequence_id, "transport send failed");
            if let Some(submission) = core.window.remove(sequence_id) {
                core.pending.push_front(submission);
            }
            core.link_down(core.current_epoch(), "发送失败").await;
            return;
        }
        debug!(sequence_id, "submission dispatched");
    }
}

/// Per-connection read loop; runs on its own task until the link drops.
async fn read_loop(
    core: Arc<ClientCore>,
    mut reader: FrameReader,
    mut stop: watch::Receiver<bool>,
    epoch: u64,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => {
                debug!("reader released");
                return;
            }
            frame = reader.read_frame() => match frame {
                Ok(Some(frame)) => {
                    // A broken dispatch (bad report payload, reply failure)
                    // is logged and dropped; it must not take the session
                    // down with it.
                    if let Err(e) = dispatch(&core, frame, epoch).await {
                        warn!(error = %e, "inbound frame mishandled");
                    }
                }
                Ok(None) => {
                    info!("gateway closed the connection");
                    core.link_down(epoch, "连接已断开").await;
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "link error");
                    core.link_down(epoch, "链路错误").await;
                    return;
                }
            }
        }
    }
}

/// Route one inbound frame.
async fn dispatch(core: &Arc<ClientCore>, frame: Frame, epoch: u64) -> CmppResult<()> {
    core.touch();

    if core.state() == SessionState::Authenticating && !matches!(frame, Frame::ConnectResp(_)) {
        warn!(command = ?frame.command_id(), "unexpected frame during authentication");
        core.link_down(epoch, "Unexpected response").await;
        return Ok(());
    }

    match frame {
        Frame::ConnectResp(response) => {
            if core.state() != SessionState::Authenticating {
                debug!("stray CONNECT_RESP ignored");
                return Ok(());
            }
            if response.status == 0 {
                core.set_state(SessionState::Connected, auth::connect_status_text(0));
                info!("authenticated with gateway");
                let probe = ActiveTest {
                    sequence_id: core.next_sequence_id(),
                };
                core.send_frame(&Frame::ActiveTest(probe)).await?;
            } else {
                let reason = auth::connect_status_text(response.status);
                warn!(status = response.status, reason, "authentication rejected");
                core.set_state(SessionState::AuthenticationFailed, reason);
                core.link_down(epoch, reason).await;
            }
        }

        Frame::Deliver(deliver) => {
            let reply = DeliverResponse {
                sequence_id: deliver.sequence_id,
                msg_id: deliver.msg_id,
                result: 0,
            };
            core.send_frame(&Frame::DeliverResp(reply)).await?;

            if deliver.registered_delivery == 1 {
                let report = deliver.status_report()?;
                debug!(msg_id = %report.msg_id, stat = %report.stat, "status report");
                core.handler.on_report(StatusReport {
                    message_id: report.msg_id.as_i64(),
                    status: report.stat,
                    destination: report.dest_terminal_id,
                });
            } else {
                let content = events::decode_content(deliver.msg_fmt, &deliver.msg_content);
                debug!(source = %deliver.src_terminal_id, "mobile-originated message");
                core.handler.on_message(IncomingMessage {
                    content,
                    source: deliver.src_terminal_id,
                    message_id: deliver.msg_id.as_i64(),
                    destination: deliver.dest_id,
                });
            }
        }

        Frame::ActiveTest(probe) => {
            core.send_frame(&Frame::ActiveTestResp(ActiveTestResponse::new(
                probe.sequence_id,
            )))
            .await?;
        }
        Frame::ActiveTestResp(_) => {}

        Frame::Terminate(_) => {
            info!("gateway terminated the session");
            core.link_down(epoch, "对端终止连接").await;
        }
        Frame::TerminateResp(_) => {}

        Frame::SubmitResp(response) => {
            if !core.window.complete(response.sequence_id, response) {
                debug!("late SUBMIT_RESP ignored");
            }
        }

        // server-role frames a gateway should never send us
        other => {
            debug!(command = ?other.command_id(), "ignoring unexpected frame");
        }
    }

    Ok(())
}
