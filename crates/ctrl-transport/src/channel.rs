//! Request/reply channel to the controller.
//!
//! # Lifecycle
//!
//! ```text
//! 1. ZmqTransport::connect(endpoint)      opened once, held for the env lifetime
//! 2. ControlChannel::new(transport)
//! 3. channel.reset()   →  [1]             reply awaited and discarded
//! 4. channel.step(a)   →  [flags…]        reply decoded into ControlReply
//! ```

use async_trait::async_trait;
use ctrl_core::{Action, ChannelError, CtrlError, TerminationFlag};
use tracing::{debug, info};
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::message::{ControlReply, ControlRequest};

// ── Transport trait ───────────────────────────────────────────────────────────

/// A strictly alternating request/reply connection.
///
/// The only operation sends one frame and waits for its reply, so a second
/// request can never be issued while one is outstanding.
#[async_trait]
pub trait Transport: Send {
    /// Send `payload` and block until the peer answers. No timeout.
    async fn exchange(&mut self, payload: String) -> Result<Vec<u8>, ChannelError>;
}

// ── ZmqTransport ──────────────────────────────────────────────────────────────

/// ZeroMQ REQ socket connected to the controller's REP socket.
pub struct ZmqTransport {
    socket:   ReqSocket,
    endpoint: String,
}

impl ZmqTransport {
    pub async fn connect(endpoint: &str) -> Result<Self, ChannelError> {
        let mut socket = ReqSocket::new();
        socket
            .connect(endpoint)
            .await
            .map_err(|e| ChannelError::ConnectionFailed {
                endpoint: endpoint.to_owned(),
                reason: e.to_string(),
            })?;
        info!("Controller channel connected to {}", endpoint);
        Ok(Self { socket, endpoint: endpoint.to_owned() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for ZmqTransport {
    async fn exchange(&mut self, payload: String) -> Result<Vec<u8>, ChannelError> {
        self.socket
            .send(ZmqMessage::from(payload))
            .await
            .map_err(|e| ChannelError::SendFailed { reason: e.to_string() })?;
        let reply = self
            .socket
            .recv()
            .await
            .map_err(|e| ChannelError::ReceiveFailed { reason: e.to_string() })?;
        reply.get(0).map(|frame| frame.to_vec()).ok_or(ChannelError::EmptyReply)
    }
}

// ── ControlChannel ────────────────────────────────────────────────────────────

/// Typed wrapper that encodes requests and decodes replies.
pub struct ControlChannel<T> {
    transport:        T,
    termination_flag: TerminationFlag,
    exchanges:        u64,
}

impl<T: Transport> ControlChannel<T> {
    /// Channel that only treats the string `"1"` as terminated.
    pub fn new(transport: T) -> Self {
        Self { transport, termination_flag: TerminationFlag::default(), exchanges: 0 }
    }

    pub fn with_termination_flag(mut self, flag: TerminationFlag) -> Self {
        self.termination_flag = flag;
        self
    }

    /// Ask the controller to restart the episode and wait for its
    /// acknowledgement. The reply body carries nothing and is discarded.
    pub async fn reset(&mut self) -> Result<(), CtrlError> {
        self.request(ControlRequest::Reset).await?;
        Ok(())
    }

    /// Send one action and return the controller's verdict.
    pub async fn step(&mut self, action: &Action) -> Result<ControlReply, CtrlError> {
        let raw = self.request(ControlRequest::Step(*action)).await?;
        let reply = ControlReply::decode(&raw, self.termination_flag)?;
        debug!("← reward={} terminated={}", reply.reward, reply.terminated);
        Ok(reply)
    }

    async fn request(&mut self, request: ControlRequest) -> Result<Vec<u8>, CtrlError> {
        let payload = request.encode()?;
        debug!("→ {}", payload);
        let raw = self.transport.exchange(payload).await?;
        self.exchanges += 1;
        Ok(raw)
    }

    /// Completed request/reply round trips.
    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn termination_flag(&self) -> TerminationFlag {
        self.termination_flag
    }
}
