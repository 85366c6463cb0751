//! ctrl-transport: control channel to the game-side controller.
//!
//! # Architecture
//!
//! ```text
//! Ctrl environment (this crate)            Game process (controller mod)
//! ─────────────────────────────            ─────────────────────────────
//! ControlChannel ── REQ ─ tcp:7777 ──────► REP socket
//!    reset   →  [1]                          reload first room
//!    step    →  [l, r, u, d, jump, dash, grab]   hold keys, run one update
//!            ←  [reward, terminated]
//! ```
//!
//! Exactly one request is in flight at a time: every exchange is a single
//! `&mut self` call that sends and then waits for the reply.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ctrl_core::Action;
//! use ctrl_transport::{ControlChannel, ZmqTransport};
//!
//! # async fn example() -> Result<(), ctrl_core::CtrlError> {
//! let transport = ZmqTransport::connect("tcp://localhost:7777").await?;
//! let mut channel = ControlChannel::new(transport);
//! channel.reset().await?;
//! let reply = channel.step(&Action::none()).await?;
//! println!("reward={} terminated={}", reply.reward, reply.terminated);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod message;

pub use channel::{ControlChannel, Transport, ZmqTransport};
pub use message::{ControlReply, ControlRequest};

use ctrl_core::CONTROLLER_PORT;

/// TCP endpoint of the controller running on `host`.
#[inline]
pub fn controller_endpoint(host: &str) -> String {
    format!("tcp://{}:{}", host, CONTROLLER_PORT)
}
