//! ctrl-env: the Ctrl episode adapter.
//!
//! Wraps a [`FrameSource`](ctrl_capture::FrameSource) and a
//! [`ControlChannel`](ctrl_transport::ControlChannel) behind the usual
//! `reset` / `step` / `render` decision-process interface.
//!
//! # Episode states
//!
//! ```text
//!            reset                 reset
//!   Idle ─────────────► Active ◄─────────┐
//!                        │   │            │
//!                        │   └────────────┘
//!                        │ step → StepResult { terminated, .. }
//!                        └──► stays Active; on terminated the caller resets
//! ```
//!
//! # Per-call flow
//!
//! ```text
//! step(action) ── [flags] ──► controller ── [reward, flag] ──► capture() ──► StepResult
//! reset()      ── [1]     ──► controller ── (ack)          ──► capture() ──► (obs, {})
//! ```

mod env;
mod environment;

pub use env::{CtrlEnv, EpisodeState, EpisodeStats};
pub use environment::Environment;
