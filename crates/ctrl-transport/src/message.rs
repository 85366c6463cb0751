//! Wire messages: compact JSON arrays in single text frames.
//!
//! ```text
//! reset   [1]
//! step    [0,1,0,0,1,0,0]        one 0/1 flag per Button, in Button order
//! reply   [reward, terminated]   reward: int | float | numeric string
//!                                terminated: "1" → true, anything else → false
//!                                (integer 1 also → true under TerminationFlag::StringOrInteger)
//! ```

use ctrl_core::{Action, ProtocolError, TerminationFlag};
use serde_json::Value;
use tracing::warn;

/// Single-element payload that asks the controller to restart the episode.
const RESET_SIGNAL: [u8; 1] = [1];

// ── ControlRequest ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Reset,
    Step(Action),
}

impl ControlRequest {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let text = match self {
            Self::Reset => serde_json::to_string(&RESET_SIGNAL)?,
            Self::Step(action) => serde_json::to_string(action)?,
        };
        Ok(text)
    }
}

// ── ControlReply ──────────────────────────────────────────────────────────────

/// Controller's answer to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlReply {
    pub reward: i64,
    pub terminated: bool,
}

impl ControlReply {
    pub fn decode(payload: &[u8], flag: TerminationFlag) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| malformed(format!("not JSON ({})", e)))?;
        let items = value
            .as_array()
            .ok_or_else(|| malformed(format!("expected a JSON array, got {}", value)))?;
        if items.len() < 2 {
            return Err(malformed(format!(
                "expected [reward, terminated], got {} element(s)",
                items.len()
            )));
        }
        if items.len() > 2 {
            warn!("Controller reply has {} extra element(s); ignoring them", items.len() - 2);
        }

        Ok(Self {
            reward: parse_reward(&items[0])?,
            terminated: is_terminated(&items[1], flag),
        })
    }
}

fn parse_reward(value: &Value) -> Result<i64, ProtocolError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| malformed(format!("reward {} is not representable", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| malformed(format!("reward {:?} is not an integer", s))),
        other => Err(malformed(format!("reward must be a number, got {}", other))),
    }
}

fn is_terminated(value: &Value, flag: TerminationFlag) -> bool {
    match (value, flag) {
        (Value::String(s), _) => s == "1",
        (Value::Number(n), TerminationFlag::StringOrInteger) => n.as_i64() == Some(1),
        (Value::Number(n), TerminationFlag::StringOnly) => {
            if n.as_i64() == Some(1) {
                warn!("Integer terminated flag 1 ignored (termination flag is {})", flag);
            }
            false
        }
        _ => false,
    }
}

fn malformed(reason: String) -> ProtocolError {
    ProtocolError::MalformedReply { reason }
}
