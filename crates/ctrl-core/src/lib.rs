pub mod config;
pub mod errors;
pub mod space;
pub mod types;

pub use config::{CtrlConfig, CONTROLLER_PORT, DEFAULT_ENDPOINT};
pub use errors::{CaptureError, ChannelError, ConfigError, CtrlError, ProtocolError};
pub use space::{EnvSpec, Space};
pub use types::*;
