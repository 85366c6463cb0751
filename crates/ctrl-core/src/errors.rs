use thiserror::Error;

#[derive(Error, Debug)]
pub enum CtrlError {
    #[error("step called before reset: no episode in progress")]
    EpisodeNotStarted,

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Display[{index}] not found ({available} displays detected)")]
    DisplayNotFound { index: usize, available: usize },

    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },

    #[error("Observation must be {expected_width}×{expected_height}, got {width}×{height}")]
    ShapeMismatch {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Send failed: {reason}")]
    SendFailed { reason: String },

    #[error("Receive failed: {reason}")]
    ReceiveFailed { reason: String },

    #[error("Controller replied with an empty message")]
    EmptyReply,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed controller reply: {reason}")]
    MalformedReply { reason: String },

    #[error("Invalid action: {reason}")]
    InvalidAction { reason: String },

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
#[error("Invalid value {value:?} for {name}: {reason}")]
pub struct ConfigError {
    pub name: String,
    pub value: String,
    pub reason: String,
}
