use std::collections::HashMap;

use image::RgbImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{CaptureError, ProtocolError};

// MARK: - Observation

pub const OBS_HEIGHT: u32 = 144;
pub const OBS_WIDTH: u32 = 256;
pub const OBS_CHANNELS: usize = 3;

/// Downsampled RGB screen frame.
///
/// Always exactly 144×256×3, row-major with interleaved channels
/// (`[row][col][r, g, b]`). The only way to build one is
/// [`Observation::from_image`], which rejects any other size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pixels: RgbImage,
}

impl Observation {
    /// `[height, width, channels]`
    pub const SHAPE: [usize; 3] = [OBS_HEIGHT as usize, OBS_WIDTH as usize, OBS_CHANNELS];

    pub fn from_image(pixels: RgbImage) -> Result<Self, CaptureError> {
        let (width, height) = pixels.dimensions();
        if (width, height) != (OBS_WIDTH, OBS_HEIGHT) {
            return Err(CaptureError::ShapeMismatch {
                width,
                height,
                expected_width: OBS_WIDTH,
                expected_height: OBS_HEIGHT,
            });
        }
        Ok(Self { pixels })
    }

    pub fn shape(&self) -> [usize; 3] {
        Self::SHAPE
    }

    /// RGB value at `(row, col)`. Panics when out of bounds.
    pub fn pixel(&self, row: u32, col: u32) -> [u8; 3] {
        self.pixels.get_pixel(col, row).0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}

// MARK: - Button

pub const ACTION_SIZE: usize = 7;

/// One controller input. Discriminants are the flag positions on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
    Jump = 4,
    Dash = 5,
    Grab = 6,
}

impl Button {
    pub const ALL: [Button; ACTION_SIZE] = [
        Button::Left,
        Button::Right,
        Button::Up,
        Button::Down,
        Button::Jump,
        Button::Dash,
        Button::Grab,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::Jump => "jump",
            Self::Dash => "dash",
            Self::Grab => "grab",
        };
        f.write_str(name)
    }
}

// MARK: - Action

/// Seven independent button flags.
///
/// Serialises as a JSON array of `0`/`1` integers in [`Button`] order, which
/// is exactly what the controller expects on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[u8; 7]", try_from = "Vec<u8>")]
pub struct Action {
    pressed: [bool; ACTION_SIZE],
}

impl Action {
    /// No button held.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_buttons(buttons: impl IntoIterator<Item = Button>) -> Self {
        buttons.into_iter().fold(Self::none(), Self::with)
    }

    /// Build from raw integer flags; every flag must be `0` or `1`.
    pub fn from_flags(flags: &[u8]) -> Result<Self, ProtocolError> {
        if flags.len() != ACTION_SIZE {
            return Err(ProtocolError::InvalidAction {
                reason: format!("expected {} flags, got {}", ACTION_SIZE, flags.len()),
            });
        }
        let mut pressed = [false; ACTION_SIZE];
        for (i, &flag) in flags.iter().enumerate() {
            pressed[i] = match flag {
                0 => false,
                1 => true,
                other => {
                    return Err(ProtocolError::InvalidAction {
                        reason: format!("flag {} ({}) is {}, expected 0 or 1", i, Button::ALL[i], other),
                    })
                }
            };
        }
        Ok(Self { pressed })
    }

    /// Uniformly random action: each button held with probability 0.5.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self { pressed: std::array::from_fn(|_| rng.random_bool(0.5)) }
    }

    pub fn with(mut self, button: Button) -> Self {
        self.pressed[button.index()] = true;
        self
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed[button.index()]
    }

    pub fn flags(&self) -> [u8; ACTION_SIZE] {
        self.pressed.map(u8::from)
    }

    pub fn pressed_buttons(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.is_pressed(*b))
    }
}

impl From<Action> for [u8; ACTION_SIZE] {
    fn from(action: Action) -> Self {
        action.flags()
    }
}

impl TryFrom<Vec<u8>> for Action {
    type Error = ProtocolError;

    fn try_from(flags: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_flags(&flags)
    }
}

// MARK: - StepResult

/// Auxiliary per-call information. The adapter never fills it.
pub type Info = HashMap<String, serde_json::Value>;

/// Outcome of a single `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: i64,
    pub terminated: bool,
    /// Always `false`: the adapter never caps episode length.
    pub truncated: bool,
    pub info: Info,
}

// MARK: - RenderMode

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// `render()` returns the last captured observation.
    RgbArray,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RgbArray => "rgb_array",
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rgb_array" => Ok(Self::RgbArray),
            other => Err(format!("unknown render mode {:?} (supported: rgb_array)", other)),
        }
    }
}

// MARK: - TerminationFlag

/// Which second-element reply values mean "terminated".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationFlag {
    /// Only the string `"1"`.
    #[default]
    StringOnly,
    /// The string `"1"` or the integer `1`. The game-side controller mod
    /// replies with integers, so this is needed to ever see a termination
    /// from it.
    StringOrInteger,
}

impl TerminationFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StringOnly => "string_only",
            Self::StringOrInteger => "string_or_integer",
        }
    }
}

impl std::fmt::Display for TerminationFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TerminationFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string_only" => Ok(Self::StringOnly),
            "string_or_integer" => Ok(Self::StringOrInteger),
            other => Err(format!(
                "unknown termination flag {:?} (supported: string_only, string_or_integer)",
                other
            )),
        }
    }
}
