//! Observation / action space declarations.
//!
//! These are the shape and range contract a trainer checks before driving the
//! environment. They describe data; they do not validate it on every call.

use serde::{Deserialize, Serialize};

use crate::types::{Action, Observation, RenderMode, ACTION_SIZE};

// MARK: - Space

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Space {
    /// Dense u8 tensor with inclusive bounds.
    Box { low: u8, high: u8, shape: Vec<usize> },
    /// Fixed number of independent 0/1 flags.
    MultiBinary { n: usize },
}

impl Space {
    pub fn size(&self) -> usize {
        match self {
            Self::Box { shape, .. } => shape.iter().product(),
            Self::MultiBinary { n } => *n,
        }
    }

    /// True when `values` has the right length and every value is in range.
    pub fn contains(&self, values: &[u8]) -> bool {
        if values.len() != self.size() {
            return false;
        }
        match self {
            Self::Box { low, high, .. } => values.iter().all(|v| (*low..=*high).contains(v)),
            Self::MultiBinary { .. } => values.iter().all(|v| *v <= 1),
        }
    }

    pub fn contains_observation(&self, obs: &Observation) -> bool {
        match self {
            Self::Box { shape, .. } => {
                shape.as_slice() == obs.shape().as_slice() && self.contains(obs.as_bytes())
            }
            Self::MultiBinary { .. } => false,
        }
    }

    pub fn contains_action(&self, action: &Action) -> bool {
        self.contains(&action.flags())
    }
}

// MARK: - EnvSpec

/// Static description of the environment, handed to trainers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSpec {
    pub id: String,
    pub observation_space: Space,
    pub action_space: Space,
    pub render_modes: Vec<RenderMode>,
    /// The controlled game runs in real time, so identical action sequences
    /// do not reproduce identical trajectories.
    pub nondeterministic: bool,
}

impl Default for EnvSpec {
    fn default() -> Self {
        Self {
            id: "ctrl".to_owned(),
            observation_space: Space::Box {
                low: 0,
                high: 255,
                shape: Observation::SHAPE.to_vec(),
            },
            action_space: Space::MultiBinary { n: ACTION_SIZE },
            render_modes: vec![RenderMode::RgbArray],
            nondeterministic: true,
        }
    }
}

impl EnvSpec {
    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }
}
