use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::types::{RenderMode, TerminationFlag};

/// Port the game-side controller binds its reply socket to.
pub const CONTROLLER_PORT: u16 = 7777;
pub const DEFAULT_ENDPOINT: &str = "tcp://localhost:7777";

/// Runtime configuration for the environment and the rollout driver.
///
/// Every field can be overridden through a `CTRL_*` environment variable,
/// see [`CtrlConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtrlConfig {
    /// `0` = primary display, `n` = n-th display (1-based).
    pub monitor: usize,
    pub endpoint: String,
    /// Pause after connecting so the game window can be focused.
    pub focus_delay_secs: u64,
    pub render_mode: Option<RenderMode>,
    /// Reply values accepted as "terminated".
    pub termination_flag: TerminationFlag,
    pub timesteps: u64,
    pub report_every: u64,
    pub seed: Option<u64>,
}

impl Default for CtrlConfig {
    fn default() -> Self {
        Self {
            monitor: 0,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            focus_delay_secs: 5,
            render_mode: None,
            termination_flag: TerminationFlag::StringOnly,
            timesteps: 10_000_000,
            report_every: 10_000,
            seed: None,
        }
    }
}

impl CtrlConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`. Unset or empty variables keep their
    /// default; values that fail to parse are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = parse_var(&lookup, "CTRL_MONITOR")? {
            cfg.monitor = v;
        }
        if let Some(v) = lookup("CTRL_ENDPOINT").filter(|s| !s.trim().is_empty()) {
            cfg.endpoint = v.trim().to_owned();
        }
        if let Some(v) = parse_var(&lookup, "CTRL_FOCUS_DELAY_SECS")? {
            cfg.focus_delay_secs = v;
        }
        if let Some(raw) = lookup("CTRL_RENDER") {
            cfg.render_mode = match raw.trim() {
                "" | "none" => None,
                other => Some(other.parse().map_err(|reason| ConfigError {
                    name: "CTRL_RENDER".to_owned(),
                    value: raw.clone(),
                    reason,
                })?),
            };
        }
        if let Some(v) = parse_var(&lookup, "CTRL_TERMINATION_FLAG")? {
            cfg.termination_flag = v;
        }
        if let Some(v) = parse_var(&lookup, "CTRL_TIMESTEPS")? {
            cfg.timesteps = v;
        }
        if let Some(v) = parse_var(&lookup, "CTRL_REPORT_EVERY")? {
            if v == 0 {
                return Err(ConfigError {
                    name: "CTRL_REPORT_EVERY".to_owned(),
                    value: "0".to_owned(),
                    reason: "must be greater than zero".to_owned(),
                });
            }
            cfg.report_every = v;
        }
        if let Some(v) = parse_var(&lookup, "CTRL_SEED")? {
            cfg.seed = Some(v);
        }

        Ok(cfg)
    }

    pub fn focus_delay(&self) -> Duration {
        Duration::from_secs(self.focus_delay_secs)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError {
                name: name.to_owned(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(None),
    }
}
