use async_trait::async_trait;
use ctrl_core::{Action, CtrlError, EnvSpec, Info, Observation, StepResult};

use crate::env::EpisodeStats;

/// The decision-process interface a rollout driver talks to.
///
/// Futures are not required to be `Send`: screen capture handles are
/// thread-bound, so environments are driven from a single task.
#[async_trait(?Send)]
pub trait Environment {
    /// Spaces, render modes and identity of this environment.
    fn spec(&self) -> &EnvSpec;

    /// Start a new episode. `seed` and `options` are accepted for interface
    /// compatibility and may be ignored.
    async fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&Info>,
    ) -> Result<(Observation, Info), CtrlError>;

    async fn step(&mut self, action: &Action) -> Result<StepResult, CtrlError>;

    /// The most recent frame, or `None` when rendering is disabled.
    async fn render(&mut self) -> Result<Option<Observation>, CtrlError>;

    /// Step count and reward sum of the current (or just-terminated) episode.
    fn episode(&self) -> EpisodeStats;
}
