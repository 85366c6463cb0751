//! Random-policy rollout loop.
//!
//! ```text
//! reset ──► step(sample) ──► step(sample) ──► … ──► terminated ──► reset ──► …
//!                 │
//!                 └── every `report_every` steps: progress line
//! ```
//!
//! The loop is generic over [`Environment`] so it can be driven against a
//! scripted environment in tests.

use std::time::Instant;

use ctrl_core::{Action, CtrlConfig, CtrlError};
use ctrl_env::Environment;
use rand::Rng;
use tracing::info;

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloutConfig {
    /// Total `step` calls across all episodes.
    pub timesteps:    u64,
    pub report_every: u64,
    /// Forwarded to the first `reset`.
    pub seed:         Option<u64>,
}

impl From<&CtrlConfig> for RolloutConfig {
    fn from(cfg: &CtrlConfig) -> Self {
        Self { timesteps: cfg.timesteps, report_every: cfg.report_every, seed: cfg.seed }
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Totals over a finished rollout. Only terminated episodes count towards
/// the return statistics; `total_return` saturates at the `i64` bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolloutSummary {
    pub steps:        u64,
    pub episodes:     u64,
    pub total_return: i64,
    pub best_return:  Option<i64>,
}

impl RolloutSummary {
    fn finish_episode(&mut self, episode_return: i64) {
        self.episodes += 1;
        self.total_return = self.total_return.saturating_add(episode_return);
        self.best_return = Some(self.best_return.map_or(episode_return, |b| b.max(episode_return)));
    }

    pub fn mean_return(&self) -> Option<f64> {
        (self.episodes > 0).then(|| self.total_return as f64 / self.episodes as f64)
    }
}

// ── Loop ──────────────────────────────────────────────────────────────────────

/// Drive `env` with uniformly random actions for `config.timesteps` steps,
/// resetting after every terminated episode. Episode totals come from
/// [`Environment::episode`], which also logs each finished episode.
pub async fn run_random<E, R>(
    env: &mut E,
    rng: &mut R,
    config: &RolloutConfig,
) -> Result<RolloutSummary, CtrlError>
where
    E: Environment,
    R: Rng,
{
    let mut summary = RolloutSummary::default();
    if config.timesteps == 0 {
        return Ok(summary);
    }

    let report_every = config.report_every.max(1);
    let mut rate = StepRate::new();

    env.reset(config.seed, None).await?;

    for step in 1..=config.timesteps {
        let action = Action::sample(rng);
        let result = env.step(&action).await?;
        summary.steps = step;
        rate.tick();

        if result.terminated || result.truncated {
            summary.finish_episode(env.episode().total_reward);
            if step < config.timesteps {
                env.reset(None, None).await?;
            }
        }

        if step % report_every == 0 {
            info!(
                "Progress: {}/{} steps, {} episodes, mean return {}, {:.1} steps/s",
                step,
                config.timesteps,
                summary.episodes,
                format_mean(summary.mean_return()),
                rate.per_second()
            );
        }
    }

    Ok(summary)
}

pub fn format_mean(mean: Option<f64>) -> String {
    mean.map_or_else(|| "n/a".to_owned(), |m| format!("{:.2}", m))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

struct StepRate {
    count:        u64,
    window_start: Instant,
    last_rate:    f64,
}

impl StepRate {
    fn new() -> Self {
        Self { count: 0, window_start: Instant::now(), last_rate: 0.0 }
    }

    fn tick(&mut self) {
        self.count += 1;
    }

    /// Steps per second since the previous call; resets the window.
    fn per_second(&mut self) -> f64 {
        let elapsed = self.window_start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.last_rate = self.count as f64 / elapsed;
            self.count = 0;
            self.window_start = Instant::now();
        }
        self.last_rate
    }
}
