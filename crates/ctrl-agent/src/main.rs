//! Ctrl agent: drives the Ctrl environment with a uniformly random policy.
//!
//! ```text
//! CTRL_* env ──► CtrlConfig ──► CtrlEnv::open ──► rollout::run_random ──► summary
//!                                  │
//!                                  ├─ ScreenCapturer (CTRL_MONITOR)
//!                                  └─ ZmqTransport   (CTRL_ENDPOINT, default tcp://localhost:7777)
//! ```
//!
//! Start the game with the controller mod loaded, launch this binary, then
//! focus the game window within `CTRL_FOCUS_DELAY_SECS`.
//!
//! The stock controller mod replies with an integer terminated flag, which is
//! ignored unless `CTRL_TERMINATION_FLAG=string_or_integer` is set.

mod rollout;

use anyhow::{Context, Result};
use ctrl_core::CtrlConfig;
use ctrl_env::CtrlEnv;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::rollout::{format_mean, RolloutConfig, RolloutSummary};

// Screen capture handles are thread-bound; keep everything on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Ctrl agent v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(summary) => {
            info!(
                "Rollout complete: {} steps, {} episodes, mean return {}, best {}",
                summary.steps,
                summary.episodes,
                format_mean(summary.mean_return()),
                summary.best_return.map_or_else(|| "n/a".to_owned(), |b| b.to_string())
            );
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<RolloutSummary> {
    // ── 1. Configuration ─────────────────────────────────────────────────────
    let config = CtrlConfig::from_env().context("reading CTRL_* environment")?;
    info!(
        "Config: monitor={} endpoint={} timesteps={} render={} termination_flag={}",
        config.monitor,
        config.endpoint,
        config.timesteps,
        config.render_mode.map_or("none", |m| m.as_str()),
        config.termination_flag
    );

    // ── 2. Environment ───────────────────────────────────────────────────────
    let mut env = CtrlEnv::open(&config)
        .await
        .with_context(|| format!("opening environment (controller at {})", config.endpoint))?;
    info!("Environment ready: {:?}", env.spec().id);

    // ── 3. Policy RNG ────────────────────────────────────────────────────────
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    // ── 4. Rollout ───────────────────────────────────────────────────────────
    rollout::run_random(&mut env, &mut rng, &RolloutConfig::from(&config))
        .await
        .context("random rollout")
}
