use async_trait::async_trait;
use ctrl_capture::{FrameSource, ScreenCapturer, ScreenGrabber};
use ctrl_core::{
    Action, CtrlConfig, CtrlError, EnvSpec, Info, Observation, RenderMode, StepResult,
    TerminationFlag,
};
use ctrl_transport::{ControlChannel, Transport, ZmqTransport};
use tracing::{debug, info};

use crate::environment::Environment;

// ── Episode bookkeeping ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    /// No reset issued yet; `step` is rejected.
    Idle,
    Active,
}

/// Running totals for the current episode. The reward sum saturates at the
/// `i64` bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeStats {
    pub steps: u64,
    pub total_reward: i64,
}

// ── CtrlEnv ───────────────────────────────────────────────────────────────────

/// Screen-in, buttons-out environment around a running game.
///
/// Every `reset` and `step` performs exactly one controller round trip
/// followed by exactly one screen capture.
pub struct CtrlEnv<G, T> {
    frames:      FrameSource<G>,
    channel:     ControlChannel<T>,
    render_mode: Option<RenderMode>,
    spec:        EnvSpec,
    state:       EpisodeState,
    episode:     EpisodeStats,
    episodes:    u64,
}

impl CtrlEnv<ScreenCapturer, ZmqTransport> {
    /// Open the configured display, connect to the controller, then wait
    /// `focus_delay` so the game window can be brought to the front.
    pub async fn open(config: &CtrlConfig) -> Result<Self, CtrlError> {
        let capturer = ScreenCapturer::open(config.monitor)?;
        let transport = ZmqTransport::connect(&config.endpoint).await?;
        let env = Self::new(capturer, transport, config.render_mode)
            .with_termination_flag(config.termination_flag);

        let delay = config.focus_delay();
        if !delay.is_zero() {
            info!("Waiting {}s for the game window to be focused", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
        Ok(env)
    }
}

impl<G: ScreenGrabber, T: Transport> CtrlEnv<G, T> {
    pub fn new(grabber: G, transport: T, render_mode: Option<RenderMode>) -> Self {
        Self {
            frames: FrameSource::new(grabber, render_mode.is_some()),
            channel: ControlChannel::new(transport),
            render_mode,
            spec: EnvSpec::default(),
            state: EpisodeState::Idle,
            episode: EpisodeStats::default(),
            episodes: 0,
        }
    }

    /// Choose which reply values end an episode. Defaults to the string
    /// `"1"` only.
    pub fn with_termination_flag(mut self, flag: TerminationFlag) -> Self {
        self.channel = self.channel.with_termination_flag(flag);
        self
    }

    /// Restart the episode on the controller side and observe the screen.
    ///
    /// Valid in any state. `seed` and `options` are not used.
    pub async fn reset(
        &mut self,
        seed: Option<u64>,
        _options: Option<&Info>,
    ) -> Result<(Observation, Info), CtrlError> {
        if self.state == EpisodeState::Active && self.episode.steps > 0 {
            debug!(
                "Abandoning episode {} after {} steps (return {})",
                self.episodes, self.episode.steps, self.episode.total_reward
            );
        }
        debug!(?seed, "reset");

        self.channel.reset().await?;
        let observation = self.frames.capture().await?;

        self.state = EpisodeState::Active;
        self.episode = EpisodeStats::default();
        self.episodes += 1;
        Ok((observation, Info::new()))
    }

    /// Send `action`, wait for the controller's verdict, then observe.
    pub async fn step(&mut self, action: &Action) -> Result<StepResult, CtrlError> {
        if self.state == EpisodeState::Idle {
            return Err(CtrlError::EpisodeNotStarted);
        }

        let reply = self.channel.step(action).await?;
        let observation = self.frames.capture().await?;

        self.episode.steps += 1;
        self.episode.total_reward = self.episode.total_reward.saturating_add(reply.reward);
        if reply.terminated {
            info!(
                "Episode {} finished: steps={} return={}",
                self.episodes, self.episode.steps, self.episode.total_reward
            );
        }

        Ok(StepResult {
            observation,
            reward: reply.reward,
            terminated: reply.terminated,
            truncated: false,
            info: Info::new(),
        })
    }

    /// Last captured frame in `rgb_array` mode, capturing once if nothing
    /// has been captured yet. Always `None` when rendering is disabled.
    pub async fn render(&mut self) -> Result<Option<Observation>, CtrlError> {
        if self.render_mode.is_none() {
            return Ok(None);
        }
        if let Some(last) = self.frames.last() {
            return Ok(Some(last.clone()));
        }
        let observation = self.frames.capture().await?;
        Ok(Some(observation))
    }

    pub fn spec(&self) -> &EnvSpec {
        &self.spec
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    /// Totals for the current (or just-terminated) episode.
    pub fn episode(&self) -> EpisodeStats {
        self.episode
    }

    /// Number of successful resets so far.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn frame_source(&self) -> &FrameSource<G> {
        &self.frames
    }

    pub fn channel(&self) -> &ControlChannel<T> {
        &self.channel
    }
}

#[async_trait(?Send)]
impl<G: ScreenGrabber, T: Transport> Environment for CtrlEnv<G, T> {
    fn spec(&self) -> &EnvSpec {
        &self.spec
    }

    async fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&Info>,
    ) -> Result<(Observation, Info), CtrlError> {
        CtrlEnv::reset(self, seed, options).await
    }

    async fn step(&mut self, action: &Action) -> Result<StepResult, CtrlError> {
        CtrlEnv::step(self, action).await
    }

    async fn render(&mut self) -> Result<Option<Observation>, CtrlError> {
        CtrlEnv::render(self).await
    }

    fn episode(&self) -> EpisodeStats {
        self.episode
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use ctrl_capture::{CapturedFrame, PixelFormat};
    use ctrl_core::{Button, CaptureError, ChannelError, ProtocolError};

    use super::*;

    type Events = Arc<Mutex<Vec<String>>>;

    /// Returns a uniform frame whose colour is the 1-based grab count, so
    /// every capture is distinguishable.
    struct CountingGrabber {
        grabs:  u8,
        events: Events,
    }

    #[async_trait(?Send)]
    impl ScreenGrabber for CountingGrabber {
        async fn grab(&mut self) -> Result<CapturedFrame, CaptureError> {
            self.grabs += 1;
            self.events.lock().unwrap().push(format!("grab {}", self.grabs));
            let (width, height) = (512u32, 288u32);
            Ok(CapturedFrame {
                data: [self.grabs, self.grabs, self.grabs, 255].repeat((width * height) as usize),
                width,
                height,
                stride: width as usize * 4,
                format: PixelFormat::Bgra,
            })
        }
    }

    struct Scripted {
        replies: VecDeque<&'static str>,
        events:  Events,
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn exchange(&mut self, payload: String) -> Result<Vec<u8>, ChannelError> {
            self.events.lock().unwrap().push(format!("send {}", payload));
            self.replies
                .pop_front()
                .map(|r| r.as_bytes().to_vec())
                .ok_or(ChannelError::ReceiveFailed { reason: "peer closed".to_owned() })
        }
    }

    fn env_with(
        replies: &[&'static str],
        render_mode: Option<RenderMode>,
    ) -> (CtrlEnv<CountingGrabber, Scripted>, Events) {
        let events = Events::default();
        let grabber = CountingGrabber { grabs: 0, events: events.clone() };
        let transport = Scripted { replies: replies.iter().copied().collect(), events: events.clone() };
        (CtrlEnv::new(grabber, transport, render_mode), events)
    }

    fn events_of(events: &Events) -> Vec<String> {
        events.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn reset_returns_observation_and_empty_info() {
        let (mut env, events) = env_with(&["ok"], None);
        assert_eq!(env.state(), EpisodeState::Idle);

        let (obs, info) = env.reset(Some(123), None).await.unwrap();
        assert_eq!(obs.shape(), [144, 256, 3]);
        assert_eq!(obs.pixel(0, 0), [1, 1, 1]);
        assert!(info.is_empty());
        assert_eq!(env.state(), EpisodeState::Active);
        assert_eq!(events_of(&events), vec!["send [1]", "grab 1"]);
    }

    #[tokio::test]
    async fn step_before_reset_is_rejected_without_traffic() {
        let (mut env, events) = env_with(&[], None);
        let err = env.step(&Action::none()).await.unwrap_err();
        assert!(matches!(err, CtrlError::EpisodeNotStarted));
        assert!(events_of(&events).is_empty());
        assert_eq!(env.channel().exchanges(), 0);
    }

    #[tokio::test]
    async fn step_reports_reward_and_termination() {
        let (mut env, events) = env_with(&["ok", r#"[5, "0"]"#, r#"[0, "1"]"#], None);
        env.reset(None, None).await.unwrap();

        let first = env.step(&Action::none()).await.unwrap();
        assert_eq!(first.reward, 5);
        assert!(!first.terminated);
        assert!(!first.truncated);
        assert!(first.info.is_empty());
        assert_eq!(first.observation.pixel(10, 10), [2, 2, 2]);

        let second = env.step(&Action::none().with(Button::Dash)).await.unwrap();
        assert_eq!(second.reward, 0);
        assert!(second.terminated);
        assert!(!second.truncated);
        assert_eq!(env.state(), EpisodeState::Active);
        assert_eq!(env.episode(), EpisodeStats { steps: 2, total_reward: 5 });

        // Reply first, then the screen.
        assert_eq!(
            events_of(&events),
            vec![
                "send [1]",
                "grab 1",
                "send [0,0,0,0,0,0,0]",
                "grab 2",
                "send [0,0,0,0,0,1,0]",
                "grab 3",
            ]
        );
    }

    #[tokio::test]
    async fn reset_is_allowed_mid_episode_and_clears_totals() {
        let (mut env, _) = env_with(&["ok", "[-1, 0]", "ok"], None);
        env.reset(None, None).await.unwrap();
        env.step(&Action::none()).await.unwrap();
        assert_eq!(env.episode().total_reward, -1);

        env.reset(None, None).await.unwrap();
        assert_eq!(env.episode(), EpisodeStats::default());
        assert_eq!(env.episodes(), 2);
        assert_eq!(env.state(), EpisodeState::Active);
    }

    #[tokio::test]
    async fn render_disabled_returns_none_without_capturing() {
        let (mut env, events) = env_with(&["ok"], None);
        assert_eq!(env.render().await.unwrap(), None);
        env.reset(None, None).await.unwrap();
        assert_eq!(env.render().await.unwrap(), None);
        assert_eq!(env.frame_source().grabber().grabs, 1);
        assert_eq!(events_of(&events), vec!["send [1]", "grab 1"]);
    }

    #[tokio::test]
    async fn render_before_any_capture_grabs_exactly_once() {
        let (mut env, _) = env_with(&[], Some(RenderMode::RgbArray));

        let first = env.render().await.unwrap().expect("frame in rgb_array mode");
        assert_eq!(env.frame_source().grabber().grabs, 1);

        let again = env.render().await.unwrap().expect("cached frame");
        assert_eq!(again, first);
        assert_eq!(env.frame_source().grabber().grabs, 1);
    }

    #[tokio::test]
    async fn render_returns_latest_step_frame() {
        let (mut env, _) = env_with(&["ok", r#"[1, "0"]"#], Some(RenderMode::RgbArray));
        env.reset(None, None).await.unwrap();
        let step = env.step(&Action::none()).await.unwrap();

        let rendered = env.render().await.unwrap().expect("cached frame");
        assert_eq!(rendered, step.observation);
        assert_eq!(rendered.pixel(143, 255), [2, 2, 2]);
        assert_eq!(env.frame_source().grabber().grabs, 2);
    }

    #[tokio::test]
    async fn channel_and_protocol_errors_propagate() {
        let (mut env, _) = env_with(&[], None);
        let err = env.reset(None, None).await.unwrap_err();
        assert!(matches!(err, CtrlError::Channel(ChannelError::ReceiveFailed { .. })));
        assert_eq!(env.state(), EpisodeState::Idle);

        let (mut env, _) = env_with(&["ok", "[7]"], None);
        env.reset(None, None).await.unwrap();
        let err = env.step(&Action::none()).await.unwrap_err();
        assert!(matches!(err, CtrlError::Protocol(ProtocolError::MalformedReply { .. })));
    }

    #[tokio::test]
    async fn usable_through_environment_trait() {
        async fn drive<E: Environment>(env: &mut E) -> StepResult {
            env.reset(None, None).await.unwrap();
            env.step(&Action::none()).await.unwrap()
        }

        let (mut env, _) = env_with(&["ok", r#"[-51, "1"]"#], None);
        assert_eq!(Environment::spec(&env).action_size(), 7);
        let result = drive(&mut env).await;
        assert_eq!(result.reward, -51);
        assert!(result.terminated);
        assert_eq!(Environment::episode(&env), EpisodeStats { steps: 1, total_reward: -51 });
    }

    #[tokio::test]
    async fn reward_total_saturates_instead_of_overflowing() {
        let (mut env, _) =
            env_with(&["ok", r#"[9223372036854775807, "0"]"#, r#"[1, "0"]"#], None);
        env.reset(None, None).await.unwrap();

        let first = env.step(&Action::none()).await.unwrap();
        assert_eq!(first.reward, i64::MAX);
        let second = env.step(&Action::none()).await.unwrap();
        assert_eq!(second.reward, 1);
        assert_eq!(env.episode(), EpisodeStats { steps: 2, total_reward: i64::MAX });
    }

    #[tokio::test]
    async fn integer_termination_flag_is_opt_in() {
        let (mut env, _) = env_with(&["ok", "[0, 1]"], None);
        env.reset(None, None).await.unwrap();
        assert!(!env.step(&Action::none()).await.unwrap().terminated);

        let (env, _) = env_with(&["ok", "[0, 1]"], None);
        let mut env = env.with_termination_flag(TerminationFlag::StringOrInteger);
        env.reset(None, None).await.unwrap();
        assert!(env.step(&Action::none()).await.unwrap().terminated);
    }

    #[tokio::test]
    async fn observations_fall_inside_declared_space() {
        let (mut env, _) = env_with(&["ok", r#"[0, "0"]"#], Some(RenderMode::RgbArray));
        let space = &env.spec().observation_space;
        assert_eq!(space, &EnvSpec::default().observation_space);

        let (obs, _) = env.reset(None, None).await.unwrap();
        assert!(EnvSpec::default().observation_space.contains_observation(&obs));
        let step = env.step(&Action::none()).await.unwrap();
        assert!(EnvSpec::default().observation_space.contains_observation(&step.observation));
        let rendered = env.render().await.unwrap().expect("cached frame");
        assert!(env.spec().observation_space.contains_observation(&rendered));
    }
}
