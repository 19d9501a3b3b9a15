//! Flip-in entrance: a card turns from edge-on to face-on.

use super::{EasingFunction, Transition};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

pub const FLIP_DURATION: Duration = Duration::from_millis(1000);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Rotation in degrees at each keyframe, overshooting before settling.
const KEYFRAMES: [(f32, f32); 5] = [(0.0, 90.0), (0.4, -20.0), (0.6, 10.0), (0.8, -5.0), (1.0, 0.0)];

/// Fraction of the flip over which the card fades in.
const FADE_END: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseState {
    /// Rotation around the vertical axis in degrees; 90 is edge-on.
    pub angle: f32,
    pub opacity: f32,
}

impl PoseState {
    pub const EDGE_ON: PoseState = PoseState {
        angle: 90.0,
        opacity: 0.0,
    };
    pub const FACE_ON: PoseState = PoseState {
        angle: 0.0,
        opacity: 1.0,
    };

    /// Share of the card's width visible to the viewer.
    pub fn visible_width(&self) -> f32 {
        self.angle.to_radians().cos().abs()
    }
}

/// Pose of a card, shared between the card and the transition driving it.
#[derive(Debug, Clone)]
pub struct Pose {
    state: Arc<Mutex<PoseState>>,
}

impl Pose {
    pub fn edge_on() -> Self {
        Self::new(PoseState::EDGE_ON)
    }

    pub fn new(state: PoseState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn get(&self) -> PoseState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, state: PoseState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

pub struct FlipInTransition {
    pose: Pose,
    duration: Duration,
    frame: Duration,
    easing: EasingFunction,
}

impl FlipInTransition {
    pub fn new(pose: Pose) -> Self {
        Self::with_timing(pose, FLIP_DURATION, FRAME_INTERVAL)
    }

    pub fn with_timing(pose: Pose, duration: Duration, frame: Duration) -> Self {
        Self {
            pose,
            duration,
            frame: frame.max(Duration::from_millis(1)),
            easing: EasingFunction::default(),
        }
    }

    /// Curve applied between neighbouring keyframes.
    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = easing;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Pose at `progress` (0.0 = start, 1.0 = end) of the flip.
    pub fn sample(&self, progress: f32) -> PoseState {
        let t = progress.clamp(0.0, 1.0);
        let segment = KEYFRAMES
            .windows(2)
            .find(|pair| t <= pair[1].0)
            .unwrap_or(&KEYFRAMES[KEYFRAMES.len() - 2..]);
        let ((t0, from), (t1, to)) = (segment[0], segment[1]);
        let local = self.easing.apply((t - t0) / (t1 - t0));

        PoseState {
            angle: from + (to - from) * local,
            opacity: (t / FADE_END).min(1.0),
        }
    }
}

#[async_trait]
impl Transition for FlipInTransition {
    async fn play(&mut self) {
        if self.duration.is_zero() {
            self.pose.set(PoseState::FACE_ON);
            return;
        }

        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let progress = started.elapsed().as_secs_f32() / self.duration.as_secs_f32();
            if progress >= 1.0 {
                self.pose.set(PoseState::FACE_ON);
                break;
            }
            self.pose.set(self.sample(progress));
        }
    }
}
