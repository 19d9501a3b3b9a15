//! Timed transitions and the parallel group that runs them as one unit.

pub mod flip;

pub use flip::{FlipInTransition, Pose, PoseState};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Easing curves applied to a progress value in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EasingFunction {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl EasingFunction {
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingFunction::Linear => t,
            EasingFunction::EaseIn => t * t * t,
            EasingFunction::EaseOut => 1.0 - (1.0 - t).powi(3),
            EasingFunction::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// A visual change that plays out over time. `play` resolves once the
/// transition has reached its final state.
#[async_trait]
pub trait Transition: Send {
    async fn play(&mut self);
}

type FinishedHandler = Box<dyn FnOnce() + Send>;

/// Runs its children concurrently. The group finishes when the last child
/// finishes; the finished handler runs exactly once at that point.
#[derive(Default)]
pub struct ParallelTransition {
    children: Vec<Box<dyn Transition>>,
    on_finished: Option<FinishedHandler>,
}

impl fmt::Debug for ParallelTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelTransition")
            .field("children", &self.children.len())
            .field("on_finished", &self.on_finished.is_some())
            .finish()
    }
}

impl ParallelTransition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, transition: impl Transition + 'static) {
        self.children.push(Box::new(transition));
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Replaces any handler set earlier.
    pub fn set_on_finished(&mut self, handler: impl FnOnce() + Send + 'static) {
        self.on_finished = Some(Box::new(handler));
    }

    /// Plays every child to completion, then fires the finished handler. An
    /// empty group completes immediately.
    pub async fn run(mut self) {
        let count = self.children.len();
        join_all(self.children.iter_mut().map(|child| child.play())).await;
        tracing::trace!(count, "parallel transition finished");
        if let Some(handler) = self.on_finished.take() {
            handler();
        }
    }

    /// Starts the group on `runtime` without waiting for it.
    pub fn play(self, runtime: &Handle) -> JoinHandle<()> {
        runtime.spawn(self.run())
    }
}
