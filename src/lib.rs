//! Tweet wall presentation step.
//!
//! The [`step::FlipInPosts`] step takes the newest posts of a stream,
//! renders each into a [`card::Card`], appends them to a persistent list
//! container on the shared [`scene::Surface`] and flips them in together.
//! When the last flip finishes the orchestrator is told to proceed.

pub mod animation;
pub mod card;
pub mod config;
pub mod error;
pub mod feeds;
pub mod scene;
pub mod selection;
pub mod step;
pub mod ui;

pub use config::{Config, FlipInConfig, MAX_POSTS};
pub use error::{ConfigError, StepError};
pub use step::{FlipInPosts, FlipInPostsFactory, MachineContext, Step, StepFactory};
