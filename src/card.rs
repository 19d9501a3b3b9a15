//! Builds the visual card for a single post.

use crate::animation::Pose;
use chrono::{DateTime, Utc};
use crate::config::FlipInConfig;
use crate::error::StepError;
use crate::feeds::{Avatar, AvatarProvider, Post};

/// Glyph joining the lines of a multi-line post.
pub const LINE_SEPARATOR: &str = "|";

pub const CARD_STYLE_CLASS: &str = "tweetDisplay";

/// Rendering hint for cached nodes. Advisory only, it never changes layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheHint {
    #[default]
    Default,
    Speed,
    Quality,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub style_class: &'static str,
    pub cache: bool,
    pub cache_hint: CacheHint,
}

impl TextNode {
    fn cached(text: String, style_class: &'static str) -> Self {
        Self {
            text,
            style_class,
            cache: true,
            cache_hint: CacheHint::Speed,
        }
    }
}

/// Fixed-height text band holding the post body.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFlow {
    pub text: TextNode,
    pub style_class: &'static str,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub cache: bool,
    pub cache_hint: CacheHint,
}

#[derive(Debug, Clone)]
pub struct ImageView {
    pub avatar: Avatar,
    pub smooth: bool,
    pub cache_hint: CacheHint,
    pub fit_width: f64,
    pub fit_height: f64,
}

impl ImageView {
    /// Scales the image down, keeping its aspect ratio, until it fits a
    /// square of `allowance` units. Smaller images keep their size.
    fn fitted(avatar: Avatar, allowance: f64) -> Self {
        let (w, h) = (f64::from(avatar.width()), f64::from(avatar.height()));
        let scale = if w > allowance || h > allowance {
            allowance / w.max(h)
        } else {
            1.0
        };
        Self {
            avatar,
            smooth: true,
            cache_hint: CacheHint::Quality,
            fit_width: w * scale,
            fit_height: h * scale,
        }
    }
}

/// One rendered post: avatar on the left, name above the text band.
#[derive(Debug, Clone)]
pub struct Card {
    pub post_id: String,
    pub avatar: ImageView,
    pub name: TextNode,
    pub posted_at: Option<DateTime<Utc>>,
    pub flow: TextFlow,
    /// Height reserved for the author name above the text band.
    pub name_height: f64,
    /// Horizontal gap between avatar and the name/text column.
    pub gap: f64,
    /// Hard cap on the outer width of the card.
    pub max_width: f64,
    pub margin_bottom: f64,
    pub cache_hint: CacheHint,
    pub style_classes: Vec<&'static str>,
    pub pose: Pose,
}

impl Card {
    pub fn width(&self) -> f64 {
        self.max_width
    }

    pub fn height(&self) -> f64 {
        (self.name_height + self.flow.max_height).max(self.avatar.fit_height)
    }

    /// Height including the bottom margin, i.e. the vertical space the card
    /// occupies in a list.
    pub fn outer_height(&self) -> f64 {
        self.height() + self.margin_bottom
    }
}

/// Fixed card geometry shared by all slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardMetrics {
    pub avatar_allowance: f64,
    pub gap: f64,
    pub name_height: f64,
    pub text_height: f64,
}

impl Default for CardMetrics {
    fn default() -> Self {
        Self::from(&FlipInConfig::default())
    }
}

impl From<&FlipInConfig> for CardMetrics {
    fn from(config: &FlipInConfig) -> Self {
        Self {
            avatar_allowance: config.avatar_allowance,
            gap: config.gap,
            name_height: config.name_height,
            text_height: config.text_height,
        }
    }
}

impl CardMetrics {
    pub fn outer_width(&self, max_width: f64) -> f64 {
        max_width + self.avatar_allowance + self.gap
    }
}

pub struct CardBuilder<'a> {
    metrics: CardMetrics,
    avatars: &'a AvatarProvider,
}

impl<'a> CardBuilder<'a> {
    pub fn new(metrics: CardMetrics, avatars: &'a AvatarProvider) -> Self {
        Self { metrics, avatars }
    }

    /// Builds a card whose text band is at most `max_width` wide.
    pub fn build(&self, post: &Post, max_width: f64) -> Result<Card, StepError> {
        let avatar = self.avatars.image_big(&post.author)?;

        let flow = TextFlow {
            text: TextNode::cached(join_lines(&post.text), "tweetText"),
            style_class: "tweetFlow",
            max_width,
            min_height: self.metrics.text_height,
            max_height: self.metrics.text_height,
            cache: true,
            cache_hint: CacheHint::Speed,
        };

        Ok(Card {
            post_id: post.id.clone(),
            avatar: ImageView::fitted(avatar, self.metrics.avatar_allowance),
            name: TextNode::cached(post.author.name.clone(), "tweetUsername"),
            posted_at: post.created_at,
            flow,
            name_height: self.metrics.name_height,
            gap: self.metrics.gap,
            max_width: self.metrics.outer_width(max_width),
            margin_bottom: 0.0,
            cache_hint: CacheHint::Quality,
            style_classes: vec![CARD_STYLE_CLASS],
            pose: Pose::edge_on(),
        })
    }
}

/// Collapses a multi-line body into one line, one separator per break
/// character.
pub fn join_lines(text: &str) -> String {
    text.replace(['\n', '\r'], LINE_SEPARATOR)
}
