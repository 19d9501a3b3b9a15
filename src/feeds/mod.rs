pub mod avatars;
pub mod bird;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::RwLock;

pub use avatars::{Avatar, AvatarProvider, AvatarSource, GeneratedAvatars, StaticAvatars};

/// How many posts the stream provider remembers when none is configured.
pub const DEFAULT_HISTORY: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Author {
    pub name: String,
    /// Stable identity of the author, used to look up the avatar.
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Post {
    pub id: String,
    pub author: Author,
    /// Body text with media URLs and markup already stripped.
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Produces posts for the stream provider from some external source.
#[async_trait]
pub trait PostFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Post>>;
}

/// Rolling history of the post stream, newest first.
#[derive(Debug)]
pub struct PostStreamProvider {
    history: RwLock<VecDeque<Post>>,
    max_history: usize,
}

impl Default for PostStreamProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl PostStreamProvider {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(max_history)),
            max_history,
        }
    }

    /// Records a newly streamed post. A post already in the history is moved
    /// to the front instead of being stored twice.
    pub fn accept(&self, post: Post) {
        let mut history = self
            .history
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        history.retain(|known| known.id != post.id);
        history.push_front(post);
        history.truncate(self.max_history);
    }

    /// Accepts posts given oldest first, so the last one ends up newest.
    pub fn accept_all(&self, posts: impl IntoIterator<Item = Post>) {
        for post in posts {
            self.accept(post);
        }
    }

    /// Snapshot of the history in provider order (newest first).
    pub fn posts(&self) -> Vec<Post> {
        self.history
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.history
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loads posts from a JSON array or Bird CLI output on disk.
pub struct FilePostFetcher {
    path: std::path::PathBuf,
    bird_format: bool,
}

impl FilePostFetcher {
    pub fn new(path: impl Into<std::path::PathBuf>, bird_format: bool) -> Self {
        Self {
            path: path.into(),
            bird_format,
        }
    }
}

#[async_trait]
impl PostFetcher for FilePostFetcher {
    async fn fetch(&self) -> Result<Vec<Post>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        if self.bird_format {
            Ok(bird::parse_search_results(&raw))
        } else {
            Ok(serde_json::from_str(&raw)?)
        }
    }
}

#[cfg(test)]
pub(crate) fn make_post(idx: usize) -> Post {
    Post {
        id: format!("post-{}", idx),
        author: Author {
            name: format!("User {}", idx),
            handle: format!("user{}", idx),
        },
        text: format!("Post number {}", idx),
        created_at: None,
    }
}
