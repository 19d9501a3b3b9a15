use super::{Author, Post};

/// Parse Bird CLI search output into posts.
/// Expected format:
/// @username: Post text
/// more text on following lines
/// URL: https://x.com/username/status/123
/// ---
///
/// Continuation lines are kept as separate lines of the body. Entries
/// without a URL are dropped since they cannot be identified.
pub fn parse_search_results(output: &str) -> Vec<Post> {
    let mut posts = Vec::new();
    let mut current: Option<PendingPost> = None;

    for line in output.lines() {
        let line = line.trim();

        if line.starts_with('@') {
            if let Some(pending) = current.take() {
                posts.extend(pending.finish());
            }

            if let Some((handle, text)) = line.split_once(':') {
                current = Some(PendingPost {
                    handle: handle.trim_start_matches('@').to_string(),
                    text: text.trim().to_string(),
                    url: String::new(),
                });
            }
        } else if line.starts_with("URL:") || line.starts_with("http") {
            if let Some(pending) = current.as_mut() {
                pending.url = line.trim_start_matches("URL:").trim().to_string();
            }
        } else if line == "---" || line.is_empty() {
            if let Some(pending) = current.take() {
                posts.extend(pending.finish());
            }
        } else if let Some(pending) = current.as_mut() {
            if !pending.text.is_empty() {
                pending.text.push('\n');
            }
            pending.text.push_str(line);
        }
    }

    if let Some(pending) = current {
        posts.extend(pending.finish());
    }

    posts
}

struct PendingPost {
    handle: String,
    text: String,
    url: String,
}

impl PendingPost {
    fn finish(self) -> Option<Post> {
        if self.url.is_empty() {
            return None;
        }
        let id = status_id(&self.url).unwrap_or(&self.url).to_string();
        Some(Post {
            id,
            author: Author {
                name: self.handle.clone(),
                handle: self.handle,
            },
            text: self.text,
            created_at: None,
        })
    }
}

fn status_id(url: &str) -> Option<&str> {
    let after = url.split("/status/").nth(1)?;
    let id = after.split(['?', '/', '#']).next()?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
