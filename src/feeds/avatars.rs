use super::Author;
use crate::error::StepError;
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Edge length of the "big" profile image, matching the avatar allowance.
pub const AVATAR_SIZE: u32 = 64;

/// Decoded profile image shared between cards.
#[derive(Clone)]
pub struct Avatar {
    image: Arc<RgbaImage>,
}

impl fmt::Debug for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Avatar")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl Avatar {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn same_image(&self, other: &Avatar) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

/// Where avatar images come from. Lookups are synchronous; a source that
/// needs the network is expected to have the image cached already.
pub trait AvatarSource: Send + Sync {
    fn lookup(&self, author: &Author) -> Option<Avatar>;
}

/// Data provider handing out profile images keyed by author identity.
pub struct AvatarProvider {
    source: Box<dyn AvatarSource>,
}

impl fmt::Debug for AvatarProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarProvider").finish_non_exhaustive()
    }
}

impl AvatarProvider {
    pub fn new(source: impl AvatarSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Big profile image for the author. A lookup miss is reported, never
    /// papered over with a placeholder.
    pub fn image_big(&self, author: &Author) -> Result<Avatar, StepError> {
        self.source
            .lookup(author)
            .ok_or_else(|| StepError::MissingAvatar {
                handle: author.handle.clone(),
            })
    }
}

/// Deterministic identicons: a mirrored 5x5 grid derived from the handle.
#[derive(Debug, Clone)]
pub struct GeneratedAvatars {
    size: u32,
}

impl Default for GeneratedAvatars {
    fn default() -> Self {
        Self { size: AVATAR_SIZE }
    }
}

impl GeneratedAvatars {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(5) }
    }

    fn render(&self, handle: &str) -> RgbaImage {
        let hash = fnv1a(handle.as_bytes());
        let color = Rgba([
            (hash >> 16) as u8 | 0x40,
            (hash >> 8) as u8 | 0x40,
            hash as u8 | 0x40,
            0xff,
        ]);
        let background = Rgba([0x20, 0x20, 0x24, 0xff]);
        let cell = self.size / 5;

        RgbaImage::from_fn(self.size, self.size, |x, y| {
            let col = (x / cell.max(1)).min(4);
            let row = (y / cell.max(1)).min(4);
            // Columns 3 and 4 mirror 1 and 0.
            let mirrored = if col > 2 { 4 - col } else { col };
            let bit = row * 3 + mirrored;
            if (hash >> (bit + 24)) & 1 == 1 {
                color
            } else {
                background
            }
        })
    }
}

impl AvatarSource for GeneratedAvatars {
    fn lookup(&self, author: &Author) -> Option<Avatar> {
        if author.handle.is_empty() {
            return None;
        }
        Some(Avatar::new(self.render(&author.handle)))
    }
}

/// Fixed handle → avatar table.
#[derive(Debug, Clone, Default)]
pub struct StaticAvatars {
    avatars: HashMap<String, Avatar>,
}

impl StaticAvatars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handle: impl Into<String>, avatar: Avatar) -> Self {
        self.avatars.insert(handle.into(), avatar);
        self
    }
}

impl AvatarSource for StaticAvatars {
    fn lookup(&self, author: &Author) -> Option<Avatar> {
        self.avatars.get(&author.handle).cloned()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}
