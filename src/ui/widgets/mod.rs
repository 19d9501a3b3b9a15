pub mod post_card;
pub mod wall;

pub use post_card::PostCardWidget;
pub use wall::WallWidget;
