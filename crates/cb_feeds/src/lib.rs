pub mod feed;
pub mod fetcher;
pub mod html;

pub use feed::{default_feeds, FeedSource};
pub use fetcher::FeedFetcher;

pub mod prelude {
    pub use super::{default_feeds, FeedFetcher, FeedSource};
    pub use cb_core::{Article, Error, Result};
}
