pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod types;

pub use cache::PostsQueryKey;
pub use cached_client::CachedPostsClient;
pub use client::PostsClient;
pub use error::ApiError;
pub use types::{Post, PostId};
