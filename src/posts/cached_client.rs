//! Posts client bound to the query cache.

use color_eyre::Result;

use crate::config::Config;
use crate::query::{QueryClient, QueryOptions, QueryResult};

use super::cache::PostsQueryKey;
use super::client::PostsClient;
use super::error::ApiError;
use super::types::{Post, PostId};

pub type PostsQueries = QueryClient<PostsQueryKey, ApiError>;
pub type PostListResult = QueryResult<Vec<Post>, ApiError>;
pub type PostResult = QueryResult<Post, ApiError>;

/// Posts client with stale-while-revalidate caching.
///
/// Owns the query cache; views get it passed in rather than reaching for
/// shared global state.
pub struct CachedPostsClient {
  inner: PostsClient,
  queries: PostsQueries,
}

impl CachedPostsClient {
  pub fn new(config: &Config) -> Result<Self> {
    let inner = PostsClient::new(config)?;
    let queries = QueryClient::new(config.query_config());

    Ok(Self { inner, queries })
  }

  pub fn base_url(&self) -> &str {
    self.inner.base_url()
  }

  /// Subscribe to `["posts"]`.
  pub fn subscribe_posts(&mut self) -> PostListResult {
    let inner = self.inner.clone();
    self.queries.subscribe(
      PostsQueryKey::Posts,
      move || {
        let inner = inner.clone();
        async move { inner.fetch_post_list().await }
      },
      QueryOptions::default(),
    )
  }

  /// Subscribe to `["post", id]`. Without an id nothing is fetched and the
  /// result stays idle.
  pub fn subscribe_post(&mut self, id: Option<PostId>) -> PostResult {
    let Some(id) = id else {
      return QueryResult::idle();
    };

    let inner = self.inner.clone();
    self.queries.subscribe(
      PostsQueryKey::Post(id),
      move || {
        let inner = inner.clone();
        async move { inner.fetch_post_by_id(id).await }
      },
      QueryOptions::default(),
    )
  }

  pub fn unsubscribe(&mut self, key: &PostsQueryKey) {
    self.queries.unsubscribe(key);
  }

  pub fn posts(&self) -> PostListResult {
    self.queries.observe(&PostsQueryKey::Posts)
  }

  pub fn post(&self, id: Option<PostId>) -> PostResult {
    match id {
      Some(id) => self.queries.observe(&PostsQueryKey::Post(id)),
      None => QueryResult::idle(),
    }
  }

  /// A post counts as visited once its detail data sits in the cache.
  pub fn is_visited(&self, id: PostId) -> bool {
    self
      .queries
      .get_query_data::<Post>(&PostsQueryKey::Post(id))
      .is_some()
  }

  pub fn refetch(&mut self, key: &PostsQueryKey) -> bool {
    self.queries.refetch(key)
  }

  pub fn queries(&self) -> &PostsQueries {
    &self.queries
  }

  pub fn queries_mut(&mut self) -> &mut PostsQueries {
    &mut self.queries
  }
}
