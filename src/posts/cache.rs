//! Query keys for the posts API.

use crate::query::QueryKey;

use super::types::PostId;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PostsQueryKey {
  /// The full collection: `["posts"]`
  Posts,
  /// A single post: `["post", id]`
  Post(PostId),
}

impl QueryKey for PostsQueryKey {
  fn description(&self) -> String {
    match self {
      Self::Posts => r#"["posts"]"#.to_string(),
      Self::Post(id) => format!(r#"["post", {}]"#, id),
    }
  }
}
