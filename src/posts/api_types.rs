//! Serde-deserializable types matching the posts API responses.
//!
//! Kept apart from the domain types so the wire shape (camelCase, optional
//! author) can change without touching the views.

use serde::Deserialize;

use super::types::Post;

#[derive(Debug, Deserialize)]
pub struct ApiPost {
  pub id: u64,
  pub title: String,
  pub body: String,
  #[serde(rename = "userId", default)]
  pub user_id: Option<u64>,
}

impl From<ApiPost> for Post {
  fn from(post: ApiPost) -> Self {
    Post {
      id: post.id,
      title: post.title,
      body: post.body,
      user_id: post.user_id,
    }
  }
}
