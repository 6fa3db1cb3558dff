use crate::config::Config;
use crate::posts::api_types::ApiPost;
use crate::posts::error::ApiError;
use crate::posts::types::{Post, PostId};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// HTTP client for the posts API.
///
/// Cloning is cheap; `reqwest::Client` shares its connection pool.
#[derive(Clone)]
pub struct PostsClient {
  client: reqwest::Client,
  base_url: String,
}

impl PostsClient {
  pub fn new(config: &Config) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("postq/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url: config.api.base_url.trim_end_matches('/').to_string(),
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// GET /posts
  pub async fn fetch_post_list(&self) -> Result<Vec<Post>, ApiError> {
    let posts: Vec<ApiPost> = self.get("/posts").await?;
    Ok(posts.into_iter().map(Post::from).collect())
  }

  /// GET /posts/{id}
  pub async fn fetch_post_by_id(&self, id: PostId) -> Result<Post, ApiError> {
    let post: ApiPost = self.get(&format!("/posts/{}", id)).await?;
    Ok(post.into())
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let url = format!("{}{}", self.base_url, path);
    debug!(%url, "GET");

    let response = self
      .client
      .get(&url)
      .header(ACCEPT, "application/json")
      .send()
      .await
      .map_err(|e| {
        warn!(%url, error = %e, "request failed");
        ApiError::from(e)
      })?;

    let status = response.status();
    if !status.is_success() {
      warn!(%url, %status, "unexpected status");
      return Err(ApiError::from_status(status, &url));
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
      warn!(%url, error = %e, "malformed response");
      ApiError::malformed(&url, e)
    })
  }
}
