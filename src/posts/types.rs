pub type PostId = u64;

/// A post as shown in the list and detail views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
  pub id: PostId,
  pub title: String,
  pub body: String,
  pub user_id: Option<u64>,
}
