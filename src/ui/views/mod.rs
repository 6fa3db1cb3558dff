pub mod post_detail;
pub mod post_list;

pub use post_detail::PostDetailView;
pub use post_list::PostListView;
