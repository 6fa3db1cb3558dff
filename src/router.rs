//! Two-state navigation between the post list and a post's detail.

use crate::posts::PostId;

/// Which view is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
  #[default]
  List,
  Detail(PostId),
}

/// Navigation intents raised by views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
  Select(PostId),
  Back,
}

impl Route {
  /// The only way a route changes. Intents that make no sense in the
  /// current state leave it untouched.
  pub fn transition(self, nav: Navigation) -> Route {
    match (self, nav) {
      (Route::List, Navigation::Select(id)) => Route::Detail(id),
      (Route::Detail(_), Navigation::Back) => Route::List,
      (route, _) => route,
    }
  }
}
