use crate::posts::CachedPostsClient;
use crate::router::Navigation;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
  /// No action needed
  None,
  /// Ask the router to change route
  Navigate(Navigation),
  /// Leave the application
  Quit,
}

/// Trait for view behavior
///
/// Views subscribe to their queries when mounted and drop the subscription
/// when unmounted. Rendering only observes the cache.
pub trait View {
  /// Called when the view comes on screen
  fn mount(&mut self, posts: &mut CachedPostsClient);

  /// Called when the view leaves the screen
  fn unmount(&mut self, posts: &mut CachedPostsClient);

  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent, posts: &mut CachedPostsClient) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect, posts: &CachedPostsClient);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("q", "quit").with_priority(90)]
  }
}
