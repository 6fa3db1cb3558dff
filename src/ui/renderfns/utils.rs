use crate::query::QueryStatus;
use ratatui::prelude::Color;
use ratatui::widgets::ListState;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for a query status
pub fn status_color(status: QueryStatus) -> Color {
  match status {
    QueryStatus::Success => Color::Green,
    QueryStatus::Loading => Color::Yellow,
    QueryStatus::Error => Color::Red,
    QueryStatus::Idle => Color::DarkGray,
  }
}

/// Keep the list selection inside `0..len`, selecting the first row when
/// nothing is selected yet
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}
