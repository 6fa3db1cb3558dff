pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

const INTRO: &str = "As you visit the posts below, you will notice them in a loading state the \
  first time you load them. However, after you return to this list and open any posts you have \
  already visited again, you will see them load instantly and background refresh right before \
  your eyes! (Point --base-url at a slow server to watch longer loading sequences.)";

const DEVTOOLS_HEIGHT: u16 = 8;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let devtools_height = if app.devtools().is_open() {
    DEVTOOLS_HEIGHT
  } else {
    0
  };

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1),               // Header
      Constraint::Length(4),               // Intro
      Constraint::Min(3),                  // Current view
      Constraint::Length(devtools_height), // Devtools
      Constraint::Length(1),               // Footer
    ])
    .split(frame.area());

  renderfns::draw_header(frame, chunks[0], app.base_url(), &app.shortcuts());

  let intro = Paragraph::new(INTRO)
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(Color::Gray));
  frame.render_widget(intro, chunks[1]);

  app.render_view(frame, chunks[2]);

  if app.devtools().is_open() {
    app
      .devtools()
      .render(frame, chunks[3], app.posts().queries());
  }

  renderfns::draw_footer(
    frame,
    chunks[4],
    &app.breadcrumb(),
    app.posts().queries().fetching_count(),
  );
}

#[cfg(test)]
pub(crate) mod test_support {
  use ratatui::buffer::Buffer;

  /// Flatten a rendered buffer into one line of text per row
  pub fn buffer_text(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut text = String::new();
    for y in area.top()..area.bottom() {
      for x in area.left()..area.right() {
        text.push_str(buffer[(x, y)].symbol());
      }
      text.push('\n');
    }
    text
  }

  /// True if some row, stripped of borders and padding, is exactly `content`
  pub fn has_row(text: &str, content: &str) -> bool {
    text
      .lines()
      .any(|line| line.trim_matches(|c: char| c == '│' || c.is_whitespace()) == content)
  }
}
