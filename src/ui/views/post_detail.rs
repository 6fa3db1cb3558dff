use crate::posts::{CachedPostsClient, PostId, PostsQueryKey};
use crate::query::QueryStatus;
use crate::router::Navigation;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::post_list::{BACKGROUND_UPDATING_TEXT, LOADING_TEXT};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub const BACK_TEXT: &str = "← Back";

/// View for a single post
pub struct PostDetailView {
  post_id: Option<PostId>,
}

impl PostDetailView {
  pub fn new(post_id: Option<PostId>) -> Self {
    Self { post_id }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect, client: &CachedPostsClient) {
    let result = client.post(self.post_id);

    let title = match self.post_id {
      Some(id) => format!(" Post {} ", id),
      None => " Post ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Min(1),    // Content
        Constraint::Length(1), // Back control
      ])
      .split(inner);

    // Without a selection nothing is fetched, yet this still shows loading
    let loading = self.post_id.is_none()
      || matches!(result.status, QueryStatus::Idle | QueryStatus::Loading);

    if loading {
      let paragraph = Paragraph::new(LOADING_TEXT).style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[0]);
    } else if let Some(error) = result.error().filter(|_| result.is_error()) {
      let paragraph = Paragraph::new(format!("Error: {}", error))
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, chunks[0]);
    } else if let Some(post) = result.data() {
      let mut lines = vec![
        Line::from(Span::styled(
          post.title.clone(),
          Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(Span::styled(
          match post.user_id {
            Some(user) => format!("by user {}", user),
            None => "by unknown author".to_string(),
          },
          Style::default().fg(Color::DarkGray),
        )),
        Line::raw(""),
      ];
      lines.extend(post.body.lines().map(|l| Line::raw(l.to_string())));
      if result.is_background_updating() {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
          BACKGROUND_UPDATING_TEXT,
          Style::default().fg(Color::Yellow),
        )));
      }

      let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
      frame.render_widget(paragraph, chunks[0]);
    }

    let back = Paragraph::new(Line::from(vec![
      Span::styled(BACK_TEXT, Style::default().fg(Color::Cyan)),
      Span::styled(" (esc)", Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(back, chunks[1]);
  }
}

impl View for PostDetailView {
  fn mount(&mut self, posts: &mut CachedPostsClient) {
    posts.subscribe_post(self.post_id);
  }

  fn unmount(&mut self, posts: &mut CachedPostsClient) {
    if let Some(id) = self.post_id {
      posts.unsubscribe(&PostsQueryKey::Post(id));
    }
  }

  fn handle_key(&mut self, key: KeyEvent, posts: &mut CachedPostsClient) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        if let Some(id) = self.post_id {
          posts.refetch(&PostsQueryKey::Post(id));
        }
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Char('b') | KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => {
        ViewAction::Navigate(Navigation::Back)
      }
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, posts: &CachedPostsClient) {
    self.render_detail(frame, area, posts);
  }

  fn breadcrumb_label(&self) -> String {
    match self.post_id {
      Some(id) => format!("Post {}", id),
      None => "Post".to_string(),
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("esc", "back").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::ui::test_support::{buffer_text, has_row};
  use ratatui::backend::TestBackend;

  fn render(view: &mut PostDetailView, client: &CachedPostsClient) -> String {
    let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
    terminal
      .draw(|frame| {
        let area = frame.area();
        view.render(frame, area, client);
      })
      .unwrap();
    buffer_text(terminal.backend().buffer())
  }

  #[test]
  fn test_no_selection_shows_loading_without_fetching() {
    let mut client = CachedPostsClient::new(&Config::default()).unwrap();
    let mut view = PostDetailView::new(None);

    view.mount(&mut client);
    let text = render(&mut view, &client);

    assert!(has_row(&text, "Loading..."));
    assert!(text.contains(BACK_TEXT));
    assert_eq!(client.queries().fetching_count(), 0);
    assert!(client.queries().entries().is_empty());
  }

  #[test]
  fn test_back_keys() {
    let mut client = CachedPostsClient::new(&Config::default()).unwrap();
    let mut view = PostDetailView::new(None);

    for code in [KeyCode::Esc, KeyCode::Backspace, KeyCode::Left, KeyCode::Char('q')] {
      assert_eq!(
        view.handle_key(KeyEvent::from(code), &mut client),
        ViewAction::Navigate(Navigation::Back)
      );
    }
    assert_eq!(
      view.handle_key(KeyEvent::from(KeyCode::Char('x')), &mut client),
      ViewAction::None
    );
  }

  #[test]
  fn test_breadcrumb_label() {
    assert_eq!(PostDetailView::new(Some(4)).breadcrumb_label(), "Post 4");
    assert_eq!(PostDetailView::new(None).breadcrumb_label(), "Post");
  }
}
