use crate::posts::{CachedPostsClient, Post, PostId, PostsQueryKey};
use crate::query::QueryStatus;
use crate::router::Navigation;
use crate::ui::renderfns::{ensure_valid_selection, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::debug;

pub const LOADING_TEXT: &str = "Loading...";
pub const BACKGROUND_UPDATING_TEXT: &str = "Background Updating...";
const VISITED_MARKER: &str = "✓ ";
const UNVISITED_MARKER: &str = "  ";

/// One row of the post list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEntry {
  pub id: PostId,
  pub title: String,
  pub visited: bool,
}

/// Build list rows. Visited state is looked up in the cache on every call,
/// never stored on the view.
pub fn post_entries(posts: &[Post], client: &CachedPostsClient) -> Vec<PostEntry> {
  posts
    .iter()
    .map(|post| PostEntry {
      id: post.id,
      title: post.title.clone(),
      visited: client.is_visited(post.id),
    })
    .collect()
}

/// View listing every post
pub struct PostListView {
  list_state: ListState,
}

impl PostListView {
  pub fn new() -> Self {
    Self {
      list_state: ListState::default(),
    }
  }

  fn selected_id(&self, client: &CachedPostsClient) -> Option<PostId> {
    let result = client.posts();
    let posts = result.data()?;
    let idx = self.list_state.selected()?;
    post_entries(posts, client).get(idx).map(|entry| entry.id)
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect, client: &CachedPostsClient) {
    let result = client.posts();

    let mut block = Block::default()
      .title(" Posts ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if result.is_background_updating() {
      block = block.title_bottom(
        Line::from(format!(" {} ", BACKGROUND_UPDATING_TEXT))
          .right_aligned()
          .style(Style::default().fg(Color::Yellow)),
      );
    }

    match result.status {
      QueryStatus::Idle | QueryStatus::Loading => {
        let paragraph = Paragraph::new(LOADING_TEXT)
          .block(block)
          .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
      }
      QueryStatus::Error => {
        let message = result
          .error()
          .map(|e| e.to_string())
          .unwrap_or_default();
        let paragraph = Paragraph::new(format!("Error: {}", message))
          .block(block)
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, area);
      }
      QueryStatus::Success => {
        let posts = result.data().map(|v| v.as_slice()).unwrap_or(&[]);
        let entries = post_entries(posts, client);
        ensure_valid_selection(&mut self.list_state, entries.len());

        let width = area.width.saturating_sub(8) as usize;
        let items: Vec<ListItem> = entries
          .iter()
          .map(|entry| {
            let (marker, style) = if entry.visited {
              (VISITED_MARKER, Style::default().fg(Color::Magenta))
            } else {
              (UNVISITED_MARKER, Style::default().fg(Color::White))
            };
            ListItem::new(Line::from(vec![
              Span::styled(marker, style),
              Span::styled(truncate(&entry.title, width), style),
            ]))
          })
          .collect();

        let list = List::new(items)
          .block(block)
          .highlight_style(
            Style::default()
              .bg(Color::DarkGray)
              .add_modifier(Modifier::BOLD),
          )
          .highlight_symbol("> ");

        frame.render_stateful_widget(list, area, &mut self.list_state);
      }
    }
  }
}

impl Default for PostListView {
  fn default() -> Self {
    Self::new()
  }
}

impl View for PostListView {
  fn mount(&mut self, posts: &mut CachedPostsClient) {
    posts.subscribe_posts();
  }

  fn unmount(&mut self, posts: &mut CachedPostsClient) {
    posts.unsubscribe(&PostsQueryKey::Posts);
  }

  fn handle_key(&mut self, key: KeyEvent, posts: &mut CachedPostsClient) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('g') | KeyCode::Home => {
        self.list_state.select_first();
      }
      KeyCode::Char('G') | KeyCode::End => {
        self.list_state.select_last();
      }
      KeyCode::Char('r') => {
        posts.refetch(&PostsQueryKey::Posts);
      }
      KeyCode::Enter => {
        if let Some(id) = self.selected_id(posts) {
          debug!(post = id, "post selected");
          return ViewAction::Navigate(Navigation::Select(id));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, posts: &CachedPostsClient) {
    self.render_list(frame, area, posts);
  }

  fn breadcrumb_label(&self) -> String {
    "Posts".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "open").with_priority(10),
      ShortcutInfo::new("j/k", "move").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
