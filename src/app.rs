use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::posts::CachedPostsClient;
use crate::query::QueryKey;
use crate::router::{Navigation, Route};
use crate::ui;
use crate::ui::components::QueryDevtools;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{PostDetailView, PostListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use tracing::{debug, info};

/// Main application state
pub struct App {
  config: Config,

  /// Query cache and HTTP client, handed to views on every call
  posts: CachedPostsClient,

  /// Which view is on screen
  route: Route,

  /// Kept across navigation so the cursor survives a round trip
  list: PostListView,

  /// Present while `route` is `Detail`
  detail: Option<PostDetailView>,

  devtools: QueryDevtools,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let posts = CachedPostsClient::new(&config)?;
    let devtools = QueryDevtools::new(config.ui.devtools_open);

    Ok(Self {
      config,
      posts,
      route: Route::default(),
      list: PostListView::new(),
      detail: None,
      devtools,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(self.config.tick_rate());
    self.start();

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      tokio::select! {
        event = events.next() => match event {
          Some(event) => self.handle_event(event),
          None => self.should_quit = true,
        },
        key = self.posts.queries_mut().next_update() => {
          debug!(query = %key.description(), "query updated");
        }
      }
    }

    info!("shutting down");
    Ok(())
  }

  /// Mount the initial route
  pub fn start(&mut self) {
    info!(base_url = self.posts.base_url(), "starting on post list");
    self.list.mount(&mut self.posts);
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize => {} // Redrawn on the next loop iteration
      Event::Tick => {
        let queries = self.posts.queries_mut();
        queries.poll();
        let collected = queries.collect_garbage();
        if collected > 0 {
          debug!(collected, "collected inactive queries");
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
        return;
      }
      KeyCode::Char('d') => {
        self.devtools.toggle();
        return;
      }
      _ => {}
    }

    let action = match (self.route, self.detail.as_mut()) {
      (Route::Detail(_), Some(detail)) => detail.handle_key(key, &mut self.posts),
      _ => self.list.handle_key(key, &mut self.posts),
    };

    match action {
      ViewAction::None => {}
      ViewAction::Navigate(nav) => self.navigate(nav),
      ViewAction::Quit => self.should_quit = true,
    }
  }

  /// Apply a navigation intent: unmount the outgoing view, mount the new one.
  fn navigate(&mut self, nav: Navigation) {
    let next = self.route.transition(nav);
    if next == self.route {
      return;
    }
    info!(from = ?self.route, to = ?next, "navigate");

    match (self.route, self.detail.as_mut()) {
      (Route::Detail(_), Some(detail)) => detail.unmount(&mut self.posts),
      _ => self.list.unmount(&mut self.posts),
    }

    self.route = next;
    match next {
      Route::List => {
        self.detail = None;
        self.list.mount(&mut self.posts);
      }
      Route::Detail(id) => {
        let mut detail = PostDetailView::new(Some(id));
        detail.mount(&mut self.posts);
        self.detail = Some(detail);
      }
    }
  }

  fn current_view(&self) -> &dyn View {
    match (self.route, self.detail.as_ref()) {
      (Route::Detail(_), Some(detail)) => detail as &dyn View,
      _ => &self.list as &dyn View,
    }
  }

  // Accessors for UI rendering

  pub fn render_view(&mut self, frame: &mut Frame, area: Rect) {
    match (self.route, self.detail.as_mut()) {
      (Route::Detail(_), Some(detail)) => detail.render(frame, area, &self.posts),
      _ => self.list.render(frame, area, &self.posts),
    }
  }

  pub fn posts(&self) -> &CachedPostsClient {
    &self.posts
  }

  pub fn devtools(&self) -> &QueryDevtools {
    &self.devtools
  }

  pub fn base_url(&self) -> &str {
    self.posts.base_url()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    match self.route {
      Route::List => vec![self.list.breadcrumb_label()],
      Route::Detail(_) => vec![
        self.list.breadcrumb_label(),
        self.current_view().breadcrumb_label(),
      ],
    }
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = self.current_view().shortcuts();
    shortcuts.push(ShortcutInfo::new("d", "devtools").with_priority(80));
    shortcuts
  }
}
