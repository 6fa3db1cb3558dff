use crate::posts::cached_client::PostsQueries;
use crate::query::QueryKey;
use crate::ui::renderfns::status_color;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Row, Table};

/// Panel listing every query in the cache, like the devtools of web query
/// libraries: key, status, freshness, observers, last update.
pub struct QueryDevtools {
  open: bool,
}

impl QueryDevtools {
  pub fn new(open: bool) -> Self {
    Self { open }
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  pub fn toggle(&mut self) {
    self.open = !self.open;
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, queries: &PostsQueries) {
    let entries = queries.entries();
    let stale_ms = queries.config().stale_time.as_millis();

    let header = Row::new(["Query", "Status", "State", "Observers", "Updated"])
      .style(Style::default().fg(Color::DarkGray).bold());

    let rows: Vec<Row> = entries
      .iter()
      .map(|entry| {
        let state = if entry.is_fetching {
          ("fetching", Color::Blue)
        } else if entry.observers == 0 {
          ("inactive", Color::DarkGray)
        } else if entry.is_stale {
          ("stale", Color::Yellow)
        } else {
          ("fresh", Color::Green)
        };
        let updated = entry
          .updated_at
          .map(|t| t.format("%H:%M:%S").to_string())
          .unwrap_or_else(|| "-".to_string());

        Row::new(vec![
          Cell::from(entry.key.description()),
          Cell::from(entry.status.label()).style(Style::default().fg(status_color(entry.status))),
          Cell::from(state.0).style(Style::default().fg(state.1)),
          Cell::from(entry.observers.to_string()),
          Cell::from(updated),
        ])
      })
      .collect();

    let block = Block::default()
      .title(format!(" Queries ({}) · stale after {}ms ", entries.len(), stale_ms))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray));

    let table = Table::new(
      rows,
      [
        Constraint::Min(14),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(9),
      ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
  }
}
