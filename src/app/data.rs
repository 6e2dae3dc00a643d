//! Paginated data list with refresh and delete.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use serde_json::Value;

use crate::api::ApiError;
use crate::command::Command;
use crate::hooks::{Hooks, MutationHook};
use crate::models::{DataItem, Page};
use crate::query::{QueryKey, QueryResult, QueryState};
use crate::subscription::Subscription;

#[derive(Debug)]
pub enum Message {
    Loaded(u32, QueryResult<Page<DataItem>>),
    Up,
    Down,
    PrevPage,
    NextPage,
    Refresh,
    DeleteSelected,
    Deleted(Result<Value, ApiError>),
}

pub fn page_key(page: u32) -> QueryKey {
    QueryKey::from("data").with(page)
}

pub fn page_path(page: u32) -> String {
    format!("/api/data?page={page}")
}

#[derive(Debug)]
pub struct DataView {
    page: u32,
    result: QueryResult<Page<DataItem>>,
    selected: usize,
    delete: MutationHook<u64, Value>,
}

impl DataView {
    pub fn new(hooks: &Hooks) -> Self {
        Self {
            page: 1,
            result: QueryResult::new(QueryState::Loading),
            selected: 0,
            delete: hooks.delete("/api/data"),
        }
    }

    pub const fn page(&self) -> u32 {
        self.page
    }

    pub const fn result(&self) -> &QueryResult<Page<DataItem>> {
        &self.result
    }

    pub const fn selected(&self) -> usize {
        self.selected
    }

    /// Next is only offered while the current page has items.
    pub fn can_go_next(&self) -> bool {
        self.result.data().is_some_and(|page| !page.is_empty())
    }

    fn items(&self) -> &[DataItem] {
        self.result
            .data()
            .map(|page| page.items.as_slice())
            .unwrap_or_default()
    }

    fn go_to(&mut self, page: u32) {
        if page != self.page {
            self.page = page;
            self.selected = 0;
            self.result = QueryResult::new(QueryState::Loading);
        }
    }

    pub fn update(&mut self, msg: Message, hooks: &Hooks) -> Command<Message> {
        match msg {
            Message::Loaded(page, result) => {
                // Late results from a page we already left are dropped.
                if page == self.page {
                    self.result = result;
                    self.selected = self.selected.min(self.items().len().saturating_sub(1));
                }
                Command::none()
            }
            Message::Up => {
                self.selected = self.selected.saturating_sub(1);
                Command::none()
            }
            Message::Down => {
                self.selected = (self.selected + 1).min(self.items().len().saturating_sub(1));
                Command::none()
            }
            Message::PrevPage => {
                self.go_to(self.page.saturating_sub(1).max(1));
                Command::none()
            }
            Message::NextPage => {
                if self.can_go_next() {
                    self.go_to(self.page + 1);
                }
                Command::none()
            }
            Message::Refresh => hooks.queries().refetch(&page_key(self.page)),
            Message::DeleteSelected => match self.items().get(self.selected) {
                Some(item) => self.delete.mutate(item.id).map(Message::Deleted),
                None => Command::none(),
            },
            Message::Deleted(_) => Command::none(),
        }
    }

    pub fn handle_key(key: KeyEvent) -> Option<Message> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Message::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::Down),
            KeyCode::Left | KeyCode::Char('p') => Some(Message::PrevPage),
            KeyCode::Right | KeyCode::Char('n') => Some(Message::NextPage),
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Char('d') | KeyCode::Delete => Some(Message::DeleteSelected),
            _ => None,
        }
    }

    pub fn subscriptions(&self, hooks: &Hooks) -> Vec<Subscription<Message>> {
        let page = self.page;
        vec![
            Subscription::new(hooks.get::<Page<DataItem>>(page_key(page), page_path(page)))
                .map(move |result| Message::Loaded(page, result)),
        ]
    }

    pub fn view(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);

        let mut title = String::from("Data Management");
        if self.result.is_stale() {
            title.push_str(" (refreshing...)");
        }
        if self.delete.is_pending() {
            title.push_str(" (deleting...)");
        }
        let block = Block::default().borders(Borders::ALL).title(title);

        match &self.result.state {
            QueryState::Idle | QueryState::Loading => {
                frame.render_widget(Paragraph::new("Loading data...").block(block), chunks[0]);
            }
            QueryState::Error(err) => {
                let text = format!("Failed to load data: {err}");
                let error = Paragraph::new(text).style(Style::default().fg(Color::Red)).block(block);
                frame.render_widget(error, chunks[0]);
            }
            QueryState::Success { data, .. } if data.is_empty() => {
                let empty = Paragraph::new("No data available on this page.").block(block);
                frame.render_widget(empty, chunks[0]);
            }
            QueryState::Success { data, .. } => {
                let items: Vec<ListItem> = data
                    .items
                    .iter()
                    .map(|item| {
                        ListItem::new(format!(
                            "#{:<4} {:<24} {}  ({})",
                            item.id, item.name, item.description, item.created_at
                        ))
                    })
                    .collect();
                let list = List::new(items)
                    .block(block)
                    .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                    .highlight_symbol("> ");
                let mut state = ListState::default().with_selected(Some(self.selected));
                frame.render_stateful_widget(list, chunks[0], &mut state);
            }
        }

        let prev = if self.page > 1 { "← prev" } else { "      " };
        let next = if self.can_go_next() { "next →" } else { "      " };
        let footer = format!("{prev}   Page {}   {next}   r: refresh  d: delete", self.page);
        frame.render_widget(Paragraph::new(footer).alignment(Alignment::Center), chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::{ApiClient, MemoryTokenStore};
    use crate::notify::Notifier;
    use crate::query::QueryClient;

    fn hooks() -> Hooks {
        Hooks::new(
            ApiClient::new(MockTransport::new(), MemoryTokenStore::new()),
            QueryClient::new(),
            Notifier::new(),
        )
    }

    fn page_of(n: u64) -> QueryResult<Page<DataItem>> {
        let items = (1..=n)
            .map(|id| DataItem {
                id,
                name: format!("item {id}"),
                description: String::new(),
                created_at: String::new(),
            })
            .collect();
        QueryResult::new(QueryState::Success {
            data: Page {
                items,
                total: None,
                page: None,
                per_page: None,
            },
            is_stale: false,
        })
    }

    #[test]
    fn test_prev_never_goes_below_one() {
        let hooks = hooks();
        let mut view = DataView::new(&hooks);
        let _ = view.update(Message::PrevPage, &hooks);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_next_requires_items() {
        let hooks = hooks();
        let mut view = DataView::new(&hooks);

        let _ = view.update(Message::NextPage, &hooks);
        assert_eq!(view.page(), 1, "loading page has no next");

        let _ = view.update(Message::Loaded(1, page_of(0)), &hooks);
        let _ = view.update(Message::NextPage, &hooks);
        assert_eq!(view.page(), 1, "empty page has no next");

        let _ = view.update(Message::Loaded(1, page_of(3)), &hooks);
        let _ = view.update(Message::NextPage, &hooks);
        assert_eq!(view.page(), 2);
        assert!(view.result().is_loading());
    }

    #[test]
    fn test_stale_page_results_are_ignored() {
        let hooks = hooks();
        let mut view = DataView::new(&hooks);
        let _ = view.update(Message::Loaded(1, page_of(2)), &hooks);
        let _ = view.update(Message::NextPage, &hooks);

        let _ = view.update(Message::Loaded(1, page_of(5)), &hooks);

        assert!(view.result().is_loading());
    }

    #[test]
    fn test_selection_is_clamped() {
        let hooks = hooks();
        let mut view = DataView::new(&hooks);
        let _ = view.update(Message::Loaded(1, page_of(2)), &hooks);

        for _ in 0..5 {
            let _ = view.update(Message::Down, &hooks);
        }
        assert_eq!(view.selected(), 1);

        let _ = view.update(Message::Loaded(1, page_of(1)), &hooks);
        assert_eq!(view.selected(), 0);
    }

    #[test]
    fn test_delete_without_items_does_nothing() {
        let hooks = hooks();
        let mut view = DataView::new(&hooks);
        assert!(view.update(Message::DeleteSelected, &hooks).is_none());
    }

    #[test]
    fn test_page_keys_differ() {
        assert_ne!(page_key(1), page_key(2));
        assert_eq!(page_path(2), "/api/data?page=2");
    }
}
