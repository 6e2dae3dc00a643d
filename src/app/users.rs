use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use serde_json::Value;

use crate::api::ApiError;
use crate::command::Command;
use crate::hooks::{Hooks, MutationHook};
use crate::models::User;
use crate::query::{QueryKey, QueryResult, QueryState};
use crate::subscription::Subscription;

#[derive(Debug)]
pub enum Message {
    Loaded(QueryResult<Vec<User>>),
    Up,
    Down,
    Refresh,
    DeleteSelected,
    Deleted(Result<Value, ApiError>),
}

pub fn users_key() -> QueryKey {
    QueryKey::from("users")
}

#[derive(Debug)]
pub struct UsersView {
    result: QueryResult<Vec<User>>,
    selected: usize,
    delete: MutationHook<u64, Value>,
}

impl UsersView {
    pub fn new(hooks: &Hooks) -> Self {
        Self {
            result: QueryResult::new(QueryState::Loading),
            selected: 0,
            delete: hooks.delete("/api/users"),
        }
    }

    pub const fn result(&self) -> &QueryResult<Vec<User>> {
        &self.result
    }

    fn len(&self) -> usize {
        self.result.data().map_or(0, Vec::len)
    }

    pub fn update(&mut self, msg: Message, hooks: &Hooks) -> Command<Message> {
        match msg {
            Message::Loaded(result) => {
                self.result = result;
                self.selected = self.selected.min(self.len().saturating_sub(1));
                Command::none()
            }
            Message::Up => {
                self.selected = self.selected.saturating_sub(1);
                Command::none()
            }
            Message::Down => {
                self.selected = (self.selected + 1).min(self.len().saturating_sub(1));
                Command::none()
            }
            Message::Refresh => hooks.queries().refetch(&users_key()),
            Message::DeleteSelected => {
                let id = self
                    .result
                    .data()
                    .and_then(|users| users.get(self.selected))
                    .map(|user| user.id);
                match id {
                    Some(id) => self.delete.mutate(id).map(Message::Deleted),
                    None => Command::none(),
                }
            }
            Message::Deleted(_) => Command::none(),
        }
    }

    pub fn handle_key(key: KeyEvent) -> Option<Message> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Message::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::Down),
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Char('d') | KeyCode::Delete => Some(Message::DeleteSelected),
            _ => None,
        }
    }

    pub fn subscriptions(&self, hooks: &Hooks) -> Vec<Subscription<Message>> {
        vec![
            Subscription::new(hooks.get::<Vec<User>>(users_key(), "/api/users"))
                .map(Message::Loaded),
        ]
    }

    pub fn view(&self, frame: &mut Frame, area: Rect) {
        let title = if self.delete.is_pending() {
            "Users (deleting...)"
        } else {
            "Users  (r: refresh, d: delete)"
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        match &self.result.state {
            QueryState::Idle | QueryState::Loading => {
                frame.render_widget(Paragraph::new("Loading users...").block(block), area);
            }
            QueryState::Error(err) => {
                let error = Paragraph::new(format!("Failed to load users: {err}"))
                    .style(Style::default().fg(Color::Red))
                    .block(block);
                frame.render_widget(error, area);
            }
            QueryState::Success { data, .. } if data.is_empty() => {
                let empty = Paragraph::new("No users found. Add your first user to get started.")
                    .block(block);
                frame.render_widget(empty, area);
            }
            QueryState::Success { data, .. } => {
                let rows = data.iter().map(|user| {
                    Row::new(vec![
                        Cell::from(user.name.clone()),
                        Cell::from(user.role.clone()),
                        Cell::from(user.email.clone()),
                        Cell::from(format!("Joined {}", user.created_at)),
                    ])
                });
                let table = Table::new(
                    rows,
                    [
                        Constraint::Percentage(25),
                        Constraint::Length(10),
                        Constraint::Percentage(35),
                        Constraint::Fill(1),
                    ],
                )
                .header(
                    Row::new(vec!["Name", "Role", "Email", "Created"])
                        .style(Style::default().add_modifier(Modifier::BOLD)),
                )
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .block(block);
                let mut state = TableState::default().with_selected(Some(self.selected));
                frame.render_stateful_widget(table, area, &mut state);
            }
        }
    }
}
