//! Settings screen: API URL, session and version info.
//!
//! A saved URL is written to the settings file and takes effect the next
//! time the application starts.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use serde_json::Value;

use crate::api::{ApiClient, ApiError};
use crate::command::Command;
use crate::config::{ConfigError, Settings};
use crate::hooks::Hooks;
use crate::services::Api;

pub const SAVED_TEXT: &str = "Settings saved successfully!";

#[derive(Debug)]
pub enum Message {
    Edit,
    Input(char),
    Backspace,
    Cancel,
    Save,
    Saved(Result<(), String>),
    Logout,
    LoggedOut(Result<Value, ApiError>),
}

#[derive(Debug)]
pub struct SettingsView {
    settings: Settings,
    path: Option<PathBuf>,
    editing: Option<String>,
    saving: bool,
    api: ApiClient,
}

impl SettingsView {
    pub fn new(hooks: &Hooks, settings: Settings, path: Option<PathBuf>) -> Self {
        Self {
            settings,
            path,
            editing: None,
            saving: false,
            api: hooks.api().clone(),
        }
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// While editing, every printable key belongs to the input.
    pub const fn captures_text(&self) -> bool {
        self.editing.is_some()
    }

    pub fn update(&mut self, msg: Message, hooks: &Hooks) -> Command<Message> {
        match msg {
            Message::Edit => {
                self.editing = Some(self.settings.api_url.clone());
                Command::none()
            }
            Message::Input(c) => {
                if let Some(input) = &mut self.editing {
                    input.push(c);
                }
                Command::none()
            }
            Message::Backspace => {
                if let Some(input) = &mut self.editing {
                    input.pop();
                }
                Command::none()
            }
            Message::Cancel => {
                self.editing = None;
                Command::none()
            }
            Message::Save => self.save(hooks),
            Message::Saved(Ok(())) => {
                self.saving = false;
                hooks.notifier().success(SAVED_TEXT);
                Command::none()
            }
            Message::Saved(Err(err)) => {
                self.saving = false;
                hooks.notifier().error(format!("Failed to save settings: {err}"));
                Command::none()
            }
            Message::Logout => {
                let auth = Api::new(self.api.clone()).auth();
                Command::perform(async move { auth.logout().await }, Message::LoggedOut)
            }
            Message::LoggedOut(result) => {
                if let Err(err) = &result {
                    // The local token is gone either way.
                    tracing::warn!(error = %err, "logout request failed");
                }
                hooks.notifier().info("Logged out");
                Command::none()
            }
        }
    }

    fn save(&mut self, hooks: &Hooks) -> Command<Message> {
        let Some(input) = self.editing.take() else {
            return Command::none();
        };
        let url = input.trim();
        if url.is_empty() {
            hooks.notifier().error("API URL cannot be empty");
            self.editing = Some(input);
            return Command::none();
        }

        self.settings.api_url = url.to_string();
        self.saving = true;

        let settings = self.settings.clone();
        let path = self.path.clone();
        let write = tokio::task::spawn_blocking(move || match path {
            Some(path) => settings.save(path),
            None => Err(ConfigError::NoConfigDir),
        });
        Command::perform(write, |joined| {
            Message::Saved(match joined {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            })
        })
    }

    pub fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        if self.captures_text() {
            return match key.code {
                KeyCode::Enter => Some(Message::Save),
                KeyCode::Esc => Some(Message::Cancel),
                KeyCode::Backspace => Some(Message::Backspace),
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(Message::Input(c))
                }
                _ => None,
            };
        }
        match key.code {
            KeyCode::Char('e') | KeyCode::Enter => Some(Message::Edit),
            KeyCode::Char('l') => Some(Message::Logout),
            _ => None,
        }
    }

    pub fn view(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Length(4), Constraint::Min(0)])
            .split(area);

        let (url, hint) = match &self.editing {
            Some(input) => (format!("{input}_"), "Enter: save  Esc: cancel"),
            None => (self.settings.api_url.clone(), "e: edit"),
        };
        let mut lines = vec![
            Line::from(vec![Span::raw("API URL: "), Span::styled(url, Style::default().fg(Color::Cyan))]),
            Line::from(hint).style(Style::default().fg(Color::DarkGray)),
        ];
        if self.saving {
            lines.push(Line::from("Saving...").style(Style::default().fg(Color::Yellow)));
        } else {
            lines.push(Line::from("Changes apply on next start."));
        }
        let api = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("API"));
        frame.render_widget(api, chunks[0]);

        let session = if self.api.tokens().get().is_some() {
            Line::from("Signed in (l: log out)").style(Style::default().fg(Color::Green))
        } else {
            Line::from("Not signed in")
        };
        let session = Paragraph::new(session).block(Block::default().borders(Borders::ALL).title("Session"));
        frame.render_widget(session, chunks[1]);

        let about = Paragraph::new(vec![
            Line::from(format!("apidesk {}", env!("CARGO_PKG_VERSION"))),
            Line::from(format!("Frame rate: {} fps", self.settings.frame_rate)),
            Line::from(match &self.path {
                Some(path) => format!("Settings file: {}", path.display()),
                None => "Settings file: unavailable".to_string(),
            }),
        ])
        .block(Block::default().borders(Borders::ALL).title("About"));
        frame.render_widget(about, chunks[2]);
    }
}
