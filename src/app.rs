//! The terminal application: a tab bar, the active screen and a status line.
//!
//! Each screen is a view with its own `Message`, `update` and `view`. The
//! shell routes terminal keys to the active screen, subscribes only to that
//! screen's queries, and shows the most recent notification until it expires.

pub mod data;
pub mod forms;
pub mod home;
pub mod settings;
pub mod users;

use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use tokio::time::Instant;

use crate::application::Application;
use crate::command::{Action, Command};
use crate::config::Settings;
use crate::hooks::Hooks;
use crate::notify::{Level, Notification};
use crate::subscription::Subscription;
use crate::subscription::terminal::TerminalEvents;
use crate::subscription::time::{Tick, Timer};

use self::data::DataView;
use self::forms::FormsView;
use self::home::{HomeView, Outcome};
use self::settings::SettingsView;
use self::users::UsersView;

/// How long a notification stays in the status line.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    #[default]
    Home,
    Data,
    Forms,
    Users,
    Settings,
}

impl Screen {
    pub const ALL: [Self; 5] = [Self::Home, Self::Data, Self::Forms, Self::Users, Self::Settings];

    pub const fn title(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Data => "Data",
            Self::Forms => "Forms",
            Self::Users => "Users",
            Self::Settings => "Settings",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Home => 0,
            Self::Data => 1,
            Self::Forms => 2,
            Self::Users => 3,
            Self::Settings => 4,
        }
    }

    /// Maps `1`..`5` (and `F1`..`F5`) to a screen.
    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }
}

/// Startup input for [`App`].
#[derive(Debug, Clone)]
pub struct AppFlags {
    pub hooks: Hooks,
    pub settings: Settings,
    /// Where the settings screen saves to. `None` when the platform has no
    /// config directory.
    pub settings_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum Message {
    Terminal(Event),
    TerminalError(String),
    Navigate(Screen),
    Notified(Notification),
    Tick(Instant),
    Home(home::Message),
    Data(data::Message),
    Forms(forms::Message),
    Users(users::Message),
    Settings(settings::Message),
    Quit,
}

#[derive(Debug)]
pub struct App {
    hooks: Hooks,
    screen: Screen,
    home: HomeView,
    data: DataView,
    forms: FormsView,
    users: UsersView,
    settings: SettingsView,
    notification: Option<(Notification, Instant)>,
}

impl App {
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref().map(|(n, _)| n)
    }

    pub const fn data(&self) -> &DataView {
        &self.data
    }

    pub const fn forms(&self) -> &FormsView {
        &self.forms
    }

    pub const fn users(&self) -> &UsersView {
        &self.users
    }

    /// Whether printable keys belong to the active screen rather than the
    /// global shortcuts.
    fn captures_text(&self) -> bool {
        match self.screen {
            Screen::Forms => true,
            Screen::Settings => self.settings.captures_text(),
            _ => false,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Message::Quit);
        }
        match key.code {
            KeyCode::F(n) => return Screen::from_number(n).map(Message::Navigate),
            KeyCode::Char('q') if !self.captures_text() => return Some(Message::Quit),
            KeyCode::Char(c @ '1'..='5') if !self.captures_text() => {
                let n = c as u8 - b'0';
                return Screen::from_number(n).map(Message::Navigate);
            }
            _ => {}
        }

        match self.screen {
            Screen::Home => HomeView::handle_key(key).map(Message::Home),
            Screen::Data => DataView::handle_key(key).map(Message::Data),
            Screen::Forms => FormsView::handle_key(key).map(Message::Forms),
            Screen::Users => UsersView::handle_key(key).map(Message::Users),
            Screen::Settings => self.settings.handle_key(key).map(Message::Settings),
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = Screen::ALL
            .iter()
            .enumerate()
            .map(|(i, screen)| format!("{} {}", i + 1, screen.title()));
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("apidesk"))
            .select(self.screen.index())
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let line = match self.notification() {
            Some(note) => {
                let color = match note.level {
                    Level::Success => Color::Green,
                    Level::Error => Color::Red,
                    Level::Info => Color::Cyan,
                };
                Line::from(note.text.clone()).style(Style::default().fg(color))
            }
            None => {
                let hint = if self.captures_text() {
                    "F1-F5: switch screen  Ctrl-C: quit"
                } else {
                    "1-5: switch screen  q: quit"
                };
                Line::from(hint).style(Style::default().fg(Color::DarkGray))
            }
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

impl Application for App {
    type Message = Message;
    type Flags = AppFlags;

    fn new(flags: AppFlags) -> (Self, Command<Message>) {
        let AppFlags {
            hooks,
            settings,
            settings_path,
        } = flags;
        let app = Self {
            screen: Screen::Home,
            home: HomeView::new(),
            data: DataView::new(&hooks),
            forms: FormsView::new(&hooks),
            users: UsersView::new(&hooks),
            settings: SettingsView::new(&hooks, settings, settings_path),
            notification: None,
            hooks,
        };
        (app, Command::none())
    }

    fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Terminal(Event::Key(key)) => match self.handle_key(key) {
                Some(msg) => Command::message(msg),
                None => Command::none(),
            },
            Message::Terminal(_) => Command::none(),
            Message::TerminalError(e) => {
                tracing::error!(error = %e, "terminal event stream failed");
                Command::effect(Action::Quit)
            }
            Message::Navigate(screen) => {
                if screen != self.screen {
                    tracing::debug!(from = ?self.screen, to = ?screen, "navigate");
                    self.screen = screen;
                }
                Command::none()
            }
            Message::Notified(note) => {
                self.notification = Some((note, Instant::now()));
                Command::none()
            }
            Message::Tick(now) => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, shown)| now.saturating_duration_since(*shown) >= NOTIFICATION_TTL)
                {
                    self.notification = None;
                }
                self.hooks.queries().collect_garbage();
                Command::none()
            }
            Message::Home(msg) => match self.home.update(msg) {
                Outcome::Navigate(screen) => Command::message(Message::Navigate(screen)),
                Outcome::Stay => Command::none(),
            },
            Message::Data(msg) => self.data.update(msg, &self.hooks).map(Message::Data),
            Message::Forms(msg) => self.forms.update(msg).map(Message::Forms),
            Message::Users(msg) => self.users.update(msg, &self.hooks).map(Message::Users),
            Message::Settings(msg) => self.settings.update(msg, &self.hooks).map(Message::Settings),
            Message::Quit => Command::effect(Action::Quit),
        }
    }

    fn view(&self, frame: &mut Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        self.render_tabs(frame, chunks[0]);
        match self.screen {
            Screen::Home => self.home.view(frame, chunks[1]),
            Screen::Data => self.data.view(frame, chunks[1]),
            Screen::Forms => self.forms.view(frame, chunks[1]),
            Screen::Users => self.users.view(frame, chunks[1]),
            Screen::Settings => self.settings.view(frame, chunks[1]),
        }
        self.render_status(frame, chunks[2]);
    }

    fn subscriptions(&self) -> Vec<Subscription<Message>> {
        let mut subs = vec![
            Subscription::new(TerminalEvents::new()).map(|result| match result {
                Ok(event) => Message::Terminal(event),
                Err(e) => Message::TerminalError(e.to_string()),
            }),
            Subscription::new(Timer::every(Duration::from_secs(1))).map(|Tick(now)| Message::Tick(now)),
            Subscription::new(self.hooks.notifier().clone()).map(Message::Notified),
        ];

        match self.screen {
            Screen::Data => subs.extend(
                self.data
                    .subscriptions(&self.hooks)
                    .into_iter()
                    .map(|sub| sub.map(Message::Data)),
            ),
            Screen::Users => subs.extend(
                self.users
                    .subscriptions(&self.hooks)
                    .into_iter()
                    .map(|sub| sub.map(Message::Users)),
            ),
            Screen::Home | Screen::Forms | Screen::Settings => {}
        }
        subs
    }
}
