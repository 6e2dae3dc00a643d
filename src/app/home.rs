use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use super::Screen;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Up,
    Down,
    Open,
}

/// What the menu asks of the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stay,
    Navigate(Screen),
}

const ENTRIES: [(Screen, &str); 4] = [
    (Screen::Data, "Browse, refresh and delete paginated data"),
    (Screen::Forms, "Submit the validated contact form"),
    (Screen::Users, "List and manage users"),
    (Screen::Settings, "API URL, session and version"),
];

#[derive(Debug, Default)]
pub struct HomeView {
    selected: usize,
}

impl HomeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Screen {
        ENTRIES[self.selected].0
    }

    pub fn update(&mut self, msg: Message) -> Outcome {
        match msg {
            Message::Up => {
                self.selected = self.selected.saturating_sub(1);
                Outcome::Stay
            }
            Message::Down => {
                self.selected = (self.selected + 1).min(ENTRIES.len() - 1);
                Outcome::Stay
            }
            Message::Open => Outcome::Navigate(self.selected()),
        }
    }

    pub fn handle_key(key: KeyEvent) -> Option<Message> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Message::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::Down),
            KeyCode::Enter => Some(Message::Open),
            _ => None,
        }
    }

    pub fn view(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(area);

        let welcome = Paragraph::new(vec![
            Line::from("Welcome to apidesk").style(Style::default().add_modifier(Modifier::BOLD)),
            Line::from("A terminal client for the data, forms and users API."),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Home"));
        frame.render_widget(welcome, chunks[0]);

        let items: Vec<ListItem> = ENTRIES
            .iter()
            .map(|(screen, blurb)| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<10}", screen.title()), Style::default().fg(Color::Cyan)),
                    Span::raw(*blurb),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Go to (Enter)"))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_navigation() {
        let mut home = HomeView::new();
        assert_eq!(home.update(Message::Up), Outcome::Stay);
        assert_eq!(home.selected(), Screen::Data);

        for _ in 0..10 {
            home.update(Message::Down);
        }
        assert_eq!(home.selected(), Screen::Settings);
        assert_eq!(home.update(Message::Open), Outcome::Navigate(Screen::Settings));
    }
}
