//! The validated contact form.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use serde_json::Value;

use crate::api::ApiError;
use crate::command::Command;
use crate::forms::{Field, FormDraft, FormSubmission, ValidationErrors};
use crate::hooks::{Hooks, MutationHook};

pub const SUBMITTED_TEXT: &str = "Form submitted successfully!";

#[derive(Debug)]
pub enum Message {
    Input(char),
    Backspace,
    NextField,
    PrevField,
    Submit,
    Reset,
    Submitted(Result<Value, ApiError>),
}

#[derive(Debug)]
pub struct FormsView {
    draft: FormDraft,
    focus: Field,
    errors: ValidationErrors,
    submit: MutationHook<FormSubmission, Value>,
}

impl FormsView {
    pub fn new(hooks: &Hooks) -> Self {
        let notifier = hooks.notifier().clone();
        Self {
            draft: FormDraft::default(),
            focus: Field::Name,
            errors: ValidationErrors::default(),
            submit: hooks
                .post("/api/submit")
                .on_success(move |_: &Value| notifier.success(SUBMITTED_TEXT)),
        }
    }

    pub const fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub const fn focus(&self) -> Field {
        self.focus
    }

    pub fn is_submitting(&self) -> bool {
        self.submit.is_pending()
    }

    pub fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Input(c) => {
                self.draft.value_mut(self.focus).push(c);
                Command::none()
            }
            Message::Backspace => {
                self.draft.value_mut(self.focus).pop();
                Command::none()
            }
            Message::NextField => {
                self.focus = self.focus.next();
                Command::none()
            }
            Message::PrevField => {
                self.focus = self.focus.prev();
                Command::none()
            }
            Message::Submit => {
                if self.submit.is_pending() {
                    return Command::none();
                }
                match self.draft.parse() {
                    Ok(form) => {
                        self.errors = ValidationErrors::default();
                        tracing::debug!(name = %form.name, "submitting form");
                        self.submit.mutate(form).map(Message::Submitted)
                    }
                    Err(errors) => {
                        self.errors = errors;
                        Command::none()
                    }
                }
            }
            Message::Reset => {
                self.reset();
                Command::none()
            }
            Message::Submitted(Ok(_)) => {
                self.reset();
                Command::none()
            }
            // The hook already reported the failure; keep the input.
            Message::Submitted(Err(_)) => Command::none(),
        }
    }

    fn reset(&mut self) {
        self.draft.clear();
        self.errors = ValidationErrors::default();
        self.focus = Field::Name;
    }

    pub fn handle_key(key: KeyEvent) -> Option<Message> {
        match key.code {
            KeyCode::Tab | KeyCode::Down => Some(Message::NextField),
            KeyCode::BackTab | KeyCode::Up => Some(Message::PrevField),
            KeyCode::Enter => Some(Message::Submit),
            KeyCode::Esc => Some(Message::Reset),
            KeyCode::Backspace => Some(Message::Backspace),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Message::Input(c))
            }
            _ => None,
        }
    }

    pub fn view(&self, frame: &mut Frame, area: Rect) {
        let outer = Block::default()
            .borders(Borders::ALL)
            .title("Modern Form with Validation  (Tab: next field, Enter: submit, Esc: reset)");
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(4),
                Constraint::Length(4),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(inner);

        for (field, area) in Field::ALL.into_iter().zip(rows.iter().copied()) {
            self.render_field(frame, field, area);
        }

        let status = if self.submit.is_pending() {
            Line::from("Submitting...").style(Style::default().fg(Color::Yellow))
        } else {
            Line::from("")
        };
        frame.render_widget(Paragraph::new(status), rows[4]);
    }

    fn render_field(&self, frame: &mut Frame, field: Field, area: Rect) {
        let focused = field == self.focus;
        let error = self.errors.get(field);

        let border = match (focused, error) {
            (_, Some(_)) => Style::default().fg(Color::Red),
            (true, None) => Style::default().fg(Color::Cyan),
            (false, None) => Style::default(),
        };
        let cursor = if focused { "_" } else { "" };

        let mut lines = vec![Line::from(format!("{}{cursor}", self.draft.value(field)))];
        if let Some(message) = error {
            lines.push(Line::from(message.to_string()).style(Style::default().fg(Color::Red)));
        }

        let input = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).border_style(border).title(field.label()));
        frame.render_widget(input, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockResponse, MockTransport};
    use crate::api::{ApiClient, MemoryTokenStore};
    use crate::notify::Notifier;
    use crate::query::QueryClient;
    use reqwest::Method;
    use serde_json::json;

    fn setup() -> (MockTransport, Hooks, FormsView) {
        let transport = MockTransport::new();
        let hooks = Hooks::new(
            ApiClient::new(transport.clone(), MemoryTokenStore::new()),
            QueryClient::new(),
            Notifier::new(),
        );
        let view = FormsView::new(&hooks);
        (transport, hooks, view)
    }

    fn type_text(view: &mut FormsView, text: &str) {
        for c in text.chars() {
            let _ = view.update(Message::Input(c));
        }
    }

    fn fill(view: &mut FormsView, age: &str) {
        type_text(view, "Ada");
        let _ = view.update(Message::NextField);
        type_text(view, "ada@example.com");
        let _ = view.update(Message::NextField);
        type_text(view, age);
        let _ = view.update(Message::NextField);
        type_text(view, "Hello there, world");
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let (transport, _hooks, mut view) = setup();
        fill(&mut view, "17");

        let cmd = view.update(Message::Submit);

        assert!(cmd.is_none());
        assert!(view.errors().get(Field::Age).is_some_and(|m| m.contains("18")));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_valid_form_posts_once_and_resets() {
        let (transport, hooks, mut view) = setup();
        transport.respond(Method::POST, "/api/submit", MockResponse::json(200, json!({"ok": true})));
        let mut notes = hooks.notifier().subscribe();
        fill(&mut view, "18");

        let results = view.update(Message::Submit).collect_messages().await;
        for msg in results {
            let _ = view.update(msg);
        }

        let sent = transport.requests_to(&Method::POST, "/api/submit");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].json_body(),
            Some(&json!({
                "name": "Ada",
                "email": "ada@example.com",
                "age": 18,
                "message": "Hello there, world"
            }))
        );
        assert_eq!(view.draft(), &FormDraft::default());

        let first = notes.recv().await.map(|n| n.text).ok();
        let second = notes.recv().await.map(|n| n.text).ok();
        assert_eq!(first.as_deref(), Some("Operation successful!"));
        assert_eq!(second.as_deref(), Some(SUBMITTED_TEXT));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_input() {
        let (transport, _hooks, mut view) = setup();
        transport.respond(Method::POST, "/api/submit", MockResponse::empty(500));
        fill(&mut view, "30");

        let results = view.update(Message::Submit).collect_messages().await;
        for msg in results {
            let _ = view.update(msg);
        }

        assert_eq!(view.draft().name, "Ada");
        assert_eq!(view.draft().age, "30");
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let (_transport, _hooks, mut view) = setup();
        type_text(&mut view, "Bo");
        let _ = view.update(Message::PrevField);
        type_text(&mut view, "hi");
        let _ = view.update(Message::Backspace);

        assert_eq!(view.draft().name, "Bo");
        assert_eq!(view.draft().message, "h");
        assert_eq!(view.focus(), Field::Message);
    }

    #[test]
    fn test_control_chars_are_not_typed() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(FormsView::handle_key(key).is_none());
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(matches!(FormsView::handle_key(key), Some(Message::Input('q'))));
    }
}
