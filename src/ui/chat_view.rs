// ABOUTME: Chat screen layout, rendering and key handling
// Sidebar with key and model, transcript bubbles with per-turn cost, prompt box

use crate::app::state::{Notice, Session};
use crate::chat::transcript::Role;
use crate::utils::cost_calculator::CostCalculator;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub const API_KEY_URL: &str = "https://platform.openai.com/account/api-keys";

const SIDEBAR_WIDTH: u16 = 34;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Prompt,
    ApiKey,
    Model,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Prompt => Focus::ApiKey,
            Focus::ApiKey => Focus::Model,
            Focus::Model => Focus::Prompt,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Prompt => Focus::Model,
            Focus::ApiKey => Focus::Prompt,
            Focus::Model => Focus::ApiKey,
        }
    }
}

/// What the event loop should do in response to a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    None,
    Submit(String),
    SetApiKey(String),
    SelectModel(String),
    NewSession,
    Quit,
}

pub struct ChatView {
    models: Vec<String>,
    focus: Focus,
    prompt: String,
    key_input: String,
    model_index: usize,
    scroll_back: u16,
    show_help: bool,
    pending: Option<String>,
}

impl ChatView {
    pub fn new(models: Vec<String>, selected_model: &str) -> Self {
        let model_index = models.iter().position(|m| m == selected_model).unwrap_or(0);
        Self {
            models,
            focus: Focus::Prompt,
            prompt: String::new(),
            key_input: String::new(),
            model_index,
            scroll_back: 0,
            show_help: false,
            pending: None,
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.models.get(self.model_index).map(String::as_str)
    }

    /// Prompt shown while its completion call is in flight
    pub fn set_pending(&mut self, pending: Option<String>) {
        self.pending = pending;
        self.scroll_back = 0;
    }

    pub fn render(&self, frame: &mut Frame, session: &Session) {
        let size = frame.size();

        // Main layout: header, body, footer
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Header
                Constraint::Min(0),    // Body
                Constraint::Length(3), // Footer
            ])
            .split(size);

        self.render_header(frame, chunks[0], session);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(chunks[1]);

        self.render_sidebar(frame, body[0], session);
        self.render_conversation(frame, body[1], session);
        self.render_footer(frame, chunks[2], session);

        if self.show_help {
            self.render_help_overlay(frame, size);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let text = vec![
            Line::from(Span::styled(
                "Chatbot",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("A chatbot powered by OpenAI ({})", session.selected_model()),
                Style::default().fg(Color::Gray),
            )),
        ];

        let header = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Blue)),
            )
            .alignment(Alignment::Center);

        frame.render_widget(header, area);
    }

    fn render_sidebar(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // API key
                Constraint::Length(3), // Key link
                Constraint::Min(3),    // Model list
            ])
            .split(area);

        let key_text = if self.focus == Focus::ApiKey {
            format!("{}▏", "•".repeat(self.key_input.chars().count()))
        } else {
            match &session.settings.api_key {
                Some(key) => key.masked(),
                None => "(not set)".to_string(),
            }
        };

        let key_field = Paragraph::new(key_text).block(
            Block::default()
                .title("OpenAI API Key")
                .borders(Borders::ALL)
                .border_style(self.border_style(Focus::ApiKey)),
        );
        frame.render_widget(key_field, chunks[0]);

        let link = Paragraph::new(Line::from(vec![
            Span::raw("Get an OpenAI API key: "),
            Span::styled(API_KEY_URL, Style::default().fg(Color::Cyan)),
        ]))
        .wrap(Wrap { trim: true });
        frame.render_widget(link, chunks[1]);

        let items: Vec<ListItem> = self
            .models
            .iter()
            .map(|m| ListItem::new(m.as_str()))
            .collect();
        let mut list_state = ListState::default().with_selected(Some(self.model_index));

        let list = List::new(items)
            .block(
                Block::default()
                    .title("Select Model")
                    .borders(Borders::ALL)
                    .border_style(self.border_style(Focus::Model)),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        frame.render_stateful_widget(list, chunks[2], &mut list_state);
    }

    fn render_conversation(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Transcript
                Constraint::Length(1), // Notice
                Constraint::Length(3), // Prompt
            ])
            .split(area);

        let lines = transcript_lines(session, self.pending.as_deref());

        let transcript = Paragraph::new(lines)
            .block(Block::default().title("Conversation").borders(Borders::ALL))
            .wrap(Wrap { trim: false });

        // Stick to the bottom unless the user scrolled back
        let inner_width = chunks[0].width.saturating_sub(2);
        let inner_height = chunks[0].height.saturating_sub(2);
        let offset = wrapped_height(&transcript, inner_width)
            .saturating_sub(inner_height)
            .saturating_sub(self.scroll_back);

        frame.render_widget(transcript.scroll((offset, 0)), chunks[0]);

        if let Some(notice) = &session.notice {
            let color = match notice {
                Notice::Info(_) => Color::Yellow,
                Notice::Error(_) => Color::Red,
            };
            let notice_line = Paragraph::new(notice.text().to_string())
                .style(Style::default().fg(color));
            frame.render_widget(notice_line, chunks[1]);
        }

        let prompt_title = if self.pending.is_some() {
            "Waiting for reply..."
        } else {
            "Message"
        };
        let prompt = Paragraph::new(self.prompt.as_str()).block(
            Block::default()
                .title(prompt_title)
                .borders(Borders::ALL)
                .border_style(self.border_style(Focus::Prompt)),
        );
        frame.render_widget(prompt, chunks[2]);

        if self.focus == Focus::Prompt && !self.show_help {
            let typed = u16::try_from(self.prompt.chars().count()).unwrap_or(u16::MAX);
            let cursor_x = chunks[2].x.saturating_add(1).saturating_add(typed);
            frame.set_cursor(
                cursor_x.min(chunks[2].right().saturating_sub(2)),
                chunks[2].y + 1,
            );
        }
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let last = session
            .last_cost()
            .map(|c| c.formatted())
            .unwrap_or_else(|| "-".to_string());

        let spans = vec![
            Span::styled("Session: ", Style::default().fg(Color::Cyan)),
            Span::styled(
                CostCalculator::format_cost(session.total_cost()),
                Style::default().fg(Color::Green),
            ),
            Span::raw(" | "),
            Span::styled("Last turn: ", Style::default().fg(Color::Cyan)),
            Span::raw(last),
            Span::raw(" | "),
            Span::raw(format!("{} turns", session.costs.len())),
            Span::raw(" | "),
            Span::styled(
                "Tab focus · F1 help · Ctrl-N new · Esc quit",
                Style::default().fg(Color::DarkGray),
            ),
        ];

        let footer = Paragraph::new(Line::from(spans))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .alignment(Alignment::Center);

        frame.render_widget(footer, area);
    }

    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(60, 12, area);
        let text = vec![
            Line::from("Tab / Shift-Tab   move between message, key and model"),
            Line::from("Enter             send message / save API key"),
            Line::from("Up / Down         choose model (model list focused)"),
            Line::from("PageUp / PageDown scroll the conversation"),
            Line::from("Ctrl-N            start a new session"),
            Line::from("F1                toggle this help"),
            Line::from("Esc / Ctrl-C      quit"),
        ];

        let help = Paragraph::new(text).block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );

        frame.render_widget(Clear, popup);
        frame.render_widget(help, popup);
    }

    fn border_style(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => return ViewAction::Quit,
            KeyCode::Char('n') if ctrl => {
                self.scroll_back = 0;
                return ViewAction::NewSession;
            }
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                    return ViewAction::None;
                }
                return ViewAction::Quit;
            }
            KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return ViewAction::None;
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return ViewAction::None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return ViewAction::None;
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(5);
                return ViewAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(5);
                return ViewAction::None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Prompt => match key.code {
                KeyCode::Char(c) if !ctrl => {
                    self.prompt.push(c);
                    ViewAction::None
                }
                KeyCode::Backspace => {
                    self.prompt.pop();
                    ViewAction::None
                }
                KeyCode::Enter => {
                    if self.prompt.trim().is_empty() {
                        ViewAction::None
                    } else {
                        ViewAction::Submit(std::mem::take(&mut self.prompt))
                    }
                }
                _ => ViewAction::None,
            },
            Focus::ApiKey => match key.code {
                KeyCode::Char(c) if !ctrl => {
                    self.key_input.push(c);
                    ViewAction::None
                }
                KeyCode::Backspace => {
                    self.key_input.pop();
                    ViewAction::None
                }
                KeyCode::Enter => {
                    self.focus = Focus::Prompt;
                    ViewAction::SetApiKey(std::mem::take(&mut self.key_input))
                }
                _ => ViewAction::None,
            },
            Focus::Model => {
                let previous = self.model_index;
                match key.code {
                    KeyCode::Up => self.model_index = self.model_index.saturating_sub(1),
                    KeyCode::Down => {
                        if self.model_index + 1 < self.models.len() {
                            self.model_index += 1;
                        }
                    }
                    KeyCode::Enter => self.focus = Focus::Prompt,
                    _ => {}
                }
                match self.selected_model() {
                    Some(model) if self.model_index != previous => {
                        ViewAction::SelectModel(model.to_string())
                    }
                    _ => ViewAction::None,
                }
            }
        }
    }
}

/// Role-tagged bubbles, each assistant reply followed by its cost line
pub fn transcript_lines(session: &Session, pending: Option<&str>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for (index, message) in session.transcript.iter().enumerate() {
        push_bubble(&mut lines, message.role, &message.content);

        if let Some(turn) = session.cost_for_message(index) {
            lines.push(Line::from(Span::styled(
                format!(
                    "  {} · {} · {} in / {} out",
                    turn.formatted(),
                    turn.model,
                    turn.usage.input_tokens,
                    turn.usage.output_tokens
                ),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::from(""));
    }

    if let Some(prompt) = pending {
        push_bubble(&mut lines, Role::User, prompt);
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Assistant is thinking...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn push_bubble(lines: &mut Vec<Line<'static>>, role: Role, content: &str) {
    let color = match role {
        Role::System => Color::Magenta,
        Role::User => Color::Cyan,
        Role::Assistant => Color::Green,
    };

    lines.push(Line::from(Span::styled(
        role.display_name().to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    for text in content.lines() {
        lines.push(Line::from(format!("  {}", text)));
    }
}

/// Rows the paragraph occupies once word-wrapped to `width`, borders excluded
fn wrapped_height(paragraph: &Paragraph, width: u16) -> u16 {
    u16::try_from(paragraph.line_count(width)).unwrap_or(u16::MAX)
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
