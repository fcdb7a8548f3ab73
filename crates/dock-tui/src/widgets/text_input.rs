//! Single-line input over tui-input: the library filter and the download prompts.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};
use unicode_width::UnicodeWidthStr;

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Changed(String),
    Submitted(String),
    Cancelled,
    None,
}

pub struct TextInput {
    input: Input,
    active: bool,
    prompt: String,
    placeholder: String,
}

impl TextInput {
    pub fn new(prompt: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            prompt: prompt.into(),
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_empty(&self) -> bool {
        self.input.value().is_empty()
    }

    /// Esc clears non-empty text first and closes on the second press.
    /// Enter closes and hands back the trimmed value.
    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        match key.code {
            KeyCode::Esc if !self.is_empty() => {
                self.input = Input::default();
                InputAction::Changed(String::new())
            }
            KeyCode::Esc => {
                self.deactivate();
                InputAction::Cancelled
            }
            KeyCode::Enter => {
                self.deactivate();
                InputAction::Submitted(self.text().trim().to_string())
            }
            _ => {
                let before = self.text().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.text() == before {
                    InputAction::None
                } else {
                    InputAction::Changed(self.text().to_string())
                }
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let lead = format!("{} ", self.prompt);
        let lead_w = lead.width() as u16;
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(lead_w + 1) as usize);
        let value = self.input.value();

        let span = if value.is_empty() {
            Span::styled(format!("{}{}", lead, self.placeholder), Style::default().fg(C_MUTED))
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("{}{}", lead, visible), Style::default().fg(C_FILTER_FG))
        };
        frame.render_widget(
            Paragraph::new(Line::from(span)).style(Style::default().bg(C_FILTER_BG)),
            area,
        );

        if self.active {
            let cursor = area.x + lead_w + self.input.visual_cursor().saturating_sub(scroll) as u16;
            frame.set_cursor_position((cursor.min(area.x + area.width - 1), area.y));
        }
    }
}
