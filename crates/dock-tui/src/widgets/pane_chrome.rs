//! Bordered pane with focus styling and an optional right-hand badge.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

use crate::theme::{style_border, C_KEY_HINT, C_MUTED, C_PRIMARY};

/// Short tag in the top-right of a pane header, e.g. a count or "OFFLINE".
pub struct Badge {
    pub text: String,
    pub color: Color,
}

impl Badge {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// `[key] title` block, border highlighted when focused.
pub fn pane_chrome<'a>(title: &'a str, hint: Option<&'a str>, focused: bool, badge: Option<Badge>) -> Block<'a> {
    let title_style = if focused {
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_MUTED)
    };

    let mut spans = Vec::with_capacity(2);
    if let Some(h) = hint {
        spans.push(Span::styled(format!("[{}] ", h), Style::default().fg(C_KEY_HINT)));
    }
    spans.push(Span::styled(title, title_style));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border(focused))
        .title(Line::from(spans));

    match badge {
        Some(b) => block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        ),
        None => block,
    }
}
