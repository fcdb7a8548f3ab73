//! HelpOverlay: centered popup with the keyboard reference.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::centered_rect,
    theme::{C_MUTED, C_PANEL_BORDER, C_PRIMARY, C_SECONDARY},
};

pub struct HelpOverlay {
    visible: bool,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self { visible: false }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }
}

impl Default for HelpOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HelpOverlay {
    fn id(&self) -> ComponentId {
        ComponentId::HelpOverlay
    }

    /// Swallows every key while open.
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || !self.visible {
            return vec![];
        }
        match key.code {
            KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc => vec![Action::ToggleHelp],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, _state: &AppState) {
        if !self.visible {
            return;
        }

        let lines = vec![
            Line::from(Span::styled(
                " keyboard shortcuts",
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section(" everywhere"),
            help_row("1 / 2 / 3", "library / downloads / settings"),
            help_row("tab", "next workspace"),
            help_row("x", "dismiss newest notification"),
            help_row("?", "toggle this help"),
            help_row("q / Ctrl+C", "quit"),
            Line::from(""),
            section(" library"),
            help_row("j / k", "move selection"),
            help_row("enter", "open in player"),
            help_row("/", "filter titles (Esc clears + closes)"),
            help_row("m", "cycle all / movies / shows"),
            help_row("s / g", "rescan disk / reload list"),
            help_row("D D", "delete title and its files"),
            Line::from(""),
            section(" downloads"),
            help_row("h / l", "transfers / jobs list"),
            help_row("a", "add magnet link"),
            help_row("n", "queue a transcode by path"),
            help_row("p / r", "pause / resume transfer"),
            help_row("d / D D", "remove transfer / and delete data"),
            help_row("c / R / t", "cancel / restart / retry job"),
            help_row("C", "clear finished jobs"),
            Line::from(""),
            section(" player"),
            help_row("r / s", "resume / start over (when asked)"),
            help_row("space", "pause / play"),
            help_row("← / →", "seek 10s (Shift = 60s)"),
            help_row("n / N", "next / previous episode"),
            help_row("j / k, enter", "pick an episode"),
            help_row("u", "mark unwatched"),
            help_row("y", "copy stream URL"),
            help_row("esc", "close player"),
            Line::from(""),
            section(" settings"),
            help_row("j / k", "choose field"),
            help_row("← / →", "change value"),
            help_row("enter / esc", "save / revert"),
            Line::from(""),
            Line::from(Span::styled(" press ? or esc to close", Style::default().fg(C_MUTED))),
        ];

        let popup = centered_rect(64, lines.len() as u16 + 2, area);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(C_PANEL_BORDER))
                        .style(Style::default().bg(Color::Rgb(18, 18, 26))),
                )
                .wrap(Wrap { trim: false }),
            popup,
        );
    }
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
    ))
}

fn help_row<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{:<16}", key),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc, Style::default().fg(C_SECONDARY)),
    ])
}
