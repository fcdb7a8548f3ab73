//! SettingsPanel: edits the server-side settings as a local draft and saves
//! them in one PUT. A failed save leaves the draft in place.

use dock_proto::protocol::{Settings, QUALITIES, THEMES};
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_selected, C_ACCENT, C_MUTED, C_PRIMARY, C_SECONDARY, C_WAIT},
    widgets::pane_chrome::{pane_chrome, Badge},
};

pub const MAX_JOBS_RANGE: std::ops::RangeInclusive<u32> = 1..=8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Theme,
    Quality,
    MaxJobs,
}

const FIELDS: [Field; 3] = [Field::Theme, Field::Quality, Field::MaxJobs];

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Theme => "theme",
            Field::Quality => "default quality",
            Field::MaxJobs => "max concurrent jobs",
        }
    }

    fn value(self, s: &Settings) -> String {
        match self {
            Field::Theme => s.theme.clone(),
            Field::Quality => s.default_quality.clone(),
            Field::MaxJobs => s.max_concurrent_jobs.to_string(),
        }
    }
}

fn cycle(options: &[&str], current: &str, forward: bool) -> String {
    let n = options.len();
    let next = match options.iter().position(|o| *o == current) {
        Some(i) if forward => (i + 1) % n,
        Some(i) => (i + n - 1) % n,
        None => 0,
    };
    options[next].to_string()
}

fn adjust(settings: &mut Settings, field: Field, forward: bool) {
    match field {
        Field::Theme => settings.theme = cycle(THEMES, &settings.theme, forward),
        Field::Quality => settings.default_quality = cycle(QUALITIES, &settings.default_quality, forward),
        Field::MaxJobs => {
            let n = if forward {
                settings.max_concurrent_jobs.saturating_add(1)
            } else {
                settings.max_concurrent_jobs.saturating_sub(1)
            };
            settings.max_concurrent_jobs = n.clamp(*MAX_JOBS_RANGE.start(), *MAX_JOBS_RANGE.end());
        }
    }
}

pub struct SettingsPanel {
    draft: Option<Settings>,
    field: usize,
}

impl SettingsPanel {
    pub fn new() -> Self {
        Self { draft: None, field: 0 }
    }

    fn is_dirty(&self, state: &AppState) -> bool {
        self.draft.is_some() && self.draft != state.settings
    }

    /// Picks up server values unless the user is mid-edit.
    fn sync(&mut self, state: &AppState) {
        if !self.is_dirty(state) {
            self.draft = state.settings.clone();
        }
    }
}

impl Default for SettingsPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SettingsPanel {
    fn id(&self) -> ComponentId {
        ComponentId::SettingsPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.sync(state);
        let Some(draft) = self.draft.as_mut() else {
            return vec![];
        };

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.field = self.field.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.field = (self.field + 1).min(FIELDS.len() - 1),
            KeyCode::Left | KeyCode::Char('h') => adjust(draft, FIELDS[self.field], false),
            KeyCode::Right | KeyCode::Char('l') => adjust(draft, FIELDS[self.field], true),
            KeyCode::Enter => return vec![Action::SaveSettings(draft.clone())],
            KeyCode::Esc => self.draft = state.settings.clone(),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.sync(state);
        let dirty = self.is_dirty(state);
        let badge = dirty.then(|| Badge::new("unsaved", C_WAIT));
        let block = pane_chrome("settings", Some("3"), focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(draft) = &self.draft else {
            let msg = if state.online {
                "  loading settings…"
            } else {
                "  offline, settings unavailable"
            };
            frame.render_widget(Paragraph::new(Span::styled(msg, Style::default().fg(C_MUTED))), inner);
            return;
        };

        let mut lines = vec![Line::from("")];
        for (i, field) in FIELDS.iter().enumerate() {
            let value = field.value(draft);
            let changed = state.settings.as_ref().map(|s| field.value(s)) != Some(value.clone());
            let line = Line::from(vec![
                Span::styled(format!("  {:<22}", field.label()), Style::default().fg(C_SECONDARY)),
                Span::styled("‹ ", Style::default().fg(C_MUTED)),
                Span::styled(
                    value,
                    Style::default()
                        .fg(if changed { C_WAIT } else { C_PRIMARY })
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" ›", Style::default().fg(C_MUTED)),
            ]);
            lines.push(if i == self.field {
                line.style(style_selected(focused))
            } else {
                line
            });
        }
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Enter", Style::default().fg(C_ACCENT)),
            Span::styled(" save   ", Style::default().fg(C_MUTED)),
            Span::styled("Esc", Style::default().fg(C_ACCENT)),
            Span::styled(" revert", Style::default().fg(C_MUTED)),
        ]));
        lines.push(Line::from(Span::styled(
            format!("  server {}", state.base_url),
            Style::default().fg(C_MUTED),
        )));
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
