//! Top tab strip and the two bottom lines: last log message and key hints.

use dock_proto::protocol::ServiceStatus;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::Workspace;
use crate::theme::{
    C_ACCENT, C_ERROR, C_FILTER_FG, C_KEY_HINT, C_MUTED, C_OK, C_PANEL_BORDER, C_PRIMARY, C_SECONDARY,
    C_WAIT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Input,
    Player,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Input => "INPUT",
            Self::Player => "PLAYER",
        }
    }
}

/// `streamdock  [1] Library  [2] Downloads  [3] Settings   ● online  db ● qbt ● 10.0.0.2`
pub fn draw_header(
    frame: &mut Frame,
    area: Rect,
    active: Workspace,
    online: bool,
    status: Option<&ServiceStatus>,
) {
    let mut spans = vec![Span::styled(
        " streamdock ",
        Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
    )];
    for ws in Workspace::ALL {
        spans.push(Span::styled(format!(" [{}]", ws.hotkey()), Style::default().fg(C_KEY_HINT)));
        let style = if ws == active {
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(C_SECONDARY)
        };
        spans.push(Span::styled(format!(" {} ", ws.label()), style));
    }

    spans.push(Span::raw("  "));
    if online {
        spans.push(Span::styled("● online", Style::default().fg(C_OK)));
    } else {
        spans.push(Span::styled(
            "○ offline",
            Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(s) = status {
        spans.push(Span::raw("  "));
        spans.extend(service_flag("db", s.database_ok()));
        spans.extend(service_flag("qbt", s.torrent_client_ok()));
        if !s.server_ip.is_empty() {
            spans.push(Span::styled(s.server_ip.clone(), Style::default().fg(C_SECONDARY)));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn service_flag(name: &'static str, ok: bool) -> [Span<'static>; 2] {
    [
        Span::styled(format!("{} ", name), Style::default().fg(C_MUTED)),
        Span::styled("● ", Style::default().fg(if ok { C_OK } else { C_WAIT })),
    ]
}

pub fn draw_log_bar(frame: &mut Frame, area: Rect, last_log: Option<&str>) {
    let line = Line::from(Span::styled(
        format!(" {}", last_log.unwrap_or("")),
        Style::default().fg(C_SECONDARY),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_PANEL_BORDER),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, workspace: Workspace) {
    let label_color = match mode {
        InputMode::Normal => C_SECONDARY,
        InputMode::Input => C_FILTER_FG,
        InputMode::Player => C_ACCENT,
    };
    let keys = match mode {
        InputMode::Input => " type  Enter submit  Esc clear/close",
        InputMode::Player => {
            " r resume  s start over  Space pause  ←→ seek  n/N episode  u unwatched  y copy url  Esc close"
        }
        InputMode::Normal => match workspace {
            Workspace::Library => {
                " jk move  Enter play  / filter  m kind  s scan  g reload  D delete  Tab/1-3 tabs  x dismiss  ? help  q quit"
            }
            Workspace::Downloads => {
                " jk move  hl list  a add  n transcode  p pause  r resume  d/D remove  c cancel  R restart  t retry  C clear  ? help  q quit"
            }
            Workspace::Settings => " jk field  ←→ change  Enter save  Esc revert  Tab/1-3 tabs  ? help  q quit",
        },
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(label_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
