//! Palette and shared styles.

use dock_proto::protocol::{JobStatus, TransferState};
use dock_proto::Severity;
use ratatui::style::{Color, Modifier, Style};

pub const C_BG: Color = Color::Rgb(12, 12, 18);
pub const C_ACCENT: Color = Color::Rgb(229, 160, 13);
pub const C_OK: Color = Color::Rgb(80, 200, 120);
pub const C_BUSY: Color = Color::Rgb(80, 160, 220);
pub const C_WAIT: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 95, 95);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_SELECTION_BG: Color = Color::Rgb(30, 30, 42);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(229, 160, 13);
pub const C_FILTER_BG: Color = Color::Rgb(20, 20, 32);
pub const C_FILTER_FG: Color = Color::Rgb(255, 200, 80);
pub const C_KEY_HINT: Color = Color::Rgb(90, 90, 115);

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => C_BUSY,
        Severity::Success => C_OK,
        Severity::Warning => C_WAIT,
        Severity::Danger => C_ERROR,
    }
}

pub fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "·",
        Severity::Success => "✓",
        Severity::Warning => "!",
        Severity::Danger => "✗",
    }
}

pub fn transfer_state_color(state: TransferState) -> Color {
    match state {
        TransferState::Downloading | TransferState::Checking => C_BUSY,
        TransferState::Seeding | TransferState::Completed => C_OK,
        TransferState::Paused | TransferState::Queued => C_WAIT,
        TransferState::Error => C_ERROR,
        TransferState::Unknown => C_SECONDARY,
    }
}

pub fn job_status_color(status: JobStatus) -> Color {
    match status {
        JobStatus::Pending => C_WAIT,
        JobStatus::Processing => C_BUSY,
        JobStatus::Complete => C_OK,
        JobStatus::Failed => C_ERROR,
    }
}

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_accent() -> Style {
    Style::default().fg(C_ACCENT)
}

pub fn style_selected(focused: bool) -> Style {
    let base = Style::default().bg(C_SELECTION_BG).fg(C_PRIMARY);
    if focused {
        base.add_modifier(Modifier::BOLD)
    } else {
        base
    }
}

pub fn style_border(focused: bool) -> Style {
    Style::default().fg(if focused {
        C_PANEL_BORDER_FOCUSED
    } else {
        C_PANEL_BORDER
    })
}

pub fn style_filter() -> Style {
    Style::default().fg(C_FILTER_FG).bg(C_FILTER_BG)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

pub fn style_key() -> Style {
    Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
}
