//! Toasts: transient, severity-tagged messages in the top-right corner.
//!
//! Each toast expires after its own duration and spends its last
//! [`FADE`] rendered dim. Re-pushing identical text refreshes the existing
//! toast instead of stacking a copy, and the queue is capped at twice the
//! visible count with the oldest evicted first.

use std::collections::VecDeque;
use std::time::Duration;

use dock_proto::notify::DEFAULT_DURATION;
use dock_proto::Severity;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use tokio::time::Instant;
use unicode_width::UnicodeWidthStr;

use crate::theme::{severity_color, severity_icon, C_BUSY};

pub const FADE: Duration = Duration::from_millis(300);

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

#[derive(Debug)]
struct Toast {
    id: ToastId,
    message: String,
    severity: Severity,
    expires: Instant,
}

/// Persistent toast for long operations (library scan); animates until
/// resolved.
struct Spinner {
    message: String,
    frame: usize,
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    spinner: Option<Spinner>,
    max_visible: usize,
    default_duration: Duration,
    next_id: u64,
}

impl ToastManager {
    pub fn new(max_visible: usize, default_duration: Duration) -> Self {
        Self {
            toasts: VecDeque::new(),
            spinner: None,
            max_visible: max_visible.max(1),
            default_duration,
            next_id: 1,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity, duration: Option<Duration>) -> ToastId {
        self.push_at(message, severity, duration, Instant::now())
    }

    pub fn push_at(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        duration: Option<Duration>,
        now: Instant,
    ) -> ToastId {
        let message = message.into();
        let expires = now + duration.unwrap_or(self.default_duration);

        if let Some(pos) = self.toasts.iter().position(|t| t.message == message) {
            if let Some(mut existing) = self.toasts.remove(pos) {
                existing.severity = severity;
                existing.expires = expires;
                let id = existing.id;
                self.toasts.push_back(existing);
                return id;
            }
        }

        let id = ToastId(self.next_id);
        self.next_id += 1;
        self.toasts.push_back(Toast {
            id,
            message,
            severity,
            expires,
        });
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
        id
    }

    pub fn info(&mut self, message: impl Into<String>) -> ToastId {
        self.push(message, Severity::Info, None)
    }

    pub fn success(&mut self, message: impl Into<String>) -> ToastId {
        self.push(message, Severity::Success, None)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> ToastId {
        self.push(message, Severity::Warning, None)
    }

    pub fn danger(&mut self, message: impl Into<String>) -> ToastId {
        self.push(message, Severity::Danger, Some(DEFAULT_DURATION * 2))
    }

    /// Returns false if the toast already expired or was dismissed.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    pub fn dismiss_latest(&mut self) -> bool {
        self.toasts.pop_back().is_some()
    }

    pub fn spinner(&mut self, message: impl Into<String>) {
        self.spinner = Some(Spinner {
            message: message.into(),
            frame: 0,
        });
    }

    /// Replaces the spinner with a normal expiring toast.
    pub fn resolve_spinner(&mut self, message: impl Into<String>, severity: Severity) -> ToastId {
        self.spinner = None;
        self.push(message, severity, None)
    }

    pub fn dismiss_spinner(&mut self) {
        self.spinner = None;
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Drops expired toasts and advances the spinner.
    pub fn tick_at(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires > now);
        if let Some(s) = self.spinner.as_mut() {
            s.frame = (s.frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty() && self.spinner.is_none()
    }

    /// Newest first, as drawn.
    pub fn messages(&self) -> Vec<&str> {
        self.toasts.iter().rev().map(|t| t.message.as_str()).collect()
    }

    fn is_fading(toast: &Toast, now: Instant) -> bool {
        toast.expires.saturating_duration_since(now) <= FADE
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.is_empty() {
            return;
        }
        let now = Instant::now();
        let max_width = (area.width / 2).clamp(30, 60).min(area.width);
        let bottom = area.y + area.height;
        let mut y = area.y + 1;

        if let Some(s) = self.spinner.as_ref() {
            if y >= bottom {
                return;
            }
            let icon = SPINNER_FRAMES[s.frame % SPINNER_FRAMES.len()];
            place(
                frame,
                area,
                max_width,
                format!(" {} {} ", icon, s.message),
                Style::default().fg(C_BUSY).add_modifier(Modifier::BOLD),
                y,
            );
            y += 1;
        }

        for toast in self.toasts.iter().rev().take(self.max_visible) {
            if y >= bottom {
                break;
            }
            let mut style = Style::default().fg(severity_color(toast.severity));
            style = if Self::is_fading(toast, now) {
                style.add_modifier(Modifier::DIM)
            } else {
                style.add_modifier(Modifier::BOLD)
            };
            place(
                frame,
                area,
                max_width,
                format!(" {} {} ", severity_icon(toast.severity), toast.message),
                style,
                y,
            );
            y += 1;
        }
    }
}

/// One right-aligned toast row at `y`.
fn place(frame: &mut Frame, area: Rect, max_width: u16, text: String, style: Style, y: u16) {
    let w = (text.width() as u16).min(max_width);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(w + 1),
        y,
        width: w,
        height: 1,
    };
    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(Line::from(Span::styled(text, style))), rect);
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new(4, DEFAULT_DURATION)
    }
}
