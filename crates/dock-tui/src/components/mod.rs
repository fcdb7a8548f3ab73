pub mod downloads_panel;
pub mod help_overlay;
pub mod library_grid;
pub mod player_overlay;
pub mod settings_panel;

use std::time::Duration;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use tokio::time::Instant;
use unicode_width::UnicodeWidthChar;

/// Destructive keys must be pressed twice within this window.
pub const CONFIRM_WINDOW: Duration = Duration::from_secs(3);

/// Two-press confirmation for a destructive key, keyed by the target it acts on.
#[derive(Debug)]
pub struct ConfirmGuard<K> {
    pending: Option<(K, Instant)>,
}

impl<K> Default for ConfirmGuard<K> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<K: PartialEq> ConfirmGuard<K> {
    /// First press arms and returns false; a second press on the same target
    /// inside the window returns true and disarms.
    pub fn press(&mut self, target: K, now: Instant) -> bool {
        match self.pending.take() {
            Some((armed, at)) if armed == target && now.duration_since(at) <= CONFIRM_WINDOW => true,
            _ => {
                self.pending = Some((target, now));
                false
            }
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn expire(&mut self, now: Instant) {
        if let Some((_, at)) = &self.pending {
            if now.duration_since(*at) > CONFIRM_WINDOW {
                self.pending = None;
            }
        }
    }
}

/// Truncates to `width` terminal cells with a trailing ellipsis, then pads.
pub fn fit(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    let total: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= width {
        out.push_str(s);
        used = total;
    } else if width > 0 {
        for c in s.chars() {
            let w = c.width().unwrap_or(0);
            if used + w + 1 > width {
                break;
            }
            out.push(c);
            used += w;
        }
        out.push('…');
        used += 1;
    }
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(used)));
    out
}

pub fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height.min(r.height)),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_needs_second_press_on_same_target_in_window() {
        let t0 = Instant::now();
        let mut guard = ConfirmGuard::default();
        assert!(!guard.press(7, t0));
        assert!(guard.is_armed());
        assert!(guard.press(7, t0 + Duration::from_secs(2)));
        assert!(!guard.is_armed());

        assert!(!guard.press(7, t0));
        assert!(!guard.press(8, t0 + Duration::from_secs(1)), "other target re-arms");
        assert!(!guard.press(8, t0 + Duration::from_secs(5)), "window elapsed");

        guard.expire(t0 + Duration::from_secs(9));
        assert!(!guard.is_armed());
    }

    #[test]
    fn fit_truncates_by_display_width() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 4), "abc…");
        assert_eq!(fit("日本語テキスト", 5), "日本…");
        assert_eq!(fit("日本語テキスト", 6), "日本… ");
        assert_eq!(fit("x", 0), "");
    }
}
