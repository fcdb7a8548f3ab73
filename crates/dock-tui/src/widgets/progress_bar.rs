//! Eighth-block progress bars: the player timeline and per-row gauges.

use dock_proto::format::format_timestamp;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_OK, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// `ratio` (0..=1) as exactly `width` cells.
pub fn bar(ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let eighths = (ratio * width as f64 * 8.0) as usize;
    let full = eighths / 8;
    let partial = eighths % 8;

    let mut out = String::with_capacity(width * 3);
    out.extend(std::iter::repeat('█').take(full));
    if full < width {
        out.push(BLOCKS[partial]);
        out.extend(std::iter::repeat(' ').take(width - full - 1));
    }
    out
}

/// Timeline with elapsed time on the left and duration on the right.
pub fn draw_timeline(frame: &mut Frame, area: Rect, position: f64, duration: Option<f64>, color: Color) {
    if area.width < 4 || area.height == 0 {
        return;
    }
    let left = format_timestamp(position);
    let right = duration.map(format_timestamp).unwrap_or_default();
    let labels = (left.len() + right.len() + 2) as u16;
    let width = area.width.saturating_sub(labels).max(4) as usize;
    let ratio = match duration {
        Some(d) if d > 0.0 => position / d,
        _ => 0.0,
    };

    let mut spans = vec![
        Span::styled(format!("{} ", left), Style::default().fg(C_SECONDARY)),
        Span::styled(bar(ratio, width), Style::default().fg(color)),
    ];
    if !right.is_empty() {
        spans.push(Span::styled(format!(" {}", right), Style::default().fg(C_MUTED)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Compact gauge for list rows: bar plus right-aligned percent.
pub fn gauge_span(percent: f64, width: usize) -> Vec<Span<'static>> {
    vec![
        Span::styled(bar(percent / 100.0, width), Style::default().fg(C_OK)),
        Span::styled(format!(" {:>5.1}%", percent), Style::default().fg(C_SECONDARY)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_is_always_requested_width() {
        for ratio in [0.0, 0.01, 0.5, 0.999, 1.0, 7.0, f64::NAN] {
            assert_eq!(bar(ratio, 10).chars().count(), 10, "ratio {}", ratio);
        }
    }

    #[test]
    fn bar_fills_with_partial_cell() {
        assert_eq!(bar(1.0, 4), "████");
        assert_eq!(bar(0.0, 3), "   ");
        assert_eq!(bar(0.5625, 2), "█▏");
    }
}
