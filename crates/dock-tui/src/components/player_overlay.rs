//! PlayerOverlay: modal over the workspace while a title is open. Shows the
//! details, the resume prompt with its countdown, transport state and the
//! episode list for shows. Video itself plays in mpv's own window.

use dock_proto::protocol::EpisodeId;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{centered_rect, fit},
    player::ResumeChoice,
    theme::{style_selected, C_ACCENT, C_BUSY, C_MUTED, C_OK, C_PANEL_BORDER_FOCUSED, C_PRIMARY, C_SECONDARY, C_WAIT},
    view::player_view,
    widgets::{pane_chrome::pane_chrome, progress_bar::draw_timeline, scrollable_list::ScrollableList},
};

const SEEK_STEP: f64 = 10.0;
const SEEK_STEP_LARGE: f64 = 60.0;
const EPISODE_PANE_WIDTH: u16 = 34;

pub struct PlayerOverlay {
    episodes: ScrollableList<(EpisodeId, String)>,
    /// Episode the cursor last followed, so a switch moves the cursor once.
    followed: Option<EpisodeId>,
}

impl PlayerOverlay {
    pub fn new() -> Self {
        Self {
            episodes: ScrollableList::new(),
            followed: None,
        }
    }

    fn refresh(&mut self, state: &AppState) {
        let items = state.episodes().iter().map(|e| (e.id, e.label())).collect();
        self.episodes.set_items(items, |(id, _)| *id);

        let current = state.current_episode_id();
        if current != self.followed {
            self.followed = current;
            if let Some(pos) = self.episodes.items().iter().position(|(id, _)| Some(*id) == current) {
                self.episodes.select_first();
                self.episodes.select_down(pos);
            }
        }
    }
}

impl Default for PlayerOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for PlayerOverlay {
    fn id(&self) -> ComponentId {
        ComponentId::PlayerOverlay
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.refresh(state);

        if state.player.resume.is_prompting() {
            match key.code {
                KeyCode::Char('r') | KeyCode::Enter => {
                    return vec![Action::ResumeChoice(ResumeChoice::Resume)]
                }
                KeyCode::Char('s') => return vec![Action::ResumeChoice(ResumeChoice::Restart)],
                _ => {}
            }
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            SEEK_STEP_LARGE
        } else {
            SEEK_STEP
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => vec![Action::ClosePlayer],
            KeyCode::Char(' ') => vec![Action::TogglePause],
            KeyCode::Left => vec![Action::SeekRelative(-step)],
            KeyCode::Right => vec![Action::SeekRelative(step)],
            KeyCode::Char('n') => vec![Action::NextEpisode],
            KeyCode::Char('N') => vec![Action::PrevEpisode],
            KeyCode::Char('u') => vec![Action::ClearProgress],
            KeyCode::Char('y') => vec![Action::CopyStreamUrl],
            KeyCode::Up | KeyCode::Char('k') => {
                self.episodes.select_up(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.episodes.select_down(1);
                vec![]
            }
            KeyCode::Enter => match (self.episodes.selected_item(), &state.details) {
                (Some((id, _)), _) => vec![Action::PlayEpisode(*id)],
                (None, Some(d)) if state.player.session.is_none() => vec![Action::OpenMedia(d.item.id)],
                _ => vec![],
            },
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        let Some(details) = &state.details else {
            return;
        };
        self.refresh(state);
        let view = player_view(details, state.current_episode(), &state.player);

        let popup = centered_rect(84, area.height.saturating_sub(4).min(26), area);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_PANEL_BORDER_FOCUSED))
            .style(Style::default().bg(Color::Rgb(16, 16, 24)))
            .title(Span::styled(
                " now playing ",
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let has_episodes = !self.episodes.is_empty();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(20),
                Constraint::Length(if has_episodes { EPISODE_PANE_WIDTH } else { 0 }),
            ])
            .split(inner);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(columns[0]);

        let mut info = vec![Line::from(Span::styled(
            format!(" {}", view.title),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ))];
        if let Some(ep) = &view.episode {
            info.push(Line::from(Span::styled(format!(" {}", ep), Style::default().fg(C_BUSY))));
        }
        if let Some(t) = &view.tagline {
            info.push(Line::from(Span::styled(
                format!(" {}", t),
                Style::default().fg(C_SECONDARY).add_modifier(Modifier::ITALIC),
            )));
        }
        if !view.facts.is_empty() {
            info.push(Line::from(Span::styled(
                format!(" {}", view.facts.join(" · ")),
                Style::default().fg(C_MUTED),
            )));
        }
        info.push(Line::from(""));
        if let Some(o) = &view.overview {
            info.push(Line::from(Span::styled(format!(" {}", o), Style::default().fg(C_SECONDARY))));
        }
        if let Some(c) = &view.cast {
            info.push(Line::from(""));
            info.push(Line::from(vec![
                Span::styled(" cast  ", Style::default().fg(C_MUTED)),
                Span::styled(c.clone(), Style::default().fg(C_SECONDARY)),
            ]));
        }
        frame.render_widget(Paragraph::new(info).wrap(Wrap { trim: false }), rows[0]);

        if let Some(prompt) = &view.prompt {
            let mut spans = vec![
                Span::styled(format!(" {} ", prompt), Style::default().fg(C_WAIT).add_modifier(Modifier::BOLD)),
                Span::styled("[r] resume  [s] start over", Style::default().fg(C_SECONDARY)),
            ];
            if let Some(secs) = view.countdown {
                spans.push(Span::styled(format!("  resuming in {}s", secs), Style::default().fg(C_MUTED)));
            }
            frame.render_widget(Paragraph::new(Line::from(spans)), rows[1]);
        }

        let status_color = match view.status {
            "playing" => C_OK,
            "paused" | "waiting" => C_WAIT,
            _ => C_MUTED,
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!(" {} ", view.status), Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
                Span::styled(view.clock.clone(), Style::default().fg(C_SECONDARY)),
            ])),
            rows[2],
        );
        let timeline = Rect {
            x: rows[3].x + 1,
            width: rows[3].width.saturating_sub(2),
            ..rows[3]
        };
        draw_timeline(frame, timeline, state.player.position, state.player.duration, C_ACCENT);

        if has_episodes {
            let block = pane_chrome("episodes", None, true, None);
            let list_area = block.inner(columns[1]);
            frame.render_widget(block, columns[1]);
            let height = list_area.height as usize;
            let width = list_area.width.saturating_sub(2) as usize;
            self.episodes.ensure_visible(height);
            let selected = self.episodes.selected_index();
            let current = state.current_episode_id();
            let lines: Vec<Line> = self
                .episodes
                .visible_items(height)
                .map(|(i, (id, label))| {
                    let marker = if Some(*id) == current { "▶ " } else { "  " };
                    let line = Line::from(vec![
                        Span::styled(marker, Style::default().fg(C_OK)),
                        Span::styled(fit(label, width), Style::default().fg(C_PRIMARY)),
                    ]);
                    if i == selected {
                        line.style(style_selected(true))
                    } else {
                        line
                    }
                })
                .collect();
            frame.render_widget(Paragraph::new(lines), list_area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{MediaSession, ResumeState};
    use dock_proto::protocol::{Episode, MediaDetails, MediaItem};
    use tokio::time::Instant;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state(prompting: bool) -> AppState {
        let mut state = AppState::new("http://127.0.0.1:8000");
        state.details = Some(MediaDetails {
            item: MediaItem {
                id: 9,
                title: "Andor".into(),
                ..MediaItem::default()
            },
            episodes: (1..=3)
                .map(|n| Episode {
                    id: 100 + i64::from(n),
                    season: 1,
                    episode: n,
                    ..Episode::default()
                })
                .collect(),
            ..MediaDetails::default()
        });
        state.player.session = Some(MediaSession {
            media_id: 9,
            episode_id: Some(102),
            title: "Andor".into(),
            stream_url: String::new(),
        });
        if prompting {
            state.player.resume = ResumeState::Prompting {
                saved: 300,
                deadline: Instant::now(),
            };
        }
        state
    }

    #[test]
    fn prompt_keys_answer_the_resume_question() {
        let state = state(true);
        let mut overlay = PlayerOverlay::new();
        assert_eq!(
            overlay.handle_key(key(KeyCode::Char('r')), &state),
            vec![Action::ResumeChoice(ResumeChoice::Resume)]
        );
        assert_eq!(
            overlay.handle_key(key(KeyCode::Char('s')), &state),
            vec![Action::ResumeChoice(ResumeChoice::Restart)]
        );
    }

    #[test]
    fn transport_keys_without_prompt() {
        let state = state(false);
        let mut overlay = PlayerOverlay::new();
        assert!(overlay.handle_key(key(KeyCode::Char('s')), &state).is_empty());
        assert_eq!(overlay.handle_key(key(KeyCode::Char(' ')), &state), vec![Action::TogglePause]);
        assert_eq!(
            overlay.handle_key(KeyEvent::new(KeyCode::Right, KeyModifiers::SHIFT), &state),
            vec![Action::SeekRelative(60.0)]
        );
        assert_eq!(overlay.handle_key(key(KeyCode::Char('n')), &state), vec![Action::NextEpisode]);
        assert_eq!(overlay.handle_key(key(KeyCode::Esc), &state), vec![Action::ClosePlayer]);
    }

    #[test]
    fn episode_cursor_follows_playback_then_picks() {
        let state = state(false);
        let mut overlay = PlayerOverlay::new();
        overlay.handle_key(key(KeyCode::Char('j')), &state);
        assert_eq!(overlay.handle_key(key(KeyCode::Enter), &state), vec![Action::PlayEpisode(103)]);
    }
}
