//! LibraryGrid: the Library workspace. One row per title, filterable by kind
//! and by a text query over titles.

use dock_proto::protocol::{MediaId, MediaType};
use dock_proto::Severity;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tokio::time::Instant;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{fit, ConfirmGuard},
    theme::{style_selected, C_ACCENT, C_BUSY, C_MUTED, C_PRIMARY, C_SECONDARY},
    view::{library_cards, LibraryCard, LibraryFilter},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
        text_input::{InputAction, TextInput},
    },
};

pub struct LibraryGrid {
    list: ScrollableList<LibraryCard>,
    filter: LibraryFilter,
    input: TextInput,
    confirm_delete: ConfirmGuard<MediaId>,
}

impl LibraryGrid {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
            filter: LibraryFilter::default(),
            input: TextInput::new("/", "filter titles"),
            confirm_delete: ConfirmGuard::default(),
        }
    }

    fn refresh(&mut self, state: &AppState) {
        self.list
            .set_items(library_cards(&state.library, &self.filter), |c| c.id);
    }

    fn handle_input(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up => self.list.select_up(1),
            KeyCode::Down => self.list.select_down(1),
            _ => match self.input.handle_key(key) {
                InputAction::Changed(q) => {
                    self.filter.query = q;
                    self.refresh(state);
                }
                InputAction::Cancelled => {
                    self.filter.query.clear();
                    self.refresh(state);
                }
                InputAction::Submitted(_) | InputAction::None => {}
            },
        }
        vec![]
    }

    fn delete_selected(&mut self) -> Vec<Action> {
        let Some(card) = self.list.selected_item() else {
            return vec![];
        };
        if self.confirm_delete.press(card.id, Instant::now()) {
            vec![Action::DeleteMedia {
                id: card.id,
                title: card.title.clone(),
            }]
        } else {
            vec![Action::Toast(
                format!("Press D again to delete \"{}\" and its files", card.title),
                Severity::Warning,
            )]
        }
    }

    fn empty_message(&self, state: &AppState) -> &'static str {
        if state.library_loading {
            "  loading library…"
        } else if !state.online {
            "  offline"
        } else if state.library.is_empty() {
            "  library is empty, press s to scan"
        } else {
            "  nothing matches the filter"
        }
    }

    fn render_row(card: &LibraryCard, selected: bool, focused: bool, width: usize) -> Line<'static> {
        let kind_color = match card.media_type {
            MediaType::Movie => C_ACCENT,
            MediaType::Tv => C_BUSY,
        };
        let sub_w = 20.min(width / 3);
        let title_w = width.saturating_sub(sub_w + 3);
        let marker = if selected { "▸ " } else { "  " };
        let line = Line::from(vec![
            Span::styled(marker, Style::default().fg(kind_color)),
            Span::styled(
                fit(&card.title, title_w),
                Style::default().fg(C_PRIMARY).add_modifier(if selected {
                    Modifier::BOLD
                } else {
                    Modifier::empty()
                }),
            ),
            Span::raw(" "),
            Span::styled(fit(&card.subtitle, sub_w), Style::default().fg(C_SECONDARY)),
        ]);
        if selected {
            line.style(style_selected(focused))
        } else {
            line
        }
    }
}

impl Default for LibraryGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for LibraryGrid {
    fn id(&self) -> ComponentId {
        ComponentId::LibraryGrid
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.refresh(state);

        if self.input.is_active() {
            return self.handle_input(key, state);
        }
        if key.code != KeyCode::Char('D') {
            self.confirm_delete.cancel();
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(1),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Char('/') => self.input.activate(),
            KeyCode::Char('m') => {
                self.filter.kind = self.filter.kind.next();
                self.refresh(state);
            }
            KeyCode::Char('s') => return vec![Action::ScanLibrary],
            KeyCode::Char('g') => return vec![Action::ReloadLibrary],
            KeyCode::Enter => {
                if let Some(card) = self.list.selected_item() {
                    return vec![Action::OpenMedia(card.id)];
                }
            }
            KeyCode::Char('D') => return self.delete_selected(),
            _ => {}
        }
        vec![]
    }

    fn tick(&mut self, _state: &AppState) -> Vec<Action> {
        self.confirm_delete.expire(Instant::now());
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.refresh(state);

        let title = format!("library · {}", self.filter.kind.label());
        let badge = if state.library_loading {
            Badge::new("loading", C_MUTED)
        } else {
            Badge::new(format!("{}/{}", self.list.len(), state.library.len()), C_SECONDARY)
        };
        let block = pane_chrome(&title, Some("1"), focused, Some(badge));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let show_filter = self.input.is_active() || !self.filter.query.is_empty();
        let list_h = inner.height.saturating_sub(show_filter as u16) as usize;

        if self.list.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(self.empty_message(state), Style::default().fg(C_MUTED))),
                inner,
            );
        } else {
            self.list.ensure_visible(list_h);
            let selected = self.list.selected_index();
            let width = inner.width as usize;
            let lines: Vec<Line> = self
                .list
                .visible_items(list_h)
                .map(|(i, card)| Self::render_row(card, i == selected, focused, width))
                .collect();
            frame.render_widget(Paragraph::new(lines), inner);
        }

        if show_filter {
            let filter_area = Rect {
                y: inner.y + inner.height.saturating_sub(1),
                height: 1,
                ..inner
            };
            self.input.draw(frame, filter_area);
        }
    }

    fn captures_input(&self) -> bool {
        self.input.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_proto::protocol::MediaItem;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state() -> AppState {
        let mut state = AppState::new("http://127.0.0.1:8000");
        state.library = vec![
            MediaItem {
                id: 1,
                title: "Alien".into(),
                year: Some(1979),
                ..MediaItem::default()
            },
            MediaItem {
                id: 2,
                title: "Andor".into(),
                media_type: MediaType::Tv,
                episode_count: Some(12),
                ..MediaItem::default()
            },
            MediaItem {
                id: 3,
                title: "Heat".into(),
                ..MediaItem::default()
            },
        ];
        state
    }

    #[test]
    fn enter_opens_selected_title() {
        let state = state();
        let mut grid = LibraryGrid::new();
        grid.handle_key(key(KeyCode::Char('j')), &state);
        assert_eq!(grid.handle_key(key(KeyCode::Enter), &state), vec![Action::OpenMedia(2)]);
    }

    #[test]
    fn text_and_kind_filters_narrow_the_list() {
        let state = state();
        let mut grid = LibraryGrid::new();
        grid.handle_key(key(KeyCode::Char('/')), &state);
        assert!(grid.captures_input());
        for c in "an".chars() {
            grid.handle_key(key(KeyCode::Char(c)), &state);
        }
        assert_eq!(grid.list.len(), 1, "only Andor contains \"an\"");
        grid.handle_key(key(KeyCode::Enter), &state);
        assert!(!grid.captures_input());
        assert_eq!(grid.filter.query, "an", "Enter keeps the filter");

        grid.handle_key(key(KeyCode::Char('/')), &state);
        grid.handle_key(key(KeyCode::Esc), &state);
        grid.handle_key(key(KeyCode::Esc), &state);
        assert_eq!(grid.list.len(), 3);

        grid.handle_key(key(KeyCode::Char('m')), &state);
        assert_eq!(grid.list.len(), 2, "movies only");
        grid.handle_key(key(KeyCode::Char('m')), &state);
        assert_eq!(grid.list.items()[0].id, 2, "shows only");
    }

    #[test]
    fn delete_requires_two_presses() {
        let state = state();
        let mut grid = LibraryGrid::new();
        let first = grid.handle_key(key(KeyCode::Char('D')), &state);
        assert!(matches!(first.as_slice(), [Action::Toast(_, Severity::Warning)]));
        let second = grid.handle_key(key(KeyCode::Char('D')), &state);
        assert_eq!(
            second,
            vec![Action::DeleteMedia {
                id: 1,
                title: "Alien (1979)".into()
            }]
        );

        grid.handle_key(key(KeyCode::Char('D')), &state);
        grid.handle_key(key(KeyCode::Char('j')), &state);
        let after_move = grid.handle_key(key(KeyCode::Char('D')), &state);
        assert!(
            matches!(after_move.as_slice(), [Action::Toast(..)]),
            "any other key disarms"
        );
    }

    #[test]
    fn scan_and_reload_keys() {
        let state = state();
        let mut grid = LibraryGrid::new();
        assert_eq!(grid.handle_key(key(KeyCode::Char('s')), &state), vec![Action::ScanLibrary]);
        assert_eq!(grid.handle_key(key(KeyCode::Char('g')), &state), vec![Action::ReloadLibrary]);
    }
}
