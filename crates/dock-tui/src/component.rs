//! The interface every panel and overlay implements.
//!
//! Components own their local UI state (selection, input boxes, pending
//! confirmations), read everything else from [`AppState`], and answer input
//! with [`Action`]s that the app loop carries out.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Only called while this component has focus.
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action>;

    /// Called every UI tick (~100ms) for time-based expiry.
    fn tick(&mut self, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState);

    /// True while a text box owns the keyboard, so global keys must not fire.
    fn captures_input(&self) -> bool {
        false
    }
}
