//! DownloadsPanel: the Downloads workspace. Torrent transfers on top,
//! transcode jobs below, live throughput and queue summary in the header.

use dock_proto::format::format_bytes;
use dock_proto::Severity;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
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
    theme::{
        job_status_color, style_selected, transfer_state_color, C_ERROR, C_MUTED, C_OK, C_PRIMARY,
        C_SECONDARY,
    },
    view::{job_rows, stats_line, transfer_rows, JobRow, TransferRow},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        progress_bar::gauge_span,
        scrollable_list::ScrollableList,
        text_input::{InputAction, TextInput},
    },
};

const GAUGE_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Pane {
    #[default]
    Transfers,
    Jobs,
}

pub struct DownloadsPanel {
    pane: Pane,
    transfers: ScrollableList<TransferRow>,
    jobs: ScrollableList<JobRow>,
    magnet: TextInput,
    transcode: TextInput,
    confirm_purge: ConfirmGuard<String>,
}

impl DownloadsPanel {
    pub fn new() -> Self {
        Self {
            pane: Pane::default(),
            transfers: ScrollableList::new(),
            jobs: ScrollableList::new(),
            magnet: TextInput::new("magnet", "paste a magnet:? link and press Enter"),
            transcode: TextInput::new("transcode", "source file path on the server, Enter to queue"),
            confirm_purge: ConfirmGuard::default(),
        }
    }

    fn refresh(&mut self, state: &AppState) {
        self.transfers
            .set_items(transfer_rows(&state.transfers), |r| r.hash.clone());
        self.jobs.set_items(job_rows(&state.jobs), |r| r.id);
    }

    fn active_input(&mut self) -> Option<&mut TextInput> {
        if self.magnet.is_active() {
            Some(&mut self.magnet)
        } else if self.transcode.is_active() {
            Some(&mut self.transcode)
        } else {
            None
        }
    }

    fn move_selection(&mut self, down: bool, n: usize) {
        match (self.pane, down) {
            (Pane::Transfers, true) => self.transfers.select_down(n),
            (Pane::Transfers, false) => self.transfers.select_up(n),
            (Pane::Jobs, true) => self.jobs.select_down(n),
            (Pane::Jobs, false) => self.jobs.select_up(n),
        }
    }

    fn transfer_key(&mut self, code: KeyCode) -> Vec<Action> {
        let Some(row) = self.transfers.selected_item() else {
            return vec![];
        };
        let hash = row.hash.clone();
        match code {
            KeyCode::Char('p') if row.can_pause => vec![Action::PauseTransfer(hash)],
            KeyCode::Char('p') => hint(format!("{} is {}, nothing to pause", row.name, row.state)),
            KeyCode::Char('r') if row.can_resume => vec![Action::ResumeTransfer(hash)],
            KeyCode::Char('r') => hint(format!("{} is {}, nothing to resume", row.name, row.state)),
            KeyCode::Char('d') => vec![Action::RemoveTransfer {
                hash,
                delete_files: false,
            }],
            KeyCode::Char('D') => {
                if self.confirm_purge.press(hash.clone(), Instant::now()) {
                    vec![Action::RemoveTransfer {
                        hash,
                        delete_files: true,
                    }]
                } else {
                    vec![Action::Toast(
                        format!("Press D again to remove {} and delete its data", row.name),
                        Severity::Warning,
                    )]
                }
            }
            _ => vec![],
        }
    }

    fn job_key(&mut self, code: KeyCode) -> Vec<Action> {
        let Some(row) = self.jobs.selected_item() else {
            return vec![];
        };
        match code {
            KeyCode::Char('c') if row.can_cancel => vec![Action::CancelJob(row.id)],
            KeyCode::Char('c') => hint("Only pending jobs can be cancelled".to_string()),
            KeyCode::Char('R') if row.can_restart => vec![Action::RestartJob(row.id)],
            KeyCode::Char('R') => hint("Only processing or failed jobs can be restarted".to_string()),
            KeyCode::Char('t') if row.can_retry => vec![Action::RetryJob(row.id)],
            KeyCode::Char('t') => hint("Only failed jobs can be retried".to_string()),
            _ => vec![],
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let mut spans = vec![Span::styled(
            format!(" {}", stats_line(&state.stats)),
            Style::default().fg(C_PRIMARY),
        )];
        if let Some(q) = &state.queue {
            let (label, color) = if q.running {
                ("running", C_OK)
            } else {
                ("idle", C_MUTED)
            };
            spans.push(Span::styled("   queue ", Style::default().fg(C_MUTED)));
            spans.push(Span::styled(label, Style::default().fg(color)));
            spans.push(Span::styled(
                format!(
                    "  {} pending · {} processing · {} done · {} failed",
                    q.pending, q.processing, q.complete, q.failed
                ),
                Style::default().fg(C_SECONDARY),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_transfers(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let total: u64 = state.transfers.iter().map(|t| t.size).sum();
        let badge = Badge::new(format!("{} · {}", self.transfers.len(), format_bytes(total)), C_SECONDARY);
        let block = pane_chrome("transfers", Some("h"), focused, Some(badge));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.transfers.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no transfers, press a to add a magnet", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let width = inner.width as usize;
        let name_w = width.saturating_sub(GAUGE_WIDTH + 7 + 12 + 10 + 10 + 8);
        self.transfers.ensure_visible(height);
        let selected = self.transfers.selected_index();
        let lines: Vec<Line> = self
            .transfers
            .visible_items(height)
            .map(|(i, row)| {
                let mut spans = vec![
                    Span::styled(format!(" {} ", fit(&row.name, name_w)), Style::default().fg(C_PRIMARY)),
                    Span::styled(
                        format!("{:<12}", row.state.label()),
                        Style::default().fg(transfer_state_color(row.state)),
                    ),
                ];
                spans.extend(gauge_span(row.percent, GAUGE_WIDTH));
                spans.push(Span::styled(
                    format!(" {:>10} {:>10} {:>8}", row.size, row.speed, row.eta),
                    Style::default().fg(C_SECONDARY),
                ));
                let line = Line::from(spans);
                if i == selected {
                    line.style(style_selected(focused))
                } else {
                    line
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_jobs(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        let failed = self.jobs.items().iter().filter(|j| j.can_retry).count();
        let badge = if failed > 0 {
            Badge::new(format!("{} failed", failed), C_ERROR)
        } else {
            Badge::new(self.jobs.len().to_string(), C_SECONDARY)
        };
        let block = pane_chrome("transcode jobs", Some("l"), focused, Some(badge));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.jobs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no transcode jobs, press n to queue a file", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let width = inner.width as usize;
        let name_w = (width / 2).max(10);
        self.jobs.ensure_visible(height);
        let selected = self.jobs.selected_index();
        let lines: Vec<Line> = self
            .jobs
            .visible_items(height)
            .map(|(i, row)| {
                let mut spans = vec![
                    Span::styled(format!(" #{:<5}", row.id), Style::default().fg(C_MUTED)),
                    Span::styled(format!("{} ", fit(&row.file_name, name_w)), Style::default().fg(C_PRIMARY)),
                    Span::styled(
                        format!("{:<11}", row.status.label()),
                        Style::default().fg(job_status_color(row.status)),
                    ),
                ];
                spans.extend(gauge_span(f64::from(row.percent), GAUGE_WIDTH));
                if let Some(err) = &row.error {
                    spans.push(Span::styled(
                        format!("  {}", err),
                        Style::default().fg(C_ERROR).add_modifier(Modifier::ITALIC),
                    ));
                }
                let line = Line::from(spans);
                if i == selected {
                    line.style(style_selected(focused))
                } else {
                    line
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn hint(message: String) -> Vec<Action> {
    vec![Action::Toast(message, Severity::Info)]
}

impl Default for DownloadsPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for DownloadsPanel {
    fn id(&self) -> ComponentId {
        ComponentId::DownloadsPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.refresh(state);

        let for_magnet = self.magnet.is_active();
        if let Some(input) = self.active_input() {
            return match input.handle_key(key) {
                InputAction::Submitted(text) => {
                    input.clear();
                    if text.is_empty() {
                        vec![]
                    } else if for_magnet {
                        vec![Action::AddMagnet(text)]
                    } else {
                        vec![Action::QueueTranscode(text)]
                    }
                }
                InputAction::Cancelled => {
                    input.clear();
                    vec![]
                }
                InputAction::Changed(_) | InputAction::None => vec![],
            };
        }
        if key.code != KeyCode::Char('D') {
            self.confirm_purge.cancel();
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false, 1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true, 1),
            KeyCode::PageUp => self.move_selection(false, 10),
            KeyCode::PageDown => self.move_selection(true, 10),
            KeyCode::Left | KeyCode::Char('h') => self.pane = Pane::Transfers,
            KeyCode::Right | KeyCode::Char('l') => self.pane = Pane::Jobs,
            KeyCode::Char('a') => self.magnet.activate(),
            KeyCode::Char('n') => {
                self.pane = Pane::Jobs;
                self.transcode.activate();
            }
            KeyCode::Char('C') => return vec![Action::ClearFinishedJobs],
            code => {
                return match self.pane {
                    Pane::Transfers => self.transfer_key(code),
                    Pane::Jobs => self.job_key(code),
                }
            }
        }
        vec![]
    }

    fn tick(&mut self, _state: &AppState) -> Vec<Action> {
        self.confirm_purge.expire(Instant::now());
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.refresh(state);

        let input_h = u16::from(self.captures_input());
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Percentage(55),
                Constraint::Min(3),
                Constraint::Length(input_h),
            ])
            .split(area);

        self.draw_header(frame, chunks[0], state);
        self.draw_transfers(frame, chunks[1], focused && self.pane == Pane::Transfers, state);
        self.draw_jobs(frame, chunks[2], focused && self.pane == Pane::Jobs);
        if let Some(input) = self.active_input() {
            input.draw(frame, chunks[3]);
        }
    }

    fn captures_input(&self) -> bool {
        self.magnet.is_active() || self.transcode.is_active()
    }
}
