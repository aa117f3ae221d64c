use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::PanelConfig;
use crate::player::{ControlStates, Controls, Player};
use crate::trace::{Call, CallStatus, SerializedError, Trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// One rendered row of the interactions list: a top-level call or an
/// expanded child call.
pub struct RowView<'a> {
    pub call: &'a Call,
    pub status: CallStatus,
    pub depth: usize,
    pub has_children: bool,
    pub collapsed: bool,
    /// Playback is paused on this call.
    pub paused_here: bool,
}

pub struct App {
    pub trace: Trace,
    pub trace_path: Option<PathBuf>,
    pub config: PanelConfig,
    pub player: Player,
    pub popup: Popup,

    // List state
    pub selected: usize,
    collapsed: HashSet<String>,
    pub follow_end: bool,

    // Status line (auto-clears after timeout)
    pub status_message: Option<String>,
    status_message_time: Option<Instant>,
}

impl App {
    pub fn new(trace: Trace, trace_path: Option<PathBuf>, config: PanelConfig) -> Self {
        let player = Self::build_player(&trace, &config, trace_path.is_some());
        let follow_end = config.follow_end;
        Self {
            trace,
            trace_path,
            config,
            player,
            popup: Popup::None,
            selected: 0,
            collapsed: HashSet::new(),
            follow_end,
            status_message: None,
            status_message_time: None,
        }
    }

    fn build_player(trace: &Trace, config: &PanelConfig, has_source: bool) -> Player {
        let ids = trace
            .interactions(config.show_hidden_calls)
            .iter()
            .map(|c| c.id.clone())
            .collect();
        Player::new(ids, Duration::from_millis(config.playback_tick_ms), has_source)
    }

    /// Set a status message (auto-clears after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    // --- Snapshot accessors the panel renders from ---

    pub fn interactions(&self) -> Vec<&Call> {
        self.trace.interactions(self.config.show_hidden_calls)
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions().len()
    }

    pub fn caught_exception(&self) -> Option<&SerializedError> {
        self.trace.caught_exception.as_ref()
    }

    /// Unhandled errors as the panel should see them. The config gate hides
    /// the whole collection, absence included, so the block never renders.
    pub fn unhandled_errors(&self) -> Option<&[SerializedError]> {
        if self.config.ignore_unhandled_errors {
            return None;
        }
        self.trace.unhandled_errors.as_deref()
    }

    pub fn control_states(&self) -> ControlStates {
        self.player.control_states()
    }

    /// The interactions list with collapsed subtrees folded away and
    /// playback statuses applied.
    pub fn rows(&self) -> Vec<RowView<'_>> {
        let mut rows = Vec::new();
        let by_id = self.trace.calls_by_id();
        for (index, call) in self.interactions().into_iter().enumerate() {
            let child_ids = self.trace.child_call_ids(&call.id);
            let collapsed = self.collapsed.contains(&call.id);
            let status = self.player.effective_status(index, call.status);
            rows.push(RowView {
                call,
                status,
                depth: 0,
                has_children: !child_ids.is_empty(),
                collapsed,
                paused_here: self.player.paused_at() == Some(call.id.as_str()),
            });
            if collapsed {
                continue;
            }
            for child_id in child_ids {
                let Some(&child) = by_id.get(child_id) else {
                    continue;
                };
                if child.hidden && !self.config.show_hidden_calls {
                    continue;
                }
                // Children of a not-yet-played call have not run either.
                let child_status = if status == CallStatus::Waiting {
                    CallStatus::Waiting
                } else {
                    child.status.unwrap_or(CallStatus::Done)
                };
                rows.push(RowView {
                    call: child,
                    status: child_status,
                    depth: 1,
                    has_children: false,
                    collapsed: false,
                    paused_here: false,
                });
            }
        }
        rows
    }

    // --- Key handling ---

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.popup != Popup::None {
            return self.handle_popup_key(key);
        }

        match key.code {
            // List navigation
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            // Fold the selected call's children
            KeyCode::Char(' ') => self.toggle_collapsed(),

            // Playback controls
            KeyCode::Char('g') | KeyCode::Home => {
                self.player.start();
                self.follow_end = false;
            }
            KeyCode::Left | KeyCode::Char('[') => {
                self.player.back();
                self.follow_end = false;
            }
            KeyCode::Right | KeyCode::Char(']') => self.player.next(),
            KeyCode::Char('G') | KeyCode::End => self.player.end(),
            KeyCode::Enter => self.goto_selected(),
            KeyCode::Char('r') => {
                if self.trace_path.is_some() {
                    self.player.rerun();
                } else {
                    self.set_status("No trace file to rerun");
                }
            }
            KeyCode::Char('p') => self.player.toggle_playing(),

            // Scroll-to-end: jump the selection to the newest call
            KeyCode::Char('e') => self.scroll_to_end(),
            KeyCode::Char('f') => {
                self.follow_end = !self.follow_end;
                self.set_status(if self.follow_end {
                    "Following playback"
                } else {
                    "Follow off"
                });
            }

            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')
        ) {
            self.popup = Popup::None;
        }
        Ok(())
    }

    fn move_down(&mut self) {
        let len = self.rows().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
            self.follow_end = false;
        }
    }

    fn move_up(&mut self) {
        let len = self.rows().len();
        if len > 0 {
            self.selected = self.selected.checked_sub(1).unwrap_or(len - 1);
            self.follow_end = false;
        }
    }

    fn toggle_collapsed(&mut self) {
        let Some(id) = self
            .rows()
            .get(self.selected)
            .filter(|row| row.has_children)
            .map(|row| row.call.id.clone())
        else {
            return;
        };
        if !self.collapsed.remove(&id) {
            self.collapsed.insert(id);
        }
        self.clamp_selection();
    }

    /// Jump playback to the selected row. For a child row this targets its
    /// top-level ancestor, since playback steps over interactions.
    fn goto_selected(&mut self) {
        let Some(id) = self.rows().get(self.selected).map(|r| r.call.id.clone()) else {
            return;
        };
        let target = self.top_level_ancestor(&id).unwrap_or(id);
        self.player.goto(&target);
        self.follow_end = false;
    }

    fn top_level_ancestor(&self, id: &str) -> Option<String> {
        let by_id = self.trace.calls_by_id();
        let mut current = by_id.get(id)?;
        while let Some(parent_id) = current.parent_id.as_deref() {
            current = by_id.get(parent_id)?;
        }
        Some(current.id.clone())
    }

    fn scroll_to_end(&mut self) {
        let len = self.rows().len();
        if len > 0 {
            self.selected = len - 1;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    // --- Tick ---

    pub fn tick(&mut self) {
        self.player.tick();

        if self.player.take_rerun_request() {
            self.reload_trace();
        }

        // Track the playback cursor while following
        if self.follow_end && self.player.is_playing() {
            let rows = self.rows();
            self.selected = rows
                .iter()
                .position(|row| row.depth == 0 && row.status == CallStatus::Active)
                .unwrap_or_else(|| rows.len().saturating_sub(1));
        }

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    fn reload_trace(&mut self) {
        let Some(path) = self.trace_path.clone() else {
            return;
        };
        match Trace::load(&path) {
            Ok(trace) => {
                self.trace = trace;
                self.collapsed.clear();
                self.player =
                    Self::build_player(&self.trace, &self.config, true);
                self.player.restart();
                self.follow_end = self.config.follow_end;
                self.clamp_selection();
                self.set_status("Rerunning trace");
            }
            Err(e) => {
                tracing::warn!("rerun failed: {e}");
                self.set_status(format!("Rerun failed: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn trace_with_children() -> Trace {
        serde_json::from_str(
            r#"{
                "fileName": "form.test.ts",
                "calls": [
                    {"id": "a", "method": "userEvent.type", "args": "input, hi", "status": "done"},
                    {"id": "a1", "method": "within", "parentId": "a", "status": "done"},
                    {"id": "b", "method": "userEvent.click", "args": "button", "status": "error"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn app(trace: Trace) -> App {
        App::new(trace, None, PanelConfig::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_rows_expand_children() {
        let app = app(trace_with_children());
        let rows = app.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].call.id, "a");
        assert!(rows[0].has_children);
        assert_eq!(rows[1].call.id, "a1");
        assert_eq!(rows[1].depth, 1);
    }

    #[test]
    fn test_collapse_folds_subtree() {
        let mut app = app(trace_with_children());
        app.selected = 0;
        app.handle_key(key(KeyCode::Char(' '))).unwrap();
        let rows = app.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].collapsed);

        app.handle_key(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(app.rows().len(), 3);
    }

    #[test]
    fn test_goto_from_child_targets_ancestor() {
        let mut app = app(trace_with_children());
        app.selected = 1; // child row "a1"
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.player.paused_at(), Some("a"));
    }

    #[test]
    fn test_playback_statuses_flow_into_rows() {
        let mut app = app(trace_with_children());
        app.player.start();
        let rows = app.rows();
        assert_eq!(rows[0].status, CallStatus::Active);
        assert!(rows[0].paused_here);
        // "b" is the second interaction, ahead of the cursor.
        assert_eq!(rows[2].status, CallStatus::Waiting);
        // The child of the active call keeps its recorded status.
        assert_eq!(rows[1].status, CallStatus::Done);
    }

    #[test]
    fn test_waiting_parent_dims_children() {
        let trace: Trace = serde_json::from_str(
            r#"{
                "calls": [
                    {"id": "a", "method": "click", "status": "done"},
                    {"id": "b", "method": "type", "status": "done"},
                    {"id": "b1", "method": "within", "parentId": "b", "status": "done"}
                ]
            }"#,
        )
        .unwrap();
        let mut app = app(trace);
        app.player.start();
        // "b" is ahead of the cursor, so its recorded-done child dims too.
        let rows = app.rows();
        assert_eq!(rows[1].status, CallStatus::Waiting);
        assert_eq!(rows[2].status, CallStatus::Waiting);
    }

    #[test]
    fn test_unhandled_errors_gated_by_config() {
        let mut trace = trace_with_children();
        trace.unhandled_errors = Some(vec![]);
        let mut config = PanelConfig::default();
        config.ignore_unhandled_errors = true;
        let app = App::new(trace, None, config);
        assert!(app.unhandled_errors().is_none());
    }

    #[test]
    fn test_hidden_calls_respect_config() {
        let mut trace = trace_with_children();
        trace.calls.push(Call {
            id: "probe".to_string(),
            method: "internal.probe".to_string(),
            args: String::new(),
            status: None,
            parent_id: None,
            hidden: true,
        });

        let visible = app(trace.clone());
        assert_eq!(visible.interaction_count(), 2);

        let mut config = PanelConfig::default();
        config.show_hidden_calls = true;
        let all = App::new(trace, None, config);
        assert_eq!(all.interaction_count(), 3);
    }

    #[test]
    fn test_selection_wraps() {
        let mut app = app(trace_with_children());
        app.handle_key(key(KeyCode::Up)).unwrap();
        assert_eq!(app.selected, 2);
        app.handle_key(key(KeyCode::Down)).unwrap();
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_rerun_without_source_reports() {
        let mut app = app(trace_with_children());
        app.handle_key(key(KeyCode::Char('r'))).unwrap();
        assert_eq!(app.status_message.as_deref(), Some("No trace file to rerun"));
    }
}
