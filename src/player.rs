//! Playback over a loaded trace: a cursor across the recorded interactions,
//! an auto-step timer, and the control actions the panel exposes.

use std::time::{Duration, Instant};

use crate::trace::CallStatus;

/// Enablement for each playback control, derived from player position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlStates {
    pub start: bool,
    pub back: bool,
    pub goto: bool,
    pub next: bool,
    pub end: bool,
    pub rerun: bool,
}

/// Action sink for the playback controls. One method per control. All of
/// them are fire-and-forget mutations; nothing is awaited or sequenced.
pub trait Controls {
    fn start(&mut self);
    fn back(&mut self);
    fn goto(&mut self, call_id: &str);
    fn next(&mut self);
    fn end(&mut self);
    fn rerun(&mut self);
}

pub struct Player {
    /// Ids of the interactions under playback, in recorded order.
    ids: Vec<String>,
    /// Index of the call the playback is at; `ids.len()` means past the end.
    cursor: usize,
    playing: bool,
    tick_interval: Duration,
    last_step: Instant,
    /// Set by `rerun`; the app picks this up and reloads the trace from disk.
    rerun_requested: bool,
    has_source: bool,
}

impl Player {
    /// A freshly loaded trace starts at the end, showing recorded statuses.
    pub fn new(ids: Vec<String>, tick_interval: Duration, has_source: bool) -> Self {
        let cursor = ids.len();
        Self {
            ids,
            cursor,
            playing: false,
            tick_interval,
            last_step: Instant::now(),
            rerun_requested: false,
            has_source,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Id of the call the playback is paused on, when mid-trace and not
    /// auto-stepping.
    pub fn paused_at(&self) -> Option<&str> {
        if self.playing {
            return None;
        }
        self.ids.get(self.cursor).map(String::as_str)
    }

    /// Resume or pause auto-stepping. Resuming past the end rewinds first.
    pub fn toggle_playing(&mut self) {
        if self.playing {
            self.playing = false;
        } else {
            if self.cursor >= self.ids.len() {
                self.cursor = 0;
            }
            self.playing = !self.ids.is_empty();
            self.last_step = Instant::now();
        }
    }

    /// Restart playback from the first call, auto-stepping. Used after a
    /// rerun reload.
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.playing = !self.ids.is_empty();
        self.last_step = Instant::now();
    }

    /// Advance the auto-step timer. Called once per event-loop tick.
    pub fn tick(&mut self) {
        if !self.playing || self.last_step.elapsed() < self.tick_interval {
            return;
        }
        self.last_step = Instant::now();
        self.cursor += 1;
        if self.cursor >= self.ids.len() {
            self.cursor = self.ids.len();
            self.playing = false;
        }
    }

    /// Consume a pending rerun request, if any.
    pub fn take_rerun_request(&mut self) -> bool {
        std::mem::take(&mut self.rerun_requested)
    }

    /// Effective status for the interaction at `index`: while playback is
    /// mid-trace, calls behind the cursor show their recorded status, the
    /// call at the cursor shows active, and calls ahead show waiting. At the
    /// end the recorded statuses pass through untouched.
    pub fn effective_status(&self, index: usize, recorded: Option<CallStatus>) -> CallStatus {
        if self.cursor >= self.ids.len() {
            return recorded.unwrap_or(CallStatus::Done);
        }
        match index.cmp(&self.cursor) {
            std::cmp::Ordering::Less => recorded.unwrap_or(CallStatus::Done),
            std::cmp::Ordering::Equal => CallStatus::Active,
            std::cmp::Ordering::Greater => CallStatus::Waiting,
        }
    }

    pub fn control_states(&self) -> ControlStates {
        ControlStates {
            start: self.cursor > 0,
            back: self.cursor > 0,
            goto: !self.ids.is_empty(),
            next: self.cursor < self.ids.len(),
            end: self.cursor < self.ids.len(),
            rerun: self.has_source,
        }
    }
}

impl Controls for Player {
    fn start(&mut self) {
        self.cursor = 0;
        self.playing = false;
    }

    fn back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
        self.playing = false;
    }

    fn goto(&mut self, call_id: &str) {
        if let Some(index) = self.ids.iter().position(|id| id == call_id) {
            self.cursor = index;
            self.playing = false;
        }
    }

    fn next(&mut self) {
        self.cursor = (self.cursor + 1).min(self.ids.len());
        self.playing = false;
    }

    fn end(&mut self) {
        self.cursor = self.ids.len();
        self.playing = false;
    }

    fn rerun(&mut self) {
        self.rerun_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(n: usize) -> Player {
        let ids = (0..n).map(|i| format!("c{i}")).collect();
        Player::new(ids, Duration::from_millis(0), true)
    }

    #[test]
    fn test_fresh_player_sits_at_end() {
        let p = player(3);
        assert_eq!(p.cursor(), 3);
        assert!(!p.is_playing());
        assert!(p.paused_at().is_none());
    }

    #[test]
    fn test_stepping_and_bounds() {
        let mut p = player(2);
        p.start();
        assert_eq!(p.cursor(), 0);
        p.back();
        assert_eq!(p.cursor(), 0);
        p.next();
        p.next();
        p.next();
        assert_eq!(p.cursor(), 2);
    }

    #[test]
    fn test_goto_pauses_at_call() {
        let mut p = player(3);
        p.goto("c1");
        assert_eq!(p.cursor(), 1);
        assert_eq!(p.paused_at(), Some("c1"));
        p.goto("missing");
        assert_eq!(p.cursor(), 1);
    }

    #[test]
    fn test_enablement_tracks_position() {
        let mut p = player(2);
        let states = p.control_states();
        assert!(states.start && states.back && !states.next && !states.end);

        p.start();
        let states = p.control_states();
        assert!(!states.start && !states.back && states.next && states.end);
        assert!(states.goto && states.rerun);
    }

    #[test]
    fn test_empty_trace_disables_everything_but_rerun() {
        let p = player(0);
        let states = p.control_states();
        assert_eq!(
            states,
            ControlStates {
                rerun: true,
                ..ControlStates::default()
            }
        );
    }

    #[test]
    fn test_effective_status_during_playback() {
        let mut p = player(3);
        p.goto("c1");
        assert_eq!(p.effective_status(0, Some(CallStatus::Error)), CallStatus::Error);
        assert_eq!(p.effective_status(1, Some(CallStatus::Done)), CallStatus::Active);
        assert_eq!(p.effective_status(2, Some(CallStatus::Done)), CallStatus::Waiting);
    }

    #[test]
    fn test_recorded_statuses_pass_through_at_end() {
        let p = player(2);
        assert_eq!(p.effective_status(0, Some(CallStatus::Error)), CallStatus::Error);
        assert_eq!(p.effective_status(1, None), CallStatus::Done);
    }

    #[test]
    fn test_tick_advances_and_stops_at_end() {
        let mut p = player(2);
        p.restart();
        assert!(p.is_playing());
        p.tick();
        assert_eq!(p.cursor(), 1);
        p.tick();
        assert_eq!(p.cursor(), 2);
        assert!(!p.is_playing());
    }

    #[test]
    fn test_rerun_is_a_flag_for_the_app() {
        let mut p = player(1);
        Controls::rerun(&mut p);
        assert!(p.take_rerun_request());
        assert!(!p.take_rerun_request());
    }

    #[test]
    fn test_toggle_playing_rewinds_from_end() {
        let mut p = player(2);
        p.toggle_playing();
        assert!(p.is_playing());
        assert_eq!(p.cursor(), 0);
        p.toggle_playing();
        assert!(!p.is_playing());
    }
}
