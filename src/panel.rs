//! Presentation policy for the interactions panel: which overall status the
//! run shows and which optional sections render. Everything here is a pure
//! function of the snapshot handed to it, recomputed on every frame.

use crate::trace::{is_assertion_failure, SerializedError};

/// Overall status shown for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStatus {
    Active,
    Error,
    Done,
}

impl PanelStatus {
    /// Strict precedence: playing beats mismatch beats exception beats done.
    pub fn derive(is_playing: bool, has_result_mismatch: bool, has_exception: bool) -> Self {
        if is_playing {
            return Self::Active;
        }
        if has_result_mismatch {
            return Self::Error;
        }
        if has_exception {
            Self::Error
        } else {
            Self::Done
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "RUNS",
            Self::Error => "FAIL",
            Self::Done => "PASS",
        }
    }
}

/// Banner warning that this run's results differ from the CLI run.
pub fn show_discrepancy_banner(has_result_mismatch: bool) -> bool {
    has_result_mismatch
}

/// Controls bar renders whenever there is anything to control or inspect.
pub fn show_controls_bar(interaction_count: usize, has_exception: bool) -> bool {
    interaction_count > 0 || has_exception
}

/// Caught exceptions render unless they are failed expectations, which the
/// call row that raised them already shows.
pub fn show_caught_exception(caught: Option<&SerializedError>) -> bool {
    caught.is_some_and(|e| !is_assertion_failure(e))
}

/// Presence alone triggers the block, even for an empty collection.
pub fn show_unhandled_errors(unhandled: Option<&[SerializedError]>) -> bool {
    unhandled.is_some()
}

pub fn show_empty_state(
    is_playing: bool,
    caught: Option<&SerializedError>,
    interaction_count: usize,
) -> bool {
    !is_playing && caught.is_none() && interaction_count == 0
}

/// Header for the unhandled-errors block. The suffix only appears above one:
/// a count of zero reads "Found 0 unhandled error".
pub fn unhandled_errors_header(count: usize) -> String {
    format!(
        "Found {} unhandled error{}",
        count,
        if count > 1 { "s" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caught(name: &str, message: &str) -> SerializedError {
        SerializedError {
            name: name.to_string(),
            message: message.to_string(),
            stack: None,
        }
    }

    #[test]
    fn test_status_derivation_truth_table() {
        for playing in [false, true] {
            for mismatch in [false, true] {
                for exception in [false, true] {
                    let status = PanelStatus::derive(playing, mismatch, exception);
                    let expected = if playing {
                        PanelStatus::Active
                    } else if mismatch || exception {
                        PanelStatus::Error
                    } else {
                        PanelStatus::Done
                    };
                    assert_eq!(
                        status, expected,
                        "playing={playing} mismatch={mismatch} exception={exception}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_playing_overrides_error_flags() {
        assert_eq!(PanelStatus::derive(true, true, true), PanelStatus::Active);
    }

    #[test]
    fn test_empty_trace_shows_placeholder_not_controls() {
        assert!(show_empty_state(false, None, 0));
        assert!(!show_controls_bar(0, false));
    }

    #[test]
    fn test_single_interaction_shows_controls_not_placeholder() {
        assert!(show_controls_bar(1, false));
        assert!(!show_empty_state(false, None, 1));
    }

    #[test]
    fn test_exception_alone_shows_controls() {
        assert!(show_controls_bar(0, true));
    }

    #[test]
    fn test_caught_exception_skips_assertion_failures() {
        let crash = caught("TypeError", "boom");
        let assertion = caught("AssertionError", "expected 1 to be 2");
        assert!(show_caught_exception(Some(&crash)));
        assert!(!show_caught_exception(Some(&assertion)));
        assert!(!show_caught_exception(None));
    }

    #[test]
    fn test_placeholder_suppressed_by_playing_or_exception() {
        let crash = caught("TypeError", "boom");
        assert!(!show_empty_state(true, None, 0));
        assert!(!show_empty_state(false, Some(&crash), 0));
    }

    #[test]
    fn test_unhandled_errors_presence_triggers_block() {
        assert!(show_unhandled_errors(Some(&[])));
        assert!(!show_unhandled_errors(None));
    }

    #[test]
    fn test_unhandled_errors_header_pluralization() {
        assert_eq!(unhandled_errors_header(0), "Found 0 unhandled error");
        assert_eq!(unhandled_errors_header(1), "Found 1 unhandled error");
        assert_eq!(unhandled_errors_header(2), "Found 2 unhandled errors");
    }

    #[test]
    fn test_mismatch_scenario() {
        let status = PanelStatus::derive(false, true, false);
        assert_eq!(status, PanelStatus::Error);
        assert!(show_discrepancy_banner(true));
        assert!(show_controls_bar(1, false));
    }
}
