// ── Mode controller ──
//
// Tracks `Live` / `Historical(range)` and decides whether a result may
// touch the buffer. Side effects of a transition (poller, fetches) belong
// to the dashboard; this type only persists and answers guard queries.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::{Mode, Origin, SourceKind};
use crate::prefs::{PreferenceStore, SELECTED_RANGE_KEY};

/// Before/after pair returned by [`ModeController::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

pub struct ModeController {
    mode: Mode,
    prefs: Arc<dyn PreferenceStore>,
}

impl fmt::Debug for ModeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeController")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl ModeController {
    /// Restore the mode from preferences. Missing, unreadable, or unknown
    /// values fall back to `Live`.
    pub fn load(prefs: Arc<dyn PreferenceStore>) -> Self {
        let mode = match prefs.get(SELECTED_RANGE_KEY) {
            Ok(Some(value)) => Mode::from_preference(&value).unwrap_or_else(|| {
                warn!(value = %value, "discarding unknown stored time range");
                Mode::Live
            }),
            Ok(None) => Mode::Live,
            Err(e) => {
                warn!(error = %e, "could not read stored time range");
                Mode::Live
            }
        };
        debug!(%mode, "initial mode");
        Self { mode, prefs }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch modes and persist the choice. A persist failure is logged;
    /// the in-memory switch still happens.
    pub fn transition(&mut self, to: Mode) -> Transition {
        let from = self.mode;
        self.mode = to;
        if let Err(e) = self.prefs.set(SELECTED_RANGE_KEY, to.preference_value()) {
            warn!(error = %e, %to, "failed to persist selected time range");
        }
        Transition { from, to }
    }

    /// Whether a result from `source` belongs to the active mode.
    pub fn accepts(&self, source: SourceKind) -> bool {
        self.mode.source() == source
    }

    /// `accepts`, plus historical results must be for the active range.
    pub fn admits(&self, origin: &Origin) -> bool {
        if !self.accepts(origin.source) {
            return false;
        }
        match origin.source {
            SourceKind::Live => true,
            SourceKind::Historical => origin.range == self.mode.range(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::model::TimeRange;
    use crate::prefs::MemoryPreferences;

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, CoreError> {
            Err(CoreError::Preferences {
                message: "disk on fire".into(),
            })
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), CoreError> {
            Err(CoreError::Preferences {
                message: "disk on fire".into(),
            })
        }
    }

    #[test]
    fn initial_mode_comes_from_preferences() {
        let prefs = Arc::new(MemoryPreferences::with(SELECTED_RANGE_KEY, "12h"));
        let controller = ModeController::load(prefs);
        assert_eq!(controller.mode(), Mode::Historical(TimeRange::Hours12));
    }

    #[test]
    fn stale_preference_falls_back_to_live() {
        let prefs = Arc::new(MemoryPreferences::with(SELECTED_RANGE_KEY, "90d"));
        assert_eq!(ModeController::load(prefs).mode(), Mode::Live);
        assert_eq!(ModeController::load(Arc::new(BrokenStore)).mode(), Mode::Live);
    }

    #[test]
    fn transition_persists() {
        let prefs = Arc::new(MemoryPreferences::new());
        let mut controller = ModeController::load(prefs.clone());
        let t = controller.transition(Mode::Historical(TimeRange::Hour1));
        assert!(t.changed());
        assert_eq!(
            prefs.get(SELECTED_RANGE_KEY).ok().flatten().as_deref(),
            Some("1h")
        );
        assert_eq!(ModeController::load(prefs).mode(), Mode::Historical(TimeRange::Hour1));
    }

    #[test]
    fn persist_failure_does_not_block_transition() {
        let mut controller = ModeController::load(Arc::new(BrokenStore));
        controller.transition(Mode::Historical(TimeRange::Days7));
        assert_eq!(controller.mode(), Mode::Historical(TimeRange::Days7));
    }

    #[test]
    fn guard_matches_source_and_range() {
        let mut controller = ModeController::load(Arc::new(MemoryPreferences::new()));
        assert!(controller.accepts(SourceKind::Live));
        assert!(!controller.accepts(SourceKind::Historical));

        controller.transition(Mode::Historical(TimeRange::Hour1));
        assert!(!controller.admits(&Origin::live(None)));
        assert!(!controller.admits(&Origin::historical(TimeRange::Minutes15, None)));
        assert!(controller.admits(&Origin::historical(TimeRange::Hour1, None)));
    }
}
