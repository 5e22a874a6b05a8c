//! Auto-save manager with debouncing.
//!
//! Saves are scheduled after editing pauses: every mutation re-arms a
//! fixed quiescence window, and the session polls [`AutoSaveManager::should_save`]
//! once per tick to find out when the window has elapsed.

use std::time::Duration;
use web_time::Instant;

use crate::constants::DEFAULT_AUTOSAVE_DEBOUNCE_MS;

/// Manages auto-save timing with debouncing.
///
/// A classic debounce: rapid changes (every drag frame of a resize, say)
/// keep pushing the deadline back, so the file is written once per editing
/// pause instead of once per event.
#[derive(Debug, Clone)]
pub struct AutoSaveManager {
    /// Debounce delay (wait this long after the last change before saving).
    debounce_delay: Duration,

    /// Time of last change that needs saving.
    last_change: Option<Instant>,

    /// Whether auto-save is enabled.
    enabled: bool,

    /// Whether there are unsaved changes.
    dirty: bool,
}

impl AutoSaveManager {
    /// Default debounce delay (1 second).
    pub const DEFAULT_DEBOUNCE_DELAY: Duration =
        Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS);

    /// Create a new auto-save manager. Auto-save starts disabled; the host
    /// enables it when the user flips the toggle.
    pub fn new() -> Self {
        Self {
            debounce_delay: Self::DEFAULT_DEBOUNCE_DELAY,
            last_change: None,
            enabled: false,
            dirty: false,
        }
    }

    /// Set the debounce delay.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Mark that a change occurred that needs saving.
    ///
    /// Re-arms the debounce window: the pending deadline moves to
    /// now + delay.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.last_change = Some(Instant::now());
        log::trace!("Auto-save: marked dirty");
    }

    /// Check if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if we should save now.
    ///
    /// Returns true if auto-save is enabled, there are unsaved changes,
    /// and the debounce delay has passed since the last change.
    pub fn should_save(&self) -> bool {
        if !self.enabled || !self.dirty {
            return false;
        }

        let Some(last_change) = self.last_change else {
            return false;
        };

        last_change.elapsed() >= self.debounce_delay
    }

    /// Mark that a save completed successfully.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.last_change = None;
        log::trace!("Auto-save: marked saved");
    }

    /// Mark that a save failed.
    ///
    /// Keeps the dirty flag set but restarts the window, so the retry
    /// happens one delay later instead of on the very next tick.
    pub fn mark_save_failed(&mut self) {
        self.last_change = Some(Instant::now());
        log::trace!("Auto-save: marked save failed");
    }

    /// Set whether auto-save is enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Auto-save: enabled = {enabled}");
    }

    /// Check if auto-save is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get time since last change (if any).
    pub fn time_since_last_change(&self) -> Option<Duration> {
        self.last_change.map(|t| t.elapsed())
    }

    /// Drop any pending save. Used when the image it was armed for is
    /// about to be replaced.
    pub fn reset(&mut self) {
        self.last_change = None;
        self.dirty = false;
    }
}

impl Default for AutoSaveManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let manager = AutoSaveManager::new();
        assert!(!manager.is_dirty());
        assert!(!manager.should_save());
        assert!(!manager.is_enabled());
    }

    #[test]
    fn test_mark_dirty() {
        let mut manager = AutoSaveManager::new();
        manager.mark_dirty();
        assert!(manager.is_dirty());
    }

    #[test]
    fn test_mark_saved() {
        let mut manager = AutoSaveManager::new();
        manager.mark_dirty();
        assert!(manager.is_dirty());

        manager.mark_saved();
        assert!(!manager.is_dirty());
    }

    #[test]
    fn test_disabled_never_saves() {
        let mut manager = AutoSaveManager::new().with_debounce_delay(Duration::ZERO);
        manager.mark_dirty();
        assert!(!manager.should_save());
    }

    #[test]
    fn test_debounce_prevents_immediate_save() {
        let mut manager = AutoSaveManager::new().with_debounce_delay(Duration::from_secs(10));
        manager.set_enabled(true);
        manager.mark_dirty();

        // Should not save immediately due to debounce.
        assert!(!manager.should_save());
    }

    #[test]
    fn test_zero_delay_saves_right_away() {
        let mut manager = AutoSaveManager::new().with_debounce_delay(Duration::ZERO);
        manager.set_enabled(true);
        manager.mark_dirty();
        assert!(manager.should_save());
    }

    #[test]
    fn test_new_change_rearms_the_window() {
        let mut manager = AutoSaveManager::new().with_debounce_delay(Duration::from_millis(300));
        manager.set_enabled(true);
        manager.mark_dirty();

        std::thread::sleep(Duration::from_millis(100));
        manager.mark_dirty();
        std::thread::sleep(Duration::from_millis(100));

        // 200ms since the first change, but only 100ms since the second.
        assert!(!manager.should_save());

        std::thread::sleep(Duration::from_millis(250));
        assert!(manager.should_save());
    }

    #[test]
    fn test_reset_drops_pending_save() {
        let mut manager = AutoSaveManager::new().with_debounce_delay(Duration::ZERO);
        manager.set_enabled(true);
        manager.mark_dirty();
        assert!(manager.should_save());

        manager.reset();
        assert!(!manager.is_dirty());
        assert!(!manager.should_save());
    }

    #[test]
    fn test_failed_save_stays_dirty() {
        let mut manager = AutoSaveManager::new().with_debounce_delay(Duration::ZERO);
        manager.set_enabled(true);
        manager.mark_dirty();

        manager.mark_save_failed();
        assert!(manager.is_dirty());
        assert!(manager.should_save());
    }
}
