use std::time::Duration;

use tokio::time::Instant;

/// Edge-triggered tracker for the darshan overlay and the haptic pulse that goes with it.
///
/// The overlay is shown while aligned unless the user dismissed it. A dismissal sticks until
/// [DarshanTracker::reset] is called, even across further alignment changes.
#[derive(Debug, Clone)]
pub struct DarshanTracker {
    /// Result of the latest alignment evaluation
    is_aligned: bool,
    /// Whether the last rising edge has been consumed
    was_aligned: bool,
    /// User closed the overlay
    manually_dismissed: bool,
    /// When the last haptic pulse fired
    last_pulse: Option<Instant>,
    /// Minimum time between two pulses
    debounce: Duration,
}

impl DarshanTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            is_aligned: false,
            was_aligned: false,
            manually_dismissed: false,
            last_pulse: None,
            debounce,
        }
    }

    /// Feed the latest alignment result. Returns `true` if a haptic pulse should fire.
    pub fn observe(&mut self, aligned: bool, now: Instant) -> bool {
        self.is_aligned = aligned;

        if aligned && !self.was_aligned && !self.manually_dismissed {
            let pulse = self
                .last_pulse
                .is_none_or(|last| now.saturating_duration_since(last) >= self.debounce);
            if pulse {
                self.last_pulse = Some(now);
            }
            self.was_aligned = true;
            pulse
        } else {
            if !aligned && self.was_aligned {
                self.was_aligned = false;
            }
            false
        }
    }

    /// User closed the overlay, keep it hidden until [DarshanTracker::reset]
    pub fn dismiss(&mut self) {
        self.manually_dismissed = true;
        self.was_aligned = false;
    }

    /// Re-arm the rising edge so the next aligned observation shows the overlay again
    pub fn reset(&mut self) {
        self.manually_dismissed = false;
        self.was_aligned = false;
    }

    pub fn should_show_overlay(&self) -> bool {
        self.is_aligned && !self.manually_dismissed
    }

    pub fn is_dismissed(&self) -> bool {
        self.manually_dismissed
    }

    pub fn last_pulse(&self) -> Option<Instant> {
        self.last_pulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(2000);

    fn ms(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    #[test]
    fn test_rising_edge_pulses_once() {
        let start = Instant::now();
        let mut tracker = DarshanTracker::new(DEBOUNCE);

        assert!(!tracker.observe(false, start));
        assert!(!tracker.should_show_overlay());

        assert!(tracker.observe(true, ms(start, 10)));
        assert!(tracker.should_show_overlay());

        // Staying aligned is level, not an edge
        assert!(!tracker.observe(true, ms(start, 5000)));
        assert!(tracker.should_show_overlay());
        assert_eq!(tracker.last_pulse(), Some(ms(start, 10)));
    }

    #[test]
    fn test_falling_edge_hides_overlay() {
        let start = Instant::now();
        let mut tracker = DarshanTracker::new(DEBOUNCE);

        tracker.observe(true, start);
        assert!(!tracker.observe(false, ms(start, 100)));
        assert!(!tracker.should_show_overlay());
        assert!(!tracker.is_dismissed());
    }

    #[test]
    fn test_pulse_debounced() {
        let start = Instant::now();
        let mut tracker = DarshanTracker::new(DEBOUNCE);

        assert!(tracker.observe(true, start));
        tracker.observe(false, ms(start, 500));
        assert!(
            !tracker.observe(true, ms(start, 1999)),
            "Second pulse inside the debounce window fired"
        );
        // Overlay still follows alignment even without a pulse
        assert!(tracker.should_show_overlay());

        tracker.observe(false, ms(start, 2100));
        assert!(
            tracker.observe(true, ms(start, 4000)),
            "Pulse after the debounce window was suppressed"
        );
    }

    #[test]
    fn test_debounce_boundary_fires() {
        let start = Instant::now();
        let mut tracker = DarshanTracker::new(DEBOUNCE);

        assert!(tracker.observe(true, start));
        tracker.observe(false, ms(start, 1));
        assert!(tracker.observe(true, ms(start, 2000)));
    }

    #[test]
    fn test_dismiss_sticks_until_reset() {
        let start = Instant::now();
        let mut tracker = DarshanTracker::new(DEBOUNCE);

        assert!(tracker.observe(true, start));
        tracker.dismiss();
        assert!(!tracker.should_show_overlay());

        // Still aligned
        assert!(!tracker.observe(true, ms(start, 1000)));
        assert!(!tracker.should_show_overlay());

        // A full falling then rising edge is not enough on its own
        tracker.observe(false, ms(start, 3000));
        assert!(!tracker.observe(true, ms(start, 6000)));
        assert!(!tracker.should_show_overlay());

        tracker.reset();
        assert!(tracker.observe(true, ms(start, 6100)));
        assert!(tracker.should_show_overlay());
    }

    #[test]
    fn test_reset_while_aligned_respects_debounce() {
        let start = Instant::now();
        let mut tracker = DarshanTracker::new(DEBOUNCE);

        assert!(tracker.observe(true, start));
        tracker.dismiss();
        tracker.reset();

        // Overlay comes back but the pulse is still rate limited
        assert!(!tracker.observe(true, ms(start, 500)));
        assert!(tracker.should_show_overlay());
    }
}
