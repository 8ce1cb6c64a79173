use embassy_time::{Duration, Instant};

use super::{DebounceState, DebouncerTrait};
use crate::config::DEFAULT_DEBOUNCE;

/// Tracks the debounce state of a single key.
#[derive(Copy, Clone, Debug, PartialEq)]
enum DebounceCounter {
    /// The key is in a stable state (idle).
    Idle,
    /// The key is in a transient state (debouncing).
    /// The payload is the timestamp at which the change was first seen.
    Debouncing(Instant),
}

/// Default per-key debouncer.
///
/// A level change is accepted once it has been observed continuously for the
/// settle interval. Returning to the stable level earlier cancels it.
pub struct DefaultDebouncer<const ROW: usize, const COL: usize> {
    counters: [[DebounceCounter; COL]; ROW],
    threshold: Duration,
}

impl<const ROW: usize, const COL: usize> Default for DefaultDebouncer<ROW, COL> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl<const ROW: usize, const COL: usize> DefaultDebouncer<ROW, COL> {
    pub fn new(threshold: Duration) -> Self {
        DefaultDebouncer {
            counters: [[DebounceCounter::Idle; COL]; ROW],
            threshold,
        }
    }
}

impl<const ROW: usize, const COL: usize> DebouncerTrait<ROW, COL> for DefaultDebouncer<ROW, COL> {
    fn detect_change_with_debounce(
        &mut self,
        row_idx: usize,
        col_idx: usize,
        key_active: bool,
        stable: bool,
        now: Instant,
    ) -> DebounceState {
        let counter = &mut self.counters[row_idx][col_idx];

        // If the current physical level matches the accepted one,
        // the key is stable, no debouncing is needed.
        if stable == key_active {
            *counter = DebounceCounter::Idle;
            return DebounceState::Ignored;
        }

        match *counter {
            DebounceCounter::Idle if self.threshold == Duration::from_ticks(0) => DebounceState::Debounced,
            DebounceCounter::Idle => {
                // Detected a new potential state change.
                *counter = DebounceCounter::Debouncing(now);
                DebounceState::InProgress
            }
            DebounceCounter::Debouncing(start) => {
                if now.saturating_duration_since(start) >= self.threshold {
                    *counter = DebounceCounter::Idle;
                    DebounceState::Debounced
                } else {
                    DebounceState::InProgress
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_glitch_shorter_than_interval_is_dropped() {
        let mut debouncer: DefaultDebouncer<1, 1> = DefaultDebouncer::new(Duration::from_millis(10));
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 0, true, false, at(0)),
            DebounceState::InProgress
        );
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 0, true, false, at(9)),
            DebounceState::InProgress
        );
        // Bounced back before the interval elapsed
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 0, false, false, at(10)),
            DebounceState::Ignored
        );
        // A new change restarts the interval
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 0, true, false, at(12)),
            DebounceState::InProgress
        );
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 0, true, false, at(21)),
            DebounceState::InProgress
        );
    }

    #[test]
    fn test_stable_change_is_accepted_once() {
        let mut debouncer: DefaultDebouncer<1, 2> = DefaultDebouncer::new(Duration::from_millis(10));
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 1, true, false, at(100)),
            DebounceState::InProgress
        );
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 1, true, false, at(110)),
            DebounceState::Debounced
        );
        // The caller now holds `true` as the stable level
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 1, true, true, at(111)),
            DebounceState::Ignored
        );
        // Other keys are untouched
        assert_eq!(
            debouncer.detect_change_with_debounce(0, 0, false, false, at(111)),
            DebounceState::Ignored
        );
    }

    #[test]
    fn test_zero_threshold_accepts_immediately() {
        let mut debouncer: DefaultDebouncer<2, 2> = DefaultDebouncer::new(Duration::from_ticks(0));
        assert_eq!(
            debouncer.detect_change_with_debounce(1, 1, true, false, at(0)),
            DebounceState::Debounced
        );
    }
}
