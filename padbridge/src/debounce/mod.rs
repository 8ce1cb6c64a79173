use embassy_time::Instant;

pub mod default_debouncer;

/// Per-key debouncer of a `ROW` x `COL` grid of inputs.
///
/// Direct buttons use a single row.
pub trait DebouncerTrait<const ROW: usize, const COL: usize> {
    /// Feed the raw `key_active` level sampled at `now`, compared against the
    /// currently accepted `stable` level of the key.
    fn detect_change_with_debounce(
        &mut self,
        row_idx: usize,
        col_idx: usize,
        key_active: bool,
        stable: bool,
        now: Instant,
    ) -> DebounceState;
}

/// Debounce state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    /// The raw level differed from the stable one for the whole settle interval
    Debounced,
    /// A change is pending
    InProgress,
    /// Raw and stable levels agree
    Ignored,
}
