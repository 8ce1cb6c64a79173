use embassy_time::{Duration, Instant};
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;
use padbridge_types::button::{ButtonId, KeyState};

use crate::config::{ConfigError, DeviceConfig};
use crate::debounce::default_debouncer::DefaultDebouncer;
use crate::debounce::{DebounceState, DebouncerTrait};
use crate::held::HeldSet;
use crate::input_device::InputDevice;
use crate::report::{PendingReport, ReportSink};

/// Number of keys the matrix tracks at the same time by default.
pub const DEFAULT_SLOTS: usize = 10;

/// A matrix key that is currently tracked.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySlot {
    pub row: u8,
    pub col: u8,
    /// Character code of the cell
    pub code: u8,
    pub state: KeyState,
    /// True if `state` changed during the last scan
    pub changed: bool,
    /// When the key was pressed
    since: Instant,
}

impl KeySlot {
    fn new(row: usize, col: usize, code: u8, now: Instant) -> Self {
        Self {
            row: row as u8,
            col: col as u8,
            code,
            state: KeyState::Idle,
            changed: false,
            since: now,
        }
    }

    /// Move the key one step through idle -> pressed -> held -> released -> idle.
    fn advance(&mut self, contact: bool, now: Instant, hold_time: Duration) {
        self.changed = false;
        let next = match self.state {
            KeyState::Idle if contact => {
                self.since = now;
                KeyState::Pressed
            }
            KeyState::Pressed if now.saturating_duration_since(self.since) > hold_time => KeyState::Held,
            KeyState::Pressed | KeyState::Held if !contact => KeyState::Released,
            KeyState::Released => KeyState::Idle,
            state => state,
        };
        if next != self.state {
            self.state = next;
            self.changed = true;
        }
    }
}

/// Scanned key matrix with press/hold/release tracking.
///
/// Columns are driven one at a time, rows are read back. Every cell is
/// debounced; debounced contacts are tracked in at most `SLOTS` key slots.
/// Contacts that find no free slot are ignored until one frees up.
///
/// Keys that enter the held state are recorded in a [`HeldSet`] of
/// `HELD_WORDS` words. Their release is swallowed: the press sent when the key
/// went down stays in the report.
pub struct Matrix<
    In: InputPin,
    Out: OutputPin,
    D: DebouncerTrait<ROW, COL>,
    const ROW: usize,
    const COL: usize,
    const HELD_WORDS: usize = 2,
    const SLOTS: usize = DEFAULT_SLOTS,
> {
    /// Row pins, read
    row_pins: [In; ROW],
    /// Column pins, driven
    col_pins: [Out; COL],
    /// Debouncer
    debouncer: D,
    /// Debounced contact of every cell
    contacts: [[bool; COL]; ROW],
    /// Character code of every cell
    keymap: [[u8; COL]; ROW],
    /// Button id of every cell
    button_ids: [[ButtonId; COL]; ROW],
    hold_time: Duration,
    /// Pin active level
    low_active: bool,
    /// Tracked keys
    slots: Vec<KeySlot, SLOTS>,
    /// Keys currently held
    held: HeldSet<HELD_WORDS>,
    /// Contacts were dropped in the last scan
    overflowing: bool,
}

impl<In: InputPin, Out: OutputPin, const ROW: usize, const COL: usize, const HELD_WORDS: usize, const SLOTS: usize>
    Matrix<In, Out, DefaultDebouncer<ROW, COL>, ROW, COL, HELD_WORDS, SLOTS>
{
    /// Create a matrix with the default debouncer.
    pub fn new<const DN: usize>(
        row_pins: [In; ROW],
        col_pins: [Out; COL],
        config: &DeviceConfig<DN, ROW, COL>,
    ) -> Result<Self, ConfigError> {
        Self::with_debouncer(row_pins, col_pins, DefaultDebouncer::new(config.matrix.debounce), config)
    }
}

impl<
    In: InputPin,
    Out: OutputPin,
    D: DebouncerTrait<ROW, COL>,
    const ROW: usize,
    const COL: usize,
    const HELD_WORDS: usize,
    const SLOTS: usize,
> Matrix<In, Out, D, ROW, COL, HELD_WORDS, SLOTS>
{
    pub fn with_debouncer<const DN: usize>(
        row_pins: [In; ROW],
        mut col_pins: [Out; COL],
        debouncer: D,
        config: &DeviceConfig<DN, ROW, COL>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let held = HeldSet::with_capacity_for(ROW * COL)?;

        let mut button_ids = [[ButtonId::MIN; COL]; ROW];
        for (ids, codes) in button_ids.iter_mut().zip(config.matrix.keymap.iter()) {
            for (id, code) in ids.iter_mut().zip(codes.iter()) {
                *id = config.matrix_button_id(*code).ok_or(ConfigError::TooManyButtons {
                    count: DeviceConfig::<DN, ROW, COL>::button_count(),
                })?;
            }
        }

        // Park every column at its idle level
        for pin in col_pins.iter_mut() {
            Self::drive(pin, false, config.matrix.low_active);
        }

        Ok(Self {
            row_pins,
            col_pins,
            debouncer,
            contacts: [[false; COL]; ROW],
            keymap: config.matrix.keymap,
            button_ids,
            hold_time: config.matrix.hold_time,
            low_active: config.matrix.low_active,
            slots: Vec::new(),
            held,
            overflowing: false,
        })
    }

    fn drive(pin: &mut Out, active: bool, low_active: bool) {
        if active == low_active {
            pin.set_low().ok();
        } else {
            pin.set_high().ok();
        }
    }

    /// Scan the whole matrix once and advance every tracked key.
    pub fn scan(&mut self, now: Instant) {
        self.scan_contacts(now);
        self.update_slots(now);
    }

    fn scan_contacts(&mut self, now: Instant) {
        for (col_idx, col_pin) in self.col_pins.iter_mut().enumerate() {
            Self::drive(col_pin, true, self.low_active);

            for (row_idx, row_pin) in self.row_pins.iter_mut().enumerate() {
                let contact = if self.low_active {
                    row_pin.is_low().ok().unwrap_or_default()
                } else {
                    row_pin.is_high().ok().unwrap_or_default()
                };

                let debounce_state = self.debouncer.detect_change_with_debounce(
                    row_idx,
                    col_idx,
                    contact,
                    self.contacts[row_idx][col_idx],
                    now,
                );

                if let DebounceState::Debounced = debounce_state {
                    self.contacts[row_idx][col_idx] = contact;
                }
            }

            // Back to idle
            Self::drive(col_pin, false, self.low_active);
        }
    }

    fn update_slots(&mut self, now: Instant) {
        // Keys that decayed to idle in the previous scan give their slot back
        self.slots.retain(|slot| slot.state != KeyState::Idle);

        let mut dropped = 0usize;
        for row in 0..ROW {
            for col in 0..COL {
                let contact = self.contacts[row][col];
                if let Some(slot) = self
                    .slots
                    .iter_mut()
                    .find(|slot| slot.row as usize == row && slot.col as usize == col)
                {
                    slot.advance(contact, now, self.hold_time);
                } else if contact {
                    let mut slot = KeySlot::new(row, col, self.keymap[row][col], now);
                    slot.advance(contact, now, self.hold_time);
                    if self.slots.push(slot).is_err() {
                        dropped += 1;
                    }
                }
            }
        }

        if dropped > 0 && !self.overflowing {
            warn!("{} matrix keys ignored, all {} key slots are in use", dropped, SLOTS);
        }
        self.overflowing = dropped > 0;
    }

    /// Keys whose state changed in the last scan, in scan order.
    pub fn changed_keys(&self) -> impl Iterator<Item = &KeySlot> {
        self.slots.iter().filter(|slot| slot.changed)
    }

    /// All tracked keys.
    pub fn keys(&self) -> &[KeySlot] {
        &self.slots
    }

    pub fn held(&self) -> &HeldSet<HELD_WORDS> {
        &self.held
    }

    /// Debounced contact of a cell.
    pub fn contact(&self, row: usize, col: usize) -> bool {
        self.contacts
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or_default()
    }
}

impl<
    In: InputPin,
    Out: OutputPin,
    D: DebouncerTrait<ROW, COL>,
    const ROW: usize,
    const COL: usize,
    const HELD_WORDS: usize,
    const SLOTS: usize,
> InputDevice for Matrix<In, Out, D, ROW, COL, HELD_WORDS, SLOTS>
{
    fn poll<S: ReportSink>(&mut self, report: &mut PendingReport<S>, now: Instant) -> bool {
        self.scan(now);

        let mut changed = false;
        for slot in self.slots.iter().filter(|slot| slot.changed) {
            let id = self.button_ids[slot.row as usize][slot.col as usize];
            match slot.state {
                KeyState::Pressed => {
                    debug!("Matrix key ({}, {}) pressed, button {}", slot.row, slot.col, id);
                    // Every press is sent, even when the button is still latched by an earlier hold
                    report.press(id);
                    report.mark_dirty();
                    changed = true;
                }
                KeyState::Held => {
                    // No report change: the button stays pressed while held
                    // and its release is swallowed below.
                    self.held.insert(slot.code);
                    debug!("Matrix key ({}, {}) held, button {}", slot.row, slot.col, id);
                }
                KeyState::Released => {
                    if self.held.remove(slot.code) {
                        debug!("Matrix key ({}, {}) released after hold, button {} stays pressed", slot.row, slot.col, id);
                    } else {
                        debug!("Matrix key ({}, {}) released, button {}", slot.row, slot.col, id);
                        changed |= report.release(id);
                    }
                }
                KeyState::Idle => {}
            }
        }
        changed
    }
}
