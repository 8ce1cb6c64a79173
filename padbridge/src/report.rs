//! The output report and the sink it is committed to.
use padbridge_types::button::ButtonId;

use crate::config::MAX_BUTTONS;

const BUTTON_WORDS: usize = MAX_BUTTONS / 32;

/// The transport side of the virtual controller, e.g. a BLE gamepad.
///
/// The input core only issues commands; it never reads report contents back.
pub trait ReportSink {
    /// Mark a button as pressed in the next report.
    fn press(&mut self, id: ButtonId);

    /// Mark a button as released in the next report.
    fn release(&mut self, id: ButtonId);

    /// Set the value of the single output axis.
    fn set_axis(&mut self, value: i32);

    /// Send the accumulated report to the host.
    fn flush(&mut self);

    /// Whether the host link is up.
    fn is_connected(&self) -> bool;
}

/// Aggregate output state of one device: pressed buttons, axis value and a
/// dirty flag.
///
/// Every mutation is forwarded to the sink right away, the sink only sends it
/// on [`PendingReport::flush`]. Mutations that don't change the state are
/// dropped, so the sink never sees a press of a pressed button.
pub struct PendingReport<S: ReportSink> {
    sink: S,
    pressed: [u32; BUTTON_WORDS],
    axis: i32,
    dirty: bool,
}

impl<S: ReportSink> PendingReport<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            pressed: [0; BUTTON_WORDS],
            axis: 0,
            dirty: false,
        }
    }

    fn locate(id: ButtonId) -> Option<(usize, u32)> {
        if id.0 == 0 || id.index() >= MAX_BUTTONS {
            return None;
        }
        Some((id.index() / 32, 1 << (id.index() % 32)))
    }

    /// Mark `id` pressed. Returns whether the report changed.
    pub fn press(&mut self, id: ButtonId) -> bool {
        let Some((word, mask)) = Self::locate(id) else {
            warn!("Ignoring press of out-of-range button {}", id);
            return false;
        };
        if self.pressed[word] & mask != 0 {
            return false;
        }
        self.pressed[word] |= mask;
        self.sink.press(id);
        self.dirty = true;
        true
    }

    /// Mark `id` released. Returns whether the report changed.
    pub fn release(&mut self, id: ButtonId) -> bool {
        let Some((word, mask)) = Self::locate(id) else {
            warn!("Ignoring release of out-of-range button {}", id);
            return false;
        };
        if self.pressed[word] & mask == 0 {
            return false;
        }
        self.pressed[word] &= !mask;
        self.sink.release(id);
        self.dirty = true;
        true
    }

    /// Set the axis value. Returns whether the report changed.
    pub fn set_axis(&mut self, value: i32) -> bool {
        if self.axis == value {
            return false;
        }
        self.axis = value;
        self.sink.set_axis(value);
        self.dirty = true;
        true
    }

    /// Request a flush without changing the state, e.g. for a repeated press
    /// of a button that is still pressed.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_pressed(&self, id: ButtonId) -> bool {
        Self::locate(id).is_some_and(|(word, mask)| self.pressed[word] & mask != 0)
    }

    /// Ids of all pressed buttons, ascending.
    pub fn pressed(&self) -> impl Iterator<Item = ButtonId> + '_ {
        (1..=MAX_BUTTONS as u8)
            .map(ButtonId)
            .filter(|id| self.is_pressed(*id))
    }

    pub fn axis(&self) -> i32 {
        self.axis
    }

    /// Whether the report changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_connected()
    }

    /// Send the report and clear the dirty flag. The state itself persists.
    pub fn flush(&mut self) {
        self.sink.flush();
        self.dirty = false;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
