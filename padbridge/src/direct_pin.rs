use embassy_time::Instant;
use embedded_hal::digital::InputPin;
use padbridge_types::button::{ButtonId, Edge};

use crate::config::{ConfigError, DirectButtonConfig};
use crate::debounce::default_debouncer::DefaultDebouncer;
use crate::debounce::{DebounceState, DebouncerTrait};
use crate::input_device::InputDevice;
use crate::report::{PendingReport, ReportSink};

/// Bank of directly wired buttons, one pin per button.
///
/// Only press and release are observable, there's no hold state.
pub struct DirectButtonBank<In: InputPin, D: DebouncerTrait<1, N>, const N: usize> {
    /// One input pin per button
    pins: [In; N],
    /// Button id of each pin
    buttons: [ButtonId; N],
    /// Debouncer
    debouncer: D,
    /// Last accepted level of each pin, `true` is pressed
    stable: [bool; N],
    /// Pin active level
    low_active: bool,
}

impl<In: InputPin, const N: usize> DirectButtonBank<In, DefaultDebouncer<1, N>, N> {
    /// Create a bank with the default debouncer, using the configured settle interval.
    pub fn new(pins: [In; N], config: &DirectButtonConfig<N>) -> Result<Self, ConfigError> {
        Self::with_debouncer(pins, DefaultDebouncer::new(config.debounce), config)
    }
}

impl<In: InputPin, D: DebouncerTrait<1, N>, const N: usize> DirectButtonBank<In, D, N> {
    pub fn with_debouncer(pins: [In; N], debouncer: D, config: &DirectButtonConfig<N>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            pins,
            buttons: config.buttons,
            debouncer,
            stable: [false; N],
            low_active: config.low_active,
        })
    }

    /// Sample every pin once and return the debounced edges, in pin order.
    ///
    /// At most one edge per pin is reported per call.
    pub fn scan(&mut self, now: Instant, mut on_edge: impl FnMut(ButtonId, Edge)) {
        for (idx, pin) in self.pins.iter_mut().enumerate() {
            let pin_active = if self.low_active {
                pin.is_low().ok().unwrap_or_default()
            } else {
                pin.is_high().ok().unwrap_or_default()
            };

            let debounce_state = self
                .debouncer
                .detect_change_with_debounce(0, idx, pin_active, self.stable[idx], now);

            if let DebounceState::Debounced = debounce_state {
                self.stable[idx] = !self.stable[idx];
                on_edge(self.buttons[idx], Edge::from_pressed(self.stable[idx]));
            }
        }
    }

    /// Debounced level of the pin at `idx`.
    pub fn is_pressed(&self, idx: usize) -> bool {
        self.stable.get(idx).copied().unwrap_or_default()
    }
}

impl<In: InputPin, D: DebouncerTrait<1, N>, const N: usize> InputDevice for DirectButtonBank<In, D, N> {
    fn poll<S: ReportSink>(&mut self, report: &mut PendingReport<S>, now: Instant) -> bool {
        let mut changed = false;
        self.scan(now, |id, edge| {
            debug!("Button {} {:?}", id, edge);
            changed |= match edge {
                Edge::Pressed => report.press(id),
                Edge::Released => report.release(id),
            };
        });
        changed
    }
}
