//! Rotary encoder axis
//!
//! The encoder is split over two execution contexts:
//!
//! - [`QuadratureDecoder`] runs in the pin-change interrupt of either channel.
//!   It owns both pins and the phase state and turns edges into steps of an
//!   [`EncoderAccumulator`].
//! - [`EncoderAxis`] runs in the polling loop. It reads the accumulator and
//!   publishes the scaled value as the report's axis.
//!
//! The accumulator is the only state the two sides share. Every access to it
//! is a single atomic operation, so neither side ever waits for the other.
//!
//! The quadrature decoding is adapted from: <https://github.com/leshow/rotary-encoder-hal/blob/master/src/lib.rs>
use core::sync::atomic::{AtomicI32, Ordering};

use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;
pub use padbridge_types::direction::Direction;

use super::InputDevice;
use crate::config::{ConfigError, EncoderConfig};
use crate::report::{PendingReport, ReportSink};

/// Detents further apart than this are never accelerated.
const ACCELERATION_WINDOW: Duration = Duration::from_millis(200);

/// Shortest gap between detents used for acceleration.
const ACCELERATION_MIN_GAP_MS: u64 = 4;

/// Bounded counter shared between the encoder interrupt and the polling loop.
#[derive(Debug)]
pub struct EncoderAccumulator {
    value: AtomicI32,
    min: i32,
    max: i32,
}

impl EncoderAccumulator {
    /// Create an accumulator over `[min, max]`, starting at 0 or the bound
    /// closest to it. Usable in a `static`.
    ///
    /// Panics if `min > max`; [`EncoderAccumulator::from_config`] reports that
    /// as an error instead.
    pub const fn new(min: i32, max: i32) -> Self {
        assert!(min <= max, "encoder bounds are empty");
        let start = if 0 < min {
            min
        } else if 0 > max {
            max
        } else {
            0
        };
        Self {
            value: AtomicI32::new(start),
            min,
            max,
        }
    }

    pub fn from_config(config: &EncoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.min, config.max))
    }

    /// Move the counter by `delta`, saturating at the bounds. Returns the new
    /// value. Never blocks, safe to call from an interrupt handler.
    pub fn step(&self, delta: i32) -> i32 {
        let (min, max) = (self.min, self.max);
        let apply = |v: i32| v.saturating_add(delta).clamp(min, max);
        match self
            .value
            .fetch_update(Ordering::Release, Ordering::Relaxed, |v| Some(apply(v)))
        {
            Ok(previous) | Err(previous) => apply(previous),
        }
    }

    /// Current value, read in one atomic access.
    pub fn load(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    pub fn bounds(&self) -> (i32, i32) {
        (self.min, self.max)
    }
}

/// Allows customizing which Quadrature Phases should be considered movements
/// and in which direction or ignored.
pub trait Phase {
    /// Given the current state `s`, return the direction.
    fn direction(&mut self, s: u8) -> Direction;
}

/// Default implementation of `Phase`, one direction per quadrature transition.
pub struct DefaultPhase;

/// The useful values of `s` are:
/// - 0b0001 | 0b0111 | 0b1000 | 0b1110
/// - 0b0010 | 0b0100 | 0b1011 | 0b1101
impl Phase for DefaultPhase {
    fn direction(&mut self, s: u8) -> Direction {
        match s {
            0b0001 | 0b0111 | 0b1000 | 0b1110 => Direction::Clockwise,
            0b0010 | 0b0100 | 0b1011 | 0b1101 => Direction::CounterClockwise,
            _ => Direction::None,
        }
    }
}

/// Phase implementation that reports one direction per `resolution` transitions.
pub struct ResolutionPhase {
    resolution: i8,
    lut: [i8; 16],
    pulses: i8,
}

impl ResolutionPhase {
    pub fn new(resolution: u8, reverse: bool) -> Self {
        // Each entry corresponds to a state transition and provides +1, -1, or 0 pulse
        let mut lut = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];
        if reverse {
            lut = lut.map(|x| -x);
        }
        Self {
            resolution: resolution.clamp(1, i8::MAX as u8) as i8,
            lut,
            pulses: 0,
        }
    }
}

impl Phase for ResolutionPhase {
    fn direction(&mut self, s: u8) -> Direction {
        // Only proceed if there was a state change
        if (s >> 2) & 0b11 != s & 0b11 {
            self.pulses += self.lut[s as usize & 0xF];
            if self.pulses >= self.resolution {
                self.pulses %= self.resolution;
                return Direction::CounterClockwise;
            } else if self.pulses <= -self.resolution {
                self.pulses %= self.resolution;
                return Direction::Clockwise;
            }
        }

        Direction::None
    }
}

/// Interrupt side of the encoder: both pins, the phase state and the
/// acceleration timer.
pub struct QuadratureDecoder<A, B, P> {
    pin_a: A,
    pin_b: B,
    state: u8,
    phase: P,
    /// Acceleration coefficient, 0 or 1 disables acceleration
    acceleration: u16,
    /// When the last step was taken
    last_step: Option<Instant>,
}

impl<A: InputPin, B: InputPin> QuadratureDecoder<A, B, ResolutionPhase> {
    /// Create the decoder described by `config`.
    pub fn new(pin_a: A, pin_b: B, config: &EncoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let phase = ResolutionPhase::new(config.resolution, config.reverse);
        Ok(Self::with_phase(pin_a, pin_b, phase, config.acceleration))
    }
}

impl<A: InputPin, B: InputPin, P: Phase> QuadratureDecoder<A, B, P> {
    /// Accepts two [`InputPin`](https://docs.rs/embedded-hal/latest/embedded_hal/digital/trait.InputPin.html)s,
    /// while using `phase` to determine the direction.
    pub fn with_phase(pin_a: A, pin_b: B, phase: P, acceleration: u16) -> Self {
        let mut decoder = Self {
            pin_a,
            pin_b,
            state: 0,
            phase,
            acceleration,
            last_step: None,
        };
        // Start from the resting position of the knob
        if let Some(s) = decoder.read() {
            decoder.state = s >> 2;
        }
        decoder
    }

    /// Read both pins into bits 2 and 3 of the transition, `None` on pin errors.
    fn read(&mut self) -> Option<u8> {
        let mut s = 0;
        if self.pin_a.is_low().ok()? {
            s |= 0b0100;
        }
        if self.pin_b.is_low().ok()? {
            s |= 0b1000;
        }
        Some(s)
    }

    /// Evaluate the next state of the encoder.
    pub fn update(&mut self) -> Direction {
        // use mask to get previous state value
        let Some(new) = self.read() else {
            return Direction::None;
        };
        let s = new | (self.state & 0b11);

        // move new state in
        self.state = s >> 2;

        self.phase.direction(s)
    }

    /// Body of the pin-change interrupt handler.
    ///
    /// Decodes the edge and moves `accumulator` by the resulting step. Doesn't
    /// block or allocate.
    pub fn on_edge(&mut self, accumulator: &EncoderAccumulator, now: Instant) -> Direction {
        let direction = self.update();
        if direction != Direction::None {
            let step = self.step_size(now);
            accumulator.step(direction.sign() * step);
        }
        direction
    }

    /// Steps grow when detents follow each other quickly.
    fn step_size(&mut self, now: Instant) -> i32 {
        let last = self.last_step.replace(now);
        if self.acceleration <= 1 {
            return 1;
        }
        let Some(last) = last else {
            return 1;
        };
        let gap = now.saturating_duration_since(last);
        if gap >= ACCELERATION_WINDOW {
            return 1;
        }
        let gap_ms = gap.as_millis().max(ACCELERATION_MIN_GAP_MS);
        (self.acceleration as u64 / gap_ms).max(1) as i32
    }

    /// Returns a reference to both pins. Can be used to clear interrupt.
    pub fn pins(&mut self) -> (&mut A, &mut B) {
        (&mut self.pin_a, &mut self.pin_b)
    }

    /// Consumes this decoder, returning the underlying pins `A` and `B`.
    pub fn into_inner(self) -> (A, B) {
        (self.pin_a, self.pin_b)
    }
}

/// Polling side of the encoder: publishes the scaled accumulator as the
/// report's axis whenever it moved.
pub struct EncoderAxis<'a> {
    accumulator: &'a EncoderAccumulator,
    multiplier: i32,
    /// Last value read, `None` until the first poll
    last: Option<i32>,
}

impl<'a> EncoderAxis<'a> {
    /// The accumulator must cover the configured bounds, so every reading
    /// scales without overflow.
    pub fn new(accumulator: &'a EncoderAccumulator, config: &EncoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (min, max) = accumulator.bounds();
        if (min, max) != (config.min, config.max) {
            error!(
                "Encoder accumulator bounds [{}, {}] don't match the config [{}, {}]",
                min, max, config.min, config.max
            );
            return Err(ConfigError::InvalidEncoderBounds { min, max });
        }
        Ok(Self {
            accumulator,
            multiplier: config.multiplier,
            last: None,
        })
    }

    /// Axis value of an accumulator reading.
    pub fn scale(&self, value: i32) -> i32 {
        value.saturating_mul(self.multiplier)
    }
}

impl InputDevice for EncoderAxis<'_> {
    fn poll<S: ReportSink>(&mut self, report: &mut PendingReport<S>, _now: Instant) -> bool {
        let value = self.accumulator.load();
        if self.last == Some(value) {
            return false;
        }
        self.last = Some(value);
        let axis = self.scale(value);
        trace!("Encoder at {}, axis {}", value, axis);
        report.set_axis(axis)
    }
}
