//! Input aggregation core of a button/matrix/encoder HID bridge.
//!
//! Three input devices feed one [`report::PendingReport`]:
//!
//! - [`direct_pin::DirectButtonBank`]: debounced, directly wired buttons
//! - [`matrix::Matrix`]: a scanned key matrix with press, hold and release states
//! - [`input_device::rotary_encoder::EncoderAxis`]: a quadrature encoder decoded in
//!   interrupt context and exposed as an absolute axis
//!
//! The [`coalescer::ReportCoalescer`] polls them once per cycle and flushes the
//! report to a [`report::ReportSink`] at most once per cycle.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod coalescer;
pub mod config;
pub mod debounce;
pub mod direct_pin;
pub mod held;
pub mod input_device;
pub mod matrix;
pub mod report;
#[cfg(test)]
mod test_pins;

pub use coalescer::{CycleOutcome, ReportCoalescer};
pub use config::{ConfigError, DeviceConfig, DirectButtonConfig, EncoderConfig, MatrixConfig};
pub use input_device::InputDevice;
pub use input_device::rotary_encoder::{EncoderAccumulator, EncoderAxis, QuadratureDecoder};
pub use padbridge_types::button::{ButtonId, Edge, KeyState};
pub use padbridge_types::direction::Direction;
pub use report::{PendingReport, ReportSink};
