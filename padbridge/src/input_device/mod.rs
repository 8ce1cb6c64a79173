//! Input device module
//!
//! This module defines the `InputDevice` trait implemented by every input
//! source of the bridge: the direct button bank, the key matrix and the
//! encoder axis. The [`crate::coalescer::ReportCoalescer`] polls them in a
//! fixed order once per cycle.
use embassy_time::Instant;

use crate::report::{PendingReport, ReportSink};

pub mod rotary_encoder;

/// The trait for input devices.
///
/// # Example
/// ```rust
/// struct MyInputDevice;
///
/// impl InputDevice for MyInputDevice {
///     fn poll<S: ReportSink>(&mut self, report: &mut PendingReport<S>, now: Instant) -> bool {
///         // Sample the hardware, apply changes to `report`
///         false
///     }
/// }
/// ```
pub trait InputDevice {
    /// Sample the device once, apply resulting press/release/axis changes to
    /// `report` and return whether the report changed.
    ///
    /// `now` is the timestamp of the current polling cycle, shared by all devices.
    fn poll<S: ReportSink>(&mut self, report: &mut PendingReport<S>, now: Instant) -> bool;
}
