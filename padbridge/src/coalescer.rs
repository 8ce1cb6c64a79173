//! Report coalescing.
//!
//! The [`ReportCoalescer`] owns the [`PendingReport`] and the three input
//! devices. Every cycle it polls the devices in a fixed order (direct
//! buttons, matrix, encoder) and flushes the report at most once.
use embassy_time::{Duration, Instant, Timer};

use crate::config::DeviceConfig;
use crate::input_device::InputDevice;
use crate::report::{PendingReport, ReportSink};

/// What a polling cycle did with the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// Nothing to send
    Idle,
    /// The report was flushed
    Flushed,
    /// The report is dirty but the link is down, it's sent after reconnection
    Deferred,
}

/// Merges the direct buttons, the key matrix and the encoder into one report.
pub struct ReportCoalescer<S: ReportSink, B: InputDevice, M: InputDevice, E: InputDevice> {
    report: PendingReport<S>,
    buttons: B,
    matrix: M,
    encoder: E,
    poll_interval: Duration,
    /// Link state seen in the last cycle
    connected: bool,
}

impl<S: ReportSink, B: InputDevice, M: InputDevice, E: InputDevice> ReportCoalescer<S, B, M, E> {
    pub fn new(sink: S, buttons: B, matrix: M, encoder: E, poll_interval: Duration) -> Self {
        Self {
            report: PendingReport::new(sink),
            buttons,
            matrix,
            encoder,
            poll_interval,
            connected: false,
        }
    }

    /// Create a coalescer polling at the configured interval.
    pub fn from_config<const D: usize, const ROW: usize, const COL: usize>(
        sink: S,
        buttons: B,
        matrix: M,
        encoder: E,
        config: &DeviceConfig<D, ROW, COL>,
    ) -> Self {
        Self::new(sink, buttons, matrix, encoder, config.poll_interval)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run one polling cycle at the current time.
    pub fn poll_and_flush(&mut self) -> CycleOutcome {
        self.poll_and_flush_at(Instant::now())
    }

    /// Run one polling cycle at `now`.
    ///
    /// All devices are polled even while the link is down, so debouncers and
    /// key states keep up with the hardware. The report is flushed once if
    /// any device changed it since the last flush and the link is up.
    pub fn poll_and_flush_at(&mut self, now: Instant) -> CycleOutcome {
        let mut changed = self.buttons.poll(&mut self.report, now);
        changed |= self.matrix.poll(&mut self.report, now);
        changed |= self.encoder.poll(&mut self.report, now);

        let connected = self.report.is_connected();
        if connected != self.connected {
            if connected {
                info!("Output link connected");
            } else {
                info!("Output link disconnected, holding reports");
            }
            self.connected = connected;
        }

        if !self.report.is_dirty() {
            return CycleOutcome::Idle;
        }
        if !connected {
            if changed {
                debug!("Report changed while disconnected, deferring flush");
            }
            return CycleOutcome::Deferred;
        }

        debug!("Flushing report, axis {}", self.report.axis());
        self.report.flush();
        CycleOutcome::Flushed
    }

    /// Poll forever, one cycle per poll interval.
    pub async fn run(&mut self) -> ! {
        loop {
            self.poll_and_flush();
            Timer::after(self.poll_interval).await;
        }
    }

    pub fn report(&self) -> &PendingReport<S> {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut PendingReport<S> {
        &mut self.report
    }

    pub fn buttons(&self) -> &B {
        &self.buttons
    }

    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }
}
