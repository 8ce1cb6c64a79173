#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embassy_time::Instant;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use padbridge::{ButtonId, CycleOutcome, InputDevice, ReportCoalescer, ReportSink};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Press(u8),
    Release(u8),
    Axis(i32),
    Flush,
}

/// Output link recording every command, with a switchable connection state.
#[derive(Default)]
pub struct TestSink {
    pub commands: Vec<Command>,
    pub disconnected: bool,
}

impl TestSink {
    pub fn flushes(&self) -> usize {
        self.commands.iter().filter(|c| **c == Command::Flush).count()
    }

    /// Commands received after the last flush
    pub fn since_last_flush(&self) -> &[Command] {
        let start = self
            .commands
            .iter()
            .rposition(|c| *c == Command::Flush)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.commands[start..]
    }

    /// Commands between the second last and the last flush
    pub fn last_flushed(&self) -> &[Command] {
        let flushes: Vec<usize> = self
            .commands
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Command::Flush)
            .map(|(i, _)| i)
            .collect();
        match flushes.as_slice() {
            [] => &[],
            [last] => &self.commands[..*last],
            [.., prev, last] => &self.commands[prev + 1..*last],
        }
    }
}

impl ReportSink for TestSink {
    fn press(&mut self, id: ButtonId) {
        self.commands.push(Command::Press(id.0));
    }

    fn release(&mut self, id: ButtonId) {
        self.commands.push(Command::Release(id.0));
    }

    fn set_axis(&mut self, value: i32) {
        self.commands.push(Command::Axis(value));
    }

    fn flush(&mut self) {
        self.commands.push(Command::Flush);
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }
}

/// Run one cycle per millisecond in `from..=to`, return how many flushed.
pub fn run_cycles<S: ReportSink, B: InputDevice, M: InputDevice, E: InputDevice>(
    coalescer: &mut ReportCoalescer<S, B, M, E>,
    from: u64,
    to: u64,
) -> usize {
    (from..=to)
        .filter(|ms| coalescer.poll_and_flush_at(Instant::from_millis(*ms)) == CycleOutcome::Flushed)
        .count()
}

/// A button line, `true` is high. Lines idle high, pressed buttons pull them low.
#[derive(Clone, Default)]
pub struct TestLine(Rc<Cell<bool>>);

impl TestLine {
    pub fn high() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn set(&self, high: bool) {
        self.0.set(high);
    }
}

impl ErrorType for TestLine {
    type Error = Infallible;
}

impl InputPin for TestLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

struct Wiring<const ROW: usize, const COL: usize> {
    contacts: [[bool; COL]; ROW],
    /// Driven level of each column, `true` is high
    columns: [bool; COL],
}

/// A low-active key matrix: a row reads low while a low-driven column is
/// bridged to it.
#[derive(Clone)]
pub struct TestMatrix<const ROW: usize, const COL: usize>(Rc<RefCell<Wiring<ROW, COL>>>);

impl<const ROW: usize, const COL: usize> TestMatrix<ROW, COL> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Wiring {
            contacts: [[false; COL]; ROW],
            columns: [true; COL],
        })))
    }

    pub fn set(&self, row: usize, col: usize, contact: bool) {
        self.0.borrow_mut().contacts[row][col] = contact;
    }

    pub fn rows(&self) -> [TestRow<ROW, COL>; ROW] {
        core::array::from_fn(|row| TestRow {
            matrix: self.clone(),
            row,
        })
    }

    pub fn cols(&self) -> [TestCol<ROW, COL>; COL] {
        core::array::from_fn(|col| TestCol {
            matrix: self.clone(),
            col,
        })
    }
}

pub struct TestRow<const ROW: usize, const COL: usize> {
    matrix: TestMatrix<ROW, COL>,
    row: usize,
}

impl<const ROW: usize, const COL: usize> TestRow<ROW, COL> {
    fn high(&self) -> bool {
        let wiring = self.matrix.0.borrow();
        !(0..COL).any(|col| !wiring.columns[col] && wiring.contacts[self.row][col])
    }
}

impl<const ROW: usize, const COL: usize> ErrorType for TestRow<ROW, COL> {
    type Error = Infallible;
}

impl<const ROW: usize, const COL: usize> InputPin for TestRow<ROW, COL> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high())
    }
}

pub struct TestCol<const ROW: usize, const COL: usize> {
    matrix: TestMatrix<ROW, COL>,
    col: usize,
}

impl<const ROW: usize, const COL: usize> ErrorType for TestCol<ROW, COL> {
    type Error = Infallible;
}

impl<const ROW: usize, const COL: usize> OutputPin for TestCol<ROW, COL> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.matrix.0.borrow_mut().columns[self.col] = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.matrix.0.borrow_mut().columns[self.col] = true;
        Ok(())
    }
}
