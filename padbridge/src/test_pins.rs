//! Simulated pins for unit tests.
use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// A digital line whose level is set by the test. `true` is high.
#[derive(Clone, Default)]
pub(crate) struct SimLine(Rc<Cell<bool>>);

impl SimLine {
    pub(crate) fn high() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub(crate) fn set(&self, high: bool) {
        self.0.set(high);
    }
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

struct MatrixWiring<const ROW: usize, const COL: usize> {
    contacts: [[bool; COL]; ROW],
    columns: [bool; COL],
    low_active: bool,
}

/// A key matrix: columns are driven, rows read back the driven level of every
/// bridged column, or the idle level otherwise.
#[derive(Clone)]
pub(crate) struct SimMatrix<const ROW: usize, const COL: usize>(Rc<RefCell<MatrixWiring<ROW, COL>>>);

impl<const ROW: usize, const COL: usize> SimMatrix<ROW, COL> {
    pub(crate) fn new(low_active: bool) -> Self {
        Self(Rc::new(RefCell::new(MatrixWiring {
            contacts: [[false; COL]; ROW],
            columns: [low_active; COL],
            low_active,
        })))
    }

    pub(crate) fn set(&self, row: usize, col: usize, contact: bool) {
        self.0.borrow_mut().contacts[row][col] = contact;
    }

    pub(crate) fn row_pins(&self) -> [SimRow<ROW, COL>; ROW] {
        core::array::from_fn(|row| SimRow {
            matrix: self.clone(),
            row,
        })
    }

    pub(crate) fn col_pins(&self) -> [SimCol<ROW, COL>; COL] {
        core::array::from_fn(|col| SimCol {
            matrix: self.clone(),
            col,
        })
    }
}

pub(crate) struct SimRow<const ROW: usize, const COL: usize> {
    matrix: SimMatrix<ROW, COL>,
    row: usize,
}

impl<const ROW: usize, const COL: usize> SimRow<ROW, COL> {
    fn level(&self) -> bool {
        let wiring = self.matrix.0.borrow();
        let active = !wiring.low_active;
        let bridged = (0..COL).any(|col| wiring.columns[col] == active && wiring.contacts[self.row][col]);
        if bridged { active } else { !active }
    }
}

impl<const ROW: usize, const COL: usize> ErrorType for SimRow<ROW, COL> {
    type Error = Infallible;
}

impl<const ROW: usize, const COL: usize> InputPin for SimRow<ROW, COL> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

pub(crate) struct SimCol<const ROW: usize, const COL: usize> {
    matrix: SimMatrix<ROW, COL>,
    col: usize,
}

impl<const ROW: usize, const COL: usize> ErrorType for SimCol<ROW, COL> {
    type Error = Infallible;
}

impl<const ROW: usize, const COL: usize> OutputPin for SimCol<ROW, COL> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.matrix.0.borrow_mut().columns[self.col] = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.matrix.0.borrow_mut().columns[self.col] = true;
        Ok(())
    }
}
