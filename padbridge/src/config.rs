//! Device configuration.
//!
//! All wiring-derived tables are collected into one [`DeviceConfig`], built
//! once at startup and passed by reference into every component. Every
//! inconsistency is reported here as a [`ConfigError`], there are no runtime
//! configuration faults.
use core::fmt;

use embassy_time::Duration;
use padbridge_types::button::ButtonId;

/// Number of buttons the output report can carry.
pub const MAX_BUTTONS: usize = 128;

/// Default settle interval of the debouncers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(10);

/// Default time a matrix key must stay down to become held.
pub const DEFAULT_HOLD_TIME: Duration = Duration::from_millis(700);

/// Default interval between two polling cycles of [`crate::coalescer::ReportCoalescer::run`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration errors, all detected at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A direct button id is outside `1..=D`
    DirectIdOutOfRange { id: u8, max: u8 },
    /// Two direct pins map to the same id
    DuplicateDirectId(ButtonId),
    /// A matrix code is outside `1..=ROW * COL`
    MatrixCodeOutOfRange { code: u8, max: u8 },
    /// Two matrix cells share one code
    DuplicateMatrixCode(u8),
    /// The held set cannot track every matrix cell
    HeldSetTooSmall { capacity: usize, cells: usize },
    /// Direct buttons and matrix cells don't fit the report
    TooManyButtons { count: usize },
    /// Encoder `min` is larger than `max`
    InvalidEncoderBounds { min: i32, max: i32 },
    /// Multiplier is not positive or overflows the axis range
    InvalidMultiplier(i32),
    /// Zero quadrature transitions per detent
    InvalidResolution(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DirectIdOutOfRange { id, max } => {
                write!(f, "direct button id {} is outside 1..={}", id, max)
            }
            ConfigError::DuplicateDirectId(id) => write!(f, "direct button id {} is used twice", id),
            ConfigError::MatrixCodeOutOfRange { code, max } => {
                write!(f, "matrix code {} is outside 1..={}", code, max)
            }
            ConfigError::DuplicateMatrixCode(code) => write!(f, "matrix code {} is used twice", code),
            ConfigError::HeldSetTooSmall { capacity, cells } => {
                write!(f, "held set holds {} keys but the matrix has {} cells", capacity, cells)
            }
            ConfigError::TooManyButtons { count } => {
                write!(f, "{} buttons configured, the report carries {}", count, MAX_BUTTONS)
            }
            ConfigError::InvalidEncoderBounds { min, max } => {
                write!(f, "encoder bounds [{}, {}] are empty", min, max)
            }
            ConfigError::InvalidMultiplier(m) => write!(f, "invalid encoder multiplier {}", m),
            ConfigError::InvalidResolution(r) => write!(f, "invalid encoder resolution {}", r),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Config for the directly wired buttons.
#[derive(Clone, Debug)]
pub struct DirectButtonConfig<const N: usize> {
    /// Button id of each pin, in pin order
    pub buttons: [ButtonId; N],
    /// Settle interval before a level change is accepted
    pub debounce: Duration,
    /// Pins read low while pressed (wired against pull-ups)
    pub low_active: bool,
}

impl<const N: usize> DirectButtonConfig<N> {
    pub fn new(buttons: [ButtonId; N]) -> Self {
        Self {
            buttons,
            debounce: DEFAULT_DEBOUNCE,
            low_active: true,
        }
    }

    /// Pin `i` reports button `i + 1`.
    pub fn sequential() -> Self {
        Self::new(core::array::from_fn(|i| ButtonId((i + 1) as u8)))
    }

    /// Ids must be a permutation of `1..=N`, and fit in the report.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if N > MAX_BUTTONS {
            return Err(ConfigError::TooManyButtons { count: N });
        }
        let max = N.min(u8::MAX as usize) as u8;
        for (i, id) in self.buttons.iter().enumerate() {
            if id.0 == 0 || id.0 as usize > N {
                return Err(ConfigError::DirectIdOutOfRange { id: id.0, max });
            }
            if self.buttons[..i].contains(id) {
                return Err(ConfigError::DuplicateDirectId(*id));
            }
        }
        Ok(())
    }
}

impl<const N: usize> Default for DirectButtonConfig<N> {
    fn default() -> Self {
        Self::sequential()
    }
}

/// Config for the scanned key matrix.
#[derive(Clone, Debug)]
pub struct MatrixConfig<const ROW: usize, const COL: usize> {
    /// Character code of each cell, `1..=ROW * COL`
    pub keymap: [[u8; COL]; ROW],
    /// Time a key must stay down before it's held
    pub hold_time: Duration,
    /// Settle interval of every cell
    pub debounce: Duration,
    /// Driven column is pulled low and rows read low on contact
    pub low_active: bool,
}

impl<const ROW: usize, const COL: usize> MatrixConfig<ROW, COL> {
    pub fn new(keymap: [[u8; COL]; ROW]) -> Self {
        Self {
            keymap,
            hold_time: DEFAULT_HOLD_TIME,
            debounce: DEFAULT_DEBOUNCE,
            low_active: true,
        }
    }

    /// Cells are numbered row by row, starting at 1.
    pub fn sequential() -> Self {
        Self::new(core::array::from_fn(|row| {
            core::array::from_fn(|col| (row * COL + col + 1) as u8)
        }))
    }

    pub const fn cells() -> usize {
        ROW * COL
    }

    /// Codes must be a permutation of `1..=ROW * COL`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cells = Self::cells();
        let max = cells.min(u8::MAX as usize) as u8;
        let mut seen = [false; MAX_BUTTONS];
        for code in self.keymap.iter().flatten().copied() {
            if code == 0 || code as usize > cells || code as usize > MAX_BUTTONS {
                return Err(ConfigError::MatrixCodeOutOfRange { code, max });
            }
            let slot = &mut seen[code as usize - 1];
            if *slot {
                return Err(ConfigError::DuplicateMatrixCode(code));
            }
            *slot = true;
        }
        Ok(())
    }
}

impl<const ROW: usize, const COL: usize> Default for MatrixConfig<ROW, COL> {
    fn default() -> Self {
        Self::sequential()
    }
}

/// Config for the rotary encoder axis.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderConfig {
    /// Lowest accumulator value
    pub min: i32,
    /// Highest accumulator value
    pub max: i32,
    /// Accumulator to axis scale
    pub multiplier: i32,
    /// Quadrature transitions per detent
    pub resolution: u8,
    /// Swap the counting direction
    pub reverse: bool,
    /// Acceleration coefficient, 0 turns acceleration off
    pub acceleration: u16,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 8190,
            multiplier: 4,
            resolution: 4,
            reverse: false,
            acceleration: 250,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidEncoderBounds {
                min: self.min,
                max: self.max,
            });
        }
        if self.multiplier <= 0
            || self.min.checked_mul(self.multiplier).is_none()
            || self.max.checked_mul(self.multiplier).is_none()
        {
            return Err(ConfigError::InvalidMultiplier(self.multiplier));
        }
        if self.resolution == 0 || self.resolution > i8::MAX as u8 {
            return Err(ConfigError::InvalidResolution(self.resolution));
        }
        Ok(())
    }
}

/// The whole device: `D` direct buttons, a `ROW` x `COL` matrix and one encoder.
#[derive(Clone, Debug)]
pub struct DeviceConfig<const D: usize, const ROW: usize, const COL: usize> {
    pub direct: DirectButtonConfig<D>,
    pub matrix: MatrixConfig<ROW, COL>,
    pub encoder: EncoderConfig,
    /// Interval between two polling cycles
    pub poll_interval: Duration,
}

impl<const D: usize, const ROW: usize, const COL: usize> Default for DeviceConfig<D, ROW, COL> {
    fn default() -> Self {
        Self {
            direct: DirectButtonConfig::default(),
            matrix: MatrixConfig::default(),
            encoder: EncoderConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl<const D: usize, const ROW: usize, const COL: usize> DeviceConfig<D, ROW, COL> {
    /// Assemble and validate the device configuration.
    pub fn new(
        direct: DirectButtonConfig<D>,
        matrix: MatrixConfig<ROW, COL>,
        encoder: EncoderConfig,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            direct,
            matrix,
            encoder,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        config.validate()?;
        Ok(config)
    }

    /// Total number of logical buttons.
    pub const fn button_count() -> usize {
        D + ROW * COL
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let result = self.check();
        match &result {
            Ok(()) => info!(
                "Device config accepted: {} direct buttons, {}x{} matrix",
                D, ROW, COL
            ),
            Err(e) => error!("Device config rejected: {:?}", e),
        }
        result
    }

    fn check(&self) -> Result<(), ConfigError> {
        let count = Self::button_count();
        if count > MAX_BUTTONS {
            return Err(ConfigError::TooManyButtons { count });
        }
        self.direct.validate()?;
        self.matrix.validate()?;
        self.encoder.validate()
    }

    /// Button id of the matrix cell with the given code, `None` if the id
    /// would fall outside the report.
    ///
    /// Matrix ids start right after the last direct button id.
    pub fn matrix_button_id(&self, code: u8) -> Option<ButtonId> {
        if code == 0 {
            return None;
        }
        let id = D.checked_add(code as usize)?;
        if id > MAX_BUTTONS {
            return None;
        }
        Some(ButtonId(id as u8))
    }
}
