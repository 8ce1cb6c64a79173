//! Button identities and states.
//!
//! Every logical button of the virtual controller has a [`ButtonId`] in one
//! global namespace. Directly wired buttons take `1..=D`, matrix cells take
//! `D + 1..=D + ROW * COL`.
use core::fmt;

use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

/// Identifier of one logical button in the output report. Ids start at 1.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonId(pub u8);

impl ButtonId {
    /// The smallest valid id.
    pub const MIN: ButtonId = ButtonId(1);

    /// Create an id, `None` for the reserved value 0.
    pub const fn new(id: u8) -> Option<Self> {
        if id == 0 { None } else { Some(ButtonId(id)) }
    }

    /// Zero-based bit index of this id, used by report bitmaps.
    pub const fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a tracked key.
///
/// `Pressed` and `Released` are transient: each lasts one scan before the key
/// moves on (`Pressed` stays until release or hold, `Released` decays to `Idle`).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyState {
    #[default]
    Idle,
    Pressed,
    Held,
    Released,
}

/// A debounced level change of a button.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Pressed,
    Released,
}

impl Edge {
    pub const fn from_pressed(pressed: bool) -> Self {
        if pressed { Edge::Pressed } else { Edge::Released }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_id_zero_is_reserved() {
        assert_eq!(ButtonId::new(0), None);
        assert_eq!(ButtonId::new(1), Some(ButtonId::MIN));
        assert_eq!(ButtonId(8).index(), 7);
    }

    #[test]
    fn test_wire_size() {
        assert_eq!(ButtonId::POSTCARD_MAX_SIZE, 1);
        assert_eq!(KeyState::POSTCARD_MAX_SIZE, 1);

        let mut buf = [0u8; 4];
        let used = postcard::to_slice(&(ButtonId(23), KeyState::Held), &mut buf).unwrap();
        assert_eq!(&*used, &[23u8, 2][..]);
    }
}
