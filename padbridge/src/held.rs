//! Tracking of matrix keys in the held sub-state.
use crate::config::ConfigError;

/// Fixed-capacity bitset of held matrix keys, keyed by character code.
///
/// Code `c` lives at bit `c - 1`, so the capacity is `WORDS * 32` codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeldSet<const WORDS: usize> {
    words: [u32; WORDS],
}

/// Held set that tracks up to 64 keys.
pub type HeldSet64 = HeldSet<2>;

impl<const WORDS: usize> HeldSet<WORDS> {
    pub const CAPACITY: usize = WORDS * u32::BITS as usize;

    /// Create an empty set that must track `cells` codes.
    pub const fn with_capacity_for(cells: usize) -> Result<Self, ConfigError> {
        if cells > Self::CAPACITY {
            return Err(ConfigError::HeldSetTooSmall {
                capacity: Self::CAPACITY,
                cells,
            });
        }
        Ok(Self { words: [0; WORDS] })
    }

    fn locate(code: u8) -> Option<(usize, u32)> {
        let bit = (code as usize).checked_sub(1)?;
        if bit >= Self::CAPACITY {
            return None;
        }
        Some((bit / 32, 1 << (bit % 32)))
    }

    /// Mark `code` as held. Returns `false` if it already was, or if the code
    /// is outside the set's range.
    pub fn insert(&mut self, code: u8) -> bool {
        let Some((word, mask)) = Self::locate(code) else {
            return false;
        };
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Clear `code`. Returns `true` if it was held.
    pub fn remove(&mut self, code: u8) -> bool {
        let Some((word, mask)) = Self::locate(code) else {
            return false;
        };
        let was_set = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        was_set
    }

    pub fn contains(&self, code: u8) -> bool {
        Self::locate(code).is_some_and(|(word, mask)| self.words[word] & mask != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
