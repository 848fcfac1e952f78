//! # Packed Sort Key
//!
//! Every submitted task is ordered by a single `u64`:
//!
//! ```text
//!  63        56 55        48 47                                        0
//! ┌────────────┬────────────┬───────────────────────────────────────────┐
//! │    pass    │ technique  │                 priority                  │
//! │   8 bits   │   8 bits   │                  48 bits                  │
//! └────────────┴────────────┴───────────────────────────────────────────┘
//! ```
//!
//! Sorting the raw value orders by pass, then technique, then priority.
//! Masking with [`GROUP_MASK`] yields the `(pass, technique)` bucket that
//! the dispatcher uses to form runs.

use bytemuck::{Pod, Zeroable};

/// Width of the pass field.
pub const PASS_BITS: u32 = 8;
/// Width of the technique field.
pub const TECHNIQUE_BITS: u32 = 8;
/// Width of the priority field.
pub const PRIORITY_BITS: u32 = 48;

/// Bit offset of the pass field.
pub const PASS_SHIFT: u32 = TECHNIQUE_SHIFT + TECHNIQUE_BITS;
/// Bit offset of the technique field.
pub const TECHNIQUE_SHIFT: u32 = PRIORITY_BITS;

/// Mask selecting the priority field.
pub const PRIORITY_MASK: u64 = (1 << PRIORITY_BITS) - 1;
/// Mask selecting the technique field.
pub const TECHNIQUE_MASK: u64 = ((1 << TECHNIQUE_BITS) - 1) << TECHNIQUE_SHIFT;
/// Mask selecting the pass field.
pub const PASS_MASK: u64 = ((1 << PASS_BITS) - 1) << PASS_SHIFT;
/// Mask selecting the `(pass, technique)` bucket.
pub const GROUP_MASK: u64 = PASS_MASK | TECHNIQUE_MASK;

/// Priority reserved for "sort last within this bucket".
///
/// Pass-end markers carry it so they follow every real task of their pass.
pub const LAST_PRIORITY: u64 = PRIORITY_MASK;

const _: () = assert!(PASS_BITS + TECHNIQUE_BITS + PRIORITY_BITS == u64::BITS);

/// A packed `(pass, technique, priority)` ordering key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct SortKey(u64);

impl SortKey {
    /// Terminal key. Its pass field (`0xFF`) exceeds any valid pass ordinal,
    /// so it never shares a bucket with a real task or marker.
    pub const SENTINEL: Self = Self(u64::MAX);

    /// Packs a key, or returns `None` if `priority` does not fit in 48 bits.
    #[inline]
    #[must_use]
    pub const fn encode(pass: u8, technique: u8, priority: u64) -> Option<Self> {
        if priority & !PRIORITY_MASK != 0 {
            return None;
        }
        Some(Self(
            ((pass as u64) << PASS_SHIFT) | ((technique as u64) << TECHNIQUE_SHIFT) | priority,
        ))
    }

    /// Unpacks the key into `(pass, technique, priority)`.
    #[inline]
    #[must_use]
    pub const fn decode(self) -> (u8, u8, u64) {
        (self.pass(), self.technique(), self.priority())
    }

    /// Opening marker for `pass`: lowest technique, priority zero.
    #[inline]
    #[must_use]
    pub const fn pass_begin(pass: u8) -> Self {
        Self((pass as u64) << PASS_SHIFT)
    }

    /// Closing marker for `pass`: highest technique, [`LAST_PRIORITY`].
    #[inline]
    #[must_use]
    pub const fn pass_end(pass: u8, last_technique: u8) -> Self {
        Self(
            ((pass as u64) << PASS_SHIFT)
                | ((last_technique as u64) << TECHNIQUE_SHIFT)
                | LAST_PRIORITY,
        )
    }

    /// Wraps a raw key value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw key value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Pass ordinal.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn pass(self) -> u8 {
        (self.0 >> PASS_SHIFT) as u8
    }

    /// Technique ordinal.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn technique(self) -> u8 {
        ((self.0 & TECHNIQUE_MASK) >> TECHNIQUE_SHIFT) as u8
    }

    /// Priority field.
    #[inline]
    #[must_use]
    pub const fn priority(self) -> u64 {
        self.0 & PRIORITY_MASK
    }

    /// The `(pass, technique)` bucket with the priority bits cleared.
    #[inline]
    #[must_use]
    pub const fn group(self) -> u64 {
        self.0 & GROUP_MASK
    }

    /// Returns true for [`SortKey::SENTINEL`].
    #[inline]
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == u64::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        for &(pass, technique, priority) in &[
            (0u8, 0u8, 0u64),
            (2, 4, 5),
            (254, 255, PRIORITY_MASK),
            (7, 1, 0x0000_8000_0000_0001),
        ] {
            let key = SortKey::encode(pass, technique, priority).unwrap();
            assert_eq!(key.decode(), (pass, technique, priority));
        }
    }

    #[test]
    fn test_priority_out_of_range() {
        assert!(SortKey::encode(0, 0, PRIORITY_MASK + 1).is_none());
        assert!(SortKey::encode(0, 0, u64::MAX).is_none());
    }

    #[test]
    fn test_field_precedence() {
        let low_pass = SortKey::encode(1, 200, PRIORITY_MASK).unwrap();
        let high_pass = SortKey::encode(2, 0, 0).unwrap();
        assert!(low_pass < high_pass);

        let low_technique = SortKey::encode(3, 1, PRIORITY_MASK).unwrap();
        let high_technique = SortKey::encode(3, 2, 0).unwrap();
        assert!(low_technique < high_technique);
    }

    #[test]
    fn test_markers_bracket_pass() {
        let begin = SortKey::pass_begin(3);
        let end = SortKey::pass_end(3, 9);
        let task = SortKey::encode(3, 4, 1234).unwrap();

        assert!(begin < task);
        assert!(task < end);
        assert_eq!(end.priority(), LAST_PRIORITY);
        assert!(end < SortKey::pass_begin(4));
    }

    #[test]
    fn test_sentinel_group_is_unique() {
        let last = SortKey::pass_end(254, 255);
        assert!(last < SortKey::SENTINEL);
        assert_ne!(last.group(), SortKey::SENTINEL.group());
        assert!(SortKey::SENTINEL.is_sentinel());
        assert!(!last.is_sentinel());
    }

    #[test]
    fn test_group_ignores_priority() {
        let a = SortKey::encode(5, 6, 1).unwrap();
        let b = SortKey::encode(5, 6, 99_999).unwrap();
        assert_eq!(a.group(), b.group());
        assert_ne!(a.group(), SortKey::encode(5, 7, 1).unwrap().group());
    }
}
