// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! A set of slot indices, used for bind group slots and vertex buffer slots.

use std::fmt;

/// A set of up to 32 slot indices.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SlotMask(u32);

impl SlotMask {
    /// Number of slots a `SlotMask` can hold.
    pub const CAPACITY: u32 = u32::BITS;

    /// Returns an empty mask.
    #[inline]
    pub const fn empty() -> Self {
        SlotMask(0)
    }

    /// Returns a mask containing slots `0..count`.
    #[inline]
    pub const fn full(count: u32) -> Self {
        if count >= Self::CAPACITY {
            SlotMask(u32::MAX)
        } else {
            SlotMask((1 << count) - 1)
        }
    }

    /// Returns a mask containing only `slot`.
    #[inline]
    pub const fn from_slot(slot: u32) -> Self {
        debug_assert!(slot < Self::CAPACITY);
        SlotMask(1 << slot)
    }

    /// Adds `slot` to the mask.
    #[inline]
    pub fn insert(&mut self, slot: u32) {
        debug_assert!(slot < Self::CAPACITY);
        self.0 |= 1 << slot;
    }

    /// Removes `slot` from the mask.
    #[inline]
    pub fn remove(&mut self, slot: u32) {
        debug_assert!(slot < Self::CAPACITY);
        self.0 &= !(1 << slot);
    }

    /// Returns whether `slot` is in the mask.
    #[inline]
    pub const fn contains_slot(self, slot: u32) -> bool {
        slot < Self::CAPACITY && self.0 & (1 << slot) != 0
    }

    /// Returns whether every slot of `other` is in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        SlotMask(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        SlotMask(self.0 & other.0)
    }

    /// Returns the slots of `self` that are not in `other`.
    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        SlotMask(self.0 & !other.0)
    }

    /// Returns the slots in `0..count` that are not in `self`.
    #[inline]
    pub const fn complement_within(self, count: u32) -> Self {
        Self::full(count).difference(self)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the number of slots in the mask.
    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns the lowest slot in the mask, if any.
    #[inline]
    pub const fn first(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros())
        }
    }

    /// Iterates over the slots in the mask, in increasing order.
    #[inline]
    pub fn iter(self) -> SlotMaskIter {
        SlotMaskIter(self.0)
    }
}

impl FromIterator<u32> for SlotMask {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut mask = SlotMask::empty();

        for slot in iter {
            mask.insert(slot);
        }

        mask
    }
}

impl IntoIterator for SlotMask {
    type Item = u32;
    type IntoIter = SlotMaskIter;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for SlotMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the slots of a [`SlotMask`].
#[derive(Clone, Debug)]
pub struct SlotMaskIter(u32);

impl Iterator for SlotMaskIter {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }

        let slot = self.0.trailing_zeros();
        self.0 &= self.0 - 1;

        Some(slot)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.0.count_ones() as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for SlotMaskIter {}

#[cfg(test)]
mod tests {
    use super::SlotMask;

    #[test]
    fn full_and_complement() {
        let mask: SlotMask = [0, 2].into_iter().collect();

        assert_eq!(SlotMask::full(4).count(), 4);
        assert_eq!(SlotMask::full(32).count(), 32);
        assert_eq!(mask.complement_within(4), [1, 3].into_iter().collect());
        assert!(SlotMask::full(4).contains(mask));
        assert!(!mask.contains(SlotMask::full(4)));
    }

    #[test]
    fn iterates_in_order() {
        let mask: SlotMask = [9, 1, 4].into_iter().collect();

        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![1, 4, 9]);
        assert_eq!(mask.first(), Some(1));
        assert_eq!(SlotMask::empty().first(), None);
    }

    #[test]
    fn insert_remove() {
        let mut mask = SlotMask::empty();
        mask.insert(3);
        assert!(mask.contains_slot(3));
        assert!(!mask.contains_slot(40));
        mask.remove(3);
        assert!(mask.is_empty());
    }
}
