// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Describes the bind groups that a pipeline expects.
//!
//! A pipeline layout has up to [`MAX_BIND_GROUPS`] slots, each of which is either unused or
//! expects a bind group created with one specific [`BindGroupLayout`]. When a new pipeline is
//! bound while recording, a bind group bound at a slot stays valid only if the new layout uses
//! the very same bind group layout object at that slot.

use crate::{
    bind_group::BindGroupLayout, macros::impl_id_counter, slot_mask::SlotMask, NonExhaustive,
    MAX_BIND_GROUPS,
};
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

/// Describes the bind group layouts used by a pipeline.
#[derive(Debug)]
pub struct PipelineLayout {
    id: NonZero<u64>,
    bind_group_layouts: [Option<Arc<BindGroupLayout>>; MAX_BIND_GROUPS as usize],
    bind_groups_mask: SlotMask,
}

impl PipelineLayout {
    /// Creates a new `PipelineLayout`.
    pub fn new(
        create_info: PipelineLayoutCreateInfo,
    ) -> Result<Arc<PipelineLayout>, PipelineLayoutCreationError> {
        let PipelineLayoutCreateInfo {
            bind_group_layouts,
            _ne: _,
        } = create_info;

        if bind_group_layouts.len() > MAX_BIND_GROUPS as usize {
            return Err(PipelineLayoutCreationError::TooManyBindGroups {
                count: bind_group_layouts.len() as u32,
                max: MAX_BIND_GROUPS,
            });
        }

        let mut slots: [Option<Arc<BindGroupLayout>>; MAX_BIND_GROUPS as usize] =
            Default::default();
        let mut bind_groups_mask = SlotMask::empty();

        for (slot, layout) in bind_group_layouts.into_iter().enumerate() {
            if layout.is_some() {
                bind_groups_mask.insert(slot as u32);
            }

            slots[slot] = layout;
        }

        Ok(Arc::new(PipelineLayout {
            id: Self::next_id(),
            bind_group_layouts: slots,
            bind_groups_mask,
        }))
    }

    /// Returns the bind group layout expected at `slot`, or `None` if the slot is unused or out
    /// of range.
    #[inline]
    pub fn bind_group_layout(&self, slot: u32) -> Option<&Arc<BindGroupLayout>> {
        self.bind_group_layouts
            .get(slot as usize)
            .and_then(Option::as_ref)
    }

    /// Returns the slots that a bind group must be bound to before a draw or dispatch.
    #[inline]
    pub fn bind_groups_mask(&self) -> SlotMask {
        self.bind_groups_mask
    }

    /// Returns the slots at which `self` and `other` expect the same bind group layout object.
    /// Slots that neither layout uses are included.
    pub fn shared_slots(&self, other: &PipelineLayout) -> SlotMask {
        (0..MAX_BIND_GROUPS)
            .filter(|&slot| self.bind_group_layout(slot) == other.bind_group_layout(slot))
            .collect()
    }
}

impl_id_counter!(PipelineLayout);

/// Parameters to create a new `PipelineLayout`.
#[derive(Clone, Debug)]
pub struct PipelineLayoutCreateInfo {
    /// The bind group layout for each slot, starting at slot 0. `None` leaves a slot unused.
    ///
    /// The default value is empty.
    pub bind_group_layouts: Vec<Option<Arc<BindGroupLayout>>>,

    pub _ne: NonExhaustive,
}

impl Default for PipelineLayoutCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            bind_group_layouts: Vec::new(),
            _ne: NonExhaustive(()),
        }
    }
}

/// Error that can happen when creating a pipeline layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineLayoutCreationError {
    /// More bind group slots were given than the maximum.
    TooManyBindGroups { count: u32, max: u32 },
}

impl Error for PipelineLayoutCreationError {}

impl Display for PipelineLayoutCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::TooManyBindGroups { count, max } => write!(
                f,
                "{} bind group slots were given, but the maximum is {}",
                count, max,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineLayout, PipelineLayoutCreateInfo, PipelineLayoutCreationError};
    use crate::{bind_group::BindGroupLayout, slot_mask::SlotMask};

    #[test]
    fn mask_and_shared_slots() {
        let a = BindGroupLayout::new(Default::default()).unwrap();
        let b = BindGroupLayout::new(Default::default()).unwrap();

        let first = PipelineLayout::new(PipelineLayoutCreateInfo {
            bind_group_layouts: vec![Some(a.clone()), None, Some(b.clone())],
            ..Default::default()
        })
        .unwrap();
        let second = PipelineLayout::new(PipelineLayoutCreateInfo {
            bind_group_layouts: vec![Some(a), Some(b.clone()), Some(b)],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(first.bind_groups_mask(), SlotMask::from_iter([0, 2]));
        assert!(first.bind_group_layout(1).is_none());
        assert!(first.bind_group_layout(9).is_none());
        assert_eq!(first.shared_slots(&second), SlotMask::from_iter([0, 2, 3]));
    }

    #[test]
    fn too_many_bind_groups() {
        match PipelineLayout::new(PipelineLayoutCreateInfo {
            bind_group_layouts: vec![None; 5],
            ..Default::default()
        }) {
            Err(PipelineLayoutCreationError::TooManyBindGroups { count: 5, .. }) => (),
            _ => panic!(),
        }
    }
}
