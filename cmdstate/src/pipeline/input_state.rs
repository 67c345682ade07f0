// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Describes which vertex buffer slots a render pipeline reads from.

use crate::{
    macros::impl_id_counter, slot_mask::SlotMask, DeviceSize, NonExhaustive, MAX_VERTEX_INPUTS,
};
use smallvec::SmallVec;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

/// The vertex buffer slots read by a render pipeline.
#[derive(Debug)]
pub struct InputState {
    id: NonZero<u64>,
    inputs: SmallVec<[VertexInput; 4]>,
    inputs_mask: SlotMask,
}

impl InputState {
    /// Creates a new `InputState`.
    pub fn new(
        create_info: InputStateCreateInfo,
    ) -> Result<Arc<InputState>, InputStateCreationError> {
        let InputStateCreateInfo { inputs, _ne: _ } = create_info;

        let mut inputs_mask = SlotMask::empty();

        for input in &inputs {
            if input.slot >= MAX_VERTEX_INPUTS {
                return Err(InputStateCreationError::SlotOutOfRange { slot: input.slot });
            }

            if inputs_mask.contains_slot(input.slot) {
                return Err(InputStateCreationError::DuplicateSlot { slot: input.slot });
            }

            inputs_mask.insert(input.slot);
        }

        Ok(Arc::new(InputState {
            id: Self::next_id(),
            inputs: inputs.into_iter().collect(),
            inputs_mask,
        }))
    }

    /// Returns an input state that reads from no vertex buffers.
    #[inline]
    pub fn empty() -> Arc<InputState> {
        Arc::new(InputState {
            id: Self::next_id(),
            inputs: SmallVec::new(),
            inputs_mask: SlotMask::empty(),
        })
    }

    #[inline]
    pub fn inputs(&self) -> &[VertexInput] {
        &self.inputs
    }

    /// Returns the vertex buffer slots that must be set before drawing.
    #[inline]
    pub fn inputs_mask(&self) -> SlotMask {
        self.inputs_mask
    }
}

impl_id_counter!(InputState);

/// Parameters to create a new `InputState`.
#[derive(Clone, Debug)]
pub struct InputStateCreateInfo {
    /// The vertex buffer slots that are read. Slots must be unique and less than
    /// [`MAX_VERTEX_INPUTS`].
    ///
    /// The default value is empty.
    pub inputs: Vec<VertexInput>,

    pub _ne: NonExhaustive,
}

impl Default for InputStateCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            _ne: NonExhaustive(()),
        }
    }
}

/// A vertex buffer slot read by a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexInput {
    pub slot: u32,

    /// Number of bytes between two consecutive elements.
    pub stride: DeviceSize,

    pub step_mode: VertexStepMode,
}

/// How often the vertex shader advances to the next element of a vertex buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VertexStepMode {
    /// Once per vertex.
    #[default]
    Vertex,

    /// Once per instance.
    Instance,
}

/// Error that can happen when creating an input state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputStateCreationError {
    /// A slot was not less than [`MAX_VERTEX_INPUTS`].
    SlotOutOfRange { slot: u32 },

    /// A slot was used by more than one input.
    DuplicateSlot { slot: u32 },
}

impl Error for InputStateCreationError {}

impl Display for InputStateCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::SlotOutOfRange { slot } => write!(
                f,
                "vertex input slot {} is not less than the maximum of {}",
                slot, MAX_VERTEX_INPUTS,
            ),
            Self::DuplicateSlot { slot } => {
                write!(f, "vertex input slot {} was used more than once", slot)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InputState, InputStateCreateInfo, InputStateCreationError, VertexInput};
    use crate::slot_mask::SlotMask;

    fn input(slot: u32) -> VertexInput {
        VertexInput {
            slot,
            stride: 16,
            step_mode: Default::default(),
        }
    }

    #[test]
    fn inputs_mask() {
        let state = InputState::new(InputStateCreateInfo {
            inputs: vec![input(3), input(0)],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(state.inputs_mask(), SlotMask::from_iter([0, 3]));
        assert!(InputState::empty().inputs_mask().is_empty());
    }

    #[test]
    fn duplicate_slot() {
        match InputState::new(InputStateCreateInfo {
            inputs: vec![input(1), input(1)],
            ..Default::default()
        }) {
            Err(InputStateCreationError::DuplicateSlot { slot: 1 }) => (),
            _ => panic!(),
        }
    }
}
