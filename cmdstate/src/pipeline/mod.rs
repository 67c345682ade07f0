// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Describes how the device should perform a graphical or compute operation.
//!
//! There are two kinds of pipelines:
//!
//! - Compute pipelines, for dispatches. They can only be bound outside of a render pass.
//! - Render pipelines, for draws. They are built for one subpass of a render pass, and can only
//!   be bound while a compatible render pass is active.
//!
//! Both kinds have a [`PipelineLayout`]. Render pipelines also have an [`InputState`].

pub use self::{
    input_state::{
        InputState, InputStateCreateInfo, InputStateCreationError, VertexInput, VertexStepMode,
    },
    layout::{PipelineLayout, PipelineLayoutCreateInfo, PipelineLayoutCreationError},
};
use crate::{
    macros::impl_id_counter, render_pass::RenderPass, slot_mask::SlotMask, NonExhaustive,
};
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

mod input_state;
mod layout;

/// A compute or render pipeline.
#[derive(Debug)]
pub struct Pipeline {
    id: NonZero<u64>,
    layout: Arc<PipelineLayout>,
    kind: PipelineKind,
}

impl Pipeline {
    /// Creates a new compute pipeline.
    #[inline]
    pub fn new_compute(create_info: ComputePipelineCreateInfo) -> Arc<Pipeline> {
        let ComputePipelineCreateInfo { layout, _ne: _ } = create_info;

        Arc::new(Pipeline {
            id: Self::next_id(),
            layout,
            kind: PipelineKind::Compute,
        })
    }

    /// Creates a new render pipeline.
    pub fn new_render(
        create_info: RenderPipelineCreateInfo,
    ) -> Result<Arc<Pipeline>, PipelineCreationError> {
        let RenderPipelineCreateInfo {
            layout,
            render_pass,
            subpass,
            input_state,
            _ne: _,
        } = create_info;

        let render_pass = render_pass.ok_or(PipelineCreationError::RenderPassMissing)?;

        if subpass >= render_pass.subpass_count() {
            return Err(PipelineCreationError::SubpassOutOfRange {
                subpass,
                subpass_count: render_pass.subpass_count(),
            });
        }

        Ok(Arc::new(Pipeline {
            id: Self::next_id(),
            layout,
            kind: PipelineKind::Render {
                render_pass,
                subpass,
                input_state: input_state.unwrap_or_else(InputState::empty),
            },
        }))
    }

    /// Returns the pipeline layout.
    #[inline]
    pub fn layout(&self) -> &Arc<PipelineLayout> {
        &self.layout
    }

    #[inline]
    pub fn kind(&self) -> &PipelineKind {
        &self.kind
    }

    #[inline]
    pub fn is_compute(&self) -> bool {
        matches!(self.kind, PipelineKind::Compute)
    }

    /// Returns the render pass and subpass index that a render pipeline was built for.
    #[inline]
    pub fn subpass(&self) -> Option<(&Arc<RenderPass>, u32)> {
        match &self.kind {
            PipelineKind::Compute => None,
            PipelineKind::Render {
                render_pass,
                subpass,
                ..
            } => Some((render_pass, *subpass)),
        }
    }

    /// Returns the vertex buffer slots that must be set before drawing with this pipeline.
    /// This is always empty for compute pipelines.
    #[inline]
    pub fn vertex_inputs_mask(&self) -> SlotMask {
        match &self.kind {
            PipelineKind::Compute => SlotMask::empty(),
            PipelineKind::Render { input_state, .. } => input_state.inputs_mask(),
        }
    }
}

impl_id_counter!(Pipeline);

/// The kind of a [`Pipeline`], with the state specific to that kind.
#[derive(Clone, Debug)]
pub enum PipelineKind {
    Compute,
    Render {
        render_pass: Arc<RenderPass>,
        subpass: u32,
        input_state: Arc<InputState>,
    },
}

/// Parameters to create a new compute pipeline.
#[derive(Clone, Debug)]
pub struct ComputePipelineCreateInfo {
    /// The pipeline layout to use.
    ///
    /// There is no default value.
    pub layout: Arc<PipelineLayout>,

    pub _ne: NonExhaustive,
}

impl ComputePipelineCreateInfo {
    /// Returns a `ComputePipelineCreateInfo` with the specified `layout`.
    #[inline]
    pub fn layout(layout: Arc<PipelineLayout>) -> Self {
        Self {
            layout,
            _ne: NonExhaustive(()),
        }
    }
}

/// Parameters to create a new render pipeline.
#[derive(Clone, Debug)]
pub struct RenderPipelineCreateInfo {
    /// The pipeline layout to use.
    ///
    /// There is no default value.
    pub layout: Arc<PipelineLayout>,

    /// The render pass that the pipeline will be used in.
    ///
    /// The default value is `None`, which must be overridden.
    pub render_pass: Option<Arc<RenderPass>>,

    /// The index of the subpass of `render_pass` that the pipeline will be used in.
    ///
    /// The default value is `0`.
    pub subpass: u32,

    /// The vertex buffer slots that the pipeline reads.
    ///
    /// The default value is `None`, which reads no vertex buffers.
    pub input_state: Option<Arc<InputState>>,

    pub _ne: NonExhaustive,
}

impl RenderPipelineCreateInfo {
    /// Returns a `RenderPipelineCreateInfo` with the specified `layout`.
    #[inline]
    pub fn layout(layout: Arc<PipelineLayout>) -> Self {
        Self {
            layout,
            render_pass: None,
            subpass: 0,
            input_state: None,
            _ne: NonExhaustive(()),
        }
    }
}

/// Error that can happen when creating a render pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineCreationError {
    /// No render pass was given.
    RenderPassMissing,

    /// The subpass index is not less than the number of subpasses of the render pass.
    SubpassOutOfRange { subpass: u32, subpass_count: u32 },
}

impl Error for PipelineCreationError {}

impl Display for PipelineCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::RenderPassMissing => write!(f, "a render pipeline needs a render pass"),
            Self::SubpassOutOfRange {
                subpass,
                subpass_count,
            } => write!(
                f,
                "subpass {} is out of range for a render pass with {} subpasses",
                subpass, subpass_count,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, PipelineCreationError, RenderPipelineCreateInfo};
    use crate::{slot_mask::SlotMask, tests::single_color_render_pass};

    #[test]
    fn subpass_out_of_range() {
        let layout = crate::pipeline::PipelineLayout::new(Default::default()).unwrap();

        match Pipeline::new_render(RenderPipelineCreateInfo {
            render_pass: Some(single_color_render_pass()),
            subpass: 1,
            ..RenderPipelineCreateInfo::layout(layout)
        }) {
            Err(PipelineCreationError::SubpassOutOfRange {
                subpass: 1,
                subpass_count: 1,
            }) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn render_pass_missing() {
        let layout = crate::pipeline::PipelineLayout::new(Default::default()).unwrap();

        assert_eq!(
            Pipeline::new_render(RenderPipelineCreateInfo::layout(layout)).unwrap_err(),
            PipelineCreationError::RenderPassMissing,
        );
    }

    #[test]
    fn default_input_state() {
        let layout = crate::pipeline::PipelineLayout::new(Default::default()).unwrap();
        let pipeline = Pipeline::new_render(RenderPipelineCreateInfo {
            render_pass: Some(single_color_render_pass()),
            ..RenderPipelineCreateInfo::layout(layout)
        })
        .unwrap();

        assert!(!pipeline.is_compute());
        assert_eq!(pipeline.vertex_inputs_mask(), SlotMask::empty());
        assert_eq!(pipeline.subpass().map(|(_, index)| index), Some(0));
    }
}
