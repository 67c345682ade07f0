// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Tracks the state of a command buffer while it is being recorded.
//!
//! The [`StateTracker`] is called once for every recorded command, before the command is
//! encoded. It keeps track of three things:
//!
//! - Which [`ValidationAspects`] currently hold. Draws and dispatches need some of these to be
//!   satisfied. Aspects that are expensive to compute are only recomputed when a command actually
//!   needs them, and then cached until the next command that invalidates them.
//! - The usage that every buffer and texture is guaranteed to be in, based on the most recent
//!   transition recorded for it.
//! - Where recording is in the render pass and subpass protocol.
//!
//! Every method that validates a command returns `Err` if the command must be rejected. The state
//! of the tracker is only modified when the method returns `Ok`.

use crate::{
    buffer::BufferUsage,
    macros::gpu_bitflags,
    pipeline::Pipeline,
    render_pass::{Framebuffer, RenderPass},
    slot_mask::SlotMask,
    texture::TextureUsage,
    MAX_BIND_GROUPS,
};
use foldhash::{HashMap, HashSet};
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

mod pipeline;
mod render_pass;
mod usage;

/// Keeps track of the validation state of one command buffer recording session.
#[derive(Debug)]
pub struct StateTracker {
    aspects: ValidationAspects,

    // Slots whose bind group satisfies the layout of the last pipeline. Slots that the layout
    // doesn't use are always set.
    bind_groups_mask: SlotMask,
    vertex_inputs_mask: SlotMask,
    last_pipeline: Option<Arc<Pipeline>>,

    buffer_usages: HashMap<NonZero<u64>, BufferUsage>,
    texture_usages: HashMap<NonZero<u64>, TextureUsage>,
    touched_buffers: HashSet<NonZero<u64>>,
    touched_textures: HashSet<NonZero<u64>>,

    render_pass: Option<RenderPassState>,
}

#[derive(Clone, Debug)]
struct RenderPassState {
    render_pass: Arc<RenderPass>,
    framebuffer: Arc<Framebuffer>,
    subpass: u32,
    subpass_active: bool,
}

impl StateTracker {
    /// Returns a tracker for a new recording session.
    #[inline]
    pub fn new() -> Self {
        StateTracker {
            aspects: ValidationAspects::empty(),
            bind_groups_mask: SlotMask::empty(),
            vertex_inputs_mask: SlotMask::empty(),
            last_pipeline: None,
            buffer_usages: HashMap::default(),
            texture_usages: HashMap::default(),
            touched_buffers: HashSet::default(),
            touched_textures: HashSet::default(),
            render_pass: None,
        }
    }

    /// Returns the aspects that are currently known to hold.
    ///
    /// Aspects that are computed lazily may hold without being included yet.
    #[inline]
    pub fn aspects(&self) -> ValidationAspects {
        self.aspects
    }

    /// Returns whether a pipeline is bound in the current scope.
    #[inline]
    pub fn has_pipeline(&self) -> bool {
        self.aspects.intersects(ValidationAspects::pipelines())
    }

    /// Returns whether a render pass is active.
    #[inline]
    pub fn has_render_pass(&self) -> bool {
        self.render_pass.is_some()
    }

    /// Returns the index of the current subpass, and whether it is being recorded, if a render
    /// pass is active.
    #[inline]
    pub fn subpass(&self) -> Option<(u32, bool)> {
        self.render_pass
            .as_ref()
            .map(|state| (state.subpass, state.subpass_active))
    }

    /// Returns the ids of the buffers that were transitioned during the session.
    #[inline]
    pub fn touched_buffers(&self) -> &HashSet<NonZero<u64>> {
        &self.touched_buffers
    }

    /// Returns the ids of the textures that were transitioned during the session, explicitly or
    /// as subpass attachments.
    #[inline]
    pub fn touched_textures(&self) -> &HashSet<NonZero<u64>> {
        &self.touched_textures
    }

    /// Checks that a dispatch can be recorded.
    #[inline]
    pub fn validate_dispatch(&mut self) -> Result<(), StateTrackerError> {
        self.validate_aspects(ValidationAspects::COMPUTE_PIPELINE | ValidationAspects::BIND_GROUPS)
    }

    /// Checks that a non-indexed draw can be recorded.
    #[inline]
    pub fn validate_draw_arrays(&mut self) -> Result<(), StateTrackerError> {
        self.validate_aspects(
            ValidationAspects::RENDER_PIPELINE
                | ValidationAspects::BIND_GROUPS
                | ValidationAspects::VERTEX_BUFFERS,
        )
    }

    /// Checks that an indexed draw can be recorded.
    #[inline]
    pub fn validate_draw_elements(&mut self) -> Result<(), StateTrackerError> {
        self.validate_aspects(
            ValidationAspects::RENDER_PIPELINE
                | ValidationAspects::BIND_GROUPS
                | ValidationAspects::VERTEX_BUFFERS
                | ValidationAspects::INDEX_BUFFER,
        )
    }

    /// Checks that the recording session can end.
    #[inline]
    pub fn validate_end(&self) -> Result<(), StateTrackerError> {
        if self.render_pass.is_some() {
            return Err(StateTrackerError::RenderPassStillActive);
        }

        Ok(())
    }

    fn validate_aspects(&mut self, required: ValidationAspects) -> Result<(), StateTrackerError> {
        if self.aspects.contains(required) {
            return Ok(());
        }

        let missing = required - self.aspects;

        if missing.intersects(ValidationAspects::COMPUTE_PIPELINE) {
            return Err(StateTrackerError::NoComputePipeline);
        }

        if missing.intersects(ValidationAspects::RENDER_PIPELINE) {
            return Err(StateTrackerError::NoRenderPipeline);
        }

        if missing.intersects(ValidationAspects::BIND_GROUPS) {
            self.recompute_bind_groups()?;
        }

        if missing.intersects(ValidationAspects::VERTEX_BUFFERS) {
            self.recompute_vertex_buffers()?;
        }

        if missing.intersects(ValidationAspects::INDEX_BUFFER) {
            return Err(StateTrackerError::IndexBufferNotSet);
        }

        Ok(())
    }

    fn recompute_bind_groups(&mut self) -> Result<(), StateTrackerError> {
        let missing = SlotMask::full(MAX_BIND_GROUPS).difference(self.bind_groups_mask);

        if !missing.is_empty() {
            return Err(StateTrackerError::BindGroupsNotSet { missing });
        }

        self.aspects |= ValidationAspects::BIND_GROUPS;

        Ok(())
    }

    fn recompute_vertex_buffers(&mut self) -> Result<(), StateTrackerError> {
        let required = self
            .last_pipeline
            .as_ref()
            .map_or(SlotMask::empty(), |pipeline| pipeline.vertex_inputs_mask());
        let missing = required.difference(self.vertex_inputs_mask);

        if !missing.is_empty() {
            return Err(StateTrackerError::VertexBuffersNotSet { missing });
        }

        self.aspects |= ValidationAspects::VERTEX_BUFFERS;

        Ok(())
    }

    /// Forgets everything that depends on the bound pipeline. Called at every render pass and
    /// subpass boundary.
    fn unset_pipeline(&mut self) {
        self.aspects = ValidationAspects::empty();
    }
}

impl Default for StateTracker {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

gpu_bitflags! {
    /// Preconditions that draws and dispatches depend on.
    ValidationAspects impl {
        /// Returns the aspects that say a pipeline is bound.
        #[inline]
        pub const fn pipelines() -> Self {
            Self::COMPUTE_PIPELINE.union(Self::RENDER_PIPELINE)
        }
    } = u32;

    /// A compute pipeline is bound.
    COMPUTE_PIPELINE = 1 << 0,

    /// A render pipeline compatible with the current subpass is bound.
    RENDER_PIPELINE = 1 << 1,

    /// Every bind group slot used by the pipeline layout holds a compatible bind group.
    BIND_GROUPS = 1 << 2,

    /// Every vertex buffer slot read by the pipeline holds a vertex buffer.
    VERTEX_BUFFERS = 1 << 3,

    /// An index buffer is bound.
    INDEX_BUFFER = 1 << 4,
}

/// Error that can happen when validating a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateTrackerError {
    /* Sequencing */
    /// A copy was recorded while a render pass is active.
    CopyInRenderPass,

    /// A render pass was begun while another one is active.
    RenderPassAlreadyActive,

    /// A render pass command was recorded while no render pass is active.
    NoRenderPass,

    /// A subpass was begun while the previous one was not ended.
    SubpassAlreadyActive,

    /// A subpass command was recorded while no subpass is being recorded.
    NoActiveSubpass,

    /// A subpass was begun after the last subpass of the render pass.
    NoSubpassesRemaining { subpass_count: u32 },

    /// The render pass was ended before all of its subpasses were recorded.
    SubpassesRemaining { subpass: u32, subpass_count: u32 },

    /// The recording session was ended while a render pass is active.
    RenderPassStillActive,

    /// A compute pipeline was bound while a render pass is active.
    ComputePipelineInRenderPass,

    /// A render pipeline was bound while no render pass is active.
    RenderPipelineOutsideRenderPass,

    /// A bind group, index buffer or vertex buffer was set while no pipeline is bound.
    NoPipeline,

    /// A dispatch was recorded without a compute pipeline bound.
    NoComputePipeline,

    /// A draw was recorded without a render pipeline bound.
    NoRenderPipeline,

    /// A draw or dispatch was recorded while some bind group slots required by the pipeline
    /// layout are unsatisfied.
    BindGroupsNotSet { missing: SlotMask },

    /// A draw was recorded while some vertex buffer slots read by the pipeline are not set.
    VertexBuffersNotSet { missing: SlotMask },

    /// An indexed draw was recorded without an index buffer set.
    IndexBufferNotSet,

    /* Compatibility */
    /// The framebuffer was not created for a render pass compatible with the one being begun.
    FramebufferIncompatible,

    /// The render pipeline was built for a render pass that is not compatible with the active
    /// one.
    PipelineIncompatible,

    /// The layout of the bind group is not the one the pipeline layout expects at the slot.
    BindGroupLayoutMismatch { slot: u32 },

    /// The bind group slot is not less than [`MAX_BIND_GROUPS`].
    BindGroupSlotOutOfRange { slot: u32 },

    /// The vertex buffer slot is not less than [`MAX_VERTEX_INPUTS`](crate::MAX_VERTEX_INPUTS).
    VertexBufferSlotOutOfRange { slot: u32 },

    /* Usage guarantees */
    /// A buffer is not guaranteed to be in the usage the command needs.
    BufferUsageNotGuaranteed { usage: BufferUsage },

    /// A texture is not guaranteed to be in the usage the command needs.
    TextureUsageNotGuaranteed { usage: TextureUsage },

    /// A buffer of the bind group is not guaranteed to be in the usage its binding needs.
    BindGroupBufferUsageNotGuaranteed { binding: u32, usage: BufferUsage },

    /// A texture of the bind group is not guaranteed to be in the usage its binding needs.
    BindGroupTextureUsageNotGuaranteed { binding: u32, usage: TextureUsage },

    /* Transitions */
    /// The buffer's usage is frozen to another usage.
    BufferUsageFrozen { frozen_usage: BufferUsage },

    /// The usage is not part of the buffer's allowed usage.
    BufferUsageNotAllowed { usage: BufferUsage },

    /// The buffer can't currently be transitioned, for example because it is mapped.
    BufferTransitionNotPossible { usage: BufferUsage },

    /// The texture's usage is frozen to another usage.
    TextureUsageFrozen { frozen_usage: TextureUsage },

    /// The usage is not part of the texture's allowed usage.
    TextureUsageNotAllowed { usage: TextureUsage },

    /// An explicit transition was made to or from an attachment usage.
    TextureAttachmentUsageTransition { usage: TextureUsage },

    /// The texture can't be transitioned, for example because its format doesn't support the
    /// usage.
    TextureTransitionNotPossible { usage: TextureUsage },

    /// An attachment of the subpass being begun can't be transitioned to its attachment usage.
    AttachmentTransitionNotPossible {
        attachment: u32,
        usage: TextureUsage,
    },
}

impl StateTrackerError {
    /// Returns which kind of rule the command broke.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CopyInRenderPass
            | Self::RenderPassAlreadyActive
            | Self::NoRenderPass
            | Self::SubpassAlreadyActive
            | Self::NoActiveSubpass
            | Self::NoSubpassesRemaining { .. }
            | Self::SubpassesRemaining { .. }
            | Self::RenderPassStillActive
            | Self::ComputePipelineInRenderPass
            | Self::RenderPipelineOutsideRenderPass
            | Self::NoPipeline
            | Self::NoComputePipeline
            | Self::NoRenderPipeline
            | Self::BindGroupsNotSet { .. }
            | Self::VertexBuffersNotSet { .. }
            | Self::IndexBufferNotSet => ErrorCategory::Sequencing,
            Self::FramebufferIncompatible
            | Self::PipelineIncompatible
            | Self::BindGroupLayoutMismatch { .. }
            | Self::BindGroupSlotOutOfRange { .. }
            | Self::VertexBufferSlotOutOfRange { .. } => ErrorCategory::Compatibility,
            Self::BufferUsageNotGuaranteed { .. }
            | Self::TextureUsageNotGuaranteed { .. }
            | Self::BindGroupBufferUsageNotGuaranteed { .. }
            | Self::BindGroupTextureUsageNotGuaranteed { .. } => ErrorCategory::UsageGuarantee,
            Self::BufferUsageFrozen { .. }
            | Self::BufferUsageNotAllowed { .. }
            | Self::BufferTransitionNotPossible { .. }
            | Self::TextureUsageFrozen { .. }
            | Self::TextureUsageNotAllowed { .. }
            | Self::TextureAttachmentUsageTransition { .. }
            | Self::TextureTransitionNotPossible { .. }
            | Self::AttachmentTransitionNotPossible { .. } => ErrorCategory::Transition,
        }
    }
}

impl Error for StateTrackerError {}

impl Display for StateTrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::CopyInRenderPass => write!(f, "copy cannot occur during a render pass"),
            Self::RenderPassAlreadyActive => write!(f, "a render pass is already active"),
            Self::NoRenderPass => write!(f, "no render pass is currently active"),
            Self::SubpassAlreadyActive => write!(
                f,
                "can't begin a subpass without ending the previous subpass",
            ),
            Self::NoActiveSubpass => write!(f, "no subpass is currently being recorded"),
            Self::NoSubpassesRemaining { subpass_count } => write!(
                f,
                "can't begin a subpass beyond the last subpass (the render pass has {} subpasses)",
                subpass_count,
            ),
            Self::SubpassesRemaining {
                subpass,
                subpass_count,
            } => write!(
                f,
                "can't end a render pass before the last subpass (only {} of {} subpasses were \
                recorded)",
                subpass, subpass_count,
            ),
            Self::RenderPassStillActive => {
                write!(f, "can't end command buffer with an active render pass")
            }
            Self::ComputePipelineInRenderPass => write!(
                f,
                "can't use a compute pipeline while a render pass is active",
            ),
            Self::RenderPipelineOutsideRenderPass => write!(
                f,
                "a render pass must be active when a render pipeline is set",
            ),
            Self::NoPipeline => write!(f, "a pipeline must be bound first"),
            Self::NoComputePipeline => write!(f, "no active compute pipeline"),
            Self::NoRenderPipeline => write!(f, "no active render pipeline"),
            Self::BindGroupsNotSet { missing } => {
                write!(f, "some bind groups are not set (slots {:?})", missing)
            }
            Self::VertexBuffersNotSet { missing } => {
                write!(f, "some vertex buffers are not set (slots {:?})", missing)
            }
            Self::IndexBufferNotSet => {
                write!(f, "cannot draw elements without an index buffer set")
            }
            Self::FramebufferIncompatible => {
                write!(f, "framebuffer is incompatible with this render pass")
            }
            Self::PipelineIncompatible => {
                write!(f, "pipeline is incompatible with this render pass")
            }
            Self::BindGroupLayoutMismatch { slot } => {
                write!(f, "bind group layout mismatch at slot {}", slot)
            }
            Self::BindGroupSlotOutOfRange { slot } => write!(
                f,
                "bind group slot {} is not less than the maximum of {}",
                slot, MAX_BIND_GROUPS,
            ),
            Self::VertexBufferSlotOutOfRange { slot } => write!(
                f,
                "vertex buffer slot {} is not less than the maximum of {}",
                slot,
                crate::MAX_VERTEX_INPUTS,
            ),
            Self::BufferUsageNotGuaranteed { usage } => write!(
                f,
                "buffer is not in the necessary usage ({:?} is not guaranteed)",
                usage,
            ),
            Self::TextureUsageNotGuaranteed { usage } => write!(
                f,
                "texture is not in the necessary usage ({:?} is not guaranteed)",
                usage,
            ),
            Self::BindGroupBufferUsageNotGuaranteed { binding, usage } => write!(
                f,
                "can't guarantee buffer usage {:?} needed by bind group binding {}",
                usage, binding,
            ),
            Self::BindGroupTextureUsageNotGuaranteed { binding, usage } => write!(
                f,
                "can't guarantee texture usage {:?} needed by bind group binding {}",
                usage, binding,
            ),
            Self::BufferUsageFrozen { frozen_usage } => write!(
                f,
                "buffer transition not possible (usage is frozen to {:?})",
                frozen_usage,
            ),
            Self::BufferUsageNotAllowed { usage } => write!(
                f,
                "buffer transition not possible (usage {:?} not allowed)",
                usage,
            ),
            Self::BufferTransitionNotPossible { usage } => {
                write!(f, "buffer transition to {:?} not possible", usage)
            }
            Self::TextureUsageFrozen { frozen_usage } => write!(
                f,
                "texture transition not possible (usage is frozen to {:?})",
                frozen_usage,
            ),
            Self::TextureUsageNotAllowed { usage } => write!(
                f,
                "texture transition not possible (usage {:?} not allowed)",
                usage,
            ),
            Self::TextureAttachmentUsageTransition { usage } => write!(
                f,
                "texture transition to {:?} not possible (textures cannot be transitioned to or \
                from attachment usages)",
                usage,
            ),
            Self::TextureTransitionNotPossible { usage } => {
                write!(f, "texture transition to {:?} not possible", usage)
            }
            Self::AttachmentTransitionNotPossible { attachment, usage } => write!(
                f,
                "can't transition attachment {} to {:?} usage",
                attachment, usage,
            ),
        }
    }
}

/// The kind of rule that a rejected command broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The command was recorded in the wrong scope or order.
    Sequencing,

    /// Two objects used together were not made for each other.
    Compatibility,

    /// A resource is not guaranteed to be in the usage the command needs.
    UsageGuarantee,

    /// A resource can't be transitioned to the requested usage.
    Transition,
}
