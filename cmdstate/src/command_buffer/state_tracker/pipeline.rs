// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{StateTracker, StateTrackerError, ValidationAspects};
use crate::{
    bind_group::{BindGroup, BindingResource},
    buffer::{Buffer, BufferUsage},
    pipeline::Pipeline,
    MAX_BIND_GROUPS, MAX_VERTEX_INPUTS,
};
use std::sync::Arc;

impl StateTracker {
    /// Binds a compute or render pipeline.
    ///
    /// Bind groups that were bound at a slot where the previous pipeline layout used the same
    /// bind group layout object stay valid. Every other slot that the new layout uses must be
    /// bound again.
    pub fn set_pipeline(&mut self, pipeline: &Arc<Pipeline>) -> Result<(), StateTrackerError> {
        let aspect = match pipeline.subpass() {
            None => {
                if self.render_pass.is_some() {
                    return Err(StateTrackerError::ComputePipelineInRenderPass);
                }

                ValidationAspects::COMPUTE_PIPELINE
            }
            Some((pipeline_render_pass, _)) => {
                let state = self
                    .render_pass
                    .as_ref()
                    .ok_or(StateTrackerError::RenderPipelineOutsideRenderPass)?;

                if !pipeline_render_pass.is_compatible_with(&state.render_pass) {
                    return Err(StateTrackerError::PipelineIncompatible);
                }

                ValidationAspects::RENDER_PIPELINE
            }
        };

        self.aspects -= ValidationAspects::pipelines()
            | ValidationAspects::BIND_GROUPS
            | ValidationAspects::VERTEX_BUFFERS;
        self.aspects |= aspect;

        let layout = pipeline.layout();
        let mut bind_groups_mask = layout.bind_groups_mask().complement_within(MAX_BIND_GROUPS);

        if let Some(last_pipeline) = &self.last_pipeline {
            let shared = layout.shared_slots(last_pipeline.layout());
            bind_groups_mask = bind_groups_mask.union(shared.intersection(self.bind_groups_mask));
        }

        self.bind_groups_mask = bind_groups_mask;
        self.last_pipeline = Some(pipeline.clone());

        Ok(())
    }

    /// Binds a bind group at `slot`.
    ///
    /// The bind group's layout must be the one the bound pipeline's layout expects at `slot`, and
    /// every buffer and texture in the group must be guaranteed to be in the usage its binding
    /// needs.
    pub fn set_bind_group(
        &mut self,
        slot: u32,
        bind_group: &BindGroup,
    ) -> Result<(), StateTrackerError> {
        if slot >= MAX_BIND_GROUPS {
            return Err(StateTrackerError::BindGroupSlotOutOfRange { slot });
        }

        let pipeline = self.bound_pipeline()?;

        if pipeline.layout().bind_group_layout(slot) != Some(bind_group.layout()) {
            return Err(StateTrackerError::BindGroupLayoutMismatch { slot });
        }

        self.validate_bind_group_usages(bind_group)?;
        self.bind_groups_mask.insert(slot);

        Ok(())
    }

    /// Sets the index buffer used by indexed draws.
    pub fn set_index_buffer(&mut self, buffer: &Buffer) -> Result<(), StateTrackerError> {
        self.bound_pipeline()?;
        self.validate_buffer_usage(buffer, BufferUsage::INDEX)?;
        self.aspects |= ValidationAspects::INDEX_BUFFER;

        Ok(())
    }

    /// Sets the vertex buffer at `slot`.
    pub fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: &Buffer,
    ) -> Result<(), StateTrackerError> {
        if slot >= MAX_VERTEX_INPUTS {
            return Err(StateTrackerError::VertexBufferSlotOutOfRange { slot });
        }

        self.bound_pipeline()?;
        self.validate_buffer_usage(buffer, BufferUsage::VERTEX)?;
        self.vertex_inputs_mask.insert(slot);

        Ok(())
    }

    fn bound_pipeline(&self) -> Result<&Arc<Pipeline>, StateTrackerError> {
        if !self.has_pipeline() {
            return Err(StateTrackerError::NoPipeline);
        }

        self.last_pipeline
            .as_ref()
            .ok_or(StateTrackerError::NoPipeline)
    }

    fn validate_bind_group_usages(&self, bind_group: &BindGroup) -> Result<(), StateTrackerError> {
        for entry in bind_group.entries() {
            let Some(layout_binding) = bind_group.layout().binding(entry.binding) else {
                continue;
            };

            match &entry.resource {
                BindingResource::Buffer { buffer, .. } => {
                    if let Some(usage) = layout_binding.ty.required_buffer_usage() {
                        if !self.buffer_has_guaranteed_usage(buffer, usage) {
                            return Err(StateTrackerError::BindGroupBufferUsageNotGuaranteed {
                                binding: entry.binding,
                                usage,
                            });
                        }
                    }
                }
                BindingResource::TextureView(view) => {
                    if let Some(usage) = layout_binding.ty.required_texture_usage() {
                        if !self.texture_has_guaranteed_usage(view.texture(), usage) {
                            return Err(StateTrackerError::BindGroupTextureUsageNotGuaranteed {
                                binding: entry.binding,
                                usage,
                            });
                        }
                    }
                }
                BindingResource::Sampler(_) => (),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bind_group::{
            BindGroup, BindGroupEntry, BindGroupLayout, BindGroupLayoutBinding,
            BindGroupLayoutCreateInfo, BindingType,
        },
        buffer::BufferUsage,
        command_buffer::{StateTracker, StateTrackerError, ValidationAspects},
        sampler::Sampler,
        slot_mask::SlotMask,
        tests::{
            buffer, color_view, compute_pipeline, framebuffer_for, render_pipeline,
            single_color_render_pass, uniform_bind_group, uniform_layout,
        },
        texture::TextureUsage,
    };

    #[test]
    fn compute_pipeline_not_in_render_pass() {
        let render_pass = single_color_render_pass();
        let framebuffer = framebuffer_for(&render_pass);
        let pipeline = compute_pipeline(&[]);
        let mut tracker = StateTracker::new();

        tracker
            .begin_render_pass(&render_pass, &framebuffer)
            .unwrap();
        assert_eq!(
            tracker.set_pipeline(&pipeline),
            Err(StateTrackerError::ComputePipelineInRenderPass),
        );
        tracker.end_render_pass().unwrap();
        tracker.set_pipeline(&pipeline).unwrap();
        assert!(tracker.has_pipeline());
    }

    #[test]
    fn incompatible_render_pipeline() {
        let render_pass = single_color_render_pass();
        let framebuffer = framebuffer_for(&render_pass);
        let other = crate::render_pass::RenderPass::new(
            crate::render_pass::RenderPassCreateInfo {
                attachments: vec![Default::default(), Default::default()],
                subpasses: vec![Default::default()],
                ..Default::default()
            },
        )
        .unwrap();
        let pipeline = render_pipeline(&other, &[], &[]);
        let mut tracker = StateTracker::new();

        tracker
            .begin_render_pass(&render_pass, &framebuffer)
            .unwrap();
        assert_eq!(
            tracker.set_pipeline(&pipeline),
            Err(StateTrackerError::PipelineIncompatible),
        );

        // A pipeline built for a different but compatible render pass is accepted.
        let compatible = render_pipeline(&single_color_render_pass(), &[], &[]);
        tracker.set_pipeline(&compatible).unwrap();
    }

    #[test]
    fn binding_pipeline_clears_aspects() {
        let render_pass = single_color_render_pass();
        let framebuffer = framebuffer_for(&render_pass);
        let pipeline = render_pipeline(&render_pass, &[], &[]);
        let mut tracker = StateTracker::new();

        tracker
            .begin_render_pass(&render_pass, &framebuffer)
            .unwrap();
        tracker.set_pipeline(&pipeline).unwrap();
        tracker.validate_draw_arrays().unwrap();
        assert!(tracker
            .aspects()
            .contains(ValidationAspects::BIND_GROUPS | ValidationAspects::VERTEX_BUFFERS));

        tracker.set_pipeline(&pipeline).unwrap();
        assert!(!tracker
            .aspects()
            .intersects(ValidationAspects::BIND_GROUPS | ValidationAspects::VERTEX_BUFFERS));
        assert!(tracker.aspects().contains(ValidationAspects::RENDER_PIPELINE));
    }

    #[test]
    fn shared_layouts_carry_forward() {
        let shared = uniform_layout();
        let replaced = uniform_layout();
        let first = compute_pipeline(&[Some(shared.clone()), Some(replaced.clone())]);
        let second = compute_pipeline(&[Some(shared.clone()), Some(uniform_layout())]);
        let mut tracker = StateTracker::new();

        let uniform = buffer(BufferUsage::UNIFORM);
        tracker
            .transition_buffer_usage(&uniform, BufferUsage::UNIFORM)
            .unwrap();

        tracker.set_pipeline(&first).unwrap();
        tracker
            .set_bind_group(0, &uniform_bind_group(&shared, &uniform))
            .unwrap();
        tracker
            .set_bind_group(1, &uniform_bind_group(&replaced, &uniform))
            .unwrap();
        tracker.validate_dispatch().unwrap();

        tracker.set_pipeline(&second).unwrap();
        assert_eq!(
            tracker.validate_dispatch(),
            Err(StateTrackerError::BindGroupsNotSet {
                missing: SlotMask::from_slot(1),
            }),
        );
    }

    #[test]
    fn unbound_slot_is_not_carried_forward() {
        let layout = uniform_layout();
        let pipeline = compute_pipeline(&[Some(layout.clone())]);
        let mut tracker = StateTracker::new();

        tracker.set_pipeline(&pipeline).unwrap();
        tracker.set_pipeline(&pipeline).unwrap();
        assert_eq!(
            tracker.validate_dispatch(),
            Err(StateTrackerError::BindGroupsNotSet {
                missing: SlotMask::from_slot(0),
            }),
        );
    }

    #[test]
    fn bind_group_layout_mismatch() {
        let layout = uniform_layout();
        let pipeline = compute_pipeline(&[Some(layout.clone())]);
        let uniform = buffer(BufferUsage::UNIFORM);
        let mut tracker = StateTracker::new();

        tracker
            .transition_buffer_usage(&uniform, BufferUsage::UNIFORM)
            .unwrap();
        let group = uniform_bind_group(&layout, &uniform);

        assert_eq!(
            tracker.set_bind_group(0, &group),
            Err(StateTrackerError::NoPipeline),
        );

        tracker.set_pipeline(&pipeline).unwrap();
        assert_eq!(
            tracker.set_bind_group(1, &group),
            Err(StateTrackerError::BindGroupLayoutMismatch { slot: 1 }),
        );
        assert_eq!(
            tracker.set_bind_group(7, &group),
            Err(StateTrackerError::BindGroupSlotOutOfRange { slot: 7 }),
        );

        // Same description, different object.
        let lookalike = uniform_bind_group(&uniform_layout(), &uniform);
        assert_eq!(
            tracker.set_bind_group(0, &lookalike),
            Err(StateTrackerError::BindGroupLayoutMismatch { slot: 0 }),
        );

        tracker.set_bind_group(0, &group).unwrap();
    }

    #[test]
    fn bind_group_usages() {
        let layout = BindGroupLayout::new(BindGroupLayoutCreateInfo {
            bindings: vec![
                BindGroupLayoutBinding::new(0, BindingType::StorageBuffer),
                BindGroupLayoutBinding::new(1, BindingType::SampledTexture),
                BindGroupLayoutBinding::new(2, BindingType::Sampler),
            ],
            ..Default::default()
        })
        .unwrap();
        let storage = buffer(BufferUsage::STORAGE | BufferUsage::TRANSFER_DST);
        let view = color_view([8, 8]);
        let group = BindGroup::new(
            layout.clone(),
            [
                BindGroupEntry::buffer(0, storage.clone()),
                BindGroupEntry::texture_view(1, view.clone()),
                BindGroupEntry::sampler(2, Sampler::new(Default::default())),
            ],
        )
        .unwrap();
        let pipeline = compute_pipeline(&[Some(layout)]);
        let mut tracker = StateTracker::new();

        tracker.set_pipeline(&pipeline).unwrap();
        assert_eq!(
            tracker.set_bind_group(0, &group),
            Err(StateTrackerError::BindGroupBufferUsageNotGuaranteed {
                binding: 0,
                usage: BufferUsage::STORAGE,
            }),
        );

        tracker
            .transition_buffer_usage(&storage, BufferUsage::STORAGE)
            .unwrap();
        assert_eq!(
            tracker.set_bind_group(0, &group),
            Err(StateTrackerError::BindGroupTextureUsageNotGuaranteed {
                binding: 1,
                usage: TextureUsage::SAMPLED,
            }),
        );

        tracker
            .transition_texture_usage(view.texture(), TextureUsage::SAMPLED)
            .unwrap();
        tracker.set_bind_group(0, &group).unwrap();
        tracker.validate_dispatch().unwrap();

        // A later transition invalidates the guarantee for the next bind.
        tracker
            .transition_buffer_usage(&storage, BufferUsage::TRANSFER_DST)
            .unwrap();
        assert!(matches!(
            tracker.set_bind_group(0, &group),
            Err(StateTrackerError::BindGroupBufferUsageNotGuaranteed { .. }),
        ));
    }

    #[test]
    fn index_and_vertex_buffers() {
        let render_pass = single_color_render_pass();
        let framebuffer = framebuffer_for(&render_pass);
        let pipeline = render_pipeline(&render_pass, &[], &[0, 2]);
        let vertices = buffer(BufferUsage::VERTEX | BufferUsage::INDEX);
        let mut tracker = StateTracker::new();

        assert_eq!(
            tracker.set_index_buffer(&vertices),
            Err(StateTrackerError::NoPipeline),
        );
        assert_eq!(
            tracker.set_vertex_buffer(0, &vertices),
            Err(StateTrackerError::NoPipeline),
        );

        tracker
            .begin_render_pass(&render_pass, &framebuffer)
            .unwrap();
        tracker.set_pipeline(&pipeline).unwrap();
        assert_eq!(
            tracker.set_vertex_buffer(0, &vertices),
            Err(StateTrackerError::BufferUsageNotGuaranteed {
                usage: BufferUsage::VERTEX,
            }),
        );
        assert_eq!(
            tracker.set_vertex_buffer(16, &vertices),
            Err(StateTrackerError::VertexBufferSlotOutOfRange { slot: 16 }),
        );

        tracker
            .transition_buffer_usage(&vertices, BufferUsage::VERTEX)
            .unwrap();
        tracker.set_vertex_buffer(0, &vertices).unwrap();
        assert_eq!(
            tracker.validate_draw_arrays(),
            Err(StateTrackerError::VertexBuffersNotSet {
                missing: SlotMask::from_slot(2),
            }),
        );
        tracker.set_vertex_buffer(2, &vertices).unwrap();
        tracker.validate_draw_arrays().unwrap();

        assert_eq!(
            tracker.set_index_buffer(&vertices),
            Err(StateTrackerError::BufferUsageNotGuaranteed {
                usage: BufferUsage::INDEX,
            }),
        );
    }

    #[test]
    fn subpass_boundary_unsets_pipeline() {
        let render_pass = crate::render_pass::RenderPass::new(
            crate::render_pass::RenderPassCreateInfo {
                attachments: vec![Default::default()],
                subpasses: vec![
                    crate::render_pass::SubpassDescription {
                        color_attachments: vec![0],
                        ..Default::default()
                    },
                    crate::render_pass::SubpassDescription {
                        color_attachments: vec![0],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
        )
        .unwrap();
        let framebuffer = framebuffer_for(&render_pass);
        let pipeline = render_pipeline(&render_pass, &[], &[]);
        let mut tracker = StateTracker::new();

        tracker
            .begin_render_pass(&render_pass, &framebuffer)
            .unwrap();
        tracker.set_pipeline(&pipeline).unwrap();
        tracker.advance_subpass().unwrap();
        assert!(!tracker.has_pipeline());
        assert_eq!(
            tracker.validate_draw_arrays(),
            Err(StateTrackerError::NoRenderPipeline),
        );

        // Any pipeline compatible with the render pass can be bound again, whatever subpass it
        // was built for.
        tracker.set_pipeline(&pipeline).unwrap();
        assert!(tracker.has_pipeline());
        tracker.validate_draw_arrays().unwrap();
    }

    #[test]
    fn render_pipeline_between_subpasses() {
        let render_pass = crate::render_pass::RenderPass::new(
            crate::render_pass::RenderPassCreateInfo {
                attachments: vec![Default::default()],
                subpasses: vec![
                    crate::render_pass::SubpassDescription {
                        color_attachments: vec![0],
                        ..Default::default()
                    },
                    crate::render_pass::SubpassDescription {
                        color_attachments: vec![0],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
        )
        .unwrap();
        let framebuffer = framebuffer_for(&render_pass);
        let pipeline = render_pipeline(&render_pass, &[], &[]);
        let mut tracker = StateTracker::new();

        tracker
            .begin_render_pass(&render_pass, &framebuffer)
            .unwrap();
        tracker.end_subpass().unwrap();
        tracker.set_pipeline(&pipeline).unwrap();
        assert_eq!(tracker.subpass(), Some((1, false)));

        tracker.begin_subpass().unwrap();
        tracker.set_pipeline(&pipeline).unwrap();
        assert_eq!(tracker.subpass(), Some((1, true)));
    }
}
