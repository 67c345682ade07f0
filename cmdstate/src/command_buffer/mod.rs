// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Recording and validation of commands.
//!
//! Commands are recorded with a [`CommandBufferBuilder`]. Every command is validated by the
//! builder's [`StateTracker`] before it is recorded, and the first command that fails validation
//! makes the whole recording fail: every later command is rejected with
//! [`CommandBufferBuilderError::Poisoned`], and [`build`](CommandBufferBuilder::build) returns
//! the original error.
//!
//! # Usage guarantees
//!
//! Resources are not implicitly transitioned. Before a buffer can be used as a vertex buffer, for
//! example, it must be explicitly transitioned to [`BufferUsage::VERTEX`]. The only exception are
//! subpass attachments, which are put in their attachment usage when the subpass begins.
//!
//! [`BufferUsage::VERTEX`]: crate::buffer::BufferUsage::VERTEX
//!
//! ```
//! use cmdstate::{
//!     buffer::{Buffer, BufferCreateInfo, BufferUsage},
//!     command_buffer::CommandBufferBuilder,
//!     pipeline::{Pipeline, PipelineLayout, RenderPipelineCreateInfo},
//!     pipeline::{InputState, InputStateCreateInfo, VertexInput},
//!     render_pass::{
//!         AttachmentDescription, Framebuffer, FramebufferAttachment, FramebufferCreateInfo,
//!         RenderPass, RenderPassCreateInfo, SubpassDescription,
//!     },
//! };
//!
//! let render_pass = RenderPass::new(RenderPassCreateInfo {
//!     attachments: vec![AttachmentDescription::default()],
//!     subpasses: vec![SubpassDescription {
//!         color_attachments: vec![0],
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! })
//! .unwrap();
//! let framebuffer = Framebuffer::new(
//!     render_pass.clone(),
//!     FramebufferCreateInfo {
//!         attachments: vec![FramebufferAttachment::External],
//!         extent: [800, 600],
//!         ..Default::default()
//!     },
//! )
//! .unwrap();
//! let input_state = InputState::new(InputStateCreateInfo {
//!     inputs: vec![VertexInput {
//!         slot: 0,
//!         stride: 12,
//!         step_mode: Default::default(),
//!     }],
//!     ..Default::default()
//! })
//! .unwrap();
//! let pipeline = Pipeline::new_render(RenderPipelineCreateInfo {
//!     render_pass: Some(render_pass.clone()),
//!     input_state: Some(input_state),
//!     ..RenderPipelineCreateInfo::layout(PipelineLayout::new(Default::default()).unwrap())
//! })
//! .unwrap();
//! let vertex_buffer = Buffer::new(BufferCreateInfo {
//!     size: 36,
//!     allowed_usage: BufferUsage::TRANSFER_DST | BufferUsage::VERTEX,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let mut builder = CommandBufferBuilder::new(Default::default());
//! builder
//!     .transition_buffer_usage(vertex_buffer.clone(), BufferUsage::VERTEX)
//!     .unwrap()
//!     .begin_render_pass(render_pass, framebuffer)
//!     .unwrap()
//!     .set_pipeline(pipeline)
//!     .unwrap()
//!     .set_vertex_buffers(0, [(vertex_buffer, 0)])
//!     .unwrap()
//!     .draw_arrays(3, 1, 0, 0)
//!     .unwrap()
//!     .end_render_pass()
//!     .unwrap();
//!
//! let command_buffer = builder.build().unwrap();
//! assert_eq!(command_buffer.commands().len(), 6);
//! ```

pub use self::{
    builder::{
        BufferTextureCopy, Command, CommandBuffer, CommandBufferBuilder,
        CommandBufferBuilderCreateInfo, CommandBufferBuilderError,
    },
    state_tracker::{ErrorCategory, StateTracker, StateTrackerError, ValidationAspects},
};

mod builder;
mod state_tracker;
