// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Validation of GPU command buffer recording.
//!
//! A graphics device has no safety net of its own: binding a pipeline outside of a render pass,
//! drawing without the resources a pipeline layout requires, or sampling from a texture that is
//! still being written as an attachment all lead to undefined behavior. This crate sits between
//! an untrusted recording API and the device, and rejects such sequences before anything is
//! encoded.
//!
//! # Brief summary
//!
//! - [*Buffers*](crate::buffer) and [*textures*](crate::texture) are the resources that commands
//!   read and write. Each declares the set of usages it may ever be put in, and may have its usage
//!   permanently *frozen* (for example a texture backing a swapchain surface).
//!
//! - [*Bind groups*](crate::bind_group) attach buffers, texture views and samplers to the binding
//!   slots that a [`BindGroupLayout`](crate::bind_group::BindGroupLayout) describes.
//!
//! - [*Pipelines*](crate::pipeline) are either compute or render pipelines. Both have a
//!   [`PipelineLayout`](crate::pipeline::PipelineLayout) that says which bind group layout is
//!   expected at every slot. Render pipelines are also tied to a subpass of a render pass and
//!   to an [`InputState`](crate::pipeline::InputState) that says which vertex buffer slots
//!   they read.
//!
//! - [`RenderPass`es and `Framebuffer`s](crate::render_pass) describe the attachments that
//!   draw commands write to, and the ordered subpasses in which they do so.
//!
//! - The [`StateTracker`](crate::command_buffer::StateTracker) is the core of the crate. It is
//!   called once per recorded command and keeps track of which preconditions currently hold,
//!   which usage every resource is guaranteed to be in, and where recording is in the
//!   render-pass/subpass protocol.
//!
//! - The [`CommandBufferBuilder`](crate::command_buffer::CommandBufferBuilder) owns a tracker,
//!   records the commands that pass validation, and turns the first failure into a permanent
//!   failure of the whole recording session.

pub mod bind_group;
pub mod buffer;
pub mod command_buffer;
pub mod format;
mod macros;
pub mod pipeline;
pub mod render_pass;
pub mod sampler;
pub mod slot_mask;
pub mod texture;

/// Maximum number of bind groups that a pipeline layout can reference.
pub const MAX_BIND_GROUPS: u32 = 4;

/// Maximum number of bindings in a single bind group layout.
pub const MAX_BINDINGS_PER_GROUP: u32 = 16;

/// Maximum number of vertex buffer slots that an input state can use.
pub const MAX_VERTEX_INPUTS: u32 = 16;

/// Maximum number of color attachments in a single subpass.
pub const MAX_COLOR_ATTACHMENTS: u32 = 4;

/// Represents the size of or an offset into a buffer, in bytes.
pub type DeviceSize = u64;

/// A helper type for non-exhaustive structs.
///
/// This type cannot be constructed outside this crate. Structures with a field of this type can
/// only be constructed by calling a constructor function or `Default::default()`. The effect is
/// similar to the standard Rust `#[non_exhaustive]` attribute, except that it does not prevent
/// update syntax from being used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)] // add traits as needed
pub struct NonExhaustive(pub(crate) ());
