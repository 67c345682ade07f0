// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{StateTracker, StateTrackerError};
use crate::{
    bind_group::BindGroup,
    buffer::{Buffer, BufferUsage},
    pipeline::Pipeline,
    render_pass::{Framebuffer, RenderPass},
    texture::{Texture, TextureUsage},
    DeviceSize, NonExhaustive,
};
use foldhash::HashMap;
use log::{debug, warn};
use smallvec::SmallVec;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

/// Records commands into a [`CommandBuffer`], validating each one as it goes.
///
/// All recording methods return `&mut Self` on success so that calls can be chained.
#[derive(Debug)]
pub struct CommandBufferBuilder {
    label: Option<String>,
    tracker: StateTracker,
    commands: Vec<Command>,

    // Every buffer and texture that a recorded command referenced, so that the ones the tracker
    // reports as touched can be handed to the finished command buffer.
    buffers: HashMap<NonZero<u64>, Arc<Buffer>>,
    textures: HashMap<NonZero<u64>, Arc<Texture>>,

    error: Option<CommandBufferBuilderError>,
}

impl CommandBufferBuilder {
    /// Starts a new recording session.
    pub fn new(create_info: CommandBufferBuilderCreateInfo) -> Self {
        let CommandBufferBuilderCreateInfo { label, _ne: _ } = create_info;

        debug!("began recording command buffer {:?}", label);

        CommandBufferBuilder {
            label,
            tracker: StateTracker::new(),
            commands: Vec::new(),
            buffers: HashMap::default(),
            textures: HashMap::default(),
            error: None,
        }
    }

    /// Returns the label given at creation.
    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the state tracker of the session.
    #[inline]
    pub fn state(&self) -> &StateTracker {
        &self.tracker
    }

    /// Returns whether a command has failed validation. Once this is `true`, every recording
    /// method returns [`CommandBufferBuilderError::Poisoned`].
    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the commands recorded so far.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Runs `validate` unless the builder is poisoned. If it fails, the builder is poisoned with
    /// the error.
    fn validate(
        &mut self,
        command: &'static str,
        validate: impl FnOnce(&mut Self) -> Result<(), CommandBufferBuilderError>,
    ) -> Result<(), CommandBufferBuilderError> {
        if self.error.is_some() {
            return Err(CommandBufferBuilderError::Poisoned);
        }

        match validate(self) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("command buffer {:?}: rejected `{}`: {}", self.label, command, err);
                self.error = Some(err.clone());

                Err(err)
            }
        }
    }

    fn keep_buffer(&mut self, buffer: &Arc<Buffer>) {
        self.buffers.insert(buffer.id(), buffer.clone());
    }

    fn keep_texture(&mut self, texture: &Arc<Texture>) {
        self.textures.insert(texture.id(), texture.clone());
    }

    /// Begins a render pass using `framebuffer`, and its first subpass.
    pub fn begin_render_pass(
        &mut self,
        render_pass: Arc<RenderPass>,
        framebuffer: Arc<Framebuffer>,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("begin_render_pass", |builder| {
            Ok(builder.tracker.begin_render_pass(&render_pass, &framebuffer)?)
        })?;

        for attachment in framebuffer.attachments() {
            if let Some(texture) = attachment.texture() {
                self.keep_texture(texture);
            }
        }

        self.commands.push(Command::BeginRenderPass {
            render_pass,
            framebuffer,
        });

        Ok(self)
    }

    /// Begins the next subpass of the active render pass.
    pub fn begin_subpass(&mut self) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("begin_subpass", |builder| Ok(builder.tracker.begin_subpass()?))?;
        self.commands.push(Command::BeginSubpass);

        Ok(self)
    }

    /// Ends the subpass being recorded.
    pub fn end_subpass(&mut self) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("end_subpass", |builder| Ok(builder.tracker.end_subpass()?))?;
        self.commands.push(Command::EndSubpass);

        Ok(self)
    }

    /// Ends the subpass being recorded and begins the next one.
    pub fn advance_subpass(&mut self) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("advance_subpass", |builder| {
            Ok(builder.tracker.advance_subpass()?)
        })?;
        self.commands.push(Command::NextSubpass);

        Ok(self)
    }

    /// Ends the active render pass.
    pub fn end_render_pass(&mut self) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("end_render_pass", |builder| {
            Ok(builder.tracker.end_render_pass()?)
        })?;
        self.commands.push(Command::EndRenderPass);

        Ok(self)
    }

    /// Binds a compute or render pipeline.
    pub fn set_pipeline(
        &mut self,
        pipeline: Arc<Pipeline>,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("set_pipeline", |builder| {
            Ok(builder.tracker.set_pipeline(&pipeline)?)
        })?;
        self.commands.push(Command::SetPipeline(pipeline));

        Ok(self)
    }

    /// Binds a bind group at `slot`.
    pub fn set_bind_group(
        &mut self,
        slot: u32,
        bind_group: Arc<BindGroup>,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("set_bind_group", |builder| {
            Ok(builder.tracker.set_bind_group(slot, &bind_group)?)
        })?;
        self.commands.push(Command::SetBindGroup { slot, bind_group });

        Ok(self)
    }

    /// Sets the index buffer, starting at `offset` bytes.
    pub fn set_index_buffer(
        &mut self,
        buffer: Arc<Buffer>,
        offset: DeviceSize,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("set_index_buffer", |builder| {
            validate_offset(&buffer, offset)?;

            Ok(builder.tracker.set_index_buffer(&buffer)?)
        })?;
        self.keep_buffer(&buffer);
        self.commands.push(Command::SetIndexBuffer { buffer, offset });

        Ok(self)
    }

    /// Sets consecutive vertex buffer slots, starting at `first_slot`. Each buffer is given with
    /// the offset in bytes at which its vertices start.
    pub fn set_vertex_buffers(
        &mut self,
        first_slot: u32,
        buffers: impl IntoIterator<Item = (Arc<Buffer>, DeviceSize)>,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        let buffers: SmallVec<[(Arc<Buffer>, DeviceSize); 4]> = buffers.into_iter().collect();

        self.validate("set_vertex_buffers", |builder| {
            for (buffer, offset) in &buffers {
                validate_offset(buffer, *offset)?;
            }

            for (slot, (buffer, _)) in (first_slot..).zip(&buffers) {
                builder.tracker.set_vertex_buffer(slot, buffer)?;
            }

            Ok(())
        })?;

        for (buffer, _) in &buffers {
            self.keep_buffer(buffer);
        }

        self.commands.push(Command::SetVertexBuffers {
            first_slot,
            buffers,
        });

        Ok(self)
    }

    /// Records that `buffer` is put in `usage`.
    pub fn transition_buffer_usage(
        &mut self,
        buffer: Arc<Buffer>,
        usage: BufferUsage,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("transition_buffer_usage", |builder| {
            if !usage.is_single() {
                return Err(CommandBufferBuilderError::UsageNotSingle);
            }

            Ok(builder.tracker.transition_buffer_usage(&buffer, usage)?)
        })?;
        self.keep_buffer(&buffer);
        self.commands.push(Command::TransitionBufferUsage { buffer, usage });

        Ok(self)
    }

    /// Records that `texture` is put in `usage`.
    pub fn transition_texture_usage(
        &mut self,
        texture: Arc<Texture>,
        usage: TextureUsage,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("transition_texture_usage", |builder| {
            if !usage.is_single() {
                return Err(CommandBufferBuilderError::UsageNotSingle);
            }

            Ok(builder.tracker.transition_texture_usage(&texture, usage)?)
        })?;
        self.keep_texture(&texture);
        self.commands.push(Command::TransitionTextureUsage { texture, usage });

        Ok(self)
    }

    /// Copies `size` bytes from one buffer to another.
    ///
    /// `src_buffer` must be guaranteed to be in [`BufferUsage::TRANSFER_SRC`] and `dst_buffer`
    /// in [`BufferUsage::TRANSFER_DST`].
    pub fn copy_buffer_to_buffer(
        &mut self,
        src_buffer: Arc<Buffer>,
        src_offset: DeviceSize,
        dst_buffer: Arc<Buffer>,
        dst_offset: DeviceSize,
        size: DeviceSize,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("copy_buffer_to_buffer", |builder| {
            builder.tracker.validate_copy()?;
            builder
                .tracker
                .validate_buffer_usage(&src_buffer, BufferUsage::TRANSFER_SRC)?;
            builder
                .tracker
                .validate_buffer_usage(&dst_buffer, BufferUsage::TRANSFER_DST)?;

            validate_buffer_range(&src_buffer, src_offset, size)
                .map_err(|err| err.source_range())?;
            validate_buffer_range(&dst_buffer, dst_offset, size)?;

            Ok(())
        })?;
        self.keep_buffer(&src_buffer);
        self.keep_buffer(&dst_buffer);
        self.commands.push(Command::CopyBufferToBuffer {
            src_buffer,
            src_offset,
            dst_buffer,
            dst_offset,
            size,
        });

        Ok(self)
    }

    /// Copies texels from a buffer to a region of a texture.
    ///
    /// `buffer` must be guaranteed to be in [`BufferUsage::TRANSFER_SRC`] and `texture` in
    /// [`TextureUsage::TRANSFER_DST`].
    pub fn copy_buffer_to_texture(
        &mut self,
        buffer: Arc<Buffer>,
        texture: Arc<Texture>,
        region: BufferTextureCopy,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("copy_buffer_to_texture", |builder| {
            builder.tracker.validate_copy()?;
            builder
                .tracker
                .validate_buffer_usage(&buffer, BufferUsage::TRANSFER_SRC)?;
            builder
                .tracker
                .validate_texture_usage(&texture, TextureUsage::TRANSFER_DST)?;

            validate_buffer_texture_copy(&buffer, &texture, &region)
                .map_err(|err| err.source_range())
        })?;
        self.keep_buffer(&buffer);
        self.keep_texture(&texture);
        self.commands.push(Command::CopyBufferToTexture {
            buffer,
            texture,
            region,
        });

        Ok(self)
    }

    /// Copies texels from a region of a texture to a buffer.
    ///
    /// `texture` must be guaranteed to be in [`TextureUsage::TRANSFER_SRC`] and `buffer` in
    /// [`BufferUsage::TRANSFER_DST`].
    pub fn copy_texture_to_buffer(
        &mut self,
        texture: Arc<Texture>,
        buffer: Arc<Buffer>,
        region: BufferTextureCopy,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("copy_texture_to_buffer", |builder| {
            builder.tracker.validate_copy()?;
            builder
                .tracker
                .validate_texture_usage(&texture, TextureUsage::TRANSFER_SRC)?;
            builder
                .tracker
                .validate_buffer_usage(&buffer, BufferUsage::TRANSFER_DST)?;

            validate_buffer_texture_copy(&buffer, &texture, &region)
        })?;
        self.keep_buffer(&buffer);
        self.keep_texture(&texture);
        self.commands.push(Command::CopyTextureToBuffer {
            texture,
            buffer,
            region,
        });

        Ok(self)
    }

    /// Dispatches compute work groups.
    pub fn dispatch(
        &mut self,
        group_counts: [u32; 3],
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("dispatch", |builder| Ok(builder.tracker.validate_dispatch()?))?;
        self.commands.push(Command::Dispatch { group_counts });

        Ok(self)
    }

    /// Draws non-indexed vertices.
    pub fn draw_arrays(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("draw_arrays", |builder| {
            Ok(builder.tracker.validate_draw_arrays()?)
        })?;
        self.commands.push(Command::DrawArrays {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });

        Ok(self)
    }

    /// Draws indexed vertices, using the bound index buffer.
    pub fn draw_elements(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        first_instance: u32,
    ) -> Result<&mut Self, CommandBufferBuilderError> {
        self.validate("draw_elements", |builder| {
            Ok(builder.tracker.validate_draw_elements()?)
        })?;
        self.commands.push(Command::DrawElements {
            index_count,
            instance_count,
            first_index,
            first_instance,
        });

        Ok(self)
    }

    /// Ends the recording session.
    ///
    /// Returns the error that poisoned the builder if there was one, or an error if a render pass
    /// is still active.
    pub fn build(self) -> Result<CommandBuffer, CommandBufferBuilderError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        if let Err(err) = self.tracker.validate_end() {
            warn!("command buffer {:?}: rejected `build`: {}", self.label, err);
            return Err(err.into());
        }

        let buffers: Vec<_> = self
            .tracker
            .touched_buffers()
            .iter()
            .filter_map(|id| self.buffers.get(id).cloned())
            .collect();
        let textures: Vec<_> = self
            .tracker
            .touched_textures()
            .iter()
            .filter_map(|id| self.textures.get(id).cloned())
            .collect();

        debug!(
            "finished recording command buffer {:?}: {} commands, {} buffers, {} textures",
            self.label,
            self.commands.len(),
            buffers.len(),
            textures.len(),
        );

        Ok(CommandBuffer {
            label: self.label,
            commands: self.commands,
            buffers,
            textures,
        })
    }
}

fn validate_offset(buffer: &Buffer, offset: DeviceSize) -> Result<(), CommandBufferBuilderError> {
    if offset >= buffer.size() {
        return Err(CommandBufferBuilderError::OffsetOutOfRange {
            offset,
            buffer_size: buffer.size(),
        });
    }

    Ok(())
}

fn validate_buffer_range(
    buffer: &Buffer,
    offset: DeviceSize,
    size: DeviceSize,
) -> Result<(), CommandBufferBuilderError> {
    if offset
        .checked_add(size)
        .map_or(true, |end| end > buffer.size())
    {
        return Err(CommandBufferBuilderError::DestinationRangeOutOfBounds {
            offset,
            size,
            buffer_size: buffer.size(),
        });
    }

    Ok(())
}

/// Checks the texture region of a copy, and that the buffer side fits in `buffer`. Buffer range
/// errors are reported as [`CommandBufferBuilderError::DestinationRangeOutOfBounds`].
fn validate_buffer_texture_copy(
    buffer: &Buffer,
    texture: &Texture,
    region: &BufferTextureCopy,
) -> Result<(), CommandBufferBuilderError> {
    let &BufferTextureCopy {
        buffer_offset,
        buffer_row_length,
        mip_level,
        texture_offset,
        texture_extent,
        _ne: _,
    } = region;

    let mip_level_extent = texture.mip_level_extent(mip_level).ok_or(
        CommandBufferBuilderError::MipLevelOutOfRange {
            mip_level,
            mip_levels: texture.mip_levels(),
        },
    )?;

    for i in 0..3 {
        if texture_offset[i]
            .checked_add(texture_extent[i])
            .map_or(true, |end| end > mip_level_extent[i])
        {
            return Err(CommandBufferBuilderError::TextureRegionOutOfBounds {
                offset: texture_offset,
                extent: texture_extent,
                mip_level_extent,
            });
        }
    }

    let [width, height, depth] = texture_extent;
    let row_length = if buffer_row_length == 0 {
        width
    } else {
        buffer_row_length
    };

    if row_length < width {
        return Err(CommandBufferBuilderError::RowLengthTooSmall { row_length, width });
    }

    if texture_extent.contains(&0) {
        return Ok(());
    }

    let size = (height as DeviceSize)
        .checked_mul(depth as DeviceSize)
        .and_then(|rows| (row_length as DeviceSize).checked_mul(rows - 1))
        .and_then(|texels| texels.checked_add(width as DeviceSize))
        .and_then(|texels| texels.checked_mul(texture.format().block_size()))
        .ok_or(CommandBufferBuilderError::DestinationRangeOutOfBounds {
            offset: buffer_offset,
            size: DeviceSize::MAX,
            buffer_size: buffer.size(),
        })?;

    validate_buffer_range(buffer, buffer_offset, size)
}

/// Parameters to create a new `CommandBufferBuilder`.
#[derive(Clone, Debug)]
pub struct CommandBufferBuilderCreateInfo {
    /// A name for the recording session, used in log messages.
    ///
    /// The default value is `None`.
    pub label: Option<String>,

    pub _ne: NonExhaustive,
}

impl Default for CommandBufferBuilderCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            label: None,
            _ne: NonExhaustive(()),
        }
    }
}

impl CommandBufferBuilderCreateInfo {
    /// Returns a `CommandBufferBuilderCreateInfo` with the specified `label`.
    #[inline]
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }
}

/// The region of a copy between a buffer and a texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferTextureCopy {
    /// The offset in bytes in the buffer at which the texels start.
    ///
    /// The default value is `0`.
    pub buffer_offset: DeviceSize,

    /// The number of texels between the start of two consecutive rows in the buffer. If `0`, the
    /// rows are tightly packed.
    ///
    /// The default value is `0`.
    pub buffer_row_length: u32,

    /// The mip level of the texture to copy to or from.
    ///
    /// The default value is `0`.
    pub mip_level: u32,

    /// The offset in texels of the region in the texture.
    ///
    /// The default value is `[0; 3]`.
    pub texture_offset: [u32; 3],

    /// The extent in texels of the region in the texture.
    ///
    /// The default value is `[0; 3]`, which must be overridden.
    pub texture_extent: [u32; 3],

    pub _ne: NonExhaustive,
}

impl Default for BufferTextureCopy {
    #[inline]
    fn default() -> Self {
        Self {
            buffer_offset: 0,
            buffer_row_length: 0,
            mip_level: 0,
            texture_offset: [0; 3],
            texture_extent: [0; 3],
            _ne: NonExhaustive(()),
        }
    }
}

/// A command recorded into a command buffer. Holds the objects it uses.
#[derive(Clone, Debug)]
pub enum Command {
    BeginRenderPass {
        render_pass: Arc<RenderPass>,
        framebuffer: Arc<Framebuffer>,
    },
    BeginSubpass,
    EndSubpass,
    NextSubpass,
    EndRenderPass,
    SetPipeline(Arc<Pipeline>),
    SetBindGroup {
        slot: u32,
        bind_group: Arc<BindGroup>,
    },
    SetIndexBuffer {
        buffer: Arc<Buffer>,
        offset: DeviceSize,
    },
    SetVertexBuffers {
        first_slot: u32,
        buffers: SmallVec<[(Arc<Buffer>, DeviceSize); 4]>,
    },
    TransitionBufferUsage {
        buffer: Arc<Buffer>,
        usage: BufferUsage,
    },
    TransitionTextureUsage {
        texture: Arc<Texture>,
        usage: TextureUsage,
    },
    CopyBufferToBuffer {
        src_buffer: Arc<Buffer>,
        src_offset: DeviceSize,
        dst_buffer: Arc<Buffer>,
        dst_offset: DeviceSize,
        size: DeviceSize,
    },
    CopyBufferToTexture {
        buffer: Arc<Buffer>,
        texture: Arc<Texture>,
        region: BufferTextureCopy,
    },
    CopyTextureToBuffer {
        texture: Arc<Texture>,
        buffer: Arc<Buffer>,
        region: BufferTextureCopy,
    },
    Dispatch {
        group_counts: [u32; 3],
    },
    DrawArrays {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawElements {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        first_instance: u32,
    },
}

/// A fully validated list of commands.
///
/// Holds the buffers and textures whose usage was transitioned during recording, so that they
/// live at least as long as the command buffer.
#[derive(Debug)]
pub struct CommandBuffer {
    label: Option<String>,
    commands: Vec<Command>,
    buffers: Vec<Arc<Buffer>>,
    textures: Vec<Arc<Texture>>,
}

impl CommandBuffer {
    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the buffers that were transitioned during recording.
    #[inline]
    pub fn buffers(&self) -> &[Arc<Buffer>] {
        &self.buffers
    }

    /// Returns the textures that were transitioned during recording, explicitly or as
    /// attachments.
    #[inline]
    pub fn textures(&self) -> &[Arc<Texture>] {
        &self.textures
    }
}

/// Error that can happen when recording a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandBufferBuilderError {
    /// The command failed validation by the state tracker.
    StateTracker(StateTrackerError),

    /// A previous command failed validation, so the recording session can't continue.
    Poisoned,

    /// The usage given to a transition did not consist of exactly one flag.
    UsageNotSingle,

    /// The offset of a vertex or index buffer is not less than the buffer size.
    OffsetOutOfRange {
        offset: DeviceSize,
        buffer_size: DeviceSize,
    },

    /// The source range of a copy goes past the end of the buffer. A `size` of
    /// `DeviceSize::MAX` means that the size of the range doesn't fit in a `DeviceSize`.
    SourceRangeOutOfBounds {
        offset: DeviceSize,
        size: DeviceSize,
        buffer_size: DeviceSize,
    },

    /// The destination range of a copy goes past the end of the buffer. A `size` of
    /// `DeviceSize::MAX` means that the size of the range doesn't fit in a `DeviceSize`.
    DestinationRangeOutOfBounds {
        offset: DeviceSize,
        size: DeviceSize,
        buffer_size: DeviceSize,
    },

    /// The mip level of a copy does not exist in the texture.
    MipLevelOutOfRange { mip_level: u32, mip_levels: u32 },

    /// The texture region of a copy goes past the edge of the mip level.
    TextureRegionOutOfBounds {
        offset: [u32; 3],
        extent: [u32; 3],
        mip_level_extent: [u32; 3],
    },

    /// The buffer row length of a copy is smaller than the width of the region.
    RowLengthTooSmall { row_length: u32, width: u32 },
}

impl CommandBufferBuilderError {
    /// Turns a buffer range error into the same error on the source side of a copy.
    fn source_range(self) -> Self {
        match self {
            Self::DestinationRangeOutOfBounds {
                offset,
                size,
                buffer_size,
            } => Self::SourceRangeOutOfBounds {
                offset,
                size,
                buffer_size,
            },
            err => err,
        }
    }
}

impl Error for CommandBufferBuilderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StateTracker(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for CommandBufferBuilderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::StateTracker(err) => Display::fmt(err, f),
            Self::Poisoned => write!(
                f,
                "a previous command failed validation, so the command buffer can't be recorded",
            ),
            Self::UsageNotSingle => {
                write!(f, "the usage does not consist of exactly one flag")
            }
            Self::OffsetOutOfRange {
                offset,
                buffer_size,
            } => write!(
                f,
                "the offset {} is not less than the buffer size ({})",
                offset, buffer_size,
            ),
            Self::SourceRangeOutOfBounds {
                offset,
                size,
                buffer_size,
            } => write!(
                f,
                "the source range ({} bytes at offset {}) exceeds the buffer size ({})",
                size, offset, buffer_size,
            ),
            Self::DestinationRangeOutOfBounds {
                offset,
                size,
                buffer_size,
            } => write!(
                f,
                "the destination range ({} bytes at offset {}) exceeds the buffer size ({})",
                size, offset, buffer_size,
            ),
            Self::MipLevelOutOfRange {
                mip_level,
                mip_levels,
            } => write!(
                f,
                "mip level {} does not exist in a texture with {} mip levels",
                mip_level, mip_levels,
            ),
            Self::TextureRegionOutOfBounds {
                offset,
                extent,
                mip_level_extent,
            } => write!(
                f,
                "the region with offset {:?} and extent {:?} exceeds the mip level extent {:?}",
                offset, extent, mip_level_extent,
            ),
            Self::RowLengthTooSmall { row_length, width } => write!(
                f,
                "the buffer row length {} is smaller than the region width {}",
                row_length, width,
            ),
        }
    }
}

impl From<StateTrackerError> for CommandBufferBuilderError {
    #[inline]
    fn from(err: StateTrackerError) -> Self {
        Self::StateTracker(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{BufferTextureCopy, CommandBufferBuilder, CommandBufferBuilderError};
    use crate::{
        buffer::BufferUsage,
        command_buffer::{CommandBufferBuilderCreateInfo, StateTrackerError},
        format::Format,
        tests::{
            buffer, compute_pipeline, framebuffer_for, render_pipeline, single_color_render_pass,
            uniform_bind_group, uniform_layout,
        },
        texture::{Texture, TextureCreateInfo, TextureUsage},
        DeviceSize,
    };
    use std::error::Error;

    #[test]
    fn dispatch_session() {
        let layout = uniform_layout();
        let pipeline = compute_pipeline(&[Some(layout.clone())]);
        let uniform = buffer(BufferUsage::UNIFORM);
        let group = uniform_bind_group(&layout, &uniform);
        let mut builder =
            CommandBufferBuilder::new(CommandBufferBuilderCreateInfo::label("compute"));

        builder
            .transition_buffer_usage(uniform.clone(), BufferUsage::UNIFORM)
            .unwrap()
            .set_pipeline(pipeline)
            .unwrap()
            .set_bind_group(0, group)
            .unwrap()
            .dispatch([8, 8, 1])
            .unwrap();

        let command_buffer = builder.build().unwrap();
        assert_eq!(command_buffer.label(), Some("compute"));
        assert_eq!(command_buffer.commands().len(), 4);
        assert_eq!(command_buffer.buffers().len(), 1);
        assert_eq!(command_buffer.buffers()[0].id(), uniform.id());
    }

    #[test]
    fn first_error_poisons() {
        let mut builder = CommandBufferBuilder::new(Default::default());

        assert_eq!(
            builder.dispatch([1, 1, 1]).unwrap_err(),
            CommandBufferBuilderError::StateTracker(StateTrackerError::NoComputePipeline),
        );
        assert!(builder.is_poisoned());

        // Valid on its own, but the session has already failed.
        let pipeline = compute_pipeline(&[]);
        assert_eq!(
            builder.set_pipeline(pipeline).unwrap_err(),
            CommandBufferBuilderError::Poisoned,
        );
        assert!(!builder.state().has_pipeline());
        assert!(builder.commands().is_empty());

        assert_eq!(
            builder.build().unwrap_err(),
            CommandBufferBuilderError::StateTracker(StateTrackerError::NoComputePipeline),
        );
    }

    #[test]
    fn error_message_names_the_reason() {
        let mut builder = CommandBufferBuilder::new(Default::default());

        let err = builder.dispatch([1, 1, 1]).unwrap_err();
        assert!(err.to_string().contains("no active compute pipeline"));
        assert_eq!(
            err.to_string(),
            StateTrackerError::NoComputePipeline.to_string(),
        );
    }

    #[test]
    fn build_with_active_render_pass() {
        let render_pass = single_color_render_pass();
        let framebuffer = framebuffer_for(&render_pass);
        let mut builder = CommandBufferBuilder::new(Default::default());

        builder.begin_render_pass(render_pass, framebuffer).unwrap();

        let err = builder.build().unwrap_err();
        assert_eq!(
            err,
            CommandBufferBuilderError::StateTracker(StateTrackerError::RenderPassStillActive),
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn render_session_keeps_attachments() {
        let render_pass = single_color_render_pass();
        let framebuffer = framebuffer_for(&render_pass);
        let pipeline = render_pipeline(&render_pass, &[], &[0]);
        let vertices = buffer(BufferUsage::VERTEX | BufferUsage::INDEX);
        let mut builder = CommandBufferBuilder::new(Default::default());

        builder
            .transition_buffer_usage(vertices.clone(), BufferUsage::VERTEX)
            .unwrap()
            .begin_render_pass(render_pass, framebuffer)
            .unwrap()
            .set_pipeline(pipeline)
            .unwrap()
            .set_vertex_buffers(0, [(vertices.clone(), 0)])
            .unwrap()
            .draw_arrays(3, 1, 0, 0)
            .unwrap()
            .end_render_pass()
            .unwrap();

        let command_buffer = builder.build().unwrap();
        assert_eq!(command_buffer.buffers().len(), 1);
        assert_eq!(command_buffer.textures().len(), 1);
    }

    #[test]
    fn usage_not_single() {
        let mut builder = CommandBufferBuilder::new(Default::default());

        assert_eq!(
            builder
                .transition_buffer_usage(
                    buffer(BufferUsage::all()),
                    BufferUsage::VERTEX | BufferUsage::INDEX,
                )
                .unwrap_err(),
            CommandBufferBuilderError::UsageNotSingle,
        );
    }

    #[test]
    fn buffer_copy() {
        let src = buffer(BufferUsage::TRANSFER_SRC);
        let dst = buffer(BufferUsage::TRANSFER_DST);
        let mut builder = CommandBufferBuilder::new(Default::default());

        assert_eq!(
            builder
                .copy_buffer_to_buffer(src.clone(), 0, dst.clone(), 0, 16)
                .unwrap_err(),
            CommandBufferBuilderError::StateTracker(StateTrackerError::BufferUsageNotGuaranteed {
                usage: BufferUsage::TRANSFER_SRC,
            }),
        );

        let mut builder = CommandBufferBuilder::new(Default::default());
        builder
            .transition_buffer_usage(src.clone(), BufferUsage::TRANSFER_SRC)
            .unwrap()
            .transition_buffer_usage(dst.clone(), BufferUsage::TRANSFER_DST)
            .unwrap()
            .copy_buffer_to_buffer(src.clone(), 0, dst.clone(), 128, 128)
            .unwrap();

        assert_eq!(
            builder
                .copy_buffer_to_buffer(src, 200, dst, 0, 100)
                .unwrap_err(),
            CommandBufferBuilderError::SourceRangeOutOfBounds {
                offset: 200,
                size: 100,
                buffer_size: 256,
            },
        );
    }

    #[test]
    fn copy_in_render_pass() {
        let render_pass = single_color_render_pass();
        let framebuffer = framebuffer_for(&render_pass);
        let src = buffer(BufferUsage::TRANSFER_SRC);
        let dst = buffer(BufferUsage::TRANSFER_DST);
        let mut builder = CommandBufferBuilder::new(Default::default());

        builder
            .transition_buffer_usage(src.clone(), BufferUsage::TRANSFER_SRC)
            .unwrap()
            .transition_buffer_usage(dst.clone(), BufferUsage::TRANSFER_DST)
            .unwrap()
            .begin_render_pass(render_pass, framebuffer)
            .unwrap();

        assert_eq!(
            builder
                .copy_buffer_to_buffer(src, 0, dst, 0, 4)
                .unwrap_err(),
            CommandBufferBuilderError::StateTracker(StateTrackerError::CopyInRenderPass),
        );
    }

    #[test]
    fn texture_copies() {
        let staging = buffer(BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST);
        let texture = Texture::new(TextureCreateInfo {
            format: Format::R8G8B8A8_UNORM,
            extent: [8, 8, 1],
            mip_levels: 2,
            allowed_usage: TextureUsage::TRANSFER_DST | TextureUsage::TRANSFER_SRC,
            ..Default::default()
        })
        .unwrap();
        let mut builder = CommandBufferBuilder::new(Default::default());

        builder
            .transition_buffer_usage(staging.clone(), BufferUsage::TRANSFER_SRC)
            .unwrap()
            .transition_texture_usage(texture.clone(), TextureUsage::TRANSFER_DST)
            .unwrap()
            .copy_buffer_to_texture(
                staging.clone(),
                texture.clone(),
                BufferTextureCopy {
                    texture_extent: [8, 8, 1],
                    ..Default::default()
                },
            )
            .unwrap()
            .transition_texture_usage(texture.clone(), TextureUsage::TRANSFER_SRC)
            .unwrap()
            .transition_buffer_usage(staging.clone(), BufferUsage::TRANSFER_DST)
            .unwrap()
            .copy_texture_to_buffer(
                texture.clone(),
                staging.clone(),
                BufferTextureCopy {
                    mip_level: 1,
                    texture_extent: [4, 4, 1],
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(
            builder
                .copy_texture_to_buffer(
                    texture.clone(),
                    staging.clone(),
                    BufferTextureCopy {
                        mip_level: 1,
                        texture_offset: [2, 0, 0],
                        texture_extent: [4, 4, 1],
                        ..Default::default()
                    },
                )
                .unwrap_err(),
            CommandBufferBuilderError::TextureRegionOutOfBounds {
                offset: [2, 0, 0],
                extent: [4, 4, 1],
                mip_level_extent: [4, 4, 1],
            },
        );

        let mut builder = CommandBufferBuilder::new(Default::default());
        builder
            .transition_texture_usage(texture.clone(), TextureUsage::TRANSFER_SRC)
            .unwrap()
            .transition_buffer_usage(staging.clone(), BufferUsage::TRANSFER_DST)
            .unwrap();

        // 16 rows of 16 texels at 4 bytes each don't fit in 256 bytes.
        assert_eq!(
            builder
                .copy_texture_to_buffer(
                    texture,
                    staging,
                    BufferTextureCopy {
                        buffer_row_length: 16,
                        texture_extent: [8, 8, 1],
                        ..Default::default()
                    },
                )
                .unwrap_err(),
            CommandBufferBuilderError::DestinationRangeOutOfBounds {
                offset: 0,
                size: (16 * 7 + 8) * 4,
                buffer_size: 256,
            },
        );
    }

    #[test]
    fn copy_size_overflow() {
        let staging = buffer(BufferUsage::TRANSFER_SRC);
        let texture = Texture::new(TextureCreateInfo {
            format: Format::R8G8B8A8_UNORM,
            extent: [1, u32::MAX, u32::MAX],
            allowed_usage: TextureUsage::TRANSFER_DST,
            ..Default::default()
        })
        .unwrap();
        let mut builder = CommandBufferBuilder::new(Default::default());

        builder
            .transition_buffer_usage(staging.clone(), BufferUsage::TRANSFER_SRC)
            .unwrap()
            .transition_texture_usage(texture.clone(), TextureUsage::TRANSFER_DST)
            .unwrap();

        assert_eq!(
            builder
                .copy_buffer_to_texture(
                    staging,
                    texture,
                    BufferTextureCopy {
                        buffer_row_length: u32::MAX,
                        texture_extent: [1, u32::MAX, u32::MAX],
                        ..Default::default()
                    },
                )
                .unwrap_err(),
            CommandBufferBuilderError::SourceRangeOutOfBounds {
                offset: 0,
                size: DeviceSize::MAX,
                buffer_size: 256,
            },
        );
    }
}
