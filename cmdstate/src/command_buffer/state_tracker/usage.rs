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
    buffer::{Buffer, BufferUsage},
    texture::{Texture, TextureUsage},
};

impl StateTracker {
    /// Returns whether `buffer` is guaranteed to be in `usage`, either because it was most
    /// recently transitioned to it or because its usage is frozen to it.
    #[inline]
    pub fn buffer_has_guaranteed_usage(&self, buffer: &Buffer, usage: BufferUsage) -> bool {
        debug_assert!(usage.is_single());

        buffer.has_frozen_usage(usage) || self.buffer_usages.get(&buffer.id()) == Some(&usage)
    }

    /// Returns whether `texture` is guaranteed to be in `usage`, either because it was most
    /// recently transitioned to it or because its usage is frozen to it.
    #[inline]
    pub fn texture_has_guaranteed_usage(&self, texture: &Texture, usage: TextureUsage) -> bool {
        debug_assert!(usage.is_single());

        texture.has_frozen_usage(usage) || self.texture_usages.get(&texture.id()) == Some(&usage)
    }

    /// Records that `buffer` is put in `usage`. `usage` must be a single flag.
    pub fn transition_buffer_usage(
        &mut self,
        buffer: &Buffer,
        usage: BufferUsage,
    ) -> Result<(), StateTrackerError> {
        debug_assert!(usage.is_single());

        if let Some(frozen_usage) = buffer.frozen_usage() {
            if frozen_usage != usage {
                return Err(StateTrackerError::BufferUsageFrozen { frozen_usage });
            }

            self.touched_buffers.insert(buffer.id());

            return Ok(());
        }

        if !buffer.is_usage_allowed(usage) {
            return Err(StateTrackerError::BufferUsageNotAllowed { usage });
        }

        if !buffer.is_transition_possible(usage) {
            return Err(StateTrackerError::BufferTransitionNotPossible { usage });
        }

        self.buffer_usages.insert(buffer.id(), usage);
        self.touched_buffers.insert(buffer.id());

        Ok(())
    }

    /// Records that `texture` is put in `usage`. `usage` must be a single flag.
    ///
    /// Attachment usages are only entered when a subpass begins. Explicitly transitioning a
    /// texture to an attachment usage, or away from one while it is attached, is an error.
    pub fn transition_texture_usage(
        &mut self,
        texture: &Texture,
        usage: TextureUsage,
    ) -> Result<(), StateTrackerError> {
        debug_assert!(usage.is_single());

        if let Some(frozen_usage) = texture.frozen_usage() {
            if frozen_usage != usage {
                return Err(StateTrackerError::TextureUsageFrozen { frozen_usage });
            }

            self.touched_textures.insert(texture.id());

            return Ok(());
        }

        if !texture.is_usage_allowed(usage) {
            return Err(StateTrackerError::TextureUsageNotAllowed { usage });
        }

        let attachments = TextureUsage::attachments();
        let is_attached = self
            .texture_usages
            .get(&texture.id())
            .is_some_and(|current| current.intersects(attachments));

        if usage.intersects(attachments) || is_attached {
            return Err(StateTrackerError::TextureAttachmentUsageTransition { usage });
        }

        if !texture.is_transition_possible(usage) {
            return Err(StateTrackerError::TextureTransitionNotPossible { usage });
        }

        self.texture_usages.insert(texture.id(), usage);
        self.touched_textures.insert(texture.id());

        Ok(())
    }

    /// Checks that a copy can be recorded. Copies can't happen inside a render pass.
    #[inline]
    pub fn validate_copy(&self) -> Result<(), StateTrackerError> {
        if self.render_pass.is_some() {
            return Err(StateTrackerError::CopyInRenderPass);
        }

        Ok(())
    }

    /// Checks that `buffer` is guaranteed to be in `usage`.
    #[inline]
    pub fn validate_buffer_usage(
        &self,
        buffer: &Buffer,
        usage: BufferUsage,
    ) -> Result<(), StateTrackerError> {
        if !self.buffer_has_guaranteed_usage(buffer, usage) {
            return Err(StateTrackerError::BufferUsageNotGuaranteed { usage });
        }

        Ok(())
    }

    /// Checks that `texture` is guaranteed to be in `usage`.
    #[inline]
    pub fn validate_texture_usage(
        &self,
        texture: &Texture,
        usage: TextureUsage,
    ) -> Result<(), StateTrackerError> {
        if !self.texture_has_guaranteed_usage(texture, usage) {
            return Err(StateTrackerError::TextureUsageNotGuaranteed { usage });
        }

        Ok(())
    }
}
