// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{RenderPassState, StateTracker, StateTrackerError};
use crate::{
    render_pass::{Framebuffer, FramebufferAttachment, RenderPass},
    texture::{Texture, TextureUsage},
};
use log::trace;
use smallvec::SmallVec;
use std::sync::Arc;

impl StateTracker {
    /// Begins a render pass, and its first subpass.
    ///
    /// Clears all validation aspects: pipelines bound before the render pass can't be used
    /// inside it.
    pub fn begin_render_pass(
        &mut self,
        render_pass: &Arc<RenderPass>,
        framebuffer: &Arc<Framebuffer>,
    ) -> Result<(), StateTrackerError> {
        if self.render_pass.is_some() {
            return Err(StateTrackerError::RenderPassAlreadyActive);
        }

        if !framebuffer.render_pass().is_compatible_with(render_pass) {
            return Err(StateTrackerError::FramebufferIncompatible);
        }

        self.render_pass = Some(RenderPassState {
            render_pass: render_pass.clone(),
            framebuffer: framebuffer.clone(),
            subpass: 0,
            subpass_active: false,
        });

        if let Err(err) = self.begin_subpass() {
            self.render_pass = None;
            return Err(err);
        }

        self.unset_pipeline();

        Ok(())
    }

    /// Begins the next subpass of the active render pass.
    ///
    /// Every texture attached to the subpass is put in its attachment usage, unless its usage is
    /// already frozen to it.
    pub fn begin_subpass(&mut self) -> Result<(), StateTrackerError> {
        let state = self
            .render_pass
            .as_mut()
            .ok_or(StateTrackerError::NoRenderPass)?;

        if state.subpass_active {
            return Err(StateTrackerError::SubpassAlreadyActive);
        }

        let subpass_count = state.render_pass.subpass_count();

        if state.subpass >= subpass_count {
            return Err(StateTrackerError::NoSubpassesRemaining { subpass_count });
        }

        let attachments = state.attached_textures();

        for (attachment, texture, usage) in &attachments {
            if !texture.has_frozen_usage(*usage) && !texture.is_transition_possible(*usage) {
                return Err(StateTrackerError::AttachmentTransitionNotPossible {
                    attachment: *attachment,
                    usage: *usage,
                });
            }
        }

        for (attachment, texture, usage) in attachments {
            if texture.has_frozen_usage(usage) {
                continue;
            }

            trace!("attachment {} enters {:?}", attachment, usage);
            self.texture_usages.insert(texture.id(), usage);
            self.touched_textures.insert(texture.id());
        }

        state.subpass_active = true;
        trace!("began subpass {} of {}", state.subpass, subpass_count);

        Ok(())
    }

    /// Ends the subpass being recorded.
    ///
    /// The usage of the textures attached to the subpass becomes unknown, and all validation
    /// aspects are cleared.
    pub fn end_subpass(&mut self) -> Result<(), StateTrackerError> {
        let state = self
            .render_pass
            .as_mut()
            .ok_or(StateTrackerError::NoRenderPass)?;

        if !state.subpass_active {
            return Err(StateTrackerError::NoActiveSubpass);
        }

        for (_, texture, _) in state.attached_textures() {
            if !texture.is_frozen() {
                self.texture_usages.remove(&texture.id());
            }
        }

        trace!("ended subpass {}", state.subpass);
        state.subpass += 1;
        state.subpass_active = false;

        self.unset_pipeline();

        Ok(())
    }

    /// Ends the current subpass and begins the next one.
    ///
    /// If the next subpass can't begin, the current one has still been ended.
    pub fn advance_subpass(&mut self) -> Result<(), StateTrackerError> {
        self.end_subpass()?;
        self.begin_subpass()
    }

    /// Ends the active render pass, ending its last subpass if it is still being recorded.
    ///
    /// Every subpass of the render pass must have been begun.
    pub fn end_render_pass(&mut self) -> Result<(), StateTrackerError> {
        let state = self
            .render_pass
            .as_ref()
            .ok_or(StateTrackerError::NoRenderPass)?;

        let subpass_count = state.render_pass.subpass_count();
        let recorded = state.subpass + u32::from(state.subpass_active);

        if recorded < subpass_count {
            return Err(StateTrackerError::SubpassesRemaining {
                subpass: recorded,
                subpass_count,
            });
        }

        if state.subpass_active {
            self.end_subpass()?;
        }

        self.render_pass = None;
        trace!("ended render pass");

        Ok(())
    }
}

impl RenderPassState {
    /// Returns the textures attached to the current subpass, with the attachment index and the
    /// usage they are attached with. External attachments are skipped.
    fn attached_textures(&self) -> SmallVec<[(u32, Arc<Texture>, TextureUsage); 4]> {
        let mut attached = SmallVec::new();

        let Some(subpass) = self.render_pass.subpasses().get(self.subpass as usize) else {
            return attached;
        };

        let color = subpass
            .color_attachments
            .iter()
            .map(|&attachment| (attachment, TextureUsage::COLOR_ATTACHMENT));
        let depth_stencil = subpass
            .depth_stencil_attachment
            .map(|attachment| (attachment, TextureUsage::DEPTH_STENCIL_ATTACHMENT));

        for (attachment, usage) in color.chain(depth_stencil) {
            if let Some(texture) = self
                .framebuffer
                .attachment(attachment)
                .and_then(FramebufferAttachment::texture)
            {
                attached.push((attachment, texture.clone(), usage));
            }
        }

        attached
    }
}
