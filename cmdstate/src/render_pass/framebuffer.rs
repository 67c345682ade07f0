// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::RenderPass;
use crate::{
    format::Format,
    macros::impl_id_counter,
    texture::{Texture, TextureUsage, TextureView},
    NonExhaustive,
};
use smallvec::SmallVec;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

/// The texture views bound to the attachments of a render pass.
///
/// A framebuffer is created for one render pass, but can be used to begin any render pass that
/// is [compatible](RenderPass::is_compatible_with) with it.
#[derive(Debug)]
pub struct Framebuffer {
    id: NonZero<u64>,
    render_pass: Arc<RenderPass>,
    attachments: SmallVec<[FramebufferAttachment; 4]>,
    extent: [u32; 2],
}

impl Framebuffer {
    /// Creates a new `Framebuffer`.
    pub fn new(
        render_pass: Arc<RenderPass>,
        create_info: FramebufferCreateInfo,
    ) -> Result<Arc<Framebuffer>, FramebufferCreationError> {
        let FramebufferCreateInfo {
            attachments,
            mut extent,
            _ne: _,
        } = create_info;

        if attachments.len() != render_pass.attachments().len() {
            return Err(FramebufferCreationError::AttachmentCountMismatch {
                provided: attachments.len() as u32,
                required: render_pass.attachments().len() as u32,
            });
        }

        let auto_extent = extent == [0, 0];

        if auto_extent {
            extent = [u32::MAX, u32::MAX];
        }

        for (index, (attachment, description)) in attachments
            .iter()
            .zip(render_pass.attachments())
            .enumerate()
        {
            let index = index as u32;

            let view = match attachment {
                FramebufferAttachment::View(view) => view,
                FramebufferAttachment::External => continue,
            };

            if view.format() != description.format {
                return Err(FramebufferCreationError::AttachmentFormatMismatch {
                    attachment: index,
                    required: description.format,
                    provided: view.format(),
                });
            }

            let usage = if description.format.is_depth_stencil() {
                TextureUsage::DEPTH_STENCIL_ATTACHMENT
            } else {
                TextureUsage::COLOR_ATTACHMENT
            };

            let is_used = render_pass
                .subpasses()
                .iter()
                .any(|subpass| subpass.attachments().any(|a| a == index));

            if is_used && !view.texture().is_usage_allowed(usage) {
                return Err(FramebufferCreationError::AttachmentUsageNotAllowed {
                    attachment: index,
                    usage,
                });
            }

            let [width, height, _] = view.texture().extent();

            if auto_extent {
                extent = [extent[0].min(width), extent[1].min(height)];
            } else if width < extent[0] || height < extent[1] {
                return Err(FramebufferCreationError::AttachmentTooSmall {
                    attachment: index,
                    extent,
                    attachment_extent: [width, height],
                });
            }
        }

        if auto_extent && extent == [u32::MAX, u32::MAX] {
            return Err(FramebufferCreationError::AutoExtentWithoutViews);
        }

        Ok(Arc::new(Framebuffer {
            id: Self::next_id(),
            render_pass,
            attachments: attachments.into_iter().collect(),
            extent,
        }))
    }

    /// Returns the render pass the framebuffer was created for.
    #[inline]
    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    #[inline]
    pub fn attachments(&self) -> &[FramebufferAttachment] {
        &self.attachments
    }

    /// Returns the attachment at `index`, if it exists.
    #[inline]
    pub fn attachment(&self, index: u32) -> Option<&FramebufferAttachment> {
        self.attachments.get(index as usize)
    }

    /// Returns the width and height of the rendered area.
    #[inline]
    pub fn extent(&self) -> [u32; 2] {
        self.extent
    }
}

impl_id_counter!(Framebuffer);

/// Parameters to create a new `Framebuffer`.
#[derive(Clone, Debug)]
pub struct FramebufferCreateInfo {
    /// One attachment for each attachment of the render pass.
    ///
    /// The default value is empty.
    pub attachments: Vec<FramebufferAttachment>,

    /// The width and height of the framebuffer. Every attached texture must be at least this
    /// large.
    ///
    /// If `[0, 0]`, the extent is the smallest extent of the attached textures, and at least one
    /// attachment must be a [`FramebufferAttachment::View`].
    ///
    /// The default value is `[0, 0]`.
    pub extent: [u32; 2],

    pub _ne: NonExhaustive,
}

impl Default for FramebufferCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            attachments: Vec::new(),
            extent: [0, 0],
            _ne: NonExhaustive(()),
        }
    }
}

/// What is attached at one attachment index of a framebuffer.
#[derive(Clone, Debug)]
pub enum FramebufferAttachment {
    /// A texture view owned by the application.
    View(Arc<TextureView>),

    /// A surface whose texture is managed outside of this crate, such as a swapchain image.
    ///
    /// No usage is tracked for external attachments.
    External,
}

impl FramebufferAttachment {
    /// Returns the attached texture, or `None` for an external surface.
    #[inline]
    pub fn texture(&self) -> Option<&Arc<Texture>> {
        match self {
            Self::View(view) => Some(view.texture()),
            Self::External => None,
        }
    }
}

impl From<Arc<TextureView>> for FramebufferAttachment {
    #[inline]
    fn from(view: Arc<TextureView>) -> Self {
        Self::View(view)
    }
}

/// Error that can happen when creating a framebuffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FramebufferCreationError {
    /// The number of attachments doesn't match the render pass.
    AttachmentCountMismatch { provided: u32, required: u32 },

    /// The format of an attached view doesn't match the render pass.
    AttachmentFormatMismatch {
        attachment: u32,
        required: Format,
        provided: Format,
    },

    /// The texture of an attached view does not allow the attachment usage that the render pass
    /// needs.
    AttachmentUsageNotAllowed { attachment: u32, usage: TextureUsage },

    /// An attached texture is smaller than the framebuffer.
    AttachmentTooSmall {
        attachment: u32,
        extent: [u32; 2],
        attachment_extent: [u32; 2],
    },

    /// The extent was left to be computed, but every attachment is external.
    AutoExtentWithoutViews,
}

impl Error for FramebufferCreationError {}

impl Display for FramebufferCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::AttachmentCountMismatch { provided, required } => write!(
                f,
                "{} attachments were provided, but the render pass has {}",
                provided, required,
            ),
            Self::AttachmentFormatMismatch {
                attachment,
                required,
                provided,
            } => write!(
                f,
                "attachment {} has format {:?}, but the render pass requires {:?}",
                attachment, provided, required,
            ),
            Self::AttachmentUsageNotAllowed { attachment, usage } => write!(
                f,
                "the texture of attachment {} does not allow the usage {:?}",
                attachment, usage,
            ),
            Self::AttachmentTooSmall {
                attachment,
                extent,
                attachment_extent,
            } => write!(
                f,
                "attachment {} has extent {:?}, which is smaller than the framebuffer extent {:?}",
                attachment, attachment_extent, extent,
            ),
            Self::AutoExtentWithoutViews => write!(
                f,
                "the framebuffer extent can't be computed because no attachment is a texture view",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Framebuffer, FramebufferAttachment, FramebufferCreateInfo, FramebufferCreationError,
    };
    use crate::{
        format::Format,
        tests::{color_view, single_color_render_pass},
        texture::{Texture, TextureCreateInfo, TextureUsage, TextureView},
    };

    #[test]
    fn auto_extent() {
        let framebuffer = Framebuffer::new(
            single_color_render_pass(),
            FramebufferCreateInfo {
                attachments: vec![color_view([64, 32]).into()],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(framebuffer.extent(), [64, 32]);
        assert!(framebuffer.attachment(0).unwrap().texture().is_some());
    }

    #[test]
    fn external_needs_extent() {
        assert_eq!(
            Framebuffer::new(
                single_color_render_pass(),
                FramebufferCreateInfo {
                    attachments: vec![FramebufferAttachment::External],
                    ..Default::default()
                },
            )
            .unwrap_err(),
            FramebufferCreationError::AutoExtentWithoutViews,
        );

        assert!(Framebuffer::new(
            single_color_render_pass(),
            FramebufferCreateInfo {
                attachments: vec![FramebufferAttachment::External],
                extent: [800, 600],
                ..Default::default()
            },
        )
        .is_ok());
    }

    #[test]
    fn format_mismatch() {
        let texture = Texture::new(TextureCreateInfo {
            format: Format::B8G8R8A8_UNORM,
            extent: [4, 4, 1],
            allowed_usage: TextureUsage::COLOR_ATTACHMENT,
            ..Default::default()
        })
        .unwrap();

        match Framebuffer::new(
            single_color_render_pass(),
            FramebufferCreateInfo {
                attachments: vec![TextureView::new(texture).into()],
                ..Default::default()
            },
        ) {
            Err(FramebufferCreationError::AttachmentFormatMismatch { attachment: 0, .. }) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn usage_not_allowed() {
        let texture = Texture::new(TextureCreateInfo {
            extent: [4, 4, 1],
            allowed_usage: TextureUsage::SAMPLED,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            Framebuffer::new(
                single_color_render_pass(),
                FramebufferCreateInfo {
                    attachments: vec![TextureView::new(texture).into()],
                    ..Default::default()
                },
            )
            .unwrap_err(),
            FramebufferCreationError::AttachmentUsageNotAllowed {
                attachment: 0,
                usage: TextureUsage::COLOR_ATTACHMENT,
            },
        );
    }

    #[test]
    fn count_mismatch() {
        match Framebuffer::new(single_color_render_pass(), Default::default()) {
            Err(FramebufferCreationError::AttachmentCountMismatch {
                provided: 0,
                required: 1,
            }) => (),
            _ => panic!(),
        }
    }
}
