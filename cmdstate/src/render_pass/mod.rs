// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Description of the steps of the rendering process, and the textures used as input or output
//! of each step.
//!
//! A render pass is a collection of attachments and an ordered list of subpasses. Each subpass
//! names the attachments it writes to as color attachments, and optionally one depth/stencil
//! attachment. While recording, every subpass of a render pass must be recorded in order before
//! the render pass may end.
//!
//! A [`Framebuffer`] associates an actual texture view (or an external surface) with each
//! attachment of a render pass.

pub use self::framebuffer::{
    Framebuffer, FramebufferAttachment, FramebufferCreateInfo, FramebufferCreationError,
};
use crate::{format::Format, macros::impl_id_counter, NonExhaustive, MAX_COLOR_ATTACHMENTS};
use smallvec::SmallVec;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

mod framebuffer;

/// An object representing the discrete steps in which rendering is done.
#[derive(Debug)]
pub struct RenderPass {
    id: NonZero<u64>,
    attachments: SmallVec<[AttachmentDescription; 4]>,
    subpasses: SmallVec<[SubpassDescription; 1]>,
}

impl RenderPass {
    /// Creates a new `RenderPass`.
    pub fn new(
        create_info: RenderPassCreateInfo,
    ) -> Result<Arc<RenderPass>, RenderPassCreationError> {
        Self::validate_new(&create_info)?;

        let RenderPassCreateInfo {
            attachments,
            subpasses,
            _ne: _,
        } = create_info;

        Ok(Arc::new(RenderPass {
            id: Self::next_id(),
            attachments: attachments.into_iter().collect(),
            subpasses: subpasses.into_iter().collect(),
        }))
    }

    fn validate_new(create_info: &RenderPassCreateInfo) -> Result<(), RenderPassCreationError> {
        let RenderPassCreateInfo {
            attachments,
            subpasses,
            _ne: _,
        } = create_info;

        if subpasses.is_empty() {
            return Err(RenderPassCreationError::NoSubpasses);
        }

        for (subpass_index, subpass) in subpasses.iter().enumerate() {
            let subpass_index = subpass_index as u32;

            if subpass.color_attachments.len() > MAX_COLOR_ATTACHMENTS as usize {
                return Err(RenderPassCreationError::TooManyColorAttachments {
                    subpass: subpass_index,
                    count: subpass.color_attachments.len() as u32,
                    max: MAX_COLOR_ATTACHMENTS,
                });
            }

            let mut used: SmallVec<[u32; 4]> = SmallVec::new();

            for &attachment in &subpass.color_attachments {
                let description = attachments.get(attachment as usize).ok_or(
                    RenderPassCreationError::AttachmentOutOfRange {
                        subpass: subpass_index,
                        attachment,
                    },
                )?;

                if !description.format.is_color() {
                    return Err(RenderPassCreationError::ColorAttachmentFormatNotColor {
                        subpass: subpass_index,
                        attachment,
                    });
                }

                if used.contains(&attachment) {
                    return Err(RenderPassCreationError::AttachmentUsedTwice {
                        subpass: subpass_index,
                        attachment,
                    });
                }

                used.push(attachment);
            }

            if let Some(attachment) = subpass.depth_stencil_attachment {
                let description = attachments.get(attachment as usize).ok_or(
                    RenderPassCreationError::AttachmentOutOfRange {
                        subpass: subpass_index,
                        attachment,
                    },
                )?;

                if !description.format.is_depth_stencil() {
                    return Err(
                        RenderPassCreationError::DepthStencilAttachmentFormatNotDepthStencil {
                            subpass: subpass_index,
                            attachment,
                        },
                    );
                }
            }
        }

        Ok(())
    }

    /// Returns the attachments of the render pass.
    #[inline]
    pub fn attachments(&self) -> &[AttachmentDescription] {
        &self.attachments
    }

    /// Returns the subpasses of the render pass.
    #[inline]
    pub fn subpasses(&self) -> &[SubpassDescription] {
        &self.subpasses
    }

    /// Returns the number of subpasses. This is never zero.
    #[inline]
    pub fn subpass_count(&self) -> u32 {
        self.subpasses.len() as u32
    }

    /// Returns `true` if a framebuffer or pipeline made for `self` can be used with `other`.
    ///
    /// This is the case if both are the same object, or if they have the same number of
    /// attachments with the same formats, and the same number of subpasses.
    pub fn is_compatible_with(&self, other: &RenderPass) -> bool {
        if self == other {
            return true;
        }

        if self.attachments.len() != other.attachments.len()
            || self.subpasses.len() != other.subpasses.len()
        {
            return false;
        }

        self.attachments
            .iter()
            .zip(other.attachments.iter())
            .all(|(a, b)| a.format == b.format)
    }
}

impl_id_counter!(RenderPass);

/// Parameters to create a new `RenderPass`.
#[derive(Clone, Debug)]
pub struct RenderPassCreateInfo {
    /// The attachments available to the subpasses.
    ///
    /// The default value is empty.
    pub attachments: Vec<AttachmentDescription>,

    /// The subpasses, in the order they are recorded. There must be at least one.
    ///
    /// The default value is empty, which must be overridden.
    pub subpasses: Vec<SubpassDescription>,

    pub _ne: NonExhaustive,
}

impl Default for RenderPassCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            attachments: Vec::new(),
            subpasses: Vec::new(),
            _ne: NonExhaustive(()),
        }
    }
}

/// Describes an attachment that will be used in a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentDescription {
    /// The format of the texture view that will be attached.
    ///
    /// The default value is [`Format::R8G8B8A8_UNORM`].
    pub format: Format,

    /// What happens to the attachment's contents when the render pass begins.
    ///
    /// The default value is [`LoadOp::DontCare`].
    pub load_op: LoadOp,

    /// What happens to the attachment's contents when the render pass ends.
    ///
    /// The default value is [`StoreOp::Store`].
    pub store_op: StoreOp,

    pub _ne: NonExhaustive,
}

impl Default for AttachmentDescription {
    #[inline]
    fn default() -> Self {
        Self {
            format: Format::R8G8B8A8_UNORM,
            load_op: LoadOp::DontCare,
            store_op: StoreOp::Store,
            _ne: NonExhaustive(()),
        }
    }
}

/// Describes what the device should do with an attachment at the start of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// Describes what the device should do with an attachment at the end of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Describes one of the subpasses of a render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubpassDescription {
    /// Indices of the attachments written to as color attachments.
    ///
    /// The default value is empty.
    pub color_attachments: Vec<u32>,

    /// Index of the depth/stencil attachment, if any.
    ///
    /// The default value is `None`.
    pub depth_stencil_attachment: Option<u32>,

    pub _ne: NonExhaustive,
}

impl Default for SubpassDescription {
    #[inline]
    fn default() -> Self {
        Self {
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            _ne: NonExhaustive(()),
        }
    }
}

impl SubpassDescription {
    /// Returns the indices of all attachments used by the subpass, color attachments first.
    #[inline]
    pub fn attachments(&self) -> impl Iterator<Item = u32> + '_ {
        self.color_attachments
            .iter()
            .copied()
            .chain(self.depth_stencil_attachment)
    }
}

/// Error that can happen when creating a render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderPassCreationError {
    /// The render pass has no subpasses.
    NoSubpasses,

    /// A subpass refers to an attachment index that does not exist.
    AttachmentOutOfRange { subpass: u32, attachment: u32 },

    /// A subpass has more color attachments than the maximum.
    TooManyColorAttachments { subpass: u32, count: u32, max: u32 },

    /// A subpass uses the same attachment more than once as a color attachment.
    AttachmentUsedTwice { subpass: u32, attachment: u32 },

    /// A color attachment of a subpass does not have a color format.
    ColorAttachmentFormatNotColor { subpass: u32, attachment: u32 },

    /// The depth/stencil attachment of a subpass does not have a depth/stencil format.
    DepthStencilAttachmentFormatNotDepthStencil { subpass: u32, attachment: u32 },
}

impl Error for RenderPassCreationError {}

impl Display for RenderPassCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::NoSubpasses => write!(f, "the render pass has no subpasses"),
            Self::AttachmentOutOfRange {
                subpass,
                attachment,
            } => write!(
                f,
                "subpass {} refers to attachment {}, which does not exist",
                subpass, attachment,
            ),
            Self::TooManyColorAttachments {
                subpass,
                count,
                max,
            } => write!(
                f,
                "subpass {} has {} color attachments, but the maximum is {}",
                subpass, count, max,
            ),
            Self::AttachmentUsedTwice {
                subpass,
                attachment,
            } => write!(
                f,
                "subpass {} uses attachment {} more than once",
                subpass, attachment,
            ),
            Self::ColorAttachmentFormatNotColor {
                subpass,
                attachment,
            } => write!(
                f,
                "attachment {} is used as a color attachment in subpass {}, but does not have a \
                color format",
                attachment, subpass,
            ),
            Self::DepthStencilAttachmentFormatNotDepthStencil {
                subpass,
                attachment,
            } => write!(
                f,
                "attachment {} is used as the depth/stencil attachment in subpass {}, but does \
                not have a depth/stencil format",
                attachment, subpass,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AttachmentDescription, RenderPass, RenderPassCreateInfo, RenderPassCreationError,
        SubpassDescription,
    };
    use crate::format::Format;

    fn color_and_depth() -> RenderPassCreateInfo {
        RenderPassCreateInfo {
            attachments: vec![
                AttachmentDescription::default(),
                AttachmentDescription {
                    format: Format::D32_SFLOAT,
                    ..Default::default()
                },
            ],
            subpasses: vec![SubpassDescription {
                color_attachments: vec![0],
                depth_stencil_attachment: Some(1),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn compatibility() {
        let a = RenderPass::new(color_and_depth()).unwrap();
        let b = RenderPass::new(color_and_depth()).unwrap();
        let c = RenderPass::new(RenderPassCreateInfo {
            attachments: vec![AttachmentDescription {
                format: Format::B8G8R8A8_SRGB,
                ..Default::default()
            }],
            subpasses: vec![SubpassDescription {
                color_attachments: vec![0],
                ..Default::default()
            }],
            ..Default::default()
        })
        .unwrap();

        assert_ne!(a, b);
        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
        assert!(c.is_compatible_with(&c));
        assert_eq!(a.subpasses()[0].attachments().collect::<Vec<_>>(), [0, 1]);
    }

    #[test]
    fn no_subpasses() {
        assert_eq!(
            RenderPass::new(Default::default()).unwrap_err(),
            RenderPassCreationError::NoSubpasses,
        );
    }

    #[test]
    fn depth_format_as_color() {
        let mut create_info = color_and_depth();
        create_info.subpasses[0].color_attachments = vec![1];
        create_info.subpasses[0].depth_stencil_attachment = None;

        assert_eq!(
            RenderPass::new(create_info).unwrap_err(),
            RenderPassCreationError::ColorAttachmentFormatNotColor {
                subpass: 0,
                attachment: 1,
            },
        );
    }

    #[test]
    fn attachment_out_of_range() {
        let mut create_info = color_and_depth();
        create_info.subpasses[0].color_attachments = vec![0, 4];

        assert_eq!(
            RenderPass::new(create_info).unwrap_err(),
            RenderPassCreationError::AttachmentOutOfRange {
                subpass: 0,
                attachment: 4,
            },
        );
    }
}
