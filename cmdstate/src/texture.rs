// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Multi-dimensional device memory, and views into it.
//!
//! Like buffers, textures have an `allowed_usage` and may have their usage frozen. Textures that
//! back a presentation surface are typically created with a frozen usage.
//!
//! Attachment usages are special: a texture only enters them implicitly, when a subpass that
//! uses it as an attachment begins, and never through an explicit transition.

use crate::{
    format::Format,
    macros::{gpu_bitflags, impl_id_counter},
    NonExhaustive,
};
use parking_lot::Mutex;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

gpu_bitflags! {
    /// Describes how a texture is going to be used.
    TextureUsage impl {
        /// Returns the usages that a texture can only be in while it is attached to an active
        /// subpass.
        #[inline]
        pub const fn attachments() -> Self {
            Self::COLOR_ATTACHMENT.union(Self::DEPTH_STENCIL_ATTACHMENT)
        }
    } = u32;

    /// The texture can be the source of a copy command.
    TRANSFER_SRC = 1 << 0,

    /// The texture can be the destination of a copy command.
    TRANSFER_DST = 1 << 1,

    /// The texture can be bound in a sampled texture binding of a bind group.
    SAMPLED = 1 << 2,

    /// The texture can be bound as a storage texture.
    STORAGE = 1 << 3,

    /// The texture can be used as a color attachment of a subpass.
    COLOR_ATTACHMENT = 1 << 4,

    /// The texture can be used as the depth/stencil attachment of a subpass.
    DEPTH_STENCIL_ATTACHMENT = 1 << 5,

    /// The texture can be presented to a surface.
    PRESENT = 1 << 6,
}

/// A texture object.
#[derive(Debug)]
pub struct Texture {
    id: NonZero<u64>,
    format: Format,
    extent: [u32; 3],
    mip_levels: u32,
    allowed_usage: TextureUsage,
    frozen_usage: Mutex<Option<TextureUsage>>,
}

impl Texture {
    /// Creates a new `Texture`.
    pub fn new(create_info: TextureCreateInfo) -> Result<Arc<Texture>, TextureCreationError> {
        let TextureCreateInfo {
            format,
            extent,
            mip_levels,
            allowed_usage,
            frozen_usage,
            _ne: _,
        } = create_info;

        if extent.contains(&0) {
            return Err(TextureCreationError::ZeroExtent { extent });
        }

        let max_mip_levels = max_mip_levels(extent);

        if mip_levels == 0 || mip_levels > max_mip_levels {
            return Err(TextureCreationError::MipLevelsOutOfRange {
                mip_levels,
                max: max_mip_levels,
            });
        }

        if allowed_usage.is_empty() {
            return Err(TextureCreationError::AllowedUsageEmpty);
        }

        if let Some(usage) = frozen_usage {
            if !usage.is_single() || !allowed_usage.contains(usage) {
                return Err(TextureCreationError::FrozenUsageInvalid { usage });
            }
        }

        Ok(Arc::new(Texture {
            id: Self::next_id(),
            format,
            extent,
            mip_levels,
            allowed_usage,
            frozen_usage: Mutex::new(frozen_usage),
        }))
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the extent of the base mip level.
    #[inline]
    pub fn extent(&self) -> [u32; 3] {
        self.extent
    }

    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Returns the extent of the given mip level, or `None` if the texture doesn't have it.
    pub fn mip_level_extent(&self, level: u32) -> Option<[u32; 3]> {
        if level >= self.mip_levels {
            return None;
        }

        Some(self.extent.map(|e| (e >> level).max(1)))
    }

    /// Returns the usages the texture was created with.
    #[inline]
    pub fn allowed_usage(&self) -> TextureUsage {
        self.allowed_usage
    }

    #[inline]
    pub fn frozen_usage(&self) -> Option<TextureUsage> {
        *self.frozen_usage.lock()
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen_usage.lock().is_some()
    }

    /// Returns whether the texture's usage is frozen to exactly `usage`.
    #[inline]
    pub fn has_frozen_usage(&self, usage: TextureUsage) -> bool {
        *self.frozen_usage.lock() == Some(usage)
    }

    #[inline]
    pub fn is_usage_allowed(&self, usage: TextureUsage) -> bool {
        self.allowed_usage.contains(usage)
    }

    /// Returns whether the texture can be transitioned to `usage`.
    ///
    /// On top of the usage being allowed and the texture not being frozen, the texture's format
    /// must be able to support the usage.
    pub fn is_transition_possible(&self, usage: TextureUsage) -> bool {
        !self.is_frozen()
            && self.allowed_usage.contains(usage)
            && format_supports_usage(self.format, usage)
    }

    /// Permanently fixes the usage of the texture to `usage`.
    pub fn freeze_usage(&self, usage: TextureUsage) -> Result<(), TextureError> {
        if !usage.is_single() {
            return Err(TextureError::UsageNotSingle { usage });
        }

        if !self.allowed_usage.contains(usage) {
            return Err(TextureError::UsageNotAllowed { usage });
        }

        let mut frozen_usage = self.frozen_usage.lock();

        if frozen_usage.is_some() {
            return Err(TextureError::AlreadyFrozen);
        }

        *frozen_usage = Some(usage);

        Ok(())
    }
}

impl_id_counter!(Texture);

fn max_mip_levels(extent: [u32; 3]) -> u32 {
    let largest = extent.into_iter().max().unwrap_or(1).max(1);

    u32::BITS - largest.leading_zeros()
}

fn format_supports_usage(format: Format, usage: TextureUsage) -> bool {
    if usage.intersects(
        TextureUsage::COLOR_ATTACHMENT | TextureUsage::STORAGE | TextureUsage::PRESENT,
    ) && format.is_depth_stencil()
    {
        return false;
    }

    if usage.intersects(TextureUsage::DEPTH_STENCIL_ATTACHMENT) && !format.is_depth_stencil() {
        return false;
    }

    true
}

/// Parameters to create a new `Texture`.
#[derive(Clone, Debug)]
pub struct TextureCreateInfo {
    /// The format of the texels.
    ///
    /// The default value is [`Format::R8G8B8A8_UNORM`].
    pub format: Format,

    /// The extent of the base mip level. All elements must be nonzero.
    ///
    /// The default value is `[1, 1, 1]`.
    pub extent: [u32; 3],

    /// The number of mip levels.
    ///
    /// The default value is `1`.
    pub mip_levels: u32,

    /// The usages the texture may ever be in.
    ///
    /// The default value is empty, which must be overridden.
    pub allowed_usage: TextureUsage,

    /// If `Some`, the texture is created with its usage frozen to the given single flag.
    ///
    /// The default value is `None`.
    pub frozen_usage: Option<TextureUsage>,

    pub _ne: NonExhaustive,
}

impl Default for TextureCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            format: Format::R8G8B8A8_UNORM,
            extent: [1, 1, 1],
            mip_levels: 1,
            allowed_usage: TextureUsage::empty(),
            frozen_usage: None,
            _ne: NonExhaustive(()),
        }
    }
}

/// A view into a texture, as used by bind groups and framebuffers.
#[derive(Debug)]
pub struct TextureView {
    id: NonZero<u64>,
    texture: Arc<Texture>,
}

impl TextureView {
    /// Creates a view covering the whole texture.
    pub fn new(texture: Arc<Texture>) -> Arc<TextureView> {
        Arc::new(TextureView {
            id: Self::next_id(),
            texture,
        })
    }

    /// Returns the texture this view belongs to.
    #[inline]
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.texture.format()
    }
}

impl_id_counter!(TextureView);

/// Error that can happen when creating a texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureCreationError {
    /// One of the elements of the extent was zero.
    ZeroExtent { extent: [u32; 3] },

    /// The number of mip levels was zero or more than the extent allows.
    MipLevelsOutOfRange { mip_levels: u32, max: u32 },

    /// The allowed usage of the texture was empty.
    AllowedUsageEmpty,

    /// The frozen usage was not a single flag that is part of the allowed usage.
    FrozenUsageInvalid { usage: TextureUsage },
}

impl Error for TextureCreationError {}

impl Display for TextureCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::ZeroExtent { extent } => {
                write!(f, "the extent {:?} has a zero element", extent)
            }
            Self::MipLevelsOutOfRange { mip_levels, max } => write!(
                f,
                "the number of mip levels ({}) is not between 1 and {}",
                mip_levels, max,
            ),
            Self::AllowedUsageEmpty => write!(f, "the allowed usage of the texture was empty"),
            Self::FrozenUsageInvalid { usage } => write!(
                f,
                "the frozen usage {:?} is not a single flag of the allowed usage",
                usage,
            ),
        }
    }
}

/// Error that can happen when changing the state of a texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureError {
    /// The given usage did not consist of exactly one flag.
    UsageNotSingle { usage: TextureUsage },

    /// The given usage is not part of the texture's allowed usage.
    UsageNotAllowed { usage: TextureUsage },

    /// The texture's usage is already frozen.
    AlreadyFrozen,
}

impl Error for TextureError {}

impl Display for TextureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::UsageNotSingle { usage } => {
                write!(f, "the usage {:?} does not consist of exactly one flag", usage)
            }
            Self::UsageNotAllowed { usage } => {
                write!(f, "the usage {:?} is not allowed for this texture", usage)
            }
            Self::AlreadyFrozen => write!(f, "the texture's usage is already frozen"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Texture, TextureCreateInfo, TextureCreationError, TextureUsage};
    use crate::format::Format;

    #[test]
    fn mip_levels() {
        let texture = Texture::new(TextureCreateInfo {
            extent: [256, 64, 1],
            mip_levels: 9,
            allowed_usage: TextureUsage::SAMPLED,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(texture.mip_level_extent(2), Some([64, 16, 1]));
        assert_eq!(texture.mip_level_extent(8), Some([1, 1, 1]));
        assert_eq!(texture.mip_level_extent(9), None);

        match Texture::new(TextureCreateInfo {
            extent: [256, 64, 1],
            mip_levels: 10,
            allowed_usage: TextureUsage::SAMPLED,
            ..Default::default()
        }) {
            Err(TextureCreationError::MipLevelsOutOfRange { max: 9, .. }) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn created_frozen() {
        let texture = Texture::new(TextureCreateInfo {
            format: Format::B8G8R8A8_UNORM,
            allowed_usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::PRESENT,
            frozen_usage: Some(TextureUsage::COLOR_ATTACHMENT),
            ..Default::default()
        })
        .unwrap();

        assert!(texture.has_frozen_usage(TextureUsage::COLOR_ATTACHMENT));
        assert!(!texture.is_transition_possible(TextureUsage::PRESENT));
    }

    #[test]
    fn format_restricts_transitions() {
        let depth = Texture::new(TextureCreateInfo {
            format: Format::D32_SFLOAT,
            allowed_usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT
                | TextureUsage::COLOR_ATTACHMENT
                | TextureUsage::SAMPLED,
            ..Default::default()
        })
        .unwrap();

        assert!(depth.is_transition_possible(TextureUsage::DEPTH_STENCIL_ATTACHMENT));
        assert!(depth.is_transition_possible(TextureUsage::SAMPLED));
        assert!(!depth.is_transition_possible(TextureUsage::COLOR_ATTACHMENT));
    }
}
