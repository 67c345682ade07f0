// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Texel formats of textures and attachments.

use crate::DeviceSize;

/// The format of the texels of a texture or attachment.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
}

impl Format {
    /// Returns the size in bytes of a single texel.
    pub const fn block_size(self) -> DeviceSize {
        match self {
            Format::R8_UNORM => 1,
            Format::R8G8_UNORM | Format::D16_UNORM => 2,
            Format::R8G8B8A8_UNORM
            | Format::R8G8B8A8_SRGB
            | Format::B8G8R8A8_UNORM
            | Format::B8G8R8A8_SRGB
            | Format::R32_SFLOAT
            | Format::D32_SFLOAT
            | Format::D24_UNORM_S8_UINT => 4,
            Format::R16G16B16A16_SFLOAT => 8,
            Format::R32G32B32A32_SFLOAT => 16,
        }
    }

    /// Returns whether the format has a depth and/or stencil component.
    pub const fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            Format::D16_UNORM | Format::D32_SFLOAT | Format::D24_UNORM_S8_UINT
        )
    }

    /// Returns whether the format has a stencil component.
    pub const fn has_stencil(self) -> bool {
        matches!(self, Format::D24_UNORM_S8_UINT)
    }

    /// Returns whether the format stores color data.
    #[inline]
    pub const fn is_color(self) -> bool {
        !self.is_depth_stencil()
    }

    /// Returns whether the format has an sRGB transfer function.
    pub const fn is_srgb(self) -> bool {
        matches!(self, Format::R8G8B8A8_SRGB | Format::B8G8R8A8_SRGB)
    }
}
