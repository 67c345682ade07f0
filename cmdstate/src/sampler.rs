// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! How textures are filtered and addressed when sampled.
//!
//! Samplers don't own any device memory, so binding one never requires a usage guarantee.

use crate::{macros::impl_id_counter, NonExhaustive};
use std::{num::NonZero, sync::Arc};

/// A sampler object.
#[derive(Debug)]
pub struct Sampler {
    id: NonZero<u64>,
    mag_filter: Filter,
    min_filter: Filter,
    address_mode: [AddressMode; 3],
}

impl Sampler {
    /// Creates a new `Sampler`.
    pub fn new(create_info: SamplerCreateInfo) -> Arc<Sampler> {
        let SamplerCreateInfo {
            mag_filter,
            min_filter,
            address_mode,
            _ne: _,
        } = create_info;

        Arc::new(Sampler {
            id: Self::next_id(),
            mag_filter,
            min_filter,
            address_mode,
        })
    }

    #[inline]
    pub fn mag_filter(&self) -> Filter {
        self.mag_filter
    }

    #[inline]
    pub fn min_filter(&self) -> Filter {
        self.min_filter
    }

    #[inline]
    pub fn address_mode(&self) -> [AddressMode; 3] {
        self.address_mode
    }
}

impl_id_counter!(Sampler);

/// Parameters to create a new `Sampler`.
#[derive(Clone, Debug)]
pub struct SamplerCreateInfo {
    /// The default value is [`Filter::Nearest`].
    pub mag_filter: Filter,

    /// The default value is [`Filter::Nearest`].
    pub min_filter: Filter,

    /// How out-of-range coordinates are handled, for the U, V and W coordinates.
    ///
    /// The default value is [`AddressMode::ClampToEdge`] for all three.
    pub address_mode: [AddressMode; 3],

    pub _ne: NonExhaustive,
}

impl Default for SamplerCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            mag_filter: Filter::Nearest,
            min_filter: Filter::Nearest,
            address_mode: [AddressMode::ClampToEdge; 3],
            _ne: NonExhaustive(()),
        }
    }
}

/// Describes how the color of each texel should be determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    /// The texel whose center is nearest to the requested coordinates is taken.
    Nearest,

    /// The four texels nearest to the requested coordinates are blended.
    Linear,
}

/// How the sampler should behave when it needs to access a texel that is out of range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}
