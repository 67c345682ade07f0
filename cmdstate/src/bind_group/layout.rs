// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Describes the binding slots of a bind group.

use crate::{
    buffer::BufferUsage,
    macros::{gpu_bitflags, impl_id_counter},
    texture::TextureUsage,
    NonExhaustive, MAX_BINDINGS_PER_GROUP,
};
use smallvec::SmallVec;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

/// Describes the bindings that a bind group must provide.
///
/// Pipeline layouts and bind groups refer to bind group layouts by identity: two layouts created
/// from the same description are still different layouts.
#[derive(Debug)]
pub struct BindGroupLayout {
    id: NonZero<u64>,
    bindings: SmallVec<[BindGroupLayoutBinding; 4]>,
}

impl BindGroupLayout {
    /// Creates a new `BindGroupLayout`.
    pub fn new(
        create_info: BindGroupLayoutCreateInfo,
    ) -> Result<Arc<BindGroupLayout>, BindGroupLayoutCreationError> {
        let BindGroupLayoutCreateInfo { bindings, _ne: _ } = create_info;

        let mut sorted: SmallVec<[BindGroupLayoutBinding; 4]> = SmallVec::new();

        for binding in bindings {
            if binding.binding >= MAX_BINDINGS_PER_GROUP {
                return Err(BindGroupLayoutCreationError::BindingOutOfRange {
                    binding: binding.binding,
                });
            }

            if binding.stages.is_empty() {
                return Err(BindGroupLayoutCreationError::StagesEmpty {
                    binding: binding.binding,
                });
            }

            match sorted.binary_search_by_key(&binding.binding, |b| b.binding) {
                Ok(_) => {
                    return Err(BindGroupLayoutCreationError::DuplicateBinding {
                        binding: binding.binding,
                    })
                }
                Err(index) => sorted.insert(index, binding),
            }
        }

        Ok(Arc::new(BindGroupLayout {
            id: Self::next_id(),
            bindings: sorted,
        }))
    }

    /// Returns the bindings of the layout, sorted by binding number.
    #[inline]
    pub fn bindings(&self) -> &[BindGroupLayoutBinding] {
        &self.bindings
    }

    /// Returns the binding with the given number, if the layout has it.
    #[inline]
    pub fn binding(&self, binding: u32) -> Option<&BindGroupLayoutBinding> {
        self.bindings
            .binary_search_by_key(&binding, |b| b.binding)
            .ok()
            .map(|index| &self.bindings[index])
    }
}

impl_id_counter!(BindGroupLayout);

/// Parameters to create a new `BindGroupLayout`.
#[derive(Clone, Debug)]
pub struct BindGroupLayoutCreateInfo {
    /// The bindings of the layout. Binding numbers must be unique and less than
    /// [`MAX_BINDINGS_PER_GROUP`].
    ///
    /// The default value is empty.
    pub bindings: Vec<BindGroupLayoutBinding>,

    pub _ne: NonExhaustive,
}

impl Default for BindGroupLayoutCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            _ne: NonExhaustive(()),
        }
    }
}

/// A single binding of a bind group layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindGroupLayoutBinding {
    /// The binding number.
    pub binding: u32,

    /// The kind of resource bound at this binding.
    pub ty: BindingType,

    /// The shader stages that can access the binding.
    pub stages: ShaderStages,
}

impl BindGroupLayoutBinding {
    /// Returns a binding of type `ty`, visible to all shader stages.
    #[inline]
    pub fn new(binding: u32, ty: BindingType) -> Self {
        Self {
            binding,
            ty,
            stages: ShaderStages::all(),
        }
    }
}

/// The kind of resource that a binding expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingType {
    UniformBuffer,
    StorageBuffer,
    SampledTexture,
    Sampler,
}

impl BindingType {
    /// Returns the usage a buffer bound here must be guaranteed to be in, if this is a buffer
    /// binding.
    #[inline]
    pub const fn required_buffer_usage(self) -> Option<BufferUsage> {
        match self {
            BindingType::UniformBuffer => Some(BufferUsage::UNIFORM),
            BindingType::StorageBuffer => Some(BufferUsage::STORAGE),
            BindingType::SampledTexture | BindingType::Sampler => None,
        }
    }

    /// Returns the usage a texture bound here must be guaranteed to be in, if this is a texture
    /// binding.
    #[inline]
    pub const fn required_texture_usage(self) -> Option<TextureUsage> {
        match self {
            BindingType::SampledTexture => Some(TextureUsage::SAMPLED),
            BindingType::UniformBuffer | BindingType::StorageBuffer | BindingType::Sampler => None,
        }
    }
}

gpu_bitflags! {
    /// A set of shader stages.
    ShaderStages = u32;

    VERTEX = 1 << 0,
    FRAGMENT = 1 << 1,
    COMPUTE = 1 << 2,
}

/// Error that can happen when creating a bind group layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindGroupLayoutCreationError {
    /// A binding number was not less than [`MAX_BINDINGS_PER_GROUP`].
    BindingOutOfRange { binding: u32 },

    /// A binding number was used more than once.
    DuplicateBinding { binding: u32 },

    /// A binding was not visible to any shader stage.
    StagesEmpty { binding: u32 },
}

impl Error for BindGroupLayoutCreationError {}

impl Display for BindGroupLayoutCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::BindingOutOfRange { binding } => write!(
                f,
                "binding {} is not less than the maximum of {}",
                binding, MAX_BINDINGS_PER_GROUP,
            ),
            Self::DuplicateBinding { binding } => {
                write!(f, "binding {} was specified more than once", binding)
            }
            Self::StagesEmpty { binding } => {
                write!(f, "binding {} is not visible to any shader stage", binding)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BindGroupLayout, BindGroupLayoutBinding, BindGroupLayoutCreateInfo,
        BindGroupLayoutCreationError, BindingType,
    };

    #[test]
    fn sorted_lookup() {
        let layout = BindGroupLayout::new(BindGroupLayoutCreateInfo {
            bindings: vec![
                BindGroupLayoutBinding::new(3, BindingType::Sampler),
                BindGroupLayoutBinding::new(0, BindingType::UniformBuffer),
            ],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(layout.bindings()[0].binding, 0);
        assert_eq!(layout.binding(3).unwrap().ty, BindingType::Sampler);
        assert!(layout.binding(1).is_none());
    }

    #[test]
    fn duplicate_binding() {
        match BindGroupLayout::new(BindGroupLayoutCreateInfo {
            bindings: vec![
                BindGroupLayoutBinding::new(1, BindingType::Sampler),
                BindGroupLayoutBinding::new(1, BindingType::SampledTexture),
            ],
            ..Default::default()
        }) {
            Err(BindGroupLayoutCreationError::DuplicateBinding { binding: 1 }) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn identity() {
        let a = BindGroupLayout::new(Default::default()).unwrap();
        let b = BindGroupLayout::new(Default::default()).unwrap();

        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
