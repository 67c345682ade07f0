// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Bindings of resources to the slots that a pipeline layout expects.
//!
//! A [`BindGroupLayout`] describes which kind of resource is expected at each binding number. A
//! [`BindGroup`] is created against a layout and provides one resource per binding.
//!
//! Creating a bind group only checks that the resources *can* be used the way the layout says.
//! Whether they are actually in the right usage is only known while recording, and is checked by
//! the [`StateTracker`](crate::command_buffer::StateTracker) when the group is bound.

pub use self::layout::{
    BindGroupLayout, BindGroupLayoutBinding, BindGroupLayoutCreateInfo,
    BindGroupLayoutCreationError, BindingType, ShaderStages,
};
use crate::{
    buffer::Buffer, macros::impl_id_counter, sampler::Sampler, texture::TextureView, DeviceSize,
};
use smallvec::SmallVec;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    ops::Range,
    sync::Arc,
};

mod layout;

/// A set of resources bound to the bindings of a [`BindGroupLayout`].
#[derive(Debug)]
pub struct BindGroup {
    id: NonZero<u64>,
    layout: Arc<BindGroupLayout>,
    entries: SmallVec<[BindGroupEntry; 4]>,
}

impl BindGroup {
    /// Creates a new `BindGroup`.
    ///
    /// Every binding of `layout` must be provided exactly once, with a resource of the kind the
    /// binding expects.
    pub fn new(
        layout: Arc<BindGroupLayout>,
        entries: impl IntoIterator<Item = BindGroupEntry>,
    ) -> Result<Arc<BindGroup>, BindGroupCreationError> {
        let mut sorted: SmallVec<[BindGroupEntry; 4]> = SmallVec::new();

        for entry in entries {
            let layout_binding = layout.binding(entry.binding).ok_or(
                BindGroupCreationError::BindingNotInLayout {
                    binding: entry.binding,
                },
            )?;

            Self::validate_entry(layout_binding, &entry)?;

            match sorted.binary_search_by_key(&entry.binding, |e| e.binding) {
                Ok(_) => {
                    return Err(BindGroupCreationError::DuplicateEntry {
                        binding: entry.binding,
                    })
                }
                Err(index) => sorted.insert(index, entry),
            }
        }

        if let Some(missing) = layout
            .bindings()
            .iter()
            .find(|b| sorted.binary_search_by_key(&b.binding, |e| e.binding).is_err())
        {
            return Err(BindGroupCreationError::MissingEntry {
                binding: missing.binding,
            });
        }

        Ok(Arc::new(BindGroup {
            id: Self::next_id(),
            layout,
            entries: sorted,
        }))
    }

    fn validate_entry(
        layout_binding: &BindGroupLayoutBinding,
        entry: &BindGroupEntry,
    ) -> Result<(), BindGroupCreationError> {
        let binding = entry.binding;

        match (&entry.resource, layout_binding.ty) {
            (
                BindingResource::Buffer { buffer, range },
                ty @ (BindingType::UniformBuffer | BindingType::StorageBuffer),
            ) => {
                if range.start >= range.end || range.end > buffer.size() {
                    return Err(BindGroupCreationError::BufferRangeOutOfBounds {
                        binding,
                        range: range.clone(),
                        buffer_size: buffer.size(),
                    });
                }

                if let Some(usage) = ty.required_buffer_usage() {
                    if !buffer.is_usage_allowed(usage) {
                        return Err(BindGroupCreationError::ResourceUsageNotAllowed { binding });
                    }
                }
            }
            (BindingResource::TextureView(view), ty @ BindingType::SampledTexture) => {
                if let Some(usage) = ty.required_texture_usage() {
                    if !view.texture().is_usage_allowed(usage) {
                        return Err(BindGroupCreationError::ResourceUsageNotAllowed { binding });
                    }
                }
            }
            (BindingResource::Sampler(_), BindingType::Sampler) => (),
            (_, expected) => {
                return Err(BindGroupCreationError::ResourceTypeMismatch { binding, expected });
            }
        }

        Ok(())
    }

    /// Returns the layout the group was created with.
    #[inline]
    pub fn layout(&self) -> &Arc<BindGroupLayout> {
        &self.layout
    }

    /// Returns the entries of the group, sorted by binding number.
    #[inline]
    pub fn entries(&self) -> &[BindGroupEntry] {
        &self.entries
    }

    /// Returns the resource bound at `binding`, if any.
    #[inline]
    pub fn resource(&self, binding: u32) -> Option<&BindingResource> {
        self.entries
            .binary_search_by_key(&binding, |e| e.binding)
            .ok()
            .map(|index| &self.entries[index].resource)
    }
}

impl_id_counter!(BindGroup);

/// A resource bound to one binding of a bind group.
#[derive(Clone, Debug)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub resource: BindingResource,
}

impl BindGroupEntry {
    /// Binds the whole of `buffer`.
    #[inline]
    pub fn buffer(binding: u32, buffer: Arc<Buffer>) -> Self {
        let range = 0..buffer.size();

        Self {
            binding,
            resource: BindingResource::Buffer { buffer, range },
        }
    }

    /// Binds a range of `buffer`.
    #[inline]
    pub fn buffer_range(binding: u32, buffer: Arc<Buffer>, range: Range<DeviceSize>) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer { buffer, range },
        }
    }

    #[inline]
    pub fn texture_view(binding: u32, view: Arc<TextureView>) -> Self {
        Self {
            binding,
            resource: BindingResource::TextureView(view),
        }
    }

    #[inline]
    pub fn sampler(binding: u32, sampler: Arc<Sampler>) -> Self {
        Self {
            binding,
            resource: BindingResource::Sampler(sampler),
        }
    }
}

/// The resource of a [`BindGroupEntry`].
#[derive(Clone, Debug)]
pub enum BindingResource {
    Buffer {
        buffer: Arc<Buffer>,
        range: Range<DeviceSize>,
    },
    TextureView(Arc<TextureView>),
    Sampler(Arc<Sampler>),
}

/// Error that can happen when creating a bind group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindGroupCreationError {
    /// An entry was given for a binding the layout doesn't have.
    BindingNotInLayout { binding: u32 },

    /// More than one entry was given for the same binding.
    DuplicateEntry { binding: u32 },

    /// A binding of the layout was not given an entry.
    MissingEntry { binding: u32 },

    /// The resource of an entry is not of the kind the layout expects.
    ResourceTypeMismatch { binding: u32, expected: BindingType },

    /// The buffer range of an entry is empty or goes past the end of the buffer.
    BufferRangeOutOfBounds {
        binding: u32,
        range: Range<DeviceSize>,
        buffer_size: DeviceSize,
    },

    /// The resource of an entry was not created with the usage the binding requires.
    ResourceUsageNotAllowed { binding: u32 },
}

impl Error for BindGroupCreationError {}

impl Display for BindGroupCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::BindingNotInLayout { binding } => {
                write!(f, "binding {} does not exist in the layout", binding)
            }
            Self::DuplicateEntry { binding } => {
                write!(f, "binding {} was given more than one entry", binding)
            }
            Self::MissingEntry { binding } => {
                write!(f, "binding {} of the layout was not given an entry", binding)
            }
            Self::ResourceTypeMismatch { binding, expected } => write!(
                f,
                "the resource given for binding {} is not of the expected type {:?}",
                binding, expected,
            ),
            Self::BufferRangeOutOfBounds {
                binding,
                range,
                buffer_size,
            } => write!(
                f,
                "the buffer range {:?} given for binding {} is empty or exceeds the buffer size \
                ({})",
                range, binding, buffer_size,
            ),
            Self::ResourceUsageNotAllowed { binding } => write!(
                f,
                "the resource given for binding {} does not allow the usage the binding requires",
                binding,
            ),
        }
    }
}
