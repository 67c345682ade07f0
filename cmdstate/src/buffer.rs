// Copyright (c) 2024 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Linear device memory that commands read from and write to.
//!
//! A buffer declares at creation the set of usages it may ever be in (`allowed_usage`). During
//! recording, a buffer must be explicitly transitioned to a single usage before a command may
//! rely on that usage; the [`StateTracker`](crate::command_buffer::StateTracker) keeps track of
//! these transitions.
//!
//! A buffer can also have its usage *frozen*, in which case it is permanently in that usage and
//! can never be transitioned.

use crate::{
    macros::{gpu_bitflags, impl_id_counter},
    DeviceSize, NonExhaustive,
};
use parking_lot::Mutex;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    num::NonZero,
    sync::Arc,
};

gpu_bitflags! {
    /// Describes how a buffer is going to be used.
    ///
    /// As a value of `allowed_usage`, any combination is valid. Transitions, guarantees and
    /// frozen usages always name exactly one flag.
    BufferUsage = u32;

    /// The buffer can be mapped for reading from the host.
    MAP_READ = 1 << 0,

    /// The buffer can be mapped for writing from the host.
    MAP_WRITE = 1 << 1,

    /// The buffer can be the source of a copy command.
    TRANSFER_SRC = 1 << 2,

    /// The buffer can be the destination of a copy command.
    TRANSFER_DST = 1 << 3,

    /// The buffer can be bound as an index buffer.
    INDEX = 1 << 4,

    /// The buffer can be bound as a vertex buffer.
    VERTEX = 1 << 5,

    /// The buffer can be bound in a uniform buffer binding of a bind group.
    UNIFORM = 1 << 6,

    /// The buffer can be bound in a storage buffer binding of a bind group.
    STORAGE = 1 << 7,
}

/// A buffer object.
#[derive(Debug)]
pub struct Buffer {
    id: NonZero<u64>,
    size: DeviceSize,
    allowed_usage: BufferUsage,
    state: Mutex<BufferState>,
}

#[derive(Debug, Default)]
struct BufferState {
    frozen_usage: Option<BufferUsage>,
    mapped: bool,
}

impl Buffer {
    /// Creates a new `Buffer`.
    pub fn new(create_info: BufferCreateInfo) -> Result<Arc<Buffer>, BufferCreationError> {
        let BufferCreateInfo {
            size,
            allowed_usage,
            _ne: _,
        } = create_info;

        if size == 0 {
            return Err(BufferCreationError::ZeroSize);
        }

        if allowed_usage.is_empty() {
            return Err(BufferCreationError::AllowedUsageEmpty);
        }

        Ok(Arc::new(Buffer {
            id: Self::next_id(),
            size,
            allowed_usage,
            state: Mutex::new(BufferState::default()),
        }))
    }

    /// Returns the size of the buffer in bytes.
    #[inline]
    pub fn size(&self) -> DeviceSize {
        self.size
    }

    /// Returns the usages the buffer was created with.
    #[inline]
    pub fn allowed_usage(&self) -> BufferUsage {
        self.allowed_usage
    }

    /// Returns the frozen usage of the buffer, if any.
    #[inline]
    pub fn frozen_usage(&self) -> Option<BufferUsage> {
        self.state.lock().frozen_usage
    }

    /// Returns whether the buffer's usage is frozen.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.state.lock().frozen_usage.is_some()
    }

    /// Returns whether the buffer's usage is frozen to exactly `usage`.
    #[inline]
    pub fn has_frozen_usage(&self, usage: BufferUsage) -> bool {
        self.state.lock().frozen_usage == Some(usage)
    }

    /// Returns whether the buffer is currently mapped on the host.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.state.lock().mapped
    }

    /// Returns whether `usage` is part of the buffer's allowed usage.
    #[inline]
    pub fn is_usage_allowed(&self, usage: BufferUsage) -> bool {
        self.allowed_usage.contains(usage)
    }

    /// Returns whether the buffer can currently be transitioned to `usage`.
    ///
    /// This is the case when the usage is allowed, the buffer is not frozen and the buffer is not
    /// mapped on the host.
    pub fn is_transition_possible(&self, usage: BufferUsage) -> bool {
        let state = self.state.lock();

        state.frozen_usage.is_none() && !state.mapped && self.allowed_usage.contains(usage)
    }

    /// Permanently fixes the usage of the buffer to `usage`.
    pub fn freeze_usage(&self, usage: BufferUsage) -> Result<(), BufferError> {
        if !usage.is_single() {
            return Err(BufferError::UsageNotSingle { usage });
        }

        if !self.allowed_usage.contains(usage) {
            return Err(BufferError::UsageNotAllowed { usage });
        }

        let mut state = self.state.lock();

        if state.frozen_usage.is_some() {
            return Err(BufferError::AlreadyFrozen);
        }

        if state.mapped {
            return Err(BufferError::Mapped);
        }

        state.frozen_usage = Some(usage);

        Ok(())
    }

    /// Maps the buffer on the host. While mapped, the buffer cannot be transitioned.
    pub fn map(&self) -> Result<(), BufferError> {
        if !self
            .allowed_usage
            .intersects(BufferUsage::MAP_READ | BufferUsage::MAP_WRITE)
        {
            return Err(BufferError::NotMappable);
        }

        let mut state = self.state.lock();

        if state.mapped {
            return Err(BufferError::Mapped);
        }

        state.mapped = true;

        Ok(())
    }

    /// Unmaps the buffer.
    pub fn unmap(&self) -> Result<(), BufferError> {
        let mut state = self.state.lock();

        if !state.mapped {
            return Err(BufferError::NotMapped);
        }

        state.mapped = false;

        Ok(())
    }
}

impl_id_counter!(Buffer);

/// Parameters to create a new `Buffer`.
#[derive(Clone, Debug)]
pub struct BufferCreateInfo {
    /// The size in bytes of the buffer.
    ///
    /// The default value is `0`, which must be overridden.
    pub size: DeviceSize,

    /// The usages the buffer may ever be transitioned to.
    ///
    /// The default value is empty, which must be overridden.
    pub allowed_usage: BufferUsage,

    pub _ne: NonExhaustive,
}

impl Default for BufferCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            size: 0,
            allowed_usage: BufferUsage::empty(),
            _ne: NonExhaustive(()),
        }
    }
}

/// Error that can happen when creating a buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferCreationError {
    /// The size of the buffer was zero.
    ZeroSize,

    /// The allowed usage of the buffer was empty.
    AllowedUsageEmpty,
}

impl Error for BufferCreationError {}

impl Display for BufferCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::ZeroSize => write!(f, "the size of the buffer was zero"),
            Self::AllowedUsageEmpty => write!(f, "the allowed usage of the buffer was empty"),
        }
    }
}

/// Error that can happen when changing the state of a buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferError {
    /// The given usage did not consist of exactly one flag.
    UsageNotSingle { usage: BufferUsage },

    /// The given usage is not part of the buffer's allowed usage.
    UsageNotAllowed { usage: BufferUsage },

    /// The buffer's usage is already frozen.
    AlreadyFrozen,

    /// The buffer was created without any map usage.
    NotMappable,

    /// The buffer is mapped.
    Mapped,

    /// The buffer is not mapped.
    NotMapped,
}

impl Error for BufferError {}

impl Display for BufferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::UsageNotSingle { usage } => {
                write!(f, "the usage {:?} does not consist of exactly one flag", usage)
            }
            Self::UsageNotAllowed { usage } => {
                write!(f, "the usage {:?} is not allowed for this buffer", usage)
            }
            Self::AlreadyFrozen => write!(f, "the buffer's usage is already frozen"),
            Self::NotMappable => write!(f, "the buffer was not created with a map usage"),
            Self::Mapped => write!(f, "the buffer is mapped"),
            Self::NotMapped => write!(f, "the buffer is not mapped"),
        }
    }
}
