//! Command allocator recycling.
//!
//! Allocator creation is expensive, so the pool keeps per-type free lists and
//! lends allocators out for a frame. An allocator comes back through
//! [`CommandAllocatorPool::retire`], which demands a [`FenceTicket`] proving
//! the GPU finished the work recorded through it.

use crossbeam::queue::SegQueue;
use parking_lot::Mutex;

use crate::command::CommandListType;
use crate::device::{Device, RawCommandAllocator};
use crate::error::Result;
use crate::sync::FenceTicket;

/// One backing store for recorded commands, tied to a list type.
#[derive(Debug)]
pub struct CommandAllocator {
    raw: RawCommandAllocator,
    list_type: CommandListType,
}

impl CommandAllocator {
    /// The raw allocator handle.
    #[must_use]
    pub fn raw(&self) -> RawCommandAllocator {
        self.raw
    }

    /// The list type this allocator was created for.
    #[must_use]
    pub fn list_type(&self) -> CommandListType {
        self.list_type
    }
}

/// Per-type recycling pool of command allocators.
///
/// The free lists are lock-free MPMC queues, so several recording threads can
/// request and retire without a shared lock. The registry only exists for
/// shutdown bookkeeping.
pub struct CommandAllocatorPool {
    free: [SegQueue<RawCommandAllocator>; CommandListType::COUNT],
    registry: Mutex<Vec<(RawCommandAllocator, CommandListType)>>,
}

impl CommandAllocatorPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: std::array::from_fn(|_| SegQueue::new()),
            registry: Mutex::new(Vec::new()),
        }
    }

    /// Hand out an allocator of `list_type`.
    ///
    /// Pops the type's free list when possible, resetting the recycled
    /// allocator through the device; otherwise creates and registers a new
    /// one. Only the creation or reset path can fail.
    pub fn request(
        &self,
        device: &dyn Device,
        list_type: CommandListType,
    ) -> Result<CommandAllocator> {
        if let Some(raw) = self.free[list_type.index()].pop() {
            device.reset_command_allocator(raw)?;
            tracing::trace!(?list_type, "recycled command allocator");
            return Ok(CommandAllocator { raw, list_type });
        }

        let raw = device.create_command_allocator(list_type)?;
        self.registry.lock().push((raw, list_type));
        tracing::debug!(
            ?list_type,
            total = self.created(list_type),
            "created command allocator"
        );
        Ok(CommandAllocator { raw, list_type })
    }

    /// Return an allocator to its type's free list.
    ///
    /// The ticket proves a frame boundary: the GPU has retired all work
    /// submitted up to the fence value it carries. The caller must only retire
    /// allocators whose lists were submitted before that boundary; the pool
    /// does not track which allocator backed which submission.
    pub fn retire(&self, allocator: CommandAllocator, _ticket: &FenceTicket) {
        self.free[allocator.list_type.index()].push(allocator.raw);
    }

    /// Number of allocators of `list_type` ever created.
    #[must_use]
    pub fn created(&self, list_type: CommandListType) -> usize {
        self.registry
            .lock()
            .iter()
            .filter(|(_, ty)| *ty == list_type)
            .count()
    }

    /// Number of allocators of `list_type` currently sitting in the free list.
    #[must_use]
    pub fn available(&self, list_type: CommandListType) -> usize {
        self.free[list_type.index()].len()
    }

    /// Number of allocators of `list_type` currently lent out.
    #[must_use]
    pub fn outstanding(&self, list_type: CommandListType) -> usize {
        self.created(list_type) - self.available(list_type)
    }

    /// Destroy every registered allocator.
    ///
    /// All lent-out allocators must have been retired; outstanding ones are
    /// destroyed anyway and reported.
    pub fn destroy_all(&mut self, device: &dyn Device) {
        let free_count: usize = self.free.iter().map(SegQueue::len).sum();
        for queue in &self.free {
            while queue.pop().is_some() {}
        }
        let mut registry = self.registry.lock();
        if registry.len() > free_count {
            tracing::warn!(
                outstanding = registry.len() - free_count,
                "destroying command allocators that were never retired"
            );
        }
        for (raw, _) in registry.drain(..) {
            device.destroy_command_allocator(raw);
        }
    }
}

impl Default for CommandAllocatorPool {
    fn default() -> Self {
        Self::new()
    }
}
