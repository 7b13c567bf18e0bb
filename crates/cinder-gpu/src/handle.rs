//! Resource arena with generational handles.
//!
//! Views and render passes hold many non-owning references to one resource.
//! Instead of reference counting, the arena owns every [`GpuResource`] and
//! hands out [`ResourceHandle`]s carrying a generation counter; a handle that
//! outlives its resource resolves to `None` instead of aliasing a recycled
//! slot.

use crate::command::CommandList;
use crate::device::{BarrierDesc, Device};
use crate::error::{GpuError, Result};
use crate::resource::GpuResource;
use crate::state::ResourceState;

/// Stable handle to a resource owned by a [`ResourcePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    resource: Option<GpuResource>,
}

/// Arena owning every tracked resource.
#[derive(Default)]
pub struct ResourcePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl ResourcePool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Take ownership of `resource` and return its handle.
    pub fn insert(&mut self, resource: GpuResource) -> ResourceHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.resource = Some(resource);
            return ResourceHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).expect("resource pool exhausted");
        self.slots.push(Slot {
            generation: 1,
            resource: Some(resource),
        });
        ResourceHandle { index, generation: 1 }
    }

    fn slot(&self, handle: ResourceHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    /// Resolve a handle; stale handles yield `None`.
    #[must_use]
    pub fn get(&self, handle: ResourceHandle) -> Option<&GpuResource> {
        self.slot(handle)?.resource.as_ref()
    }

    /// Resolve a handle mutably; stale handles yield `None`.
    pub fn get_mut(&mut self, handle: ResourceHandle) -> Option<&mut GpuResource> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        slot.resource.as_mut()
    }

    /// Remove a resource, invalidating every copy of its handle.
    pub fn remove(&mut self, handle: ResourceHandle) -> Option<GpuResource> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let resource = slot.resource.take()?;
        slot.generation += 1;
        self.free.push(handle.index);
        self.len -= 1;
        Some(resource)
    }

    /// Remove a resource and release its allocation through the device.
    pub fn release(&mut self, device: &dyn Device, handle: ResourceHandle) -> Result<()> {
        let mut resource = self.remove(handle).ok_or_else(|| {
            GpuError::InvalidArgument("release of a stale resource handle".into())
        })?;
        resource.release(device);
        Ok(())
    }

    /// Transition several resources with one driver submission.
    ///
    /// Entries already at their target state are elided, exactly like the
    /// single-resource path; the remainder is recorded as one barrier batch.
    /// Returns the number of barriers recorded.
    pub fn transition_all(
        &mut self,
        device: &dyn Device,
        list: &CommandList,
        requests: &[StateRequest],
    ) -> Result<usize> {
        assert!(
            list.is_recording(),
            "batch transition recorded on a closed command list"
        );

        let mut barriers = Vec::with_capacity(requests.len());
        for request in requests {
            let resource = self.get_mut(request.handle).ok_or_else(|| {
                GpuError::InvalidArgument("batch transition through a stale handle".into())
            })?;
            if let Some(index) = request.subresource {
                assert!(
                    index < resource.desc().subresource_count(),
                    "subresource {index} out of range for '{}'",
                    resource.name()
                );
            }
            if resource.state() == request.target {
                continue;
            }
            barriers.push(BarrierDesc {
                resource: resource.raw(),
                before: resource.state(),
                after: request.target,
                subresource: request.subresource,
            });
            resource.set_tracked_state(request.target);
        }

        if !barriers.is_empty() {
            device.cmd_resource_barriers(list.raw(), &barriers);
        }
        Ok(barriers.len())
    }
}

/// One element of a batch transition.
#[derive(Debug, Clone, Copy)]
pub struct StateRequest {
    /// Resource to transition.
    pub handle: ResourceHandle,
    /// Target usage state.
    pub target: ResourceState,
    /// Subresource index, or `None` for the whole resource.
    pub subresource: Option<u32>,
}

impl StateRequest {
    /// Whole-resource transition request.
    #[must_use]
    pub fn new(handle: ResourceHandle, target: ResourceState) -> Self {
        Self {
            handle,
            target,
            subresource: None,
        }
    }
}
