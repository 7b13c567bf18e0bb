//! Recording device and test fixtures.
//!
//! [`RecordingDevice`] implements [`Device`] entirely on the host: creation
//! calls hand out fake handles, CPU-visible allocations are backed by real
//! host memory so mapping works, and every call is logged as a [`DeviceCall`]
//! value tests can assert against. Failure injection covers the creation and
//! allocator-reset paths.

use std::collections::{HashMap, HashSet};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use cinder_gpu::{
    AllocationKind, BarrierDesc, CommandAllocator, CommandAllocatorPool, CommandList,
    CommandListType, CpuDescriptor, Device, DeviceError, DescriptorHeapKind, FenceTicket,
    FrameFence, GpuDescriptor, Pipeline, RawCommandAllocator, RawCommandList, RawDescriptorHeap,
    RawPipeline, RawResource, RawRootSignature, ResourceAllocation, ResourceDesc,
    ResourceDimension, ResourceState, ViewDesc,
};

/// One device call observed by the recording device.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum DeviceCall {
    CreateResource {
        resource: RawResource,
        initial_state: ResourceState,
        allocation: AllocationKind,
    },
    DestroyResource(RawResource),
    CreateDescriptorHeap {
        heap: RawDescriptorHeap,
        kind: DescriptorHeapKind,
        capacity: u32,
        shader_visible: bool,
    },
    DestroyDescriptorHeap(RawDescriptorHeap),
    CreateView {
        heap: RawDescriptorHeap,
        offset: u32,
        view: ViewDesc,
    },
    CopyDescriptors {
        kind: DescriptorHeapKind,
        dst: RawDescriptorHeap,
        dst_offset: u32,
        src: RawDescriptorHeap,
        src_offset: u32,
        count: u32,
    },
    CreateCommandAllocator {
        allocator: RawCommandAllocator,
        list_type: CommandListType,
    },
    ResetCommandAllocator(RawCommandAllocator),
    DestroyCommandAllocator(RawCommandAllocator),
    CreateCommandList {
        list: RawCommandList,
        list_type: CommandListType,
        allocator: RawCommandAllocator,
        pipeline: Option<RawPipeline>,
    },
    DestroyCommandList(RawCommandList),
    FlushMappedRange {
        resource: RawResource,
        offset: u64,
        len: u64,
    },
    Reset {
        list: RawCommandList,
        allocator: RawCommandAllocator,
        pipeline: Option<RawPipeline>,
    },
    Close(RawCommandList),
    Barriers {
        list: RawCommandList,
        barriers: Vec<BarrierDesc>,
    },
    SetPipeline {
        list: RawCommandList,
        pipeline: RawPipeline,
    },
    SetRootSignature {
        list: RawCommandList,
        signature: RawRootSignature,
        compute: bool,
    },
    SetDescriptorHeaps {
        list: RawCommandList,
        heaps: Vec<RawDescriptorHeap>,
    },
    SetRootTable {
        list: RawCommandList,
        slot: u32,
        base: GpuDescriptor,
        compute: bool,
    },
    Draw {
        list: RawCommandList,
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexed {
        list: RawCommandList,
        index_count: u32,
        instance_count: u32,
    },
    Dispatch {
        list: RawCommandList,
        x: u32,
        y: u32,
        z: u32,
    },
    CopyBuffer {
        list: RawCommandList,
        src: RawResource,
        src_offset: u64,
        dst: RawResource,
        dst_offset: u64,
        len: u64,
    },
    CopyResource {
        list: RawCommandList,
        src: RawResource,
        dst: RawResource,
    },
}

/// Host-only device implementation that records every call.
#[derive(Default)]
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCall>>,
    next_handle: AtomicU64,
    host_memory: Mutex<HashMap<u64, Box<[u8]>>>,
    fail_next_create: Mutex<Option<DeviceError>>,
    busy_allocators: Mutex<HashSet<u64>>,
}

impl RecordingDevice {
    /// Create a fresh device with an empty call log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().push(call);
    }

    fn take_injected_failure(&self) -> Result<(), DeviceError> {
        match self.fail_next_create.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Make the next creation call fail with `err`.
    pub fn fail_next_create(&self, err: DeviceError) {
        *self.fail_next_create.lock() = Some(err);
    }

    /// Make resets of `allocator` fail with `AllocatorInUse` until cleared.
    pub fn mark_allocator_busy(&self, allocator: RawCommandAllocator) {
        self.busy_allocators.lock().insert(allocator.0);
    }

    /// Allow resets of `allocator` again.
    pub fn clear_allocator_busy(&self, allocator: RawCommandAllocator) {
        self.busy_allocators.lock().remove(&allocator.0);
    }

    /// Snapshot of the call log.
    #[must_use]
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// Drain the call log.
    pub fn take_calls(&self) -> Vec<DeviceCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Total number of transition barriers recorded, across all batches.
    #[must_use]
    pub fn barrier_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .map(|call| match call {
                DeviceCall::Barriers { barriers, .. } => barriers.len(),
                _ => 0,
            })
            .sum()
    }

    /// Every recorded barrier batch, in order.
    #[must_use]
    pub fn barrier_batches(&self) -> Vec<Vec<BarrierDesc>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Barriers { barriers, .. } => Some(barriers.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(call)).count()
    }

    /// Copy of the host memory backing a CPU-visible resource.
    #[must_use]
    pub fn host_memory(&self, resource: RawResource) -> Option<Vec<u8>> {
        self.host_memory.lock().get(&resource.0).map(|b| b.to_vec())
    }
}

impl Device for RecordingDevice {
    fn create_resource(
        &self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        allocation: &AllocationKind,
    ) -> Result<ResourceAllocation, DeviceError> {
        self.take_injected_failure()?;
        let id = self.handle();

        let size = match desc.dimension {
            ResourceDimension::Buffer => desc.width,
            _ => {
                desc.width
                    * u64::from(desc.height)
                    * u64::from(desc.depth)
                    * u64::from(desc.array_layers)
                    * u64::from(desc.format.bytes_per_texel())
            }
        };

        let mapped_ptr = if desc.memory.is_cpu_visible() {
            let mut memory = self.host_memory.lock();
            let backing = memory
                .entry(id)
                .or_insert_with(|| vec![0u8; size as usize].into_boxed_slice());
            NonNull::new(backing.as_mut_ptr())
        } else {
            None
        };

        let resource = RawResource(id);
        self.record(DeviceCall::CreateResource {
            resource,
            initial_state,
            allocation: *allocation,
        });
        Ok(ResourceAllocation {
            resource,
            gpu_address: 0x1_0000_0000 + id * 0x1_0000,
            mapped_ptr,
            size,
        })
    }

    fn destroy_resource(&self, resource: RawResource) {
        self.host_memory.lock().remove(&resource.0);
        self.record(DeviceCall::DestroyResource(resource));
    }

    fn create_descriptor_heap(
        &self,
        kind: DescriptorHeapKind,
        capacity: u32,
        shader_visible: bool,
    ) -> Result<RawDescriptorHeap, DeviceError> {
        self.take_injected_failure()?;
        let heap = RawDescriptorHeap(self.handle());
        self.record(DeviceCall::CreateDescriptorHeap {
            heap,
            kind,
            capacity,
            shader_visible,
        });
        Ok(heap)
    }

    fn destroy_descriptor_heap(&self, heap: RawDescriptorHeap) {
        self.record(DeviceCall::DestroyDescriptorHeap(heap));
    }

    fn descriptor_increment_size(&self, kind: DescriptorHeapKind) -> u32 {
        match kind {
            DescriptorHeapKind::RenderTarget | DescriptorHeapKind::DepthStencil => 32,
            DescriptorHeapKind::Resource => 64,
            DescriptorHeapKind::Sampler => 16,
        }
    }

    fn descriptor_cpu_base(&self, heap: RawDescriptorHeap) -> CpuDescriptor {
        CpuDescriptor(heap.0 << 20)
    }

    fn descriptor_gpu_base(&self, heap: RawDescriptorHeap) -> GpuDescriptor {
        GpuDescriptor((heap.0 << 20) | (1_u64 << 48))
    }

    fn create_view(
        &self,
        heap: RawDescriptorHeap,
        offset: u32,
        view: &ViewDesc,
    ) -> Result<(), DeviceError> {
        self.record(DeviceCall::CreateView {
            heap,
            offset,
            view: *view,
        });
        Ok(())
    }

    fn copy_descriptors(
        &self,
        kind: DescriptorHeapKind,
        dst: RawDescriptorHeap,
        dst_offset: u32,
        src: RawDescriptorHeap,
        src_offset: u32,
        count: u32,
    ) {
        self.record(DeviceCall::CopyDescriptors {
            kind,
            dst,
            dst_offset,
            src,
            src_offset,
            count,
        });
    }

    fn create_command_allocator(
        &self,
        list_type: CommandListType,
    ) -> Result<RawCommandAllocator, DeviceError> {
        self.take_injected_failure()?;
        let allocator = RawCommandAllocator(self.handle());
        self.record(DeviceCall::CreateCommandAllocator {
            allocator,
            list_type,
        });
        Ok(allocator)
    }

    fn reset_command_allocator(&self, allocator: RawCommandAllocator) -> Result<(), DeviceError> {
        if self.busy_allocators.lock().contains(&allocator.0) {
            return Err(DeviceError::AllocatorInUse);
        }
        self.record(DeviceCall::ResetCommandAllocator(allocator));
        Ok(())
    }

    fn destroy_command_allocator(&self, allocator: RawCommandAllocator) {
        self.record(DeviceCall::DestroyCommandAllocator(allocator));
    }

    fn create_command_list(
        &self,
        list_type: CommandListType,
        allocator: RawCommandAllocator,
        pipeline: Option<RawPipeline>,
    ) -> Result<RawCommandList, DeviceError> {
        self.take_injected_failure()?;
        let list = RawCommandList(self.handle());
        self.record(DeviceCall::CreateCommandList {
            list,
            list_type,
            allocator,
            pipeline,
        });
        Ok(list)
    }

    fn destroy_command_list(&self, list: RawCommandList) {
        self.record(DeviceCall::DestroyCommandList(list));
    }

    fn flush_mapped_range(&self, resource: RawResource, offset: u64, len: u64) {
        self.record(DeviceCall::FlushMappedRange {
            resource,
            offset,
            len,
        });
    }

    fn cmd_reset(
        &self,
        list: RawCommandList,
        allocator: RawCommandAllocator,
        pipeline: Option<RawPipeline>,
    ) -> Result<(), DeviceError> {
        if self.busy_allocators.lock().contains(&allocator.0) {
            return Err(DeviceError::AllocatorInUse);
        }
        self.record(DeviceCall::Reset {
            list,
            allocator,
            pipeline,
        });
        Ok(())
    }

    fn cmd_close(&self, list: RawCommandList) -> Result<(), DeviceError> {
        self.record(DeviceCall::Close(list));
        Ok(())
    }

    fn cmd_resource_barriers(&self, list: RawCommandList, barriers: &[BarrierDesc]) {
        self.record(DeviceCall::Barriers {
            list,
            barriers: barriers.to_vec(),
        });
    }

    fn cmd_set_pipeline(&self, list: RawCommandList, pipeline: RawPipeline) {
        self.record(DeviceCall::SetPipeline { list, pipeline });
    }

    fn cmd_set_root_signature(
        &self,
        list: RawCommandList,
        signature: RawRootSignature,
        compute: bool,
    ) {
        self.record(DeviceCall::SetRootSignature {
            list,
            signature,
            compute,
        });
    }

    fn cmd_set_descriptor_heaps(&self, list: RawCommandList, heaps: &[RawDescriptorHeap]) {
        self.record(DeviceCall::SetDescriptorHeaps {
            list,
            heaps: heaps.to_vec(),
        });
    }

    fn cmd_set_root_table(
        &self,
        list: RawCommandList,
        slot: u32,
        base: GpuDescriptor,
        compute: bool,
    ) {
        self.record(DeviceCall::SetRootTable {
            list,
            slot,
            base,
            compute,
        });
    }

    fn cmd_draw(
        &self,
        list: RawCommandList,
        vertex_count: u32,
        instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.record(DeviceCall::Draw {
            list,
            vertex_count,
            instance_count,
        });
    }

    fn cmd_draw_indexed(
        &self,
        list: RawCommandList,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.record(DeviceCall::DrawIndexed {
            list,
            index_count,
            instance_count,
        });
    }

    fn cmd_dispatch(&self, list: RawCommandList, x: u32, y: u32, z: u32) {
        self.record(DeviceCall::Dispatch { list, x, y, z });
    }

    fn cmd_copy_buffer(
        &self,
        list: RawCommandList,
        src: RawResource,
        src_offset: u64,
        dst: RawResource,
        dst_offset: u64,
        len: u64,
    ) {
        self.record(DeviceCall::CopyBuffer {
            list,
            src,
            src_offset,
            dst,
            dst_offset,
            len,
        });
    }

    fn cmd_copy_resource(&self, list: RawCommandList, src: RawResource, dst: RawResource) {
        self.record(DeviceCall::CopyResource { list, src, dst });
    }
}

/// Ready-made fixture: device, allocator pool and frame fence.
#[derive(Default)]
pub struct GpuHarness {
    /// The recording device.
    pub device: RecordingDevice,
    /// Allocator pool under test.
    pub pool: CommandAllocatorPool,
    /// Frame fence issuing retirement tickets.
    pub fence: FrameFence,
}

impl GpuHarness {
    /// Create a fresh harness.
    #[must_use]
    pub fn new() -> Self {
        crate::init_logging();
        Self::default()
    }

    /// Request an allocator and create a pre-closed list against it.
    pub fn closed_list(
        &self,
        list_type: CommandListType,
        pipeline: Option<&Pipeline>,
    ) -> (CommandAllocator, CommandList) {
        let allocator = self
            .pool
            .request(&self.device, list_type)
            .expect("allocator request");
        let list = CommandList::create_closed(&self.device, list_type, &allocator, pipeline)
            .expect("list creation");
        (allocator, list)
    }

    /// Request an allocator and create an open list against it.
    pub fn recording_list(
        &self,
        list_type: CommandListType,
        pipeline: Option<&Pipeline>,
    ) -> (CommandAllocator, CommandList) {
        let allocator = self
            .pool
            .request(&self.device, list_type)
            .expect("allocator request");
        let list = CommandList::create_recording(&self.device, list_type, &allocator, pipeline)
            .expect("list creation");
        (allocator, list)
    }

    /// Advance the frame fence as if a submission just retired.
    pub fn retired_ticket(&self) -> FenceTicket {
        let value = self.fence.next_signal();
        self.fence.retire(value)
    }
}

/// A pipeline handle pair for tests.
#[must_use]
pub fn test_pipeline(id: u64, compute: bool) -> Pipeline {
    Pipeline {
        raw: RawPipeline(id),
        root_signature: RawRootSignature(id + 1000),
        compute,
    }
}
