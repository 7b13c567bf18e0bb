//! The device collaborator interface.
//!
//! Device and adapter creation live outside this layer; everything here talks
//! to the hardware through the [`Device`] trait. Creation calls hand back raw
//! handles, and recording calls take the raw command-list handle the way a
//! Vulkan device takes a `vk::CommandBuffer` for its `cmd_*` family.

use std::ptr::NonNull;

use thiserror::Error;

use crate::command::CommandListType;
use crate::descriptors::{DescriptorHeapKind, ViewDesc};
use crate::resource::{AllocationKind, ResourceDesc};
use crate::state::ResourceState;

/// Errors reported by the device collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Device memory exhausted.
    #[error("device out of memory")]
    OutOfMemory,

    /// A handle passed to the device was stale or null.
    #[error("invalid handle")]
    InvalidHandle,

    /// A command allocator was reset while the GPU still owned its contents,
    /// or a list was reset against such an allocator.
    #[error("command allocator still in use by the GPU")]
    AllocatorInUse,

    /// The device was lost or removed.
    #[error("device removed")]
    DeviceRemoved,

    /// The device does not support the requested operation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

macro_rules! raw_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u64);

        impl $name {
            /// The null handle.
            pub const NULL: Self = Self(0);

            /// Whether this is the null handle.
            #[must_use]
            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

raw_handle!(
    /// Raw handle to a device memory object (buffer or texture).
    RawResource
);
raw_handle!(
    /// Raw handle to a caller-owned memory heap for placed allocations.
    RawMemoryHeap
);
raw_handle!(
    /// Raw handle to a descriptor heap.
    RawDescriptorHeap
);
raw_handle!(
    /// Raw handle to a command allocator.
    RawCommandAllocator
);
raw_handle!(
    /// Raw handle to a command-list recording context.
    RawCommandList
);
raw_handle!(
    /// Raw handle to a compiled pipeline state.
    RawPipeline
);
raw_handle!(
    /// Raw handle to a root signature.
    RawRootSignature
);

/// CPU-side address of a descriptor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuDescriptor(pub u64);

/// GPU-side address of a descriptor slot in a shader-visible heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuDescriptor(pub u64);

/// A freshly created device allocation.
#[derive(Debug)]
pub struct ResourceAllocation {
    /// Handle to the memory object.
    pub resource: RawResource,
    /// Base GPU virtual address, zero for non-buffer resources.
    pub gpu_address: u64,
    /// Persistently mapped base pointer for CPU-visible allocations.
    pub mapped_ptr: Option<NonNull<u8>>,
    /// Total allocation size in bytes.
    pub size: u64,
}

// SAFETY: the mapped pointer targets memory owned by the allocation itself;
// the wrapper types only dereference it under exclusive access.
unsafe impl Send for ResourceAllocation {}
unsafe impl Sync for ResourceAllocation {}

/// One resource state transition, ready for recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierDesc {
    /// Resource being transitioned.
    pub resource: RawResource,
    /// State the GPU currently sees.
    pub before: ResourceState,
    /// State the GPU sees after the barrier.
    pub after: ResourceState,
    /// Subresource index, or `None` for the whole resource.
    pub subresource: Option<u32>,
}

/// Graphics API surface consumed by this layer.
///
/// Implementations wrap one logical device. All calls are synchronous CPU-side
/// operations; recording calls only append to the named list's command stream.
pub trait Device: Send + Sync {
    /// Create a memory object described by `desc` in `initial_state`.
    fn create_resource(
        &self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        allocation: &AllocationKind,
    ) -> Result<ResourceAllocation, DeviceError>;

    /// Release a memory object. The caller guarantees the GPU no longer uses it.
    fn destroy_resource(&self, resource: RawResource);

    /// Create a descriptor heap with `capacity` slots of one kind.
    fn create_descriptor_heap(
        &self,
        kind: DescriptorHeapKind,
        capacity: u32,
        shader_visible: bool,
    ) -> Result<RawDescriptorHeap, DeviceError>;

    /// Release a descriptor heap.
    fn destroy_descriptor_heap(&self, heap: RawDescriptorHeap);

    /// Per-slot stride for heaps of `kind`, in bytes.
    fn descriptor_increment_size(&self, kind: DescriptorHeapKind) -> u32;

    /// CPU address of the heap's first slot.
    fn descriptor_cpu_base(&self, heap: RawDescriptorHeap) -> CpuDescriptor;

    /// GPU address of the heap's first slot. Only meaningful for
    /// shader-visible heaps.
    fn descriptor_gpu_base(&self, heap: RawDescriptorHeap) -> GpuDescriptor;

    /// Write a view descriptor into one heap slot.
    fn create_view(
        &self,
        heap: RawDescriptorHeap,
        offset: u32,
        view: &ViewDesc,
    ) -> Result<(), DeviceError>;

    /// Copy `count` descriptor slots between heaps of the same kind.
    fn copy_descriptors(
        &self,
        kind: DescriptorHeapKind,
        dst: RawDescriptorHeap,
        dst_offset: u32,
        src: RawDescriptorHeap,
        src_offset: u32,
        count: u32,
    );

    /// Create a command allocator for lists of `list_type`.
    fn create_command_allocator(
        &self,
        list_type: CommandListType,
    ) -> Result<RawCommandAllocator, DeviceError>;

    /// Rewind an allocator so its backing storage can be reused.
    ///
    /// Fails with [`DeviceError::AllocatorInUse`] if the GPU has not finished
    /// the work recorded through it.
    fn reset_command_allocator(&self, allocator: RawCommandAllocator) -> Result<(), DeviceError>;

    /// Release a command allocator.
    fn destroy_command_allocator(&self, allocator: RawCommandAllocator);

    /// Create a command list recording into `allocator`. The list is created
    /// open, optionally with `pipeline` pre-bound.
    fn create_command_list(
        &self,
        list_type: CommandListType,
        allocator: RawCommandAllocator,
        pipeline: Option<RawPipeline>,
    ) -> Result<RawCommandList, DeviceError>;

    /// Release a command list.
    fn destroy_command_list(&self, list: RawCommandList);

    /// Flush a written range of a persistently mapped allocation. Optional
    /// hint; coherent memory makes this a no-op.
    fn flush_mapped_range(&self, resource: RawResource, offset: u64, len: u64);

    /// Re-open `list` for recording against `allocator`.
    fn cmd_reset(
        &self,
        list: RawCommandList,
        allocator: RawCommandAllocator,
        pipeline: Option<RawPipeline>,
    ) -> Result<(), DeviceError>;

    /// End recording on `list`.
    fn cmd_close(&self, list: RawCommandList) -> Result<(), DeviceError>;

    /// Record a batch of transition barriers as a single submission.
    fn cmd_resource_barriers(&self, list: RawCommandList, barriers: &[BarrierDesc]);

    /// Bind a pipeline state.
    fn cmd_set_pipeline(&self, list: RawCommandList, pipeline: RawPipeline);

    /// Bind a root signature on the graphics or compute path.
    fn cmd_set_root_signature(
        &self,
        list: RawCommandList,
        signature: RawRootSignature,
        compute: bool,
    );

    /// Bind the shader-visible descriptor heaps used by subsequent draws.
    fn cmd_set_descriptor_heaps(&self, list: RawCommandList, heaps: &[RawDescriptorHeap]);

    /// Point a root-signature table slot at a descriptor range.
    fn cmd_set_root_table(
        &self,
        list: RawCommandList,
        slot: u32,
        base: GpuDescriptor,
        compute: bool,
    );

    /// Record a non-indexed draw.
    fn cmd_draw(
        &self,
        list: RawCommandList,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    /// Record an indexed draw.
    fn cmd_draw_indexed(
        &self,
        list: RawCommandList,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    /// Record a compute dispatch.
    fn cmd_dispatch(&self, list: RawCommandList, x: u32, y: u32, z: u32);

    /// Record a byte-range copy between buffers.
    fn cmd_copy_buffer(
        &self,
        list: RawCommandList,
        src: RawResource,
        src_offset: u64,
        dst: RawResource,
        dst_offset: u64,
        len: u64,
    );

    /// Record a whole-resource copy.
    fn cmd_copy_resource(&self, list: RawCommandList, src: RawResource, dst: RawResource);
}
