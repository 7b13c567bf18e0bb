//! Resource and command abstraction layer for the Cinder engine.
//!
//! This crate provides:
//! - State-tracked GPU resources with minimal barrier emission
//! - Descriptor-heap bump allocation and cross-heap descriptor copies
//! - Command-allocator recycling gated on fence proof
//! - Command-list recording wrappers with remembered bindings
//!
//! Device/adapter creation, queue submission and fence signalling live behind
//! the [`Device`] trait and are supplied by the surrounding renderer.

pub mod allocator;
pub mod command;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod handle;
pub mod resource;
pub mod state;
pub mod sync;

pub use allocator::{CommandAllocator, CommandAllocatorPool};
pub use command::{CommandList, CommandListType, Pipeline};
pub use descriptors::{
    DescriptorEntry, DescriptorHeap, DescriptorHeapKind, DescriptorRange, ViewDesc,
};
pub use device::{
    BarrierDesc, CpuDescriptor, Device, DeviceError, GpuDescriptor, RawCommandAllocator,
    RawCommandList, RawDescriptorHeap, RawMemoryHeap, RawPipeline, RawResource, RawRootSignature,
    ResourceAllocation,
};
pub use error::{GpuError, Result};
pub use handle::{ResourceHandle, ResourcePool, StateRequest};
pub use resource::{
    AllocationKind, ClearValue, Format, GpuResource, Mapping, MemoryLocation, ResourceDesc,
    ResourceDimension,
};
pub use state::ResourceState;
pub use sync::{FenceTicket, FrameFence};
