//! Descriptor heaps and view ranges.
//!
//! A [`DescriptorHeap`] bump-allocates slots out of a fixed-capacity block of
//! one descriptor kind. Slots are addressed by lightweight non-owning
//! [`DescriptorEntry`]/[`DescriptorRange`] borrows, and descriptor contents
//! can be copied between heaps so a list can assemble a shader-visible table
//! out of views staged in CPU-only heaps.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::device::{CpuDescriptor, Device, GpuDescriptor, RawDescriptorHeap, RawResource};
use crate::error::{GpuError, Result};

/// Kind of descriptor a heap stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapKind {
    /// Render-target views.
    RenderTarget,
    /// Depth-stencil views.
    DepthStencil,
    /// Shader-resource, constant-buffer and unordered-access views.
    Resource,
    /// Samplers.
    Sampler,
}

impl DescriptorHeapKind {
    /// Whether heaps of this kind may be shader-visible.
    #[must_use]
    pub fn supports_shader_visible(self) -> bool {
        matches!(self, Self::Resource | Self::Sampler)
    }
}

/// View descriptor written into one heap slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewDesc {
    /// Render-target view of one mip.
    RenderTarget {
        /// Viewed resource.
        resource: RawResource,
        /// Mip level.
        mip: u32,
    },
    /// Depth-stencil view of one mip.
    DepthStencil {
        /// Viewed resource.
        resource: RawResource,
        /// Mip level.
        mip: u32,
        /// Depth/stencil reads only.
        read_only: bool,
    },
    /// Shader-resource view over a mip range.
    ShaderResource {
        /// Viewed resource.
        resource: RawResource,
        /// First mip visible to shaders.
        most_detailed_mip: u32,
        /// Number of visible mips.
        mip_count: u32,
    },
    /// Unordered-access view of one mip.
    UnorderedAccess {
        /// Viewed resource.
        resource: RawResource,
        /// Mip level.
        mip: u32,
    },
    /// Constant-buffer view over a GPU address range.
    ConstantBuffer {
        /// Base GPU virtual address.
        gpu_address: u64,
        /// Size in bytes.
        size: u32,
    },
    /// Sampler state.
    Sampler,
}

impl ViewDesc {
    /// The heap kind this view must be written into.
    #[must_use]
    pub fn heap_kind(&self) -> DescriptorHeapKind {
        match self {
            Self::RenderTarget { .. } => DescriptorHeapKind::RenderTarget,
            Self::DepthStencil { .. } => DescriptorHeapKind::DepthStencil,
            Self::ShaderResource { .. }
            | Self::UnorderedAccess { .. }
            | Self::ConstantBuffer { .. } => DescriptorHeapKind::Resource,
            Self::Sampler => DescriptorHeapKind::Sampler,
        }
    }
}

/// Fixed-capacity block of descriptor slots of one kind.
///
/// Allocation is a monotone bump: the offset never decreases and nothing is
/// reclaimed for the heap's lifetime. The bump offset is atomic, so ranges can
/// be carved out from several recording threads without external locking.
#[derive(Debug)]
pub struct DescriptorHeap {
    raw: RawDescriptorHeap,
    kind: DescriptorHeapKind,
    capacity: u32,
    stride: u32,
    shader_visible: bool,
    cpu_base: CpuDescriptor,
    gpu_base: Option<GpuDescriptor>,
    next: AtomicU32,
}

impl DescriptorHeap {
    /// Create a heap with `capacity` slots.
    ///
    /// Render-target and depth-stencil heaps are CPU-only by hardware rule;
    /// requesting them shader-visible fails.
    pub fn create(
        device: &dyn Device,
        kind: DescriptorHeapKind,
        capacity: u32,
        shader_visible: bool,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(GpuError::Creation("descriptor heap capacity must be non-zero".into()));
        }
        if shader_visible && !kind.supports_shader_visible() {
            return Err(GpuError::Creation(format!(
                "{kind:?} heaps cannot be shader-visible"
            )));
        }

        let raw = device.create_descriptor_heap(kind, capacity, shader_visible)?;
        let stride = device.descriptor_increment_size(kind);
        let cpu_base = device.descriptor_cpu_base(raw);
        let gpu_base = shader_visible.then(|| device.descriptor_gpu_base(raw));
        tracing::debug!(?kind, capacity, shader_visible, "created descriptor heap");

        Ok(Self {
            raw,
            kind,
            capacity,
            stride,
            shader_visible,
            cpu_base,
            gpu_base,
            next: AtomicU32::new(0),
        })
    }

    /// The raw heap handle.
    #[must_use]
    pub fn raw(&self) -> RawDescriptorHeap {
        self.raw
    }

    /// The descriptor kind stored here.
    #[must_use]
    pub fn kind(&self) -> DescriptorHeapKind {
        self.kind
    }

    /// Total slot capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Per-slot stride in bytes.
    #[must_use]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Whether shaders can address this heap.
    #[must_use]
    pub fn is_shader_visible(&self) -> bool {
        self.shader_visible
    }

    /// Number of slots allocated so far.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }

    /// Whether no slot has been allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots still unallocated.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.capacity - self.len()
    }

    /// Bump-allocate a contiguous range of `count` slots.
    pub fn allocate(&self, count: u32) -> Result<DescriptorRange<'_>> {
        if count == 0 {
            return Err(GpuError::InvalidArgument("cannot allocate an empty range".into()));
        }
        let offset = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                next.checked_add(count).filter(|&end| end <= self.capacity)?;
                Some(next + count)
            })
            .map_err(|next| {
                GpuError::InvalidArgument(format!(
                    "{count} slots requested but only {} of {} remain in {:?} heap",
                    self.capacity - next,
                    self.capacity,
                    self.kind
                ))
            })?;

        Ok(DescriptorRange { heap: self, offset, count })
    }

    /// Bump-allocate a single slot.
    pub fn allocate_one(&self) -> Result<DescriptorEntry<'_>> {
        let range = self.allocate(1)?;
        Ok(range.entry(0))
    }

    /// Everything written so far, as one range starting at slot 0.
    #[must_use]
    pub fn written_range(&self) -> DescriptorRange<'_> {
        DescriptorRange {
            heap: self,
            offset: 0,
            count: self.len(),
        }
    }

    /// CPU address of slot `offset`.
    fn cpu_handle(&self, offset: u32) -> CpuDescriptor {
        debug_assert!(offset < self.capacity);
        CpuDescriptor(self.cpu_base.0 + u64::from(offset) * u64::from(self.stride))
    }

    /// GPU address of slot `offset`, if shader-visible.
    fn gpu_handle(&self, offset: u32) -> Option<GpuDescriptor> {
        debug_assert!(offset < self.capacity);
        self.gpu_base
            .map(|base| GpuDescriptor(base.0 + u64::from(offset) * u64::from(self.stride)))
    }

    /// Write a view descriptor into `entry`.
    pub fn write_view(
        &self,
        device: &dyn Device,
        entry: &DescriptorEntry<'_>,
        view: &ViewDesc,
    ) -> Result<()> {
        if !std::ptr::eq(entry.heap, self) {
            return Err(GpuError::InvalidArgument(
                "entry does not belong to this heap".into(),
            ));
        }
        if view.heap_kind() != self.kind {
            return Err(GpuError::InvalidArgument(format!(
                "{:?} view cannot be written into a {:?} heap",
                view.heap_kind(),
                self.kind
            )));
        }
        device.create_view(self.raw, entry.offset, view)?;
        Ok(())
    }

    /// Allocate one slot and copy a single descriptor into it.
    ///
    /// The source may live in any heap of the same kind.
    pub fn push_entry<'heap>(
        &'heap self,
        device: &dyn Device,
        src: &DescriptorEntry<'_>,
    ) -> Result<DescriptorEntry<'heap>> {
        if src.heap.kind != self.kind {
            return Err(GpuError::InvalidArgument(format!(
                "cannot copy a {:?} descriptor into a {:?} heap",
                src.heap.kind, self.kind
            )));
        }
        let dst = self.allocate_one()?;
        device.copy_descriptors(self.kind, self.raw, dst.offset, src.heap.raw, src.offset, 1);
        Ok(dst)
    }

    /// Allocate `src.count()` slots and bulk-copy a range into them.
    ///
    /// Bulk cross-heap copies read descriptor contents on the CPU timeline,
    /// so the source range must live in a CPU-only heap.
    pub fn push_range<'heap>(
        &'heap self,
        device: &dyn Device,
        src: &DescriptorRange<'_>,
    ) -> Result<DescriptorRange<'heap>> {
        if src.heap.kind != self.kind {
            return Err(GpuError::InvalidArgument(format!(
                "cannot copy {:?} descriptors into a {:?} heap",
                src.heap.kind, self.kind
            )));
        }
        if src.heap.shader_visible {
            return Err(GpuError::InvalidArgument(
                "bulk descriptor copies require a CPU-only source heap".into(),
            ));
        }
        if src.count == 0 {
            return Err(GpuError::InvalidArgument("cannot copy an empty range".into()));
        }
        let dst = self.allocate(src.count)?;
        device.copy_descriptors(self.kind, self.raw, dst.offset, src.heap.raw, src.offset, src.count);
        Ok(dst)
    }

    /// Release the heap, consuming it so no stale entries or ranges can
    /// outlive the raw handle. The caller guarantees no recorded work still
    /// reads it.
    pub fn destroy(self, device: &dyn Device) {
        device.destroy_descriptor_heap(self.raw);
    }
}

/// Non-owning handle to one descriptor slot.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorEntry<'a> {
    heap: &'a DescriptorHeap,
    offset: u32,
}

impl<'a> DescriptorEntry<'a> {
    /// The heap this entry lives in.
    #[must_use]
    pub fn heap(&self) -> &'a DescriptorHeap {
        self.heap
    }

    /// Slot offset within the heap.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// CPU address of the slot.
    #[must_use]
    pub fn cpu_handle(&self) -> CpuDescriptor {
        self.heap.cpu_handle(self.offset)
    }

    /// GPU address of the slot, if the heap is shader-visible.
    #[must_use]
    pub fn gpu_handle(&self) -> Option<GpuDescriptor> {
        self.heap.gpu_handle(self.offset)
    }
}

/// Non-owning handle to a contiguous run of descriptor slots.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorRange<'a> {
    heap: &'a DescriptorHeap,
    offset: u32,
    count: u32,
}

impl<'a> DescriptorRange<'a> {
    /// The heap this range lives in.
    #[must_use]
    pub fn heap(&self) -> &'a DescriptorHeap {
        self.heap
    }

    /// Slot offset of the first entry.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of slots in the range.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Whether the range is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Entry `index` within the range.
    ///
    /// # Panics
    /// Panics if `index >= count`.
    #[must_use]
    pub fn entry(&self, index: u32) -> DescriptorEntry<'a> {
        assert!(
            index < self.count,
            "descriptor index {index} out of range ({} entries)",
            self.count
        );
        DescriptorEntry {
            heap: self.heap,
            offset: self.offset + index,
        }
    }

    /// Entry `index`, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<DescriptorEntry<'a>> {
        (index < self.count).then(|| self.entry(index))
    }

    /// CPU address of the first slot.
    #[must_use]
    pub fn cpu_handle(&self) -> CpuDescriptor {
        self.heap.cpu_handle(self.offset)
    }

    /// GPU address of the first slot, if the heap is shader-visible.
    #[must_use]
    pub fn gpu_handle(&self) -> Option<GpuDescriptor> {
        self.heap.gpu_handle(self.offset)
    }

    /// Iterate over the entries of the range.
    pub fn iter(&self) -> impl Iterator<Item = DescriptorEntry<'a>> + '_ {
        (0..self.count).map(|i| self.entry(i))
    }
}
