//! State-tracked GPU resources.
//!
//! A [`GpuResource`] wraps one device memory allocation and carries its
//! current usage state, so call sites request target states instead of
//! hand-building barriers. Redundant transitions are elided; everything else
//! becomes exactly one barrier on the supplied command list.

use std::ptr::NonNull;

use crate::command::CommandList;
use crate::device::{BarrierDesc, Device, RawMemoryHeap, RawResource};
use crate::error::{GpuError, Result};
use crate::state::ResourceState;

/// Resource dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDimension {
    /// Linear buffer; `width` is the size in bytes.
    Buffer,
    /// One-dimensional texture.
    Texture1D,
    /// Two-dimensional texture.
    Texture2D,
    /// Volume texture.
    Texture3D,
}

/// Texel formats understood by this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// No format; required for buffers.
    #[default]
    Unknown,
    /// 8-bit RGBA, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit BGRA, unsigned normalized.
    Bgra8Unorm,
    /// 16-bit float RGBA.
    Rgba16Float,
    /// 32-bit float red channel.
    R32Float,
    /// 32-bit unsigned integer red channel.
    R32Uint,
    /// 32-bit float depth.
    D32Float,
    /// 24-bit depth with 8-bit stencil.
    D24UnormS8Uint,
}

impl Format {
    /// Bytes per texel, zero for [`Format::Unknown`].
    #[must_use]
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Rgba8Unorm | Self::Bgra8Unorm | Self::R32Float | Self::R32Uint => 4,
            Self::Rgba16Float => 8,
            Self::D32Float | Self::D24UnormS8Uint => 4,
        }
    }

    /// Whether the format carries a depth aspect.
    #[must_use]
    pub fn has_depth(self) -> bool {
        matches!(self, Self::D32Float | Self::D24UnormS8Uint)
    }
}

/// Where an allocation lives and who can touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryLocation {
    /// Device-local memory, not CPU-accessible.
    #[default]
    GpuOnly,
    /// CPU-writable upload memory, persistently mapped.
    CpuToGpu,
    /// CPU-readable readback memory, persistently mapped.
    GpuToCpu,
}

impl MemoryLocation {
    /// Whether allocations in this location are CPU-accessible.
    #[must_use]
    pub fn is_cpu_visible(self) -> bool {
        !matches!(self, Self::GpuOnly)
    }
}

/// Optimized clear value for target and depth resources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Render-target clear color.
    Color([f32; 4]),
    /// Depth/stencil clear values.
    DepthStencil {
        /// Depth clear value.
        depth: f32,
        /// Stencil clear value.
        stencil: u8,
    },
}

/// How the backing memory for a resource is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    /// Dedicated allocation owned by the resource.
    Committed,
    /// Sub-allocation placed into a caller-owned heap at a byte offset.
    Placed {
        /// Heap receiving the resource.
        heap: RawMemoryHeap,
        /// Byte offset within the heap.
        offset: u64,
    },
    /// Reserved (sparse) resource; pages are bound later by the caller.
    Reserved,
}

/// Shape descriptor for a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDesc {
    /// Buffer or texture dimensionality.
    pub dimension: ResourceDimension,
    /// Width in texels, or size in bytes for buffers.
    pub width: u64,
    /// Height in texels; 1 for buffers and 1D textures.
    pub height: u32,
    /// Depth in texels; 1 unless `Texture3D`.
    pub depth: u32,
    /// Array layer count; 1 unless the resource is an array.
    pub array_layers: u32,
    /// Mip level count.
    pub mip_levels: u32,
    /// Samples per texel for multisampled targets.
    pub sample_count: u32,
    /// Texel format.
    pub format: Format,
    /// Memory location of the backing allocation.
    pub memory: MemoryLocation,
    /// Default clear value for target/depth resources.
    pub clear_value: Option<ClearValue>,
    /// Byte stride between packed sub-elements of a buffer; 0 if unused.
    pub element_stride: u32,
}

impl ResourceDesc {
    /// Describe a linear buffer of `size` bytes.
    #[must_use]
    pub fn buffer(size: u64) -> Self {
        Self {
            dimension: ResourceDimension::Buffer,
            width: size,
            height: 1,
            depth: 1,
            array_layers: 1,
            mip_levels: 1,
            sample_count: 1,
            format: Format::Unknown,
            memory: MemoryLocation::GpuOnly,
            clear_value: None,
            element_stride: 0,
        }
    }

    /// Describe a 2D texture.
    #[must_use]
    pub fn texture_2d(width: u32, height: u32, format: Format) -> Self {
        Self {
            dimension: ResourceDimension::Texture2D,
            width: u64::from(width),
            height,
            depth: 1,
            array_layers: 1,
            mip_levels: 1,
            sample_count: 1,
            format,
            memory: MemoryLocation::GpuOnly,
            clear_value: None,
            element_stride: 0,
        }
    }

    /// Describe a volume texture.
    #[must_use]
    pub fn texture_3d(width: u32, height: u32, depth: u32, format: Format) -> Self {
        Self {
            dimension: ResourceDimension::Texture3D,
            width: u64::from(width),
            height,
            depth,
            array_layers: 1,
            mip_levels: 1,
            sample_count: 1,
            format,
            memory: MemoryLocation::GpuOnly,
            clear_value: None,
            element_stride: 0,
        }
    }

    /// Set the memory location.
    #[must_use]
    pub fn with_memory(mut self, memory: MemoryLocation) -> Self {
        self.memory = memory;
        self
    }

    /// Set the mip level count.
    #[must_use]
    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    /// Set the array layer count.
    #[must_use]
    pub fn with_array_layers(mut self, array_layers: u32) -> Self {
        self.array_layers = array_layers;
        self
    }

    /// Set the multisample count.
    #[must_use]
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the default clear value.
    #[must_use]
    pub fn with_clear_value(mut self, clear_value: ClearValue) -> Self {
        self.clear_value = Some(clear_value);
        self
    }

    /// Set the packed sub-element stride of a buffer.
    #[must_use]
    pub fn with_element_stride(mut self, element_stride: u32) -> Self {
        self.element_stride = element_stride;
        self
    }

    /// Number of addressable subresources (mips x array layers).
    ///
    /// Saturates on unvalidated descriptors; [`ResourceDesc::validate`]
    /// rejects counts that would overflow.
    #[must_use]
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels.saturating_mul(self.array_layers)
    }

    /// Check internal consistency before handing the descriptor to the device.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(GpuError::Creation(msg));

        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return fail(format!(
                "zero extent {}x{}x{}",
                self.width, self.height, self.depth
            ));
        }
        if self.mip_levels == 0 || self.array_layers == 0 || self.sample_count == 0 {
            return fail("mip, layer and sample counts must be at least 1".into());
        }
        if self.mip_levels.checked_mul(self.array_layers).is_none() {
            return fail(format!(
                "{} mips x {} layers overflows the subresource count",
                self.mip_levels, self.array_layers
            ));
        }

        match self.dimension {
            ResourceDimension::Buffer => {
                if self.height != 1 || self.depth != 1 || self.array_layers != 1 {
                    return fail("buffers must have unit height/depth/layers".into());
                }
                if self.mip_levels != 1 || self.sample_count != 1 {
                    return fail("buffers cannot be mipmapped or multisampled".into());
                }
                if self.format != Format::Unknown {
                    return fail(format!("buffers must use Format::Unknown, got {:?}", self.format));
                }
                if self.clear_value.is_some() {
                    return fail("buffers cannot carry a clear value".into());
                }
            }
            ResourceDimension::Texture1D => {
                if self.height != 1 || self.depth != 1 {
                    return fail("1D textures must have unit height/depth".into());
                }
                if self.sample_count != 1 {
                    return fail("1D textures cannot be multisampled".into());
                }
            }
            ResourceDimension::Texture2D => {
                if self.depth != 1 {
                    return fail("2D textures must have unit depth".into());
                }
            }
            ResourceDimension::Texture3D => {
                if self.array_layers != 1 {
                    return fail("volume textures cannot be arrayed".into());
                }
                if self.sample_count != 1 {
                    return fail("volume textures cannot be multisampled".into());
                }
            }
        }

        if self.dimension != ResourceDimension::Buffer {
            if self.format == Format::Unknown {
                return fail("textures need a concrete format".into());
            }
            if self.element_stride != 0 {
                return fail("element stride is only meaningful for buffers".into());
            }
            let max_dim = self.width.max(u64::from(self.height)).max(u64::from(self.depth));
            let max_mips = u64::BITS - max_dim.leading_zeros();
            if self.mip_levels > max_mips {
                return fail(format!(
                    "{} mip levels exceed the {max_mips} supported by the extent",
                    self.mip_levels
                ));
            }
        }

        if self.sample_count > 1 && self.mip_levels > 1 {
            return fail("multisampled textures cannot be mipmapped".into());
        }
        if let Some(clear) = self.clear_value {
            let depth_clear = matches!(clear, ClearValue::DepthStencil { .. });
            if depth_clear != self.format.has_depth() {
                return fail("clear value aspect does not match the format".into());
            }
        }

        Ok(())
    }
}

/// One device memory allocation with a tracked usage state.
///
/// The tracked state is authoritative only while every transition for the
/// resource goes through this wrapper. The wrapper is not internally
/// synchronized; per-frame, one writer owns a resource at a time.
#[derive(Debug)]
pub struct GpuResource {
    name: String,
    desc: ResourceDesc,
    raw: RawResource,
    gpu_address: u64,
    mapped: Option<NonNull<u8>>,
    size: u64,
    state: ResourceState,
    owned: bool,
    destroyed: bool,
}

// SAFETY: `mapped` points into the resource's own allocation; mutation goes
// through `&mut self` only.
unsafe impl Send for GpuResource {}
unsafe impl Sync for GpuResource {}

impl GpuResource {
    fn create(
        device: &dyn Device,
        desc: ResourceDesc,
        initial_state: ResourceState,
        allocation: &AllocationKind,
        name: &str,
    ) -> Result<Self> {
        desc.validate()?;
        let alloc = device.create_resource(&desc, initial_state, allocation)?;
        tracing::debug!(
            name,
            ?allocation,
            size = alloc.size,
            "created GPU resource"
        );

        Ok(Self {
            name: name.to_owned(),
            desc,
            raw: alloc.resource,
            gpu_address: alloc.gpu_address,
            mapped: alloc.mapped_ptr,
            size: alloc.size,
            state: initial_state,
            owned: true,
            destroyed: false,
        })
    }

    /// Create an exclusively-owned committed allocation.
    pub fn create_committed(
        device: &dyn Device,
        desc: ResourceDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<Self> {
        Self::create(device, desc, initial_state, &AllocationKind::Committed, name)
    }

    /// Create a resource placed into a caller-owned heap.
    pub fn create_placed(
        device: &dyn Device,
        desc: ResourceDesc,
        initial_state: ResourceState,
        heap: RawMemoryHeap,
        offset: u64,
        name: &str,
    ) -> Result<Self> {
        if heap.is_null() {
            return Err(GpuError::InvalidArgument(
                "placed resource requires a non-null heap".into(),
            ));
        }
        Self::create(
            device,
            desc,
            initial_state,
            &AllocationKind::Placed { heap, offset },
            name,
        )
    }

    /// Create a reserved (sparse) resource; page binding is the caller's job.
    pub fn create_reserved(
        device: &dyn Device,
        desc: ResourceDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<Self> {
        Self::create(device, desc, initial_state, &AllocationKind::Reserved, name)
    }

    /// Wrap a presentation-surface image without taking ownership.
    ///
    /// The surface owns the memory; dropping the wrapper never releases it.
    #[must_use]
    pub fn from_swapchain(
        raw: RawResource,
        width: u32,
        height: u32,
        format: Format,
        name: &str,
    ) -> Self {
        let desc = ResourceDesc::texture_2d(width, height, format);
        let size = u64::from(width) * u64::from(height) * u64::from(format.bytes_per_texel());
        Self {
            name: name.to_owned(),
            desc,
            raw,
            gpu_address: 0,
            mapped: None,
            size,
            state: ResourceState::PRESENT,
            owned: false,
            destroyed: false,
        }
    }

    /// The raw device handle.
    #[must_use]
    pub fn raw(&self) -> RawResource {
        self.raw
    }

    /// The shape descriptor.
    #[must_use]
    pub fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    /// Debug name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocation size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The usage state the GPU currently sees.
    #[must_use]
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Whether the backing allocation is CPU-accessible.
    #[must_use]
    pub fn is_cpu_visible(&self) -> bool {
        self.mapped.is_some()
    }

    /// Transition the whole resource to `target`.
    ///
    /// A no-op when the resource is already at `target`; otherwise records
    /// exactly one barrier on `list`. Returns whether a barrier was recorded.
    pub fn set_state(
        &mut self,
        device: &dyn Device,
        list: &CommandList,
        target: ResourceState,
    ) -> bool {
        self.set_state_subresource(device, list, target, None)
    }

    /// Transition one subresource (or the whole resource for `None`).
    ///
    /// The tracked state stays whole-resource: a subresource-scoped barrier
    /// narrows what the driver sees but updates the single tracked state.
    pub fn set_state_subresource(
        &mut self,
        device: &dyn Device,
        list: &CommandList,
        target: ResourceState,
        subresource: Option<u32>,
    ) -> bool {
        assert!(
            list.is_recording(),
            "state transition for '{}' recorded on a closed command list",
            self.name
        );
        if let Some(index) = subresource {
            assert!(
                index < self.desc.subresource_count(),
                "subresource {index} out of range for '{}' ({} subresources)",
                self.name,
                self.desc.subresource_count()
            );
        }

        if self.state == target {
            return false;
        }

        let barrier = BarrierDesc {
            resource: self.raw,
            before: self.state,
            after: target,
            subresource,
        };
        device.cmd_resource_barriers(list.raw(), std::slice::from_ref(&barrier));
        self.state = target;
        true
    }

    /// Transition to the presentation state.
    pub fn as_present(&mut self, device: &dyn Device, list: &CommandList) -> bool {
        self.set_state(device, list, ResourceState::PRESENT)
    }

    /// Transition to the render-target state.
    pub fn as_render_target(&mut self, device: &dyn Device, list: &CommandList) -> bool {
        self.set_state(device, list, ResourceState::RENDER_TARGET)
    }

    /// Transition to the writable depth state.
    pub fn as_depth_write(&mut self, device: &dyn Device, list: &CommandList) -> bool {
        self.set_state(device, list, ResourceState::DEPTH_WRITE)
    }

    /// Transition to the read-only depth state.
    pub fn as_depth_read(&mut self, device: &dyn Device, list: &CommandList) -> bool {
        self.set_state(device, list, ResourceState::DEPTH_READ)
    }

    /// Transition to the all-stages shader-readable state.
    pub fn as_shader_resource(&mut self, device: &dyn Device, list: &CommandList) -> bool {
        self.set_state(device, list, ResourceState::ALL_SHADER_RESOURCE)
    }

    /// Transition to the unordered-access state.
    pub fn as_unordered_access(&mut self, device: &dyn Device, list: &CommandList) -> bool {
        self.set_state(device, list, ResourceState::UNORDERED_ACCESS)
    }

    /// Transition to the copy-destination state.
    pub fn as_copy_dest(&mut self, device: &dyn Device, list: &CommandList) -> bool {
        self.set_state(device, list, ResourceState::COPY_DEST)
    }

    /// Overwrite the tracked state after a batch barrier was recorded.
    pub(crate) fn set_tracked_state(&mut self, state: ResourceState) {
        self.state = state;
    }

    /// GPU virtual address of packed sub-element `index`; index 0 is the base.
    #[must_use]
    pub fn gpu_address(&self, index: u32) -> u64 {
        assert!(
            index == 0 || self.desc.element_stride != 0,
            "'{}' has no element stride; only index 0 is addressable",
            self.name
        );
        self.gpu_address + u64::from(index) * u64::from(self.desc.element_stride)
    }

    /// CPU pointer to packed sub-element `index` of a mapped allocation.
    pub fn cpu_address(&self, index: u32) -> Result<NonNull<u8>> {
        let base = self.mapped.ok_or_else(|| {
            GpuError::Map(format!("'{}' is not CPU-accessible", self.name))
        })?;
        assert!(
            index == 0 || self.desc.element_stride != 0,
            "'{}' has no element stride; only index 0 is addressable",
            self.name
        );
        let offset = u64::from(index) * u64::from(self.desc.element_stride);
        if offset >= self.size {
            return Err(GpuError::Map(format!(
                "element {index} at byte {offset} exceeds '{}' ({} bytes)",
                self.name, self.size
            )));
        }
        // SAFETY: offset is within the allocation checked above.
        Ok(unsafe { NonNull::new_unchecked(base.as_ptr().add(offset as usize)) })
    }

    /// Map `len` bytes starting at `offset` for CPU access.
    pub fn map<'a>(
        &'a mut self,
        device: &'a dyn Device,
        offset: u64,
        len: u64,
    ) -> Result<Mapping<'a>> {
        let base = self.mapped.ok_or_else(|| {
            GpuError::Map(format!("'{}' is not CPU-accessible", self.name))
        })?;
        let end = offset
            .checked_add(len)
            .ok_or_else(|| GpuError::Map("mapped range overflows".into()))?;
        if end > self.size {
            return Err(GpuError::Map(format!(
                "range {offset}..{end} exceeds '{}' ({} bytes)",
                self.name, self.size
            )));
        }

        // SAFETY: the range is within the persistently mapped allocation and
        // `&mut self` gives exclusive access to it.
        let bytes = unsafe {
            std::slice::from_raw_parts_mut(base.as_ptr().add(offset as usize), len as usize)
        };
        Ok(Mapping {
            device,
            resource: self.raw,
            range_offset: offset,
            bytes,
            written: None,
        })
    }

    /// Write `data` at byte `offset` of a CPU-visible allocation.
    ///
    /// Equivalent to mapping, copying and flushing in one call.
    pub fn write_data<T: bytemuck::Pod>(
        &mut self,
        device: &dyn Device,
        offset: u64,
        data: &[T],
    ) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let mut mapping = self.map(device, offset, bytes.len() as u64)?;
        mapping.write(0, bytes);
        Ok(())
    }

    /// Release the backing allocation.
    ///
    /// The caller guarantees the GPU has finished with the resource (frame
    /// fence discipline). Non-owned wrappers only forget the handle.
    pub fn release(&mut self, device: &dyn Device) {
        if self.destroyed {
            return;
        }
        if self.owned {
            device.destroy_resource(self.raw);
        }
        // The persistent mapping dies with the allocation; dropping it here
        // makes later map/address calls fail instead of handing out a
        // dangling pointer.
        self.mapped = None;
        self.destroyed = true;
    }
}

impl Drop for GpuResource {
    fn drop(&mut self) {
        if self.owned && !self.destroyed {
            tracing::warn!(name = %self.name, "GPU resource dropped without release");
        }
    }
}

/// Exclusive CPU view over a byte range of a mapped resource.
///
/// Written ranges recorded through [`Mapping::write`] or
/// [`Mapping::mark_written`] are flushed as a hint when the guard drops.
pub struct Mapping<'a> {
    device: &'a dyn Device,
    resource: RawResource,
    range_offset: u64,
    bytes: &'a mut [u8],
    written: Option<(u64, u64)>,
}

impl Mapping<'_> {
    /// Read access to the mapped range.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.bytes
    }

    /// Write access to the mapped range. Writes made through the slice should
    /// be recorded with [`Mapping::mark_written`] to get flushed.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.bytes
    }

    /// Copy `data` to `offset` within the mapped range and record the write.
    ///
    /// # Panics
    /// Panics if the copy exceeds the mapped range.
    pub fn write(&mut self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        let end = start + data.len();
        self.bytes[start..end].copy_from_slice(data);
        self.mark_written(offset, data.len() as u64);
    }

    /// Record a range (relative to the mapping) as written.
    pub fn mark_written(&mut self, offset: u64, len: u64) {
        let start = self.range_offset + offset;
        let end = start + len;
        self.written = Some(match self.written {
            Some((s, e)) => (s.min(start), e.max(end)),
            None => (start, end),
        });
    }
}

impl Drop for Mapping<'_> {
    fn drop(&mut self) {
        if let Some((start, end)) = self.written {
            self.device.flush_mapped_range(self.resource, start, end - start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_desc_is_valid() {
        assert!(ResourceDesc::buffer(4096).validate().is_ok());
        assert!(ResourceDesc::buffer(256)
            .with_memory(MemoryLocation::CpuToGpu)
            .with_element_stride(64)
            .validate()
            .is_ok());
    }

    #[test]
    fn zero_sized_resources_are_rejected() {
        assert!(ResourceDesc::buffer(0).validate().is_err());
        assert!(ResourceDesc::texture_2d(0, 128, Format::Rgba8Unorm)
            .validate()
            .is_err());
    }

    #[test]
    fn buffers_reject_texture_attributes() {
        let mut desc = ResourceDesc::buffer(1024);
        desc.format = Format::Rgba8Unorm;
        assert!(desc.validate().is_err());

        assert!(ResourceDesc::buffer(1024).with_mip_levels(2).validate().is_err());
    }

    #[test]
    fn multisampling_limited_to_2d() {
        assert!(ResourceDesc::texture_2d(64, 64, Format::Rgba8Unorm)
            .with_sample_count(4)
            .validate()
            .is_ok());
        assert!(ResourceDesc::texture_3d(64, 64, 8, Format::Rgba8Unorm)
            .with_sample_count(4)
            .validate()
            .is_err());
    }

    #[test]
    fn mip_chain_bounded_by_extent() {
        // 256 supports at most 9 mips.
        assert!(ResourceDesc::texture_2d(256, 256, Format::Rgba8Unorm)
            .with_mip_levels(9)
            .validate()
            .is_ok());
        assert!(ResourceDesc::texture_2d(256, 256, Format::Rgba8Unorm)
            .with_mip_levels(10)
            .validate()
            .is_err());
    }

    #[test]
    fn clear_value_must_match_format_aspect() {
        assert!(ResourceDesc::texture_2d(64, 64, Format::Rgba8Unorm)
            .with_clear_value(ClearValue::Color([0.0; 4]))
            .validate()
            .is_ok());
        assert!(ResourceDesc::texture_2d(64, 64, Format::D32Float)
            .with_clear_value(ClearValue::Color([0.0; 4]))
            .validate()
            .is_err());
        assert!(ResourceDesc::texture_2d(64, 64, Format::D32Float)
            .with_clear_value(ClearValue::DepthStencil { depth: 1.0, stencil: 0 })
            .validate()
            .is_ok());
    }

    #[test]
    fn subresource_count_is_mips_times_layers() {
        let desc = ResourceDesc::texture_2d(128, 128, Format::Rgba8Unorm)
            .with_mip_levels(4)
            .with_array_layers(6);
        assert_eq!(desc.subresource_count(), 24);
        assert_eq!(ResourceDesc::buffer(64).subresource_count(), 1);
    }

    #[test]
    fn subresource_count_overflow_is_rejected() {
        let desc = ResourceDesc::texture_2d(1 << 16, 1, Format::Rgba8Unorm)
            .with_mip_levels(2)
            .with_array_layers(u32::MAX);
        assert!(desc.validate().is_err());
        // No panic even before validation.
        assert_eq!(desc.subresource_count(), u32::MAX);
    }
}
