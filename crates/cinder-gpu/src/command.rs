//! Command-list recording wrapper.
//!
//! A [`CommandList`] owns one recording context and tracks its open/closed
//! state together with the allocator, pipeline and root signature bound at
//! the last reset, so steady-state reuse is a plain `reset()`.

use crate::allocator::CommandAllocator;
use crate::descriptors::DescriptorRange;
use crate::device::{Device, RawCommandAllocator, RawCommandList, RawPipeline, RawRootSignature};
use crate::error::{GpuError, Result};
use crate::resource::{GpuResource, ResourceDimension};

/// Kind of GPU work a list records, matching the queue that consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandListType {
    /// Full graphics work (draws, dispatches, copies).
    Graphics,
    /// Compute and copy work only.
    Compute,
    /// Copy work only.
    Transfer,
}

impl CommandListType {
    /// Number of list types.
    pub(crate) const COUNT: usize = 3;

    /// Dense index for per-type tables.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Graphics => 0,
            Self::Compute => 1,
            Self::Transfer => 2,
        }
    }
}

/// Compiled pipeline state plus the root signature it was built against.
///
/// Compilation is an external collaborator's job; this layer only carries the
/// handles so a reset can re-bind the matching root signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    /// Pipeline state handle.
    pub raw: RawPipeline,
    /// Root signature the pipeline was compiled against.
    pub root_signature: RawRootSignature,
    /// Whether this is a compute pipeline.
    pub compute: bool,
}

/// One recording context with lifecycle tracking.
#[derive(Debug)]
pub struct CommandList {
    raw: RawCommandList,
    list_type: CommandListType,
    recording: bool,
    allocator: Option<RawCommandAllocator>,
    pipeline: Option<Pipeline>,
    root_signature: Option<RawRootSignature>,
}

impl CommandList {
    fn create(
        device: &dyn Device,
        list_type: CommandListType,
        allocator: &CommandAllocator,
        pipeline: Option<&Pipeline>,
    ) -> Result<Self> {
        if allocator.list_type() != list_type {
            return Err(GpuError::InvalidArgument(format!(
                "allocator of type {:?} cannot back a {list_type:?} list",
                allocator.list_type()
            )));
        }

        let raw = device.create_command_list(list_type, allocator.raw(), pipeline.map(|p| p.raw))?;
        let mut list = Self {
            raw,
            list_type,
            recording: true,
            allocator: Some(allocator.raw()),
            pipeline: pipeline.copied(),
            root_signature: None,
        };
        if let Some(pipeline) = list.pipeline {
            list.bind_root_signature(device, pipeline);
        }
        Ok(list)
    }

    /// Create a list and leave it open for immediate recording.
    pub fn create_recording(
        device: &dyn Device,
        list_type: CommandListType,
        allocator: &CommandAllocator,
        pipeline: Option<&Pipeline>,
    ) -> Result<Self> {
        Self::create(device, list_type, allocator, pipeline)
    }

    /// Create a list and close it immediately.
    ///
    /// This matches the pooling steady state where the first real use is a
    /// [`CommandList::reset`].
    pub fn create_closed(
        device: &dyn Device,
        list_type: CommandListType,
        allocator: &CommandAllocator,
        pipeline: Option<&Pipeline>,
    ) -> Result<Self> {
        let mut list = Self::create(device, list_type, allocator, pipeline)?;
        list.close(device)?;
        Ok(list)
    }

    /// The raw recording handle.
    #[must_use]
    pub fn raw(&self) -> RawCommandList {
        self.raw
    }

    /// The list type.
    #[must_use]
    pub fn list_type(&self) -> CommandListType {
        self.list_type
    }

    /// Whether the list is currently open for recording.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The allocator bound at the last creation or reset.
    #[must_use]
    pub fn bound_allocator(&self) -> Option<RawCommandAllocator> {
        self.allocator
    }

    /// The pipeline bound at the last creation or reset.
    #[must_use]
    pub fn bound_pipeline(&self) -> Option<Pipeline> {
        self.pipeline
    }

    /// The root signature currently bound.
    #[must_use]
    pub fn bound_root_signature(&self) -> Option<RawRootSignature> {
        self.root_signature
    }

    /// Re-open the list for recording.
    ///
    /// `allocator` and `pipeline` default to the ones remembered from the
    /// previous reset (or creation) when not supplied. Whenever a pipeline is
    /// in effect, its root signature is re-bound before returning. Resetting
    /// an open list discards its unsubmitted commands.
    ///
    /// Fails if the underlying allocator still backs unretired GPU work
    /// (reported by the device as [`crate::DeviceError::AllocatorInUse`]).
    pub fn reset(
        &mut self,
        device: &dyn Device,
        allocator: Option<&CommandAllocator>,
        pipeline: Option<&Pipeline>,
    ) -> Result<()> {
        if let Some(allocator) = allocator {
            if allocator.list_type() != self.list_type {
                return Err(GpuError::InvalidArgument(format!(
                    "allocator of type {:?} cannot back a {:?} list",
                    allocator.list_type(),
                    self.list_type
                )));
            }
        }
        // Stage the new bindings; a failed reset must leave the list
        // observably unchanged.
        let next_allocator = allocator
            .map(|a| a.raw())
            .or(self.allocator)
            .ok_or_else(|| {
                GpuError::InvalidState("command list has no allocator to reset against".into())
            })?;
        let next_pipeline = pipeline.copied().or(self.pipeline);

        device.cmd_reset(self.raw, next_allocator, next_pipeline.map(|p| p.raw))?;
        self.allocator = Some(next_allocator);
        self.pipeline = next_pipeline;
        self.recording = true;
        self.root_signature = None;
        if let Some(pipeline) = self.pipeline {
            self.bind_root_signature(device, pipeline);
        }
        Ok(())
    }

    /// End recording so the list can be submitted.
    pub fn close(&mut self, device: &dyn Device) -> Result<()> {
        if !self.recording {
            return Err(GpuError::InvalidState(
                "close called on a command list that is not recording".into(),
            ));
        }
        device.cmd_close(self.raw)?;
        self.recording = false;
        Ok(())
    }

    fn bind_root_signature(&mut self, device: &dyn Device, pipeline: Pipeline) {
        device.cmd_set_root_signature(self.raw, pipeline.root_signature, pipeline.compute);
        self.root_signature = Some(pipeline.root_signature);
    }

    fn require_open(&self) {
        assert!(
            self.recording,
            "recording call on a closed {:?} command list",
            self.list_type
        );
    }

    /// Bind a pipeline, re-binding its root signature if it differs from the
    /// one currently bound.
    pub fn set_pipeline(&mut self, device: &dyn Device, pipeline: &Pipeline) {
        self.require_open();
        device.cmd_set_pipeline(self.raw, pipeline.raw);
        if self.root_signature != Some(pipeline.root_signature) {
            self.bind_root_signature(device, *pipeline);
        }
        self.pipeline = Some(*pipeline);
    }

    /// Bind shader-visible descriptor heaps for subsequent draws/dispatches.
    pub fn set_descriptor_heaps(
        &self,
        device: &dyn Device,
        heaps: &[&crate::descriptors::DescriptorHeap],
    ) -> Result<()> {
        self.require_open();
        for heap in heaps {
            if !heap.is_shader_visible() {
                return Err(GpuError::InvalidArgument(format!(
                    "{:?} heap is not shader-visible and cannot be bound",
                    heap.kind()
                )));
            }
        }
        let raw: Vec<_> = heaps.iter().map(|h| h.raw()).collect();
        device.cmd_set_descriptor_heaps(self.raw, &raw);
        Ok(())
    }

    /// Point root-table `slot` at the start of `range`.
    pub fn set_root_table(
        &self,
        device: &dyn Device,
        slot: u32,
        range: &DescriptorRange<'_>,
    ) -> Result<()> {
        self.require_open();
        let base = range.gpu_handle().ok_or_else(|| {
            GpuError::InvalidArgument(
                "root table ranges must live in a shader-visible heap".into(),
            )
        })?;
        let compute = self.pipeline.is_some_and(|p| p.compute);
        device.cmd_set_root_table(self.raw, slot, base, compute);
        Ok(())
    }

    /// Record a non-indexed draw.
    pub fn draw(
        &self,
        device: &dyn Device,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.require_open();
        device.cmd_draw(self.raw, vertex_count, instance_count, first_vertex, first_instance);
    }

    /// Record an indexed draw.
    pub fn draw_indexed(
        &self,
        device: &dyn Device,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.require_open();
        device.cmd_draw_indexed(
            self.raw,
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
    }

    /// Record a compute dispatch.
    pub fn dispatch(&self, device: &dyn Device, x: u32, y: u32, z: u32) {
        self.require_open();
        device.cmd_dispatch(self.raw, x, y, z);
    }

    /// Record a byte-range copy between two buffers.
    pub fn copy_buffer(
        &self,
        device: &dyn Device,
        src: &GpuResource,
        src_offset: u64,
        dst: &GpuResource,
        dst_offset: u64,
        len: u64,
    ) -> Result<()> {
        self.require_open();
        if src.desc().dimension != ResourceDimension::Buffer
            || dst.desc().dimension != ResourceDimension::Buffer
        {
            return Err(GpuError::InvalidArgument(
                "copy_buffer requires buffer resources".into(),
            ));
        }
        let src_end = src_offset.checked_add(len).filter(|&e| e <= src.size());
        let dst_end = dst_offset.checked_add(len).filter(|&e| e <= dst.size());
        if src_end.is_none() || dst_end.is_none() {
            return Err(GpuError::InvalidArgument(format!(
                "copy of {len} bytes exceeds '{}' or '{}'",
                src.name(),
                dst.name()
            )));
        }
        device.cmd_copy_buffer(self.raw, src.raw(), src_offset, dst.raw(), dst_offset, len);
        Ok(())
    }

    /// Record a whole-resource copy between identically shaped resources.
    pub fn copy_resource(
        &self,
        device: &dyn Device,
        src: &GpuResource,
        dst: &GpuResource,
    ) -> Result<()> {
        self.require_open();
        let (s, d) = (src.desc(), dst.desc());
        let same_shape = s.dimension == d.dimension
            && s.width == d.width
            && s.height == d.height
            && s.depth == d.depth
            && s.array_layers == d.array_layers
            && s.mip_levels == d.mip_levels
            && s.format == d.format;
        if !same_shape {
            return Err(GpuError::InvalidArgument(format!(
                "copy_resource requires matching shapes ('{}' vs '{}')",
                src.name(),
                dst.name()
            )));
        }
        device.cmd_copy_resource(self.raw, src.raw(), dst.raw());
        Ok(())
    }

    /// Release the recording context.
    pub fn destroy(&self, device: &dyn Device) {
        device.destroy_command_list(self.raw);
    }
}
