//! Resource usage states.

use bitflags::bitflags;

bitflags! {
    /// Hardware-visible usage state of a GPU resource.
    ///
    /// States are flags because read-only usages may be combined (e.g. a
    /// texture readable from both pixel and non-pixel shader stages).
    /// Writable states are exclusive and must not be combined.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceState: u32 {
        /// Common/idle state, also the presentation state.
        const COMMON = 0;
        /// Readable as a vertex or constant buffer.
        const VERTEX_AND_CONSTANT_BUFFER = 1 << 0;
        /// Readable as an index buffer.
        const INDEX_BUFFER = 1 << 1;
        /// Writable as a render target.
        const RENDER_TARGET = 1 << 2;
        /// Read/write access from shaders.
        const UNORDERED_ACCESS = 1 << 3;
        /// Writable as a depth/stencil target.
        const DEPTH_WRITE = 1 << 4;
        /// Readable as a depth/stencil target.
        const DEPTH_READ = 1 << 5;
        /// Readable from non-pixel shader stages.
        const NON_PIXEL_SHADER_RESOURCE = 1 << 6;
        /// Readable from the pixel shader stage.
        const PIXEL_SHADER_RESOURCE = 1 << 7;
        /// Readable as indirect draw/dispatch arguments.
        const INDIRECT_ARGUMENT = 1 << 9;
        /// Destination of a copy operation.
        const COPY_DEST = 1 << 10;
        /// Source of a copy operation.
        const COPY_SOURCE = 1 << 11;
        /// Readable from any shader stage.
        const ALL_SHADER_RESOURCE = Self::NON_PIXEL_SHADER_RESOURCE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits();
        /// Union of every read-only state.
        const GENERIC_READ = Self::VERTEX_AND_CONSTANT_BUFFER.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::NON_PIXEL_SHADER_RESOURCE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits()
            | Self::INDIRECT_ARGUMENT.bits()
            | Self::COPY_SOURCE.bits();
        /// Presentation state (alias of `COMMON`).
        const PRESENT = 0;
    }
}

impl ResourceState {
    /// Whether every set flag is a read-only usage.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        !self.is_empty()
            && Self::GENERIC_READ.union(Self::DEPTH_READ).contains(self)
    }

    /// Whether the state grants any write access.
    #[must_use]
    pub fn is_writable(self) -> bool {
        self.intersects(Self::RENDER_TARGET | Self::UNORDERED_ACCESS | Self::DEPTH_WRITE | Self::COPY_DEST)
    }
}
