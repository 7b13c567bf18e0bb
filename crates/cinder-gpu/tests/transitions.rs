//! Resource state tracking and barrier emission.

use cinder_gpu::{
    CommandListType, DeviceError, Format, GpuError, GpuResource, MemoryLocation, ResourceDesc,
    ResourcePool, ResourceState, StateRequest,
};
use cinder_test::GpuHarness;

fn render_target(harness: &GpuHarness, name: &str) -> GpuResource {
    let desc = ResourceDesc::texture_2d(256, 256, Format::Rgba8Unorm);
    GpuResource::create_committed(&harness.device, desc, ResourceState::COMMON, name)
        .expect("resource creation")
}

#[test]
fn initial_state_is_visible_after_creation() {
    let harness = GpuHarness::new();
    let resource = render_target(&harness, "target");
    assert_eq!(resource.state(), ResourceState::COMMON);
    assert_eq!(harness.device.barrier_count(), 0);
}

#[test]
fn render_target_walkthrough_emits_minimal_barriers() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.recording_list(CommandListType::Graphics, None);
    let mut target = render_target(&harness, "target");

    assert!(target.as_render_target(&harness.device, &list));
    assert_eq!(target.state(), ResourceState::RENDER_TARGET);
    assert_eq!(harness.device.barrier_count(), 1);

    assert!(target.as_shader_resource(&harness.device, &list));
    assert_eq!(harness.device.barrier_count(), 2);

    // Already shader-readable: elided.
    assert!(!target.as_shader_resource(&harness.device, &list));
    assert_eq!(harness.device.barrier_count(), 2);
}

#[test]
fn barriers_carry_the_tracked_before_state() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.recording_list(CommandListType::Graphics, None);
    let mut target = render_target(&harness, "target");

    target.as_render_target(&harness.device, &list);
    target.as_copy_dest(&harness.device, &list);

    let batches = harness.device.barrier_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0][0].before, ResourceState::COMMON);
    assert_eq!(batches[0][0].after, ResourceState::RENDER_TARGET);
    assert_eq!(batches[1][0].before, ResourceState::RENDER_TARGET);
    assert_eq!(batches[1][0].after, ResourceState::COPY_DEST);
}

#[test]
fn subresource_transition_narrows_the_barrier() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.recording_list(CommandListType::Graphics, None);
    let desc = ResourceDesc::texture_2d(256, 256, Format::Rgba8Unorm).with_mip_levels(4);
    let mut texture =
        GpuResource::create_committed(&harness.device, desc, ResourceState::COMMON, "mipped")
            .expect("resource creation");

    texture.set_state_subresource(
        &harness.device,
        &list,
        ResourceState::COPY_DEST,
        Some(2),
    );
    let batches = harness.device.barrier_batches();
    assert_eq!(batches[0][0].subresource, Some(2));
    assert_eq!(texture.state(), ResourceState::COPY_DEST);
}

#[test]
#[should_panic(expected = "closed command list")]
fn transition_on_a_closed_list_panics() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.closed_list(CommandListType::Graphics, None);
    let mut target = render_target(&harness, "target");
    target.as_render_target(&harness.device, &list);
}

#[test]
fn batch_transition_uses_one_submission() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.recording_list(CommandListType::Graphics, None);

    let mut pool = ResourcePool::new();
    let a = pool.insert(render_target(&harness, "a"));
    let b = pool.insert(render_target(&harness, "b"));
    let c = pool.insert(render_target(&harness, "c"));

    let recorded = pool
        .transition_all(
            &harness.device,
            &list,
            &[
                StateRequest::new(a, ResourceState::RENDER_TARGET),
                StateRequest::new(b, ResourceState::COPY_DEST),
                StateRequest::new(c, ResourceState::ALL_SHADER_RESOURCE),
            ],
        )
        .expect("batch transition");

    assert_eq!(recorded, 3);
    let batches = harness.device.barrier_batches();
    assert_eq!(batches.len(), 1, "one driver submission for the whole batch");
    assert_eq!(batches[0].len(), 3);
}

#[test]
fn batch_transition_elides_redundant_entries() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.recording_list(CommandListType::Graphics, None);

    let mut pool = ResourcePool::new();
    let a = pool.insert(render_target(&harness, "a"));
    let b = pool.insert(render_target(&harness, "b"));

    // `a` is already at the target going in.
    pool.get_mut(a)
        .unwrap()
        .as_render_target(&harness.device, &list);
    let before = harness.device.barrier_count();

    let recorded = pool
        .transition_all(
            &harness.device,
            &list,
            &[
                StateRequest::new(a, ResourceState::RENDER_TARGET),
                StateRequest::new(b, ResourceState::RENDER_TARGET),
            ],
        )
        .expect("batch transition");

    assert_eq!(recorded, 1, "already-current entries are skipped");
    assert_eq!(harness.device.barrier_count(), before + 1);
    assert_eq!(pool.get(a).unwrap().state(), ResourceState::RENDER_TARGET);
    assert_eq!(pool.get(b).unwrap().state(), ResourceState::RENDER_TARGET);
}

#[test]
fn batch_transition_rejects_stale_handles() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.recording_list(CommandListType::Graphics, None);

    let mut pool = ResourcePool::new();
    let handle = pool.insert(render_target(&harness, "a"));
    pool.remove(handle).unwrap().release(&harness.device);

    let result = pool.transition_all(
        &harness.device,
        &list,
        &[StateRequest::new(handle, ResourceState::COPY_DEST)],
    );
    assert!(matches!(result, Err(GpuError::InvalidArgument(_))));
    assert_eq!(harness.device.barrier_count(), 0);
}

#[test]
fn invalid_descriptors_fail_creation() {
    let harness = GpuHarness::new();
    let multisampled_volume = ResourceDesc::texture_3d(64, 64, 8, Format::Rgba8Unorm)
        .with_sample_count(4);
    let result = GpuResource::create_committed(
        &harness.device,
        multisampled_volume,
        ResourceState::COMMON,
        "bad",
    );
    assert!(matches!(result, Err(GpuError::Creation(_))));
}

#[test]
fn device_memory_exhaustion_propagates() {
    let harness = GpuHarness::new();
    harness.device.fail_next_create(DeviceError::OutOfMemory);
    let result = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::buffer(1 << 20),
        ResourceState::COMMON,
        "big",
    );
    assert!(matches!(
        result,
        Err(GpuError::Device(DeviceError::OutOfMemory))
    ));
}

#[test]
fn write_data_reaches_host_memory_and_flushes() {
    let harness = GpuHarness::new();
    let desc = ResourceDesc::buffer(64).with_memory(MemoryLocation::CpuToGpu);
    let mut buffer = GpuResource::create_committed(
        &harness.device,
        desc,
        ResourceState::GENERIC_READ,
        "upload",
    )
    .expect("resource creation");

    let payload: [u32; 4] = [1, 2, 3, 4];
    buffer
        .write_data(&harness.device, 16, &payload[..])
        .expect("mapped write");

    let memory = harness.device.host_memory(buffer.raw()).unwrap();
    assert_eq!(&memory[16..32], bytemuck::cast_slice::<u32, u8>(&payload[..]));
    assert_eq!(
        harness.device.count_calls(|call| matches!(
            call,
            cinder_test::DeviceCall::FlushMappedRange { offset: 16, len: 16, .. }
        )),
        1
    );
}

#[test]
fn mapping_rejects_gpu_only_and_out_of_range() {
    let harness = GpuHarness::new();
    let mut gpu_only = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::buffer(64),
        ResourceState::COMMON,
        "gpu-only",
    )
    .expect("resource creation");
    assert!(matches!(
        gpu_only.map(&harness.device, 0, 16),
        Err(GpuError::Map(_))
    ));

    let mut upload = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::buffer(64).with_memory(MemoryLocation::CpuToGpu),
        ResourceState::GENERIC_READ,
        "upload",
    )
    .expect("resource creation");
    assert!(matches!(
        upload.map(&harness.device, 32, 64),
        Err(GpuError::Map(_))
    ));
    assert!(upload.map(&harness.device, 32, 32).is_ok());
}

#[test]
fn released_resources_cannot_be_mapped() {
    let harness = GpuHarness::new();
    let mut buffer = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::buffer(64).with_memory(MemoryLocation::CpuToGpu),
        ResourceState::GENERIC_READ,
        "upload",
    )
    .expect("resource creation");

    buffer.release(&harness.device);
    assert!(harness.device.host_memory(buffer.raw()).is_none());

    // The backing allocation is gone; every CPU-access path must refuse.
    assert!(matches!(
        buffer.map(&harness.device, 0, 16),
        Err(GpuError::Map(_))
    ));
    assert!(matches!(buffer.cpu_address(0), Err(GpuError::Map(_))));
    assert!(matches!(
        buffer.write_data(&harness.device, 0, &[0_u32][..]),
        Err(GpuError::Map(_))
    ));
}

#[test]
fn packed_element_addresses_step_by_stride() {
    let harness = GpuHarness::new();
    let desc = ResourceDesc::buffer(1024)
        .with_memory(MemoryLocation::CpuToGpu)
        .with_element_stride(256);
    let buffer = GpuResource::create_committed(
        &harness.device,
        desc,
        ResourceState::GENERIC_READ,
        "constants",
    )
    .expect("resource creation");

    let base = buffer.gpu_address(0);
    assert_eq!(buffer.gpu_address(2), base + 512);

    let cpu_base = buffer.cpu_address(0).unwrap();
    let cpu_third = buffer.cpu_address(3).unwrap();
    assert_eq!(
        cpu_third.as_ptr() as usize - cpu_base.as_ptr() as usize,
        768
    );
    assert!(buffer.cpu_address(4).is_err(), "element 4 starts past the end");
}

#[test]
fn release_destroys_owned_resources_only() {
    let harness = GpuHarness::new();
    let mut owned = render_target(&harness, "owned");
    let raw = owned.raw();
    owned.release(&harness.device);
    assert_eq!(
        harness
            .device
            .count_calls(|call| matches!(call, cinder_test::DeviceCall::DestroyResource(r) if *r == raw)),
        1
    );

    let mut imported =
        GpuResource::from_swapchain(cinder_gpu::RawResource(999), 256, 256, Format::Bgra8Unorm, "backbuffer");
    assert_eq!(imported.state(), ResourceState::PRESENT);
    imported.release(&harness.device);
    assert_eq!(
        harness
            .device
            .count_calls(|call| matches!(call, cinder_test::DeviceCall::DestroyResource(r) if r.0 == 999)),
        0,
        "imported surfaces are not owned"
    );
}
