//! Command list lifecycle and recording.

use cinder_gpu::{
    CommandListType, DescriptorHeap, DescriptorHeapKind, DeviceError, Format, GpuError,
    GpuResource, MemoryLocation, ResourceDesc, ResourceState,
};
use cinder_test::{test_pipeline, DeviceCall, GpuHarness};

#[test]
fn pre_closed_lists_start_closed_and_reset_open() {
    let harness = GpuHarness::new();
    let (_allocator, mut list) = harness.closed_list(CommandListType::Graphics, None);
    assert!(!list.is_recording());

    list.reset(&harness.device, None, None).expect("reset");
    assert!(list.is_recording());
}

#[test]
#[should_panic(expected = "recording call on a closed")]
fn draws_on_a_closed_list_panic() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.closed_list(CommandListType::Graphics, None);
    list.draw(&harness.device, 3, 1, 0, 0);
}

#[test]
fn draws_succeed_after_reset() {
    let harness = GpuHarness::new();
    let pipeline = test_pipeline(1, false);
    let (allocator, mut list) = harness.closed_list(CommandListType::Graphics, None);

    list.reset(&harness.device, Some(&allocator), Some(&pipeline))
        .expect("reset");
    list.draw(&harness.device, 3, 1, 0, 0);
    list.draw_indexed(&harness.device, 6, 1, 0, 0, 0);
    list.dispatch(&harness.device, 8, 8, 1);

    assert_eq!(harness.device.count_calls(|c| matches!(c, DeviceCall::Draw { .. })), 1);
    assert_eq!(harness.device.count_calls(|c| matches!(c, DeviceCall::DrawIndexed { .. })), 1);
    assert_eq!(harness.device.count_calls(|c| matches!(c, DeviceCall::Dispatch { .. })), 1);
}

#[test]
fn close_requires_an_open_list() {
    let harness = GpuHarness::new();
    let (_allocator, mut list) = harness.recording_list(CommandListType::Graphics, None);

    list.close(&harness.device).expect("first close");
    assert!(!list.is_recording());
    assert!(matches!(
        list.close(&harness.device),
        Err(GpuError::InvalidState(_))
    ));
}

#[test]
fn reset_binds_the_pipelines_root_signature() {
    let harness = GpuHarness::new();
    let pipeline = test_pipeline(1, false);
    let (_allocator, mut list) = harness.closed_list(CommandListType::Graphics, None);
    assert!(list.bound_root_signature().is_none());

    list.reset(&harness.device, None, Some(&pipeline)).expect("reset");
    assert_eq!(list.bound_root_signature(), Some(pipeline.root_signature));
    assert_eq!(
        harness.device.count_calls(|c| matches!(
            c,
            DeviceCall::SetRootSignature { signature, .. } if *signature == pipeline.root_signature
        )),
        1
    );
}

#[test]
fn reset_remembers_allocator_and_pipeline() {
    let harness = GpuHarness::new();
    let pipeline = test_pipeline(1, false);
    let (allocator, mut list) = harness.closed_list(CommandListType::Graphics, Some(&pipeline));

    // Nothing freshly supplied: the previous bindings are reused.
    list.reset(&harness.device, None, None).expect("reset");
    assert_eq!(list.bound_allocator(), Some(allocator.raw()));
    assert_eq!(list.bound_pipeline(), Some(pipeline));
    assert_eq!(
        harness.device.count_calls(|c| matches!(
            c,
            DeviceCall::Reset { allocator: a, pipeline: Some(p), .. }
                if *a == allocator.raw() && *p == pipeline.raw
        )),
        1
    );
}

#[test]
fn reset_rejects_mismatched_allocator_types() {
    let harness = GpuHarness::new();
    let (_graphics_allocator, mut list) = harness.closed_list(CommandListType::Graphics, None);
    let transfer_allocator = harness
        .pool
        .request(&harness.device, CommandListType::Transfer)
        .expect("request");

    assert!(matches!(
        list.reset(&harness.device, Some(&transfer_allocator), None),
        Err(GpuError::InvalidArgument(_))
    ));
}

#[test]
fn reset_against_a_busy_allocator_fails() {
    let harness = GpuHarness::new();
    let (allocator, mut list) = harness.closed_list(CommandListType::Graphics, None);

    harness.device.mark_allocator_busy(allocator.raw());
    assert!(matches!(
        list.reset(&harness.device, None, None),
        Err(GpuError::Device(DeviceError::AllocatorInUse))
    ));
    assert!(!list.is_recording());

    harness.device.clear_allocator_busy(allocator.raw());
    list.reset(&harness.device, None, None).expect("reset");
    assert!(list.is_recording());
}

#[test]
fn failed_reset_leaves_bindings_untouched() {
    let harness = GpuHarness::new();
    let first = test_pipeline(1, false);
    let (allocator, mut list) = harness.closed_list(CommandListType::Graphics, Some(&first));
    let replacement = harness
        .pool
        .request(&harness.device, CommandListType::Graphics)
        .expect("request");
    let other = test_pipeline(2, false);

    harness.device.mark_allocator_busy(replacement.raw());
    assert!(matches!(
        list.reset(&harness.device, Some(&replacement), Some(&other)),
        Err(GpuError::Device(DeviceError::AllocatorInUse))
    ));

    // The rejected allocator and pipeline must not stick.
    assert!(!list.is_recording());
    assert_eq!(list.bound_allocator(), Some(allocator.raw()));
    assert_eq!(list.bound_pipeline(), Some(first));

    list.reset(&harness.device, None, None).expect("reset");
    assert_eq!(list.bound_allocator(), Some(allocator.raw()));
    assert_eq!(list.bound_pipeline(), Some(first));
}

#[test]
fn set_pipeline_rebinds_only_foreign_root_signatures() {
    let harness = GpuHarness::new();
    let first = test_pipeline(1, false);
    let mut sibling = test_pipeline(2, false);
    sibling.root_signature = first.root_signature;
    let other = test_pipeline(3, false);

    let (_allocator, mut list) = harness.recording_list(CommandListType::Graphics, Some(&first));
    let bound_signatures = || {
        harness
            .device
            .count_calls(|c| matches!(c, DeviceCall::SetRootSignature { .. }))
    };
    let after_create = bound_signatures();

    list.set_pipeline(&harness.device, &sibling);
    assert_eq!(bound_signatures(), after_create, "same signature is not re-bound");

    list.set_pipeline(&harness.device, &other);
    assert_eq!(bound_signatures(), after_create + 1);
    assert_eq!(list.bound_root_signature(), Some(other.root_signature));
}

#[test]
fn descriptor_binding_goes_through_shader_visible_heaps() {
    let harness = GpuHarness::new();
    let pipeline = test_pipeline(1, false);
    let (_allocator, list) = harness.recording_list(CommandListType::Graphics, Some(&pipeline));

    let visible =
        DescriptorHeap::create(&harness.device, DescriptorHeapKind::Resource, 8, true).unwrap();
    let staging =
        DescriptorHeap::create(&harness.device, DescriptorHeapKind::Resource, 8, false).unwrap();

    assert!(matches!(
        list.set_descriptor_heaps(&harness.device, &[&staging]),
        Err(GpuError::InvalidArgument(_))
    ));
    list.set_descriptor_heaps(&harness.device, &[&visible]).expect("bind heaps");

    let table = visible.allocate(4).expect("table");
    list.set_root_table(&harness.device, 0, &table).expect("bind table");
    assert_eq!(
        harness.device.count_calls(|c| matches!(
            c,
            DeviceCall::SetRootTable { slot: 0, compute: false, .. }
        )),
        1
    );

    let cpu_table = staging.allocate(4).expect("table");
    assert!(matches!(
        list.set_root_table(&harness.device, 1, &cpu_table),
        Err(GpuError::InvalidArgument(_))
    ));
}

#[test]
fn root_tables_follow_the_compute_flag() {
    let harness = GpuHarness::new();
    let pipeline = test_pipeline(1, true);
    let (_allocator, list) = harness.recording_list(CommandListType::Compute, Some(&pipeline));

    let visible =
        DescriptorHeap::create(&harness.device, DescriptorHeapKind::Resource, 8, true).unwrap();
    let table = visible.allocate(2).expect("table");
    list.set_root_table(&harness.device, 3, &table).expect("bind table");
    assert_eq!(
        harness.device.count_calls(|c| matches!(
            c,
            DeviceCall::SetRootTable { slot: 3, compute: true, .. }
        )),
        1
    );
}

#[test]
fn buffer_copies_are_bounds_checked() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.recording_list(CommandListType::Transfer, None);

    let src = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::buffer(128).with_memory(MemoryLocation::CpuToGpu),
        ResourceState::GENERIC_READ,
        "staging",
    )
    .unwrap();
    let dst = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::buffer(64),
        ResourceState::COPY_DEST,
        "device-local",
    )
    .unwrap();

    assert!(matches!(
        list.copy_buffer(&harness.device, &src, 0, &dst, 0, 128),
        Err(GpuError::InvalidArgument(_))
    ));
    list.copy_buffer(&harness.device, &src, 64, &dst, 0, 64).expect("copy");
    assert_eq!(
        harness.device.count_calls(|c| matches!(
            c,
            DeviceCall::CopyBuffer { src_offset: 64, dst_offset: 0, len: 64, .. }
        )),
        1
    );
}

#[test]
fn whole_resource_copies_need_matching_shapes() {
    let harness = GpuHarness::new();
    let (_allocator, list) = harness.recording_list(CommandListType::Graphics, None);

    let a = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::texture_2d(128, 128, Format::Rgba8Unorm),
        ResourceState::COPY_SOURCE,
        "a",
    )
    .unwrap();
    let b = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::texture_2d(128, 128, Format::Rgba8Unorm),
        ResourceState::COPY_DEST,
        "b",
    )
    .unwrap();
    let small = GpuResource::create_committed(
        &harness.device,
        ResourceDesc::texture_2d(64, 64, Format::Rgba8Unorm),
        ResourceState::COPY_DEST,
        "small",
    )
    .unwrap();

    list.copy_resource(&harness.device, &a, &b).expect("copy");
    assert!(matches!(
        list.copy_resource(&harness.device, &a, &small),
        Err(GpuError::InvalidArgument(_))
    ));
}

#[test]
fn recording_lists_are_open_immediately() {
    let harness = GpuHarness::new();
    let (_allocator, mut list) = harness.recording_list(CommandListType::Graphics, None);
    assert!(list.is_recording());

    // Resetting an open list discards and re-opens; no close in between.
    list.reset(&harness.device, None, None).expect("reset");
    assert!(list.is_recording());
}
