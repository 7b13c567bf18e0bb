//! Headless test harness for the Cinder engine.
//!
//! Provides a recording [`cinder_gpu::Device`] implementation so the resource
//! and command layer can be exercised without real hardware.

pub mod harness;

pub use harness::{test_pipeline, DeviceCall, GpuHarness, RecordingDevice};

/// Install a test-friendly tracing subscriber, once per process.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
