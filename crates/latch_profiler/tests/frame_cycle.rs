//! Whole-frame tests through the public API.

use latch_profiler::{
    BackendScope, BlockType, GpuMemory, PollState, Profiler, ProfilerSettings, QueryBackend,
    QueryError, QueryHandle, QueryKind, SimulatedQueryBackend,
};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

fn profiler() -> Profiler {
    Profiler::new(&ProfilerSettings {
        enabled: true,
        update_interval_sec: 0.0,
        ..Default::default()
    })
}

fn run_frame(profiler: &mut Profiler, record: impl FnOnce(&mut Profiler)) {
    profiler.pre_update(FRAME);
    record(profiler);
    profiler.post_update();
    profiler.on_present();
}

fn record_gpu_passes(profiler: &mut Profiler) {
    let mut render = profiler.scope("Render", BlockType::Cpu);
    {
        let _shadows = render.gpu_scope("Shadows", BackendScope(1));
    }
    {
        let _lighting = render.gpu_scope("Lighting", BackendScope(1));
    }
}

/// Wraps the simulated backend so a test can flip failures and count releases
/// after the profiler owns it.
struct SharedBackend {
    inner: SimulatedQueryBackend,
    fail_readback: Rc<Cell<bool>>,
    releases: Rc<Cell<u32>>,
}

impl QueryBackend for SharedBackend {
    fn query_create(&mut self, kind: QueryKind) -> Result<QueryHandle, QueryError> {
        self.inner.query_create(kind)
    }

    fn query_begin(&mut self, handle: QueryHandle) -> Result<(), QueryError> {
        self.inner.query_begin(handle)
    }

    fn query_end(&mut self, handle: QueryHandle) -> Result<(), QueryError> {
        self.inner.query_end(handle)
    }

    fn query_get_data(&mut self, handle: QueryHandle) -> Result<bool, QueryError> {
        self.inner.fail_readback(self.fail_readback.get());
        self.inner.query_get_data(handle)
    }

    fn query_release(&mut self, handle: QueryHandle) {
        self.releases.set(self.releases.get() + 1);
        self.inner.query_release(handle);
    }

    fn timestamp_pair(
        &mut self,
        handle: QueryHandle,
        scope: Option<BackendScope>,
        pass_index: u32,
    ) -> Result<(), QueryError> {
        self.inner.timestamp_pair(handle, scope, pass_index)
    }

    fn resolved_duration_ms(&self, handle: QueryHandle, pass_index: u32) -> Option<f32> {
        self.inner.resolved_duration_ms(handle, pass_index)
    }
}

#[test]
fn test_update_physics_scenario() {
    let mut profiler = profiler();

    profiler.pre_update(FRAME);
    assert!(profiler.is_polled_frame());
    profiler.block_start("Update", BlockType::Cpu, None);
    profiler.block_start("Physics", BlockType::Cpu, None);
    profiler.block_end();
    profiler.block_end();
    profiler.post_update();
    profiler.on_present();

    let blocks = profiler.time_blocks();
    assert_eq!(blocks.len(), 2);

    let update = &blocks[0];
    assert_eq!(update.name(), "Update");
    assert_eq!(update.tree_depth(), 0);

    let physics = &blocks[1];
    assert_eq!(physics.name(), "Physics");
    assert_eq!(physics.tree_depth(), 1);
    assert_eq!(profiler.parent_of(physics).map(|b| b.name()), Some("Update"));

    assert_eq!(profiler.cpu_time_last(), update.duration_ms().unwrap());
}

#[test]
fn test_read_buffer_is_stable_between_polls() {
    let mut profiler = Profiler::new(&ProfilerSettings {
        enabled: true,
        update_interval_sec: 0.1,
        ..Default::default()
    });

    run_frame(&mut profiler, |p| {
        p.time_block("Update", BlockType::Cpu, |_| {});
    });
    assert_eq!(profiler.time_blocks().len(), 1);

    // Non-polled frames record nothing and leave the snapshot alone.
    for _ in 0..3 {
        run_frame(&mut profiler, |p| {
            assert!(!p.block_start("Update", BlockType::Cpu, None));
        });
        assert_eq!(profiler.poll_state(), PollState::NotPolled);
        assert_eq!(profiler.time_blocks().len(), 1);
    }
}

#[test]
fn test_gpu_durations_resolve_next_poll() {
    let mut backend = SimulatedQueryBackend::new(0);
    backend.set_pass_duration_ms(0, 2.0);
    backend.set_pass_duration_ms(2, 3.0);

    let mut profiler = profiler();
    profiler.attach_query_backend(Box::new(backend)).unwrap();

    run_frame(&mut profiler, record_gpu_passes);
    let blocks = profiler.time_blocks();
    assert_eq!(blocks[1].gpu_pass_index(), Some(0));
    assert_eq!(blocks[2].gpu_pass_index(), Some(2));
    assert_eq!(blocks[1].duration_ms(), None);
    assert_eq!(profiler.gpu().sample_count(), 0);

    run_frame(&mut profiler, record_gpu_passes);
    let blocks = profiler.time_blocks();
    assert_eq!(blocks[1].name(), "Shadows");
    assert_eq!(blocks[1].duration_ms(), Some(2.0));
    assert_eq!(blocks[2].duration_ms(), Some(3.0));
    // GPU blocks are roots of the GPU tree even inside a CPU block.
    assert_eq!(profiler.gpu_time_last(), 5.0);
    assert_eq!(profiler.cpu().sample_count(), 2);
}

#[test]
fn test_gpu_latency_frames() {
    let mut profiler = profiler();
    profiler
        .attach_query_backend(Box::new(SimulatedQueryBackend::new(1)))
        .unwrap();

    run_frame(&mut profiler, record_gpu_passes);
    run_frame(&mut profiler, record_gpu_passes);
    assert_eq!(profiler.time_blocks()[1].duration_ms(), None);

    run_frame(&mut profiler, record_gpu_passes);
    assert_eq!(profiler.time_blocks()[1].duration_ms(), Some(1.0));
    assert_eq!(profiler.gpu_time_last(), 2.0);
}

#[test]
fn test_readback_failure_skips_gpu_aggregates() {
    let fail_readback = Rc::new(Cell::new(false));
    let backend = SharedBackend {
        inner: SimulatedQueryBackend::new(0),
        fail_readback: Rc::clone(&fail_readback),
        releases: Rc::new(Cell::new(0)),
    };

    let mut profiler = profiler();
    profiler.attach_query_backend(Box::new(backend)).unwrap();
    run_frame(&mut profiler, record_gpu_passes);
    run_frame(&mut profiler, record_gpu_passes);
    assert_eq!(profiler.gpu().sample_count(), 1);

    fail_readback.set(true);
    run_frame(&mut profiler, record_gpu_passes);
    assert_eq!(profiler.gpu().sample_count(), 1);
    assert_eq!(profiler.time_blocks()[1].duration_ms(), None);
    assert_eq!(profiler.diagnostics().backend_failures, 1);
    // CPU side keeps going.
    assert_eq!(profiler.cpu().sample_count(), 3);

    fail_readback.set(false);
    run_frame(&mut profiler, record_gpu_passes);
    assert_eq!(profiler.gpu().sample_count(), 2);
}

#[test]
fn test_attach_failure_degrades() {
    let mut backend = SimulatedQueryBackend::new(0);
    backend.fail_create(true);

    let mut profiler = profiler();
    let err = profiler.attach_query_backend(Box::new(backend)).unwrap_err();
    assert_eq!(
        err,
        QueryError::CreateFailed {
            kind: QueryKind::Timestamp
        }
    );
    assert!(!profiler.has_query_backend());

    run_frame(&mut profiler, record_gpu_passes);
    let blocks = profiler.time_blocks();
    assert_eq!(blocks.len(), 3);
    assert!(blocks[1].is_complete());
    assert_eq!(blocks[1].duration_ms(), None);
    assert_eq!(profiler.diagnostics().backend_failures, 1);
}

#[test]
fn test_device_metrics() {
    let mut backend = SimulatedQueryBackend::new(0).with_device_info("Simulated GPU", "1.0");
    backend.set_memory_usage(512, 4096);

    let mut profiler = profiler();
    profiler.attach_query_backend(Box::new(backend)).unwrap();
    run_frame(&mut profiler, |_| {});

    assert_eq!(
        profiler.gpu_device_info().map(|info| info.name.as_str()),
        Some("Simulated GPU")
    );
    assert_eq!(
        profiler.gpu_memory(),
        Some(GpuMemory {
            used_mb: 512,
            available_mb: 4096
        })
    );
}

#[test]
fn test_query_released_on_drop() {
    let releases = Rc::new(Cell::new(0));
    let backend = SharedBackend {
        inner: SimulatedQueryBackend::new(0),
        fail_readback: Rc::new(Cell::new(false)),
        releases: Rc::clone(&releases),
    };

    let mut profiler = profiler();
    profiler.attach_query_backend(Box::new(backend)).unwrap();
    run_frame(&mut profiler, record_gpu_passes);
    drop(profiler);

    assert_eq!(releases.get(), 1);
}

#[test]
fn test_growth_then_full_capacity() {
    let mut profiler = Profiler::new(&ProfilerSettings {
        enabled: true,
        update_interval_sec: 0.0,
        initial_capacity: 4,
        ..Default::default()
    });

    run_frame(&mut profiler, |p| {
        for _ in 0..6 {
            p.time_block("Job", BlockType::Cpu, |_| {});
        }
    });
    assert_eq!(profiler.time_blocks().len(), 4);
    assert_eq!(profiler.diagnostics().dropped_blocks, 2);

    run_frame(&mut profiler, |p| {
        assert_eq!(p.capacity(), 8);
        for _ in 0..8 {
            p.time_block("Job", BlockType::Cpu, |_| {});
        }
    });
    assert_eq!(profiler.time_blocks().len(), 8);
    assert_eq!(profiler.diagnostics().dropped_blocks, 2);
    assert_eq!(profiler.diagnostics().growth_events, 1);
}

#[test]
fn test_settings_from_json() {
    let settings = ProfilerSettings::from_json_str(
        r#"{ "enabled": true, "update_interval_sec": 0.9, "gpu_enabled": false }"#,
    )
    .unwrap();
    let mut profiler = Profiler::new(&settings);

    assert!(profiler.is_enabled());
    assert!(!profiler.gpu_enabled());
    assert_eq!(profiler.update_interval(), 0.5);

    run_frame(&mut profiler, |p| {
        assert!(!p.block_start("Shadows", BlockType::Gpu, None));
    });
}
