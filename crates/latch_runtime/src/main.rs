//! Latch Engine Runtime
//!
//! Drives a simulated frame loop through the profiler and logs what it resolves.
//!
//! Usage: `latch [settings.json]`

use anyhow::{Context, Result};
use latch_metrics::FrameTimer;
use latch_profiler::{
    BackendScope, BlockType, PollState, Profiler, ProfilerSettings, SimulatedQueryBackend,
};
use std::time::Duration;

const FRAME_COUNT: u32 = 120;
const MAIN_COMMAND_LIST: BackendScope = BackendScope(0);

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => ProfilerSettings::load(&path)
            .with_context(|| format!("loading profiler settings from {path}"))?,
        None => ProfilerSettings {
            enabled: true,
            ..Default::default()
        },
    };
    tracing::info!("Latch Engine v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Profiler: interval {:.2}s, capacity {}",
        settings.update_interval_sec,
        settings.initial_capacity
    );

    let mut profiler = Profiler::new(&settings);

    let mut gpu = SimulatedQueryBackend::new(1).with_device_info("Simulated GPU", "0.1");
    gpu.set_pass_duration_ms(0, 1.8);
    gpu.set_pass_duration_ms(2, 2.6);
    gpu.set_memory_usage(768, 8192);
    if let Err(err) = profiler.attach_query_backend(Box::new(gpu)) {
        tracing::warn!("Continuing without GPU timings: {}", err);
    }

    let mut timer = FrameTimer::new(60);
    for frame in 0..FRAME_COUNT {
        let delta = timer.tick();
        profiler.pre_update(delta);
        simulate_frame(&mut profiler);
        profiler.post_update();
        // Present would happen here.
        profiler.on_present();

        if profiler.poll_state() == PollState::Resolved {
            report(&profiler, frame);
        }
    }

    let (recent_min, recent_max) = timer.frame_time_range_ms();
    tracing::info!(
        "Done: {:.1} fps, frame {:.2}ms [{:.2}..{:.2}]",
        profiler.fps(),
        profiler.frame_time_avg(),
        profiler.frame_time_min(),
        profiler.frame_time_max()
    );
    tracing::info!(
        "Last {} frames: {:.1} fps, {:.2}ms [{:.2}..{:.2}]",
        timer.sample_count(),
        timer.fps(),
        timer.frame_time_ms(),
        recent_min,
        recent_max
    );
    tracing::info!("Diagnostics: {:?}", profiler.diagnostics());
    Ok(())
}

fn simulate_frame(profiler: &mut Profiler) {
    {
        let mut update = profiler.scope("Update", BlockType::Cpu);
        update.time_block("Physics", BlockType::Cpu, |_| {
            std::thread::sleep(Duration::from_millis(1));
        });
        update.time_block("Audio", BlockType::Cpu, |_| {
            std::thread::sleep(Duration::from_micros(300));
        });
    }

    let mut render = profiler.scope("Render", BlockType::Cpu);
    render.counters_mut().increment("draw_calls", 42);
    {
        let _shadows = render.gpu_scope("Shadows", MAIN_COMMAND_LIST);
        std::thread::sleep(Duration::from_micros(200));
    }
    {
        let _lighting = render.gpu_scope("Lighting", MAIN_COMMAND_LIST);
        std::thread::sleep(Duration::from_micros(200));
    }
}

fn report(profiler: &Profiler, frame: u32) {
    tracing::info!(
        "Frame {}: cpu {:.2}ms (avg {:.2}), gpu {:.2}ms (avg {:.2}), draw calls {}",
        frame,
        profiler.cpu_time_last(),
        profiler.cpu_time_avg(),
        profiler.gpu_time_last(),
        profiler.gpu_time_avg(),
        profiler.counters().get("draw_calls")
    );
    for block in profiler.time_blocks() {
        let indent = block.tree_depth() as usize * 2;
        match block.duration_ms() {
            Some(ms) => tracing::debug!("{:indent$}{} {:.3}ms", "", block.name(), ms),
            None => tracing::debug!("{:indent$}{} (pending)", "", block.name()),
        }
    }
    if profiler.is_cpu_stuttering() {
        tracing::warn!("CPU stutter on frame {}", frame);
    }
    if profiler.is_gpu_stuttering() {
        tracing::warn!("GPU stutter on frame {}", frame);
    }
    if let Some(memory) = profiler.gpu_memory() {
        tracing::debug!("GPU memory {}/{} MB", memory.used_mb, memory.available_mb);
    }
}
