//! Frame-synchronous CPU/GPU profiler
//!
//! Time blocks are recorded into a write buffer while a polled frame runs and
//! copied into a read buffer once the frame has been presented. Consumers only
//! ever see the read buffer, so they always observe a complete frame.
//!
//! Per frame the host calls [`Profiler::pre_update`], records blocks, then
//! [`Profiler::post_update`] and finally [`Profiler::on_present`] once the
//! frame is on screen. GPU readback happens only after the present signal.

use crate::aggregate::CategoryTimings;
use crate::error::QueryError;
use crate::query::{BackendScope, GpuDeviceInfo, GpuMemory, QueryBackend, QueryHandle, QueryKind};
use crate::scope::ScopedTimeBlock;
use crate::settings::{clamp_interval, ProfilerSettings};
use crate::time_block::{BlockState, BlockType, ParentLink, TimeBlock};
use latch_metrics::{duration_ms, Counter};
use std::time::Duration;

/// Where the current frame is in the polled-frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Nothing is recorded this frame.
    NotPolled,
    /// Between `pre_update` and `post_update` of a polled frame.
    Recording,
    /// Frame work is done; waiting for the present signal before readback.
    AwaitingPresent,
    /// Buffers swapped and aggregates updated for this frame.
    Resolved,
}

/// Running totals of every recoverable problem the profiler has logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDiagnostics {
    /// `block_end` calls with no open block.
    pub unmatched_ends: u64,
    /// Blocks still `Started` when their frame was swapped.
    pub unterminated_blocks: u64,
    /// `block_start` calls lost to a full buffer.
    pub dropped_blocks: u64,
    pub growth_events: u64,
    /// Polled frames that never received `on_present`.
    pub missed_presents: u64,
    pub backend_failures: u64,
}

struct GpuQueries {
    backend: Box<dyn QueryBackend>,
    handle: QueryHandle,
}

pub struct Profiler {
    enabled: bool,
    cpu_enabled: bool,
    gpu_enabled: bool,
    update_interval_sec: f32,
    time_since_poll_sec: f32,
    poll_state: PollState,

    write: Vec<TimeBlock>,
    read: Vec<TimeBlock>,
    read_len: usize,
    cursor: usize,
    blocks_this_frame: u32,

    // Open blocks of every type, most recent last. `None` marks a start on a
    // polled frame that got no slot, either because the buffer was full or the
    // type is switched off; its end must not close a real block.
    open: Vec<Option<usize>>,
    open_cpu: Vec<usize>,
    open_gpu: Vec<usize>,
    grow_pending: bool,

    frame_delta_ms: f32,
    cpu: CategoryTimings,
    gpu: CategoryTimings,
    frame: CategoryTimings,

    gpu_queries: Option<GpuQueries>,
    gpu_device: Option<GpuDeviceInfo>,
    gpu_memory: Option<GpuMemory>,

    counters_write: Counter,
    counters_read: Counter,
    diagnostics: FrameDiagnostics,
}

impl Profiler {
    pub fn new(settings: &ProfilerSettings) -> Self {
        let capacity = settings.initial_capacity.max(1);
        let update_interval_sec = clamp_interval(settings.update_interval_sec);
        let category = || {
            CategoryTimings::new(
                settings.smoothing_frames,
                settings.stutter_baseline_frames,
                settings.stutter_threshold_ms,
            )
        };

        Self {
            enabled: settings.enabled,
            cpu_enabled: settings.cpu_enabled,
            gpu_enabled: settings.gpu_enabled,
            update_interval_sec,
            // First enabled frame is polled.
            time_since_poll_sec: update_interval_sec,
            poll_state: PollState::NotPolled,
            write: vec![TimeBlock::default(); capacity],
            read: vec![TimeBlock::default(); capacity],
            read_len: 0,
            cursor: 0,
            blocks_this_frame: 0,
            open: Vec::with_capacity(capacity),
            open_cpu: Vec::with_capacity(capacity),
            open_gpu: Vec::with_capacity(capacity),
            grow_pending: false,
            frame_delta_ms: 0.0,
            cpu: category(),
            gpu: category(),
            frame: category(),
            gpu_queries: None,
            gpu_device: None,
            gpu_memory: None,
            counters_write: Counter::new(),
            counters_read: Counter::new(),
            diagnostics: FrameDiagnostics::default(),
        }
    }

    // ------------------------------------------------------------------
    // Query backend
    // ------------------------------------------------------------------

    /// Creates the timestamp query on `backend` and keeps it for GPU blocks.
    ///
    /// On failure the backend is dropped and GPU blocks keep recording without
    /// durations. The error is returned for the host's information only.
    pub fn attach_query_backend(
        &mut self,
        mut backend: Box<dyn QueryBackend>,
    ) -> Result<(), QueryError> {
        self.detach_query_backend();

        let handle = match backend.query_create(QueryKind::Timestamp) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!("GPU profiling unavailable: {}", err);
                self.diagnostics.backend_failures += 1;
                return Err(err);
            }
        };

        self.gpu_device = backend.device_info();
        if let Some(device) = &self.gpu_device {
            tracing::info!("GPU profiling on '{}' (driver {})", device.name, device.driver);
        }
        self.gpu_memory = backend.memory_usage();
        self.gpu_queries = Some(GpuQueries { backend, handle });

        // Attached mid-frame: open the query so post_update can close it.
        if self.poll_state == PollState::Recording {
            self.begin_gpu_query();
        }
        Ok(())
    }

    /// Releases the query and hands the backend back.
    pub fn detach_query_backend(&mut self) -> Option<Box<dyn QueryBackend>> {
        let GpuQueries {
            mut backend,
            handle,
        } = self.gpu_queries.take()?;
        backend.query_release(handle);
        self.gpu_device = None;
        self.gpu_memory = None;
        Some(backend)
    }

    pub fn has_query_backend(&self) -> bool {
        self.gpu_queries.is_some()
    }

    // ------------------------------------------------------------------
    // Frame lifecycle
    // ------------------------------------------------------------------

    /// Start of a frame, before any work is recorded. `delta` is the time the
    /// previous frame took.
    pub fn pre_update(&mut self, delta: Duration) {
        if !self.enabled {
            return;
        }
        self.frame_delta_ms = duration_ms(delta);
        self.counters_write.reset_all();

        let missed_present = matches!(
            self.poll_state,
            PollState::Recording | PollState::AwaitingPresent
        );
        if missed_present {
            tracing::warn!(
                "Polled frame ended without a present signal ({} time blocks)",
                self.cursor
            );
            self.diagnostics.missed_presents += 1;
            if self.poll_state == PollState::Recording {
                self.end_gpu_query();
            }
        }

        if self.grow_pending {
            if self.cursor > 0 {
                self.swap_buffers(false);
            }
            self.grow_buffers();
            self.grow_pending = false;
            self.time_since_poll_sec = 0.0;
            self.begin_polled_frame();
            return;
        }

        if missed_present {
            self.discard_write_buffer();
        }

        self.time_since_poll_sec += delta.as_secs_f32();
        if self.time_since_poll_sec >= self.update_interval_sec {
            self.time_since_poll_sec = 0.0;
            self.begin_polled_frame();
        } else {
            self.poll_state = PollState::NotPolled;
        }
    }

    /// Frame work is done. Closes the GPU query of a polled frame.
    pub fn post_update(&mut self) {
        if !self.enabled || self.poll_state != PollState::Recording {
            return;
        }
        self.end_gpu_query();
        self.poll_state = PollState::AwaitingPresent;
    }

    /// The frame has been presented: read back GPU timestamps, swap buffers
    /// and update the aggregates.
    pub fn on_present(&mut self) {
        if !self.enabled {
            return;
        }
        if self.poll_state == PollState::Recording {
            self.post_update();
        }
        if self.poll_state != PollState::AwaitingPresent {
            return;
        }

        let gpu_ready = self.read_back_gpu_queries();
        self.swap_buffers(gpu_ready);
        self.update_aggregates();
        if let Some(queries) = &self.gpu_queries {
            self.gpu_memory = queries.backend.memory_usage();
        }
        self.poll_state = PollState::Resolved;
    }

    pub fn poll_state(&self) -> PollState {
        self.poll_state
    }

    /// Whether blocks started now would be recorded (ignoring type flags).
    pub fn is_polled_frame(&self) -> bool {
        self.enabled
            && matches!(
                self.poll_state,
                PollState::Recording | PollState::AwaitingPresent
            )
    }

    fn begin_polled_frame(&mut self) {
        self.poll_state = PollState::Recording;
        self.begin_gpu_query();
    }

    fn begin_gpu_query(&mut self) {
        let Some(queries) = self.gpu_queries.as_mut() else {
            return;
        };
        if let Err(err) = queries.backend.query_begin(queries.handle) {
            tracing::warn!("GPU query begin failed: {}", err);
            self.diagnostics.backend_failures += 1;
        }
    }

    fn end_gpu_query(&mut self) {
        let Some(queries) = self.gpu_queries.as_mut() else {
            return;
        };
        if let Err(err) = queries.backend.query_end(queries.handle) {
            tracing::warn!("GPU query end failed: {}", err);
            self.diagnostics.backend_failures += 1;
        }
    }

    /// False when there is no backend or the readback failed; GPU blocks
    /// then get no duration this cycle.
    fn read_back_gpu_queries(&mut self) -> bool {
        let Some(queries) = self.gpu_queries.as_mut() else {
            return false;
        };
        match queries.backend.query_get_data(queries.handle) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!("GPU query readback failed: {}", err);
                self.diagnostics.backend_failures += 1;
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Opens a time block. Its parent is the most recent open block of the
    /// same type (any type for [`BlockType::Undefined`]).
    ///
    /// Returns false when nothing will be measured because the profiler is
    /// off, the frame is not polled, or the type is switched off. A start that
    /// finds the buffer full returns true but is not recorded, and the buffers
    /// grow at the next `pre_update`.
    ///
    /// On a polled frame every start pairs with one [`block_end`](Self::block_end),
    /// including starts refused by a type flag.
    pub fn block_start(
        &mut self,
        name: &'static str,
        block_type: BlockType,
        scope: Option<BackendScope>,
    ) -> bool {
        if !self.is_polled_frame() {
            return false;
        }
        if !self.is_type_enabled(block_type) {
            self.open.push(None);
            return false;
        }

        if self.cursor >= self.write.len() {
            if !self.grow_pending {
                tracing::warn!(
                    "Time block capacity of {} exhausted, dropping '{}' and growing next frame",
                    self.write.len(),
                    name
                );
            }
            self.grow_pending = true;
            self.open.push(None);
            self.diagnostics.dropped_blocks += 1;
            return true;
        }

        let parent = self.last_open(block_type).map(|slot| ParentLink {
            slot,
            depth: self.write[slot].tree_depth(),
        });

        let slot = self.cursor;
        self.cursor += 1;
        self.blocks_this_frame += 1;
        self.write[slot].begin(self.blocks_this_frame, name, block_type, parent, scope);

        self.open.push(Some(slot));
        match block_type {
            BlockType::Cpu => self.open_cpu.push(slot),
            BlockType::Gpu => self.open_gpu.push(slot),
            BlockType::Undefined => {}
        }
        true
    }

    /// Closes the most recently opened block of any type.
    pub fn block_end(&mut self) -> bool {
        if !self.is_polled_frame() {
            return false;
        }
        let slot = match self.open.pop() {
            Some(Some(slot)) => slot,
            Some(None) => return true,
            None => {
                tracing::warn!("block_end() called without a matching block_start()");
                self.diagnostics.unmatched_ends += 1;
                return false;
            }
        };
        // LIFO across all types means the slot also tops its type's stack.
        match self.write[slot].block_type() {
            BlockType::Cpu => {
                self.open_cpu.pop();
            }
            BlockType::Gpu => {
                self.open_gpu.pop();
            }
            BlockType::Undefined => {}
        }
        self.write[slot].end()
    }

    /// Opens a block that closes when the returned guard drops.
    pub fn scope(&mut self, name: &'static str, block_type: BlockType) -> ScopedTimeBlock<'_> {
        ScopedTimeBlock::new(self, name, block_type, None)
    }

    /// Like [`scope`](Self::scope), with the backend scope GPU timestamps go to.
    pub fn gpu_scope(&mut self, name: &'static str, scope: BackendScope) -> ScopedTimeBlock<'_> {
        ScopedTimeBlock::new(self, name, BlockType::Gpu, Some(scope))
    }

    /// Runs `f` inside a balanced start/end pair.
    pub fn time_block<F, R>(&mut self, name: &'static str, block_type: BlockType, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let paired = self.is_polled_frame();
        self.block_start(name, block_type, None);
        let result = f(self);
        if paired {
            self.block_end();
        }
        result
    }

    fn last_open(&self, block_type: BlockType) -> Option<usize> {
        match block_type {
            BlockType::Cpu => self.open_cpu.last().copied(),
            BlockType::Gpu => self.open_gpu.last().copied(),
            BlockType::Undefined => self.open.iter().rev().find_map(|slot| *slot),
        }
    }

    fn is_type_enabled(&self, block_type: BlockType) -> bool {
        match block_type {
            BlockType::Cpu => self.cpu_enabled,
            BlockType::Gpu => self.gpu_enabled,
            BlockType::Undefined => false,
        }
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// Finalizes every recorded block, copies it into the read buffer and
    /// resets the write buffer. The only place the read buffer changes.
    fn swap_buffers(&mut self, gpu_ready: bool) {
        let mut pass_index = 0u32;

        for slot in 0..self.cursor {
            let block = &mut self.write[slot];
            match block.state() {
                BlockState::Ended => {
                    if block.block_type() == BlockType::Gpu {
                        let backend: Option<(&mut dyn QueryBackend, QueryHandle)> =
                            match self.gpu_queries.as_mut() {
                                Some(queries) if gpu_ready => {
                                    Some((&mut *queries.backend, queries.handle))
                                }
                                _ => None,
                            };
                        if let Err(err) = block.compute_duration(pass_index, backend) {
                            tracing::warn!(
                                "GPU timestamps for '{}' unavailable: {}",
                                block.name(),
                                err
                            );
                            self.diagnostics.backend_failures += 1;
                        }
                        pass_index += 2;
                    }
                }
                BlockState::Started => {
                    tracing::warn!(
                        "Time block '{}' was never ended; ensure block_end() is called for it",
                        block.name()
                    );
                    self.diagnostics.unterminated_blocks += 1;
                }
                BlockState::Idle => {}
            }
            self.read[slot] = *block;
            block.reset();
        }

        self.read_len = self.cursor;
        self.counters_read.copy_from(&self.counters_write);
        self.clear_recording_state();
    }

    fn discard_write_buffer(&mut self) {
        for block in &mut self.write[..self.cursor] {
            block.reset();
        }
        self.clear_recording_state();
    }

    fn clear_recording_state(&mut self) {
        self.cursor = 0;
        self.blocks_this_frame = 0;
        self.open.clear();
        self.open_cpu.clear();
        self.open_gpu.clear();
    }

    /// Doubles both buffers. Only called between frames.
    fn grow_buffers(&mut self) {
        let capacity = self.write.len() * 2;
        self.write.resize(capacity, TimeBlock::default());
        self.read.resize(capacity, TimeBlock::default());
        self.open.reserve(capacity);
        self.open_cpu.reserve(capacity);
        self.open_gpu.reserve(capacity);
        self.diagnostics.growth_events += 1;
        tracing::warn!(
            "Time block buffers grew to {} slots. Consider raising initial_capacity to at least this.",
            capacity
        );
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    /// Root blocks only, so nested blocks are not counted twice.
    fn update_aggregates(&mut self) {
        let mut cpu_total: Option<f32> = None;
        let mut gpu_total: Option<f32> = None;
        for block in &self.read[..self.read_len] {
            if !block.is_root() {
                continue;
            }
            let Some(ms) = block.duration_ms() else {
                continue;
            };
            match block.block_type() {
                BlockType::Cpu => *cpu_total.get_or_insert(0.0) += ms,
                BlockType::Gpu => *gpu_total.get_or_insert(0.0) += ms,
                BlockType::Undefined => {}
            }
        }

        if let Some(ms) = cpu_total {
            self.cpu.add_sample(ms);
        }
        if let Some(ms) = gpu_total {
            self.gpu.add_sample(ms);
        }
        self.frame.add_sample(self.frame_delta_ms);
    }

    pub fn reset_metrics(&mut self) {
        self.cpu.reset();
        self.gpu.reset();
        self.frame.reset();
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        if !enabled && self.poll_state == PollState::Recording {
            self.end_gpu_query();
        }
        self.discard_write_buffer();
        self.enabled = enabled;
        self.poll_state = PollState::NotPolled;
        self.time_since_poll_sec = self.update_interval_sec;
        tracing::info!("Profiler {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_cpu_enabled(&mut self, enabled: bool) {
        self.cpu_enabled = enabled;
    }

    pub fn cpu_enabled(&self) -> bool {
        self.cpu_enabled
    }

    pub fn set_gpu_enabled(&mut self, enabled: bool) {
        self.gpu_enabled = enabled;
    }

    pub fn gpu_enabled(&self) -> bool {
        self.gpu_enabled
    }

    /// Clamped to `[0, 0.5]` seconds.
    pub fn set_update_interval(&mut self, seconds: f32) {
        self.update_interval_sec = clamp_interval(seconds);
    }

    pub fn update_interval(&self) -> f32 {
        self.update_interval_sec
    }

    pub fn set_stutter_threshold_ms(&mut self, threshold_ms: f32) {
        self.cpu.set_stutter_threshold_ms(threshold_ms);
        self.gpu.set_stutter_threshold_ms(threshold_ms);
        self.frame.set_stutter_threshold_ms(threshold_ms);
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Blocks of the last resolved frame, in start order.
    pub fn time_blocks(&self) -> &[TimeBlock] {
        &self.read[..self.read_len]
    }

    /// Parent of a block returned by [`time_blocks`](Self::time_blocks).
    pub fn parent_of(&self, block: &TimeBlock) -> Option<&TimeBlock> {
        block.parent().and_then(|slot| self.time_blocks().get(slot))
    }

    pub fn capacity(&self) -> usize {
        self.write.len()
    }

    pub fn blocks_this_frame(&self) -> u32 {
        self.blocks_this_frame
    }

    pub fn cpu(&self) -> &CategoryTimings {
        &self.cpu
    }

    pub fn gpu(&self) -> &CategoryTimings {
        &self.gpu
    }

    pub fn frame(&self) -> &CategoryTimings {
        &self.frame
    }

    pub fn cpu_time_last(&self) -> f32 {
        self.cpu.last()
    }

    pub fn cpu_time_avg(&self) -> f32 {
        self.cpu.avg()
    }

    pub fn cpu_time_min(&self) -> f32 {
        self.cpu.min()
    }

    pub fn cpu_time_max(&self) -> f32 {
        self.cpu.max()
    }

    pub fn gpu_time_last(&self) -> f32 {
        self.gpu.last()
    }

    pub fn gpu_time_avg(&self) -> f32 {
        self.gpu.avg()
    }

    pub fn gpu_time_min(&self) -> f32 {
        self.gpu.min()
    }

    pub fn gpu_time_max(&self) -> f32 {
        self.gpu.max()
    }

    pub fn frame_time_last(&self) -> f32 {
        self.frame.last()
    }

    pub fn frame_time_avg(&self) -> f32 {
        self.frame.avg()
    }

    pub fn frame_time_min(&self) -> f32 {
        self.frame.min()
    }

    pub fn frame_time_max(&self) -> f32 {
        self.frame.max()
    }

    /// From the smoothed frame time.
    pub fn fps(&self) -> f32 {
        let avg = self.frame.avg();
        if avg > 0.0 {
            1000.0 / avg
        } else {
            0.0
        }
    }

    pub fn is_cpu_stuttering(&self) -> bool {
        self.cpu.is_stuttering()
    }

    pub fn is_gpu_stuttering(&self) -> bool {
        self.gpu.is_stuttering()
    }

    pub fn gpu_device_info(&self) -> Option<&GpuDeviceInfo> {
        self.gpu_device.as_ref()
    }

    /// Refreshed on polled frames only.
    pub fn gpu_memory(&self) -> Option<GpuMemory> {
        self.gpu_memory
    }

    /// Counters of the last resolved frame.
    pub fn counters(&self) -> &Counter {
        &self.counters_read
    }

    /// Counters for the frame being recorded; cleared every `pre_update`.
    pub fn counters_mut(&mut self) -> &mut Counter {
        &mut self.counters_write
    }

    pub fn diagnostics(&self) -> FrameDiagnostics {
        self.diagnostics
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(&ProfilerSettings::default())
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        self.detach_query_backend();
    }
}
