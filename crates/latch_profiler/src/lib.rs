//! Latch Profiler - Hierarchical CPU/GPU frame profiler
//!
//! Records nested named time blocks during a frame, reconciles them with GPU
//! timestamp queries that resolve frames later, and keeps rolling CPU, GPU and
//! frame-time statistics with stutter detection.
//!
//! - Steady state never allocates: time block slots are allocated up front
//!   and reused every frame.
//! - Consumers read a double-buffered snapshot of the last fully resolved
//!   frame.
//! - When a frame needs more slots than exist, the extra blocks are dropped for
//!   that frame and both buffers double at the next frame boundary.
//!
//! # Usage
//!
//! ```
//! use latch_profiler::{BlockType, Profiler, ProfilerSettings};
//! use std::time::Duration;
//!
//! let mut profiler = Profiler::new(&ProfilerSettings {
//!     enabled: true,
//!     ..Default::default()
//! });
//!
//! profiler.pre_update(Duration::from_millis(16));
//! profiler.time_block("Update", BlockType::Cpu, |profiler| {
//!     profiler.time_block("Physics", BlockType::Cpu, |_| { /* step */ });
//! });
//! profiler.post_update();
//! profiler.on_present();
//!
//! for block in profiler.time_blocks() {
//!     let indent = block.tree_depth() as usize * 2;
//!     let ms = block.duration_ms().unwrap_or(0.0);
//!     let _line = format!("{:indent$}{} {:.3} ms", "", block.name(), ms);
//! }
//! ```

mod aggregate;
mod error;
mod profiler;
mod query;
mod scope;
mod settings;
mod simulated;
mod time_block;

pub use aggregate::CategoryTimings;
pub use error::{ProfilerError, QueryError};
pub use profiler::{FrameDiagnostics, PollState, Profiler};
pub use query::{BackendScope, GpuDeviceInfo, GpuMemory, QueryBackend, QueryHandle, QueryKind};
pub use scope::ScopedTimeBlock;
pub use settings::{ProfilerSettings, MAX_UPDATE_INTERVAL_SEC};
pub use simulated::SimulatedQueryBackend;
pub use time_block::{BlockState, BlockType, TimeBlock};

pub use latch_metrics::Counter;
