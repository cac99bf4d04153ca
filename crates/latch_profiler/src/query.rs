//! GPU timestamp query contract
//!
//! The profiler only needs begin/end/retrieve semantics from the device layer.
//! How timestamps are physically written is up to the backend.

use crate::error::QueryError;

/// Kind of query requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// A set of timestamp slots, two per GPU time block.
    Timestamp,
}

/// Opaque handle issued by [`QueryBackend::query_create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryHandle(pub u32);

/// Identifies where a GPU block's timestamps are recorded (a command list,
/// an encoder, a queue). The profiler passes it through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendScope(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuMemory {
    pub used_mb: u32,
    pub available_mb: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GpuDeviceInfo {
    pub name: String,
    pub driver: String,
}

/// Device-side capability consumed by the profiler.
///
/// Calls arrive in this order on a polled frame:
/// `query_begin` (pre-update), `query_end` (post-update), then after the frame
/// is presented `query_get_data` followed by one `timestamp_pair` +
/// `resolved_duration_ms` per finished GPU block.
///
/// None of these may block. `query_get_data` returning `Ok(false)` means
/// nothing new is ready yet, which is normal for the first frames.
pub trait QueryBackend {
    fn query_create(&mut self, kind: QueryKind) -> Result<QueryHandle, QueryError>;

    fn query_begin(&mut self, handle: QueryHandle) -> Result<(), QueryError>;

    fn query_end(&mut self, handle: QueryHandle) -> Result<(), QueryError>;

    /// Resolve previously submitted timestamps. The data may belong to an
    /// earlier frame than the one just ended.
    fn query_get_data(&mut self, handle: QueryHandle) -> Result<bool, QueryError>;

    fn query_release(&mut self, handle: QueryHandle);

    /// Issue timestamps into slots `pass_index` (start) and `pass_index + 1` (end).
    fn timestamp_pair(
        &mut self,
        handle: QueryHandle,
        scope: Option<BackendScope>,
        pass_index: u32,
    ) -> Result<(), QueryError>;

    /// Elapsed milliseconds between slots `pass_index` and `pass_index + 1`
    /// in the most recently resolved data, if any.
    fn resolved_duration_ms(&self, handle: QueryHandle, pass_index: u32) -> Option<f32>;

    fn device_info(&self) -> Option<GpuDeviceInfo> {
        None
    }

    fn memory_usage(&self) -> Option<GpuMemory> {
        None
    }
}
