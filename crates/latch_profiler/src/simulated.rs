//! In-process query backend with configurable readback latency
//!
//! Stands in for a device layer in tests and in the runtime demo. Timestamp
//! pairs issued between two `query_end` calls form one submission; a
//! submission becomes readable once `latency_frames` further submissions have
//! gone through.

use crate::error::QueryError;
use crate::query::{BackendScope, GpuDeviceInfo, GpuMemory, QueryBackend, QueryHandle, QueryKind};
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
struct SimulatedQuery {
    recording: bool,
    pending: Vec<(u32, f32)>,
    in_flight: VecDeque<(u64, Vec<(u32, f32)>)>,
    resolved: HashMap<u32, f32>,
}

pub struct SimulatedQueryBackend {
    latency_frames: u64,
    submitted_frames: u64,
    next_handle: u32,
    queries: HashMap<QueryHandle, SimulatedQuery>,
    pass_durations_ms: HashMap<u32, f32>,
    default_duration_ms: f32,
    device_info: Option<GpuDeviceInfo>,
    memory: Option<GpuMemory>,
    fail_create: bool,
    fail_readback: bool,
}

impl SimulatedQueryBackend {
    pub fn new(latency_frames: u64) -> Self {
        Self {
            latency_frames,
            submitted_frames: 0,
            next_handle: 0,
            queries: HashMap::new(),
            pass_durations_ms: HashMap::new(),
            default_duration_ms: 1.0,
            device_info: None,
            memory: None,
            fail_create: false,
            fail_readback: false,
        }
    }

    /// Duration reported for pairs issued at `pass_index` from now on.
    pub fn set_pass_duration_ms(&mut self, pass_index: u32, duration_ms: f32) {
        self.pass_durations_ms.insert(pass_index, duration_ms);
    }

    /// Duration reported for pass indices without an explicit value.
    pub fn set_default_duration_ms(&mut self, duration_ms: f32) {
        self.default_duration_ms = duration_ms;
    }

    pub fn with_device_info(mut self, name: impl Into<String>, driver: impl Into<String>) -> Self {
        self.device_info = Some(GpuDeviceInfo {
            name: name.into(),
            driver: driver.into(),
        });
        self
    }

    pub fn set_memory_usage(&mut self, used_mb: u32, available_mb: u32) {
        self.memory = Some(GpuMemory {
            used_mb,
            available_mb,
        });
    }

    pub fn fail_create(&mut self, fail: bool) {
        self.fail_create = fail;
    }

    pub fn fail_readback(&mut self, fail: bool) {
        self.fail_readback = fail;
    }

    pub fn live_queries(&self) -> usize {
        self.queries.len()
    }

    fn query_mut(&mut self, handle: QueryHandle) -> Result<&mut SimulatedQuery, QueryError> {
        self.queries
            .get_mut(&handle)
            .ok_or(QueryError::UnknownHandle { handle })
    }
}

impl QueryBackend for SimulatedQueryBackend {
    fn query_create(&mut self, kind: QueryKind) -> Result<QueryHandle, QueryError> {
        if self.fail_create {
            return Err(QueryError::CreateFailed { kind });
        }
        let handle = QueryHandle(self.next_handle);
        self.next_handle += 1;
        self.queries.insert(handle, SimulatedQuery::default());
        Ok(handle)
    }

    fn query_begin(&mut self, handle: QueryHandle) -> Result<(), QueryError> {
        self.query_mut(handle)?.recording = true;
        Ok(())
    }

    fn query_end(&mut self, handle: QueryHandle) -> Result<(), QueryError> {
        let query = self
            .queries
            .get_mut(&handle)
            .ok_or(QueryError::UnknownHandle { handle })?;
        if !query.recording {
            return Err(QueryError::NotRecording { handle });
        }
        query.recording = false;
        self.submitted_frames += 1;
        let pairs = std::mem::take(&mut query.pending);
        query.in_flight.push_back((self.submitted_frames, pairs));
        Ok(())
    }

    fn query_get_data(&mut self, handle: QueryHandle) -> Result<bool, QueryError> {
        if self.fail_readback {
            return Err(QueryError::ReadbackFailed {
                reason: "simulated device lost".to_string(),
            });
        }
        let submitted = self.submitted_frames;
        let latency = self.latency_frames;
        let query = self.query_mut(handle)?;

        let mut resolved_any = false;
        while let Some((frame, _)) = query.in_flight.front() {
            if submitted - frame < latency {
                break;
            }
            if let Some((_, pairs)) = query.in_flight.pop_front() {
                // Newer submissions overwrite per pass; untouched passes keep
                // their older values, like a reused readback buffer.
                query.resolved.extend(pairs);
                resolved_any = true;
            }
        }
        Ok(resolved_any)
    }

    fn query_release(&mut self, handle: QueryHandle) {
        self.queries.remove(&handle);
    }

    fn timestamp_pair(
        &mut self,
        handle: QueryHandle,
        _scope: Option<BackendScope>,
        pass_index: u32,
    ) -> Result<(), QueryError> {
        let duration = self
            .pass_durations_ms
            .get(&pass_index)
            .copied()
            .unwrap_or(self.default_duration_ms);
        self.query_mut(handle)?.pending.push((pass_index, duration));
        Ok(())
    }

    fn resolved_duration_ms(&self, handle: QueryHandle, pass_index: u32) -> Option<f32> {
        self.queries.get(&handle)?.resolved.get(&pass_index).copied()
    }

    fn device_info(&self) -> Option<GpuDeviceInfo> {
        self.device_info.clone()
    }

    fn memory_usage(&self) -> Option<GpuMemory> {
        self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(backend: &mut SimulatedQueryBackend, handle: QueryHandle, passes: &[u32]) {
        backend.query_begin(handle).unwrap();
        for &pass in passes {
            backend.timestamp_pair(handle, None, pass).unwrap();
        }
        backend.query_end(handle).unwrap();
    }

    #[test]
    fn test_zero_latency_resolves_immediately() {
        let mut backend = SimulatedQueryBackend::new(0);
        backend.set_pass_duration_ms(0, 2.5);
        let handle = backend.query_create(QueryKind::Timestamp).unwrap();

        submit(&mut backend, handle, &[0, 2]);
        assert!(backend.query_get_data(handle).unwrap());
        assert_eq!(backend.resolved_duration_ms(handle, 0), Some(2.5));
        assert_eq!(backend.resolved_duration_ms(handle, 2), Some(1.0));
        assert_eq!(backend.resolved_duration_ms(handle, 4), None);
    }

    #[test]
    fn test_latency_delays_readback() {
        let mut backend = SimulatedQueryBackend::new(1);
        let handle = backend.query_create(QueryKind::Timestamp).unwrap();

        submit(&mut backend, handle, &[0]);
        assert!(!backend.query_get_data(handle).unwrap());
        assert_eq!(backend.resolved_duration_ms(handle, 0), None);

        submit(&mut backend, handle, &[]);
        assert!(backend.query_get_data(handle).unwrap());
        assert_eq!(backend.resolved_duration_ms(handle, 0), Some(1.0));
    }

    #[test]
    fn test_end_without_begin() {
        let mut backend = SimulatedQueryBackend::new(0);
        let handle = backend.query_create(QueryKind::Timestamp).unwrap();
        assert_eq!(
            backend.query_end(handle),
            Err(QueryError::NotRecording { handle })
        );
    }

    #[test]
    fn test_failure_injection() {
        let mut backend = SimulatedQueryBackend::new(0);
        backend.fail_create(true);
        assert!(backend.query_create(QueryKind::Timestamp).is_err());

        backend.fail_create(false);
        let handle = backend.query_create(QueryKind::Timestamp).unwrap();
        backend.fail_readback(true);
        assert!(matches!(
            backend.query_get_data(handle),
            Err(QueryError::ReadbackFailed { .. })
        ));
    }

    #[test]
    fn test_release() {
        let mut backend = SimulatedQueryBackend::new(0);
        let handle = backend.query_create(QueryKind::Timestamp).unwrap();
        assert_eq!(backend.live_queries(), 1);
        backend.query_release(handle);
        assert_eq!(backend.live_queries(), 0);
        assert_eq!(
            backend.query_begin(handle),
            Err(QueryError::UnknownHandle { handle })
        );
    }
}
