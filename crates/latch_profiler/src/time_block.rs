//! A single named timing region
//!
//! Slots are allocated once as part of a profiler buffer and reused every
//! frame: `Idle -> Started -> Ended -> (copied out) -> Idle`.

use crate::error::QueryError;
use crate::query::{BackendScope, QueryBackend, QueryHandle};
use latch_metrics::duration_ms;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    Cpu,
    Gpu,
    /// Matches any type when looking up open blocks. Never recorded.
    #[default]
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockState {
    #[default]
    Idle,
    Started,
    Ended,
}

/// Enclosing block of a block being started: its slot and depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParentLink {
    pub slot: usize,
    pub depth: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeBlock {
    id: u32,
    name: &'static str,
    block_type: BlockType,
    tree_depth: u32,
    parent: Option<usize>,
    state: BlockState,
    start: Option<Instant>,
    end: Option<Instant>,
    scope: Option<BackendScope>,
    duration_ms: Option<f32>,
    gpu_pass_index: Option<u32>,
}

impl TimeBlock {
    pub(crate) fn begin(
        &mut self,
        id: u32,
        name: &'static str,
        block_type: BlockType,
        parent: Option<ParentLink>,
        scope: Option<BackendScope>,
    ) {
        self.id = id;
        self.name = name;
        self.block_type = block_type;
        self.parent = parent.map(|link| link.slot);
        self.tree_depth = parent.map_or(0, |link| link.depth + 1);
        self.scope = scope;
        self.state = BlockState::Started;
        self.duration_ms = None;
        self.gpu_pass_index = None;
        self.end = None;
        // GPU timestamps are only issued at finalization.
        self.start = match block_type {
            BlockType::Cpu => Some(Instant::now()),
            _ => None,
        };
    }

    /// Returns false (and does nothing) unless the block is `Started`.
    pub(crate) fn end(&mut self) -> bool {
        if self.state != BlockState::Started {
            return false;
        }
        self.state = BlockState::Ended;
        if self.block_type == BlockType::Cpu {
            let end = Instant::now();
            self.end = Some(end);
            if let Some(start) = self.start {
                self.duration_ms = Some(duration_ms(end.saturating_duration_since(start)));
            }
        }
        true
    }

    /// Finalizes a GPU block against pass slots `pass_index` and `pass_index + 1`.
    ///
    /// CPU blocks already carry their duration, so this is a no-op for them.
    /// Without a backend, or before any data has resolved, the GPU duration
    /// stays unset.
    pub(crate) fn compute_duration(
        &mut self,
        pass_index: u32,
        backend: Option<(&mut dyn QueryBackend, QueryHandle)>,
    ) -> Result<(), QueryError> {
        if self.block_type != BlockType::Gpu || self.state != BlockState::Ended {
            return Ok(());
        }
        self.gpu_pass_index = Some(pass_index);
        let Some((backend, handle)) = backend else {
            return Ok(());
        };
        backend.timestamp_pair(handle, self.scope, pass_index)?;
        self.duration_ms = backend
            .resolved_duration_ms(handle, pass_index)
            .map(|ms| ms.max(0.0));
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Per-frame identifier: the running block count when this block started.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }

    /// Slot of the enclosing block within the same buffer.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == BlockState::Ended
    }

    pub fn scope(&self) -> Option<BackendScope> {
        self.scope
    }

    /// Only set once the block is `Ended` and its timestamps resolved.
    pub fn duration_ms(&self) -> Option<f32> {
        match self.state {
            BlockState::Ended => self.duration_ms,
            _ => None,
        }
    }

    pub fn gpu_pass_index(&self) -> Option<u32> {
        self.gpu_pass_index
    }
}
