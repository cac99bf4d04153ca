//! RAII time block

use crate::profiler::Profiler;
use crate::query::BackendScope;
use crate::time_block::BlockType;
use std::ops::{Deref, DerefMut};

/// Starts a block on creation and ends it on drop, so early returns cannot
/// leave a block open.
///
/// Derefs to the [`Profiler`], which is how nested scopes are opened:
///
/// ```
/// use latch_profiler::{BlockType, Profiler, ProfilerSettings};
///
/// let mut profiler = Profiler::new(&ProfilerSettings { enabled: true, ..Default::default() });
/// profiler.pre_update(std::time::Duration::from_millis(16));
/// {
///     let mut update = profiler.scope("Update", BlockType::Cpu);
///     let _physics = update.scope("Physics", BlockType::Cpu);
/// }
/// profiler.on_present();
/// assert_eq!(profiler.time_blocks().len(), 2);
/// ```
pub struct ScopedTimeBlock<'a> {
    profiler: &'a mut Profiler,
    started: bool,
    // A refused start on a polled frame still owes the profiler its end.
    paired: bool,
}

impl<'a> ScopedTimeBlock<'a> {
    pub fn new(
        profiler: &'a mut Profiler,
        name: &'static str,
        block_type: BlockType,
        scope: Option<BackendScope>,
    ) -> Self {
        let paired = profiler.is_polled_frame();
        let started = profiler.block_start(name, block_type, scope);
        Self {
            profiler,
            started,
            paired,
        }
    }

    /// False when the profiler was disabled, not polling, or the type is off.
    pub fn is_recording(&self) -> bool {
        self.started
    }
}

impl Deref for ScopedTimeBlock<'_> {
    type Target = Profiler;

    fn deref(&self) -> &Profiler {
        self.profiler
    }
}

impl DerefMut for ScopedTimeBlock<'_> {
    fn deref_mut(&mut self) -> &mut Profiler {
        self.profiler
    }
}

impl Drop for ScopedTimeBlock<'_> {
    fn drop(&mut self) {
        if self.paired {
            self.profiler.block_end();
        }
    }
}
