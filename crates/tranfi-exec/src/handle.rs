//! Handle API for host-language bindings.
//!
//! Pipelines live in a process-wide arena behind one `Mutex`. A `Handle`
//! packs the slot index with the slot's generation, so a handle to a freed
//! pipeline stays invalid even after its slot is reused. The `tf_*`
//! functions never return `Err`: failures yield a sentinel (`Handle::NULL`,
//! `-1`, `0`) and leave a message for `tf_last_error` on the calling
//! thread.

use std::cell::RefCell;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use tranfi_core::config::EngineConfig;
use tranfi_core::plan::Plan;
use tranfi_planner::{compile, compile_json};

use crate::error::{ExecError, Result};
use crate::pipeline::{Channel, Pipeline};

/// Slot index + 1 in the low 32 bits, generation in the high 32. Zero is
/// never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub const NULL: Handle = Handle(0);

    fn new(index: usize, generation: u32) -> Handle {
        Handle((u64::from(generation) << 32) | (index as u64 + 1))
    }

    pub fn from_raw(raw: u64) -> Handle {
        Handle(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    fn index(self) -> Option<usize> {
        let low = (self.0 & u64::from(u32::MAX)) as usize;
        low.checked_sub(1)
    }

    fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

struct Slot {
    generation: u32,
    pipeline: Option<Pipeline>,
}

/// Generation-checked arena of pipelines.
#[derive(Default)]
pub struct HandleTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pipeline: Pipeline) -> Handle {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.pipeline = Some(pipeline);
                Handle::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 1,
                    pipeline: Some(pipeline),
                });
                Handle::new(self.slots.len() - 1, 1)
            }
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Pipeline> {
        let index = handle.index().ok_or(ExecError::InvalidHandle)?;
        match self.slots.get_mut(index) {
            Some(slot) if slot.generation == handle.generation() => {
                slot.pipeline.as_mut().ok_or(ExecError::InvalidHandle)
            }
            _ => Err(ExecError::InvalidHandle),
        }
    }

    /// Take the pipeline out and retire the handle.
    pub fn remove(&mut self, handle: Handle) -> Result<Pipeline> {
        let index = handle.index().ok_or(ExecError::InvalidHandle)?;
        let slot = match self.slots.get_mut(index) {
            Some(slot) if slot.generation == handle.generation() => slot,
            _ => return Err(ExecError::InvalidHandle),
        };
        let pipeline = slot.pipeline.take().ok_or(ExecError::InvalidHandle)?;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(index);
        Ok(pipeline)
    }

    /// Live pipelines.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static TABLE: Lazy<Mutex<HandleTable>> = Lazy::new(|| Mutex::new(HandleTable::new()));

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn with_table<T>(f: impl FnOnce(&mut HandleTable) -> Result<T>) -> Result<T> {
    // A panic while holding the lock cannot leave the arena half-updated.
    let mut table = TABLE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut table)
}

fn or_record<T>(result: Result<T>, failed: T) -> T {
    result.unwrap_or_else(|e| {
        #[cfg(feature = "tracing")]
        tracing::debug!(error = %e, "handle call failed");
        LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(e.to_string()));
        failed
    })
}

fn create(plan: Result<Plan>) -> Handle {
    let created = plan
        .and_then(|plan| Pipeline::with_config(&plan, EngineConfig::from_env()))
        .and_then(|pipeline| with_table(|t| Ok(t.insert(pipeline))));
    or_record(created, Handle::NULL)
}

/// Build a pipeline from a `{"steps":[...]}` document.
pub fn tf_pipeline_create(plan_json: &str) -> Handle {
    create(compile_json(plan_json).map_err(ExecError::from))
}

/// Build a pipeline from DSL text or a recipe name.
pub fn tf_pipeline_create_dsl(dsl: &str) -> Handle {
    create(compile(dsl).map_err(ExecError::from))
}

/// `0` on success, `-1` on failure.
pub fn tf_pipeline_push(handle: Handle, bytes: &[u8]) -> i32 {
    let pushed = with_table(|t| t.get_mut(handle)?.push(bytes));
    or_record(pushed.map(|()| 0), -1)
}

pub fn tf_pipeline_finish(handle: Handle) -> i32 {
    let finished = with_table(|t| t.get_mut(handle)?.finish());
    or_record(finished.map(|()| 0), -1)
}

/// Bytes copied into `buf`; `0` when the channel is empty or on failure.
pub fn tf_pipeline_pull(handle: Handle, channel: u32, buf: &mut [u8]) -> usize {
    let pulled = Channel::from_id(channel)
        .and_then(|ch| with_table(|t| t.get_mut(handle)?.pull(ch, buf)));
    or_record(pulled, 0)
}

pub fn tf_pipeline_free(handle: Handle) -> i32 {
    let freed = with_table(|t| t.remove(handle)).map(|mut pipeline| {
        pipeline.release();
        0
    });
    or_record(freed, -1)
}

/// Message of the most recent failed `tf_*` call on this thread.
pub fn tf_last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_pipeline() -> Pipeline {
        let plan = compile("csv | csv").expect("compile");
        Pipeline::new(&plan).expect("pipeline")
    }

    fn pull_all(h: Handle, ch: u32) -> String {
        let mut buf = [0u8; 8];
        let mut out = Vec::new();
        loop {
            let n = tf_pipeline_pull(h, ch, &mut buf);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn stale_handles_are_rejected_after_slot_reuse() {
        let mut table = HandleTable::new();
        let a = table.insert(mk_pipeline());
        assert!(table.get_mut(a).is_ok());
        table.remove(a).expect("remove");
        assert!(matches!(table.get_mut(a), Err(ExecError::InvalidHandle)));

        let b = table.insert(mk_pipeline());
        assert_ne!(a, b);
        assert!(table.get_mut(b).is_ok());
        assert!(matches!(table.get_mut(a), Err(ExecError::InvalidHandle)));
        assert!(matches!(table.remove(a), Err(ExecError::InvalidHandle)));
        assert_eq!(table.len(), 1);
        assert!(matches!(table.get_mut(Handle::NULL), Err(ExecError::InvalidHandle)));
    }

    #[test]
    fn dsl_round_trip_through_handles() {
        let h = tf_pipeline_create_dsl("csv | filter \"age > 26\" | csv");
        assert!(!h.is_null());
        assert_eq!(tf_pipeline_push(h, b"name,age\nAlice,30\nBob,25\n"), 0);
        assert_eq!(tf_pipeline_finish(h), 0);
        assert_eq!(pull_all(h, 0), "name,age\nAlice,30\n");
        assert!(pull_all(h, 2).contains("rows_in: 2"));

        assert_eq!(tf_pipeline_free(h), 0);
        assert_eq!(tf_pipeline_push(h, b"x"), -1);
        assert_eq!(tf_last_error().as_deref(), Some("invalid handle"));
        assert_eq!(tf_pipeline_free(h), -1);
    }

    #[test]
    fn failures_set_last_error() {
        assert!(tf_pipeline_create("{\"steps\":[]}").is_null());
        assert!(tf_last_error().is_some());

        let h = tf_pipeline_create_dsl("csv | nope | csv");
        assert!(h.is_null());
        assert_eq!(
            tf_last_error().as_deref(),
            Some("stage 1 (nope): unknown operator 'nope'")
        );

        let h = tf_pipeline_create(
            r#"{"steps":[{"op":"codec.jsonl.decode"},{"op":"codec.jsonl.encode"}]}"#,
        );
        assert_eq!(tf_pipeline_finish(h), 0);
        assert_eq!(tf_pipeline_push(h, b"{}\n"), -1);
        assert_eq!(tf_last_error().as_deref(), Some("pipeline already finished"));
        assert_eq!(tf_pipeline_pull(h, 9, &mut [0u8; 4]), 0);
        assert_eq!(tf_last_error().as_deref(), Some("invalid channel 9"));
        assert_eq!(tf_pipeline_free(h), 0);
    }
}
