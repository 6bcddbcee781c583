//! In-memory table of deletion operations
//!
//! Workers mutate their own record under its lock; pollers clone it under the
//! same lock. Finished records stay pollable until cleared or evicted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{CleanerError, CleanerResult};
use crate::models::{DeletionOperation, OperationId};

/// One operation's shared state
pub struct OperationHandle {
    state: RwLock<DeletionOperation>,
    cancel: AtomicBool,
}

impl OperationHandle {
    fn new(op: DeletionOperation) -> Self {
        Self {
            state: RwLock::new(op),
            cancel: AtomicBool::new(false),
        }
    }

    /// Apply `f` atomically with respect to pollers
    pub fn update<F>(&self, f: F) -> CleanerResult<()>
    where
        F: FnOnce(&mut DeletionOperation),
    {
        let mut op = self.state.write().map_err(|e| {
            CleanerError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        f(&mut op);
        op.updated_at = Utc::now();
        Ok(())
    }

    pub fn snapshot(&self) -> CleanerResult<DeletionOperation> {
        let op = self.state.read().map_err(|e| {
            CleanerError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(op.clone())
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

pub struct OperationTracker {
    ops: DashMap<OperationId, Arc<OperationHandle>>,
    max_finished: usize,
}

impl OperationTracker {
    pub fn new(max_finished: usize) -> Self {
        Self {
            ops: DashMap::new(),
            max_finished,
        }
    }

    /// Insert a new record and return its handle
    pub fn register(&self, op: DeletionOperation) -> Arc<OperationHandle> {
        let id = op.operation_id;
        let handle = Arc::new(OperationHandle::new(op));
        self.ops.insert(id, Arc::clone(&handle));
        self.evict_finished();
        handle
    }

    pub fn handle(&self, id: &OperationId) -> CleanerResult<Arc<OperationHandle>> {
        self.ops
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CleanerError::operation_not_found(id.to_string()))
    }

    pub fn get(&self, id: &OperationId) -> CleanerResult<DeletionOperation> {
        self.handle(id)?.snapshot()
    }

    /// Ask a running operation to stop before its next file
    ///
    /// Returns `false` when the operation had already finished.
    pub fn cancel(&self, id: &OperationId) -> CleanerResult<bool> {
        let handle = self.handle(id)?;
        if handle.snapshot()?.status.is_finished() {
            return Ok(false);
        }
        handle.request_cancel();
        debug!(operation_id = %id, "Cancellation requested");
        Ok(true)
    }

    /// Drop a finished record
    pub fn clear(&self, id: &OperationId) -> CleanerResult<()> {
        let handle = self.handle(id)?;
        if !handle.snapshot()?.status.is_finished() {
            return Err(CleanerError::Validation(format!(
                "Operation is still running: {}",
                id
            )));
        }
        self.ops.remove(id);
        Ok(())
    }

    pub fn list(&self) -> Vec<DeletionOperation> {
        let handles: Vec<Arc<OperationHandle>> =
            self.ops.iter().map(|r| Arc::clone(r.value())).collect();
        let mut ops: Vec<DeletionOperation> = handles
            .iter()
            .filter_map(|h| h.snapshot().ok())
            .collect();
        ops.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Keep at most `max_finished` finished records, dropping the oldest
    pub fn evict_finished(&self) {
        let mut finished: Vec<(OperationId, chrono::DateTime<Utc>)> = self
            .list()
            .into_iter()
            .filter(|op| op.status.is_finished())
            .map(|op| (op.operation_id, op.updated_at))
            .collect();

        if finished.len() <= self.max_finished {
            return;
        }

        finished.sort_by(|a, b| a.1.cmp(&b.1));
        let excess = finished.len() - self.max_finished;
        for (id, _) in finished.into_iter().take(excess) {
            self.ops.remove(&id);
            debug!(operation_id = %id, "Evicted finished operation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OperationStatus;

    fn finished(tracker: &OperationTracker) -> OperationId {
        let handle = tracker.register(DeletionOperation::new("op", 1, false));
        handle
            .update(|op| op.status = OperationStatus::Completed)
            .unwrap();
        handle.snapshot().unwrap().operation_id
    }

    #[test]
    fn test_register_and_poll() {
        let tracker = OperationTracker::new(10);
        let handle = tracker.register(DeletionOperation::new("op", 2, false));
        let id = handle.snapshot().unwrap().operation_id;

        handle
            .update(|op| {
                op.files_processed = 1;
                op.set_attempted(1);
            })
            .unwrap();

        let polled = tracker.get(&id).unwrap();
        assert_eq!(polled.files_processed, 1);
        assert_eq!(polled.progress, 50);
    }

    #[test]
    fn test_unknown_operation() {
        let tracker = OperationTracker::new(10);
        assert!(tracker.get(&OperationId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_cancel_sets_flag_only_while_running() {
        let tracker = OperationTracker::new(10);
        let handle = tracker.register(DeletionOperation::new("op", 1, false));
        let id = handle.snapshot().unwrap().operation_id;

        assert!(tracker.cancel(&id).unwrap());
        assert!(handle.is_cancelled());

        let done = finished(&tracker);
        assert!(!tracker.cancel(&done).unwrap());
    }

    #[test]
    fn test_clear_only_finished() {
        let tracker = OperationTracker::new(10);
        let running = tracker
            .register(DeletionOperation::new("op", 1, false))
            .snapshot()
            .unwrap()
            .operation_id;
        let done = finished(&tracker);

        assert!(tracker.clear(&running).unwrap_err().is_validation());
        tracker.clear(&done).unwrap();
        assert!(tracker.get(&done).unwrap_err().is_not_found());
    }

    #[test]
    fn test_eviction_keeps_running_and_newest_finished() {
        let tracker = OperationTracker::new(2);
        let running = tracker
            .register(DeletionOperation::new("op", 1, false))
            .snapshot()
            .unwrap()
            .operation_id;
        let first = finished(&tracker);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = finished(&tracker);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let third = finished(&tracker);
        tracker.evict_finished();

        assert!(tracker.get(&running).is_ok());
        assert!(tracker.get(&first).is_err());
        assert!(tracker.get(&second).is_ok());
        assert!(tracker.get(&third).is_ok());
    }

    #[test]
    fn test_concurrent_pollers_see_whole_updates() {
        let tracker = Arc::new(OperationTracker::new(10));
        let handle = tracker.register(DeletionOperation::new("op", 1000, false));
        let id = handle.snapshot().unwrap().operation_id;

        let writer = {
            let handle = Arc::clone(&handle);
            std::thread::spawn(move || {
                for i in 1..=1000usize {
                    handle
                        .update(|op| {
                            op.files_processed = i;
                            op.current_size = (i as u64) * 10;
                        })
                        .unwrap();
                }
            })
        };

        for _ in 0..200 {
            let op = tracker.get(&id).unwrap();
            assert_eq!(op.current_size, op.files_processed as u64 * 10);
        }
        writer.join().unwrap();
    }
}
