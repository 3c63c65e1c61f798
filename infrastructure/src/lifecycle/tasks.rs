//! Tracking of supervising tasks
//!
//! The registry only observes: it remembers each task's name and abort
//! handle so everything still running can be cancelled in one sweep. Each
//! task removes its own entry when it finishes, whether it completed or was
//! aborted.

use super::error::LifecycleError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

struct TrackedTask {
    name: String,
    abort: AbortHandle,
}

type TaskMap = Arc<Mutex<HashMap<u64, TrackedTask>>>;

/// Removes a task's entry when the task's future is dropped.
struct RemoveOnDrop {
    tasks: TaskMap,
    id: u64,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

#[derive(Default)]
pub struct TaskRegistry {
    tracker: TaskTracker,
    tasks: TaskMap,
    next_id: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` on the current runtime and track it.
    pub fn spawn<F>(&self, name: &str, future: F) -> Result<JoinHandle<F::Output>, LifecycleError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| {
            error!("Cannot schedule task '{}': no async runtime", name);
            LifecycleError::NoRuntime(name.to_string())
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = RemoveOnDrop {
            tasks: self.tasks.clone(),
            id,
        };
        let handle = self.tracker.spawn_on(
            async move {
                let _guard = guard;
                future.await
            },
            &runtime,
        );

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.insert(
            id,
            TrackedTask {
                name: name.to_string(),
                abort: handle.abort_handle(),
            },
        );
        if handle.is_finished() {
            tasks.remove(&id);
        }
        debug!("Spawned task '{}' (#{})", name, id);
        Ok(handle)
    }

    /// Number of tasks that have not finished yet.
    pub fn active_count(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Abort every running task and wait, at most `timeout`, for them to
    /// finish unwinding. Returns how many tasks were aborted.
    pub async fn cancel_all(&self, timeout: Duration) -> usize {
        let snapshot: Vec<(String, AbortHandle)> = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|t| (t.name.clone(), t.abort.clone()))
            .collect();

        for (name, abort) in &snapshot {
            debug!("Cancelling task '{}'", name);
            abort.abort();
        }

        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_err() {
            warn!(
                "{} tasks still running {:?} after cancellation",
                self.tracker.len(),
                timeout
            );
        }
        self.tracker.reopen();

        snapshot.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_task_removes_itself() {
        let registry = TaskRegistry::new();
        let handle = registry.spawn("quick", async { 7 }).unwrap();
        assert_eq!(registry.active_count(), 1);

        assert_eq!(handle.await.unwrap(), 7);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_aborts_running_tasks() {
        let registry = TaskRegistry::new();
        let a = registry
            .spawn("a", tokio::time::sleep(Duration::from_secs(3600)))
            .unwrap();
        let b = registry
            .spawn("b", tokio::time::sleep(Duration::from_secs(3600)))
            .unwrap();
        assert_eq!(registry.active_names(), vec!["a", "b"]);

        let cancelled = registry.cancel_all(Duration::from_secs(2)).await;

        assert_eq!(cancelled, 2);
        assert_eq!(registry.active_count(), 0);
        assert!(a.await.unwrap_err().is_cancelled());
        assert!(b.await.unwrap_err().is_cancelled());

        // Still usable afterwards
        let c = registry.spawn("c", async {}).unwrap();
        c.await.unwrap();
    }

    #[test]
    fn test_spawn_without_runtime_fails() {
        let registry = TaskRegistry::new();
        let result = registry.spawn("orphan", async {});
        assert!(matches!(result, Err(LifecycleError::NoRuntime(name)) if name == "orphan"));
    }
}
