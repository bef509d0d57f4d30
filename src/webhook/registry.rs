//! Listener registry for task completion events
//!
//! Listeners are held weakly: the registering subsystem owns the `Arc` and a
//! dropped listener simply stops receiving events. The list is copy-on-write,
//! so a dispatch iterates the snapshot taken when it started while
//! registrations and removals proceed concurrently.

use super::payload::TaskCompleted;
use crate::telemetry::metrics;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::{error, warn};

/// Receives task completion events
pub trait TaskListener: Send + Sync {
    fn on_task_completed(&self, event: &TaskCompleted) -> anyhow::Result<()>;
}

impl<F> TaskListener for F
where
    F: Fn(&TaskCompleted) -> anyhow::Result<()> + Send + Sync,
{
    fn on_task_completed(&self, event: &TaskCompleted) -> anyhow::Result<()> {
        self(event)
    }
}

/// Handle returned by [`ListenerRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct Entry {
    id: ListenerId,
    listener: Weak<dyn TaskListener>,
}

type Snapshot = Arc<Vec<Entry>>;

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Process-wide set of task listeners
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    entries: RwLock<Snapshot>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. The registry keeps only a weak reference.
    pub fn register<L: TaskListener + 'static>(&self, listener: &Arc<L>) -> ListenerId {
        let strong: Arc<dyn TaskListener> = listener.clone();
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Entry {
            id,
            listener: Arc::downgrade(&strong),
        };

        self.update(|entries| entries.push(entry));
        id
    }

    /// Remove a listener; returns false when it was not registered
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            removed = entries.len() != before;
        });
        removed
    }

    /// Register a listener for as long as the returned guard lives
    pub fn subscribe<L: TaskListener + 'static>(
        self: &Arc<Self>,
        listener: Arc<L>,
    ) -> Subscription<L> {
        let id = self.register(&listener);
        Subscription {
            registry: Arc::downgrade(self),
            id,
            _listener: listener,
        }
    }

    /// Number of registered listeners that are still alive
    pub fn len(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|e| e.listener.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every listener, in registration order.
    ///
    /// A listener that errors or panics is logged and skipped; the remaining
    /// listeners still run.
    pub fn dispatch(&self, event: &TaskCompleted) -> DispatchReport {
        let snapshot = self.snapshot();
        let mut report = DispatchReport::default();

        for entry in snapshot.iter() {
            let Some(listener) = entry.listener.upgrade() else {
                continue;
            };

            match catch_unwind(AssertUnwindSafe(|| listener.on_task_completed(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(
                        "Listener {:?} failed on task {}: {:#}",
                        entry.id, event.task_id, e
                    );
                    report.failed += 1;
                }
                Err(_) => {
                    error!("Listener {:?} panicked on task {}", entry.id, event.task_id);
                    report.failed += 1;
                }
            }
        }

        metrics::record_listener_failures(report.failed);
        report
    }

    fn snapshot(&self) -> Snapshot {
        // A poisoned lock still holds a consistent Arc; keep using it
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update(&self, mutate: impl FnOnce(&mut Vec<Entry>)) {
        let mut guard = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut next: Vec<Entry> = guard
            .iter()
            .filter(|e| e.listener.strong_count() > 0)
            .cloned()
            .collect();
        mutate(&mut next);

        metrics::set_registered_listeners(next.len());
        *guard = Arc::new(next);
    }
}

/// Keeps a listener registered until dropped
pub struct Subscription<L: TaskListener + 'static> {
    registry: Weak<ListenerRegistry>,
    id: ListenerId,
    _listener: Arc<L>,
}

impl<L: TaskListener + 'static> Subscription<L> {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl<L: TaskListener + 'static> Drop for Subscription<L> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonar::{QualityGateStatus, TaskStatus};
    use std::sync::Mutex;

    fn event(task_id: &str) -> TaskCompleted {
        TaskCompleted {
            task_id: task_id.to_string(),
            status: TaskStatus::Success,
            quality_gate: Some(QualityGateStatus::Ok),
        }
    }

    /// Appends `tag` to a shared log on every event
    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> Arc<impl Fn(&TaskCompleted) -> anyhow::Result<()> + Send + Sync + 'static> {
        let log = log.clone();
        Arc::new(move |e: &TaskCompleted| {
            log.lock().unwrap().push(format!("{}:{}", tag, e.task_id));
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");
        registry.register(&a);
        registry.register(&b);

        let report = registry.dispatch(&event("t1"));

        assert_eq!(report, DispatchReport { delivered: 2, failed: 0 });
        assert_eq!(*log.lock().unwrap(), vec!["a:t1", "b:t1"]);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = Arc::new(|_: &TaskCompleted| -> anyhow::Result<()> {
            anyhow::bail!("listener exploded")
        });
        let after = recorder(&log, "b");
        registry.register(&failing);
        registry.register(&after);

        let report = registry.dispatch(&event("t1"));

        assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["b:t1"]);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_others() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let panicking = Arc::new(|_: &TaskCompleted| -> anyhow::Result<()> {
            panic!("listener panicked")
        });
        let after = recorder(&log, "b");
        registry.register(&panicking);
        registry.register(&after);

        let report = registry.dispatch(&event("t1"));

        assert_eq!(report.failed, 1);
        assert_eq!(*log.lock().unwrap(), vec!["b:t1"]);
    }

    #[test]
    fn test_unregister() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&log, "a");
        let id = registry.register(&a);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert_eq!(registry.dispatch(&event("t1")).delivered, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dropped_listener_is_skipped_and_pruned() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&log, "a");
        registry.register(&a);
        assert_eq!(registry.len(), 1);

        drop(a);

        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(&event("t1")).delivered, 0);
    }

    #[test]
    fn test_subscription_unregisters_on_drop() {
        let registry = Arc::new(ListenerRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let subscription = registry.subscribe(recorder(&log, "a"));
        registry.dispatch(&event("t1"));
        drop(subscription);
        registry.dispatch(&event("t2"));

        assert_eq!(*log.lock().unwrap(), vec!["a:t1"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mutation_during_dispatch_uses_snapshot() {
        let registry = Arc::new(ListenerRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = recorder(&log, "late");

        let registering = {
            let registry = Arc::downgrade(&registry);
            let late = late.clone();
            let log = log.clone();
            Arc::new(move |e: &TaskCompleted| -> anyhow::Result<()> {
                log.lock().unwrap().push(format!("first:{}", e.task_id));
                if let Some(registry) = registry.upgrade() {
                    registry.register(&late);
                }
                Ok(())
            })
        };
        registry.register(&registering);

        registry.dispatch(&event("t1"));
        assert_eq!(*log.lock().unwrap(), vec!["first:t1"]);

        registry.dispatch(&event("t2"));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:t1", "first:t2", "late:t2"]
        );
    }

    #[test]
    fn test_concurrent_register_and_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let keep: Vec<_> = (0..8).map(|_| recorder(&log, "x")).collect();

        std::thread::scope(|scope| {
            for listener in &keep {
                let registry = registry.clone();
                scope.spawn(move || {
                    registry.register(listener);
                });
            }
            for _ in 0..4 {
                let registry = registry.clone();
                scope.spawn(move || {
                    registry.dispatch(&event("t"));
                });
            }
        });

        assert_eq!(registry.len(), 8);
        assert_eq!(registry.dispatch(&event("final")).delivered, 8);
    }
}
