//! # Task Scheduler
//!
//! Owns deferred and recurring units of work ("tasks") plus the in-memory
//! name→worker map that executes them. Tasks are tagged and queried by tag;
//! the scheduler loop wakes on a fixed cadence, finds due tasks, and runs
//! each one inside a failure boundary — a single task failure never halts
//! the loop.
//!
//! Due rules:
//! - recurring tasks (an `update_interval_ms` or the `repeat` tag) are due
//!   when the interval has elapsed since the last run (or since creation);
//! - one-shot tasks are due when they have never run, and are deleted after
//!   a successful execution;
//! - the `immediate` tag makes a task due on the next tick regardless of
//!   elapsed interval.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex as TokioMutex, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use axon_core::task::tags;
use axon_core::{EventBus, RuntimeEvent, Task, TaskWorker};

use axon_config::{DeadlineConfig, SchedulerConfig};

use crate::deadline::with_deadline;

/// The interval/tag task scheduler.
pub struct TaskScheduler {
    tasks: Arc<TokioMutex<HashMap<Uuid, Task>>>,
    workers: Arc<TokioMutex<HashMap<String, Arc<dyn TaskWorker>>>>,
    tick_interval: Duration,
    deadlines: DeadlineConfig,
    events: EventBus,
    shutdown: Notify,
    stopped: AtomicBool,
}

impl TaskScheduler {
    pub fn new(config: &SchedulerConfig, deadlines: DeadlineConfig, events: EventBus) -> Self {
        Self {
            tasks: Arc::new(TokioMutex::new(HashMap::new())),
            workers: Arc::new(TokioMutex::new(HashMap::new())),
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            deadlines,
            events,
            shutdown: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Insert a task record.
    ///
    /// Worker existence is not validated here — the worker may be registered
    /// later or never; a missing-worker task is simply never executed.
    pub async fn create_task(&self, task: Task) -> Uuid {
        let id = task.id;
        let name = task.name.clone();
        self.tasks.lock().await.insert(id, task);
        info!(task_id = %id, task = %name, "task created");
        self.events.publish(RuntimeEvent::TaskCreated { task_id: id, name });
        id
    }

    /// Get a task by id.
    pub async fn get_task(&self, task_id: Uuid) -> Option<Task> {
        self.tasks.lock().await.get(&task_id).cloned()
    }

    /// All tasks whose tag set is a superset of the requested tags
    /// (AND semantics across requested tags; empty request matches all).
    pub async fn get_tasks(&self, tags: &[String]) -> Vec<Task> {
        self.tasks
            .lock()
            .await
            .values()
            .filter(|t| t.matches_tags(tags))
            .cloned()
            .collect()
    }

    /// All tasks with the given worker name.
    pub async fn get_tasks_by_name(&self, name: &str) -> Vec<Task> {
        self.tasks
            .lock()
            .await
            .values()
            .filter(|t| t.name == name)
            .cloned()
            .collect()
    }

    /// Idempotent removal: deleting an absent id is a no-op.
    pub async fn delete_task(&self, task_id: Uuid) -> bool {
        let removed = self.tasks.lock().await.remove(&task_id).is_some();
        if removed {
            debug!(task_id = %task_id, "task deleted");
            self.events.publish(RuntimeEvent::TaskDeleted { task_id });
        }
        removed
    }

    /// Delete every task matching name + tag superset. Used to clear
    /// superseded work before re-creating it.
    pub async fn delete_tasks(&self, name: &str, tags: &[String]) -> usize {
        let ids: Vec<Uuid> = {
            let tasks = self.tasks.lock().await;
            tasks
                .values()
                .filter(|t| t.name == name && t.matches_tags(tags))
                .map(|t| t.id)
                .collect()
        };
        let mut deleted = 0;
        for id in ids {
            if self.delete_task(id).await {
                deleted += 1;
            }
        }
        deleted
    }

    /// Register a worker for tasks of the same name.
    ///
    /// Last registration wins: re-registering a name overwrites the prior
    /// worker, which plugins rely on when they re-register on reload.
    pub async fn register_worker(&self, worker: Arc<dyn TaskWorker>) {
        let name = worker.name().to_string();
        let previous = self.workers.lock().await.insert(name.clone(), worker);
        if previous.is_some() {
            warn!(worker = %name, "task worker re-registered, replacing previous");
        } else {
            debug!(worker = %name, "task worker registered");
        }
    }

    /// Whether a worker is registered under the given name.
    pub async fn has_worker(&self, name: &str) -> bool {
        self.workers.lock().await.contains_key(name)
    }

    /// Number of live task records.
    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    fn is_due(task: &Task, now: DateTime<Utc>) -> bool {
        if task.has_tag(tags::IMMEDIATE) {
            return true;
        }
        match task.metadata.update_interval_ms {
            Some(interval_ms) => {
                let last = task.metadata.updated_at.unwrap_or(task.created_at);
                now - last >= chrono::Duration::milliseconds(interval_ms as i64)
            }
            // No interval: due only while it has never run.
            None => task.metadata.updated_at.is_none(),
        }
    }

    /// Run one scheduler pass: execute every due task.
    ///
    /// Each execution sits inside a failure boundary — a worker error (or
    /// deadline expiry) is logged and the pass continues with the next due
    /// task. Recurring tasks are re-armed by stamping `metadata.updated_at`;
    /// one-shot tasks are deleted after successful execution.
    pub async fn tick(&self) {
        let now = Utc::now();
        let due: Vec<Task> = {
            let tasks = self.tasks.lock().await;
            tasks
                .values()
                .filter(|t| Self::is_due(t, now))
                .cloned()
                .collect()
        };

        for task in due {
            let worker = self.workers.lock().await.get(&task.name).cloned();
            let Some(worker) = worker else {
                debug!(task = %task.name, task_id = %task.id, "no worker registered, skipping");
                continue;
            };

            if !worker.validate(&task).await {
                debug!(task = %task.name, task_id = %task.id, "worker declined task");
                continue;
            }

            let options = task.metadata.extra.clone();
            let result =
                with_deadline(self.deadlines.task_ms, worker.execute(&options, &task)).await;

            match result {
                Ok(()) => {
                    debug!(task = %task.name, task_id = %task.id, "task executed");
                    self.events.publish(RuntimeEvent::TaskExecuted {
                        task_id: task.id,
                        name: task.name.clone(),
                    });
                    if task.is_recurring() {
                        self.rearm(task.id, now).await;
                    } else {
                        self.delete_task(task.id).await;
                    }
                }
                Err(e) => {
                    error!(task = %task.name, task_id = %task.id, error = %e, "task failed, continuing");
                    self.events.publish(RuntimeEvent::TaskFailed {
                        task_id: task.id,
                        name: task.name.clone(),
                        error: e.to_string(),
                    });
                    // Re-arm recurring tasks on failure too, so a broken
                    // worker retries on its interval instead of every tick.
                    if task.is_recurring() {
                        self.rearm(task.id, now).await;
                    }
                }
            }
        }
    }

    async fn rearm(&self, task_id: Uuid, now: DateTime<Utc>) {
        if let Some(task) = self.tasks.lock().await.get_mut(&task_id) {
            task.metadata.updated_at = Some(now);
        }
    }

    /// Run the scheduler loop until [`TaskScheduler::stop`] is called.
    /// Spawn this on its own tokio task.
    pub async fn run(self: Arc<Self>) {
        info!(interval_ms = self.tick_interval.as_millis() as u64, "task scheduler started");
        while !self.stopped.load(Ordering::SeqCst) {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = tokio::time::sleep(self.tick_interval) => {
                    self.tick().await;
                }
            }
        }
        info!("task scheduler stopped");
    }

    /// Signal the scheduler loop to exit after the current pass. Safe to
    /// call before or after the loop has been spawned.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }
}
