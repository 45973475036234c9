//! Coverage-discovery task tracking
//!
//! One task row per discovery path returned by the payer. Creation is
//! idempotent per external task id, callbacks are idempotent per redelivery,
//! and a completed task never regresses to pending.

use std::sync::Arc;

use meridian_common::Clock;
use meridian_domain::{
    CoverageDiscoveryTask, EngineError, OrderId, Result, TaskStatus,
};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ports::TaskRepository;

/// Aggregate completion state of an order's discovery tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCompletion {
    pub order_id: OrderId,
    pub total: usize,
    pub pending: usize,
    pub failed: usize,
}

impl TaskCompletion {
    /// All tasks have left the pending state
    pub fn is_settled(&self) -> bool {
        self.total > 0 && self.pending == 0
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Persists and advances asynchronous coverage-discovery sub-tasks
pub struct TaskTracker {
    tasks: Arc<dyn TaskRepository>,
    clock: Arc<dyn Clock>,
}

impl TaskTracker {
    pub fn new(tasks: Arc<dyn TaskRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { tasks, clock }
    }

    /// Create tasks from a coverage-discovery response.
    ///
    /// Idempotent per external task id: re-delivering the same discovery
    /// response creates nothing new. Returns only the tasks created by this
    /// call.
    pub async fn create_from_discovery(
        &self,
        order_id: OrderId,
        raw: &Value,
    ) -> Result<Vec<CoverageDiscoveryTask>> {
        let Some(paths) = raw.get("discoveryPaths").and_then(Value::as_array) else {
            debug!(order_id, "discovery response carried no discoveryPaths");
            return Ok(Vec::new());
        };

        let now = self.clock.utc_now();
        let mut created = Vec::new();

        for path in paths {
            let external_task_id = path
                .get("taskId")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("task-{}", Uuid::new_v4()));

            if self.tasks.find_by_external_id(&external_task_id).await?.is_some() {
                debug!(order_id, task_id = %external_task_id, "discovery task already exists");
                continue;
            }

            let task = CoverageDiscoveryTask {
                order_id,
                external_task_id,
                name: path
                    .get("taskName")
                    .and_then(Value::as_str)
                    .unwrap_or("Coverage Discovery")
                    .to_string(),
                status: TaskStatus::Pending,
                detail: path.clone(),
                created_at: now,
                updated_at: now,
            };
            self.tasks.insert_task(&task).await?;
            created.push(task);
        }

        info!(order_id, created = created.len(), "coverage discovery tasks recorded");
        Ok(created)
    }

    /// Apply one inbound discovery callback.
    ///
    /// Updates the task's status and merges the callback detail, then
    /// returns the order's aggregate completion state so the orchestrator
    /// can run its completion check.
    pub async fn handle_callback(
        &self,
        external_task_id: &str,
        payload: &Value,
    ) -> Result<TaskCompletion> {
        let Some(mut task) = self.tasks.find_by_external_id(external_task_id).await? else {
            return Err(EngineError::NotFound(format!(
                "no coverage-discovery task with external id {external_task_id}"
            )));
        };

        let next_status = payload
            .get("status")
            .and_then(Value::as_str)
            .map(TaskStatus::parse_callback)
            .unwrap_or(TaskStatus::Completed);

        if task.status == TaskStatus::Completed && next_status == TaskStatus::Pending {
            warn!(
                task_id = %external_task_id,
                "ignoring callback that would regress a completed task to pending"
            );
        } else {
            task.status = next_status;
        }

        task.detail = merge_detail(&task.detail, payload);
        task.updated_at = self.clock.utc_now();
        self.tasks.update_task(&task).await?;

        debug!(
            order_id = task.order_id,
            task_id = %external_task_id,
            status = task.status.as_str(),
            "discovery task updated"
        );

        self.completion_state(task.order_id).await
    }

    /// Aggregate completion counts for an order's tasks.
    pub async fn completion_state(&self, order_id: OrderId) -> Result<TaskCompletion> {
        let tasks = self.tasks.tasks_for_order(order_id).await?;
        Ok(TaskCompletion {
            order_id,
            total: tasks.len(),
            pending: tasks.iter().filter(|t| t.status == TaskStatus::Pending).count(),
            failed: tasks.iter().filter(|t| t.status == TaskStatus::Failed).count(),
        })
    }
}

/// Merge callback detail into the stored detail, payload keys winning.
/// Non-object payloads replace the stored detail wholesale.
fn merge_detail(existing: &Value, payload: &Value) -> Value {
    match (existing, payload) {
        (Value::Object(base), Value::Object(update)) => {
            let mut merged = base.clone();
            for (key, value) in update {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => payload.clone(),
    }
}
