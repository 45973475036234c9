//! Coverage-discovery task types
//!
//! One row per asynchronous sub-task returned by a coverage-discovery call.
//! Tasks are append-only audit records: callbacks update status and detail
//! but tasks are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::order::OrderId;

/// Coverage-discovery task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a callback status string; unknown values are treated as a
    /// completion so a payer-side vocabulary drift cannot wedge an order.
    pub fn parse_callback(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pending" | "in_progress" | "running" => Self::Pending,
            "failed" | "error" => Self::Failed,
            _ => Self::Completed,
        }
    }
}

/// One asynchronous coverage-discovery sub-task owned by a parent order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageDiscoveryTask {
    pub order_id: OrderId,
    /// Task identifier assigned by the payer's discovery service
    pub external_task_id: String,
    pub name: String,
    pub status: TaskStatus,
    /// Arbitrary payload from the discovery path / callback, kept verbatim
    pub detail: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
