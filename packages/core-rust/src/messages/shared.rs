//! Types shared by history requests, responses, and replication tasks.
//!
//! Engine-specific payloads (event attributes, decisions, activity results)
//! are carried as opaque bytes: the router never interprets them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Kind of a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskListKind {
    #[default]
    Normal,
    Sticky,
}

/// Encoding of a serialized [`DataBlob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncodingType {
    #[default]
    ThriftRw,
    Json,
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// Identity of a single workflow run.
///
/// `run_id` is absent when the caller addresses the current run of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub workflow_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_id: Option<String>,
}

impl WorkflowExecution {
    /// Creates an execution reference with a run ID.
    #[must_use]
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: Some(run_id.into()),
        }
    }

    /// Creates an execution reference to the current run of a workflow.
    #[must_use]
    pub fn current(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: None,
        }
    }
}

/// Registered workflow type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowType {
    pub name: String,
}

/// A named task list workers poll from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub name: String,
    #[serde(default)]
    pub kind: TaskListKind,
}

impl TaskList {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TaskListKind::Normal,
        }
    }
}

/// Serialized payload with its encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBlob {
    pub encoding: EncodingType,
    #[serde(with = "serde_bytes", default)]
    pub data: Vec<u8>,
}

/// A single history event. Attributes stay encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub event_id: i64,
    pub timestamp: i64,
    pub event_type: String,
    pub version: i64,
    pub task_id: i64,
    #[serde(with = "serde_bytes", default)]
    pub attributes: Vec<u8>,
}

/// An ordered batch of history events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    #[serde(default)]
    pub events: Vec<HistoryEvent>,
}

impl History {
    /// Returns the ID of the first event, if any.
    #[must_use]
    pub fn first_event_id(&self) -> Option<i64> {
        self.events.first().map(|e| e.event_id)
    }

    /// Returns the ID of the last event, if any.
    #[must_use]
    pub fn last_event_id(&self) -> Option<i64> {
        self.events.last().map(|e| e.event_id)
    }
}

/// Last replicated event per source cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationInfo {
    pub version: i64,
    pub last_event_id: i64,
}

/// Caller-side parent reference for child workflows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentExecutionInfo {
    pub domain_uuid: String,
    pub domain: String,
    pub execution: WorkflowExecution,
    pub initiated_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_execution_omits_missing_run_id() {
        let json = serde_json::to_string(&WorkflowExecution::current("wf")).unwrap();
        assert_eq!(json, r#"{"workflowId":"wf"}"#);
    }

    #[test]
    fn task_list_kind_defaults_to_normal() {
        let tl: TaskList = serde_json::from_str(r#"{"name":"tl"}"#).unwrap();
        assert_eq!(tl, TaskList::named("tl"));
    }

    #[test]
    fn history_event_bounds() {
        let history = History {
            events: vec![
                HistoryEvent {
                    event_id: 3,
                    ..HistoryEvent::default()
                },
                HistoryEvent {
                    event_id: 5,
                    ..HistoryEvent::default()
                },
            ],
        };
        assert_eq!(history.first_event_id(), Some(3));
        assert_eq!(history.last_event_id(), Some(5));
        assert_eq!(History::default().first_event_id(), None);
    }
}
