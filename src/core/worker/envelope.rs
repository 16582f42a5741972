use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::error::LauncherError;
use crate::core::events::LauncherEvent;

pub const EXECUTE: &str = "execute";

pub const VALIDATE_JAVA: &str = "validateJava";
pub const ENQUEUE_OPENJDK: &str = "_enqueueOpenJDK";
pub const VALIDATE_EVERYTHING: &str = "validateEverything";
pub const PROCESS_DL_QUEUES: &str = "processDlQueues";

pub const PROGRESS: &str = "progress";
pub const COMPLETE: &str = "complete";
pub const ERROR: &str = "error";
pub const VALIDATE: &str = "validate";
pub const STATE: &str = "state";

/// A named operation for the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskEnvelope {
    pub task: String,
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl TaskEnvelope {
    pub fn execute(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            task: EXECUTE.to_string(),
            function: function.into(),
            args,
        }
    }
}

/// Everything the worker sends back: function results, forwarded progress,
/// completion and errors. Absent fields are left out of the JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultEnvelope {
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
}

impl ResultEnvelope {
    pub fn result(context: &str, result: Value) -> Self {
        Self {
            context: context.to_string(),
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failure(context: &str, err: &LauncherError) -> Self {
        Self {
            context: context.to_string(),
            error: Some(json!({ "kind": err.kind(), "message": err.to_string() })),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Envelope for a forwarded event. Game output stays out of the
    /// protocol.
    pub fn from_event(event: LauncherEvent) -> Option<Self> {
        let envelope = match event {
            LauncherEvent::Progress {
                kind,
                value,
                total,
                percent,
            } => Self {
                context: PROGRESS.to_string(),
                data: Some(json!(kind)),
                value: Some(value),
                total: Some(total),
                percent,
                ..Self::default()
            },
            LauncherEvent::PhaseComplete { phase } => Self {
                context: VALIDATE.to_string(),
                data: Some(json!(phase)),
                ..Self::default()
            },
            LauncherEvent::StateChanged { state } => Self {
                context: STATE.to_string(),
                data: Some(json!(state)),
                ..Self::default()
            },
            LauncherEvent::Complete => Self {
                context: COMPLETE.to_string(),
                data: Some(json!("download")),
                ..Self::default()
            },
            LauncherEvent::Error { context, message } => Self {
                context: ERROR.to_string(),
                data: Some(Value::String(context)),
                error: Some(Value::String(message)),
                ..Self::default()
            },
            LauncherEvent::GameOutput { .. } => return None,
        };
        Some(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::ProgressKind;

    #[test]
    fn task_args_default_to_empty() {
        let task: TaskEnvelope =
            serde_json::from_str(r#"{"task":"execute","function":"validateJava"}"#).unwrap();
        assert_eq!(task, TaskEnvelope::execute(VALIDATE_JAVA, Vec::new()));
    }

    #[test]
    fn progress_event_keeps_only_its_fields() {
        let envelope = ResultEnvelope::from_event(LauncherEvent::progress(ProgressKind::Download, 5, 10)).unwrap();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"context": "progress", "data": "download", "value": 5, "total": 10, "percent": 50})
        );
    }

    #[test]
    fn errors_carry_kind_and_message() {
        let envelope = ResultEnvelope::failure(
            VALIDATE_EVERYTHING,
            &LauncherError::Manifest("version 9.9 not in index".into()),
        );
        assert!(envelope.is_error());
        let error = envelope.error.unwrap();
        assert_eq!(error["kind"], "manifest");
        assert!(error["message"].as_str().unwrap().contains("9.9"));

        assert!(ResultEnvelope::from_event(LauncherEvent::GameOutput {
            line: "hi".into(),
            stderr: false
        })
        .is_none());
    }
}
