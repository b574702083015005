use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Ordered, immutable sequence of executable lines. Cloning shares the
/// underlying storage, so a registry entry and any number of in-flight handles
/// can hold the same body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBody {
    lines: Arc<[String]>,
}

impl ScriptBody {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_source(source: &str) -> Self {
        Self::from_lines(source.lines())
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn shares_storage_with(&self, other: &ScriptBody) -> bool {
        Arc::ptr_eq(&self.lines, &other.lines)
    }
}

/// What happened to the call a suspended script issued, delivered to the
/// caller's handle when it is restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult {
    Returned { value: Option<String> },
    Rejected { reason: String },
}

/// Runtime state of one script instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHandle {
    name: String,
    body: ScriptBody,
    cursor: usize,
    call_result: Option<CallResult>,
    scratch: BTreeMap<String, String>,
}

impl ScriptHandle {
    pub fn new(name: impl Into<String>, body: ScriptBody) -> Self {
        Self {
            name: name.into(),
            body,
            cursor: 0,
            call_result: None,
            scratch: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &ScriptBody {
        &self.body
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, line: usize) {
        self.cursor = line;
    }

    pub fn advance(&mut self) -> usize {
        self.cursor += 1;
        self.cursor
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.body.len()
    }

    pub fn current_text(&self) -> Option<&str> {
        self.body.line(self.cursor)
    }

    pub fn deliver_call_result(&mut self, result: CallResult) {
        self.call_result = Some(result);
    }

    pub fn call_result(&self) -> Option<&CallResult> {
        self.call_result.as_ref()
    }

    pub fn take_call_result(&mut self) -> Option<CallResult> {
        self.call_result.take()
    }

    /// Per-instance values a step provider keeps across ticks (wait deadlines,
    /// loop counters). They travel with the handle while it sits in a call frame.
    pub fn scratch(&self, key: &str) -> Option<&str> {
        self.scratch.get(key).map(String::as_str)
    }

    pub fn set_scratch(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.scratch.insert(key.into(), value.into());
    }

    pub fn remove_scratch(&mut self, key: &str) -> Option<String> {
        self.scratch.remove(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HighlightKind {
    Error,
    Execution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerPhase {
    Idle,
    Queued,
    Running,
    Paused,
    Suspended,
}

/// Outbound notifications for presentation and logging collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchedulerEvent {
    Started {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    Finished {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elapsed_ms: Option<u64>,
    },
    /// `line` is one-based.
    Errored {
        name: String,
        message: String,
        line: usize,
    },
    /// `line` is one-based.
    ParseFailed {
        name: String,
        message: String,
        text: String,
        line: usize,
    },
    CallRejected {
        name: String,
        message: String,
    },
    Paused {
        line: usize,
    },
    Resumed {
        line: usize,
    },
    /// `line` is the zero-based editor line.
    Highlight {
        line: usize,
        highlight: HighlightKind,
    },
    ClearHighlight {
        highlight: HighlightKind,
    },
    ClearAllHighlights,
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn body_clones_share_storage() {
        let body = ScriptBody::from_source("say hi\nwait 2\n");
        let copy = body.clone();
        assert!(body.shares_storage_with(&copy));
        assert_eq!(body.len(), 2);
        assert_eq!(body.line(1), Some("wait 2"));
        assert_eq!(body.line(2), None);
    }

    #[test]
    fn handle_cursor_and_call_result_lifecycle() {
        let mut handle = ScriptHandle::new("main", ScriptBody::from_lines(["a", "b"]));
        assert_eq!(handle.cursor(), 0);
        assert_eq!(handle.current_text(), Some("a"));
        assert_eq!(handle.advance(), 1);
        assert!(!handle.is_at_end());
        handle.advance();
        assert!(handle.is_at_end());
        assert_eq!(handle.current_text(), None);

        handle.deliver_call_result(CallResult::Returned {
            value: Some("7".to_string()),
        });
        assert!(handle.call_result().is_some());
        assert_eq!(
            handle.take_call_result(),
            Some(CallResult::Returned {
                value: Some("7".to_string())
            })
        );
        assert_eq!(handle.take_call_result(), None);
    }

    #[test]
    fn handle_scratch_round_trip() {
        let mut handle = ScriptHandle::new("main", ScriptBody::from_lines(["a"]));
        handle.set_scratch("wait", "3");
        assert_eq!(handle.scratch("wait"), Some("3"));
        assert_eq!(handle.remove_scratch("wait"), Some("3".to_string()));
        assert_eq!(handle.scratch("wait"), None);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let json = serde_json::to_string(&SchedulerEvent::Finished {
            name: "main".to_string(),
            elapsed_ms: None,
        })
        .expect("event should serialize");
        assert_eq!(json, r#"{"kind":"finished","name":"main"}"#);

        let json = serde_json::to_string(&SchedulerEvent::Highlight {
            line: 4,
            highlight: HighlightKind::Execution,
        })
        .expect("event should serialize");
        assert_eq!(json, r#"{"kind":"highlight","line":4,"highlight":"execution"}"#);
    }
}
