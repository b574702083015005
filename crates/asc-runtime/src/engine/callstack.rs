use asc_core::ScriptHandle;
use tracing::{debug, warn};

/// Maximum number of suspended callers.
pub const MAX_CALL_DEPTH: usize = 32;

/// A suspended caller waiting for its callee to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub caller: ScriptHandle,
    pub caller_name: String,
    pub resume_line: usize,
    pub return_value: Option<String>,
}

impl CallFrame {
    /// Captures the caller's current cursor as the resume point.
    pub fn new(caller: ScriptHandle, caller_name: impl Into<String>) -> Self {
        let resume_line = caller.cursor();
        Self {
            caller,
            caller_name: caller_name.into(),
            resume_line,
            return_value: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the frame unless the stack is full, in which case the frame is
    /// handed back untouched.
    pub fn push(&mut self, frame: CallFrame) -> Result<(), CallFrame> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            warn!(
                caller = %frame.caller_name,
                "max call depth {} reached, ignoring push", MAX_CALL_DEPTH
            );
            return Err(frame);
        }

        debug!(
            caller = %frame.caller_name,
            resume_line = frame.resume_line,
            depth_before = self.frames.len(),
            depth_after = self.frames.len() + 1,
            "pushed call frame"
        );
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        let Some(frame) = self.frames.pop() else {
            warn!("attempted to pop empty call stack");
            return None;
        };
        debug!(
            caller = %frame.caller_name,
            depth_after = self.frames.len(),
            "popped call frame"
        );
        Some(frame)
    }

    pub fn peek(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn peek_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn has_calls(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.frames.is_empty() {
            debug!(depth_before = self.frames.len(), "clearing call stack");
        }
        self.frames.clear();
    }

    /// Frames from the outermost caller to the innermost.
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }
}

#[cfg(test)]
mod callstack_tests {
    use super::*;
    use asc_core::ScriptBody;

    fn frame(name: &str, line: usize) -> CallFrame {
        let mut handle = ScriptHandle::new(name, ScriptBody::from_lines(["a", "b", "c"]));
        handle.set_cursor(line);
        CallFrame::new(handle, name)
    }

    #[test]
    fn push_up_to_max_depth_then_rejects_without_mutation() {
        let mut stack = CallStack::new();
        for index in 0..MAX_CALL_DEPTH {
            assert!(stack.push(frame(&format!("s{}", index), index)).is_ok());
            assert_eq!(stack.depth(), index + 1);
        }

        let rejected = stack
            .push(frame("overflow", 1))
            .expect_err("push past the limit should be rejected");
        assert_eq!(rejected.caller_name, "overflow");
        assert_eq!(stack.depth(), MAX_CALL_DEPTH);
        assert_eq!(
            stack.peek().map(|top| top.caller_name.as_str()),
            Some("s31")
        );
        assert_eq!(stack.frames()[0].caller_name, "s0");
    }

    #[test]
    fn pop_is_lifo_and_returns_exact_frame() {
        let mut stack = CallStack::new();
        let first = frame("first", 1);
        let second = frame("second", 2);
        stack.push(first.clone()).expect("push");
        stack.push(second.clone()).expect("push");

        assert_eq!(stack.pop(), Some(second));
        stack.push(frame("third", 0)).expect("push");
        assert_eq!(stack.pop().map(|f| f.caller_name), Some("third".to_string()));
        assert_eq!(stack.pop(), Some(first));
        assert!(!stack.has_calls());
    }

    #[test]
    fn empty_stack_edges_are_not_errors() {
        let mut stack = CallStack::new();
        assert_eq!(stack.pop(), None);
        assert!(stack.peek().is_none());
        stack.clear();
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn frame_captures_cursor_as_resume_line_and_peek_does_not_mutate() {
        let mut stack = CallStack::new();
        stack.push(frame("caller", 2)).expect("push");
        assert_eq!(stack.peek().map(|top| top.resume_line), Some(2));
        assert_eq!(stack.depth(), 1);

        if let Some(top) = stack.peek_mut() {
            top.return_value = Some("ok".to_string());
        }
        let popped = stack.pop().expect("frame");
        assert_eq!(popped.return_value.as_deref(), Some("ok"));
        assert_eq!(popped.caller.cursor(), 2);
    }

    #[test]
    fn clear_drops_every_frame() {
        let mut stack = CallStack::new();
        for index in 0..5 {
            stack.push(frame("s", index)).expect("push");
        }
        stack.clear();
        assert!(!stack.has_calls());
        assert_eq!(stack.depth(), 0);
    }
}
