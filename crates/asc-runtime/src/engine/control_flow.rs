use asc_core::{CallResult, SchedulerEvent, ScriptBody, ScriptError, ScriptHandle};
use tracing::{debug, info, warn};

use super::callstack::{CallFrame, MAX_CALL_DEPTH};
use super::host::CallRequest;
use super::lifecycle::{QueueKind, QueuedScript, ScriptScheduler};

impl ScriptScheduler {
    pub fn call_by_name(
        &mut self,
        target: &str,
        params: Option<Vec<String>>,
    ) -> Result<bool, ScriptError> {
        let resolved = self.resolver.resolve(target).ok_or_else(|| {
            ScriptError::new(
                "ENGINE_CALL_TARGET",
                format!("Call target script \"{}\" not found.", target),
            )
        })?;
        Ok(self.call_script(&resolved.name, resolved.body, params))
    }

    /// Suspends the active script and stages `name` to run next. Returns false
    /// when the call is rejected; the caller then keeps running and finds a
    /// `CallResult::Rejected` on its handle.
    pub fn call_script(
        &mut self,
        name: &str,
        body: ScriptBody,
        params: Option<Vec<String>>,
    ) -> bool {
        if !self.host.is_available() {
            debug!(script = %name, "call ignored, host unavailable");
            return false;
        }

        if self.call_stack.depth() >= MAX_CALL_DEPTH {
            let message = format!(
                "Max call depth {} reached. Call to '{}' canceled.",
                MAX_CALL_DEPTH, name
            );
            warn!(script = %name, depth = self.call_stack.depth(), "call rejected");
            self.notifications.notify(SchedulerEvent::CallRejected {
                name: name.to_string(),
                message: message.clone(),
            });
            self.reject_pending_call(message);
            return false;
        }

        if let Err(error) = self.parser.parse(name, &body) {
            self.report_parse_failure(name, &error);
            self.reject_pending_call(error.to_string());
            return false;
        }

        // A callee staged but not yet promoted already owns the caller's frame.
        if !self.call_pending && !self.suspend_caller() {
            return false;
        }

        self.bind_call_params(params.as_deref());
        self.call_pending = true;
        self.queued = Some(QueuedScript {
            handle: ScriptHandle::new(name, body),
            display_name: name.to_string(),
            kind: QueueKind::Call,
        });
        info!(script = %name, depth = self.call_stack.depth(), "queued call");
        true
    }

    /// Leaves the active callee and restores its caller on the next tick. With
    /// no caller to return to this degrades to `stop`.
    pub fn return_from_call(&mut self, value: Option<String>) {
        if !self.call_stack.has_calls() {
            debug!("return with empty call stack, stopping");
            self.stop();
            return;
        }

        if let Some(callee) = self.active.take() {
            debug!(script = %callee.name(), line = callee.cursor(), "explicit return");
            self.last_line = callee.cursor();
        }
        if let Some(frame) = self.call_stack.peek_mut() {
            frame.return_value = value;
        }
        self.resume_caller();
    }

    pub(super) fn handle_call_request(&mut self, request: CallRequest) {
        let Some(resolved) = self.resolver.resolve(&request.target) else {
            let line = self.current_line();
            self.fail_run(ScriptError::with_line(
                "ENGINE_CALL_TARGET",
                format!("Call target script \"{}\" not found.", request.target),
                line,
            ));
            return;
        };
        self.call_script(&resolved.name, resolved.body, request.params);
    }

    /// Pops the innermost frame and stages its caller at the recorded line.
    pub(super) fn resume_caller(&mut self) -> bool {
        if !self.call_stack.has_calls() {
            return false;
        }
        let Some(frame) = self.call_stack.pop() else {
            return false;
        };

        let CallFrame {
            mut caller,
            caller_name,
            resume_line,
            return_value,
        } = frame;
        caller.set_cursor(resume_line);
        caller.deliver_call_result(CallResult::Returned {
            value: return_value,
        });
        debug!(script = %caller_name, resume_line, "returning from call");

        self.call_pending = false;
        self.queued = Some(QueuedScript {
            handle: caller,
            display_name: caller_name,
            kind: QueueKind::Return,
        });
        true
    }

    /// Moves whoever should resume after the callee onto the call stack: the
    /// active script, or a caller already staged to return. False when the
    /// stack refused the frame; the caller is then left where it was.
    fn suspend_caller(&mut self) -> bool {
        if let Some(caller) = self.active.take() {
            let caller_name = self
                .active_name
                .clone()
                .unwrap_or_else(|| caller.name().to_string());
            return match self.call_stack.push(CallFrame::new(caller, caller_name)) {
                Ok(()) => true,
                Err(frame) => {
                    self.active = Some(frame.caller);
                    false
                }
            };
        }

        let staged_return = matches!(
            self.queued.as_ref(),
            Some(queued) if queued.kind == QueueKind::Return
        );
        if !staged_return {
            return true;
        }
        let Some(staged) = self.queued.take() else {
            return true;
        };
        debug!(script = %staged.display_name, "re-suspending caller staged for return");
        match self
            .call_stack
            .push(CallFrame::new(staged.handle, staged.display_name))
        {
            Ok(()) => true,
            Err(frame) => {
                self.queued = Some(QueuedScript {
                    handle: frame.caller,
                    display_name: frame.caller_name,
                    kind: QueueKind::Return,
                });
                false
            }
        }
    }

    fn reject_pending_call(&mut self, reason: String) {
        if let Some(active) = self.active.as_mut() {
            active.deliver_call_result(CallResult::Rejected { reason });
        }
    }

    fn bind_call_params(&mut self, params: Option<&[String]>) {
        match params {
            Some(params) => {
                for (index, value) in params.iter().enumerate() {
                    self.variables
                        .set_variable(&format!("arg{}", index), value, true);
                }
                self.variables
                    .set_variable("argc", &params.len().to_string(), true);
            }
            None => {
                if self.variables.exists_alias("argc") {
                    self.variables.clear_alias("argc");
                }
            }
        }
    }
}
