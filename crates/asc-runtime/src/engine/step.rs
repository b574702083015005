use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use asc_core::{HighlightKind, SchedulerEvent, SchedulerPhase, ScriptError, ScriptHandle};
use tracing::{debug, info, trace, warn};

use super::host::StepOutcome;
use super::lifecycle::{QueuedScript, ScriptScheduler};

#[derive(Debug, Clone, Copy)]
enum StepKind {
    Start,
    Step,
}

impl ScriptScheduler {
    /// One advance of the state machine. Failures are turned into
    /// notifications; nothing escapes to the caller's timer loop.
    pub fn tick(&mut self) -> SchedulerPhase {
        if !self.host.is_available() {
            if self.running || self.active.is_some() || self.queued.is_some() {
                let line = self.current_line();
                self.fail_run(ScriptError::with_line(
                    "ENGINE_HOST_UNAVAILABLE",
                    "Host became unavailable.",
                    line,
                ));
            }
            return self.phase();
        }

        if self.paused {
            trace!("tick skipped while paused");
            return self.phase();
        }

        let outcome = if let Some(queued) = self.queued.take() {
            self.promote(queued);
            self.run_provider(StepKind::Start)
        } else if self.active.is_some() {
            self.run_provider(StepKind::Step)
        } else if self.running {
            // The active script was stopped between ticks.
            Ok(StepOutcome::Complete)
        } else {
            return SchedulerPhase::Idle;
        };

        match outcome {
            Ok(StepOutcome::Continue) => self.mark_line(),
            Ok(StepOutcome::Call(request)) => {
                self.mark_line();
                self.handle_call_request(request);
            }
            Ok(StepOutcome::Return(value)) => self.return_from_call(value),
            Ok(StepOutcome::Complete) => self.complete_active(),
            Err(error) => self.fail_run(error),
        }

        self.phase()
    }

    fn promote(&mut self, queued: QueuedScript) {
        self.call_pending = false;
        debug!(
            script = %queued.display_name,
            kind = ?queued.kind,
            line = queued.handle.cursor(),
            "promoting queued script"
        );

        if !self.running {
            self.running = true;
            self.run_name = Some(queued.display_name.clone());
            if !self.config.disable_play_finish {
                if !self.config.disable_stopwatch {
                    self.stopwatch = Some(Instant::now());
                }
                self.notifications.notify(SchedulerEvent::Started {
                    name: queued.display_name.clone(),
                });
            }
        }

        self.active_name = Some(queued.display_name);
        self.active = Some(queued.handle);
    }

    fn run_provider(&mut self, kind: StepKind) -> Result<StepOutcome, ScriptError> {
        let Some(script) = self.active.as_mut() else {
            return Ok(StepOutcome::Complete);
        };
        let provider = &mut self.provider;

        let result = panic::catch_unwind(AssertUnwindSafe(|| match kind {
            StepKind::Start => provider.start_script(script),
            StepKind::Step => provider.execute_step(script),
        }));

        let line = script.cursor();
        match result {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(error)) => Err(ScriptError::with_line(
                "ENGINE_STEP_FAILED",
                error.message,
                line,
            )),
            Err(payload) => Err(ScriptError::with_line(
                "ENGINE_STEP_PANIC",
                panic_message(payload.as_ref()),
                line,
            )),
        }
    }

    fn mark_line(&mut self) {
        let Some(line) = self.active.as_ref().map(ScriptHandle::cursor) else {
            return;
        };
        self.last_line = line;
        if self.highlight {
            self.notifications.notify(SchedulerEvent::Highlight {
                line,
                highlight: HighlightKind::Execution,
            });
        }
    }

    pub(super) fn complete_active(&mut self) {
        if let Some(done) = self.active.take() {
            debug!(script = %done.name(), line = done.cursor(), "script completed");
            self.last_line = done.cursor();
        }

        if self.resume_caller() {
            return;
        }
        self.finish_run();
    }

    pub(super) fn finish_run(&mut self) {
        let name = self
            .run_name
            .take()
            .or_else(|| self.active_name.clone())
            .unwrap_or_default();
        let elapsed_ms = self
            .stopwatch
            .take()
            .map(|start| u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX));

        info!(script = %name, elapsed_ms = ?elapsed_ms, "run finished");
        if !self.config.disable_play_finish {
            self.notifications.notify(SchedulerEvent::Finished {
                name,
                elapsed_ms: if self.config.disable_stopwatch {
                    None
                } else {
                    elapsed_ms
                },
            });
        }

        self.running = false;
        self.active = None;
        self.active_name = None;
        self.paused = false;
        self.call_pending = false;
        self.notifications.notify(SchedulerEvent::ClearHighlight {
            highlight: HighlightKind::Execution,
        });
    }

    /// Aborts the whole run, including every suspended caller.
    pub(super) fn fail_run(&mut self, error: ScriptError) {
        let line = error.line.unwrap_or(self.last_line);
        let name = self
            .active_name
            .take()
            .or_else(|| self.run_name.clone())
            .unwrap_or_default();
        warn!(
            code = %error.code,
            script = %name,
            line = line + 1,
            depth = self.call_stack.depth(),
            "script error: {}",
            error.message
        );

        self.provider.stop_script();
        self.active = None;
        self.queued = None;
        self.run_name = None;
        self.stopwatch = None;
        self.paused = false;
        self.call_pending = false;
        self.running = false;
        self.last_line = line;
        self.call_stack.clear();

        self.notifications.notify(SchedulerEvent::Errored {
            name,
            message: error.message,
            line: line + 1,
        });
        self.notifications.notify(SchedulerEvent::ClearHighlight {
            highlight: HighlightKind::Execution,
        });
        if self.highlight {
            self.notifications.notify(SchedulerEvent::Highlight {
                line,
                highlight: HighlightKind::Error,
            });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return format!("Step provider panicked: {}", message);
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return format!("Step provider panicked: {}", message);
    }
    "Step provider panicked.".to_string()
}
