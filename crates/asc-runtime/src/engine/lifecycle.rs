use std::time::{Duration, Instant};

use asc_core::{
    HighlightKind, SchedulerConfig, SchedulerEvent, SchedulerPhase, ScriptBody, ScriptError,
    ScriptHandle,
};
use tracing::{debug, info};

use super::callstack::CallStack;
use super::host::{
    AcceptAllParser, AlwaysAvailable, EmptyResolver, HostStatus, InMemoryVariables,
    NotificationSink, ScriptParser, ScriptResolver, StepProvider, TracingNotificationSink,
    VariableNamespace,
};

pub struct ScriptSchedulerOptions {
    pub provider: Box<dyn StepProvider>,
    pub host: Option<Box<dyn HostStatus>>,
    pub notifications: Option<Box<dyn NotificationSink>>,
    pub variables: Option<Box<dyn VariableNamespace>>,
    pub parser: Option<Box<dyn ScriptParser>>,
    pub resolver: Option<Box<dyn ScriptResolver>>,
    pub config: SchedulerConfig,
}

impl ScriptSchedulerOptions {
    pub fn new(provider: Box<dyn StepProvider>) -> Self {
        Self {
            provider,
            host: None,
            notifications: None,
            variables: None,
            parser: None,
            resolver: None,
            config: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum QueueKind {
    Play,
    Call,
    Return,
}

#[derive(Debug, Clone)]
pub(super) struct QueuedScript {
    pub(super) handle: ScriptHandle,
    pub(super) display_name: String,
    pub(super) kind: QueueKind,
}

/// Tick-driven coordinator for one active script, one staged script and the
/// stack of suspended callers.
pub struct ScriptScheduler {
    pub(super) provider: Box<dyn StepProvider>,
    pub(super) host: Box<dyn HostStatus>,
    pub(super) notifications: Box<dyn NotificationSink>,
    pub(super) variables: Box<dyn VariableNamespace>,
    pub(super) parser: Box<dyn ScriptParser>,
    pub(super) resolver: Box<dyn ScriptResolver>,
    pub(super) config: SchedulerConfig,

    pub(super) call_stack: CallStack,
    pub(super) active: Option<ScriptHandle>,
    pub(super) active_name: Option<String>,
    pub(super) queued: Option<QueuedScript>,
    pub(super) run_name: Option<String>,
    pub(super) paused: bool,
    pub(super) running: bool,
    pub(super) call_pending: bool,
    pub(super) highlight: bool,
    pub(super) stopwatch: Option<Instant>,
    pub(super) last_line: usize,
}

impl ScriptScheduler {
    pub fn new(options: ScriptSchedulerOptions) -> Self {
        Self {
            provider: options.provider,
            host: options.host.unwrap_or_else(|| Box::new(AlwaysAvailable)),
            notifications: options
                .notifications
                .unwrap_or_else(|| Box::new(TracingNotificationSink)),
            variables: options
                .variables
                .unwrap_or_else(|| Box::new(InMemoryVariables::new())),
            parser: options.parser.unwrap_or_else(|| Box::new(AcceptAllParser)),
            resolver: options.resolver.unwrap_or_else(|| Box::new(EmptyResolver)),
            config: options.config,
            call_stack: CallStack::new(),
            active: None,
            active_name: None,
            queued: None,
            run_name: None,
            paused: false,
            running: false,
            call_pending: false,
            highlight: false,
            stopwatch: None,
            last_line: 0,
        }
    }

    pub fn play(&mut self, name: &str, body: ScriptBody) -> Result<(), ScriptError> {
        self.play_with_highlight(name, body, false)
    }

    pub fn play_lines(&mut self, name: &str, lines: &[String]) -> Result<(), ScriptError> {
        self.play(name, ScriptBody::from_lines(lines.iter().cloned()))
    }

    pub fn play_by_name(&mut self, name: &str) -> Result<(), ScriptError> {
        let resolved = self.resolver.resolve(name).ok_or_else(|| {
            ScriptError::new(
                "ENGINE_SCRIPT_NOT_FOUND",
                format!("Script \"{}\" not found.", name),
            )
        })?;
        self.play(&resolved.name, resolved.body)
    }

    /// Starts a fresh run. Whatever was running is stopped and its pending
    /// callers are dropped; the new script is staged for the next tick.
    pub fn play_with_highlight(
        &mut self,
        name: &str,
        body: ScriptBody,
        highlight: bool,
    ) -> Result<(), ScriptError> {
        self.stop();
        self.call_stack.clear();
        if self.running {
            self.finish_run();
        }
        self.highlight = highlight;
        if highlight {
            self.notifications.notify(SchedulerEvent::ClearAllHighlights);
        }

        if !self.host.is_available() {
            return Err(ScriptError::new(
                "ENGINE_HOST_UNAVAILABLE",
                format!("Cannot play \"{}\": host is unavailable.", name),
            ));
        }

        if let Err(error) = self.parser.parse(name, &body) {
            self.report_parse_failure(name, &error);
            return Err(error.into());
        }

        debug!(script = %name, lines = body.len(), "queued script for play");
        self.queued = Some(QueuedScript {
            handle: ScriptHandle::new(name, body),
            display_name: name.to_string(),
            kind: QueueKind::Play,
        });
        Ok(())
    }

    /// Halts the current script. Suspended callers stay on the call stack; the
    /// next tick treats the halt as the active script completing.
    pub fn stop(&mut self) {
        if self.active.is_none() && self.queued.is_none() && !self.running {
            debug!("stop requested with nothing running");
        }
        self.queued = None;
        self.paused = false;
        self.call_pending = false;
        self.provider.stop_script();
        if let Some(active) = self.active.take() {
            info!(script = %active.name(), line = active.cursor(), "script stopped");
        }
        self.notifications.notify(SchedulerEvent::ClearHighlight {
            highlight: HighlightKind::Execution,
        });
    }

    /// Full environment reset: stop, drop every suspended caller, forget the run.
    pub fn reset(&mut self) {
        self.stop();
        self.call_stack.clear();
        self.running = false;
        self.active_name = None;
        self.run_name = None;
        self.stopwatch = None;
        self.highlight = false;
    }

    pub fn pause(&mut self) -> bool {
        if !self.running || self.paused {
            return false;
        }
        self.paused = true;
        self.provider.pause_script();
        self.notifications.notify(SchedulerEvent::Paused {
            line: self.current_line() + 1,
        });
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        self.provider.resume_script();
        self.notifications.notify(SchedulerEvent::Resumed {
            line: self.current_line() + 1,
        });
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if self.paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        if self.paused {
            return SchedulerPhase::Paused;
        }
        match (&self.active, &self.queued) {
            (Some(_), _) => SchedulerPhase::Running,
            (None, Some(queued))
                if queued.kind == QueueKind::Call && self.call_stack.has_calls() =>
            {
                SchedulerPhase::Suspended
            }
            (None, Some(_)) => SchedulerPhase::Queued,
            (None, None) if self.running => SchedulerPhase::Running,
            (None, None) => SchedulerPhase::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.depth()
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// Zero-based line of the active script, or the last line seen.
    pub fn current_line(&self) -> usize {
        self.active
            .as_ref()
            .map(ScriptHandle::cursor)
            .unwrap_or(self.last_line)
    }

    pub fn active_script(&self) -> Option<&ScriptHandle> {
        self.active.as_ref()
    }

    pub fn active_script_name(&self) -> Option<&str> {
        self.active_name
            .as_deref()
            .or_else(|| self.queued.as_ref().map(|queued| queued.display_name.as_str()))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval()
    }

    /// Only the cadence changes; active, queued and call stack state survive.
    pub fn set_tick_interval(&mut self, interval_ms: u64) {
        if self.config.tick_interval_ms != interval_ms {
            info!(
                from_ms = self.config.tick_interval_ms,
                to_ms = interval_ms,
                "tick interval changed"
            );
        }
        self.config.tick_interval_ms = interval_ms;
    }

    pub(super) fn report_parse_failure(&mut self, name: &str, error: &asc_core::ParseError) {
        self.notifications.notify(SchedulerEvent::ParseFailed {
            name: name.to_string(),
            message: error.message.clone(),
            text: error.text.clone(),
            line: error.line + 1,
        });
        if self.highlight {
            self.notifications.notify(SchedulerEvent::Highlight {
                line: error.line,
                highlight: HighlightKind::Error,
            });
        }
    }
}
