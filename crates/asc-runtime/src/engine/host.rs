use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use asc_core::{ParseError, SchedulerEvent, ScriptBody, ScriptHandle, StepError};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub target: String,
    pub params: Option<Vec<String>>,
}

impl CallRequest {
    pub fn new(target: impl Into<String>, params: Option<Vec<String>>) -> Self {
        Self {
            target: target.into(),
            params,
        }
    }
}

/// Result of one indivisible unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// More work remains; possibly no progress was made (still waiting).
    Continue,
    Complete,
    /// Suspend the current script and run `target` first. The cursor stays on
    /// the call line.
    Call(CallRequest),
    /// Leave the current script, handing an optional value to the caller.
    Return(Option<String>),
}

pub trait StepProvider {
    /// Begins execution at the handle's cursor: line zero for a fresh script, the
    /// call line for a caller restored after its callee finished.
    fn start_script(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError>;
    fn execute_step(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError>;
    fn stop_script(&mut self) {}
    fn pause_script(&mut self) {}
    fn resume_script(&mut self) {}
}

pub trait HostStatus {
    fn is_available(&self) -> bool;
}

pub trait NotificationSink {
    fn notify(&mut self, event: SchedulerEvent);
}

pub trait VariableNamespace {
    fn set_variable(&mut self, name: &str, value: &str, global: bool);
    fn exists_alias(&self, name: &str) -> bool;
    fn clear_alias(&mut self, name: &str);
}

pub trait ScriptParser {
    fn parse(&self, name: &str, body: &ScriptBody) -> Result<(), ParseError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScript {
    pub name: String,
    pub body: ScriptBody,
}

pub trait ScriptResolver {
    fn resolve(&self, name: &str) -> Option<ResolvedScript>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAvailable;

impl HostStatus for AlwaysAvailable {
    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::Started { name } => info!(script = %name, "script playing"),
            SchedulerEvent::Finished { name, elapsed_ms } => match elapsed_ms {
                Some(elapsed) => info!(script = %name, elapsed_ms = elapsed, "script finished"),
                None => info!(script = %name, "script finished"),
            },
            SchedulerEvent::Errored {
                name,
                message,
                line,
            } => error!(script = %name, line, "script error: {}", message),
            SchedulerEvent::ParseFailed {
                name,
                message,
                text,
                line,
            } => error!(script = %name, line, "{}: '{}'", message, text),
            SchedulerEvent::CallRejected { name, message } => {
                warn!(script = %name, "{}", message)
            }
            SchedulerEvent::Paused { line } => info!(line, "script paused"),
            SchedulerEvent::Resumed { line } => info!(line, "script resumed"),
            other => debug!(event = ?other, "highlight"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InMemoryVariables {
    values: BTreeMap<String, String>,
}

impl InMemoryVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl VariableNamespace for InMemoryVariables {
    // Every binding lives in one process-wide namespace, so `global` only matters
    // to hosts that distinguish scopes.
    fn set_variable(&mut self, name: &str, value: &str, _global: bool) {
        self.values.insert(name.to_string(), value.to_string());
    }

    fn exists_alias(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn clear_alias(&mut self, name: &str) {
        self.values.remove(name);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllParser;

impl ScriptParser for AcceptAllParser {
    fn parse(&self, _name: &str, _body: &ScriptBody) -> Result<(), ParseError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyResolver;

impl ScriptResolver for EmptyResolver {
    fn resolve(&self, _name: &str) -> Option<ResolvedScript> {
        None
    }
}

impl<T: StepProvider> StepProvider for Rc<RefCell<T>> {
    fn start_script(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        self.borrow_mut().start_script(script)
    }

    fn execute_step(&mut self, script: &mut ScriptHandle) -> Result<StepOutcome, StepError> {
        self.borrow_mut().execute_step(script)
    }

    fn stop_script(&mut self) {
        self.borrow_mut().stop_script();
    }

    fn pause_script(&mut self) {
        self.borrow_mut().pause_script();
    }

    fn resume_script(&mut self) {
        self.borrow_mut().resume_script();
    }
}

impl<T: HostStatus> HostStatus for Rc<RefCell<T>> {
    fn is_available(&self) -> bool {
        self.borrow().is_available()
    }
}

impl<T: NotificationSink> NotificationSink for Rc<RefCell<T>> {
    fn notify(&mut self, event: SchedulerEvent) {
        self.borrow_mut().notify(event);
    }
}

impl<T: VariableNamespace> VariableNamespace for Rc<RefCell<T>> {
    fn set_variable(&mut self, name: &str, value: &str, global: bool) {
        self.borrow_mut().set_variable(name, value, global);
    }

    fn exists_alias(&self, name: &str) -> bool {
        self.borrow().exists_alias(name)
    }

    fn clear_alias(&mut self, name: &str) {
        self.borrow_mut().clear_alias(name);
    }
}

impl<T: ScriptParser> ScriptParser for Rc<RefCell<T>> {
    fn parse(&self, name: &str, body: &ScriptBody) -> Result<(), ParseError> {
        self.borrow().parse(name, body)
    }
}

impl<T: ScriptResolver> ScriptResolver for Rc<RefCell<T>> {
    fn resolve(&self, name: &str) -> Option<ResolvedScript> {
        self.borrow().resolve(name)
    }
}
