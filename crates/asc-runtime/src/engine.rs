mod callstack;
mod control_flow;
mod dry_run;
mod host;
mod lifecycle;
mod step;

pub use callstack::{CallFrame, CallStack, MAX_CALL_DEPTH};
pub use dry_run::{DryRunParser, DryRunProvider, ExecutedLine};
pub use host::{
    AcceptAllParser, AlwaysAvailable, CallRequest, EmptyResolver, HostStatus, InMemoryVariables,
    NotificationSink, ResolvedScript, ScriptParser, ScriptResolver, StepOutcome, StepProvider,
    TracingNotificationSink, VariableNamespace,
};
pub use lifecycle::{ScriptScheduler, ScriptSchedulerOptions};


#[cfg(test)]
mod lifecycle_tests;
