use asc_core::{SchedulerEvent, ScriptError};
use asc_runtime::NotificationSink;
use tracing::warn;

/// Prints every scheduler event as an `EVENT:` line and remembers the last
/// runtime failure so the command can report it.
#[derive(Debug, Default)]
pub(crate) struct EventPrinter {
    pub(crate) failure: Option<ScriptError>,
}

impl NotificationSink for EventPrinter {
    fn notify(&mut self, event: SchedulerEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => println!("EVENT:{}", json),
            Err(error) => warn!("failed to encode event {:?}: {}", event, error),
        }

        if let SchedulerEvent::Errored {
            name,
            message,
            line,
        } = &event
        {
            self.failure = Some(ScriptError::with_line(
                "CLI_SCRIPT_FAILED",
                format!("{} (script \"{}\")", message, name),
                line.saturating_sub(1),
            ));
        }
    }
}
